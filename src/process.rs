//! External command execution with captured output.
//!
//! Every child process is spawned with stdin detached, so a tool that would
//! otherwise stop to ask for a password fails instead of hanging on the
//! terminal. Stdout and stderr are captured for diagnostics.

use std::ffi::{OsStr, OsString};
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};

use tracing::debug;

use crate::error::{Error, Result};

/// Result of a command execution.
#[derive(Debug, Clone)]
pub struct CommandResult {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

impl CommandResult {
    #[inline]
    pub fn success(&self) -> bool {
        self.status.success()
    }

    /// Exit code, or -1 if the process was terminated by a signal.
    #[inline]
    pub fn code(&self) -> i32 {
        self.status.code().unwrap_or(-1)
    }

    /// Stdout and stderr joined, trimmed.
    pub fn combined_output(&self) -> String {
        match (self.stdout.trim(), self.stderr.trim()) {
            (out, "") => out.to_owned(),
            ("", err) => err.to_owned(),
            (out, err) => format!("{out}\n{err}"),
        }
    }
}

/// Builder for one external command.
pub struct Cmd {
    program: PathBuf,
    args: Vec<OsString>,
    /// (index into `args`, visible prefix length) of values kept out of logs.
    secret_args: Vec<(usize, usize)>,
    current_dir: Option<PathBuf>,
    tool: String,
}

impl Cmd {
    pub fn new(program: impl AsRef<Path>) -> Self {
        let program = program.as_ref().to_path_buf();
        let tool = program.file_name().map_or_else(|| program.display().to_string(), |name| name.to_string_lossy().into_owned());
        Self { program, args: Vec::new(), secret_args: Vec::new(), current_dir: None, tool }
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    /// Adds `prefix` immediately followed by `value`, e.g. `-o` and a path.
    pub fn arg_joined(mut self, prefix: &str, value: impl AsRef<OsStr>) -> Self {
        let mut arg = OsString::from(prefix);
        arg.push(value.as_ref());
        self.args.push(arg);
        self
    }

    /// Adds `prefix` followed by a secret value; logged as `prefix***`.
    pub fn secret_arg(mut self, prefix: &str, value: &str) -> Self {
        self.secret_args.push((self.args.len(), prefix.chars().count()));
        self.args.push(OsString::from(format!("{prefix}{value}")));
        self
    }

    pub fn dir(mut self, dir: &Path) -> Self {
        self.current_dir = Some(dir.to_path_buf());
        self
    }

    /// Runs the command and returns its result whatever the exit status.
    pub fn output(&self) -> Result<CommandResult> {
        debug!(command = %self, "running external command");

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args).stdin(Stdio::null());

        if let Some(ref dir) = self.current_dir {
            cmd.current_dir(dir);
        }

        let output = cmd.output().map_err(|e| Error::io(format!("failed to execute {}", self.program.display()), e))?;

        let result = CommandResult { status: output.status, stdout: String::from_utf8_lossy(&output.stdout).into_owned(), stderr: String::from_utf8_lossy(&output.stderr).into_owned() };

        debug!(tool = %self.tool, code = result.code(), "external command finished");

        Ok(result)
    }

    /// Runs the command, failing on a non-zero exit status.
    pub fn run(&self) -> Result<CommandResult> {
        let result = self.output()?;

        if !result.success() {
            return Err(Error::ToolFailed { tool: self.tool.clone(), code: result.code(), output: result.combined_output() });
        }

        Ok(result)
    }
}

impl fmt::Display for Cmd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for (i, arg) in self.args.iter().enumerate() {
            if let Some(&(_, visible)) = self.secret_args.iter().find(|(index, _)| *index == i) {
                let shown: String = arg.to_string_lossy().chars().take(visible).collect();
                write!(f, " {shown}***")?;
            } else {
                write!(f, " {}", arg.to_string_lossy())?;
            }
        }
        Ok(())
    }
}
