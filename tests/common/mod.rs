//! Shared helpers for the end-to-end tests.
//!
//! `#![allow(dead_code)]`: each test file compiles as its own crate and uses
//! a subset of these helpers.

#![allow(dead_code)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use dualpack::pipeline::{Packaged, Packager, StageFailure, ToolPaths};
use dualpack::secret::Secret;
use dualpack::types::PackagingRequest;
use dualpack::worker::Reporter;
use tempfile::TempDir;
use walkdir::WalkDir;

/// Stand-in for the 7-Zip command line built on `tar`.
///
/// `a` stores the password as a hidden member next to the payload; `x`
/// compares it and exits with 2 on mismatch, like 7-Zip does for a wrong
/// password.
const FAKE_7Z: &str = r#"#!/bin/sh
cmd="$1"; shift
archive=""; name=""; pw=""; out=""
for arg in "$@"; do
    case "$arg" in
        -t*|-mhe=*|-y) ;;
        -p*) pw="${arg#-p}" ;;
        -o*) out="${arg#-o}" ;;
        *) if [ -z "$archive" ]; then archive="$arg"; else name="$arg"; fi ;;
    esac
done

case "$cmd" in
    a)
        [ "$MODE" = broken ] && { echo "E_FAIL: cannot create archive"; exit 2; }
        meta=$(mktemp -d) || exit 2
        printf '%s' "$pw" > "$meta/.fake7z-password"
        tar -cf "$archive" -C "$meta" .fake7z-password -C "$PWD" "$name" || exit 2
        rm -rf "$meta"
        ;;
    x)
        [ "$MODE" = quiet ] && exit 0
        stored=$(tar -xOf "$archive" .fake7z-password 2>/dev/null) || { echo "Can not open the file as archive" >&2; exit 2; }
        [ "$stored" = "$pw" ] || { echo "Wrong password" >&2; exit 2; }
        tar -xf "$archive" -C "$out" --exclude=.fake7z-password || exit 2
        ;;
    *)
        echo "unsupported command: $cmd" >&2
        exit 7
        ;;
esac
"#;

/// How the fake archiver behaves.
#[derive(Debug, Clone, Copy)]
pub enum Mode {
    Honest,
    /// `a` fails with exit code 2.
    Broken,
    /// `x` exits 0 without writing anything.
    Quiet,
}

impl Mode {
    fn name(self) -> &'static str {
        match self {
            Self::Honest => "honest",
            Self::Broken => "broken",
            Self::Quiet => "quiet",
        }
    }
}

/// Writes an executable fake `7z` into `dir` and returns its path.
pub fn fake_archiver(dir: &Path, mode: Mode) -> PathBuf {
    let path = dir.join("7z");
    let script = FAKE_7Z.replacen("cmd=\"$1\"; shift", &format!("MODE={}\ncmd=\"$1\"; shift", mode.name()), 1);
    fs::write(&path, script).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

pub fn extractor_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_dualpack-extract"))
}

/// A workspace with the two sample payloads: `hello.txt` ("hi") and
/// `data/x.bin`.
pub struct Workspace {
    pub dir: TempDir,
}

pub const X_BIN: [u8; 6] = [0x00, 0xff, 0x10, 0x7f, 0x80, 0x0a];

impl Workspace {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("src")).unwrap();
        fs::write(dir.path().join("src").join("hello.txt"), b"hi").unwrap();
        fs::create_dir_all(dir.path().join("src").join("data")).unwrap();
        fs::write(dir.path().join("src").join("data").join("x.bin"), X_BIN).unwrap();
        fs::create_dir(dir.path().join("tools")).unwrap();
        fs::create_dir(dir.path().join("tmp")).unwrap();
        fs::create_dir(dir.path().join("target")).unwrap();
        Self { dir }
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.dir.path().join(relative)
    }

    pub fn output(&self) -> PathBuf {
        self.path("out/bundle")
    }

    pub fn request(&self, password_a: &str, password_b: &str) -> PackagingRequest {
        PackagingRequest::new(
            self.path("src/hello.txt").to_str().unwrap(),
            Secret::new(password_a),
            self.path("src/data").to_str().unwrap(),
            Secret::new(password_b),
            self.output().to_str().unwrap(),
        )
    }

    pub fn tools(&self, mode: Mode) -> ToolPaths {
        ToolPaths { archiver: Some(fake_archiver(&self.path("tools"), mode)), extractor: Some(extractor_binary()), shipped_dir: self.path("tools") }
    }

    /// Runs the packaging pipeline with the fake archiver.
    pub fn package(&self, mode: Mode, password_a: &str, password_b: &str) -> Result<Packaged, StageFailure> {
        let packager = Packager::new(self.tools(mode)).with_temp_root(self.path("tmp"));
        let (mut reporter, _events) = Reporter::channel();
        packager.run(&self.request(password_a, password_b), &mut reporter)
    }

    /// Every path under `target`, relative to it, sorted.
    pub fn target_listing(&self) -> Vec<PathBuf> {
        let target = self.path("target");
        WalkDir::new(&target).min_depth(1).sort_by_file_name().into_iter().map(|e| e.unwrap().path().strip_prefix(&target).unwrap().to_path_buf()).collect()
    }

    pub fn temp_root_is_empty(&self) -> bool {
        fs::read_dir(self.path("tmp")).unwrap().next().is_none()
    }
}
