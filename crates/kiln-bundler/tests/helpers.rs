//! Shared test utilities for kiln-bundler integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use kiln_bundler::{
    Compiler, CompilerOptions, Minifier, MinifyOptions, StageError, Toolchain,
};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// Get the path to the test fixtures directory
pub fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
}

/// Copy a fixture project into a fresh temporary directory.
pub fn copy_fixture(name: &str) -> TempDir {
    let temp = TempDir::new().unwrap();
    copy_dir(&fixtures_dir().join(name), temp.path());
    temp
}

fn copy_dir(from: &Path, to: &Path) {
    std::fs::create_dir_all(to).unwrap();
    for entry in std::fs::read_dir(from).unwrap() {
        let entry = entry.unwrap();
        let target = to.join(entry.file_name());
        if entry.file_type().unwrap().is_dir() {
            copy_dir(&entry.path(), &target);
        } else {
            std::fs::copy(entry.path(), target).unwrap();
        }
    }
}

/// Compiler double that records its calls and emits a tiny Elm-shaped module.
#[derive(Default)]
pub struct FakeElm {
    pub calls: Mutex<Vec<CompilerOptions>>,
    pub fail_with: Option<String>,
}

#[async_trait]
impl Compiler for FakeElm {
    fn language(&self) -> &str {
        "elm"
    }

    async fn compile(
        &self,
        path: &Path,
        _cwd: &Path,
        options: CompilerOptions,
    ) -> Result<String, StageError> {
        self.calls.lock().unwrap().push(options);
        if let Some(message) = &self.fail_with {
            return Err(StageError::ToolFailed {
                tool: "elm".to_string(),
                code: 1,
                stderr: message.clone(),
            });
        }
        let name = path.file_stem().unwrap().to_string_lossy();
        Ok(format!(
            "export default {{ {name}: {{ init: function () {{ return {{ ports: {{}} }}; }}, debug: {} }} }};\n",
            options.debug
        ))
    }
}

/// Minifier double that only strips blank lines and tags the output.
#[derive(Default)]
pub struct FakeTerser {
    pub calls: Mutex<usize>,
}

#[async_trait]
impl Minifier for FakeTerser {
    fn name(&self) -> &str {
        "terser"
    }

    async fn minify(
        &self,
        code: &str,
        _cwd: &Path,
        _options: &MinifyOptions,
    ) -> Result<String, StageError> {
        *self.calls.lock().unwrap() += 1;
        let lines: Vec<&str> = code.lines().filter(|l| !l.trim().is_empty()).collect();
        Ok(format!("/*minified*/{}", lines.join("")))
    }
}

pub fn toolchain(compiler: Arc<FakeElm>, minifier: Arc<FakeTerser>) -> Toolchain {
    Toolchain {
        compiler,
        minifier,
        ..Default::default()
    }
}
