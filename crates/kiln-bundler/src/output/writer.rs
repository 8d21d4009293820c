//! Atomic output writing.
//!
//! Every file is first written next to its target under a temporary name,
//! and only renamed into place once all of them were written. If anything
//! fails, the temporaries are removed and the previous build stays on disk
//! untouched. Files in the output directory that the build does not produce
//! (a hand-written `index.html`, say) are never touched.
//!
//! Output names are validated so that a file name can never escape the
//! output directory.

use std::fs;
use std::path::{Path, PathBuf};

use path_clean::PathClean;

use crate::artifact::OutputFile;
use crate::output::WrittenFile;
use crate::{Error, Result};

const TEMP_SUFFIX: &str = ".kiln-tmp";

/// Write `outputs` into `dir`, creating it if needed.
///
/// Either every file is replaced or none is.
///
/// # Examples
///
/// ```no_run
/// use kiln_bundler::OutputFile;
/// use kiln_bundler::output::write_outputs;
/// use std::path::Path;
///
/// # fn example() -> kiln_bundler::Result<()> {
/// let files = vec![OutputFile::script("index.js", "console.log(1);")];
/// let written = write_outputs(&files, Path::new("public"))?;
/// assert_eq!(written.len(), 1);
/// # Ok(())
/// # }
/// ```
pub fn write_outputs(outputs: &[OutputFile], dir: &Path) -> Result<Vec<WrittenFile>> {
    let dir = validate_and_normalize_dir(dir)?;

    fs::create_dir_all(&dir).map_err(|e| {
        Error::WriteFailure(format!(
            "Failed to create output directory '{}': {}",
            dir.display(),
            e
        ))
    })?;

    let mut operations = Vec::with_capacity(outputs.len());
    for output in outputs {
        let target_path = validate_output_path(&dir, &output.file_name)?;
        operations.push((target_path, output.contents.as_bytes()));
    }

    write_files_atomic(&operations)?;

    Ok(operations
        .into_iter()
        .zip(outputs)
        .map(|((path, content), output)| WrittenFile {
            path,
            size: content.len(),
            kind: output.kind,
        })
        .collect())
}

/// Clean `dir` and make it absolute.
fn validate_and_normalize_dir(dir: &Path) -> Result<PathBuf> {
    let cleaned = dir.clean();

    let absolute = if cleaned.is_absolute() {
        cleaned
    } else {
        std::env::current_dir()
            .map_err(|e| {
                Error::InvalidOutputPath(format!("Failed to get current directory: {}", e))
            })?
            .join(&cleaned)
            .clean()
    };

    Ok(absolute)
}

/// Resolve `filename` under `base_dir`, rejecting anything that escapes it.
fn validate_output_path(base_dir: &Path, filename: &str) -> Result<PathBuf> {
    if filename.contains('\0') {
        return Err(Error::InvalidOutputPath(
            "Filename contains null byte".to_string(),
        ));
    }
    if filename.trim().is_empty() {
        return Err(Error::InvalidOutputPath("Filename is empty".to_string()));
    }

    let full_path = base_dir.join(Path::new(filename).clean()).clean();

    if full_path == base_dir || !full_path.starts_with(base_dir) {
        return Err(Error::InvalidOutputPath(format!(
            "Path '{}' escapes output directory '{}' (resolved to '{}')",
            filename,
            base_dir.display(),
            full_path.display()
        )));
    }

    Ok(full_path)
}

fn temp_path_for(target: &Path) -> PathBuf {
    let mut name = target.as_os_str().to_os_string();
    name.push(TEMP_SUFFIX);
    PathBuf::from(name)
}

/// Two-phase write: all temporaries first, then all renames.
fn write_files_atomic(operations: &[(PathBuf, &[u8])]) -> Result<()> {
    let mut temp_files = Vec::with_capacity(operations.len());

    for (target_path, content) in operations {
        if let Some(parent) = target_path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                cleanup_temp_files(&temp_files);
                Error::WriteFailure(format!(
                    "Failed to create directory '{}': {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let temp_path = temp_path_for(target_path);
        fs::write(&temp_path, content).map_err(|e| {
            cleanup_temp_files(&temp_files);
            let _ = fs::remove_file(&temp_path);
            Error::WriteFailure(format!(
                "Failed to write temporary file '{}': {}",
                temp_path.display(),
                e
            ))
        })?;

        temp_files.push((temp_path, target_path.clone()));
    }

    for (temp_path, target_path) in &temp_files {
        fs::rename(temp_path, target_path).map_err(|e| {
            cleanup_temp_files(&temp_files);
            Error::WriteFailure(format!(
                "Failed to rename '{}' to '{}': {}",
                temp_path.display(),
                target_path.display(),
                e
            ))
        })?;
    }

    Ok(())
}

/// Best-effort removal of leftover temporaries.
fn cleanup_temp_files(temp_files: &[(PathBuf, PathBuf)]) {
    for (temp_path, _) in temp_files {
        if temp_path.exists() {
            if let Err(e) = fs::remove_file(temp_path) {
                tracing::warn!(
                    path = %temp_path.display(),
                    error = %e,
                    "failed to clean up temporary file"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::OutputKind;
    use tempfile::TempDir;

    #[test]
    fn test_validate_output_path_normal() {
        let base = Path::new("/tmp/public");
        let result = validate_output_path(base, "index.js");
        assert_eq!(result.unwrap(), Path::new("/tmp/public/index.js"));
    }

    #[test]
    fn test_validate_output_path_current_dir() {
        let base = Path::new("/tmp/public");
        let result = validate_output_path(base, "./index.js.map");
        assert_eq!(result.unwrap(), Path::new("/tmp/public/index.js.map"));
    }

    #[test]
    fn test_validate_output_path_traversal() {
        let base = Path::new("/tmp/public");
        for name in ["../etc/passwd", "safe/../../../etc/passwd", ".", ""] {
            let result = validate_output_path(base, name);
            assert!(
                matches!(result, Err(Error::InvalidOutputPath(_))),
                "{name:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_validate_output_path_null_byte() {
        let base = Path::new("/tmp/public");
        assert!(validate_output_path(base, "file\0name.js").is_err());
    }

    #[test]
    fn writes_all_files_and_reports_sizes() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("public");
        let outputs = vec![
            OutputFile::script("index.js", "console.log(1);\n"),
            OutputFile::source_map("index.js.map", "{}"),
        ];

        let written = write_outputs(&outputs, &dir).unwrap();

        assert_eq!(written.len(), 2);
        assert_eq!(written[0].path, dir.join("index.js"));
        assert_eq!(written[0].size, 16);
        assert_eq!(written[1].kind, OutputKind::SourceMap);
        assert_eq!(
            fs::read_to_string(dir.join("index.js")).unwrap(),
            "console.log(1);\n"
        );
        let leftovers: Vec<_> = fs::read_dir(&dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(TEMP_SUFFIX))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn unrelated_files_survive() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("index.html"), "<html></html>").unwrap();

        write_outputs(&[OutputFile::script("index.js", "1")], temp.path()).unwrap();

        assert_eq!(
            fs::read_to_string(temp.path().join("index.html")).unwrap(),
            "<html></html>"
        );
    }

    #[test]
    fn invalid_name_leaves_previous_build() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("index.js"), "old").unwrap();

        let outputs = vec![
            OutputFile::script("index.js", "new"),
            OutputFile::script("../escape.js", "bad"),
        ];
        let err = write_outputs(&outputs, temp.path()).unwrap_err();

        assert!(matches!(err, Error::InvalidOutputPath(_)));
        assert_eq!(fs::read_to_string(temp.path().join("index.js")).unwrap(), "old");
    }
}
