//! Human-readable diffs through `diff(1)`.

use std::io::Write;
use std::path::Path;
use std::process::Command;

use tempfile::NamedTempFile;

use crate::error::{Error, Result};

/// Runs `diff -u` over two rendered documents, streaming output to the
/// given sinks. `None` stands for a missing side and compares against
/// `/dev/null`. Returns whether differences were found; only exit statuses
/// above 1 are errors.
pub fn unified(
    label_a: &str,
    side_a: Option<&str>,
    label_b: &str,
    side_b: Option<&str>,
    stdout: &mut dyn Write,
    stderr: &mut dyn Write,
) -> Result<bool> {
    // Temp files live in this scope; dropping them deletes them on every
    // exit path, error or not.
    let mut holders: Vec<NamedTempFile> = Vec::new();
    let path_a = materialize(side_a, &mut holders)?;
    let path_b = materialize(side_b, &mut holders)?;

    let output = Command::new("diff")
        .arg("-u")
        .arg("-L")
        .arg(label_a)
        .arg(&path_a)
        .arg("-L")
        .arg(label_b)
        .arg(&path_b)
        .output()
        .map_err(|err| {
            if err.kind() == std::io::ErrorKind::NotFound {
                Error::Transport("diff(1) is not available on this system".to_string())
            } else {
                Error::Io(err)
            }
        })?;

    stdout.write_all(&output.stdout)?;
    stderr.write_all(&output.stderr)?;

    match output.status.code() {
        Some(0) => Ok(false),
        Some(1) => Ok(true),
        code => Err(Error::Transport(format!(
            "diff exited with {:?}: {}",
            code,
            String::from_utf8_lossy(&output.stderr).trim_end()
        ))),
    }
}

fn materialize(
    side: Option<&str>,
    holders: &mut Vec<NamedTempFile>,
) -> Result<std::path::PathBuf> {
    match side {
        None => Ok(Path::new("/dev/null").to_path_buf()),
        Some(content) => {
            let mut file = NamedTempFile::new()?;
            file.write_all(content.as_bytes())?;
            file.flush()?;
            let path = file.path().to_path_buf();
            holders.push(file);
            Ok(path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_sides_report_no_changes() {
        let mut out = Vec::new();
        let mut err = Vec::new();
        let changed = unified("a", Some("x: 1\n"), "b", Some("x: 1\n"), &mut out, &mut err).unwrap();
        assert!(!changed);
        assert!(out.is_empty());
    }

    #[test]
    fn differing_sides_report_changes_with_labels() {
        let mut out = Vec::new();
        let mut err = Vec::new();
        let changed = unified(
            "op://vault/item",
            Some("x: 1\n"),
            "local.yaml",
            Some("x: 2\n"),
            &mut out,
            &mut err,
        )
        .unwrap();
        assert!(changed);
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("op://vault/item"));
        assert!(text.contains("local.yaml"));
        assert!(text.contains("+x: 2"));
    }

    #[test]
    fn missing_side_diffs_against_dev_null() {
        let mut out = Vec::new();
        let mut err = Vec::new();
        let changed = unified("absent", None, "b", Some("x: 1\n"), &mut out, &mut err).unwrap();
        assert!(changed);
        assert!(String::from_utf8(out).unwrap().contains("+x: 1"));
    }
}
