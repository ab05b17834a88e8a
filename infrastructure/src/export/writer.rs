//! Line-oriented export writer.
//!
//! Writes rendered export lines to a file (parents created, file truncated)
//! or to stdout, one line per entry, through a buffered writer.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum ExportWriteError {
    #[error("Could not create {path}: {source}")]
    Create {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Write failed: {0}")]
    Write(#[from] io::Error),
}

/// Where export output goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportTarget {
    Stdout,
    File(PathBuf),
}

impl ExportTarget {
    pub fn from_option(path: Option<&Path>) -> Self {
        match path {
            Some(p) if p.as_os_str() != "-" => ExportTarget::File(p.to_path_buf()),
            _ => ExportTarget::Stdout,
        }
    }
}

pub struct ExportWriter {
    target: ExportTarget,
}

impl ExportWriter {
    pub fn new(target: ExportTarget) -> Self {
        Self { target }
    }

    pub fn target(&self) -> &ExportTarget {
        &self.target
    }

    /// Write every line, returning how many were written.
    pub fn write_lines(&self, lines: &[String]) -> Result<usize, ExportWriteError> {
        match &self.target {
            ExportTarget::Stdout => {
                let stdout = io::stdout();
                let mut writer = BufWriter::new(stdout.lock());
                write_all(&mut writer, lines)?;
            }
            ExportTarget::File(path) => {
                if let Some(parent) = path.parent()
                    && !parent.as_os_str().is_empty()
                {
                    std::fs::create_dir_all(parent).map_err(|source| ExportWriteError::Create {
                        path: parent.to_path_buf(),
                        source,
                    })?;
                }
                let file = File::create(path).map_err(|source| ExportWriteError::Create {
                    path: path.clone(),
                    source,
                })?;
                let mut writer = BufWriter::new(file);
                write_all(&mut writer, lines)?;
                info!(path = %path.display(), lines = lines.len(), "Wrote export");
            }
        }
        Ok(lines.len())
    }
}

fn write_all<W: Write>(writer: &mut W, lines: &[String]) -> io::Result<()> {
    for line in lines {
        writeln!(writer, "{line}")?;
    }
    writer.flush()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_writes_one_line_per_entry() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("export.jsonl");
        let writer = ExportWriter::new(ExportTarget::File(path.clone()));

        let lines = vec![r#"{"a":1}"#.to_string(), r#"{"b":2}"#.to_string()];
        assert_eq!(writer.write_lines(&lines).unwrap(), 2);

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "{\"a\":1}\n{\"b\":2}\n");
        for line in content.lines() {
            assert!(serde_json::from_str::<serde_json::Value>(line).is_ok());
        }
    }

    #[test]
    fn test_rewrite_truncates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("export.jsonl");
        let writer = ExportWriter::new(ExportTarget::File(path.clone()));
        writer
            .write_lines(&["one".to_string(), "two".to_string()])
            .unwrap();
        writer.write_lines(&["three".to_string()]).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "three\n");
    }

    #[test]
    fn test_dash_means_stdout() {
        assert_eq!(
            ExportTarget::from_option(Some(Path::new("-"))),
            ExportTarget::Stdout
        );
        assert_eq!(ExportTarget::from_option(None), ExportTarget::Stdout);
    }
}
