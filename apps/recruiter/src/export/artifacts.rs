//! Local run artifacts: timestamped JSON and CSV files in the output directory.

use std::path::PathBuf;

use chrono::Local;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::export::Row;

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("could not write artifact: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not serialize artifact: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone)]
pub struct ArtifactWriter {
    dir: PathBuf,
}

impl ArtifactWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn target(&self, stem: &str, extension: &str) -> Result<PathBuf, ArtifactError> {
        std::fs::create_dir_all(&self.dir)?;
        let stamp = Local::now().format("%Y%m%d_%H%M%S");
        Ok(self.dir.join(format!("{stem}_{stamp}.{extension}")))
    }

    pub fn write_json<T: Serialize + ?Sized>(&self, stem: &str, value: &T) -> Result<PathBuf, ArtifactError> {
        let path = self.target(stem, "json")?;
        let body = serde_json::to_string_pretty(value)?;
        std::fs::write(&path, body)?;
        debug!(path = %path.display(), "json artifact written");
        Ok(path)
    }

    pub fn write_csv(&self, stem: &str, rows: &[Row]) -> Result<PathBuf, ArtifactError> {
        let path = self.target(stem, "csv")?;
        std::fs::write(&path, to_csv(rows))?;
        debug!(path = %path.display(), rows = rows.len(), "csv artifact written");
        Ok(path)
    }
}

/// RFC 4180: CRLF line endings, fields quoted only when they need it.
pub fn to_csv(rows: &[Row]) -> String {
    let mut out = String::new();
    for row in rows {
        let line: Vec<String> = row.iter().map(|field| quote_field(field)).collect();
        out.push_str(&line.join(","));
        out.push_str("\r\n");
    }
    out
}

fn quote_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
