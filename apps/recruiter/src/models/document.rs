use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    Pdf,
    Text,
    Unsupported,
}

impl DocumentKind {
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .as_deref()
        {
            Some("pdf") => Self::Pdf,
            Some("txt") => Self::Text,
            _ => Self::Unsupported,
        }
    }
}

/// A resume document sitting in the inbox directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRef {
    pub path: PathBuf,
    pub kind: DocumentKind,
}

impl DocumentRef {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let kind = DocumentKind::from_path(&path);
        Self { path, kind }
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}
