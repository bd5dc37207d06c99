use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

pub mod settings;

pub use settings::{AppConfig, BoundaryPolicy, PreviewSettings, UploadSettings, ViewerSettings};

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DocumentId(pub String);

impl DocumentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentSource {
    Path(PathBuf),
    Bytes(Vec<u8>),
}

impl DocumentSource {
    pub fn read_bytes(&self) -> io::Result<Vec<u8>> {
        match self {
            Self::Path(path) => fs::read(path),
            Self::Bytes(bytes) => Ok(bytes.clone()),
        }
    }
}

impl From<PathBuf> for DocumentSource {
    fn from(value: PathBuf) -> Self {
        Self::Path(value)
    }
}

impl From<&Path> for DocumentSource {
    fn from(value: &Path) -> Self {
        Self::Path(value.to_path_buf())
    }
}

impl From<Vec<u8>> for DocumentSource {
    fn from(value: Vec<u8>) -> Self {
        Self::Bytes(value)
    }
}

/// A paginated document addressed by id, read-only once created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub id: DocumentId,
    pub source: DocumentSource,
}

impl Document {
    pub fn new(id: DocumentId, source: impl Into<DocumentSource>) -> Self {
        Self { id, source: source.into() }
    }

    /// Builds a document whose id is derived from the file path.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let id = DocumentId(path.display().to_string());
        Self { id, source: DocumentSource::Path(path) }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("page numbers are 1-based, got {0}")]
pub struct PageNumberError(pub u32);

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PageRequest {
    pub document_id: DocumentId,
    page_number: u32,
}

impl PageRequest {
    pub fn new(document_id: DocumentId, page_number: u32) -> Result<Self, PageNumberError> {
        if page_number == 0 {
            return Err(PageNumberError(page_number));
        }

        Ok(Self { document_id, page_number })
    }

    pub fn page_number(&self) -> u32 {
        self.page_number
    }

    /// Zero-based index used by rendering backends.
    pub fn page_index(&self) -> u32 {
        self.page_number - 1
    }
}

/// Bounding box in logical units that a rendered page must fit into.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TargetBox {
    pub width: f32,
    pub height: f32,
}

impl TargetBox {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
/// New accounts are always created active.
pub enum UserStatus {
    Active,
}

/// Arguments of `insert_new_book_command`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBook {
    pub title: String,
    pub author: Option<String>,
    pub file_path: String,
}

/// Arguments of `create_user_command`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub name: String,
    pub email: Option<String>,
    pub status: UserStatus,
    pub available_days: Vec<String>,
    pub interests: Vec<String>,
}
