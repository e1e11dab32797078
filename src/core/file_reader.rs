//! Document reading and writing
//!
//! The whole document is read into memory once. Provides consistent handling for:
//! - Missing or unreadable input (fatal)
//! - Non-UTF-8 content (lossy by default)
//! - Oversized input (fatal)

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::core::error::JumpError;
use crate::core::model::{JumpIssue, ResultItem};
use crate::core::util::hash_bytes;

/// Default maximum document size in bytes (64 MB)
pub const DEFAULT_MAX_FILE_SIZE: u64 = 64 * 1024 * 1024;

/// Strategy for handling non-UTF-8 content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EncodingStrategy {
    /// Refuse documents that are not valid UTF-8
    Strict,
    /// Use lossy conversion (replace invalid bytes with U+FFFD)
    #[default]
    Lossy,
}

/// Configuration for document reading
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileReadConfig {
    /// Maximum document size to process (bytes)
    pub max_file_size: u64,

    /// How to handle non-UTF-8 content
    pub encoding_strategy: EncodingStrategy,
}

impl Default for FileReadConfig {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            encoding_strategy: EncodingStrategy::Lossy,
        }
    }
}

/// Warning codes for document reading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WarningCode {
    /// Lossy encoding conversion used
    LossyConversion,
    /// Document contains NUL bytes
    BinaryContent,
}

impl WarningCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            WarningCode::LossyConversion => "LOSSY_CONVERSION",
            WarningCode::BinaryContent => "BINARY_CONTENT",
        }
    }
}

/// A structured warning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileWarning {
    pub code: WarningCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl FileWarning {
    pub fn new(code: WarningCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            path: None,
        }
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Convert to a ResultItem (Kind::Error with warning info)
    pub fn to_result_item(&self) -> ResultItem {
        let mut item = ResultItem::error(JumpIssue::new(self.code.as_str(), &self.message));
        item.path = self.path.clone();
        item
    }
}

/// A document loaded into memory
#[derive(Debug, Clone)]
pub struct Document {
    pub path: PathBuf,
    pub text: String,
    /// xxh3 hash of the bytes as read
    pub hash: String,
    pub warnings: Vec<FileWarning>,
}

impl Document {
    /// Build an in-memory document (no file behind it)
    #[cfg(test)]
    pub fn from_text(path: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            path: path.into(),
            hash: hash_bytes(text.as_bytes()),
            text,
            warnings: Vec::new(),
        }
    }
}

/// Read a whole document
pub fn read_document(path: &Path, config: &FileReadConfig) -> Result<Document, JumpError> {
    let metadata = fs::metadata(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => JumpError::InputNotFound(path.to_path_buf()),
        _ => JumpError::InputUnreadable {
            path: path.to_path_buf(),
            reason: e.to_string(),
        },
    })?;

    if !metadata.is_file() {
        return Err(JumpError::InputUnreadable {
            path: path.to_path_buf(),
            reason: "not a regular file".to_string(),
        });
    }

    if metadata.len() > config.max_file_size {
        return Err(JumpError::InputUnreadable {
            path: path.to_path_buf(),
            reason: format!(
                "document exceeds size limit ({} > {} bytes)",
                metadata.len(),
                config.max_file_size
            ),
        });
    }

    let bytes = fs::read(path).map_err(|e| JumpError::InputUnreadable {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    let mut warnings = Vec::new();
    let display = path.display().to_string();

    // Check if binary (contains null bytes in first 8KB)
    let check_len = std::cmp::min(8192, bytes.len());
    if bytes[..check_len].contains(&0) {
        warnings.push(
            FileWarning::new(
                WarningCode::BinaryContent,
                "Document contains null bytes; it may not be Markdown",
            )
            .with_path(display.clone()),
        );
    }

    let hash = hash_bytes(&bytes);
    let text = match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(err) => match config.encoding_strategy {
            EncodingStrategy::Strict => {
                return Err(JumpError::InputUnreadable {
                    path: path.to_path_buf(),
                    reason: "document contains invalid UTF-8 sequences".to_string(),
                });
            }
            EncodingStrategy::Lossy => {
                warnings.push(
                    FileWarning::new(
                        WarningCode::LossyConversion,
                        "Lossy UTF-8 conversion applied (some characters replaced)",
                    )
                    .with_path(display),
                );
                String::from_utf8_lossy(err.as_bytes()).into_owned()
            }
        },
    };

    Ok(Document {
        path: path.to_path_buf(),
        text,
        hash,
        warnings,
    })
}

/// Write the whole output document
pub fn write_document(path: &Path, text: &str) -> Result<(), JumpError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| JumpError::WriteFailed {
            path: path.to_path_buf(),
            source,
        })?;
    }
    fs::write(path, text).map_err(|source| JumpError::WriteFailed {
        path: path.to_path_buf(),
        source,
    })
}
