//! Reading notes out of a multipart upload.
//!
//! The form carries either a `text` field with pasted notes or a `file` field with an uploaded
//! plain-text file. Pasted text wins over the file regardless of field order. Blank text and empty
//! files count as absent. Fields are read chunk by chunk against the configured limit. Oversized
//! text is rejected at once; an oversized file is drained and only rejected if it ends up being
//! the notes source.

use std::fmt;

use axum::extract::multipart::{Field, Multipart, MultipartError};
use axum::http::StatusCode;

use crate::errors::{Error, Result};

pub const TEXT_FIELD: &str = "text";
pub const FILE_FIELD: &str = "file";

/// Where the notes of a request came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotesSource {
    Text,
    File { filename: Option<String> },
}

impl fmt::Display for NotesSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotesSource::Text => write!(f, "text"),
            NotesSource::File { filename: Some(name) } => write!(f, "file ({name})"),
            NotesSource::File { filename: None } => write!(f, "file"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notes {
    /// Notes exactly as submitted
    pub text: String,
    pub source: NotesSource,
}

/// What reading one field produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldContents {
    Read(Vec<u8>),
    /// The field grew past the limit; its remaining bytes were discarded
    TooLarge { limit: usize },
}

/// The `file` field. Decoded only when the file ends up being used.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub filename: Option<String>,
    pub contents: FieldContents,
}

/// Read the notes out of a multipart form.
#[tracing::instrument(skip_all, fields(max_bytes = max_bytes))]
pub async fn extract_notes(mut multipart: Multipart, max_bytes: usize) -> Result<Notes> {
    let mut text: Option<String> = None;
    let mut file: Option<UploadedFile> = None;

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| from_multipart_error(e, max_bytes))?
    {
        let name = field.name().unwrap_or_default().to_string();

        match name.as_str() {
            TEXT_FIELD if text.is_none() => match read_field(&mut field, max_bytes).await? {
                FieldContents::Read(bytes) => text = Some(decode(bytes)?),
                FieldContents::TooLarge { limit } => return Err(Error::PayloadTooLarge { limit }),
            },
            FILE_FIELD if file.is_none() => {
                let filename = field.file_name().map(str::to_string);
                let contents = read_field(&mut field, max_bytes).await?;
                tracing::debug!(filename = ?filename, contents = ?contents.size(), "Read uploaded notes file");
                file = Some(UploadedFile { filename, contents });
            }
            _ => {
                tracing::debug!(field = %name, "Ignoring multipart field");
            }
        }
    }

    select_notes(text, file)
}

/// Pick the notes source: non-blank text first, then a non-empty file.
pub fn select_notes(text: Option<String>, file: Option<UploadedFile>) -> Result<Notes> {
    if let Some(text) = text.filter(|t| !t.trim().is_empty()) {
        return Ok(Notes {
            text,
            source: NotesSource::Text,
        });
    }

    let Some(file) = file else {
        return Err(Error::NoNotesProvided);
    };

    match file.contents {
        FieldContents::Read(bytes) if bytes.is_empty() => Err(Error::NoNotesProvided),
        FieldContents::Read(bytes) => Ok(Notes {
            text: decode(bytes)?,
            source: NotesSource::File {
                filename: file.filename,
            },
        }),
        FieldContents::TooLarge { limit } => Err(Error::PayloadTooLarge { limit }),
    }
}

impl FieldContents {
    /// Bytes kept, `None` once the limit was exceeded.
    pub fn size(&self) -> Option<usize> {
        match self {
            FieldContents::Read(bytes) => Some(bytes.len()),
            FieldContents::TooLarge { .. } => None,
        }
    }
}

async fn read_field(field: &mut Field<'_>, max_bytes: usize) -> Result<FieldContents> {
    let mut buffer = Vec::new();
    let mut too_large = false;

    while let Some(chunk) = field.chunk().await.map_err(|e| from_multipart_error(e, max_bytes))? {
        if too_large {
            continue;
        }
        if buffer.len() + chunk.len() > max_bytes {
            too_large = true;
            buffer = Vec::new();
            continue;
        }
        buffer.extend_from_slice(&chunk);
    }

    if too_large {
        Ok(FieldContents::TooLarge { limit: max_bytes })
    } else {
        Ok(FieldContents::Read(buffer))
    }
}

fn decode(bytes: Vec<u8>) -> Result<String> {
    String::from_utf8(bytes).map_err(|e| Error::FileParsing {
        message: format!("notes are not valid UTF-8: {e}"),
    })
}

/// The body limit surfaces as a multipart error; keep it a 413.
fn from_multipart_error(error: MultipartError, max_bytes: usize) -> Error {
    if error.status() == StatusCode::PAYLOAD_TOO_LARGE {
        Error::PayloadTooLarge { limit: max_bytes }
    } else {
        Error::FileParsing {
            message: error.body_text(),
        }
    }
}
