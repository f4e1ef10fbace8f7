//! Attachment ingestion: validate an uploaded image and store it under a
//! generated key.
//!
//! # Responsibility
//! - Reject disallowed extensions and oversized payloads as plain
//!   outcomes, not errors.
//! - Stream accepted payloads to `root/<folder>/<key>` without buffering
//!   the whole file.
//! - Remove stored files on request.
//!
//! # Invariants
//! - Keys are `<uuid v4><original extension>` and never collide.
//! - Returned keys carry no path information.
//! - The extension is everything from the last `.` of the file name, so
//!   a bare `.png` counts as a `.png` file.
//! - Extensions are compared case-sensitively: `.PNG` is rejected.
//! - A stored file holds exactly the declared number of bytes; a payload
//!   that is shorter or longer than declared is discarded.
//! - A payload of exactly `MAX_ATTACHMENT_BYTES` is rejected, as is
//!   anything larger.
//! - `folder` is used as given; it must come from trusted code, never from
//!   user input.
//! - No relational store access.

use log::{debug, error, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::fs::{self, OpenOptions};
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use uuid::Uuid;

pub const ALLOWED_EXTENSIONS: [&str; 3] = [".png", ".jpg", ".jpeg"];
pub const MAX_ATTACHMENT_BYTES: u64 = 2_097_152;

/// One uploaded payload as handed over by the caller.
#[derive(Debug)]
pub struct IncomingFile<R> {
    /// Client-side name; only its extension is used.
    pub file_name: String,
    /// Declared byte length; the payload must match it exactly.
    pub length: u64,
    pub content: R,
}

impl<R> IncomingFile<R> {
    pub fn new(file_name: impl Into<String>, length: u64, content: R) -> Self {
        Self {
            file_name: file_name.into(),
            length,
            content,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    ExtensionNotAllowed(Option<String>),
    TooLarge { length: u64, max: u64 },
}

impl Display for RejectReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ExtensionNotAllowed(Some(extension)) => {
                write!(f, "extension `{extension}` is not allowed")
            }
            Self::ExtensionNotAllowed(None) => write!(f, "file has no extension"),
            Self::TooLarge { length, max } => {
                write!(f, "file of {length} bytes reaches the {max} byte limit")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    Stored(String),
    Rejected(RejectReason),
}

impl UploadOutcome {
    pub fn key(&self) -> Option<&str> {
        match self {
            Self::Stored(key) => Some(key),
            Self::Rejected(_) => None,
        }
    }

    pub fn into_key(self) -> Option<String> {
        match self {
            Self::Stored(key) => Some(key),
            Self::Rejected(_) => None,
        }
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self, Self::Rejected(_))
    }
}

/// Failure while storing an accepted payload. Nothing is left on disk.
#[derive(Debug)]
pub enum AttachmentError {
    Io(io::Error),
    /// The payload did not carry the declared number of bytes. `written`
    /// is capped at `declared + 1`.
    LengthMismatch { declared: u64, written: u64 },
}

impl Display for AttachmentError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "attachment io failure: {err}"),
            Self::LengthMismatch { declared, written } if written > declared => write!(
                f,
                "attachment payload is longer than the declared {declared} bytes"
            ),
            Self::LengthMismatch { declared, written } => write!(
                f,
                "attachment payload ended after {written} of {declared} declared bytes"
            ),
        }
    }
}

impl Error for AttachmentError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::LengthMismatch { .. } => None,
        }
    }
}

impl From<io::Error> for AttachmentError {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

/// Stateless attachment store rooted at one writable directory.
#[derive(Debug, Clone)]
pub struct AttachmentService {
    root: PathBuf,
}

impl AttachmentService {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Location of a stored key inside `folder`.
    pub fn resolve(&self, folder: &str, key: &str) -> PathBuf {
        self.root.join(folder).join(key)
    }

    /// Checks name and size; returns the extension to keep on success.
    pub fn check(&self, file_name: &str, length: u64) -> Result<String, RejectReason> {
        let extension = match raw_extension(file_name) {
            Some(extension) if ALLOWED_EXTENSIONS.contains(&extension) => extension.to_string(),
            other => {
                return Err(RejectReason::ExtensionNotAllowed(
                    other.map(str::to_string),
                ))
            }
        };

        if length >= MAX_ATTACHMENT_BYTES {
            return Err(RejectReason::TooLarge {
                length,
                max: MAX_ATTACHMENT_BYTES,
            });
        }

        Ok(extension)
    }

    /// Validates and stores one payload.
    ///
    /// # Errors
    /// Filesystem failures and payloads whose size differs from
    /// `IncomingFile::length`; validation failures are
    /// `UploadOutcome::Rejected`.
    pub fn upload<R: Read>(
        &self,
        file: IncomingFile<R>,
        folder: &str,
    ) -> Result<UploadOutcome, AttachmentError> {
        let extension = match self.check(&file.file_name, file.length) {
            Ok(extension) => extension,
            Err(reason) => return Ok(self.rejected(folder, reason)),
        };

        let folder_path = self.root.join(folder);
        fs::create_dir_all(&folder_path)?;

        let key = generate_key(&extension);
        let path = folder_path.join(&key);
        let outcome = write_payload(&path, file.content.take(file.length.saturating_add(1)))
            .map_err(AttachmentError::from)
            .and_then(|written| ensure_length(file.length, written));
        let written = match outcome {
            Ok(written) => written,
            Err(err) => {
                discard_partial(&path);
                error!(
                    "event=attachment_upload module=attachment status=error folder={} error={}",
                    folder, err
                );
                return Err(err);
            }
        };

        info!(
            "event=attachment_upload module=attachment status=ok folder={} key={} bytes={}",
            folder, key, written
        );
        Ok(UploadOutcome::Stored(key))
    }

    /// Async counterpart of `upload` over `tokio::fs`.
    pub async fn upload_async<R: AsyncRead + Unpin>(
        &self,
        file: IncomingFile<R>,
        folder: &str,
    ) -> Result<UploadOutcome, AttachmentError> {
        let extension = match self.check(&file.file_name, file.length) {
            Ok(extension) => extension,
            Err(reason) => return Ok(self.rejected(folder, reason)),
        };

        let folder_path = self.root.join(folder);
        tokio::fs::create_dir_all(&folder_path).await?;

        let key = generate_key(&extension);
        let path = folder_path.join(&key);
        let outcome =
            write_payload_async(&path, file.content.take(file.length.saturating_add(1)))
                .await
                .map_err(AttachmentError::from)
                .and_then(|written| ensure_length(file.length, written));
        let written = match outcome {
            Ok(written) => written,
            Err(err) => {
                discard_partial_async(&path).await;
                error!(
                    "event=attachment_upload module=attachment status=error folder={} error={}",
                    folder, err
                );
                return Err(err);
            }
        };

        info!(
            "event=attachment_upload module=attachment status=ok folder={} key={} bytes={}",
            folder, key, written
        );
        Ok(UploadOutcome::Stored(key))
    }

    /// Removes `root/<folder>/<key>`; see `delete_path`.
    pub fn delete(&self, folder: &str, key: &str) -> bool {
        self.delete_path(self.resolve(folder, key))
    }

    /// Removes the file if present and reports whether it did.
    ///
    /// Never fails: a missing file yields `false`, other filesystem errors
    /// are logged and also yield `false`.
    pub fn delete_path(&self, path: impl AsRef<Path>) -> bool {
        let path = path.as_ref();
        match fs::remove_file(path) {
            Ok(()) => {
                info!(
                    "event=attachment_delete module=attachment status=ok path={}",
                    path.display()
                );
                true
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!(
                    "event=attachment_delete module=attachment status=missing path={}",
                    path.display()
                );
                false
            }
            Err(err) => {
                warn!(
                    "event=attachment_delete module=attachment status=error path={} error={}",
                    path.display(),
                    err
                );
                false
            }
        }
    }

    fn rejected(&self, folder: &str, reason: RejectReason) -> UploadOutcome {
        info!(
            "event=attachment_upload module=attachment status=rejected folder={} reason=\"{}\"",
            folder, reason
        );
        UploadOutcome::Rejected(reason)
    }
}

/// Extension of the file name part, leading dot included.
///
/// `None` when the name has no dot or ends with one.
fn raw_extension(file_name: &str) -> Option<&str> {
    let name = file_name.rsplit(['/', '\\']).next().unwrap_or(file_name);
    let dot = name.rfind('.')?;
    if dot + 1 == name.len() {
        return None;
    }
    Some(&name[dot..])
}

fn ensure_length(declared: u64, written: u64) -> Result<u64, AttachmentError> {
    if written == declared {
        Ok(written)
    } else {
        Err(AttachmentError::LengthMismatch { declared, written })
    }
}

fn generate_key(extension: &str) -> String {
    format!("{}{extension}", Uuid::new_v4())
}

fn write_payload(path: &Path, mut content: impl Read) -> io::Result<u64> {
    let file = OpenOptions::new().write(true).create_new(true).open(path)?;
    let mut writer = BufWriter::new(file);
    let written = io::copy(&mut content, &mut writer)?;
    writer.flush()?;
    Ok(written)
}

async fn write_payload_async(
    path: &Path,
    mut content: impl AsyncRead + Unpin,
) -> io::Result<u64> {
    let file = tokio::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await?;
    let mut writer = tokio::io::BufWriter::new(file);
    let written = tokio::io::copy(&mut content, &mut writer).await?;
    writer.flush().await?;
    Ok(written)
}

fn discard_partial(path: &Path) {
    if let Err(err) = fs::remove_file(path) {
        if err.kind() != io::ErrorKind::NotFound {
            warn!(
                "event=attachment_cleanup module=attachment status=error path={} error={}",
                path.display(),
                err
            );
        }
    }
}

async fn discard_partial_async(path: &Path) {
    if let Err(err) = tokio::fs::remove_file(path).await {
        if err.kind() != io::ErrorKind::NotFound {
            warn!(
                "event=attachment_cleanup module=attachment status=error path={} error={}",
                path.display(),
                err
            );
        }
    }
}
