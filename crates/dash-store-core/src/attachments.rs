//! Attachment persistence with two storage strategies.
//!
//! Small files are stored inline in the record store. Files larger than
//! [`INLINE_LIMIT_BYTES`] are written to an external target chosen through
//! the platform's save picker, and only the handle is stored. Any failure
//! on the external path falls back to inline storage, so a save succeeds
//! whenever the source can be read and the store accepts the record.
//!
//! Export resolves either kind back to bytes and delivers them through
//! the stored handle when possible, otherwise as a generic download.
//! Callers never look at the storage mode.

use std::borrow::Cow;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::models::{AttachmentRecord, AttachmentStorage, AttachmentSummary, FileHandle};
use crate::platform::{write_and_close, IncomingFile, Platform, PlatformError, PlatformResult};
use crate::store::StoreBackend;

/// Files strictly larger than this are offered external storage.
pub const INLINE_LIMIT_BYTES: u64 = 5 * 1024 * 1024;

/// How an export ended. None of these are errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportOutcome {
    /// Written back through the stored external handle.
    DeliveredViaHandle,
    /// Delivered through the generic download path.
    Downloaded,
    /// No attachment with that id.
    NotFound,
    /// The external file is gone or no longer matches what was saved.
    HandleExpired,
}

/// Result of an interactive multi-file upload.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct UploadReport {
    pub saved: Vec<i64>,
    pub failed: Vec<UploadFailure>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UploadFailure {
    pub name: String,
    pub error: String,
}

pub struct AttachmentManager {
    backend: Arc<dyn StoreBackend>,
    platform: Arc<dyn Platform>,
}

impl AttachmentManager {
    pub fn new(backend: Arc<dyn StoreBackend>, platform: Arc<dyn Platform>) -> Self {
        Self { backend, platform }
    }

    /// Persist `file` and return the new attachment id.
    ///
    /// Errors only when the source cannot be read or the store rejects the
    /// record. Problems with external storage are reported to the user and
    /// the file is stored inline instead.
    pub async fn save_attachment(&self, file: &dyn IncomingFile) -> Result<i64> {
        let bytes = file
            .bytes()
            .await
            .with_context(|| format!("Failed to read {}", file.name()))?;

        let size = bytes.len() as u64;
        let digest = checksum(&bytes);
        let external = if file.size() > INLINE_LIMIT_BYTES {
            self.try_external(file, &bytes).await
        } else {
            None
        };
        let storage = match external {
            Some(handle) => AttachmentStorage::ExternalHandle { handle },
            None => AttachmentStorage::Inline { payload: bytes },
        };

        let record = AttachmentRecord {
            id: 0,
            name: file.name().to_string(),
            mime: file.mime().to_string(),
            size,
            created_at: Utc::now(),
            checksum: digest,
            storage,
        };
        let id = self.backend.add_attachment(&record).await?;

        info!(
            id,
            file = %record.name,
            size = record.size,
            mode = record.storage.mode().as_str(),
            "attachment stored"
        );
        Ok(id)
    }

    /// External storage attempt. `None` means store inline.
    async fn try_external(&self, file: &dyn IncomingFile, bytes: &[u8]) -> Option<FileHandle> {
        match self.store_external(file, bytes).await {
            Ok(handle) => Some(handle),
            Err(PlatformError::CapabilityUnavailable(capability)) => {
                debug!(file = file.name(), capability, "external storage unavailable, storing inline");
                None
            }
            Err(e) => {
                warn!(file = file.name(), error = %e, "external storage failed, storing inline");
                self.platform.notifier().notice(&format!(
                    "Could not save {} to an external file ({}). Stored it in the app instead.",
                    file.name(),
                    e
                ));
                None
            }
        }
    }

    async fn store_external(&self, file: &dyn IncomingFile, bytes: &[u8]) -> PlatformResult<FileHandle> {
        let picker = self
            .platform
            .save_picker()
            .ok_or(PlatformError::CapabilityUnavailable("save file picker"))?;

        let handle = picker.pick_save_target(file.name(), file.mime()).await?;
        let stream = self.platform.file_handles().create_writable(&handle).await?;
        write_and_close(stream, bytes).await?;
        Ok(handle)
    }

    /// Deliver the attachment's bytes to the user.
    ///
    /// Only a failure of the generic download path or of the store is an
    /// error; everything else is an [`ExportOutcome`].
    pub async fn export_attachment(&self, id: i64) -> Result<ExportOutcome> {
        let Some(record) = self.backend.get_attachment(id).await? else {
            warn!(id, "export requested for unknown attachment");
            self.platform.notifier().notice("File not found.");
            return Ok(ExportOutcome::NotFound);
        };

        let bytes: Cow<'_, [u8]> = match &record.storage {
            AttachmentStorage::Inline { payload } => Cow::Borrowed(payload),
            AttachmentStorage::ExternalHandle { handle } => match self.read_external(&record, handle).await {
                Ok(bytes) => Cow::Owned(bytes),
                Err(e) => {
                    warn!(id, handle = %handle, error = %e, "external attachment unreadable");
                    self.platform.notifier().notice(&format!(
                        "{} is no longer available at {}.",
                        record.name, handle
                    ));
                    return Ok(ExportOutcome::HandleExpired);
                }
            },
        };

        if let AttachmentStorage::ExternalHandle { handle } = &record.storage {
            if self.platform.save_picker().is_some() {
                match self.deliver_via_handle(handle, &bytes).await {
                    Ok(()) => {
                        info!(id, handle = %handle, "attachment exported via file handle");
                        return Ok(ExportOutcome::DeliveredViaHandle);
                    }
                    Err(e) => {
                        warn!(id, handle = %handle, error = %e, "export via file handle failed, downloading instead");
                    }
                }
            }
        }

        self.download(&record, &bytes).await?;
        info!(id, file = %record.name, "attachment exported via download");
        Ok(ExportOutcome::Downloaded)
    }

    async fn read_external(&self, record: &AttachmentRecord, handle: &FileHandle) -> PlatformResult<Vec<u8>> {
        let bytes = self.platform.file_handles().read(handle).await?;
        if bytes.len() as u64 != record.size || checksum(&bytes) != record.checksum {
            return Err(PlatformError::HandleExpired(format!(
                "{} changed since it was saved",
                handle
            )));
        }
        Ok(bytes)
    }

    async fn deliver_via_handle(&self, handle: &FileHandle, bytes: &[u8]) -> PlatformResult<()> {
        let stream = self.platform.file_handles().create_writable(handle).await?;
        write_and_close(stream, bytes).await
    }

    async fn download(&self, record: &AttachmentRecord, bytes: &[u8]) -> Result<()> {
        let downloader = self.platform.downloader();
        let staged = downloader
            .stage(&record.name, &record.mime, bytes)
            .await
            .with_context(|| format!("Failed to stage download of {}", record.name))?;

        let triggered = downloader.trigger(&staged).await;
        downloader.release(staged).await;

        triggered.with_context(|| format!("Failed to download {}", record.name))
    }

    /// Let the user pick files and save each one.
    ///
    /// Uses the open-file picker when the platform has one and falls back
    /// to the generic file input when it is missing, fails, or is
    /// cancelled. Files are saved one at a time; a failed file is reported
    /// and the rest still get saved.
    pub async fn upload_interactive(&self) -> Result<UploadReport> {
        let files = self.choose_files().await?;

        let mut report = UploadReport::default();
        for file in &files {
            match self.save_attachment(file.as_ref()).await {
                Ok(id) => report.saved.push(id),
                Err(e) => {
                    warn!(file = file.name(), error = %e, "attachment upload failed");
                    self.platform
                        .notifier()
                        .notice(&format!("Could not save {}: {:#}", file.name(), e));
                    report.failed.push(UploadFailure {
                        name: file.name().to_string(),
                        error: format!("{:#}", e),
                    });
                }
            }
        }
        Ok(report)
    }

    async fn choose_files(&self) -> Result<Vec<Box<dyn IncomingFile>>> {
        if let Some(picker) = self.platform.open_picker() {
            match picker.pick_files().await {
                Ok(files) if !files.is_empty() => return Ok(files),
                Ok(_) | Err(PlatformError::UserCancelled) => {
                    debug!("open file picker cancelled, using file input");
                }
                Err(e) => warn!(error = %e, "open file picker failed, using file input"),
            }
        }

        match self.platform.file_input().choose_files().await {
            Ok(files) => Ok(files),
            Err(PlatformError::UserCancelled) => Ok(Vec::new()),
            Err(e) => Err(e).context("File input failed"),
        }
    }

    /// Attachment metadata, without payloads.
    pub async fn list(&self) -> Result<Vec<AttachmentSummary>> {
        self.backend.list_attachments().await
    }
}

/// `sha256:<hex>` of `bytes`.
pub fn checksum(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("sha256:{:x}", hasher.finalize())
}
