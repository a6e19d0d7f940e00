//! Platform capabilities the attachment manager depends on.
//!
//! Each capability is a trait so the core never touches a real file
//! system, dialog, or browser. Optional capabilities are exposed as
//! `Option<&dyn ...>` on [`Platform`]; `None` means the host cannot do it
//! at all, which is not an error.
//!
//! | Capability | Role |
//! |------------|------|
//! | [`SaveFilePicker`] | Ask the user for an external save target |
//! | [`FileHandles`] | Open a writable stream on, or read back, a stored handle |
//! | [`OpenFilePicker`] | Modern multi-file open dialog |
//! | [`FileInput`] | Generic multi-file input, always available |
//! | [`Downloader`] | Stage bytes, trigger a client-side save, release |
//! | [`Notifier`] | Non-fatal, user-visible notices |

use async_trait::async_trait;

use crate::models::FileHandle;

/// Failure taxonomy for platform capabilities.
///
/// The attachment manager absorbs every variant into a fallback; none of
/// them reach its callers.
#[derive(Debug, thiserror::Error)]
pub enum PlatformError {
    #[error("capability unavailable: {0}")]
    CapabilityUnavailable(&'static str),

    #[error("cancelled by user")]
    UserCancelled,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("file handle no longer valid: {0}")]
    HandleExpired(String),
}

pub type PlatformResult<T> = std::result::Result<T, PlatformError>;

/// A file chosen by the user, not yet read.
#[async_trait]
pub trait IncomingFile: Send + Sync {
    fn name(&self) -> &str;

    fn mime(&self) -> &str;

    /// Declared size in bytes.
    fn size(&self) -> u64;

    /// Read the whole file.
    async fn bytes(&self) -> PlatformResult<Vec<u8>>;
}

/// An [`IncomingFile`] already held in memory.
#[derive(Debug, Clone)]
pub struct MemoryFile {
    pub name: String,
    pub mime: String,
    pub data: Vec<u8>,
}

impl MemoryFile {
    pub fn new(name: impl Into<String>, mime: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime: mime.into(),
            data,
        }
    }
}

#[async_trait]
impl IncomingFile for MemoryFile {
    fn name(&self) -> &str {
        &self.name
    }

    fn mime(&self) -> &str {
        &self.mime
    }

    fn size(&self) -> u64 {
        self.data.len() as u64
    }

    async fn bytes(&self) -> PlatformResult<Vec<u8>> {
        Ok(self.data.clone())
    }
}

#[async_trait]
pub trait SaveFilePicker: Send + Sync {
    /// Ask for a save target, suggesting a file name and type.
    async fn pick_save_target(&self, suggested_name: &str, mime: &str) -> PlatformResult<FileHandle>;
}

/// Operations on handles returned by a [`SaveFilePicker`].
#[async_trait]
pub trait FileHandles: Send + Sync {
    /// Open a scoped writable stream that replaces the handle's content.
    async fn create_writable(&self, handle: &FileHandle) -> PlatformResult<Box<dyn WritableStream>>;

    /// Read the handle's full content.
    async fn read(&self, handle: &FileHandle) -> PlatformResult<Vec<u8>>;
}

/// A scoped writer. Content is committed by [`close`](WritableStream::close).
#[async_trait]
pub trait WritableStream: Send {
    async fn write(&mut self, bytes: &[u8]) -> PlatformResult<()>;

    async fn close(self: Box<Self>) -> PlatformResult<()>;
}

#[async_trait]
pub trait OpenFilePicker: Send + Sync {
    /// Let the user pick one or more files.
    async fn pick_files(&self) -> PlatformResult<Vec<Box<dyn IncomingFile>>>;
}

#[async_trait]
pub trait FileInput: Send + Sync {
    /// Let the user choose files. An empty list means nothing was chosen.
    async fn choose_files(&self) -> PlatformResult<Vec<Box<dyn IncomingFile>>>;
}

/// Bytes staged for a client-side save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedDownload {
    /// Opaque platform reference to the staged resource.
    pub token: String,
    pub name: String,
}

#[async_trait]
pub trait Downloader: Send + Sync {
    async fn stage(&self, name: &str, mime: &str, bytes: &[u8]) -> PlatformResult<StagedDownload>;

    async fn trigger(&self, staged: &StagedDownload) -> PlatformResult<()>;

    /// Free the staged resource. Must be safe to call after a failed trigger.
    async fn release(&self, staged: StagedDownload);
}

pub trait Notifier: Send + Sync {
    fn notice(&self, message: &str);
}

/// Everything the attachment manager needs from its host.
pub trait Platform: Send + Sync {
    fn save_picker(&self) -> Option<&dyn SaveFilePicker>;

    fn file_handles(&self) -> &dyn FileHandles;

    fn open_picker(&self) -> Option<&dyn OpenFilePicker>;

    fn file_input(&self) -> &dyn FileInput;

    fn downloader(&self) -> &dyn Downloader;

    fn notifier(&self) -> &dyn Notifier;
}

/// Write `bytes` and close the stream. The stream is closed even when the
/// write fails; the write error wins.
pub async fn write_and_close(mut stream: Box<dyn WritableStream>, bytes: &[u8]) -> PlatformResult<()> {
    let written = stream.write(bytes).await;
    let closed = stream.close().await;
    written.and(closed)
}
