//! Local-filesystem [`Platform`] for the `dash` CLI.
//!
//! | Capability | Filesystem behavior |
//! |------------|---------------------|
//! | Save picker | A fresh path under `attachments.external_dir` (only when configured) |
//! | File handles | Absolute file paths; writes go to a `.part` file renamed on close |
//! | Open picker | The paths given on the command line |
//! | File input | Newline-separated paths read from stdin |
//! | Downloader | Staged under `downloads_dir` as a hidden `.part` file, copied to its final name on trigger |
//! | Notifier | stderr |

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::fs;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, warn};

use dash_store_core::platform::{
    Downloader, FileHandles, FileInput, IncomingFile, Notifier, OpenFilePicker, Platform,
    PlatformError, PlatformResult, SaveFilePicker, StagedDownload, WritableStream,
};
use dash_store_core::FileHandle;

use crate::config::AttachmentsConfig;

pub struct FsPlatform {
    external_dir: Option<PathBuf>,
    downloads_dir: PathBuf,
    selection: Vec<PathBuf>,
    delivered: Mutex<Vec<PathBuf>>,
}

impl FsPlatform {
    pub fn new(config: &AttachmentsConfig) -> Self {
        Self {
            external_dir: config.external_dir.clone(),
            downloads_dir: config.downloads_dir.clone(),
            selection: Vec::new(),
            delivered: Mutex::new(Vec::new()),
        }
    }

    /// Files the open picker returns. With no selection the picker reports
    /// a cancel and the stdin file input is used instead.
    pub fn with_selection(mut self, paths: Vec<PathBuf>) -> Self {
        self.selection = paths;
        self
    }

    /// Final paths of every download triggered so far.
    pub fn delivered(&self) -> Vec<PathBuf> {
        self.delivered.lock().unwrap().clone()
    }
}

/// First free path for `name` in `dir`, adding ` (1)`, ` (2)`, ... before
/// the extension when taken. Directory parts of `name` are dropped.
async fn unique_path(dir: &Path, name: &str) -> PathBuf {
    let file_name = Path::new(name)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| "attachment".to_string());

    let candidate = dir.join(&file_name);
    if !fs::try_exists(&candidate).await.unwrap_or(false) {
        return candidate;
    }

    let as_path = Path::new(&file_name);
    let stem = as_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = as_path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    let mut n = 1;
    loop {
        let candidate = dir.join(format!("{} ({}){}", stem, n, ext));
        if !fs::try_exists(&candidate).await.unwrap_or(false) {
            return candidate;
        }
        n += 1;
    }
}

fn part_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".part");
    PathBuf::from(name)
}

/// A file on disk offered for upload.
pub struct DiskFile {
    path: PathBuf,
    name: String,
    mime: String,
    size: u64,
}

impl DiskFile {
    /// Describe `path`. An unreadable path still yields a `DiskFile`; the
    /// failure surfaces when its bytes are read.
    pub async fn open(path: PathBuf) -> Self {
        let size = fs::metadata(&path).await.map(|m| m.len()).unwrap_or(0);
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let mime = mime_guess::from_path(&path).first_or_octet_stream().to_string();
        Self {
            path,
            name,
            mime,
            size,
        }
    }
}

#[async_trait]
impl IncomingFile for DiskFile {
    fn name(&self) -> &str {
        &self.name
    }

    fn mime(&self) -> &str {
        &self.mime
    }

    fn size(&self) -> u64 {
        self.size
    }

    async fn bytes(&self) -> PlatformResult<Vec<u8>> {
        Ok(fs::read(&self.path).await?)
    }
}

struct FsWriter {
    target: PathBuf,
    part: PathBuf,
    file: fs::File,
    failed: bool,
}

#[async_trait]
impl WritableStream for FsWriter {
    async fn write(&mut self, bytes: &[u8]) -> PlatformResult<()> {
        let result = self.file.write_all(bytes).await;
        self.failed |= result.is_err();
        Ok(result?)
    }

    async fn close(self: Box<Self>) -> PlatformResult<()> {
        let FsWriter {
            target,
            part,
            mut file,
            failed,
        } = *self;

        if failed {
            drop(file);
            if let Err(e) = fs::remove_file(&part).await {
                debug!(part = %part.display(), error = %e, "fs_platform: could not remove partial file");
            }
            return Ok(());
        }

        file.flush().await?;
        file.sync_all().await?;
        drop(file);
        fs::rename(&part, &target).await.map_err(|e| {
            warn!(from = %part.display(), to = %target.display(), error = %e, "fs_platform: rename failed");
            e
        })?;
        debug!(path = %target.display(), "fs_platform: file committed");
        Ok(())
    }
}

#[async_trait]
impl SaveFilePicker for FsPlatform {
    async fn pick_save_target(&self, suggested_name: &str, _mime: &str) -> PlatformResult<FileHandle> {
        let dir = self
            .external_dir
            .as_ref()
            .ok_or(PlatformError::CapabilityUnavailable("save file picker"))?;
        fs::create_dir_all(dir).await?;

        let path = unique_path(dir, suggested_name).await;
        let path = std::path::absolute(&path).unwrap_or(path);
        Ok(FileHandle::new(path.to_string_lossy()))
    }
}

#[async_trait]
impl FileHandles for FsPlatform {
    async fn create_writable(&self, handle: &FileHandle) -> PlatformResult<Box<dyn WritableStream>> {
        let target = PathBuf::from(handle.as_str());
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).await?;
        }
        let part = part_path(&target);
        let file = fs::File::create(&part).await?;
        Ok(Box::new(FsWriter {
            target,
            part,
            file,
            failed: false,
        }))
    }

    async fn read(&self, handle: &FileHandle) -> PlatformResult<Vec<u8>> {
        match fs::read(handle.as_str()).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(PlatformError::HandleExpired(handle.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl OpenFilePicker for FsPlatform {
    async fn pick_files(&self) -> PlatformResult<Vec<Box<dyn IncomingFile>>> {
        if self.selection.is_empty() {
            return Err(PlatformError::UserCancelled);
        }
        let mut files: Vec<Box<dyn IncomingFile>> = Vec::with_capacity(self.selection.len());
        for path in &self.selection {
            files.push(Box::new(DiskFile::open(path.clone()).await));
        }
        Ok(files)
    }
}

#[async_trait]
impl FileInput for FsPlatform {
    async fn choose_files(&self) -> PlatformResult<Vec<Box<dyn IncomingFile>>> {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut files: Vec<Box<dyn IncomingFile>> = Vec::new();
        while let Some(line) = lines.next_line().await? {
            let line = line.trim();
            if !line.is_empty() {
                files.push(Box::new(DiskFile::open(PathBuf::from(line)).await));
            }
        }
        Ok(files)
    }
}

#[async_trait]
impl Downloader for FsPlatform {
    async fn stage(&self, name: &str, _mime: &str, bytes: &[u8]) -> PlatformResult<StagedDownload> {
        fs::create_dir_all(&self.downloads_dir).await?;
        let staged = self
            .downloads_dir
            .join(format!(".{}.part", uuid::Uuid::new_v4()));
        fs::write(&staged, bytes).await?;
        Ok(StagedDownload {
            token: staged.to_string_lossy().into_owned(),
            name: name.to_string(),
        })
    }

    async fn trigger(&self, staged: &StagedDownload) -> PlatformResult<()> {
        let target = unique_path(&self.downloads_dir, &staged.name).await;
        fs::copy(&staged.token, &target).await?;
        debug!(path = %target.display(), "fs_platform: download delivered");
        self.delivered.lock().unwrap().push(target);
        Ok(())
    }

    async fn release(&self, staged: StagedDownload) {
        if let Err(e) = fs::remove_file(&staged.token).await {
            warn!(token = %staged.token, error = %e, "fs_platform: could not release staged download");
        }
    }
}

impl Notifier for FsPlatform {
    fn notice(&self, message: &str) {
        eprintln!("notice: {}", message);
    }
}

impl Platform for FsPlatform {
    fn save_picker(&self) -> Option<&dyn SaveFilePicker> {
        self.external_dir.as_ref().map(|_| self as &dyn SaveFilePicker)
    }

    fn file_handles(&self) -> &dyn FileHandles {
        self
    }

    fn open_picker(&self) -> Option<&dyn OpenFilePicker> {
        Some(self)
    }

    fn file_input(&self) -> &dyn FileInput {
        self
    }

    fn downloader(&self) -> &dyn Downloader {
        self
    }

    fn notifier(&self) -> &dyn Notifier {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dash_store_core::platform::write_and_close;
    use tempfile::TempDir;

    fn platform(tmp: &TempDir, external: bool) -> FsPlatform {
        FsPlatform::new(&AttachmentsConfig {
            external_dir: external.then(|| tmp.path().join("files")),
            downloads_dir: tmp.path().join("downloads"),
        })
    }

    #[tokio::test]
    async fn test_save_picker_requires_external_dir() {
        let tmp = TempDir::new().unwrap();
        assert!(platform(&tmp, false).save_picker().is_none());
        assert!(platform(&tmp, true).save_picker().is_some());
    }

    #[tokio::test]
    async fn test_writable_commits_on_close() {
        let tmp = TempDir::new().unwrap();
        let fs_platform = platform(&tmp, true);

        let handle = fs_platform.pick_save_target("report.pdf", "application/pdf").await.unwrap();
        let stream = fs_platform.create_writable(&handle).await.unwrap();
        write_and_close(stream, b"%PDF-1.7").await.unwrap();

        assert_eq!(fs_platform.read(&handle).await.unwrap(), b"%PDF-1.7");
        assert!(!part_path(Path::new(handle.as_str())).exists());
    }

    #[tokio::test]
    async fn test_picked_names_do_not_collide() {
        let tmp = TempDir::new().unwrap();
        let fs_platform = platform(&tmp, true);

        let first = fs_platform.pick_save_target("a.txt", "text/plain").await.unwrap();
        let stream = fs_platform.create_writable(&first).await.unwrap();
        write_and_close(stream, b"1").await.unwrap();
        let second = fs_platform.pick_save_target("a.txt", "text/plain").await.unwrap();

        assert_ne!(first, second);
        assert!(second.as_str().ends_with("a (1).txt"));
    }

    #[tokio::test]
    async fn test_missing_file_is_expired_handle() {
        let tmp = TempDir::new().unwrap();
        let fs_platform = platform(&tmp, true);
        let handle = FileHandle::new(tmp.path().join("gone.bin").to_string_lossy());

        let err = fs_platform.read(&handle).await.unwrap_err();
        assert!(matches!(err, PlatformError::HandleExpired(_)));
    }

    #[tokio::test]
    async fn test_download_staging_is_released() {
        let tmp = TempDir::new().unwrap();
        let fs_platform = platform(&tmp, false);

        let staged = fs_platform.stage("notes.txt", "text/plain", b"hello").await.unwrap();
        fs_platform.trigger(&staged).await.unwrap();
        fs_platform.release(staged).await;

        let downloads = tmp.path().join("downloads");
        assert_eq!(std::fs::read(downloads.join("notes.txt")).unwrap(), b"hello");
        let leftovers: Vec<_> = std::fs::read_dir(&downloads)
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(leftovers.len(), 1);
        assert_eq!(fs_platform.delivered(), vec![downloads.join("notes.txt")]);
    }

    #[tokio::test]
    async fn test_empty_selection_counts_as_cancel() {
        let tmp = TempDir::new().unwrap();
        let fs_platform = platform(&tmp, false);
        let err = fs_platform.pick_files().await.err().unwrap();
        assert!(matches!(err, PlatformError::UserCancelled));
    }

    #[tokio::test]
    async fn test_disk_file_describes_path() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("photo.png");
        std::fs::write(&path, [1u8, 2, 3]).unwrap();

        let file = DiskFile::open(path).await;
        assert_eq!(file.name(), "photo.png");
        assert_eq!(file.mime(), "image/png");
        assert_eq!(file.size(), 3);
        assert_eq!(file.bytes().await.unwrap(), vec![1, 2, 3]);
    }
}
