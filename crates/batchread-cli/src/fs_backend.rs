//! Tokio-backed read primitive for local files.
//!
//! # Design
//! - `start_read` only schedules work with `spawn_local`; callers must drive a `LocalSet`.
//! - Reads are chunked so `progress` fires once per chunk.
//! - Results are decoded per read mode the way a browser `FileReader` would.

use std::path::{Path, PathBuf};
use std::rc::Rc;

use anyhow::Context;
use base64::{Engine as _, engine::general_purpose};
use batchread_core::{
    FileDescriptor, FileMeta, Lifecycle, ReadBackend, ReadListener, ReadMode, ReadResult,
};
use serde::Serialize;
use tokio::io::AsyncReadExt;

/// Default chunk size between `progress` notifications.
pub(crate) const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

const FALLBACK_DATA_URL_TYPE: &str = "application/octet-stream";

/// A file on the local filesystem, sized at selection time.
#[derive(Debug, Clone)]
pub(crate) struct LocalFile {
    path: PathBuf,
    name: String,
    content_type: String,
    size: u64,
}

impl LocalFile {
    /// Stat `path` and guess its content type from the extension.
    pub(crate) async fn open(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let metadata = tokio::fs::metadata(path)
            .await
            .with_context(|| format!("failed to stat '{}'", path.display()))?;
        if !metadata.is_file() {
            anyhow::bail!("'{}' is not a regular file", path.display());
        }
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self {
            path: path.to_path_buf(),
            content_type: content_type_for(&name).to_string(),
            name,
            size: metadata.len(),
        })
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }
}

impl FileMeta for LocalFile {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn content_type(&self) -> String {
        self.content_type.clone()
    }

    fn size(&self) -> u64 {
        self.size
    }
}

/// Guess a MIME type from a file name; unknown extensions yield `""`.
pub(crate) fn content_type_for(name: &str) -> &'static str {
    let (_, extension) = batchread_core::split_name(name);
    match extension.to_ascii_lowercase().as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "bmp" => "image/bmp",
        "txt" | "log" => "text/plain",
        "md" => "text/markdown",
        "csv" => "text/csv",
        "html" | "htm" => "text/html",
        "css" => "text/css",
        "js" => "text/javascript",
        "json" => "application/json",
        "xml" => "application/xml",
        "pdf" => "application/pdf",
        "zip" => "application/zip",
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        _ => "",
    }
}

/// Decoded contents delivered with a `load` notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ReadOutput {
    Bytes(Vec<u8>),
    Text(String),
}

impl ReadOutput {
    /// Decode raw bytes the way the requested read mode would.
    pub(crate) fn decode(bytes: Vec<u8>, mode: ReadMode, content_type: &str) -> Self {
        match mode {
            ReadMode::ArrayBuffer => Self::Bytes(bytes),
            ReadMode::BinaryString => Self::Text(bytes.iter().map(|byte| char::from(*byte)).collect()),
            ReadMode::Text => Self::Text(String::from_utf8_lossy(&bytes).into_owned()),
            ReadMode::DataUrl => {
                let media_type = if content_type.is_empty() {
                    FALLBACK_DATA_URL_TYPE
                } else {
                    content_type
                };
                Self::Text(format!(
                    "data:{media_type};base64,{}",
                    general_purpose::STANDARD.encode(bytes)
                ))
            }
        }
    }

    /// Length of the decoded value (bytes or characters).
    pub(crate) fn len(&self) -> usize {
        match self {
            Self::Bytes(bytes) => bytes.len(),
            Self::Text(text) => text.chars().count(),
        }
    }
}

/// Payload attached to every lifecycle notification.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct FsEvent {
    pub(crate) loaded: u64,
    pub(crate) total: u64,
    #[serde(skip)]
    pub(crate) mode: ReadMode,
    #[serde(skip)]
    pub(crate) result: Option<ReadOutput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) error: Option<String>,
}

impl FsEvent {
    const fn progress(loaded: u64, total: u64, mode: ReadMode) -> Self {
        Self {
            loaded,
            total,
            mode,
            result: None,
            error: None,
        }
    }
}

/// Local filesystem implementation of the read capability.
#[derive(Debug, Clone)]
pub(crate) struct FsBackend {
    chunk_size: usize,
}

impl Default for FsBackend {
    fn default() -> Self {
        Self::with_chunk_size(DEFAULT_CHUNK_SIZE)
    }
}

impl FsBackend {
    pub(crate) fn with_chunk_size(chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
        }
    }
}

impl ReadBackend for FsBackend {
    type Handle = LocalFile;
    type Event = FsEvent;

    fn start_read(
        &self,
        file: &Rc<FileDescriptor<LocalFile>>,
        mode: ReadMode,
        listener: ReadListener<LocalFile, FsEvent>,
    ) -> ReadResult<()> {
        let file = file.clone();
        let chunk_size = self.chunk_size;
        tokio::task::spawn_local(async move {
            read_file(&file, mode, chunk_size, &listener).await;
        });
        Ok(())
    }
}

async fn read_file(
    file: &FileDescriptor<LocalFile>,
    mode: ReadMode,
    chunk_size: usize,
    listener: &ReadListener<LocalFile, FsEvent>,
) {
    let total = file.size();
    listener.notify(Lifecycle::LoadStart, &FsEvent::progress(0, total, mode));

    let mut loaded = 0;
    match read_chunks(file.handle().path(), chunk_size, total, mode, &mut loaded, listener).await {
        Ok(bytes) => {
            let result = ReadOutput::decode(bytes, mode, file.content_type());
            listener.notify(
                Lifecycle::Load,
                &FsEvent {
                    result: Some(result),
                    ..FsEvent::progress(loaded, total, mode)
                },
            );
        }
        Err(err) => {
            listener.notify(
                Lifecycle::Error,
                &FsEvent {
                    error: Some(format!("{err:#}")),
                    ..FsEvent::progress(loaded, total, mode)
                },
            );
        }
    }

    listener.notify(Lifecycle::LoadEnd, &FsEvent::progress(loaded, total, mode));
}

async fn read_chunks(
    path: &Path,
    chunk_size: usize,
    total: u64,
    mode: ReadMode,
    loaded: &mut u64,
    listener: &ReadListener<LocalFile, FsEvent>,
) -> anyhow::Result<Vec<u8>> {
    let mut handle = tokio::fs::File::open(path)
        .await
        .with_context(|| format!("failed to open '{}'", path.display()))?;
    let mut contents = Vec::with_capacity(usize::try_from(total).unwrap_or_default());
    let mut buffer = vec![0_u8; chunk_size];
    loop {
        let read = handle
            .read(&mut buffer)
            .await
            .with_context(|| format!("failed to read '{}'", path.display()))?;
        if read == 0 {
            break;
        }
        contents.extend_from_slice(&buffer[..read]);
        *loaded += read as u64;
        listener.notify(
            Lifecycle::Progress,
            &FsEvent::progress(*loaded, total.max(*loaded), mode),
        );
    }
    Ok(contents)
}
