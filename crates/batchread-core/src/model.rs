//! File descriptors and batch groups.
//!
//! # Design
//! - A descriptor is built once at intake and never mutated afterwards.
//! - Descriptors and groups are shared through `Rc`; the coordinator is single-threaded.

use std::cell::Cell;
use std::rc::Rc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::format::{pretty_size, split_name};
use crate::ids::{FileId, GroupId};

/// Metadata every raw file handle must expose to the coordinator.
pub trait FileMeta {
    /// File name including extension.
    fn name(&self) -> String;
    /// MIME content type; empty when the host could not determine one.
    fn content_type(&self) -> String;
    /// Size in bytes.
    fn size(&self) -> u64;
}

/// Display fields derived from the file name and size.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileExtra {
    /// Name up to (not including) the last `.`.
    pub name_no_extension: String,
    /// Text after the last `.`, empty when there is none.
    pub extension: String,
    /// Human-readable size, e.g. `1.50 kb`.
    pub pretty_size: String,
}

impl FileExtra {
    /// Derive display fields from a name and byte count.
    #[must_use]
    pub fn derive(name: &str, size: u64) -> Self {
        let (stem, extension) = split_name(name);
        Self {
            name_no_extension: stem.to_string(),
            extension: extension.to_string(),
            pretty_size: pretty_size(size),
        }
    }
}

/// A raw file handle augmented with identity and display metadata.
#[derive(Debug)]
pub struct FileDescriptor<H> {
    handle: H,
    id: FileId,
    group_id: GroupId,
    name: String,
    content_type: String,
    size: u64,
    extra: FileExtra,
}

impl<H: FileMeta> FileDescriptor<H> {
    /// Augment `handle` with a fresh file id inside `group_id`.
    #[must_use]
    pub fn intake(handle: H, group_id: GroupId) -> Self {
        let name = handle.name();
        let content_type = handle.content_type();
        let size = handle.size();
        let extra = FileExtra::derive(&name, size);
        Self {
            handle,
            id: FileId::next(),
            group_id,
            name,
            content_type,
            size,
            extra,
        }
    }
}

impl<H> FileDescriptor<H> {
    /// Underlying host handle.
    pub const fn handle(&self) -> &H {
        &self.handle
    }

    /// Process-unique file identifier.
    #[must_use]
    pub const fn id(&self) -> FileId {
        self.id
    }

    /// Identifier of the batch this file arrived in.
    #[must_use]
    pub const fn group_id(&self) -> GroupId {
        self.group_id
    }

    /// File name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// MIME content type.
    #[must_use]
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// Size in bytes.
    #[must_use]
    pub const fn size(&self) -> u64 {
        self.size
    }

    /// Derived display fields.
    #[must_use]
    pub const fn extra(&self) -> &FileExtra {
        &self.extra
    }

    /// Serializable snapshot without the host handle.
    #[must_use]
    pub fn summary(&self) -> FileSummary {
        FileSummary {
            file_id: self.id,
            group_id: self.group_id,
            name: self.name.clone(),
            content_type: self.content_type.clone(),
            size: self.size,
            extra: self.extra.clone(),
        }
    }
}

/// Handle-free view of a [`FileDescriptor`] for rendering and logs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSummary {
    /// Process-unique file identifier.
    pub file_id: FileId,
    /// Owning batch.
    pub group_id: GroupId,
    /// File name.
    pub name: String,
    /// MIME content type.
    #[serde(rename = "type")]
    pub content_type: String,
    /// Size in bytes.
    pub size: u64,
    /// Derived display fields.
    pub extra: FileExtra,
}

/// Files introduced together by one selection or drop.
#[derive(Debug)]
pub struct FileGroup<H> {
    id: GroupId,
    files: Vec<Rc<FileDescriptor<H>>>,
    started: DateTime<Utc>,
    ended: Cell<Option<DateTime<Utc>>>,
}

impl<H> FileGroup<H> {
    pub(crate) fn new(id: GroupId, files: Vec<Rc<FileDescriptor<H>>>) -> Self {
        Self {
            id,
            files,
            started: Utc::now(),
            ended: Cell::new(None),
        }
    }

    /// Batch identifier.
    #[must_use]
    pub const fn id(&self) -> GroupId {
        self.id
    }

    /// Every file of the batch in intake order, skipped ones included.
    #[must_use]
    pub fn files(&self) -> &[Rc<FileDescriptor<H>>] {
        &self.files
    }

    /// Number of files in the batch.
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Whether the batch carried no files.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// When the batch was taken in.
    #[must_use]
    pub const fn started(&self) -> DateTime<Utc> {
        self.started
    }

    /// When the last read finished, once the batch is complete.
    #[must_use]
    pub fn ended(&self) -> Option<DateTime<Utc>> {
        self.ended.get()
    }

    /// Wall-clock milliseconds between intake and completion.
    #[must_use]
    pub fn load_time_ms(&self) -> Option<i64> {
        self.ended()
            .map(|ended| (ended - self.started).num_milliseconds())
    }

    pub(crate) fn mark_ended(&self) {
        self.ended.set(Some(Utc::now()));
    }
}
