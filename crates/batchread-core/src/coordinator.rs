//! Batch read coordination.
//!
//! # Design
//! - Every batch gets a fresh group id and every file a fresh file id at intake.
//! - Skipped files are excluded from the remaining count, so a batch whose
//!   files were all skipped completes immediately after the `skip` hooks.
//! - Intake holds one slot of the remaining count, so `groupend` is always the
//!   last notification of a batch, even when reads finish synchronously.
//! - Each accepted file gets its own [`ReadListener`] closed over that file;
//!   the listener forwards lifecycle events and counts `loadend` exactly once.
//! - All state is `Rc`/`Cell` based: reads complete on a single-threaded event loop.

use std::cell::Cell;
use std::fmt::{self, Debug, Formatter};
use std::rc::Rc;

use tracing::{debug, trace, warn};

use crate::error::ReadResult;
use crate::ids::GroupId;
use crate::model::{FileDescriptor, FileGroup, FileMeta};
use crate::options::{Callbacks, OptionsOverride, ReadMode, ReaderOptions};

/// Lifecycle notifications delivered by a read primitive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Lifecycle {
    /// Read started.
    LoadStart,
    /// Bytes were consumed.
    Progress,
    /// Read succeeded.
    Load,
    /// Read was aborted.
    Abort,
    /// Read failed.
    Error,
    /// Read finished, whatever the outcome.
    LoadEnd,
}

impl Lifecycle {
    /// Every notification, in the order a read emits them.
    pub const ALL: [Self; 6] = [
        Self::LoadStart,
        Self::Progress,
        Self::Load,
        Self::Abort,
        Self::Error,
        Self::LoadEnd,
    ];

    /// DOM event name for this notification.
    #[must_use]
    pub const fn event_name(self) -> &'static str {
        match self {
            Self::LoadStart => "loadstart",
            Self::Progress => "progress",
            Self::Load => "load",
            Self::Abort => "abort",
            Self::Error => "error",
            Self::LoadEnd => "loadend",
        }
    }
}

/// Host capability that reads one file asynchronously.
pub trait ReadBackend {
    /// Raw file handle produced by selection or drop.
    type Handle: FileMeta;
    /// Payload attached to lifecycle notifications.
    type Event;

    /// Begin reading `file` in `mode` and return immediately.
    ///
    /// The backend later drives `listener` with `LoadStart`, zero or more
    /// `Progress`, one of `Load`/`Abort`/`Error`, and finally `LoadEnd`.
    ///
    /// # Errors
    ///
    /// Returns an error when the read cannot be initiated at all.
    fn start_read(
        &self,
        file: &Rc<FileDescriptor<Self::Handle>>,
        mode: ReadMode,
        listener: ReadListener<Self::Handle, Self::Event>,
    ) -> ReadResult<()>;
}

struct GroupTracker<H, E> {
    group: Rc<FileGroup<H>>,
    callbacks: Rc<Callbacks<H, E>>,
    remaining: Cell<usize>,
    completed: Cell<bool>,
}

impl<H, E> GroupTracker<H, E> {
    fn file_finished(&self) {
        let remaining = self.remaining.get().saturating_sub(1);
        self.remaining.set(remaining);
        if remaining == 0 {
            self.complete();
        }
    }

    fn complete(&self) {
        if self.completed.replace(true) {
            return;
        }
        self.group.mark_ended();
        debug!(
            group_id = %self.group.id(),
            files = self.group.len(),
            load_time_ms = self.group.load_time_ms().unwrap_or_default(),
            "group finished"
        );
        (self.callbacks.groupend)(&self.group);
    }
}

/// Per-file handler set handed to a [`ReadBackend`].
///
/// Clones share state, so a backend may hand one clone to each of its event
/// sources.
pub struct ReadListener<H, E> {
    file: Rc<FileDescriptor<H>>,
    tracker: Rc<GroupTracker<H, E>>,
    finished: Rc<Cell<bool>>,
}

impl<H, E> Clone for ReadListener<H, E> {
    fn clone(&self) -> Self {
        Self {
            file: self.file.clone(),
            tracker: self.tracker.clone(),
            finished: self.finished.clone(),
        }
    }
}

impl<H, E> Debug for ReadListener<H, E> {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("ReadListener")
            .field("file_id", &self.file.id())
            .field("finished", &self.finished.get())
            .finish_non_exhaustive()
    }
}

impl<H, E> ReadListener<H, E> {
    /// File this listener reports for.
    #[must_use]
    pub const fn file(&self) -> &Rc<FileDescriptor<H>> {
        &self.file
    }

    /// Whether `LoadEnd` has already been delivered.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.finished.get()
    }

    /// Forward a lifecycle notification to the matching callback.
    ///
    /// Notifications arriving after `LoadEnd` are ignored.
    pub fn notify(&self, kind: Lifecycle, event: &E) {
        if self.finished.get() {
            trace!(file_id = %self.file.id(), event = kind.event_name(), "late notification ignored");
            return;
        }

        let callbacks = &self.tracker.callbacks;
        let hook = match kind {
            Lifecycle::LoadStart => &callbacks.loadstart,
            Lifecycle::Progress => &callbacks.progress,
            Lifecycle::Load => &callbacks.load,
            Lifecycle::Abort => &callbacks.abort,
            Lifecycle::Error => &callbacks.error,
            Lifecycle::LoadEnd => &callbacks.loadend,
        };
        hook(event, &self.file);

        if kind == Lifecycle::LoadEnd {
            self.finish();
        }
    }

    fn finish(&self) {
        if !self.finished.replace(true) {
            self.tracker.file_finished();
        }
    }
}

/// Coordinates batches of asynchronous reads over a [`ReadBackend`].
pub struct BatchReader<B: ReadBackend> {
    backend: Option<B>,
    defaults: ReaderOptions<B::Handle, B::Event>,
}

impl<B: ReadBackend> Debug for BatchReader<B> {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("BatchReader")
            .field("enabled", &self.backend.is_some())
            .field("defaults", &self.defaults)
            .finish()
    }
}

impl<B> BatchReader<B>
where
    B: ReadBackend,
    B::Handle: 'static,
    B::Event: 'static,
{
    /// Build a reader; `None` marks the host capability as unavailable.
    #[must_use]
    pub const fn new(backend: Option<B>, defaults: ReaderOptions<B::Handle, B::Event>) -> Self {
        Self { backend, defaults }
    }

    /// Reader over `backend` with built-in defaults.
    #[must_use]
    pub fn with_backend(backend: B) -> Self {
        Self::new(Some(backend), ReaderOptions::default())
    }

    /// Whether the host read capability is available.
    #[must_use]
    pub const fn enabled(&self) -> bool {
        self.backend.is_some()
    }

    /// Reader-wide default options.
    #[must_use]
    pub const fn defaults(&self) -> &ReaderOptions<B::Handle, B::Event> {
        &self.defaults
    }

    /// Underlying backend, when enabled.
    #[must_use]
    pub const fn backend(&self) -> Option<&B> {
        self.backend.as_ref()
    }

    /// Deep-merge per-binding overrides over the reader defaults.
    #[must_use]
    pub fn options(
        &self,
        overrides: &OptionsOverride<B::Handle, B::Event>,
    ) -> ReaderOptions<B::Handle, B::Event> {
        self.defaults.merged(overrides)
    }

    /// Take in a batch and start reading every accepted file.
    ///
    /// Returns the batch descriptor, or `None` when the reader is disabled.
    pub fn handle_files<I>(
        &self,
        files: I,
        options: &ReaderOptions<B::Handle, B::Event>,
    ) -> Option<Rc<FileGroup<B::Handle>>>
    where
        I: IntoIterator<Item = B::Handle>,
    {
        let backend = self.backend.as_ref()?;

        let group_id = GroupId::next();
        let files: Vec<Rc<FileDescriptor<B::Handle>>> = files
            .into_iter()
            .map(|handle| Rc::new(FileDescriptor::intake(handle, group_id)))
            .collect();
        let accepted: Vec<bool> = files
            .iter()
            .map(|file| {
                options
                    .accept
                    .as_ref()
                    .is_none_or(|pattern| pattern.matches(file.content_type()))
            })
            .collect();

        let group = Rc::new(FileGroup::new(group_id, files));
        let callbacks = Rc::new(options.on.clone());
        let tracker = Rc::new(GroupTracker {
            group: group.clone(),
            callbacks: callbacks.clone(),
            // One slot for intake itself, released after the loop.
            remaining: Cell::new(accepted.iter().filter(|keep| **keep).count() + 1),
            completed: Cell::new(false),
        });

        debug!(
            group_id = %group_id,
            files = group.len(),
            accepted = tracker.remaining.get() - 1,
            "group started"
        );
        (callbacks.groupstart)(&group);

        for (file, keep) in group.files().iter().zip(accepted) {
            if !keep {
                debug!(file_id = %file.id(), content_type = file.content_type(), "file skipped");
                (callbacks.skip)(file);
                continue;
            }

            let mode = options.read_as.select(file.content_type());
            let listener = ReadListener {
                file: file.clone(),
                tracker: tracker.clone(),
                finished: Rc::new(Cell::new(false)),
            };
            trace!(file_id = %file.id(), mode = %mode, "starting read");
            if let Err(err) = backend.start_read(file, mode, listener.clone()) {
                warn!(file_id = %file.id(), error = %err, "read could not start");
                listener.finish();
            }
        }

        tracker.file_finished();

        Some(group)
    }
}
