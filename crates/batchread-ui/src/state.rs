//! Uploader view state and pure transitions, testable outside wasm.

use std::collections::HashMap;

use batchread_core::{FileId, FileSummary, GroupId};

/// Default thumbnail box, in pixels.
pub const THUMBNAIL_BOX: (u32, u32) = (50, 50);

/// Default class applied to the dropzone while a drag hovers it.
pub const DEFAULT_DRAG_CLASS: &str = "drag";

/// Read progress of one file row.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReadStatus {
    /// Waiting for the read to start.
    Pending,
    /// Bytes are being consumed; percentage in 0..=100.
    Loading(u8),
    /// Read succeeded.
    Loaded,
    /// Read failed or was aborted.
    Failed,
    /// Rejected by the accept pattern.
    Skipped,
}

/// Upload progress of one file row.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UploadStatus {
    /// Not uploaded yet.
    Idle,
    /// Upload in flight; percentage in 0..=100.
    Uploading(u8),
    /// Server accepted the file.
    Done,
    /// Transport failure or non-success status.
    Failed,
}

impl UploadStatus {
    /// Status text shown next to the progress bar.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Idle => "",
            Self::Uploading(_) => "Uploading...",
            Self::Done => "Done!",
            Self::Failed => "Error!",
        }
    }

    /// Progress bar fill.
    #[must_use]
    pub const fn percent(self) -> u8 {
        match self {
            Self::Idle | Self::Failed => 0,
            Self::Uploading(percent) => percent,
            Self::Done => 100,
        }
    }
}

/// One file in the uploader list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileRow {
    /// Descriptor snapshot taken at intake.
    pub summary: FileSummary,
    /// Read progress.
    pub read: ReadStatus,
    /// Data URL of the rendered thumbnail, once drawn.
    pub thumbnail: Option<String>,
    /// Whether the details panel is expanded.
    pub details_open: bool,
    /// Upload progress.
    pub upload: UploadStatus,
}

impl FileRow {
    fn new(summary: FileSummary) -> Self {
        Self {
            summary,
            read: ReadStatus::Pending,
            thumbnail: None,
            details_open: false,
            upload: UploadStatus::Idle,
        }
    }

    /// Whether a thumbnail should be drawn for this file.
    #[must_use]
    pub fn is_image(&self) -> bool {
        self.summary.content_type.starts_with("image/")
    }

    /// Descriptor rendered as pretty JSON for the details panel.
    #[must_use]
    pub fn details_json(&self) -> String {
        serde_json::to_string_pretty(&self.summary).unwrap_or_default()
    }
}

/// One batch in the uploader list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GroupView {
    /// Batch id.
    pub id: GroupId,
    /// Rows in intake order.
    pub files: Vec<FileRow>,
    /// Milliseconds from intake to completion, once finished.
    pub load_time_ms: Option<i64>,
}

impl GroupView {
    /// Heading row, e.g. `Group: 3 (2 files)`.
    #[must_use]
    pub fn heading(&self) -> String {
        format!("Group: {} ({} files)", self.id, self.files.len())
    }

    /// Completion note, e.g. `(Time to load: 12 ms)`.
    #[must_use]
    pub fn footer(&self) -> Option<String> {
        self.load_time_ms
            .map(|elapsed| format!("(Time to load: {elapsed} ms)"))
    }
}

/// Transitions driven by reader hooks and user actions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UploaderAction {
    /// `groupstart`: a new batch with its descriptors.
    GroupStarted {
        /// Batch id.
        id: GroupId,
        /// Descriptors in intake order.
        files: Vec<FileSummary>,
    },
    /// `progress` for one read.
    ReadProgress {
        /// File being read.
        file: FileId,
        /// Bytes consumed so far.
        loaded: u64,
        /// Total bytes, zero when unknown.
        total: u64,
    },
    /// `load` for one read.
    FileLoaded(FileId),
    /// `error` or `abort` for one read.
    FileFailed(FileId),
    /// `skip` for one file.
    FileSkipped(FileId),
    /// Thumbnail drawn for an image file.
    Thumbnail {
        /// Image file.
        file: FileId,
        /// Canvas contents as a data URL.
        data_url: String,
    },
    /// `groupend` for a batch.
    GroupEnded {
        /// Batch id.
        id: GroupId,
        /// Elapsed load time.
        load_time_ms: Option<i64>,
    },
    /// Expand or collapse a details panel.
    ToggleDetails(FileId),
    /// Upload progress, as loaded and total bytes.
    UploadProgress {
        /// File being uploaded.
        file: FileId,
        /// Bytes sent so far.
        loaded: u64,
        /// Total bytes, zero when unknown.
        total: u64,
    },
    /// Upload finished; `ok` is false on transport or HTTP failure.
    UploadFinished {
        /// Uploaded file.
        file: FileId,
        /// Whether the server accepted it.
        ok: bool,
    },
}

/// Whole uploader list, newest batch last.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UploaderState {
    /// Batches in arrival order.
    pub groups: Vec<GroupView>,
}

impl UploaderState {
    /// Apply one transition. Actions naming unknown ids are ignored.
    pub fn apply(&mut self, action: UploaderAction) {
        match action {
            UploaderAction::GroupStarted { id, files } => self.groups.push(GroupView {
                id,
                files: files.into_iter().map(FileRow::new).collect(),
                load_time_ms: None,
            }),
            UploaderAction::ReadProgress {
                file,
                loaded,
                total,
            } => {
                if let Some(row) = self.row_mut(file)
                    && matches!(row.read, ReadStatus::Pending | ReadStatus::Loading(_))
                {
                    row.read = ReadStatus::Loading(percent(loaded, total));
                }
            }
            UploaderAction::FileLoaded(file) => self.set_read(file, ReadStatus::Loaded),
            UploaderAction::FileFailed(file) => self.set_read(file, ReadStatus::Failed),
            UploaderAction::FileSkipped(file) => self.set_read(file, ReadStatus::Skipped),
            UploaderAction::Thumbnail { file, data_url } => {
                if let Some(row) = self.row_mut(file) {
                    row.thumbnail = Some(data_url);
                }
            }
            UploaderAction::GroupEnded { id, load_time_ms } => {
                if let Some(group) = self.groups.iter_mut().find(|group| group.id == id) {
                    group.load_time_ms = load_time_ms;
                }
            }
            UploaderAction::ToggleDetails(file) => {
                if let Some(row) = self.row_mut(file) {
                    row.details_open = !row.details_open;
                }
            }
            UploaderAction::UploadProgress {
                file,
                loaded,
                total,
            } => {
                if let Some(row) = self.row_mut(file) {
                    row.upload = UploadStatus::Uploading(percent(loaded, total));
                }
            }
            UploaderAction::UploadFinished { file, ok } => {
                if let Some(row) = self.row_mut(file) {
                    row.upload = if ok {
                        UploadStatus::Done
                    } else {
                        UploadStatus::Failed
                    };
                }
            }
        }
    }

    /// Row for `file`, if any batch holds it.
    #[must_use]
    pub fn row(&self, file: FileId) -> Option<&FileRow> {
        self.groups
            .iter()
            .flat_map(|group| group.files.iter())
            .find(|row| row.summary.file_id == file)
    }

    fn row_mut(&mut self, file: FileId) -> Option<&mut FileRow> {
        self.groups
            .iter_mut()
            .flat_map(|group| group.files.iter_mut())
            .find(|row| row.summary.file_id == file)
    }

    fn set_read(&mut self, file: FileId, status: ReadStatus) {
        if let Some(row) = self.row_mut(file) {
            row.read = status;
        }
    }
}

/// File handles still eligible for upload, keyed by file id.
///
/// Entries are dropped once a file is skipped or its upload succeeds, so the
/// store only holds files a row can still act on.
#[derive(Debug)]
pub struct HandleStore<H> {
    handles: HashMap<FileId, H>,
}

impl<H> Default for HandleStore<H> {
    fn default() -> Self {
        Self {
            handles: HashMap::new(),
        }
    }
}

impl<H: Clone> HandleStore<H> {
    /// Track every handle of a freshly started group.
    pub fn track(&mut self, files: impl IntoIterator<Item = (FileId, H)>) {
        self.handles.extend(files);
    }

    /// Handle for `file`, when it is still tracked.
    #[must_use]
    pub fn get(&self, file: FileId) -> Option<H> {
        self.handles.get(&file).cloned()
    }

    /// Stop tracking `file`.
    pub fn release(&mut self, file: FileId) -> Option<H> {
        self.handles.remove(&file)
    }

    /// Number of tracked handles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// Whether nothing is tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}

/// Whole percentage of `loaded` over `total`; zero when the total is unknown.
#[must_use]
pub fn percent(loaded: u64, total: u64) -> u8 {
    if total == 0 {
        return 0;
    }
    let scaled = loaded.min(total).saturating_mul(100) / total;
    u8::try_from(scaled).unwrap_or(100)
}

#[cfg(test)]
mod tests {
    use super::*;
    use batchread_core::FileExtra;

    fn summary(name: &str, content_type: &str, group: GroupId) -> FileSummary {
        FileSummary {
            file_id: FileId::next(),
            group_id: group,
            name: name.to_string(),
            content_type: content_type.to_string(),
            size: 2048,
            extra: FileExtra::derive(name, 2048),
        }
    }

    fn started(files: &[(&str, &str)]) -> (UploaderState, GroupId, Vec<FileId>) {
        let group = GroupId::next();
        let summaries: Vec<FileSummary> = files
            .iter()
            .map(|(name, content_type)| summary(name, content_type, group))
            .collect();
        let ids = summaries.iter().map(|file| file.file_id).collect();
        let mut state = UploaderState::default();
        state.apply(UploaderAction::GroupStarted {
            id: group,
            files: summaries,
        });
        (state, group, ids)
    }

    #[test]
    fn group_rows_render_heading_and_footer() {
        let (mut state, group, _) = started(&[("a.png", "image/png"), ("b.txt", "text/plain")]);
        let view = &state.groups[0];
        assert_eq!(view.heading(), format!("Group: {group} (2 files)"));
        assert_eq!(view.footer(), None);

        state.apply(UploaderAction::GroupEnded {
            id: group,
            load_time_ms: Some(12),
        });
        assert_eq!(
            state.groups[0].footer().as_deref(),
            Some("(Time to load: 12 ms)")
        );
    }

    #[test]
    fn read_lifecycle_updates_row() {
        let (mut state, _, ids) = started(&[("a.png", "image/png")]);
        let id = ids[0];

        state.apply(UploaderAction::ReadProgress {
            file: id,
            loaded: 512,
            total: 2048,
        });
        assert_eq!(state.row(id).map(|row| row.read), Some(ReadStatus::Loading(25)));

        state.apply(UploaderAction::FileLoaded(id));
        state.apply(UploaderAction::ReadProgress {
            file: id,
            loaded: 2048,
            total: 2048,
        });
        assert_eq!(state.row(id).map(|row| row.read), Some(ReadStatus::Loaded));

        state.apply(UploaderAction::Thumbnail {
            file: id,
            data_url: "data:image/png;base64,AA==".into(),
        });
        assert!(state.row(id).and_then(|row| row.thumbnail.as_ref()).is_some());
    }

    #[test]
    fn skipped_and_failed_reads_are_distinct() {
        let (mut state, _, ids) = started(&[("a.txt", "text/plain"), ("b.png", "image/png")]);
        state.apply(UploaderAction::FileSkipped(ids[0]));
        state.apply(UploaderAction::FileFailed(ids[1]));
        assert_eq!(state.row(ids[0]).map(|row| row.read), Some(ReadStatus::Skipped));
        assert_eq!(state.row(ids[1]).map(|row| row.read), Some(ReadStatus::Failed));
    }

    #[test]
    fn details_toggle_and_json() {
        let (mut state, _, ids) = started(&[("photo.jpeg", "image/jpeg")]);
        state.apply(UploaderAction::ToggleDetails(ids[0]));
        let row = state.row(ids[0]).expect("row");
        assert!(row.details_open);
        assert!(row.is_image());

        let json: serde_json::Value = serde_json::from_str(&row.details_json()).expect("json");
        assert_eq!(json["type"], "image/jpeg");
        assert_eq!(json["extra"]["extension"], "jpeg");
        assert_eq!(json["extra"]["pretty_size"], "2.00 kb");

        state.apply(UploaderAction::ToggleDetails(ids[0]));
        assert!(!state.row(ids[0]).expect("row").details_open);
    }

    #[test]
    fn upload_status_labels_follow_progress() {
        let (mut state, _, ids) = started(&[("a.png", "image/png")]);
        let id = ids[0];
        assert_eq!(state.row(id).map(|row| row.upload.label()), Some(""));

        state.apply(UploaderAction::UploadProgress {
            file: id,
            loaded: 1,
            total: 3,
        });
        let upload = state.row(id).map(|row| row.upload).expect("row");
        assert_eq!(upload.label(), "Uploading...");
        assert_eq!(upload.percent(), 33);

        state.apply(UploaderAction::UploadFinished { file: id, ok: true });
        assert_eq!(state.row(id).map(|row| row.upload.label()), Some("Done!"));

        state.apply(UploaderAction::UploadFinished { file: id, ok: false });
        assert_eq!(state.row(id).map(|row| row.upload.label()), Some("Error!"));
    }

    #[test]
    fn unknown_ids_are_ignored() {
        let mut state = UploaderState::default();
        state.apply(UploaderAction::FileLoaded(FileId::next()));
        state.apply(UploaderAction::GroupEnded {
            id: GroupId::next(),
            load_time_ms: Some(1),
        });
        assert!(state.groups.is_empty());
    }

    #[test]
    fn handle_store_releases_skipped_and_uploaded_files() {
        let (ids, names): (Vec<FileId>, Vec<&str>) = [
            (FileId::next(), "a.png"),
            (FileId::next(), "b.txt"),
            (FileId::next(), "c.png"),
        ]
        .into_iter()
        .unzip();
        let mut store = HandleStore::default();
        store.track(ids.iter().copied().zip(names.iter().copied()));
        assert_eq!(store.len(), 3);

        assert_eq!(store.release(ids[1]), Some("b.txt"));
        assert_eq!(store.get(ids[1]), None);
        assert_eq!(store.get(ids[0]), Some("a.png"));

        store.release(ids[0]);
        store.release(ids[2]);
        assert!(store.is_empty());
        assert_eq!(store.release(ids[2]), None);
    }

    #[test]
    fn percent_handles_unknown_and_overflowing_totals() {
        assert_eq!(percent(10, 0), 0);
        assert_eq!(percent(50, 100), 50);
        assert_eq!(percent(150, 100), 100);
    }
}
