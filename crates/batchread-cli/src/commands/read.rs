//! `read`: run the batch coordinator over local paths and report every event.

use std::cell::{Cell, RefCell};
use std::path::PathBuf;
use std::rc::Rc;

use anyhow::anyhow;
use batchread_core::{BatchReader, CallbacksOverride, FileDescriptor, FileGroup};
use batchread_telemetry::{Metrics, ReadOutcome};
use tokio::sync::Notify;
use tokio::task::LocalSet;
use tracing::{debug, info, warn};

use crate::cli::{OutputFormat, ReadArgs};
use crate::commands::settings::resolve_settings;
use crate::error::{CliError, CliResult};
use crate::fs_backend::{FsBackend, FsEvent, LocalFile};
use crate::output::{EventRecord, ResultSummary, render_event};

type LocalDescriptor = Rc<FileDescriptor<LocalFile>>;

pub(crate) async fn handle_read(args: ReadArgs, format: OutputFormat) -> CliResult<()> {
    let report = execute_read(&args, format, true).await?;
    debug!(
        events = report.records.len(),
        failures = report.failures,
        "read session complete"
    );

    if args.metrics {
        let rendered = report.metrics.render().map_err(CliError::failure)?;
        print!("{rendered}");
    }

    if report.failures > 0 {
        return Err(CliError::failure(anyhow!(
            "{} of {} reads failed",
            report.failures,
            args.paths.len()
        )));
    }
    Ok(())
}

/// Outcome of one read session.
pub(crate) struct ReadReport {
    pub(crate) records: Vec<EventRecord>,
    pub(crate) failures: usize,
    pub(crate) metrics: Metrics,
}

pub(crate) async fn execute_read(
    args: &ReadArgs,
    format: OutputFormat,
    echo: bool,
) -> CliResult<ReadReport> {
    let overrides = resolve_settings(&args.reader)?.into_override::<LocalFile, FsEvent>()?;
    let files = open_all(&args.paths).await?;
    let metrics = Metrics::new().map_err(CliError::failure)?;

    let session = Rc::new(ReadSession {
        format,
        echo,
        records: RefCell::new(Vec::new()),
        failures: Cell::new(0),
        metrics,
    });
    let done = Rc::new(Notify::new());
    let reader = BatchReader::with_backend(FsBackend::with_chunk_size(args.reader.chunk_size));
    let options = reader.options(&overrides.with_callbacks(session_callbacks(&session, &done)));

    LocalSet::new()
        .run_until(async {
            reader
                .handle_files(files, &options)
                .ok_or_else(|| CliError::failure(anyhow!("file reading is unavailable")))?;
            done.notified().await;
            Ok::<(), CliError>(())
        })
        .await?;

    Ok(ReadReport {
        records: session.records.take(),
        failures: session.failures.get(),
        metrics: session.metrics.clone(),
    })
}

pub(crate) async fn open_all(paths: &[PathBuf]) -> CliResult<Vec<LocalFile>> {
    let mut files = Vec::with_capacity(paths.len());
    for path in paths {
        let file = LocalFile::open(path)
            .await
            .map_err(|err| CliError::validation(format!("{err:#}")))?;
        files.push(file);
    }
    Ok(files)
}

struct ReadSession {
    format: OutputFormat,
    echo: bool,
    records: RefCell<Vec<EventRecord>>,
    failures: Cell<usize>,
    metrics: Metrics,
}

impl ReadSession {
    fn emit(&self, record: EventRecord) {
        if self.echo
            && let Err(err) = render_event(&record, self.format)
        {
            warn!(error = %err.display_message(), "failed to render event");
        }
        self.records.borrow_mut().push(record);
    }

    fn file_event(&self, label: &'static str, event: &FsEvent, file: &LocalDescriptor) {
        let mut record = EventRecord::new(label, file.group_id());
        record.file = Some(file.summary());
        record.loaded = Some(event.loaded);
        record.total = Some(event.total);
        record.error.clone_from(&event.error);

        match label {
            "load" => {
                self.metrics.inc_file_read(ReadOutcome::Loaded);
                self.metrics.add_bytes_read(event.loaded);
                record.result = event
                    .result
                    .as_ref()
                    .map(|output| ResultSummary::describe(event.mode.as_str(), output));
            }
            "error" | "abort" => {
                let outcome = if label == "error" {
                    ReadOutcome::Failed
                } else {
                    ReadOutcome::Aborted
                };
                self.metrics.inc_file_read(outcome);
                self.failures.set(self.failures.get() + 1);
            }
            _ => {}
        }
        self.emit(record);
    }

    fn skip(&self, file: &LocalDescriptor) {
        self.metrics.inc_file_skipped();
        let mut record = EventRecord::new("skip", file.group_id());
        record.file = Some(file.summary());
        self.emit(record);
    }

    fn group_started(&self, group: &Rc<FileGroup<LocalFile>>) {
        self.metrics.inc_group_started();
        let mut record = EventRecord::new("groupstart", group.id());
        record.files = Some(group.len());
        self.emit(record);
    }

    fn group_finished(&self, group: &Rc<FileGroup<LocalFile>>) {
        self.metrics.inc_group_completed();
        let mut record = EventRecord::new("groupend", group.id());
        record.files = Some(group.len());
        record.load_time_ms = group.load_time_ms();
        info!(group_id = %group.id(), files = group.len(), "batch read finished");
        self.emit(record);
    }
}

fn session_callbacks(
    session: &Rc<ReadSession>,
    done: &Rc<Notify>,
) -> CallbacksOverride<LocalFile, FsEvent> {
    let file_event = |label: &'static str| {
        let session = session.clone();
        move |event: &FsEvent, file: &LocalDescriptor| session.file_event(label, event, file)
    };
    let skip_session = session.clone();
    let start_session = session.clone();
    let end_session = session.clone();
    let finished = done.clone();

    CallbacksOverride::default()
        .on_loadstart(file_event("loadstart"))
        .on_progress(file_event("progress"))
        .on_load(file_event("load"))
        .on_abort(file_event("abort"))
        .on_error(file_event("error"))
        .on_loadend(file_event("loadend"))
        .on_skip(move |file| skip_session.skip(file))
        .on_groupstart(move |group| start_session.group_started(group))
        .on_groupend(move |group| {
            end_session.group_finished(group);
            finished.notify_one();
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::ReaderArgs;
    use crate::fs_backend::DEFAULT_CHUNK_SIZE;
    use batchread_core::{ReadMode, ReadModeRuleSpec};

    fn reader_args() -> ReaderArgs {
        ReaderArgs {
            config: None,
            accept: None,
            rules: Vec::new(),
            default_mode: None,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    fn events(report: &ReadReport) -> Vec<&'static str> {
        report.records.iter().map(|record| record.event).collect()
    }

    #[tokio::test(flavor = "current_thread")]
    async fn reads_every_file_and_finishes_group() {
        let dir = tempfile::tempdir().expect("tempdir");
        let text = dir.path().join("note.txt");
        let image = dir.path().join("dot.png");
        std::fs::write(&text, "hello").expect("write");
        std::fs::write(&image, [0x89, b'P', b'N', b'G']).expect("write");

        let mut reader = reader_args();
        reader.rules = vec![ReadModeRuleSpec {
            pattern: "text/*".into(),
            mode: ReadMode::Text,
        }];
        let args = ReadArgs {
            paths: vec![text, image],
            reader,
            metrics: false,
        };
        let report = execute_read(&args, OutputFormat::Json, false)
            .await
            .expect("read");

        let kinds = events(&report);
        assert_eq!(kinds.first(), Some(&"groupstart"));
        assert_eq!(kinds.last(), Some(&"groupend"));
        assert_eq!(kinds.iter().filter(|kind| **kind == "loadend").count(), 2);
        assert_eq!(report.failures, 0);

        let results: Vec<_> = report
            .records
            .iter()
            .filter_map(|record| record.result.as_ref())
            .map(|result| (result.mode.as_str(), result.preview.as_str()))
            .collect();
        assert!(results.contains(&("Text", "hello")));
        assert!(
            results
                .iter()
                .any(|(mode, preview)| *mode == "DataURL" && preview.starts_with("data:image/png;base64,"))
        );

        let snapshot = report.metrics.snapshot();
        assert_eq!(snapshot.files_loaded_total, 2);
        assert_eq!(snapshot.bytes_read_total, 9);
        assert_eq!(snapshot.groups_completed_total, 1);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn skipped_files_are_reported_and_group_completes() {
        let dir = tempfile::tempdir().expect("tempdir");
        let text = dir.path().join("note.txt");
        std::fs::write(&text, "hello").expect("write");

        let mut reader = reader_args();
        reader.accept = Some("image/*".into());
        let args = ReadArgs {
            paths: vec![text],
            reader,
            metrics: false,
        };
        let report = execute_read(&args, OutputFormat::Table, false)
            .await
            .expect("read");

        assert_eq!(events(&report), vec!["groupstart", "skip", "groupend"]);
        assert_eq!(report.metrics.snapshot().files_skipped_total, 1);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn missing_paths_are_validation_errors() {
        let args = ReadArgs {
            paths: vec![PathBuf::from("/definitely/not/here.txt")],
            reader: reader_args(),
            metrics: false,
        };
        let Err(err) = execute_read(&args, OutputFormat::Table, false).await else {
            panic!("expected failure");
        };
        assert_eq!(err.exit_code(), 2);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn invalid_accept_pattern_is_rejected_before_reading() {
        let dir = tempfile::tempdir().expect("tempdir");
        let text = dir.path().join("note.txt");
        std::fs::write(&text, "hello").expect("write");

        let mut reader = reader_args();
        reader.accept = Some("(".into());
        let args = ReadArgs {
            paths: vec![text],
            reader,
            metrics: false,
        };
        let Err(err) = execute_read(&args, OutputFormat::Table, false).await else {
            panic!("expected failure");
        };
        assert!(err.display_message().starts_with("invalid pattern"));
    }
}
