#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
#![allow(clippy::module_name_repetitions)]

//! DOM-free batch read coordination shared by the browser widget and the CLI.
//!
//! Layout: `ids.rs` (process-wide counters), `model.rs` (file descriptors and
//! groups), `format.rs` (size, name and thumbnail helpers), `pattern.rs`
//! (content-type patterns), `options.rs` (read modes, callbacks, deep merge),
//! `coordinator.rs` (`BatchReader` and the `ReadBackend` seam).

pub mod coordinator;
pub mod error;
pub mod format;
pub mod ids;
pub mod model;
pub mod options;
pub mod pattern;

pub use coordinator::{BatchReader, Lifecycle, ReadBackend, ReadListener};
pub use error::{ReadError, ReadResult};
pub use format::{pretty_size, split_name, thumbnail_size};
pub use ids::{FileId, GroupId};
pub use model::{FileDescriptor, FileExtra, FileGroup, FileMeta, FileSummary};
pub use options::{
    Callbacks, CallbacksOverride, OptionsOverride, ReadMode, ReadModeMap, ReadModeRule,
    ReadModeRuleSpec, ReaderOptions, ReaderSettings,
};
pub use pattern::TypePattern;
