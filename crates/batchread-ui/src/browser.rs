//! `FileReader`-backed read primitive.
//!
//! # Design
//! - One `FileReader` per file; its six DOM events are forwarded to the
//!   file's [`ReadListener`] through gloo listeners.
//! - Listeners cannot be dropped from inside their own callback, so the set
//!   is released on the next microtask after `loadend`.

use std::cell::RefCell;
use std::rc::Rc;

use batchread_core::{
    FileDescriptor, FileMeta, Lifecycle, OptionsOverride, ReadBackend, ReadError, ReadListener,
    ReadMode, ReadResult, ReaderOptions,
};
use gloo::events::EventListener;
use js_sys::Reflect;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::spawn_local;
use web_sys::{Blob, Event, File, FileList, FileReader, ProgressEvent};

/// Options over browser files.
pub type BrowserOptions = ReaderOptions<BrowserFile, BrowserEvent>;
/// Per-binding overrides over browser files.
pub type BrowserOverride = OptionsOverride<BrowserFile, BrowserEvent>;

/// A DOM `File` as handed over by an input or a drop.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BrowserFile(File);

impl BrowserFile {
    /// Wrap a DOM file.
    #[must_use]
    pub const fn new(file: File) -> Self {
        Self(file)
    }

    /// Underlying DOM file.
    #[must_use]
    pub const fn file(&self) -> &File {
        &self.0
    }

    /// Every file in `list`, in order.
    #[must_use]
    pub fn from_list(list: &FileList) -> Vec<Self> {
        (0..list.length())
            .filter_map(|index| list.get(index))
            .map(Self::new)
            .collect()
    }
}

impl FileMeta for BrowserFile {
    fn name(&self) -> String {
        self.0.name()
    }

    fn content_type(&self) -> String {
        self.0.type_()
    }

    fn size(&self) -> u64 {
        byte_count(self.0.size())
    }
}

/// DOM event delivered with each lifecycle notification, plus its reader.
#[derive(Clone, Debug)]
pub struct BrowserEvent {
    event: Event,
    reader: FileReader,
}

impl BrowserEvent {
    /// Raw DOM event.
    #[must_use]
    pub const fn event(&self) -> &Event {
        &self.event
    }

    /// Bytes consumed so far.
    #[must_use]
    pub fn loaded(&self) -> u64 {
        self.event
            .dyn_ref::<ProgressEvent>()
            .map_or(0, |progress| byte_count(progress.loaded()))
    }

    /// Total bytes, zero when not computable.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.event
            .dyn_ref::<ProgressEvent>()
            .filter(|progress| progress.length_computable())
            .map_or(0, |progress| byte_count(progress.total()))
    }

    /// Reader result; set once `load` has fired.
    #[must_use]
    pub fn result(&self) -> Option<JsValue> {
        self.reader
            .result()
            .ok()
            .filter(|value| !value.is_null() && !value.is_undefined())
    }

    /// Result as a string, for the text, binary-string and data-URL modes.
    #[must_use]
    pub fn result_string(&self) -> Option<String> {
        self.result().and_then(|value| value.as_string())
    }

    /// Reader error message after `error`.
    #[must_use]
    pub fn error_message(&self) -> Option<String> {
        self.reader.error().map(|error| error.message())
    }
}

/// Read primitive over the global `FileReader`.
#[derive(Clone, Copy, Debug, Default)]
pub struct BrowserReader;

impl BrowserReader {
    /// Check the global object; `None` when `FileReader` is missing.
    #[must_use]
    pub fn detect() -> Option<Self> {
        Reflect::has(&js_sys::global(), &JsValue::from_str("FileReader"))
            .unwrap_or(false)
            .then_some(Self)
    }
}

impl ReadBackend for BrowserReader {
    type Handle = BrowserFile;
    type Event = BrowserEvent;

    fn start_read(
        &self,
        file: &Rc<FileDescriptor<BrowserFile>>,
        mode: ReadMode,
        listener: ReadListener<BrowserFile, BrowserEvent>,
    ) -> ReadResult<()> {
        let reader =
            FileReader::new().map_err(|err| ReadError::read_start(file.name(), js_message(&err)))?;

        let slot: Rc<RefCell<Vec<EventListener>>> = Rc::default();
        let listeners = Lifecycle::ALL
            .into_iter()
            .map(|kind| {
                let listener = listener.clone();
                let source = reader.clone();
                let slot = slot.clone();
                EventListener::new(&reader, kind.event_name(), move |event| {
                    listener.notify(
                        kind,
                        &BrowserEvent {
                            event: event.clone(),
                            reader: source.clone(),
                        },
                    );
                    if kind == Lifecycle::LoadEnd {
                        release(&slot);
                    }
                })
            })
            .collect();
        *slot.borrow_mut() = listeners;

        let blob: &Blob = file.handle().file();
        let started = match mode {
            ReadMode::ArrayBuffer => reader.read_as_array_buffer(blob),
            ReadMode::BinaryString => reader.read_as_binary_string(blob),
            ReadMode::Text => reader.read_as_text(blob),
            ReadMode::DataUrl => reader.read_as_data_url(blob),
        };
        started.map_err(|err| {
            drop(std::mem::take(&mut *slot.borrow_mut()));
            ReadError::read_start(file.name(), js_message(&err))
        })
    }
}

fn release(slot: &Rc<RefCell<Vec<EventListener>>>) {
    let slot = slot.clone();
    spawn_local(async move {
        let listeners = std::mem::take(&mut *slot.borrow_mut());
        drop(listeners);
    });
}

pub(crate) fn js_message(value: &JsValue) -> String {
    value
        .as_string()
        .or_else(|| {
            value
                .dyn_ref::<js_sys::Error>()
                .map(|error| String::from(error.message()))
        })
        .unwrap_or_else(|| format!("{value:?}"))
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub(crate) fn byte_count(value: f64) -> u64 {
    if value.is_finite() && value > 0.0 {
        value as u64
    } else {
        0
    }
}
