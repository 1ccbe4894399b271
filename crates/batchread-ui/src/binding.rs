//! Attach a [`BatchReader`] to a file input or a drop target.
//!
//! Bindings own their DOM listeners; dropping a binding detaches them.

use std::rc::Rc;

use batchread_core::BatchReader;
use gloo::console;
use gloo::events::{EventListener, EventListenerOptions};
use wasm_bindgen::JsCast;
use web_sys::{DragEvent, Element, Event, HtmlInputElement};

use crate::browser::{BrowserFile, BrowserOptions, BrowserOverride, BrowserReader, js_message};

/// Shared reader over the browser `FileReader`.
pub type SharedReader = Rc<BatchReader<BrowserReader>>;

/// Live `change` listener on a file input.
#[derive(Debug)]
pub struct InputBinding {
    _change: EventListener,
}

/// Live drag-and-drop listeners on a drop target.
#[derive(Debug)]
pub struct DropBinding {
    _listeners: [EventListener; 4],
}

/// Run the reader over every selection made through `input`.
///
/// Returns `None` when the reader is disabled.
#[must_use]
pub fn setup_input(
    reader: &SharedReader,
    input: &HtmlInputElement,
    overrides: &BrowserOverride,
) -> Option<InputBinding> {
    if !reader.enabled() {
        return None;
    }
    let options = Rc::new(reader.options(overrides));
    let reader = reader.clone();
    let target = input.clone();
    let change = EventListener::new(input, "change", move |_event| {
        if let Some(files) = target.files() {
            reader.handle_files(BrowserFile::from_list(&files), &options);
        }
    });
    Some(InputBinding { _change: change })
}

/// Run the reader over every drop onto `element`, toggling the drag class
/// while a drag hovers it.
///
/// Returns `None` when the reader is disabled.
#[must_use]
pub fn setup_drop(
    reader: &SharedReader,
    element: &Element,
    overrides: &BrowserOverride,
) -> Option<DropBinding> {
    if !reader.enabled() {
        return None;
    }
    let options: Rc<BrowserOptions> = Rc::new(reader.options(overrides));
    let active = EventListenerOptions::enable_prevent_default();

    let enter = {
        let target = element.clone();
        let options = options.clone();
        EventListener::new_with_options(element, "dragenter", active, move |event| {
            halt(event);
            set_drag_class(&target, options.drag_class.as_deref(), true);
        })
    };
    let over = EventListener::new_with_options(element, "dragover", active, halt);
    let leave = {
        let target = element.clone();
        let options = options.clone();
        EventListener::new(element, "dragleave", move |_event| {
            set_drag_class(&target, options.drag_class.as_deref(), false);
        })
    };
    let dropped = {
        let target = element.clone();
        let reader = reader.clone();
        EventListener::new_with_options(element, "drop", active, move |event| {
            halt(event);
            set_drag_class(&target, options.drag_class.as_deref(), false);
            let files = event
                .dyn_ref::<DragEvent>()
                .and_then(DragEvent::data_transfer)
                .and_then(|transfer| transfer.files());
            if let Some(files) = files {
                reader.handle_files(BrowserFile::from_list(&files), &options);
            }
        })
    };

    Some(DropBinding {
        _listeners: [enter, over, leave, dropped],
    })
}

fn halt(event: &Event) {
    event.prevent_default();
    event.stop_propagation();
}

fn set_drag_class(element: &Element, class: Option<&str>, on: bool) {
    let Some(class) = class.filter(|class| !class.is_empty()) else {
        return;
    };
    let classes = element.class_list();
    let result = if on {
        classes.add_1(class)
    } else {
        classes.remove_1(class)
    };
    if let Err(err) = result {
        console::warn!("drag class update failed", class, js_message(&err));
    }
}
