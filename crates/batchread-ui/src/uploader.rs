//! Demo uploader: batch reading with thumbnails, details and XHR upload.
//!
//! # Design
//! - Reader hooks only dispatch [`UploaderAction`]s; all view state lives in
//!   [`UploaderState`].
//! - DOM handles for uploads and in-flight requests are kept outside the
//!   reducer, keyed by file id. A handle is dropped once its file is skipped
//!   or uploaded.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use batchread_core::{
    BatchReader, CallbacksOverride, FileDescriptor, FileGroup, FileId, ReadMode, ReaderOptions,
    ReaderSettings, thumbnail_size,
};
use gloo::console;
use gloo::events::EventListener;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::{JsFuture, spawn_local};
use web_sys::{
    CanvasRenderingContext2d, Element, FormData, HtmlCanvasElement, HtmlImageElement,
    HtmlInputElement, ProgressEvent, XmlHttpRequest,
};
use yew::prelude::*;

use crate::binding::{SharedReader, setup_drop, setup_input};
use crate::browser::{
    BrowserEvent, BrowserFile, BrowserOverride, BrowserReader, byte_count, js_message,
};
use crate::state::{
    DEFAULT_DRAG_CLASS, FileRow, GroupView, HandleStore, ReadStatus, THUMBNAIL_BOX, UploadStatus,
    UploaderAction, UploaderState,
};

type Handles = Rc<RefCell<HandleStore<BrowserFile>>>;
type Uploads = Rc<RefCell<HashMap<FileId, Upload>>>;

impl Reducible for UploaderState {
    type Action = UploaderAction;

    fn reduce(self: Rc<Self>, action: Self::Action) -> Rc<Self> {
        let mut next = (*self).clone();
        next.apply(action);
        Rc::new(next)
    }
}

#[derive(Properties, PartialEq)]
pub(crate) struct UploaderProps {
    pub(crate) upload_url: AttrValue,
    #[prop_or(THUMBNAIL_BOX)]
    pub(crate) thumbnail_box: (u32, u32),
    #[prop_or(AttrValue::Static(DEFAULT_DRAG_CLASS))]
    pub(crate) drag_class: AttrValue,
    #[prop_or_default]
    pub(crate) accept: Option<AttrValue>,
}

#[function_component(Uploader)]
pub(crate) fn uploader(props: &UploaderProps) -> Html {
    let state = use_reducer(UploaderState::default);
    let input_ref = use_node_ref();
    let zone_ref = use_node_ref();
    let handles: Handles = use_mut_ref(HandleStore::default);
    let uploads: Uploads = use_mut_ref(HashMap::new);
    let reader: SharedReader = use_memo(
        |_| BatchReader::new(BrowserReader::detect(), ReaderOptions::default()),
        (),
    );

    {
        let state = state.clone();
        let reader = reader.clone();
        let handles = handles.clone();
        let input_ref = input_ref.clone();
        let zone_ref = zone_ref.clone();
        use_effect_with_deps(
            move |(accept, drag_class, bounds)| {
                let settings = ReaderSettings {
                    accept: accept.as_ref().map(ToString::to_string),
                    drag_class: Some(drag_class.to_string()),
                    read_as_map: None,
                    read_as_default: Some(ReadMode::DataUrl),
                };
                let bindings = match settings.into_override::<BrowserFile, BrowserEvent>() {
                    Ok(overrides) => {
                        let overrides: BrowserOverride =
                            overrides.with_callbacks(reader_hooks(&state, &handles, *bounds));
                        let input = input_ref
                            .cast::<HtmlInputElement>()
                            .and_then(|input| setup_input(&reader, &input, &overrides));
                        let zone = zone_ref
                            .cast::<Element>()
                            .and_then(|zone| setup_drop(&reader, &zone, &overrides));
                        Some((input, zone))
                    }
                    Err(err) => {
                        console::error!("invalid reader settings", err.to_string());
                        None
                    }
                };
                move || drop(bindings)
            },
            (
                props.accept.clone(),
                props.drag_class.clone(),
                props.thumbnail_box,
            ),
        );
    }

    let on_toggle = {
        let state = state.clone();
        Callback::from(move |file: FileId| state.dispatch(UploaderAction::ToggleDetails(file)))
    };

    let on_upload = {
        let state = state.clone();
        let url = props.upload_url.clone();
        Callback::from(move |file: FileId| {
            let Some(handle) = handles.borrow().get(file) else {
                return;
            };
            if let Err(err) = start_upload(&url, file, &handle, &state, &uploads, &handles) {
                console::error!("upload could not start", js_message(&err));
                state.dispatch(UploaderAction::UploadFinished { file, ok: false });
            }
        })
    };

    html! {
        <div class="uploader">
            <input ref={input_ref} type="file" multiple=true />
            <div ref={zone_ref} class="dropzone">
                <p>{"Drop files here"}</p>
            </div>
            {if reader.enabled() {
                html! {}
            } else {
                html! { <p class="error-text">{"File reading is not supported in this browser."}</p> }
            }}
            <ul class="groups">
                {for state.groups.iter().map(|group| group_view(group, &on_toggle, &on_upload))}
            </ul>
        </div>
    }
}

fn group_view(group: &GroupView, on_toggle: &Callback<FileId>, on_upload: &Callback<FileId>) -> Html {
    html! {
        <li class="group" key={group.id.get().to_string()}>
            <h4>{group.heading()}</h4>
            <ul class="files">
                {for group.files.iter().map(|row| file_row(row, on_toggle, on_upload))}
            </ul>
            {group.footer().map(|footer| html! { <p class="load-time">{footer}</p> }).unwrap_or_default()}
        </li>
    }
}

fn file_row(row: &FileRow, on_toggle: &Callback<FileId>, on_upload: &Callback<FileId>) -> Html {
    let id = row.summary.file_id;
    let read_class = match row.read {
        ReadStatus::Pending => "pending",
        ReadStatus::Loading(_) => "loading",
        ReadStatus::Loaded => "done",
        ReadStatus::Failed => "failed",
        ReadStatus::Skipped => "skipped",
    };
    let toggle = on_toggle.reform(move |_: MouseEvent| id);
    let upload = on_upload.reform(move |_: MouseEvent| id);
    let uploading = matches!(row.upload, UploadStatus::Uploading(_));

    html! {
        <li class={classes!("file", read_class)} key={id.get().to_string()}>
            <span class="thumb">
                {row.thumbnail.as_ref().map(|src| html! { <img src={src.clone()} alt={row.summary.name.clone()} /> }).unwrap_or_default()}
            </span>
            <span class="name">{row.summary.name.clone()}</span>
            <span class="size">{row.summary.extra.pretty_size.clone()}</span>
            <button class="ghost" type="button" onclick={toggle}>{"details"}</button>
            <button
                class="solid"
                type="button"
                onclick={upload}
                disabled={uploading || row.read == ReadStatus::Skipped}
            >
                {"upload to server"}
            </button>
            <progress max="100" value={row.upload.percent().to_string()} />
            <span class="status">{row.upload.label()}</span>
            {if row.details_open {
                html! { <pre class="details">{row.details_json()}</pre> }
            } else {
                html! {}
            }}
        </li>
    }
}

fn reader_hooks(
    state: &UseReducerHandle<UploaderState>,
    handles: &Handles,
    bounds: (u32, u32),
) -> CallbacksOverride<BrowserFile, BrowserEvent> {
    let on_start = {
        let state = state.clone();
        let handles = handles.clone();
        move |group: &Rc<FileGroup<BrowserFile>>| {
            handles.borrow_mut().track(
                group
                    .files()
                    .iter()
                    .map(|file| (file.id(), file.handle().clone())),
            );
            state.dispatch(UploaderAction::GroupStarted {
                id: group.id(),
                files: group.files().iter().map(|file| file.summary()).collect(),
            });
        }
    };
    let on_progress = {
        let state = state.clone();
        move |event: &BrowserEvent, file: &Rc<FileDescriptor<BrowserFile>>| {
            state.dispatch(UploaderAction::ReadProgress {
                file: file.id(),
                loaded: event.loaded(),
                total: event.total(),
            });
        }
    };
    let on_load = {
        let state = state.clone();
        move |event: &BrowserEvent, file: &Rc<FileDescriptor<BrowserFile>>| {
            state.dispatch(UploaderAction::FileLoaded(file.id()));
            if !file.content_type().starts_with("image/") {
                return;
            }
            if let Some(data_url) = event.result_string() {
                draw_thumbnail(data_url, bounds, file.id(), state.clone());
            }
        }
    };
    let failed = |kind: &'static str| {
        let state = state.clone();
        move |event: &BrowserEvent, file: &Rc<FileDescriptor<BrowserFile>>| {
            let detail = event.error_message().unwrap_or_default();
            console::error!("file read", kind, file.name(), detail);
            state.dispatch(UploaderAction::FileFailed(file.id()));
        }
    };
    let on_skip = {
        let state = state.clone();
        let handles = handles.clone();
        move |file: &Rc<FileDescriptor<BrowserFile>>| {
            handles.borrow_mut().release(file.id());
            state.dispatch(UploaderAction::FileSkipped(file.id()));
        }
    };
    let on_end = {
        let state = state.clone();
        move |group: &Rc<FileGroup<BrowserFile>>| {
            console::log!(format!(
                "Group: {} done (Time to load: {} ms)",
                group.id(),
                group.load_time_ms().unwrap_or_default()
            ));
            state.dispatch(UploaderAction::GroupEnded {
                id: group.id(),
                load_time_ms: group.load_time_ms(),
            });
        }
    };

    CallbacksOverride::default()
        .on_groupstart(on_start)
        .on_progress(on_progress)
        .on_load(on_load)
        .on_error(failed("error"))
        .on_abort(failed("abort"))
        .on_skip(on_skip)
        .on_groupend(on_end)
}

fn draw_thumbnail(
    data_url: String,
    bounds: (u32, u32),
    file: FileId,
    state: UseReducerHandle<UploaderState>,
) {
    spawn_local(async move {
        match render_thumbnail(&data_url, bounds).await {
            Ok(thumbnail) => state.dispatch(UploaderAction::Thumbnail {
                file,
                data_url: thumbnail,
            }),
            Err(err) => console::warn!("thumbnail failed", js_message(&err)),
        }
    });
}

async fn render_thumbnail(data_url: &str, (max_width, max_height): (u32, u32)) -> Result<String, JsValue> {
    let image = HtmlImageElement::new()?;
    image.set_src(data_url);
    JsFuture::from(image.decode()).await?;

    let (width, height) = thumbnail_size(
        image.natural_width(),
        image.natural_height(),
        max_width,
        max_height,
    );
    let canvas: HtmlCanvasElement = gloo::utils::document()
        .create_element("canvas")?
        .dyn_into()?;
    canvas.set_width(width);
    canvas.set_height(height);
    let context: CanvasRenderingContext2d = canvas
        .get_context("2d")?
        .ok_or_else(|| JsValue::from_str("2d context unavailable"))?
        .dyn_into()?;
    context.draw_image_with_html_image_element_and_dw_and_dh(
        &image,
        0.0,
        0.0,
        f64::from(width),
        f64::from(height),
    )?;
    canvas.to_data_url()
}

struct Upload {
    _request: XmlHttpRequest,
    _listeners: [EventListener; 2],
}

fn start_upload(
    url: &str,
    file: FileId,
    handle: &BrowserFile,
    state: &UseReducerHandle<UploaderState>,
    uploads: &Uploads,
    handles: &Handles,
) -> Result<(), JsValue> {
    let request = XmlHttpRequest::new()?;
    request.open("POST", url)?;
    let form = FormData::new()?;
    form.append_with_blob("file", handle.file())?;

    let progress = {
        let state = state.clone();
        EventListener::new(&request.upload()?, "progress", move |event| {
            if let Some(progress) = event.dyn_ref::<ProgressEvent>() {
                state.dispatch(UploaderAction::UploadProgress {
                    file,
                    loaded: byte_count(progress.loaded()),
                    total: byte_count(progress.total()),
                });
            }
        })
    };
    let finished = {
        let state = state.clone();
        let source = request.clone();
        let uploads = uploads.clone();
        let handles = handles.clone();
        EventListener::new(&request, "loadend", move |_event| {
            let ok = source
                .status()
                .is_ok_and(|status| (200..300).contains(&status));
            // Failed uploads keep their handle for a retry.
            if ok {
                handles.borrow_mut().release(file);
            }
            state.dispatch(UploaderAction::UploadFinished { file, ok });
            release_upload(&uploads, file);
        })
    };

    uploads.borrow_mut().insert(
        file,
        Upload {
            _request: request.clone(),
            _listeners: [progress, finished],
        },
    );
    state.dispatch(UploaderAction::UploadProgress {
        file,
        loaded: 0,
        total: 0,
    });
    request.send_with_opt_form_data(Some(&form)).inspect_err(|_| {
        uploads.borrow_mut().remove(&file);
    })
}

fn release_upload(uploads: &Uploads, file: FileId) {
    let uploads = uploads.clone();
    spawn_local(async move {
        let upload = uploads.borrow_mut().remove(&file);
        drop(upload);
    });
}
