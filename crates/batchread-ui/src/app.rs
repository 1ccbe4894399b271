//! Application shell and wasm entrypoint.

use yew::prelude::*;

use crate::uploader::Uploader;

const DEFAULT_UPLOAD_URL: &str = "/upload";

#[function_component(BatchreadApp)]
fn batchread_app() -> Html {
    let upload_url = use_memo(|_| upload_url(), ());

    html! {
        <main class="batchread">
            <h1>{"Batch file reader"}</h1>
            <Uploader upload_url={(*upload_url).clone()} />
        </main>
    }
}

/// Upload target from `data-upload-url` on the root element.
fn upload_url() -> AttrValue {
    gloo::utils::document()
        .get_element_by_id("root")
        .and_then(|root| root.get_attribute("data-upload-url"))
        .filter(|url| !url.trim().is_empty())
        .map_or(AttrValue::Static(DEFAULT_UPLOAD_URL), AttrValue::from)
}

/// Entrypoint invoked by the wasm binary.
pub fn run_app() {
    console_error_panic_hook::set_once();
    if let Some(root) = gloo::utils::document().get_element_by_id("root") {
        yew::Renderer::<BatchreadApp>::with_root(root).render();
    } else {
        yew::Renderer::<BatchreadApp>::new().render();
    }
}
