//! Sends core [`HttpRequest`]s from the browser.
//!
//! Plain requests go through `fetch` with an `AbortController` deadline.
//! Uploads go through `XMLHttpRequest`, the only browser API that reports
//! upload progress.

use std::cell::Cell;
use std::rc::Rc;

use imghost_core::api::{Body, FilePart, HttpRequest, HttpResponse, Reply, TransportError};
use imghost_core::upload::progress_percent;
use js_sys::{Array, Promise, Uint8Array};
use tracing::{debug, warn};
use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::{
    AbortController, AbortSignal, Blob, BlobPropertyBag, FormData, Headers, ProgressEvent,
    Request, RequestInit, Response, Window, XmlHttpRequest, XmlHttpRequestResponseType,
};

/// Best-effort text for a thrown JS value.
pub(crate) fn describe(value: &JsValue) -> String {
    value
        .as_string()
        .or_else(|| {
            value
                .dyn_ref::<js_sys::Error>()
                .map(|e| String::from(e.message()))
        })
        .unwrap_or_else(|| format!("{value:?}"))
}

fn network(value: JsValue) -> TransportError {
    TransportError::Network(describe(&value))
}

/// Multipart body with one blob per file.
pub(crate) fn form_data(parts: &[FilePart]) -> Result<FormData, JsValue> {
    let form = FormData::new()?;
    for part in parts {
        let bytes = Uint8Array::from(part.bytes.as_slice());
        let options = BlobPropertyBag::new();
        options.set_type(&part.content_type);
        let blob = Blob::new_with_u8_array_sequence_and_options(&Array::of1(&bytes), &options)?;
        form.append_with_blob_and_filename(&part.field, &blob, &part.file_name)?;
    }
    Ok(form)
}

fn body_value(body: &Body) -> Result<Option<JsValue>, JsValue> {
    match body {
        Body::Empty => Ok(None),
        Body::Json(value) => Ok(Some(JsValue::from_str(&value.to_string()))),
        Body::Multipart(parts) => Ok(Some(form_data(parts)?.into())),
    }
}

/// Aborts the controller when the timer fires; cancels the timer on drop.
struct Deadline {
    window: Window,
    handle: i32,
    _on_expire: Closure<dyn FnMut()>,
}

impl Deadline {
    fn arm(
        window: &Window,
        controller: &AbortController,
        timeout_ms: u32,
    ) -> Result<Self, JsValue> {
        let controller = controller.clone();
        let on_expire = Closure::<dyn FnMut()>::new(move || controller.abort());
        let handle = window.set_timeout_with_callback_and_timeout_and_arguments_0(
            on_expire.as_ref().unchecked_ref(),
            i32::try_from(timeout_ms).unwrap_or(i32::MAX),
        )?;
        Ok(Self {
            window: window.clone(),
            handle,
            _on_expire: on_expire,
        })
    }
}

impl Drop for Deadline {
    fn drop(&mut self) {
        self.window.clear_timeout_with_handle(self.handle);
    }
}

/// Send `request` with `fetch`. Never fails with a JS exception: every
/// problem becomes a [`TransportError`].
pub(crate) async fn fetch(request: HttpRequest, timeout_ms: u32) -> Reply {
    let window =
        web_sys::window().ok_or_else(|| TransportError::Network("no window".to_string()))?;
    let controller = AbortController::new().map_err(network)?;
    let _deadline = Deadline::arm(&window, &controller, timeout_ms).map_err(network)?;

    debug!(method = request.method.as_str(), url = %request.url, "fetch");
    let signal = controller.signal();
    match send(&window, &request, &signal).await {
        Ok(response) => {
            debug!(status = response.status, url = %request.url, "fetch complete");
            Ok(response)
        }
        Err(_) if signal.aborted() => {
            warn!(url = %request.url, timeout_ms, "request timed out");
            Err(TransportError::Timeout(timeout_ms))
        }
        Err(e) => {
            let error = network(e);
            warn!(url = %request.url, %error, "request failed");
            Err(error)
        }
    }
}

async fn send(
    window: &Window,
    request: &HttpRequest,
    signal: &AbortSignal,
) -> Result<HttpResponse, JsValue> {
    let init = RequestInit::new();
    init.set_method(request.method.as_str());
    init.set_signal(Some(signal));
    if let Some(body) = body_value(&request.body)? {
        init.set_body(&body);
    }
    let headers = Headers::new()?;
    for (name, value) in &request.headers {
        headers.set(name, value)?;
    }
    init.set_headers(&headers);

    let js_request = Request::new_with_str_and_init(&request.url, &init)?;
    let response: Response = JsFuture::from(window.fetch_with_request(&js_request))
        .await?
        .dyn_into()?;
    let buffer = JsFuture::from(response.array_buffer()?).await?;
    Ok(HttpResponse::new(
        response.status(),
        Uint8Array::new(&buffer).to_vec(),
    ))
}

/// Send a multipart `request` with `XMLHttpRequest`, reporting upload
/// progress in whole percent. Non-multipart requests go through [`fetch`].
pub(crate) async fn upload(
    request: HttpRequest,
    timeout_ms: u32,
    mut on_progress: impl FnMut(u8) + 'static,
) -> Reply {
    let Body::Multipart(parts) = &request.body else {
        return fetch(request, timeout_ms).await;
    };
    let form = form_data(parts).map_err(network)?;

    let xhr = XmlHttpRequest::new().map_err(network)?;
    xhr.open(request.method.as_str(), &request.url)
        .map_err(network)?;
    for (name, value) in &request.headers {
        xhr.set_request_header(name, value).map_err(network)?;
    }
    xhr.set_timeout(timeout_ms);
    xhr.set_response_type(XmlHttpRequestResponseType::Arraybuffer);

    let progress = Closure::<dyn FnMut(ProgressEvent)>::new(move |event: ProgressEvent| {
        let total = event.length_computable().then(|| event.total() as u64);
        if let Some(percent) = progress_percent(event.loaded() as u64, total) {
            on_progress(percent);
        }
    });
    xhr.upload()
        .map_err(network)?
        .set_onprogress(Some(progress.as_ref().unchecked_ref()));

    let timed_out = Rc::new(Cell::new(false));
    let flag = Rc::clone(&timed_out);
    let on_timeout = Closure::<dyn FnMut()>::new(move || flag.set(true));
    xhr.set_ontimeout(Some(on_timeout.as_ref().unchecked_ref()));

    // `loadend` fires once after success, error, timeout or abort.
    let finished = Promise::new(&mut |resolve, _reject| xhr.set_onloadend(Some(&resolve)));

    debug!(url = %request.url, files = parts.len(), "upload started");
    xhr.send_with_opt_form_data(Some(&form)).map_err(network)?;
    JsFuture::from(finished).await.map_err(network)?;

    if timed_out.get() {
        warn!(url = %request.url, timeout_ms, "upload timed out");
        return Err(TransportError::Timeout(timeout_ms));
    }
    let status = xhr.status().map_err(network)?;
    if status == 0 {
        warn!(url = %request.url, "upload failed before a response");
        return Err(TransportError::Network("upload failed".to_string()));
    }
    let body = xhr.response().map_err(network)?;
    let bytes = if body.is_null() || body.is_undefined() {
        Vec::new()
    } else {
        Uint8Array::new(&body).to_vec()
    };
    debug!(status, url = %request.url, "upload complete");
    Ok(HttpResponse::new(status, bytes))
}

#[cfg(all(test, target_arch = "wasm32"))]
mod wasm_tests {
    use super::*;
    use imghost_core::upload::file_part;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    #[wasm_bindgen_test]
    fn test_form_data_carries_every_file() {
        let parts = vec![
            file_part("a.png", "image/png", vec![1, 2, 3]),
            file_part("b.jpg", "image/jpeg", vec![4, 5]),
        ];
        let form = form_data(&parts).unwrap();
        assert_eq!(form.get_all("file").length(), 2);
    }

    #[wasm_bindgen_test]
    fn test_json_body_is_text() {
        let body = body_value(&Body::Json(serde_json::json!({"name": "sky"})))
            .unwrap()
            .unwrap();
        assert_eq!(body.as_string().as_deref(), Some(r#"{"name":"sky"}"#));
    }

    #[wasm_bindgen_test]
    fn test_describe_error_values() {
        assert_eq!(describe(&JsValue::from_str("boom")), "boom");
        let error: JsValue = js_sys::Error::new("bad gateway").into();
        assert_eq!(describe(&error), "bad gateway");
    }
}
