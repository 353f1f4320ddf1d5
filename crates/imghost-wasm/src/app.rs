//! The application object the views drive.
//!
//! `ImageHostApp` owns every store plus the session storage. Each network
//! method returns a `Promise`; inside, a store is borrowed only to build the
//! request and again to apply the reply, never across the `await`, so the
//! views may call back into the app while a request is in flight.
//!
//! Failures are reported twice: the promise rejects with the error text, and
//! the notification listener (if any) receives a `{level, message,
//! redirectToLogin}` object. A 401 from any endpoint ends the session and
//! clears all cached user data.

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::rc::Rc;

use imghost_core::api::{
    ApiClient, ApiError, BatchAction, Credentials, FilePart, HttpRequest, ImageUpdate,
    Notification, ProfileUpdate, Registration, Reply, TagDraft,
};
use imghost_core::model::{ImageRecord, Pagination, RecordId, Tag, User};
use imghost_core::session::SessionStorage;
use imghost_core::store::{
    AuthStore, FavoriteMutation, FavoriteStore, FetchTicket, Filters, ImageStore, SortBy,
    TagStore, ToggleOutcome, ViewMode,
};
use imghost_core::upload::{file_part, finish_upload, upload_request, UploadPolicy};
use imghost_core::ClientConfig;
use js_sys::{Array, Function, Promise, Uint8Array};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::{future_to_promise, JsFuture};

use crate::preview::JsImagePreviewer;
use crate::storage::LocalStorage;
use crate::transport::{self, describe};

struct AppState {
    config: ClientConfig,
    storage: Box<dyn SessionStorage>,
    auth: RefCell<AuthStore>,
    images: RefCell<ImageStore>,
    favorites: RefCell<FavoriteStore>,
    tags: RefCell<TagStore>,
    listener: RefCell<Option<Function>>,
}

impl AppState {
    fn new(config: ClientConfig, storage: Box<dyn SessionStorage>) -> Self {
        Self {
            auth: RefCell::new(AuthStore::new(&config)),
            images: RefCell::new(ImageStore::new(&config)),
            favorites: RefCell::new(FavoriteStore::new()),
            tags: RefCell::new(TagStore::new()),
            listener: RefCell::new(None),
            storage,
            config,
        }
    }

    fn client(&self) -> ApiClient {
        self.auth.borrow().client(&self.config)
    }

    async fn send(&self, request: HttpRequest) -> Reply {
        transport::fetch(request, self.config.timeout_ms).await
    }

    fn notify(&self, notification: &Notification) {
        let Some(listener) = self.listener.borrow().clone() else {
            return;
        };
        let delivered = to_js(notification)
            .and_then(|value| listener.call1(&JsValue::NULL, &value));
        if let Err(e) = delivered {
            warn!(error = %describe(&e), "notification listener failed");
        }
    }

    /// Surface a failure. A 401 also ends the session.
    fn report(&self, err: &ApiError) {
        let logged_out = self
            .auth
            .borrow_mut()
            .handle_unauthorized(&*self.storage, err);
        if logged_out {
            self.clear_user_data();
        }
        self.notify(&err.notification());
    }

    fn settle<T>(&self, result: Result<T, ApiError>) -> Result<T, JsValue> {
        result.map_err(|e| {
            self.report(&e);
            api_error(&e)
        })
    }

    fn clear_user_data(&self) {
        self.images.borrow_mut().reset();
        self.favorites.borrow_mut().reset();
        self.tags.borrow_mut().reset();
    }

    async fn load_images(
        &self,
        ticket: FetchTicket,
        request: HttpRequest,
    ) -> Result<bool, JsValue> {
        let reply = self.send(request).await;
        let result = self.images.borrow_mut().finish_fetch(ticket, reply);
        self.settle(result)
    }

    async fn load_favorites(&self) -> Result<(), ApiError> {
        let client = self.client();
        let request = self.favorites.borrow_mut().fetch_request(&client);
        let reply = self.send(request).await;
        self.favorites.borrow_mut().finish_fetch(reply)
    }

    /// Send `pending` and every follow-up it produces, then re-fetch the
    /// list if any settlement asked for it.
    async fn run_favorites(&self, mut pending: Vec<FavoriteMutation>) -> Result<(), JsValue> {
        let mut resync = false;
        let mut failure = None;
        while let Some(mutation) = pending.pop() {
            let request = mutation.request(&self.client());
            let reply = self.send(request).await;
            let outcome = self.favorites.borrow_mut().settle(mutation.ticket, reply);
            pending.extend(outcome.follow_ups);
            resync |= outcome.resync;
            if let Err(e) = outcome.result {
                self.report(&e);
                failure.get_or_insert(e);
            }
        }
        if resync && self.auth.borrow().is_authenticated() {
            if let Err(e) = self.load_favorites().await {
                warn!(error = %e, "favorites resync failed");
                self.report(&e);
            }
        }
        match failure {
            Some(e) => Err(api_error(&e)),
            None => Ok(()),
        }
    }

    async fn upload(
        &self,
        files: Vec<FilePart>,
        on_progress: Option<Function>,
    ) -> Result<Value, JsValue> {
        let client = self.client();
        let request = upload_request(&client, files);
        let reply = transport::upload(request, self.config.timeout_ms, move |percent| {
            if let Some(callback) = &on_progress {
                report_progress(callback, percent);
            }
        })
        .await;
        let uploaded = self.settle(finish_upload(reply))?;
        info!("upload complete");
        self.notify(&Notification::success("Upload complete"));
        Ok(uploaded)
    }
}

/// Hand `percent` to the view. A throwing callback is logged and the
/// upload carries on.
fn report_progress(callback: &Function, percent: u8) -> bool {
    match callback.call1(&JsValue::NULL, &JsValue::from(percent)) {
        Ok(_) => true,
        Err(e) => {
            warn!(error = %describe(&e), percent, "upload progress callback failed");
            false
        }
    }
}

fn api_error(err: &ApiError) -> JsValue {
    JsValue::from_str(&err.to_string())
}

/// Plain-object serialization (maps become objects, not `Map`s).
fn to_js<T: Serialize + ?Sized>(value: &T) -> Result<JsValue, JsValue> {
    Ok(value.serialize(&serde_wasm_bindgen::Serializer::json_compatible())?)
}

fn from_js<T: DeserializeOwned>(value: JsValue) -> Result<T, JsValue> {
    Ok(serde_wasm_bindgen::from_value(value)?)
}

/// Parse a lowercase enum name such as `"largest"` or `"grid"`.
fn parse_name<T: DeserializeOwned>(name: &str) -> Result<T, JsValue> {
    serde_json::from_value(Value::String(name.to_string()))
        .map_err(|_| JsValue::from_str(&format!("Unknown value: {name}")))
}

fn now_secs() -> i64 {
    (js_sys::Date::now() / 1000.0) as i64
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StoreStatus {
    loading: bool,
    error: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Snapshot<'a> {
    authenticated: bool,
    user: Option<&'a User>,
    images: &'a [ImageRecord],
    pagination: Pagination,
    filters: &'a Filters,
    view_mode: ViewMode,
    selection_mode: bool,
    selected: &'a BTreeSet<RecordId>,
    current_image: Option<&'a ImageRecord>,
    favorite_ids: BTreeSet<RecordId>,
    favorite_images: &'a [ImageRecord],
    tags: &'a [Tag],
    current_tag: Option<&'a Tag>,
    auth_status: StoreStatus,
    image_status: StoreStatus,
    favorite_status: StoreStatus,
    tag_status: StoreStatus,
}

#[derive(Serialize)]
struct DeleteSummary {
    deleted: Vec<RecordId>,
    failed: Vec<RecordId>,
}

/// Client state and operations for one browser tab.
#[wasm_bindgen]
pub struct ImageHostApp {
    state: Rc<AppState>,
}

#[wasm_bindgen]
impl ImageHostApp {
    /// Create the app from a (possibly partial) config object; `undefined`
    /// takes every default. The session persists in `localStorage`.
    #[wasm_bindgen(constructor)]
    pub fn new(config: JsValue) -> Result<ImageHostApp, JsValue> {
        let config: ClientConfig = if config.is_undefined() || config.is_null() {
            ClientConfig::default()
        } else {
            from_js(config)?
        };
        config
            .validate()
            .map_err(|e| JsValue::from_str(&e.to_string()))?;
        Ok(Self::with_storage(config, Box::new(LocalStorage::open())))
    }

    /// Restore the persisted session. Expired tokens are discarded.
    pub fn initialize(&self) -> bool {
        let restored = self
            .state
            .auth
            .borrow_mut()
            .initialize(&*self.state.storage, now_secs());
        debug!(restored, "app initialized");
        restored
    }

    /// Register the callback that receives notifications; `undefined`
    /// removes it.
    pub fn on_notification(&self, listener: Option<Function>) {
        *self.state.listener.borrow_mut() = listener;
    }

    /// Everything the views render, as one plain object.
    pub fn snapshot(&self) -> Result<JsValue, JsValue> {
        let auth = self.state.auth.borrow();
        let images = self.state.images.borrow();
        let favorites = self.state.favorites.borrow();
        let tags = self.state.tags.borrow();
        let status = |activity: &imghost_core::store::Activity| StoreStatus {
            loading: activity.is_loading(),
            error: activity.error().map(str::to_string),
        };
        to_js(&Snapshot {
            authenticated: auth.is_authenticated(),
            user: auth.user(),
            images: images.images(),
            pagination: images.pagination(),
            filters: images.filters(),
            view_mode: images.view_mode(),
            selection_mode: images.selection_mode(),
            selected: images.selected(),
            current_image: images.current(),
            favorite_ids: favorites.favorite_ids(),
            favorite_images: favorites.favorite_images(),
            tags: tags.tags(),
            current_tag: tags.current(),
            auth_status: status(auth.activity()),
            image_status: status(images.activity()),
            favorite_status: status(favorites.activity()),
            tag_status: status(tags.activity()),
        })
    }

    pub fn clear_errors(&self) {
        self.state.auth.borrow_mut().clear_error();
        self.state.images.borrow_mut().clear_error();
        self.state.favorites.borrow_mut().clear_error();
        self.state.tags.borrow_mut().clear_error();
    }

    // ===== Auth =====

    #[wasm_bindgen(getter)]
    pub fn is_authenticated(&self) -> bool {
        self.state.auth.borrow().is_authenticated()
    }

    pub fn login(&self, username: String, password: String) -> Promise {
        let state = Rc::clone(&self.state);
        future_to_promise(async move {
            let client = state.client();
            let credentials = Credentials { username, password };
            let request = state.auth.borrow_mut().login_request(&client, &credentials);
            let reply = state.send(request).await;
            let result = state
                .auth
                .borrow_mut()
                .finish_login(&*state.storage, reply);
            let user = state.settle(result)?;
            state.notify(&Notification::success("Signed in"));
            to_js(&user)
        })
    }

    pub fn register(&self, username: String, email: String, password: String) -> Promise {
        let state = Rc::clone(&self.state);
        future_to_promise(async move {
            let client = state.client();
            let registration = Registration {
                username,
                email,
                password,
            };
            let request = state
                .auth
                .borrow_mut()
                .register_request(&client, &registration);
            let reply = state.send(request).await;
            let result = state
                .auth
                .borrow_mut()
                .finish_register(&*state.storage, reply);
            let user = state.settle(result)?;
            state.notify(&Notification::success("Account created"));
            to_js(&user)
        })
    }

    pub fn logout(&self) {
        self.state.auth.borrow_mut().logout(&*self.state.storage);
        self.state.clear_user_data();
        info!("signed out");
    }

    pub fn fetch_user(&self) -> Promise {
        let state = Rc::clone(&self.state);
        future_to_promise(async move {
            let client = state.client();
            let request = state.auth.borrow_mut().fetch_user_request(&client);
            let reply = state.send(request).await;
            let result = state
                .auth
                .borrow_mut()
                .finish_fetch_user(&*state.storage, reply);
            let user = state.settle(result)?;
            to_js(&user)
        })
    }

    /// `update` is `{username?, email?, bio?, avatar?}`.
    pub fn update_profile(&self, update: JsValue) -> Promise {
        let state = Rc::clone(&self.state);
        future_to_promise(async move {
            let update: ProfileUpdate = from_js(update)?;
            let client = state.client();
            let request = state
                .auth
                .borrow_mut()
                .update_profile_request(&client, &update);
            let reply = state.send(request).await;
            let result = state
                .auth
                .borrow_mut()
                .finish_update_profile(&*state.storage, reply);
            let user = state.settle(result)?;
            state.notify(&Notification::success("Profile updated"));
            to_js(&user)
        })
    }

    pub fn change_password(&self, current_password: String, new_password: String) -> Promise {
        let state = Rc::clone(&self.state);
        future_to_promise(async move {
            let client = state.client();
            let request = state.auth.borrow_mut().change_password_request(
                &client,
                &current_password,
                &new_password,
            );
            let reply = state.send(request).await;
            let result = state.auth.borrow_mut().finish_change_password(reply);
            state.settle(result)?;
            state.notify(&Notification::success("Password changed"));
            Ok(JsValue::UNDEFINED)
        })
    }

    pub fn update_avatar(&self, avatar_url: String) -> Promise {
        let state = Rc::clone(&self.state);
        future_to_promise(async move {
            let client = state.client();
            let request = state
                .auth
                .borrow_mut()
                .update_avatar_request(&client, &avatar_url);
            let reply = state.send(request).await;
            let result = state
                .auth
                .borrow_mut()
                .finish_update_avatar(&*state.storage, reply);
            let user = state.settle(result)?;
            to_js(&user)
        })
    }

    /// Merge locally edited fields into the cached user without a request.
    pub fn update_user(&self, patch: JsValue) -> Result<(), JsValue> {
        let patch: Map<String, Value> = from_js(patch)?;
        self.state
            .auth
            .borrow_mut()
            .update_user(&*self.state.storage, &patch)
            .map_err(|e| JsValue::from_str(&e.to_string()))
    }

    // ===== Images =====

    /// Load `page` (the current page when omitted). Resolves to `false` when
    /// a newer listing request superseded this one.
    pub fn fetch_images(&self, page: Option<u32>) -> Promise {
        let state = Rc::clone(&self.state);
        future_to_promise(async move {
            let client = state.client();
            let (ticket, request) = {
                let mut images = state.images.borrow_mut();
                let page = page.unwrap_or(images.pagination().page);
                images.fetch_request(&client, page)
            };
            let applied = state.load_images(ticket, request).await?;
            Ok(JsValue::from(applied))
        })
    }

    /// Search by name, back on page 1.
    pub fn search(&self, query: String) -> Promise {
        let state = Rc::clone(&self.state);
        future_to_promise(async move {
            let client = state.client();
            let (ticket, request) = state.images.borrow_mut().search(&client, &query);
            let applied = state.load_images(ticket, request).await?;
            Ok(JsValue::from(applied))
        })
    }

    /// Restrict the listing to one tag (empty for all), back on page 1.
    pub fn filter_by_tag(&self, tag: String) -> Promise {
        let state = Rc::clone(&self.state);
        future_to_promise(async move {
            let client = state.client();
            let (ticket, request) = state.images.borrow_mut().filter_by_tag(&client, &tag);
            let applied = state.load_images(ticket, request).await?;
            Ok(JsValue::from(applied))
        })
    }

    /// `"newest" | "oldest" | "largest" | "smallest" | "name"`
    pub fn set_sort_by(&self, sort_by: &str) -> Result<(), JsValue> {
        let sort_by: SortBy = parse_name(sort_by)?;
        self.state.images.borrow_mut().set_sort_by(sort_by);
        Ok(())
    }

    /// `"grid" | "list" | "timeline"`
    pub fn set_view_mode(&self, view_mode: &str) -> Result<(), JsValue> {
        let view_mode: ViewMode = parse_name(view_mode)?;
        self.state.images.borrow_mut().set_view_mode(view_mode);
        Ok(())
    }

    pub fn set_current_image(&self, image: JsValue) -> Result<(), JsValue> {
        let image: Option<ImageRecord> = if image.is_null() || image.is_undefined() {
            None
        } else {
            Some(from_js(image)?)
        };
        self.state.images.borrow_mut().set_current(image);
        Ok(())
    }

    pub fn delete_image(&self, id: JsValue) -> Promise {
        let state = Rc::clone(&self.state);
        future_to_promise(async move {
            let id: RecordId = from_js(id)?;
            let client = state.client();
            let request = state.images.borrow_mut().delete_request(&client, &id);
            let reply = state.send(request).await;
            let result = state.images.borrow_mut().finish_delete(&id, reply);
            state.settle(result)?;
            state.notify(&Notification::success("Image deleted"));
            Ok(JsValue::UNDEFINED)
        })
    }

    /// Delete every selected image. Resolves to `{deleted, failed}` id lists.
    pub fn delete_selected(&self) -> Promise {
        let state = Rc::clone(&self.state);
        future_to_promise(async move {
            let ids: Vec<RecordId> = state.images.borrow().selected().iter().cloned().collect();
            if ids.is_empty() {
                return to_js(&DeleteSummary {
                    deleted: Vec::new(),
                    failed: Vec::new(),
                });
            }
            let client = state.client();
            let requests = state.images.borrow_mut().delete_many_requests(&client, &ids);
            let mut replies = Vec::with_capacity(requests.len());
            for (id, request) in requests {
                replies.push((id, state.send(request).await));
            }
            let report = state.images.borrow_mut().finish_delete_many(replies);
            match report.failed.first() {
                Some((_, e)) => state.report(e),
                None => state.notify(&Notification::success(format!(
                    "Deleted {} images",
                    report.deleted.len()
                ))),
            }
            to_js(&DeleteSummary {
                failed: report.failed.into_iter().map(|(id, _)| id).collect(),
                deleted: report.deleted,
            })
        })
    }

    /// `update` is `{fileName?, tags?}`. Resolves to the updated record, or
    /// `null` when it is not in the loaded page.
    pub fn update_image(&self, id: JsValue, update: JsValue) -> Promise {
        let state = Rc::clone(&self.state);
        future_to_promise(async move {
            let id: RecordId = from_js(id)?;
            let update: ImageUpdate = from_js(update)?;
            let client = state.client();
            let request = state
                .images
                .borrow_mut()
                .update_request(&client, &id, &update);
            let reply = state.send(request).await;
            let result = state.images.borrow_mut().finish_update(&id, reply);
            let updated = state.settle(result)?;
            to_js(&updated)
        })
    }

    // ===== Selection =====

    pub fn toggle_selection_mode(&self) {
        self.state.images.borrow_mut().toggle_selection_mode();
    }

    pub fn toggle_selected(&self, id: JsValue) -> Result<(), JsValue> {
        let id: RecordId = from_js(id)?;
        self.state.images.borrow_mut().toggle_selected(id);
        Ok(())
    }

    pub fn toggle_select_all(&self) {
        self.state.images.borrow_mut().toggle_select_all();
    }

    pub fn clear_selection(&self) {
        self.state.images.borrow_mut().clear_selection();
    }

    // ===== Favorites =====

    pub fn fetch_favorites(&self) -> Promise {
        let state = Rc::clone(&self.state);
        future_to_promise(async move {
            let result = state.load_favorites().await;
            state.settle(result)?;
            Ok(JsValue::UNDEFINED)
        })
    }

    pub fn is_favorite(&self, id: JsValue) -> Result<bool, JsValue> {
        let id: RecordId = from_js(id)?;
        Ok(self.state.favorites.borrow().is_favorite(&id))
    }

    /// Flip the favorite state of one image. The change is visible as soon
    /// as this returns; the promise resolves to the state after the service
    /// answered.
    pub fn toggle_favorite(&self, id: JsValue) -> Promise {
        let id: RecordId = match from_js(id) {
            Ok(id) => id,
            Err(e) => return Promise::reject(&e),
        };
        let outcome = self.state.favorites.borrow_mut().toggle(id.clone());
        let state = Rc::clone(&self.state);
        future_to_promise(async move {
            if let ToggleOutcome::Issued(mutation) = outcome {
                state.run_favorites(vec![mutation]).await?;
            }
            let favorite = state.favorites.borrow().is_favorite(&id);
            Ok(JsValue::from(favorite))
        })
    }

    /// Favorite (`add = true`) or unfavorite every selected image. Like
    /// [`Self::toggle_favorite`], the change is visible immediately.
    pub fn favorite_selected(&self, add: bool) -> Promise {
        let ids: Vec<RecordId> = self.state.images.borrow().selected().iter().cloned().collect();
        let mutation = {
            let mut favorites = self.state.favorites.borrow_mut();
            if add {
                favorites.add_many(&ids)
            } else {
                favorites.remove_many(&ids)
            }
        };
        let state = Rc::clone(&self.state);
        future_to_promise(async move {
            if let Some(mutation) = mutation {
                state.run_favorites(vec![mutation]).await?;
            }
            Ok(JsValue::UNDEFINED)
        })
    }

    // ===== Tags =====

    pub fn fetch_tags(&self) -> Promise {
        let state = Rc::clone(&self.state);
        future_to_promise(async move {
            let client = state.client();
            let request = state.tags.borrow_mut().fetch_request(&client);
            let reply = state.send(request).await;
            let result = state.tags.borrow_mut().finish_fetch(reply);
            state.settle(result)?;
            Ok(JsValue::UNDEFINED)
        })
    }

    pub fn create_tag(&self, name: String, color: String) -> Promise {
        let state = Rc::clone(&self.state);
        future_to_promise(async move {
            let client = state.client();
            let draft = TagDraft { name, color };
            let request = state.tags.borrow_mut().create_request(&client, &draft);
            let reply = state.send(request).await;
            let result = state.tags.borrow_mut().finish_create(reply);
            let tag = state.settle(result)?;
            state.notify(&Notification::success("Tag created"));
            to_js(&tag)
        })
    }

    pub fn update_tag(&self, id: JsValue, name: String, color: String) -> Promise {
        let state = Rc::clone(&self.state);
        future_to_promise(async move {
            let id: RecordId = from_js(id)?;
            let client = state.client();
            let draft = TagDraft { name, color };
            let request = state.tags.borrow_mut().update_request(&client, &id, &draft);
            let reply = state.send(request).await;
            let result = state.tags.borrow_mut().finish_update(&id, reply);
            let tag = state.settle(result)?;
            to_js(&tag)
        })
    }

    pub fn delete_tag(&self, id: JsValue) -> Promise {
        let state = Rc::clone(&self.state);
        future_to_promise(async move {
            let id: RecordId = from_js(id)?;
            let client = state.client();
            let request = state.tags.borrow_mut().delete_request(&client, &id);
            let reply = state.send(request).await;
            let result = state.tags.borrow_mut().finish_delete(&id, reply);
            state.settle(result)?;
            state.notify(&Notification::success("Tag deleted"));
            Ok(JsValue::UNDEFINED)
        })
    }

    pub fn set_current_tag(&self, tag: JsValue) -> Result<(), JsValue> {
        let tag: Option<Tag> = if tag.is_null() || tag.is_undefined() {
            None
        } else {
            Some(from_js(tag)?)
        };
        self.state.tags.borrow_mut().set_current(tag);
        Ok(())
    }

    /// Images carrying the tag. Not cached.
    pub fn tag_images(&self, id: JsValue) -> Promise {
        let state = Rc::clone(&self.state);
        future_to_promise(async move {
            let id: RecordId = from_js(id)?;
            let client = state.client();
            let request = state.tags.borrow_mut().images_request(&client, &id);
            let reply = state.send(request).await;
            let result = state.tags.borrow_mut().finish_images(reply);
            let images = state.settle(result)?;
            to_js(&images)
        })
    }

    /// `action` is `"add"` or `"remove"`; both id arguments are arrays.
    pub fn batch_tag(&self, action: String, image_ids: JsValue, tag_ids: JsValue) -> Promise {
        let state = Rc::clone(&self.state);
        future_to_promise(async move {
            let action: BatchAction = parse_name(&action)?;
            let image_ids: Vec<RecordId> = from_js(image_ids)?;
            let tag_ids: Vec<RecordId> = from_js(tag_ids)?;
            let client = state.client();
            let request =
                state
                    .tags
                    .borrow_mut()
                    .batch_request(&client, action, &image_ids, &tag_ids);
            let reply = state.send(request).await;
            let result = state.tags.borrow_mut().finish_batch(reply);
            state.settle(result)?;
            Ok(JsValue::UNDEFINED)
        })
    }

    // ===== Upload =====

    /// Upload an array of `File`s in one request. Files that break the
    /// configured limits reject the whole batch before anything is sent.
    /// `on_progress` receives whole percentages.
    pub fn upload_files(&self, files: Array, on_progress: Option<Function>) -> Promise {
        let state = Rc::clone(&self.state);
        future_to_promise(async move {
            let policy = UploadPolicy::from_config(&state.config);
            let mut parts = Vec::with_capacity(files.length() as usize);
            let mut problems = Vec::new();
            for value in files.iter() {
                let file: web_sys::File = value.dyn_into()?;
                let name = file.name();
                let content_type = file.type_();
                for problem in policy.check(&name, &content_type, file.size() as u64) {
                    problems.push(format!("{name}: {problem}"));
                }
                if !problems.is_empty() {
                    continue;
                }
                let buffer = JsFuture::from(file.array_buffer()).await?;
                parts.push(file_part(&name, &content_type, Uint8Array::new(&buffer).to_vec()));
            }
            if !problems.is_empty() {
                warn!(count = problems.len(), "upload rejected before sending");
                return Err(JsValue::from_str(&problems.join("\n")));
            }
            let uploaded = state.upload(parts, on_progress).await?;
            to_js(&uploaded)
        })
    }

    /// Export the editor's current render as JPEG and upload it under
    /// `original_name` (or `edited-image.jpg`).
    pub fn upload_edited(
        &self,
        previewer: &JsImagePreviewer,
        original_name: Option<String>,
        on_progress: Option<Function>,
    ) -> Promise {
        let exported =
            previewer.export(original_name.as_deref(), Some(self.state.config.export_quality));
        let state = Rc::clone(&self.state);
        future_to_promise(async move {
            let part = exported?.into_file_part();
            let uploaded = state.upload(vec![part], on_progress).await?;
            to_js(&uploaded)
        })
    }
}

impl ImageHostApp {
    pub(crate) fn with_storage(config: ClientConfig, storage: Box<dyn SessionStorage>) -> Self {
        Self {
            state: Rc::new(AppState::new(config, storage)),
        }
    }
}

#[cfg(all(test, target_arch = "wasm32"))]
mod wasm_tests {
    use super::*;
    use imghost_core::session::MemoryStorage;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    fn app() -> ImageHostApp {
        ImageHostApp::with_storage(ClientConfig::default(), Box::new(MemoryStorage::new()))
    }

    fn field(value: &JsValue, name: &str) -> JsValue {
        js_sys::Reflect::get(value, &JsValue::from_str(name)).unwrap()
    }

    #[wasm_bindgen_test]
    fn test_fresh_app_is_logged_out() {
        let app = app();
        assert!(!app.initialize());
        assert!(!app.is_authenticated());
        let snapshot = app.snapshot().unwrap();
        assert_eq!(field(&snapshot, "authenticated"), JsValue::FALSE);
        assert_eq!(field(&snapshot, "viewMode").as_string().as_deref(), Some("grid"));
    }

    #[wasm_bindgen_test]
    fn test_invalid_config_rejected() {
        let config = js_sys::JSON::parse(r#"{"pageLimit": 0}"#).unwrap();
        assert!(ImageHostApp::new(config).is_err());
    }

    #[wasm_bindgen_test]
    fn test_unknown_sort_rejected() {
        let app = app();
        assert!(app.set_sort_by("largest").is_ok());
        assert!(app.set_sort_by("random").is_err());
        assert!(app.set_view_mode("timeline").is_ok());
    }

    #[wasm_bindgen_test]
    fn test_selection_round_trip() {
        let app = app();
        app.toggle_selection_mode();
        app.toggle_selected(JsValue::from(7)).unwrap();
        let snapshot = app.snapshot().unwrap();
        assert_eq!(field(&snapshot, "selectionMode"), JsValue::TRUE);
        let selected: Array = field(&snapshot, "selected").dyn_into().unwrap();
        assert_eq!(selected.length(), 1);
        app.clear_selection();
        let selected: Array = field(&app.snapshot().unwrap(), "selected").dyn_into().unwrap();
        assert_eq!(selected.length(), 0);
    }

    #[wasm_bindgen_test]
    fn test_notification_listener_receives_errors() {
        let app = app();
        let seen = Rc::new(RefCell::new(Vec::<JsValue>::new()));
        let sink = Rc::clone(&seen);
        let listener = Closure::<dyn FnMut(JsValue)>::new(move |n: JsValue| {
            sink.borrow_mut().push(n);
        });
        app.on_notification(Some(listener.as_ref().unchecked_ref::<Function>().clone()));
        app.state.report(&ApiError::Unauthorized { message: None });
        assert_eq!(seen.borrow().len(), 1);
        let notification = &seen.borrow()[0];
        assert_eq!(field(notification, "redirectToLogin"), JsValue::TRUE);
        assert_eq!(field(notification, "level").as_string().as_deref(), Some("error"));
    }

    #[wasm_bindgen_test]
    fn test_toggle_favorite_flips_before_reply() {
        let app = app();
        let _pending = app.toggle_favorite(JsValue::from(3));
        assert!(app.is_favorite(JsValue::from(3)).unwrap());
        assert!(app.state.favorites.borrow().has_pending());
    }

    #[wasm_bindgen_test]
    fn test_favorite_selected_flips_before_reply() {
        let app = app();
        app.toggle_selection_mode();
        app.toggle_selected(JsValue::from(4)).unwrap();
        app.toggle_selected(JsValue::from(5)).unwrap();
        let _pending = app.favorite_selected(true);
        assert!(app.is_favorite(JsValue::from(4)).unwrap());
        assert!(app.is_favorite(JsValue::from(5)).unwrap());
    }

    #[wasm_bindgen_test]
    fn test_throwing_progress_callback_is_contained() {
        let throwing = Function::new_with_args("p", "throw new Error('bad ' + p)");
        assert!(!report_progress(&throwing, 40));
        let quiet = Function::new_with_args("p", "return p");
        assert!(report_progress(&quiet, 40));
    }
}
