//! Request construction for every endpoint the client consumes, plus
//! response decoding.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use super::error::ApiError;
use super::request::{path_segment, with_query, Body, FilePart, HttpRequest, Method, Reply};
use crate::config::ClientConfig;
use crate::model::{ImageRecord, PaginationPatch, RecordId, Tag, User};

/// Builds requests against the service, attaching the bearer token of the
/// current session when there is one.
#[derive(Debug, Clone, Default)]
pub struct ApiClient {
    base_url: String,
    token: Option<String>,
}

/// Login form payload. `username` may also hold an email address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Registration form payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Editable profile fields; absent fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

/// Editable image fields; absent fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<RecordId>>,
}

/// Name and color of a tag being created or edited.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagDraft {
    pub name: String,
    pub color: String,
}

/// Query parameters of the image listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageQuery {
    pub page: u32,
    pub limit: u32,
    pub query: String,
    pub tag: String,
}

/// Direction of a batch operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchAction {
    Add,
    Remove,
}

/// `{user, token}` returned by login and registration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AuthResponse {
    pub user: User,
    pub token: String,
}

/// `{user}` returned by profile endpoints.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UserResponse {
    pub user: User,
}

/// `{files, pagination}` returned by the image listing.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ImagePage {
    #[serde(default)]
    pub files: Vec<ImageRecord>,
    #[serde(default)]
    pub pagination: PaginationPatch,
}

/// `{file}` returned by an image update; may be partial.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FilePatchResponse {
    #[serde(default)]
    pub file: Map<String, Value>,
}

/// `{images}` returned by favorites and per-tag listings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ImageList {
    #[serde(default)]
    pub images: Vec<ImageRecord>,
}

/// `{tags}` returned by the tag listing.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TagList {
    #[serde(default)]
    pub tags: Vec<Tag>,
}

/// `{tag}` returned by tag create/update.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TagResponse {
    pub tag: Tag,
}

fn segment(id: &RecordId) -> String {
    path_segment(&id.to_string())
}

impl ApiClient {
    pub fn new(config: &ClientConfig) -> Self {
        Self {
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            token: None,
        }
    }

    /// Attach (or clear) the bearer token.
    pub fn with_token(mut self, token: Option<&str>) -> Self {
        self.token = token.map(str::to_string);
        self
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    fn request(&self, method: Method, path: &str, body: Body) -> HttpRequest {
        let mut headers = Vec::new();
        if let Some(token) = &self.token {
            headers.push(("Authorization".to_string(), format!("Bearer {token}")));
        }
        // Multipart boundaries are chosen by the transport.
        if matches!(body, Body::Json(_)) {
            headers.push(("Content-Type".to_string(), "application/json".to_string()));
        }
        HttpRequest {
            method,
            url: format!("{}{}", self.base_url, path),
            headers,
            body,
        }
    }

    fn json<T: Serialize>(&self, method: Method, path: &str, payload: &T) -> HttpRequest {
        // Payload types here are plain structs; serialization cannot fail.
        let value = serde_json::to_value(payload).unwrap_or(Value::Null);
        self.request(method, path, Body::Json(value))
    }

    // ===== Auth =====

    pub fn login(&self, credentials: &Credentials) -> HttpRequest {
        self.json(Method::Post, "/api/auth/login", credentials)
    }

    pub fn register(&self, registration: &Registration) -> HttpRequest {
        self.json(Method::Post, "/api/auth/register", registration)
    }

    pub fn update_profile(&self, update: &ProfileUpdate) -> HttpRequest {
        self.json(Method::Put, "/api/auth/profile", update)
    }

    pub fn change_password(&self, current_password: &str, new_password: &str) -> HttpRequest {
        self.request(
            Method::Put,
            "/api/auth/password",
            Body::Json(json!({
                "currentPassword": current_password,
                "newPassword": new_password,
            })),
        )
    }

    pub fn update_avatar(&self, avatar_url: &str) -> HttpRequest {
        self.request(
            Method::Put,
            "/api/auth/avatar",
            Body::Json(json!({ "avatarUrl": avatar_url })),
        )
    }

    pub fn current_user(&self) -> HttpRequest {
        self.request(Method::Get, "/api/auth/user", Body::Empty)
    }

    // ===== Images =====

    pub fn list_images(&self, query: &ImageQuery) -> HttpRequest {
        let mut params = vec![
            ("page", query.page.to_string()),
            ("limit", query.limit.to_string()),
        ];
        if !query.query.is_empty() {
            params.push(("q", query.query.clone()));
        }
        if !query.tag.is_empty() {
            params.push(("tag", query.tag.clone()));
        }
        self.request(Method::Get, &with_query("/api/images", &params), Body::Empty)
    }

    pub fn delete_image(&self, id: &RecordId) -> HttpRequest {
        self.request(Method::Delete, &format!("/api/images/{}", segment(id)), Body::Empty)
    }

    pub fn update_image(&self, id: &RecordId, update: &ImageUpdate) -> HttpRequest {
        self.json(Method::Put, &format!("/api/images/{}", segment(id)), update)
    }

    // ===== Favorites =====

    pub fn list_favorites(&self) -> HttpRequest {
        self.request(Method::Get, "/api/favorites", Body::Empty)
    }

    pub fn add_favorite(&self, id: &RecordId) -> HttpRequest {
        self.request(Method::Post, &format!("/api/favorites/{}", segment(id)), Body::Empty)
    }

    pub fn remove_favorite(&self, id: &RecordId) -> HttpRequest {
        self.request(Method::Delete, &format!("/api/favorites/{}", segment(id)), Body::Empty)
    }

    pub fn batch_favorites(&self, action: BatchAction, image_ids: &[RecordId]) -> HttpRequest {
        self.request(
            Method::Post,
            "/api/favorites/batch",
            Body::Json(json!({ "action": action, "imageIds": image_ids })),
        )
    }

    // ===== Tags =====

    pub fn list_tags(&self) -> HttpRequest {
        self.request(Method::Get, "/api/tags", Body::Empty)
    }

    pub fn create_tag(&self, draft: &TagDraft) -> HttpRequest {
        self.json(Method::Post, "/api/tags", draft)
    }

    pub fn update_tag(&self, id: &RecordId, draft: &TagDraft) -> HttpRequest {
        self.json(Method::Put, &format!("/api/tags/{}", segment(id)), draft)
    }

    pub fn delete_tag(&self, id: &RecordId) -> HttpRequest {
        self.request(Method::Delete, &format!("/api/tags/{}", segment(id)), Body::Empty)
    }

    pub fn tag_images(&self, id: &RecordId) -> HttpRequest {
        self.request(Method::Get, &format!("/api/tags/{}/images", segment(id)), Body::Empty)
    }

    pub fn batch_tags(
        &self,
        action: BatchAction,
        image_ids: &[RecordId],
        tag_ids: &[RecordId],
    ) -> HttpRequest {
        self.request(
            Method::Post,
            "/api/tags/batch",
            Body::Json(json!({
                "action": action,
                "imageIds": image_ids,
                "tagIds": tag_ids,
            })),
        )
    }

    // ===== Upload =====

    pub fn upload(&self, files: Vec<FilePart>) -> HttpRequest {
        self.request(Method::Post, "/upload", Body::Multipart(files))
    }
}

/// Decode a successful JSON reply into `T`; map everything else to an
/// [`ApiError`].
pub fn decode<T: DeserializeOwned>(reply: Reply) -> Result<T, ApiError> {
    let response = reply?;
    if !response.is_success() {
        return Err(ApiError::from_response(&response));
    }
    serde_json::from_slice(&response.body).map_err(|e| ApiError::Decode(e.to_string()))
}

/// Accept any successful reply, ignoring its body.
pub fn expect_success(reply: Reply) -> Result<(), ApiError> {
    let response = reply?;
    if response.is_success() {
        Ok(())
    } else {
        Err(ApiError::from_response(&response))
    }
}
