//! Tag list cache.

use tracing::debug;

use super::Activity;
use crate::api::{
    decode, expect_success, ApiClient, ApiError, BatchAction, HttpRequest, ImageList, Reply,
    TagDraft, TagList, TagResponse,
};
use crate::model::{ImageRecord, RecordId, Tag};

#[derive(Debug, Clone, Default)]
pub struct TagStore {
    tags: Vec<Tag>,
    current: Option<Tag>,
    activity: Activity,
}

impl TagStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tags(&self) -> &[Tag] {
        &self.tags
    }

    pub fn count(&self) -> usize {
        self.tags.len()
    }

    /// Exact, case-sensitive name match.
    pub fn find_by_name(&self, name: &str) -> Option<&Tag> {
        self.tags.iter().find(|tag| tag.name == name)
    }

    pub fn current(&self) -> Option<&Tag> {
        self.current.as_ref()
    }

    pub fn set_current(&mut self, tag: Option<Tag>) {
        self.current = tag;
    }

    pub fn activity(&self) -> &Activity {
        &self.activity
    }

    pub fn clear_error(&mut self) {
        self.activity.clear_error();
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    fn settle<T>(&mut self, result: Result<T, ApiError>, fallback: &str) -> Result<T, ApiError> {
        match &result {
            Ok(_) => self.activity.succeed(),
            Err(e) => self.activity.fail(e, fallback),
        }
        result
    }

    pub fn fetch_request(&mut self, client: &ApiClient) -> HttpRequest {
        self.activity.begin();
        client.list_tags()
    }

    pub fn finish_fetch(&mut self, reply: Reply) -> Result<(), ApiError> {
        let result = decode::<TagList>(reply).map(|list| {
            debug!(count = list.tags.len(), "tags loaded");
            self.tags = list.tags;
        });
        self.settle(result, "Could not load tags")
    }

    pub fn create_request(&mut self, client: &ApiClient, draft: &TagDraft) -> HttpRequest {
        self.activity.begin();
        client.create_tag(draft)
    }

    /// Append the created tag.
    pub fn finish_create(&mut self, reply: Reply) -> Result<Tag, ApiError> {
        let result = decode::<TagResponse>(reply).map(|TagResponse { tag }| {
            self.tags.push(tag.clone());
            tag
        });
        self.settle(result, "Could not create tag")
    }

    pub fn update_request(
        &mut self,
        client: &ApiClient,
        id: &RecordId,
        draft: &TagDraft,
    ) -> HttpRequest {
        self.activity.begin();
        client.update_tag(id, draft)
    }

    /// Replace the cached tag `id` with the returned one.
    pub fn finish_update(&mut self, id: &RecordId, reply: Reply) -> Result<Tag, ApiError> {
        let result = decode::<TagResponse>(reply).map(|TagResponse { tag }| {
            for cached in self.tags.iter_mut().filter(|t| &t.id == id) {
                *cached = tag.clone();
            }
            if self.current.as_ref().is_some_and(|t| &t.id == id) {
                self.current = Some(tag.clone());
            }
            tag
        });
        self.settle(result, "Could not update tag")
    }

    pub fn delete_request(&mut self, client: &ApiClient, id: &RecordId) -> HttpRequest {
        self.activity.begin();
        client.delete_tag(id)
    }

    pub fn finish_delete(&mut self, id: &RecordId, reply: Reply) -> Result<(), ApiError> {
        let result = expect_success(reply).map(|()| {
            self.tags.retain(|t| &t.id != id);
            if self.current.as_ref().is_some_and(|t| &t.id == id) {
                self.current = None;
            }
        });
        self.settle(result, "Could not delete tag")
    }

    /// Attach or detach every tag in `tag_ids` on every image in `image_ids`.
    pub fn batch_request(
        &mut self,
        client: &ApiClient,
        action: BatchAction,
        image_ids: &[RecordId],
        tag_ids: &[RecordId],
    ) -> HttpRequest {
        self.activity.begin();
        client.batch_tags(action, image_ids, tag_ids)
    }

    pub fn finish_batch(&mut self, reply: Reply) -> Result<(), ApiError> {
        let result = expect_success(reply);
        self.settle(result, "Batch tag operation failed")
    }

    pub fn images_request(&mut self, client: &ApiClient, id: &RecordId) -> HttpRequest {
        self.activity.begin();
        client.tag_images(id)
    }

    /// Images carrying the tag. Not cached.
    pub fn finish_images(&mut self, reply: Reply) -> Result<Vec<ImageRecord>, ApiError> {
        let result = decode::<ImageList>(reply).map(|list| list.images);
        self.settle(result, "Could not load tag images")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{HttpResponse, Method};
    use crate::config::ClientConfig;
    use serde_json::json;

    fn loaded() -> TagStore {
        let mut store = TagStore::new();
        let reply = Ok(HttpResponse::json(
            200,
            &json!({"tags": [
                {"id": 1, "name": "pets", "color": "#f00", "count": 3},
                {"id": 2, "name": "travel", "color": "#0f0", "count": 0}
            ]}),
        ));
        store.finish_fetch(reply).unwrap();
        store
    }

    fn draft(name: &str) -> TagDraft {
        TagDraft {
            name: name.to_string(),
            color: "#00f".to_string(),
        }
    }

    #[test]
    fn test_fetch_and_queries() {
        let store = loaded();
        assert_eq!(store.count(), 2);
        assert_eq!(store.find_by_name("travel").map(|t| t.count), Some(0));
        assert!(store.find_by_name("Travel").is_none());
    }

    #[test]
    fn test_create_appends() {
        let mut store = loaded();
        let client = ApiClient::new(&ClientConfig::default());
        let request = store.create_request(&client, &draft("food"));
        assert_eq!(request.method, Method::Post);
        assert_eq!(request.json(), Some(&json!({"name": "food", "color": "#00f"})));
        assert!(store.activity().is_loading());

        let reply = Ok(HttpResponse::json(
            201,
            &json!({"tag": {"id": 3, "name": "food", "color": "#00f"}}),
        ));
        let tag = store.finish_create(reply).unwrap();
        assert_eq!(tag.id, RecordId::from(3));
        assert_eq!(store.tags().last().map(|t| t.name.as_str()), Some("food"));
        assert!(!store.activity().is_loading());
    }

    #[test]
    fn test_update_replaces_in_place() {
        let mut store = loaded();
        store.set_current(store.tags().first().cloned());
        let reply = Ok(HttpResponse::json(
            200,
            &json!({"tag": {"id": 1, "name": "animals", "color": "#f00", "count": 3}}),
        ));
        store.finish_update(&RecordId::from(1), reply).unwrap();
        assert_eq!(store.tags()[0].name, "animals");
        assert_eq!(store.current().map(|t| t.name.as_str()), Some("animals"));
        assert_eq!(store.count(), 2);
    }

    #[test]
    fn test_delete_removes() {
        let mut store = loaded();
        store.set_current(store.tags().first().cloned());
        store
            .finish_delete(&RecordId::from(1), Ok(HttpResponse::new(200, Vec::new())))
            .unwrap();
        assert_eq!(store.count(), 1);
        assert!(store.current().is_none());
    }

    #[test]
    fn test_failed_delete_keeps_tag() {
        let mut store = loaded();
        let reply = Ok(HttpResponse::json(403, &json!({"error": "Not your tag"})));
        assert!(store.finish_delete(&RecordId::from(1), reply).is_err());
        assert_eq!(store.count(), 2);
        assert_eq!(store.activity().error(), Some("Not your tag"));
    }

    #[test]
    fn test_batch_and_images() {
        let mut store = loaded();
        let client = ApiClient::new(&ClientConfig::default());
        let request = store.batch_request(
            &client,
            BatchAction::Add,
            &[RecordId::from(10)],
            &[RecordId::from(1)],
        );
        assert_eq!(request.url, "/api/tags/batch");
        store.finish_batch(Ok(HttpResponse::new(200, Vec::new()))).unwrap();

        let request = store.images_request(&client, &RecordId::from(1));
        assert_eq!(request.url, "/api/tags/1/images");
        let reply = Ok(HttpResponse::json(200, &json!({"images": [{"id": 10}]})));
        assert_eq!(store.finish_images(reply).unwrap().len(), 1);
    }

    #[test]
    fn test_reset() {
        let mut store = loaded();
        store.reset();
        assert_eq!(store.count(), 0);
        assert!(store.current().is_none());
    }
}
