//! The user's image collection: one server-side page at a time, sorted
//! locally, with a selection set for batch operations.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::Activity;
use crate::api::{
    decode, expect_success, ApiClient, ApiError, FilePatchResponse, HttpRequest, ImagePage,
    ImageQuery, ImageUpdate, Reply,
};
use crate::config::ClientConfig;
use crate::model::{ImageRecord, Pagination, RecordId};

/// Local ordering of the loaded page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortBy {
    #[default]
    Newest,
    Oldest,
    Largest,
    Smallest,
    Name,
}

impl SortBy {
    pub fn compare(self, a: &ImageRecord, b: &ImageRecord) -> Ordering {
        match self {
            // Unreadable times sort as the oldest.
            SortBy::Newest => b.uploaded_at().cmp(&a.uploaded_at()),
            SortBy::Oldest => a.uploaded_at().cmp(&b.uploaded_at()),
            SortBy::Largest => b.file_size.cmp(&a.file_size),
            SortBy::Smallest => a.file_size.cmp(&b.file_size),
            SortBy::Name => a
                .file_name
                .to_lowercase()
                .cmp(&b.file_name.to_lowercase())
                .then_with(|| a.file_name.cmp(&b.file_name)),
        }
    }

    /// Stable sort; equal keys keep their order.
    pub fn sort(self, images: &mut [ImageRecord]) {
        images.sort_by(|a, b| self.compare(a, b));
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    #[default]
    Grid,
    List,
    Timeline,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Filters {
    pub query: String,
    pub tag: String,
    pub sort_by: SortBy,
}

/// Identifies one listing request. Only the newest ticket's reply is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket {
    generation: u64,
    page: u32,
}

impl FetchTicket {
    pub fn page(&self) -> u32 {
        self.page
    }
}

/// Outcome of a batch delete.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeleteReport {
    pub deleted: Vec<RecordId>,
    pub failed: Vec<(RecordId, ApiError)>,
}

impl DeleteReport {
    pub fn all_succeeded(&self) -> bool {
        self.failed.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct ImageStore {
    images: Vec<ImageRecord>,
    current: Option<ImageRecord>,
    pagination: Pagination,
    filters: Filters,
    view_mode: ViewMode,
    selected: BTreeSet<RecordId>,
    selection_mode: bool,
    generation: u64,
    default_limit: u32,
    activity: Activity,
}

impl ImageStore {
    pub fn new(config: &ClientConfig) -> Self {
        Self {
            images: Vec::new(),
            current: None,
            pagination: Pagination {
                limit: config.page_limit,
                ..Pagination::default()
            },
            filters: Filters::default(),
            view_mode: ViewMode::default(),
            selected: BTreeSet::new(),
            selection_mode: false,
            generation: 0,
            default_limit: config.page_limit,
            activity: Activity::default(),
        }
    }

    pub fn images(&self) -> &[ImageRecord] {
        &self.images
    }

    pub fn pagination(&self) -> Pagination {
        self.pagination
    }

    pub fn filters(&self) -> &Filters {
        &self.filters
    }

    pub fn activity(&self) -> &Activity {
        &self.activity
    }

    pub fn clear_error(&mut self) {
        self.activity.clear_error();
    }

    // ===== Listing =====

    /// Request page `page` with the current filters.
    pub fn fetch_request(&mut self, client: &ApiClient, page: u32) -> (FetchTicket, HttpRequest) {
        self.activity.begin();
        self.generation += 1;
        let page = page.max(1);
        let ticket = FetchTicket {
            generation: self.generation,
            page,
        };
        let request = client.list_images(&ImageQuery {
            page,
            limit: self.pagination.limit,
            query: self.filters.query.clone(),
            tag: self.filters.tag.clone(),
        });
        (ticket, request)
    }

    /// Apply a listing reply.
    ///
    /// Returns `Ok(false)` when a newer fetch has been issued since `ticket`;
    /// the reply is then dropped whatever it contains.
    pub fn finish_fetch(&mut self, ticket: FetchTicket, reply: Reply) -> Result<bool, ApiError> {
        if ticket.generation != self.generation {
            debug!(
                stale = ticket.generation,
                current = self.generation,
                "dropping superseded image listing"
            );
            return Ok(false);
        }
        match decode::<ImagePage>(reply) {
            Ok(ImagePage { mut files, pagination }) => {
                self.filters.sort_by.sort(&mut files);
                self.images = files;
                self.pagination.page = ticket.page;
                self.pagination.apply(pagination);
                self.activity.succeed();
                Ok(true)
            }
            Err(e) => {
                self.activity.fail(&e, "Could not load images");
                Err(e)
            }
        }
    }

    /// Change the search text and re-query from page 1.
    pub fn search(&mut self, client: &ApiClient, query: &str) -> (FetchTicket, HttpRequest) {
        self.filters.query = query.to_string();
        self.pagination.page = 1;
        self.fetch_request(client, 1)
    }

    /// Change the tag filter (empty for none) and re-query from page 1.
    pub fn filter_by_tag(&mut self, client: &ApiClient, tag: &str) -> (FetchTicket, HttpRequest) {
        self.filters.tag = tag.to_string();
        self.pagination.page = 1;
        self.fetch_request(client, 1)
    }

    /// Re-order the loaded page. No request is made.
    pub fn set_sort_by(&mut self, sort_by: SortBy) {
        self.filters.sort_by = sort_by;
        sort_by.sort(&mut self.images);
    }

    pub fn view_mode(&self) -> ViewMode {
        self.view_mode
    }

    pub fn set_view_mode(&mut self, view_mode: ViewMode) {
        self.view_mode = view_mode;
    }

    pub fn current(&self) -> Option<&ImageRecord> {
        self.current.as_ref()
    }

    pub fn set_current(&mut self, image: Option<ImageRecord>) {
        self.current = image;
    }

    // ===== Delete / update =====

    pub fn delete_request(&mut self, client: &ApiClient, id: &RecordId) -> HttpRequest {
        self.activity.begin();
        client.delete_image(id)
    }

    pub fn finish_delete(&mut self, id: &RecordId, reply: Reply) -> Result<(), ApiError> {
        match expect_success(reply) {
            Ok(()) => {
                self.activity.succeed();
                self.forget(std::slice::from_ref(id));
                Ok(())
            }
            Err(e) => {
                self.activity.fail(&e, "Could not delete image");
                Err(e)
            }
        }
    }

    /// One delete request per id, in order.
    pub fn delete_many_requests(
        &mut self,
        client: &ApiClient,
        ids: &[RecordId],
    ) -> Vec<(RecordId, HttpRequest)> {
        self.activity.begin();
        ids.iter()
            .map(|id| (id.clone(), client.delete_image(id)))
            .collect()
    }

    /// Apply the replies of a batch delete.
    ///
    /// Every id whose delete succeeded is removed. Selection is cleared and
    /// selection mode left only when all of them succeeded.
    pub fn finish_delete_many(&mut self, replies: Vec<(RecordId, Reply)>) -> DeleteReport {
        let mut report = DeleteReport::default();
        for (id, reply) in replies {
            match expect_success(reply) {
                Ok(()) => report.deleted.push(id),
                Err(e) => report.failed.push((id, e)),
            }
        }
        self.forget(&report.deleted);
        match report.failed.first() {
            None => {
                self.selected.clear();
                self.selection_mode = false;
                self.activity.succeed();
            }
            Some((_, e)) => {
                warn!(
                    deleted = report.deleted.len(),
                    failed = report.failed.len(),
                    "batch delete partially failed"
                );
                self.activity.fail(e, "Could not delete images");
            }
        }
        report
    }

    fn forget(&mut self, ids: &[RecordId]) {
        if ids.is_empty() {
            return;
        }
        let before = self.images.len();
        self.images.retain(|image| !ids.contains(&image.id));
        let removed = (before - self.images.len()) as u64;
        self.pagination.total = self.pagination.total.saturating_sub(removed);
        for id in ids {
            self.selected.remove(id);
        }
        if self.current.as_ref().is_some_and(|c| ids.contains(&c.id)) {
            self.current = None;
        }
    }

    pub fn update_request(
        &mut self,
        client: &ApiClient,
        id: &RecordId,
        update: &ImageUpdate,
    ) -> HttpRequest {
        self.activity.begin();
        client.update_image(id, update)
    }

    /// Merge the returned fields into the cached record and return it.
    pub fn finish_update(
        &mut self,
        id: &RecordId,
        reply: Reply,
    ) -> Result<Option<ImageRecord>, ApiError> {
        let result = decode::<FilePatchResponse>(reply).and_then(|FilePatchResponse { file }| {
            let mut updated = None;
            for image in self.images.iter_mut().filter(|image| &image.id == id) {
                image
                    .merge_patch(&file)
                    .map_err(|e| ApiError::Decode(e.to_string()))?;
                updated = Some(image.clone());
            }
            if let Some(current) = self.current.as_mut().filter(|c| &c.id == id) {
                current
                    .merge_patch(&file)
                    .map_err(|e| ApiError::Decode(e.to_string()))?;
            }
            Ok(updated)
        });
        match &result {
            Ok(_) => self.activity.succeed(),
            Err(e) => self.activity.fail(e, "Could not update image"),
        }
        result
    }

    // ===== Selection =====

    pub fn selection_mode(&self) -> bool {
        self.selection_mode
    }

    pub fn selected(&self) -> &BTreeSet<RecordId> {
        &self.selected
    }

    pub fn is_selected(&self, id: &RecordId) -> bool {
        self.selected.contains(id)
    }

    /// Enter or leave selection mode; either way the selection is emptied.
    pub fn toggle_selection_mode(&mut self) {
        self.selection_mode = !self.selection_mode;
        self.selected.clear();
    }

    pub fn toggle_selected(&mut self, id: RecordId) {
        if !self.selected.remove(&id) {
            self.selected.insert(id);
        }
    }

    /// Select every loaded image, or nothing if all are already selected.
    pub fn toggle_select_all(&mut self) {
        let all_selected = !self.images.is_empty()
            && self.images.iter().all(|image| self.selected.contains(&image.id));
        if all_selected {
            self.selected.clear();
        } else {
            self.selected = self.images.iter().map(|image| image.id.clone()).collect();
        }
    }

    pub fn clear_selection(&mut self) {
        self.selected.clear();
    }

    /// Back to a fresh store. Outstanding fetches become stale.
    pub fn reset(&mut self) {
        let generation = self.generation + 1;
        let limit = self.default_limit;
        *self = Self {
            generation,
            ..Self::new(&ClientConfig {
                page_limit: limit,
                ..ClientConfig::default()
            })
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{HttpResponse, TransportError};
    use serde_json::json;

    fn client() -> ApiClient {
        ApiClient::new(&ClientConfig::default())
    }

    fn record(id: u64, name: &str, size: u64, time: i64) -> ImageRecord {
        serde_json::from_value(json!({
            "id": id,
            "fileName": name,
            "fileSize": size,
            "uploadTime": time,
        }))
        .unwrap()
    }

    fn loaded(images: Vec<ImageRecord>) -> ImageStore {
        let mut store = ImageStore::new(&ClientConfig::default());
        let (ticket, _) = store.fetch_request(&client(), 1);
        let total = images.len();
        let reply = Ok(HttpResponse::json(
            200,
            &json!({"files": images, "pagination": {"total": total, "totalPages": 1}}),
        ));
        store.finish_fetch(ticket, reply).unwrap();
        store
    }

    fn sizes(store: &ImageStore) -> Vec<u64> {
        store.images().iter().map(|i| i.file_size).collect()
    }

    fn names(store: &ImageStore) -> Vec<&str> {
        store.images().iter().map(|i| i.file_name.as_str()).collect()
    }

    // ===== Sort Tests =====

    #[test]
    fn test_sort_by_size() {
        let mut store = loaded(vec![
            record(1, "a", 10, 0),
            record(2, "b", 30, 0),
            record(3, "c", 20, 0),
        ]);
        store.set_sort_by(SortBy::Largest);
        assert_eq!(sizes(&store), vec![30, 20, 10]);
        store.set_sort_by(SortBy::Smallest);
        assert_eq!(sizes(&store), vec![10, 20, 30]);
    }

    #[test]
    fn test_sort_by_name() {
        let mut store = loaded(vec![record(1, "b.png", 0, 0), record(2, "a.png", 0, 0)]);
        store.set_sort_by(SortBy::Name);
        assert_eq!(names(&store), vec!["a.png", "b.png"]);
    }

    #[test]
    fn test_sort_by_name_ignores_case() {
        let mut store = loaded(vec![
            record(1, "b.png", 0, 0),
            record(2, "A.png", 0, 0),
            record(3, "a.png", 0, 0),
        ]);
        store.set_sort_by(SortBy::Name);
        assert_eq!(names(&store), vec!["A.png", "a.png", "b.png"]);
    }

    #[test]
    fn test_fetch_sorts_newest_first_by_default() {
        let store = loaded(vec![record(1, "a", 0, 100), record(2, "b", 0, 300)]);
        assert_eq!(store.images()[0].id, RecordId::from(2));
        assert_eq!(store.pagination().total, 2);
    }

    #[test]
    fn test_fetch_accepts_iso_upload_times() {
        let mut store = ImageStore::new(&ClientConfig::default());
        let (ticket, _) = store.fetch_request(&client(), 1);
        let reply = Ok(HttpResponse::json(
            200,
            &json!({"files": [
                {"id": 1, "fileName": "a.png", "uploadTime": "2024-01-02T03:04:05.000Z"},
                {"id": 2, "fileName": "b.png", "uploadTime": 1704250000000i64},
                {"id": 3, "fileName": "c.png", "uploadTime": "2023-12-31T23:00:00Z"},
                {"id": 4, "fileName": "d.png", "uploadTime": "not a date"},
            ]}),
        ));
        assert_eq!(store.finish_fetch(ticket, reply), Ok(true));
        assert_eq!(names(&store), vec!["b.png", "a.png", "c.png", "d.png"]);

        store.set_sort_by(SortBy::Oldest);
        assert_eq!(names(&store), vec!["d.png", "c.png", "a.png", "b.png"]);
    }

    #[test]
    fn test_sort_change_does_not_refetch() {
        let mut store = loaded(vec![record(1, "a", 0, 100), record(2, "b", 0, 300)]);
        store.set_sort_by(SortBy::Oldest);
        assert_eq!(store.images()[0].id, RecordId::from(1));
        assert!(!store.activity().is_loading());
    }

    // ===== Fetch Tests =====

    #[test]
    fn test_search_resets_page_and_queries() {
        let mut store = loaded(vec![]);
        store.pagination.page = 4;
        let (ticket, request) = store.search(&client(), "sea side");
        assert_eq!(ticket.page(), 1);
        assert_eq!(store.pagination().page, 1);
        assert_eq!(request.url, "/api/images?page=1&limit=20&q=sea+side");
    }

    #[test]
    fn test_tag_filter_resets_page() {
        let mut store = loaded(vec![]);
        let (ticket, _) = store.fetch_request(&client(), 3);
        assert_eq!(ticket.page(), 3);
        let (ticket, request) = store.filter_by_tag(&client(), "pets");
        assert_eq!(ticket.page(), 1);
        assert_eq!(request.url, "/api/images?page=1&limit=20&tag=pets");
    }

    #[test]
    fn test_stale_fetch_is_dropped() {
        let mut store = ImageStore::new(&ClientConfig::default());
        let (old, _) = store.search(&client(), "a");
        let (new, _) = store.search(&client(), "ab");

        let newer = Ok(HttpResponse::json(200, &json!({"files": [{"id": 2}]})));
        assert_eq!(store.finish_fetch(new, newer), Ok(true));
        let older = Ok(HttpResponse::json(200, &json!({"files": [{"id": 1}]})));
        assert_eq!(store.finish_fetch(old, older), Ok(false));
        assert_eq!(store.images()[0].id, RecordId::from(2));
    }

    #[test]
    fn test_fetch_error_records_message() {
        let mut store = ImageStore::new(&ClientConfig::default());
        let (ticket, _) = store.fetch_request(&client(), 1);
        let reply = Err(TransportError::Timeout(30_000));
        assert!(store.finish_fetch(ticket, reply).is_err());
        assert_eq!(store.activity().error(), Some("Could not load images"));
    }

    // ===== Delete / Update Tests =====

    #[test]
    fn test_delete_removes_image() {
        let mut store = loaded(vec![record(1, "a", 0, 0), record(2, "b", 0, 0)]);
        let id = RecordId::from(1);
        let request = store.delete_request(&client(), &id);
        assert_eq!(request.url, "/api/images/1");
        store.finish_delete(&id, Ok(HttpResponse::new(200, Vec::new()))).unwrap();
        assert_eq!(store.images().len(), 1);
        assert_eq!(store.pagination().total, 1);
    }

    #[test]
    fn test_delete_many_all_succeed_leaves_selection_mode() {
        let mut store = loaded(vec![record(1, "a", 0, 0), record(2, "b", 0, 0)]);
        store.toggle_selection_mode();
        store.toggle_select_all();
        let ids: Vec<RecordId> = store.selected().iter().cloned().collect();
        let requests = store.delete_many_requests(&client(), &ids);
        assert_eq!(requests.len(), 2);

        let replies = ids
            .into_iter()
            .map(|id| (id, Ok(HttpResponse::new(204, Vec::new()))))
            .collect();
        let report = store.finish_delete_many(replies);
        assert!(report.all_succeeded());
        assert!(store.images().is_empty());
        assert!(!store.selection_mode());
        assert!(store.selected().is_empty());
    }

    #[test]
    fn test_delete_many_partial_failure_keeps_mode() {
        let mut store = loaded(vec![record(1, "a", 0, 0), record(2, "b", 0, 0)]);
        store.toggle_selection_mode();
        store.toggle_select_all();
        let replies = vec![
            (RecordId::from(1), Ok(HttpResponse::new(200, Vec::new()))),
            (RecordId::from(2), Ok(HttpResponse::json(500, &json!({})))),
        ];
        let report = store.finish_delete_many(replies);
        assert_eq!(report.deleted, vec![RecordId::from(1)]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(store.images().len(), 1);
        assert!(store.selection_mode());
        assert!(store.is_selected(&RecordId::from(2)));
        assert!(!store.is_selected(&RecordId::from(1)));
    }

    #[test]
    fn test_update_merges_returned_fields() {
        let mut store = loaded(vec![record(1, "old.png", 5, 0)]);
        store.set_current(Some(store.images()[0].clone()));
        let reply = Ok(HttpResponse::json(200, &json!({"file": {"fileName": "new.png"}})));
        let updated = store.finish_update(&RecordId::from(1), reply).unwrap().unwrap();
        assert_eq!(updated.file_name, "new.png");
        assert_eq!(updated.file_size, 5);
        assert_eq!(store.current().unwrap().file_name, "new.png");
    }

    // ===== Selection Tests =====

    #[test]
    fn test_selection_mode_toggle_clears() {
        let mut store = loaded(vec![record(1, "a", 0, 0)]);
        store.toggle_selected(RecordId::from(1));
        store.toggle_selection_mode();
        assert!(store.selection_mode());
        assert!(store.selected().is_empty());
    }

    #[test]
    fn test_toggle_select_all_round_trip() {
        let mut store = loaded(vec![record(1, "a", 0, 0), record(2, "b", 0, 0)]);
        store.toggle_selected(RecordId::from(1));
        store.toggle_select_all();
        assert_eq!(store.selected().len(), 2);
        store.toggle_select_all();
        assert!(store.selected().is_empty());
        store.toggle_selected(RecordId::from(2));
        store.toggle_selected(RecordId::from(2));
        assert!(store.selected().is_empty());
    }

    #[test]
    fn test_reset_invalidates_outstanding_fetch() {
        let mut store = loaded(vec![record(1, "a", 0, 0)]);
        store.set_view_mode(ViewMode::Timeline);
        let (ticket, _) = store.fetch_request(&client(), 2);
        store.reset();
        assert_eq!(store.view_mode(), ViewMode::Grid);
        let reply = Ok(HttpResponse::json(200, &json!({"files": [{"id": 9}]})));
        assert_eq!(store.finish_fetch(ticket, reply), Ok(false));
        assert!(store.images().is_empty());
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn records_with_distinct_sizes() -> impl Strategy<Value = Vec<ImageRecord>> {
        prop::collection::btree_set(0u64..10_000, 0..30)
            .prop_map(|sizes| sizes.into_iter().collect::<Vec<_>>())
            .prop_shuffle()
            .prop_map(|sizes| {
                sizes
                    .into_iter()
                    .enumerate()
                    .map(|(i, size)| {
                        serde_json::from_value(json!({"id": i, "fileSize": size})).unwrap()
                    })
                    .collect()
            })
    }

    proptest! {
        #[test]
        fn prop_largest_is_reverse_of_smallest(mut images in records_with_distinct_sizes()) {
            SortBy::Largest.sort(&mut images);
            let largest: Vec<RecordId> = images.iter().map(|i| i.id.clone()).collect();
            SortBy::Smallest.sort(&mut images);
            let mut smallest: Vec<RecordId> = images.iter().map(|i| i.id.clone()).collect();
            smallest.reverse();
            prop_assert_eq!(largest, smallest);
        }

        #[test]
        fn prop_name_sort_is_ordered(names in prop::collection::vec("[a-zA-Z]{1,6}", 0..20)) {
            let mut images: Vec<ImageRecord> = names
                .iter()
                .enumerate()
                .map(|(i, name)| serde_json::from_value(json!({"id": i, "fileName": name})).unwrap())
                .collect();
            SortBy::Name.sort(&mut images);
            for pair in images.windows(2) {
                prop_assert!(SortBy::Name.compare(&pair[0], &pair[1]) != Ordering::Greater);
            }
        }

        #[test]
        fn prop_filter_change_resets_page(
            start_page in 1u32..50,
            query in "[a-z ]{0,8}",
            use_tag in any::<bool>(),
        ) {
            let client = ApiClient::new(&ClientConfig::default());
            let mut store = ImageStore::new(&ClientConfig::default());
            store.fetch_request(&client, start_page);
            store.pagination.page = start_page;
            let (ticket, request) = if use_tag {
                store.filter_by_tag(&client, &query)
            } else {
                store.search(&client, &query)
            };
            prop_assert_eq!(ticket.page(), 1);
            prop_assert_eq!(store.pagination().page, 1);
            prop_assert!(request.url.starts_with("/api/images?page=1&"));
        }
    }
}
