//! Favorites with optimistic updates.
//!
//! Visible membership is the committed (server-confirmed) set overlaid with
//! the effect of every mutation still in flight. Mutations for the same
//! image are serialized: while one is in flight, further toggles only record
//! the desired final state, and a single follow-up is issued once the
//! in-flight mutation settles and the desired state still differs from what
//! the service confirmed.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

use tracing::{debug, warn};

use super::Activity;
use crate::api::{
    decode, expect_success, ApiClient, ApiError, BatchAction, HttpRequest, ImageList, Reply,
};
use crate::model::{ImageRecord, RecordId};

/// Identifies one issued mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Ticket(u64);

impl fmt::Display for Ticket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    Add,
    Remove,
}

impl MutationKind {
    fn for_membership(member: bool) -> Self {
        if member {
            MutationKind::Add
        } else {
            MutationKind::Remove
        }
    }

    fn membership(self) -> bool {
        matches!(self, MutationKind::Add)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationState {
    Pending,
    Committed,
    RolledBack,
}

/// A change to send to the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FavoriteMutation {
    pub ticket: Ticket,
    pub kind: MutationKind,
    pub ids: Vec<RecordId>,
    /// Sent through the batch endpoint rather than the per-image one.
    pub batch: bool,
}

impl FavoriteMutation {
    pub fn request(&self, client: &ApiClient) -> HttpRequest {
        match (self.batch, self.kind, self.ids.as_slice()) {
            (false, MutationKind::Add, [id]) => client.add_favorite(id),
            (false, MutationKind::Remove, [id]) => client.remove_favorite(id),
            (_, MutationKind::Add, ids) => client.batch_favorites(BatchAction::Add, ids),
            (_, MutationKind::Remove, ids) => client.batch_favorites(BatchAction::Remove, ids),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToggleOutcome {
    /// A request must be sent for this mutation.
    Issued(FavoriteMutation),
    /// A mutation for the image is already in flight; the new state was
    /// recorded and will be reconciled when it settles.
    Queued,
}

/// What the caller has to do after a mutation settled.
#[derive(Debug, Clone, PartialEq)]
pub struct SettleOutcome {
    /// Mutations to send next, one per image whose queued state differs
    /// from the confirmed one.
    pub follow_ups: Vec<FavoriteMutation>,
    /// The favorites list must be re-fetched and passed to
    /// [`FavoriteStore::replace_all`].
    pub resync: bool,
    pub result: Result<(), ApiError>,
}

impl SettleOutcome {
    fn ignored() -> Self {
        Self {
            follow_ups: Vec::new(),
            resync: false,
            result: Ok(()),
        }
    }
}

#[derive(Debug, Clone)]
struct MutationRecord {
    kind: MutationKind,
    ids: Vec<RecordId>,
    batch: bool,
    state: MutationState,
}

#[derive(Debug, Clone, Default)]
pub struct FavoriteStore {
    committed: BTreeSet<RecordId>,
    images: Vec<ImageRecord>,
    in_flight: BTreeMap<RecordId, (Ticket, MutationKind)>,
    queued: BTreeMap<RecordId, bool>,
    mutations: HashMap<Ticket, MutationRecord>,
    next_ticket: u64,
    activity: Activity,
}

impl FavoriteStore {
    pub fn new() -> Self {
        Self::default()
    }

    // ===== Queries =====

    pub fn is_favorite(&self, id: &RecordId) -> bool {
        if let Some(want) = self.queued.get(id) {
            return *want;
        }
        if let Some((_, kind)) = self.in_flight.get(id) {
            return kind.membership();
        }
        self.committed.contains(id)
    }

    /// Visible membership, overlays included.
    pub fn favorite_ids(&self) -> BTreeSet<RecordId> {
        let mut ids = self.committed.clone();
        for (id, (_, kind)) in &self.in_flight {
            let member = self.queued.get(id).copied().unwrap_or(kind.membership());
            if member {
                ids.insert(id.clone());
            } else {
                ids.remove(id);
            }
        }
        ids
    }

    pub fn count(&self) -> usize {
        self.favorite_ids().len()
    }

    /// Details of the favorite images as last fetched.
    pub fn favorite_images(&self) -> &[ImageRecord] {
        &self.images
    }

    pub fn mutation_state(&self, ticket: Ticket) -> Option<MutationState> {
        self.mutations.get(&ticket).map(|m| m.state)
    }

    pub fn has_pending(&self) -> bool {
        !self.in_flight.is_empty()
    }

    pub fn activity(&self) -> &Activity {
        &self.activity
    }

    pub fn clear_error(&mut self) {
        self.activity.clear_error();
    }

    // ===== Fetch =====

    pub fn fetch_request(&mut self, client: &ApiClient) -> HttpRequest {
        self.activity.begin();
        client.list_favorites()
    }

    pub fn finish_fetch(&mut self, reply: Reply) -> Result<(), ApiError> {
        match decode::<ImageList>(reply) {
            Ok(list) => {
                self.activity.succeed();
                self.replace_all(list.images);
                Ok(())
            }
            Err(e) => {
                self.activity.fail(&e, "Could not load favorites");
                Err(e)
            }
        }
    }

    /// Take the service's list as the confirmed set. In-flight overlays stay
    /// visible until their mutations settle.
    pub fn replace_all(&mut self, images: Vec<ImageRecord>) {
        self.committed = images.iter().map(|image| image.id.clone()).collect();
        self.images = images;
        debug!(count = self.committed.len(), "favorites replaced");
    }

    // ===== Mutations =====

    /// Flip the visible membership of `id`.
    pub fn toggle(&mut self, id: RecordId) -> ToggleOutcome {
        let want = !self.is_favorite(&id);
        if self.in_flight.contains_key(&id) {
            debug!(%id, want, "favorite toggle queued behind in-flight mutation");
            self.queued.insert(id, want);
            return ToggleOutcome::Queued;
        }
        ToggleOutcome::Issued(self.issue(MutationKind::for_membership(want), vec![id], false))
    }

    /// Mark every id as a favorite in one request.
    ///
    /// Ids with a mutation in flight are left out of the request and queued
    /// instead. Returns `None` when nothing remains to send.
    pub fn add_many(&mut self, ids: &[RecordId]) -> Option<FavoriteMutation> {
        self.batch(MutationKind::Add, ids)
    }

    pub fn remove_many(&mut self, ids: &[RecordId]) -> Option<FavoriteMutation> {
        self.batch(MutationKind::Remove, ids)
    }

    fn batch(&mut self, kind: MutationKind, ids: &[RecordId]) -> Option<FavoriteMutation> {
        let mut send = Vec::new();
        let mut seen = BTreeSet::new();
        for id in ids {
            if !seen.insert(id) {
                continue;
            }
            if self.in_flight.contains_key(id) {
                self.queued.insert(id.clone(), kind.membership());
            } else {
                send.push(id.clone());
            }
        }
        if send.is_empty() {
            return None;
        }
        Some(self.issue(kind, send, true))
    }

    fn issue(&mut self, kind: MutationKind, ids: Vec<RecordId>, batch: bool) -> FavoriteMutation {
        self.next_ticket += 1;
        let ticket = Ticket(self.next_ticket);
        for id in &ids {
            self.in_flight.insert(id.clone(), (ticket, kind));
        }
        self.mutations.insert(
            ticket,
            MutationRecord {
                kind,
                ids: ids.clone(),
                batch,
                state: MutationState::Pending,
            },
        );
        debug!(%ticket, ?kind, count = ids.len(), batch, "favorite mutation issued");
        FavoriteMutation {
            ticket,
            kind,
            ids,
            batch,
        }
    }

    /// Apply the service's reply to the mutation identified by `ticket`.
    ///
    /// Replies for unknown or already settled tickets are ignored.
    pub fn settle(&mut self, ticket: Ticket, reply: Reply) -> SettleOutcome {
        let Some(record) = self.mutations.get(&ticket) else {
            debug!(%ticket, "reply for unknown favorite mutation ignored");
            return SettleOutcome::ignored();
        };
        if record.state != MutationState::Pending {
            return SettleOutcome::ignored();
        }
        let MutationRecord { kind, ids, batch, .. } = record.clone();

        let result = expect_success(reply);
        let state = match &result {
            Ok(()) => {
                for id in &ids {
                    if kind.membership() {
                        self.committed.insert(id.clone());
                    } else {
                        self.committed.remove(id);
                    }
                }
                if !batch && kind == MutationKind::Remove {
                    self.images.retain(|image| !ids.contains(&image.id));
                }
                MutationState::Committed
            }
            Err(e) => {
                warn!(%ticket, error = %e, "favorite mutation rolled back");
                self.activity.note(e, "Could not update favorites");
                MutationState::RolledBack
            }
        };
        if let Some(record) = self.mutations.get_mut(&ticket) {
            record.state = state;
        }

        let mut follow_ups = Vec::new();
        for id in ids {
            if self.in_flight.get(&id).is_some_and(|(t, _)| *t == ticket) {
                self.in_flight.remove(&id);
            }
            if let Some(want) = self.queued.remove(&id) {
                if want != self.committed.contains(&id) {
                    follow_ups.push(self.issue(MutationKind::for_membership(want), vec![id], false));
                }
            }
        }

        let resync = batch || result.is_err() || kind == MutationKind::Add;
        SettleOutcome {
            follow_ups,
            resync,
            result,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{HttpResponse, Method, TransportError};
    use crate::config::ClientConfig;
    use serde_json::json;

    fn ok() -> Reply {
        Ok(HttpResponse::json(200, &json!({"success": true})))
    }

    fn fail() -> Reply {
        Err(TransportError::Network("offline".to_string()))
    }

    fn image(id: u64) -> ImageRecord {
        serde_json::from_value(json!({"id": id})).unwrap()
    }

    fn issued(outcome: ToggleOutcome) -> FavoriteMutation {
        match outcome {
            ToggleOutcome::Issued(m) => m,
            ToggleOutcome::Queued => panic!("expected an issued mutation"),
        }
    }

    // ===== Toggle Tests =====

    #[test]
    fn test_toggle_is_optimistic() {
        let mut store = FavoriteStore::new();
        let id = RecordId::from(1);
        let m = issued(store.toggle(id.clone()));
        assert_eq!(m.kind, MutationKind::Add);
        assert!(store.is_favorite(&id));
        assert_eq!(store.mutation_state(m.ticket), Some(MutationState::Pending));
        assert!(store.has_pending());
    }

    #[test]
    fn test_toggle_success_commits() {
        let mut store = FavoriteStore::new();
        let id = RecordId::from(1);
        let m = issued(store.toggle(id.clone()));
        let outcome = store.settle(m.ticket, ok());
        assert!(outcome.result.is_ok());
        assert!(outcome.resync);
        assert!(outcome.follow_ups.is_empty());
        assert!(store.is_favorite(&id));
        assert_eq!(store.mutation_state(m.ticket), Some(MutationState::Committed));
        assert!(!store.has_pending());
    }

    #[test]
    fn test_toggle_failure_rolls_back() {
        let mut store = FavoriteStore::new();
        let id = RecordId::from(1);
        let m = issued(store.toggle(id.clone()));
        let outcome = store.settle(m.ticket, fail());
        assert!(outcome.result.is_err());
        assert!(outcome.resync);
        assert!(!store.is_favorite(&id));
        assert_eq!(store.mutation_state(m.ticket), Some(MutationState::RolledBack));
        assert!(store.activity().error().is_some());
    }

    #[test]
    fn test_remove_success_drops_cached_image() {
        let mut store = FavoriteStore::new();
        store.replace_all(vec![image(1), image(2)]);
        let m = issued(store.toggle(RecordId::from(1)));
        assert_eq!(m.kind, MutationKind::Remove);
        let outcome = store.settle(m.ticket, ok());
        assert!(!outcome.resync);
        assert_eq!(store.favorite_images().len(), 1);
        assert_eq!(store.count(), 1);
    }

    #[test]
    fn test_second_toggle_while_in_flight_is_queued() {
        let mut store = FavoriteStore::new();
        let id = RecordId::from(1);
        let m = issued(store.toggle(id.clone()));
        assert_eq!(store.toggle(id.clone()), ToggleOutcome::Queued);
        assert!(!store.is_favorite(&id));

        // Add lands, but the user wanted it off: one remove follows.
        let outcome = store.settle(m.ticket, ok());
        assert_eq!(outcome.follow_ups.len(), 1);
        assert_eq!(outcome.follow_ups[0].kind, MutationKind::Remove);
        assert!(!store.is_favorite(&id));

        store.settle(outcome.follow_ups[0].ticket, ok());
        assert!(!store.is_favorite(&id));
        assert!(!store.has_pending());
    }

    #[test]
    fn test_queued_intent_matching_commit_needs_no_follow_up() {
        let mut store = FavoriteStore::new();
        let id = RecordId::from(1);
        let m = issued(store.toggle(id.clone()));
        store.toggle(id.clone());
        store.toggle(id.clone());
        let outcome = store.settle(m.ticket, ok());
        assert!(outcome.follow_ups.is_empty());
        assert!(store.is_favorite(&id));
    }

    #[test]
    fn test_stale_and_duplicate_settles_ignored() {
        let mut store = FavoriteStore::new();
        let m = issued(store.toggle(RecordId::from(1)));
        store.settle(m.ticket, ok());
        let again = store.settle(m.ticket, fail());
        assert!(again.result.is_ok());
        assert!(!again.resync);
        assert_eq!(store.mutation_state(m.ticket), Some(MutationState::Committed));

        store.reset();
        let outcome = store.settle(m.ticket, ok());
        assert!(!outcome.resync);
        assert_eq!(store.count(), 0);
    }

    #[test]
    fn test_mutation_requests() {
        let client = ApiClient::new(&ClientConfig::default());
        let mut store = FavoriteStore::new();
        let single = issued(store.toggle(RecordId::from(4)));
        let request = single.request(&client);
        assert_eq!(request.method, Method::Post);
        assert_eq!(request.url, "/api/favorites/4");

        let batch = store.remove_many(&[RecordId::from(5)]).unwrap();
        let request = batch.request(&client);
        assert_eq!(request.url, "/api/favorites/batch");
        assert_eq!(request.json(), Some(&json!({"action": "remove", "imageIds": [5]})));
    }

    // ===== Batch Tests =====

    #[test]
    fn test_add_many_skips_in_flight_ids() {
        let mut store = FavoriteStore::new();
        let single = issued(store.toggle(RecordId::from(1)));
        let batch = store
            .add_many(&[RecordId::from(1), RecordId::from(2), RecordId::from(2)])
            .unwrap();
        assert_eq!(batch.ids, vec![RecordId::from(2)]);
        assert!(store.is_favorite(&RecordId::from(2)));

        // The single add fails; the queued add from the batch is retried.
        let outcome = store.settle(single.ticket, fail());
        assert_eq!(outcome.follow_ups.len(), 1);
        assert_eq!(outcome.follow_ups[0].ids, vec![RecordId::from(1)]);
    }

    #[test]
    fn test_batch_always_resyncs_once() {
        let mut store = FavoriteStore::new();
        store.replace_all(vec![image(1), image(2)]);
        let batch = store.remove_many(&[RecordId::from(1), RecordId::from(2)]).unwrap();
        assert_eq!(store.count(), 0);
        let outcome = store.settle(batch.ticket, ok());
        assert!(outcome.resync);
        assert_eq!(store.count(), 0);

        let batch = store.add_many(&[RecordId::from(3)]).unwrap();
        let outcome = store.settle(batch.ticket, fail());
        assert!(outcome.resync);
        assert_eq!(store.count(), 0);
    }

    #[test]
    fn test_batch_with_only_in_flight_ids_sends_nothing() {
        let mut store = FavoriteStore::new();
        issued(store.toggle(RecordId::from(1)));
        assert!(store.remove_many(&[RecordId::from(1)]).is_none());
        assert!(!store.is_favorite(&RecordId::from(1)));
    }

    // ===== Sync Tests =====

    #[test]
    fn test_finish_fetch_replaces_committed() {
        let mut store = FavoriteStore::new();
        let client = ApiClient::new(&ClientConfig::default());
        let request = store.fetch_request(&client);
        assert_eq!(request.url, "/api/favorites");
        assert!(store.activity().is_loading());
        let reply = Ok(HttpResponse::json(200, &json!({"images": [{"id": 7}]})));
        store.finish_fetch(reply).unwrap();
        assert!(store.is_favorite(&RecordId::from(7)));
        assert_eq!(store.favorite_images().len(), 1);
        assert!(!store.activity().is_loading());
    }

    #[test]
    fn test_replace_all_keeps_pending_overlay() {
        let mut store = FavoriteStore::new();
        let m = issued(store.toggle(RecordId::from(1)));
        store.replace_all(vec![image(2)]);
        assert!(store.is_favorite(&RecordId::from(1)));
        assert_eq!(store.count(), 2);
        store.settle(m.ticket, fail());
        assert_eq!(store.count(), 1);
    }
}
