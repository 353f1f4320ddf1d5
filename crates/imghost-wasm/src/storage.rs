//! `window.localStorage` as session storage.

use imghost_core::session::SessionStorage;
use tracing::warn;
use web_sys::Storage;

/// Session storage backed by `localStorage`.
///
/// When storage is unavailable (private mode, sandboxed iframe) every read
/// misses and writes are dropped, leaving the session in memory only.
pub(crate) struct LocalStorage {
    inner: Option<Storage>,
}

impl LocalStorage {
    pub(crate) fn open() -> Self {
        let inner = web_sys::window().and_then(|window| window.local_storage().ok().flatten());
        if inner.is_none() {
            warn!("localStorage unavailable; session will not persist");
        }
        Self { inner }
    }
}

impl SessionStorage for LocalStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.inner.as_ref()?.get_item(key).ok().flatten()
    }

    fn set(&self, key: &str, value: &str) {
        if let Some(storage) = &self.inner {
            if storage.set_item(key, value).is_err() {
                warn!(key, "could not write to localStorage");
            }
        }
    }

    fn remove(&self, key: &str) {
        if let Some(storage) = &self.inner {
            let _ = storage.remove_item(key);
        }
    }
}

#[cfg(all(test, target_arch = "wasm32"))]
mod wasm_tests {
    use super::*;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    #[wasm_bindgen_test]
    fn test_round_trip_through_local_storage() {
        let storage = LocalStorage::open();
        storage.set("imghost-test", "{\"state\":{}}");
        assert_eq!(storage.get("imghost-test").as_deref(), Some("{\"state\":{}}"));
        storage.remove("imghost-test");
        assert_eq!(storage.get("imghost-test"), None);
    }
}
