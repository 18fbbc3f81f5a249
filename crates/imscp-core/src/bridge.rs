//! Persistence bridge: keeps a session's CMI state in a key-value store.
//!
//! On install the bridge restores any blob stored under its key into the
//! session, then listens for `LMSCommit` and `LMSFinish` and overwrites the
//! blob with the session's current state each time either fires.
//!
//! ```text
//!   PersistenceBridge ──install──▶ BridgeHandle ──detach──▶ (store)
//!   (not yet listening)            (listening)
//! ```

use std::cell::RefCell;
use std::rc::Rc;

use serde_json::Value;

use crate::config::BridgeConfig;
use crate::error::CoreError;
use crate::session::{CmiSource, LifecycleEvent, Listener, ListenerId, Session};
use crate::system::Persistence;

/// Events whose firing persists the session state.
pub const SAVE_EVENTS: [LifecycleEvent; 2] = [LifecycleEvent::Commit, LifecycleEvent::Finish];

/// Guarded entry point: install a bridge only when both the session and the
/// store are available.
///
/// Returns `Ok(None)` without touching either dependency if one is missing.
pub fn attach<S: Persistence + 'static>(
    session: Option<&mut dyn Session>,
    store: Option<S>,
    config: &BridgeConfig,
) -> Result<Option<BridgeHandle<S>>, CoreError> {
    let (Some(session), Some(store)) = (session, store) else {
        tracing::debug!(key = %config.storage_key, "session or store unavailable, bridge not installed");
        return Ok(None);
    };
    PersistenceBridge::new(store, config).install(session).map(Some)
}

/// A bridge that has not been installed yet.
pub struct PersistenceBridge<S> {
    store: Rc<RefCell<S>>,
    key: Rc<str>,
}

impl<S: Persistence + 'static> PersistenceBridge<S> {
    pub fn new(store: S, config: &BridgeConfig) -> Self {
        Self::shared(Rc::new(RefCell::new(store)), config)
    }

    /// Build a bridge over a store the caller keeps a handle to.
    pub fn shared(store: Rc<RefCell<S>>, config: &BridgeConfig) -> Self {
        Self {
            store,
            key: Rc::from(config.storage_key.as_str()),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Startup restore. Loads the stored blob into `session` if one exists.
    /// An empty blob counts as nothing stored.
    ///
    /// Returns whether a load happened. Malformed JSON and loader rejections
    /// propagate; nothing is retried.
    pub fn restore(&self, session: &mut dyn Session) -> Result<bool, CoreError> {
        let Some(blob) = self.store.load(&self.key)?.filter(|blob| !blob.is_empty()) else {
            tracing::debug!(key = %self.key, "no persisted state");
            return Ok(false);
        };
        let data: Value = serde_json::from_str(&blob).map_err(|source| CoreError::MalformedState {
            key: self.key.to_string(),
            source,
        })?;
        session.load_from_json(data)?;
        tracing::debug!(key = %self.key, bytes = blob.len(), "restored persisted state");
        Ok(true)
    }

    /// Restore, then register the commit and finish listeners.
    ///
    /// If restore fails no listener is registered.
    pub fn install(self, session: &mut dyn Session) -> Result<BridgeHandle<S>, CoreError> {
        self.restore(session)?;
        let listeners = SAVE_EVENTS.map(|event| session.on(event, self.listener(event)));
        tracing::debug!(key = %self.key, "bridge listening for commit and finish");
        Ok(BridgeHandle {
            store: self.store,
            key: self.key,
            listeners,
        })
    }

    fn listener(&self, event: LifecycleEvent) -> Listener {
        let mut store = Rc::clone(&self.store);
        let key = Rc::clone(&self.key);
        Box::new(move |cmi: &dyn CmiSource| {
            save_state(&mut store, &key, cmi)?;
            tracing::debug!(%event, key = %key, "persisted session state");
            Ok(())
        })
    }
}

/// An installed bridge. Dropping the handle leaves the listeners in place;
/// call [`BridgeHandle::detach`] to remove them.
pub struct BridgeHandle<S> {
    store: Rc<RefCell<S>>,
    key: Rc<str>,
    listeners: [ListenerId; 2],
}

impl<S: Persistence + 'static> BridgeHandle<S> {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn store(&self) -> &Rc<RefCell<S>> {
        &self.store
    }

    /// Persist `session`'s state immediately, the same way the listeners do.
    pub fn save_now(&self, session: &dyn CmiSource) -> Result<(), CoreError> {
        let mut store = Rc::clone(&self.store);
        save_state(&mut store, &self.key, session)
    }

    /// Unregister both listeners and hand back the store.
    pub fn detach(self, session: &mut dyn Session) -> Rc<RefCell<S>> {
        for id in self.listeners {
            session.off(id);
        }
        self.store
    }
}

/// Serialize `source` and overwrite `key` in `store` with it.
pub fn save_state<P: Persistence + ?Sized>(
    store: &mut P,
    key: &str,
    source: &dyn CmiSource,
) -> Result<(), CoreError> {
    let state = source.cmi_json()?;
    let blob = serde_json::to_string(&state).map_err(|source| CoreError::Encode {
        key: key.to_string(),
        source,
    })?;
    store.save(key, &blob)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use serde_json::json;

    use super::*;
    use crate::error::{SessionError, StoreError};
    use crate::session::Listeners;
    use crate::system::MemoryStore;

    /// Session double that records loads and lets tests fire events.
    #[derive(Default)]
    struct FakeSession {
        state: Value,
        loads: Vec<Value>,
        listeners: Listeners,
        reject_loads: bool,
    }

    impl FakeSession {
        fn fire(&mut self, event: LifecycleEvent) -> Result<(), CoreError> {
            let state = Snapshot(self.state.clone());
            self.listeners.dispatch(event, &state)
        }
    }

    struct Snapshot(Value);

    impl CmiSource for Snapshot {
        fn cmi_json(&self) -> Result<Value, SessionError> {
            Ok(self.0.clone())
        }
    }

    impl CmiSource for FakeSession {
        fn cmi_json(&self) -> Result<Value, SessionError> {
            Ok(self.state.clone())
        }
    }

    impl Session for FakeSession {
        fn on(&mut self, event: LifecycleEvent, listener: Listener) -> ListenerId {
            self.listeners.add(event, listener)
        }

        fn off(&mut self, id: ListenerId) -> bool {
            self.listeners.remove(id)
        }

        fn load_from_json(&mut self, data: Value) -> Result<(), SessionError> {
            if self.reject_loads {
                return Err(SessionError::InvalidShape("wrong shape".into()));
            }
            self.loads.push(data.clone());
            self.state = data;
            Ok(())
        }
    }

    /// Store double that counts every access.
    #[derive(Default)]
    struct CountingStore {
        inner: MemoryStore,
        accesses: Rc<Cell<usize>>,
    }

    impl Persistence for CountingStore {
        fn save(&mut self, key: &str, data: &str) -> Result<(), StoreError> {
            self.accesses.set(self.accesses.get() + 1);
            self.inner.save(key, data)
        }

        fn load(&self, key: &str) -> Result<Option<String>, StoreError> {
            self.accesses.set(self.accesses.get() + 1);
            self.inner.load(key)
        }

        fn remove(&mut self, key: &str) -> Result<(), StoreError> {
            self.accesses.set(self.accesses.get() + 1);
            self.inner.remove(key)
        }
    }

    fn store_with(blob: &str) -> MemoryStore {
        [("scormData".to_string(), blob.to_string())].into_iter().collect()
    }

    #[test]
    fn empty_store_performs_no_load() {
        let mut session = FakeSession::default();
        let handle = attach(Some(&mut session), Some(MemoryStore::new()), &BridgeConfig::default())
            .unwrap()
            .unwrap();
        assert!(session.loads.is_empty());
        assert_eq!(session.listeners.count(LifecycleEvent::Commit), 1);
        assert_eq!(session.listeners.count(LifecycleEvent::Finish), 1);
        assert_eq!(handle.key(), "scormData");
    }

    #[test]
    fn empty_blob_performs_no_load() {
        let mut session = FakeSession::default();
        let handle = attach(Some(&mut session), Some(store_with("")), &BridgeConfig::default())
            .unwrap()
            .unwrap();
        assert!(session.loads.is_empty());
        assert_eq!(session.listeners.count(LifecycleEvent::Commit), 1);

        session.state = json!({ "suspend_data": "p1" });
        session.fire(LifecycleEvent::Commit).unwrap();
        assert_eq!(
            handle.store().load("scormData").unwrap().as_deref(),
            Some(r#"{"suspend_data":"p1"}"#)
        );
    }

    #[test]
    fn stored_blob_is_parsed_and_loaded() {
        let mut session = FakeSession::default();
        attach(Some(&mut session), Some(store_with(r#"{"a":1}"#)), &BridgeConfig::default()).unwrap();
        assert_eq!(session.loads, vec![json!({ "a": 1 })]);
    }

    #[test]
    fn commit_overwrites_blob() {
        let mut session = FakeSession::default();
        let handle = attach(Some(&mut session), Some(store_with("{}")), &BridgeConfig::default())
            .unwrap()
            .unwrap();
        session.state = json!({ "core": { "lesson_status": "completed" } });
        session.fire(LifecycleEvent::Commit).unwrap();
        assert_eq!(
            handle.store().load("scormData").unwrap().as_deref(),
            Some(r#"{"core":{"lesson_status":"completed"}}"#)
        );
    }

    #[test]
    fn finish_matches_commit() {
        let state = json!({ "suspend_data": "x=1" });
        let mut blobs = Vec::new();
        for event in SAVE_EVENTS {
            let mut session = FakeSession::default();
            let handle = attach(Some(&mut session), Some(MemoryStore::new()), &BridgeConfig::default())
                .unwrap()
                .unwrap();
            session.state = state.clone();
            session.fire(event).unwrap();
            blobs.push(handle.store().load("scormData").unwrap());
        }
        assert_eq!(blobs[0], blobs[1]);
        assert!(blobs[0].is_some());
    }

    #[test]
    fn initialize_does_not_persist() {
        let mut session = FakeSession::default();
        let handle = attach(Some(&mut session), Some(MemoryStore::new()), &BridgeConfig::default())
            .unwrap()
            .unwrap();
        session.fire(LifecycleEvent::Initialize).unwrap();
        assert_eq!(handle.store().load("scormData").unwrap(), None);
    }

    #[test]
    fn absent_session_touches_nothing() {
        let accesses = Rc::new(Cell::new(0));
        let store = CountingStore {
            inner: MemoryStore::new(),
            accesses: Rc::clone(&accesses),
        };
        let handle = attach(None, Some(store), &BridgeConfig::default()).unwrap();
        assert!(handle.is_none());
        assert_eq!(accesses.get(), 0);
    }

    #[test]
    fn absent_store_registers_nothing() {
        let mut session = FakeSession::default();
        let handle = attach::<MemoryStore>(Some(&mut session), None, &BridgeConfig::default()).unwrap();
        assert!(handle.is_none());
        assert!(session.listeners.is_empty());
    }

    #[test]
    fn malformed_blob_surfaces_parse_error() {
        let mut session = FakeSession::default();
        let err = attach(Some(&mut session), Some(store_with("{not json")), &BridgeConfig::default())
            .err()
            .unwrap();
        assert!(matches!(err, CoreError::MalformedState { ref key, .. } if key == "scormData"));
        assert!(session.listeners.is_empty());
    }

    #[test]
    fn loader_rejection_propagates() {
        let mut session = FakeSession {
            reject_loads: true,
            ..FakeSession::default()
        };
        let err = attach(Some(&mut session), Some(store_with("[]")), &BridgeConfig::default())
            .err()
            .unwrap();
        assert!(matches!(err, CoreError::Session(SessionError::InvalidShape(_))));
        assert!(session.listeners.is_empty());
    }

    #[test]
    fn custom_key_is_used() {
        let config = BridgeConfig {
            storage_key: "course-42".into(),
        };
        let mut session = FakeSession {
            state: json!({ "k": "v" }),
            ..FakeSession::default()
        };
        let handle = attach(Some(&mut session), Some(MemoryStore::new()), &config).unwrap().unwrap();
        session.fire(LifecycleEvent::Finish).unwrap();
        assert!(handle.store().load("course-42").unwrap().is_some());
        assert_eq!(handle.store().load("scormData").unwrap(), None);
    }

    #[test]
    fn detach_stops_persisting() {
        let mut session = FakeSession::default();
        let handle = attach(Some(&mut session), Some(MemoryStore::new()), &BridgeConfig::default())
            .unwrap()
            .unwrap();
        let store = handle.detach(&mut session);
        assert!(session.listeners.is_empty());
        session.fire(LifecycleEvent::Commit).unwrap();
        assert_eq!(store.load("scormData").unwrap(), None);
    }

    #[test]
    fn save_now_writes_current_state() {
        let mut session = FakeSession::default();
        let handle = attach(Some(&mut session), Some(MemoryStore::new()), &BridgeConfig::default())
            .unwrap()
            .unwrap();
        session.state = json!({ "comments": "hi" });
        handle.save_now(&session).unwrap();
        assert_eq!(
            handle.store().load("scormData").unwrap().as_deref(),
            Some(r#"{"comments":"hi"}"#)
        );
    }
}
