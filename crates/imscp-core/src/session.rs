//! The capability set a SCORM session exposes to its observers.
//!
//! A session owns its CMI state. Observers never touch that state directly:
//! they register a [`Listener`] for a [`LifecycleEvent`] and receive a
//! read-only [`CmiSource`] view when the session fires it.

use std::fmt;
use std::str::FromStr;

use serde_json::Value;

use crate::error::{CoreError, SessionError};

/// Lifecycle events a session emits, named after the SCORM 1.2 API calls
/// that trigger them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleEvent {
    Initialize,
    /// "Save now".
    Commit,
    /// "Session ending".
    Finish,
}

impl LifecycleEvent {
    pub const ALL: [LifecycleEvent; 3] = [Self::Initialize, Self::Commit, Self::Finish];

    pub fn api_name(self) -> &'static str {
        match self {
            Self::Initialize => "LMSInitialize",
            Self::Commit => "LMSCommit",
            Self::Finish => "LMSFinish",
        }
    }
}

impl fmt::Display for LifecycleEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.api_name())
    }
}

impl FromStr for LifecycleEvent {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|e| e.api_name() == s)
            .ok_or_else(|| format!("unknown lifecycle event: {s:?}"))
    }
}

/// Read-only access to a session's serialized state (`cmi.toJSON()`).
pub trait CmiSource {
    fn cmi_json(&self) -> Result<Value, SessionError>;
}

/// Callback invoked synchronously when a session fires an event.
///
/// Returning an error aborts dispatch; the session reports it to whoever
/// triggered the event.
pub type Listener = Box<dyn FnMut(&dyn CmiSource) -> Result<(), CoreError>>;

/// Handle returned by [`Session::on`], used to unregister a listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// A session object the persistence bridge can attach to.
pub trait Session: CmiSource {
    /// Register `listener` for `event`. Listeners run in registration order.
    fn on(&mut self, event: LifecycleEvent, listener: Listener) -> ListenerId;

    /// Unregister a listener. Returns `false` if the id was unknown.
    fn off(&mut self, id: ListenerId) -> bool;

    /// Replace the session's state with a previously serialized blob
    /// (`loadFromJSON`).
    fn load_from_json(&mut self, data: Value) -> Result<(), SessionError>;
}

/// Ordered listener registry that session implementations can embed.
#[derive(Default)]
pub struct Listeners {
    next_id: u64,
    entries: Vec<(ListenerId, LifecycleEvent, Listener)>,
}

impl Listeners {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, event: LifecycleEvent, listener: Listener) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.entries.push((id, event, listener));
        id
    }

    pub fn remove(&mut self, id: ListenerId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry_id, _, _)| *entry_id != id);
        self.entries.len() != before
    }

    pub fn count(&self, event: LifecycleEvent) -> usize {
        self.entries.iter().filter(|(_, e, _)| *e == event).count()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Run every listener registered for `event` against `source`, stopping
    /// at the first error.
    pub fn dispatch(&mut self, event: LifecycleEvent, source: &dyn CmiSource) -> Result<(), CoreError> {
        for (_, _, listener) in self.entries.iter_mut().filter(|(_, e, _)| *e == event) {
            listener(source)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Listeners {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listeners")
            .field("next_id", &self.next_id)
            .field("registered", &self.entries.len())
            .finish()
    }
}
