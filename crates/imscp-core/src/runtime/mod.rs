//! In-process SCORM 1.2 runtime.
//!
//! Mirrors the `window.API` object a SCO talks to: the `LMS*` calls return
//! SCORM's string conventions (`"true"`/`"false"`, values as strings) and
//! record an error code that `LMSGetLastError` reports afterwards.
//! `LMSCommit` and `LMSFinish` fire [`LifecycleEvent`]s, which is how the
//! persistence bridge observes the session.

mod cmi;
mod error_code;

pub use cmi::CmiData;
pub use error_code::ScormErrorCode;

use serde_json::Value;

use crate::error::SessionError;
use crate::session::{CmiSource, LifecycleEvent, Listener, ListenerId, Listeners, Session};

const TRUE: &str = "true";
const FALSE: &str = "false";

/// Where the runtime is in its `LMSInitialize` / `LMSFinish` lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiState {
    NotInitialized,
    Running,
    Terminated,
}

#[derive(Debug)]
pub struct ScormApi {
    state: ApiState,
    cmi: CmiData,
    listeners: Listeners,
    last_error: ScormErrorCode,
    diagnostic: Option<String>,
}

impl Default for ScormApi {
    fn default() -> Self {
        Self::new()
    }
}

impl ScormApi {
    pub fn new() -> Self {
        Self {
            state: ApiState::NotInitialized,
            cmi: CmiData::default(),
            listeners: Listeners::new(),
            last_error: ScormErrorCode::NoError,
            diagnostic: None,
        }
    }

    pub fn state(&self) -> ApiState {
        self.state
    }

    pub fn cmi(&self) -> &CmiData {
        &self.cmi
    }

    pub fn lms_initialize(&mut self, arg: &str) -> &'static str {
        if !arg.is_empty() {
            return self.fail(ScormErrorCode::InvalidArgument, None);
        }
        match self.state {
            ApiState::Running => {
                return self.fail(ScormErrorCode::GeneralException, Some("LMSInitialize called twice"))
            }
            ApiState::Terminated => {
                return self.fail(ScormErrorCode::GeneralException, Some("session already finished"))
            }
            ApiState::NotInitialized => {}
        }
        self.state = ApiState::Running;
        self.fire(LifecycleEvent::Initialize)
    }

    pub fn lms_finish(&mut self, arg: &str) -> &'static str {
        if let Err(code) = self.check_running(arg) {
            return self.fail(code, None);
        }
        let result = self.fire(LifecycleEvent::Finish);
        if result == TRUE {
            self.state = ApiState::Terminated;
        }
        result
    }

    pub fn lms_commit(&mut self, arg: &str) -> &'static str {
        if let Err(code) = self.check_running(arg) {
            return self.fail(code, None);
        }
        self.fire(LifecycleEvent::Commit)
    }

    /// Returns the element's value, or `""` with the error code set.
    pub fn lms_get_value(&mut self, element: &str) -> String {
        if let Err(code) = self.check_running("") {
            self.fail(code, None);
            return String::new();
        }
        match self.cmi.get(element) {
            Ok(value) => {
                self.clear_error();
                value
            }
            Err(code) => {
                self.fail(code, Some(element));
                String::new()
            }
        }
    }

    pub fn lms_set_value(&mut self, element: &str, value: &str) -> &'static str {
        if let Err(code) = self.check_running("") {
            return self.fail(code, None);
        }
        match self.cmi.set(element, value) {
            Ok(()) => {
                self.clear_error();
                TRUE
            }
            Err(code) => self.fail(code, Some(element)),
        }
    }

    pub fn lms_get_last_error(&self) -> String {
        self.last_error.code().to_string()
    }

    pub fn lms_get_error_string(&self, code: &str) -> String {
        code.trim()
            .parse()
            .ok()
            .and_then(ScormErrorCode::from_code)
            .map(|e| e.message().to_string())
            .unwrap_or_default()
    }

    /// Detail for the last error when `code` is empty or matches it,
    /// otherwise the generic message for `code`.
    pub fn lms_get_diagnostic(&self, code: &str) -> String {
        if code.is_empty() || code == self.lms_get_last_error() {
            if let Some(detail) = &self.diagnostic {
                return detail.clone();
            }
            return self.last_error.message().to_string();
        }
        self.lms_get_error_string(code)
    }

    fn check_running(&self, arg: &str) -> Result<(), ScormErrorCode> {
        match self.state {
            ApiState::NotInitialized => Err(ScormErrorCode::NotInitialized),
            ApiState::Terminated => Err(ScormErrorCode::GeneralException),
            ApiState::Running if !arg.is_empty() => Err(ScormErrorCode::InvalidArgument),
            ApiState::Running => Ok(()),
        }
    }

    fn fire(&mut self, event: LifecycleEvent) -> &'static str {
        match self.listeners.dispatch(event, &self.cmi) {
            Ok(()) => {
                self.clear_error();
                TRUE
            }
            Err(e) => {
                tracing::warn!(%event, error = %e, "lifecycle listener failed");
                let detail = e.to_string();
                self.fail(ScormErrorCode::GeneralException, Some(&detail))
            }
        }
    }

    fn fail(&mut self, code: ScormErrorCode, detail: Option<&str>) -> &'static str {
        self.last_error = code;
        self.diagnostic = detail.map(str::to_string);
        FALSE
    }

    fn clear_error(&mut self) {
        self.last_error = ScormErrorCode::NoError;
        self.diagnostic = None;
    }
}

impl CmiSource for ScormApi {
    fn cmi_json(&self) -> Result<Value, SessionError> {
        self.cmi.cmi_json()
    }
}

impl Session for ScormApi {
    fn on(&mut self, event: LifecycleEvent, listener: Listener) -> ListenerId {
        self.listeners.add(event, listener)
    }

    fn off(&mut self, id: ListenerId) -> bool {
        self.listeners.remove(id)
    }

    fn load_from_json(&mut self, data: Value) -> Result<(), SessionError> {
        if self.state != ApiState::NotInitialized {
            return Err(SessionError::AlreadyInitialized);
        }
        self.cmi.merge(data)
    }
}
