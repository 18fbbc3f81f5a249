//! SCORM 1.2 CMI data model stored as a JSON tree.
//!
//! Element paths are dotted (`cmi.core.lesson_status`); the tree is keyed
//! without the leading `cmi.` so it serializes the way `cmi.toJSON()` does.

use serde_json::{json, Map, Value};

use super::ScormErrorCode;
use crate::error::SessionError;
use crate::session::CmiSource;

const READ_ONLY: &[&str] = &[
    "core.student_id",
    "core.student_name",
    "core.credit",
    "core.entry",
    "core.total_time",
    "core.lesson_mode",
    "launch_data",
    "comments_from_lms",
];

const WRITE_ONLY: &[&str] = &["core.exit", "core.session_time"];

const LESSON_STATUS: &[&str] = &["passed", "completed", "failed", "incomplete", "browsed", "not attempted"];

const EXIT: &[&str] = &["", "time-out", "suspend", "logout"];

const SCORES: &[&str] = &["core.score.raw", "core.score.min", "core.score.max"];

/// The CMI state container of a [`ScormApi`](super::ScormApi).
#[derive(Debug, Clone, PartialEq)]
pub struct CmiData {
    root: Map<String, Value>,
}

impl Default for CmiData {
    fn default() -> Self {
        let root = match json!({
            "core": {
                "student_id": "",
                "student_name": "",
                "lesson_location": "",
                "credit": "credit",
                "lesson_status": "not attempted",
                "entry": "ab-initio",
                "score": { "raw": "", "min": "", "max": "" },
                "total_time": "0000:00:00.00",
                "lesson_mode": "normal",
                "exit": "",
                "session_time": "",
            },
            "suspend_data": "",
            "launch_data": "",
            "comments": "",
            "comments_from_lms": "",
        }) {
            Value::Object(root) => root,
            _ => Map::new(),
        };
        Self { root }
    }
}

impl CmiData {
    /// `LMSGetValue` semantics: keyword handling, write-only checks, lookup.
    pub fn get(&self, element: &str) -> Result<String, ScormErrorCode> {
        let path = relative(element)?;

        if let Some(parent) = path.strip_suffix("._children") {
            return match self.lookup(parent) {
                Some(Value::Object(children)) => Ok(children.keys().cloned().collect::<Vec<_>>().join(",")),
                Some(_) => Err(ScormErrorCode::ElementCannotHaveChildren),
                None => Err(ScormErrorCode::NotImplemented),
            };
        }
        if path.ends_with("._count") {
            return Err(ScormErrorCode::ElementNotAnArray);
        }
        if WRITE_ONLY.contains(&path) {
            return Err(ScormErrorCode::WriteOnly);
        }

        match self.lookup(path) {
            Some(Value::String(value)) => Ok(value.clone()),
            Some(_) => Err(ScormErrorCode::InvalidArgument),
            None => Err(ScormErrorCode::NotImplemented),
        }
    }

    /// `LMSSetValue` semantics. Unknown elements under `cmi.` are created as
    /// free-form strings.
    pub fn set(&mut self, element: &str, value: &str) -> Result<(), ScormErrorCode> {
        let path = relative(element)?;
        if path.ends_with("._children") || path.ends_with("._count") {
            return Err(ScormErrorCode::InvalidSetValue);
        }
        if READ_ONLY.contains(&path) {
            return Err(ScormErrorCode::ReadOnly);
        }
        validate(path, value)?;

        let (parents, leaf) = match path.rsplit_once('.') {
            Some((parents, leaf)) => (Some(parents), leaf),
            None => (None, path),
        };
        let mut node = &mut self.root;
        for part in parents.into_iter().flat_map(|p| p.split('.')) {
            let slot = node
                .entry(part.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            node = match slot {
                Value::Object(children) => children,
                _ => return Err(ScormErrorCode::ElementCannotHaveChildren),
            };
        }
        if let Some(Value::Object(_)) = node.get(leaf) {
            return Err(ScormErrorCode::InvalidArgument);
        }
        node.insert(leaf.to_string(), Value::String(value.to_string()));
        Ok(())
    }

    /// Merge a serialized tree into the current one (`loadFromJSON`).
    ///
    /// Leaves must be strings; numbers and booleans are stored in their
    /// string form. Nothing is applied unless the whole tree is accepted.
    pub fn merge(&mut self, data: Value) -> Result<(), SessionError> {
        let source = match data {
            Value::Object(source) => source,
            other => {
                return Err(SessionError::InvalidShape(format!(
                    "expected a JSON object, found {}",
                    kind(&other)
                )))
            }
        };
        let mut next = self.root.clone();
        merge_into(&mut next, source, "cmi")?;
        self.root = next;
        Ok(())
    }

    fn lookup(&self, path: &str) -> Option<&Value> {
        let mut parts = path.split('.');
        let first = self.root.get(parts.next()?)?;
        parts.try_fold(first, |node, part| node.as_object()?.get(part))
    }
}

impl CmiSource for CmiData {
    fn cmi_json(&self) -> Result<Value, SessionError> {
        Ok(serde_json::to_value(&self.root)?)
    }
}

fn relative(element: &str) -> Result<&str, ScormErrorCode> {
    match element.strip_prefix("cmi.") {
        Some(path) if !path.is_empty() && !path.split('.').any(str::is_empty) => Ok(path),
        _ => Err(ScormErrorCode::InvalidArgument),
    }
}

fn validate(path: &str, value: &str) -> Result<(), ScormErrorCode> {
    let ok = match path {
        "core.lesson_status" => LESSON_STATUS.contains(&value),
        "core.exit" => EXIT.contains(&value),
        "core.session_time" => is_timespan(value),
        p if SCORES.contains(&p) => {
            value.is_empty()
                || (is_decimal(value) && value.parse::<f64>().is_ok_and(|n| (0.0..=100.0).contains(&n)))
        }
        _ => true,
    };
    if ok {
        Ok(())
    } else {
        Err(ScormErrorCode::IncorrectDataType)
    }
}

/// CMIDecimal: optional leading `-`, digits, at most one `.`.
fn is_decimal(value: &str) -> bool {
    let unsigned = value.strip_prefix('-').unwrap_or(value);
    let (whole, frac) = unsigned.split_once('.').unwrap_or((unsigned, ""));
    !(whole.is_empty() && frac.is_empty())
        && whole.bytes().chain(frac.bytes()).all(|b| b.is_ascii_digit())
}

/// CMITimespan: `HHHH:MM:SS.SS`, hours 2-4 digits, optional 1-2 digit
/// fraction.
fn is_timespan(value: &str) -> bool {
    let digits = |s: &str, min: usize, max: usize| {
        (min..=max).contains(&s.len()) && s.bytes().all(|b| b.is_ascii_digit())
    };
    let mut parts = value.split(':');
    let (Some(h), Some(m), Some(s), None) = (parts.next(), parts.next(), parts.next(), parts.next()) else {
        return false;
    };
    let (secs, frac) = match s.split_once('.') {
        Some((secs, frac)) => (secs, Some(frac)),
        None => (s, None),
    };
    digits(h, 2, 4) && digits(m, 2, 2) && digits(secs, 2, 2) && frac.map_or(true, |f| digits(f, 1, 2))
}

fn merge_into(target: &mut Map<String, Value>, source: Map<String, Value>, path: &str) -> Result<(), SessionError> {
    for (key, value) in source {
        let child_path = format!("{path}.{key}");
        let leaf = match value {
            Value::Object(inner) => {
                let slot = target.entry(key).or_insert_with(|| Value::Object(Map::new()));
                match slot {
                    Value::Object(children) => merge_into(children, inner, &child_path)?,
                    _ => {
                        return Err(SessionError::InvalidShape(format!(
                            "{child_path} is a value, not a group"
                        )))
                    }
                }
                continue;
            }
            Value::String(s) => s,
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            other => {
                return Err(SessionError::InvalidShape(format!(
                    "{child_path} must be a string or a group, found {}",
                    kind(&other)
                )))
            }
        };
        if let Some(Value::Object(_)) = target.get(&key) {
            return Err(SessionError::InvalidShape(format!("{child_path} is a group, not a value")));
        }
        target.insert(key, Value::String(leaf));
    }
    Ok(())
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_readable() {
        let cmi = CmiData::default();
        assert_eq!(cmi.get("cmi.core.lesson_status").unwrap(), "not attempted");
        assert_eq!(cmi.get("cmi.core.credit").unwrap(), "credit");
        assert_eq!(cmi.get("cmi.core.score._children").unwrap(), "max,min,raw");
    }

    #[test]
    fn read_only_and_write_only() {
        let mut cmi = CmiData::default();
        assert_eq!(cmi.set("cmi.core.student_id", "x"), Err(ScormErrorCode::ReadOnly));
        assert_eq!(cmi.get("cmi.core.exit"), Err(ScormErrorCode::WriteOnly));
        cmi.set("cmi.core.exit", "suspend").unwrap();
        assert_eq!(cmi.get("cmi.core.exit"), Err(ScormErrorCode::WriteOnly));
    }

    #[test]
    fn keywords_cannot_be_set() {
        let mut cmi = CmiData::default();
        assert_eq!(cmi.set("cmi.core._children", "a"), Err(ScormErrorCode::InvalidSetValue));
        assert_eq!(cmi.get("cmi.interactions._count"), Err(ScormErrorCode::ElementNotAnArray));
        assert_eq!(
            cmi.get("cmi.suspend_data._children"),
            Err(ScormErrorCode::ElementCannotHaveChildren)
        );
    }

    #[test]
    fn vocabulary_and_range_checks() {
        let mut cmi = CmiData::default();
        assert_eq!(cmi.set("cmi.core.lesson_status", "done"), Err(ScormErrorCode::IncorrectDataType));
        cmi.set("cmi.core.lesson_status", "completed").unwrap();
        assert_eq!(cmi.set("cmi.core.score.raw", "101"), Err(ScormErrorCode::IncorrectDataType));
        assert_eq!(cmi.set("cmi.core.score.raw", "abc"), Err(ScormErrorCode::IncorrectDataType));
        cmi.set("cmi.core.score.raw", "87.5").unwrap();
        cmi.set("cmi.core.score.raw", "").unwrap();
        assert_eq!(cmi.set("cmi.core.exit", "quit"), Err(ScormErrorCode::IncorrectDataType));
    }

    #[test]
    fn scores_are_plain_decimals() {
        let mut cmi = CmiData::default();
        for ok in ["0", "100", "87.5", ".5", "5.", "-0"] {
            assert_eq!(cmi.set("cmi.core.score.raw", ok), Ok(()), "{ok:?}");
        }
        for bad in ["1e1", "+50", " 5", "5 ", "1.2.3", "-", ".", "inf", "NaN", "-1"] {
            assert_eq!(
                cmi.set("cmi.core.score.min", bad),
                Err(ScormErrorCode::IncorrectDataType),
                "{bad:?}"
            );
        }
    }

    #[test]
    fn timespans() {
        assert!(is_timespan("00:01:30"));
        assert!(is_timespan("0000:01:30.5"));
        assert!(is_timespan("12:00:00.25"));
        assert!(!is_timespan("1:00:00"));
        assert!(!is_timespan("00:00"));
        assert!(!is_timespan("00:00:00.123"));
    }

    #[test]
    fn invalid_element_names() {
        let mut cmi = CmiData::default();
        assert_eq!(cmi.get("core.lesson_status"), Err(ScormErrorCode::InvalidArgument));
        assert_eq!(cmi.get("cmi."), Err(ScormErrorCode::InvalidArgument));
        assert_eq!(cmi.get("cmi.core"), Err(ScormErrorCode::InvalidArgument));
        assert_eq!(cmi.get("cmi.nope"), Err(ScormErrorCode::NotImplemented));
        assert_eq!(cmi.set("cmi.core", "x"), Err(ScormErrorCode::InvalidArgument));
        assert_eq!(
            cmi.set("cmi.suspend_data.inner", "x"),
            Err(ScormErrorCode::ElementCannotHaveChildren)
        );
    }

    #[test]
    fn custom_elements_are_free_form() {
        let mut cmi = CmiData::default();
        cmi.set("cmi.student_preference.audio", "0").unwrap();
        assert_eq!(cmi.get("cmi.student_preference.audio").unwrap(), "0");
    }

    #[test]
    fn merge_is_all_or_nothing() {
        let mut cmi = CmiData::default();
        let err = cmi
            .merge(json!({ "suspend_data": "abc", "core": { "score": "flat" } }))
            .unwrap_err();
        assert!(matches!(err, SessionError::InvalidShape(_)));
        assert_eq!(cmi.get("cmi.suspend_data").unwrap(), "");
    }

    #[test]
    fn merge_stringifies_scalars() {
        let mut cmi = CmiData::default();
        cmi.merge(json!({ "a": 1, "core": { "lesson_location": true } })).unwrap();
        assert_eq!(cmi.get("cmi.a").unwrap(), "1");
        assert_eq!(cmi.get("cmi.core.lesson_location").unwrap(), "true");
    }

    #[test]
    fn merge_rejects_non_objects() {
        let mut cmi = CmiData::default();
        assert!(cmi.merge(json!([1, 2])).is_err());
        assert!(cmi.merge(json!({ "comments": null })).is_err());
    }
}
