//! Adds the SCORM runtime and the localStorage persistence script to a SCO's
//! launch page.

use std::fs;
use std::path::{Path, PathBuf};

use include_dir::{include_dir, Dir};
use scraper::{Html, Selector};

use crate::error::WebContentError;
use crate::html_util::find_tags;

/// Directory (next to the launch page) the scripts are copied into.
pub const SCORM_DIR: &str = "le-scorm";
pub const API_SCRIPT: &str = "scormAPI.js";
pub const HANDLERS_SCRIPT: &str = "scorm_handlers.js";

/// Scripts bundled with this crate (the persistence handlers).
static BUNDLED: Dir<'_> = include_dir!("$CARGO_MANIFEST_DIR/assets/le-scorm");

/// External files needed to make a SCO runnable offline.
#[derive(Debug, Clone)]
pub struct ScormAssets {
    /// The SCORM 1.2 runtime (`scormAPI.js` from simplify-scorm), which
    /// defines `window.API`.
    pub api_js: PathBuf,
}

/// Where the script tags ended up in `<head>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    Start,
    End,
}

/// Copy the SCORM scripts into `dest_dir/le-scorm/` and reference them from
/// the page at `index_path`, rewriting it in place.
pub fn add_scorm_support(
    index_path: &Path,
    dest_dir: &Path,
    assets: &ScormAssets,
) -> Result<Placement, WebContentError> {
    let html = fs::read_to_string(index_path).map_err(WebContentError::io(index_path))?;
    let (updated, placement) =
        inject_scripts(&html).ok_or_else(|| WebContentError::MissingHead(index_path.to_path_buf()))?;

    let scorm_dir = dest_dir.join(SCORM_DIR);
    fs::create_dir_all(&scorm_dir).map_err(WebContentError::io(&scorm_dir))?;
    for file in BUNDLED.files() {
        let target = scorm_dir.join(file.path());
        fs::write(&target, file.contents()).map_err(WebContentError::io(&target))?;
    }
    let api_target = scorm_dir.join(API_SCRIPT);
    fs::copy(&assets.api_js, &api_target).map_err(WebContentError::io(&assets.api_js))?;

    fs::write(index_path, updated).map_err(WebContentError::io(index_path))?;
    tracing::debug!(page = %index_path.display(), ?placement, "added SCORM support");
    Ok(placement)
}

/// Insert the two script tags into `<head>`, runtime first.
///
/// Scripts go at the start of `<head>` so `window.API` exists before the
/// page's own scripts look for it. Hot Potatoes pages locate the API from
/// their own head scripts at load time, so there the tags go at the end.
/// Returns `None` if the document has no `<head>`.
pub fn inject_scripts(html: &str) -> Option<(String, Placement)> {
    let snippet = format!(
        r#"<script src="{SCORM_DIR}/{API_SCRIPT}"></script><script src="{SCORM_DIR}/{HANDLERS_SCRIPT}"></script>"#
    );
    let tags = find_tags(html);
    let head = tags.iter().find(|t| t.info.name == "head" && !t.info.is_end)?;

    let (at, placement) = if is_hot_potatoes(html) {
        let at = tags
            .iter()
            .filter(|t| t.start >= head.end)
            .find(|t| (t.info.name == "head" && t.info.is_end) || (t.info.name == "body" && !t.info.is_end))
            .map_or(html.len(), |t| t.start);
        (at, Placement::End)
    } else {
        (head.end, Placement::Start)
    };

    let mut out = String::with_capacity(html.len() + snippet.len());
    out.push_str(&html[..at]);
    out.push_str(&snippet);
    out.push_str(&html[at..]);
    Some((out, placement))
}

/// Hot Potatoes exports carry `<meta name="author" content="Hot Potatoes ...">`.
pub fn is_hot_potatoes(html: &str) -> bool {
    let Ok(selector) = Selector::parse(r#"meta[name="author"]"#) else {
        return false;
    };
    Html::parse_document(html)
        .select(&selector)
        .next()
        .and_then(|meta| meta.attr("content"))
        .is_some_and(|content| content.contains("Hot Potatoes"))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCRIPTS: &str =
        r#"<script src="le-scorm/scormAPI.js"></script><script src="le-scorm/scorm_handlers.js"></script>"#;

    #[test]
    fn scripts_go_first_in_head() {
        let html = r#"<html><head><script src="app.js"></script></head><body></body></html>"#;
        let (out, placement) = inject_scripts(html).unwrap();
        assert_eq!(placement, Placement::Start);
        assert_eq!(
            out,
            format!(r#"<html><head>{SCRIPTS}<script src="app.js"></script></head><body></body></html>"#)
        );
    }

    #[test]
    fn hot_potatoes_appends() {
        let html = r#"<html><HEAD><meta name="author" content="Created with Hot Potatoes by Half-Baked Software"><script>var x;</script></HEAD><body></body></html>"#;
        let (out, placement) = inject_scripts(html).unwrap();
        assert_eq!(placement, Placement::End);
        assert!(out.contains(&format!("<script>var x;</script>{SCRIPTS}</HEAD>")));
    }

    #[test]
    fn head_attributes_are_kept() {
        let html = r#"<head lang="en"><title>t</title></head>"#;
        let (out, _) = inject_scripts(html).unwrap();
        assert!(out.starts_with(&format!(r#"<head lang="en">{SCRIPTS}<title>"#)));
    }

    #[test]
    fn missing_head_is_none() {
        assert!(inject_scripts("<p>fragment</p>").is_none());
    }

    #[test]
    fn other_authors_are_not_hot_potatoes() {
        assert!(!is_hot_potatoes(r#"<head><meta name="author" content="eXeLearning"></head>"#));
        assert!(!is_hot_potatoes("<head></head>"));
    }

    #[test]
    fn copies_scripts_and_rewrites_page() {
        let dir = tempfile::tempdir().unwrap();
        let index = dir.path().join("index.html");
        fs::write(&index, "<html><head></head><body></body></html>").unwrap();
        let api_js = dir.path().join("runtime.js");
        fs::write(&api_js, "window.API = {};").unwrap();

        add_scorm_support(&index, dir.path(), &ScormAssets { api_js }).unwrap();

        let page = fs::read_to_string(&index).unwrap();
        assert!(page.contains(SCRIPTS));
        let scorm_dir = dir.path().join(SCORM_DIR);
        assert_eq!(fs::read_to_string(scorm_dir.join(API_SCRIPT)).unwrap(), "window.API = {};");
        let handlers = fs::read_to_string(scorm_dir.join(HANDLERS_SCRIPT)).unwrap();
        assert!(handlers.contains("'scormData'"));
        assert!(handlers.contains("LMSCommit"));
        assert!(handlers.contains("LMSFinish"));
    }

    #[test]
    fn page_without_head_is_left_alone() {
        let dir = tempfile::tempdir().unwrap();
        let index = dir.path().join("index.html");
        fs::write(&index, "<p>no head</p>").unwrap();
        let api_js = dir.path().join("runtime.js");
        fs::write(&api_js, "").unwrap();

        let err = add_scorm_support(&index, dir.path(), &ScormAssets { api_js }).unwrap_err();
        assert!(matches!(err, WebContentError::MissingHead(_)));
        assert_eq!(fs::read_to_string(&index).unwrap(), "<p>no head</p>");
        assert!(!dir.path().join(SCORM_DIR).exists());
    }
}
