//! Turns web-content items of an extracted package into standalone zips.

use std::fs;
use std::path::{Component, Path, PathBuf};

use imscp_manifest::{ImsPackage, Item};
use sha2::{Digest, Sha256};

use crate::archive::create_predictable_zip;
use crate::error::WebContentError;
use crate::inject::{add_scorm_support, ScormAssets};

/// A page that immediately redirects to `url`.
fn redirect_page(url: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n  <head>\n    <meta http-equiv=\"refresh\" content=\"0; url={url}\" />\n  </head>\n  <body>\n  </body>\n</html>\n"
    )
}

/// Drop any `?query` or `#fragment` from a launch href, leaving the file path.
pub fn strip_query_fragment(href: &str) -> &str {
    let end = href.find(['?', '#']).unwrap_or(href.len());
    &href[..end]
}

/// Check that a manifest path stays inside whatever directory it is joined
/// to: only plain names and `.` components.
fn contained(rel: &str) -> Result<&Path, WebContentError> {
    let path = Path::new(rel);
    let mut named = false;
    for component in path.components() {
        match component {
            Component::Normal(_) => named = true,
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(WebContentError::UnsafePath(rel.to_string()))
            }
        }
    }
    if named {
        Ok(path)
    } else {
        Err(WebContentError::UnsafePath(rel.to_string()))
    }
}

/// Result of packaging one item.
#[derive(Debug, Clone)]
pub struct PackagedItem {
    pub identifier: String,
    pub title: Option<String>,
    pub zip_path: PathBuf,
    pub scorm: bool,
}

/// Package a web-content leaf as `<out_dir>/<identifier>-<hash>.zip`.
///
/// The hash covers the identifier, the launch href and the file list, so
/// distinct items never share a zip even without identifiers. Manifest
/// paths that could leave the package are rejected with
/// [`WebContentError::UnsafePath`] before anything is copied.
///
/// The item's files keep their package-relative paths. The zip root always
/// has an `index.html`: a copy of the launch page if it sits at the package
/// root, otherwise a redirect to it. SCOs get SCORM support when `scorm`
/// assets are provided.
pub fn package_webcontent(
    item: &Item,
    ims_dir: &Path,
    out_dir: &Path,
    scorm: Option<&ScormAssets>,
) -> Result<PackagedItem, WebContentError> {
    let identifier = item.identifier.clone().unwrap_or_default();
    let resource = item
        .resource
        .as_ref()
        .filter(|r| r.is_webcontent())
        .ok_or_else(|| WebContentError::NotWebContent(identifier.clone()))?;
    let launch = resource
        .index_file
        .as_deref()
        .ok_or_else(|| WebContentError::NotWebContent(identifier.clone()))?;
    let index_rel = strip_query_fragment(launch).trim_start_matches("./");
    let sources = resource
        .files
        .iter()
        .map(String::as_str)
        .chain([index_rel])
        .map(|file| contained(file.trim_start_matches("./")))
        .collect::<Result<Vec<_>, _>>()?;

    let staging = tempfile::tempdir().map_err(WebContentError::io(std::env::temp_dir()))?;
    let root = staging.path();

    for rel in sources {
        let src = ims_dir.join(rel);
        let dst = root.join(rel);
        if let Some(parent) = dst.parent() {
            fs::create_dir_all(parent).map_err(WebContentError::io(parent))?;
        }
        fs::copy(&src, &dst).map_err(WebContentError::io(&src))?;
    }

    let index_path = root.join(index_rel);
    let needs_scorm = scorm.filter(|_| item.is_sco());
    if let Some(assets) = needs_scorm {
        let page_dir = index_path.parent().unwrap_or(root);
        add_scorm_support(&index_path, page_dir, assets)?;
    }

    let root_index = root.join("index.html");
    if index_rel != "index.html" {
        if Path::new(index_rel).parent().is_some_and(|p| p.as_os_str().is_empty()) {
            fs::copy(&index_path, &root_index).map_err(WebContentError::io(&index_path))?;
        } else {
            fs::write(&root_index, redirect_page(launch.trim_start_matches("./")))
                .map_err(WebContentError::io(&root_index))?;
        }
    }

    let mut key = vec![identifier.as_str(), launch];
    key.extend(resource.files.iter().map(String::as_str));
    let zip_path = out_dir.join(zip_name(&identifier, &key));
    create_predictable_zip(root, &zip_path)?;
    tracing::info!(item = %identifier, zip = %zip_path.display(), scorm = needs_scorm.is_some(), "packaged web content");

    Ok(PackagedItem {
        identifier,
        title: item.title.clone(),
        zip_path,
        scorm: needs_scorm.is_some(),
    })
}

/// A redirect entrypoint into a shared package zip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entrypoint {
    /// Identifier path from the organization down, joined with `-`.
    pub source_id: String,
    pub title: Option<String>,
    /// Launch href inside the package.
    pub href: String,
}

/// Plan one entrypoint per web-content leaf.
///
/// Items without an identifier are numbered `item1`, `item2`, ... among
/// their siblings so source ids stay unique.
pub fn plan_entrypoints(pkg: &ImsPackage) -> Vec<Entrypoint> {
    let mut out = Vec::new();
    for (i, org) in pkg.organizations.iter().enumerate() {
        let id = org
            .identifier
            .clone()
            .unwrap_or_else(|| format!("org{}", i + 1));
        walk_entrypoints(org, id, &mut out);
    }
    out
}

fn walk_entrypoints(item: &Item, source_id: String, out: &mut Vec<Entrypoint>) {
    if item.is_leaf() {
        if let Some(href) = item
            .resource
            .as_ref()
            .filter(|r| r.is_webcontent())
            .and_then(|r| r.href.clone())
        {
            out.push(Entrypoint {
                source_id,
                title: item.title.clone(),
                href,
            });
        }
        return;
    }
    for (n, child) in item.children.iter().enumerate() {
        let child_id = match child.identifier.as_deref() {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => format!("item{}", n + 1),
        };
        walk_entrypoints(child, format!("{source_id}-{child_id}"), out);
    }
}

/// Write a zip whose only file is an `index.html` redirecting to
/// `/zipcontent/<package zip>/<href>`, named `<source_id>-<hash>.zip`.
/// Returns the zip path.
pub fn write_entrypoint(
    package_zip: &Path,
    entry: &Entrypoint,
    out_dir: &Path,
) -> Result<PathBuf, WebContentError> {
    let package_name = package_zip
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let url = format!("/zipcontent/{package_name}/{}", entry.href);

    let staging = tempfile::tempdir().map_err(WebContentError::io(std::env::temp_dir()))?;
    let index = staging.path().join("index.html");
    fs::write(&index, redirect_page(&url)).map_err(WebContentError::io(&index))?;

    let zip_path = out_dir.join(zip_name(&entry.source_id, &[entry.source_id.as_str(), entry.href.as_str()]));
    create_predictable_zip(staging.path(), &zip_path)?;
    tracing::debug!(source_id = %entry.source_id, %url, "wrote entrypoint");
    Ok(zip_path)
}

/// `<label>-<hash of key>.zip`. The label keeps names readable; the hash
/// keeps labels that sanitize alike (or are missing) apart.
fn zip_name(label: &str, key: &[&str]) -> String {
    let mut hasher = Sha256::new();
    for part in key {
        hasher.update(part.as_bytes());
        hasher.update([0u8]);
    }
    let digest = hasher.finalize();
    format!("{}-{}.zip", file_stem(label), hex::encode(&digest[..8]))
}

/// Make an identifier safe to use as a file name.
fn file_stem(id: &str) -> String {
    let stem: String = id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' { c } else { '_' })
        .collect();
    if stem.is_empty() || stem.chars().all(|c| c == '.') {
        "item".to_string()
    } else {
        stem
    }
}
