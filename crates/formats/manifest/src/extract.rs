//! IMS Content Package extraction.
//!
//! Reads `imsmanifest.xml` and produces an [`ImsPackage`]: the package
//! identifier, its LOM metadata, and one item tree per organization with
//! every leaf linked to the resource it launches. Namespaces are ignored;
//! elements are matched by local name since real packages mix IMSCP 1.1.x,
//! ADL and LOM prefixes freely.

use std::collections::{BTreeMap, HashMap};
use std::fs::{self, File};
use std::io;
use std::path::Path;

use roxmltree::{Document, Node, ParsingOptions};
use zip::ZipArchive;

use crate::decode::decode_manifest;
use crate::error::ManifestError;
use crate::metadata::{all_text, child, collect_metadata};
use crate::package::{ImsPackage, Item, ResourceLink};

pub const MANIFEST_FILE: &str = "imsmanifest.xml";

const XML_NS: &str = "http://www.w3.org/XML/1998/namespace";

type Resources<'a, 'input> = HashMap<&'a str, Node<'a, 'input>>;

/// Unpack `zip_path` into `dest` and extract the package found there.
pub fn extract_from_zip(zip_path: &Path, dest: &Path) -> Result<ImsPackage, ManifestError> {
    tracing::info!(zip = %zip_path.display(), dest = %dest.display(), "extracting content package");
    unpack_zip(zip_path, dest)?;
    extract_from_dir(dest)
}

/// Extract a package that has already been unpacked into `dir`.
pub fn extract_from_dir(dir: &Path) -> Result<ImsPackage, ManifestError> {
    let path = dir.join(MANIFEST_FILE);
    tracing::info!(manifest = %path.display(), "parsing manifest");
    let bytes = fs::read(&path).map_err(|source| match source.kind() {
        io::ErrorKind::NotFound => ManifestError::MissingManifest(dir.to_path_buf()),
        _ => ManifestError::Io {
            path: path.clone(),
            source,
        },
    })?;
    parse_manifest(&bytes)
}

/// Parse raw `imsmanifest.xml` bytes.
pub fn parse_manifest(bytes: &[u8]) -> Result<ImsPackage, ManifestError> {
    let (text, _) = decode_manifest(bytes);
    let options = ParsingOptions {
        allow_dtd: true,
        ..ParsingOptions::default()
    };
    let doc = Document::parse_with_options(&text, options)?;
    let root = doc.root_element();

    let metadata = child(root, "metadata").map(collect_metadata).unwrap_or_default();

    let resources: Resources = child(root, "resources")
        .ok_or(ManifestError::MissingResources)?
        .children()
        .filter(|n| n.is_element())
        .filter_map(|n| Some((n.attribute("identifier")?, n)))
        .collect();

    let mut organizations = Vec::new();
    if let Some(orgs) = child(root, "organizations") {
        for org in elements(orgs, "organization") {
            let mut tree = walk_items(org)?;
            collect_resources(&mut tree, &resources)?;
            organizations.push(tree);
        }
    }
    tracing::debug!(
        organizations = organizations.len(),
        resources = resources.len(),
        "manifest parsed"
    );

    Ok(ImsPackage {
        identifier: root.attribute("identifier").map(str::to_string),
        metadata,
        organizations,
    })
}

/// Unpack every entry of `zip_path` under `dest`. Entries whose names would
/// escape `dest` are skipped. Returns the number of files written.
pub fn unpack_zip(zip_path: &Path, dest: &Path) -> Result<usize, ManifestError> {
    let io_err = |path: &Path| {
        let path = path.to_path_buf();
        move |source| ManifestError::Io { path, source }
    };
    let zip_err = |source| ManifestError::Zip {
        path: zip_path.to_path_buf(),
        source,
    };

    fs::create_dir_all(dest).map_err(io_err(dest))?;
    let file = File::open(zip_path).map_err(io_err(zip_path))?;
    let mut archive = ZipArchive::new(file).map_err(zip_err)?;

    let mut written = 0;
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).map_err(zip_err)?;
        let Some(relative) = entry.enclosed_name() else {
            tracing::warn!(name = entry.name(), "skipping zip entry outside the package");
            continue;
        };
        let out = dest.join(relative);
        if entry.is_dir() {
            fs::create_dir_all(&out).map_err(io_err(&out))?;
            continue;
        }
        if let Some(parent) = out.parent() {
            fs::create_dir_all(parent).map_err(io_err(parent))?;
        }
        let mut target = File::create(&out).map_err(io_err(&out))?;
        io::copy(&mut entry, &mut target).map_err(io_err(&out))?;
        written += 1;
    }
    Ok(written)
}

fn elements<'a, 'input: 'a>(
    node: Node<'a, 'input>,
    name: &'a str,
) -> impl Iterator<Item = Node<'a, 'input>> + 'a {
    node.children()
        .filter(move |c| c.is_element() && c.tag_name().name() == name)
}

fn attributes(node: Node<'_, '_>) -> BTreeMap<String, String> {
    node.attributes()
        .map(|a| (a.name().to_string(), a.value().to_string()))
        .collect()
}

/// Build the item tree rooted at an `<organization>` or `<item>`.
fn walk_items(node: Node<'_, '_>) -> Result<Item, ManifestError> {
    let mut attributes = attributes(node);
    let identifier = attributes.remove("identifier");
    let identifierref = attributes.remove("identifierref");

    // All text of the title, so stray <br> tags from authoring tools don't
    // truncate it.
    let title = match child(node, "title") {
        Some(title_elem) => {
            let text = all_text(title_elem);
            let text = text.trim();
            if text.is_empty() {
                return Err(ManifestError::EmptyTitle {
                    item: identifier.unwrap_or_default(),
                });
            }
            Some(text.to_string())
        }
        None => None,
    };

    let metadata = child(node, "metadata").map(collect_metadata);
    let children = elements(node, "item")
        .map(walk_items)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Item {
        identifier,
        identifierref,
        title,
        attributes,
        metadata,
        children,
        resource: None,
    })
}

fn collect_resources(item: &mut Item, resources: &Resources<'_, '_>) -> Result<(), ManifestError> {
    if !item.children.is_empty() {
        for child in &mut item.children {
            collect_resources(child, resources)?;
        }
        return Ok(());
    }
    let Some(idref) = item.identifierref.as_deref() else {
        return Ok(());
    };
    let node = *resources
        .get(idref)
        .ok_or_else(|| ManifestError::MissingResource(idref.to_string()))?;

    let attributes = attributes(node);
    let kind = attributes.get("type").cloned();
    let href = attributes.get("href").cloned();
    let scorm_type = attributes
        .get("scormtype")
        .or_else(|| attributes.get("scormType"))
        .cloned();
    let (index_file, files) = if kind.as_deref() == Some("webcontent") {
        (href.clone(), content_files(node, resources, &mut Vec::new())?)
    } else {
        (None, Vec::new())
    };

    item.resource = Some(ResourceLink {
        identifier: idref.to_string(),
        kind,
        href,
        scorm_type,
        attributes,
        index_file,
        files,
    });
    Ok(())
}

/// `<file>` paths of a resource (prefixed with `./` and its `xml:base`),
/// followed by the files of every resource it depends on.
fn content_files<'a>(
    resource: Node<'a, '_>,
    resources: &Resources<'a, '_>,
    stack: &mut Vec<&'a str>,
) -> Result<Vec<String>, ManifestError> {
    let id = resource.attribute("identifier").unwrap_or_default();
    if stack.contains(&id) {
        return Err(ManifestError::DependencyCycle(id.to_string()));
    }
    stack.push(id);

    let base = format!("./{}", resource.attribute((XML_NS, "base")).unwrap_or_default());
    let mut files: Vec<String> = elements(resource, "file")
        .filter_map(|f| f.attribute("href"))
        .map(|href| format!("{base}{href}"))
        .collect();

    for dep in elements(resource, "dependency") {
        let Some(dep_id) = dep.attribute("identifierref") else {
            continue;
        };
        let dep_node = *resources
            .get(dep_id)
            .ok_or_else(|| ManifestError::MissingResource(dep_id.to_string()))?;
        files.extend(content_files(dep_node, resources, stack)?);
    }

    stack.pop();
    Ok(files)
}
