use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{Map, Value};

/// LOM metadata converted to JSON, keyed by section
/// (`general`, `rights`, `educational`, `lifecycle`).
pub type Metadata = Map<String, Value>;

/// Everything extracted from an `imsmanifest.xml`.
#[derive(Debug, Clone, Serialize)]
pub struct ImsPackage {
    pub identifier: Option<String>,
    pub metadata: Metadata,
    /// One item tree per `<organization>`.
    pub organizations: Vec<Item>,
}

impl ImsPackage {
    /// All leaf items across every organization, depth-first.
    pub fn leaves(&self) -> Vec<&Item> {
        let mut out = Vec::new();
        for org in &self.organizations {
            org.collect_leaves(&mut out);
        }
        out
    }
}

/// An `<organization>` or `<item>` node.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Item {
    pub identifier: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identifierref: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Remaining attributes, namespace prefixes stripped.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Item>,
    /// The resource a leaf item points at, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource: Option<ResourceLink>,
}

impl Item {
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    pub fn is_webcontent(&self) -> bool {
        self.resource.as_ref().is_some_and(ResourceLink::is_webcontent)
    }

    /// Whether the item launches a SCO (talks to the SCORM runtime).
    pub fn is_sco(&self) -> bool {
        self.resource
            .as_ref()
            .and_then(|r| r.scorm_type.as_deref())
            .is_some_and(|t| t.eq_ignore_ascii_case("sco"))
    }

    pub fn leaves(&self) -> Vec<&Item> {
        let mut out = Vec::new();
        self.collect_leaves(&mut out);
        out
    }

    fn collect_leaves<'a>(&'a self, out: &mut Vec<&'a Item>) {
        if self.is_leaf() {
            out.push(self);
        }
        for child in &self.children {
            child.collect_leaves(out);
        }
    }
}

/// A `<resource>` resolved for a leaf item.
#[derive(Debug, Clone, Serialize)]
pub struct ResourceLink {
    pub identifier: String,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub href: Option<String>,
    /// `adlcp:scormtype` (1.2) or `adlcp:scormType` (2004).
    pub scorm_type: Option<String>,
    /// All resource attributes, namespace prefixes stripped.
    pub attributes: BTreeMap<String, String>,
    /// Launch file for web content (`href`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index_file: Option<String>,
    /// Files the web content needs, including those of its dependencies.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<String>,
}

impl ResourceLink {
    pub fn is_webcontent(&self) -> bool {
        self.kind.as_deref() == Some("webcontent")
    }
}
