use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read archive {path}: {source}")]
    Zip {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("no imsmanifest.xml in {0}")]
    MissingManifest(PathBuf),

    #[error("imsmanifest.xml is not well-formed XML: {0}")]
    Xml(#[from] roxmltree::Error),

    #[error("manifest has no <resources> element")]
    MissingResources,

    #[error("title element of {item:?} has no text")]
    EmptyTitle { item: String },

    #[error("item references unknown resource {0:?}")]
    MissingResource(String),

    #[error("resource dependencies form a cycle through {0:?}")]
    DependencyCycle(String),
}
