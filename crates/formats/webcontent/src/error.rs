use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WebContentError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write zip: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("failed to walk {0}")]
    Walk(#[from] walkdir::Error),

    #[error("{0} has no <head> element to add scripts to")]
    MissingHead(PathBuf),

    #[error("manifest path {0:?} points outside the package")]
    UnsafePath(String),

    #[error("item {0:?} does not launch web content")]
    NotWebContent(String),
}

impl WebContentError {
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| Self::Io { path, source }
    }
}
