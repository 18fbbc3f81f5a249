//! HTML5 zip packaging for web content found in IMS Content Packages.
//!
//! SCOs are made runnable outside an LMS by bundling a SCORM 1.2 runtime and
//! a script that keeps their CMI data in `localStorage`.

pub mod archive;
pub mod error;
pub mod html_util;
pub mod inject;
pub mod package;

pub use archive::create_predictable_zip;
pub use error::WebContentError;
pub use inject::{add_scorm_support, inject_scripts, Placement, ScormAssets};
pub use package::{
    package_webcontent, plan_entrypoints, strip_query_fragment, write_entrypoint, Entrypoint,
    PackagedItem,
};
