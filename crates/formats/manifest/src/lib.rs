//! Reader for IMS Content Packages.
//!
//! ```no_run
//! let pkg = imscp_manifest::extract_from_dir(std::path::Path::new("course/"))?;
//! for leaf in pkg.leaves() {
//!     println!("{:?} -> {:?}", leaf.title, leaf.resource.as_ref().map(|r| &r.href));
//! }
//! # Ok::<(), imscp_manifest::ManifestError>(())
//! ```

mod decode;
pub mod error;
pub mod extract;
pub mod metadata;
pub mod package;

pub use error::ManifestError;
pub use extract::{extract_from_dir, extract_from_zip, parse_manifest, unpack_zip, MANIFEST_FILE};
pub use package::{ImsPackage, Item, Metadata, ResourceLink};
