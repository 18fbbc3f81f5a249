use std::fs::File;
use std::io::Write;
use std::path::Path;

use imscp_manifest::{extract_from_dir, extract_from_zip, ManifestError};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

const MANIFEST: &str = r#"<?xml version="1.0"?>
<manifest identifier="PKG" xmlns="http://www.imsglobal.org/xsd/imscp_v1p1">
  <organizations>
    <organization identifier="ORG">
      <title>Course</title>
      <item identifier="I1" identifierref="R1"><title>Lesson</title></item>
    </organization>
  </organizations>
  <resources>
    <resource identifier="R1" type="webcontent" href="lesson/index.html">
      <file href="lesson/index.html"/>
    </resource>
  </resources>
</manifest>"#;

fn write_zip(path: &Path, entries: &[(&str, &str)]) {
    let mut zip = ZipWriter::new(File::create(path).unwrap());
    for (name, body) in entries {
        zip.start_file(*name, SimpleFileOptions::default()).unwrap();
        zip.write_all(body.as_bytes()).unwrap();
    }
    zip.finish().unwrap();
}

#[test]
fn zip_is_unpacked_and_parsed() {
    let dir = tempfile::tempdir().unwrap();
    let zip_path = dir.path().join("course.zip");
    write_zip(
        &zip_path,
        &[
            ("imsmanifest.xml", MANIFEST),
            ("lesson/index.html", "<html><head></head><body>hi</body></html>"),
        ],
    );

    let dest = dir.path().join("out");
    let pkg = extract_from_zip(&zip_path, &dest).unwrap();
    assert_eq!(pkg.identifier.as_deref(), Some("PKG"));
    assert!(dest.join("lesson/index.html").is_file());

    let leaf = pkg.leaves()[0];
    let res = leaf.resource.as_ref().unwrap();
    assert_eq!(res.files, vec!["./lesson/index.html"]);
}

#[test]
fn directory_without_manifest() {
    let dir = tempfile::tempdir().unwrap();
    let err = extract_from_dir(dir.path()).unwrap_err();
    assert!(matches!(err, ManifestError::MissingManifest(_)));
}

#[test]
fn not_a_zip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.zip");
    std::fs::write(&path, b"definitely not a zip").unwrap();
    let err = extract_from_zip(&path, &dir.path().join("out")).unwrap_err();
    assert!(matches!(err, ManifestError::Zip { .. }));
}
