use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

use crate::error::WebContentError;

/// Zip the contents of `dir` into `out` so identical input always yields
/// identical bytes: entries sorted by their full `/`-separated name, fixed
/// timestamps and modes.
pub fn create_predictable_zip(dir: &Path, out: &Path) -> Result<(), WebContentError> {
    if let Some(parent) = out.parent() {
        fs::create_dir_all(parent).map_err(WebContentError::io(parent))?;
    }
    let file = File::create(out).map_err(WebContentError::io(out))?;
    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(DateTime::default())
        .unix_permissions(0o644);

    let mut files = Vec::new();
    for entry in WalkDir::new(dir) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Ok(relative) = entry.path().strip_prefix(dir) else {
            continue;
        };
        let name = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        files.push((name, entry.into_path()));
    }
    files.sort();

    for (name, path) in &files {
        let data = fs::read(path).map_err(WebContentError::io(path))?;
        zip.start_file(name.as_str(), options)?;
        zip.write_all(&data).map_err(WebContentError::io(out))?;
    }
    zip.finish()?;
    tracing::debug!(zip = %out.display(), entries = files.len(), "wrote zip");
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Read;

    use zip::ZipArchive;

    use super::*;

    fn populate(dir: &Path) {
        fs::create_dir_all(dir.join("js")).unwrap();
        fs::write(dir.join("index.html"), "<html></html>").unwrap();
        fs::write(dir.join("js/app.js"), "var a = 1;").unwrap();
        fs::write(dir.join("b.css"), "p {}").unwrap();
    }

    #[test]
    fn same_input_same_bytes() {
        let tmp = tempfile::tempdir().unwrap();
        let src = tmp.path().join("src");
        populate(&src);
        create_predictable_zip(&src, &tmp.path().join("a.zip")).unwrap();
        create_predictable_zip(&src, &tmp.path().join("b.zip")).unwrap();
        assert_eq!(
            fs::read(tmp.path().join("a.zip")).unwrap(),
            fs::read(tmp.path().join("b.zip")).unwrap()
        );
    }

    #[test]
    fn entries_sort_by_full_name() {
        let tmp = tempfile::tempdir().unwrap();
        let src = tmp.path().join("src");
        fs::create_dir_all(src.join("a")).unwrap();
        fs::write(src.join("a/x"), "x").unwrap();
        fs::write(src.join("a-b.txt"), "ab").unwrap();
        fs::write(src.join("a.txt"), "a").unwrap();
        let out = tmp.path().join("out.zip");
        create_predictable_zip(&src, &out).unwrap();

        let archive = ZipArchive::new(File::open(&out).unwrap()).unwrap();
        let names: Vec<_> = archive.file_names().collect();
        assert_eq!(names, vec!["a-b.txt", "a.txt", "a/x"]);
    }

    #[test]
    fn entries_are_sorted_and_relative() {
        let tmp = tempfile::tempdir().unwrap();
        let src = tmp.path().join("src");
        populate(&src);
        let out = tmp.path().join("out/pkg.zip");
        create_predictable_zip(&src, &out).unwrap();

        let mut archive = ZipArchive::new(File::open(&out).unwrap()).unwrap();
        let names: Vec<_> = archive.file_names().map(str::to_string).collect();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
        assert_eq!(names.len(), 3);

        let mut body = String::new();
        archive.by_name("js/app.js").unwrap().read_to_string(&mut body).unwrap();
        assert_eq!(body, "var a = 1;");
    }
}
