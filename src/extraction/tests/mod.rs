use crate::config::ExtractionConfig;
use crate::error::{Error, ExtractionError};
use crate::extraction::*;
use crate::test_helpers::{write_zip, zip_bytes};
use regex::Regex;
use std::path::Path;
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn extractor() -> ArchiveExtractor {
    ArchiveExtractor::new(&ExtractionConfig::default()).unwrap()
}

fn part_pattern() -> Regex {
    Regex::new(&ExtractionConfig::default().part_pattern).unwrap()
}

/// Sorted names of the immediate children of `dir`
fn names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

fn remaining_zip_files(dir: &Path) -> usize {
    walkdir::WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file() && is_zip(e.path()))
        .count()
}

// ---------------------------------------------------------------------------
// ZipExtractor
// ---------------------------------------------------------------------------

#[test]
fn unzip_creates_nested_paths() {
    let temp_dir = TempDir::new().unwrap();
    let archive = temp_dir.path().join("export.zip");
    write_zip(
        &archive,
        &[
            ("Workspace/", b""),
            ("Workspace/Page.md", b"# Page"),
            ("Workspace/Sub/Child.md", b"child"),
        ],
    );
    let dest = temp_dir.path().join("out");

    let files = ZipExtractor::unzip(&archive, &dest).unwrap();

    assert_eq!(files.len(), 2);
    assert_eq!(
        std::fs::read_to_string(dest.join("Workspace/Sub/Child.md")).unwrap(),
        "child"
    );
    assert!(archive.exists(), "unzip alone keeps the archive");
}

#[test]
fn unzip_rejects_corrupt_archive() {
    let temp_dir = TempDir::new().unwrap();
    let archive = temp_dir.path().join("broken.zip");
    std::fs::write(&archive, b"this is not a zip file").unwrap();

    let err = ZipExtractor::unzip(&archive, &temp_dir.path().join("out")).unwrap_err();

    match err {
        Error::Extraction(ExtractionError::ExtractionFailed { archive: path, .. }) => {
            assert_eq!(path, archive)
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn unzip_skips_entries_escaping_destination() {
    let temp_dir = TempDir::new().unwrap();
    let archive = temp_dir.path().join("evil.zip");
    write_zip(&archive, &[("../escape.txt", b"nope"), ("ok.txt", b"fine")]);
    let dest = temp_dir.path().join("out");

    let files = ZipExtractor::unzip(&archive, &dest).unwrap();

    assert_eq!(files, vec![dest.join("ok.txt")]);
    assert!(!temp_dir.path().join("escape.txt").exists());
}

#[test]
fn detect_zip_files_ignores_directories_and_other_files() {
    let temp_dir = TempDir::new().unwrap();
    std::fs::write(temp_dir.path().join("a.ZIP"), b"").unwrap();
    std::fs::write(temp_dir.path().join("b.zip"), b"").unwrap();
    std::fs::write(temp_dir.path().join("notes.txt"), b"").unwrap();
    std::fs::create_dir(temp_dir.path().join("dir.zip")).unwrap();

    let found = ZipExtractor::detect_zip_files(temp_dir.path()).unwrap();

    assert_eq!(
        found,
        vec![temp_dir.path().join("a.ZIP"), temp_dir.path().join("b.zip")]
    );
}

// ---------------------------------------------------------------------------
// DirectorySnapshot
// ---------------------------------------------------------------------------

#[test]
fn snapshot_classifies_children() {
    let temp_dir = TempDir::new().unwrap();
    let dir = temp_dir.path();
    std::fs::create_dir(dir.join("Workspace")).unwrap();
    std::fs::write(dir.join("Export-abc-Part-1.zip"), b"").unwrap();
    std::fs::write(dir.join("Export-abc-part-2.zip"), b"").unwrap();
    std::fs::write(dir.join("other.zip"), b"").unwrap();
    std::fs::write(dir.join("index.html"), b"").unwrap();

    let snapshot = DirectorySnapshot::scan(dir, &part_pattern()).unwrap();

    assert_eq!(snapshot.subdirectory_count(), 1);
    assert_eq!(snapshot.zip_file_count(), 3);
    assert_eq!(
        snapshot.part_file_names(),
        vec!["Export-abc-Part-1.zip", "Export-abc-part-2.zip"]
    );
    assert_eq!(snapshot.other_files, vec![dir.join("index.html")]);
}

// ---------------------------------------------------------------------------
// ArchiveExtractor::extract / normalize
// ---------------------------------------------------------------------------

#[tokio::test]
async fn extract_plain_archive_returns_target_dir() {
    let temp_dir = TempDir::new().unwrap();
    let archive = temp_dir.path().join("markdown.zip");
    write_zip(&archive, &[("Page.md", b"a"), ("Other.md", b"b")]);
    let target = temp_dir.path().join("markdown");

    let canonical = extractor().extract(&archive, &target).await.unwrap();

    assert_eq!(canonical, target);
    assert_eq!(names(&target), vec!["Other.md", "Page.md"]);
    assert!(!archive.exists(), "consumed archive is deleted");
}

#[tokio::test]
async fn extract_unwraps_single_directory() {
    let temp_dir = TempDir::new().unwrap();
    let archive = temp_dir.path().join("html.zip");
    write_zip(
        &archive,
        &[("Export-1234/", b""), ("Export-1234/index.html", b"<html>")],
    );
    let target = temp_dir.path().join("html");

    let canonical = extractor().extract(&archive, &target).await.unwrap();

    assert_eq!(canonical, target.join("Export-1234"));
    assert!(canonical.join("index.html").exists());
}

#[tokio::test]
async fn extract_returns_single_subdirectory_next_to_files() {
    let temp_dir = TempDir::new().unwrap();
    let archive = temp_dir.path().join("html.zip");
    write_zip(
        &archive,
        &[("index.html", b"<html>"), ("assets/", b""), ("assets/app.css", b"")],
    );
    let target = temp_dir.path().join("html");

    let canonical = extractor().extract(&archive, &target).await.unwrap();

    assert_eq!(canonical, target.join("assets"));
    assert!(target.join("index.html").exists());
}

#[tokio::test]
async fn extract_unwraps_only_one_directory_level() {
    let temp_dir = TempDir::new().unwrap();
    let archive = temp_dir.path().join("markdown.zip");
    write_zip(&archive, &[("Outer/Inner/a.md", b"a")]);
    let target = temp_dir.path().join("markdown");

    let canonical = extractor().extract(&archive, &target).await.unwrap();

    assert_eq!(canonical, target.join("Outer"));
    assert!(canonical.join("Inner").join("a.md").exists());
}

#[tokio::test]
async fn extract_returns_wrapper_holding_part_archives() {
    let temp_dir = TempDir::new().unwrap();
    let part1 = zip_bytes(&[("A.md", b"a")]);
    let part2 = zip_bytes(&[("B.md", b"b")]);
    let archive = temp_dir.path().join("markdown.zip");
    write_zip(
        &archive,
        &[
            ("Wrapper/", b""),
            ("Wrapper/Export-abc-Part-1.zip", &part1),
            ("Wrapper/Export-abc-Part-2.zip", &part2),
        ],
    );
    let target = temp_dir.path().join("markdown");
    let extractor = extractor();

    let canonical = extractor.extract(&archive, &target).await.unwrap();
    assert_eq!(canonical, target.join("Wrapper"));

    let flattened = extractor.flatten_parts(&canonical).await.unwrap();
    assert_eq!(flattened, 2);
    assert_eq!(names(&canonical), vec!["A.md", "B.md"]);
}

#[tokio::test]
async fn extract_resolves_archive_of_archives() {
    let temp_dir = TempDir::new().unwrap();
    let inner = zip_bytes(&[("Workspace/", b""), ("Workspace/Page.md", b"# hi")]);
    let archive = temp_dir.path().join("markdown.zip");
    write_zip(&archive, &[("Export-5678.zip", &inner)]);
    let target = temp_dir.path().join("markdown");

    let canonical = extractor().extract(&archive, &target).await.unwrap();

    assert_eq!(canonical, target.join("Export-5678").join("Workspace"));
    assert_eq!(
        std::fs::read_to_string(canonical.join("Page.md")).unwrap(),
        "# hi"
    );
    assert_eq!(remaining_zip_files(temp_dir.path()), 0);
}

#[tokio::test]
async fn extract_rejects_ambiguous_layout() {
    let temp_dir = TempDir::new().unwrap();
    let inner = zip_bytes(&[("a.md", b"a")]);
    let archive = temp_dir.path().join("markdown.zip");
    write_zip(
        &archive,
        &[("one.zip", &inner), ("two.zip", &inner), ("dir/", b"")],
    );
    let target = temp_dir.path().join("markdown");

    let err = extractor().extract(&archive, &target).await.unwrap_err();

    match err {
        Error::Extraction(ExtractionError::UnexpectedStructure {
            dir,
            subdirectories,
            archives,
        }) => {
            assert_eq!(dir, target);
            assert_eq!(subdirectories, 1);
            assert_eq!(archives, 2);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn extract_rejects_archive_next_to_directory() {
    let temp_dir = TempDir::new().unwrap();
    let inner = zip_bytes(&[("a.md", b"a")]);
    let archive = temp_dir.path().join("markdown.zip");
    write_zip(&archive, &[("nested.zip", &inner), ("dir/", b"")]);

    let err = extractor()
        .extract(&archive, &temp_dir.path().join("markdown"))
        .await
        .unwrap_err();

    assert_eq!(err.code(), "unexpected_archive_structure");
}

#[tokio::test]
async fn normalize_is_idempotent_on_content_directory() {
    let temp_dir = TempDir::new().unwrap();
    let dir = temp_dir.path();
    std::fs::write(dir.join("index.html"), b"").unwrap();
    std::fs::create_dir(dir.join("Page A")).unwrap();
    std::fs::create_dir(dir.join("Page B")).unwrap();
    let extractor = extractor();

    let canonical = extractor.normalize(dir).await.unwrap();
    assert_eq!(canonical, dir);

    let again = extractor.normalize(&canonical).await.unwrap();
    assert_eq!(again, canonical);
    assert_eq!(names(dir), vec!["Page A", "Page B", "index.html"]);
}

#[tokio::test]
async fn normalize_empty_directory_is_canonical() {
    let temp_dir = TempDir::new().unwrap();
    let canonical = extractor().normalize(temp_dir.path()).await.unwrap();
    assert_eq!(canonical, temp_dir.path());
}

// ---------------------------------------------------------------------------
// ArchiveExtractor::flatten_parts
// ---------------------------------------------------------------------------

#[tokio::test]
async fn flatten_parts_inlines_every_part() {
    let temp_dir = TempDir::new().unwrap();
    let dir = temp_dir.path();
    write_zip(
        &dir.join("Part-1.zip"),
        &[("Workspace/", b""), ("Workspace/A.md", b"a")],
    );
    write_zip(
        &dir.join("Part-2.zip"),
        &[("Workspace/", b""), ("Workspace/B.md", b"b")],
    );

    let flattened = extractor().flatten_parts(dir).await.unwrap();

    assert_eq!(flattened, 2);
    assert_eq!(names(dir), vec!["Workspace"]);
    assert_eq!(names(&dir.join("Workspace")), vec!["A.md", "B.md"]);
    assert_eq!(remaining_zip_files(dir), 0);
}

#[tokio::test]
async fn flatten_parts_matches_long_service_names_case_insensitively() {
    let temp_dir = TempDir::new().unwrap();
    let dir = temp_dir.path();
    write_zip(
        &dir.join("Export-0f1e-Part-1.zip"),
        &[("one.md", b"1")],
    );
    write_zip(&dir.join("export-0f1e-part-12.ZIP"), &[("two.md", b"2")]);

    let flattened = extractor().flatten_parts(dir).await.unwrap();

    assert_eq!(flattened, 2);
    assert_eq!(names(dir), vec!["one.md", "two.md"]);
}

#[tokio::test]
async fn flatten_parts_leaves_other_archives_alone() {
    let temp_dir = TempDir::new().unwrap();
    let dir = temp_dir.path();
    write_zip(&dir.join("attachment.zip"), &[("x.bin", b"x")]);
    std::fs::write(dir.join("Page.md"), b"page").unwrap();

    let flattened = extractor().flatten_parts(dir).await.unwrap();

    assert_eq!(flattened, 0);
    assert_eq!(names(dir), vec!["Page.md", "attachment.zip"]);
}

#[tokio::test]
async fn flatten_parts_does_not_recurse_into_extracted_parts() {
    let temp_dir = TempDir::new().unwrap();
    let dir = temp_dir.path();
    let nested_part = zip_bytes(&[("deep.md", b"d")]);
    write_zip(&dir.join("Part-1.zip"), &[("Part-9.zip", &nested_part)]);

    let flattened = extractor().flatten_parts(dir).await.unwrap();

    assert_eq!(flattened, 1);
    assert_eq!(names(dir), vec!["Part-9.zip"]);
}

#[tokio::test]
async fn flatten_parts_propagates_corrupt_part() {
    let temp_dir = TempDir::new().unwrap();
    std::fs::write(temp_dir.path().join("Part-1.zip"), b"garbage").unwrap();

    let err = extractor().flatten_parts(temp_dir.path()).await.unwrap_err();

    assert_eq!(err.code(), "extraction_failed");
}

#[test]
fn invalid_part_pattern_is_a_config_error() {
    let config = ExtractionConfig {
        part_pattern: "(".into(),
        ..Default::default()
    };
    assert!(matches!(
        ArchiveExtractor::new(&config),
        Err(Error::Config { .. })
    ));
}
