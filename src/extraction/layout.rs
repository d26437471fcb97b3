use crate::config::ExtractionConfig;
use crate::error::{Error, ExtractionError, Result};
use regex::Regex;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use tokio::task::spawn_blocking;
use tracing::{debug, info};

use super::zip::{ZipExtractor, is_zip};

/// Immediate contents of one extracted directory
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DirectorySnapshot {
    /// Directory that was scanned
    pub path: PathBuf,
    /// Immediate subdirectories
    pub subdirectories: Vec<PathBuf>,
    /// Immediate `.zip` files
    pub archives: Vec<PathBuf>,
    /// Archives whose name matches the multi-part pattern (subset of `archives`)
    pub part_files: Vec<PathBuf>,
    /// Every other regular file
    pub other_files: Vec<PathBuf>,
}

impl DirectorySnapshot {
    /// Classify the immediate children of `dir`
    pub fn scan(dir: &Path, part_pattern: &Regex) -> Result<Self> {
        let mut snapshot = DirectorySnapshot {
            path: dir.to_path_buf(),
            ..Default::default()
        };

        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if path.is_dir() {
                snapshot.subdirectories.push(path);
            } else if is_zip(&path) {
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                if part_pattern.is_match(&name) {
                    snapshot.part_files.push(path.clone());
                }
                snapshot.archives.push(path);
            } else {
                snapshot.other_files.push(path);
            }
        }

        snapshot.subdirectories.sort();
        snapshot.archives.sort();
        snapshot.part_files.sort();
        snapshot.other_files.sort();
        Ok(snapshot)
    }

    /// Number of immediate subdirectories
    pub fn subdirectory_count(&self) -> usize {
        self.subdirectories.len()
    }

    /// Number of immediate archive files
    pub fn zip_file_count(&self) -> usize {
        self.archives.len()
    }

    /// Names of the multi-part archive files
    pub fn part_file_names(&self) -> Vec<String> {
        self.part_files
            .iter()
            .filter_map(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .collect()
    }
}

/// What the normalizer does with a directory
#[derive(Clone, Debug, PartialEq, Eq)]
enum Shape {
    /// No archives and not exactly one subdirectory
    Canonical,
    /// No archives and exactly one subdirectory, which is the result
    Wrapper(PathBuf),
    /// A lone archive and no subdirectories
    NestedArchive(PathBuf),
    /// Anything else
    Ambiguous,
}

impl DirectorySnapshot {
    fn shape(&self) -> Shape {
        match (self.archives.as_slice(), self.subdirectories.as_slice()) {
            ([], [only]) => Shape::Wrapper(only.clone()),
            ([], _) => Shape::Canonical,
            ([only], []) => Shape::NestedArchive(only.clone()),
            _ => Shape::Ambiguous,
        }
    }
}

/// Unpacks export archives and resolves the service's packaging variants
///
/// Handles a single zip, a zip wrapping one directory, a zip wrapping a
/// single zip, and sibling `Part-N.zip` archives.
#[derive(Clone, Debug)]
pub struct ArchiveExtractor {
    part_pattern: Regex,
}

impl ArchiveExtractor {
    /// Build an extractor from configuration
    pub fn new(config: &ExtractionConfig) -> Result<Self> {
        let part_pattern = Regex::new(&config.part_pattern).map_err(|e| {
            Error::config(format!("invalid part pattern: {e}"), "part_pattern")
        })?;
        Ok(Self { part_pattern })
    }

    /// Unzip `zip_path` into `target_dir` without looking at the result
    pub async fn unzip(&self, zip_path: &Path, target_dir: &Path) -> Result<Vec<PathBuf>> {
        let archive = zip_path.to_path_buf();
        let dest = target_dir.to_path_buf();
        spawn_blocking(move || ZipExtractor::unzip(&archive, &dest))
            .await
            .map_err(|e| {
                Error::Extraction(ExtractionError::ExtractionFailed {
                    archive: zip_path.to_path_buf(),
                    reason: format!("extraction task panicked: {e}"),
                })
            })?
    }

    /// Unzip `zip_path` into `target_dir`, delete the archive and normalize
    ///
    /// Returns the canonical directory.
    ///
    /// # Errors
    ///
    /// [`ExtractionError::UnexpectedStructure`] when a directory holds any
    /// mix of subdirectories and archives other than the two known shapes.
    pub async fn extract(&self, zip_path: &Path, target_dir: &Path) -> Result<PathBuf> {
        self.unzip(zip_path, target_dir).await?;
        tokio::fs::remove_file(zip_path).await?;
        self.normalize(target_dir).await
    }

    /// Resolve a wrapper directory or a nested archive below `dir`
    ///
    /// A lone subdirectory (and no archive) is returned as it is, one level
    /// down and without looking inside: it may still hold `Part-N.zip`
    /// files for [`flatten_parts`](Self::flatten_parts). A lone archive is
    /// extracted beside itself and resolved again; recursion only happens by
    /// consuming an archive, so it terminates. A directory without archives
    /// and without a lone subdirectory is returned unchanged.
    pub fn normalize<'a>(
        &'a self,
        dir: &'a Path,
    ) -> Pin<Box<dyn Future<Output = Result<PathBuf>> + Send + 'a>> {
        Box::pin(async move {
            let snapshot = DirectorySnapshot::scan(dir, &self.part_pattern)?;
            debug!(
                ?dir,
                subdirectories = snapshot.subdirectory_count(),
                archives = snapshot.zip_file_count(),
                "inspecting extracted directory"
            );

            match snapshot.shape() {
                Shape::Canonical => Ok(dir.to_path_buf()),
                Shape::Wrapper(inner) => {
                    debug!(?inner, "unwrapping single subdirectory");
                    Ok(inner)
                }
                Shape::NestedArchive(archive) => {
                    let nested_dir = nested_target(&archive);
                    info!(?archive, ?nested_dir, "extracting nested archive");
                    self.extract(&archive, &nested_dir).await
                }
                Shape::Ambiguous => Err(Error::Extraction(ExtractionError::UnexpectedStructure {
                    dir: dir.to_path_buf(),
                    subdirectories: snapshot.subdirectory_count(),
                    archives: snapshot.zip_file_count(),
                })),
            }
        })
    }

    /// Extract every multi-part archive directly inside `dir` into `dir`
    ///
    /// Single pass over the current contents: archives produced by the
    /// extraction are left alone. Each part is deleted once unpacked.
    /// Returns the number of parts flattened.
    pub async fn flatten_parts(&self, dir: &Path) -> Result<usize> {
        let snapshot = DirectorySnapshot::scan(dir, &self.part_pattern)?;
        if snapshot.part_files.is_empty() {
            return Ok(0);
        }

        info!(
            ?dir,
            parts = ?snapshot.part_file_names(),
            "flattening multi-part export"
        );
        for part in &snapshot.part_files {
            self.unzip(part, dir).await?;
            tokio::fs::remove_file(part).await?;
        }

        Ok(snapshot.part_files.len())
    }
}

/// Directory a nested archive is extracted into: its path without the extension
fn nested_target(archive: &Path) -> PathBuf {
    let stem = archive
        .file_stem()
        .map(|s| s.to_os_string())
        .unwrap_or_else(|| "archive".into());
    archive.with_file_name(stem)
}
