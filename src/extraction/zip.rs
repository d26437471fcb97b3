use crate::error::{Error, ExtractionError, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Archive extractor for ZIP files
pub struct ZipExtractor;

impl ZipExtractor {
    /// Detect ZIP archive files directly inside a directory
    pub fn detect_zip_files(dir: &Path) -> Result<Vec<PathBuf>> {
        debug!(?dir, "detecting ZIP archives");

        let mut archives = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if path.is_file() && is_zip(&path) {
                archives.push(path);
            }
        }
        archives.sort();

        debug!("found {} ZIP archive(s)", archives.len());
        Ok(archives)
    }

    /// Extract a single ZIP entry to disk, creating directories as needed
    fn extract_zip_entry(
        mut file: zip::read::ZipFile,
        dest_path: &Path,
    ) -> Result<Option<PathBuf>> {
        let file_path = match file.enclosed_name() {
            Some(path) => dest_path.join(path),
            None => {
                warn!(name = file.name(), "skipping entry with unsafe path");
                return Ok(None);
            }
        };

        if file.is_dir() {
            std::fs::create_dir_all(&file_path)?;
            return Ok(None);
        }

        if let Some(parent) = file_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut outfile = std::fs::File::create(&file_path)?;
        std::io::copy(&mut file, &mut outfile)?;

        Ok(Some(file_path))
    }

    /// Unpack every entry of `archive_path` into `dest_path`
    ///
    /// The destination is created if needed; existing files are overwritten.
    /// Returns the extracted files (directories are not listed).
    pub fn unzip(archive_path: &Path, dest_path: &Path) -> Result<Vec<PathBuf>> {
        debug!(?archive_path, ?dest_path, "attempting ZIP extraction");

        std::fs::create_dir_all(dest_path)?;

        let file = std::fs::File::open(archive_path)?;
        let mut archive = zip::ZipArchive::new(file).map_err(|e| failed(archive_path, e))?;

        let mut extracted_files = Vec::new();
        for i in 0..archive.len() {
            let file = archive.by_index(i).map_err(|e| failed(archive_path, e))?;
            if let Some(file_path) = Self::extract_zip_entry(file, dest_path)? {
                extracted_files.push(file_path);
            }
        }

        info!(
            ?archive_path,
            ?dest_path,
            extracted_count = extracted_files.len(),
            "Extracted {} to {}",
            archive_path.display(),
            dest_path.display()
        );

        Ok(extracted_files)
    }
}

fn failed(archive: &Path, e: zip::result::ZipError) -> Error {
    Error::Extraction(ExtractionError::ExtractionFailed {
        archive: archive.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Whether a path has a `.zip` extension (case-insensitive)
pub fn is_zip(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().eq_ignore_ascii_case("zip"))
        .unwrap_or(false)
}
