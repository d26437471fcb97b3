//! Archive extraction and layout normalization
//!
//! The export service packages the same content in several ways: a plain
//! zip, a zip holding one wrapper directory, a zip holding another zip, or a
//! set of sibling `Part-N.zip` archives. This module unpacks them and
//! resolves each shape into one predictable directory.

mod layout;
mod zip;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

// Re-exports
pub use layout::{ArchiveExtractor, DirectorySnapshot};
pub use zip::{ZipExtractor, is_zip};
