//! Backup pipeline
//!
//! [`FormatBackupRunner`] exports, downloads and unpacks one format;
//! [`BackupOrchestrator`] runs it for every configured format, one after the
//! other, and decides whether the run as a whole failed.

mod orchestrator;
mod runner;


pub use orchestrator::BackupOrchestrator;
pub use runner::FormatBackupRunner;
