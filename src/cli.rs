//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;
use notion_backup::{BackupConfig, Credentials, ExportFormat};

/// Back up a Notion workspace as Markdown and HTML.
///
/// Credentials are read from the environment (or a `.env` file):
/// NOTION_TOKEN, NOTION_SPACE_ID and optionally NOTION_FILE_TOKEN.
#[derive(Parser, Debug)]
#[command(name = "notion-backup")]
#[command(author, version, about)]
pub struct Args {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,

    /// Export formats, comma separated
    #[arg(long, value_delimiter = ',', default_values_t = ExportFormat::ALL)]
    pub formats: Vec<ExportFormat>,

    /// Directory receiving `<format>.zip` and `<format>/`
    #[arg(short, long, default_value = ".")]
    pub output_dir: PathBuf,

    /// Give up on a format after this many seconds (0 or less: no limit)
    #[arg(long, require_equals = true, allow_negative_numbers = true, default_value_t = 0)]
    pub timeout: i64,

    /// Consecutive polls without new pages before an export counts as stuck (0 disables)
    #[arg(long, require_equals = true, default_value_t = 5)]
    pub waitcount: u32,

    /// Missing or failed poll observations tolerated per format
    #[arg(long, default_value_t = 5, value_parser = clap::value_parser!(u32).range(1..))]
    pub failcount: u32,

    /// Export locale
    #[arg(long, default_value = "en")]
    pub locale: String,

    /// Export time zone
    #[arg(long, default_value = "America/New_York")]
    pub time_zone: String,

    /// Resolve wrapper directories and zip-in-zip exports after unpacking
    #[arg(long)]
    pub resolve_nesting: bool,

    /// Fail unless NOTION_FILE_TOKEN is set
    #[arg(long)]
    pub require_file_token: bool,

    /// Base URL of the v3 API
    #[arg(long, default_value = "https://www.notion.so/api/v3")]
    pub api_url: String,
}

impl Args {
    /// Build the backup configuration on top of the given credentials
    pub fn into_config(self, credentials: Credentials) -> BackupConfig {
        let mut config = BackupConfig::new(credentials);
        config.formats = self.formats;
        config.output_dir = self.output_dir;
        config.locale = self.locale;
        config.time_zone = self.time_zone;
        config.api_base_url = self.api_url;
        config.require_file_token = self.require_file_token;
        config.extraction.resolve_nesting = self.resolve_nesting;
        config.poll = config.poll.with_timeout_secs(self.timeout);
        config.poll.stuck_threshold = self.waitcount;
        config.poll.max_fail_count = self.failcount;
        config
    }
}
