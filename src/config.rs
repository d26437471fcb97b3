//! Configuration types for notion-backup
//!
//! Everything the core needs is passed in as one immutable [`BackupConfig`]
//! value; nothing inside the library reads the process environment except
//! [`Credentials::from_env`].

use crate::error::{Error, Result};
use crate::types::{ExportFormat, ExportRequest};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Environment variable holding the session token
pub const TOKEN_VAR: &str = "NOTION_TOKEN";
/// Environment variable holding the file-access token
pub const FILE_TOKEN_VAR: &str = "NOTION_FILE_TOKEN";
/// Environment variable holding the workspace (space) id
pub const SPACE_ID_VAR: &str = "NOTION_SPACE_ID";

/// Workspace credentials
#[derive(Clone, Serialize, Deserialize)]
pub struct Credentials {
    /// Session token (`token_v2` cookie)
    pub token: String,

    /// File-access token (`file_token` cookie), needed by some workspaces to download exports
    #[serde(default)]
    pub file_token: Option<String>,

    /// Workspace to export
    pub space_id: String,
}

impl Credentials {
    /// Read credentials from the process environment
    ///
    /// `NOTION_TOKEN` and `NOTION_SPACE_ID` are always required;
    /// `NOTION_FILE_TOKEN` only when `require_file_token` is set.
    pub fn from_env(require_file_token: bool) -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok(), require_file_token)
    }

    /// Read credentials through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F, require_file_token: bool) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let token = read(TOKEN_VAR).ok_or_else(|| missing_var(TOKEN_VAR))?;
        let space_id = read(SPACE_ID_VAR).ok_or_else(|| missing_var(SPACE_ID_VAR))?;
        let file_token = read(FILE_TOKEN_VAR);
        if require_file_token && file_token.is_none() {
            return Err(missing_var(FILE_TOKEN_VAR));
        }

        Ok(Self {
            token,
            file_token,
            space_id,
        })
    }

    /// Value of the `Cookie` header sent with every request
    pub fn cookie_header(&self) -> String {
        match &self.file_token {
            Some(file_token) => format!("token_v2={}; file_token={}", self.token, file_token),
            None => format!("token_v2={}", self.token),
        }
    }
}

// Tokens must never end up in logs.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("token", &"<redacted>")
            .field("file_token", &self.file_token.as_ref().map(|_| "<redacted>"))
            .field("space_id", &self.space_id)
            .finish()
    }
}

fn missing_var(key: &str) -> Error {
    Error::config(
        format!(
            "{key} is not set; NOTION_TOKEN and NOTION_SPACE_ID (and NOTION_FILE_TOKEN \
             when required) must be defined in the environment"
        ),
        key,
    )
}

/// Transient-retry configuration for the status query
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts, including the first one (default: 3)
    #[serde(default = "default_retry_attempts")]
    pub max_attempts: u32,

    /// Delay between attempts (default: 2 seconds)
    #[serde(default = "default_retry_interval", with = "duration_serde")]
    pub interval: Duration,

    /// Multiplier applied to the delay after each attempt (default: 1.0, fixed interval)
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Add random jitter to delays (default: false)
    #[serde(default)]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_retry_attempts(),
            interval: default_retry_interval(),
            backoff_multiplier: default_backoff_multiplier(),
            jitter: false,
        }
    }
}

/// Poll loop limits for one export task
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PollConfig {
    /// Give up once this much time has passed (None = unbounded)
    #[serde(default, with = "option_duration_serde")]
    pub timeout: Option<Duration>,

    /// Soft failures tolerated before giving up (default: 5)
    #[serde(default = "default_limit")]
    pub max_fail_count: u32,

    /// Consecutive in-progress polls without new pages before giving up
    /// (default: 5, 0 disables stuck detection)
    #[serde(default = "default_limit")]
    pub stuck_threshold: u32,

    /// Wait before every status query (default: 10 seconds)
    #[serde(default = "default_poll_interval", with = "duration_serde")]
    pub poll_interval: Duration,

    /// Retry wrapper around each status query
    #[serde(default)]
    pub status_retry: RetryConfig,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            timeout: None,
            max_fail_count: default_limit(),
            stuck_threshold: default_limit(),
            poll_interval: default_poll_interval(),
            status_retry: RetryConfig::default(),
        }
    }
}

impl PollConfig {
    /// Set the timeout from a seconds value where `<= 0` means unbounded
    pub fn with_timeout_secs(mut self, secs: i64) -> Self {
        self.timeout = u64::try_from(secs)
            .ok()
            .filter(|s| *s > 0)
            .map(Duration::from_secs);
        self
    }
}

/// Archive normalization configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Resolve wrapper directories and archive-of-archive nesting after the
    /// top-level unzip (default: false, single unzip plus part flattening)
    #[serde(default)]
    pub resolve_nesting: bool,

    /// Pattern matching multi-part archive names (default: `(?i)Part-\d+\.zip$`)
    #[serde(default = "default_part_pattern")]
    pub part_pattern: String,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            resolve_nesting: false,
            part_pattern: default_part_pattern(),
        }
    }
}

/// Main configuration for a backup run
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BackupConfig {
    /// Workspace credentials
    pub credentials: Credentials,

    /// Base URL of the workspace API (default: "https://www.notion.so/api/v3")
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Directory receiving `F.zip` and `F/` per format (default: ".")
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Formats to export, processed sequentially (default: markdown, html)
    #[serde(default = "default_formats")]
    pub formats: Vec<ExportFormat>,

    /// Locale for rendered content (default: "en")
    #[serde(default = "default_locale")]
    pub locale: String,

    /// Time zone for rendered dates (default: "America/New_York")
    #[serde(default = "default_time_zone")]
    pub time_zone: String,

    /// Poll loop limits
    #[serde(default)]
    pub poll: PollConfig,

    /// Archive normalization
    #[serde(default)]
    pub extraction: ExtractionConfig,

    /// Whether the file-access token is mandatory (default: false)
    #[serde(default)]
    pub require_file_token: bool,
}

impl BackupConfig {
    /// Configuration with default settings for the given credentials
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            api_base_url: default_api_base_url(),
            output_dir: default_output_dir(),
            formats: default_formats(),
            locale: default_locale(),
            time_zone: default_time_zone(),
            poll: PollConfig::default(),
            extraction: ExtractionConfig::default(),
            require_file_token: false,
        }
    }

    /// Check the settings that would otherwise fail half way through a run
    pub fn validate(&self) -> Result<()> {
        if self.formats.is_empty() {
            return Err(Error::config("at least one export format is required", "formats"));
        }
        if self.poll.max_fail_count == 0 {
            return Err(Error::config(
                "max_fail_count must be at least 1",
                "max_fail_count",
            ));
        }
        if self.poll.status_retry.max_attempts == 0 {
            return Err(Error::config(
                "status retry needs at least one attempt",
                "status_retry.max_attempts",
            ));
        }
        if self.require_file_token && self.credentials.file_token.is_none() {
            return Err(missing_var(FILE_TOKEN_VAR));
        }
        url::Url::parse(&self.api_base_url).map_err(|e| {
            Error::config(
                format!("invalid API base URL '{}': {e}", self.api_base_url),
                "api_base_url",
            )
        })?;
        regex::Regex::new(&self.extraction.part_pattern).map_err(|e| {
            Error::config(format!("invalid part pattern: {e}"), "part_pattern")
        })?;
        Ok(())
    }

    /// Export request for one format
    pub fn export_request(&self, format: ExportFormat) -> ExportRequest {
        ExportRequest {
            format,
            workspace_id: self.credentials.space_id.clone(),
            locale: self.locale.clone(),
            time_zone: self.time_zone.clone(),
        }
    }

    /// Downloaded archive path for a format (`<output>/F.zip`)
    pub fn archive_path(&self, format: ExportFormat) -> PathBuf {
        self.output_dir.join(format!("{}.zip", format.as_str()))
    }

    /// Target directory for a format (`<output>/F/`)
    pub fn format_dir(&self, format: ExportFormat) -> PathBuf {
        self.output_dir.join(format.as_str())
    }
}

// Default value functions
fn default_retry_attempts() -> u32 {
    3
}

fn default_retry_interval() -> Duration {
    Duration::from_secs(2)
}

fn default_backoff_multiplier() -> f64 {
    1.0
}

fn default_limit() -> u32 {
    5
}

fn default_poll_interval() -> Duration {
    Duration::from_secs(10)
}

fn default_part_pattern() -> String {
    r"(?i)Part-\d+\.zip$".to_string()
}

fn default_api_base_url() -> String {
    "https://www.notion.so/api/v3".to_string()
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_formats() -> Vec<ExportFormat> {
    ExportFormat::ALL.to_vec()
}

fn default_locale() -> String {
    "en".to_string()
}

fn default_time_zone() -> String {
    "America/New_York".to_string()
}

/// Serialize durations as whole seconds
pub(crate) mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

/// Serialize optional durations as whole seconds (null = unbounded)
pub(crate) mod option_duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match duration {
            Some(d) => serializer.serialize_some(&d.as_secs()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = Option::<i64>::deserialize(deserializer)?;
        Ok(secs
            .and_then(|s| u64::try_from(s).ok())
            .filter(|s| *s > 0)
            .map(Duration::from_secs))
    }
}
