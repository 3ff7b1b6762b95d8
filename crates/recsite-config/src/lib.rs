//! Configuration management for the recordings site publisher.
//!
//! Parses `recsite.toml` configuration files with serde and provides
//! auto-discovery of config files in parent directories.
//!
//! CLI settings can be applied during load via [`CliSettings`].
//!
//! ## Environment Variable Expansion
//!
//! String configuration values support environment variable expansion:
//!
//! - `${VAR}` - expands to the value of VAR, errors if unset
//! - `${VAR:-default}` - expands to VAR if set, otherwise uses default
//!
//! Expanded fields:
//! - `aws.region`, `aws.endpoint`
//! - `catalog.table`
//! - `site.bucket`, `site.key_prefix`
//! - `queue.url`, `queue.arn`
//! - `cdn.distribution_id`
//!
//! ## Sections
//!
//! Every command needs a different subset of collaborators, so the
//! `[catalog]`, `[site]`, `[queue]`, and `[cdn]` sections are optional at
//! load time and checked by the `require_*` accessors.

mod expand;

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// CLI settings that override configuration file values.
///
/// All fields are optional. Only non-None values override the loaded config.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override AWS region.
    pub region: Option<String>,
    /// Override AWS endpoint URL.
    pub endpoint: Option<String>,
}

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "recsite.toml";

/// Longest visibility timeout SQS accepts (12 hours).
const MAX_VISIBILITY_TIMEOUT: u32 = 43_200;

/// Application configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// AWS client configuration.
    pub aws: AwsConfig,
    /// Meeting table configuration.
    pub catalog: Option<CatalogConfig>,
    /// Website bucket configuration.
    pub site: Option<SiteConfig>,
    /// Notification queue configuration.
    pub queue: Option<QueueConfig>,
    /// Edge cache configuration.
    pub cdn: Option<CdnConfig>,

    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

/// AWS client configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct AwsConfig {
    /// AWS region.
    pub region: String,
    /// S3/SQS/`DynamoDB`-compatible endpoint (`LocalStack`, `MinIO`).
    pub endpoint: Option<String>,
}

impl Default for AwsConfig {
    fn default() -> Self {
        Self {
            region: "us-east-1".to_owned(),
            endpoint: None,
        }
    }
}

/// Meeting table configuration.
#[derive(Debug, Deserialize)]
pub struct CatalogConfig {
    /// Table name or table ARN.
    pub table: String,
    /// Secondary index keyed by `meeting_topic`.
    #[serde(default = "default_topic_index")]
    pub topic_index: String,
    /// Secondary index keyed by `organization`.
    #[serde(default = "default_organization_index")]
    pub organization_index: String,
    /// Records evaluated per scan page during a full rebuild.
    #[serde(default = "default_scan_page_size")]
    pub scan_page_size: usize,
}

impl CatalogConfig {
    /// Table name, extracted from the ARN when one is configured.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if `table` looks like an ARN but is malformed.
    pub fn table_name(&self) -> Result<String, ConfigError> {
        if self.table.starts_with("arn:") {
            return Ok(Arn::parse(&self.table, "catalog.table")?.resource_name().to_owned());
        }
        Ok(self.table.clone())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        require_non_empty(&self.table, "catalog.table")?;
        self.table_name()?;
        require_non_empty(&self.topic_index, "catalog.topic_index")?;
        require_non_empty(&self.organization_index, "catalog.organization_index")?;
        if self.scan_page_size == 0 {
            return Err(ConfigError::Validation(
                "catalog.scan_page_size must be greater than 0".to_owned(),
            ));
        }
        Ok(())
    }
}

fn default_topic_index() -> String {
    "meeting-index".to_owned()
}

fn default_organization_index() -> String {
    "organization-index".to_owned()
}

fn default_scan_page_size() -> usize {
    100
}

/// Website bucket configuration.
#[derive(Debug, Deserialize)]
pub struct SiteConfig {
    /// S3 bucket serving the site.
    pub bucket: String,
    /// Optional prefix path within the bucket.
    #[serde(default)]
    pub key_prefix: Option<String>,
    /// Bucket prefix holding template overrides.
    #[serde(default = "default_templates_prefix")]
    pub templates_prefix: String,
    /// Local directory holding template overrides (relative to the config file).
    #[serde(default)]
    pub template_dir: Option<PathBuf>,
}

impl SiteConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        require_non_empty(&self.bucket, "site.bucket")
    }
}

fn default_templates_prefix() -> String {
    "templates".to_owned()
}

/// Notification queue configuration.
#[derive(Debug, Deserialize)]
pub struct QueueConfig {
    /// Queue URL.
    #[serde(default)]
    pub url: Option<String>,
    /// Queue ARN, resolved to a URL at startup when `url` is not set.
    #[serde(default)]
    pub arn: Option<String>,
    /// Seconds a received message stays hidden before redelivery.
    #[serde(default = "default_visibility_timeout")]
    pub visibility_timeout: u32,
    /// Milliseconds to sleep after a cycle that found no messages.
    #[serde(default = "default_idle_delay_ms")]
    pub idle_delay_ms: u64,
}

/// How to address the notification queue.
#[derive(Debug, PartialEq, Eq)]
pub enum QueueTarget {
    /// Queue URL, used as is.
    Url(String),
    /// Queue name and owner account, resolved to a URL by the client.
    Named {
        /// Queue name.
        name: String,
        /// Owning AWS account id.
        account_id: String,
    },
}

impl QueueConfig {
    /// Resolve the configured queue address.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if neither `url` nor `arn` is set or the ARN is malformed.
    pub fn target(&self) -> Result<QueueTarget, ConfigError> {
        if let Some(url) = &self.url {
            require_http_url(url, "queue.url")?;
            return Ok(QueueTarget::Url(url.clone()));
        }
        let arn = self.arn.as_deref().ok_or_else(|| {
            ConfigError::Validation("[queue] section requires url or arn to be set".to_owned())
        })?;
        let arn = Arn::parse(arn, "queue.arn")?;
        Ok(QueueTarget::Named {
            name: arn.resource_name().to_owned(),
            account_id: arn.account_id,
        })
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.target()?;
        if self.visibility_timeout > MAX_VISIBILITY_TIMEOUT {
            return Err(ConfigError::Validation(format!(
                "queue.visibility_timeout cannot exceed {MAX_VISIBILITY_TIMEOUT}"
            )));
        }
        Ok(())
    }
}

fn default_visibility_timeout() -> u32 {
    20
}

fn default_idle_delay_ms() -> u64 {
    1000
}

/// Edge cache configuration.
#[derive(Debug, Deserialize)]
pub struct CdnConfig {
    /// `CloudFront` distribution id.
    pub distribution_id: String,
    /// Distinct changed paths at which a cycle invalidates `/*` instead.
    #[serde(default = "default_invalidation_threshold")]
    pub invalidation_threshold: usize,
}

impl CdnConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        require_non_empty(&self.distribution_id, "cdn.distribution_id")?;
        if self.invalidation_threshold == 0 {
            return Err(ConfigError::Validation(
                "cdn.invalidation_threshold must be greater than 0".to_owned(),
            ));
        }
        Ok(())
    }
}

fn default_invalidation_threshold() -> usize {
    10
}

/// Parsed Amazon Resource Name.
#[derive(Debug, PartialEq, Eq)]
pub struct Arn {
    /// Service namespace (e.g. "sqs", "dynamodb").
    pub service: String,
    /// Region, may be empty for global resources.
    pub region: String,
    /// Owning account id.
    pub account_id: String,
    /// Resource part (e.g. "table/meetings", "webbuilder").
    pub resource: String,
}

impl Arn {
    /// Parse `arn:partition:service:region:account:resource`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` naming `field` if the value is not an ARN.
    pub fn parse(value: &str, field: &str) -> Result<Self, ConfigError> {
        let invalid = || ConfigError::Validation(format!("{field} is not a valid ARN: {value}"));
        let parts: Vec<&str> = value.splitn(6, ':').collect();
        let [prefix, _partition, service, region, account_id, resource] = parts[..] else {
            return Err(invalid());
        };
        if prefix != "arn" || service.is_empty() || resource.is_empty() {
            return Err(invalid());
        }
        Ok(Self {
            service: service.to_owned(),
            region: region.to_owned(),
            account_id: account_id.to_owned(),
            resource: resource.to_owned(),
        })
    }

    /// Last segment of the resource (`table/meetings` -> `meetings`).
    pub fn resource_name(&self) -> &str {
        self.resource
            .rsplit(['/', ':'])
            .next()
            .unwrap_or(&self.resource)
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
    /// Environment variable error during expansion.
    #[error("Environment variable error in {field}: {message}")]
    EnvVar {
        /// Config field path (e.g., "`site.bucket`").
        field: String,
        /// Error message (e.g., "${`WEBSITE_BUCKET`} not set").
        message: String,
    },
}

/// Require a string field to be non-empty.
fn require_non_empty(value: &str, field: &str) -> Result<(), ConfigError> {
    if value.is_empty() {
        return Err(ConfigError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

/// Require a URL field to use http:// or https:// scheme.
fn require_http_url(url: &str, field: &str) -> Result<(), ConfigError> {
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(ConfigError::Validation(format!(
            "{field} must start with http:// or https://"
        )));
    }
    Ok(())
}

/// Require a section to be present and valid.
fn require_section<'a, T>(
    section: Option<&'a T>,
    name: &str,
    validate: impl Fn(&T) -> Result<(), ConfigError>,
) -> Result<&'a T, ConfigError> {
    let section = section
        .ok_or_else(|| ConfigError::Validation(format!("[{name}] section required in config")))?;
    validate(section)?;
    Ok(section)
}

impl Config {
    /// Load configuration from file with optional CLI settings.
    ///
    /// If `config_path` is provided, loads from that file.
    /// Otherwise, searches for `recsite.toml` in current directory and parents.
    ///
    /// CLI settings are applied after loading, allowing CLI arguments to take
    /// precedence over config file values.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist or parsing fails.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)?
        } else if let Some(discovered) = Self::discover_config() {
            Self::load_from_file(&discovered)?
        } else {
            Self::default()
        };

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings);
        }

        config.validate()?;
        Ok(config)
    }

    /// Apply CLI settings to the configuration.
    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(region) = &settings.region {
            self.aws.region.clone_from(region);
        }
        if let Some(endpoint) = &settings.endpoint {
            self.aws.endpoint = Some(endpoint.clone());
        }
    }

    /// Get validated catalog configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if the section is missing or invalid.
    pub fn require_catalog(&self) -> Result<&CatalogConfig, ConfigError> {
        require_section(self.catalog.as_ref(), "catalog", CatalogConfig::validate)
    }

    /// Get validated site configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if the section is missing or invalid.
    pub fn require_site(&self) -> Result<&SiteConfig, ConfigError> {
        require_section(self.site.as_ref(), "site", SiteConfig::validate)
    }

    /// Get validated queue configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if the section is missing or invalid.
    pub fn require_queue(&self) -> Result<&QueueConfig, ConfigError> {
        require_section(self.queue.as_ref(), "queue", QueueConfig::validate)
    }

    /// Get validated CDN configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if the section is missing or invalid.
    pub fn require_cdn(&self) -> Result<&CdnConfig, ConfigError> {
        require_section(self.cdn.as_ref(), "cdn", CdnConfig::validate)
    }

    /// Search for config file in current directory and parents.
    fn discover_config() -> Option<PathBuf> {
        let mut current = std::env::current_dir().ok()?;
        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.exists() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;

        // Expand environment variables before path resolution
        config.expand_env_vars()?;

        let config_dir = path.parent().unwrap_or(Path::new("."));
        config.resolve_paths(config_dir);
        config.config_path = Some(path.to_path_buf());

        Ok(config)
    }

    /// Validate the sections that are present.
    ///
    /// Called automatically after loading. Missing sections are only reported
    /// by the `require_*` accessors.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_non_empty(&self.aws.region, "aws.region")?;
        if let Some(endpoint) = &self.aws.endpoint {
            require_http_url(endpoint, "aws.endpoint")?;
        }
        if let Some(catalog) = &self.catalog {
            catalog.validate()?;
        }
        if let Some(site) = &self.site {
            site.validate()?;
        }
        if let Some(queue) = &self.queue {
            queue.validate()?;
        }
        if let Some(cdn) = &self.cdn {
            cdn.validate()?;
        }
        Ok(())
    }

    /// Expand environment variable references in configuration strings.
    fn expand_env_vars(&mut self) -> Result<(), ConfigError> {
        self.aws.region = expand::expand_env(&self.aws.region, "aws.region")?;
        expand::expand_opt(&mut self.aws.endpoint, "aws.endpoint")?;

        if let Some(ref mut catalog) = self.catalog {
            catalog.table = expand::expand_env(&catalog.table, "catalog.table")?;
        }

        if let Some(ref mut site) = self.site {
            site.bucket = expand::expand_env(&site.bucket, "site.bucket")?;
            expand::expand_opt(&mut site.key_prefix, "site.key_prefix")?;
        }

        if let Some(ref mut queue) = self.queue {
            expand::expand_opt(&mut queue.url, "queue.url")?;
            expand::expand_opt(&mut queue.arn, "queue.arn")?;
        }

        if let Some(ref mut cdn) = self.cdn {
            cdn.distribution_id = expand::expand_env(&cdn.distribution_id, "cdn.distribution_id")?;
        }

        Ok(())
    }

    /// Resolve relative paths against the config directory.
    fn resolve_paths(&mut self, config_dir: &Path) {
        if let Some(site) = &mut self.site
            && let Some(dir) = &site.template_dir
            && dir.is_relative()
        {
            site.template_dir = Some(config_dir.join(dir));
        }
    }
}
