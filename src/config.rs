use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::error::Error;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variable overriding the WebDriver endpoint
pub const WEBDRIVER_URL_KEY: &str = "WEBDRIVER_URL";

/// Secret needed by the enrichment stage
pub const FULLENRICH_API_KEY: &str = "FULLENRICH_API_KEY";

/// Login of the mailbox receiving the job alerts
pub const MAIL_USER_KEY: &str = "JOBUP_EMAIL";

/// App password of that mailbox
pub const MAIL_PASSWORD_KEY: &str = "JOBUP_EMAIL_APP_PASSWORD";

/// Configuration for every stage of the pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// URL for the WebDriver instance
    #[serde(default = "default_webdriver_url")]
    pub webdriver_url: String,

    /// Run the browser without a window
    #[serde(default = "default_true")]
    pub headless: bool,

    /// IMAP account holding the job alerts; `mail_dir` is read when unset
    #[serde(default)]
    pub imap: Option<ImapSettings>,

    /// Maildir holding the job-alert messages
    #[serde(default = "default_mail_dir")]
    pub mail_dir: PathBuf,

    /// Only messages whose sender contains this address are read
    #[serde(default = "default_sender")]
    pub sender: String,

    /// A message subject must contain one of these (case-insensitive)
    #[serde(default = "default_subject_keywords")]
    pub subject_keywords: Vec<String>,

    /// Prefix identifying offer URLs inside alert bodies
    #[serde(default = "default_job_url_prefix")]
    pub job_url_prefix: String,

    /// Where the ChromeDriver download is unpacked
    #[serde(default = "default_driver_dir")]
    pub driver_dir: PathBuf,

    /// Screenshots of pages that gave nothing usable land here
    #[serde(default = "default_debug_dir")]
    pub debug_dir: PathBuf,

    #[serde(default)]
    pub exports: ExportPaths,

    #[serde(default)]
    pub enrich: EnrichSettings,

    #[serde(default)]
    pub delay: DelaySettings,
}

/// File written by each stage, read by the next one
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportPaths {
    #[serde(default = "default_offers_path")]
    pub offers: PathBuf,

    #[serde(default = "default_companies_path")]
    pub companies: PathBuf,

    #[serde(default = "default_profiles_path")]
    pub profiles: PathBuf,

    #[serde(default = "default_enriched_path")]
    pub enriched: PathBuf,
}

/// IMAP server and folder; credentials come from the environment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImapSettings {
    #[serde(default = "default_imap_host")]
    pub host: String,

    #[serde(default = "default_imap_port")]
    pub port: u16,

    #[serde(default = "default_imap_folder")]
    pub folder: String,
}

/// Settings for the bulk enrichment API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichSettings {
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Profiles sent per bulk request
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Result polls before a batch is given up
    #[serde(default = "default_poll_max_tries")]
    pub poll_max_tries: u32,

    #[serde(default = "default_poll_sleep_secs")]
    pub poll_sleep_secs: u64,

    /// Side file whose first line holds the API key
    #[serde(default = "default_api_key_file")]
    pub api_key_file: PathBuf,
}

/// Randomized pause between two lookups on third-party sites
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DelaySettings {
    #[serde(default = "default_delay_min")]
    pub min_secs: f64,

    #[serde(default = "default_delay_max")]
    pub max_secs: f64,
}

fn default_webdriver_url() -> String {
    "http://localhost:4444".to_string()
}

fn default_true() -> bool {
    true
}

fn default_mail_dir() -> PathBuf {
    PathBuf::from("mail")
}

fn default_sender() -> String {
    "noreply@jobup.ch".to_string()
}

fn default_subject_keywords() -> Vec<String> {
    ["job alert", "job offers", "offres d'emploi", "jobs"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_job_url_prefix() -> String {
    crate::parsers::offers::JOBUP_URL_PREFIX.to_string()
}

fn default_imap_host() -> String {
    "imap.gmail.com".to_string()
}

fn default_imap_port() -> u16 {
    993
}

fn default_imap_folder() -> String {
    "INBOX".to_string()
}

fn default_driver_dir() -> PathBuf {
    PathBuf::from("chromedriver")
}

fn default_debug_dir() -> PathBuf {
    PathBuf::from("debug")
}

fn default_offers_path() -> PathBuf {
    PathBuf::from("offres_jobup.csv")
}

fn default_companies_path() -> PathBuf {
    PathBuf::from("offres_jobup_company_linkedin.csv")
}

fn default_profiles_path() -> PathBuf {
    PathBuf::from("offres_jobup_profile_linkedin.csv")
}

fn default_enriched_path() -> PathBuf {
    PathBuf::from("offres_jobup_enriched.csv")
}

fn default_api_base() -> String {
    "https://app.fullenrich.com/api/v1".to_string()
}

fn default_batch_size() -> usize {
    50
}

fn default_poll_max_tries() -> u32 {
    30
}

fn default_poll_sleep_secs() -> u64 {
    5
}

fn default_api_key_file() -> PathBuf {
    PathBuf::from("fullenrich_api_key.txt")
}

fn default_delay_min() -> f64 {
    0.6
}

fn default_delay_max() -> f64 {
    1.6
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            webdriver_url: default_webdriver_url(),
            headless: true,
            imap: None,
            mail_dir: default_mail_dir(),
            sender: default_sender(),
            subject_keywords: default_subject_keywords(),
            job_url_prefix: default_job_url_prefix(),
            driver_dir: default_driver_dir(),
            debug_dir: default_debug_dir(),
            exports: ExportPaths::default(),
            enrich: EnrichSettings::default(),
            delay: DelaySettings::default(),
        }
    }
}

impl Default for ExportPaths {
    fn default() -> Self {
        Self {
            offers: default_offers_path(),
            companies: default_companies_path(),
            profiles: default_profiles_path(),
            enriched: default_enriched_path(),
        }
    }
}

impl Default for ImapSettings {
    fn default() -> Self {
        Self {
            host: default_imap_host(),
            port: default_imap_port(),
            folder: default_imap_folder(),
        }
    }
}

impl Default for EnrichSettings {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            batch_size: default_batch_size(),
            poll_max_tries: default_poll_max_tries(),
            poll_sleep_secs: default_poll_sleep_secs(),
            api_key_file: default_api_key_file(),
        }
    }
}

impl Default for DelaySettings {
    fn default() -> Self {
        Self {
            min_secs: default_delay_min(),
            max_secs: default_delay_max(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn Error>> {
        let mut file = File::open(path)?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;

        Self::from_json(&contents)
    }

    /// Load configuration from a JSON string
    pub fn from_json(json: &str) -> Result<Self, Box<dyn Error>> {
        let config: Self = serde_json::from_str(json)?;
        Ok(config)
    }

    /// Load the given file, or fall back to defaults when no path is given
    pub fn load(path: Option<&Path>) -> Result<Self, Box<dyn Error>> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    /// Apply overrides found in the given sources
    pub fn with_overrides(mut self, sources: &[&dyn ConfigSource]) -> Self {
        if let Some(url) = resolve(WEBDRIVER_URL_KEY, sources) {
            self.webdriver_url = url;
        }
        self
    }
}

/// Errors raised while resolving required settings
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{key} is not set (looked in {looked_in})")]
    MissingSecret { key: String, looked_in: String },
}

/// Somewhere a configuration value may come from
pub trait ConfigSource {
    /// Value for `key`, if this source has one
    fn lookup(&self, key: &str) -> Option<String>;
}

/// The process environment
pub struct EnvSource;

impl ConfigSource for EnvSource {
    fn lookup(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

/// Key/value pairs from a `.env` file.
///
/// Values are kept here instead of being exported into the process
/// environment.
#[derive(Debug, Clone, Default)]
pub struct DotEnv {
    values: HashMap<String, String>,
}

impl DotEnv {
    /// Read a `.env` file; a missing file is an empty source
    pub fn load<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(contents) => Ok(Self::parse(&contents)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e),
        }
    }

    /// Parse `KEY=VALUE` lines; blank lines, `#` comments and lines without
    /// `=` are skipped. The first occurrence of a key wins.
    pub fn parse(contents: &str) -> Self {
        let mut values = HashMap::new();
        for line in contents.lines().map(str::trim) {
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            values
                .entry(key.trim().to_string())
                .or_insert_with(|| value.trim().to_string());
        }
        Self { values }
    }
}

impl ConfigSource for DotEnv {
    fn lookup(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }
}

/// First line of a file, answering for a single key
pub struct FileSource {
    key: String,
    path: PathBuf,
}

impl FileSource {
    pub fn new(key: &str, path: impl Into<PathBuf>) -> Self {
        Self {
            key: key.to_string(),
            path: path.into(),
        }
    }
}

impl ConfigSource for FileSource {
    fn lookup(&self, key: &str) -> Option<String> {
        if key != self.key {
            return None;
        }
        let file = File::open(&self.path).ok()?;
        let mut line = String::new();
        BufReader::new(file).read_line(&mut line).ok()?;
        Some(line.trim().to_string())
    }
}

impl ConfigSource for HashMap<String, String> {
    fn lookup(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

/// First non-empty value for `key` across `sources`, in order
pub fn resolve(key: &str, sources: &[&dyn ConfigSource]) -> Option<String> {
    sources
        .iter()
        .filter_map(|source| source.lookup(key))
        .find(|value| !value.trim().is_empty())
}

/// Resolve the enrichment API key: environment, then `.env`, then the side file
pub fn enrichment_api_key(config: &AppConfig, dotenv: &DotEnv) -> Result<String, ConfigError> {
    let file = FileSource::new(FULLENRICH_API_KEY, &config.enrich.api_key_file);
    resolve(FULLENRICH_API_KEY, &[&EnvSource, dotenv, &file]).ok_or_else(|| {
        ConfigError::MissingSecret {
            key: FULLENRICH_API_KEY.to_string(),
            looked_in: format!(
                "environment, .env file, {}",
                config.enrich.api_key_file.display()
            ),
        }
    })
}

/// Login and app password of the alert mailbox
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailCredentials {
    pub user: String,
    pub password: String,
}

/// Resolve the mailbox login from `sources` (environment, then `.env`)
pub fn mail_credentials(sources: &[&dyn ConfigSource]) -> Result<MailCredentials, ConfigError> {
    let require = |key: &str| {
        resolve(key, sources).ok_or_else(|| ConfigError::MissingSecret {
            key: key.to_string(),
            looked_in: "environment, .env file".to_string(),
        })
    };

    Ok(MailCredentials {
        user: require(MAIL_USER_KEY)?,
        password: require(MAIL_PASSWORD_KEY)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn map(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults_from_empty_json() {
        let config = AppConfig::from_json("{}").unwrap();
        assert_eq!(config.webdriver_url, "http://localhost:4444");
        assert_eq!(config.sender, "noreply@jobup.ch");
        assert_eq!(config.subject_keywords.len(), 4);
        assert_eq!(config.enrich.batch_size, 50);
        assert_eq!(config.enrich.poll_max_tries, 30);
        assert_eq!(config.exports.offers, PathBuf::from("offres_jobup.csv"));
        assert!(config.headless);
    }

    #[test]
    fn test_partial_json() {
        let json = r#"{"mail_dir": "/var/mail/alerts", "enrich": {"batch_size": 10}}"#;
        let config = AppConfig::from_json(json).unwrap();
        assert_eq!(config.mail_dir, PathBuf::from("/var/mail/alerts"));
        assert_eq!(config.enrich.batch_size, 10);
        assert_eq!(config.enrich.poll_sleep_secs, 5);
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"headless": false}}"#).unwrap();
        let config = AppConfig::from_file(file.path()).unwrap();
        assert!(!config.headless);
        assert!(AppConfig::from_json("not json").is_err());
    }

    #[test]
    fn test_resolve_first_present_wins() {
        let first = map(&[("A", "from first")]);
        let second = map(&[("A", "from second"), ("B", "only second")]);
        let blank = map(&[("A", "  "), ("B", "")]);

        assert_eq!(
            resolve("A", &[&first, &second]).as_deref(),
            Some("from first")
        );
        assert_eq!(
            resolve("A", &[&blank, &second]).as_deref(),
            Some("from second")
        );
        assert_eq!(
            resolve("B", &[&blank, &first, &second]).as_deref(),
            Some("only second")
        );
        assert_eq!(resolve("C", &[&first, &second]), None);
        assert_eq!(resolve("A", &[]), None);
    }

    #[test]
    fn test_dotenv_parse() {
        let dotenv = DotEnv::parse(
            "# comment\n\nKEY = value\nOTHER=a=b\nnot a pair\nKEY=ignored\n",
        );
        assert_eq!(dotenv.lookup("KEY").as_deref(), Some("value"));
        assert_eq!(dotenv.lookup("OTHER").as_deref(), Some("a=b"));
        assert_eq!(dotenv.lookup("not a pair"), None);
    }

    #[test]
    fn test_dotenv_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let dotenv = DotEnv::load(dir.path().join(".env")).unwrap();
        assert_eq!(dotenv.lookup("KEY"), None);
    }

    #[test]
    fn test_file_source_first_line() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "  secret-key  ").unwrap();
        writeln!(file, "second line").unwrap();

        let source = FileSource::new("API_KEY", file.path());
        assert_eq!(source.lookup("API_KEY").as_deref(), Some("secret-key"));
        assert_eq!(source.lookup("OTHER_KEY"), None);

        let missing = FileSource::new("API_KEY", "/nonexistent/key.txt");
        assert_eq!(missing.lookup("API_KEY"), None);
    }

    #[test]
    fn test_layered_dotenv_then_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "from-file").unwrap();
        let side = FileSource::new("TOKEN", file.path());

        let empty = DotEnv::default();
        assert_eq!(resolve("TOKEN", &[&empty, &side]).as_deref(), Some("from-file"));

        let dotenv = DotEnv::parse("TOKEN=from-dotenv");
        assert_eq!(
            resolve("TOKEN", &[&dotenv, &side]).as_deref(),
            Some("from-dotenv")
        );
    }

    #[test]
    fn test_imap_settings() {
        assert!(AppConfig::default().imap.is_none());

        let config = AppConfig::from_json(r#"{"imap": {"folder": "Alerts"}}"#).unwrap();
        let imap = config.imap.unwrap();
        assert_eq!(imap.host, "imap.gmail.com");
        assert_eq!(imap.port, 993);
        assert_eq!(imap.folder, "Alerts");
    }

    #[test]
    fn test_mail_credentials() {
        let env = map(&[(MAIL_USER_KEY, "alerts@example.com")]);
        let dotenv = DotEnv::parse("JOBUP_EMAIL_APP_PASSWORD=abcd efgh");
        let creds = mail_credentials(&[&env, &dotenv]).unwrap();
        assert_eq!(creds.user, "alerts@example.com");
        assert_eq!(creds.password, "abcd efgh");
    }

    #[test]
    fn test_missing_mail_password() {
        let env = map(&[(MAIL_USER_KEY, "alerts@example.com"), (MAIL_PASSWORD_KEY, " ")]);
        let err = mail_credentials(&[&env]).unwrap_err();
        let ConfigError::MissingSecret { key, .. } = &err;
        assert_eq!(key, MAIL_PASSWORD_KEY);
        assert!(err.to_string().contains("JOBUP_EMAIL_APP_PASSWORD is not set"));
    }

    #[test]
    fn test_webdriver_override() {
        let overrides = map(&[(WEBDRIVER_URL_KEY, "http://localhost:9515")]);
        let config = AppConfig::default().with_overrides(&[&overrides]);
        assert_eq!(config.webdriver_url, "http://localhost:9515");

        let config = AppConfig::default().with_overrides(&[]);
        assert_eq!(config.webdriver_url, "http://localhost:4444");
    }
}
