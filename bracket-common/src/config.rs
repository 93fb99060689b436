//! Configuration loading and root folder resolution
//!
//! Bootstrap configuration comes from a TOML file (optional). Priority for
//! the file location:
//! 1. `--config` command-line argument
//! 2. `BRACKET_CONFIG` environment variable
//! 3. `<config dir>/bracket-vote/config.toml`
//!
//! A missing default file means zero-config startup with SQLite under the
//! root folder. Root folder priority: command line, `BRACKET_ROOT_FOLDER`,
//! TOML `root_folder`, then the OS data directory.

use crate::bracket::{EntrantList, DEFAULT_TITLE};
use crate::{Error, Result};
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Environment variable naming the TOML config file
pub const CONFIG_ENV_VAR: &str = "BRACKET_CONFIG";
/// Environment variable overriding the root folder
pub const ROOT_FOLDER_ENV_VAR: &str = "BRACKET_ROOT_FOLDER";
/// Directory name used under the OS config/data folders
pub const APP_DIR_NAME: &str = "bracket-vote";
/// Default SQLite file name, relative to the root folder
pub const DEFAULT_SQLITE_DBNAME: &str = "predictions.db";

const DEFAULT_PORT: u16 = 5730;
const DEFAULT_POSTGRES_PORT: u16 = 5432;

/// Bootstrap configuration loaded from TOML
#[derive(Debug, Clone, Deserialize)]
pub struct TomlConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    #[serde(default)]
    pub root_folder: Option<PathBuf>,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub database: DatabaseSection,

    #[serde(default)]
    pub bracket: BracketSection,

    #[serde(default)]
    pub sessions: SessionSection,
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            bind_address: default_bind_address(),
            root_folder: None,
            logging: LoggingConfig::default(),
            database: DatabaseSection::default(),
            bracket: BracketSection::default(),
            sessions: SessionSection::default(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (logs to stderr if not specified)
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

/// Storage backend selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DriverKind {
    Sqlite,
    Postgres,
    Memory,
}

/// `[database]` credentials section
///
/// When the section is absent the service uses SQLite with
/// [`DEFAULT_SQLITE_DBNAME`]. When it is present every key the chosen
/// driver needs must be given.
#[derive(Clone, Deserialize)]
pub struct DatabaseSection {
    #[serde(default = "default_driver")]
    pub driver: DriverKind,
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub dbname: Option<String>,
}

impl Default for DatabaseSection {
    fn default() -> Self {
        Self {
            driver: DriverKind::Sqlite,
            host: None,
            port: None,
            username: None,
            password: None,
            dbname: Some(DEFAULT_SQLITE_DBNAME.to_string()),
        }
    }
}

impl fmt::Debug for DatabaseSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseSection")
            .field("driver", &self.driver)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("dbname", &self.dbname)
            .finish()
    }
}

/// Connection parameters for the PostgreSQL driver
#[derive(Clone, PartialEq, Eq)]
pub struct PostgresCredentials {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub dbname: String,
}

impl fmt::Debug for PostgresCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PostgresCredentials")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("dbname", &self.dbname)
            .finish()
    }
}

/// Validated storage selection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseConfig {
    Sqlite { path: PathBuf },
    Postgres(PostgresCredentials),
    Memory,
}

impl DatabaseSection {
    /// Validate credentials for the selected driver
    ///
    /// A relative SQLite `dbname` is placed under `root_folder`.
    pub fn resolve(&self, root_folder: &Path) -> Result<DatabaseConfig> {
        match self.driver {
            DriverKind::Sqlite => {
                let dbname = required(&self.dbname, "dbname")?;
                let path = PathBuf::from(dbname);
                let path = if path.is_absolute() {
                    path
                } else {
                    root_folder.join(path)
                };
                Ok(DatabaseConfig::Sqlite { path })
            }
            DriverKind::Postgres => Ok(DatabaseConfig::Postgres(PostgresCredentials {
                host: required(&self.host, "host")?,
                port: self.port.unwrap_or(DEFAULT_POSTGRES_PORT),
                username: required(&self.username, "username")?,
                password: required(&self.password, "password")?,
                dbname: required(&self.dbname, "dbname")?,
            })),
            DriverKind::Memory => Ok(DatabaseConfig::Memory),
        }
    }
}

fn required(value: &Option<String>, key: &str) -> Result<String> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(Error::Config(format!("Missing database configuration: {}", key))),
    }
}

/// `[bracket]` section
#[derive(Debug, Clone, Deserialize)]
pub struct BracketSection {
    #[serde(default = "default_title")]
    pub title: String,

    /// Overrides the built-in 16 entrants; bracket order
    #[serde(default)]
    pub entrants: Option<Vec<String>>,
}

impl Default for BracketSection {
    fn default() -> Self {
        Self {
            title: default_title(),
            entrants: None,
        }
    }
}

impl BracketSection {
    pub fn entrant_list(&self) -> Result<EntrantList> {
        match &self.entrants {
            Some(names) => EntrantList::new(names.iter().cloned()),
            None => Ok(EntrantList::default()),
        }
    }
}

/// `[sessions]` section
#[derive(Debug, Clone, Deserialize)]
pub struct SessionSection {
    /// Sessions untouched for this long are discarded
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,
}

impl Default for SessionSection {
    fn default() -> Self {
        Self {
            idle_timeout_secs: default_idle_timeout_secs(),
        }
    }
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_driver() -> DriverKind {
    DriverKind::Sqlite
}

fn default_title() -> String {
    DEFAULT_TITLE.to_string()
}

fn default_idle_timeout_secs() -> u64 {
    3600
}

impl TomlConfig {
    /// Parse a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Cannot read config file {}: {}", path.display(), e))
        })?;
        Self::parse(&content)
            .map_err(|e| Error::Config(format!("{} ({})", e, path.display())))
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Invalid config: {}", e)))
    }

    /// Locate and load the config file
    ///
    /// An explicitly named file (argument or environment) must exist. The
    /// default location is optional.
    pub fn discover(cli_path: Option<&Path>) -> Result<(Self, Option<PathBuf>)> {
        if let Some(path) = cli_path {
            return Ok((Self::load(path)?, Some(path.to_path_buf())));
        }

        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            let path = PathBuf::from(path);
            return Ok((Self::load(&path)?, Some(path)));
        }

        if let Some(path) = default_config_path().filter(|p| p.exists()) {
            return Ok((Self::load(&path)?, Some(path)));
        }

        warn!("No config file found, using built-in defaults");
        Ok((Self::default(), None))
    }
}

/// Default TOML location for the platform
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_DIR_NAME).join("config.toml"))
}

/// OS-dependent default root folder
pub fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join(APP_DIR_NAME))
        .unwrap_or_else(|| PathBuf::from("./bracket_data"))
}

/// Resolve the root folder: command line, environment, TOML, OS default
pub fn resolve_root_folder(cli_arg: Option<&Path>, toml: &TomlConfig) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var(ROOT_FOLDER_ENV_VAR) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    if let Some(path) = &toml.root_folder {
        return path.clone();
    }

    default_root_folder()
}

/// Fully validated service configuration
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub bind_address: String,
    pub port: u16,
    pub root_folder: PathBuf,
    pub database: DatabaseConfig,
    pub title: String,
    pub entrants: EntrantList,
    pub idle_timeout: Duration,
    pub logging: LoggingConfig,
}

impl ServiceConfig {
    /// Validate a loaded TOML config, applying command-line overrides
    pub fn resolve(
        toml: TomlConfig,
        root_folder_override: Option<&Path>,
        port_override: Option<u16>,
    ) -> Result<Self> {
        let root_folder = resolve_root_folder(root_folder_override, &toml);
        let database = toml.database.resolve(&root_folder)?;
        let entrants = toml.bracket.entrant_list()?;

        if toml.sessions.idle_timeout_secs == 0 {
            return Err(Error::Config(
                "sessions.idle_timeout_secs must be greater than 0".to_string(),
            ));
        }

        Ok(Self {
            bind_address: toml.bind_address,
            port: port_override.unwrap_or(toml.port),
            root_folder,
            database,
            title: toml.bracket.title,
            entrants,
            idle_timeout: Duration::from_secs(toml.sessions.idle_timeout_secs),
            logging: toml.logging,
        })
    }

    /// Create the root folder if it does not exist
    pub fn ensure_root_folder(&self) -> Result<()> {
        if !self.root_folder.exists() {
            std::fs::create_dir_all(&self.root_folder)?;
            info!("Created root folder: {}", self.root_folder.display());
        }
        Ok(())
    }
}
