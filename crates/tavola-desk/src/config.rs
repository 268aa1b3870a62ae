//! # Desk Configuration
//!
//! Configuration for a cash desk deployment.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     TAVOLA_WRITE_MODE=strict                                           │
//! │     TAVOLA_DB_PATH=/var/lib/tavola/tavola.db                           │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/desk/desk.toml (Linux)                                   │
//! │     ~/Library/Application Support/app.tavola.desk/desk.toml (macOS)    │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     SQLite store, net-zero adjustments, lenient writes                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # desk.toml
//! [store]
//! backend = "sqlite"          # sqlite | memory
//! path = "/var/lib/tavola/tavola.db"
//! max_connections = 5
//!
//! [ledger]
//! adjustment_policy = "net_zero"   # net_zero | credit | directed
//!
//! [guard]
//! write_mode = "lenient"      # lenient | strict
//! single_open_register = false
//!
//! [audit]
//! validate_denominations = true
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use tracing::{debug, info, warn};

use crate::error::{CashError, CashResult};
use tavola_core::AdjustmentMode;

const CONFIG_FILE: &str = "desk.toml";
const DATABASE_FILE: &str = "tavola.db";

// =============================================================================
// Store Settings
// =============================================================================

/// Which document store backs the desk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    /// Durable SQLite file (WAL mode).
    #[default]
    Sqlite,
    /// Process-local map; everything is lost on exit.
    Memory,
}

impl std::fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreBackend::Sqlite => write!(f, "sqlite"),
            StoreBackend::Memory => write!(f, "memory"),
        }
    }
}

impl FromStr for StoreBackend {
    type Err = CashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sqlite" | "file" => Ok(StoreBackend::Sqlite),
            "memory" | "mem" => Ok(StoreBackend::Memory),
            other => Err(CashError::Config(format!(
                "Unknown store backend: '{}'. Valid options: sqlite, memory",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSettings {
    #[serde(default)]
    pub backend: StoreBackend,

    /// Database file. Defaults to the platform data directory.
    #[serde(default)]
    pub path: Option<PathBuf>,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    5
}

impl Default for StoreSettings {
    fn default() -> Self {
        StoreSettings {
            backend: StoreBackend::default(),
            path: None,
            max_connections: default_max_connections(),
        }
    }
}

impl StoreSettings {
    /// The configured path, or `tavola.db` in the platform data directory.
    pub fn database_path(&self) -> Option<PathBuf> {
        self.path.clone().or_else(|| {
            directories::ProjectDirs::from("app", "tavola", "desk")
                .map(|dirs| dirs.data_dir().join(DATABASE_FILE))
        })
    }
}

// =============================================================================
// Ledger Settings
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LedgerSettings {
    /// How adjustment movements move the expected balance.
    #[serde(default)]
    pub adjustment_policy: AdjustmentMode,
}

// =============================================================================
// Guard Settings
// =============================================================================

/// How writes against a register are protected from races.
///
/// ## Mode Comparison
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │                       Write Mode Comparison                             │
/// │                                                                         │
/// │  LENIENT (Default)                  │  STRICT                           │
/// │  ─────────────────                  │  ──────                           │
/// │  • Read status, then write          │  • Close checks the version read  │
/// │  • Two closes may both succeed      │  • Appends require status=open    │
/// │  • A movement may land after close  │    atomically in the store        │
/// │                                     │  • Losers get an error, not data  │
/// │                                                                         │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteMode {
    #[default]
    Lenient,
    Strict,
}

impl WriteMode {
    pub fn is_strict(&self) -> bool {
        matches!(self, WriteMode::Strict)
    }
}

impl std::fmt::Display for WriteMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WriteMode::Lenient => write!(f, "lenient"),
            WriteMode::Strict => write!(f, "strict"),
        }
    }
}

impl FromStr for WriteMode {
    type Err = CashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "lenient" | "relaxed" => Ok(WriteMode::Lenient),
            "strict" | "guarded" => Ok(WriteMode::Strict),
            other => Err(CashError::Config(format!(
                "Unknown write mode: '{}'. Valid options: lenient, strict",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GuardSettings {
    #[serde(default)]
    pub write_mode: WriteMode,

    /// Reject opening a register while another is open in the branch.
    #[serde(default)]
    pub single_open_register: bool,
}

// =============================================================================
// Audit Settings
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditSettings {
    /// Fail audits whose denomination breakdown does not add up.
    #[serde(default = "default_true")]
    pub validate_denominations: bool,
}

fn default_true() -> bool {
    true
}

impl Default for AuditSettings {
    fn default() -> Self {
        AuditSettings {
            validate_denominations: true,
        }
    }
}

// =============================================================================
// Main Desk Configuration
// =============================================================================

/// Complete desk configuration. See the module docs for the file format.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeskConfig {
    #[serde(default)]
    pub store: StoreSettings,

    #[serde(default)]
    pub ledger: LedgerSettings,

    #[serde(default)]
    pub guard: GuardSettings,

    #[serde(default)]
    pub audit: AuditSettings,
}

impl DeskConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (desk.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> CashResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading desk config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load desk config: {}. Using defaults.", e);
            Self::default()
        })
    }

    pub fn save(&self, config_path: Option<PathBuf>) -> CashResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| CashError::Config("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)?;

        info!(?path, "Desk config saved");
        Ok(())
    }

    pub fn validate(&self) -> CashResult<()> {
        if self.store.max_connections == 0 {
            return Err(CashError::Config(
                "store.max_connections must be greater than 0".into(),
            ));
        }

        if let Some(path) = &self.store.path {
            if self.store.backend == StoreBackend::Sqlite && path.as_os_str().is_empty() {
                return Err(CashError::Config("store.path must not be empty".into()));
            }
        }

        Ok(())
    }

    /// Applies `TAVOLA_*` environment variable overrides.
    pub fn apply_env_overrides(&mut self) {
        self.apply_env_overrides_from(|name| std::env::var(name).ok());
    }

    /// Applies overrides from any variable lookup. Unparseable values are
    /// logged and ignored.
    pub fn apply_env_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(backend) = lookup("TAVOLA_STORE_BACKEND") {
            match backend.parse() {
                Ok(parsed) => {
                    debug!(backend = %backend, "Overriding store backend from environment");
                    self.store.backend = parsed;
                }
                Err(_) => warn!(backend = %backend, "Unknown store backend in environment"),
            }
        }

        if let Some(path) = lookup("TAVOLA_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.store.path = Some(PathBuf::from(path));
        }

        if let Some(policy) = lookup("TAVOLA_ADJUSTMENT_POLICY") {
            match policy.parse::<AdjustmentMode>() {
                Ok(parsed) => self.ledger.adjustment_policy = parsed,
                Err(_) => warn!(policy = %policy, "Unknown adjustment policy in environment"),
            }
        }

        if let Some(mode) = lookup("TAVOLA_WRITE_MODE") {
            match mode.parse() {
                Ok(parsed) => {
                    debug!(mode = %mode, "Overriding write mode from environment");
                    self.guard.write_mode = parsed;
                }
                Err(_) => warn!(mode = %mode, "Unknown write mode in environment"),
            }
        }

        if let Some(flag) = lookup("TAVOLA_SINGLE_OPEN_REGISTER") {
            match parse_flag(&flag) {
                Some(on) => self.guard.single_open_register = on,
                None => warn!(value = %flag, "TAVOLA_SINGLE_OPEN_REGISTER is not a boolean"),
            }
        }

        if let Some(flag) = lookup("TAVOLA_VALIDATE_DENOMINATIONS") {
            match parse_flag(&flag) {
                Some(on) => self.audit.validate_denominations = on,
                None => warn!(value = %flag, "TAVOLA_VALIDATE_DENOMINATIONS is not a boolean"),
            }
        }
    }

    /// Returns the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("app", "tavola", "desk")
            .map(|dirs| dirs.config_dir().join(CONFIG_FILE))
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

// =============================================================================
// Tests
// =============================================================================
