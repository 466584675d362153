//! # Engine Configuration
//!
//! Configuration management for the cutoff engine.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     WHOLESALE_UTC_OFFSET_MINUTES=540                                   │
//! │     WHOLESALE_DISPATCH_CONCURRENCY=8                                   │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/wholesale-engine/engine.toml (Linux)                     │
//! │     ~/Library/Application Support/com.wholesale.engine/engine.toml     │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     UTC business day, SO/PO/PL prefixes                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # engine.toml
//! [cycle]
//! utc_offset_minutes = 540   # business day boundary (UTC+09:00)
//!
//! [numbering]
//! sale_order_prefix = "SO"
//! purchase_order_prefix = "PO"
//! ledger_prefix = "PL"
//!
//! [aggregation]
//! lookup_concurrency = 16
//!
//! [dispatch]
//! concurrency = 4
//! timeout_secs = 10
//! max_batch_size = 500
//!
//! [reconciliation]
//! default_category = "uncategorized"
//! ```

use chrono::{FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};
use wholesale_core::validation::validate_prefix;
use wholesale_core::DEFAULT_CATEGORY;

use crate::error::{EngineError, EngineResult};

/// Largest offset any real timezone uses (UTC±14:00).
const MAX_OFFSET_MINUTES: i32 = 14 * 60;

// =============================================================================
// Cycle Settings
// =============================================================================

/// Where the business day starts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleSettings {
    /// Offset of the business timezone from UTC, in minutes.
    /// Drives the fallback window and the dates in document numbers.
    #[serde(default)]
    pub utc_offset_minutes: i32,
}

impl Default for CycleSettings {
    fn default() -> Self {
        CycleSettings {
            utc_offset_minutes: 0,
        }
    }
}

// =============================================================================
// Numbering Settings
// =============================================================================

/// Document number prefixes: `PREFIX-YYYYMMDD-NNNN`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NumberingSettings {
    #[serde(default = "default_sale_order_prefix")]
    pub sale_order_prefix: String,

    #[serde(default = "default_purchase_order_prefix")]
    pub purchase_order_prefix: String,

    #[serde(default = "default_ledger_prefix")]
    pub ledger_prefix: String,
}

fn default_sale_order_prefix() -> String {
    "SO".to_string()
}

fn default_purchase_order_prefix() -> String {
    "PO".to_string()
}

fn default_ledger_prefix() -> String {
    "PL".to_string()
}

impl Default for NumberingSettings {
    fn default() -> Self {
        NumberingSettings {
            sale_order_prefix: default_sale_order_prefix(),
            purchase_order_prefix: default_purchase_order_prefix(),
            ledger_prefix: default_ledger_prefix(),
        }
    }
}

// =============================================================================
// Aggregation Settings
// =============================================================================

/// Aggregation behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregationSettings {
    /// Catalog lookups in flight at once.
    #[serde(default = "default_lookup_concurrency")]
    pub lookup_concurrency: usize,
}

fn default_lookup_concurrency() -> usize {
    16
}

impl Default for AggregationSettings {
    fn default() -> Self {
        AggregationSettings {
            lookup_concurrency: default_lookup_concurrency(),
        }
    }
}

// =============================================================================
// Dispatch Settings
// =============================================================================

/// Supplier notification settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchSettings {
    /// Sends in flight at once.
    #[serde(default = "default_dispatch_concurrency")]
    pub concurrency: usize,

    /// Per-send timeout (seconds). A timeout counts as a failed send.
    #[serde(default = "default_dispatch_timeout")]
    pub timeout_secs: u64,

    /// Largest batch an operator may submit in one call.
    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: usize,
}

fn default_dispatch_concurrency() -> usize {
    4
}

fn default_dispatch_timeout() -> u64 {
    10
}

fn default_max_batch_size() -> usize {
    500
}

impl Default for DispatchSettings {
    fn default() -> Self {
        DispatchSettings {
            concurrency: default_dispatch_concurrency(),
            timeout_secs: default_dispatch_timeout(),
            max_batch_size: default_max_batch_size(),
        }
    }
}

// =============================================================================
// Reconciliation Settings
// =============================================================================

/// Inbound reconciliation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconciliationSettings {
    /// Ledger category for products the catalog no longer knows.
    #[serde(default = "default_category")]
    pub default_category: String,
}

fn default_category() -> String {
    DEFAULT_CATEGORY.to_string()
}

impl Default for ReconciliationSettings {
    fn default() -> Self {
        ReconciliationSettings {
            default_category: default_category(),
        }
    }
}

// =============================================================================
// Main Engine Configuration
// =============================================================================

/// Complete engine configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub cycle: CycleSettings,

    #[serde(default)]
    pub numbering: NumberingSettings,

    #[serde(default)]
    pub aggregation: AggregationSettings,

    #[serde(default)]
    pub dispatch: DispatchSettings,

    #[serde(default)]
    pub reconciliation: ReconciliationSettings,
}

impl EngineConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (engine.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> EngineResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading engine config from file");
                config = Self::from_file(&path)?;
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
            warn!("Failed to load engine config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Parses a config file without applying overrides.
    pub fn from_file(path: &Path) -> EngineResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Parses TOML text without applying overrides.
    pub fn from_toml_str(contents: &str) -> EngineResult<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> EngineResult<()> {
        if self.cycle.utc_offset_minutes.abs() > MAX_OFFSET_MINUTES {
            return Err(EngineError::InvalidConfig(format!(
                "utc_offset_minutes must be within ±{}, got {}",
                MAX_OFFSET_MINUTES, self.cycle.utc_offset_minutes
            )));
        }

        for prefix in [
            &self.numbering.sale_order_prefix,
            &self.numbering.purchase_order_prefix,
            &self.numbering.ledger_prefix,
        ] {
            validate_prefix(prefix).map_err(|e| EngineError::InvalidConfig(e.to_string()))?;
        }

        if self.aggregation.lookup_concurrency == 0 {
            return Err(EngineError::InvalidConfig(
                "lookup_concurrency must be greater than 0".into(),
            ));
        }
        if self.dispatch.concurrency == 0 {
            return Err(EngineError::InvalidConfig(
                "dispatch concurrency must be greater than 0".into(),
            ));
        }
        if self.dispatch.timeout_secs == 0 {
            return Err(EngineError::InvalidConfig(
                "dispatch timeout_secs must be greater than 0".into(),
            ));
        }
        if self.dispatch.max_batch_size == 0 {
            return Err(EngineError::InvalidConfig(
                "max_batch_size must be greater than 0".into(),
            ));
        }
        if self.reconciliation.default_category.trim().is_empty() {
            return Err(EngineError::InvalidConfig(
                "default_category must not be empty".into(),
            ));
        }

        Ok(())
    }

    /// Applies environment variable overrides.
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Applies `WHOLESALE_*` overrides from any key/value source.
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(v) = lookup("WHOLESALE_UTC_OFFSET_MINUTES") {
            match v.parse::<i32>() {
                Ok(m) => {
                    debug!(minutes = m, "Overriding business UTC offset from environment");
                    self.cycle.utc_offset_minutes = m;
                }
                Err(_) => warn!(value = %v, "Ignoring non-numeric WHOLESALE_UTC_OFFSET_MINUTES"),
            }
        }

        if let Some(v) = lookup("WHOLESALE_SALE_ORDER_PREFIX") {
            self.numbering.sale_order_prefix = v;
        }
        if let Some(v) = lookup("WHOLESALE_PURCHASE_ORDER_PREFIX") {
            self.numbering.purchase_order_prefix = v;
        }
        if let Some(v) = lookup("WHOLESALE_LEDGER_PREFIX") {
            self.numbering.ledger_prefix = v;
        }

        if let Some(n) = lookup("WHOLESALE_LOOKUP_CONCURRENCY").and_then(|v| v.parse().ok()) {
            self.aggregation.lookup_concurrency = n;
        }

        if let Some(n) = lookup("WHOLESALE_DISPATCH_CONCURRENCY").and_then(|v| v.parse().ok()) {
            debug!(concurrency = n, "Overriding dispatch concurrency from environment");
            self.dispatch.concurrency = n;
        }
        if let Some(n) = lookup("WHOLESALE_DISPATCH_TIMEOUT_SECS").and_then(|v| v.parse().ok()) {
            self.dispatch.timeout_secs = n;
        }

        if let Some(v) = lookup("WHOLESALE_DEFAULT_CATEGORY") {
            self.reconciliation.default_category = v;
        }
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "wholesale", "engine")
            .map(|dirs| dirs.config_dir().join("engine.toml"))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    /// Returns the business timezone as a fixed offset.
    ///
    /// Falls back to UTC for an out-of-range value; [`validate`](Self::validate)
    /// rejects those on load.
    pub fn business_offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.cycle.utc_offset_minutes * 60).unwrap_or_else(|| Utc.fix())
    }

    /// Returns the per-send dispatch timeout.
    pub fn dispatch_timeout(&self) -> Duration {
        Duration::from_secs(self.dispatch.timeout_secs)
    }
}
