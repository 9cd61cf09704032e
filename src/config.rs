// ABOUTME: Run configuration: built-in defaults, TOML config file, CLI overrides
// ABOUTME: Produces the immutable SyncOptions consumed by the reconciliation driver

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::reconcile::repair::{RepairPolicy, TableRepair};
use crate::store::Credential;

pub const DEFAULT_PRIMARY_KEY: &str = "id";
pub const DEFAULT_TIMESTAMP_KEY: &str = "updated";
pub const ALL_TABLES: &str = "*";

/// Connection settings for one side, as found in `[source]` / `[target]`.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct EndpointConfig {
    pub uri: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
}

impl EndpointConfig {
    /// Fields set in `other` replace ours.
    pub fn merge(self, other: EndpointConfig) -> EndpointConfig {
        EndpointConfig {
            uri: other.uri.or(self.uri),
            user: other.user.or(self.user),
            password: other.password.or(self.password),
        }
    }

    pub fn credential(&self) -> Credential {
        Credential::new(self.user.clone(), self.password.clone())
    }
}

/// One layer of run switches. Every field is optional so that layers can be
/// stacked: defaults, then the config file's `[sync]`, then CLI flags.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct OptionLayer {
    pub primary_key: Option<String>,
    /// Empty string disables timestamp comparison.
    pub timestamp_key: Option<String>,
    pub delete: Option<bool>,
    pub apply: Option<bool>,
    pub force: Option<bool>,
    pub two_way: Option<bool>,
    pub read_lock: Option<bool>,
    pub write_lock: Option<bool>,
    pub ignore_errors: Option<bool>,
    pub progress: Option<bool>,
    pub tables: Option<Vec<String>>,
    pub skip_tables: Option<Vec<String>>,
}

impl OptionLayer {
    /// The built-in bottom layer.
    pub fn defaults() -> Self {
        Self {
            primary_key: Some(DEFAULT_PRIMARY_KEY.to_string()),
            timestamp_key: Some(DEFAULT_TIMESTAMP_KEY.to_string()),
            delete: Some(false),
            apply: Some(true),
            force: Some(false),
            two_way: Some(false),
            read_lock: Some(false),
            write_lock: Some(false),
            ignore_errors: Some(false),
            progress: None,
            tables: Some(vec![ALL_TABLES.to_string()]),
            skip_tables: Some(Vec::new()),
        }
    }

    /// Stack `upper` on top of `self`; set fields in `upper` win.
    pub fn merge(self, upper: OptionLayer) -> OptionLayer {
        OptionLayer {
            primary_key: upper.primary_key.or(self.primary_key),
            timestamp_key: upper.timestamp_key.or(self.timestamp_key),
            delete: upper.delete.or(self.delete),
            apply: upper.apply.or(self.apply),
            force: upper.force.or(self.force),
            two_way: upper.two_way.or(self.two_way),
            read_lock: upper.read_lock.or(self.read_lock),
            write_lock: upper.write_lock.or(self.write_lock),
            ignore_errors: upper.ignore_errors.or(self.ignore_errors),
            progress: upper.progress.or(self.progress),
            tables: upper.tables.or(self.tables),
            skip_tables: upper.skip_tables.or(self.skip_tables),
        }
    }
}

/// `[repair.tables.<name>]`
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct TableRepairConfig {
    pub derive_timestamp: Option<bool>,
    pub null_sentinels: Option<bool>,
}

/// `[repair]`
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct RepairConfig {
    pub sentinel: Option<String>,
    pub null_sentinels: Option<bool>,
    pub tables: BTreeMap<String, TableRepairConfig>,
}

impl RepairConfig {
    /// Build the policy. Tables listed in the file are added to the built-in
    /// `nodes_info` entry, or override it when they name the same table.
    pub fn to_policy(&self) -> RepairPolicy {
        let mut policy = RepairPolicy::default();
        if let Some(sentinel) = &self.sentinel {
            policy.sentinel = sentinel.clone();
        }
        if let Some(null_sentinels) = self.null_sentinels {
            policy.fallback.null_sentinels = null_sentinels;
            for rule in policy.tables.values_mut() {
                rule.null_sentinels = null_sentinels;
            }
        }
        for (table, cfg) in &self.tables {
            let base = policy.rule_for(table).clone();
            policy.tables.insert(
                table.clone(),
                TableRepair {
                    derive_timestamp: cfg.derive_timestamp.unwrap_or(true),
                    null_sentinels: cfg.null_sentinels.unwrap_or(base.null_sentinels),
                },
            );
        }
        policy
    }
}

/// Contents of the TOML configuration file.
///
/// ```toml
/// [source]
/// uri = "mysql://repl@db-primary/inventory"
/// password = "..."
///
/// [target]
/// uri = "mysql://repl@db-branch/inventory"
///
/// [sync]
/// delete = true
/// skip_tables = ["audit_log"]
///
/// [repair.tables.nodes_info]
/// derive_timestamp = true
/// ```
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub source: EndpointConfig,
    pub target: EndpointConfig,
    pub sync: OptionLayer,
    pub repair: RepairConfig,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {:?}", path))?;
        Self::parse(&contents).with_context(|| format!("Failed to parse config file {:?}", path))
    }

    pub fn parse(contents: &str) -> Result<Self> {
        let config: FileConfig = toml::from_str(contents)?;
        Ok(config)
    }

    /// `<config_dir>/table-reconciler/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("table-reconciler").join("config.toml"))
    }

    /// Load the explicit path, or the default path when it exists, or nothing.
    pub fn discover(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        match Self::default_path() {
            Some(path) if path.exists() => {
                tracing::debug!("Using config file {:?}", path);
                Self::load(&path)
            }
            _ => Ok(Self::default()),
        }
    }
}

/// Fully resolved, immutable options for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOptions {
    pub primary_key: String,
    pub timestamp_key: Option<String>,
    pub delete: bool,
    pub apply: bool,
    pub force: bool,
    pub two_way: bool,
    pub read_lock: bool,
    pub write_lock: bool,
    pub ignore_errors: bool,
    pub progress: bool,
    pub tables: Vec<String>,
    pub skip_tables: Vec<String>,
    pub repair: RepairPolicy,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            primary_key: DEFAULT_PRIMARY_KEY.to_string(),
            timestamp_key: Some(DEFAULT_TIMESTAMP_KEY.to_string()),
            delete: false,
            apply: true,
            force: false,
            two_way: false,
            read_lock: false,
            write_lock: false,
            ignore_errors: false,
            progress: false,
            tables: vec![ALL_TABLES.to_string()],
            skip_tables: Vec::new(),
            repair: RepairPolicy::default(),
        }
    }
}

impl SyncOptions {
    /// Layer file and CLI switches over the defaults and resolve them.
    pub fn from_layers(file: OptionLayer, cli: OptionLayer, repair: RepairPolicy) -> Result<Self> {
        let merged = OptionLayer::defaults().merge(file).merge(cli);
        Self::resolve(merged, repair)
    }

    fn resolve(layer: OptionLayer, repair: RepairPolicy) -> Result<Self> {
        let primary_key = layer.primary_key.unwrap_or_default();
        if primary_key.trim().is_empty() {
            bail!("primary key column must not be empty");
        }

        let timestamp_key = layer.timestamp_key.filter(|k| !k.trim().is_empty());
        let mut two_way = layer.two_way.unwrap_or(false);
        if two_way && timestamp_key.is_none() {
            tracing::warn!("Two-way sync needs a timestamp column; falling back to one-way");
            two_way = false;
        }

        let tables = layer.tables.unwrap_or_default();
        if tables.is_empty() {
            bail!("no tables selected (use '*' for all tables)");
        }

        Ok(Self {
            primary_key,
            timestamp_key,
            delete: layer.delete.unwrap_or(false),
            apply: layer.apply.unwrap_or(true),
            force: layer.force.unwrap_or(false),
            two_way,
            read_lock: layer.read_lock.unwrap_or(false),
            write_lock: layer.write_lock.unwrap_or(false),
            ignore_errors: layer.ignore_errors.unwrap_or(false),
            progress: layer.progress.unwrap_or(false),
            tables,
            skip_tables: layer.skip_tables.unwrap_or_default(),
            repair,
        })
    }
}

/// Turn a `--flag` / `--no-flag` pair into a layer value.
pub fn flag_pair(on: bool, off: bool) -> Option<bool> {
    match (on, off) {
        (true, _) => Some(true),
        (false, true) => Some(false),
        (false, false) => None,
    }
}
