//! Configuration loading from TOML files
//!
//! Config file is selected via:
//! 1. --config <path> command line argument
//! 2. CONFIG_FILE environment variable
//! 3. Default: config/dev.toml

use anyhow::Context;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GateMode {
    /// Log-only actuator, no hardware attached
    Sim,
    /// HTTP relay actuator
    Relay,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct SiteConfig {
    #[serde(default = "default_site_id")]
    pub id: String,
}

fn default_site_id() -> String {
    "smartpark".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct GridConfig {
    pub floors: u8,
    pub spots_per_floor: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PricingConfig {
    /// IQD per started hour
    pub hourly_rate: u64,
    /// IQD floor, charged even for drive-through stays
    pub minimum_charge: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TimingConfig {
    pub gate_auto_close_secs: u64,
    pub min_stay_minutes: u64,
    #[serde(default = "default_entry_settle_ms")]
    pub entry_settle_ms: u64,
    #[serde(default = "default_outgoing_display_ms")]
    pub outgoing_display_ms: u64,
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
}

fn default_entry_settle_ms() -> u64 {
    1000
}

fn default_outgoing_display_ms() -> u64 {
    3000
}

fn default_tick_interval_ms() -> u64 {
    250
}

#[derive(Debug, Clone, Deserialize)]
pub struct DetectionConfig {
    pub interval_ms: u64,
    pub min_confidence: f64,
    pub auto_accept_confidence: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GateConfig {
    pub mode: GateMode,
    #[serde(default)]
    pub entry_url: String,
    #[serde(default)]
    pub exit_url: String,
    #[serde(default = "default_gate_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_gate_timeout_ms() -> u64 {
    2000
}

#[derive(Debug, Clone, Deserialize)]
pub struct SimulationConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_simulation_interval_ms")]
    pub interval_ms: u64,
    #[serde(default = "default_auto_confirm")]
    pub auto_confirm: bool,
    #[serde(default = "default_confirm_delay_ms")]
    pub confirm_delay_ms: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_ms: default_simulation_interval_ms(),
            auto_confirm: default_auto_confirm(),
            confirm_delay_ms: default_confirm_delay_ms(),
        }
    }
}

fn default_simulation_interval_ms() -> u64 {
    15000
}

fn default_auto_confirm() -> bool {
    true
}

fn default_confirm_delay_ms() -> u64 {
    2000
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct PersistenceConfig {
    /// Directory for the spots snapshot and activity ledger.
    /// Absent -> in-memory store.
    #[serde(default)]
    pub data_dir: Option<String>,
    #[serde(default = "default_log_cap")]
    pub log_cap: usize,
}

fn default_log_cap() -> usize {
    50
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_metrics_interval_secs")]
    pub interval_secs: u64,
}

fn default_metrics_interval_secs() -> u64 {
    10
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { interval_secs: default_metrics_interval_secs() }
    }
}

/// Raw TOML mirror, flattened into `Config` after parsing
#[derive(Debug, Clone, Deserialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub site: SiteConfig,
    pub grid: GridConfig,
    pub pricing: PricingConfig,
    pub timing: TimingConfig,
    pub detection: DetectionConfig,
    pub gate: GateConfig,
    #[serde(default)]
    pub simulation: SimulationConfig,
    #[serde(default)]
    pub persistence: PersistenceConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Main configuration struct used throughout the application
#[derive(Debug, Clone)]
pub struct Config {
    site_id: String,
    floors: u8,
    spots_per_floor: u16,
    hourly_rate: u64,
    minimum_charge: u64,
    gate_auto_close_secs: u64,
    min_stay_minutes: u64,
    entry_settle_ms: u64,
    outgoing_display_ms: u64,
    tick_interval_ms: u64,
    detection_interval_ms: u64,
    min_confidence: f64,
    auto_accept_confidence: f64,
    gate_mode: GateMode,
    gate_entry_url: String,
    gate_exit_url: String,
    gate_timeout_ms: u64,
    simulation_enabled: bool,
    simulation_interval_ms: u64,
    simulation_auto_confirm: bool,
    simulation_confirm_delay_ms: u64,
    data_dir: Option<String>,
    log_cap: usize,
    metrics_interval_secs: u64,
    config_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            site_id: "smartpark".to_string(),
            floors: 2,
            spots_per_floor: 50,
            hourly_rate: 2000,
            minimum_charge: 2000,
            gate_auto_close_secs: 5,
            min_stay_minutes: 3,
            entry_settle_ms: 1000,
            outgoing_display_ms: 3000,
            tick_interval_ms: 250,
            detection_interval_ms: 2000,
            min_confidence: 0.40,
            auto_accept_confidence: 0.75,
            gate_mode: GateMode::Sim,
            gate_entry_url: String::new(),
            gate_exit_url: String::new(),
            gate_timeout_ms: 2000,
            simulation_enabled: true,
            simulation_interval_ms: 15000,
            simulation_auto_confirm: true,
            simulation_confirm_delay_ms: 2000,
            data_dir: None,
            log_cap: 50,
            metrics_interval_secs: 10,
            config_file: "default".to_string(),
        }
    }
}

impl Config {
    /// Determine config file path from args or environment
    pub fn resolve_config_path(args: &[String]) -> String {
        for (i, arg) in args.iter().enumerate() {
            if arg == "--config" {
                if let Some(path) = args.get(i + 1) {
                    return path.clone();
                }
            }
            if let Some(path) = arg.strip_prefix("--config=") {
                return path.to_string();
            }
        }

        if let Ok(path) = env::var("CONFIG_FILE") {
            return path;
        }

        "config/dev.toml".to_string()
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let toml_config: TomlConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        anyhow::ensure!(
            toml_config.detection.min_confidence < toml_config.detection.auto_accept_confidence,
            "detection.min_confidence must be below detection.auto_accept_confidence"
        );

        Ok(Self {
            site_id: toml_config.site.id,
            floors: toml_config.grid.floors,
            spots_per_floor: toml_config.grid.spots_per_floor,
            hourly_rate: toml_config.pricing.hourly_rate,
            minimum_charge: toml_config.pricing.minimum_charge,
            gate_auto_close_secs: toml_config.timing.gate_auto_close_secs,
            min_stay_minutes: toml_config.timing.min_stay_minutes,
            entry_settle_ms: toml_config.timing.entry_settle_ms,
            outgoing_display_ms: toml_config.timing.outgoing_display_ms,
            tick_interval_ms: toml_config.timing.tick_interval_ms,
            detection_interval_ms: toml_config.detection.interval_ms,
            min_confidence: toml_config.detection.min_confidence,
            auto_accept_confidence: toml_config.detection.auto_accept_confidence,
            gate_mode: toml_config.gate.mode,
            gate_entry_url: toml_config.gate.entry_url,
            gate_exit_url: toml_config.gate.exit_url,
            gate_timeout_ms: toml_config.gate.timeout_ms,
            simulation_enabled: toml_config.simulation.enabled,
            simulation_interval_ms: toml_config.simulation.interval_ms,
            simulation_auto_confirm: toml_config.simulation.auto_confirm,
            simulation_confirm_delay_ms: toml_config.simulation.confirm_delay_ms,
            data_dir: toml_config.persistence.data_dir,
            log_cap: toml_config.persistence.log_cap,
            metrics_interval_secs: toml_config.metrics.interval_secs,
            config_file: path.display().to_string(),
        })
    }

    /// Load configuration - tries TOML file first, falls back to defaults
    pub fn load(args: &[String]) -> Self {
        let config_path = Self::resolve_config_path(args);

        match Self::from_file(&config_path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Warning: {}. Using defaults.", e);
                Self::default()
            }
        }
    }

    pub fn load_from_path(path: &str) -> Self {
        match Self::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Warning: {}. Using defaults.", e);
                Self::default()
            }
        }
    }

    // Getters for all config fields
    pub fn site_id(&self) -> &str {
        &self.site_id
    }

    pub fn floors(&self) -> u8 {
        self.floors
    }

    pub fn spots_per_floor(&self) -> u16 {
        self.spots_per_floor
    }

    pub fn total_spots(&self) -> usize {
        self.floors as usize * self.spots_per_floor as usize
    }

    pub fn hourly_rate(&self) -> u64 {
        self.hourly_rate
    }

    pub fn minimum_charge(&self) -> u64 {
        self.minimum_charge
    }

    pub fn gate_auto_close_secs(&self) -> u64 {
        self.gate_auto_close_secs
    }

    pub fn min_stay_minutes(&self) -> u64 {
        self.min_stay_minutes
    }

    pub fn entry_settle_ms(&self) -> u64 {
        self.entry_settle_ms
    }

    pub fn outgoing_display_ms(&self) -> u64 {
        self.outgoing_display_ms
    }

    pub fn tick_interval_ms(&self) -> u64 {
        self.tick_interval_ms
    }

    pub fn detection_interval_ms(&self) -> u64 {
        self.detection_interval_ms
    }

    pub fn min_confidence(&self) -> f64 {
        self.min_confidence
    }

    pub fn auto_accept_confidence(&self) -> f64 {
        self.auto_accept_confidence
    }

    pub fn gate_mode(&self) -> &GateMode {
        &self.gate_mode
    }

    pub fn gate_entry_url(&self) -> &str {
        &self.gate_entry_url
    }

    pub fn gate_exit_url(&self) -> &str {
        &self.gate_exit_url
    }

    pub fn gate_timeout_ms(&self) -> u64 {
        self.gate_timeout_ms
    }

    pub fn simulation_enabled(&self) -> bool {
        self.simulation_enabled
    }

    pub fn simulation_interval_ms(&self) -> u64 {
        self.simulation_interval_ms
    }

    pub fn simulation_auto_confirm(&self) -> bool {
        self.simulation_auto_confirm
    }

    pub fn simulation_confirm_delay_ms(&self) -> u64 {
        self.simulation_confirm_delay_ms
    }

    pub fn data_dir(&self) -> Option<&str> {
        self.data_dir.as_deref()
    }

    pub fn log_cap(&self) -> usize {
        self.log_cap
    }

    pub fn metrics_interval_secs(&self) -> u64 {
        self.metrics_interval_secs
    }

    pub fn config_file(&self) -> &str {
        &self.config_file
    }

    /// Builder method for tests and scripted scenarios to set the grid size
    pub fn with_grid(mut self, floors: u8, spots_per_floor: u16) -> Self {
        self.floors = floors;
        self.spots_per_floor = spots_per_floor;
        self
    }

    /// Builder method for tests and scripted scenarios to shrink the entry
    /// settle delay
    pub fn with_entry_settle_ms(mut self, ms: u64) -> Self {
        self.entry_settle_ms = ms;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.floors(), 2);
        assert_eq!(config.spots_per_floor(), 50);
        assert_eq!(config.total_spots(), 100);
        assert_eq!(config.hourly_rate(), 2000);
        assert_eq!(config.minimum_charge(), 2000);
        assert_eq!(config.gate_auto_close_secs(), 5);
        assert_eq!(config.min_stay_minutes(), 3);
        assert_eq!(config.simulation_interval_ms(), 15000);
        assert_eq!(config.min_confidence(), 0.40);
        assert_eq!(config.auto_accept_confidence(), 0.75);
        assert_eq!(config.log_cap(), 50);
        assert!(config.data_dir().is_none());
    }

    #[test]
    fn test_resolve_config_path_default() {
        let args: Vec<String> = vec!["smartpark".to_string()];
        assert_eq!(Config::resolve_config_path(&args), "config/dev.toml");
    }

    #[test]
    fn test_resolve_config_path_from_arg() {
        let args: Vec<String> = vec![
            "smartpark".to_string(),
            "--config".to_string(),
            "config/lot-b.toml".to_string(),
        ];
        assert_eq!(Config::resolve_config_path(&args), "config/lot-b.toml");
    }

    #[test]
    fn test_resolve_config_path_from_arg_equals() {
        let args: Vec<String> =
            vec!["smartpark".to_string(), "--config=config/lot-b.toml".to_string()];
        assert_eq!(Config::resolve_config_path(&args), "config/lot-b.toml");
    }
}
