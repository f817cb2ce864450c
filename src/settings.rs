use chrono::{FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const SETTINGS_FILE: &str = "reporting.json";

fn default_page() -> i64 {
    1
}

fn default_page_size() -> i64 {
    20
}

fn default_power() -> f64 {
    0.8
}

fn default_baseline_rate() -> f64 {
    0.1
}

fn default_mde() -> f64 {
    0.05
}

fn default_true() -> bool {
    true
}

fn default_route_prefix() -> String {
    "/sitecore/shell/api/ct/".to_string()
}

/// Reporting knobs. Loaded from `{data_dir}/reporting.json`, falling back to
/// defaults overridden by `TESTPULSE_*` environment variables.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReportSettings {
    /// Abort the whole request on configuration errors and duplicate test ids
    /// instead of skipping the record / letting the later entry win.
    #[serde(default)]
    pub strict_mode: bool,
    #[serde(default = "default_page")]
    pub default_page: i64,
    #[serde(default = "default_page_size")]
    pub default_page_size: i64,
    #[serde(default = "default_power")]
    pub required_statistical_power: f64,
    #[serde(default = "default_baseline_rate")]
    pub baseline_conversion_rate: f64,
    #[serde(default = "default_mde")]
    pub minimum_detectable_effect: f64,
    #[serde(default)]
    pub display_offset_minutes: i32,
    #[serde(default = "default_true")]
    pub automatic_testing_enabled: bool,
    #[serde(default = "default_route_prefix")]
    pub command_route_prefix: String,
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            strict_mode: false,
            default_page: default_page(),
            default_page_size: default_page_size(),
            required_statistical_power: default_power(),
            baseline_conversion_rate: default_baseline_rate(),
            minimum_detectable_effect: default_mde(),
            display_offset_minutes: 0,
            automatic_testing_enabled: true,
            command_route_prefix: default_route_prefix(),
        }
    }
}

fn env_flag(name: &str) -> Option<bool> {
    std::env::var(name)
        .ok()
        .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    let raw = std::env::var(name).ok()?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!("Ignoring unparseable {}={:?}", name, raw);
            None
        }
    }
}

impl ReportSettings {
    /// Load settings from {data_dir}/reporting.json or return env-adjusted defaults
    pub fn load_or_default(data_dir: &Path) -> Self {
        let path = data_dir.join(SETTINGS_FILE);

        if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(content) => match serde_json::from_str::<ReportSettings>(&content) {
                    Ok(settings) => {
                        tracing::info!(
                            "Loaded reporting settings: strict_mode={}, default_page_size={}",
                            settings.strict_mode,
                            settings.default_page_size
                        );
                        return settings.with_valid_paging();
                    }
                    Err(e) => {
                        tracing::error!("Failed to parse {}: {}, using defaults", SETTINGS_FILE, e);
                    }
                },
                Err(e) => {
                    tracing::error!("Failed to read {}: {}, using defaults", SETTINGS_FILE, e);
                }
            }
        }

        Self::from_env()
    }

    pub fn from_env() -> Self {
        let mut settings = Self::default();
        if let Some(strict) = env_flag("TESTPULSE_STRICT") {
            settings.strict_mode = strict;
        }
        if let Some(size) = env_parse::<i64>("TESTPULSE_PAGE_SIZE") {
            settings.default_page_size = size;
        }
        if let Some(power) = env_parse::<f64>("TESTPULSE_POWER") {
            settings.required_statistical_power = power;
        }
        if let Some(offset) = env_parse::<i32>("TESTPULSE_DISPLAY_OFFSET_MINUTES") {
            settings.display_offset_minutes = offset;
        }
        if let Some(enabled) = env_flag("TESTPULSE_AUTOMATIC_TESTING") {
            settings.automatic_testing_enabled = enabled;
        }
        settings.with_valid_paging()
    }

    /// Paging defaults below 1 would reject every request that omits them.
    fn with_valid_paging(mut self) -> Self {
        if self.default_page < 1 {
            tracing::warn!(
                "Ignoring defaultPage={}, using {}",
                self.default_page,
                default_page()
            );
            self.default_page = default_page();
        }
        if self.default_page_size < 1 {
            tracing::warn!(
                "Ignoring defaultPageSize={}, using {}",
                self.default_page_size,
                default_page_size()
            );
            self.default_page_size = default_page_size();
        }
        self
    }

    /// Offset used to convert UTC start dates to server display time.
    /// Out-of-range values fall back to UTC.
    pub fn display_offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.display_offset_minutes.saturating_mul(60))
            .unwrap_or_else(|| Utc.fix())
    }
}
