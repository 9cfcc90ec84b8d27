//! Configuration loading and management

use anyhow::{Context, Result, bail};
use planning_poster_adapters::{map::MapSettings, source, x};
use planning_poster_domain::{CutoffPolicy, usecases::FormatConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use time::Date;
use time::macros::format_description;

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub source: SourceConfig,

    #[serde(default)]
    pub cutoff: CutoffConfig,

    #[serde(default)]
    pub format: FormatSection,

    #[serde(default)]
    pub map: MapConfig,

    #[serde(default)]
    pub x: XConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    #[serde(default = "default_state_db_path")]
    pub state_db_path: PathBuf,

    #[serde(default = "default_true")]
    pub dry_run: bool,

    #[serde(default)]
    pub abort_on_publish_error: bool,

    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    #[serde(default = "default_source_base_url")]
    pub base_url: String,

    #[serde(default = "default_dataset")]
    pub dataset: String,

    #[serde(default = "default_limit")]
    pub limit: usize,

    #[serde(default = "default_order_by")]
    pub order_by: String,

    #[serde(default = "default_app_token_env")]
    pub app_token_env: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CutoffConfig {
    /// yesterday_if_empty, fixed or none
    #[serde(default = "default_cutoff_policy")]
    pub policy: String,

    /// YYYY-MM-DD, required by the fixed policy
    #[serde(default)]
    pub date: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormatSection {
    #[serde(default = "default_address_max_chars")]
    pub address_max_chars: usize,

    #[serde(default = "default_ellipsis")]
    pub ellipsis: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_tile_url_template")]
    pub tile_url_template: String,

    #[serde(default = "default_zoom")]
    pub zoom: u8,

    #[serde(default = "default_width")]
    pub width: u32,

    #[serde(default = "default_height")]
    pub height: u32,

    #[serde(default)]
    pub marker_icon: Option<PathBuf>,

    #[serde(default = "default_marker_offset_x")]
    pub marker_offset_x: i64,

    #[serde(default = "default_marker_offset_y")]
    pub marker_offset_y: i64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct XConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_x_user_token_env")]
    pub user_token_env: String,

    #[serde(default = "default_x_base_url")]
    pub base_url: String,
}

// Default value functions
fn default_state_db_path() -> PathBuf {
    PathBuf::from("./state.sqlite")
}

fn default_true() -> bool {
    true
}

fn default_poll_interval() -> u64 {
    600
}

fn default_source_base_url() -> String {
    source::DEFAULT_BASE_URL.to_string()
}

fn default_dataset() -> String {
    source::DEFAULT_DATASET.to_string()
}

fn default_limit() -> usize {
    200
}

fn default_order_by() -> String {
    source::DEFAULT_ORDER.to_string()
}

fn default_app_token_env() -> String {
    "SOCRATA_APP_TOKEN".to_string()
}

fn default_cutoff_policy() -> String {
    "yesterday_if_empty".to_string()
}

fn default_address_max_chars() -> usize {
    FormatConfig::default().address_max_chars
}

fn default_ellipsis() -> String {
    FormatConfig::default().ellipsis
}

fn default_tile_url_template() -> String {
    MapSettings::default().tile_url_template
}

fn default_zoom() -> u8 {
    MapSettings::default().zoom
}

fn default_width() -> u32 {
    MapSettings::default().width
}

fn default_height() -> u32 {
    MapSettings::default().height
}

fn default_marker_offset_x() -> i64 {
    MapSettings::default().marker_offset.0
}

fn default_marker_offset_y() -> i64 {
    MapSettings::default().marker_offset.1
}

fn default_user_agent() -> String {
    MapSettings::default().user_agent
}

fn default_x_user_token_env() -> String {
    "X_USER_TOKEN".to_string()
}

fn default_x_base_url() -> String {
    x::DEFAULT_BASE_URL.to_string()
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            state_db_path: default_state_db_path(),
            dry_run: default_true(),
            abort_on_publish_error: false,
            poll_interval_secs: default_poll_interval(),
        }
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: default_source_base_url(),
            dataset: default_dataset(),
            limit: default_limit(),
            order_by: default_order_by(),
            app_token_env: default_app_token_env(),
        }
    }
}

impl Default for CutoffConfig {
    fn default() -> Self {
        Self {
            policy: default_cutoff_policy(),
            date: None,
        }
    }
}

impl Default for FormatSection {
    fn default() -> Self {
        Self {
            address_max_chars: default_address_max_chars(),
            ellipsis: default_ellipsis(),
        }
    }
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            tile_url_template: default_tile_url_template(),
            zoom: default_zoom(),
            width: default_width(),
            height: default_height(),
            marker_icon: None,
            marker_offset_x: default_marker_offset_x(),
            marker_offset_y: default_marker_offset_y(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for XConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            user_token_env: default_x_user_token_env(),
            base_url: default_x_base_url(),
        }
    }
}

impl CutoffConfig {
    pub fn to_policy(&self) -> Result<CutoffPolicy> {
        match self.policy.trim() {
            "yesterday_if_empty" => Ok(CutoffPolicy::YesterdayIfEmpty),
            "none" => Ok(CutoffPolicy::None),
            "fixed" => {
                let Some(raw) = self.date.as_deref() else {
                    bail!("Cutoff policy 'fixed' requires cutoff.date");
                };
                let date = Date::parse(raw.trim(), format_description!("[year]-[month]-[day]"))
                    .with_context(|| format!("Invalid cutoff.date: {}", raw))?;
                Ok(CutoffPolicy::Fixed(date))
            }
            other => bail!("Invalid cutoff policy: {}", other),
        }
    }
}

impl FormatSection {
    pub fn to_format_config(&self) -> FormatConfig {
        FormatConfig {
            address_max_chars: self.address_max_chars,
            ellipsis: self.ellipsis.clone(),
        }
    }
}

impl MapConfig {
    pub fn to_settings(&self) -> MapSettings {
        MapSettings {
            tile_url_template: self.tile_url_template.clone(),
            zoom: self.zoom,
            width: self.width,
            height: self.height,
            marker_icon: self.marker_icon.clone(),
            marker_offset: (self.marker_offset_x, self.marker_offset_y),
            user_agent: self.user_agent.clone(),
        }
    }
}

impl AppConfig {
    /// Load configuration from file and environment
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();

        // Try default config path if none specified
        let default_path = PathBuf::from("./config.toml");
        let path = config_path.unwrap_or(&default_path);

        if path.exists() {
            builder = builder.add_source(config::File::from(path));
        } else if config_path.is_some() {
            // User specified a path that doesn't exist
            bail!("Config file not found: {}", path.display());
        }

        // Add environment variable overrides
        builder = builder.add_source(
            config::Environment::with_prefix("PLANNING_POSTER")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build().context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// Generate example configuration as TOML string
    pub fn example_toml() -> String {
        r#"# planning-poster configuration

[general]
state_db_path = "./state.sqlite"
dry_run = true
# Stop the whole run on the first failed publish
abort_on_publish_error = false
# Used by `run --watch`
poll_interval_secs = 600

[source]
base_url = "https://opendata.camden.gov.uk"
dataset = "2eiu-s2cw"
limit = 200
order_by = "registered_date DESC"
app_token_env = "SOCRATA_APP_TOKEN"

[cutoff]
policy = "yesterday_if_empty"  # yesterday_if_empty, fixed, none
# date = "2024-01-01"          # required by "fixed"

[format]
address_max_chars = 36
ellipsis = "…"

[map]
enabled = true
tile_url_template = "https://tile.openstreetmap.org/{z}/{x}/{y}.png"
zoom = 17
width = 1200
height = 630
# marker_icon = "./marker.png"
marker_offset_x = 18
marker_offset_y = 30

[x]
enabled = false
user_token_env = "X_USER_TOKEN"
base_url = "https://api.x.com"
"#
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    #[test]
    fn test_example_toml_parses_to_defaults() {
        let config: AppConfig = toml::from_str(&AppConfig::example_toml()).unwrap();

        assert!(config.general.dry_run);
        assert_eq!(config.source.limit, 200);
        assert_eq!(config.source.dataset, "2eiu-s2cw");
        assert_eq!(config.format.address_max_chars, 36);
        assert_eq!(config.format.ellipsis, "…");
        assert_eq!(config.map.zoom, 17);
        assert_eq!(
            config.cutoff.to_policy().unwrap(),
            CutoffPolicy::YesterdayIfEmpty
        );
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: AppConfig = toml::from_str("").unwrap();

        assert_eq!(config.general.state_db_path, PathBuf::from("./state.sqlite"));
        assert!(!config.x.enabled);
        assert_eq!(config.map.to_settings().marker_offset, (18, 30));
    }

    #[test]
    fn test_cutoff_policy_parsing() {
        let fixed = CutoffConfig {
            policy: "fixed".to_string(),
            date: Some("2024-01-15".to_string()),
        };
        assert_eq!(
            fixed.to_policy().unwrap(),
            CutoffPolicy::Fixed(date!(2024 - 01 - 15))
        );

        let none = CutoffConfig {
            policy: "none".to_string(),
            date: None,
        };
        assert_eq!(none.to_policy().unwrap(), CutoffPolicy::None);

        let missing_date = CutoffConfig {
            policy: "fixed".to_string(),
            date: None,
        };
        assert!(missing_date.to_policy().is_err());

        let unknown = CutoffConfig {
            policy: "sometimes".to_string(),
            date: None,
        };
        assert!(unknown.to_policy().is_err());
    }
}
