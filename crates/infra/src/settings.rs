//! Process settings.
//!
//! Sources are layered in this order, later ones winning:
//! 1. built-in defaults ([`EngineConfig::default`], [`LogSettings::default`])
//! 2. `config/engine.toml` (optional)
//! 3. environment variables `WMS_<SECTION>__<KEY>`, e.g. `WMS_ENGINE__AUTO_CONFIRM_SUPPLY=true`

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File, FileFormat};
use serde::Deserialize;

use wms_fulfillment::EngineConfig;
use wms_observability::LogSettings;

use crate::error::InfraError;

pub const DEFAULT_SETTINGS_FILE: &str = "config/engine";
const ENV_PREFIX: &str = "WMS";

/// Where the topology and catalog files live.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DataPaths {
    pub topology: String,
    pub catalog: String,
}

impl Default for DataPaths {
    fn default() -> Self {
        Self {
            topology: "config/topology.toml".to_string(),
            catalog: "config/catalog.toml".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub engine: EngineConfig,
    pub logging: LogSettings,
    pub paths: DataPaths,
}

impl Settings {
    /// Defaults, then `config/engine.toml` if present, then `WMS_*` environment variables.
    pub fn load() -> Result<Self, InfraError> {
        Self::load_from(DEFAULT_SETTINGS_FILE)
    }

    /// Like [`load`](Self::load) with a different settings file (extension optional).
    pub fn load_from(path: &str) -> Result<Self, InfraError> {
        let builder = Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__"),
            );
        Self::build(builder)
    }

    /// Settings from an in-memory TOML document, without environment overrides.
    pub fn from_toml(contents: &str) -> Result<Self, InfraError> {
        Self::build(Config::builder().add_source(File::from_str(contents, FileFormat::Toml)))
    }

    fn build(builder: ConfigBuilder<DefaultState>) -> Result<Self, InfraError> {
        builder
            .build()
            .and_then(|config| config.try_deserialize())
            .map_err(InfraError::Settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use wms_core::{RouteCode, ZoneCode};

    #[test]
    fn empty_document_yields_defaults() {
        let settings = Settings::from_toml("").unwrap();
        assert_eq!(settings, Settings::default());
        assert!(settings.logging.json);
        assert_eq!(settings.engine.customer_zone, ZoneCode::from("ZON09"));
    }

    #[test]
    fn sections_override_individual_keys() {
        let settings = Settings::from_toml(
            r#"
            [engine]
            auto_confirm_supply = true
            lock_retries = 8
            transfer_route = "MOVES"

            [engine.sale]
            route = "EXPRESS"
            target_zone = "ZON05"

            [logging]
            level = "wms_fulfillment=debug"
            json = false

            [paths]
            topology = "/etc/wms/topology.json"
            "#,
        )
        .unwrap();

        assert!(settings.engine.auto_confirm_supply);
        assert_eq!(settings.engine.lock_retries, 8);
        assert_eq!(settings.engine.transfer_route, RouteCode::from("MOVES"));
        assert_eq!(settings.engine.sale.route, RouteCode::from("EXPRESS"));
        assert_eq!(settings.engine.sale.target_zone, ZoneCode::from("ZON05"));
        // untouched keys keep their defaults
        assert_eq!(settings.engine.vendor_zone, ZoneCode::from("ZON08"));
        assert_eq!(settings.logging.level, "wms_fulfillment=debug");
        assert!(!settings.logging.json);
        assert_eq!(settings.paths.topology, "/etc/wms/topology.json");
        assert_eq!(settings.paths.catalog, DataPaths::default().catalog);
    }

    #[test]
    fn malformed_values_are_reported() {
        let err = Settings::from_toml("[engine]\nlock_retries = \"many\"").unwrap_err();
        match err {
            InfraError::Settings(_) => {}
            other => panic!("Expected settings error, got {other:?}"),
        }
    }

    #[test]
    fn missing_settings_file_is_not_an_error() {
        let settings = Settings::load_from("does/not/exist/engine").unwrap();
        assert_eq!(settings.paths, DataPaths::default());
    }
}
