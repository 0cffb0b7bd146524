//! Engine bootstrap: settings → logging → topology + catalog → engine.

use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use wms_fulfillment::{CatalogData, EngineConfig, FulfillmentEngine, InMemoryCatalog};
use wms_routing::{RuleGraph, Topology};

use crate::files::{load_catalog, load_topology};
use crate::settings::Settings;

/// Load settings from the default sources, install logging and build the engine.
pub fn bootstrap() -> anyhow::Result<FulfillmentEngine> {
    let settings = Settings::load().context("loading settings")?;
    wms_observability::init_with(&settings.logging);
    bootstrap_with(&settings)
}

/// Build the engine from already loaded settings. Logging is left untouched.
pub fn bootstrap_with(settings: &Settings) -> anyhow::Result<FulfillmentEngine> {
    let topology = load_topology(&settings.paths.topology)
        .with_context(|| format!("reading topology {}", settings.paths.topology))?;
    let catalog = load_catalog(&settings.paths.catalog)
        .with_context(|| format!("reading catalog {}", settings.paths.catalog))?;
    assemble(settings.engine.clone(), topology, catalog)
}

pub(crate) fn assemble(
    config: EngineConfig,
    topology: Topology,
    catalog: CatalogData,
) -> anyhow::Result<FulfillmentEngine> {
    let graph = RuleGraph::load(topology).context("validating topology")?;
    let catalog = InMemoryCatalog::from_data(catalog).context("validating catalog")?;
    let engine =
        FulfillmentEngine::new(config, graph, Arc::new(catalog)).context("starting fulfillment engine")?;
    info!(
        topology_version = engine.graph().version(),
        "engine bootstrapped"
    );
    Ok(engine)
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::path::PathBuf;

    use config::FileFormat;
    use wms_core::{RouteCode, ZoneCode};
    use wms_fulfillment::ProcessRoute;

    use crate::files::{parse_catalog, parse_topology};
    use crate::settings::DataPaths;

    const TOPOLOGY: &str = r#"
        zones = [{ code = "ZON01" }, { code = "ZON07" }, { code = "ZON08" }, { code = "ZON09" }]
        locations = [
            { code = "L01", zones = ["ZON01"] },
            { code = "L07", zones = ["ZON07"] },
            { code = "L08", zones = ["ZON08"] },
            { code = "L09", zones = ["ZON09"] },
        ]
        routes = [{ code = "SALES", name = "Sales" }]
        rules = [
            { code = "PICK", route = "SALES", source = "ZON01", target = "ZON09", action = "pull" },
            { code = "BUY", route = "SALES", source = "ZON08", target = "ZON01", action = "buy" },
        ]
    "#;

    const CATALOG: &str = r#"
        [[items]]
        code = "WIDGET"
        vendor = "ACME"
    "#;

    fn config() -> EngineConfig {
        EngineConfig {
            purchase: ProcessRoute::new("SALES", "ZON01"),
            returns: ProcessRoute::new("SALES", "ZON01"),
            manufacturing: ProcessRoute::new("SALES", "ZON07"),
            transfer_route: RouteCode::from("SALES"),
            ..EngineConfig::default()
        }
    }

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("wms-infra-{}-{name}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn assembles_an_engine_from_documents() {
        let topology = parse_topology(TOPOLOGY, FileFormat::Toml).unwrap();
        let catalog = parse_catalog(CATALOG, FileFormat::Toml).unwrap();
        let engine = assemble(config(), topology, catalog).unwrap();

        assert_eq!(engine.graph().version(), 1);
        assert_eq!(engine.config().customer_zone, ZoneCode::from("ZON09"));
    }

    #[test]
    fn unknown_configured_zone_fails_with_context() {
        let topology = parse_topology(TOPOLOGY, FileFormat::Toml).unwrap();
        let catalog = parse_catalog(CATALOG, FileFormat::Toml).unwrap();
        let config = EngineConfig {
            production_zone: ZoneCode::from("ZON42"),
            ..config()
        };

        let err = assemble(config, topology, catalog).err().unwrap();
        assert_eq!(err.to_string(), "starting fulfillment engine");
        assert!(format!("{err:#}").contains("ZON42"));
    }

    #[test]
    fn bootstraps_from_files_on_disk() {
        let dir = scratch_dir("files");
        let topology = dir.join("topology.toml");
        let catalog = dir.join("catalog.toml");
        std::fs::write(&topology, TOPOLOGY).unwrap();
        std::fs::write(&catalog, CATALOG).unwrap();

        let settings = Settings {
            engine: config(),
            paths: DataPaths {
                topology: topology.to_string_lossy().into_owned(),
                catalog: catalog.to_string_lossy().into_owned(),
            },
            ..Settings::default()
        };
        let engine = bootstrap_with(&settings).unwrap();
        assert_eq!(engine.graph().rules().len(), 2);

        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn missing_topology_names_the_path() {
        let settings = Settings {
            paths: DataPaths {
                topology: "does/not/exist/topology.toml".to_string(),
                catalog: "does/not/exist/catalog.toml".to_string(),
            },
            ..Settings::default()
        };
        let err = bootstrap_with(&settings).err().unwrap();
        assert!(err.to_string().contains("does/not/exist/topology.toml"));
    }
}
