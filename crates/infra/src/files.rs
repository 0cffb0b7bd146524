//! Topology and catalog files.
//!
//! Both are plain serde documents; the format follows the file extension (TOML, JSON, YAML).
//! Parsing only checks shape. Use [`RuleGraph::load`](wms_routing::RuleGraph::load) and
//! [`InMemoryCatalog::from_data`](wms_fulfillment::InMemoryCatalog::from_data) to validate.

use config::{Config, File, FileFormat};
use serde::de::DeserializeOwned;
use tracing::debug;

use wms_fulfillment::CatalogData;
use wms_routing::Topology;

use crate::error::InfraError;

pub fn load_topology(path: &str) -> Result<Topology, InfraError> {
    read("topology", path, File::with_name(path).required(true))
}

pub fn load_catalog(path: &str) -> Result<CatalogData, InfraError> {
    read("catalog", path, File::with_name(path).required(true))
}

pub fn parse_topology(contents: &str, format: FileFormat) -> Result<Topology, InfraError> {
    read("topology", "<inline>", File::from_str(contents, format))
}

pub fn parse_catalog(contents: &str, format: FileFormat) -> Result<CatalogData, InfraError> {
    read("catalog", "<inline>", File::from_str(contents, format))
}

fn read<T, S>(what: &'static str, source_name: &str, source: S) -> Result<T, InfraError>
where
    T: DeserializeOwned,
    S: config::Source + Send + Sync + 'static,
{
    let value = Config::builder()
        .add_source(source)
        .build()
        .and_then(|config| config.try_deserialize())
        .map_err(|error| InfraError::File {
            what,
            source_name: source_name.to_string(),
            error,
        })?;
    debug!(what, source = source_name, "loaded");
    Ok(value)
}
