//! Infrastructure layer: settings, topology/catalog files and engine bootstrap.

pub mod bootstrap;
pub mod error;
pub mod files;
pub mod settings;

pub use bootstrap::{bootstrap, bootstrap_with};
pub use error::InfraError;
pub use files::{load_catalog, load_topology, parse_catalog, parse_topology};
pub use settings::{DataPaths, Settings};
