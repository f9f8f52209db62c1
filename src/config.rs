//! Device description files.
//!
//! A routing instance is normally built from a geometry preset. Deployments
//! with unusual arrays (cut-down column counts, remapped host-edge wiring,
//! a different platform back-end) describe the device in a TOML file and
//! build the router from that instead:
//!
//! ```toml
//! # npu.toml
//! [device]
//! columns = 8
//! rows = 6
//! shim_row = 0
//! mem_tile_row_start = 1
//! mem_tile_num_rows = 1
//! aie_tile_row_start = 2
//! aie_tile_num_rows = 4
//! backend = "bare-metal"
//!
//! # Rewire the host edge of column 2: [port, channel] pairs.
//! [[host_edge]]
//! column = 2
//! direction = "host-to-aie"
//! ports = [[5, 0], [6, 1]]
//! ```
//!
//! Everything is optional; an empty file describes the default AIE2 array.
//! A description is validated on parse: row bands must fit the array,
//! host-edge entries must name a real column, and the back-end name must be
//! known. Tools point at a file explicitly with `AIE_ROUTER_CONFIG`, or
//! drop an `aie-router.toml` next to the project.

use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

use crate::backend::BackendKind;
use crate::geometry::DeviceGeometry;
use crate::routing::{HostEdgeConstraint, HostEdgeConstraints, PortChannel};

/// Error loading or validating a device description.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read device description: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse device description: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid device description: {0}")]
    Invalid(String),

    #[error("unknown backend '{0}' (expected bare-metal, socket, or hosted)")]
    UnknownBackend(String),
}

/// The `[device]` table: array dimensions and back-end selection.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DeviceSection {
    pub columns: u8,
    pub rows: u8,
    pub shim_row: u8,
    pub mem_tile_row_start: u8,
    pub mem_tile_num_rows: u8,
    pub aie_tile_row_start: u8,
    pub aie_tile_num_rows: u8,
    /// Platform I/O back-end name; bare-metal when absent
    pub backend: Option<String>,
}

impl Default for DeviceSection {
    fn default() -> Self {
        let geometry = DeviceGeometry::aie2(8);
        Self {
            columns: geometry.num_cols,
            rows: geometry.num_rows,
            shim_row: geometry.shim_row,
            mem_tile_row_start: geometry.mem_tile_row_start,
            mem_tile_num_rows: geometry.mem_tile_num_rows,
            aie_tile_row_start: geometry.aie_tile_row_start,
            aie_tile_num_rows: geometry.aie_tile_num_rows,
            backend: None,
        }
    }
}

/// Which host-edge table a `[[host_edge]]` entry replaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EdgeDirection {
    HostToAie,
    AieToHost,
}

/// A `[[host_edge]]` table: replacement wiring for one shim column.
#[derive(Debug, Clone, Deserialize)]
pub struct HostEdgeSection {
    pub column: u8,
    pub direction: EdgeDirection,
    /// `[port, channel]` pairs, in lookup order
    pub ports: Vec<(u8, u8)>,
}

/// A parsed and validated device description.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    pub device: DeviceSection,
    pub host_edge: Vec<HostEdgeSection>,
}

fn parse_backend(name: &str) -> Option<BackendKind> {
    match name {
        "bare-metal" => Some(BackendKind::BareMetal),
        "socket" => Some(BackendKind::Socket),
        "hosted" => Some(BackendKind::Hosted),
        _ => None,
    }
}

impl DeviceConfig {
    /// Parse and validate a device description.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let config: DeviceConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a device description from a file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        let config = Self::parse(&text)?;
        log::info!("loaded device description from {}", path.display());
        Ok(config)
    }

    /// Find a device description for the current environment.
    ///
    /// `AIE_ROUTER_CONFIG` names a file explicitly; otherwise a
    /// project-local `aie-router.toml` is used when present. `Ok(None)`
    /// means no description was found and a preset should be used.
    pub fn discover() -> Result<Option<Self>, ConfigError> {
        if let Ok(path) = std::env::var("AIE_ROUTER_CONFIG") {
            return Self::from_file(Path::new(&path)).map(Some);
        }
        let local = Path::new("aie-router.toml");
        if local.exists() {
            return Self::from_file(local).map(Some);
        }
        Ok(None)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let d = &self.device;
        if d.columns == 0 || d.rows == 0 {
            return Err(ConfigError::Invalid("array cannot be empty".into()));
        }
        if d.shim_row >= d.rows {
            return Err(ConfigError::Invalid(format!(
                "shim row {} is outside the {}-row array",
                d.shim_row, d.rows
            )));
        }
        if d.mem_tile_row_start as u16 + d.mem_tile_num_rows as u16 > d.rows as u16 {
            return Err(ConfigError::Invalid(format!(
                "memory-tile rows {}..{} exceed the {}-row array",
                d.mem_tile_row_start,
                d.mem_tile_row_start as u16 + d.mem_tile_num_rows as u16,
                d.rows
            )));
        }
        if d.aie_tile_row_start as u16 + d.aie_tile_num_rows as u16 > d.rows as u16 {
            return Err(ConfigError::Invalid(format!(
                "compute-tile rows {}..{} exceed the {}-row array",
                d.aie_tile_row_start,
                d.aie_tile_row_start as u16 + d.aie_tile_num_rows as u16,
                d.rows
            )));
        }
        if let Some(name) = &d.backend {
            parse_backend(name).ok_or_else(|| ConfigError::UnknownBackend(name.clone()))?;
        }
        for edge in &self.host_edge {
            if edge.column >= d.columns {
                return Err(ConfigError::Invalid(format!(
                    "host-edge column {} is outside the {}-column array",
                    edge.column, d.columns
                )));
            }
        }
        Ok(())
    }

    /// The described device geometry.
    pub fn geometry(&self) -> DeviceGeometry {
        let d = &self.device;
        DeviceGeometry::new(
            d.columns,
            d.rows,
            d.shim_row,
            d.mem_tile_row_start,
            d.mem_tile_num_rows,
            d.aie_tile_row_start,
            d.aie_tile_num_rows,
        )
    }

    /// The described platform I/O back-end.
    pub fn backend_kind(&self) -> BackendKind {
        self.device
            .backend
            .as_deref()
            .and_then(parse_backend)
            .unwrap_or(BackendKind::BareMetal)
    }

    /// The `[[host_edge]]` entries as engine host-edge constraints.
    pub fn host_edge_constraints(&self) -> HostEdgeConstraints {
        HostEdgeConstraints {
            constraints: self
                .host_edge
                .iter()
                .map(|edge| HostEdgeConstraint {
                    column: edge.column,
                    host_to_aie: edge.direction == EdgeDirection::HostToAie,
                    mappings: edge
                        .ports
                        .iter()
                        .map(|&(port, channel)| PortChannel::new(port, channel))
                        .collect(),
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_description_is_default_array() {
        let config = DeviceConfig::parse("").unwrap();
        assert_eq!(config.geometry(), DeviceGeometry::aie2(8));
        assert_eq!(config.backend_kind(), BackendKind::BareMetal);
        assert!(config.host_edge_constraints().constraints.is_empty());
    }

    #[test]
    fn test_custom_geometry() {
        let config = DeviceConfig::parse(
            r#"
            [device]
            columns = 36
            rows = 4
            mem_tile_row_start = 1
            mem_tile_num_rows = 1
            aie_tile_row_start = 2
            aie_tile_num_rows = 2
            backend = "hosted"
            "#,
        )
        .unwrap();
        let geometry = config.geometry();
        assert_eq!(geometry.num_cols, 36);
        assert_eq!(geometry.num_rows, 4);
        assert_eq!(config.backend_kind(), BackendKind::Hosted);
    }

    #[test]
    fn test_host_edge_conversion() {
        let config = DeviceConfig::parse(
            r#"
            [[host_edge]]
            column = 2
            direction = "host-to-aie"
            ports = [[5, 0], [6, 1]]

            [[host_edge]]
            column = 2
            direction = "aie-to-host"
            ports = [[4, 0]]
            "#,
        )
        .unwrap();
        let constraints = config.host_edge_constraints();
        assert_eq!(constraints.constraints.len(), 2);
        let first = &constraints.constraints[0];
        assert_eq!(first.column, 2);
        assert!(first.host_to_aie);
        assert_eq!(first.mappings[0].port, 5);
        assert_eq!(first.mappings[1].channel, 1);
        assert!(!constraints.constraints[1].host_to_aie);
    }

    #[test]
    fn test_row_bands_must_fit() {
        let err = DeviceConfig::parse(
            r#"
            [device]
            rows = 4
            aie_tile_row_start = 2
            aie_tile_num_rows = 4
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = DeviceConfig::parse("[device]\nshim_row = 9\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_unknown_backend_rejected() {
        let err = DeviceConfig::parse("[device]\nbackend = \"pcie\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::UnknownBackend(name) if name == "pcie"));
    }

    #[test]
    fn test_host_edge_column_must_exist() {
        let err = DeviceConfig::parse(
            r#"
            [device]
            columns = 4

            [[host_edge]]
            column = 9
            direction = "aie-to-host"
            ports = [[2, 0]]
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }
}
