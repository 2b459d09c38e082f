//! TOML-based configuration for sensormesh nodes.

use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use sensormesh_core::constants::GATEWAY_ADDRESS;
use sensormesh_core::AUTO;

use crate::error::NodeError;
use crate::gateway::SerialLink;

/// Top-level node configuration loaded from a TOML file.
#[derive(Debug, Default, Deserialize)]
pub struct NodeConfig {
    #[serde(default)]
    pub node: NodeSection,
    #[serde(default)]
    pub radio: RadioSection,
    #[serde(default)]
    pub storage: StorageSection,
    #[serde(default)]
    pub serial: SerialSection,
}

impl NodeConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, NodeError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| NodeError::Config(format!("failed to read config file: {e}")))?;
        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self, NodeError> {
        toml::from_str(s).map_err(|e| NodeError::Config(format!("failed to parse config: {e}")))
    }
}

/// The `[node]` section.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct NodeSection {
    /// Fixed node id. Omit to request one from the gateway; 0 makes this
    /// node the gateway.
    pub id: Option<u8>,
    /// Whether this node relays frames for its children.
    pub repeater: bool,
    /// Fixed parent node id. Omit for automatic parent discovery.
    pub parent: Option<u8>,
}

impl Default for NodeSection {
    fn default() -> Self {
        NodeSection {
            id: None,
            repeater: false,
            parent: None,
        }
    }
}

impl NodeSection {
    /// The node id to boot with (`AUTO` when unset).
    #[must_use]
    pub fn node_id(&self) -> u8 {
        self.id.unwrap_or(AUTO)
    }

    /// The parent to boot with (`AUTO` when unset).
    #[must_use]
    pub fn parent_id(&self) -> u8 {
        self.parent.unwrap_or(AUTO)
    }
}

/// The `[radio]` section.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct RadioSection {
    /// Multicast group shared by every node of the mesh.
    pub group: Ipv4Addr,
    pub port: u16,
}

impl Default for RadioSection {
    fn default() -> Self {
        RadioSection {
            group: Ipv4Addr::new(239, 255, 42, 99),
            port: 52056,
        }
    }
}

/// The `[storage]` section.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct StorageSection {
    /// Backing file for the persistent byte image. Defaults to
    /// `~/.sensormesh/eeprom.bin`.
    pub path: Option<PathBuf>,
}

impl StorageSection {
    /// Resolve the backing file path.
    pub fn resolve(&self) -> Result<PathBuf, NodeError> {
        if let Some(path) = &self.path {
            return Ok(path.clone());
        }
        let home = dirs::home_dir()
            .ok_or_else(|| NodeError::Config("could not determine home directory".into()))?;
        Ok(home.join(".sensormesh").join("eeprom.bin"))
    }
}

/// The `[serial]` section: the controller-facing serial channel.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SerialSection {
    /// Attach the serial channel. Defaults to on for the gateway and off
    /// for every other node.
    pub enabled: Option<bool>,
    /// Append protocol lines to this file instead of stdout.
    pub path: Option<PathBuf>,
}

impl SerialSection {
    /// Whether the channel should be attached for this node id.
    #[must_use]
    pub fn enabled_for(&self, node_id: u8) -> bool {
        self.enabled.unwrap_or(node_id == GATEWAY_ADDRESS)
    }

    /// Open the configured sink.
    pub fn open(&self) -> Result<SerialLink, NodeError> {
        match &self.path {
            Some(path) => {
                let file = std::fs::OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)
                    .map_err(|e| {
                        NodeError::Config(format!(
                            "failed to open serial sink {}: {e}",
                            path.display()
                        ))
                    })?;
                Ok(SerialLink::new(Box::new(file)))
            }
            None => Ok(SerialLink::stdout()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_defaults() {
        let config = NodeConfig::parse("").unwrap();
        assert_eq!(config.node.node_id(), AUTO);
        assert_eq!(config.node.parent_id(), AUTO);
        assert!(!config.node.repeater);
        assert_eq!(config.radio.port, 52056);
        assert!(config.radio.group.is_multicast());
        // Serial defaults to gateway-only.
        assert!(config.serial.enabled_for(GATEWAY_ADDRESS));
        assert!(!config.serial.enabled_for(5));
    }

    #[test]
    fn test_full_config() {
        let config = NodeConfig::parse(
            r#"
            [node]
            id = 7
            repeater = true
            parent = 3

            [radio]
            group = "239.1.2.3"
            port = 40000

            [storage]
            path = "/tmp/mesh.bin"

            [serial]
            enabled = true
            path = "/tmp/mesh-serial.log"
            "#,
        )
        .unwrap();
        assert_eq!(config.node.node_id(), 7);
        assert!(config.node.repeater);
        assert_eq!(config.node.parent_id(), 3);
        assert_eq!(config.radio.group, Ipv4Addr::new(239, 1, 2, 3));
        assert_eq!(config.radio.port, 40000);
        assert_eq!(
            config.storage.resolve().unwrap(),
            PathBuf::from("/tmp/mesh.bin")
        );
        assert!(config.serial.enabled_for(7));
        assert_eq!(
            config.serial.path.as_deref(),
            Some(std::path::Path::new("/tmp/mesh-serial.log"))
        );
    }

    #[test]
    fn test_serial_can_be_disabled_on_the_gateway() {
        let config = NodeConfig::parse("[serial]\nenabled = false").unwrap();
        assert!(!config.serial.enabled_for(GATEWAY_ADDRESS));
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        assert!(NodeConfig::parse("[node").is_err());
        assert!(NodeConfig::parse("[node]\nid = 999").is_err());
    }
}
