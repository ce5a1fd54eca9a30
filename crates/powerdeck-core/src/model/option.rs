// ── Connection option catalog ──
//
// The fixed set of mutually exclusive internet sources wired to the relay
// board. Loaded once from configuration and never mutated afterwards.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// One selectable internet source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionOption {
    pub id: String,
    pub display_name: String,
    /// Relay port. `0` means "all sources off".
    pub port: u8,
    /// Secondary relay switched together with `port` (amplifier, dish PSU).
    #[serde(default)]
    pub auxiliary_port: Option<u8>,
    /// Seconds to wait after power-on before testing connectivity.
    #[serde(default)]
    pub init_wait_secs: u64,
}

impl ConnectionOption {
    pub fn new(id: &str, display_name: &str, port: u8, init_wait_secs: u64) -> Self {
        Self {
            id: id.to_owned(),
            display_name: display_name.to_owned(),
            port,
            auxiliary_port: None,
            init_wait_secs,
        }
    }

    pub fn with_auxiliary(mut self, port: u8) -> Self {
        self.auxiliary_port = Some(port);
        self
    }

    /// Whether selecting this option powers everything off.
    pub fn is_all_off(&self) -> bool {
        self.port == 0
    }
}

/// Validated, ordered list of connection options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionCatalog {
    options: Vec<ConnectionOption>,
}

impl OptionCatalog {
    /// Build a catalog, rejecting empty or duplicate ids and more than one
    /// all-off entry.
    pub fn new(options: Vec<ConnectionOption>) -> Result<Self, CoreError> {
        if options.is_empty() {
            return Err(CoreError::Config {
                message: "connection option catalog is empty".into(),
            });
        }

        let mut seen = std::collections::HashSet::new();
        for option in &options {
            if option.id.trim().is_empty() {
                return Err(CoreError::Config {
                    message: "connection option with empty id".into(),
                });
            }
            if !seen.insert(option.id.as_str()) {
                return Err(CoreError::Config {
                    message: format!("duplicate connection option id '{}'", option.id),
                });
            }
        }

        if options.iter().filter(|o| o.is_all_off()).count() > 1 {
            return Err(CoreError::Config {
                message: "more than one connection option uses port 0".into(),
            });
        }

        Ok(Self { options })
    }

    /// The catalog wired into the rig's relay board.
    pub fn rig_default() -> Self {
        Self {
            options: vec![
                ConnectionOption::new("cellular", "Cellular", 1, 15),
                ConnectionOption::new("cellular-amp", "Cellular + Amplifier", 1, 15)
                    .with_auxiliary(1),
                ConnectionOption::new("wifi", "WiFi", 2, 10),
                ConnectionOption::new("starlink", "Starlink", 3, 20).with_auxiliary(6),
                ConnectionOption::new("wired", "Wired", 4, 8),
                ConnectionOption::new("none", "None", 0, 0),
            ],
        }
    }

    pub fn get(&self, id: &str) -> Option<&ConnectionOption> {
        self.options.iter().find(|o| o.id == id)
    }

    pub fn options(&self) -> &[ConnectionOption] {
        &self.options
    }

    pub fn into_inner(self) -> Vec<ConnectionOption> {
        self.options
    }
}

impl Default for OptionCatalog {
    fn default() -> Self {
        Self::rig_default()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn default_catalog_is_valid() {
        let catalog = OptionCatalog::rig_default();
        OptionCatalog::new(catalog.clone().into_inner()).unwrap();

        let starlink = catalog.get("starlink").unwrap();
        assert_eq!(starlink.port, 3);
        assert_eq!(starlink.auxiliary_port, Some(6));
        assert_eq!(starlink.init_wait_secs, 20);
        assert!(catalog.get("none").unwrap().is_all_off());
    }

    #[test]
    fn duplicate_ids_rejected() {
        let result = OptionCatalog::new(vec![
            ConnectionOption::new("wifi", "WiFi", 2, 10),
            ConnectionOption::new("wifi", "WiFi again", 3, 10),
        ]);
        assert!(matches!(result, Err(CoreError::Config { .. })));
    }

    #[test]
    fn second_all_off_entry_rejected() {
        let result = OptionCatalog::new(vec![
            ConnectionOption::new("none", "None", 0, 0),
            ConnectionOption::new("off", "Off", 0, 0),
        ]);
        assert!(matches!(result, Err(CoreError::Config { .. })));
    }

    #[test]
    fn blank_id_rejected() {
        let result = OptionCatalog::new(vec![ConnectionOption::new(" ", "Blank", 1, 0)]);
        assert!(result.is_err());
    }
}
