//! Fact gathering: run `show` commands and collect their parsed output.

use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::driver::{CommandResult, Driver};
use crate::error::{Error, ParseError, Result, ValidationError};
use crate::parse::{
    ConfigBody, InventoryNode, IpTable, RfMetrics, RouteTable, Shape, SoftwareFacts, SystemFacts,
    parse_config, parse_inventory, parse_ip, parse_rf, parse_route, parse_software, parse_system,
};
use crate::platform::vendors::etherhaul::PLATFORM_NAME;

/// A group of facts gathered by one command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactSubset {
    System,
    Software,
    Ip,
    Route,
    Inventory,
    Rf,
    /// Running configuration listing.
    Config,
    /// Startup configuration listing.
    ConfigStartup,
}

impl FactSubset {
    /// Every subset, in gathering order.
    pub const ALL: [FactSubset; 8] = [
        FactSubset::System,
        FactSubset::Software,
        FactSubset::Ip,
        FactSubset::Route,
        FactSubset::Inventory,
        FactSubset::Rf,
        FactSubset::Config,
        FactSubset::ConfigStartup,
    ];

    /// The CLI command that produces this subset.
    pub fn command(self) -> &'static str {
        match self {
            FactSubset::System => "show system",
            FactSubset::Software => "show sw",
            FactSubset::Ip => "show ip",
            FactSubset::Route => "show route",
            FactSubset::Inventory => "show inventory",
            FactSubset::Rf => "show rf",
            FactSubset::Config => "copy running-configuration display",
            FactSubset::ConfigStartup => "copy startup-configuration display",
        }
    }

    /// The output shape of [`command`](Self::command).
    pub fn shape(self) -> Shape {
        match self {
            FactSubset::System => Shape::System,
            FactSubset::Software => Shape::Software,
            FactSubset::Ip => Shape::IpTable,
            FactSubset::Route => Shape::RouteTable,
            FactSubset::Inventory => Shape::Inventory,
            FactSubset::Rf => Shape::Rf,
            FactSubset::Config | FactSubset::ConfigStartup => Shape::Config,
        }
    }

    fn is_config(self) -> bool {
        matches!(self, FactSubset::Config | FactSubset::ConfigStartup)
    }

    /// Resolve a list of subset names.
    ///
    /// `all` stands for every subset except the two configuration listings,
    /// which are only gathered when named. Duplicates are dropped; order
    /// follows first mention.
    pub fn parse_list<S: AsRef<str>>(
        names: &[S],
    ) -> std::result::Result<Vec<FactSubset>, ValidationError> {
        let mut subsets = Vec::new();

        for name in names {
            let name = name.as_ref().trim();
            let expanded: Vec<FactSubset> = if name.eq_ignore_ascii_case("all") {
                Self::ALL.into_iter().filter(|s| !s.is_config()).collect()
            } else {
                vec![name.parse()?]
            };

            for subset in expanded {
                if !subsets.contains(&subset) {
                    subsets.push(subset);
                }
            }
        }

        Ok(subsets)
    }
}

impl fmt::Display for FactSubset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FactSubset::System => "system",
            FactSubset::Software => "software",
            FactSubset::Ip => "ip",
            FactSubset::Route => "route",
            FactSubset::Inventory => "inventory",
            FactSubset::Rf => "rf",
            FactSubset::Config => "config",
            FactSubset::ConfigStartup => "config_startup",
        };
        f.write_str(name)
    }
}

impl FromStr for FactSubset {
    type Err = ValidationError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|subset| subset.to_string().eq_ignore_ascii_case(s))
            .ok_or_else(|| ValidationError::UnknownSubset(s.to_string()))
    }
}

/// Parsed facts, one optional slot per subset.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FactsBundle {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<SystemFacts>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub software: Option<SoftwareFacts>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip: Option<IpTable>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route: Option<RouteTable>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inventory: Option<InventoryNode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rf: Option<RfMetrics>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<ConfigBody>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_startup: Option<ConfigBody>,

    /// Subsets that could not be gathered.
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub errors: IndexMap<FactSubset, ParseError>,
}

impl FactsBundle {
    fn store(&mut self, subset: FactSubset, text: &str) -> std::result::Result<(), ParseError> {
        match subset {
            FactSubset::System => self.system = Some(parse_system(text)?),
            FactSubset::Software => self.software = Some(parse_software(text)?),
            FactSubset::Ip => self.ip = Some(parse_ip(text)?),
            FactSubset::Route => self.route = Some(parse_route(text)?),
            FactSubset::Inventory => self.inventory = Some(parse_inventory(text)?),
            FactSubset::Rf => self.rf = Some(parse_rf(text)?),
            FactSubset::Config => self.config = Some(parse_config(text)?),
            FactSubset::ConfigStartup => self.config_startup = Some(parse_config(text)?),
        }
        Ok(())
    }
}

/// Gather the requested subsets.
///
/// A subset whose command the device rejects, or whose output does not
/// parse, is recorded in [`FactsBundle::errors`] and the rest are still
/// gathered. Timeouts and transport errors stop gathering.
pub async fn gather_facts<D: Driver>(driver: &mut D, subsets: &[FactSubset]) -> Result<FactsBundle> {
    let mut bundle = FactsBundle::default();

    for &subset in subsets {
        let response = driver.send_command(subset.command()).await?;

        let stored = match &response.failure_message {
            Some(message) => Err(ParseError::new(
                subset.shape(),
                format!("device rejected '{}': {}", subset.command(), message),
                response.result.as_str(),
            )),
            None => bundle.store(subset, &response.result),
        };

        match stored {
            Ok(()) => debug!("gathered {} facts", subset),
            Err(e) => {
                warn!("{} facts unavailable: {}", subset, e);
                bundle.errors.insert(subset, e);
            }
        }
    }

    Ok(bundle)
}

/// Identification of the device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceInfo {
    pub network_os: String,
    pub model: Option<String>,
    pub hostname: Option<String>,
    pub name: Option<String>,
    /// Version of the running software bank.
    pub version: Option<String>,
}

/// Identify the device from `show system` and `show sw`.
///
/// Whatever cannot be read is left empty with a warning.
pub async fn device_info<D: Driver>(driver: &mut D) -> Result<DeviceInfo> {
    let mut info = DeviceInfo {
        network_os: PLATFORM_NAME.to_string(),
        model: None,
        hostname: None,
        name: None,
        version: None,
    };

    let facts = gather_facts(driver, &[FactSubset::System, FactSubset::Software]).await?;

    if let Some(system) = facts.system {
        info.model = system.model;
        info.hostname = system.hostname;
        info.name = system.name;
    }
    if let Some(running) = facts.software.and_then(|sw| sw.running) {
        info.version = Some(running.version);
    }

    for (subset, error) in &facts.errors {
        warn!("incomplete device info ({}): {}", subset, error);
    }

    Ok(info)
}

/// Copy the running configuration to the startup configuration.
pub async fn save_config<D: Driver>(driver: &mut D) -> Result<CommandResult> {
    let command = "copy running-configuration startup-configuration";
    let response = driver.send_command(command).await?;

    let lower = response.result.to_ascii_lowercase();
    let message = match &response.failure_message {
        Some(message) => Some(message.clone()),
        None if lower.contains("error") || lower.contains("failed") => {
            Some(response.result.trim().to_string())
        }
        None => None,
    };

    if let Some(message) = message {
        return Err(Error::DeviceCommand {
            command: command.to_string(),
            message,
        });
    }

    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_list_all() {
        let subsets = FactSubset::parse_list(&["all"]).unwrap();
        assert_eq!(
            subsets,
            vec![
                FactSubset::System,
                FactSubset::Software,
                FactSubset::Ip,
                FactSubset::Route,
                FactSubset::Inventory,
                FactSubset::Rf,
            ]
        );
    }

    #[test]
    fn test_parse_list_named() {
        let subsets = FactSubset::parse_list(&["rf", "all", "config", "rf"]).unwrap();
        assert_eq!(subsets[0], FactSubset::Rf);
        assert_eq!(subsets.len(), 7);
        assert_eq!(subsets.last(), Some(&FactSubset::Config));

        assert_eq!(
            FactSubset::parse_list(&["config_startup"]).unwrap(),
            vec![FactSubset::ConfigStartup]
        );
    }

    #[test]
    fn test_unknown_subset() {
        assert_eq!(
            FactSubset::parse_list(&["firmware"]),
            Err(ValidationError::UnknownSubset("firmware".to_string()))
        );
    }

    #[test]
    fn test_store_records_parse_error() {
        let mut bundle = FactsBundle::default();
        assert!(bundle.store(FactSubset::Rf, "rf cinr : 12\n").is_ok());
        assert_eq!(bundle.rf.as_ref().and_then(|rf| rf.cinr), Some(12.0));

        let err = bundle.store(FactSubset::Inventory, "garbage").unwrap_err();
        assert_eq!(err.shape, Shape::Inventory);
    }
}
