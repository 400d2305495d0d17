//! `show system`

use indexmap::IndexMap;
use serde::Serialize;

use super::{Shape, check_output, normalize, number, records, unrecognized};
use crate::error::ParseError;

/// Identity and housekeeping values of the device.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SystemFacts {
    /// Hardware model, from `system description`.
    pub model: Option<String>,
    pub snmp_id: Option<String>,
    pub uptime: Option<String>,
    pub contact: Option<String>,
    pub name: Option<String>,
    pub hostname: Option<String>,
    pub location: Option<String>,
    pub voltage: Option<String>,
    /// Degrees Celsius.
    pub temperature: Option<i32>,
    pub date: Option<String>,
    pub time: Option<String>,
    /// Minutes.
    pub cli_timeout: Option<u32>,
    pub loop_permission: Option<String>,
    pub antenna_heater: Option<String>,
    /// Seconds.
    pub heartbeat_trap_period: Option<u32>,

    /// Keys this parser does not know, in report order.
    pub other: IndexMap<String, Option<String>>,
}

/// Parse `show system` output.
pub fn parse_system(text: &str) -> Result<SystemFacts, ParseError> {
    check_output(Shape::System, text)?;

    let mut facts = SystemFacts::default();
    let mut seen = false;

    for record in records(text).filter(|r| r.noun == "system" && r.id.is_none()) {
        seen = true;
        let value = record.value;
        let string = || normalize(value).map(str::to_string);

        match record.key {
            "description" => facts.model = string(),
            "snmpid" => facts.snmp_id = string(),
            "uptime" => facts.uptime = string(),
            "contact" => facts.contact = string(),
            "name" => facts.name = string(),
            "hostname" => facts.hostname = string(),
            "location" => facts.location = string(),
            "voltage" => facts.voltage = string(),
            "temperature" => facts.temperature = number(value),
            "date" => facts.date = string(),
            "time" => facts.time = string(),
            "cli-timeout" => facts.cli_timeout = number(value),
            "loop-permission" => facts.loop_permission = string(),
            "antenna-heater" => facts.antenna_heater = string(),
            "heartbeat-trap-period" => facts.heartbeat_trap_period = number(value),
            key => {
                facts.other.insert(key.to_string(), string());
            }
        }
    }

    if !seen {
        return Err(unrecognized(Shape::System, text));
    }

    Ok(facts)
}
