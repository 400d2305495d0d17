//! `show rf`

use indexmap::IndexMap;
use serde::Serialize;

use super::{Shape, check_output, normalize, number, records, unrecognized};
use crate::error::ParseError;

/// Radio link operational state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OperState {
    Up,
    Down,
    Unknown,
}

impl OperState {
    fn from_value(value: &str) -> Self {
        match normalize(value) {
            Some(v) if v.eq_ignore_ascii_case("up") => OperState::Up,
            Some(v) if v.eq_ignore_ascii_case("down") => OperState::Down,
            _ => OperState::Unknown,
        }
    }
}

/// Radio metrics. Every metric is independently optional; a link that is
/// down still reports `-128` for CINR and RSSI, which is kept as a number.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RfMetrics {
    pub operational: OperState,
    /// dB
    pub cinr: Option<f64>,
    /// dBm
    pub rssi: Option<f64>,
    /// MHz
    pub tx_frequency: Option<u32>,
    /// MHz
    pub rx_frequency: Option<u32>,
    /// MHz
    pub channel_width: Option<u32>,
    /// dBm
    pub tx_power: Option<i32>,
    /// Mbps
    pub air_capacity: Option<u32>,
    pub tx_mute_timeout: Option<u32>,
    pub loopback_timeout: Option<u32>,
    pub alignment_max_rssi: Option<f64>,
    /// Modulation mode, e.g. `adaptive qam32`.
    pub mode: Option<String>,

    /// Remaining keys as reported, in report order.
    pub other: IndexMap<String, Option<String>>,
}

impl Default for RfMetrics {
    fn default() -> Self {
        Self {
            operational: OperState::Unknown,
            cinr: None,
            rssi: None,
            tx_frequency: None,
            rx_frequency: None,
            channel_width: None,
            tx_power: None,
            air_capacity: None,
            tx_mute_timeout: None,
            loopback_timeout: None,
            alignment_max_rssi: None,
            mode: None,
            other: IndexMap::new(),
        }
    }
}

/// Parse `show rf` output.
pub fn parse_rf(text: &str) -> Result<RfMetrics, ParseError> {
    check_output(Shape::Rf, text)?;

    let mut rf = RfMetrics::default();
    let mut seen = false;

    for record in records(text).filter(|r| r.noun == "rf" && r.id.is_none()) {
        seen = true;
        let value = record.value;

        match record.key {
            "operational" => rf.operational = OperState::from_value(value),
            "cinr" => rf.cinr = number(value),
            "rssi" => rf.rssi = number(value),
            "tx-frequency" => rf.tx_frequency = number(value),
            "rx-frequency" => rf.rx_frequency = number(value),
            "channel-width" => rf.channel_width = number(value),
            "tx-power" => rf.tx_power = number(value),
            "air-capacity" => rf.air_capacity = number(value),
            "tx-mute-timeout" => rf.tx_mute_timeout = number(value),
            "loopback-timeout" => rf.loopback_timeout = number(value),
            "alignment-max-rssi" => rf.alignment_max_rssi = number(value),
            "mode" => rf.mode = normalize(value).map(str::to_string),
            key => {
                rf.other
                    .insert(key.to_string(), normalize(value).map(str::to_string));
            }
        }
    }

    if !seen {
        return Err(unrecognized(Shape::Rf, text));
    }

    Ok(rf)
}
