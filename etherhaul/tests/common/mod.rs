//! A scripted EtherHaul CLI that implements `Transport` in memory.
//!
//! The device keeps just enough state (IP and route slots, the rollback
//! timer, privilege mode) to answer the commands the crate sends, and
//! records every line it receives so tests can assert on the exact
//! command sequence.

#![allow(dead_code)]

use std::collections::{BTreeMap, VecDeque};
use std::net::Ipv4Addr;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use etherhaul::error::ConnectionError;
use etherhaul::{Error, Result, Session, SessionBuilder, Transport};
use regex::bytes::Regex;

pub const HOSTNAME: &str = "EH-8010FX";
pub const BANNER: &str = "Welcome to Siklu EtherHaul";

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Exec,
    Enable,
    Config,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IpSlot {
    pub address: Ipv4Addr,
    pub prefix_len: u8,
    pub vlan: u16,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteSlot {
    pub dest: Ipv4Addr,
    pub prefix_len: u8,
    pub next_hop: Ipv4Addr,
}

#[derive(Debug)]
pub struct DeviceState {
    pub mode: Mode,
    pub ip: BTreeMap<u32, IpSlot>,
    pub routes: BTreeMap<u32, RouteSlot>,
    /// Remaining seconds while armed.
    pub rollback: Option<u32>,
    /// Every line received, in order.
    pub received: Vec<String>,
    /// Commands that produce output but never a prompt.
    pub hang_on: Vec<String>,
    /// Commands answered with an error.
    pub rejected: Vec<String>,
    /// Lines per page; `None` disables the pager.
    pub page_lines: Option<usize>,
    /// Acknowledge `set ip`/`set route` without applying them.
    pub ignore_sets: bool,
    /// Answer `show ip N`/`show route N` for an unconfigured slot with an
    /// error instead of printing nothing.
    pub missing_slot_error: bool,
    pub enable_secret: Option<String>,
    /// The peer has gone away.
    pub closed: bool,
    /// `close()` was called on the transport.
    pub transport_closed: bool,

    pending: String,
    pages: VecDeque<String>,
    input: String,
    awaiting_secret: bool,
}

impl DeviceState {
    fn prompt(&self) -> String {
        match self.mode {
            Mode::Exec => format!("{HOSTNAME}>"),
            Mode::Enable => format!("{HOSTNAME}#"),
            Mode::Config => format!("{HOSTNAME}(config)#"),
        }
    }

    /// Emit `output` lines, paging if enabled, then the prompt.
    fn reply(&mut self, output: &str) {
        let lines: Vec<&str> = output.lines().collect();

        match self.page_lines {
            Some(n) if lines.len() > n => {
                let mut pages = lines.chunks(n).map(|chunk| {
                    chunk.iter().map(|l| format!("{l}\r\n")).collect::<String>()
                });
                if let Some(first) = pages.next() {
                    self.pending.push_str(&first);
                    self.pending.push_str("--More-- ");
                }
                self.pages = pages.collect();
            }
            _ => {
                for line in lines {
                    self.pending.push_str(line);
                    self.pending.push_str("\r\n");
                }
                let prompt = self.prompt();
                self.pending.push_str(&prompt);
            }
        }
    }

    fn next_page(&mut self) {
        if let Some(page) = self.pages.pop_front() {
            self.pending.push_str(&page);
        }
        if self.pages.is_empty() {
            let prompt = self.prompt();
            self.pending.push_str(&prompt);
        } else {
            self.pending.push_str("--More-- ");
        }
    }

    fn handle_line(&mut self, line: &str) {
        self.received.push(line.to_string());

        if self.awaiting_secret {
            self.awaiting_secret = false;
            self.pending.push_str("\r\n");
            if self.enable_secret.as_deref() == Some(line) {
                self.mode = Mode::Enable;
                self.reply("");
            } else {
                self.reply("% Bad secret");
            }
            return;
        }

        self.pending.push_str(line);
        self.pending.push_str("\r\n");

        if self.hang_on.iter().any(|h| h == line) {
            self.pending.push_str("working...\r\n");
            return;
        }

        if self.rejected.iter().any(|r| r == line) {
            self.reply("%Error: command not permitted");
            return;
        }

        let words: Vec<&str> = line.split_whitespace().collect();
        let output = match words.as_slice() {
            ["show", "system"] => show_system(),
            ["show", "sw"] => SHOW_SW.to_string(),
            ["show", "inventory"] => SHOW_INVENTORY.to_string(),
            ["show", "rf"] => SHOW_RF.to_string(),
            ["show", "log"] => (1..=25).map(|i| format!("log line {i}\n")).collect(),
            ["show", "rollback"] => match self.rollback {
                Some(remaining) => format!("rollback timeout                   : {remaining}"),
                None => "rollback timeout                   : not started".to_string(),
            },
            ["show", "ip"] => self.ip.keys().map(|s| self.show_ip(*s)).collect(),
            ["show", "ip", slot] => match slot.parse() {
                Ok(slot) => self.show_ip(slot),
                Err(_) => "%Error: invalid index".to_string(),
            },
            ["show", "route"] => self.routes.keys().map(|s| self.show_route(*s)).collect(),
            ["show", "route", slot] => match slot.parse() {
                Ok(slot) => self.show_route(slot),
                Err(_) => "%Error: invalid index".to_string(),
            },
            ["set", "ip", slot, "ip-addr", address, "prefix-len", prefix_len, "vlan", vlan] => {
                self.set_ip(slot, address, prefix_len, vlan)
            }
            ["set", "route", slot, "dest", dest, "prefix-len", prefix_len, "next-hop", next_hop] => {
                self.set_route(slot, dest, prefix_len, next_hop)
            }
            ["set", "rollback", "timeout", seconds] => match seconds.parse::<u32>() {
                Ok(0) => {
                    self.rollback = None;
                    "Set done: rollbacktimeout: 0".to_string()
                }
                Ok(n) => {
                    self.rollback = Some(n);
                    format!("Set done: rollbacktimeout: {n}")
                }
                Err(_) => "%Error: invalid timeout".to_string(),
            },
            ["clear", "rollback"] => {
                self.rollback = None;
                "rollback cleared".to_string()
            }
            ["copy", "running-configuration", "display"] => self.running_config(),
            ["copy", "startup-configuration", "display"] => {
                "####====####  Generated by ver. 10.8.2, convert ver. 3\n# empty".to_string()
            }
            ["copy", "running-configuration", "startup-configuration"] => {
                "Copy running-configuration to startup-configuration done".to_string()
            }
            ["enable"] => {
                if self.enable_secret.is_some() {
                    self.pending.push_str("Password: ");
                    self.awaiting_secret = true;
                    return;
                }
                self.mode = Mode::Enable;
                String::new()
            }
            ["disable"] => {
                self.mode = Mode::Exec;
                String::new()
            }
            ["configure"] if self.mode == Mode::Enable => {
                self.mode = Mode::Config;
                String::new()
            }
            ["end"] if self.mode == Mode::Config => {
                self.mode = Mode::Enable;
                String::new()
            }
            ["exit"] => {
                self.closed = true;
                return;
            }
            ["reboot"] => {
                self.pending.push_str("Rebooting...\r\n");
                self.closed = true;
                return;
            }
            _ => format!("%Error: Unknown command: {line}"),
        };

        self.reply(&output);
    }

    /// Firmware prints nothing for a slot that was never configured.
    fn missing_slot(&self) -> String {
        if self.missing_slot_error {
            "%Error: entry not found".to_string()
        } else {
            String::new()
        }
    }

    fn show_ip(&self, slot: u32) -> String {
        let Some(entry) = self.ip.get(&slot) else {
            return self.missing_slot();
        };
        format!(
            "ip {slot} ip-addr                     : static {}\n\
             ip {slot} prefix-len                  : {}\n\
             ip {slot} vlan                        : {}\n\
             ip {slot} default-gateway             : n/a\n",
            entry.address, entry.prefix_len, entry.vlan
        )
    }

    fn show_route(&self, slot: u32) -> String {
        let Some(entry) = self.routes.get(&slot) else {
            return self.missing_slot();
        };
        format!(
            "route {slot} dest                     : {}\n\
             route {slot} prefix-len               : {}\n\
             route {slot} next-hop                 : {}\n",
            entry.dest, entry.prefix_len, entry.next_hop
        )
    }

    fn set_ip(&mut self, slot: &str, address: &str, prefix_len: &str, vlan: &str) -> String {
        let parsed = (
            slot.parse::<u32>(),
            address.parse::<Ipv4Addr>(),
            prefix_len.parse::<u8>(),
            vlan.parse::<u16>(),
        );
        let (Ok(slot), Ok(address), Ok(prefix_len), Ok(vlan)) = parsed else {
            return "%Error: invalid argument".to_string();
        };
        if vlan > 4094 || prefix_len > 32 {
            return "%Error: value out of range".to_string();
        }
        if !self.ignore_sets {
            self.ip.insert(
                slot,
                IpSlot {
                    address,
                    prefix_len,
                    vlan,
                },
            );
        }
        format!("Set done: ip {slot}")
    }

    fn set_route(&mut self, slot: &str, dest: &str, prefix_len: &str, next_hop: &str) -> String {
        let parsed = (
            slot.parse::<u32>(),
            dest.parse::<Ipv4Addr>(),
            prefix_len.parse::<u8>(),
            next_hop.parse::<Ipv4Addr>(),
        );
        let (Ok(slot), Ok(dest), Ok(prefix_len), Ok(next_hop)) = parsed else {
            return "%Error: invalid argument".to_string();
        };
        if !self.ignore_sets {
            self.routes.insert(
                slot,
                RouteSlot {
                    dest,
                    prefix_len,
                    next_hop,
                },
            );
        }
        format!("Set done: route {slot}")
    }

    fn running_config(&self) -> String {
        let mut config = String::from("####====####  Generated by ver. 10.8.2, convert ver. 3\n");
        config.push_str("# ip configuring\n");
        for (slot, ip) in &self.ip {
            config.push_str(&format!(
                "set ip {slot}  ip-addr 'static {}'  prefix-len {}  vlan {}\n",
                ip.address, ip.prefix_len, ip.vlan
            ));
        }
        config.push_str("# route configuring\n");
        for (slot, route) in &self.routes {
            config.push_str(&format!(
                "set route {slot}  prefix-len {}  dest {}  next-hop {}\n",
                route.prefix_len, route.dest, route.next_hop
            ));
        }
        config
    }
}

/// Test-side handle onto the device's state.
#[derive(Clone)]
pub struct DeviceHandle(Arc<Mutex<DeviceState>>);

impl DeviceHandle {
    pub fn state(&self) -> MutexGuard<'_, DeviceState> {
        self.0.lock().unwrap()
    }

    /// Lines received since the session opened, in order.
    pub fn received(&self) -> Vec<String> {
        self.state().received.clone()
    }

    /// Received lines starting with `prefix`.
    pub fn received_matching(&self, prefix: &str) -> Vec<String> {
        self.received()
            .into_iter()
            .filter(|l| l.starts_with(prefix))
            .collect()
    }

    pub fn clear_received(&self) {
        self.state().received.clear();
    }
}

/// The in-memory device as seen by the session.
pub struct FakeDevice(Arc<Mutex<DeviceState>>);

impl FakeDevice {
    /// A device at its exec prompt with the lab's standard slots.
    pub fn new() -> (Self, DeviceHandle) {
        let mut ip = BTreeMap::new();
        ip.insert(
            1,
            IpSlot {
                address: Ipv4Addr::new(172, 18, 128, 2),
                prefix_len: 24,
                vlan: 128,
            },
        );
        ip.insert(
            3,
            IpSlot {
                address: Ipv4Addr::new(192, 168, 1, 1),
                prefix_len: 24,
                vlan: 0,
            },
        );

        let mut routes = BTreeMap::new();
        routes.insert(
            1,
            RouteSlot {
                dest: Ipv4Addr::UNSPECIFIED,
                prefix_len: 0,
                next_hop: Ipv4Addr::new(172, 18, 128, 1),
            },
        );

        let state = DeviceState {
            mode: Mode::Exec,
            ip,
            routes,
            rollback: None,
            received: Vec::new(),
            hang_on: Vec::new(),
            rejected: Vec::new(),
            page_lines: None,
            ignore_sets: false,
            missing_slot_error: false,
            enable_secret: None,
            closed: false,
            transport_closed: false,
            pending: format!("{BANNER}\r\n\r\n{HOSTNAME}>"),
            pages: VecDeque::new(),
            input: String::new(),
            awaiting_secret: false,
        };

        let shared = Arc::new(Mutex::new(state));
        (FakeDevice(shared.clone()), DeviceHandle(shared))
    }
}

impl Transport for FakeDevice {
    async fn write(&mut self, data: &[u8]) -> Result<()> {
        let mut state = self.0.lock().unwrap();
        if state.closed {
            return Err(ConnectionError::Disconnected.into());
        }

        let text = String::from_utf8_lossy(data);
        if !state.pages.is_empty() && text == " " {
            state.next_page();
            return Ok(());
        }

        state.input.push_str(&text);
        while let Some(pos) = state.input.find('\n') {
            let line: String = state.input.drain(..=pos).collect();
            state.handle_line(line.trim_end_matches(['\r', '\n']));
        }
        Ok(())
    }

    async fn read_until(&mut self, pattern: &Regex, timeout: Duration) -> Result<Vec<u8>> {
        let mut state = self.0.lock().unwrap();

        if pattern.is_match(state.pending.as_bytes()) {
            return Ok(std::mem::take(&mut state.pending).into_bytes());
        }
        if state.closed {
            return Err(ConnectionError::Disconnected.into());
        }
        Err(Error::Timeout(timeout))
    }

    async fn close(self) -> Result<()> {
        let mut state = self.0.lock().unwrap();
        state.transport_closed = true;
        if state.closed {
            return Err(ConnectionError::Disconnected.into());
        }
        state.closed = true;
        Ok(())
    }

    fn is_alive(&self) -> bool {
        !self.0.lock().unwrap().closed
    }
}

/// Builder with timeouts short enough for tests.
pub fn builder() -> SessionBuilder {
    SessionBuilder::new("eh-lab")
        .timeout(Duration::from_millis(200))
        .command_timeout(Duration::from_millis(200))
}

/// Open a session on a fresh device.
pub async fn open() -> (Session<FakeDevice>, DeviceHandle) {
    open_with(builder(), |_| {}).await
}

/// Open a session on a device adjusted by `setup` before login.
pub async fn open_with(
    builder: SessionBuilder,
    setup: impl FnOnce(&mut DeviceState),
) -> (Session<FakeDevice>, DeviceHandle) {
    init_logging();
    let (device, handle) = FakeDevice::new();
    setup(&mut *handle.state());

    let session = builder.open_with(device).await.unwrap();
    (session, handle)
}

fn show_system() -> String {
    "\
system description               : EH-8010FX
system snmpid                    : .1.3.6.1.4.1.31926
system uptime                    : 0000:10:38:41
system contact                   : undefined
system name                      : EH-8010FX-AES-H
system hostname                  : sw
system location                  : undefined
system temperature               : 57
system cli-timeout               : 15
"
    .to_string()
}

const SHOW_SW: &str = "\
Flash Bank    Version                           Running     Scheduled to run    startup-config
1             10.6.0-18451-c009ec33d1           yes         no                  exists
2             10.8.2-19409-92aead94fe           no          no                  missing
";

const SHOW_INVENTORY: &str = "\
inventory 1 desc                      : EH-8010FX-AES-H
inventory 1 cont-in                   : 0
inventory 1 class                     : chassis
inventory 1 serial                    : FC18594555
inventory 2 desc                      : BB Board
inventory 2 cont-in                   : 1
inventory 6 desc                      : Modem Chip
inventory 6 cont-in                   : 2
";

const SHOW_RF: &str = "\
rf operational               : up
rf cinr                      : 28
rf rssi                      : -28
rf tx-frequency              : 82000
rf mode                      : adaptive qam32
";
