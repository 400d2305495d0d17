//! EtherHaul facts and reconciliation example
//!
//! Connects to a Siklu EtherHaul radio, gathers facts and optionally
//! converges IP/route slots from a JSON file under rollback protection.
//!
//! # Usage
//!
//! ```bash
//! cargo run --example eh_facts -- --host 192.168.0.1 --user admin --password admin
//! ```
//!
//! Gather selected subsets:
//! ```bash
//! cargo run --example eh_facts -- --host 192.168.0.1 --user admin --password admin --facts system,rf,config
//! ```
//!
//! Apply a desired state (a JSON list of items) with a 5 minute rollback:
//! ```bash
//! cargo run --example eh_facts -- --host 192.168.0.1 --user admin --password admin \
//!     --apply items.json --rollback 300 --save
//! ```
//!
//! where `items.json` looks like:
//! ```json
//! [
//!   {"type": "ip", "slot": 3, "address": "192.168.1.100", "prefix_len": 24, "vlan": 0},
//!   {"type": "route", "slot": 1, "dest": "0.0.0.0", "prefix_len": 0, "next_hop": "192.168.1.1"}
//! ]
//! ```

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use etherhaul::rollback::RollbackController;
use etherhaul::transport::HostKeyVerification;
use etherhaul::{ConfigItem, FactSubset, SessionBuilder, apply_config, device_info, gather_facts, save_config};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    // Validate local input before touching the device
    let subsets = FactSubset::parse_list(&args.facts)?;
    let items: Vec<ConfigItem> = match &args.apply {
        Some(path) => serde_json::from_str(&std::fs::read_to_string(path)?)?,
        None => Vec::new(),
    };

    println!("Connecting to {}:{}...", args.host, args.port);

    let mut builder = SessionBuilder::new(&args.host)
        .port(args.port)
        .username(&args.user)
        .timeout(Duration::from_secs(args.timeout))
        .command_timeout(Duration::from_secs(args.timeout))
        .host_key_verification(HostKeyVerification::Disabled);

    if let Some(password) = &args.password {
        builder = builder.password(password);
    } else if let Some(key_path) = &args.key {
        builder = builder.private_key(key_path);
    } else {
        eprintln!("Error: Must provide either --password or --key");
        std::process::exit(1);
    }

    let mut session = builder.connect().await?;
    if !session.banner().is_empty() {
        println!("{}\n", session.banner());
    }

    let info = device_info(&mut session).await?;
    println!(
        "Device: {} ({}) running {}\n",
        info.name.as_deref().unwrap_or("?"),
        info.model.as_deref().unwrap_or("?"),
        info.version.as_deref().unwrap_or("?"),
    );

    if !items.is_empty() {
        let mut controller = RollbackController::attach(&mut session).await?;
        if let Some(timeout) = args.rollback {
            controller.enable(timeout).await?;
            println!("Rollback armed for {}s", timeout);
        }

        let outcome = apply_config(controller.driver(), &items).await?;
        println!("{}", serde_json::to_string_pretty(&outcome)?);

        let failed = outcome.failures().count();
        if failed > 0 {
            // Leave the timer running so the device reverts on its own
            eprintln!("{} item(s) did not converge; rollback left armed", failed);
        } else {
            if args.save && outcome.changed {
                save_config(controller.driver()).await?;
                println!("Configuration saved");
            }
            controller.disable().await?;
        }
    }

    let facts = gather_facts(&mut session, &subsets).await?;
    println!("{}", serde_json::to_string_pretty(&facts)?);

    session.close().await?;
    println!("\nDisconnected.");

    Ok(())
}

struct Args {
    host: String,
    port: u16,
    user: String,
    password: Option<String>,
    key: Option<PathBuf>,
    timeout: u64,
    facts: Vec<String>,
    apply: Option<PathBuf>,
    rollback: Option<u64>,
    save: bool,
}

impl Args {
    fn parse() -> Self {
        let args: Vec<String> = env::args().collect();
        let mut parsed = Args {
            host: "192.168.0.1".to_string(),
            port: 22,
            user: "admin".to_string(),
            password: None,
            key: None,
            timeout: 30,
            facts: vec!["all".to_string()],
            apply: None,
            rollback: None,
            save: false,
        };

        let mut i = 1;
        while i < args.len() {
            let value = args.get(i + 1).cloned();
            match args[i].as_str() {
                "--host" | "-h" => parsed.host = value.unwrap_or(parsed.host),
                "--port" | "-p" => {
                    parsed.port = value.and_then(|v| v.parse().ok()).unwrap_or(22)
                }
                "--user" | "-u" => parsed.user = value.unwrap_or(parsed.user),
                "--password" | "-P" => parsed.password = value,
                "--key" | "-k" => parsed.key = value.map(PathBuf::from),
                "--timeout" | "-t" => {
                    parsed.timeout = value.and_then(|v| v.parse().ok()).unwrap_or(30)
                }
                "--facts" | "-f" => {
                    if let Some(v) = value {
                        parsed.facts = v.split(',').map(str::to_string).collect();
                    }
                }
                "--apply" | "-a" => parsed.apply = value.map(PathBuf::from),
                "--rollback" | "-r" => parsed.rollback = value.and_then(|v| v.parse().ok()),
                "--save" => {
                    parsed.save = true;
                    i += 1;
                    continue;
                }
                "--help" => {
                    Self::print_help();
                    std::process::exit(0);
                }
                other => {
                    eprintln!("Unknown argument: {}", other);
                    Self::print_help();
                    std::process::exit(1);
                }
            }
            i += 2;
        }

        parsed
    }

    fn print_help() {
        println!(
            r#"EtherHaul facts and reconciliation example

USAGE:
    cargo run --example eh_facts -- [OPTIONS]

OPTIONS:
    -h, --host <HOST>        Radio address [default: 192.168.0.1]
    -p, --port <PORT>        SSH port [default: 22]
    -u, --user <USER>        Username [default: admin]
    -P, --password <PASS>    Password
    -k, --key <PATH>         Private key path
    -t, --timeout <SECS>     Connection and command timeout [default: 30]
    -f, --facts <LIST>       Comma-separated fact subsets [default: all]
    -a, --apply <PATH>       JSON file of IP/route items to converge
    -r, --rollback <SECS>    Arm the rollback timer while applying
        --save               Save the running configuration after a change
        --help               Print help"#
        );
    }
}
