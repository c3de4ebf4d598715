//! hwctrl-probe - queries fabric reachability from every hw agent.
//!
//! Builds a client table from a config file and/or command line switches
//! and prints each switch's reachability as JSON (`null` when the hw
//! agent could not be queried).

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::collections::BTreeMap;
use std::net::IpAddr;
use std::path::PathBuf;
use swagent_hwctrl_client::{ClientTableConfig, HwSwitchClientTable, SwitchEntry};
use swagent_types::Reachability;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Fabric reachability probe for hw agents
#[derive(Parser, Debug)]
#[command(name = "hwctrl-probe")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// TOML client table configuration
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// Port of the hw agent with switch index 0 (overrides the config)
    #[arg(short = 'p', long)]
    base_port: Option<u16>,

    /// Address the hw agents listen on (overrides the config)
    #[arg(long)]
    host: Option<IpAddr>,

    /// Managed switch as ID:INDEX, may be repeated
    #[arg(short = 's', long = "switch", value_parser = parse_switch)]
    switches: Vec<(i64, u16)>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'l', long, default_value = "info")]
    log_level: String,
}

fn parse_switch(s: &str) -> Result<(i64, u16), String> {
    let (id, index) = s
        .split_once(':')
        .ok_or_else(|| format!("expected ID:INDEX, got {}", s))?;
    let id = id
        .parse::<i64>()
        .map_err(|e| format!("invalid switch id {}: {}", id, e))?;
    let index = index
        .parse::<u16>()
        .map_err(|e| format!("invalid switch index {}: {}", index, e))?;
    Ok((id, index))
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

fn build_config(args: &Args) -> Result<ClientTableConfig> {
    let mut config = match &args.config {
        Some(path) => ClientTableConfig::from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => ClientTableConfig::default(),
    };

    if let Some(base_port) = args.base_port {
        config.base_port = base_port;
    }
    if let Some(host) = args.host {
        config.host = host;
    }
    for (id, index) in &args.switches {
        config.switches.insert(
            id.to_string(),
            SwitchEntry {
                switch_index: *index,
                switch_type: Default::default(),
            },
        );
    }

    config.validate().context("invalid client table configuration")?;
    if config.switches.is_empty() {
        bail!("no switches configured; pass --config or --switch ID:INDEX");
    }
    Ok(config)
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level);

    let config = build_config(&args)?;
    let table = HwSwitchClientTable::with_options(
        config.base_port,
        &config.switch_infos()?,
        config.client_options(),
    )
    .context("building client table")?;
    info!(switches = table.len(), base_port = config.base_port, "probing hw agents");

    let mut report: BTreeMap<String, Option<Reachability>> = BTreeMap::new();
    for switch_id in table.switch_ids() {
        let reachability = table.get_fabric_reachability(switch_id)?;
        report.insert(switch_id.to_string(), reachability);
    }

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_switch() {
        assert_eq!(parse_switch("1:0"), Ok((1, 0)));
        assert_eq!(parse_switch("-3:7"), Ok((-3, 7)));
        assert!(parse_switch("1").is_err());
        assert!(parse_switch("a:0").is_err());
        assert!(parse_switch("1:70000").is_err());
    }

    #[test]
    fn test_cli_switches_merge_into_defaults() {
        let args = Args::parse_from(["hwctrl-probe", "-s", "1:0", "-s", "2:1", "-p", "6000"]);
        let config = build_config(&args).unwrap();
        assert_eq!(config.base_port, 6000);
        assert_eq!(config.switches.len(), 2);
        assert_eq!(config.switches["2"].switch_index, 1);
    }

    #[test]
    fn test_no_switches_rejected() {
        let args = Args::parse_from(["hwctrl-probe"]);
        assert!(build_config(&args).is_err());
    }
}
