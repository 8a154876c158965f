use alloy::primitives::Address;
use std::str::FromStr;
use tracing_subscriber::EnvFilter;

use token_watch::analytics::format::AmountFormatter;
use token_watch::config::{Config, OutputFormat};
use token_watch::error::AnalyticsError;
use token_watch::indexer::chain::RpcLedger;
use token_watch::indexer::types::short_hex;
use token_watch::pipeline::ReportPipeline;
use token_watch::report::{self, TextReport, TextStats, TextSuspicion, Units};

const USAGE: &str =
    "usage: token-watch [config.toml] [report | largest | stats <from> [to] | suspicious <address> [blocks]]";

enum Command {
    Report,
    Largest,
    Stats { from: u64, to: Option<u64> },
    Suspicious { address: Address, blocks: Option<u64> },
}

impl Command {
    fn parse(args: &[String]) -> eyre::Result<Self> {
        let block = |s: &String| {
            s.parse::<u64>()
                .map_err(|e| eyre::eyre!("Invalid block number '{}': {}\n{}", s, e, USAGE))
        };

        match args.first().map(String::as_str) {
            None | Some("report") => Ok(Self::Report),
            Some("largest") => Ok(Self::Largest),
            Some("stats") => {
                let from = args
                    .get(1)
                    .ok_or_else(|| eyre::eyre!("stats needs a start block\n{}", USAGE))
                    .and_then(block)?;
                let to = args.get(2).map(block).transpose()?;
                Ok(Self::Stats { from, to })
            }
            Some("suspicious") => {
                let raw = args
                    .get(1)
                    .ok_or_else(|| eyre::eyre!("suspicious needs an address\n{}", USAGE))?;
                let address = Address::from_str(raw)
                    .map_err(|e| eyre::eyre!("Invalid address '{}': {}", raw, e))?;
                let blocks = args.get(2).map(block).transpose()?;
                Ok(Self::Suspicious { address, blocks })
            }
            Some(other) => Err(eyre::eyre!("Unknown command '{}'\n{}", other, USAGE)),
        }
    }
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    color_eyre::install()?;

    // Logs go to stderr so stdout carries only the report (set RUST_LOG=debug for detail)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let (config_path, command_args) = match args.first() {
        Some(first) if first.ends_with(".toml") => (first.clone(), &args[1..]),
        _ => ("config.toml".to_string(), &args[..]),
    };
    let command = Command::parse(command_args)?;

    let config = Config::load(&config_path)?;
    tracing::info!(
        token = %config.token.symbol,
        contract = %config.token.address,
        "Configuration loaded from {}",
        config_path
    );

    let ledger = RpcLedger::connect_http(&config.node.rpc_http, config.node.max_retries)?;
    let pipeline = ReportPipeline::new(ledger, &config)?;
    let units = Units::new(AmountFormatter::new(
        config.token.decimals,
        config.token.symbol.clone(),
    ));
    let json = config.output.format == OutputFormat::Json;

    let result = match command {
        Command::Report => pipeline.run_report().await.map(|report| {
            if json {
                println!("{:#}", report::report_json(&report, &units));
            } else {
                print!("{}", TextReport { report: &report, units: &units });
            }
        }),
        Command::Largest => pipeline
            .largest_transfer()
            .await
            .map(|largest| println!("{}", short_hex(&largest.to_address))),
        Command::Stats { from, to } => pipeline.transfer_stats(from, to).await.map(|stats| {
            if json {
                println!("{:#}", report::stats_json(&stats, &units));
            } else {
                print!("{}", TextStats { stats: &stats, units: &units });
            }
        }),
        Command::Suspicious { address, blocks } => pipeline
            .check_suspicious(address, blocks.unwrap_or(config.window.suspicion_blocks))
            .await
            .map(|suspicion| {
                if json {
                    println!("{:#}", report::suspicion_json(&suspicion, &units));
                } else {
                    print!("{}", TextSuspicion { suspicion: &suspicion, units: &units });
                }
            }),
    };

    match result {
        Ok(()) => Ok(()),
        Err(AnalyticsError::EmptySet(_)) => {
            println!(
                "No {} transfers found in the specified block range",
                config.token.symbol
            );
            Ok(())
        }
        Err(e @ AnalyticsError::MalformedLog(_)) => Err(eyre::eyre!(
            "Node returned a log that is not a {} Transfer: {}",
            config.token.symbol,
            e
        )),
        Err(e @ AnalyticsError::Fetch(_)) => Err(eyre::Report::new(e)),
    }
}
