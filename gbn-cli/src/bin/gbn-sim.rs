//! gbn-sim - Go-Back-N transfer simulator
//!
//! Runs one simulated GBN transfer, printing the protocol event stream as
//! it happens and a summary at the end. A scenario can come from a TOML
//! file, from flags, or both (flags override the file).

use anyhow::Context;
use clap::Parser;
use gbn_cli::Scenario;
use gbn_protocol::{Simulation, SimulationReport};
use std::path::PathBuf;
use std::thread;

#[derive(Parser, Debug)]
#[command(name = "gbn-sim")]
#[command(about = "Go-Back-N sliding-window transfer simulator", long_about = None)]
struct Args {
    /// Scenario file (TOML); flags below override its values
    #[arg(short, long)]
    scenario: Option<PathBuf>,

    /// Payload symbols to transfer, one per character
    #[arg(short, long)]
    data: Option<String>,

    /// Sender window size (N)
    #[arg(short, long)]
    window: Option<u64>,

    /// Sequence-number space size (K)
    #[arg(short = 'k', long)]
    seq_space: Option<u64>,

    /// Data packet slots to drop once each (comma-separated)
    #[arg(long, value_delimiter = ',')]
    drop_data: Option<Vec<u64>>,

    /// Acknowledgment slots to drop once each (comma-separated)
    #[arg(long, value_delimiter = ',')]
    drop_ack: Option<Vec<u64>>,

    /// Propagation delay per delivery in milliseconds
    #[arg(long)]
    delay_ms: Option<u64>,

    /// Retransmission timeout in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Suppress the live event stream, print only the summary
    #[arg(short, long)]
    quiet: bool,

    /// Verbose logging (RUST_LOG still takes precedence)
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    /// Build the effective scenario: file values first, then flag
    /// overrides, then reference defaults.
    fn scenario(&self) -> anyhow::Result<Scenario> {
        let mut scenario = match &self.scenario {
            Some(path) => Scenario::from_file(path)
                .with_context(|| format!("failed to load scenario {}", path.display()))?,
            None => Scenario::example(),
        };

        if let Some(data) = &self.data {
            scenario.data = data.clone();
        }
        if let Some(window) = self.window {
            scenario.window_size = window;
        }
        if let Some(seq_space) = self.seq_space {
            scenario.sequence_space = seq_space;
        }
        if let Some(drop_data) = &self.drop_data {
            scenario.packet_loss = drop_data.clone();
        }
        if let Some(drop_ack) = &self.drop_ack {
            scenario.ack_loss = drop_ack.clone();
        }
        if let Some(delay_ms) = self.delay_ms {
            scenario.propagation_delay_ms = delay_ms;
        }
        if let Some(timeout_ms) = self.timeout_ms {
            scenario.retransmission_timeout_ms = timeout_ms;
        }
        Ok(scenario)
    }
}

fn print_summary(scenario: &Scenario, report: &SimulationReport) {
    println!();
    println!("=== Simulation Complete ===");
    println!("Data sent:       {}", scenario.data);
    println!("Data delivered:  {}", report.delivered);
    println!(
        "Transmissions:   {} data + {} retransmitted",
        report.stats.data_sent, report.stats.retransmissions
    );
    println!(
        "Acknowledgments: {} sent, {} received",
        report.stats.acks_sent, report.stats.acks_received
    );
    println!(
        "Losses:          {} data, {} ack",
        report.stats.data_dropped, report.stats.acks_dropped
    );
    println!("Timeouts:        {}", report.stats.timeouts);
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "warn" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let scenario = args.scenario()?;
    tracing::info!(
        "Transferring {:?} with window {} over sequence space {}",
        scenario.data,
        scenario.window_size,
        scenario.sequence_space
    );
    tracing::info!(
        "Delay {} ms, timeout {} ms, data loss {:?}, ack loss {:?}",
        scenario.propagation_delay_ms,
        scenario.retransmission_timeout_ms,
        scenario.packet_loss,
        scenario.ack_loss
    );
    let simulation = Simulation::new(scenario.to_simulation_config())
        .context("invalid simulation configuration")?;

    // Stream events to stdout while the run is in flight.
    let printer = if args.quiet {
        None
    } else {
        let events = simulation.subscribe();
        Some(thread::spawn(move || {
            for event in events {
                println!("{event}");
            }
        }))
    };

    let report = simulation.run();
    if let Some(printer) = printer {
        let _ = printer.join();
    }

    print_summary(&scenario, &report);
    if report.delivered != scenario.data {
        anyhow::bail!(
            "delivered data {:?} does not match input {:?}",
            report.delivered,
            scenario.data
        );
    }
    Ok(())
}
