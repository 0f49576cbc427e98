//! Simulation driver
//!
//! Wires a validated configuration into a channel, a receiver, and a
//! sender, runs every loop to completion, and collects the delivered
//! output plus the recorded event stream into a report.

use crate::channel::NetworkChannel;
use crate::config::{ConfigError, SimulationConfig};
use crate::event::{Event, EventBus, SimulationStats};
use crate::receiver::GbnReceiver;
use crate::sender::GbnSender;
use crate::sequence::SeqSpace;
use crossbeam::channel::{bounded, Receiver};
use std::thread;

/// Outcome of one finished run.
#[derive(Debug, Clone)]
pub struct SimulationReport {
    /// The receiver's accepted payloads, in order.
    pub delivered: String,
    /// Counters tallied from the event stream.
    pub stats: SimulationStats,
    /// Every event the run emitted, in emission order.
    pub events: Vec<Event>,
}

/// One configured simulation, ready to run.
pub struct Simulation {
    config: SimulationConfig,
    events: EventBus,
}

impl Simulation {
    /// Validate the configuration and prepare a run.
    ///
    /// Validation failure aborts here, before any protocol state exists.
    pub fn new(config: SimulationConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Simulation {
            config,
            events: EventBus::new(),
        })
    }

    /// Attach a live event subscriber. Must be called before [`run`].
    ///
    /// [`run`]: Simulation::run
    pub fn subscribe(&self) -> Receiver<Event> {
        self.events.subscribe()
    }

    /// Run the transfer to completion and report the outcome.
    ///
    /// Blocks until all data has been sent, the final acknowledgment has
    /// been observed, and every worker thread has been joined.
    pub fn run(self) -> SimulationReport {
        let data: String = self.config.data.iter().collect();
        tracing::info!(target: "gbn", window = self.config.window_size,
            seq_space = self.config.seq_space, "starting transfer of {data:?}");

        let recorder = self.events.subscribe();
        let space = SeqSpace::new(self.config.seq_space);
        let total = self.config.data.len() as u64;

        let (channel, endpoints, workers) = NetworkChannel::new(&self.config, self.events.clone());
        let (shutdown_tx, shutdown_rx) = bounded(1);

        let receiver = GbnReceiver::new(
            space,
            total,
            channel.clone(),
            endpoints.data_rx,
            shutdown_rx,
            self.events.clone(),
        );
        let receiver_thread = thread::spawn(move || receiver.run());

        let sender = GbnSender::new(
            &self.config,
            channel.clone(),
            endpoints.ack_rx,
            self.events.clone(),
        );
        // Blocks until the final acknowledgment is observed.
        sender.run();

        let _ = shutdown_tx.send(());
        let delivered = match receiver_thread.join() {
            Ok(delivered) => delivered,
            Err(_) => {
                tracing::error!(target: "gbn", "receiver loop panicked");
                Vec::new()
            }
        };

        // All channel handles are gone now; the schedulers drain and exit.
        drop(channel);
        workers.join();

        let events: Vec<Event> = recorder.try_iter().collect();
        let stats = SimulationStats::from_events(&events);
        let delivered: String = delivered.into_iter().collect();
        tracing::info!(target: "gbn", %delivered, ?stats, "transfer finished");

        SimulationReport {
            delivered,
            stats,
            events,
        }
    }
}

/// Validate `config` and run it to completion.
pub fn run(config: SimulationConfig) -> Result<SimulationReport, ConfigError> {
    Ok(Simulation::new(config)?.run())
}
