//! Go-Back-N ARQ Simulator Core
//!
//! This crate implements a discrete-event-style simulation of the
//! Go-Back-N automatic repeat request protocol: a sliding-window sender,
//! an in-order-enforcing receiver, and an asynchronous delay-and-loss
//! channel between them. Packets are in-process values on in-memory
//! queues; there is no wire format and no real network I/O.

pub mod channel;
pub mod config;
pub mod event;
pub mod packet;
pub mod receiver;
pub mod sender;
pub mod sequence;
pub mod simulation;

pub use channel::{ChannelEndpoints, ChannelWorkers, NetworkChannel};
pub use config::{ConfigError, SimulationConfig};
pub use event::{Event, EventBus, SimulationStats};
pub use packet::{AckPacket, DataPacket, Packet};
pub use receiver::GbnReceiver;
pub use sender::GbnSender;
pub use sequence::SeqSpace;
pub use simulation::{run, Simulation, SimulationReport};
