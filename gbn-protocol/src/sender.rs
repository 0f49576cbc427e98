//! Go-Back-N send side
//!
//! The sender keeps a sliding window of unacknowledged packets, advances it
//! on cumulative acknowledgments, and on timeout retransmits every packet
//! still outstanding. Three execution contexts share the window state: the
//! transmit loop, the acknowledgment loop, and the retransmission timer.
//! All of them mutate it only under one mutex, and the timer re-checks its
//! deadline under that lock before firing, so an acknowledgment racing a
//! timeout resolves to whichever acquires the lock first.

use crate::channel::NetworkChannel;
use crate::config::SimulationConfig;
use crate::event::{Event, EventBus};
use crate::packet::{DataPacket, Packet};
use crate::sequence::SeqSpace;
use crossbeam::channel::Receiver;
use parking_lot::{Condvar, Mutex};
use std::collections::HashMap;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Retransmission timer; at most one is logically active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimerState {
    Idle,
    Armed { deadline: Instant },
}

/// Window state shared by the transmit loop, ack loop, and timer thread.
struct SenderState {
    /// Oldest unacknowledged counter (unbounded, not reduced mod K).
    send_base: u64,
    /// Next counter to send (same unbounded space).
    next_seq: u64,
    /// Last packet sent per in-window slot (counter mod K).
    in_flight: HashMap<u64, DataPacket>,
    timer: TimerState,
    all_acked: bool,
    shutdown: bool,
}

struct Shared {
    state: Mutex<SenderState>,
    /// Signaled when the window slides or the final ack lands.
    window_cv: Condvar,
    /// Signaled when the timer is armed, disarmed, or shut down.
    timer_cv: Condvar,
}

/// Everything the three loops need; cheap to clone into their threads.
#[derive(Clone)]
struct SenderCore {
    space: SeqSpace,
    window: u64,
    timeout: Duration,
    /// Total items in the transfer.
    total: u64,
    shared: Arc<Shared>,
    channel: NetworkChannel,
    events: EventBus,
}

/// Send side of one run.
pub struct GbnSender {
    core: SenderCore,
    data: Vec<char>,
    ack_rx: Receiver<Packet>,
}

impl GbnSender {
    /// Create a sender for the configured transfer.
    ///
    /// The configuration must already be validated; in particular
    /// `window_size < seq_space` is assumed throughout.
    pub fn new(
        config: &SimulationConfig,
        channel: NetworkChannel,
        ack_rx: Receiver<Packet>,
        events: EventBus,
    ) -> Self {
        let core = SenderCore {
            space: SeqSpace::new(config.seq_space),
            window: config.window_size,
            timeout: config.retransmission_timeout,
            total: config.data.len() as u64,
            shared: Arc::new(Shared {
                state: Mutex::new(SenderState {
                    send_base: 0,
                    next_seq: 0,
                    in_flight: HashMap::new(),
                    timer: TimerState::Idle,
                    all_acked: false,
                    shutdown: false,
                }),
                window_cv: Condvar::new(),
                timer_cv: Condvar::new(),
            }),
            channel,
            events,
        };
        GbnSender {
            core,
            data: config.data.clone(),
            ack_rx,
        }
    }

    /// Drive the transfer to completion: send everything, then block until
    /// the final acknowledgment has been observed.
    pub fn run(self) {
        if self.core.total == 0 {
            // Nothing to transfer; trivially complete.
            self.core.events.emit(Event::AllAcked);
            return;
        }

        let ack_core = self.core.clone();
        let ack_rx = self.ack_rx;
        let ack_thread = thread::spawn(move || ack_core.ack_loop(ack_rx));

        let timer_core = self.core.clone();
        let timer_thread = thread::spawn(move || timer_core.timer_loop());

        self.core.transmit_loop(&self.data);

        {
            let mut st = self.core.shared.state.lock();
            st.shutdown = true;
            self.core.shared.timer_cv.notify_one();
        }
        let _ = ack_thread.join();
        let _ = timer_thread.join();
    }
}

impl SenderCore {
    /// Send new data whenever the window has room, blocking on the window
    /// condvar otherwise; then park until everything is acknowledged.
    fn transmit_loop(&self, data: &[char]) {
        let mut st = self.shared.state.lock();

        while st.next_seq < self.total {
            debug_assert!(st.next_seq - st.send_base <= self.window);
            if st.next_seq - st.send_base < self.window {
                let slot = self.space.slot(st.next_seq);
                let packet = DataPacket::new(slot, data[st.next_seq as usize]);
                st.in_flight.insert(slot, packet);
                let first_outstanding = st.send_base == st.next_seq;
                st.next_seq += 1;

                self.channel.send(packet.into());
                self.events.emit(Event::DataSent {
                    slot,
                    payload: packet.payload,
                    retransmission: false,
                });
                if first_outstanding {
                    self.arm_timer(&mut st);
                }
            } else {
                self.shared.window_cv.wait(&mut st);
            }
        }

        while !st.all_acked {
            self.shared.window_cv.wait(&mut st);
        }
    }

    /// Drain the sender-bound delivery path until the transfer is fully
    /// acknowledged.
    fn ack_loop(&self, ack_rx: Receiver<Packet>) {
        while let Ok(packet) = ack_rx.recv() {
            let ack = match packet {
                Packet::Ack(ack) => ack,
                // Routing guarantees only acknowledgments land here.
                Packet::Data(_) => continue,
            };
            self.events.emit(Event::AckReceived { slot: ack.slot });

            let mut st = self.shared.state.lock();
            let outstanding = st.next_seq - st.send_base;
            if let Some(covered) = self.space.ack_advance(st.send_base, outstanding, ack.slot) {
                for counter in st.send_base..st.send_base + covered {
                    st.in_flight.remove(&self.space.slot(counter));
                }
                st.send_base += covered;
                self.events.emit(Event::WindowSlide {
                    base_slot: self.space.slot(st.send_base),
                    covered,
                });

                self.disarm_timer(&mut st);
                if st.send_base < st.next_seq {
                    self.arm_timer(&mut st);
                }
                self.shared.window_cv.notify_all();
            }

            if st.send_base == self.total && !st.all_acked {
                st.all_acked = true;
                self.events.emit(Event::AllAcked);
                self.shared.window_cv.notify_all();
                break;
            }
        }
    }

    /// Park until armed, then sleep toward the deadline. Whatever happened
    /// while waking is re-read under the lock: a disarmed or re-armed timer
    /// simply goes back to waiting, a still-due one fires.
    fn timer_loop(&self) {
        let mut st = self.shared.state.lock();
        loop {
            if st.shutdown {
                return;
            }
            match st.timer {
                TimerState::Idle => {
                    self.shared.timer_cv.wait(&mut st);
                }
                TimerState::Armed { deadline } => {
                    if Instant::now() >= deadline {
                        self.fire_timeout(&mut st);
                    } else {
                        let _ = self.shared.timer_cv.wait_until(&mut st, deadline);
                    }
                }
            }
        }
    }

    /// Go back N: retransmit every outstanding packet, oldest first, then
    /// restart the timer unconditionally. Runs under the state lock.
    fn fire_timeout(&self, st: &mut SenderState) {
        let outstanding = st.next_seq - st.send_base;
        self.events.emit(Event::Timeout {
            base_slot: self.space.slot(st.send_base),
            outstanding,
        });

        for counter in st.send_base..st.next_seq {
            if let Some(packet) = st.in_flight.get(&self.space.slot(counter)) {
                let packet = *packet;
                self.channel.send(packet.into());
                self.events.emit(Event::DataSent {
                    slot: packet.slot,
                    payload: packet.payload,
                    retransmission: true,
                });
            }
        }
        self.arm_timer(st);
    }

    /// Arming always supersedes any previous deadline.
    fn arm_timer(&self, st: &mut SenderState) {
        st.timer = TimerState::Armed {
            deadline: Instant::now() + self.timeout,
        };
        self.shared.timer_cv.notify_one();
    }

    fn disarm_timer(&self, st: &mut SenderState) {
        st.timer = TimerState::Idle;
        self.shared.timer_cv.notify_one();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::NetworkChannel;
    use crate::packet::AckPacket;
    use std::collections::HashSet;

    fn config(data: &str, window: u64, timeout: Duration) -> SimulationConfig {
        let mut config = SimulationConfig::new(data.chars());
        config.window_size = window;
        config.propagation_delay = Duration::ZERO;
        config.retransmission_timeout = timeout;
        config
    }

    const RECV_WAIT: Duration = Duration::from_millis(500);

    #[test]
    fn test_completes_when_everything_is_acked() {
        let config = config("ABCD", 4, Duration::from_secs(5));
        let events = EventBus::new();
        let event_rx = events.subscribe();
        let (channel, endpoints, workers) = NetworkChannel::new(&config, events.clone());
        let sender = GbnSender::new(&config, channel.clone(), endpoints.ack_rx, events);

        // Scripted peer: acknowledge each data packet as it arrives.
        let data_rx = endpoints.data_rx;
        let peer_channel = channel.clone();
        let peer = thread::spawn(move || {
            for _ in 0..4 {
                let packet = data_rx.recv_timeout(RECV_WAIT).unwrap();
                peer_channel.send(AckPacket::new(packet.slot()).into());
            }
        });

        sender.run();
        peer.join().unwrap();
        drop(channel);
        workers.join();

        let events: Vec<Event> = event_rx.try_iter().collect();
        let stats = crate::event::SimulationStats::from_events(&events);
        assert_eq!(stats.data_sent, 4);
        assert_eq!(stats.retransmissions, 0);
        assert_eq!(stats.timeouts, 0);
        assert!(events.contains(&Event::AllAcked));
    }

    #[test]
    fn test_timeout_retransmits_entire_window() {
        let config = config("AB", 2, Duration::from_millis(50));
        let events = EventBus::new();
        let event_rx = events.subscribe();
        let (channel, endpoints, workers) = NetworkChannel::new(&config, events.clone());
        let sender = GbnSender::new(&config, channel.clone(), endpoints.ack_rx, events);

        // Scripted peer: swallow the first transmissions, wait for the
        // retransmitted window, then acknowledge everything cumulatively.
        let data_rx = endpoints.data_rx;
        let peer_channel = channel.clone();
        let peer = thread::spawn(move || {
            let mut seen = HashSet::new();
            // Two originals, then at least the two retransmissions.
            for _ in 0..4 {
                let packet = data_rx.recv_timeout(RECV_WAIT).unwrap();
                seen.insert(packet.slot());
            }
            peer_channel.send(AckPacket::new(1).into());
            // Drain anything from further timeouts so the channel empties.
            while data_rx.recv_timeout(Duration::from_millis(100)).is_ok() {}
            seen
        });

        sender.run();
        drop(channel);
        let seen = peer.join().unwrap();
        workers.join();

        assert_eq!(seen, HashSet::from([0, 1]));

        let events: Vec<Event> = event_rx.try_iter().collect();
        // The first timeout covers the whole outstanding window.
        let first_timeout = events
            .iter()
            .position(|e| matches!(e, Event::Timeout { .. }))
            .expect("a timeout must have fired");
        assert_eq!(
            events[first_timeout],
            Event::Timeout {
                base_slot: 0,
                outstanding: 2
            }
        );
        let retransmitted: Vec<u64> = events[first_timeout..]
            .iter()
            .take_while(|e| !matches!(e, Event::AckReceived { .. }))
            .filter_map(|e| match e {
                Event::DataSent {
                    slot,
                    retransmission: true,
                    ..
                } => Some(*slot),
                _ => None,
            })
            .take(2)
            .collect();
        assert_eq!(retransmitted, vec![0, 1]);
    }

    #[test]
    fn test_empty_transfer_is_trivially_complete() {
        let config = config("", 2, Duration::from_millis(50));
        let events = EventBus::new();
        let event_rx = events.subscribe();
        let (channel, endpoints, workers) = NetworkChannel::new(&config, events.clone());
        let sender = GbnSender::new(&config, channel.clone(), endpoints.ack_rx, events);

        sender.run();
        drop(channel);
        workers.join();

        let events: Vec<Event> = event_rx.try_iter().collect();
        assert_eq!(events, vec![Event::AllAcked]);
    }
}
