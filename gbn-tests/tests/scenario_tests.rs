//! End-to-end scenario tests for the GBN simulator
//!
//! Each test runs a whole transfer through real threads and a real (fast)
//! delay channel, then checks the delivered output and the recorded event
//! stream against the protocol's laws.

use gbn_protocol::{run, Event, SimulationConfig};
use std::time::Duration;

/// Fast-clock configuration: short delays so a test run finishes in tens
/// of milliseconds while keeping delay << timeout.
fn fast_config(data: &str, window: u64) -> SimulationConfig {
    let mut config = SimulationConfig::new(data.chars());
    config.window_size = window;
    config.propagation_delay = Duration::from_millis(5);
    config.retransmission_timeout = Duration::from_millis(150);
    config
}

/// Replay the event stream and check `0 <= next_seq - send_base <= window`
/// at every point. Sends and window slides are emitted under the sender's
/// state lock, so their order in the stream is the order things happened.
fn assert_window_invariant(events: &[Event], window: u64) {
    let mut outstanding: u64 = 0;
    for event in events {
        match event {
            Event::DataSent {
                retransmission: false,
                ..
            } => {
                outstanding += 1;
                assert!(
                    outstanding <= window,
                    "window exceeded: {outstanding} > {window}"
                );
            }
            Event::WindowSlide { covered, .. } => {
                assert!(*covered <= outstanding, "slide past the window edge");
                outstanding -= covered;
            }
            _ => {}
        }
    }
}

/// Check the cumulative-acknowledgment law: every acknowledgment the
/// receiver emits names exactly the highest contiguous prefix accepted so
/// far, never anything ahead of it.
fn assert_cumulative_ack_law(events: &[Event], seq_space: u64) {
    let mut accepted: u64 = 0;
    for event in events {
        match event {
            Event::DataAccepted { .. } => accepted += 1,
            Event::AckSent { slot } => {
                let expected = (accepted + seq_space - 1) % seq_space;
                assert_eq!(
                    *slot, expected,
                    "ack {slot} does not match contiguous prefix of {accepted}"
                );
            }
            _ => {}
        }
    }
}

#[test]
fn scenario_a_baseline_no_loss() {
    let report = run(fast_config("ABCD", 4)).unwrap();

    assert_eq!(report.delivered, "ABCD");
    assert_eq!(report.stats.data_sent, 4);
    assert_eq!(report.stats.retransmissions, 0);
    assert_eq!(report.stats.timeouts, 0);
    assert_eq!(report.stats.acks_sent, 4);
    assert_window_invariant(&report.events, 4);
    assert_cumulative_ack_law(&report.events, 8);
}

#[test]
fn scenario_b_single_data_loss() {
    let mut config = fast_config("ABCDEF", 4);
    config.packet_loss.insert(2);

    let report = run(config).unwrap();

    assert_eq!(report.delivered, "ABCDEF");
    assert_eq!(report.stats.data_dropped, 1);
    assert_eq!(report.stats.timeouts, 1, "exactly one timeout for slot 2");
    assert!(report.stats.retransmissions >= 1);
    assert_window_invariant(&report.events, 4);
    assert_cumulative_ack_law(&report.events, 8);

    // Go-back-N law: the timeout retransmits exactly the outstanding
    // window [send_base, next_seq), oldest first, never a subset.
    let timeout_at = report
        .events
        .iter()
        .position(|e| matches!(e, Event::Timeout { .. }))
        .expect("one timeout must fire");
    let Event::Timeout {
        base_slot,
        outstanding,
    } = report.events[timeout_at]
    else {
        unreachable!()
    };
    assert_eq!(base_slot, 2);

    let retransmitted: Vec<u64> = report.events[timeout_at..]
        .iter()
        .filter_map(|e| match e {
            Event::DataSent {
                slot,
                retransmission: true,
                ..
            } => Some(*slot),
            _ => None,
        })
        .take(outstanding as usize)
        .collect();
    let expected: Vec<u64> = (0..outstanding).map(|i| (base_slot + i) % 8).collect();
    assert_eq!(retransmitted, expected);
}

#[test]
fn scenario_c_ack_loss_covered_by_cumulative_ack() {
    let mut config = fast_config("ABCDEF", 4);
    config.ack_loss.insert(1);

    let report = run(config).unwrap();

    assert_eq!(report.delivered, "ABCDEF");
    assert_eq!(report.stats.acks_dropped, 1);
    // A later cumulative acknowledgment advances past the lost one;
    // nothing needs to be resent.
    assert_eq!(report.stats.timeouts, 0);
    assert_eq!(report.stats.retransmissions, 0);
    assert_window_invariant(&report.events, 4);
}

#[test]
fn scenario_d_window_smaller_than_data() {
    let report = run(fast_config("ABCDEF", 2)).unwrap();

    assert_eq!(report.delivered, "ABCDEF");
    // At most 2 packets outstanding at any instant.
    assert_window_invariant(&report.events, 2);
    assert_cumulative_ack_law(&report.events, 8);
}

#[test]
fn mixed_data_and_ack_loss_still_terminates_verbatim() {
    let mut config = fast_config("ABCDEFGH", 3);
    config.propagation_delay = Duration::from_millis(2);
    config.retransmission_timeout = Duration::from_millis(80);
    config.packet_loss.extend([1, 4]);
    config.ack_loss.extend([0, 2]);

    let report = run(config).unwrap();

    assert_eq!(report.delivered, "ABCDEFGH");
    assert_eq!(report.stats.data_dropped, 2);
    assert_window_invariant(&report.events, 3);
    assert_cumulative_ack_law(&report.events, 8);
}

#[test]
fn sequence_space_wraps_within_one_transfer() {
    // 12 items in a space of 5 wrap the slot numbers twice.
    let mut config = fast_config("ABCDEFGHIJKL", 4);
    config.seq_space = 5;

    let report = run(config).unwrap();

    assert_eq!(report.delivered, "ABCDEFGHIJKL");
    assert_window_invariant(&report.events, 4);
    assert_cumulative_ack_law(&report.events, 5);
}

#[test]
fn receiver_rejections_never_advance_delivery() {
    let mut config = fast_config("ABCDE", 4);
    config.packet_loss.insert(0);

    let report = run(config).unwrap();

    // Everything behind the lost head-of-line packet was rejected until
    // the retransmission arrived, yet delivery is in order and verbatim.
    assert_eq!(report.delivered, "ABCDE");
    assert!(report
        .events
        .iter()
        .any(|e| matches!(e, Event::OutOfOrder { .. })));
    assert_cumulative_ack_law(&report.events, 8);
}

#[test]
fn transfer_complete_and_all_acked_are_both_observed() {
    let report = run(fast_config("ABC", 2)).unwrap();

    assert!(report.events.contains(&Event::TransferComplete));
    assert!(report.events.contains(&Event::AllAcked));
}
