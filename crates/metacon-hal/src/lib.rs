#![forbid(unsafe_code)]

use metacon_core::{BridgeResult, DecisionRequest, DecisionResponse};

/// The Wall Clock.
/// Monotonic microseconds; the origin is implementation defined.
pub trait PlatformClock: Send + Sync {
    fn now_us(&self) -> u64;
}

/// Callbacks a transport delivers to its congestion controller.
///
/// INVARIANT: Every hook may block for one decision round trip.
/// Transports must call them from their own event thread, never from
/// inside the decision process.
pub trait CongestionHooks {
    fn on_packet_sent(&mut self, bytes: u64);

    fn on_packet_acked(&mut self, bytes: u64);

    /// Packets declared lost by loss detection.
    fn on_packets_lost(&mut self, packets: &[u64]);

    /// Packets dropped without a loss signal (e.g. key discard).
    /// Accounted like losses but never triggers a decision.
    fn on_packets_expired(&mut self, packets: &[u64]);

    /// RTT sample in seconds.
    fn on_rtt_measurement(&mut self, rtt: f64);

    /// Bytes the transport may have in flight.
    fn congestion_window(&self) -> u64;

    fn bytes_in_flight(&self) -> u64;

    fn can_send(&self, bytes: u64) -> bool {
        self.bytes_in_flight().saturating_add(bytes) <= self.congestion_window()
    }
}

/// Requesting side of the decision exchange.
///
/// Exactly one `send` may be outstanding; the caller must `receive`
/// its reply before sending again.
pub trait DecisionTransport: Send {
    fn is_connected(&self) -> bool;

    fn connect(&mut self) -> BridgeResult<()>;

    fn send(&mut self, request: &DecisionRequest) -> BridgeResult<()>;

    fn receive(&mut self) -> BridgeResult<DecisionResponse>;

    /// Drop the current connection so the next exchange redials.
    fn disconnect(&mut self);
}
