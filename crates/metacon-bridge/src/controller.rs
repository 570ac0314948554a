use log::info;
use metacon_core::BridgeResult;
use metacon_flow::IntervalObserver;
use metacon_hal::{CongestionHooks, DecisionTransport, PlatformClock};

use crate::config::ControllerConfig;
use crate::decision::{DecisionLoop, LoopStats};
use crate::window::WindowState;

/// Congestion controller whose window is chosen by a decision process.
///
/// All state is owned here and only touched from the transport's event
/// thread; the only cross-thread traffic is the exchange itself.
pub struct MetaConController {
    observer: IntervalObserver,
    window: WindowState,
    bytes_in_flight: u64,
    decision: DecisionLoop,
}

impl MetaConController {
    pub fn new(
        config: &ControllerConfig,
        transport: Box<dyn DecisionTransport>,
        clock: Box<dyn PlatformClock>,
    ) -> Self {
        let initial = config.initial_window();
        let observer = IntervalObserver::new(initial, clock.now_us());
        let decision = DecisionLoop::new(config.cadence, transport, clock);

        info!(
            "meta_con controller: initial window {} bytes, decision every {:?}",
            initial, config.cadence
        );

        Self {
            observer,
            window: WindowState::new(initial),
            bytes_in_flight: 0,
            decision,
        }
    }

    pub fn observer(&self) -> &IntervalObserver {
        &self.observer
    }

    pub fn window(&self) -> &WindowState {
        &self.window
    }

    pub fn stats(&self) -> &LoopStats {
        self.decision.stats()
    }

    /// Runs a decision now, ignoring the cadence.
    pub fn force_decision(&mut self) -> BridgeResult<f64> {
        self.decision.tick(&mut self.observer, &mut self.window)
    }

    fn run_pending(&mut self) {
        // Failures are logged by the loop and retried next cadence
        let _ = self.decision.poll(&mut self.observer, &mut self.window);
    }

    fn release(&mut self, bytes: u64) {
        self.bytes_in_flight = self.bytes_in_flight.saturating_sub(bytes);
    }
}

impl CongestionHooks for MetaConController {
    fn on_packet_sent(&mut self, bytes: u64) {
        self.bytes_in_flight += bytes;
        self.run_pending();
    }

    fn on_packet_acked(&mut self, bytes: u64) {
        self.release(bytes);
        self.observer.on_packet_acked(bytes);
        self.run_pending();
    }

    fn on_packets_lost(&mut self, packets: &[u64]) {
        for &bytes in packets {
            self.release(bytes);
            self.observer.on_packet_lost();
        }
        self.run_pending();
    }

    fn on_packets_expired(&mut self, packets: &[u64]) {
        for &bytes in packets {
            self.release(bytes);
            self.observer.on_packet_lost();
        }
    }

    fn on_rtt_measurement(&mut self, rtt: f64) {
        self.observer.on_rtt_sample(rtt);
        self.run_pending();
    }

    fn congestion_window(&self) -> u64 {
        self.window.current() as u64
    }

    fn bytes_in_flight(&self) -> u64 {
        self.bytes_in_flight
    }
}
