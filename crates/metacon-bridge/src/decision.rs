use std::time::Duration;

use log::{debug, warn};
use metacon_core::{BridgeError, BridgeResult, DecisionRequest};
use metacon_flow::IntervalObserver;
use metacon_hal::{DecisionTransport, PlatformClock};

use crate::window::WindowState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    Exchanging,
    Applying,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LoopStats {
    pub ticks: u64,
    pub exchanges_ok: u64,
    pub exchanges_failed: u64,
    pub last_action: Option<f64>,
}

/// Once-per-cadence exchange of an observation for an action.
///
/// There is no timer thread. `poll()` is called from the transport's
/// event path and runs a tick only if the cadence boundary has passed,
/// so ticks happen on the first event at or after each boundary.
/// The exchange blocks that event path for one round trip.
pub struct DecisionLoop {
    cadence_us: u64,
    next_tick_us: u64,
    state: LoopState,
    transport: Box<dyn DecisionTransport>,
    clock: Box<dyn PlatformClock>,
    stats: LoopStats,
}

impl DecisionLoop {
    /// The first tick is due one cadence from now.
    pub fn new(
        cadence: Duration,
        transport: Box<dyn DecisionTransport>,
        clock: Box<dyn PlatformClock>,
    ) -> Self {
        let cadence_us = cadence.as_micros() as u64;
        let next_tick_us = clock.now_us().saturating_add(cadence_us);
        Self {
            cadence_us,
            next_tick_us,
            state: LoopState::Idle,
            transport,
            clock,
            stats: LoopStats::default(),
        }
    }

    pub fn now_us(&self) -> u64 {
        self.clock.now_us()
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn stats(&self) -> &LoopStats {
        &self.stats
    }

    pub fn next_tick_us(&self) -> u64 {
        self.next_tick_us
    }

    pub fn is_due(&self) -> bool {
        self.clock.now_us() >= self.next_tick_us
    }

    /// Runs a tick if one is due. `None` if it was not.
    pub fn poll(
        &mut self,
        observer: &mut IntervalObserver,
        window: &mut WindowState,
    ) -> Option<BridgeResult<f64>> {
        if !self.is_due() {
            return None;
        }
        Some(self.tick(observer, window))
    }

    /// Runs one tick now, due or not, and schedules the next one a
    /// cadence after it ends.
    ///
    /// On failure nothing is applied: the window keeps its value and the
    /// observer keeps accumulating, so the next tick reports both
    /// intervals together.
    pub fn tick(
        &mut self,
        observer: &mut IntervalObserver,
        window: &mut WindowState,
    ) -> BridgeResult<f64> {
        self.stats.ticks += 1;
        let res = self.exchange(observer, window);
        self.state = LoopState::Idle;
        self.next_tick_us = self.clock.now_us().saturating_add(self.cadence_us);

        match res {
            Ok(w) => {
                self.stats.exchanges_ok += 1;
                Ok(w)
            }
            Err(e) => {
                self.stats.exchanges_failed += 1;
                if e.poisons_connection() {
                    self.transport.disconnect();
                }
                warn!("decision tick aborted, keeping interval statistics: {}", e);
                Err(BridgeError::ExchangeAborted(Box::new(e)))
            }
        }
    }

    fn exchange(
        &mut self,
        observer: &mut IntervalObserver,
        window: &mut WindowState,
    ) -> BridgeResult<f64> {
        let now = self.clock.now_us();
        let observation = observer.snapshot(now);
        let request = DecisionRequest { observation, window: window.current() };

        self.state = LoopState::Exchanging;
        if !self.transport.is_connected() {
            self.transport.connect()?;
        }
        self.transport.send(&request)?;
        let response = self.transport.receive()?;

        self.state = LoopState::Applying;
        let new_window = window.apply(response.action)?;
        observer.set_window(new_window);
        observer.commit(&observation);
        observer.reset(self.clock.now_us());

        self.stats.last_action = Some(response.action);
        debug!(
            "action {:+.3}: window {:.0} -> {:.0} (thr {:.0} B/s, srtt {:.4}s, loss {})",
            response.action, request.window, new_window,
            observation.throughput, observation.smoothed_rtt, observation.loss_count
        );
        Ok(new_window)
    }
}
