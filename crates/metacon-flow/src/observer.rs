#![forbid(unsafe_code)]

use metacon_core::Observation;
use crate::variance::VarianceTracker;

/// Weight of a new RTT sample in the smoothed RTT.
/// srtt = (1 - g) * srtt + g * rtt
pub const SRTT_GAIN: f64 = 0.2;

/// Accumulates transport events between two decisions.
///
/// Interval counters reset every decision; lifetime extrema
/// (max throughput, min delay), the smoothed RTT and the window persist.
#[derive(Debug, Clone)]
pub struct IntervalObserver {
    sent_bytes: u64,
    sent_count: u64,
    loss_count: u64,
    smoothed_rtt: f64,
    delay: VarianceTracker,
    /// Lifetime minimum delay. 0 = no sample yet.
    min_delay: f64,
    /// Lifetime maximum interval throughput.
    throughput_max: f64,
    window: f64,
    interval_start_us: u64,
}

impl IntervalObserver {
    pub fn new(window: f64, now_us: u64) -> Self {
        Self {
            sent_bytes: 0,
            sent_count: 0,
            loss_count: 0,
            smoothed_rtt: 0.0,
            delay: VarianceTracker::new(),
            min_delay: 0.0,
            throughput_max: 0.0,
            window,
            interval_start_us: now_us,
        }
    }

    pub fn on_packet_acked(&mut self, sent_bytes: u64) {
        self.sent_bytes += sent_bytes;
        self.sent_count += 1;
    }

    pub fn on_packet_lost(&mut self) {
        self.loss_count += 1;
    }

    pub fn on_rtt_sample(&mut self, rtt: f64) {
        self.smoothed_rtt = (1.0 - SRTT_GAIN) * self.smoothed_rtt + SRTT_GAIN * rtt;
        self.delay.update(rtt);
    }

    /// Materializes the interval and folds it into the lifetime extrema.
    /// Call at most once per interval: a second call compares a shorter
    /// window's throughput against a max it already contributed to.
    pub fn observation(&mut self, now_us: u64) -> Observation {
        let obs = self.snapshot(now_us);
        self.commit(&obs);
        obs
    }

    /// Same value as `observation()` without touching lifetime state.
    pub fn snapshot(&self, now_us: u64) -> Observation {
        let elapsed = self.elapsed_secs(now_us);
        let throughput = if elapsed > 0.0 { self.sent_bytes as f64 / elapsed } else { 0.0 };

        let throughput_max = self.throughput_max.max(throughput);

        // An interval without RTT samples must not drag min_delay to 0
        let min_delay = if !self.delay.is_empty()
            && (self.min_delay == 0.0 || self.delay.min() < self.min_delay)
        {
            self.delay.min()
        } else {
            self.min_delay
        };

        Observation {
            throughput,
            throughput_max,
            avg_delay: self.delay.mean(),
            min_delay,
            loss_count: self.loss_count as f64,
            smoothed_rtt: self.smoothed_rtt,
            window_size: self.window,
        }
    }

    /// Folds a snapshot's extrema into lifetime state.
    pub fn commit(&mut self, obs: &Observation) {
        if obs.throughput_max > self.throughput_max {
            self.throughput_max = obs.throughput_max;
        }
        if obs.min_delay > 0.0 && (self.min_delay == 0.0 || obs.min_delay < self.min_delay) {
            self.min_delay = obs.min_delay;
        }
    }

    /// Starts a new interval at `now_us`.
    pub fn reset(&mut self, now_us: u64) {
        self.sent_bytes = 0;
        self.sent_count = 0;
        self.loss_count = 0;
        self.delay.reset();
        self.interval_start_us = now_us;
    }

    pub fn elapsed_secs(&self, now_us: u64) -> f64 {
        now_us.saturating_sub(self.interval_start_us) as f64 / 1_000_000.0
    }

    pub fn set_window(&mut self, window: f64) {
        self.window = window;
    }

    pub fn window(&self) -> f64 { self.window }
    pub fn sent_bytes(&self) -> u64 { self.sent_bytes }
    pub fn sent_count(&self) -> u64 { self.sent_count }
    pub fn loss_count(&self) -> u64 { self.loss_count }
    pub fn smoothed_rtt(&self) -> f64 { self.smoothed_rtt }
    pub fn min_delay(&self) -> f64 { self.min_delay }
    pub fn throughput_max(&self) -> f64 { self.throughput_max }
    pub fn delay(&self) -> &VarianceTracker { &self.delay }
}
