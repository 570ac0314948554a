use metacon_core::Observation;

const THROUGHPUT_WEIGHT: f64 = 10.0;
const DELAY_WEIGHT: f64 = 1.0;
const LOSS_PENALTY: f64 = 100.0;

/// Per-step reward used when training a policy against this bridge.
///
/// Rewards utilization (throughput relative to the best seen) and low
/// queueing (min delay relative to the interval's mean), and penalizes
/// every lost packet heavily. Ratios with a zero denominator contribute 0.
pub fn shaped_reward(obs: &Observation) -> f64 {
    let mut reward = 0.0;
    if obs.throughput_max > 0.0 {
        reward += THROUGHPUT_WEIGHT * (obs.throughput / obs.throughput_max);
    }
    if obs.avg_delay > 0.0 {
        reward += DELAY_WEIGHT * (obs.min_delay / obs.avg_delay);
    }
    reward - LOSS_PENALTY * obs.loss_count
}
