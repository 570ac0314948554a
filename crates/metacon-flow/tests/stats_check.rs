use metacon_core::Observation;
use metacon_flow::{shaped_reward, IntervalObserver, VarianceTracker};

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() <= 1e-7 * (1.0 + a.abs().max(b.abs()))
}

fn two_pass(samples: &[f64]) -> (f64, f64) {
    let n = samples.len() as f64;
    let mean = samples.iter().sum::<f64>() / n;
    let var = samples.iter().map(|x| (x - mean) * (x - mean)).sum::<f64>() / (n - 1.0);
    (mean, var)
}

#[test]
fn test_welford_matches_two_pass() {
    // RTT-like samples around 20ms plus a large offset series to stress cancellation
    let rtts = [0.021, 0.019, 0.025, 0.020, 0.043, 0.018, 0.022, 0.030];
    let offset: Vec<f64> = (0..500).map(|i| 1.0e6 + ((i * 37) % 11) as f64 * 0.25).collect();

    for samples in [&rtts[..], &offset[..]] {
        let mut t = VarianceTracker::new();
        for &x in samples { t.update(x); }

        let (mean, var) = two_pass(samples);
        assert_eq!(t.count(), samples.len() as u64);
        assert!(close(t.mean(), mean), "mean {} vs {}", t.mean(), mean);
        assert!(close(t.variance(), var), "var {} vs {}", t.variance(), var);
        assert!(close(t.sum(), samples.iter().sum()));
    }
}

#[test]
fn test_extrema_and_seeded_reset() {
    let mut t = VarianceTracker::new();
    for x in [5.0, 3.0, 9.0, 1.0] { t.update(x); }
    assert_eq!(t.min(), 1.0);
    assert_eq!(t.max(), 9.0);

    // Unseeded reset forgets the extrema entirely
    t.reset();
    assert_eq!(t.min(), 0.0);
    assert_eq!(t.max(), 0.0);
    t.update(4.0);
    assert_eq!(t.min(), 4.0);

    // Seeded reset returns to the bounds, not the last observations
    let mut b = VarianceTracker::with_bounds(Some(2.0), Some(6.0));
    for x in [5.0, 3.0, 9.0, 1.0] { b.update(x); }
    assert_eq!(b.min(), 1.0);
    assert_eq!(b.max(), 9.0);
    b.reset();
    assert_eq!(b.min(), 2.0);
    assert_eq!(b.max(), 6.0);
    assert_eq!(b.mean(), 0.0);
    assert_eq!(b.variance(), 0.0);
}

#[test]
fn test_observer_interval() {
    let start = 10_000_000;
    let mut obs = IntervalObserver::new(14_000.0, start);

    for _ in 0..3 { obs.on_packet_acked(1400); }
    obs.on_rtt_sample(0.02);

    let o = obs.observation(start + 500_000);
    assert!(close(o.throughput, 8400.0));
    assert!(close(o.throughput_max, 8400.0));
    assert!(close(o.avg_delay, 0.02));
    assert!(close(o.min_delay, 0.02));
    assert_eq!(o.loss_count, 0.0);
    assert!(close(o.smoothed_rtt, 0.004));
    assert_eq!(o.window_size, 14_000.0);

    obs.reset(start + 500_000);
    assert_eq!(obs.sent_bytes(), 0);
    assert_eq!(obs.sent_count(), 0);
    assert!(close(obs.throughput_max(), 8400.0));
    assert!(close(obs.min_delay(), 0.02));
    assert!(close(obs.smoothed_rtt(), 0.004));
}

#[test]
fn test_zero_elapsed_throughput() {
    let mut obs = IntervalObserver::new(1.0, 5_000);
    obs.on_packet_acked(1400);
    assert_eq!(obs.observation(5_000).throughput, 0.0);
    // Clock behind the interval start behaves the same
    assert_eq!(obs.observation(1_000).throughput, 0.0);
}

#[test]
fn test_lifetime_extrema_are_monotone() {
    let mut obs = IntervalObserver::new(1.0, 0);
    obs.on_packet_acked(10_000);
    obs.on_rtt_sample(0.030);
    obs.observation(1_000_000);
    obs.reset(1_000_000);

    // Quieter interval, no RTT samples: neither extreme may regress
    obs.on_packet_acked(1_000);
    let o = obs.observation(2_000_000);
    assert!(close(o.throughput, 1_000.0));
    assert!(close(o.throughput_max, 10_000.0));
    assert!(close(o.min_delay, 0.030));
    assert_eq!(o.avg_delay, 0.0);
    obs.reset(2_000_000);

    obs.on_rtt_sample(0.050);
    obs.on_rtt_sample(0.010);
    let o = obs.observation(3_000_000);
    assert!(close(o.min_delay, 0.010));
    assert!(close(o.avg_delay, 0.030));
}

#[test]
fn test_snapshot_has_no_side_effect() {
    let mut obs = IntervalObserver::new(1.0, 0);
    obs.on_packet_acked(5_000);
    obs.on_rtt_sample(0.02);

    let snap = obs.snapshot(1_000_000);
    assert!(close(snap.throughput_max, 5_000.0));
    assert_eq!(obs.throughput_max(), 0.0);
    assert_eq!(obs.min_delay(), 0.0);

    obs.commit(&snap);
    assert!(close(obs.throughput_max(), 5_000.0));
    assert!(close(obs.min_delay(), 0.02));
}

#[test]
fn test_losses_counted_per_interval() {
    let mut obs = IntervalObserver::new(1.0, 0);
    obs.on_packet_lost();
    obs.on_packet_lost();
    assert_eq!(obs.snapshot(1).loss_count, 2.0);
    obs.reset(1);
    assert_eq!(obs.snapshot(2).loss_count, 0.0);
}

#[test]
fn test_reward_shape() {
    let mut o = Observation {
        throughput: 5.0,
        throughput_max: 10.0,
        avg_delay: 0.04,
        min_delay: 0.02,
        loss_count: 0.0,
        smoothed_rtt: 0.03,
        window_size: 14_000.0,
    };
    assert!(close(shaped_reward(&o), 5.5));

    o.loss_count = 1.0;
    assert!(close(shaped_reward(&o), -94.5));

    // Cold start: no ratios defined yet
    assert_eq!(shaped_reward(&Observation::default()), 0.0);
}
