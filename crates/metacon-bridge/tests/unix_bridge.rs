use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use metacon_bridge::{ControllerConfig, MetaConController};
use metacon_core::{BridgeError, DecisionRequest, DecisionResponse};
use metacon_hal::{CongestionHooks, PlatformClock};
use metacon_unix::{ExchangeClient, ExchangeServer, ServerConfig};

#[derive(Clone)]
struct MockClock { t: Arc<AtomicU64> }
impl PlatformClock for MockClock {
    fn now_us(&self) -> u64 { self.t.load(Ordering::SeqCst) }
}

fn socket_path(tag: &str) -> PathBuf {
    std::env::temp_dir().join(format!("metacon-bridge-{}-{}.sock", tag, std::process::id()))
}

fn build(path: &PathBuf) -> (MetaConController, MockClock) {
    let clock = MockClock { t: Arc::new(AtomicU64::new(0)) };
    let config = ControllerConfig {
        socket_path: path.clone(),
        exchange_timeout: Some(Duration::from_secs(5)),
        ..ControllerConfig::default()
    };
    let client = ExchangeClient::new(&config.socket_path).with_timeout(config.exchange_timeout);
    let cc = MetaConController::new(&config, Box::new(client), Box::new(clock.clone()));
    (cc, clock)
}

#[test]
fn test_controller_over_unix_socket() {
    let path = socket_path("e2e");
    let config = ServerConfig {
        read_timeout: Duration::from_millis(200),
        poll_interval: Duration::from_millis(10),
    };
    let server =
        ExchangeServer::<DecisionRequest, DecisionResponse>::bind_with(&path, config).unwrap();
    let (mut cc, clock) = build(&path);

    let seen = thread::scope(|s| {
        let agent = s.spawn(|| {
            let mut seen = Vec::new();
            for action in [1.0, -0.5] {
                let req = server.receive().unwrap();
                seen.push(req);
                server.send(DecisionResponse::new(action)).unwrap();
            }
            seen
        });

        for _ in 0..3 { cc.on_packet_acked(1400); }
        clock.t.store(1_000_000, Ordering::SeqCst);
        cc.on_rtt_measurement(0.02);
        assert_eq!(cc.congestion_window(), 28_000);

        clock.t.store(2_000_000, Ordering::SeqCst);
        cc.on_packet_acked(1400);
        agent.join().unwrap()
    });

    assert_eq!(seen.len(), 2);
    assert_eq!(seen[0].window, 14_000.0);
    assert!((seen[0].observation.throughput - 4200.0).abs() < 1e-6);
    assert_eq!(seen[1].window, 28_000.0);
    assert_eq!(seen[1].observation.window_size, 28_000.0);
    assert!((cc.window().current() - 28_000.0 / 2f64.sqrt()).abs() < 1e-6);
}

#[test]
fn test_missing_decision_process_is_a_noop_tick() {
    let path = socket_path("absent");
    let _ = std::fs::remove_file(&path);
    let (mut cc, clock) = build(&path);

    cc.on_packet_acked(1400);
    clock.t.store(1_000_000, Ordering::SeqCst);
    cc.on_packet_acked(1400);

    assert_eq!(cc.stats().exchanges_failed, 1);
    assert_eq!(cc.congestion_window(), 14_000);
    assert_eq!(cc.observer().sent_bytes(), 2800);

    let err = cc.force_decision().unwrap_err();
    assert!(matches!(err.root_cause(), BridgeError::ConnectFailed(_)));
}
