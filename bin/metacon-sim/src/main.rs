use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::Parser;
use log::{info, warn};
use metacon_bridge::{ControllerConfig, MetaConController};
use metacon_core::DEFAULT_SOCKET_PATH;
use metacon_hal::CongestionHooks;
use metacon_unix::{ExchangeClient, SystemClock};
use rand::Rng;

/// Drives a `MetaConController` over a simulated bottleneck link so a
/// decision process can be exercised without a real transport.
#[derive(Parser)]
struct Cli {
    #[arg(long, default_value = DEFAULT_SOCKET_PATH)] socket: PathBuf,
    /// Bottleneck rate in bytes per second.
    #[arg(long, default_value_t = 1_000_000)] rate_bps: u64,
    /// Base round-trip time.
    #[arg(long, default_value_t = 40)] rtt_ms: u64,
    /// Random loss probability per packet.
    #[arg(long, default_value_t = 0.0)] loss: f64,
    #[arg(long, default_value_t = 30)] seconds: u64,
    #[arg(long, default_value_t = 1000)] cadence_ms: u64,
    /// Bound on one decision exchange (0 = wait forever).
    #[arg(long, default_value_t = 0)] timeout_ms: u64,
}

struct InFlight {
    bytes: u64,
    sent_at: Instant,
    settle_at: Instant,
    lost: bool,
}

/// Single-queue bottleneck: packets serialize at `rate_bps`, then
/// travel for half an RTT each way.
struct Link {
    rate_bps: u64,
    base_rtt: Duration,
    loss: f64,
    free_at: Instant,
    queue: VecDeque<InFlight>,
}

impl Link {
    fn new(rate_bps: u64, base_rtt: Duration, loss: f64) -> Self {
        Self {
            rate_bps: rate_bps.max(1),
            base_rtt,
            loss: if loss.is_finite() { loss.clamp(0.0, 1.0) } else { 0.0 },
            free_at: Instant::now(),
            queue: VecDeque::new(),
        }
    }

    fn transmit<R: Rng>(&mut self, bytes: u64, now: Instant, rng: &mut R) {
        let serialize = Duration::from_secs_f64(bytes as f64 / self.rate_bps as f64);
        let start = self.free_at.max(now);
        self.free_at = start + serialize;

        let jitter = Duration::from_micros(rng.gen_range(0..=500));
        self.queue.push_back(InFlight {
            bytes,
            sent_at: now,
            settle_at: self.free_at + self.base_rtt + jitter,
            lost: rng.gen_bool(self.loss),
        });
    }

    fn queued(&self, now: Instant) -> Duration {
        self.free_at.saturating_duration_since(now)
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        warn!("Signal received. Stopping...");
        r.store(false, Ordering::SeqCst);
    })?;

    let config = ControllerConfig {
        cadence: Duration::from_millis(cli.cadence_ms),
        socket_path: cli.socket.clone(),
        exchange_timeout: (cli.timeout_ms > 0).then(|| Duration::from_millis(cli.timeout_ms)),
        ..ControllerConfig::default()
    };
    let client = ExchangeClient::new(&config.socket_path).with_timeout(config.exchange_timeout);
    let mut cc = MetaConController::new(&config, Box::new(client), Box::new(SystemClock::new()));

    let mut link = Link::new(cli.rate_bps, Duration::from_millis(cli.rtt_ms), cli.loss);
    let mut rng = rand::thread_rng();

    info!(
        "sim: {} B/s bottleneck, {} ms rtt, {:.1}% loss, decisions at {}",
        cli.rate_bps, cli.rtt_ms, cli.loss * 100.0, cli.socket.display()
    );

    let start = Instant::now();
    let end = start + Duration::from_secs(cli.seconds);
    let mut next_report = start + Duration::from_secs(1);
    let mut acked_bytes = 0u64;
    let mut lost_packets = 0u64;

    while running.load(Ordering::SeqCst) && Instant::now() < end {
        let now = Instant::now();

        // Settle everything that reached its ack/loss deadline
        let mut lost = Vec::new();
        while link.queue.front().map_or(false, |p| p.settle_at <= now) {
            let Some(p) = link.queue.pop_front() else { break };
            if p.lost {
                lost.push(p.bytes);
                continue;
            }
            acked_bytes += p.bytes;
            cc.on_packet_acked(p.bytes);
            cc.on_rtt_measurement(now.duration_since(p.sent_at).as_secs_f64());
        }
        if !lost.is_empty() {
            lost_packets += lost.len() as u64;
            cc.on_packets_lost(&lost);
        }

        let mss = config.max_datagram_size;
        while cc.can_send(mss) {
            link.transmit(mss, now, &mut rng);
            cc.on_packet_sent(mss);
        }

        if now >= next_report {
            let elapsed = now.duration_since(start).as_secs_f64();
            info!(
                "t={:.0}s cwnd {} inflight {} queue {:?} goodput {:.0} B/s lost {} decisions {}/{}",
                elapsed,
                cc.congestion_window(),
                cc.bytes_in_flight(),
                link.queued(now),
                acked_bytes as f64 / elapsed,
                lost_packets,
                cc.stats().exchanges_ok,
                cc.stats().ticks,
            );
            next_report += Duration::from_secs(1);
        }

        std::thread::sleep(Duration::from_millis(1));
    }

    let stats = cc.stats();
    info!(
        "done: {} decisions ({} failed), final window {} bytes",
        stats.exchanges_ok, stats.exchanges_failed, cc.congestion_window()
    );
    Ok(())
}
