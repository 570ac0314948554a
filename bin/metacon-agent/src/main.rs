use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use log::{info, warn};
use metacon_core::{DecisionRequest, DecisionResponse, DEFAULT_SOCKET_PATH};
use metacon_flow::shaped_reward;
use metacon_unix::ExchangeServer;

/// Stand-in decision process: answers every observation with a fixed action.
#[derive(Parser)]
struct Cli {
    #[arg(long, default_value = DEFAULT_SOCKET_PATH)] socket: PathBuf,
    /// Exponent applied to the window on every decision (0 = hold).
    #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)] action: f64,
    /// Think time before each reply.
    #[arg(long, default_value_t = 0)] delay_ms: u64,
    /// Exit after this many decisions.
    #[arg(long)] steps: Option<u64>,
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

    let mut server = ExchangeServer::<DecisionRequest, DecisionResponse>::bind(&cli.socket)?;
    info!("agent ready on {} (action {:+})", cli.socket.display(), cli.action);

    let mut step = 0u64;
    let mut total_reward = 0.0;
    while running.load(Ordering::SeqCst) {
        let req = match server.receive_timeout(Duration::from_millis(200))? {
            Some(req) => req,
            None => continue,
        };

        step += 1;
        let obs = req.observation;
        let reward = shaped_reward(&obs);
        total_reward += reward;
        info!(
            "step {}: window {:.0} thr {:.0}/{:.0} B/s delay {:.4}/{:.4}s srtt {:.4}s loss {} reward {:.3}",
            step, req.window, obs.throughput, obs.throughput_max,
            obs.avg_delay, obs.min_delay, obs.smoothed_rtt, obs.loss_count, reward
        );

        if cli.delay_ms > 0 {
            std::thread::sleep(Duration::from_millis(cli.delay_ms));
        }
        server.send(DecisionResponse::new(cli.action))?;

        if cli.steps.map_or(false, |n| step >= n) {
            break;
        }
    }

    server.stop();
    info!("served {} decisions, total reward {:.3}", step, total_reward);
    Ok(())
}
