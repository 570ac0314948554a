use std::path::PathBuf;
use std::time::Duration;

use metacon_core::DEFAULT_SOCKET_PATH;

#[derive(Debug, Clone)]
pub struct ControllerConfig {
    pub max_datagram_size: u64,
    /// Initial window in datagrams. The initial window is also the floor.
    pub initial_window_packets: u64,
    /// Interval between decisions.
    pub cadence: Duration,
    /// Endpoint of the decision process.
    pub socket_path: PathBuf,
    /// Bound on one exchange. `None` blocks until the decision process
    /// answers; with a bound, a late answer is discarded with its
    /// connection and the next tick redials.
    pub exchange_timeout: Option<Duration>,
}

impl ControllerConfig {
    pub fn initial_window(&self) -> f64 {
        (self.max_datagram_size * self.initial_window_packets) as f64
    }
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            max_datagram_size: 1400,
            initial_window_packets: 10,
            cadence: Duration::from_secs(1),
            socket_path: PathBuf::from(DEFAULT_SOCKET_PATH),
            exchange_timeout: None,
        }
    }
}
