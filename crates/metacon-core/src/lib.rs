use serde::{Deserialize, Serialize};

/// Endpoint the decision process listens on unless configured otherwise.
/// Kept identical to the endpoint existing training environments bind.
pub const DEFAULT_SOCKET_PATH: &str = "/tmp/drl_comunication";

/// Size of the big-endian length prefix in front of every frame.
pub const FRAME_PREFIX_LEN: usize = 4;

/// Number of values in an observation vector.
pub const OBSERVATION_LEN: usize = 7;

/// One interval's worth of transport statistics.
///
/// On the wire this is a bare 7-element array in field order:
/// `[throughput, throughput_max, avg_delay, min_delay, loss_count, smoothed_rtt, window_size]`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "[f64; 7]", into = "[f64; 7]")]
pub struct Observation {
    /// Bytes acknowledged per second over the interval.
    pub throughput: f64,
    /// Highest interval throughput seen over the connection's lifetime.
    pub throughput_max: f64,
    /// Mean RTT sample of the interval, seconds.
    pub avg_delay: f64,
    /// Lowest RTT sample seen over the connection's lifetime, seconds.
    pub min_delay: f64,
    /// Packets declared lost since the last reset.
    pub loss_count: f64,
    /// Exponentially smoothed RTT, seconds.
    pub smoothed_rtt: f64,
    /// Congestion window in bytes at the time of the snapshot.
    pub window_size: f64,
}

impl Observation {
    pub fn to_array(&self) -> [f64; OBSERVATION_LEN] {
        [
            self.throughput,
            self.throughput_max,
            self.avg_delay,
            self.min_delay,
            self.loss_count,
            self.smoothed_rtt,
            self.window_size,
        ]
    }
}

impl From<[f64; OBSERVATION_LEN]> for Observation {
    fn from(v: [f64; OBSERVATION_LEN]) -> Self {
        Self {
            throughput: v[0],
            throughput_max: v[1],
            avg_delay: v[2],
            min_delay: v[3],
            loss_count: v[4],
            smoothed_rtt: v[5],
            window_size: v[6],
        }
    }
}

impl From<Observation> for [f64; OBSERVATION_LEN] {
    fn from(o: Observation) -> Self {
        o.to_array()
    }
}

/// Controller -> decision process.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DecisionRequest {
    pub observation: Observation,
    pub window: f64,
}

/// Decision process -> controller.
///
/// `action` is a signed exponent applied as `window * 2^action`.
/// A reply without an `action` key means "no change".
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DecisionResponse {
    #[serde(default)]
    pub action: f64,
}

impl DecisionResponse {
    pub const HOLD: Self = Self { action: 0.0 };

    pub fn new(action: f64) -> Self {
        Self { action }
    }
}

pub type BridgeResult<T> = Result<T, BridgeError>;

#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// Peer closed the stream on a frame boundary.
    #[error("decision channel closed by peer")]
    ChannelClosed,
    /// Truncated frame or a payload that does not decode.
    #[error("malformed frame: {0}")]
    MalformedFrame(String),
    #[error("failed to connect to decision endpoint: {0}")]
    ConnectFailed(#[source] std::io::Error),
    /// A tick's exchange failed; the interval's statistics were kept.
    #[error("decision exchange aborted: {0}")]
    ExchangeAborted(#[source] Box<BridgeError>),
    #[error("timed out waiting on decision channel")]
    Timeout,
    #[error("decision channel not connected")]
    NotConnected,
    #[error("handoff slot disconnected")]
    SlotDisconnected,
    #[error("decision channel i/o: {0}")]
    Io(#[from] std::io::Error),
}

impl BridgeError {
    /// Errors after which the current connection cannot be trusted to stay in lock-step.
    pub fn poisons_connection(&self) -> bool {
        match self {
            BridgeError::ExchangeAborted(inner) => inner.poisons_connection(),
            BridgeError::ConnectFailed(_)
            | BridgeError::NotConnected
            | BridgeError::SlotDisconnected => false,
            BridgeError::ChannelClosed
            | BridgeError::MalformedFrame(_)
            | BridgeError::Timeout
            | BridgeError::Io(_) => true,
        }
    }

    /// Strips any `ExchangeAborted` wrapping.
    pub fn root_cause(&self) -> &BridgeError {
        match self {
            BridgeError::ExchangeAborted(inner) => inner.root_cause(),
            other => other,
        }
    }

    pub fn malformed(msg: impl Into<String>) -> Self {
        BridgeError::MalformedFrame(msg.into())
    }
}

impl From<serde_json::Error> for BridgeError {
    fn from(e: serde_json::Error) -> Self {
        BridgeError::MalformedFrame(e.to_string())
    }
}
