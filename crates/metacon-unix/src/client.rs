use std::net::Shutdown;
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::{debug, info};
use metacon_core::{BridgeError, BridgeResult, DecisionRequest, DecisionResponse};
use metacon_hal::DecisionTransport;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::framing::{read_frame_until, write_frame};

/// Requesting side of the exchange.
///
/// Dials lazily on the first send. Any failure drops the connection,
/// so the next send redials instead of reading a reply that belongs to
/// an earlier request.
pub struct ExchangeClient {
    path: PathBuf,
    stream: Option<UnixStream>,
    exchange_timeout: Option<Duration>,
}

impl ExchangeClient {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            stream: None,
            exchange_timeout: None,
        }
    }

    /// Bounds every read and write on the connection. A timed-out
    /// exchange returns `Timeout` and drops the connection.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.exchange_timeout = timeout;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn send_message<T: Serialize>(&mut self, msg: &T) -> BridgeResult<()> {
        if self.stream.is_none() {
            self.dial()?;
        }
        let stream = self.stream.as_mut().ok_or(BridgeError::NotConnected)?;
        let res = write_frame(stream, msg);
        if res.is_err() {
            self.drop_stream();
        }
        res
    }

    pub fn receive_message<T: DeserializeOwned>(&mut self) -> BridgeResult<T> {
        let stream = self.stream.as_mut().ok_or(BridgeError::NotConnected)?;
        let res = read_frame_until(stream, None);
        if res.is_err() {
            self.drop_stream();
        }
        res
    }

    fn dial(&mut self) -> BridgeResult<()> {
        let stream = UnixStream::connect(&self.path).map_err(BridgeError::ConnectFailed)?;
        stream.set_read_timeout(self.exchange_timeout)?;
        stream.set_write_timeout(self.exchange_timeout)?;
        info!("connected to decision endpoint {}", self.path.display());
        self.stream = Some(stream);
        Ok(())
    }

    fn drop_stream(&mut self) {
        if let Some(stream) = self.stream.take() {
            let _ = stream.shutdown(Shutdown::Both);
            debug!("dropped connection to {}", self.path.display());
        }
    }
}

impl DecisionTransport for ExchangeClient {
    fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    fn connect(&mut self) -> BridgeResult<()> {
        self.drop_stream();
        self.dial()
    }

    fn send(&mut self, request: &DecisionRequest) -> BridgeResult<()> {
        self.send_message(request)
    }

    fn receive(&mut self) -> BridgeResult<DecisionResponse> {
        self.receive_message()
    }

    fn disconnect(&mut self) {
        self.drop_stream();
    }
}
