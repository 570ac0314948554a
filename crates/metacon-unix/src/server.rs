use std::fs;
use std::io::ErrorKind;
use std::marker::PhantomData;
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{debug, info, warn};
use metacon_core::{BridgeError, BridgeResult};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::framing::{read_frame_until, write_frame};
use crate::slot::{slot, SlotReceiver, SlotSender};

#[derive(Debug, Clone, Copy)]
pub struct ServerConfig {
    /// Read and write timeout on the peer stream; bounds shutdown latency
    /// while a peer is connected but idle, or connected but not reading.
    pub read_timeout: Duration,
    /// Re-check period for the stop flag while waiting to accept a peer
    /// or on a handoff slot.
    pub poll_interval: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            read_timeout: Duration::from_secs(1),
            poll_interval: Duration::from_millis(50),
        }
    }
}

/// Accepting side of the exchange.
///
/// A background thread owns the socket and serves one peer at a time.
/// Each request it reads is handed to `receive()`, and the thread
/// then waits for `send()` before it writes the reply and reads the
/// next request.
pub struct ExchangeServer<In, Out> {
    path: PathBuf,
    inbound: SlotReceiver<In>,
    outbound: SlotSender<Out>,
    stop: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl<In, Out> ExchangeServer<In, Out>
where
    In: DeserializeOwned + Send + 'static,
    Out: Serialize + Send + 'static,
{
    pub fn bind(path: impl AsRef<Path>) -> BridgeResult<Self> {
        Self::bind_with(path, ServerConfig::default())
    }

    /// Binds `path` (replacing a stale socket file) and starts serving.
    /// Returns once the endpoint accepts connections.
    pub fn bind_with(path: impl AsRef<Path>, config: ServerConfig) -> BridgeResult<Self> {
        let path = path.as_ref().to_path_buf();
        match fs::remove_file(&path) {
            Ok(()) => debug!("removed stale socket {}", path.display()),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        let listener = UnixListener::bind(&path)?;
        listener.set_nonblocking(true)?;

        let (in_tx, in_rx) = slot();
        let (out_tx, out_rx) = slot();
        let stop = Arc::new(AtomicBool::new(false));

        let worker = AcceptLoop {
            listener,
            inbound: in_tx,
            outbound: out_rx,
            stop: stop.clone(),
            config,
            _msg: PhantomData,
        };
        let handle = thread::Builder::new()
            .name("metacon-exchange".into())
            .spawn(move || worker.run())?;

        info!("decision endpoint listening on {}", path.display());
        Ok(Self {
            path,
            inbound: in_rx,
            outbound: out_tx,
            stop,
            worker: Some(handle),
        })
    }

    /// Blocks until the peer's next request arrives.
    pub fn receive(&self) -> BridgeResult<In> {
        self.inbound.pull()
    }

    pub fn receive_timeout(&self, timeout: Duration) -> BridgeResult<Option<In>> {
        self.inbound.pull_timeout(timeout)
    }

    /// Hands the reply for the last received request to the exchange thread.
    pub fn send(&self, reply: Out) -> BridgeResult<()> {
        self.outbound.push(reply)
    }
}

impl<In, Out> ExchangeServer<In, Out> {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_running(&self) -> bool {
        self.worker.as_ref().map_or(false, |h| !h.is_finished())
    }

    /// Stops the exchange thread and removes the socket file.
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.worker.take() {
            if handle.join().is_err() {
                warn!("exchange thread panicked");
            }
            let _ = fs::remove_file(&self.path);
            info!("decision endpoint {} closed", self.path.display());
        }
    }
}

impl<In, Out> Drop for ExchangeServer<In, Out> {
    fn drop(&mut self) {
        self.stop();
    }
}

struct AcceptLoop<In, Out> {
    listener: UnixListener,
    inbound: SlotSender<In>,
    outbound: SlotReceiver<Out>,
    stop: Arc<AtomicBool>,
    config: ServerConfig,
    _msg: PhantomData<fn(In) -> Out>,
}

impl<In, Out> AcceptLoop<In, Out>
where
    In: DeserializeOwned,
    Out: Serialize,
{
    fn stopped(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }

    fn run(self) {
        while !self.stopped() {
            match self.listener.accept() {
                Ok((stream, _)) => {
                    info!("decision peer connected");
                    match self.serve(stream) {
                        Ok(()) => {}
                        Err(BridgeError::ChannelClosed) => info!("decision peer disconnected"),
                        Err(e) => warn!("dropping decision peer: {}", e),
                    }
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => {
                    thread::sleep(self.config.poll_interval)
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => {
                    warn!("accept failed: {}", e);
                    thread::sleep(self.config.poll_interval);
                }
            }
        }
        debug!("exchange loop stopped");
    }

    /// Serves one peer until it leaves, misbehaves, or we are stopped.
    fn serve(&self, stream: UnixStream) -> BridgeResult<()> {
        stream.set_nonblocking(false)?;
        stream.set_read_timeout(Some(self.config.read_timeout))?;
        // A peer that stops reading must not pin the thread in a full send buffer
        stream.set_write_timeout(Some(self.config.read_timeout))?;
        let mut conn = &stream;

        loop {
            if self.stopped() {
                return Ok(());
            }

            let request: In = match read_frame_until(&mut conn, Some(&self.stop)) {
                Ok(req) => req,
                Err(BridgeError::Timeout) => continue,
                Err(e) => return Err(e),
            };

            if !self.inbound.push_until(request, &self.stop, self.config.poll_interval)? {
                return Ok(());
            }
            let reply = match self.outbound.pull_until(&self.stop, self.config.poll_interval)? {
                Some(reply) => reply,
                None => return Ok(()),
            };

            write_frame(&mut conn, &reply)?;
        }
    }
}
