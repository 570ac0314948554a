//! Length-prefixed JSON frames.
//!
//! # Frame Format
//!
//! ```text
//! +------------------+
//! | length (4 bytes) |  u32 big-endian, payload size only
//! +------------------+
//! | payload          |  UTF-8 JSON (length bytes)
//! | (variable)       |
//! +------------------+
//! ```
//!
//! Stream sockets deliver frames in arbitrary pieces, so readers loop
//! until both the prefix and the payload are complete.

use std::io::{self, ErrorKind, Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};

use metacon_core::{BridgeError, BridgeResult, FRAME_PREFIX_LEN};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Largest step the payload buffer grows by before the bytes arrive.
const READ_CHUNK: usize = 64 * 1024;

/// Prefix + payload in a single buffer so the frame goes out in one write.
pub fn encode_frame(payload: &[u8]) -> BridgeResult<Vec<u8>> {
    let len = u32::try_from(payload.len()).map_err(|_| {
        BridgeError::malformed(format!(
            "payload of {} bytes overflows the length prefix",
            payload.len()
        ))
    })?;
    let mut frame = Vec::with_capacity(FRAME_PREFIX_LEN + payload.len());
    frame.extend_from_slice(&len.to_be_bytes());
    frame.extend_from_slice(payload);
    Ok(frame)
}

pub fn write_frame_bytes<W: Write>(writer: &mut W, payload: &[u8]) -> BridgeResult<()> {
    let frame = encode_frame(payload)?;
    writer.write_all(&frame).map_err(classify_io)?;
    writer.flush().map_err(classify_io)
}

pub fn write_frame<W: Write, T: Serialize>(writer: &mut W, msg: &T) -> BridgeResult<()> {
    let payload = serde_json::to_vec(msg)?;
    write_frame_bytes(writer, &payload)
}

/// Reads one frame's payload. Blocks until it is complete.
///
/// # Errors
/// - `ChannelClosed` if the stream ends before the first prefix byte
/// - `MalformedFrame` if it ends anywhere inside a frame
/// - `Timeout` if the stream has a read timeout and it fires
pub fn read_frame_bytes<R: Read>(reader: &mut R) -> BridgeResult<Vec<u8>> {
    read_frame_bytes_until(reader, None)
}

/// Like `read_frame_bytes`, for streams polled with a read timeout.
///
/// With a `stop` flag, a timeout before the frame starts returns
/// `Timeout` so the caller can check for shutdown, while a timeout in
/// the middle of a frame keeps reading unless `stop` is set. Giving up
/// on a partial frame would desynchronize every later frame.
/// Without a flag, every timeout is returned.
pub fn read_frame_bytes_until<R: Read>(
    reader: &mut R,
    stop: Option<&AtomicBool>,
) -> BridgeResult<Vec<u8>> {
    let mut prefix = [0u8; FRAME_PREFIX_LEN];
    fill(reader, &mut prefix, true, stop)?;
    let len = u32::from_be_bytes(prefix) as usize;

    // The prefix is untrusted: grow with the bytes that actually arrive
    let mut payload = Vec::with_capacity(len.min(READ_CHUNK));
    while payload.len() < len {
        let start = payload.len();
        payload.resize(start + (len - start).min(READ_CHUNK), 0);
        fill(reader, &mut payload[start..], false, stop).map_err(|e| match e {
            BridgeError::MalformedFrame(_) => BridgeError::malformed(format!(
                "stream ended inside a {}-byte payload",
                len
            )),
            other => other,
        })?;
    }
    Ok(payload)
}

pub fn read_frame<R: Read, T: DeserializeOwned>(reader: &mut R) -> BridgeResult<T> {
    read_frame_until(reader, None)
}

pub fn read_frame_until<R: Read, T: DeserializeOwned>(
    reader: &mut R,
    stop: Option<&AtomicBool>,
) -> BridgeResult<T> {
    let payload = read_frame_bytes_until(reader, stop)?;
    decode_payload(&payload)
}

pub fn decode_payload<T: DeserializeOwned>(payload: &[u8]) -> BridgeResult<T> {
    Ok(serde_json::from_slice(payload)?)
}

fn fill<R: Read>(
    reader: &mut R,
    buf: &mut [u8],
    frame_start: bool,
    stop: Option<&AtomicBool>,
) -> BridgeResult<()> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => {
                if frame_start && filled == 0 {
                    return Err(BridgeError::ChannelClosed);
                }
                return Err(BridgeError::malformed(format!(
                    "stream ended after {} of {} bytes",
                    filled,
                    buf.len()
                )));
            }
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => {}
            Err(e) if is_timeout(&e) => {
                let idle = frame_start && filled == 0;
                match stop {
                    Some(flag) if !idle && !flag.load(Ordering::SeqCst) => {}
                    _ => return Err(BridgeError::Timeout),
                }
            }
            Err(e) => return Err(classify_io(e)),
        }
    }
    Ok(())
}

fn is_timeout(e: &io::Error) -> bool {
    matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut)
}

pub(crate) fn classify_io(e: io::Error) -> BridgeError {
    match e.kind() {
        ErrorKind::BrokenPipe | ErrorKind::ConnectionReset | ErrorKind::ConnectionAborted => {
            BridgeError::ChannelClosed
        }
        ErrorKind::WouldBlock | ErrorKind::TimedOut => BridgeError::Timeout,
        _ => BridgeError::Io(e),
    }
}
