//! Length-prefixed framing codec for the TCP transport.
//!
//! Wire format: `[u32 BE length][JSON payload]`. The length counts the JSON
//! payload only, not the 4-byte header. The size limit applies to both
//! directions: a reader rejects a header above it and a writer refuses to
//! emit a frame above it, so nothing partial reaches the socket.

use serde::{de::DeserializeOwned, Serialize};
use std::io;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Default maximum frame size: 256 MiB.
pub const MAX_FRAME_SIZE: usize = 256 * 1024 * 1024;

/// Errors that can occur during frame read/write.
#[derive(Error, Debug)]
pub enum FrameError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    #[error("frame too large: {size} bytes (max {max})")]
    TooLarge { size: usize, max: usize },

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// EOF before a frame header
    #[error("connection closed")]
    ConnectionClosed,
}

/// Write a typed message as a length-prefixed JSON frame.
pub async fn write_message<W, T>(writer: &mut W, msg: &T) -> Result<(), FrameError>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    write_message_with_limit(writer, msg, MAX_FRAME_SIZE).await
}

/// Write a typed message, refusing frames larger than `max` bytes.
///
/// On `TooLarge` nothing has been written.
pub async fn write_message_with_limit<W, T>(writer: &mut W, msg: &T, max: usize) -> Result<(), FrameError>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let data = serde_json::to_vec(msg)?;
    let max = max.min(u32::MAX as usize);
    if data.len() > max {
        return Err(FrameError::TooLarge { size: data.len(), max });
    }
    let len = data.len() as u32;
    writer.write_all(&len.to_be_bytes()).await?;
    writer.write_all(&data).await?;
    writer.flush().await?;
    Ok(())
}

/// Read a length-prefixed JSON frame and deserialize into a typed message.
pub async fn read_message<R, T>(reader: &mut R) -> Result<T, FrameError>
where
    R: AsyncRead + Unpin,
    T: DeserializeOwned,
{
    read_message_with_limit(reader, MAX_FRAME_SIZE).await
}

/// Read a frame, rejecting headers that announce more than `max` bytes.
pub async fn read_message_with_limit<R, T>(reader: &mut R, max: usize) -> Result<T, FrameError>
where
    R: AsyncRead + Unpin,
    T: DeserializeOwned,
{
    let mut len_buf = [0u8; 4];
    match reader.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
            return Err(FrameError::ConnectionClosed);
        }
        Err(e) => return Err(FrameError::Io(e)),
    }

    let len = u32::from_be_bytes(len_buf) as usize;
    if len > max {
        return Err(FrameError::TooLarge { size: len, max });
    }

    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf).await?;
    let msg = serde_json::from_slice(&buf)?;
    Ok(msg)
}
