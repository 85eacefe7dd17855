//! Length-prefixed framing.
//!
//! Every frame is a 4-byte big-endian signed length followed by exactly that many payload
//! bytes, in both directions.

use std::io::ErrorKind;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error_handling::types::FrameError;

const LENGTH_PREFIX: usize = 4;

#[derive(Debug, Clone, Copy)]
pub struct FrameCodec {
    max_frame_size: usize,
}

impl FrameCodec {
    pub fn new(max_frame_size: usize) -> Self {
        Self { max_frame_size }
    }

    pub fn max_frame_size(&self) -> usize {
        self.max_frame_size
    }

    /// Reads one frame.
    ///
    /// Returns `Ok(None)` when the stream ends cleanly on a frame boundary.
    pub async fn read_frame<R>(&self, reader: &mut R) -> Result<Option<Vec<u8>>, FrameError>
    where
        R: AsyncRead + Unpin,
    {
        let mut prefix = [0u8; LENGTH_PREFIX];
        let received = read_full(reader, &mut prefix).await?;
        if received == 0 {
            return Ok(None);
        }
        if received < LENGTH_PREFIX {
            return Err(FrameError::Truncated {
                expected: LENGTH_PREFIX,
                received,
            });
        }

        let length = i32::from_be_bytes(prefix);
        if length < 0 || length as usize > self.max_frame_size {
            return Err(FrameError::InvalidLength(length as i64));
        }

        let mut payload = vec![0u8; length as usize];
        let received = read_full(reader, &mut payload).await?;
        if received < payload.len() {
            return Err(FrameError::Truncated {
                expected: payload.len(),
                received,
            });
        }
        Ok(Some(payload))
    }

    pub async fn write_frame<W>(&self, writer: &mut W, payload: &[u8]) -> Result<(), FrameError>
    where
        W: AsyncWrite + Unpin,
    {
        let length = i32::try_from(payload.len())
            .map_err(|_| FrameError::InvalidLength(payload.len() as i64))?;
        writer.write_all(&length.to_be_bytes()).await?;
        writer.write_all(payload).await?;
        writer.flush().await?;
        Ok(())
    }
}

// Fills `buf` until it is full or the stream ends; returns the number of bytes read.
async fn read_full<R>(reader: &mut R, buf: &mut [u8]) -> Result<usize, FrameError>
where
    R: AsyncRead + Unpin,
{
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]).await {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(FrameError::Io(e)),
        }
    }
    Ok(filled)
}
