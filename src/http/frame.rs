//! Deadline-bounded reading of request frames from a stream.

use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::time::timeout;

use crate::error::ConnectionError;
use crate::http::parser::{find_header_end, HEADER_TERMINATOR};
use crate::http::pool::{BufferPool, SizeClass};

/// Initial capacity for a body buffer; it grows with the bytes received
/// rather than with the declared length.
pub fn body_capacity(content_length: usize) -> usize {
    content_length.min(SizeClass::Large.capacity())
}

/// Reads header blocks and Content-Length bodies off a stream.
///
/// Every read gets its own deadline; there is no deadline spanning the whole
/// message.
pub struct FrameReader<'a> {
    pool: &'a BufferPool,
    max_header_bytes: usize,
    read_timeout: Duration,
}

impl<'a> FrameReader<'a> {
    pub fn new(pool: &'a BufferPool, max_header_bytes: usize, read_timeout: Duration) -> Self {
        Self {
            pool,
            max_header_bytes,
            read_timeout,
        }
    }

    /// Waits for the first bytes of the next request and appends them to
    /// `carry`. Returns at once when `carry` already holds bytes.
    ///
    /// This is the only wait that shutdown may cut short: once a byte of a
    /// request has arrived, the request is in flight.
    pub async fn await_request_start<S>(
        &self,
        stream: &mut S,
        carry: &mut Vec<u8>,
        idle_timeout: Duration,
    ) -> Result<(), ConnectionError>
    where
        S: AsyncRead + Unpin,
    {
        if carry.is_empty() {
            self.read_chunk(stream, carry, idle_timeout, u64::MAX).await?;
        }
        Ok(())
    }

    /// Reads until the accumulated bytes contain CRLF CRLF.
    ///
    /// Accumulation starts from `carry`, the bytes left over after the
    /// previous message, which is drained. The returned buffer holds the
    /// header block including its terminator, followed by any bytes read past
    /// it. It comes from the pool; callers should release it once parsed.
    ///
    /// `first_read_timeout` applies while nothing has been received yet
    /// (the keep-alive idle wait); later reads use the read timeout.
    pub async fn read_header_block<S>(
        &self,
        stream: &mut S,
        carry: &mut Vec<u8>,
        first_read_timeout: Duration,
    ) -> Result<Vec<u8>, ConnectionError>
    where
        S: AsyncRead + Unpin,
    {
        let mut block = self.pool.acquire(SizeClass::Large);
        block.extend_from_slice(carry);
        carry.clear();

        let mut scanned = 0;
        loop {
            if find_header_end(&block, scanned).is_some() {
                return Ok(block);
            }
            scanned = block.len().saturating_sub(HEADER_TERMINATOR.len() - 1);

            if block.len() > self.max_header_bytes {
                self.pool.release(block);
                return Err(ConnectionError::HeadersTooLarge {
                    limit: self.max_header_bytes,
                });
            }

            let deadline = if block.is_empty() {
                first_read_timeout
            } else {
                self.read_timeout
            };

            if let Err(e) = self.read_chunk(stream, &mut block, deadline, u64::MAX).await {
                self.pool.release(block);
                return Err(e);
            }
        }
    }

    /// Reads until `body` holds exactly `content_length` bytes.
    ///
    /// Never consumes bytes past the declared length, so the next request on
    /// the stream stays intact. A peer that stalls past the read timeout or
    /// hangs up early ends the session.
    pub async fn read_body<S>(
        &self,
        stream: &mut S,
        body: &mut Vec<u8>,
        content_length: usize,
    ) -> Result<(), ConnectionError>
    where
        S: AsyncRead + Unpin,
    {
        while body.len() < content_length {
            let remaining = (content_length - body.len()) as u64;
            self.read_chunk(stream, body, self.read_timeout, remaining)
                .await?;
        }

        Ok(())
    }

    /// One read of at most `limit` bytes into `dest`, through a pooled chunk.
    async fn read_chunk<S>(
        &self,
        stream: &mut S,
        dest: &mut Vec<u8>,
        deadline: Duration,
        limit: u64,
    ) -> Result<usize, ConnectionError>
    where
        S: AsyncRead + Unpin,
    {
        let mut chunk = self.pool.acquire(SizeClass::Medium);
        let mut limited = (&mut *stream).take(limit);

        let result = match timeout(deadline, limited.read_buf(&mut chunk)).await {
            Err(_) => Err(ConnectionError::Timeout),
            Ok(Err(e)) => Err(ConnectionError::Io(e)),
            Ok(Ok(0)) => Err(ConnectionError::ConnectionClosed),
            Ok(Ok(n)) => {
                dest.extend_from_slice(&chunk[..n]);
                Ok(n)
            }
        };

        self.pool.release(chunk);
        result
    }
}
