use std::io::Write;
use std::time::Duration;

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::time::timeout;

use crate::error::ConnectionError;
use crate::http::pool::{BufferPool, SizeClass};
use crate::http::response::Response;

const HTTP_VERSION: &str = "HTTP/1.1";

/// Appends the wire form of a response to `buf`.
///
/// Emits, in order: status line, `Content-Type`, `Connection: keep-alive`,
/// `Content-Length`, a blank line and the body verbatim. Whether the
/// connection really stays open is decided by the connection loop.
pub fn serialize_response(
    buf: &mut Vec<u8>,
    status: u16,
    content_type: &str,
    status_text: &str,
    body: &[u8],
) {
    buf.reserve(body.len());
    serialize_head(buf, status, content_type, status_text, body.len());
    buf.extend_from_slice(body);
}

/// Appends the status line and headers only. `content_length` is still
/// announced, as a HEAD response requires.
pub fn serialize_head(
    buf: &mut Vec<u8>,
    status: u16,
    content_type: &str,
    status_text: &str,
    content_length: usize,
) {
    buf.reserve(128 + content_type.len() + status_text.len());

    // Writing into a Vec cannot fail.
    let _ = write!(
        buf,
        "{HTTP_VERSION} {status} {status_text}\r\n\
         Content-Type: {content_type}\r\n\
         Connection: keep-alive\r\n\
         Content-Length: {content_length}\r\n\r\n"
    );
}

/// Builds a response into a new buffer.
///
/// # Example
///
/// ```
/// let bytes = rawhttp::http::writer::build(200, "text/plain", "OK", b"hi");
/// assert!(bytes.ends_with(b"Content-Length: 2\r\n\r\nhi"));
/// ```
pub fn build(status: u16, content_type: &str, status_text: &str, body: &[u8]) -> Vec<u8> {
    let mut buf = Vec::new();
    serialize_response(&mut buf, status, content_type, status_text, body);
    buf
}

/// A serialized response held in a pooled buffer, plus how much of it has
/// reached the socket.
pub struct ResponseWriter {
    buffer: Vec<u8>,
    written: usize,
}

impl ResponseWriter {
    pub fn new(pool: &BufferPool, response: &Response) -> Self {
        let mut buffer = pool.acquire(SizeClass::Small);
        serialize_response(
            &mut buffer,
            response.status,
            &response.content_type,
            &response.reason,
            &response.body,
        );

        Self { buffer, written: 0 }
    }

    /// Like [`ResponseWriter::new`], but for a HEAD request: the headers
    /// describe the body, which is not sent.
    pub fn without_body(pool: &BufferPool, response: &Response) -> Self {
        let mut buffer = pool.acquire(SizeClass::Small);
        serialize_head(
            &mut buffer,
            response.status,
            &response.content_type,
            &response.reason,
            response.body.len(),
        );

        Self { buffer, written: 0 }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    /// Writes the remaining bytes, bounding each write call by
    /// `write_timeout`.
    pub async fn write_to_stream<S>(
        &mut self,
        stream: &mut S,
        write_timeout: Duration,
    ) -> Result<(), ConnectionError>
    where
        S: AsyncWrite + Unpin,
    {
        while self.written < self.buffer.len() {
            let n = timeout(write_timeout, stream.write(&self.buffer[self.written..]))
                .await
                .map_err(|_| ConnectionError::Timeout)??;

            if n == 0 {
                return Err(ConnectionError::ConnectionClosed);
            }

            self.written += n;
        }

        timeout(write_timeout, stream.flush())
            .await
            .map_err(|_| ConnectionError::Timeout)??;

        Ok(())
    }

    /// Hands the buffer back to the pool.
    pub fn release(self, pool: &BufferPool) {
        pool.release(self.buffer);
    }
}
