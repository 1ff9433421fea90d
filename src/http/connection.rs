use std::mem;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::watch;
use tracing::{debug, error, info, trace, warn};

use crate::error::ConnectionError;
use crate::http::frame::{body_capacity, FrameReader};
use crate::http::parser::{parse_head, split_header_block, ParseError};
use crate::http::request::{Method, Request};
use crate::http::response::Response;
use crate::http::writer::ResponseWriter;
use crate::server::context::ServerContext;

/// One client session: reads requests off `stream` and answers them in
/// order until the peer hangs up, asks to close, or a limit is hit.
pub struct Connection<S> {
    stream: S,
    peer: SocketAddr,
    ctx: Arc<ServerContext>,
    /// Bytes read past the end of the previous request.
    carry: Vec<u8>,
    state: ConnectionState,
    served: usize,
    shutdown: watch::Receiver<bool>,
}

pub enum ConnectionState {
    Reading,
    Parsing(Vec<u8>),
    Dispatching(Request, bool), // bool = keep_alive?
    Writing(ResponseWriter, bool),
    Closed,
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    pub fn new(
        stream: S,
        peer: SocketAddr,
        ctx: Arc<ServerContext>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            stream,
            peer,
            ctx,
            carry: Vec::new(),
            state: ConnectionState::Reading,
            served: 0,
            shutdown,
        }
    }

    /// Number of responses fully written so far.
    pub fn served(&self) -> usize {
        self.served
    }

    /// Drives the session to completion.
    ///
    /// A peer closing between requests is a clean end. Every other error
    /// ends the session and is returned after any best-effort error
    /// response has been sent.
    pub async fn run(&mut self) -> Result<(), ConnectionError> {
        loop {
            self.state = match mem::replace(&mut self.state, ConnectionState::Closed) {
                ConnectionState::Reading => self.read_frame().await?,

                ConnectionState::Parsing(block) => self.parse(block).await?,

                ConnectionState::Dispatching(request, keep_alive) => {
                    self.dispatch(request, keep_alive).await
                }

                ConnectionState::Writing(mut writer, keep_alive) => {
                    let result = writer
                        .write_to_stream(&mut self.stream, self.ctx.config.write_timeout)
                        .await;
                    writer.release(&self.ctx.pool);
                    result?;
                    self.served += 1;

                    if keep_alive {
                        ConnectionState::Reading
                    } else {
                        ConnectionState::Closed
                    }
                }

                ConnectionState::Closed => break,
            };
        }

        trace!(peer = %self.peer, served = self.served, "Connection closed");
        Ok(())
    }

    async fn read_frame(&mut self) -> Result<ConnectionState, ConnectionError> {
        if *self.shutdown.borrow() {
            return Ok(ConnectionState::Closed);
        }

        let config = &self.ctx.config;
        let reader = FrameReader::new(&self.ctx.pool, config.max_header_bytes, config.read_timeout);
        let first_read = if self.served == 0 {
            config.read_timeout
        } else {
            config.idle_timeout
        };

        let started = tokio::select! {
            res = reader.await_request_start(&mut self.stream, &mut self.carry, first_read) => res,
            _ = shutdown_signaled(&mut self.shutdown) => {
                debug!(peer = %self.peer, "Shutdown while waiting for a request");
                return Ok(ConnectionState::Closed);
            }
        };

        // Past the first byte the request runs to completion, shutdown or not.
        let result = match started {
            Ok(()) => {
                reader
                    .read_header_block(&mut self.stream, &mut self.carry, config.read_timeout)
                    .await
            }
            Err(e) => Err(e),
        };

        match result {
            Ok(block) => Ok(ConnectionState::Parsing(block)),
            Err(ConnectionError::ConnectionClosed) => Ok(ConnectionState::Closed),
            Err(e @ ConnectionError::HeadersTooLarge { .. }) => {
                self.reject(Response::bad_request("Request headers too large"))
                    .await;
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    async fn parse(&mut self, block: Vec<u8>) -> Result<ConnectionState, ConnectionError> {
        let (head_bytes, rest) = split_header_block(&block);

        let parsed = parse_head(head_bytes).and_then(|head| {
            let content_length = head.content_length()?;
            Ok((head, content_length))
        });

        let (head, content_length) = match parsed {
            Ok(parsed) => parsed,
            Err(e) => {
                self.ctx.pool.release(block);
                let message = match e {
                    ParseError::MalformedRequestLine => "Invalid request line",
                    ParseError::InvalidContentLength(_) => "Invalid Content-Length",
                };
                self.reject(Response::bad_request(message)).await;
                return Err(e.into());
            }
        };

        let limit = self.ctx.config.max_body_bytes;
        if content_length > limit {
            self.ctx.pool.release(block);
            self.reject(Response::payload_too_large()).await;
            return Err(ConnectionError::BodyTooLarge {
                declared: content_length,
                limit,
            });
        }

        let available = rest.len().min(content_length);
        let mut body = Vec::with_capacity(body_capacity(content_length));
        body.extend_from_slice(&rest[..available]);
        self.carry.extend_from_slice(&rest[available..]);
        self.ctx.pool.release(block);

        let config = &self.ctx.config;
        let reader = FrameReader::new(&self.ctx.pool, config.max_header_bytes, config.read_timeout);
        reader
            .read_body(&mut self.stream, &mut body, content_length)
            .await?;

        let request = Request::from_parts(head, body);
        let keep_alive = self.ctx.config.keep_alive && !request.wants_close();

        Ok(ConnectionState::Dispatching(request, keep_alive))
    }

    async fn dispatch(&mut self, request: Request, keep_alive: bool) -> ConnectionState {
        let access = self
            .ctx
            .config
            .logging
            .then(|| (request.method.clone(), request.path.clone(), Instant::now()));

        let head_only = request.method == Method::HEAD;
        let response = self.ctx.dispatcher.dispatch(request).await;

        if let Some((method, path, started)) = access {
            log_access(self.peer, &method, &path, response.status, started.elapsed());
        }

        let writer = if head_only {
            ResponseWriter::without_body(&self.ctx.pool, &response)
        } else {
            ResponseWriter::new(&self.ctx.pool, &response)
        };
        ConnectionState::Writing(writer, keep_alive)
    }

    /// Writes an error response before the session is torn down. Failures
    /// are ignored; the connection is closing either way.
    async fn reject(&mut self, response: Response) {
        let mut writer = ResponseWriter::new(&self.ctx.pool, &response);
        if let Err(e) = writer
            .write_to_stream(&mut self.stream, self.ctx.config.write_timeout)
            .await
        {
            debug!(peer = %self.peer, error = %e, "Could not deliver error response");
        }
        writer.release(&self.ctx.pool);
    }
}

/// Resolves once shutdown is flagged. Pends forever if the sender is gone.
async fn shutdown_signaled(shutdown: &mut watch::Receiver<bool>) {
    let sender_gone = shutdown.wait_for(|&stop| stop).await.is_err();
    if sender_gone {
        std::future::pending::<()>().await;
    }
}

fn log_access(peer: SocketAddr, method: &Method, path: &str, status: u16, elapsed: Duration) {
    let elapsed_ms = elapsed.as_millis() as u64;
    match status {
        500.. => error!(%peer, %method, path, status, elapsed_ms, "request"),
        400..=499 => warn!(%peer, %method, path, status, elapsed_ms, "request"),
        _ => info!(%peer, %method, path, status, elapsed_ms, "request"),
    }
}
