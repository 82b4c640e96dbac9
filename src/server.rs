use std::future::Future;
use std::io;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;

use once_cell::sync::Lazy;
use time::UtcOffset;
use tokio::io::{AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::signal;
use tokio::time::timeout;

use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::rate_limit::RateLimiter;
use crate::render::render_template;
use crate::request::{parse_request, Request, Submission};
use crate::resource::ResourceSource;
use crate::router::{content_type, is_template, route, ContentType, Route};
use crate::store::MessageStore;

static RESPONSES: Lazy<CannedResponses> = Lazy::new(CannedResponses::new);

// Fixed responses, built once
struct CannedResponses {
    ok_html: Vec<u8>,
    ok_css: Vec<u8>,
    see_other: Vec<u8>,
    forbidden: Vec<u8>,
    not_found: Vec<u8>,
    busy: Vec<u8>,
}

impl CannedResponses {
    fn new() -> Self {
        Self {
            ok_html: Self::ok_header(ContentType::Html),
            ok_css: Self::ok_header(ContentType::Css),
            see_other: b"HTTP/1.1 303 See Other\r\nLocation: /\r\n\r\n".to_vec(),
            forbidden: b"HTTP/1.1 403 Forbidden\r\n\r\nForbidden".to_vec(),
            not_found: b"HTTP/1.1 404 Not Found\r\n\r\nNot Found".to_vec(),
            busy: b"HTTP/1.1 503 Service Unavailable\r\nRetry-After: 1\r\n\r\nServer is busy."
                .to_vec(),
        }
    }

    fn ok_header(content_type: ContentType) -> Vec<u8> {
        format!(
            "HTTP/1.1 200 OK\r\nContent-Type: {}\r\n\r\n",
            content_type.as_str()
        )
        .into_bytes()
    }

    fn ok(&self, content_type: ContentType) -> &[u8] {
        match content_type {
            ContentType::Html => &self.ok_html,
            ContentType::Css => &self.ok_css,
        }
    }
}

/// The chat server: admission control in front of one detached task per
/// connection, all sharing one message store.
pub struct Server<S> {
    config: Arc<ServerConfig>,
    store: Arc<MessageStore>,
    limiter: Arc<RateLimiter>,
    source: Arc<S>,
}

impl<S> Clone for Server<S> {
    fn clone(&self) -> Self {
        Self {
            config: Arc::clone(&self.config),
            store: Arc::clone(&self.store),
            limiter: Arc::clone(&self.limiter),
            source: Arc::clone(&self.source),
        }
    }
}

impl<S: ResourceSource> Server<S> {
    pub fn new(config: ServerConfig, source: S) -> Self {
        Self::with_offset(config, source, UtcOffset::UTC)
    }

    /// Message timestamps are stamped at `offset`.
    pub fn with_offset(config: ServerConfig, source: S, offset: UtcOffset) -> Self {
        let store = MessageStore::with_offset(config.max_messages, offset);
        let limiter = RateLimiter::new(config.rate_window, config.rate_capacity);
        Self {
            config: Arc::new(config),
            store: Arc::new(store),
            limiter: Arc::new(limiter),
            source: Arc::new(source),
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn store(&self) -> &MessageStore {
        &self.store
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    /// Bind the configured port on all interfaces.
    pub async fn bind(&self) -> Result<TcpListener, ServerError> {
        let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, self.config.port));
        TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })
    }

    /// Serve until Ctrl-C or SIGTERM.
    pub async fn run(self, listener: TcpListener) {
        self.run_until(listener, shutdown_signal()).await;
    }

    /// Serve until `shutdown` completes. Connection tasks already spawned
    /// are left to finish on their own.
    pub async fn run_until<F>(self, listener: TcpListener, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, peer)) => self.dispatch(stream, peer),
                        Err(e) => tracing::warn!(error = %e, "accept failed"),
                    }
                }
                _ = &mut shutdown => {
                    tracing::info!("shutdown signal received, stopping server");
                    break;
                }
            }
        }
    }

    fn dispatch(&self, mut stream: TcpStream, peer: SocketAddr) {
        if !self.limiter.admit() {
            tracing::debug!(%peer, "rate limit exceeded, rejecting connection");
            // The rejection is written off the accept loop; the request is
            // never read.
            tokio::spawn(async move {
                let _ = send(&mut stream, &RESPONSES.busy).await;
                let _ = stream.shutdown().await;
            });
            return;
        }

        let _ = stream.set_nodelay(true);
        let server = self.clone();
        tokio::spawn(async move {
            if let Err(e) = server.handle_connection(stream).await {
                tracing::debug!(%peer, error = %e, "connection ended with error");
            }
        });
    }

    async fn handle_connection(&self, mut stream: TcpStream) -> io::Result<()> {
        let mut buffer = vec![0u8; self.config.receive_limit()];

        let read = match timeout(self.config.connection_timeout, stream.read(&mut buffer)).await {
            Ok(result) => result?,
            Err(_) => {
                tracing::debug!("connection timed out before sending a request");
                return Ok(());
            }
        };
        if read == 0 {
            return Ok(());
        }

        self.handle_request(&buffer[..read], &mut stream).await?;
        stream.shutdown().await
    }

    /// Parse, route and answer one raw request, writing the response to `out`.
    pub async fn handle_request<W>(&self, raw: &[u8], out: &mut W) -> io::Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        let request = parse_request(raw);
        tracing::debug!(method = %request.method, path = %request.path, "request");

        match route(&request) {
            Route::Forbidden => {
                tracing::debug!(path = %request.path, "blocked traversal attempt");
                send(out, &RESPONSES.forbidden).await
            }
            Route::Submit => {
                self.submit(&request);
                send(out, &RESPONSES.see_other).await
            }
            Route::Resource(name) => self.serve_resource(&name, out).await,
        }
    }

    fn submit(&self, request: &Request<'_>) {
        let Some(body) = request.body else {
            tracing::debug!("no body found in submission");
            return;
        };

        let submission = Submission::from_form(body);
        tracing::debug!(
            user = %submission.user,
            text_len = submission.text.len(),
            "parsed submission"
        );

        if submission.has_text() {
            self.store.post(&submission.user, &submission.text);
        }
    }

    async fn serve_resource<W>(&self, name: &str, out: &mut W) -> io::Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        let Some(bytes) = self.source.load(name).await else {
            return send(out, &RESPONSES.not_found).await;
        };

        out.write_all(RESPONSES.ok(content_type(name))).await?;

        if is_template(name) {
            let rendered = render_template(&bytes, &self.store);
            for part in rendered.parts() {
                out.write_all(part).await?;
            }
        } else {
            out.write_all(&bytes).await?;
        }
        out.flush().await
    }
}

async fn send<W>(out: &mut W, response: &[u8]) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    out.write_all(response).await?;
    out.flush().await
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::warn!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
