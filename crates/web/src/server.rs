//! The listening side: one acceptor task handing connections to a fixed pool
//! of worker tasks.
//!
//! The handoff is an `mpsc` channel of depth 1 whose receiver the workers
//! share behind an async mutex, so a connection is received by exactly one
//! worker. When every worker is busy the acceptor waits for capacity instead
//! of dropping the connection; further clients queue in the listen backlog.

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use nano_http::protocol::{DefaultErrorRenderer, ErrorRenderer, Limits};
use thiserror::Error;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info, info_span, trace, warn};

use crate::config::ServerConfig;
use crate::dispatcher::{Dispatcher, panic_message};
use crate::router::{Route, Router};

/// Pause after a failed `accept`, e.g. when the process ran out of file descriptors.
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(100);

type Handoff = Arc<Mutex<mpsc::Receiver<(TcpStream, SocketAddr)>>>;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("failed to bind {address}: {source}")]
    Bind { address: SocketAddr, source: io::Error },

    #[error("invalid server config: {reason}")]
    InvalidConfig { reason: String },

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl ServerError {
    pub fn invalid_config<S: ToString>(reason: S) -> Self {
        Self::InvalidConfig { reason: reason.to_string() }
    }
}

pub struct ServerBuilder {
    config: ServerConfig,
    router: Router,
    error_renderer: Option<Arc<dyn ErrorRenderer>>,
}

impl ServerBuilder {
    fn new() -> Self {
        Self { config: ServerConfig::default(), router: Router::new(), error_renderer: None }
    }

    /// Replaces every setting at once; routes are kept.
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn address<A: Into<SocketAddr>>(mut self, address: A) -> Self {
        self.config.address = address.into();
        self
    }

    pub fn workers(mut self, workers: usize) -> Self {
        self.config.workers = workers;
        self
    }

    pub fn limits(mut self, limits: Limits) -> Self {
        self.config.limits = limits;
        self
    }

    /// Appends a route; routes are matched in the order they were added.
    pub fn route(self, route: Route) -> Self {
        self.add_route(Arc::new(route))
    }

    /// Appends a shared route. Adding the same route twice has no effect.
    pub fn add_route(mut self, route: Arc<Route>) -> Self {
        self.router.add_route(route);
        self
    }

    /// Replaces all routes added so far.
    pub fn router(mut self, router: Router) -> Self {
        self.router = router;
        self
    }

    /// Renders the 404 and 500 pages the server produces on its own.
    pub fn error_renderer<E: ErrorRenderer + 'static>(mut self, renderer: E) -> Self {
        self.error_renderer = Some(Arc::new(renderer));
        self
    }

    pub fn build(self) -> Result<Server, ServerError> {
        self.config.validate()?;
        let error_renderer = self.error_renderer.unwrap_or_else(|| Arc::new(DefaultErrorRenderer));
        let dispatcher = Dispatcher::new(self.router, self.config.limits, error_renderer);
        Ok(Server { config: self.config, dispatcher })
    }
}

impl std::fmt::Debug for ServerBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerBuilder").field("config", &self.config).field("router", &self.router).finish_non_exhaustive()
    }
}

#[derive(Debug)]
pub struct Server {
    config: ServerConfig,
    dispatcher: Dispatcher,
}

impl Server {
    pub fn builder() -> ServerBuilder {
        ServerBuilder::new()
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Binds the listener and spawns the acceptor and the workers.
    ///
    /// Returns as soon as the server accepts connections.
    pub async fn start(self) -> Result<RunningServer, ServerError> {
        let address = self.config.address;
        let listener = TcpListener::bind(address).await.map_err(|source| ServerError::Bind { address, source })?;
        let local_addr = listener.local_addr()?;
        info!(%local_addr, workers = self.config.workers, "start listening");

        let shutdown = CancellationToken::new();
        let (sender, receiver) = mpsc::channel(1);
        let receiver: Handoff = Arc::new(Mutex::new(receiver));
        let dispatcher = Arc::new(self.dispatcher);

        let workers = (0..self.config.workers)
            .map(|id| tokio::spawn(worker(id, Arc::clone(&dispatcher), Arc::clone(&receiver), shutdown.clone())))
            .collect();
        let acceptor = tokio::spawn(accept_loop(listener, sender, shutdown.clone()));

        Ok(RunningServer { local_addr, shutdown, acceptor, workers })
    }

    /// Serves until `signal` completes, then shuts down gracefully.
    ///
    /// ```no_run
    /// # async fn run() -> Result<(), nano_web::ServerError> {
    /// use nano_web::Server;
    ///
    /// let server = Server::builder().address(([0, 0, 0, 0], 8080)).build()?;
    /// server.run_until(async {
    ///     let _ = tokio::signal::ctrl_c().await;
    /// }).await
    /// # }
    /// ```
    pub async fn run_until<F: Future<Output = ()>>(self, signal: F) -> Result<(), ServerError> {
        let running = self.start().await?;
        signal.await;
        info!("shutdown requested");
        running.shutdown().await;
        Ok(())
    }
}

/// Handle to a started server.
#[derive(Debug)]
pub struct RunningServer {
    local_addr: SocketAddr,
    shutdown: CancellationToken,
    acceptor: JoinHandle<()>,
    workers: Vec<JoinHandle<()>>,
}

impl RunningServer {
    /// The bound address, with the actual port when port 0 was configured.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Cancelling this token shuts the server down.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Stops accepting, ends idle workers and open websocket sessions, and
    /// waits for every task to finish.
    pub async fn shutdown(self) {
        self.shutdown.cancel();
        self.wait().await;
    }

    /// Waits until the server has shut down.
    pub async fn wait(self) {
        if let Err(e) = self.acceptor.await {
            error!(cause = %e, "acceptor task failed");
        }
        for worker in self.workers {
            if let Err(e) = worker.await {
                error!(cause = %e, "worker task failed");
            }
        }
        info!(local_addr = %self.local_addr, "server stopped");
    }
}

async fn accept_loop(listener: TcpListener, sender: mpsc::Sender<(TcpStream, SocketAddr)>, shutdown: CancellationToken) {
    loop {
        let accepted = tokio::select! {
            biased;
            () = shutdown.cancelled() => break,
            accepted = listener.accept() => accepted,
        };

        let (stream, peer) = match accepted {
            Ok(accepted) => accepted,
            Err(e) => {
                warn!(cause = %e, "failed to accept");
                tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
                continue;
            }
        };
        trace!(%peer, "accepted connection");

        tokio::select! {
            biased;
            () = shutdown.cancelled() => break,
            sent = sender.send((stream, peer)) => {
                if sent.is_err() {
                    error!("no worker left to serve connections");
                    break;
                }
            }
        }
    }
    info!("stop accepting connections");
}

async fn worker(id: usize, dispatcher: Arc<Dispatcher>, receiver: Handoff, shutdown: CancellationToken) {
    debug!(worker = id, "worker started");
    loop {
        let handoff = tokio::select! {
            biased;
            () = shutdown.cancelled() => break,
            handoff = async { receiver.lock().await.recv().await } => handoff,
        };
        let Some((stream, peer)) = handoff else {
            break;
        };

        let span = info_span!("connection", worker = id, %peer);
        let (reader, writer) = stream.into_split();
        let served = AssertUnwindSafe(dispatcher.dispatch(reader, writer, shutdown.clone()))
            .catch_unwind()
            .instrument(span.clone())
            .await;
        if let Err(panic) = served {
            error!(parent: &span, cause = panic_message(panic.as_ref()), "connection handler panicked");
        }
    }
    debug!(worker = id, "worker stopped");
}
