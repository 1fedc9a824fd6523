//! # Engine TCP Secuencial
//! src/server/tcp.rs
//!
//! Un único worker acepta conexiones y las atiende de a una: se lee un
//! request, se responde y se cierra. No hay conexiones persistentes.
//!
//! ## Ciclo de vida de una conexión
//!
//! ```text
//! Accepted → ReadingHeaders → HeadersReady → (ReadingBody) → Handling → Responded → Closed
//! ```
//!
//! Cualquier timeout, error de transporte o request malformado lleva
//! directo a `Closed` sin enviar respuesta.
//!
//! ## Apagado
//!
//! El listener es no bloqueante. El loop de accept espera conexiones en
//! intervalos de `accept_poll_interval` y entre intervalo e intervalo revisa
//! la señal de parada. Una conexión en curso no se interrumpe: un peer lento
//! puede demorar el apagado hasta un timeout.

use super::connection::{Connection, Recv, SendError};
use super::poll::{self, Interest};
use crate::areas::AreaRegistry;
use crate::config::Config;
use crate::http::{try_parse_from, ByteRange, FormBody, Method, ParseError, ParseStatus, Request, Response, StatusCode};
use crate::router::{path_segments, ApiContext, Router};
use crate::storage::BoardStore;
use crossbeam_channel::{bounded, Receiver, Sender, TryRecvError};
use std::io;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info, trace, warn};

/// Errores que terminan el engine
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to bind {addr}: {source}")]
    Bind { addr: String, source: io::Error },

    #[error("accept failed: {0}")]
    Accept(io::Error),

    #[error("failed to start the engine thread: {0}")]
    Spawn(io::Error),

    #[error("engine thread panicked")]
    Panicked,
}

/// Fallas que cierran una conexión sin responder
#[derive(Debug, Error)]
pub enum ConnError {
    #[error("peer closed the connection")]
    Closed,

    #[error("timed out waiting for the peer")]
    TimedOut,

    #[error("request does not fit in the receive buffer")]
    TooLarge,

    #[error("malformed request: {0}")]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Send(#[from] SendError),

    #[error("receive failed: {0}")]
    Io(#[from] io::Error),
}

/// Estados de una conexión (solo para trazas)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnState {
    Accepted,
    ReadingHeaders,
    HeadersReady,
    ReadingBody,
    Handling,
    Responded,
    Closed,
}

struct StateTrace {
    peer: SocketAddr,
    state: ConnState,
}

impl StateTrace {
    fn new(peer: SocketAddr) -> Self {
        trace!("conn {}: {:?}", peer, ConnState::Accepted);
        Self {
            peer,
            state: ConnState::Accepted,
        }
    }

    fn advance(&mut self, next: ConnState) {
        trace!("conn {}: {:?} -> {:?}", self.peer, self.state, next);
        self.state = next;
    }
}

/// Límites de I/O del engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineLimits {
    pub header_timeout: Duration,
    pub write_timeout: Duration,
    pub accept_poll_interval: Duration,
    pub initial_buffer: usize,
    pub max_request_bytes: usize,
}

impl From<&Config> for EngineLimits {
    fn from(config: &Config) -> Self {
        Self {
            header_timeout: config.header_timeout(),
            write_timeout: config.write_timeout(),
            accept_poll_interval: config.accept_poll_interval(),
            initial_buffer: config.initial_buffer,
            max_request_bytes: config.max_request_bytes,
        }
    }
}

/// Dependencias inyectadas en el engine
pub struct EngineDeps {
    pub registry: Box<dyn AreaRegistry>,
    pub store: BoardStore,

    /// Se invoca al cerrar cada conexión
    pub on_activity: Option<Box<dyn FnMut() + Send>>,
}

/// Servidor de respaldo: listener + router + dependencias
pub struct Engine {
    listener: TcpListener,
    local_addr: SocketAddr,
    limits: EngineLimits,
    router: Router,
    registry: Box<dyn AreaRegistry>,
    store: BoardStore,
    on_activity: Option<Box<dyn FnMut() + Send>>,
    stop_tx: Option<Sender<()>>,
    stop_rx: Receiver<()>,
}

impl Engine {
    /// Crea el listener (no bloqueante) en la dirección configurada
    pub fn bind(config: &Config, deps: EngineDeps) -> Result<Self, EngineError> {
        let addr = config.address();
        let bind_err = |source| EngineError::Bind {
            addr: addr.clone(),
            source,
        };

        let listener = TcpListener::bind(&addr).map_err(bind_err)?;
        listener.set_nonblocking(true).map_err(bind_err)?;
        let local_addr = listener.local_addr().map_err(bind_err)?;

        info!("Server socket bound to {}", local_addr);

        let (stop_tx, stop_rx) = bounded(1);

        Ok(Self {
            listener,
            local_addr,
            limits: EngineLimits::from(config),
            router: Router::api(),
            registry: deps.registry,
            store: deps.store,
            on_activity: deps.on_activity,
            stop_tx: Some(stop_tx),
            stop_rx,
        })
    }

    /// Dirección real del listener (útil con puerto 0)
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Emisor de la señal de parada para quien use `run` directamente
    pub fn stop_signal(&self) -> Option<Sender<()>> {
        self.stop_tx.clone()
    }

    /// Corre el loop de accept en el thread actual hasta recibir la señal de parada
    pub fn run(mut self) -> Result<(), EngineError> {
        info!("Server is up on {}", self.local_addr);

        loop {
            match self.stop_rx.try_recv() {
                Ok(()) | Err(TryRecvError::Disconnected) => break,
                Err(TryRecvError::Empty) => {}
            }

            match poll::wait(&self.listener, Interest::Readable, self.limits.accept_poll_interval) {
                Ok(true) => {}
                Ok(false) => continue,
                Err(e) => {
                    error!("Waiting for connections failed: {}", e);
                    return Err(EngineError::Accept(e));
                }
            }

            match self.listener.accept() {
                Ok((stream, peer)) => self.serve(stream, peer),
                Err(e) if is_recoverable_accept_error(&e) => {
                    debug!("accept: {}", e);
                }
                Err(e) => {
                    error!("accept failed: {}", e);
                    return Err(EngineError::Accept(e));
                }
            }
        }

        info!("Server shut down");
        Ok(())
    }

    /// Corre el engine en un thread dedicado
    pub fn spawn(mut self) -> Result<EngineHandle, EngineError> {
        let local_addr = self.local_addr;
        let stop_tx = self.stop_tx.take();

        let thread = thread::Builder::new()
            .name("engine".to_string())
            .spawn(move || self.run())
            .map_err(EngineError::Spawn)?;

        Ok(EngineHandle {
            stop_tx,
            thread,
            local_addr,
        })
    }

    /// Atiende una conexión completa y notifica actividad
    fn serve(&mut self, stream: TcpStream, peer: SocketAddr) {
        info!("Connection accepted from {}", peer);

        match Connection::new(stream, self.limits.initial_buffer, self.limits.max_request_bytes) {
            Ok(mut conn) => {
                let mut states = StateTrace::new(peer);

                match self.exchange(&mut conn, &mut states) {
                    Ok(status) => debug!("Responded {} to {}", status, peer),
                    Err(ConnError::Send(e)) => warn!("Failed to respond to {}: {}", peer, e),
                    Err(e) => debug!("Dropping {}: {}", peer, e),
                }

                states.advance(ConnState::Closed);
                conn.close();
            }
            Err(e) => warn!("Failed to set up connection from {}: {}", peer, e),
        }

        info!("Connection closed");

        if let Some(on_activity) = self.on_activity.as_mut() {
            on_activity();
        }
    }

    /// Lee un request, lo despacha y envía la respuesta
    fn exchange(
        &mut self,
        conn: &mut Connection,
        states: &mut StateTrace,
    ) -> Result<StatusCode, ConnError> {
        states.advance(ConnState::ReadingHeaders);
        let (request, body_offset) = self.read_headers(conn)?;
        conn.consume_to(body_offset);
        states.advance(ConnState::HeadersReady);

        debug!("{} {}", request.verb(), request.target());

        let response = match request.method() {
            Method::Options => Response::cors_preflight(),
            Method::Put | Method::Delete => self.handle_api(conn, &request, states)?,
            Method::Other => Response::error(StatusCode::UnsupportedMethod, "Unsupported method"),
        };

        conn.send(&response.to_bytes(), self.limits.write_timeout)?;
        states.advance(ConnState::Responded);

        Ok(response.status())
    }

    /// Recibe hasta tener el bloque de headers completo
    fn read_headers(&self, conn: &mut Connection) -> Result<(Request, usize), ConnError> {
        let mut scanned = 0;
        loop {
            self.receive_some(conn)?;

            match try_parse_from(conn.filled(), scanned)? {
                ParseStatus::Parsed { request, body_offset } => return Ok((request, body_offset)),
                ParseStatus::NotYet => {
                    scanned = conn.fill();
                    if !conn.replenish() {
                        return Err(ConnError::TooLarge);
                    }
                }
            }
        }
    }

    /// Recibe hasta tener `len` bytes de body después de `pos`
    fn read_body(&self, conn: &mut Connection, len: usize) -> Result<(), ConnError> {
        let end = conn.pos() + len;
        while conn.fill() < end {
            self.receive_some(conn)?;
        }

        trace!("Payload: {} bytes", len);
        Ok(())
    }

    fn receive_some(&self, conn: &mut Connection) -> Result<(), ConnError> {
        match conn.receive(self.limits.header_timeout)? {
            Recv::Data(_) => Ok(()),
            Recv::Eof => Err(ConnError::Closed),
            Recv::TimedOut | Recv::WouldBlock => Err(ConnError::TimedOut),
        }
    }

    /// PUT / DELETE: validación, autenticación, body y routing
    fn handle_api(
        &mut self,
        conn: &mut Connection,
        request: &Request,
        states: &mut StateTrace,
    ) -> Result<Response, ConnError> {
        let path = request.path();

        if !path.starts_with('/') {
            warn!("Invalid path 1");
            return Ok(Response::bad_request("Invalid path, 1"));
        }

        let segments = path_segments(path);
        if segments.is_empty() {
            warn!("Invalid path 2");
            return Ok(Response::bad_request("Invalid path, 2"));
        }

        let Some(token) = request.header("x-access-token") else {
            info!("No X-Access-Token header");
            return Ok(Response::bad_request("No Access-Token header"));
        };

        let Some(area) = self.registry.lookup(token) else {
            info!("X-Access-Token mismatch");
            return Ok(Response::error(StatusCode::AccessDenied, "Invalid access token"));
        };

        let method = request.method();
        let mut body_len = 0;

        if method == Method::Put {
            let Some(clen) = request.header("content-length") else {
                warn!("No Content-Length header");
                return Ok(Response::bad_request("No Content-Length header"));
            };

            let Some(len) = ByteRange::from(clen).parse_usize() else {
                warn!("Invalid Content-Length header");
                return Ok(Response::bad_request("Invalid Content-Length header"));
            };

            if conn.pos().saturating_add(len) > conn.max_capacity() {
                warn!("Content-Length {} exceeds the request size limit", len);
                return Ok(Response::bad_request("Content-Length too large"));
            }

            states.advance(ConnState::ReadingBody);
            self.read_body(conn, len)?;
            body_len = len;
        }

        states.advance(ConnState::Handling);

        let start = conn.pos();
        let body = &conn.filled()[start..start + body_len];
        let form = FormBody::parse(body);

        let mut ctx = ApiContext {
            token,
            area: &area,
            store: &self.store,
            registry: self.registry.as_mut(),
        };

        Ok(self.router.route(method, &segments, &mut ctx, &form))
    }
}

/// Errores de `accept` que no deben terminar el engine
pub fn is_recoverable_accept_error(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::WouldBlock
            | io::ErrorKind::Interrupted
    )
}

/// Control de un engine corriendo en su propio thread
pub struct EngineHandle {
    stop_tx: Option<Sender<()>>,
    thread: JoinHandle<Result<(), EngineError>>,
    local_addr: SocketAddr,
}

impl EngineHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// `true` si el loop ya terminó (por parada o por error)
    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    /// Envía la señal de parada y espera a que el thread termine
    pub fn stop(mut self) -> Result<(), EngineError> {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.try_send(());
        }

        self.join()
    }

    /// Espera a que el thread termine, sin pedirle que pare
    pub fn join(self) -> Result<(), EngineError> {
        self.thread.join().map_err(|_| EngineError::Panicked)?
    }
}
