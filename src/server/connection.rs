//! # Conexión No Bloqueante
//! src/server/connection.rs
//!
//! Estado de una conexión aceptada: el socket (en modo no bloqueante), un
//! buffer de recepción que crece duplicándose, cuántos bytes del buffer están
//! llenos (`fill`) y hasta dónde se consumieron (`pos`).
//!
//! ## Recepción
//!
//! `receive(timeout)` hace un intento inmediato; si el socket no tiene data
//! espera a que sea legible hasta `timeout` y reintenta una sola vez. Un
//! segundo "would block" se reporta como timeout.
//!
//! ## Envío
//!
//! `send(bytes, timeout)` escribe en loop. Cada escritura parcial exitosa
//! rearma la espera; dos "would block" seguidos sin progreso entre medio
//! hacen fallar el envío. Es un límite por llamada, no un presupuesto global.

use super::poll::{self, Interest};
use std::io::{self, Read, Write};
use std::net::{Shutdown, TcpStream};
use std::time::Duration;
use thiserror::Error;
use tracing::trace;

/// Resultado de un intento de lectura
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recv {
    /// Llegaron `n` bytes (ya sumados a `fill`)
    Data(usize),

    /// El peer cerró su lado de la conexión
    Eof,

    /// No hay data por ahora (solo desde `try_receive`)
    WouldBlock,

    /// Expiró la espera de `receive`
    TimedOut,
}

/// Errores de envío
#[derive(Debug, Error)]
pub enum SendError {
    /// El socket no se volvió escribible a tiempo
    #[error("send timed out")]
    TimedOut,

    /// Segundo "would block" seguido sin progreso
    #[error("peer stopped reading")]
    Stalled,

    #[error("send failed: {0}")]
    Io(#[from] io::Error),
}

/// Una conexión TCP con su buffer de recepción
#[derive(Debug)]
pub struct Connection {
    stream: TcpStream,

    /// Buffer de recepción; `buf.len()` es su capacidad útil
    buf: Vec<u8>,

    /// Bytes válidos en `buf`
    fill: usize,

    /// Bytes ya consumidos por el parser
    pos: usize,

    /// Tamaño máximo al que puede crecer `buf`
    max_capacity: usize,
}

impl Connection {
    /// Toma un socket aceptado y lo pasa a modo no bloqueante
    pub fn new(stream: TcpStream, initial_capacity: usize, max_capacity: usize) -> io::Result<Self> {
        stream.set_nonblocking(true)?;
        let initial_capacity = initial_capacity.max(1);

        Ok(Self {
            stream,
            buf: vec![0; initial_capacity],
            fill: 0,
            pos: 0,
            max_capacity: max_capacity.max(initial_capacity),
        })
    }

    /// Un intento de lectura no bloqueante sobre el espacio libre del buffer
    ///
    /// Si el buffer está lleno se intenta crecer primero; si ya alcanzó su
    /// tope retorna un error `OutOfMemory`.
    pub fn try_receive(&mut self) -> io::Result<Recv> {
        if self.fill == self.buf.len() && !self.replenish() {
            return Err(io::Error::new(
                io::ErrorKind::OutOfMemory,
                "receive buffer reached its size limit",
            ));
        }

        match self.stream.read(&mut self.buf[self.fill..]) {
            Ok(0) => {
                trace!("recv -> eof");
                Ok(Recv::Eof)
            }
            Ok(n) => {
                trace!("recv -> read {} bytes", n);
                self.fill += n;
                Ok(Recv::Data(n))
            }
            Err(e)
                if e.kind() == io::ErrorKind::WouldBlock
                    || e.kind() == io::ErrorKind::Interrupted =>
            {
                Ok(Recv::WouldBlock)
            }
            Err(e) => Err(e),
        }
    }

    /// Lectura con espera acotada
    ///
    /// Nunca retorna `Recv::WouldBlock`: un segundo intento sin data se
    /// reporta como `Recv::TimedOut`.
    pub fn receive(&mut self, timeout: Duration) -> io::Result<Recv> {
        match self.try_receive()? {
            Recv::WouldBlock => {}
            other => return Ok(other),
        }

        if !poll::wait(&self.stream, Interest::Readable, timeout)? {
            trace!("recv timed out");
            return Ok(Recv::TimedOut);
        }

        match self.try_receive()? {
            Recv::WouldBlock => {
                trace!("recv timed out");
                Ok(Recv::TimedOut)
            }
            other => Ok(other),
        }
    }

    /// Envía todos los bytes, esperando hasta `timeout` cada vez que el socket se llena
    ///
    /// Retorna la cantidad total enviada (siempre `bytes.len()` en caso de éxito).
    pub fn send(&mut self, bytes: &[u8], timeout: Duration) -> Result<usize, SendError> {
        let mut rest = bytes;
        let mut waited = false;

        while !rest.is_empty() {
            match self.stream.write(rest) {
                Ok(0) => return Err(io::Error::from(io::ErrorKind::WriteZero).into()),
                Ok(n) => {
                    trace!("send -> sent {} bytes, out of {}", n, rest.len());
                    rest = &rest[n..];
                    waited = false;
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    if waited {
                        return Err(SendError::Stalled);
                    }

                    if !poll::wait(&self.stream, Interest::Writable, timeout)? {
                        return Err(SendError::TimedOut);
                    }

                    waited = true;
                }
                Err(e) => return Err(e.into()),
            }
        }

        Ok(bytes.len())
    }

    /// Duplica el buffer si está lleno
    ///
    /// Retorna `false` solo si está lleno y ya no puede crecer.
    pub fn replenish(&mut self) -> bool {
        if self.fill < self.buf.len() {
            return true;
        }

        if self.buf.len() >= self.max_capacity {
            return false;
        }

        let grown = self.buf.len().saturating_mul(2).min(self.max_capacity);
        self.buf.resize(grown, 0);
        true
    }

    /// Bytes recibidos hasta ahora
    pub fn filled(&self) -> &[u8] {
        &self.buf[..self.fill]
    }

    /// Bytes recibidos que el parser aún no consumió
    pub fn unconsumed(&self) -> &[u8] {
        &self.buf[self.pos..self.fill]
    }

    /// Marca como consumido todo hasta `pos` (acotado a `fill`)
    pub fn consume_to(&mut self, pos: usize) {
        self.pos = pos.min(self.fill);
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn fill(&self) -> usize {
        self.fill
    }

    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    pub fn max_capacity(&self) -> usize {
        self.max_capacity
    }

    /// Cierra el lado de escritura y libera el socket
    ///
    /// Antes de soltar el socket descarta lo que el peer ya envió y nadie
    /// leyó (hasta `max_capacity` bytes); con data pendiente el kernel
    /// cerraría con RST y el peer podría perder la respuesta.
    pub fn close(mut self) {
        let _ = self.stream.shutdown(Shutdown::Write);

        let mut scratch = [0u8; 4096];
        let mut drained = 0;
        while drained < self.max_capacity {
            match self.stream.read(&mut scratch) {
                Ok(0) | Err(_) => break,
                Ok(n) => drained += n,
            }
        }
    }
}
