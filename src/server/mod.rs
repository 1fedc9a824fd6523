//! # Módulo del Servidor
//! src/server/mod.rs
//!
//! Este módulo implementa el engine TCP que:
//! 1. Escucha en un puerto (listener no bloqueante)
//! 2. Acepta conexiones de a una
//! 3. Lee y parsea un request HTTP con timeouts acotados
//! 4. Autentica, despacha y envía la respuesta
//! 5. Cierra la conexión

pub mod connection;
pub mod poll;
pub mod tcp;

// Re-exportar para facilitar el uso
pub use connection::{Connection, Recv, SendError};
pub use tcp::{ConnError, ConnState, Engine, EngineDeps, EngineError, EngineHandle, EngineLimits};
