//! # Configuración del Agente
//! src/config.rs
//!
//! Este módulo define la configuración del agente con soporte completo
//! para argumentos CLI y variables de entorno.
//!
//! ## Ejemplos de uso
//!
//! ### CLI
//! ```bash
//! ./nullboard_agent --port 10001 -c ~/Nullboard -vv
//! ./nullboard_agent area add work
//! ./nullboard_agent area list
//! ```
//!
//! ### Variables de entorno
//! ```bash
//! AGENT_PORT=10002 AGENT_ROOT=/srv/nullboard ./nullboard_agent
//! ```

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Nombre del archivo de áreas dentro de la raíz
pub const SETTINGS_FILE: &str = "settings.json";

/// Nombre de la carpeta raíz por defecto
pub const DEFAULT_ROOT_NAME: &str = "Nullboard";

/// Configuración inválida
#[derive(Debug, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct ConfigError(pub String);

/// Configuración del agente de respaldo
#[derive(Debug, Clone, Parser)]
#[command(name = "nullboard_agent")]
#[command(about = "Agente local de respaldo para Nullboard")]
#[command(version = "0.1.0")]
pub struct Config {
    /// Host/IP en el que escucha
    #[arg(long, default_value = "127.0.0.1", env = "AGENT_HOST")]
    pub host: String,

    /// Puerto en el que escucha el agente
    #[arg(short, long, default_value = "10001", env = "AGENT_PORT")]
    pub port: u16,

    /// Raíz de almacenamiento (también guarda settings.json)
    #[arg(short = 'c', long, env = "AGENT_ROOT")]
    pub root: Option<PathBuf>,

    /// Verbosidad: -v debug, -vv trace
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    // === Timeouts ===

    /// Espera máxima por cada lectura de headers o body, en milisegundos
    #[arg(long = "header-timeout-ms", default_value = "2000", env = "AGENT_HEADER_TIMEOUT_MS")]
    pub header_timeout_ms: u64,

    /// Espera máxima por cada bloqueo al enviar, en milisegundos
    #[arg(long = "write-timeout-ms", default_value = "1000", env = "AGENT_WRITE_TIMEOUT_MS")]
    pub write_timeout_ms: u64,

    /// Cada cuánto revisa el loop de accept la señal de parada, en milisegundos
    #[arg(long = "accept-poll-ms", default_value = "200", env = "AGENT_ACCEPT_POLL_MS")]
    pub accept_poll_ms: u64,

    // === Buffers ===

    /// Tamaño inicial del buffer de recepción
    #[arg(long = "initial-buffer", default_value = "8192", env = "AGENT_INITIAL_BUFFER")]
    pub initial_buffer: usize,

    /// Tamaño máximo de un request completo (headers + body)
    #[arg(long = "max-request-bytes", default_value = "16777216", env = "AGENT_MAX_REQUEST_BYTES")]
    pub max_request_bytes: usize,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Subcomandos
#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Atiende requests (por defecto)
    Serve,

    /// Gestión de áreas
    #[command(subcommand)]
    Area(AreaCommand),
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum AreaCommand {
    /// Registra un área nueva e imprime su token
    Add {
        /// Carpeta del área bajo la raíz
        folder: String,
    },

    /// Lista las áreas registradas
    List,

    /// Olvida un área (sus archivos se conservan)
    Remove {
        token: String,
    },
}

impl Config {
    /// Crea una nueva configuración parseando argumentos CLI
    pub fn new() -> Self {
        Config::parse()
    }

    /// Obtiene la dirección completa para bind (host:port)
    ///
    /// # Ejemplo
    /// ```rust
    /// use nullboard_agent::config::Config;
    ///
    /// let config = Config::default();
    /// assert_eq!(config.address(), "127.0.0.1:10001");
    /// ```
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Raíz de almacenamiento efectiva
    ///
    /// Sin `--root` se usa `<directorio de datos local>/Nullboard`, o
    /// `./Nullboard` si la plataforma no tiene uno.
    pub fn storage_root(&self) -> PathBuf {
        match &self.root {
            Some(root) => root.clone(),
            None => dirs::data_local_dir()
                .map(|dir| dir.join(DEFAULT_ROOT_NAME))
                .unwrap_or_else(|| PathBuf::from(".").join(DEFAULT_ROOT_NAME)),
        }
    }

    pub fn settings_path(&self) -> PathBuf {
        self.storage_root().join(SETTINGS_FILE)
    }

    pub fn subcommand(&self) -> Command {
        self.command.clone().unwrap_or(Command::Serve)
    }

    pub fn header_timeout(&self) -> Duration {
        Duration::from_millis(self.header_timeout_ms)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }

    pub fn accept_poll_interval(&self) -> Duration {
        Duration::from_millis(self.accept_poll_ms)
    }

    /// Valida la configuración
    ///
    /// Retorna errores si hay valores inválidos
    pub fn validate(&self) -> Result<(), ConfigError> {
        // Validar timeouts
        if self.header_timeout_ms == 0 {
            return Err(ConfigError("Header timeout must be > 0".to_string()));
        }
        if self.write_timeout_ms == 0 {
            return Err(ConfigError("Write timeout must be > 0".to_string()));
        }
        if self.accept_poll_ms == 0 {
            return Err(ConfigError("Accept poll interval must be > 0".to_string()));
        }

        // Validar buffers
        if self.initial_buffer == 0 {
            return Err(ConfigError("Initial buffer must be >= 1".to_string()));
        }
        if self.max_request_bytes < self.initial_buffer {
            return Err(ConfigError(
                "Max request bytes must be >= initial buffer".to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for Config {
    /// Configuración por defecto
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 10001,
            root: None,
            verbose: 0,
            header_timeout_ms: 2_000,
            write_timeout_ms: 1_000,
            accept_poll_ms: 200,
            initial_buffer: 8 * 1024,
            max_request_bytes: 16 * 1024 * 1024,
            command: None,
        }
    }
}
