//! # Logging
//! src/logging.rs
//!
//! Instala el subscriber de `tracing` para el binario. `RUST_LOG` tiene
//! prioridad; si no está definido, la verbosidad de la CLI elige el nivel:
//!
//! | `-v` | nivel  |
//! |------|--------|
//! | 0    | info   |
//! | 1    | debug  |
//! | 2+   | trace  |

use tracing_subscriber::EnvFilter;

/// Nivel por defecto para una verbosidad dada
pub fn level_for(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    }
}

/// Instala el subscriber global
///
/// Si ya había uno instalado (por ejemplo en tests) no hace nada.
pub fn init(verbosity: u8) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level_for(verbosity)));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
