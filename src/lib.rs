//! # Nullboard Agent
//! src/lib.rs
//!
//! Agente local de respaldo para Nullboard. El cliente web envía cada cambio
//! de un board por HTTP; el agente lo autentica con un token por área y lo
//! guarda en disco como una revisión nueva.
//!
//! ## Arquitectura
//!
//! El agente está dividido en módulos especializados:
//! - `http`: Parsing del subconjunto de HTTP/1.1 que usa el cliente
//! - `server`: Engine TCP secuencial, conexiones no bloqueantes y timeouts
//! - `router`: Enrutamiento de peticiones a los handlers de almacenamiento
//! - `storage`: Layout en disco de configuraciones, boards y revisiones
//! - `areas`: Registro token → área persistido en `settings.json`
//! - `config`: Argumentos CLI y variables de entorno
//! - `logging`: Subscriber de `tracing`
//!
//! ## Ejemplo de uso
//!
//! ```no_run
//! use nullboard_agent::areas::SettingsFile;
//! use nullboard_agent::config::Config;
//! use nullboard_agent::server::{Engine, EngineDeps};
//! use nullboard_agent::storage::BoardStore;
//!
//! let config = Config::default();
//! let deps = EngineDeps {
//!     registry: Box::new(SettingsFile::open(config.settings_path()).unwrap()),
//!     store: BoardStore::new(config.storage_root()),
//!     on_activity: None,
//! };
//!
//! let handle = Engine::bind(&config, deps).unwrap().spawn().unwrap();
//! handle.stop().unwrap();
//! ```

pub mod areas;
pub mod config;
pub mod http;
pub mod logging;
pub mod router;
pub mod server;
pub mod storage;
