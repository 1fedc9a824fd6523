//! # Registro de Áreas
//! src/areas/mod.rs
//!
//! Un área asocia un token de acceso con una carpeta bajo la raíz de
//! almacenamiento y con la última URL desde la que el cliente se reportó.
//!
//! Las áreas se persisten en `<root>/settings.json`:
//!
//! ```json
//! {
//!   "areas": [
//!     { "token": "A123-B456-C789-D012", "folder": "work", "url": "" }
//!   ]
//! }
//! ```
//!
//! El engine solo ve el trait [`AreaRegistry`]; la implementación respaldada
//! por archivo es [`SettingsFile`].

use crate::storage::{BoardStore, StorageError};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// Letras válidas en los tokens generados
const TOKEN_LETTERS: &[u8] = b"ABCEFHJKLMNPQRSTUVWXY";

/// Dígitos válidos en los tokens generados
const TOKEN_DIGITS: &[u8] = b"0123456789";

/// Un área tal como la ven los handlers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Area {
    /// Carpeta relativa a la raíz de almacenamiento
    pub folder: String,

    /// Última URL reportada por el cliente (vacía si nunca se reportó)
    pub url: String,
}

/// Una entrada de `settings.json`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AreaEntry {
    pub token: String,
    pub folder: String,
    #[serde(default)]
    pub url: String,
}

impl AreaEntry {
    pub fn area(&self) -> Area {
        Area {
            folder: self.folder.clone(),
            url: self.url.clone(),
        }
    }
}

/// Contenido de `settings.json`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub areas: Vec<AreaEntry>,
}

impl Settings {
    /// Índice del área cuyo token coincide (sin distinguir mayúsculas)
    ///
    /// Solo hay resultado si coincide exactamente un área.
    fn position(&self, token: &str) -> Option<usize> {
        let mut matches = self
            .areas
            .iter()
            .enumerate()
            .filter(|(_, entry)| entry.token.eq_ignore_ascii_case(token))
            .map(|(i, _)| i);

        match (matches.next(), matches.next()) {
            (Some(i), None) => Some(i),
            _ => None,
        }
    }

    pub fn entry(&self, token: &str) -> Option<&AreaEntry> {
        self.position(token).map(|i| &self.areas[i])
    }

    fn contains_token(&self, token: &str) -> bool {
        self.areas.iter().any(|e| e.token.eq_ignore_ascii_case(token))
    }
}

/// Errores del registro de áreas
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to access {path}: {source}")]
    Io { path: PathBuf, source: io::Error },

    #[error("malformed settings in {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("no area matches token {0}")]
    UnknownToken(String),

    #[error("invalid area folder name: {0:?}")]
    InvalidFolder(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Mapeo token → área que consulta el engine
pub trait AreaRegistry: Send {
    /// Área del token, si coincide exactamente una
    fn lookup(&self, token: &str) -> Option<Area>;

    /// Recuerda la URL desde la que se reportó el cliente
    fn remember_url(&mut self, token: &str, url: &str) -> Result<(), SettingsError>;
}

/// Registro en memoria, sin persistencia
impl AreaRegistry for Settings {
    fn lookup(&self, token: &str) -> Option<Area> {
        self.entry(token).map(AreaEntry::area)
    }

    fn remember_url(&mut self, token: &str, url: &str) -> Result<(), SettingsError> {
        let i = self
            .position(token)
            .ok_or_else(|| SettingsError::UnknownToken(token.to_string()))?;
        self.areas[i].url = url.to_string();
        Ok(())
    }
}

/// Registro respaldado por `settings.json`
#[derive(Debug)]
pub struct SettingsFile {
    /// Ruta al archivo de persistencia
    path: PathBuf,

    settings: Settings,
}

impl SettingsFile {
    /// Abre el archivo; si no existe (o está vacío) empieza sin áreas
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, SettingsError> {
        let path = path.into();
        let settings = if path.exists() {
            Self::load_from_file(&path)?
        } else {
            debug!("{} not found, starting with no areas", path.display());
            Settings::default()
        };

        Ok(Self { path, settings })
    }

    fn load_from_file(path: &Path) -> Result<Settings, SettingsError> {
        let io_err = |source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        };

        if fs::metadata(path).map_err(io_err)?.len() == 0 {
            return Ok(Settings::default());
        }

        let file = File::open(path).map_err(io_err)?;
        serde_json::from_reader(BufReader::new(file)).map_err(|source| SettingsError::Json {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Guarda todo el registro (archivo temporal + rename)
    pub fn save(&self) -> Result<(), SettingsError> {
        let temp_path = self.path.with_extension("json.tmp");
        let io_err = |source| SettingsError::Io {
            path: temp_path.clone(),
            source,
        };

        let file = File::create(&temp_path).map_err(io_err)?;
        let mut writer = BufWriter::new(file);

        serde_json::to_writer_pretty(&mut writer, &self.settings).map_err(|source| {
            SettingsError::Json {
                path: temp_path.clone(),
                source,
            }
        })?;
        writer.flush().map_err(io_err)?;
        drop(writer);

        fs::rename(&temp_path, &self.path).map_err(|source| SettingsError::Io {
            path: self.path.clone(),
            source,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Todas las áreas registradas
    pub fn areas(&self) -> &[AreaEntry] {
        &self.settings.areas
    }

    /// Registra un área nueva con un token recién generado
    ///
    /// Crea la carpeta del área y persiste el registro.
    pub fn add_area(&mut self, folder: &str, store: &BoardStore) -> Result<AreaEntry, SettingsError> {
        let folder = validate_folder(folder)?;

        let mut rng = rand::thread_rng();
        let token = loop {
            let candidate = generate_token(&mut rng);
            if !self.settings.contains_token(&candidate) {
                break candidate;
            }
        };

        store.ensure_area(&folder)?;

        let entry = AreaEntry {
            token,
            folder,
            url: String::new(),
        };
        self.settings.areas.push(entry.clone());
        self.save()?;

        info!("Added area '{}' with token {}", entry.folder, entry.token);
        Ok(entry)
    }

    /// Olvida un área; sus archivos quedan intactos
    pub fn remove_area(&mut self, token: &str) -> Result<AreaEntry, SettingsError> {
        let i = self
            .settings
            .position(token)
            .ok_or_else(|| SettingsError::UnknownToken(token.to_string()))?;

        let removed = self.settings.areas.remove(i);
        self.save()?;

        info!("Removed area '{}'", removed.folder);
        Ok(removed)
    }
}

impl AreaRegistry for SettingsFile {
    fn lookup(&self, token: &str) -> Option<Area> {
        self.settings.lookup(token)
    }

    fn remember_url(&mut self, token: &str, url: &str) -> Result<(), SettingsError> {
        if self.settings.entry(token).is_some_and(|e| e.url == url) {
            return Ok(());
        }

        self.settings.remember_url(token, url)?;
        self.save()
    }
}

/// Genera un token de la forma `A123-B456-C789-D012`
pub fn generate_token<R: Rng + ?Sized>(rng: &mut R) -> String {
    let mut token = String::with_capacity(19);

    for group in 0..4 {
        if group > 0 {
            token.push('-');
        }

        token.push(TOKEN_LETTERS[rng.gen_range(0..TOKEN_LETTERS.len())] as char);
        for _ in 0..3 {
            token.push(TOKEN_DIGITS[rng.gen_range(0..TOKEN_DIGITS.len())] as char);
        }
    }

    token
}

/// Normaliza y valida el nombre de carpeta de un área
pub fn validate_folder(folder: &str) -> Result<String, SettingsError> {
    let trimmed = folder.trim();

    let invalid = trimmed.is_empty()
        || trimmed == "."
        || trimmed.contains("..")
        || trimmed.contains(['/', '\\']);

    if invalid {
        return Err(SettingsError::InvalidFolder(folder.to_string()));
    }

    Ok(trimmed.to_string())
}
