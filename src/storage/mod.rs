//! # Almacenamiento de Boards
//! src/storage/mod.rs
//!
//! Layout en disco bajo la raíz de almacenamiento:
//!
//! ```text
//! <root>/<area>/app-config.json
//! <root>/<area>/<board>/meta.json
//! <root>/<area>/<board>/rev-00000042.nbx
//! <root>/<area>/$DeletedBoards/<board>/...
//! ```
//!
//! Cada revisión se guarda en su propio archivo; `meta.json` se sobrescribe.
//! Borrar un board no elimina nada: mueve el directorio completo al archivo
//! `$DeletedBoards`.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Nombre del directorio donde se archivan los boards borrados
pub const DELETED_BOARDS_DIR: &str = "$DeletedBoards";

/// Nombre del archivo de configuración de la app dentro de un área
pub const APP_CONFIG_FILE: &str = "app-config.json";

/// Nombre del archivo de metadatos de un board
pub const META_FILE: &str = "meta.json";

/// Nombre del archivo para una revisión (`rev-` + 8 dígitos con ceros + `.nbx`)
pub fn revision_file_name(revision: u32) -> String {
    format!("rev-{:08}.nbx", revision)
}

/// Errores de almacenamiento
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to create {path}: {source}")]
    MakePath { path: PathBuf, source: io::Error },

    #[error("failed to write {path}: {source}")]
    SaveFile { path: PathBuf, source: io::Error },

    #[error("failed to move {from} to {to}: {source}")]
    MoveFile {
        from: PathBuf,
        to: PathBuf,
        source: io::Error,
    },

    #[error("archive destination {0} already exists")]
    ArchiveExists(PathBuf),

    #[error("board directory {0} does not exist")]
    MissingBoard(PathBuf),
}

impl StorageError {
    /// `true` cuando el error es culpa del cliente (board inexistente)
    pub fn is_missing_board(&self) -> bool {
        matches!(self, StorageError::MissingBoard(_))
    }

    /// Texto corto que viaja en el body de la respuesta
    pub fn diagnostic(&self) -> &'static str {
        match self {
            StorageError::MakePath { .. } => "make_path() failed",
            StorageError::SaveFile { .. } => "save_file() failed",
            StorageError::MoveFile { .. } | StorageError::ArchiveExists(_) => "move_file() failed",
            StorageError::MissingBoard(_) => "Non-existent board",
        }
    }
}

/// Una revisión a escribir junto con el board
#[derive(Debug, Clone, Copy)]
pub struct Revision<'a> {
    pub number: u32,
    pub data: &'a [u8],
}

/// Operaciones de archivo sobre la raíz de almacenamiento
#[derive(Debug, Clone)]
pub struct BoardStore {
    root: PathBuf,
}

impl BoardStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directorio de un área
    pub fn area_dir(&self, folder: &str) -> PathBuf {
        self.root.join(folder)
    }

    /// Directorio de un board dentro de un área
    pub fn board_dir(&self, folder: &str, board_id: &str) -> PathBuf {
        self.area_dir(folder).join(board_id)
    }

    /// Crea el directorio del área si no existe
    pub fn ensure_area(&self, folder: &str) -> Result<PathBuf, StorageError> {
        let dir = self.area_dir(folder);
        make_path(&dir)?;
        Ok(dir)
    }

    /// Escribe `app-config.json` del área (creando el área si hace falta)
    pub fn save_app_config(&self, folder: &str, conf: &[u8]) -> Result<(), StorageError> {
        let dir = self.ensure_area(folder)?;
        save_file(&dir.join(APP_CONFIG_FILE), conf)
    }

    /// Guarda metadatos y/o una revisión de un board
    ///
    /// El directorio del board se crea siempre, aun sin nada que escribir.
    pub fn save_board(
        &self,
        folder: &str,
        board_id: &str,
        meta: Option<&[u8]>,
        revision: Option<Revision<'_>>,
    ) -> Result<(), StorageError> {
        let dir = self.board_dir(folder, board_id);
        make_path(&dir)?;

        if let Some(meta) = meta {
            save_file(&dir.join(META_FILE), meta)?;
        }

        if let Some(rev) = revision {
            save_file(&dir.join(revision_file_name(rev.number)), rev.data)?;
        }

        Ok(())
    }

    /// Mueve el directorio de un board a `$DeletedBoards/<id>`
    ///
    /// Retorna la ruta de destino.
    pub fn archive_board(&self, folder: &str, board_id: &str) -> Result<PathBuf, StorageError> {
        let source = self.board_dir(folder, board_id);
        if !source.is_dir() {
            return Err(StorageError::MissingBoard(source));
        }

        let archive = self.area_dir(folder).join(DELETED_BOARDS_DIR);
        make_path(&archive)?;

        let target = archive.join(board_id);
        if target.exists() {
            return Err(StorageError::ArchiveExists(target));
        }

        move_file(&source, &target)?;
        Ok(target)
    }
}

fn make_path(path: &Path) -> Result<(), StorageError> {
    fs::create_dir_all(path).map_err(|source| StorageError::MakePath {
        path: path.to_path_buf(),
        source,
    })
}

fn save_file(path: &Path, data: &[u8]) -> Result<(), StorageError> {
    debug!("Writing {} bytes to {}", data.len(), path.display());
    fs::write(path, data).map_err(|source| StorageError::SaveFile {
        path: path.to_path_buf(),
        source,
    })
}

fn move_file(from: &Path, to: &Path) -> Result<(), StorageError> {
    debug!("Moving {} to {}", from.display(), to.display());
    fs::rename(from, to).map_err(|source| StorageError::MoveFile {
        from: from.to_path_buf(),
        to: to.to_path_buf(),
        source,
    })
}
