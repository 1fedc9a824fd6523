//! # Handlers de Almacenamiento
//! src/router/handlers.rs
//!
//! Handlers para las tres rutas del agente:
//!
//! - `PUT /config` - Guarda la configuración de la app del área
//! - `PUT /board/{id}` - Guarda metadatos y/o una revisión de un board
//! - `DELETE /board/{id}` - Archiva un board en `$DeletedBoards`
//!
//! Los campos del body (`conf`, `meta`, `data`, `self`) solo cuentan si no
//! quedan vacíos después de decodificarlos. Toda validación ocurre antes de
//! tocar el disco.

use super::{ApiContext, Params};
use crate::http::{ByteRange, FormBody, Response};
use crate::storage::{Revision, StorageError};
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Marcador que precede al número de revisión dentro de `data`
const REVISION_KEY: &[u8] = b"\"revision\":";

/// Problemas con el campo `data` de un board
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BoardDataError {
    #[error("No revision in board data")]
    MissingRevision,

    #[error("Bad board revision")]
    BadRevision,
}

/// Extrae el número de revisión de un board serializado
///
/// Busca `"revision":` sin distinguir mayúsculas y lee el entero que sigue,
/// saltando espacios.
///
/// # Ejemplo
/// ```
/// use nullboard_agent::router::handlers::{board_revision, BoardDataError};
///
/// assert_eq!(board_revision(br#"{"format":20190412,"revision":3}"#), Ok(3));
/// assert_eq!(board_revision(br#"{"title":"x"}"#), Err(BoardDataError::MissingRevision));
/// assert_eq!(board_revision(br#"{"revision":"3"}"#), Err(BoardDataError::BadRevision));
/// ```
pub fn board_revision(data: &[u8]) -> Result<u32, BoardDataError> {
    let data = ByteRange::new(data);

    let at = data
        .find(REVISION_KEY, 0)
        .ok_or(BoardDataError::MissingRevision)?;

    data.skip(at + REVISION_KEY.len())
        .and_then(|rest| rest.scan_u32())
        .ok_or(BoardDataError::BadRevision)
}

/// `true` si el id es decimal y cabe en 64 bits
pub fn is_valid_board_id(id: &str) -> bool {
    ByteRange::from(id).parse_u64().is_some()
}

/// Convierte una falla de storage en la respuesta correspondiente
fn storage_failure(err: StorageError) -> Response {
    if err.is_missing_board() {
        info!("{}", err);
        Response::bad_request(err.diagnostic())
    } else {
        error!("{}", err);
        Response::internal_error(err.diagnostic())
    }
}

/// Guarda el campo `self` como URL del área, si vino
///
/// Una falla al persistir no hace fallar el request.
fn remember_self(ctx: &mut ApiContext<'_>, form: &FormBody<'_>) {
    let Some(url) = form.non_empty_field(b"self") else {
        return;
    };

    let url = String::from_utf8_lossy(&url);
    if let Err(e) = ctx.registry.remember_url(ctx.token, &url) {
        warn!("Failed to remember client URL: {}", e);
    }
}

/// Handler para PUT /config
pub fn put_config(ctx: &mut ApiContext<'_>, _params: &Params<'_>, form: &FormBody<'_>) -> Response {
    info!("put /config");

    if let Err(e) = ctx.store.ensure_area(&ctx.area.folder) {
        return storage_failure(e);
    }

    if let Some(conf) = form.non_empty_field(b"conf") {
        debug!("Config: {} bytes", conf.len());
        if let Err(e) = ctx.store.save_app_config(&ctx.area.folder, &conf) {
            return storage_failure(e);
        }
    }

    remember_self(ctx, form);
    Response::ok()
}

/// Handler para PUT /board/{id}
pub fn put_board(ctx: &mut ApiContext<'_>, params: &Params<'_>, form: &FormBody<'_>) -> Response {
    let id = params.get("id").unwrap_or_default();
    info!("put /board/{}", id);

    if !is_valid_board_id(id) {
        warn!("Invalid board id {:?}", id);
        return Response::bad_request("Invalid board ID");
    }

    let meta = form.non_empty_field(b"meta");
    let data = form.non_empty_field(b"data");

    let revision = match data.as_deref() {
        None => None,
        Some(data) => match board_revision(data) {
            Ok(number) => Some(Revision { number, data }),
            Err(e) => {
                warn!("Board {}: {}", id, e);
                return Response::bad_request(&e.to_string());
            }
        },
    };

    if let Some(meta) = &meta {
        debug!("Meta: {} bytes", meta.len());
    }
    if let Some(rev) = &revision {
        debug!("Data: revision {}, {} bytes", rev.number, rev.data.len());
    }

    if let Err(e) = ctx
        .store
        .save_board(&ctx.area.folder, id, meta.as_deref(), revision)
    {
        return storage_failure(e);
    }

    remember_self(ctx, form);
    Response::ok()
}

/// Handler para DELETE /board/{id}
pub fn delete_board(ctx: &mut ApiContext<'_>, params: &Params<'_>, _form: &FormBody<'_>) -> Response {
    let id = params.get("id").unwrap_or_default();
    info!("delete /board/{}", id);

    if !is_valid_board_id(id) {
        warn!("Invalid board id {:?}", id);
        return Response::bad_request("Invalid board ID");
    }

    match ctx.store.archive_board(&ctx.area.folder, id) {
        Ok(target) => {
            debug!("Board {} archived to {}", id, target.display());
            Response::ok()
        }
        Err(e) => storage_failure(e),
    }
}
