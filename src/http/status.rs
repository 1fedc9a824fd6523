//! # Códigos de Estado HTTP
//!
//! El agente responde con un conjunto fijo de status lines. Los textos no son
//! los del RFC: el cliente web de Nullboard solo mira el código, así que se
//! conservan los literales históricos del agente (`204 OK`, `400 Bad request`...).
//!
//! Hay dos variantes con código 204: la del preflight CORS (`No Content`) y la
//! de una mutación exitosa (`OK`).

/// Status lines que puede emitir el agente
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    /// 204 No Content - Respuesta al preflight `OPTIONS`
    NoContent,

    /// 204 OK - Mutación aplicada
    Ok,

    /// 400 Bad request - Petición inválida o no enrutable
    BadRequest,

    /// 403 Access denied - Token de acceso desconocido
    AccessDenied,

    /// 405 Unsupported Method - Verbo distinto de OPTIONS/PUT/DELETE
    UnsupportedMethod,

    /// 500 Internal error - Fallo de filesystem
    InternalError,
}

impl StatusCode {
    /// Convierte el código a su valor numérico
    ///
    /// # Ejemplo
    /// ```
    /// use nullboard_agent::http::StatusCode;
    /// assert_eq!(StatusCode::Ok.as_u16(), 204);
    /// assert_eq!(StatusCode::AccessDenied.as_u16(), 403);
    /// ```
    pub fn as_u16(&self) -> u16 {
        match self {
            StatusCode::NoContent | StatusCode::Ok => 204,
            StatusCode::BadRequest => 400,
            StatusCode::AccessDenied => 403,
            StatusCode::UnsupportedMethod => 405,
            StatusCode::InternalError => 500,
        }
    }

    /// Texto de razón que acompaña al código en la status line
    pub fn reason_phrase(&self) -> &'static str {
        match self {
            StatusCode::NoContent => "No Content",
            StatusCode::Ok => "OK",
            StatusCode::BadRequest => "Bad request",
            StatusCode::AccessDenied => "Access denied",
            StatusCode::UnsupportedMethod => "Unsupported Method",
            StatusCode::InternalError => "Internal error",
        }
    }

    /// Verifica si el código indica éxito (2xx)
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.as_u16())
    }

    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.as_u16())
    }

    pub fn is_server_error(&self) -> bool {
        (500..600).contains(&self.as_u16())
    }
}

impl std::fmt::Display for StatusCode {
    /// Formato: "204 OK"
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.as_u16(), self.reason_phrase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_code_values() {
        assert_eq!(StatusCode::NoContent.as_u16(), 204);
        assert_eq!(StatusCode::Ok.as_u16(), 204);
        assert_eq!(StatusCode::BadRequest.as_u16(), 400);
        assert_eq!(StatusCode::UnsupportedMethod.as_u16(), 405);
        assert_eq!(StatusCode::InternalError.as_u16(), 500);
    }

    #[test]
    fn test_display_uses_literal_lines() {
        assert_eq!(StatusCode::NoContent.to_string(), "204 No Content");
        assert_eq!(StatusCode::Ok.to_string(), "204 OK");
        assert_eq!(StatusCode::BadRequest.to_string(), "400 Bad request");
        assert_eq!(StatusCode::AccessDenied.to_string(), "403 Access denied");
        assert_eq!(StatusCode::UnsupportedMethod.to_string(), "405 Unsupported Method");
        assert_eq!(StatusCode::InternalError.to_string(), "500 Internal error");
    }

    #[test]
    fn test_classes() {
        assert!(StatusCode::Ok.is_success());
        assert!(StatusCode::NoContent.is_success());
        assert!(StatusCode::AccessDenied.is_client_error());
        assert!(!StatusCode::InternalError.is_client_error());
        assert!(StatusCode::InternalError.is_server_error());
    }
}
