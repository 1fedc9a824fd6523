//! # Construcción de Respuestas HTTP
//!
//! Este módulo arma las respuestas que el agente envía antes de cerrar la
//! conexión. Todas llevan `Access-Control-Allow-Origin: *` y
//! `Cache-Control: no-cache`, porque el cliente es una página web abierta desde
//! cualquier origen y nunca debe cachear una respuesta del agente.
//!
//! ## Formato
//!
//! ```text
//! HTTP/1.1 400 Bad request\r\n
//! Access-Control-Allow-Origin: *\r\n
//! Cache-Control: no-cache\r\n
//! Content-Type: text/plain\r\n
//! Content-Length: 16\r\n
//! \r\n
//! Invalid board ID
//! ```
//!
//! ## Ejemplo de uso
//!
//! ```
//! use nullboard_agent::http::{Response, StatusCode};
//!
//! let response = Response::error(StatusCode::BadRequest, "Invalid board ID");
//! let bytes = response.to_bytes();
//! assert!(bytes.starts_with(b"HTTP/1.1 400 Bad request\r\n"));
//! ```

use super::StatusCode;

/// Métodos anunciados en el preflight
const ALLOWED_METHODS: &str = "OPTIONS, GET, PUT, DELETE";

/// Representa una respuesta HTTP/1.1 completa
#[derive(Debug, Clone)]
pub struct Response {
    status: StatusCode,

    /// Headers en orden de inserción
    headers: Vec<(String, String)>,

    body: Vec<u8>,
}

impl Response {
    /// Crea una respuesta con los headers comunes (CORS + no-cache) y sin body
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: vec![
                ("Access-Control-Allow-Origin".to_string(), "*".to_string()),
                ("Cache-Control".to_string(), "no-cache".to_string()),
            ],
            body: Vec::new(),
        }
    }

    /// Agrega un header; si ya existe (sin distinguir mayúsculas) se sobrescribe
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.add_header(name, value);
        self
    }

    /// Versión mutable de [`with_header`](Self::with_header)
    pub fn add_header(&mut self, name: &str, value: &str) {
        match self
            .headers
            .iter_mut()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
        {
            Some((_, v)) => *v = value.to_string(),
            None => self.headers.push((name.to_string(), value.to_string())),
        }
    }

    /// Establece un body de texto plano y su `Content-Length`
    pub fn with_body(mut self, body: &str) -> Self {
        self.body = body.as_bytes().to_vec();
        self.add_header("Content-Type", "text/plain");
        self.add_header("Content-Length", &self.body.len().to_string());
        self
    }

    /// Respuesta al preflight CORS: acepta cualquier header y los cuatro verbos
    ///
    /// # Ejemplo
    /// ```
    /// use nullboard_agent::http::{Response, StatusCode};
    ///
    /// let response = Response::cors_preflight();
    /// assert_eq!(response.status(), StatusCode::NoContent);
    /// assert!(response.body().is_empty());
    /// ```
    pub fn cors_preflight() -> Self {
        Self::new(StatusCode::NoContent)
            .with_header("Allow", ALLOWED_METHODS)
            .with_header("Access-Control-Allow-Headers", "*")
            .with_header("Access-Control-Allow-Methods", ALLOWED_METHODS)
    }

    /// Mutación aplicada: `204 OK` sin body
    pub fn ok() -> Self {
        Self::new(StatusCode::Ok)
    }

    /// Respuesta de error con un diagnóstico corto en texto plano
    pub fn error(status: StatusCode, message: &str) -> Self {
        Self::new(status).with_body(message)
    }

    /// `400 Bad request` con diagnóstico
    pub fn bad_request(message: &str) -> Self {
        Self::error(StatusCode::BadRequest, message)
    }

    /// `500 Internal error` con diagnóstico
    pub fn internal_error(message: &str) -> Self {
        Self::error(StatusCode::InternalError, message)
    }

    /// Convierte la respuesta a bytes listos para enviar por el socket
    ///
    /// El bloque de headers siempre termina con una línea vacía, haya body o no.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut result = Vec::with_capacity(128 + self.body.len());

        result.extend_from_slice(format!("HTTP/1.1 {}\r\n", self.status).as_bytes());

        for (name, value) in &self.headers {
            result.extend_from_slice(format!("{}: {}\r\n", name, value).as_bytes());
        }

        result.extend_from_slice(b"\r\n");
        result.extend_from_slice(&self.body);

        result
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Busca un header sin distinguir mayúsculas
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_common_headers_always_present() {
        for response in [
            Response::ok(),
            Response::cors_preflight(),
            Response::bad_request("x"),
            Response::error(StatusCode::UnsupportedMethod, "y"),
        ] {
            assert_eq!(response.header("Access-Control-Allow-Origin"), Some("*"));
            assert_eq!(response.header("cache-control"), Some("no-cache"));
        }
    }

    #[test]
    fn test_ok_is_bodyless() {
        let text = String::from_utf8(Response::ok().to_bytes()).unwrap();

        assert!(text.starts_with("HTTP/1.1 204 OK\r\n"));
        assert!(text.ends_with("\r\n\r\n"));
        assert!(!text.contains("Content-Length"));
    }

    #[test]
    fn test_cors_preflight_headers() {
        let response = Response::cors_preflight();
        let text = String::from_utf8(response.to_bytes()).unwrap();

        assert!(text.starts_with("HTTP/1.1 204 No Content\r\n"));
        assert!(text.contains("Access-Control-Allow-Headers: *\r\n"));
        assert!(text.contains("Access-Control-Allow-Methods: OPTIONS, GET, PUT, DELETE\r\n"));
        assert!(text.contains("Allow: OPTIONS, GET, PUT, DELETE\r\n"));
    }

    #[test]
    fn test_error_response() {
        let response = Response::error(StatusCode::AccessDenied, "Invalid access token");
        let text = String::from_utf8(response.to_bytes()).unwrap();

        assert!(text.starts_with("HTTP/1.1 403 Access denied\r\n"));
        assert!(text.contains("Content-Type: text/plain\r\n"));
        assert!(text.contains("Content-Length: 20\r\n"));
        assert!(text.ends_with("\r\n\r\nInvalid access token"));
    }

    #[test]
    fn test_headers_keep_insertion_order() {
        let response = Response::ok().with_header("X-One", "1").with_header("X-Two", "2");
        let names: Vec<&str> = response.headers().iter().map(|(n, _)| n.as_str()).collect();

        assert_eq!(
            names,
            vec!["Access-Control-Allow-Origin", "Cache-Control", "X-One", "X-Two"]
        );
    }

    #[test]
    fn test_add_header_overwrites() {
        let mut response = Response::ok();
        response.add_header("cache-control", "max-age=0");

        assert_eq!(response.header("Cache-Control"), Some("max-age=0"));
        assert_eq!(response.headers().len(), 2);
    }
}
