//! # Parsing de Requests HTTP/1.1 (subconjunto)
//! src/http/request.rs
//!
//! Parser deliberadamente restringido: solo lo que el cliente de Nullboard
//! envía. Se analiza el bloque de headers acumulado en el buffer de la conexión
//! y se reporta si todavía falta data, si el request está listo o si está mal formado.
//!
//! ## Formato aceptado
//!
//! ```text
//! PUT /board/7?x=1 HTTP/1.1\r\n
//! X-Access-Token: A123-B456-C789-D012\r\n
//! Content-Length: 42\r\n
//! \r\n
//! data=...&meta=...&self=...
//! ```
//!
//! ## Restricciones
//!
//! 1. Las líneas se separan exactamente por `\r\n` (un `\n` suelto no corta línea)
//! 2. No hay folding: un header que empieza con espacio o tab invalida el request
//! 3. La request line tiene exactamente tres tokens
//! 4. Debe haber al menos un header
//!
//! El body no se interpreta aquí; solo se informa dónde empieza.

use super::range::ByteRange;
use thiserror::Error;

/// Terminador del bloque de headers
const HEADER_TERMINATOR: &[u8] = b"\r\n\r\n";

/// Verbos que el engine distingue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// OPTIONS - Preflight CORS
    Options,

    /// PUT - Guardar configuración o tablero
    Put,

    /// DELETE - Archivar tablero
    Delete,

    /// Cualquier otro verbo (se responde 405)
    Other,
}

impl Method {
    /// Clasifica un verbo sin distinguir mayúsculas
    ///
    /// # Ejemplo
    /// ```
    /// use nullboard_agent::http::Method;
    ///
    /// assert_eq!(Method::from_verb("put"), Method::Put);
    /// assert_eq!(Method::from_verb("GET"), Method::Other);
    /// ```
    pub fn from_verb(verb: &str) -> Self {
        if verb.eq_ignore_ascii_case("OPTIONS") {
            Method::Options
        } else if verb.eq_ignore_ascii_case("PUT") {
            Method::Put
        } else if verb.eq_ignore_ascii_case("DELETE") {
            Method::Delete
        } else {
            Method::Other
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Options => "OPTIONS",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
            Method::Other => "OTHER",
        }
    }
}

/// Header HTTP (nombre y valor ya recortados)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub name: String,
    pub value: String,
}

/// Representa un request parseado
#[derive(Debug, Clone)]
pub struct Request {
    /// Verbo tal como llegó (ej: "PUT")
    verb: String,

    /// Request-target completo (ej: "/board/7?x=1")
    target: String,

    /// Versión del protocolo (no se valida)
    version: String,

    /// Parte de path del target
    path: String,

    /// Pares de la query en orden, con duplicados
    query: Vec<(String, String)>,

    /// Fragmento (solo si viene dentro de la query)
    fragment: String,

    headers: Vec<Header>,
}

/// Resultado de intentar parsear el buffer acumulado
#[derive(Debug, Clone)]
pub enum ParseStatus {
    /// Aún no llega el terminador `\r\n\r\n`
    NotYet,

    /// Headers completos; el body empieza en `body_offset`
    Parsed { request: Request, body_offset: usize },
}

/// Errores que pueden ocurrir durante el parsing
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// Request incompleto o truncado
    #[error("Incomplete HTTP request")]
    Incomplete,

    /// Header que continúa el anterior (folding)
    #[error("Multi-line header")]
    FoldedHeader,

    /// Header sin ':'
    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    /// El bloque no trae ningún header
    #[error("Header count < 1")]
    NoHeaders,

    /// La request line no tiene exactamente tres tokens
    #[error("Invalid request line")]
    InvalidRequestLine,
}

/// Intenta parsear un request desde el inicio de `buffer`
///
/// # Retorna
///
/// * `Ok(ParseStatus::NotYet)` - Falta data, hay que seguir leyendo
/// * `Ok(ParseStatus::Parsed { .. })` - Headers listos
/// * `Err(ParseError)` - El bloque de headers está mal formado
///
/// # Ejemplo
///
/// ```
/// use nullboard_agent::http::request::{try_parse, ParseStatus};
///
/// assert!(matches!(try_parse(b"PUT /config HTTP/1.1\r\nHost: x\r\n"), Ok(ParseStatus::NotYet)));
///
/// match try_parse(b"PUT /config HTTP/1.1\r\nHost: x\r\n\r\nconf=1").unwrap() {
///     ParseStatus::Parsed { request, body_offset } => {
///         assert_eq!(request.path(), "/config");
///         assert_eq!(body_offset, 33);
///     }
///     ParseStatus::NotYet => unreachable!(),
/// }
/// ```
pub fn try_parse(buffer: &[u8]) -> Result<ParseStatus, ParseError> {
    try_parse_from(buffer, 0)
}

/// Como [`try_parse`], pero sabiendo que los primeros `scanned` bytes ya se
/// revisaron sin encontrar el fin de headers
///
/// La búsqueda retoma unos bytes antes de `scanned` para no perder un
/// terminador partido entre dos lecturas.
pub fn try_parse_from(buffer: &[u8], scanned: usize) -> Result<ParseStatus, ParseError> {
    let from = scanned.saturating_sub(HEADER_TERMINATOR.len() - 1);
    let eoh = match ByteRange::new(buffer).find(HEADER_TERMINATOR, from) {
        Some(eoh) => eoh,
        None => return Ok(ParseStatus::NotYet),
    };

    let block = ByteRange::new(&buffer[..eoh]).trim_end();
    let mut lines = block.tokenize(b"\r\n", false);

    // En modo estricto siempre hay al menos un token
    let request_line = lines.next().unwrap_or_default();
    let headers = parse_headers(lines)?;

    if headers.is_empty() {
        return Err(ParseError::NoHeaders);
    }

    let parts: Vec<ByteRange> = request_line.tokenize(b" ", true).collect();
    let [verb, target, version] = parts[..] else {
        return Err(ParseError::InvalidRequestLine);
    };

    let (path, query, fragment) = split_target(target);

    let request = Request {
        verb: verb.to_string_lossy(),
        target: target.to_string_lossy(),
        version: version.to_string_lossy(),
        path: path.to_string_lossy(),
        query: parse_query(query),
        fragment: fragment.to_string_lossy(),
        headers,
    };

    Ok(ParseStatus::Parsed {
        request,
        body_offset: eoh + HEADER_TERMINATOR.len(),
    })
}

/// Parsea las líneas de header (todas menos la request line)
fn parse_headers<'a>(lines: impl Iterator<Item = ByteRange<'a>>) -> Result<Vec<Header>, ParseError> {
    let mut headers = Vec::new();

    for line in lines {
        // "Header field values can be folded onto multiple lines if the
        //  continuation line begins with a space or horizontal tab."
        // No lo soportamos.
        if matches!(line.as_bytes().first(), Some(b' ' | b'\t')) {
            return Err(ParseError::FoldedHeader);
        }

        let (name, value) = line
            .split_once(b":")
            .ok_or_else(|| ParseError::InvalidHeader(line.to_string_lossy()))?;

        headers.push(Header {
            name: name.trim().to_string_lossy(),
            value: value.trim().to_string_lossy(),
        });
    }

    Ok(headers)
}

/// Divide el target en path, query y fragmento
///
/// El fragmento solo se busca dentro de la query: `/a#b` es un path entero.
fn split_target(target: ByteRange<'_>) -> (ByteRange<'_>, ByteRange<'_>, ByteRange<'_>) {
    let Some((path, rest)) = target.split_once(b"?") else {
        return (target, ByteRange::default(), ByteRange::default());
    };

    match rest.split_once(b"#") {
        Some((query, fragment)) => (path, query, fragment),
        None => (path, rest, ByteRange::default()),
    }
}

/// Parsea la query en pares ordenados
///
/// Ejemplo: "a=1&b&a=2" → [("a", "1"), ("b", ""), ("a", "2")]
fn parse_query(query: ByteRange<'_>) -> Vec<(String, String)> {
    query
        .tokenize(b"&", true)
        .map(|pair| match pair.split_once(b"=") {
            Some((k, v)) => (k.to_string_lossy(), v.to_string_lossy()),
            None => (pair.to_string_lossy(), String::new()),
        })
        .collect()
}

impl Request {
    /// Parsea un request que ya está completo en `buffer`
    ///
    /// # Ejemplo
    ///
    /// ```
    /// use nullboard_agent::http::Request;
    ///
    /// let raw = b"DELETE /board/7?x=1 HTTP/1.1\r\nX-Access-Token: t\r\n\r\n";
    /// let request = Request::parse(raw).unwrap();
    ///
    /// assert_eq!(request.path(), "/board/7");
    /// assert_eq!(request.query_param("x"), Some("1"));
    /// assert_eq!(request.header("x-access-token"), Some("t"));
    /// ```
    pub fn parse(buffer: &[u8]) -> Result<Self, ParseError> {
        match try_parse(buffer)? {
            ParseStatus::Parsed { request, .. } => Ok(request),
            ParseStatus::NotYet => Err(ParseError::Incomplete),
        }
    }

    pub fn method(&self) -> Method {
        Method::from_verb(&self.verb)
    }

    pub fn verb(&self) -> &str {
        &self.verb
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn fragment(&self) -> &str {
        &self.fragment
    }

    /// Todos los pares de la query, en orden de llegada
    pub fn query_params(&self) -> &[(String, String)] {
        &self.query
    }

    /// Valor de un parámetro de la query; si se repite gana la última ocurrencia
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .rev()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn headers(&self) -> &[Header] {
        &self.headers
    }

    /// Valor de un header sin distinguir mayúsculas; si se repite gana el último
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .rev()
            .find(|h| h.name.eq_ignore_ascii_case(name))
            .map(|h| h.value.as_str())
    }
}

/// Decodifica secuencias `%XX`
///
/// Cada escape bien formado consume exactamente tres bytes de entrada y produce
/// uno. Un `%` que no va seguido de dos dígitos hex se copia tal cual. `+` no
/// se traduce a espacio.
///
/// # Ejemplo
/// ```
/// use nullboard_agent::http::percent_decode;
///
/// assert_eq!(percent_decode(b"%7B%22a%22%3A1%7D"), b"{\"a\":1}");
/// assert_eq!(percent_decode(b"50%x"), b"50%x");
/// ```
pub fn percent_decode(input: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(input.len());
    let mut i = 0;

    while i < input.len() {
        if input[i] == b'%' && i + 3 <= input.len() {
            if let (Some(hi), Some(lo)) = (from_hex(input[i + 1]), from_hex(input[i + 2])) {
                out.push((hi << 4) | lo);
                i += 3;
                continue;
            }
        }

        out.push(input[i]);
        i += 1;
    }

    out
}

fn from_hex(ch: u8) -> Option<u8> {
    match ch {
        b'0'..=b'9' => Some(ch - b'0'),
        b'A'..=b'F' => Some(ch - b'A' + 10),
        b'a'..=b'f' => Some(ch - b'a' + 10),
        _ => None,
    }
}
