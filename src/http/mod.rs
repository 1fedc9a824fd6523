//! # Módulo HTTP
//!
//! Este módulo implementa, sin frameworks, el subconjunto de HTTP/1.1 que
//! habla el cliente web de Nullboard:
//!
//! - Vista de rangos de bytes para parsear sin copiar
//! - Parsing de request line y headers
//! - Body `clave=valor` con percent-decoding
//! - Status lines literales y construcción de responses
//!
//! ## Lo que NO soporta
//!
//! - Conexiones persistentes ni pipelining (un request por conexión)
//! - Folding de headers
//! - Chunked transfer encoding
//! - Verbos distintos de OPTIONS, PUT y DELETE

pub mod form;      // Body application/x-www-form-urlencoded
pub mod range;     // Vista de bytes
pub mod request;   // Parsing de HTTP requests
pub mod response;  // Construcción de HTTP responses
pub mod status;    // Status lines

// Re-exportamos los tipos principales para facilitar su uso
pub use form::FormBody;
pub use range::ByteRange;
pub use request::{percent_decode, try_parse, try_parse_from, Header, Method, ParseError, ParseStatus, Request};
pub use response::Response;
pub use status::StatusCode;
