//! # Vista de Rangos de Bytes
//! src/http/range.rs
//!
//! `ByteRange` es una vista inmutable sobre un buffer de bytes ajeno. Todo el
//! parsing del protocolo trabaja sobre esta vista en lugar de copiar strings:
//! comparación y búsqueda sin distinguir mayúsculas, tokenización, recorte de
//! espacios y lectura acotada de números.
//!
//! Las posiciones devueltas son siempre offsets relativos al inicio de la vista,
//! nunca punteros, y cada sub-vista se construye con chequeo de límites.
//!
//! ## Ejemplo
//!
//! ```
//! use nullboard_agent::http::ByteRange;
//!
//! let line = ByteRange::new(b"Content-Length:  42 ");
//! let (name, value) = line.split_once(b":").unwrap();
//!
//! assert!(name.eq_ignore_case(b"content-length"));
//! assert_eq!(value.trim().parse_usize(), Some(42));
//! ```

/// Caracteres que se consideran espacio en blanco al recortar
pub const WHITESPACE: &[u8] = b"\r\n \t";

/// Vista inmutable sobre un slice de bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ByteRange<'a> {
    bytes: &'a [u8],
}

impl<'a> ByteRange<'a> {
    /// Crea una vista sobre todo el slice
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &'a [u8] {
        self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Vista que empieza `n` bytes más adelante; `None` si `n > len()`
    pub fn skip(&self, n: usize) -> Option<ByteRange<'a>> {
        self.bytes.get(n..).map(ByteRange::new)
    }

    /// Igualdad ASCII sin distinguir mayúsculas
    pub fn eq_ignore_case(&self, other: &[u8]) -> bool {
        self.bytes.eq_ignore_ascii_case(other)
    }

    /// Prefijo ASCII sin distinguir mayúsculas. Un prefijo vacío nunca coincide.
    pub fn starts_with_ignore_case(&self, prefix: &[u8]) -> bool {
        !prefix.is_empty()
            && prefix.len() <= self.bytes.len()
            && self.bytes[..prefix.len()].eq_ignore_ascii_case(prefix)
    }

    /// Busca `needle` a partir de `from`, sin distinguir mayúsculas
    ///
    /// Retorna el offset de la primera coincidencia. Una aguja vacía o un
    /// `from` fuera de rango no encuentran nada.
    ///
    /// # Ejemplo
    /// ```
    /// use nullboard_agent::http::ByteRange;
    ///
    /// let data = ByteRange::new(br#"{"Revision":3}"#);
    /// assert_eq!(data.find(br#""revision":"#, 0), Some(1));
    /// assert_eq!(data.find(b"x", 0), None);
    /// ```
    pub fn find(&self, needle: &[u8], from: usize) -> Option<usize> {
        if needle.is_empty() || from.checked_add(needle.len())? > self.bytes.len() {
            return None;
        }

        (from..=self.bytes.len() - needle.len())
            .find(|&i| self.bytes[i..i + needle.len()].eq_ignore_ascii_case(needle))
    }

    /// Divide en la primera ocurrencia de `sep` (el separador no se incluye)
    pub fn split_once(&self, sep: &[u8]) -> Option<(ByteRange<'a>, ByteRange<'a>)> {
        let at = self.find(sep, 0)?;
        Some((
            ByteRange::new(&self.bytes[..at]),
            ByteRange::new(&self.bytes[at + sep.len()..]),
        ))
    }

    /// Itera los tokens separados por `sep`
    ///
    /// En modo `relaxed` los tokens vacíos se descartan (separadores repetidos
    /// cuentan como uno). En modo estricto se conservan: una entrada vacía
    /// produce un token vacío y un separador final produce un token vacío al final.
    ///
    /// # Ejemplo
    /// ```
    /// use nullboard_agent::http::ByteRange;
    ///
    /// let path = ByteRange::new(b"//board//7/");
    /// let parts: Vec<_> = path.tokenize(b"/", true).map(|t| t.as_bytes()).collect();
    /// assert_eq!(parts, vec![&b"board"[..], &b"7"[..]]);
    /// ```
    pub fn tokenize<'s>(&self, sep: &'s [u8], relaxed: bool) -> Tokens<'a, 's> {
        Tokens {
            rest: Some(*self),
            sep,
            relaxed,
        }
    }

    pub fn trim_start(&self) -> ByteRange<'a> {
        let start = self
            .bytes
            .iter()
            .position(|b| !WHITESPACE.contains(b))
            .unwrap_or(self.bytes.len());
        ByteRange::new(&self.bytes[start..])
    }

    pub fn trim_end(&self) -> ByteRange<'a> {
        let end = self
            .bytes
            .iter()
            .rposition(|b| !WHITESPACE.contains(b))
            .map_or(0, |i| i + 1);
        ByteRange::new(&self.bytes[..end])
    }

    /// Recorta espacio en blanco por ambos extremos
    pub fn trim(&self) -> ByteRange<'a> {
        self.trim_start().trim_end()
    }

    /// `true` si la vista no está vacía y solo contiene dígitos ASCII
    pub fn is_decimal(&self) -> bool {
        !self.bytes.is_empty() && self.bytes.iter().all(u8::is_ascii_digit)
    }

    /// Parsea la vista completa como entero decimal sin signo de 64 bits
    ///
    /// A diferencia de un `scanf`, exige consumir todos los bytes: signos,
    /// espacios, sufijos o desbordamiento hacen fallar el parseo.
    ///
    /// # Ejemplo
    /// ```
    /// use nullboard_agent::http::ByteRange;
    ///
    /// assert_eq!(ByteRange::new(b"123").parse_u64(), Some(123));
    /// assert_eq!(ByteRange::new(b"12a").parse_u64(), None);
    /// assert_eq!(ByteRange::new(b"-1").parse_u64(), None);
    /// assert_eq!(ByteRange::new(b"").parse_u64(), None);
    /// ```
    pub fn parse_u64(&self) -> Option<u64> {
        if !self.is_decimal() {
            return None;
        }

        self.bytes.iter().try_fold(0u64, |acc, &b| {
            acc.checked_mul(10)?.checked_add(u64::from(b - b'0'))
        })
    }

    /// Como [`parse_u64`](Self::parse_u64) pero acotado a `usize`
    pub fn parse_usize(&self) -> Option<usize> {
        self.parse_u64().and_then(|n| usize::try_from(n).ok())
    }

    /// Lee un entero sin signo al inicio de la vista, al estilo `%u`
    ///
    /// Se saltan los espacios iniciales y se leen dígitos hasta el primer
    /// byte que no lo sea. Sin dígitos o con desbordamiento retorna `None`.
    pub fn scan_u32(&self) -> Option<u32> {
        let digits = self.trim_start();
        let count = digits
            .bytes
            .iter()
            .take_while(|b| b.is_ascii_digit())
            .count();

        if count == 0 {
            return None;
        }

        digits.bytes[..count].iter().try_fold(0u32, |acc, &b| {
            acc.checked_mul(10)?.checked_add(u32::from(b - b'0'))
        })
    }

    /// Copia la vista a un `String` (UTF-8 con reemplazo)
    pub fn to_string_lossy(&self) -> String {
        String::from_utf8_lossy(self.bytes).into_owned()
    }
}

impl<'a> From<&'a [u8]> for ByteRange<'a> {
    fn from(bytes: &'a [u8]) -> Self {
        Self::new(bytes)
    }
}

impl<'a> From<&'a str> for ByteRange<'a> {
    fn from(s: &'a str) -> Self {
        Self::new(s.as_bytes())
    }
}

/// Iterador de tokens producido por [`ByteRange::tokenize`]
#[derive(Debug, Clone)]
pub struct Tokens<'a, 's> {
    rest: Option<ByteRange<'a>>,
    sep: &'s [u8],
    relaxed: bool,
}

impl<'a> Iterator for Tokens<'a, '_> {
    type Item = ByteRange<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let rest = self.rest?;

            if rest.is_empty() && self.relaxed {
                self.rest = None;
                return None;
            }

            match rest.find(self.sep, 0) {
                None => {
                    self.rest = None;
                    return Some(rest);
                }
                Some(at) => {
                    let token = ByteRange::new(&rest.bytes[..at]);
                    self.rest = Some(ByteRange::new(&rest.bytes[at + self.sep.len()..]));

                    if !token.is_empty() || !self.relaxed {
                        return Some(token);
                    }
                }
            }
        }
    }
}
