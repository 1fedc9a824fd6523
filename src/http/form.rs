//! # Body de Formulario
//! src/http/form.rs
//!
//! El cliente envía los PUT como `application/x-www-form-urlencoded`:
//!
//! ```text
//! data=%7B%22format%22%3A...&meta=%7B%22title%22...&self=http%3A%2F%2F...
//! ```
//!
//! Es una forma simplificada, distinta de la query string: se tokeniza en modo
//! estricto sobre `&`, los pares sin `=` se ignoran y solo se decodifica el
//! valor de los campos que un handler pide.

use super::range::ByteRange;
use super::request::percent_decode;

/// Pares `clave=valor` de un body, sin decodificar
#[derive(Debug, Clone, Default)]
pub struct FormBody<'a> {
    pairs: Vec<(ByteRange<'a>, ByteRange<'a>)>,
}

impl<'a> FormBody<'a> {
    /// Tokeniza el body completo
    ///
    /// # Ejemplo
    /// ```
    /// use nullboard_agent::http::FormBody;
    ///
    /// let form = FormBody::parse(b"meta=%7B%7D&junk&self=");
    /// assert_eq!(form.len(), 2);
    /// assert_eq!(form.field(b"meta"), Some(b"{}".to_vec()));
    /// assert_eq!(form.field(b"self"), Some(Vec::new()));
    /// assert_eq!(form.field(b"data"), None);
    /// ```
    pub fn parse(body: &'a [u8]) -> Self {
        let pairs = ByteRange::new(body)
            .tokenize(b"&", false)
            .filter_map(|pair| pair.split_once(b"="))
            .collect();

        Self { pairs }
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Valor crudo de un campo (clave sin distinguir mayúsculas, gana el último)
    pub fn raw_field(&self, name: &[u8]) -> Option<ByteRange<'a>> {
        self.pairs
            .iter()
            .rev()
            .find(|(k, _)| k.eq_ignore_case(name))
            .map(|(_, v)| *v)
    }

    /// Valor de un campo ya decodificado
    pub fn field(&self, name: &[u8]) -> Option<Vec<u8>> {
        self.raw_field(name).map(|v| percent_decode(v.as_bytes()))
    }

    /// Valor decodificado solo si no está vacío
    ///
    /// Los handlers tratan un campo vacío igual que uno ausente.
    pub fn non_empty_field(&self, name: &[u8]) -> Option<Vec<u8>> {
        self.field(name).filter(|v| !v.is_empty())
    }
}
