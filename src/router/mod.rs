//! # Sistema de Routing
//! src/router/mod.rs
//!
//! Este módulo mapea (verbo, path) a los handlers de almacenamiento.
//!
//! ## Arquitectura
//!
//! ```text
//! Request autenticado → Router → Handler → Response
//! ```
//!
//! Los patrones son segmentos separados por `/`: literales (comparados sin
//! distinguir mayúsculas) o parámetros `{nombre}`. El path del request se
//! divide en `/` descartando los segmentos vacíos, así que `//board///7` y
//! `/board/7` son la misma ruta. Si ninguna ruta coincide se responde
//! `400 Invalid request`.

pub mod handlers;

use crate::areas::{Area, AreaRegistry};
use crate::http::{FormBody, Method, Response};
use crate::storage::BoardStore;
use tracing::debug;

/// Todo lo que un handler puede tocar mientras atiende un request
pub struct ApiContext<'r> {
    /// Token con el que se autenticó el request
    pub token: &'r str,

    /// Área resuelta a partir del token
    pub area: &'r Area,

    pub store: &'r BoardStore,

    pub registry: &'r mut dyn AreaRegistry,
}

/// Tipo de función handler
///
/// Un handler recibe el contexto, los parámetros del path y el body, y
/// retorna una Response
pub type Handler = fn(&mut ApiContext<'_>, &Params<'_>, &FormBody<'_>) -> Response;

/// Parámetros capturados por los segmentos `{nombre}` de un patrón
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Params<'p> {
    values: Vec<(&'p str, &'p str)>,
}

impl<'p> Params<'p> {
    pub fn get(&self, name: &str) -> Option<&'p str> {
        self.values
            .iter()
            .find(|(k, _)| *k == name)
            .map(|(_, v)| *v)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
}

struct Route {
    method: Method,
    pattern: Vec<Segment>,
    handler: Handler,
}

impl Route {
    /// Parámetros capturados si `segments` coincide con el patrón
    fn matches<'p>(&'p self, method: Method, segments: &[&'p str]) -> Option<Params<'p>> {
        if self.method != method || self.pattern.len() != segments.len() {
            return None;
        }

        let mut params = Params::default();
        for (seg, value) in self.pattern.iter().zip(segments) {
            match seg {
                Segment::Literal(lit) if lit.eq_ignore_ascii_case(value) => {}
                Segment::Literal(_) => return None,
                Segment::Param(name) => params.values.push((name.as_str(), *value)),
            }
        }

        Some(params)
    }
}

/// Divide un path en segmentos, descartando los vacíos
///
/// # Ejemplo
/// ```
/// use nullboard_agent::router::path_segments;
///
/// assert_eq!(path_segments("/board/7"), vec!["board", "7"]);
/// assert_eq!(path_segments("//board//7/"), vec!["board", "7"]);
/// assert!(path_segments("/").is_empty());
/// ```
pub fn path_segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

/// Router que mapea (verbo, patrón) a handlers
pub struct Router {
    routes: Vec<Route>,
}

impl Router {
    /// Crea un nuevo router vacío
    pub fn new() -> Self {
        Self { routes: Vec::new() }
    }

    /// Router con las rutas del agente
    pub fn api() -> Self {
        let mut router = Self::new();
        router.register(Method::Put, "/config", handlers::put_config);
        router.register(Method::Put, "/board/{id}", handlers::put_board);
        router.register(Method::Delete, "/board/{id}", handlers::delete_board);
        router
    }

    /// Registra una ruta con su handler
    ///
    /// # Ejemplo
    /// ```
    /// use nullboard_agent::http::{FormBody, Method, Response};
    /// use nullboard_agent::router::{ApiContext, Params, Router};
    ///
    /// fn hello(_: &mut ApiContext<'_>, _: &Params<'_>, _: &FormBody<'_>) -> Response {
    ///     Response::ok()
    /// }
    ///
    /// let mut router = Router::new();
    /// router.register(Method::Put, "/hello/{name}", hello);
    /// assert_eq!(router.len(), 1);
    /// ```
    pub fn register(&mut self, method: Method, pattern: &str, handler: Handler) {
        let pattern = path_segments(pattern)
            .into_iter()
            .map(|seg| match seg.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
                Some(name) => Segment::Param(name.to_string()),
                None => Segment::Literal(seg.to_string()),
            })
            .collect();

        self.routes.push(Route {
            method,
            pattern,
            handler,
        });
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Encuentra y ejecuta el handler apropiado
    ///
    /// Si no encuentra un handler retorna `400 Invalid request`.
    pub fn route(
        &self,
        method: Method,
        segments: &[&str],
        ctx: &mut ApiContext<'_>,
        form: &FormBody<'_>,
    ) -> Response {
        for route in &self.routes {
            if let Some(params) = route.matches(method, segments) {
                return (route.handler)(ctx, &params, form);
            }
        }

        debug!("No route for {} /{}", method.as_str(), segments.join("/"));
        Response::bad_request("Invalid request")
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}
