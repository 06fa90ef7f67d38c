// SPDX-FileCopyrightText: 2025 Alexandre Gomes Gaigalas <alganet@gmail.com>
//
// SPDX-License-Identifier: ISC

//! Request metadata and the contract that turns a method call into a
//! backend-neutral [`Request`].
//!
//! Client declarations describe their routes with `const` [`Mapping`] and
//! [`Role`] values, gathered per method into a static [`MethodSpec`]. At call
//! time [`Contract::parse`] assigns every argument to the first resolver in
//! [`resolvers::RESOLVERS`] that supports its parameter, then assembles the
//! URL, headers and body.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};

use hyper::header::{HeaderName, HeaderValue, ACCEPT, CONTENT_TYPE};
use hyper::{HeaderMap, Method};

use crate::body::{Body, MultipartBody, Part};
use crate::convert::Arg;
use crate::error::{Error, Result};
use crate::helpers::uri;
use crate::message::Request;

pub mod resolvers;

pub use resolvers::{ParameterResolver, RESOLVERS};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
    Trace,
}

impl Verb {
    pub fn method(self) -> Method {
        match self {
            Verb::Get => Method::GET,
            Verb::Post => Method::POST,
            Verb::Put => Method::PUT,
            Verb::Patch => Method::PATCH,
            Verb::Delete => Method::DELETE,
            Verb::Head => Method::HEAD,
            Verb::Options => Method::OPTIONS,
            Verb::Trace => Method::TRACE,
        }
    }
}

/// Route metadata attached to a client type or to one of its methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mapping {
    pub verb: Option<Verb>,
    pub path: &'static str,
    pub produces: &'static [&'static str],
    pub consumes: &'static [&'static str],
    pub headers: &'static [(&'static str, &'static str)],
}

impl Mapping {
    pub const NONE: Mapping = Mapping {
        verb: None,
        path: "",
        produces: &[],
        consumes: &[],
        headers: &[],
    };

    pub const fn at(path: &'static str) -> Self {
        Mapping { path, ..Self::NONE }
    }

    pub const fn get(path: &'static str) -> Self {
        Self::at(path).verb(Verb::Get)
    }

    pub const fn post(path: &'static str) -> Self {
        Self::at(path).verb(Verb::Post)
    }

    pub const fn put(path: &'static str) -> Self {
        Self::at(path).verb(Verb::Put)
    }

    pub const fn patch(path: &'static str) -> Self {
        Self::at(path).verb(Verb::Patch)
    }

    pub const fn delete(path: &'static str) -> Self {
        Self::at(path).verb(Verb::Delete)
    }

    pub const fn verb(self, verb: Verb) -> Self {
        Mapping {
            verb: Some(verb),
            ..self
        }
    }

    pub const fn produces(self, produces: &'static [&'static str]) -> Self {
        Mapping { produces, ..self }
    }

    pub const fn consumes(self, consumes: &'static [&'static str]) -> Self {
        Mapping { consumes, ..self }
    }

    pub const fn headers(self, headers: &'static [(&'static str, &'static str)]) -> Self {
        Mapping { headers, ..self }
    }
}

impl Mapping {
    /// The route of a method declaration: the mapping when one is given,
    /// `None` for a method left unmapped.
    #[doc(hidden)]
    pub const fn declared(routes: &[Mapping]) -> Option<Mapping> {
        if routes.len() == 1 {
            Some(routes[0])
        } else {
            None
        }
    }
}

impl Default for Mapping {
    fn default() -> Self {
        Self::NONE
    }
}

/// What a parameter contributes to the request.
///
/// An empty `name` stands for the declared parameter name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Query parameter.
    Param {
        name: &'static str,
        required: bool,
        default: Option<&'static str>,
    },
    Body {
        required: bool,
    },
    /// Multipart form part.
    Part {
        name: &'static str,
    },
    /// `{name}` placeholder in the path.
    Path {
        name: &'static str,
    },
    Header {
        name: &'static str,
    },
    Cookie {
        name: &'static str,
    },
    /// Request attribute, never sent on the wire.
    Attribute {
        name: &'static str,
    },
}

impl Role {
    pub const fn param(name: &'static str) -> Self {
        Role::Param {
            name,
            required: true,
            default: None,
        }
    }

    pub const fn body() -> Self {
        Role::Body { required: true }
    }

    pub const fn part(name: &'static str) -> Self {
        Role::Part { name }
    }

    pub const fn path(name: &'static str) -> Self {
        Role::Path { name }
    }

    pub const fn header(name: &'static str) -> Self {
        Role::Header { name }
    }

    pub const fn cookie(name: &'static str) -> Self {
        Role::Cookie { name }
    }

    pub const fn attribute(name: &'static str) -> Self {
        Role::Attribute { name }
    }

    /// Mark a query parameter or body as not required.
    pub const fn optional(self) -> Self {
        match self {
            Role::Param { name, default, .. } => Role::Param {
                name,
                required: false,
                default,
            },
            Role::Body { .. } => Role::Body { required: false },
            other => other,
        }
    }

    /// Value sent for a query parameter when the argument is null.
    pub const fn default_value(self, value: &'static str) -> Self {
        match self {
            Role::Param { name, required, .. } => Role::Param {
                name,
                required,
                default: Some(value),
            },
            other => other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamSpec {
    pub name: &'static str,
    pub roles: &'static [Role],
}

impl ParamSpec {
    /// The name a role publishes under: its own, or the declared one.
    pub fn effective_name<'a>(&'a self, role_name: &'a str) -> &'a str {
        if role_name.is_empty() {
            self.name
        } else {
            role_name
        }
    }
}

/// Everything known about one declared client method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MethodSpec {
    pub module: &'static str,
    pub client: &'static str,
    pub name: &'static str,
    pub class: Mapping,
    /// Method-level mapping. `None` marks a method with no HTTP mapping; an
    /// empty `Mapping` takes verb and path from `class` alone.
    pub route: Option<Mapping>,
    pub params: &'static [ParamSpec],
}

impl MethodSpec {
    /// Cache identity. The parameter table's address and length are part of
    /// it, so specs that share a name but declare different parameters never
    /// share bindings.
    fn key(&self) -> MethodKey {
        MethodKey {
            module: self.module,
            client: self.client,
            name: self.name,
            params: (self.params.as_ptr() as usize, self.params.len()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct MethodKey {
    module: &'static str,
    client: &'static str,
    name: &'static str,
    params: (usize, usize),
}

/// Parameter-to-resolver assignment for one method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Binding {
    Resolver(usize),
    Unresolved,
}

/// Mutable request under construction, filled in by resolvers.
#[derive(Debug)]
pub struct RequestTemplate {
    pub method: Method,
    pub path: String,
    /// Already percent-encoded path variable values.
    pub path_vars: BTreeMap<String, String>,
    pub query: Vec<(String, String)>,
    pub headers: HeaderMap,
    pub cookies: BTreeMap<String, String>,
    pub attributes: BTreeMap<String, serde_json::Value>,
    pub body: Option<Box<dyn Body>>,
    pub parts: Vec<Part>,
}

impl RequestTemplate {
    fn new(spec: &MethodSpec) -> Result<Self> {
        let route = spec.route.unwrap_or(Mapping::NONE);
        let verb = route.verb.or(spec.class.verb).unwrap_or(Verb::Get);
        let mut headers = HeaderMap::new();

        let produces = if route.produces.is_empty() {
            spec.class.produces
        } else {
            route.produces
        };
        if !produces.is_empty() {
            headers.insert(ACCEPT, header_value(&produces.join(", "))?);
        }

        let consumes = route
            .consumes
            .first()
            .or_else(|| spec.class.consumes.first());
        if let Some(ct) = consumes {
            headers.insert(CONTENT_TYPE, header_value(ct)?);
        }

        for (name, value) in spec.class.headers.iter().chain(route.headers) {
            headers.append(header_name(name)?, header_value(value)?);
        }

        Ok(Self {
            method: verb.method(),
            path: uri::join_path(spec.class.path, route.path),
            path_vars: BTreeMap::new(),
            query: Vec::new(),
            headers,
            cookies: BTreeMap::new(),
            attributes: BTreeMap::new(),
            body: None,
            parts: Vec::new(),
        })
    }

    /// Declared `Content-Type`, if any.
    pub fn content_type(&self) -> Option<&str> {
        crate::helpers::headers::get_header_str(&self.headers, CONTENT_TYPE.as_str())
    }

    fn release(&mut self) {
        let bodies = self
            .body
            .take()
            .into_iter()
            .chain(self.parts.drain(..).map(|p| p.body));
        for body in bodies {
            if let Err(e) = body.close() {
                tracing::warn!(error = %e, "failed to release body of abandoned request");
            }
        }
    }

    fn into_request(mut self, base_url: &str) -> Result<Request> {
        if !self.parts.is_empty() {
            if self.body.is_some() {
                self.release();
                return Err(Error::InvalidRequest(
                    "a request cannot carry both a body and multipart parts".to_string(),
                ));
            }
            let multipart = MultipartBody::new(std::mem::take(&mut self.parts));
            if let Some(ct) = multipart.content_type() {
                let value = header_value(ct)?;
                self.headers.insert(CONTENT_TYPE, value);
            }
            self.body = Some(Box::new(multipart));
        }

        let vars = &self.path_vars;
        let path = uri::expand_template(&self.path, |name| vars.get(name).cloned());
        let url = uri::build_url(base_url, &path, &self.query);

        Ok(Request {
            method: self.method,
            url,
            headers: self.headers,
            cookies: self.cookies,
            attributes: self.attributes,
            body: self.body,
        })
    }
}

pub(crate) fn header_name(name: &str) -> Result<HeaderName> {
    HeaderName::from_bytes(name.as_bytes())
        .map_err(|e| Error::InvalidRequest(format!("invalid header name '{}': {}", name, e)))
}

pub(crate) fn header_value(value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|e| Error::InvalidRequest(format!("invalid header value '{}': {}", value, e)))
}

/// Turns method metadata plus arguments into requests.
pub struct Contract {
    custom: Vec<Arc<dyn ParameterResolver>>,
    bindings: RwLock<HashMap<MethodKey, Arc<[Binding]>>>,
}

impl Default for Contract {
    fn default() -> Self {
        Self::new()
    }
}

impl Contract {
    pub fn new() -> Self {
        Self {
            custom: Vec::new(),
            bindings: RwLock::new(HashMap::new()),
        }
    }

    /// Append a resolver after the built-in ones.
    pub fn with_resolver(mut self, resolver: impl ParameterResolver + 'static) -> Self {
        self.custom.push(Arc::new(resolver));
        if let Ok(mut cache) = self.bindings.write() {
            cache.clear();
        }
        self
    }

    pub fn parse(&self, spec: &MethodSpec, args: Vec<Arg>, base_url: &str) -> Result<Request> {
        if args.len() != spec.params.len() {
            return Err(Error::InvalidRequest(format!(
                "{}::{} expects {} arguments, got {}",
                spec.client,
                spec.name,
                spec.params.len(),
                args.len()
            )));
        }

        let bindings = self.bindings_for(spec);
        let mut template = RequestTemplate::new(spec)?;

        for ((param, arg), binding) in spec.params.iter().zip(args).zip(bindings.iter()) {
            let Binding::Resolver(idx) = *binding else {
                continue;
            };
            let Some(resolver) = self.resolver(idx) else {
                continue;
            };
            if let Err(e) = resolver.resolve(param, arg, &mut template) {
                template.release();
                return Err(e);
            }
        }

        let request = template.into_request(base_url)?;
        tracing::debug!(
            client = spec.client,
            method = spec.name,
            http_method = %request.method,
            url = %request.url,
            "request parsed"
        );
        Ok(request)
    }

    /// Resolver assignment for every parameter of `spec`, computed on first use.
    pub fn bindings_for(&self, spec: &MethodSpec) -> Arc<[Binding]> {
        let key = spec.key();
        match self.bindings.read() {
            Ok(cache) => {
                if let Some(found) = cache.get(&key) {
                    return Arc::clone(found);
                }
            }
            Err(_) => tracing::warn!("Contract binding cache lock poisoned during read"),
        }

        let computed: Arc<[Binding]> = spec
            .params
            .iter()
            .map(|param| self.bind(spec, param))
            .collect();

        match self.bindings.write() {
            Ok(mut cache) => Arc::clone(cache.entry(key).or_insert(computed)),
            Err(_) => {
                tracing::warn!("Contract binding cache lock poisoned during write");
                computed
            }
        }
    }

    fn resolver(&self, idx: usize) -> Option<&dyn ParameterResolver> {
        match RESOLVERS.get(idx) {
            Some(builtin) => Some(*builtin),
            None => self
                .custom
                .get(idx - RESOLVERS.len())
                .map(|r| r.as_ref()),
        }
    }

    fn bind(&self, spec: &MethodSpec, param: &ParamSpec) -> Binding {
        let builtin = RESOLVERS.iter().copied();
        let custom = self.custom.iter().map(|r| r.as_ref());
        match builtin.chain(custom).position(|r| r.supports(param)) {
            Some(idx) => Binding::Resolver(idx),
            None => {
                tracing::debug!(
                    client = spec.client,
                    method = spec.name,
                    param = param.name,
                    "no resolver claims parameter, leaving it unresolved"
                );
                Binding::Unresolved
            }
        }
    }
}
