// SPDX-FileCopyrightText: 2025 Alexandre Gomes Gaigalas <alganet@gmail.com>
//
// SPDX-License-Identifier: ISC

//! Method dispatch for generated clients.
//!
//! [`http_client!`](crate::http_client) implements a user trait by forwarding
//! each declared method, together with its static [`MethodSpec`], to a shared
//! [`Invoker`]. The invoker asks its handlers in order whether they support
//! the method; the standard [`HttpHandler`] parses the call with the
//! [`Contract`], runs interceptors and the executor, and the declared return
//! type picks the extractor.

use std::sync::Arc;
use std::time::Instant;

use hyper::header::{HeaderValue, CONTENT_ENCODING, CONTENT_LENGTH};

use crate::body::{CompressedBody, Encoding};
use crate::capture::CaptureWriter;
use crate::config::Config;
use crate::contract::{Contract, MethodSpec, ParameterResolver};
use crate::convert::Arg;
use crate::error::{Error, Result};
use crate::executor::{Executor, ExecutorKind, ExecutorOptions};
use crate::extract::{Extractor, FromResponse};
use crate::interceptor::{
    CaptureInterceptor, Exchange, Interceptor, LoggingInterceptor, StatusInterceptor,
};
use crate::message::{Request, Response};

pub trait MethodHandler: Send + Sync {
    fn supports(&self, spec: &MethodSpec) -> bool;

    fn handle(&self, spec: &MethodSpec, args: Vec<Arg>) -> Result<Response>;
}

/// Contract, interceptors and executor for every mapped method.
///
/// A method without a route is not mapped and is left to other handlers. An
/// empty route is still mapped and takes everything from the class mapping.
pub struct HttpHandler {
    contract: Contract,
    executor: Arc<dyn Executor>,
    base_url: String,
    interceptors: Vec<Arc<dyn Interceptor>>,
    compression: Option<Encoding>,
}

impl HttpHandler {
    fn compress(&self, request: &mut Request) {
        let Some(encoding) = self.compression else {
            return;
        };
        let Some(body) = request.body.take() else {
            return;
        };
        request.body = Some(Box::new(CompressedBody::new(body, encoding)));
        request
            .headers
            .insert(CONTENT_ENCODING, HeaderValue::from_static(encoding.as_str()));
        request.headers.remove(CONTENT_LENGTH);
    }

    fn prepare(&self, spec: &MethodSpec, args: Vec<Arg>) -> Result<Request> {
        let mut request = self.contract.parse(spec, args, &self.base_url)?;
        self.compress(&mut request);
        let prepared = self
            .interceptors
            .iter()
            .try_for_each(|i| i.before(&mut request));
        if let Err(e) = prepared {
            request.close();
            return Err(e);
        }
        Ok(request)
    }
}

impl MethodHandler for HttpHandler {
    fn supports(&self, spec: &MethodSpec) -> bool {
        spec.route.is_some()
    }

    fn handle(&self, spec: &MethodSpec, args: Vec<Arg>) -> Result<Response> {
        let request = self.prepare(spec, args)?;
        let head = request.head();
        let started = Instant::now();
        let outcome = self.executor.execute(request);
        let exchange = Exchange {
            executor: self.executor.name(),
            request: &head,
            elapsed: started.elapsed(),
        };
        match outcome {
            Ok(response) => self
                .interceptors
                .iter()
                .try_fold(response, |response, i| i.after(&exchange, response)),
            Err(e) => {
                for i in &self.interceptors {
                    i.failed(&exchange, &e);
                }
                Err(e)
            }
        }
    }
}

/// Shared dispatcher behind every generated client. Holds no per-call state.
pub struct Invoker {
    handlers: Vec<Arc<dyn MethodHandler>>,
    fallback: Option<Arc<dyn MethodHandler>>,
}

impl Invoker {
    pub fn builder(base_url: impl Into<String>) -> InvokerBuilder {
        InvokerBuilder::new(base_url)
    }

    /// Run the first supporting handler, then the fallback.
    pub fn dispatch(&self, spec: &MethodSpec, args: Vec<Arg>) -> Result<Response> {
        let handler = self
            .handlers
            .iter()
            .find(|h| h.supports(spec))
            .or(self.fallback.as_ref());
        match handler {
            Some(handler) => handler.handle(spec, args),
            None => Err(Error::NoSuchMethod {
                client: spec.client,
                method: spec.name,
            }),
        }
    }

    pub fn invoke<R: FromResponse>(&self, spec: &MethodSpec, args: Vec<Arg>) -> Result<R> {
        R::from_response(self.dispatch(spec, args)?)
    }

    pub fn invoke_with<R>(
        &self,
        spec: &MethodSpec,
        args: Vec<Arg>,
        extractor: &dyn Extractor<R>,
    ) -> Result<R> {
        let response = self.dispatch(spec, args)?;
        extractor.extract(&response)
    }
}

pub struct InvokerBuilder {
    base_url: String,
    contract: Contract,
    executor: Option<Arc<dyn Executor>>,
    interceptors: Vec<Arc<dyn Interceptor>>,
    compression: Option<Encoding>,
    handlers: Vec<Arc<dyn MethodHandler>>,
    fallback: Option<Arc<dyn MethodHandler>>,
}

impl InvokerBuilder {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            contract: Contract::new(),
            executor: None,
            interceptors: Vec::new(),
            compression: None,
            handlers: Vec::new(),
            fallback: None,
        }
    }

    /// Wire executor, compression and interceptors from configuration.
    ///
    /// Logging and capture interceptors run before status translation so
    /// they observe every response.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        config.validate()?;
        let client = &config.client;
        let executor = client.executor.build(client.executor_options())?;
        let mut builder = Self::new(client.base_url.clone()).executor(executor);
        if let Some(encoding) = client.compression {
            builder = builder.compression(encoding);
        }
        if config.logging.enabled {
            builder = builder.interceptor(LoggingInterceptor::new(config.logging.body_preview));
        }
        if let Some(path) = &config.capture.path {
            builder = builder.interceptor(CaptureInterceptor::new(CaptureWriter::new(path)?));
        }
        if client.translate_status {
            builder = builder.interceptor(StatusInterceptor);
        }
        Ok(builder)
    }

    pub fn executor(mut self, executor: Arc<dyn Executor>) -> Self {
        self.executor = Some(executor);
        self
    }

    pub fn interceptor(mut self, interceptor: impl Interceptor + 'static) -> Self {
        self.interceptors.push(Arc::new(interceptor));
        self
    }

    pub fn compression(mut self, encoding: Encoding) -> Self {
        self.compression = Some(encoding);
        self
    }

    /// Append a parameter resolver after the built-in ones.
    pub fn resolver(mut self, resolver: impl ParameterResolver + 'static) -> Self {
        self.contract = self.contract.with_resolver(resolver);
        self
    }

    /// Register a handler consulted before the HTTP handler.
    pub fn handler(mut self, handler: impl MethodHandler + 'static) -> Self {
        self.handlers.push(Arc::new(handler));
        self
    }

    /// Handler for methods nobody else supports.
    pub fn fallback(mut self, handler: impl MethodHandler + 'static) -> Self {
        self.fallback = Some(Arc::new(handler));
        self
    }

    /// Build the invoker. Without an explicit executor a default
    /// [`crate::executor::HyperExecutor`] is created.
    pub fn build(self) -> Result<Invoker> {
        let executor = match self.executor {
            Some(executor) => executor,
            None => ExecutorKind::default().build(ExecutorOptions::default())?,
        };
        let http = HttpHandler {
            contract: self.contract,
            executor,
            base_url: self.base_url,
            interceptors: self.interceptors,
            compression: self.compression,
        };
        let mut handlers = self.handlers;
        handlers.push(Arc::new(http));
        Ok(Invoker {
            handlers,
            fallback: self.fallback,
        })
    }
}

/// Implement a client trait by forwarding each listed method to an
/// [`Invoker`].
///
/// ```ignore
/// http_client! {
///     pub struct UsersClient: Users {
///         mapping: Mapping::at("/users").produces(&["application/json"]);
///         fn get(&self, id: u64 => [Role::path("")]) -> Result<Json<User>> =
///             Mapping::get("/{id}");
///         fn search(&self, q: &str => [Role::param("")]) -> Result<String> = Mapping::get("/");
///     }
/// }
/// ```
///
/// A method listed without `= mapping` is unmapped and only reaches custom or
/// fallback handlers. Trait methods not listed keep their default bodies.
#[macro_export]
macro_rules! http_client {
    (
        $(#[$meta:meta])*
        $vis:vis struct $client:ident : $api:path {
            mapping: $class:expr;
            $(
                fn $method:ident(
                    &self $(, $arg:ident : $ty:ty => [$($role:expr),* $(,)?])*
                ) -> $ret:ty $(= $route:expr)?;
            )*
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone)]
        $vis struct $client {
            invoker: ::std::sync::Arc<$crate::invoker::Invoker>,
        }

        impl $client {
            pub fn new(invoker: ::std::sync::Arc<$crate::invoker::Invoker>) -> Self {
                Self { invoker }
            }

            pub fn invoker(&self) -> &$crate::invoker::Invoker {
                &self.invoker
            }
        }

        impl $api for $client {
            $(
                fn $method(&self $(, $arg: $ty)*) -> $ret {
                    static SPEC: $crate::contract::MethodSpec = $crate::contract::MethodSpec {
                        module: ::std::module_path!(),
                        client: ::std::stringify!($client),
                        name: ::std::stringify!($method),
                        class: $class,
                        route: $crate::contract::Mapping::declared(&[$($route)?]),
                        params: &[$(
                            $crate::contract::ParamSpec {
                                name: ::std::stringify!($arg),
                                roles: &[$($role),*],
                            }
                        ),*],
                    };
                    self.invoker.invoke(
                        &SPEC,
                        ::std::vec![$($crate::convert::IntoArg::into_arg($arg)),*],
                    )
                }
            )*
        }
    };
}
