//! Static dispatch table.
//!
//! Handlers are registered once at start-up through a [`RegistryBuilder`] and
//! frozen into a [`Registry`], an immutable map keyed by
//! [`MethodDescriptor`]. The dispatch loop resolves every incoming call
//! against it; there is no dynamic method lookup at call time.

use crate::{
    CallContext, Error, Handler, MethodDescriptor, Result, Status,
    codec::{Message, StreamSender, Streaming},
};
use core::future::Future;
use std::collections::HashMap;
use std::sync::Arc;

/// Collects handlers before the dispatch loop starts.
#[derive(Default)]
pub struct RegistryBuilder {
    handlers: HashMap<MethodDescriptor, Handler>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a prebuilt [`Handler`] under `method`.
    ///
    /// # Errors
    ///
    /// - [`Error::PatternMismatch`] if the handler's call pattern differs from
    ///   the descriptor's.
    /// - [`Error::DuplicateMethod`] if the `/service/method` path is already
    ///   registered, under any call pattern.
    pub fn register(&mut self, method: MethodDescriptor, handler: Handler) -> Result<&mut Self> {
        if method.kind() != handler.kind() {
            return Err(Error::PatternMismatch {
                path: method.path(),
                expected: handler.kind().as_str(),
            });
        }

        let taken = self
            .handlers
            .keys()
            .any(|m| m.service() == method.service() && m.method() == method.method());
        if taken {
            return Err(Error::DuplicateMethod {
                path: method.path(),
            });
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(method = %method, "Registered handler");

        self.handlers.insert(method, handler);
        Ok(self)
    }

    /// Registers a unary handler.
    ///
    /// # Errors
    ///
    /// See [`RegistryBuilder::register`].
    pub fn unary<Req, Res, F, Fut>(
        &mut self,
        method: MethodDescriptor,
        handler: F,
    ) -> Result<&mut Self>
    where
        Req: Message,
        Res: Message,
        F: Fn(Req, CallContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = core::result::Result<Res, Status>> + Send + 'static,
    {
        self.register(method, Handler::unary(handler))
    }

    /// Registers a server-streaming handler.
    ///
    /// # Errors
    ///
    /// See [`RegistryBuilder::register`].
    pub fn server_streaming<Req, Res, F, Fut>(
        &mut self,
        method: MethodDescriptor,
        handler: F,
    ) -> Result<&mut Self>
    where
        Req: Message,
        Res: Message,
        F: Fn(Req, StreamSender<Res>, CallContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = core::result::Result<(), Status>> + Send + 'static,
    {
        self.register(method, Handler::server_streaming(handler))
    }

    /// Registers a client-streaming handler.
    ///
    /// # Errors
    ///
    /// See [`RegistryBuilder::register`].
    pub fn client_streaming<Req, Res, F, Fut>(
        &mut self,
        method: MethodDescriptor,
        handler: F,
    ) -> Result<&mut Self>
    where
        Req: Message,
        Res: Message,
        F: Fn(Streaming<Req>, CallContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = core::result::Result<Res, Status>> + Send + 'static,
    {
        self.register(method, Handler::client_streaming(handler))
    }

    /// Registers a bidirectional-streaming handler.
    ///
    /// # Errors
    ///
    /// See [`RegistryBuilder::register`].
    pub fn bidi_streaming<Req, Res, F, Fut>(
        &mut self,
        method: MethodDescriptor,
        handler: F,
    ) -> Result<&mut Self>
    where
        Req: Message,
        Res: Message,
        F: Fn(Streaming<Req>, StreamSender<Res>, CallContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = core::result::Result<(), Status>> + Send + 'static,
    {
        self.register(method, Handler::bidi_streaming(handler))
    }

    pub fn build(self) -> Registry {
        Registry {
            handlers: Arc::new(self.handlers),
        }
    }
}

/// Immutable, cheaply clonable dispatch table.
#[derive(Clone, Default, Debug)]
pub struct Registry {
    handlers: Arc<HashMap<MethodDescriptor, Handler>>,
}

impl Registry {
    /// Resolves `method` to its handler.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownMethod`] if nothing is registered under the
    /// exact descriptor, including its call pattern.
    pub fn lookup(&self, method: &MethodDescriptor) -> Result<&Handler> {
        self.handlers.get(method).ok_or_else(|| Error::UnknownMethod {
            path: method.path(),
        })
    }

    pub fn methods(&self) -> impl Iterator<Item = &MethodDescriptor> {
        self.handlers.keys()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}
