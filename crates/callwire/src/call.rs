use core::fmt;
use std::borrow::Cow;

/// The request/response cardinality of a method.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CallKind {
    /// One request, one response.
    Unary,
    /// One request, zero or more responses.
    ServerStream,
    /// Zero or more requests, one response.
    ClientStream,
    /// Independent request and response streams.
    BidiStream,
}

impl CallKind {
    /// Whether the caller may send more than one request.
    pub const fn client_streams(self) -> bool {
        matches!(self, Self::ClientStream | Self::BidiStream)
    }

    /// Whether the handler may send more than one response.
    pub const fn server_streams(self) -> bool {
        matches!(self, Self::ServerStream | Self::BidiStream)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unary => "unary",
            Self::ServerStream => "server-streaming",
            Self::ClientStream => "client-streaming",
            Self::BidiStream => "bidi-streaming",
        }
    }
}

impl fmt::Display for CallKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifies a method and the call pattern it is served with.
///
/// Descriptors are the lookup key of the dispatch table. They are usually
/// declared as constants with [`MethodDescriptor::from_static`]; transports
/// that learn method names at runtime use [`MethodDescriptor::new`].
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MethodDescriptor {
    service: Cow<'static, str>,
    method: Cow<'static, str>,
    kind: CallKind,
}

impl MethodDescriptor {
    pub const fn from_static(service: &'static str, method: &'static str, kind: CallKind) -> Self {
        Self {
            service: Cow::Borrowed(service),
            method: Cow::Borrowed(method),
            kind,
        }
    }

    pub fn new(service: impl Into<String>, method: impl Into<String>, kind: CallKind) -> Self {
        Self {
            service: Cow::Owned(service.into()),
            method: Cow::Owned(method.into()),
            kind,
        }
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub const fn kind(&self) -> CallKind {
        self.kind
    }

    /// The `/service/method` path used in logs and error messages.
    pub fn path(&self) -> String {
        format!("/{}/{}", self.service, self.method)
    }
}

impl fmt::Display for MethodDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}/{} ({})", self.service, self.method, self.kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    const ECHO: MethodDescriptor =
        MethodDescriptor::from_static("test.Echo", "Echo", CallKind::Unary);

    #[test]
    fn static_and_owned_descriptors_are_equal() {
        let owned = MethodDescriptor::new("test.Echo", "Echo", CallKind::Unary);
        assert_eq!(owned, ECHO);

        let mut set = HashSet::new();
        set.insert(ECHO);
        assert!(set.contains(&owned));
    }

    #[test]
    fn kind_is_part_of_identity() {
        let streaming = MethodDescriptor::new("test.Echo", "Echo", CallKind::BidiStream);
        assert_ne!(streaming, ECHO);
        assert_eq!(streaming.path(), ECHO.path());
    }

    #[test]
    fn stream_directions() {
        assert!(!CallKind::Unary.client_streams() && !CallKind::Unary.server_streams());
        assert!(
            CallKind::ServerStream.server_streams() && !CallKind::ServerStream.client_streams()
        );
        assert!(
            CallKind::ClientStream.client_streams() && !CallKind::ClientStream.server_streams()
        );
        assert!(CallKind::BidiStream.client_streams() && CallKind::BidiStream.server_streams());
    }
}
