//! Request fields exposed to log variables.

use std::fmt;

use crate::common::error::LogVarError;

/// Prefix shared by every variable this crate provides.
pub const VARIABLE_PREFIX: &str = "json_";

/// Selector for a raw request field.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, serde::Deserialize)]
#[serde(try_from = "String")]
pub enum Field {
    Uri,
    Host,
    Method,
    QueryString,
    RemoteAddr,
    Referer,
    UserAgent,
}

impl Field {
    /// Every field, in registration order.
    pub const ALL: [Field; 7] = [
        Field::Uri,
        Field::Host,
        Field::Method,
        Field::QueryString,
        Field::RemoteAddr,
        Field::Referer,
        Field::UserAgent,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Field::Uri => "uri",
            Field::Host => "host",
            Field::Method => "method",
            Field::QueryString => "query_string",
            Field::RemoteAddr => "remote_addr",
            Field::Referer => "referer",
            Field::UserAgent => "user_agent",
        }
    }

    /// Name under which the field is registered as a log chunk.
    pub fn variable_name(self) -> &'static str {
        match self {
            Field::Uri => "json_uri",
            Field::Host => "json_host",
            Field::Method => "json_method",
            Field::QueryString => "json_query_string",
            Field::RemoteAddr => "json_remote_addr",
            Field::Referer => "json_referer",
            Field::UserAgent => "json_user_agent",
        }
    }

    /// Accepts both `json_uri` and the bare `uri`.
    pub fn from_variable_name(name: &str) -> Option<Field> {
        let bare = name.strip_prefix(VARIABLE_PREFIX).unwrap_or(name);
        Field::ALL.into_iter().find(|field| field.as_str() == bare)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.variable_name())
    }
}

impl TryFrom<String> for Field {
    type Error = LogVarError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Field::from_variable_name(value.trim()).ok_or(LogVarError::UnknownVariable(value))
    }
}

/// Read-only access to the fields of one host request.
///
/// Hosts implement this over whatever request structure they own. Only `uri`
/// and `host` are mandatory; the rest read as empty unless overridden.
pub trait RequestView {
    fn uri(&self) -> &[u8];
    fn host(&self) -> &[u8];

    fn method(&self) -> &[u8] {
        &[]
    }

    fn query_string(&self) -> &[u8] {
        &[]
    }

    fn remote_addr(&self) -> &[u8] {
        &[]
    }

    fn referer(&self) -> &[u8] {
        &[]
    }

    fn user_agent(&self) -> &[u8] {
        &[]
    }

    /// Dispatch on a selector.
    fn field(&self, field: Field) -> &[u8] {
        match field {
            Field::Uri => self.uri(),
            Field::Host => self.host(),
            Field::Method => self.method(),
            Field::QueryString => self.query_string(),
            Field::RemoteAddr => self.remote_addr(),
            Field::Referer => self.referer(),
            Field::UserAgent => self.user_agent(),
        }
    }
}

/// Plain owned request, for hosts that copy fields out and for tests.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct OwnedRequest {
    pub uri: Vec<u8>,
    pub host: Vec<u8>,
    pub method: Vec<u8>,
    pub query_string: Vec<u8>,
    pub remote_addr: Vec<u8>,
    pub referer: Vec<u8>,
    pub user_agent: Vec<u8>,
}

impl OwnedRequest {
    pub fn new(uri: impl Into<Vec<u8>>, host: impl Into<Vec<u8>>) -> Self {
        Self {
            uri: uri.into(),
            host: host.into(),
            ..Self::default()
        }
    }

    pub fn with_method(mut self, method: impl Into<Vec<u8>>) -> Self {
        self.method = method.into();
        self
    }

    pub fn with_query_string(mut self, query: impl Into<Vec<u8>>) -> Self {
        self.query_string = query.into();
        self
    }

    pub fn with_remote_addr(mut self, addr: impl Into<Vec<u8>>) -> Self {
        self.remote_addr = addr.into();
        self
    }

    pub fn with_referer(mut self, referer: impl Into<Vec<u8>>) -> Self {
        self.referer = referer.into();
        self
    }

    pub fn with_user_agent(mut self, agent: impl Into<Vec<u8>>) -> Self {
        self.user_agent = agent.into();
        self
    }
}

impl RequestView for OwnedRequest {
    fn uri(&self) -> &[u8] {
        &self.uri
    }

    fn host(&self) -> &[u8] {
        &self.host
    }

    fn method(&self) -> &[u8] {
        &self.method
    }

    fn query_string(&self) -> &[u8] {
        &self.query_string
    }

    fn remote_addr(&self) -> &[u8] {
        &self.remote_addr
    }

    fn referer(&self) -> &[u8] {
        &self.referer
    }

    fn user_agent(&self) -> &[u8] {
        &self.user_agent
    }
}
