use reqwest::Method;
use serde_json::Value;

/// One logical marketplace operation, independent of how it is routed.
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayRequest {
    pub method: Method,
    /// Marketplace path starting with `/v2/...`.
    pub path: String,
    /// Raw query string without the leading `?`; empty when absent.
    pub query: String,
    /// JSON payload; never sent with `GET`.
    pub body: Option<Value>,
}

impl GatewayRequest {
    #[must_use]
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: String::new(),
            body: None,
        }
    }

    #[must_use]
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    #[must_use]
    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = query.into().trim_start_matches('?').to_owned();
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// `path` plus `?query` when a query is present.
    #[must_use]
    pub fn path_and_query(&self) -> String {
        if self.query.is_empty() {
            self.path.clone()
        } else {
            format!("{}?{}", self.path, self.query)
        }
    }

    pub(crate) fn payload(&self) -> Option<&Value> {
        if self.method == Method::GET {
            None
        } else {
            self.body.as_ref()
        }
    }
}

/// Marketplace answer: status code and best-effort JSON body (`{}` when the
/// body is empty or not JSON).
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayResponse {
    pub status: u16,
    pub body: Value,
}

impl GatewayResponse {
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

pub(crate) fn parse_body_or_empty(bytes: Option<&[u8]>) -> Value {
    bytes
        .and_then(|b| serde_json::from_slice(b).ok())
        .unwrap_or_else(|| Value::Object(serde_json::Map::new()))
}
