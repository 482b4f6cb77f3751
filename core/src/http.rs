//! HTTP transport types for the host-does-IO pattern.
//!
//! # Design
//! Requests and responses are plain data. The client builds `HttpRequest`
//! values and parses `HttpResponse` values; executing the round-trip belongs
//! to a `Transport`, supplied by the host. `Session` calls the transport
//! once per physical request, strictly in sequence.
//!
//! GET and DELETE requests carry their parameters in the URL query string.
//! POST and PUT requests carry them as a form-encoded body.

use serde::{Deserialize, Serialize};

use crate::error::ApiError;

pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }

    /// Whether parameters travel in the query string rather than the body.
    pub fn uses_query(&self) -> bool {
        matches!(self, HttpMethod::Get | HttpMethod::Delete)
    }
}

/// An HTTP request described as plain data.
///
/// `path` is the full URL, including the query string for GET and DELETE.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl HttpRequest {
    /// The URL without its query string.
    pub fn endpoint(&self) -> &str {
        self.path.split_once('?').map_or(self.path.as_str(), |(base, _)| base)
    }

    /// Decoded parameters in wire order, from the query string or the body.
    pub fn params(&self) -> Vec<(String, String)> {
        let encoded = if self.method.uses_query() {
            self.path.split_once('?').map_or("", |(_, query)| query)
        } else {
            self.body.as_deref().unwrap_or("")
        };
        url::form_urlencoded::parse(encoded.as_bytes())
            .into_owned()
            .collect()
    }

    /// First value for `key`, if present.
    pub fn param(&self, key: &str) -> Option<String> {
        self.params()
            .into_iter()
            .find_map(|(k, v)| (k == key).then_some(v))
    }
}

/// An HTTP response described as plain data.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpResponse {
    /// A 200 response with a JSON body, mostly useful for hosts and tests.
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            headers: Vec::new(),
            body: body.into(),
        }
    }
}

/// Executes one request against the network (or anything standing in for it).
///
/// Implementations report connection-level failures as `ApiError::Transport`;
/// non-2xx statuses should be returned as data so the client can interpret
/// the service's error envelope.
pub trait Transport {
    fn execute(&mut self, request: HttpRequest) -> Result<HttpResponse, ApiError>;
}

impl<F> Transport for F
where
    F: FnMut(HttpRequest) -> Result<HttpResponse, ApiError>,
{
    fn execute(&mut self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        self(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn params_are_read_from_query_for_get() {
        let req = HttpRequest {
            method: HttpMethod::Get,
            path: "http://host/api/task/search?status=CUR&status=PLN&name=a+b".to_string(),
            headers: Vec::new(),
            body: None,
        };
        assert_eq!(req.endpoint(), "http://host/api/task/search");
        assert_eq!(
            req.params(),
            vec![
                ("status".to_string(), "CUR".to_string()),
                ("status".to_string(), "PLN".to_string()),
                ("name".to_string(), "a b".to_string()),
            ]
        );
    }

    #[test]
    fn params_are_read_from_body_for_put() {
        let req = HttpRequest {
            method: HttpMethod::Put,
            path: "http://host/api/task".to_string(),
            headers: Vec::new(),
            body: Some("apiKey=k&updates=%5B%5D".to_string()),
        };
        assert_eq!(req.param("updates").as_deref(), Some("[]"));
        assert_eq!(req.param("missing"), None);
    }

    #[test]
    fn method_serializes_uppercase() {
        let json = serde_json::to_string(&HttpMethod::Post).unwrap();
        assert_eq!(json, "\"POST\"");
        let back: HttpMethod = serde_json::from_str("\"GET\"").unwrap();
        assert_eq!(back, HttpMethod::Get);
    }

    #[test]
    fn closures_are_transports() {
        let mut calls = 0;
        let mut transport = |_req: HttpRequest| -> Result<HttpResponse, ApiError> {
            calls += 1;
            Ok(HttpResponse::ok("{}"))
        };
        let req = HttpRequest {
            method: HttpMethod::Get,
            path: "http://host".to_string(),
            headers: Vec::new(),
            body: None,
        };
        transport.execute(req).unwrap();
        assert_eq!(calls, 1);
    }
}
