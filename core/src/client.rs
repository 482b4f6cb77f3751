//! Request builder and response parser for the Workfront API.
//!
//! # Design
//! `WorkfrontClient` holds the configuration and the current credential and
//! nothing else. Each operation is split into a `build_*` method that
//! produces an `HttpRequest` and a `parse_*` method that consumes an
//! `HttpResponse`; nothing here touches the network. `Session` strings the
//! two together through a `Transport` and adds segmentation and paging.
//!
//! Every request except login carries exactly one credential parameter
//! (`sessionID` if a session is open, `apiKey` otherwise). Field selection
//! is one comma-joined `fields` parameter, and bulk payloads are one JSON
//! text `updates` parameter, since a list of objects has no flat encoding.

use serde_json::Value;
use tracing::debug;

use crate::auth::{Credentials, API_KEY_PARAM, SESSION_PARAM};
use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse, FORM_CONTENT_TYPE};
use crate::paginate::{Page, FIRST_PARAM, LIMIT_PARAM};
use crate::params::{encode_pairs, ParameterMap};
use crate::types::{Item, LoginResponse, ReportRequest};

pub const LOGIN_PATH: &str = "/login";
pub const LOGOUT_PATH: &str = "/logout";
pub const FIELDS_PARAM: &str = "fields";

/// Keys the client sets itself and callers may not pass as parameters.
const RESERVED_PARAMS: [&str; 3] = [SESSION_PARAM, API_KEY_PARAM, FIELDS_PARAM];

/// Synchronous request builder for the Workfront API.
#[derive(Debug, Clone)]
pub struct WorkfrontClient {
    config: ClientConfig,
    credentials: Credentials,
}

impl WorkfrontClient {
    pub fn new(config: ClientConfig, credentials: Credentials) -> Self {
        Self {
            config,
            credentials,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Swap the credential, e.g. to act for another user. Must not happen
    /// while a segmented or paged operation is in flight.
    pub fn credentials_mut(&mut self) -> &mut Credentials {
        &mut self.credentials
    }

    /// Build an authenticated request for `path` with `params` and an
    /// optional field selection.
    pub fn build_request(
        &self,
        method: HttpMethod,
        path: &str,
        params: &ParameterMap,
        fields: &[&str],
    ) -> Result<HttpRequest, ApiError> {
        if let Some(key) = RESERVED_PARAMS.into_iter().find(|key| params.contains_key(key)) {
            return Err(ApiError::validation(format!(
                "{key} is set by the client and cannot be passed as a parameter"
            )));
        }
        let mut pairs = params.pairs();
        if !fields.is_empty() {
            pairs.push((FIELDS_PARAM.to_string(), fields.join(",")));
        }
        pairs.push(self.credentials.auth_pair()?);
        Ok(self.finish(method, path, &pairs))
    }

    fn finish(&self, method: HttpMethod, path: &str, pairs: &[(String, String)]) -> HttpRequest {
        let encoded = encode_pairs(pairs);
        let url = format!("{}{path}", self.config.base_url);
        debug!(method = method.as_str(), %url, params = pairs.len(), "built request");
        if method.uses_query() {
            let path = if encoded.is_empty() {
                url
            } else {
                format!("{url}?{encoded}")
            };
            HttpRequest {
                method,
                path,
                headers: Vec::new(),
                body: None,
            }
        } else {
            HttpRequest {
                method,
                path: url,
                headers: vec![("content-type".to_string(), FORM_CONTENT_TYPE.to_string())],
                body: Some(encoded),
            }
        }
    }

    /// Log in as `username`. With an API key configured the password may be
    /// omitted, which opens a session on the user's behalf.
    pub fn build_login(&self, username: &str, password: Option<&str>) -> HttpRequest {
        let mut pairs = vec![("username".to_string(), username.to_string())];
        if let Some(password) = password {
            pairs.push(("password".to_string(), password.to_string()));
        }
        if let Some(key) = self.credentials.api_key.as_deref() {
            pairs.push((API_KEY_PARAM.to_string(), key.to_string()));
        }
        self.finish(self.config.login_method, LOGIN_PATH, &pairs)
    }

    pub fn build_logout(&self) -> Result<HttpRequest, ApiError> {
        self.build_request(HttpMethod::Get, LOGOUT_PATH, &ParameterMap::new(), &[])
    }

    pub fn build_get(&self, obj_code: &str, id: &str, fields: &[&str]) -> Result<HttpRequest, ApiError> {
        self.build_request(
            HttpMethod::Get,
            &format!("/{obj_code}/{id}"),
            &ParameterMap::new(),
            fields,
        )
    }

    /// Fetch several objects by id in one request.
    pub fn build_get_list(
        &self,
        obj_code: &str,
        ids: &[String],
        fields: &[&str],
    ) -> Result<HttpRequest, ApiError> {
        let params = ParameterMap::new().with("ID", ids.join(","))?;
        self.build_request(HttpMethod::Get, &format!("/{obj_code}"), &params, fields)
    }

    pub fn build_post(
        &self,
        obj_code: &str,
        params: &ParameterMap,
        fields: &[&str],
    ) -> Result<HttpRequest, ApiError> {
        self.build_request(HttpMethod::Post, &format!("/{obj_code}"), params, fields)
    }

    pub fn build_put(
        &self,
        obj_code: &str,
        id: &str,
        params: &ParameterMap,
        fields: &[&str],
    ) -> Result<HttpRequest, ApiError> {
        self.build_request(HttpMethod::Put, &format!("/{obj_code}/{id}"), params, fields)
    }

    /// `force` also removes dependent objects (expenses on a task, ...).
    pub fn build_delete(&self, obj_code: &str, id: &str, force: bool) -> Result<HttpRequest, ApiError> {
        let params = ParameterMap::new().with("force", force)?;
        self.build_request(HttpMethod::Delete, &format!("/{obj_code}/{id}"), &params, &[])
    }

    /// Run a named action, on one object when `id` is given or on the
    /// collection otherwise.
    pub fn build_action(
        &self,
        obj_code: &str,
        action: &str,
        params: &ParameterMap,
        fields: &[&str],
        id: Option<&str>,
    ) -> Result<HttpRequest, ApiError> {
        let path = match id {
            Some(id) => format!("/{obj_code}/{id}"),
            None => format!("/{obj_code}"),
        };
        let mut params = params.clone();
        params.insert("action", action)?;
        self.build_request(HttpMethod::Put, &path, &params, fields)
    }

    /// One search request. `page` injects `$$FIRST`/`$$LIMIT`.
    pub fn build_search(
        &self,
        obj_code: &str,
        params: &ParameterMap,
        fields: &[&str],
        page: Option<Page>,
    ) -> Result<HttpRequest, ApiError> {
        let path = format!("/{obj_code}/search");
        match page {
            None => self.build_request(HttpMethod::Get, &path, params, fields),
            Some(page) => {
                let mut params = params.clone();
                params.insert(FIRST_PARAM, page.offset)?;
                params.insert(LIMIT_PARAM, page.size)?;
                self.build_request(HttpMethod::Get, &path, &params, fields)
            }
        }
    }

    pub fn build_count(&self, obj_code: &str, params: &ParameterMap) -> Result<HttpRequest, ApiError> {
        self.build_request(HttpMethod::Get, &format!("/{obj_code}/count"), params, &[])
    }

    pub fn build_report(&self, report: &ReportRequest) -> Result<HttpRequest, ApiError> {
        let mut params = report.params.clone();
        params.insert(format!("{}_AggFunc", report.agg_field), report.agg_func.as_str())?;
        if let Some(group_by) = &report.group_by {
            params.insert(format!("{group_by}_1_GroupBy"), true)?;
        }
        if report.rollup {
            params.insert("$$ROLLUP", true)?;
        }
        self.build_request(
            HttpMethod::Get,
            &format!("/{}/report", report.obj_code),
            &params,
            &[],
        )
    }

    /// Update existing objects; each item carries its `ID`. One chunk only.
    pub fn build_bulk_update(
        &self,
        obj_code: &str,
        updates: &[Item],
        fields: &[&str],
    ) -> Result<HttpRequest, ApiError> {
        self.build_bulk(HttpMethod::Put, obj_code, updates, fields)
    }

    /// Create new objects. One chunk only.
    pub fn build_bulk_create(
        &self,
        obj_code: &str,
        updates: &[Item],
        fields: &[&str],
    ) -> Result<HttpRequest, ApiError> {
        self.build_bulk(HttpMethod::Post, obj_code, updates, fields)
    }

    fn build_bulk(
        &self,
        method: HttpMethod,
        obj_code: &str,
        updates: &[Item],
        fields: &[&str],
    ) -> Result<HttpRequest, ApiError> {
        let payload =
            serde_json::to_string(updates).map_err(|e| ApiError::SerializationError(e.to_string()))?;
        let params = ParameterMap::new().with("updates", payload)?;
        self.build_request(method, &format!("/{obj_code}"), &params, fields)
    }

    /// Delete objects by id. `atomic` deletes the set at once, so children
    /// removed along with a parent in the same set do not fail the request.
    pub fn build_bulk_delete(
        &self,
        obj_code: &str,
        ids: &[String],
        force: bool,
        atomic: bool,
    ) -> Result<HttpRequest, ApiError> {
        let mut params = ParameterMap::new()
            .with("ID", ids.to_vec())?
            .with("force", force)?;
        if atomic {
            params.insert("atomic", true)?;
        }
        self.build_request(HttpMethod::Delete, &format!("/{obj_code}"), &params, &[])
    }

    /// The `data` member of a successful response.
    pub fn parse_data(&self, response: HttpResponse) -> Result<Value, ApiError> {
        check_status(&response)?;
        let mut body: Value = serde_json::from_str(&response.body)
            .map_err(|e| ApiError::DeserializationError(e.to_string()))?;
        if let Some(message) = error_message(&body) {
            return Err(ApiError::Remote(message));
        }
        match body.get_mut("data") {
            Some(data) => Ok(data.take()),
            None => Err(ApiError::DeserializationError(
                "response has no data member".to_string(),
            )),
        }
    }

    /// `data` as a list. A single object becomes a one-element list and
    /// `null` an empty one.
    pub fn parse_items(&self, response: HttpResponse) -> Result<Vec<Value>, ApiError> {
        Ok(match self.parse_data(response)? {
            Value::Array(items) => items,
            Value::Null => Vec::new(),
            other => vec![other],
        })
    }

    /// `data` as one record.
    pub fn parse_record(&self, response: HttpResponse) -> Result<Item, ApiError> {
        match self.parse_data(response)? {
            Value::Object(item) => Ok(item),
            other => Err(ApiError::DeserializationError(format!(
                "expected an object, got {other}"
            ))),
        }
    }

    pub fn parse_count(&self, response: HttpResponse) -> Result<usize, ApiError> {
        let data = self.parse_data(response)?;
        data.get("count")
            .and_then(Value::as_u64)
            .map(|count| count as usize)
            .ok_or_else(|| ApiError::DeserializationError(format!("no count in {data}")))
    }

    pub fn parse_login(&self, response: HttpResponse) -> Result<LoginResponse, ApiError> {
        let data = self.parse_data(response)?;
        serde_json::from_value(data).map_err(|e| ApiError::DeserializationError(e.to_string()))
    }
}

/// Map non-success status codes to the appropriate `ApiError` variant.
fn check_status(response: &HttpResponse) -> Result<(), ApiError> {
    if (200..300).contains(&response.status) {
        return Ok(());
    }
    if response.status == 404 {
        return Err(ApiError::NotFound);
    }
    let body = serde_json::from_str::<Value>(&response.body)
        .ok()
        .and_then(|body| error_message(&body))
        .unwrap_or_else(|| response.body.clone());
    Err(ApiError::HttpError {
        status: response.status,
        body,
    })
}

/// Message from the service's `{"error": {"message": ...}}` envelope.
fn error_message(body: &Value) -> Option<String> {
    let error = body.get("error")?;
    Some(
        error
            .get("message")
            .and_then(Value::as_str)
            .map_or_else(|| error.to_string(), str::to_string),
    )
}
