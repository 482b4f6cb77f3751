//! Request descriptions and response DTOs.
//!
//! Records travel as `serde_json::Map` values: the service returns whatever
//! fields were asked for, so there is no fixed schema to bind to.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::params::ParameterMap;

/// A record as sent to or returned by the service.
pub type Item = Map<String, Value>;

/// Object type codes understood by the service.
pub struct ObjCode;

impl ObjCode {
    pub const PROJECT: &'static str = "proj";
    pub const TASK: &'static str = "task";
    pub const ISSUE: &'static str = "optask";
    pub const TEAM: &'static str = "team";
    pub const HOUR: &'static str = "hour";
    pub const TIMESHEET: &'static str = "tshet";
    pub const USER: &'static str = "user";
    pub const ASSIGNMENT: &'static str = "assgn";
    pub const USER_PREF: &'static str = "userpf";
    pub const CATEGORY: &'static str = "ctgy";
    pub const CATEGORY_PARAMETER: &'static str = "ctgypa";
    pub const PARAMETER: &'static str = "param";
    pub const PARAMETER_GROUP: &'static str = "pgrp";
    pub const PARAMETER_OPTION: &'static str = "popt";
    pub const PARAMETER_VALUE: &'static str = "pval";
    pub const ROLE: &'static str = "role";
    pub const GROUP: &'static str = "group";
    pub const NOTE: &'static str = "note";
    pub const DOCUMENT: &'static str = "docu";
    pub const DOCUMENT_VERSION: &'static str = "docv";
    pub const EXPENSE: &'static str = "expns";
    pub const CUSTOM_ENUM: &'static str = "custem";
    pub const PROGRAM: &'static str = "prgm";
}

/// Payload of a successful `/login`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginResponse {
    #[serde(rename = "sessionID")]
    pub session_id: String,
    #[serde(rename = "userID", default)]
    pub user_id: Option<String>,
}

/// A search, optionally paginated.
///
/// Without `limit` or `get_all` a single request is sent and the service's
/// own default cap applies. With either, the match count is fetched first
/// and the results are paged; `limit` caps the total.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchRequest {
    pub obj_code: String,
    pub params: ParameterMap,
    pub fields: Vec<String>,
    pub limit: Option<usize>,
    pub get_all: bool,
}

impl SearchRequest {
    pub fn new(obj_code: &str) -> Self {
        Self {
            obj_code: obj_code.to_string(),
            ..Self::default()
        }
    }

    pub fn params(mut self, params: ParameterMap) -> Self {
        self.params = params;
        self
    }

    pub fn fields(mut self, fields: &[&str]) -> Self {
        self.fields = fields.iter().map(|f| f.to_string()).collect();
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn all(mut self) -> Self {
        self.get_all = true;
        self
    }

    pub fn is_paged(&self) -> bool {
        self.get_all || self.limit.is_some()
    }
}

/// An aggregate report: `agg_func` applied to `agg_field`, optionally
/// grouped by a field and rolled up across groups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRequest {
    pub obj_code: String,
    pub params: ParameterMap,
    pub agg_field: String,
    pub agg_func: String,
    pub group_by: Option<String>,
    pub rollup: bool,
}

impl ReportRequest {
    pub fn new(obj_code: &str, agg_field: &str, agg_func: &str) -> Self {
        Self {
            obj_code: obj_code.to_string(),
            params: ParameterMap::new(),
            agg_field: agg_field.to_string(),
            agg_func: agg_func.to_string(),
            group_by: None,
            rollup: false,
        }
    }

    pub fn params(mut self, params: ParameterMap) -> Self {
        self.params = params;
        self
    }

    pub fn group_by(mut self, field: &str) -> Self {
        self.group_by = Some(field.to_string());
        self
    }

    pub fn rollup(mut self) -> Self {
        self.rollup = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_response_uses_service_field_names() {
        let login: LoginResponse =
            serde_json::from_str(r#"{"sessionID":"abc","userID":"u1","locale":"en_US"}"#).unwrap();
        assert_eq!(login.session_id, "abc");
        assert_eq!(login.user_id.as_deref(), Some("u1"));
    }

    #[test]
    fn search_is_paged_with_limit_or_all() {
        assert!(!SearchRequest::new(ObjCode::TASK).is_paged());
        assert!(SearchRequest::new(ObjCode::TASK).limit(10).is_paged());
        assert!(SearchRequest::new(ObjCode::TASK).all().is_paged());
    }
}
