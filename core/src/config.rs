//! Client configuration: where the API lives and the service's ceilings.
//!
//! Both ceilings differ between API versions (the page cap has been 500 and
//! 2000), and so has the method the login endpoint accepts, so all three are
//! configuration rather than constants.

use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::http::HttpMethod;

pub const DEFAULT_API_VERSION: &str = "7.0";
pub const DEFAULT_MAX_PAGE_SIZE: usize = 2000;
pub const DEFAULT_MAX_BULK_SIZE: usize = 99;
pub const DEFAULT_MAX_DELETE_SIZE: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// API root, e.g. `https://acme.my.workfront.com/attask/api/v7.0`.
    pub base_url: String,
    /// Largest `$$LIMIT` a single search request may carry.
    pub max_page_size: usize,
    /// Largest number of items per bulk create/update request.
    pub max_bulk_size: usize,
    /// Largest number of ids per bulk delete request.
    pub max_delete_size: usize,
    /// Method used for `/login`.
    pub login_method: HttpMethod,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            max_page_size: DEFAULT_MAX_PAGE_SIZE,
            max_bulk_size: DEFAULT_MAX_BULK_SIZE,
            max_delete_size: DEFAULT_MAX_DELETE_SIZE,
            login_method: HttpMethod::Post,
        }
    }
}

impl ClientConfig {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            ..Self::default()
        }
    }

    /// Hosted API root for an account subdomain and environment
    /// (`my`, `preview`, `sandbox`, ...).
    pub fn for_subdomain(subdomain: &str, env: &str, api_version: &str) -> Self {
        Self::new(&format!(
            "https://{subdomain}.{env}.workfront.com/attask/api/v{api_version}"
        ))
    }

    pub fn with_max_page_size(mut self, size: usize) -> Self {
        self.max_page_size = size;
        self
    }

    pub fn with_max_bulk_size(mut self, size: usize) -> Self {
        self.max_bulk_size = size;
        self
    }

    pub fn with_max_delete_size(mut self, size: usize) -> Self {
        self.max_delete_size = size;
        self
    }

    pub fn with_login_method(mut self, method: HttpMethod) -> Self {
        self.login_method = method;
        self
    }

    /// Reject values that would make planning impossible.
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.base_url.is_empty() {
            return Err(ApiError::validation("base_url must be set"));
        }
        for (name, value) in [
            ("max_page_size", self.max_page_size),
            ("max_bulk_size", self.max_bulk_size),
            ("max_delete_size", self.max_delete_size),
        ] {
            if value == 0 {
                return Err(ApiError::validation(format!("{name} must be positive")));
            }
        }
        Ok(())
    }
}
