//! Drives a `WorkfrontClient` through a host-supplied `Transport`.
//!
//! # Design
//! `Session` owns a client and a transport and performs each logical
//! operation as one or more strictly sequential round-trips. Bulk
//! operations go through the segmenter, paged searches through the page
//! planner; everything else is a single build/execute/parse.
//!
//! Every method takes `&mut self`, so a credential swap (login as another
//! user) cannot interleave with an operation in progress. There is no retry
//! and no recovery: the first error ends the operation, and chunks or pages
//! sent before it stay applied.

use serde_json::Value;
use tracing::{debug, info};

use crate::client::WorkfrontClient;
use crate::error::ApiError;
use crate::http::{HttpRequest, HttpResponse, Transport};
use crate::paginate::plan_pages;
use crate::params::ParameterMap;
use crate::segment::segmented;
use crate::types::{Item, LoginResponse, ReportRequest, SearchRequest};

pub struct Session<T> {
    client: WorkfrontClient,
    transport: T,
}

impl<T: Transport> Session<T> {
    pub fn new(client: WorkfrontClient, transport: T) -> Self {
        Self { client, transport }
    }

    pub fn client(&self) -> &WorkfrontClient {
        &self.client
    }

    pub fn client_mut(&mut self) -> &mut WorkfrontClient {
        &mut self.client
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn into_parts(self) -> (WorkfrontClient, T) {
        (self.client, self.transport)
    }

    fn send(&mut self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        debug!(method = request.method.as_str(), path = %request.endpoint(), "sending request");
        self.transport.execute(request)
    }

    fn round_trip<R>(
        &mut self,
        request: HttpRequest,
        parse: impl FnOnce(&WorkfrontClient, HttpResponse) -> Result<R, ApiError>,
    ) -> Result<R, ApiError> {
        let response = self.send(request)?;
        parse(&self.client, response)
    }

    /// Open a session. Without a password the configured API key
    /// authenticates the login, which acts on the user's behalf.
    pub fn login(&mut self, username: &str, password: Option<&str>) -> Result<LoginResponse, ApiError> {
        let request = self.client.build_login(username, password);
        let login = self.round_trip(request, WorkfrontClient::parse_login)?;
        info!(username, "logged in");
        let creds = self.client.credentials_mut();
        creds.session_id = Some(login.session_id.clone());
        creds.user_id = login.user_id.clone();
        Ok(login)
    }

    /// Close the session. The local session is cleared even when the
    /// request fails.
    pub fn logout(&mut self) -> Result<(), ApiError> {
        let request = self.client.build_logout()?;
        let result = self.round_trip(request, WorkfrontClient::parse_data);
        self.client.credentials_mut().clear_session();
        info!("logged out");
        result.map(|_| ())
    }

    /// Log in as `username` with the API key, run `op`, then log out again.
    /// Logout happens whether or not `op` succeeds; `op`'s error wins.
    /// The credentials held before the call are restored afterwards.
    pub fn as_user<R, F>(&mut self, username: &str, op: F) -> Result<R, ApiError>
    where
        F: FnOnce(&mut Self) -> Result<R, ApiError>,
    {
        if self.client.credentials().api_key.is_none() {
            return Err(ApiError::validation(
                "acting on behalf of a user requires an API key",
            ));
        }
        let saved = self.client.credentials().clone();
        if let Err(err) = self.login(username, None) {
            *self.client.credentials_mut() = saved;
            return Err(err);
        }
        let result = op(self);
        let logout = self.logout();
        *self.client.credentials_mut() = saved;
        let value = result?;
        logout?;
        Ok(value)
    }

    pub fn get(&mut self, obj_code: &str, id: &str, fields: &[&str]) -> Result<Item, ApiError> {
        let request = self.client.build_get(obj_code, id, fields)?;
        self.round_trip(request, WorkfrontClient::parse_record)
    }

    pub fn get_list(&mut self, obj_code: &str, ids: &[String], fields: &[&str]) -> Result<Vec<Value>, ApiError> {
        let request = self.client.build_get_list(obj_code, ids, fields)?;
        self.round_trip(request, WorkfrontClient::parse_items)
    }

    pub fn post(&mut self, obj_code: &str, params: &ParameterMap, fields: &[&str]) -> Result<Item, ApiError> {
        let request = self.client.build_post(obj_code, params, fields)?;
        self.round_trip(request, WorkfrontClient::parse_record)
    }

    pub fn put(
        &mut self,
        obj_code: &str,
        id: &str,
        params: &ParameterMap,
        fields: &[&str],
    ) -> Result<Item, ApiError> {
        let request = self.client.build_put(obj_code, id, params, fields)?;
        self.round_trip(request, WorkfrontClient::parse_record)
    }

    pub fn delete(&mut self, obj_code: &str, id: &str, force: bool) -> Result<Value, ApiError> {
        let request = self.client.build_delete(obj_code, id, force)?;
        self.round_trip(request, WorkfrontClient::parse_data)
    }

    pub fn action(
        &mut self,
        obj_code: &str,
        action: &str,
        params: &ParameterMap,
        fields: &[&str],
        id: Option<&str>,
    ) -> Result<Value, ApiError> {
        let request = self.client.build_action(obj_code, action, params, fields, id)?;
        self.round_trip(request, WorkfrontClient::parse_data)
    }

    pub fn count(&mut self, obj_code: &str, params: &ParameterMap) -> Result<usize, ApiError> {
        let request = self.client.build_count(obj_code, params)?;
        self.round_trip(request, WorkfrontClient::parse_count)
    }

    pub fn report(&mut self, report: &ReportRequest) -> Result<Value, ApiError> {
        let request = self.client.build_report(report)?;
        self.round_trip(request, WorkfrontClient::parse_data)
    }

    /// Search, paging through the results when `get_all` or `limit` is set.
    ///
    /// A paged search first counts the matches, then requests each planned
    /// page in increasing offset order and concatenates the pages.
    pub fn search(&mut self, search: &SearchRequest) -> Result<Vec<Value>, ApiError> {
        let fields: Vec<&str> = search.fields.iter().map(String::as_str).collect();
        if !search.is_paged() {
            let request = self
                .client
                .build_search(&search.obj_code, &search.params, &fields, None)?;
            return self.round_trip(request, WorkfrontClient::parse_items);
        }

        let max_page_size = self.client.config().max_page_size;
        if max_page_size == 0 {
            return Err(ApiError::validation("page size must be positive"));
        }
        let true_count = self.count(&search.obj_code, &search.params)?;
        let plan = plan_pages(true_count, search.limit, max_page_size)?;

        let mut output = Vec::with_capacity(plan.effective_total);
        for page in plan.pages {
            let request =
                self.client
                    .build_search(&search.obj_code, &search.params, &fields, Some(page))?;
            output.extend(self.round_trip(request, WorkfrontClient::parse_items)?);
        }
        Ok(output)
    }

    /// Update existing objects in chunks of `max_bulk_size`.
    pub fn bulk_update(&mut self, obj_code: &str, updates: &[Item], fields: &[&str]) -> Result<Vec<Value>, ApiError> {
        let max = self.client.config().max_bulk_size;
        segmented(updates, max, |chunk| {
            let request = self.client.build_bulk_update(obj_code, chunk, fields)?;
            self.round_trip(request, WorkfrontClient::parse_items)
        })
    }

    /// Create objects in chunks of `max_bulk_size`.
    pub fn bulk_create(&mut self, obj_code: &str, items: &[Item], fields: &[&str]) -> Result<Vec<Value>, ApiError> {
        let max = self.client.config().max_bulk_size;
        segmented(items, max, |chunk| {
            let request = self.client.build_bulk_create(obj_code, chunk, fields)?;
            self.round_trip(request, WorkfrontClient::parse_items)
        })
    }

    /// Delete objects by id in chunks of `max_delete_size`.
    pub fn bulk_delete(
        &mut self,
        obj_code: &str,
        ids: &[String],
        force: bool,
        atomic: bool,
    ) -> Result<Vec<Value>, ApiError> {
        let max = self.client.config().max_delete_size;
        segmented(ids, max, |chunk| {
            let request = self.client.build_bulk_delete(obj_code, chunk, force, atomic)?;
            self.round_trip(request, WorkfrontClient::parse_items)
        })
    }
}
