//! Synchronous client core for the Workfront ("attask") REST API.
//!
//! # Overview
//! Builds `HttpRequest` values and parses `HttpResponse` values; the host
//! supplies a `Transport` that performs the round-trip. On top of the
//! request builder, `Session` handles the service's ceilings: bulk writes
//! are split into chunks the service accepts, and large searches are paged
//! with `$$FIRST`/`$$LIMIT` after an up-front count.
//!
//! # Design
//! - `WorkfrontClient` (formatter) holds configuration and the credential;
//!   `build_*` / `parse_*` pairs keep the I/O boundary explicit.
//! - `segment` and `paginate` are pure planners, tested in isolation.
//! - `Session` composes them; calls are strictly sequential and never
//!   retried. Bulk and paged operations are not atomic.
//! - `Record` tracks dirty fields for partial updates.

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod paginate;
pub mod params;
pub mod record;
pub mod segment;
pub mod session;
pub mod tools;
pub mod types;

pub use auth::Credentials;
pub use client::WorkfrontClient;
pub use config::ClientConfig;
pub use error::ApiError;
pub use http::{HttpMethod, HttpRequest, HttpResponse, Transport};
pub use paginate::{plan_pages, Page, PagePlan};
pub use params::{ParamValue, ParameterMap};
pub use record::Record;
pub use segment::{plan_chunks, segmented};
pub use session::Session;
pub use types::{Item, LoginResponse, ObjCode, ReportRequest, SearchRequest};
