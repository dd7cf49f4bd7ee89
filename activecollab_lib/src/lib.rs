//! ActiveCollab API client library.
//!
//! Provides a client for the ActiveCollab REST API: system info, roles,
//! people, projects, milestones, tickets, pages and tasks, over both the
//! 2.x and 3.x authentication generations. Endpoint methods are thin
//! wrappers around [`Client::call`], the low-level request primitive.

pub mod client;
pub mod error;
pub mod generation;
pub mod helpers;
pub mod params;

pub use client::{Client, ClientBuilder, Method, NewPage, NewProject, PageEdit, ResponseEnvelope};
pub use error::{ApiError, DecodeError, Error, TransportError};
pub use generation::ApiGeneration;
pub use helpers::{format_api_datetime, parse_api_datetime, slug_from_permalink};

/// Library version for User-Agent and diagnostics.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
