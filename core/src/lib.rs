//! Blocking API client for the sendwithus transactional email service.
//!
//! # Overview
//! `SwuClient` marshals typed requests to JSON, performs one authenticated
//! HTTP round-trip per call, and decodes the response into typed results.
//!
//! ```no_run
//! use swu_core::{Email, Recipient, SwuClient};
//!
//! let client = SwuClient::new("live_api_key");
//! let email = Email {
//!     id: "tem_welcome".to_string(),
//!     recipient: Some(Recipient::new("ada@example.com").with_name("Ada")),
//!     ..Default::default()
//! };
//! client.send(&email)?;
//! # Ok::<(), swu_core::ApiError>(())
//! ```
//!
//! # Design
//! - The client is immutable after construction; the network lives behind
//!   the `Transport` trait, with a `ureq` implementation by default.
//! - Every status of 300 or above is an error carrying the raw body. There
//!   are no retries.
//! - DTOs are defined independently from the mock-server crate; integration
//!   tests catch schema drift.

pub mod client;
pub mod error;
pub mod http;
pub mod types;

pub use client::{SwuClient, SwuClientBuilder, DEFAULT_BASE_URL};
pub use error::ApiError;
pub use http::{HttpMethod, HttpRequest, HttpResponse, Transport, UreqTransport};
pub use types::{
    Attachment, DripCampaign, Email, Log, LogEvent, LogQuery, LogResend, Recipient, ResentEmail,
    Sender, Template, Version,
};
