//! Application services coordinating the workflow engine and storage.

pub mod session_service;

pub use session_service::{render_spec_markdown, InvokeRequest, InvokeResponse, SessionService};
