//! Shared data model, error taxonomy, configuration, and sanitizer battery
//! for the execution substrate. Every other crate in the workspace depends
//! on this one; this crate depends on none of them.

pub mod audit_types;
pub mod config;
pub mod constants;
pub mod credential;
pub mod error;
pub mod model;
pub mod sanitize;

pub use audit_types::{AuditEvent, AuditEventType, Severity};
pub use config::Config;
pub use credential::Credential;
pub use error::{AppError, ErrorMetadata};
pub use model::{Priority, TaskRecord, TaskStatus};
