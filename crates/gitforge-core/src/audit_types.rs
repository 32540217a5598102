//! Audit event data model. Lives in `gitforge-core` rather
//! than `gitforge-audit` so the queue and pool crates can construct events
//! without depending on the audit storage crate.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Closed set of audit event types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    GitClone,
    GitPush,
    GitPull,
    GitFetch,
    GitCommit,
    GitCheckout,
    GitMerge,
    GitRebase,
    CredentialLoaded,
    CredentialAccessed,
    CredentialCleared,
    CredentialRotated,
    AuthFailed,
    AuthSucceeded,
    PermissionDenied,
    SuspiciousActivity,
    RateLimitExceeded,
    SystemStart,
    SystemStop,
    ConfigChanged,
    WorkspaceAllocated,
    WorkspaceReleased,
    WorkspaceAccessed,
}

/// The fixed subset of event types `get_security_events` projects over.
pub const SECURITY_EVENT_TYPES: &[AuditEventType] = &[
    AuditEventType::AuthFailed,
    AuditEventType::PermissionDenied,
    AuditEventType::SuspiciousActivity,
    AuditEventType::RateLimitExceeded,
];

/// Git operation name → event type, used by `log_git_operation`. Unknown
/// operation names are silently skipped rather than logged as an error.
pub fn git_operation_event_type(op: &str) -> Option<AuditEventType> {
    match op {
        "clone" => Some(AuditEventType::GitClone),
        "push" => Some(AuditEventType::GitPush),
        "pull" => Some(AuditEventType::GitPull),
        "fetch" => Some(AuditEventType::GitFetch),
        "commit" => Some(AuditEventType::GitCommit),
        "checkout" => Some(AuditEventType::GitCheckout),
        "merge" => Some(AuditEventType::GitMerge),
        "rebase" => Some(AuditEventType::GitRebase),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Error,
    Critical,
}

/// A single append-only audit event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    pub event_id: Uuid,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub event_type: AuditEventType,
    pub severity: Severity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workspace_id: Option<String>,
    #[serde(default)]
    pub details: HashMap<String, String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl AuditEvent {
    pub fn new(event_type: AuditEventType, severity: Severity) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            timestamp: chrono::Utc::now(),
            event_type,
            severity,
            user_id: None,
            workspace_id: None,
            details: HashMap::new(),
            metadata: HashMap::new(),
        }
    }

    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn with_workspace_id(mut self, workspace_id: impl Into<String>) -> Self {
        self.workspace_id = Some(workspace_id.into());
        self
    }

    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn to_json_line(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}

/// Logging level a given severity maps to when emitted via `tracing`.
pub fn severity_log_level(severity: Severity) -> tracing::Level {
    match severity {
        Severity::Info => tracing::Level::INFO,
        Severity::Warning => tracing::Level::WARN,
        Severity::Error | Severity::Critical => tracing::Level::ERROR,
    }
}
