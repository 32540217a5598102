use chrono::{DateTime, Utc};
use gitforge_core::{AuditEvent, AuditEventType, Severity};

/// Conjunctive query over the audit ring (backs `query_events`).
#[derive(Clone, Debug)]
pub struct EventFilter {
    pub event_type: Option<AuditEventType>,
    pub severity: Option<Severity>,
    pub user_id: Option<String>,
    pub workspace_id: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub limit: usize,
}

impl EventFilter {
    pub fn new() -> Self {
        Self {
            event_type: None,
            severity: None,
            user_id: None,
            workspace_id: None,
            start_time: None,
            end_time: None,
            limit: 100,
        }
    }

    pub fn with_event_type(mut self, event_type: AuditEventType) -> Self {
        self.event_type = Some(event_type);
        self
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = Some(severity);
        self
    }

    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn with_workspace_id(mut self, workspace_id: impl Into<String>) -> Self {
        self.workspace_id = Some(workspace_id.into());
        self
    }

    pub fn with_start_time(mut self, start_time: DateTime<Utc>) -> Self {
        self.start_time = Some(start_time);
        self
    }

    pub fn with_end_time(mut self, end_time: DateTime<Utc>) -> Self {
        self.end_time = Some(end_time);
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub(crate) fn matches(&self, event: &AuditEvent) -> bool {
        if let Some(event_type) = self.event_type {
            if event.event_type != event_type {
                return false;
            }
        }
        if let Some(severity) = self.severity {
            if event.severity != severity {
                return false;
            }
        }
        if let Some(user_id) = &self.user_id {
            if event.user_id.as_deref() != Some(user_id.as_str()) {
                return false;
            }
        }
        if let Some(workspace_id) = &self.workspace_id {
            if event.workspace_id.as_deref() != Some(workspace_id.as_str()) {
                return false;
            }
        }
        if let Some(start_time) = self.start_time {
            if event.timestamp < start_time {
                return false;
            }
        }
        if let Some(end_time) = self.end_time {
            if event.timestamp > end_time {
                return false;
            }
        }
        true
    }
}

impl Default for EventFilter {
    fn default() -> Self {
        Self::new()
    }
}
