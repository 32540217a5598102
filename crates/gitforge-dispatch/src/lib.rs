//! Tool dispatcher: the thin layer between an incoming tool call and the
//! collaborators that actually touch Git, workspaces, and credentials.
//! Every call passes through argument
//! sanitization, then audit logging and metrics recording wrap whatever the
//! collaborator returns.

mod args;
mod collaborators;
mod dispatch;

pub use collaborators::{
    empty_credential_store_weak, empty_git_adapter_weak, empty_task_source_weak,
    empty_trace_span_weak, empty_workspace_allocator_weak, CredentialStore, GitAdapter, SparseMode,
    TaskSource, TraceSpan, WorkspaceAllocator,
};

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, Weak};

use gitforge_audit::AuditLog;
use gitforge_core::audit_types::{AuditEventType, Severity};
use gitforge_core::{AppError, ErrorMetadata};
use gitforge_metrics::{GitOperationTimer, Registry};
use serde_json::Value;

use dispatch::Collaborators;

const GIT_AUDIT_OPERATIONS: &[&str] = &["clone", "push", "pull", "fetch", "commit", "checkout", "merge", "rebase"];

struct Inner {
    git: Mutex<Weak<dyn GitAdapter>>,
    workspace: Mutex<Weak<dyn WorkspaceAllocator>>,
    credentials: Mutex<Weak<dyn CredentialStore>>,
    tasks: Mutex<Weak<dyn TaskSource>>,
    tracer: Mutex<Weak<dyn TraceSpan>>,
    audit: Arc<AuditLog>,
    metrics: Arc<Registry>,
    workspace_root: PathBuf,
}

/// Cheap-clone dispatch handle. Holds weak references to its collaborators
/// so wiring them in after construction (or letting one drop during
/// shutdown) never requires the dispatcher itself to be rebuilt.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<Inner>,
}

impl Dispatcher {
    pub fn new(audit: Arc<AuditLog>, metrics: Arc<Registry>, workspace_root: impl Into<PathBuf>) -> Self {
        Self {
            inner: Arc::new(Inner {
                git: Mutex::new(empty_git_adapter_weak()),
                workspace: Mutex::new(empty_workspace_allocator_weak()),
                credentials: Mutex::new(empty_credential_store_weak()),
                tasks: Mutex::new(empty_task_source_weak()),
                tracer: Mutex::new(empty_trace_span_weak()),
                audit,
                metrics,
                workspace_root: workspace_root.into(),
            }),
        }
    }

    pub fn set_git_adapter(&self, adapter: Weak<dyn GitAdapter>) {
        *self.inner.git.lock().unwrap() = adapter;
    }

    pub fn set_workspace_allocator(&self, allocator: Weak<dyn WorkspaceAllocator>) {
        *self.inner.workspace.lock().unwrap() = allocator;
    }

    pub fn set_credential_store(&self, store: Weak<dyn CredentialStore>) {
        *self.inner.credentials.lock().unwrap() = store;
    }

    pub fn set_task_source(&self, tasks: Weak<dyn TaskSource>) {
        *self.inner.tasks.lock().unwrap() = tasks;
    }

    pub fn set_trace_span(&self, tracer: Weak<dyn TraceSpan>) {
        *self.inner.tracer.lock().unwrap() = tracer;
    }

    /// Dispatch one tool call end to end: validate/sanitize arguments,
    /// invoke the matching collaborator, audit the outcome, and record
    /// metrics. `user_id` is the caller identity to attach to the audit
    /// trail, if known.
    pub async fn dispatch(&self, operation: &str, arguments: Value, user_id: Option<&str>) -> Result<Value, AppError> {
        tracing::debug!(operation, user_id = ?user_id, "dispatching tool call");
        let collaborators = self.upgrade_collaborators()?;

        let tracer = self.inner.tracer.lock().unwrap().upgrade();
        let span = match &tracer {
            Some(tracer) => Some(tracer.start_span(operation, None, None).await),
            None => None,
        };

        let metric_operation = operation.trim_start_matches("git_");
        let mut timer = GitOperationTimer::start(Arc::clone(&self.inner.metrics), metric_operation);
        let workspace_id = arguments.get("workspace_id").and_then(Value::as_str).map(str::to_string);

        let result = dispatch::execute(&collaborators, operation, &arguments, &self.inner.workspace_root).await;

        match &result {
            Ok(_) => {
                if let (Some(tracer), Some(span)) = (&tracer, &span) {
                    tracer.finish_span(span, "ok", "").await;
                }
                self.audit_success(operation, user_id, workspace_id.as_deref(), &arguments);
            }
            Err(err) => {
                timer.mark_failed(err.metric_status());
                tracing::warn!(operation, error_code = err.error_code(), "tool call failed");
                if let (Some(tracer), Some(span)) = (&tracer, &span) {
                    tracer.finish_span(span, err.error_code(), &err.client_message()).await;
                }
                self.audit_failure(operation, user_id, workspace_id.as_deref(), err);
            }
        }

        result
    }

    fn upgrade_collaborators(&self) -> Result<Collaborators, AppError> {
        let git = self
            .inner
            .git
            .lock()
            .unwrap()
            .upgrade()
            .ok_or_else(|| unavailable("git adapter"))?;
        let workspace = self
            .inner
            .workspace
            .lock()
            .unwrap()
            .upgrade()
            .ok_or_else(|| unavailable("workspace allocator"))?;
        let credentials = self
            .inner
            .credentials
            .lock()
            .unwrap()
            .upgrade()
            .ok_or_else(|| unavailable("credential store"))?;
        let tasks = self
            .inner
            .tasks
            .lock()
            .unwrap()
            .upgrade()
            .ok_or_else(|| unavailable("task source"))?;
        Ok(Collaborators {
            git,
            workspace,
            credentials,
            tasks,
        })
    }

    fn audit_success(&self, operation: &str, user_id: Option<&str>, workspace_id: Option<&str>, arguments: &Value) {
        let op = operation.trim_start_matches("git_");
        if GIT_AUDIT_OPERATIONS.contains(&op) {
            let repo_url = arguments.get("url").and_then(Value::as_str);
            self.inner
                .audit
                .log_git_operation(op, repo_url, user_id, workspace_id, true, None);
            return;
        }
        let event_type = match operation {
            "git_allocate_workspace" => Some(AuditEventType::WorkspaceAllocated),
            "git_release_workspace" => Some(AuditEventType::WorkspaceReleased),
            "git_get_workspace" | "git_list_workspaces" => Some(AuditEventType::WorkspaceAccessed),
            _ => None,
        };
        if let Some(event_type) = event_type {
            let mut details = HashMap::new();
            if let Some(workspace_id) = workspace_id {
                details.insert("workspace_id".to_string(), workspace_id.to_string());
            }
            self.inner
                .audit
                .log_security_event(event_type, Severity::Info, user_id, details);
        }
    }

    fn audit_failure(&self, operation: &str, user_id: Option<&str>, workspace_id: Option<&str>, err: &AppError) {
        let op = operation.trim_start_matches("git_");
        let message = err.client_message();
        if GIT_AUDIT_OPERATIONS.contains(&op) {
            self.inner
                .audit
                .log_git_operation(op, None, user_id, workspace_id, false, Some(&message));
            return;
        }
        if matches!(err, AppError::AuthenticationError(_)) {
            let mut details = HashMap::new();
            details.insert("operation".to_string(), operation.to_string());
            details.insert("error".to_string(), message);
            self.inner
                .audit
                .log_security_event(AuditEventType::AuthFailed, Severity::Warning, user_id, details);
        }
    }
}

fn unavailable(what: &str) -> AppError {
    AppError::GitOperationError {
        message: format!("{what} is not wired"),
        suggestion: Some("configure the collaborator before dispatching tool calls".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::path::Path;

    struct StubGitAdapter;

    #[async_trait]
    impl GitAdapter for StubGitAdapter {
        async fn clone(&self, workspace_id: &str, url: &str, _: Option<&str>, _: Option<i64>) -> Result<Value, AppError> {
            Ok(json!({ "workspace_id": workspace_id, "url": url }))
        }
        async fn init(&self, _: &str, _: bool, _: &str) -> Result<Value, AppError> {
            unreachable!()
        }
        async fn status(&self, _: &str) -> Result<Value, AppError> {
            unreachable!()
        }
        async fn stage(&self, _: &str, _: &[String]) -> Result<Value, AppError> {
            unreachable!()
        }
        async fn commit(&self, _: &str, _: &str, _: Option<&str>, _: Option<&str>) -> Result<Value, AppError> {
            Err(AppError::GitOperationError {
                message: "nothing to commit".to_string(),
                suggestion: None,
            })
        }
        async fn push(&self, _: &str, _: &str, _: Option<&str>, _: bool) -> Result<Value, AppError> {
            unreachable!()
        }
        async fn pull(&self, _: &str, _: &str, _: Option<&str>, _: bool) -> Result<Value, AppError> {
            unreachable!()
        }
        async fn fetch(&self, _: &str, _: Option<&str>, _: bool) -> Result<Value, AppError> {
            unreachable!()
        }
        async fn list_remotes(&self, _: &str) -> Result<Value, AppError> {
            unreachable!()
        }
        async fn add_remote(&self, _: &str, _: &str, _: &str) -> Result<Value, AppError> {
            unreachable!()
        }
        async fn remove_remote(&self, _: &str, _: &str) -> Result<Value, AppError> {
            unreachable!()
        }
        async fn checkout(&self, _: &str, _: &str, _: bool, _: bool) -> Result<Value, AppError> {
            unreachable!()
        }
        async fn list_branches(&self, _: &str, _: bool, _: bool, _: bool) -> Result<Value, AppError> {
            unreachable!()
        }
        async fn create_branch(&self, _: &str, _: &str, _: Option<&str>, _: bool) -> Result<Value, AppError> {
            unreachable!()
        }
        async fn delete_branch(&self, _: &str, _: &str, _: bool, _: bool) -> Result<Value, AppError> {
            unreachable!()
        }
        async fn merge(&self, _: &str, _: &str, _: bool) -> Result<Value, AppError> {
            unreachable!()
        }
        async fn rebase(&self, _: &str, _: Option<&str>, _: bool, _: bool) -> Result<Value, AppError> {
            unreachable!()
        }
        async fn log(&self, _: &str, _: Option<i64>, _: Option<&str>, _: bool) -> Result<Value, AppError> {
            unreachable!()
        }
        async fn show(&self, _: &str, _: &str) -> Result<Value, AppError> {
            unreachable!()
        }
        async fn diff(&self, _: &str, _: bool, _: Option<&str>) -> Result<Value, AppError> {
            unreachable!()
        }
        async fn blame(&self, _: &str, _: &Path) -> Result<Value, AppError> {
            unreachable!()
        }
        async fn stash(&self, _: &str, _: bool, _: bool, _: bool, _: bool, _: Option<&str>, _: bool) -> Result<Value, AppError> {
            unreachable!()
        }
        async fn list_stash(&self, _: &str) -> Result<Value, AppError> {
            unreachable!()
        }
        async fn list_tags(&self, _: &str) -> Result<Value, AppError> {
            unreachable!()
        }
        async fn create_tag(&self, _: &str, _: &str, _: Option<&str>, _: bool) -> Result<Value, AppError> {
            unreachable!()
        }
        async fn delete_tag(&self, _: &str, _: &str) -> Result<Value, AppError> {
            unreachable!()
        }
        async fn lfs_init(&self, _: &str) -> Result<Value, AppError> {
            unreachable!()
        }
        async fn lfs_track(&self, _: &str, _: &[String], _: bool) -> Result<Value, AppError> {
            unreachable!()
        }
        async fn lfs_untrack(&self, _: &str, _: &[String]) -> Result<Value, AppError> {
            unreachable!()
        }
        async fn lfs_status(&self, _: &str) -> Result<Value, AppError> {
            unreachable!()
        }
        async fn lfs_pull(&self, _: &str) -> Result<Value, AppError> {
            unreachable!()
        }
        async fn lfs_push(&self, _: &str) -> Result<Value, AppError> {
            unreachable!()
        }
        async fn lfs_fetch(&self, _: &str) -> Result<Value, AppError> {
            unreachable!()
        }
        async fn lfs_install(&self, _: &str) -> Result<Value, AppError> {
            unreachable!()
        }
        async fn sparse_checkout(&self, _: &str, _: &[String], _: SparseMode) -> Result<Value, AppError> {
            unreachable!()
        }
        async fn submodule_add(&self, _: &str, _: &Path, _: &str, _: Option<&str>, _: Option<&str>, _: Option<i64>) -> Result<Value, AppError> {
            unreachable!()
        }
        async fn submodule_update(&self, _: &str, _: Option<&str>, _: bool) -> Result<Value, AppError> {
            unreachable!()
        }
        async fn submodule_deinit(&self, _: &str, _: Option<&str>, _: bool) -> Result<Value, AppError> {
            unreachable!()
        }
        async fn submodule_list(&self, _: &str) -> Result<Value, AppError> {
            unreachable!()
        }
    }

    struct StubWorkspaceAllocator;

    #[async_trait]
    impl WorkspaceAllocator for StubWorkspaceAllocator {
        async fn allocate(&self) -> Result<Value, AppError> {
            unreachable!()
        }
        async fn get(&self, _: &str) -> Result<Option<Value>, AppError> {
            unreachable!()
        }
        async fn release(&self, _: &str) -> Result<(), AppError> {
            unreachable!()
        }
        async fn list(&self) -> Result<Value, AppError> {
            unreachable!()
        }
        async fn disk_space(&self, _: f64) -> Result<Value, AppError> {
            unreachable!()
        }
    }

    struct StubCredentialStore;

    #[async_trait]
    impl CredentialStore for StubCredentialStore {
        async fn get_credential(&self, _: &str) -> Result<Option<gitforge_core::Credential>, AppError> {
            Ok(None)
        }
        async fn set_credential(&self, _: &str, _: gitforge_core::Credential) -> Result<(), AppError> {
            Ok(())
        }
        async fn clear_credential(&self, _: &str) -> Result<(), AppError> {
            Ok(())
        }
    }

    struct StubTaskSource;

    #[async_trait]
    impl TaskSource for StubTaskSource {
        async fn get_task(&self, _: &str) -> Result<Option<Value>, AppError> {
            unreachable!()
        }
        async fn list_tasks(&self, _: Option<&str>, _: usize) -> Result<Value, AppError> {
            unreachable!()
        }
        async fn cancel_task(&self, _: &str) -> Result<bool, AppError> {
            unreachable!()
        }
    }

    fn wired_dispatcher() -> (Dispatcher, Arc<dyn GitAdapter>, Arc<dyn WorkspaceAllocator>, Arc<dyn CredentialStore>, Arc<dyn TaskSource>) {
        let audit = Arc::new(AuditLog::new(100));
        let metrics = Arc::new(Registry::new().unwrap());
        let dispatcher = Dispatcher::new(audit, metrics, "/tmp/gitforge-test-workspaces");

        let git: Arc<dyn GitAdapter> = Arc::new(StubGitAdapter);
        let workspace: Arc<dyn WorkspaceAllocator> = Arc::new(StubWorkspaceAllocator);
        let credentials: Arc<dyn CredentialStore> = Arc::new(StubCredentialStore);
        let tasks: Arc<dyn TaskSource> = Arc::new(StubTaskSource);

        dispatcher.set_git_adapter(Arc::downgrade(&git));
        dispatcher.set_workspace_allocator(Arc::downgrade(&workspace));
        dispatcher.set_credential_store(Arc::downgrade(&credentials));
        dispatcher.set_task_source(Arc::downgrade(&tasks));

        (dispatcher, git, workspace, credentials, tasks)
    }

    #[tokio::test]
    async fn dispatch_clone_sanitizes_and_calls_adapter() {
        let (dispatcher, _git, _ws, _creds, _tasks) = wired_dispatcher();
        let result = dispatcher
            .dispatch(
                "git_clone",
                json!({ "workspace_id": "ws-1", "url": "https://example.com/repo.git" }),
                Some("alice"),
            )
            .await
            .unwrap();
        assert_eq!(result["workspace_id"], "ws-1");
        assert_eq!(result["url"], "https://example.com/repo.git");
    }

    #[tokio::test]
    async fn dispatch_rejects_unknown_operation() {
        let (dispatcher, _git, _ws, _creds, _tasks) = wired_dispatcher();
        let err = dispatcher.dispatch("git_teleport", json!({}), None).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn dispatch_rejects_dangerous_remote_url() {
        let (dispatcher, _git, _ws, _creds, _tasks) = wired_dispatcher();
        let err = dispatcher
            .dispatch(
                "git_clone",
                json!({ "workspace_id": "ws-1", "url": "https://localhost/internal.git" }),
                None,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn dispatch_surfaces_adapter_error_and_audits_it() {
        let (dispatcher, _git, _ws, _creds, _tasks) = wired_dispatcher();
        let err = dispatcher
            .dispatch("git_commit", json!({ "workspace_id": "ws-1", "message": "fix" }), None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::GitOperationError { .. }));
    }

    #[tokio::test]
    async fn dispatch_without_wired_adapter_is_unavailable() {
        let audit = Arc::new(AuditLog::new(100));
        let metrics = Arc::new(Registry::new().unwrap());
        let dispatcher = Dispatcher::new(audit, metrics, "/tmp/gitforge-test-workspaces");
        let err = dispatcher
            .dispatch("git_clone", json!({ "workspace_id": "ws-1", "url": "https://example.com/a.git" }), None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::GitOperationError { .. }));
    }
}
