//! Collaborator contracts.
//!
//! The dispatcher never touches a filesystem or a Git binary itself; it
//! holds weak references to whatever implements these traits and upgrades
//! them per call, the same placeholder-until-wired shape as
//! `TaskHandlerContext` in the worker crate this pool was built alongside.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Weak};

use async_trait::async_trait;
use gitforge_core::{AppError, Credential};
use serde_json::Value;

/// `mode` argument of `git_sparse_checkout`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SparseMode {
    Replace,
    Add,
    Remove,
}

/// One method per Git operation. Arguments have already passed
/// through the sanitizer battery by the time they reach here. Adapters must
/// never let a credential reach stdout/stderr that gets reported back; any
/// adapter stderr must flow through the error redactor before it is folded
/// into a returned `AppError`.
#[async_trait]
pub trait GitAdapter: Send + Sync {
    async fn clone(
        &self,
        workspace_id: &str,
        url: &str,
        branch: Option<&str>,
        depth: Option<i64>,
    ) -> Result<Value, AppError>;
    async fn init(&self, workspace_id: &str, bare: bool, default_branch: &str) -> Result<Value, AppError>;
    async fn status(&self, workspace_id: &str) -> Result<Value, AppError>;

    async fn stage(&self, workspace_id: &str, files: &[String]) -> Result<Value, AppError>;
    async fn commit(
        &self,
        workspace_id: &str,
        message: &str,
        author_name: Option<&str>,
        author_email: Option<&str>,
    ) -> Result<Value, AppError>;

    async fn push(
        &self,
        workspace_id: &str,
        remote: &str,
        branch: Option<&str>,
        force: bool,
    ) -> Result<Value, AppError>;
    async fn pull(
        &self,
        workspace_id: &str,
        remote: &str,
        branch: Option<&str>,
        rebase: bool,
    ) -> Result<Value, AppError>;
    async fn fetch(&self, workspace_id: &str, remote: Option<&str>, tags: bool) -> Result<Value, AppError>;
    async fn list_remotes(&self, workspace_id: &str) -> Result<Value, AppError>;
    async fn add_remote(&self, workspace_id: &str, name: &str, url: &str) -> Result<Value, AppError>;
    async fn remove_remote(&self, workspace_id: &str, name: &str) -> Result<Value, AppError>;

    async fn checkout(
        &self,
        workspace_id: &str,
        branch: &str,
        create_new: bool,
        force: bool,
    ) -> Result<Value, AppError>;
    async fn list_branches(
        &self,
        workspace_id: &str,
        local: bool,
        remote: bool,
        all: bool,
    ) -> Result<Value, AppError>;
    async fn create_branch(
        &self,
        workspace_id: &str,
        name: &str,
        revision: Option<&str>,
        force: bool,
    ) -> Result<Value, AppError>;
    async fn delete_branch(
        &self,
        workspace_id: &str,
        name: &str,
        force: bool,
        remote: bool,
    ) -> Result<Value, AppError>;

    async fn merge(&self, workspace_id: &str, source_branch: &str, fast_forward: bool) -> Result<Value, AppError>;
    async fn rebase(
        &self,
        workspace_id: &str,
        branch: Option<&str>,
        abort: bool,
        continue_rebase: bool,
    ) -> Result<Value, AppError>;

    async fn log(
        &self,
        workspace_id: &str,
        max_count: Option<i64>,
        author: Option<&str>,
        all: bool,
    ) -> Result<Value, AppError>;
    async fn show(&self, workspace_id: &str, revision: &str) -> Result<Value, AppError>;
    async fn diff(&self, workspace_id: &str, cached: bool, commit_oid: Option<&str>) -> Result<Value, AppError>;
    async fn blame(&self, workspace_id: &str, path: &Path) -> Result<Value, AppError>;

    async fn stash(
        &self,
        workspace_id: &str,
        save: bool,
        pop: bool,
        apply: bool,
        drop: bool,
        message: Option<&str>,
        include_untracked: bool,
    ) -> Result<Value, AppError>;
    async fn list_stash(&self, workspace_id: &str) -> Result<Value, AppError>;

    async fn list_tags(&self, workspace_id: &str) -> Result<Value, AppError>;
    async fn create_tag(
        &self,
        workspace_id: &str,
        name: &str,
        message: Option<&str>,
        force: bool,
    ) -> Result<Value, AppError>;
    async fn delete_tag(&self, workspace_id: &str, name: &str) -> Result<Value, AppError>;

    async fn lfs_init(&self, workspace_id: &str) -> Result<Value, AppError>;
    async fn lfs_track(&self, workspace_id: &str, patterns: &[String], lockable: bool) -> Result<Value, AppError>;
    async fn lfs_untrack(&self, workspace_id: &str, patterns: &[String]) -> Result<Value, AppError>;
    async fn lfs_status(&self, workspace_id: &str) -> Result<Value, AppError>;
    async fn lfs_pull(&self, workspace_id: &str) -> Result<Value, AppError>;
    async fn lfs_push(&self, workspace_id: &str) -> Result<Value, AppError>;
    async fn lfs_fetch(&self, workspace_id: &str) -> Result<Value, AppError>;
    async fn lfs_install(&self, workspace_id: &str) -> Result<Value, AppError>;

    async fn sparse_checkout(&self, workspace_id: &str, paths: &[String], mode: SparseMode) -> Result<Value, AppError>;

    async fn submodule_add(
        &self,
        workspace_id: &str,
        path: &Path,
        url: &str,
        name: Option<&str>,
        branch: Option<&str>,
        depth: Option<i64>,
    ) -> Result<Value, AppError>;
    async fn submodule_update(&self, workspace_id: &str, name: Option<&str>, init: bool) -> Result<Value, AppError>;
    async fn submodule_deinit(&self, workspace_id: &str, name: Option<&str>, force: bool) -> Result<Value, AppError>;
    async fn submodule_list(&self, workspace_id: &str) -> Result<Value, AppError>;
}

/// `allocate`/`get`/`release`/`list`/`disk_space`.
#[async_trait]
pub trait WorkspaceAllocator: Send + Sync {
    async fn allocate(&self) -> Result<Value, AppError>;
    async fn get(&self, workspace_id: &str) -> Result<Option<Value>, AppError>;
    async fn release(&self, workspace_id: &str) -> Result<(), AppError>;
    async fn list(&self) -> Result<Value, AppError>;
    async fn disk_space(&self, warning_threshold: f64) -> Result<Value, AppError>;
}

/// Opaque credential lifecycle. Tokens/passwords never round
/// trip through this trait as anything but `Credential`, whose `Debug` is
/// hand-redacted.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn get_credential(&self, workspace_id: &str) -> Result<Option<Credential>, AppError>;
    async fn set_credential(&self, workspace_id: &str, credential: Credential) -> Result<(), AppError>;
    async fn clear_credential(&self, workspace_id: &str) -> Result<(), AppError>;
}

/// Ambient tracing. `start_span` returns an opaque span handle;
/// the dispatcher threads it through to `finish_span` and never inspects it.
#[async_trait]
pub trait TraceSpan: Send + Sync {
    async fn start_span(
        &self,
        operation: &str,
        parent: Option<&str>,
        tags: Option<HashMap<String, String>>,
    ) -> String;
    async fn finish_span(&self, span: &str, code: &str, message: &str);
}

/// Task introspection for `get_task`/`list_tasks`/`cancel_task`.
/// Not one of the four named collaborator contracts, since those tools read
/// queue/pool state rather than talk to Git; supplemented here so the
/// dispatch table's task category has somewhere to go.
#[async_trait]
pub trait TaskSource: Send + Sync {
    async fn get_task(&self, task_id: &str) -> Result<Option<Value>, AppError>;
    async fn list_tasks(&self, status: Option<&str>, limit: usize) -> Result<Value, AppError>;
    async fn cancel_task(&self, task_id: &str) -> Result<bool, AppError>;
}

struct NoopGitAdapter;
struct NoopWorkspaceAllocator;
struct NoopCredentialStore;
struct NoopTraceSpan;
struct NoopTaskSource;

fn unavailable(what: &str) -> AppError {
    AppError::GitOperationError {
        message: format!("{what} collaborator is not wired"),
        suggestion: Some("configure a real collaborator before dispatching".to_string()),
    }
}

macro_rules! noop_git_methods {
    ($($name:ident),* $(,)?) => {
        $(
            async fn $name(&self, _workspace_id: &str) -> Result<Value, AppError> {
                Err(unavailable(stringify!($name)))
            }
        )*
    };
}

#[async_trait]
impl GitAdapter for NoopGitAdapter {
    async fn clone(&self, _: &str, _: &str, _: Option<&str>, _: Option<i64>) -> Result<Value, AppError> {
        Err(unavailable("clone"))
    }
    async fn init(&self, _: &str, _: bool, _: &str) -> Result<Value, AppError> {
        Err(unavailable("init"))
    }
    noop_git_methods!(status);
    async fn stage(&self, _: &str, _: &[String]) -> Result<Value, AppError> {
        Err(unavailable("stage"))
    }
    async fn commit(&self, _: &str, _: &str, _: Option<&str>, _: Option<&str>) -> Result<Value, AppError> {
        Err(unavailable("commit"))
    }
    async fn push(&self, _: &str, _: &str, _: Option<&str>, _: bool) -> Result<Value, AppError> {
        Err(unavailable("push"))
    }
    async fn pull(&self, _: &str, _: &str, _: Option<&str>, _: bool) -> Result<Value, AppError> {
        Err(unavailable("pull"))
    }
    async fn fetch(&self, _: &str, _: Option<&str>, _: bool) -> Result<Value, AppError> {
        Err(unavailable("fetch"))
    }
    noop_git_methods!(list_remotes);
    async fn add_remote(&self, _: &str, _: &str, _: &str) -> Result<Value, AppError> {
        Err(unavailable("add_remote"))
    }
    async fn remove_remote(&self, _: &str, _: &str) -> Result<Value, AppError> {
        Err(unavailable("remove_remote"))
    }
    async fn checkout(&self, _: &str, _: &str, _: bool, _: bool) -> Result<Value, AppError> {
        Err(unavailable("checkout"))
    }
    async fn list_branches(&self, _: &str, _: bool, _: bool, _: bool) -> Result<Value, AppError> {
        Err(unavailable("list_branches"))
    }
    async fn create_branch(&self, _: &str, _: &str, _: Option<&str>, _: bool) -> Result<Value, AppError> {
        Err(unavailable("create_branch"))
    }
    async fn delete_branch(&self, _: &str, _: &str, _: bool, _: bool) -> Result<Value, AppError> {
        Err(unavailable("delete_branch"))
    }
    async fn merge(&self, _: &str, _: &str, _: bool) -> Result<Value, AppError> {
        Err(unavailable("merge"))
    }
    async fn rebase(&self, _: &str, _: Option<&str>, _: bool, _: bool) -> Result<Value, AppError> {
        Err(unavailable("rebase"))
    }
    async fn log(&self, _: &str, _: Option<i64>, _: Option<&str>, _: bool) -> Result<Value, AppError> {
        Err(unavailable("log"))
    }
    async fn show(&self, _: &str, _: &str) -> Result<Value, AppError> {
        Err(unavailable("show"))
    }
    async fn diff(&self, _: &str, _: bool, _: Option<&str>) -> Result<Value, AppError> {
        Err(unavailable("diff"))
    }
    async fn blame(&self, _: &str, _: &Path) -> Result<Value, AppError> {
        Err(unavailable("blame"))
    }
    async fn stash(
        &self,
        _: &str,
        _: bool,
        _: bool,
        _: bool,
        _: bool,
        _: Option<&str>,
        _: bool,
    ) -> Result<Value, AppError> {
        Err(unavailable("stash"))
    }
    noop_git_methods!(list_stash, list_tags);
    async fn create_tag(&self, _: &str, _: &str, _: Option<&str>, _: bool) -> Result<Value, AppError> {
        Err(unavailable("create_tag"))
    }
    async fn delete_tag(&self, _: &str, _: &str) -> Result<Value, AppError> {
        Err(unavailable("delete_tag"))
    }
    noop_git_methods!(lfs_init, lfs_status, lfs_pull, lfs_push, lfs_fetch, lfs_install);
    async fn lfs_track(&self, _: &str, _: &[String], _: bool) -> Result<Value, AppError> {
        Err(unavailable("lfs_track"))
    }
    async fn lfs_untrack(&self, _: &str, _: &[String]) -> Result<Value, AppError> {
        Err(unavailable("lfs_untrack"))
    }
    async fn sparse_checkout(&self, _: &str, _: &[String], _: SparseMode) -> Result<Value, AppError> {
        Err(unavailable("sparse_checkout"))
    }
    async fn submodule_add(
        &self,
        _: &str,
        _: &Path,
        _: &str,
        _: Option<&str>,
        _: Option<&str>,
        _: Option<i64>,
    ) -> Result<Value, AppError> {
        Err(unavailable("submodule_add"))
    }
    async fn submodule_update(&self, _: &str, _: Option<&str>, _: bool) -> Result<Value, AppError> {
        Err(unavailable("submodule_update"))
    }
    async fn submodule_deinit(&self, _: &str, _: Option<&str>, _: bool) -> Result<Value, AppError> {
        Err(unavailable("submodule_deinit"))
    }
    noop_git_methods!(submodule_list);
}

#[async_trait]
impl WorkspaceAllocator for NoopWorkspaceAllocator {
    async fn allocate(&self) -> Result<Value, AppError> {
        Err(unavailable("allocate_workspace"))
    }
    async fn get(&self, _workspace_id: &str) -> Result<Option<Value>, AppError> {
        Err(unavailable("get_workspace"))
    }
    async fn release(&self, _workspace_id: &str) -> Result<(), AppError> {
        Err(unavailable("release_workspace"))
    }
    async fn list(&self) -> Result<Value, AppError> {
        Err(unavailable("list_workspaces"))
    }
    async fn disk_space(&self, _warning_threshold: f64) -> Result<Value, AppError> {
        Err(unavailable("disk_space"))
    }
}

#[async_trait]
impl CredentialStore for NoopCredentialStore {
    async fn get_credential(&self, _workspace_id: &str) -> Result<Option<Credential>, AppError> {
        Ok(None)
    }
    async fn set_credential(&self, _workspace_id: &str, _credential: Credential) -> Result<(), AppError> {
        Err(unavailable("set_credential"))
    }
    async fn clear_credential(&self, _workspace_id: &str) -> Result<(), AppError> {
        Ok(())
    }
}

#[async_trait]
impl TraceSpan for NoopTraceSpan {
    async fn start_span(&self, _operation: &str, _parent: Option<&str>, _tags: Option<HashMap<String, String>>) -> String {
        String::new()
    }
    async fn finish_span(&self, _span: &str, _code: &str, _message: &str) {}
}

#[async_trait]
impl TaskSource for NoopTaskSource {
    async fn get_task(&self, _task_id: &str) -> Result<Option<Value>, AppError> {
        Err(unavailable("get_task"))
    }
    async fn list_tasks(&self, _status: Option<&str>, _limit: usize) -> Result<Value, AppError> {
        Err(unavailable("list_tasks"))
    }
    async fn cancel_task(&self, _task_id: &str) -> Result<bool, AppError> {
        Err(unavailable("cancel_task"))
    }
}

pub fn empty_git_adapter_weak() -> Weak<dyn GitAdapter> {
    let adapter: Arc<dyn GitAdapter> = Arc::new(NoopGitAdapter);
    Arc::downgrade(&adapter)
}

pub fn empty_workspace_allocator_weak() -> Weak<dyn WorkspaceAllocator> {
    let allocator: Arc<dyn WorkspaceAllocator> = Arc::new(NoopWorkspaceAllocator);
    Arc::downgrade(&allocator)
}

pub fn empty_credential_store_weak() -> Weak<dyn CredentialStore> {
    let store: Arc<dyn CredentialStore> = Arc::new(NoopCredentialStore);
    Arc::downgrade(&store)
}

pub fn empty_trace_span_weak() -> Weak<dyn TraceSpan> {
    let tracer: Arc<dyn TraceSpan> = Arc::new(NoopTraceSpan);
    Arc::downgrade(&tracer)
}

pub fn empty_task_source_weak() -> Weak<dyn TaskSource> {
    let tasks: Arc<dyn TaskSource> = Arc::new(NoopTaskSource);
    Arc::downgrade(&tasks)
}
