//! The dispatch table itself: one match arm per tool name, each binding and
//! sanitizing its own arguments before calling the matching collaborator
//! method. A single exhaustive match stands in for a dict-then-fallback
//! dispatch table.

use std::path::Path;
use std::sync::Arc;

use gitforge_core::AppError;
use serde_json::{json, Value};

use crate::args;
use crate::collaborators::{CredentialStore, GitAdapter, SparseMode, TaskSource, WorkspaceAllocator};

pub(crate) struct Collaborators {
    pub git: Arc<dyn GitAdapter>,
    pub workspace: Arc<dyn WorkspaceAllocator>,
    pub credentials: Arc<dyn CredentialStore>,
    pub tasks: Arc<dyn TaskSource>,
}

fn parse_sparse_mode(raw: &str) -> Result<SparseMode, AppError> {
    match raw {
        "replace" => Ok(SparseMode::Replace),
        "add" => Ok(SparseMode::Add),
        "remove" => Ok(SparseMode::Remove),
        other => Err(AppError::InvalidArgument(format!(
            "invalid sparse_checkout mode: {other} (expected replace, add, or remove)"
        ))),
    }
}

/// Route `operation` to its collaborator call. `workspace_root` is the base
/// every filesystem-path argument is sanitized against.
pub(crate) async fn execute(
    collaborators: &Collaborators,
    operation: &str,
    args: &Value,
    workspace_root: &Path,
) -> Result<Value, AppError> {
    match operation {
        // Workspace lifecycle: the only operations exempt from requiring
        // workspace_id.
        "git_allocate_workspace" => collaborators.workspace.allocate().await,
        "git_get_workspace" => {
            let id = self::args::workspace_id(args)?;
            let info = collaborators.workspace.get(&id).await?;
            Ok(info.unwrap_or(Value::Null))
        }
        "git_release_workspace" => {
            let id = self::args::workspace_id(args)?;
            collaborators.workspace.release(&id).await?;
            Ok(json!({ "released": true }))
        }
        "git_list_workspaces" => collaborators.workspace.list().await,
        "git_disk_space" => {
            let threshold = self::args::optional_f64(args, "warning_threshold", 20.0);
            collaborators.workspace.disk_space(threshold).await
        }

        // Repository
        "git_clone" => {
            let workspace_id = self::args::workspace_id(args)?;
            let url = self::args::remote_url(args, "url").await?;
            let branch = self::args::optional_branch_or_name(args, "branch")?;
            let depth = self::args::optional_i64(args, "depth");
            collaborators
                .git
                .clone(&workspace_id, &url, branch.as_deref(), depth)
                .await
        }
        "git_init" => {
            let workspace_id = self::args::workspace_id(args)?;
            let bare = self::args::optional_bool(args, "bare", false);
            let default_branch = self::args::optional_branch_or_name(args, "default_branch")?
                .unwrap_or_else(|| "main".to_string());
            collaborators.git.init(&workspace_id, bare, &default_branch).await
        }
        "git_status" => {
            let workspace_id = self::args::workspace_id(args)?;
            collaborators.git.status(&workspace_id).await
        }

        // Commit
        "git_stage" => {
            let workspace_id = self::args::workspace_id(args)?;
            let files = self::args::string_array(args, "files")?;
            collaborators.git.stage(&workspace_id, &files).await
        }
        "git_commit" => {
            let workspace_id = self::args::workspace_id(args)?;
            let message = self::args::commit_message(args, "message")?;
            let author_name = self::args::optional_input_text(args, "author_name");
            let author_email = self::args::optional_input_text(args, "author_email");
            collaborators
                .git
                .commit(&workspace_id, &message, author_name.as_deref(), author_email.as_deref())
                .await
        }

        // Remote
        "git_push" => {
            let workspace_id = self::args::workspace_id(args)?;
            let remote = self::args::optional_input_text(args, "remote").unwrap_or_else(|| "origin".to_string());
            let branch = self::args::optional_branch_or_name(args, "branch")?;
            let force = self::args::optional_bool(args, "force", false);
            collaborators.git.push(&workspace_id, &remote, branch.as_deref(), force).await
        }
        "git_pull" => {
            let workspace_id = self::args::workspace_id(args)?;
            let remote = self::args::optional_input_text(args, "remote").unwrap_or_else(|| "origin".to_string());
            let branch = self::args::optional_branch_or_name(args, "branch")?;
            let rebase = self::args::optional_bool(args, "rebase", false);
            collaborators.git.pull(&workspace_id, &remote, branch.as_deref(), rebase).await
        }
        "git_fetch" => {
            let workspace_id = self::args::workspace_id(args)?;
            let remote = self::args::optional_input_text(args, "remote");
            let tags = self::args::optional_bool(args, "tags", false);
            collaborators.git.fetch(&workspace_id, remote.as_deref(), tags).await
        }
        "git_list_remotes" => {
            let workspace_id = self::args::workspace_id(args)?;
            collaborators.git.list_remotes(&workspace_id).await
        }
        "git_add_remote" => {
            let workspace_id = self::args::workspace_id(args)?;
            let name = self::args::input_text(args, "name")?;
            let url = self::args::remote_url(args, "url").await?;
            collaborators.git.add_remote(&workspace_id, &name, &url).await
        }
        "git_remove_remote" => {
            let workspace_id = self::args::workspace_id(args)?;
            let name = self::args::input_text(args, "name")?;
            collaborators.git.remove_remote(&workspace_id, &name).await
        }

        // Branch
        "git_checkout" => {
            let workspace_id = self::args::workspace_id(args)?;
            let branch = self::args::branch_or_name(args, "branch")?;
            let create_new = self::args::optional_bool(args, "create_new", false);
            let force = self::args::optional_bool(args, "force", false);
            collaborators.git.checkout(&workspace_id, &branch, create_new, force).await
        }
        "git_list_branches" => {
            let workspace_id = self::args::workspace_id(args)?;
            let local = self::args::optional_bool(args, "local", true);
            let remote = self::args::optional_bool(args, "remote", false);
            let all = self::args::optional_bool(args, "all", false);
            collaborators.git.list_branches(&workspace_id, local, remote, all).await
        }
        "git_create_branch" => {
            let workspace_id = self::args::workspace_id(args)?;
            let name = self::args::branch_or_name(args, "name")?;
            let revision = self::args::optional_input_text(args, "revision");
            let force = self::args::optional_bool(args, "force", false);
            collaborators
                .git
                .create_branch(&workspace_id, &name, revision.as_deref(), force)
                .await
        }
        "git_delete_branch" => {
            let workspace_id = self::args::workspace_id(args)?;
            let name = self::args::branch_or_name(args, "name")?;
            let force = self::args::optional_bool(args, "force", false);
            let remote = self::args::optional_bool(args, "remote", false);
            collaborators.git.delete_branch(&workspace_id, &name, force, remote).await
        }

        // Merge / rebase
        "git_merge" => {
            let workspace_id = self::args::workspace_id(args)?;
            let source_branch = self::args::branch_or_name(args, "source_branch")?;
            let fast_forward = self::args::optional_bool(args, "fast_forward", true);
            collaborators.git.merge(&workspace_id, &source_branch, fast_forward).await
        }
        "git_rebase" => {
            let workspace_id = self::args::workspace_id(args)?;
            let branch = self::args::optional_branch_or_name(args, "branch")?;
            let abort = self::args::optional_bool(args, "abort", false);
            let continue_rebase = self::args::optional_bool(args, "continue_rebase", false);
            collaborators
                .git
                .rebase(&workspace_id, branch.as_deref(), abort, continue_rebase)
                .await
        }

        // History
        "git_log" => {
            let workspace_id = self::args::workspace_id(args)?;
            let max_count = self::args::optional_i64(args, "max_count");
            let author = self::args::optional_input_text(args, "author");
            let all = self::args::optional_bool(args, "all", false);
            collaborators.git.log(&workspace_id, max_count, author.as_deref(), all).await
        }
        "git_show" => {
            let workspace_id = self::args::workspace_id(args)?;
            let revision = self::args::input_text(args, "revision")?;
            collaborators.git.show(&workspace_id, &revision).await
        }
        "git_diff" => {
            let workspace_id = self::args::workspace_id(args)?;
            let cached = self::args::optional_bool(args, "cached", false);
            let commit_oid = self::args::optional_input_text(args, "commit_oid");
            collaborators.git.diff(&workspace_id, cached, commit_oid.as_deref()).await
        }
        "git_blame" => {
            let workspace_id = self::args::workspace_id(args)?;
            let path = self::args::path(args, "path", workspace_root)?;
            collaborators.git.blame(&workspace_id, &path).await
        }

        // Stash
        "git_stash" => {
            let workspace_id = self::args::workspace_id(args)?;
            let save = self::args::optional_bool(args, "save", false);
            let pop = self::args::optional_bool(args, "pop", false);
            let apply = self::args::optional_bool(args, "apply", false);
            let drop = self::args::optional_bool(args, "drop", false);
            let message = self::args::optional_commit_message(args, "message");
            let include_untracked = self::args::optional_bool(args, "include_untracked", false);
            collaborators
                .git
                .stash(&workspace_id, save, pop, apply, drop, message.as_deref(), include_untracked)
                .await
        }
        "git_list_stash" => {
            let workspace_id = self::args::workspace_id(args)?;
            collaborators.git.list_stash(&workspace_id).await
        }

        // Tags
        "git_list_tags" => {
            let workspace_id = self::args::workspace_id(args)?;
            collaborators.git.list_tags(&workspace_id).await
        }
        "git_create_tag" => {
            let workspace_id = self::args::workspace_id(args)?;
            let name = self::args::branch_or_name(args, "name")?;
            let message = self::args::optional_commit_message(args, "message");
            let force = self::args::optional_bool(args, "force", false);
            collaborators
                .git
                .create_tag(&workspace_id, &name, message.as_deref(), force)
                .await
        }
        "git_delete_tag" => {
            let workspace_id = self::args::workspace_id(args)?;
            let name = self::args::branch_or_name(args, "name")?;
            collaborators.git.delete_tag(&workspace_id, &name).await
        }

        // LFS
        "git_lfs_init" => {
            let workspace_id = self::args::workspace_id(args)?;
            collaborators.git.lfs_init(&workspace_id).await
        }
        "git_lfs_track" => {
            let workspace_id = self::args::workspace_id(args)?;
            let patterns = self::args::string_array(args, "patterns")?;
            let lockable = self::args::optional_bool(args, "lockable", false);
            collaborators.git.lfs_track(&workspace_id, &patterns, lockable).await
        }
        "git_lfs_untrack" => {
            let workspace_id = self::args::workspace_id(args)?;
            let patterns = self::args::string_array(args, "patterns")?;
            collaborators.git.lfs_untrack(&workspace_id, &patterns).await
        }
        "git_lfs_status" => {
            let workspace_id = self::args::workspace_id(args)?;
            collaborators.git.lfs_status(&workspace_id).await
        }
        "git_lfs_pull" => {
            let workspace_id = self::args::workspace_id(args)?;
            collaborators.git.lfs_pull(&workspace_id).await
        }
        "git_lfs_push" => {
            let workspace_id = self::args::workspace_id(args)?;
            collaborators.git.lfs_push(&workspace_id).await
        }
        "git_lfs_fetch" => {
            let workspace_id = self::args::workspace_id(args)?;
            collaborators.git.lfs_fetch(&workspace_id).await
        }
        "git_lfs_install" => {
            let workspace_id = self::args::workspace_id(args)?;
            collaborators.git.lfs_install(&workspace_id).await
        }

        // Sparse checkout
        "git_sparse_checkout" => {
            let workspace_id = self::args::workspace_id(args)?;
            let paths = self::args::string_array(args, "paths")?;
            let mode_raw = self::args::optional_str(args, "mode").unwrap_or("replace");
            let mode = parse_sparse_mode(mode_raw)?;
            collaborators.git.sparse_checkout(&workspace_id, &paths, mode).await
        }

        // Submodules
        "git_submodule_add" => {
            let workspace_id = self::args::workspace_id(args)?;
            let path = self::args::path(args, "path", workspace_root)?;
            let url = self::args::remote_url(args, "url").await?;
            let name = self::args::optional_input_text(args, "name");
            let branch = self::args::optional_branch_or_name(args, "branch")?;
            let depth = self::args::optional_i64(args, "depth");
            collaborators
                .git
                .submodule_add(&workspace_id, &path, &url, name.as_deref(), branch.as_deref(), depth)
                .await
        }
        "git_submodule_update" => {
            let workspace_id = self::args::workspace_id(args)?;
            let name = self::args::optional_input_text(args, "name");
            let init = self::args::optional_bool(args, "init", true);
            collaborators.git.submodule_update(&workspace_id, name.as_deref(), init).await
        }
        "git_submodule_deinit" => {
            let workspace_id = self::args::workspace_id(args)?;
            let name = self::args::optional_input_text(args, "name");
            let force = self::args::optional_bool(args, "force", false);
            collaborators.git.submodule_deinit(&workspace_id, name.as_deref(), force).await
        }
        "git_submodule_list" => {
            let workspace_id = self::args::workspace_id(args)?;
            collaborators.git.submodule_list(&workspace_id).await
        }

        // Tasks: read queue/pool state rather than talk to Git.
        "git_get_task" => {
            let task_id = self::args::input_text(args, "task_id")?;
            let task = collaborators.tasks.get_task(&task_id).await?;
            Ok(task.unwrap_or(Value::Null))
        }
        "git_list_tasks" => {
            let status = self::args::optional_input_text(args, "status");
            let limit = self::args::optional_usize(args, "limit", 100);
            collaborators.tasks.list_tasks(status.as_deref(), limit).await
        }
        "git_cancel_task" => {
            let task_id = self::args::input_text(args, "task_id")?;
            let cancelled = collaborators.tasks.cancel_task(&task_id).await?;
            Ok(json!({ "cancelled": cancelled }))
        }

        other => Err(AppError::InvalidArgument(format!("unknown tool: {other}"))),
    }
}
