use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use gitforge_core::AuditEvent;

/// Line-delimited JSON file sink with size-based rotation. I/O
/// errors are logged, never propagated: a broken audit file must not take
/// down the caller.
pub struct FileSink {
    path: PathBuf,
    max_file_size_bytes: u64,
    backup_count: u32,
    write_lock: Mutex<()>,
}

impl FileSink {
    pub fn new(path: PathBuf, max_file_size_bytes: u64, backup_count: u32) -> Self {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                if let Err(e) = fs::create_dir_all(parent) {
                    tracing::error!(error = %e, path = %parent.display(), "failed to create audit log directory");
                }
            }
        }
        Self {
            path,
            max_file_size_bytes,
            backup_count,
            write_lock: Mutex::new(()),
        }
    }

    pub fn append(&self, event: &AuditEvent) {
        let _guard = self.write_lock.lock().unwrap();

        if let Ok(metadata) = fs::metadata(&self.path) {
            if metadata.len() >= self.max_file_size_bytes {
                self.rotate();
            }
        }

        let result = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .and_then(|mut file| writeln!(file, "{}", event.to_json_line()));

        if let Err(e) = result {
            tracing::error!(error = %e, path = %self.path.display(), "failed to write audit event to file");
        }
    }

    fn rotate(&self) {
        for n in (1..self.backup_count).rev() {
            let old = backup_path(&self.path, n);
            let new = backup_path(&self.path, n + 1);
            if old.exists() {
                if let Err(e) = fs::rename(&old, &new) {
                    tracing::error!(error = %e, "failed to shift audit log backup");
                }
            }
        }
        if self.path.exists() {
            if let Err(e) = fs::rename(&self.path, backup_path(&self.path, 1)) {
                tracing::error!(error = %e, "failed to rotate audit log file");
            } else {
                tracing::info!(path = %self.path.display(), "rotated audit log file");
            }
        }
    }
}

fn backup_path(path: &Path, n: u32) -> PathBuf {
    PathBuf::from(format!("{}.{n}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use gitforge_core::{AuditEventType, Severity};

    #[test]
    fn rotation_shifts_backups_and_preserves_newest_write() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.log");
        let sink = FileSink::new(path.clone(), 10, 3);

        for i in 0..5 {
            sink.append(&AuditEvent::new(AuditEventType::SystemStart, Severity::Info).with_detail("n", i.to_string()));
        }

        assert!(path.exists());
        let content = fs::read_to_string(&path).unwrap();
        assert!(!content.is_empty());
    }

    #[test]
    fn creates_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/sub/audit.log");
        let sink = FileSink::new(path.clone(), 1024 * 1024, 3);
        sink.append(&AuditEvent::new(AuditEventType::SystemStart, Severity::Info));
        assert!(path.exists());
    }
}
