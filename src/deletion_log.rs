use std::io;
use std::path::{Path, PathBuf};

use chrono::Utc;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::dto::ContactDto;

/// Append-only audit trail of successful contact deletions, independent of
/// the transactional store. One human-readable line per deletion.
///
/// Writers are serialized: the mutex is held across the whole
/// open-append-flush sequence, so concurrent deletions can never interleave
/// or tear a line. Append failures propagate to the caller.
#[derive(Debug)]
pub struct DeletionLog {
    path: PathBuf,
    writer: Mutex<()>,
}

impl DeletionLog {
    /// Creates the parent directory if needed. A directory that cannot be
    /// created makes startup fail.
    pub fn new(path: impl Into<PathBuf>) -> io::Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|err| {
                    tracing::error!(path = %path.display(), error = %err,
                        "failed to create deletion log directory");
                    err
                })?;
            }
        }
        Ok(DeletionLog {
            path,
            writer: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn log_deletion(&self, contact: &ContactDto) -> io::Result<()> {
        let _guard = self.writer.lock().await;

        let phones = contact
            .phones
            .iter()
            .map(|p| p.phone_number.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        let entry = format!(
            "[{}] Contact deleted: ID={}, Name={}, Age={}, Phones=[{}]\n",
            Utc::now().format("%Y-%m-%d %H:%M:%S"),
            contact.id,
            contact.name,
            contact.age,
            phones,
        );

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(entry.as_bytes()).await?;
        file.flush().await?;

        tracing::info!(contact_id = contact.id, "logged deletion");
        Ok(())
    }
}
