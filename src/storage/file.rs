//! JSON file implementation of BotStorage.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::{fs, task};
use tracing::{debug, info, warn};

use crate::domain::{BotInfo, BotRecord, Fields};
use crate::storage::{BotStorage, StorageDocument, StorageError};

/// Name of the document inside the storage directory.
pub const STORAGE_FILENAME: &str = "trading_bots_storage.json";

/// Advisory lock file that serializes writers across handles and processes.
pub const LOCK_FILENAME: &str = "trading_bots_storage.json.lock";

const TMP_PREFIX: &str = ".trading_bots_storage.";
const TMP_SUFFIX: &str = ".tmp";

/// FileBotStorage implements BotStorage on top of a single JSON document.
///
/// Every call re-reads the document. Mutations run load, modify and save
/// while holding both an in-process mutex and an exclusive lock on
/// `LOCK_FILENAME`, so handles in different tasks or processes never
/// interleave their writes. Saves go through a uniquely named temporary
/// file that is renamed over the document, so readers only ever see a
/// complete old or new version.
pub struct FileBotStorage {
    dir: PathBuf,
    path: PathBuf,
    lock_path: PathBuf,
    write_lock: Mutex<()>,
    closed: AtomicBool,
}

impl FileBotStorage {
    /// Opens the storage in `dir`, creating the directory and an empty document if needed.
    ///
    /// Fails with `StorageError::Init` if the directory cannot be created or
    /// written to, even when a document already exists there.
    pub async fn create(dir: impl AsRef<Path>) -> Result<Self, StorageError> {
        let dir = dir.as_ref();
        let init_error = |source: std::io::Error| StorageError::Init {
            path: dir.display().to_string(),
            source,
        };

        fs::create_dir_all(dir).await.map_err(init_error)?;

        let storage = Self {
            dir: dir.to_path_buf(),
            path: dir.join(STORAGE_FILENAME),
            lock_path: dir.join(LOCK_FILENAME),
            write_lock: Mutex::new(()),
            closed: AtomicBool::new(false),
        };

        let _lock = storage.lock_document().await.map_err(init_error)?;

        if fs::try_exists(&storage.path).await.map_err(init_error)? {
            let document = storage.load().await?;
            storage.check_writable().await.map_err(init_error)?;
            info!(
                path = %storage.path.display(),
                bots = document.bots.len(),
                "Bot storage opened"
            );
        } else {
            storage
                .write_atomic(StorageDocument::default().to_json()?)
                .await
                .map_err(init_error)?;
            info!(path = %storage.path.display(), "Bot storage initialized");
        }

        Ok(storage)
    }

    /// Path of the backing document.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn ensure_open(&self) -> Result<(), StorageError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(StorageError::Closed);
        }
        Ok(())
    }

    /// Takes the exclusive lock on the lock file. Dropping the file releases it.
    async fn lock_document(&self) -> std::io::Result<File> {
        let lock_path = self.lock_path.clone();

        task::spawn_blocking(move || {
            let file = OpenOptions::new()
                .create(true)
                .truncate(false)
                .write(true)
                .open(&lock_path)?;
            file.lock()?;
            Ok(file)
        })
        .await
        .map_err(std::io::Error::other)?
    }

    /// Creates and discards a temporary file next to the document.
    async fn check_writable(&self) -> std::io::Result<()> {
        let dir = self.dir.clone();

        task::spawn_blocking(move || temp_file_in(&dir).map(drop))
            .await
            .map_err(std::io::Error::other)?
    }

    async fn load(&self) -> Result<StorageDocument, StorageError> {
        let json = fs::read_to_string(&self.path).await?;
        StorageDocument::from_json(&self.path.display().to_string(), &json)
    }

    async fn save(&self, document: &StorageDocument) -> Result<(), StorageError> {
        self.write_atomic(document.to_json()?).await?;

        debug!(
            path = %self.path.display(),
            bots = document.bots.len(),
            "Storage document saved"
        );
        Ok(())
    }

    async fn write_atomic(&self, json: String) -> std::io::Result<()> {
        let dir = self.dir.clone();
        let path = self.path.clone();

        let result = task::spawn_blocking(move || write_document(&dir, &path, &json))
            .await
            .map_err(std::io::Error::other)
            .and_then(|result| result);

        if let Err(ref e) = result {
            warn!(path = %self.path.display(), error = %e, "Storage write failed");
        }
        result
    }

    /// Runs one read-modify-write cycle while holding both write locks.
    ///
    /// The document is saved only if `apply` succeeds.
    async fn modify<T, F>(&self, apply: F) -> Result<T, StorageError>
    where
        F: FnOnce(&mut StorageDocument) -> Result<T, StorageError> + Send,
        T: Send,
    {
        let _guard = self.write_lock.lock().await;
        self.ensure_open()?;
        let _lock = self.lock_document().await?;

        let mut document = self.load().await?;
        let output = apply(&mut document)?;
        self.save(&document).await?;
        Ok(output)
    }
}

fn temp_file_in(dir: &Path) -> std::io::Result<tempfile::NamedTempFile> {
    tempfile::Builder::new()
        .prefix(TMP_PREFIX)
        .suffix(TMP_SUFFIX)
        .tempfile_in(dir)
}

/// Writes `json` to a fresh temporary file in `dir`, syncs it, renames it
/// over `path` and syncs `dir` so the rename itself is durable.
///
/// On failure the temporary file is removed and `path` is left as it was.
pub(crate) fn write_document(dir: &Path, path: &Path, json: &str) -> std::io::Result<()> {
    let mut tmp = temp_file_in(dir)?;
    tmp.write_all(json.as_bytes())?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    sync_dir(dir)
}

#[cfg(unix)]
fn sync_dir(dir: &Path) -> std::io::Result<()> {
    File::open(dir)?.sync_all()
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> std::io::Result<()> {
    Ok(())
}

#[async_trait]
impl BotStorage for FileBotStorage {
    async fn put_bot(&self, payload: &Fields) -> Result<String, StorageError> {
        let (bot, config) = BotInfo::split_registration(payload)?;
        let id = bot.id.clone();

        self.modify(move |document| {
            if document.bot(&bot.id).is_some() {
                warn!(bot_id = %bot.id, "Replacing existing bot");
            }
            document.insert_bot(bot, config);
            Ok(())
        })
        .await?;

        debug!(bot_id = %id, "Bot registered");
        Ok(id)
    }

    async fn get_bot_by_id(&self, id: &str) -> Result<BotRecord, StorageError> {
        self.ensure_open()?;
        self.load().await?.record(id)
    }

    async fn get_active_bot_by_exchange_and_pair(
        &self,
        exchange: &str,
        pair: &str,
    ) -> Result<Option<BotRecord>, StorageError> {
        self.ensure_open()?;
        let document = self.load().await?;

        match document.active_bot(exchange, pair) {
            Some(bot) => Ok(Some(document.record(&bot.id)?)),
            None => Ok(None),
        }
    }

    async fn get_bots_list(&self) -> Result<Vec<BotInfo>, StorageError> {
        self.ensure_open()?;
        Ok(self.load().await?.bots)
    }

    async fn delete_bot(&self, id: &str) -> Result<(), StorageError> {
        self.modify(|document| document.remove_bot(id)).await?;
        debug!(bot_id = %id, "Bot deleted");
        Ok(())
    }

    async fn update_bot_state(&self, id: &str, patch: &Fields) -> Result<(), StorageError> {
        self.modify(|document| document.merge_state(id, patch)).await?;
        debug!(bot_id = %id, keys = patch.len(), "Bot state updated");
        Ok(())
    }

    async fn update_bot_config(&self, id: &str, patch: &Fields) -> Result<(), StorageError> {
        self.modify(|document| document.merge_config(id, patch)).await?;
        debug!(bot_id = %id, keys = patch.len(), "Bot config updated");
        Ok(())
    }

    async fn update_bot_status(&self, id: &str, status: &str) -> Result<(), StorageError> {
        self.modify(|document| document.set_status(id, status)).await?;
        debug!(bot_id = %id, status = %status, "Bot status updated");
        Ok(())
    }

    async fn close(&self) -> Result<(), StorageError> {
        // Wait for an in-flight mutation before marking the handle closed
        let _guard = self.write_lock.lock().await;
        if !self.closed.swap(true, Ordering::SeqCst) {
            info!(path = %self.path.display(), "Bot storage closed");
        }
        Ok(())
    }
}
