use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use uuid::Uuid;

use crate::error::AppError;
use crate::services::render::RenderedDocument;

struct PendingDownload {
    owner_id: Uuid,
    document: RenderedDocument,
    expires_at: Instant,
}

/// 一度だけ取り出せるダウンロードハンドルの保管庫
///
/// ハンドルはランダムな UUID。取り出し（`take`）で削除され、TTL を過ぎたものは
/// 取り出せない。期限切れエントリは `purge_expired` で掃除する。
pub struct DownloadStore {
    ttl: Duration,
    entries: Mutex<HashMap<Uuid, PendingDownload>>,
}

impl DownloadStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn lock(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, HashMap<Uuid, PendingDownload>>, AppError> {
        self.entries
            .lock()
            .map_err(|_| AppError::Internal(anyhow::anyhow!("download store lock poisoned")))
    }

    /// ファイルを預けてハンドルを返す
    pub fn insert(&self, owner_id: Uuid, document: RenderedDocument) -> Result<Uuid, AppError> {
        let handle = Uuid::new_v4();
        let pending = PendingDownload {
            owner_id,
            document,
            expires_at: Instant::now() + self.ttl,
        };
        self.lock()?.insert(handle, pending);
        tracing::debug!(handle = %handle, owner_id = %owner_id, "ダウンロードハンドル発行");
        Ok(handle)
    }

    /// ハンドルに対応するファイルを取り出す（一度きり）
    ///
    /// 所有者以外は `allow_any_owner` が真の場合のみ取り出せる。
    /// 所有者不一致の場合はエントリを残したまま `None` を返す
    pub fn take(
        &self,
        handle: Uuid,
        requester_id: Uuid,
        allow_any_owner: bool,
    ) -> Result<Option<RenderedDocument>, AppError> {
        let mut entries = self.lock()?;

        let Some(pending) = entries.get(&handle) else {
            return Ok(None);
        };
        if pending.expires_at <= Instant::now() {
            entries.remove(&handle);
            return Ok(None);
        }
        if pending.owner_id != requester_id && !allow_any_owner {
            return Ok(None);
        }

        Ok(entries.remove(&handle).map(|p| p.document))
    }

    /// 期限切れエントリを削除し、削除件数を返す
    pub fn purge_expired(&self) -> Result<usize, AppError> {
        let mut entries = self.lock()?;
        let before = entries.len();
        let now = Instant::now();
        entries.retain(|_, pending| pending.expires_at > now);
        Ok(before - entries.len())
    }

    pub fn len(&self) -> usize {
        self.lock().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
