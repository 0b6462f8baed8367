use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;

use memotrack_core::error::{MemoTrackError, Result};

use super::{ActiveMemoSource, MemoStore};
use crate::memo::model::{check_accept, check_archive, check_assign, Memo, MemoStats, MemoStatus, NewMemo};

/// `DashMap`-backed store. Each transition holds the memo's shard lock while
/// it checks and mutates, so concurrent accepts cannot both succeed.
pub struct InMemoryMemoStore {
    memos: DashMap<i64, Memo>,
    next_id: AtomicI64,
}

impl Default for InMemoryMemoStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryMemoStore {
    pub fn new() -> Self {
        Self {
            memos: DashMap::new(),
            next_id: AtomicI64::new(1),
        }
    }

    fn update<F>(&self, id: i64, f: F) -> Result<Memo>
    where
        F: FnOnce(&mut Memo) -> Result<()>,
    {
        let mut entry = self
            .memos
            .get_mut(&id)
            .ok_or_else(|| MemoTrackError::NotFound(format!("memo {id}")))?;
        f(entry.value_mut())?;
        Ok(entry.value().clone())
    }
}

#[async_trait]
impl ActiveMemoSource for InMemoryMemoStore {
    async fn count_active_memos(&self) -> Result<i64> {
        Ok(self
            .memos
            .iter()
            .filter(|m| m.value().status == MemoStatus::Active)
            .count() as i64)
    }
}

#[async_trait]
impl MemoStore for InMemoryMemoStore {
    async fn create_memo(&self, new: NewMemo) -> Result<Memo> {
        new.validate()?;
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let memo = Memo {
            id,
            title: new.title,
            body: new.body,
            author: new.author,
            assignee: new.assignee,
            status: MemoStatus::Active,
            created_at: Utc::now(),
            accepted_at: None,
        };
        self.memos.insert(id, memo.clone());
        Ok(memo)
    }

    async fn get_memo(&self, id: i64) -> Result<Memo> {
        self.memos
            .get(&id)
            .map(|m| m.value().clone())
            .ok_or_else(|| MemoTrackError::NotFound(format!("memo {id}")))
    }

    async fn assign_memo(&self, id: i64, assignee: &str) -> Result<Memo> {
        self.update(id, |m| {
            check_assign(m, assignee)?;
            m.assignee = Some(assignee.to_string());
            Ok(())
        })
    }

    async fn accept_memo(&self, id: i64, user: &str) -> Result<Memo> {
        self.update(id, |m| {
            check_accept(m, user)?;
            m.status = MemoStatus::Accepted;
            m.accepted_at = Some(Utc::now());
            Ok(())
        })
    }

    async fn archive_memo(&self, id: i64) -> Result<Memo> {
        self.update(id, |m| {
            check_archive(m)?;
            m.status = MemoStatus::Archived;
            Ok(())
        })
    }

    async fn stats(&self) -> Result<MemoStats> {
        let mut stats = MemoStats::default();
        for m in self.memos.iter() {
            stats.total += 1;
            match m.value().status {
                MemoStatus::Active => stats.active += 1,
                MemoStatus::Accepted => stats.accepted += 1,
                MemoStatus::Archived => stats.archived += 1,
            }
        }
        Ok(stats)
    }
}
