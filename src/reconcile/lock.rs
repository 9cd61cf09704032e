// ABOUTME: Table lock bracketing for the snapshot-read and apply window
// ABOUTME: Optional source READ lock, optional target WRITE lock, UNLOCK on target

use crate::error::{ReconcileError, Side};
use crate::store::RecordStore;
use crate::utils::quote_mysql_ident;

pub const UNLOCK_TABLES: &str = "UNLOCK TABLES";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockState {
    Unlocked,
    SourceReadLocked,
    TargetWriteLocked,
}

/// Drives the lock statements for one table.
///
/// Every unlock goes to the target connection. A READ lock taken on the
/// source is therefore never released here; it stays with the source
/// connection until that connection takes another lock or closes.
/// `source_lock_outstanding` tracks that case.
#[derive(Debug)]
pub struct LockCoordinator {
    table: String,
    read_lock: bool,
    write_lock: bool,
    state: LockState,
    source_lock_outstanding: bool,
}

impl LockCoordinator {
    pub fn new(table: &str, read_lock: bool, write_lock: bool) -> Self {
        Self {
            table: table.to_string(),
            read_lock,
            write_lock,
            state: LockState::Unlocked,
            source_lock_outstanding: false,
        }
    }

    pub fn state(&self) -> LockState {
        self.state
    }

    /// Whether a source READ lock from this table may still be held.
    pub fn source_lock_outstanding(&self) -> bool {
        self.source_lock_outstanding
    }

    /// Before any snapshot is read: READ-lock the source table if requested.
    pub async fn acquire_source<S>(&mut self, source: &mut S) -> Result<(), ReconcileError>
    where
        S: RecordStore,
    {
        if !self.read_lock {
            return Ok(());
        }
        let statement = format!("LOCK TABLES {} READ", quote_mysql_ident(&self.table));
        self.run(source, Side::Source, statement).await?;
        self.state = LockState::SourceReadLocked;
        self.source_lock_outstanding = true;
        Ok(())
    }

    /// After both snapshots are read: WRITE-lock the target, or, when only the
    /// source was locked, issue UNLOCK TABLES on the target connection.
    pub async fn before_apply<T>(&mut self, target: &mut T) -> Result<(), ReconcileError>
    where
        T: RecordStore,
    {
        if self.write_lock {
            let statement = format!("LOCK TABLES {} WRITE", quote_mysql_ident(&self.table));
            self.run(target, Side::Target, statement).await?;
            self.state = LockState::TargetWriteLocked;
        } else if self.state == LockState::SourceReadLocked {
            self.run(target, Side::Target, UNLOCK_TABLES.to_string())
                .await?;
            self.state = LockState::Unlocked;
        }
        Ok(())
    }

    /// After the deletion and upsert passes.
    pub async fn release<T>(&mut self, target: &mut T) -> Result<(), ReconcileError>
    where
        T: RecordStore,
    {
        if self.read_lock || self.write_lock {
            self.run(target, Side::Target, UNLOCK_TABLES.to_string())
                .await?;
        }
        self.state = LockState::Unlocked;
        Ok(())
    }

    async fn run<S>(
        &self,
        store: &mut S,
        side: Side,
        statement: String,
    ) -> Result<(), ReconcileError>
    where
        S: RecordStore,
    {
        tracing::debug!("{} on {}", statement, side);
        store
            .execute(&statement)
            .await
            .map_err(|source| ReconcileError::Lock {
                side,
                table: self.table.clone(),
                statement,
                source,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn test_no_locks_requested() {
        let mut source = MemoryStore::new();
        let mut target = MemoryStore::new();
        let mut locks = LockCoordinator::new("t", false, false);

        locks.acquire_source(&mut source).await.unwrap();
        locks.before_apply(&mut target).await.unwrap();
        locks.release(&mut target).await.unwrap();

        assert!(source.statements().is_empty());
        assert!(target.statements().is_empty());
        assert_eq!(locks.state(), LockState::Unlocked);
    }

    #[tokio::test]
    async fn test_read_lock_only_unlocks_on_target() {
        let mut source = MemoryStore::new();
        let mut target = MemoryStore::new();
        let mut locks = LockCoordinator::new("t", true, false);

        locks.acquire_source(&mut source).await.unwrap();
        assert_eq!(locks.state(), LockState::SourceReadLocked);

        locks.before_apply(&mut target).await.unwrap();
        assert_eq!(locks.state(), LockState::Unlocked);
        locks.release(&mut target).await.unwrap();

        assert_eq!(source.statements(), &["LOCK TABLES `t` READ".to_string()]);
        assert_eq!(
            target.statements(),
            &[UNLOCK_TABLES.to_string(), UNLOCK_TABLES.to_string()]
        );
        assert!(locks.source_lock_outstanding());
    }

    #[tokio::test]
    async fn test_write_lock() {
        let mut source = MemoryStore::new();
        let mut target = MemoryStore::new();
        let mut locks = LockCoordinator::new("t", false, true);

        locks.acquire_source(&mut source).await.unwrap();
        locks.before_apply(&mut target).await.unwrap();
        assert_eq!(locks.state(), LockState::TargetWriteLocked);
        locks.release(&mut target).await.unwrap();

        assert!(source.statements().is_empty());
        assert_eq!(
            target.statements(),
            &["LOCK TABLES `t` WRITE".to_string(), UNLOCK_TABLES.to_string()]
        );
        assert_eq!(locks.state(), LockState::Unlocked);
    }

    #[tokio::test]
    async fn test_both_locks() {
        let mut source = MemoryStore::new();
        let mut target = MemoryStore::new();
        let mut locks = LockCoordinator::new("t", true, true);

        locks.acquire_source(&mut source).await.unwrap();
        locks.before_apply(&mut target).await.unwrap();
        locks.release(&mut target).await.unwrap();

        assert_eq!(source.statements(), &["LOCK TABLES `t` READ".to_string()]);
        assert_eq!(
            target.statements(),
            &["LOCK TABLES `t` WRITE".to_string(), UNLOCK_TABLES.to_string()]
        );
    }

    #[tokio::test]
    async fn test_lock_failure_is_lock_error() {
        let mut source = MemoryStore::new().fail_statement("LOCK TABLES `t` READ");
        let mut locks = LockCoordinator::new("t", true, false);

        let err = locks.acquire_source(&mut source).await.unwrap_err();
        assert!(matches!(err, ReconcileError::Lock { side: Side::Source, .. }));
        assert_eq!(locks.state(), LockState::Unlocked);
    }
}
