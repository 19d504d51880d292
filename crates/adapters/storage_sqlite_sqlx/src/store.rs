//! `SQLite` implementation of [`InventoryStore`] and [`UnitOfWork`].
//!
//! Each unit of work is one sqlx transaction. The repository traits are
//! implemented for [`SqliteUnit`] in the `*_repo` modules.

use std::future::Future;

use sqlx::{Sqlite, SqlitePool, Transaction};

use orchestrator_app::ports::{InventoryStore, UnitOfWork};
use orchestrator_domain::error::InventoryError;

use crate::error::StorageError;

/// `SQLite`-backed inventory store.
#[derive(Debug, Clone)]
pub struct SqliteInventoryStore {
    pool: SqlitePool,
}

impl SqliteInventoryStore {
    /// Create a new store using the given connection pool.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl InventoryStore for SqliteInventoryStore {
    type Unit = SqliteUnit;

    fn begin(&self) -> impl Future<Output = Result<SqliteUnit, InventoryError>> + Send {
        let pool = self.pool.clone();
        async move {
            let tx = pool.begin().await.map_err(StorageError::from)?;
            Ok(SqliteUnit { tx })
        }
    }
}

/// A unit of work over [`SqliteInventoryStore`].
///
/// Dropping the unit without committing rolls the transaction back.
#[derive(Debug)]
pub struct SqliteUnit {
    pub(crate) tx: Transaction<'static, Sqlite>,
}

impl UnitOfWork for SqliteUnit {
    async fn commit(self) -> Result<(), InventoryError> {
        self.tx.commit().await.map_err(StorageError::from)?;
        Ok(())
    }

    async fn rollback(self) -> Result<(), InventoryError> {
        self.tx.rollback().await.map_err(StorageError::from)?;
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::pool::Config;
    use orchestrator_app::ports::DeviceRepository;
    use orchestrator_domain::device::Device;

    pub(crate) async fn setup() -> SqliteInventoryStore {
        Config {
            database_url: "sqlite::memory:".to_string(),
            max_connections: 1,
        }
        .build()
        .await
        .unwrap()
        .inventory_store()
    }

    #[tokio::test]
    async fn should_expose_committed_writes_to_later_units() {
        let store = setup().await;
        let device = Device::builder().name("plc").build().unwrap();

        let mut unit = store.begin().await.unwrap();
        unit.insert_device(&device).await.unwrap();
        unit.commit().await.unwrap();

        let mut unit = store.begin().await.unwrap();
        assert_eq!(unit.get_device(device.id).await.unwrap(), Some(device));
    }

    #[tokio::test]
    async fn should_discard_writes_when_rolled_back() {
        let store = setup().await;
        let device = Device::builder().name("plc").build().unwrap();

        let mut unit = store.begin().await.unwrap();
        unit.insert_device(&device).await.unwrap();
        unit.rollback().await.unwrap();

        let mut unit = store.begin().await.unwrap();
        assert!(unit.get_device(device.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn should_discard_writes_when_dropped() {
        let store = setup().await;
        let device = Device::builder().name("plc").build().unwrap();

        {
            let mut unit = store.begin().await.unwrap();
            unit.insert_device(&device).await.unwrap();
        }

        let mut unit = store.begin().await.unwrap();
        assert!(unit.list_devices().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn should_report_duplicate_device_name_as_conflict() {
        let store = setup().await;
        let mut unit = store.begin().await.unwrap();
        unit.insert_device(&Device::builder().name("plc").build().unwrap())
            .await
            .unwrap();

        let result = unit
            .insert_device(&Device::builder().name("plc").build().unwrap())
            .await;
        assert!(matches!(result, Err(InventoryError::Conflict(_))));
    }
}
