//! `SQLite` implementation of [`DeviceRepository`].

use std::str::FromStr;

use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row};

use orchestrator_app::ports::DeviceRepository;
use orchestrator_domain::device::Device;
use orchestrator_domain::error::InventoryError;
use orchestrator_domain::group::GroupKind;
use orchestrator_domain::id::DeviceId;

use crate::error::{StorageError, decode_error};
use crate::store::SqliteUnit;

/// Wrapper for converting database rows into domain [`Device`].
struct Wrapper(Device);

impl Wrapper {
    fn maybe(value: Option<Self>) -> Option<Device> {
        value.map(|w| w.0)
    }
}

impl<'r> FromRow<'r, SqliteRow> for Wrapper {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let id: String = row.try_get("id")?;
        let name: String = row.try_get("name")?;
        let note: Option<String> = row.try_get("note")?;
        let multi_actuator: bool = row.try_get("multi_actuator")?;

        let id = DeviceId::from_str(&id).map_err(decode_error)?;

        Ok(Self(Device {
            id,
            name,
            note,
            multi_actuator,
        }))
    }
}

const INSERT: &str = "INSERT INTO devices (id, name, note, multi_actuator) VALUES (?, ?, ?, ?)";
const SELECT_BY_ID: &str = "SELECT * FROM devices WHERE id = ?";
const SELECT_BY_NAME: &str = "SELECT * FROM devices WHERE name = ?";
const SELECT_ALL: &str = "SELECT * FROM devices ORDER BY name";
const UPDATE: &str = "UPDATE devices SET name = ?, note = ?, multi_actuator = ? WHERE id = ?";
const DELETE_MEMBERSHIPS: &str = "DELETE FROM access_group_members WHERE kind = ? AND member_id = ?";
const DELETE_HOSTED_MEMBERSHIPS: &str = "DELETE FROM access_group_members \
    WHERE kind = ? AND member_id IN (SELECT id FROM actuators WHERE device_id = ?)";
const DELETE_BY_ID: &str = "DELETE FROM devices WHERE id = ?";

impl DeviceRepository for SqliteUnit {
    async fn get_device(&mut self, id: DeviceId) -> Result<Option<Device>, InventoryError> {
        let row: Option<Wrapper> = sqlx::query_as(SELECT_BY_ID)
            .bind(id.to_string())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(StorageError::from)?;

        Ok(Wrapper::maybe(row))
    }

    async fn find_device_by_name(&mut self, name: &str) -> Result<Option<Device>, InventoryError> {
        let row: Option<Wrapper> = sqlx::query_as(SELECT_BY_NAME)
            .bind(name)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(StorageError::from)?;

        Ok(Wrapper::maybe(row))
    }

    async fn list_devices(&mut self) -> Result<Vec<Device>, InventoryError> {
        let rows: Vec<Wrapper> = sqlx::query_as(SELECT_ALL)
            .fetch_all(&mut *self.tx)
            .await
            .map_err(StorageError::from)?;

        Ok(rows.into_iter().map(|w| w.0).collect())
    }

    async fn insert_device(&mut self, device: &Device) -> Result<(), InventoryError> {
        sqlx::query(INSERT)
            .bind(device.id.to_string())
            .bind(&device.name)
            .bind(&device.note)
            .bind(device.multi_actuator)
            .execute(&mut *self.tx)
            .await
            .map_err(StorageError::from)?;

        Ok(())
    }

    async fn update_device(&mut self, device: &Device) -> Result<(), InventoryError> {
        sqlx::query(UPDATE)
            .bind(&device.name)
            .bind(&device.note)
            .bind(device.multi_actuator)
            .bind(device.id.to_string())
            .execute(&mut *self.tx)
            .await
            .map_err(StorageError::from)?;

        Ok(())
    }

    async fn delete_device(&mut self, id: DeviceId) -> Result<(), InventoryError> {
        sqlx::query(DELETE_MEMBERSHIPS)
            .bind(GroupKind::Device.as_str())
            .bind(id.to_string())
            .execute(&mut *self.tx)
            .await
            .map_err(StorageError::from)?;
        sqlx::query(DELETE_HOSTED_MEMBERSHIPS)
            .bind(GroupKind::Actuator.as_str())
            .bind(id.to_string())
            .execute(&mut *self.tx)
            .await
            .map_err(StorageError::from)?;

        // Transport links and hosted actuators (with their profile memberships) cascade.
        sqlx::query(DELETE_BY_ID)
            .bind(id.to_string())
            .execute(&mut *self.tx)
            .await
            .map_err(StorageError::from)?;

        Ok(())
    }
}
