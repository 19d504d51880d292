//! `SQLite` implementation of [`ActuatorRepository`].
//!
//! The derived format and profile columns are written for inspection only;
//! rows are rebuilt with [`Actuator::restore`], which derives them again from
//! the stored schema.

use std::str::FromStr;

use serde_json::Value;
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row};

use orchestrator_app::ports::ActuatorRepository;
use orchestrator_domain::actuator::Actuator;
use orchestrator_domain::error::InventoryError;
use orchestrator_domain::group::GroupKind;
use orchestrator_domain::id::{ActuatorId, DeviceId};

use crate::error::{StorageError, decode_error};
use crate::store::SqliteUnit;

/// Wrapper for converting database rows into domain [`Actuator`].
struct Wrapper(Actuator);

impl Wrapper {
    fn maybe(value: Option<Self>) -> Option<Actuator> {
        value.map(|w| w.0)
    }

    fn all(rows: Vec<Self>) -> Vec<Actuator> {
        rows.into_iter().map(|w| w.0).collect()
    }
}

impl<'r> FromRow<'r, SqliteRow> for Wrapper {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let id: String = row.try_get("id")?;
        let name: String = row.try_get("name")?;
        let device_id: Option<String> = row.try_get("device_id")?;
        let schema: String = row.try_get("schema")?;

        let id = ActuatorId::from_str(&id).map_err(decode_error)?;
        let device_id = device_id
            .map(|s| DeviceId::from_str(&s))
            .transpose()
            .map_err(decode_error)?;
        let schema: Value = serde_json::from_str(&schema).map_err(decode_error)?;

        Ok(Self(Actuator::restore(id, name, device_id, schema)))
    }
}

const INSERT: &str = "INSERT INTO actuators (id, name, device_id, schema, schema_format, profile) VALUES (?, ?, ?, ?, ?, ?)";
const SELECT_BY_ID: &str = "SELECT * FROM actuators WHERE id = ?";
const SELECT_BY_NAME: &str = "SELECT * FROM actuators WHERE name = ?";
const SELECT_ALL: &str = "SELECT * FROM actuators ORDER BY name";
const SELECT_BY_DEVICE: &str = "SELECT * FROM actuators WHERE device_id = ? ORDER BY name";
const UPDATE: &str = "UPDATE actuators SET name = ?, device_id = ?, schema = ?, schema_format = ?, profile = ? WHERE id = ?";
const DELETE_MEMBERSHIPS: &str = "DELETE FROM access_group_members WHERE kind = ? AND member_id = ?";
const DELETE_BY_ID: &str = "DELETE FROM actuators WHERE id = ?";

impl ActuatorRepository for SqliteUnit {
    async fn get_actuator(&mut self, id: ActuatorId) -> Result<Option<Actuator>, InventoryError> {
        let row: Option<Wrapper> = sqlx::query_as(SELECT_BY_ID)
            .bind(id.to_string())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(StorageError::from)?;

        Ok(Wrapper::maybe(row))
    }

    async fn find_actuator_by_name(
        &mut self,
        name: &str,
    ) -> Result<Option<Actuator>, InventoryError> {
        let row: Option<Wrapper> = sqlx::query_as(SELECT_BY_NAME)
            .bind(name)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(StorageError::from)?;

        Ok(Wrapper::maybe(row))
    }

    async fn list_actuators(&mut self) -> Result<Vec<Actuator>, InventoryError> {
        let rows: Vec<Wrapper> = sqlx::query_as(SELECT_ALL)
            .fetch_all(&mut *self.tx)
            .await
            .map_err(StorageError::from)?;

        Ok(Wrapper::all(rows))
    }

    async fn actuators_on_device(&mut self, device: DeviceId) -> Result<Vec<Actuator>, InventoryError> {
        let rows: Vec<Wrapper> = sqlx::query_as(SELECT_BY_DEVICE)
            .bind(device.to_string())
            .fetch_all(&mut *self.tx)
            .await
            .map_err(StorageError::from)?;

        Ok(Wrapper::all(rows))
    }

    async fn insert_actuator(&mut self, actuator: &Actuator) -> Result<(), InventoryError> {
        let schema = serde_json::to_string(actuator.schema()).map_err(StorageError::from)?;
        sqlx::query(INSERT)
            .bind(actuator.id.to_string())
            .bind(&actuator.name)
            .bind(actuator.device_id.map(|id| id.to_string()))
            .bind(schema)
            .bind(actuator.schema_format().as_str())
            .bind(actuator.profile())
            .execute(&mut *self.tx)
            .await
            .map_err(StorageError::from)?;

        Ok(())
    }

    async fn update_actuator(&mut self, actuator: &Actuator) -> Result<(), InventoryError> {
        let schema = serde_json::to_string(actuator.schema()).map_err(StorageError::from)?;
        sqlx::query(UPDATE)
            .bind(&actuator.name)
            .bind(actuator.device_id.map(|id| id.to_string()))
            .bind(schema)
            .bind(actuator.schema_format().as_str())
            .bind(actuator.profile())
            .bind(actuator.id.to_string())
            .execute(&mut *self.tx)
            .await
            .map_err(StorageError::from)?;

        Ok(())
    }

    async fn delete_actuator(&mut self, id: ActuatorId) -> Result<(), InventoryError> {
        sqlx::query(DELETE_MEMBERSHIPS)
            .bind(GroupKind::Actuator.as_str())
            .bind(id.to_string())
            .execute(&mut *self.tx)
            .await
            .map_err(StorageError::from)?;

        // Profile memberships cascade.
        sqlx::query(DELETE_BY_ID)
            .bind(id.to_string())
            .execute(&mut *self.tx)
            .await
            .map_err(StorageError::from)?;

        Ok(())
    }
}
