//! `SQLite` implementation of [`ProfileRepository`].

use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;

use orchestrator_app::ports::ProfileRepository;
use orchestrator_domain::error::{ConsistencyError, InventoryError};
use orchestrator_domain::group::ActuatorProfile;
use orchestrator_domain::id::ActuatorId;

use crate::error::{StorageError, decode_error};
use crate::store::SqliteUnit;

const SELECT_GROUP: &str = "SELECT name FROM actuator_profiles WHERE name = ?";
const SELECT_MEMBERS: &str = "SELECT actuator_id FROM profile_members WHERE profile = ?";
const SELECT_ALL: &str = "SELECT p.name, m.actuator_id FROM actuator_profiles p LEFT JOIN profile_members m ON m.profile = p.name ORDER BY p.name";
const SELECT_PROFILES_OF: &str =
    "SELECT profile FROM profile_members WHERE actuator_id = ? ORDER BY profile";
const INSERT_GROUP: &str = "INSERT INTO actuator_profiles (name) VALUES (?) ON CONFLICT (name) DO NOTHING";
const DELETE_GROUP: &str = "DELETE FROM actuator_profiles WHERE name = ?";
// Only an exact duplicate is ignored; a membership in another group still
// violates the UNIQUE actuator_id column.
const INSERT_MEMBER: &str = "INSERT INTO profile_members (profile, actuator_id) VALUES (?, ?) ON CONFLICT (profile, actuator_id) DO NOTHING";
const DELETE_MEMBER: &str = "DELETE FROM profile_members WHERE profile = ? AND actuator_id = ?";

fn parse_actuator(value: &str) -> Result<ActuatorId, InventoryError> {
    ActuatorId::from_str(value).map_err(|err| StorageError::from(decode_error(err)).into())
}

impl SqliteUnit {
    async fn profile_group_exists(&mut self, name: &str) -> Result<bool, InventoryError> {
        let row: Option<(String,)> = sqlx::query_as(SELECT_GROUP)
            .bind(name)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(StorageError::from)?;

        Ok(row.is_some())
    }
}

impl ProfileRepository for SqliteUnit {
    async fn get_profile_group(
        &mut self,
        name: &str,
    ) -> Result<Option<ActuatorProfile>, InventoryError> {
        if !self.profile_group_exists(name).await? {
            return Ok(None);
        }
        let rows: Vec<(String,)> = sqlx::query_as(SELECT_MEMBERS)
            .bind(name)
            .fetch_all(&mut *self.tx)
            .await
            .map_err(StorageError::from)?;

        Ok(Some(ActuatorProfile {
            name: name.to_string(),
            actuators: rows
                .iter()
                .map(|(id,)| parse_actuator(id))
                .collect::<Result<_, _>>()?,
        }))
    }

    async fn list_profile_groups(&mut self) -> Result<Vec<ActuatorProfile>, InventoryError> {
        let rows: Vec<(String, Option<String>)> = sqlx::query_as(SELECT_ALL)
            .fetch_all(&mut *self.tx)
            .await
            .map_err(StorageError::from)?;

        let mut groups: BTreeMap<String, ActuatorProfile> = BTreeMap::new();
        for (name, member) in rows {
            let group = groups
                .entry(name.clone())
                .or_insert_with(|| ActuatorProfile {
                    name,
                    actuators: BTreeSet::new(),
                });
            if let Some(member) = member {
                group.actuators.insert(parse_actuator(&member)?);
            }
        }
        Ok(groups.into_values().collect())
    }

    async fn profiles_of(&mut self, actuator: ActuatorId) -> Result<Vec<String>, InventoryError> {
        let rows: Vec<(String,)> = sqlx::query_as(SELECT_PROFILES_OF)
            .bind(actuator.to_string())
            .fetch_all(&mut *self.tx)
            .await
            .map_err(StorageError::from)?;

        Ok(rows.into_iter().map(|(name,)| name).collect())
    }

    async fn ensure_profile_group(&mut self, name: &str) -> Result<bool, InventoryError> {
        let result = sqlx::query(INSERT_GROUP)
            .bind(name)
            .execute(&mut *self.tx)
            .await
            .map_err(StorageError::from)?;

        Ok(result.rows_affected() == 1)
    }

    async fn delete_profile_group(&mut self, name: &str) -> Result<(), InventoryError> {
        sqlx::query(DELETE_GROUP)
            .bind(name)
            .execute(&mut *self.tx)
            .await
            .map_err(StorageError::from)?;

        Ok(())
    }

    async fn add_profile_member(
        &mut self,
        name: &str,
        actuator: ActuatorId,
    ) -> Result<bool, InventoryError> {
        if !self.profile_group_exists(name).await? {
            return Err(ConsistencyError::MissingProfileGroup {
                profile: name.to_string(),
                actuator: actuator.to_string(),
            }
            .into());
        }
        let result = sqlx::query(INSERT_MEMBER)
            .bind(name)
            .bind(actuator.to_string())
            .execute(&mut *self.tx)
            .await
            .map_err(StorageError::from)?;

        Ok(result.rows_affected() == 1)
    }

    async fn remove_profile_member(
        &mut self,
        name: &str,
        actuator: ActuatorId,
    ) -> Result<bool, InventoryError> {
        let result = sqlx::query(DELETE_MEMBER)
            .bind(name)
            .bind(actuator.to_string())
            .execute(&mut *self.tx)
            .await
            .map_err(StorageError::from)?;

        Ok(result.rows_affected() > 0)
    }
}
