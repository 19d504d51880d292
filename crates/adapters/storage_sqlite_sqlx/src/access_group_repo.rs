//! `SQLite` implementation of [`AccessGroupRepository`].
//!
//! Groups of both kinds share one set of tables, keyed by `(kind, name)`.

use std::collections::BTreeSet;

use orchestrator_app::ports::AccessGroupRepository;
use orchestrator_domain::error::InventoryError;
use orchestrator_domain::group::{AccessGroup, GroupMember};

use crate::error::{StorageError, decode_error};
use crate::store::SqliteUnit;

const SELECT_GROUP: &str = "SELECT name FROM access_groups WHERE kind = ? AND name = ?";
const SELECT_NAMES: &str = "SELECT name FROM access_groups WHERE kind = ? ORDER BY name";
const SELECT_USERS: &str = "SELECT user_name FROM access_group_users WHERE kind = ? AND name = ?";
const SELECT_MEMBERS: &str =
    "SELECT member_id FROM access_group_members WHERE kind = ? AND name = ?";
const UPSERT_GROUP: &str =
    "INSERT INTO access_groups (kind, name) VALUES (?, ?) ON CONFLICT (kind, name) DO NOTHING";
const CLEAR_USERS: &str = "DELETE FROM access_group_users WHERE kind = ? AND name = ?";
const CLEAR_MEMBERS: &str = "DELETE FROM access_group_members WHERE kind = ? AND name = ?";
const INSERT_USER: &str = "INSERT INTO access_group_users (kind, name, user_name) VALUES (?, ?, ?)";
const INSERT_MEMBER: &str =
    "INSERT INTO access_group_members (kind, name, member_id) VALUES (?, ?, ?)";
const DELETE_GROUP: &str = "DELETE FROM access_groups WHERE kind = ? AND name = ?";

impl SqliteUnit {
    async fn load_access_group<M: GroupMember>(
        &mut self,
        name: String,
    ) -> Result<AccessGroup<M>, InventoryError> {
        let kind = M::KIND.as_str();
        let users: Vec<(String,)> = sqlx::query_as(SELECT_USERS)
            .bind(kind)
            .bind(&name)
            .fetch_all(&mut *self.tx)
            .await
            .map_err(StorageError::from)?;
        let members: Vec<(String,)> = sqlx::query_as(SELECT_MEMBERS)
            .bind(kind)
            .bind(&name)
            .fetch_all(&mut *self.tx)
            .await
            .map_err(StorageError::from)?;

        let members = members
            .iter()
            .map(|(id,)| {
                uuid::Uuid::parse_str(id)
                    .map(M::from_uuid)
                    .map_err(|err| StorageError::from(decode_error(err)))
            })
            .collect::<Result<BTreeSet<M>, _>>()?;

        Ok(AccessGroup {
            name,
            users: users.into_iter().map(|(user,)| user).collect(),
            members,
        })
    }
}

impl AccessGroupRepository for SqliteUnit {
    async fn get_access_group<M: GroupMember>(
        &mut self,
        name: &str,
    ) -> Result<Option<AccessGroup<M>>, InventoryError> {
        let row: Option<(String,)> = sqlx::query_as(SELECT_GROUP)
            .bind(M::KIND.as_str())
            .bind(name)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(StorageError::from)?;

        match row {
            Some((name,)) => Ok(Some(self.load_access_group(name).await?)),
            None => Ok(None),
        }
    }

    async fn list_access_groups<M: GroupMember>(
        &mut self,
    ) -> Result<Vec<AccessGroup<M>>, InventoryError> {
        let names: Vec<(String,)> = sqlx::query_as(SELECT_NAMES)
            .bind(M::KIND.as_str())
            .fetch_all(&mut *self.tx)
            .await
            .map_err(StorageError::from)?;

        let mut groups = Vec::with_capacity(names.len());
        for (name,) in names {
            groups.push(self.load_access_group(name).await?);
        }
        Ok(groups)
    }

    async fn save_access_group<M: GroupMember>(
        &mut self,
        group: &AccessGroup<M>,
    ) -> Result<(), InventoryError> {
        let kind = M::KIND.as_str();
        for statement in [UPSERT_GROUP, CLEAR_USERS, CLEAR_MEMBERS] {
            sqlx::query(statement)
                .bind(kind)
                .bind(&group.name)
                .execute(&mut *self.tx)
                .await
                .map_err(StorageError::from)?;
        }
        for user in &group.users {
            sqlx::query(INSERT_USER)
                .bind(kind)
                .bind(&group.name)
                .bind(user)
                .execute(&mut *self.tx)
                .await
                .map_err(StorageError::from)?;
        }
        for member in &group.members {
            sqlx::query(INSERT_MEMBER)
                .bind(kind)
                .bind(&group.name)
                .bind(member.to_uuid().to_string())
                .execute(&mut *self.tx)
                .await
                .map_err(StorageError::from)?;
        }
        Ok(())
    }

    async fn delete_access_group<M: GroupMember>(&mut self, name: &str) -> Result<(), InventoryError> {
        // Users and members cascade.
        sqlx::query(DELETE_GROUP)
            .bind(M::KIND.as_str())
            .bind(name)
            .execute(&mut *self.tx)
            .await
            .map_err(StorageError::from)?;

        Ok(())
    }
}
