//! `SQLite` implementation of [`TransportRepository`].
//!
//! Serializations are stored as a JSON array of names. The protocol is stored
//! by name together with its pub/sub flag, which scopes the exclusive
//! endpoint index.

use std::str::FromStr;

use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row};

use orchestrator_app::ports::TransportRepository;
use orchestrator_domain::error::InventoryError;
use orchestrator_domain::id::{DeviceId, TransportId};
use orchestrator_domain::transport::{Endpoint, Protocol, Serialization, Transport};

use crate::error::{StorageError, decode_error};
use crate::store::SqliteUnit;

/// Wrapper for converting database rows into domain [`Transport`].
struct Wrapper(Transport);

impl Wrapper {
    fn maybe(value: Option<Self>) -> Option<Transport> {
        value.map(|w| w.0)
    }

    fn all(rows: Vec<Self>) -> Vec<Transport> {
        rows.into_iter().map(|w| w.0).collect()
    }
}

impl<'r> FromRow<'r, SqliteRow> for Wrapper {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let id: String = row.try_get("id")?;
        let host: String = row.try_get("host")?;
        let port: i64 = row.try_get("port")?;
        let protocol: String = row.try_get("protocol")?;
        let pub_sub: bool = row.try_get("pub_sub")?;
        let serializations: String = row.try_get("serializations")?;
        let topic: String = row.try_get("topic")?;
        let channel: String = row.try_get("channel")?;

        let id = TransportId::from_str(&id).map_err(decode_error)?;
        let port = u16::try_from(port).map_err(decode_error)?;
        let names: Vec<String> = serde_json::from_str(&serializations).map_err(decode_error)?;

        Ok(Self(Transport {
            id,
            host,
            port,
            protocol: Protocol {
                name: protocol,
                pub_sub,
            },
            serializations: names
                .into_iter()
                .map(|name| Serialization { name })
                .collect(),
            topic,
            channel,
        }))
    }
}

fn serializations_json(transport: &Transport) -> Result<String, StorageError> {
    let names: Vec<&str> = transport
        .serializations
        .iter()
        .map(|s| s.name.as_str())
        .collect();
    Ok(serde_json::to_string(&names)?)
}

const INSERT: &str = "INSERT INTO transports (id, host, port, protocol, pub_sub, serializations, topic, channel) VALUES (?, ?, ?, ?, ?, ?, ?, ?)";
const SELECT_BY_ID: &str = "SELECT * FROM transports WHERE id = ?";
const SELECT_ALL: &str = "SELECT * FROM transports ORDER BY host, port, protocol";
const SELECT_BY_ENDPOINT: &str =
    "SELECT * FROM transports WHERE host = ? AND port = ? AND protocol = ? AND pub_sub = 0";
const SELECT_BY_DEVICE: &str = "SELECT t.* FROM transports t JOIN device_transports dt ON dt.transport_id = t.id WHERE dt.device_id = ? ORDER BY t.host, t.port, t.protocol";
const UPDATE: &str = "UPDATE transports SET host = ?, port = ?, protocol = ?, pub_sub = ?, serializations = ?, topic = ?, channel = ? WHERE id = ?";
const DELETE_BY_ID: &str = "DELETE FROM transports WHERE id = ?";
const SELECT_OWNERS: &str = "SELECT device_id FROM device_transports WHERE transport_id = ?";
const LINK: &str = "INSERT INTO device_transports (device_id, transport_id) VALUES (?, ?)";
const UNLINK: &str = "DELETE FROM device_transports WHERE device_id = ? AND transport_id = ?";

impl TransportRepository for SqliteUnit {
    async fn get_transport(&mut self, id: TransportId) -> Result<Option<Transport>, InventoryError> {
        let row: Option<Wrapper> = sqlx::query_as(SELECT_BY_ID)
            .bind(id.to_string())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(StorageError::from)?;

        Ok(Wrapper::maybe(row))
    }

    async fn list_transports(&mut self) -> Result<Vec<Transport>, InventoryError> {
        let rows: Vec<Wrapper> = sqlx::query_as(SELECT_ALL)
            .fetch_all(&mut *self.tx)
            .await
            .map_err(StorageError::from)?;

        Ok(Wrapper::all(rows))
    }

    async fn find_transports_by_endpoint(
        &mut self,
        endpoint: &Endpoint,
    ) -> Result<Vec<Transport>, InventoryError> {
        let rows: Vec<Wrapper> = sqlx::query_as(SELECT_BY_ENDPOINT)
            .bind(&endpoint.host)
            .bind(i64::from(endpoint.port))
            .bind(&endpoint.protocol)
            .fetch_all(&mut *self.tx)
            .await
            .map_err(StorageError::from)?;

        Ok(Wrapper::all(rows))
    }

    async fn insert_transport(&mut self, transport: &Transport) -> Result<(), InventoryError> {
        let serializations = serializations_json(transport)?;
        sqlx::query(INSERT)
            .bind(transport.id.to_string())
            .bind(&transport.host)
            .bind(i64::from(transport.port))
            .bind(&transport.protocol.name)
            .bind(transport.protocol.pub_sub)
            .bind(serializations)
            .bind(&transport.topic)
            .bind(&transport.channel)
            .execute(&mut *self.tx)
            .await
            .map_err(StorageError::from)?;

        Ok(())
    }

    async fn update_transport(&mut self, transport: &Transport) -> Result<(), InventoryError> {
        let serializations = serializations_json(transport)?;
        sqlx::query(UPDATE)
            .bind(&transport.host)
            .bind(i64::from(transport.port))
            .bind(&transport.protocol.name)
            .bind(transport.protocol.pub_sub)
            .bind(serializations)
            .bind(&transport.topic)
            .bind(&transport.channel)
            .bind(transport.id.to_string())
            .execute(&mut *self.tx)
            .await
            .map_err(StorageError::from)?;

        Ok(())
    }

    async fn delete_transport(&mut self, id: TransportId) -> Result<(), InventoryError> {
        sqlx::query(DELETE_BY_ID)
            .bind(id.to_string())
            .execute(&mut *self.tx)
            .await
            .map_err(StorageError::from)?;

        Ok(())
    }

    async fn transport_owners(&mut self, id: TransportId) -> Result<Vec<DeviceId>, InventoryError> {
        let rows: Vec<(String,)> = sqlx::query_as(SELECT_OWNERS)
            .bind(id.to_string())
            .fetch_all(&mut *self.tx)
            .await
            .map_err(StorageError::from)?;

        rows.iter()
            .map(|(device,)| {
                DeviceId::from_str(device)
                    .map_err(|err| InventoryError::from(StorageError::from(decode_error(err))))
            })
            .collect()
    }

    async fn device_transports(&mut self, device: DeviceId) -> Result<Vec<Transport>, InventoryError> {
        let rows: Vec<Wrapper> = sqlx::query_as(SELECT_BY_DEVICE)
            .bind(device.to_string())
            .fetch_all(&mut *self.tx)
            .await
            .map_err(StorageError::from)?;

        Ok(Wrapper::all(rows))
    }

    async fn link_transport(
        &mut self,
        device: DeviceId,
        transport: TransportId,
    ) -> Result<(), InventoryError> {
        // A second owner violates the UNIQUE transport_id column.
        sqlx::query(LINK)
            .bind(device.to_string())
            .bind(transport.to_string())
            .execute(&mut *self.tx)
            .await
            .map_err(StorageError::from)?;

        Ok(())
    }

    async fn unlink_transport(
        &mut self,
        device: DeviceId,
        transport: TransportId,
    ) -> Result<bool, InventoryError> {
        let result = sqlx::query(UNLINK)
            .bind(device.to_string())
            .bind(transport.to_string())
            .execute(&mut *self.tx)
            .await
            .map_err(StorageError::from)?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::tests::setup;
    use orchestrator_app::ports::{DeviceRepository, InventoryStore};
    use orchestrator_domain::device::Device;

    fn https(host: &str) -> Transport {
        Transport::builder(Protocol {
            name: "HTTPS".to_string(),
            pub_sub: false,
        })
        .host(host)
        .port(443)
        .serialization(Serialization {
            name: "JSON".to_string(),
        })
        .build()
        .unwrap()
    }

    fn mqtt(topic: &str) -> Transport {
        Transport::builder(Protocol {
            name: "MQTT".to_string(),
            pub_sub: true,
        })
        .host("broker")
        .port(1883)
        .topic(topic)
        .build()
        .unwrap()
    }

    #[tokio::test]
    async fn should_round_trip_transport_fields() {
        let store = setup().await;
        let transport = https("10.0.0.1");
        let mut unit = store.begin().await.unwrap();

        unit.insert_transport(&transport).await.unwrap();

        let fetched = unit.get_transport(transport.id).await.unwrap();
        assert_eq!(fetched, Some(transport));
    }

    #[tokio::test]
    async fn should_find_only_exclusive_transports_by_endpoint() {
        let store = setup().await;
        let transport = https("10.0.0.1");
        let mut unit = store.begin().await.unwrap();
        unit.insert_transport(&transport).await.unwrap();
        unit.insert_transport(&mqtt("a")).await.unwrap();

        let found = unit
            .find_transports_by_endpoint(&transport.endpoint())
            .await
            .unwrap();
        assert_eq!(found.len(), 1);

        let found = unit
            .find_transports_by_endpoint(&mqtt("b").endpoint())
            .await
            .unwrap();
        assert!(found.is_empty());
    }

    #[tokio::test]
    async fn should_report_duplicate_exclusive_endpoint_as_conflict() {
        let store = setup().await;
        let mut unit = store.begin().await.unwrap();
        unit.insert_transport(&https("10.0.0.1")).await.unwrap();

        let result = unit.insert_transport(&https("10.0.0.1")).await;
        assert!(matches!(result, Err(InventoryError::Conflict(_))));
    }

    #[tokio::test]
    async fn should_allow_shared_pub_sub_endpoint() {
        let store = setup().await;
        let mut unit = store.begin().await.unwrap();
        unit.insert_transport(&mqtt("a")).await.unwrap();
        unit.insert_transport(&mqtt("b")).await.unwrap();
        assert_eq!(unit.list_transports().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn should_report_second_owner_as_conflict() {
        let store = setup().await;
        let a = Device::builder().name("a").build().unwrap();
        let b = Device::builder().name("b").build().unwrap();
        let transport = https("10.0.0.1");
        let mut unit = store.begin().await.unwrap();
        unit.insert_device(&a).await.unwrap();
        unit.insert_device(&b).await.unwrap();
        unit.insert_transport(&transport).await.unwrap();
        unit.link_transport(a.id, transport.id).await.unwrap();

        let result = unit.link_transport(b.id, transport.id).await;
        assert!(matches!(result, Err(InventoryError::Conflict(_))));
        assert_eq!(unit.transport_owners(transport.id).await.unwrap(), vec![a.id]);
    }

    #[tokio::test]
    async fn should_unlink_when_device_deleted() {
        let store = setup().await;
        let device = Device::builder().name("a").build().unwrap();
        let transport = https("10.0.0.1");
        let mut unit = store.begin().await.unwrap();
        unit.insert_device(&device).await.unwrap();
        unit.insert_transport(&transport).await.unwrap();
        unit.link_transport(device.id, transport.id).await.unwrap();
        assert_eq!(unit.device_transports(device.id).await.unwrap().len(), 1);

        unit.delete_device(device.id).await.unwrap();

        assert!(unit.transport_owners(transport.id).await.unwrap().is_empty());
        assert!(unit.get_transport(transport.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn should_report_whether_unlink_removed_a_link() {
        let store = setup().await;
        let device = Device::builder().name("a").build().unwrap();
        let transport = https("10.0.0.1");
        let mut unit = store.begin().await.unwrap();
        unit.insert_device(&device).await.unwrap();
        unit.insert_transport(&transport).await.unwrap();
        unit.link_transport(device.id, transport.id).await.unwrap();

        assert!(unit.unlink_transport(device.id, transport.id).await.unwrap());
        assert!(!unit.unlink_transport(device.id, transport.id).await.unwrap());
    }
}
