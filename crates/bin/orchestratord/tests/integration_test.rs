//! End-to-end tests for the full orchestratord stack.
//!
//! Each test wires the complete application (`SQLite`, the real store
//! adapter, real services, the in-process event bus) and exercises the
//! services the way the daemon does. Most tests use an in-memory database;
//! the race tests use a pooled database file so that units of work really
//! contend.

use std::sync::Arc;

use orchestrator_adapter_storage_sqlite_sqlx::{Config, SqliteInventoryStore};
use orchestrator_app::catalog::StaticCatalog;
use orchestrator_app::event_bus::InProcessEventBus;
use orchestrator_app::services::actuator_service::ActuatorService;
use orchestrator_app::services::device_service::{DeviceService, NewTransport};
use orchestrator_app::services::group_service::GroupService;
use orchestrator_app::transaction::{RetryPolicy, Transactor};
use orchestrator_domain::actuator::Actuator;
use orchestrator_domain::device::Device;
use orchestrator_domain::error::{ConstraintViolation, InventoryError};
use orchestrator_domain::event::Change;
use orchestrator_domain::id::DeviceId;
use orchestrator_domain::transport::{Protocol, Serialization};
use serde_json::json;
use tempfile::{TempDir, tempdir};

type Bus = Arc<InProcessEventBus>;

struct App {
    tx: Transactor<SqliteInventoryStore, Bus>,
    bus: Bus,
    devices: DeviceService<SqliteInventoryStore, Bus, StaticCatalog>,
    actuators: ActuatorService<SqliteInventoryStore, Bus>,
}

/// Build a fully-wired application backed by an in-memory `SQLite` database.
async fn app() -> App {
    let config = Config {
        database_url: "sqlite::memory:".to_string(),
        max_connections: 1,
    };
    wire(config, RetryPolicy::default()).await
}

/// Build an application over a database file in `dir` with a pool of
/// several connections.
async fn file_app(dir: &TempDir) -> App {
    let config = Config {
        database_url: format!("sqlite:{}", dir.path().join("inventory.db").display()),
        max_connections: 8,
    };
    wire(config, RetryPolicy { max_attempts: 5 }).await
}

async fn wire(config: Config, policy: RetryPolicy) -> App {
    let db = config.build().await.expect("database should initialise");

    let bus = Arc::new(InProcessEventBus::new(256));
    let tx = Transactor::new(db.inventory_store(), Arc::clone(&bus), policy);
    let catalog = StaticCatalog::new(
        [
            Protocol {
                name: "HTTPS".to_string(),
                pub_sub: false,
            },
            Protocol {
                name: "MQTT".to_string(),
                pub_sub: true,
            },
        ],
        [Serialization {
            name: "JSON".to_string(),
        }],
    );

    App {
        devices: DeviceService::new(tx.clone(), catalog),
        actuators: ActuatorService::new(tx.clone()),
        tx,
        bus,
    }
}

async fn device(app: &App, name: &str, multi_actuator: bool) -> Device {
    app.devices
        .create_device(
            Device::builder()
                .name(name)
                .multi_actuator(multi_actuator)
                .build()
                .unwrap(),
        )
        .await
        .unwrap()
}

fn jadn(title: &str) -> serde_json::Value {
    json!({"meta": {"title": title}, "types": []})
}

// ---------------------------------------------------------------------------
// Transports
// ---------------------------------------------------------------------------

#[tokio::test]
async fn should_complete_transport_lifecycle() {
    let app = app().await;
    let dev = device(&app, "plc", false).await;

    let transport = app
        .devices
        .add_transport(
            dev.id,
            NewTransport::new("10.0.0.7", 443, "HTTPS").serialization("JSON"),
        )
        .await
        .unwrap();
    assert_eq!(transport.to_string(), "10.0.0.7:443 - HTTPS");
    assert_eq!(app.devices.device_transports(dev.id).await.unwrap(), vec![transport.clone()]);

    app.devices.detach_transport(dev.id, transport.id).await.unwrap();

    assert!(app.devices.list_transports().await.unwrap().is_empty());
}

#[tokio::test]
async fn should_reject_duplicate_endpoint() {
    let app = app().await;
    app.devices
        .create_transport(NewTransport::new("10.0.0.7", 443, "HTTPS"))
        .await
        .unwrap();

    let result = app
        .devices
        .create_transport(NewTransport::new("10.0.0.7", 443, "HTTPS"))
        .await;

    assert!(matches!(
        result,
        Err(InventoryError::Constraint(
            ConstraintViolation::DuplicateEndpoint { .. }
        ))
    ));
}

#[tokio::test]
async fn should_share_pub_sub_endpoints() {
    let app = app().await;
    let a = device(&app, "a", false).await;
    let b = device(&app, "b", false).await;

    app.devices
        .add_transport(a.id, NewTransport::new("broker", 1883, "MQTT").topic("a"))
        .await
        .unwrap();
    app.devices
        .add_transport(b.id, NewTransport::new("broker", 1883, "MQTT").topic("b"))
        .await
        .unwrap();

    assert_eq!(app.devices.list_transports().await.unwrap().len(), 2);
}

#[tokio::test]
async fn should_let_exactly_one_racing_attach_succeed() {
    let app = app().await;
    let a = device(&app, "a", false).await;
    let b = device(&app, "b", false).await;
    let transport = app
        .devices
        .create_transport(NewTransport::new("10.0.0.7", 443, "HTTPS"))
        .await
        .unwrap();

    let (first, second) = tokio::join!(
        app.devices.attach_transport(a.id, transport.id),
        app.devices.attach_transport(b.id, transport.id),
    );

    assert!(first.is_ok() != second.is_ok());
    let failure = first.err().or(second.err());
    assert!(matches!(
        failure,
        Some(InventoryError::Constraint(
            ConstraintViolation::TransportOwned { .. }
        ))
    ));
}

#[tokio::test]
async fn should_remove_orphaned_transports_with_device() {
    let app = app().await;
    let a = device(&app, "a", false).await;
    let b = device(&app, "b", false).await;
    app.devices
        .add_transport(a.id, NewTransport::new("10.0.0.1", 443, "HTTPS"))
        .await
        .unwrap();
    let kept = app
        .devices
        .add_transport(b.id, NewTransport::new("10.0.0.2", 443, "HTTPS"))
        .await
        .unwrap();

    app.devices.delete_device(a.id).await.unwrap();

    assert_eq!(app.devices.list_transports().await.unwrap(), vec![kept]);
    assert!(matches!(
        app.devices.get_device(a.id).await,
        Err(InventoryError::NotFound(_))
    ));
}

// ---------------------------------------------------------------------------
// Actuators and profile groups
// ---------------------------------------------------------------------------

#[tokio::test]
async fn should_keep_profile_groups_in_sync_with_schemas() {
    let app = app().await;
    let dev = device(&app, "gw", true).await;
    let create = |name: &str, schema| {
        Actuator::builder()
            .name(name)
            .device_id(dev.id)
            .schema(schema)
            .build()
            .unwrap()
    };
    let a = app.actuators.create_actuator(create("a", jadn("SLPF"))).await.unwrap();
    let b = app
        .actuators
        .create_actuator(create("b", json!({"title": "SLPF"})))
        .await
        .unwrap();

    let group = app.actuators.profile_group("SLPF").await.unwrap();
    assert_eq!(group.actuator_count(), 2);

    app.actuators
        .update_actuator_schema(a.id, jadn("Packet Filter"))
        .await
        .unwrap();
    app.actuators.delete_actuator(b.id).await.unwrap();

    let groups = app.actuators.profile_groups().await.unwrap();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].name, "Packet Filter");
    assert!(groups[0].actuators.contains(&a.id));

    let stored = app.actuators.get_actuator(a.id).await.unwrap();
    assert_eq!(stored.profile(), "Packet_Filter");
}

#[tokio::test]
async fn should_enforce_single_actuator_slot() {
    let app = app().await;
    let dev = device(&app, "plc", false).await;
    app.actuators
        .create_actuator(
            Actuator::builder()
                .name("first")
                .device_id(dev.id)
                .schema(jadn("SLPF"))
                .build()
                .unwrap(),
        )
        .await
        .unwrap();

    let result = app
        .actuators
        .create_actuator(
            Actuator::builder()
                .name("second")
                .device_id(dev.id)
                .schema(jadn("Other"))
                .build()
                .unwrap(),
        )
        .await;

    assert!(matches!(
        result,
        Err(InventoryError::Constraint(
            ConstraintViolation::ActuatorSlotOccupied { .. }
        ))
    ));
    assert!(app.actuators.profile_group("Other").await.is_err());
    assert_eq!(app.actuators.list_actuators().await.unwrap().len(), 1);
}

#[tokio::test]
async fn should_cascade_device_deletion_to_actuators_and_groups() {
    let app = app().await;
    let dev = device(&app, "plc", false).await;
    let actuator = app
        .actuators
        .create_actuator(
            Actuator::builder()
                .name("slpf")
                .device_id(dev.id)
                .schema(jadn("SLPF"))
                .build()
                .unwrap(),
        )
        .await
        .unwrap();

    app.devices.delete_device(dev.id).await.unwrap();

    assert!(app.actuators.get_actuator(actuator.id).await.is_err());
    assert!(app.actuators.profile_groups().await.unwrap().is_empty());
}

// ---------------------------------------------------------------------------
// Events and access groups
// ---------------------------------------------------------------------------

#[tokio::test]
async fn should_publish_committed_changes_in_order() {
    let app = app().await;
    let mut rx = app.bus.subscribe();
    let dev = device(&app, "plc", false).await;
    let transport = app
        .devices
        .add_transport(dev.id, NewTransport::new("10.0.0.7", 443, "HTTPS"))
        .await
        .unwrap();
    app.devices.delete_device(dev.id).await.unwrap();

    let mut seen = Vec::new();
    while let Ok(event) = rx.try_recv() {
        seen.push(event.change);
    }
    assert_eq!(
        seen,
        vec![
            Change::DeviceCreated { device: dev.id },
            Change::TransportCreated {
                transport: transport.id
            },
            Change::TransportAttached {
                device: dev.id,
                transport: transport.id
            },
            Change::DeviceDeleted { device: dev.id },
            Change::TransportRemoved {
                transport: transport.id
            },
        ]
    );
}

#[tokio::test]
async fn should_manage_device_access_groups() {
    let app = app().await;
    let groups = GroupService::<_, _, DeviceId>::new(app.tx.clone());
    let dev = device(&app, "plc", false).await;

    groups.create_group("operators").await.unwrap();
    groups.add_user("operators", "alice").await.unwrap();
    let group = groups.add_member("operators", dev.id).await.unwrap();
    assert_eq!((group.user_count(), group.member_count()), (1, 1));

    app.devices.delete_device(dev.id).await.unwrap();

    let group = groups.get_group("operators").await.unwrap();
    assert_eq!((group.user_count(), group.member_count()), (1, 0));
}

/// Assert that exactly one of two racing results succeeded and return the
/// error of the other.
fn loser<T: std::fmt::Debug>(
    first: Result<T, InventoryError>,
    second: Result<T, InventoryError>,
) -> InventoryError {
    match (first, second) {
        (Ok(_), Err(err)) | (Err(err), Ok(_)) => err,
        other => panic!("expected exactly one winner, got {other:?}"),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn should_let_exactly_one_racing_attach_succeed_on_pooled_database() {
    let dir = tempdir().unwrap();
    let app = Arc::new(file_app(&dir).await);

    for round in 0..10_u16 {
        let a = device(&app, &format!("a-{round}"), false).await.id;
        let b = device(&app, &format!("b-{round}"), false).await.id;
        let transport = app
            .devices
            .create_transport(NewTransport::new("10.0.0.1", 1000 + round, "HTTPS"))
            .await
            .unwrap()
            .id;

        let first = tokio::spawn({
            let app = Arc::clone(&app);
            async move { app.devices.attach_transport(a, transport).await }
        });
        let second = tokio::spawn({
            let app = Arc::clone(&app);
            async move { app.devices.attach_transport(b, transport).await }
        });

        let err = loser(first.await.unwrap(), second.await.unwrap());
        assert!(
            matches!(
                err,
                InventoryError::Constraint(ConstraintViolation::TransportOwned { .. })
            ),
            "round {round}: {err:?}"
        );
        let owners = app.devices.device_transports(a).await.unwrap().len()
            + app.devices.device_transports(b).await.unwrap().len();
        assert_eq!(owners, 1);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn should_let_exactly_one_racing_endpoint_registration_succeed_on_pooled_database() {
    let dir = tempdir().unwrap();
    let app = Arc::new(file_app(&dir).await);

    for round in 0..10_u16 {
        let register = move |app: Arc<App>| async move {
            app.devices
                .create_transport(NewTransport::new("10.0.0.2", 2000 + round, "HTTPS"))
                .await
        };
        let first = tokio::spawn(register(Arc::clone(&app)));
        let second = tokio::spawn(register(Arc::clone(&app)));

        let err = loser(first.await.unwrap(), second.await.unwrap());
        assert!(
            matches!(
                err,
                InventoryError::Constraint(ConstraintViolation::DuplicateEndpoint { .. })
            ),
            "round {round}: {err:?}"
        );
    }
    assert_eq!(app.devices.list_transports().await.unwrap().len(), 10);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn should_let_exactly_one_racing_actuator_take_single_slot_on_pooled_database() {
    let dir = tempdir().unwrap();
    let app = Arc::new(file_app(&dir).await);

    for round in 0..10 {
        let dev = device(&app, &format!("plc-{round}"), false).await.id;
        let create = move |app: Arc<App>, name: String| async move {
            app.actuators
                .create_actuator(Actuator::builder().name(name).device_id(dev).build()?)
                .await
        };
        let first = tokio::spawn(create(Arc::clone(&app), format!("left-{round}")));
        let second = tokio::spawn(create(Arc::clone(&app), format!("right-{round}")));

        let err = loser(first.await.unwrap(), second.await.unwrap());
        assert!(
            matches!(
                err,
                InventoryError::Constraint(ConstraintViolation::ActuatorSlotOccupied { .. })
            ),
            "round {round}: {err:?}"
        );
        assert_eq!(app.actuators.actuators_on_device(dev).await.unwrap().len(), 1);
    }
}
