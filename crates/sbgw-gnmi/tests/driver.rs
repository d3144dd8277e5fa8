//! GnmiDriver against the mock transport

use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use sbgw_core::{
    CanonicalValue, Credential, Deadline, DeviceDescriptor, DeviceDriver, GatewayError,
    RegistryEntry, SetPayload,
};
use sbgw_gnmi::proto::typed_value;
use sbgw_gnmi::{GnmiDriver, GnmiPathMapper, MockGnmiConfig, MockGnmiConnector};
use serde_json::json;

fn device(name: &str, extra: serde_json::Value) -> DeviceDescriptor {
    let mut entry = json!({
        "if": "gnmi", "ip": "192.0.2.10", "port": 6030, "username": "admin",
        "skipVerify": true, "insecure": true, "encoding": "json_ietf"
    });
    if let (Some(base), Some(extra)) = (entry.as_object_mut(), extra.as_object()) {
        base.extend(extra.clone());
    }
    let entry: RegistryEntry = serde_json::from_value(entry).unwrap();
    entry.to_descriptor(name).unwrap()
}

fn driver(mock: &MockGnmiConnector) -> GnmiDriver {
    GnmiDriver::new(Arc::new(mock.clone()), GnmiPathMapper::default())
}

fn credential() -> Credential {
    Credential::new("password")
}

fn deadline() -> Deadline {
    Deadline::after(Duration::from_secs(5))
}

#[tokio::test]
async fn test_root_paths_issue_one_get_each_on_one_session() {
    let mock = MockGnmiConnector::default();
    mock.add_json("openconfig:interfaces", json!({"interface": []}));
    mock.add_json("openconfig:system", json!({"config": {"hostname": "r1"}}));

    let device = device("r1", json!({"rootpath": ["interfaces", "system"]}));
    let value = driver(&mock)
        .get(&device, &credential(), None, deadline())
        .await
        .unwrap();

    assert_eq!(
        serde_json::Value::from(value),
        json!({"interfaces": {"interface": []}, "system": {"config": {"hostname": "r1"}}})
    );

    let gets = mock.gets();
    assert_eq!(gets.len(), 2);
    assert_eq!(gets[0].paths, ["openconfig:interfaces"]);
    assert_eq!(gets[1].paths, ["openconfig:system"]);
    assert_eq!(gets[0].encoding, 4);
    assert_eq!(mock.connects(), ["r1"]);
    assert_eq!(mock.active_sessions(), 0);
}

#[tokio::test]
async fn test_explicit_path_wins_over_root_paths() {
    let mock = MockGnmiConnector::default();
    mock.add_value(
        "openconfig:system/state/hostname",
        sbgw_gnmi::proto::TypedValue {
            value: Some(typed_value::Value::StringVal("r1".into())),
        },
    );

    let device = device("r1", json!({"rootpath": ["interfaces"]}));
    let value = driver(&mock)
        .get(&device, &credential(), Some("system/state/hostname"), deadline())
        .await
        .unwrap();

    assert_eq!(value, CanonicalValue::from("r1"));
    assert_eq!(mock.gets().len(), 1);
}

#[tokio::test]
async fn test_no_path_and_no_root_paths_is_bad_request_without_connecting() {
    let mock = MockGnmiConnector::default();
    let err = driver(&mock)
        .get(&device("r1", json!({})), &credential(), None, deadline())
        .await
        .unwrap_err();

    assert!(matches!(err, GatewayError::BadRequest(_)));
    assert!(mock.connects().is_empty());
}

#[tokio::test]
async fn test_batch_fails_as_a_whole() {
    let mock = MockGnmiConnector::default();
    mock.add_json("openconfig:interfaces", json!({}));
    mock.add_error("openconfig:system", tonic::Code::PermissionDenied, "denied");

    let device = device("r1", json!({"rootpath": ["interfaces", "system"]}));
    let err = driver(&mock)
        .get(&device, &credential(), None, deadline())
        .await
        .unwrap_err();

    assert!(matches!(err, GatewayError::Protocol { .. }));
    assert_eq!(mock.active_sessions(), 0);
}

#[tokio::test]
async fn test_unreachable_device() {
    let mock = MockGnmiConnector::default();
    mock.set_unreachable("r1");

    let err = driver(&mock)
        .get(&device("r1", json!({})), &credential(), Some("system"), deadline())
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::Unavailable(_)));
}

#[tokio::test(start_paused = true)]
async fn test_deadline_releases_session() {
    let mock = MockGnmiConnector::new(MockGnmiConfig { latency_ms: 10_000 });
    mock.add_json("openconfig:system", json!({}));

    let err = driver(&mock)
        .get(
            &device("r1", json!({})),
            &credential(),
            Some("system"),
            Deadline::after(Duration::from_millis(100)),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, GatewayError::Timeout(_)));
    assert_eq!(mock.active_sessions(), 0);
    assert_eq!(mock.released_sessions(), 1);
}

#[tokio::test]
async fn test_set_sends_one_request_with_all_updates() {
    let mock = MockGnmiConnector::default();
    let body: CanonicalValue = json!({
        "interfaces/interface[name=eth0]/config/mtu": 9000,
        "system/config/hostname": "edge1"
    })
    .into();

    let ack = driver(&mock)
        .set(&device("r1", json!({})), &credential(), &SetPayload::Canonical(body), deadline())
        .await
        .unwrap();

    let sets = mock.sets();
    assert_eq!(sets.len(), 1);
    let updates = &sets[0].request.update;
    assert_eq!(updates.len(), 2);
    assert_eq!(
        updates[0].val.as_ref().and_then(|v| v.value.clone()),
        Some(typed_value::Value::JsonIetfVal(b"9000".to_vec()))
    );

    assert_eq!(
        serde_json::Value::from(ack),
        json!({
            "timestamp": mock.timestamp(),
            "results": [
                {"path": "openconfig:interfaces/interface[name=eth0]/config/mtu", "op": "update"},
                {"path": "openconfig:system/config/hostname", "op": "update"}
            ]
        })
    );
}

#[tokio::test]
async fn test_set_rejects_non_mapping_body() {
    let mock = MockGnmiConnector::default();
    let err = driver(&mock)
        .set(
            &device("r1", json!({})),
            &credential(),
            &SetPayload::Canonical(json!([1, 2]).into()),
            deadline(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, GatewayError::BadRequest(_)));
    assert!(mock.connects().is_empty());
}
