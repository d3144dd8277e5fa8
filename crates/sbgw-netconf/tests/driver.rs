//! NetconfDriver against the mock transport

use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use sbgw_conv::UnwrapRules;
use sbgw_core::{
    Credential, Deadline, DeviceDescriptor, DeviceDriver, GatewayError, RegistryEntry, SetPayload,
};
use sbgw_netconf::{MockNetconfConfig, MockNetconfConnector, NetconfDriver};
use serde_json::json;

const RUNNING: &str = r#"<config xmlns="urn:vendor:config">
  <system><hostname>edge1</hostname></system>
  <interfaces>
    <interface><name>eth0</name><mtu>1500</mtu></interface>
    <interface><name>eth1</name><mtu>9000</mtu></interface>
  </interfaces>
</config>"#;

fn device(name: &str) -> DeviceDescriptor {
    let entry: RegistryEntry = serde_json::from_value(json!({
        "if": "netconf", "ip": "192.0.2.20", "port": 830,
        "username": "admin", "hostKeyVerify": false
    }))
    .unwrap();
    entry.to_descriptor(name).unwrap()
}

fn driver(mock: &MockNetconfConnector) -> NetconfDriver {
    NetconfDriver::new(Arc::new(mock.clone()), UnwrapRules::default())
}

fn credential() -> Credential {
    Credential::new("password")
}

fn deadline() -> Deadline {
    Deadline::after(Duration::from_secs(5))
}

#[tokio::test]
async fn test_get_unwraps_data_and_config() {
    let mock = MockNetconfConnector::default();
    mock.set_running(RUNNING);

    let value = driver(&mock)
        .get(&device("sw1"), &credential(), None, deadline())
        .await
        .unwrap();

    assert_eq!(
        serde_json::Value::from(value),
        json!({
            "system": {"hostname": "edge1"},
            "interfaces": {"interface": [
                {"name": "eth0", "mtu": "1500"},
                {"name": "eth1", "mtu": "9000"}
            ]}
        })
    );

    let rpcs = mock.rpcs();
    assert_eq!(rpcs.len(), 1);
    assert!(rpcs[0].operation.starts_with("<get-config>"));
    assert_eq!(mock.active_sessions(), 0);
}

#[tokio::test]
async fn test_get_ignores_path() {
    let mock = MockNetconfConnector::default();
    mock.set_running("<system><hostname>edge1</hostname></system>");

    let value = driver(&mock)
        .get(&device("sw1"), &credential(), Some("system/hostname"), deadline())
        .await
        .unwrap();
    assert_eq!(
        serde_json::Value::from(value),
        json!({"system": {"hostname": "edge1"}})
    );
}

#[tokio::test]
async fn test_get_native_returns_data_element() {
    let mock = MockNetconfConnector::default();
    mock.set_running("<system><hostname>edge1</hostname></system>");

    let doc = driver(&mock)
        .get_native(&device("sw1"), &credential(), deadline())
        .await
        .unwrap();

    assert_eq!(doc.content_type, "application/xml");
    assert_eq!(
        doc.body,
        concat!(
            r#"<data xmlns="urn:ietf:params:xml:ns:netconf:base:1.0">"#,
            "<system><hostname>edge1</hostname></system></data>"
        )
    );
}

#[tokio::test]
async fn test_set_sends_wrapped_edit_config_with_replace() {
    let mock = MockNetconfConnector::default();

    let ack = driver(&mock)
        .set(
            &device("sw1"),
            &credential(),
            &SetPayload::Xml("<system><hostname>edge2</hostname></system>".into()),
            deadline(),
        )
        .await
        .unwrap();

    let wrapped = concat!(
        r#"<config xmlns="urn:ietf:params:xml:ns:netconf:base:1.0" "#,
        r#"xmlns:nc="urn:ietf:params:xml:ns:netconf:base:1.0">"#,
        "<system><hostname>edge2</hostname></system></config>"
    );
    assert_eq!(
        serde_json::Value::from(ack),
        json!({"status": "ok", "config": wrapped})
    );

    let rpcs = mock.rpcs();
    assert_eq!(rpcs.len(), 1);
    assert_eq!(
        rpcs[0].operation,
        format!(
            "<edit-config><target><running/></target>\
             <default-operation>replace</default-operation>{}</edit-config>",
            wrapped
        )
    );
}

#[tokio::test]
async fn test_set_body_cannot_split_the_rpc() {
    let mock = MockNetconfConnector::default();

    driver(&mock)
        .set(
            &device("sw1"),
            &credential(),
            &SetPayload::Xml(
                "<!--]]>]]>--><system><motd>a]]&gt;]]&gt;b</motd></system>".into(),
            ),
            deadline(),
        )
        .await
        .unwrap();

    let rpcs = mock.rpcs();
    assert_eq!(rpcs.len(), 1);
    assert!(!rpcs[0].operation.contains("]]>]]>"));
    assert!(rpcs[0]
        .operation
        .contains("<system><motd>a]]&gt;]]&gt;b</motd></system></config>"));
}

#[tokio::test]
async fn test_set_from_canonical_body() {
    let mock = MockNetconfConnector::default();

    driver(&mock)
        .set(
            &device("sw1"),
            &credential(),
            &SetPayload::Canonical(json!({"system": {"hostname": "edge3"}}).into()),
            deadline(),
        )
        .await
        .unwrap();

    assert!(mock.rpcs()[0]
        .operation
        .contains("<system><hostname>edge3</hostname></system></config>"));
}

#[tokio::test]
async fn test_rpc_error_is_protocol_error_with_detail() {
    let mock = MockNetconfConnector::default();
    mock.set_reply(
        r#"<rpc-reply message-id="1" xmlns="urn:ietf:params:xml:ns:netconf:base:1.0">
             <rpc-error>
               <error-type>application</error-type>
               <error-tag>invalid-value</error-tag>
               <error-severity>error</error-severity>
               <error-message>hostname too long</error-message>
             </rpc-error>
           </rpc-reply>"#,
    );

    let err = driver(&mock)
        .set(
            &device("sw1"),
            &credential(),
            &SetPayload::Xml("<system><hostname>x</hostname></system>".into()),
            deadline(),
        )
        .await
        .unwrap_err();

    match err {
        GatewayError::Protocol { message, detail } => {
            assert!(message.contains("hostname too long"));
            let detail = serde_json::Value::from(detail.unwrap());
            assert_eq!(detail["rpc-error"]["error-tag"], "invalid-value");
        }
        other => panic!("expected protocol error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_reply_without_ok_is_protocol_error() {
    let mock = MockNetconfConnector::default();
    mock.set_reply(r#"<rpc-reply message-id="1"><data/></rpc-reply>"#);

    let err = driver(&mock)
        .set(
            &device("sw1"),
            &credential(),
            &SetPayload::Xml("<a>1</a>".into()),
            deadline(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::Protocol { .. }));
}

#[tokio::test]
async fn test_malformed_xml_body_is_rejected_before_connecting() {
    let mock = MockNetconfConnector::default();

    let err = driver(&mock)
        .set(
            &device("sw1"),
            &credential(),
            &SetPayload::Xml("<system><hostname>x</system>".into()),
            deadline(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, GatewayError::BadRequest(_)));
    assert!(mock.connects().is_empty());
}

#[tokio::test]
async fn test_unreachable_device() {
    let mock = MockNetconfConnector::default();
    mock.set_unreachable("sw1");

    let err = driver(&mock)
        .get(&device("sw1"), &credential(), None, deadline())
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::Unavailable(_)));
}

#[tokio::test(start_paused = true)]
async fn test_deadline_releases_session() {
    let mock = MockNetconfConnector::new(MockNetconfConfig { latency_ms: 10_000 });
    mock.set_running("<a>1</a>");

    let err = driver(&mock)
        .get(
            &device("sw1"),
            &credential(),
            None,
            Deadline::after(Duration::from_millis(100)),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, GatewayError::Timeout(_)));
    assert_eq!(mock.active_sessions(), 0);
    assert_eq!(mock.released_sessions(), 1);
}
