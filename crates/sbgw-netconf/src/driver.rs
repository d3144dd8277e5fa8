//! NETCONF implementation of [`DeviceDriver`]

use std::sync::Arc;

use async_trait::async_trait;
use sbgw_conv::{
    from_canonical, nodes_to_canonical, wrap_edit_config, NativePayload, UnwrapRules, XmlNode,
};
use sbgw_core::{
    CanonicalValue, Credential, Deadline, DeviceDescriptor, DeviceDriver, GatewayError,
    GatewayResult, Mapping, NativeDocument, NetconfOptions, ProtocolKind, SetPayload,
};
use tracing::{debug, info};

use crate::rpc;
use crate::transport::{NetconfConnector, NetconfTarget};

/// Driver for NETCONF devices.
///
/// Reads always fetch the whole running datastore; writes replace it through
/// `<edit-config>` with `default-operation` set to `replace`.
pub struct NetconfDriver {
    connector: Arc<dyn NetconfConnector>,
    unwrap: UnwrapRules,
}

impl NetconfDriver {
    pub fn new(connector: Arc<dyn NetconfConnector>, unwrap: UnwrapRules) -> Self {
        Self { connector, unwrap }
    }

    /// Open a session, run one operation, and close the session
    async fn exchange(&self, target: &NetconfTarget, operation: &str) -> GatewayResult<String> {
        let mut session = self.connector.connect(target).await?;
        let reply = session.rpc(operation).await?;
        if let Err(e) = session.close().await {
            debug!(device = %target.device, error = %e, "close-session failed");
        }
        Ok(reply)
    }

    async fn fetch_running(
        &self,
        device: &DeviceDescriptor,
        credential: &Credential,
        deadline: Deadline,
    ) -> GatewayResult<XmlNode> {
        let options = netconf_options(device)?;
        let target = NetconfTarget::new(device, options, credential);

        let raw = tokio::time::timeout_at(
            deadline.instant(),
            self.exchange(&target, &rpc::get_config_running()),
        )
        .await
        .map_err(|_| deadline.expired())??;

        let reply = rpc::parse_reply(&raw)?;
        Ok(rpc::reply_data(&reply)?.clone())
    }
}

/// Build the `<config>` element sent in an edit-config
pub fn edit_config_body(payload: &SetPayload) -> GatewayResult<String> {
    let fragment = match payload {
        SetPayload::Xml(xml) => xml.clone(),
        SetPayload::Canonical(body) => match from_canonical(body, ProtocolKind::Netconf)? {
            NativePayload::XmlFragment(xml) => xml,
            NativePayload::PathUpdates(_) => {
                return Err(GatewayError::BadRequest(
                    "set body did not produce an XML fragment".to_string(),
                ))
            }
        },
    };
    Ok(wrap_edit_config(&fragment)?)
}

fn netconf_options(device: &DeviceDescriptor) -> GatewayResult<&NetconfOptions> {
    device.netconf().ok_or_else(|| {
        GatewayError::InvalidConfig(format!(
            "device '{}' is a {} device, not netconf",
            device.name,
            device.kind()
        ))
    })
}

#[async_trait]
impl DeviceDriver for NetconfDriver {
    fn kind(&self) -> ProtocolKind {
        ProtocolKind::Netconf
    }

    async fn get(
        &self,
        device: &DeviceDescriptor,
        credential: &Credential,
        path: Option<&str>,
        deadline: Deadline,
    ) -> GatewayResult<CanonicalValue> {
        if let Some(path) = path {
            debug!(device = %device.name, path = %path, "NETCONF get ignores path, fetching running config");
        }

        let data = self.fetch_running(device, credential, deadline).await?;
        let nodes = self.unwrap.apply(vec![data]);
        let value = nodes_to_canonical(&nodes)?;

        debug!(device = %device.name, "NETCONF get complete");
        Ok(value)
    }

    async fn set(
        &self,
        device: &DeviceDescriptor,
        credential: &Credential,
        payload: &SetPayload,
        deadline: Deadline,
    ) -> GatewayResult<CanonicalValue> {
        let options = netconf_options(device)?;
        let config = edit_config_body(payload)?;
        let target = NetconfTarget::new(device, options, credential);

        let raw = tokio::time::timeout_at(
            deadline.instant(),
            self.exchange(&target, &rpc::edit_config_running(&config)),
        )
        .await
        .map_err(|_| deadline.expired())??;

        let reply = rpc::parse_reply(&raw)?;
        rpc::expect_ok(&reply)?;

        info!(device = %device.name, "NETCONF edit-config applied");

        let mut ack = Mapping::new();
        ack.insert("status".to_string(), "ok".into());
        ack.insert("config".to_string(), config.into());
        Ok(CanonicalValue::Mapping(ack))
    }

    async fn get_native(
        &self,
        device: &DeviceDescriptor,
        credential: &Credential,
        deadline: Deadline,
    ) -> GatewayResult<NativeDocument> {
        let data = self.fetch_running(device, credential, deadline).await?;
        Ok(NativeDocument::xml(data.to_xml()?))
    }
}
