//! gNMI implementation of [`DeviceDriver`]

use std::sync::Arc;

use async_trait::async_trait;
use sbgw_conv::{from_canonical, NativePayload};
use sbgw_core::{
    CanonicalValue, Credential, Deadline, DeviceDescriptor, DeviceDriver, GatewayError,
    GatewayResult, GnmiOptions, Mapping, ProtocolKind, SetPayload,
};
use tracing::{debug, info};

use crate::convert::{canonical_to_typed, typed_to_canonical};
use crate::path::{join_paths, GnmiPathMapper};
use crate::proto::{
    update_result, DataType, GetRequest, GetResponse, Path, SetRequest, SetResponse, Update,
};
use crate::transport::{GnmiConnector, GnmiSession, GnmiTarget};

/// What a get resolves to before any connection is made
enum GetPlan {
    Single(Path),
    /// Root-path name and wire path, in declaration order
    Batch(Vec<(String, Path)>),
}

/// Driver for gNMI devices
pub struct GnmiDriver {
    connector: Arc<dyn GnmiConnector>,
    mapper: GnmiPathMapper,
}

impl GnmiDriver {
    pub fn new(connector: Arc<dyn GnmiConnector>, mapper: GnmiPathMapper) -> Self {
        Self { connector, mapper }
    }

    fn wire_path(&self, logical: &str) -> GatewayResult<Path> {
        self.mapper
            .to_path(logical)
            .map_err(|e| GatewayError::BadRequest(e.to_string()))
    }

    fn plan_get(
        &self,
        device: &DeviceDescriptor,
        options: &GnmiOptions,
        path: Option<&str>,
    ) -> GatewayResult<GetPlan> {
        if let Some(path) = path {
            return Ok(GetPlan::Single(self.wire_path(path)?));
        }

        match options.root_paths.as_deref() {
            Some(roots) if !roots.is_empty() => roots
                .iter()
                .map(|root| Ok((root.clone(), self.wire_path(root)?)))
                .collect::<GatewayResult<Vec<_>>>()
                .map(GetPlan::Batch),
            _ => Err(GatewayError::BadRequest(format!(
                "device '{}' declares no root paths; a path is required",
                device.name
            ))),
        }
    }

    fn build_set(&self, payload: &SetPayload, options: &GnmiOptions) -> GatewayResult<SetRequest> {
        let body = match payload {
            SetPayload::Canonical(body) => body,
            SetPayload::Xml(_) => {
                return Err(GatewayError::BadRequest(
                    "gNMI devices take a JSON body, not XML".to_string(),
                ))
            }
        };

        let NativePayload::PathUpdates(updates) = from_canonical(body, ProtocolKind::Gnmi)? else {
            return Err(GatewayError::BadRequest(
                "set body did not produce path updates".to_string(),
            ));
        };

        let update = updates
            .iter()
            .map(|u| {
                Ok(Update {
                    path: Some(self.wire_path(&u.path)?),
                    val: Some(canonical_to_typed(&u.value, options.encoding)?),
                    duplicates: 0,
                })
            })
            .collect::<GatewayResult<Vec<_>>>()?;

        Ok(SetRequest {
            update,
            ..Default::default()
        })
    }

    async fn run_get(
        &self,
        target: &GnmiTarget,
        plan: GetPlan,
        encoding: i32,
    ) -> GatewayResult<CanonicalValue> {
        let mut session = self.connector.connect(target).await?;

        match plan {
            GetPlan::Single(path) => {
                let response = get_one(session.as_mut(), path, encoding).await?;
                reduce_get_response(response)
            }
            GetPlan::Batch(roots) => {
                // One shared session; the first failure fails the batch
                let mut result = Mapping::new();
                for (name, path) in roots {
                    debug!(device = %target.device, root = %name, "Fetching root path");
                    let response = get_one(session.as_mut(), path, encoding).await?;
                    result.insert(name, reduce_get_response(response)?);
                }
                Ok(CanonicalValue::Mapping(result))
            }
        }
    }
}

async fn get_one(
    session: &mut dyn GnmiSession,
    path: Path,
    encoding: i32,
) -> GatewayResult<GetResponse> {
    let request = GetRequest {
        prefix: None,
        path: vec![path],
        r#type: DataType::All as i32,
        encoding,
    };
    Ok(session.get(request).await?)
}

/// Reduce a Get response to one canonical value.
///
/// A single update yields its value; several updates yield a mapping keyed by
/// each update's full path.
pub fn reduce_get_response(response: GetResponse) -> GatewayResult<CanonicalValue> {
    let mut values: Vec<(String, CanonicalValue)> = Vec::new();

    for notification in &response.notification {
        for update in &notification.update {
            let val = update.val.as_ref().ok_or_else(|| {
                GatewayError::protocol("gNMI update without a value")
            })?;
            let path = join_paths(notification.prefix.as_ref(), update.path.as_ref());
            values.push((path, typed_to_canonical(val)?));
        }
    }

    match values.len() {
        0 => Err(GatewayError::protocol("gNMI get response carried no updates")),
        1 => Ok(values.remove(0).1),
        _ => {
            let mut map = Mapping::new();
            for (path, value) in values {
                if path.is_empty() {
                    return Err(GatewayError::protocol(
                        "gNMI get response has several updates without paths",
                    ));
                }
                map.insert(path, value);
            }
            Ok(CanonicalValue::Mapping(map))
        }
    }
}

/// Normalize a Set acknowledgement
pub fn normalize_set_response(response: &SetResponse) -> CanonicalValue {
    let results = response
        .response
        .iter()
        .map(|result| {
            let op = update_result::Operation::try_from(result.op)
                .unwrap_or(update_result::Operation::Invalid);
            let mut entry = Mapping::new();
            entry.insert(
                "path".to_string(),
                join_paths(response.prefix.as_ref(), result.path.as_ref()).into(),
            );
            entry.insert("op".to_string(), op.as_str().into());
            CanonicalValue::Mapping(entry)
        })
        .collect();

    let mut ack = Mapping::new();
    ack.insert("timestamp".to_string(), response.timestamp.into());
    ack.insert("results".to_string(), CanonicalValue::Sequence(results));
    CanonicalValue::Mapping(ack)
}

fn gnmi_options(device: &DeviceDescriptor) -> GatewayResult<&GnmiOptions> {
    device.gnmi().ok_or_else(|| {
        GatewayError::InvalidConfig(format!(
            "device '{}' is a {} device, not gnmi",
            device.name,
            device.kind()
        ))
    })
}

#[async_trait]
impl DeviceDriver for GnmiDriver {
    fn kind(&self) -> ProtocolKind {
        ProtocolKind::Gnmi
    }

    async fn get(
        &self,
        device: &DeviceDescriptor,
        credential: &Credential,
        path: Option<&str>,
        deadline: Deadline,
    ) -> GatewayResult<CanonicalValue> {
        let options = gnmi_options(device)?;
        let plan = self.plan_get(device, options, path)?;
        let target = GnmiTarget::new(device, options, credential);

        let result = tokio::time::timeout_at(
            deadline.instant(),
            self.run_get(&target, plan, options.encoding.to_proto()),
        )
        .await
        .map_err(|_| deadline.expired())??;

        debug!(device = %device.name, "gNMI get complete");
        Ok(result)
    }

    async fn set(
        &self,
        device: &DeviceDescriptor,
        credential: &Credential,
        payload: &SetPayload,
        deadline: Deadline,
    ) -> GatewayResult<CanonicalValue> {
        let options = gnmi_options(device)?;
        let request = self.build_set(payload, options)?;
        let target = GnmiTarget::new(device, options, credential);
        let count = request.update.len();

        let response = tokio::time::timeout_at(deadline.instant(), async {
            let mut session = self.connector.connect(&target).await?;
            Ok::<_, GatewayError>(session.set(request).await?)
        })
        .await
        .map_err(|_| deadline.expired())??;

        info!(device = %device.name, updates = count, "gNMI set applied");
        Ok(normalize_set_response(&response))
    }
}
