//! Dispatcher - runs one device operation through the request stages

use std::sync::Arc;

use sbgw_core::{
    CanonicalValue, Credential, Deadline, DeviceDescriptor, DeviceDriver, DeviceSummary,
    GatewayError, GatewayResult, NativeDocument, OperationKind, OperationRequest, SetPayload,
};
use tracing::{debug, info_span, Instrument};

use crate::context::GatewayContext;

/// Stateless request dispatcher over a shared [`GatewayContext`]
#[derive(Clone)]
pub struct Dispatcher {
    context: Arc<GatewayContext>,
}

/// Result of the Resolve, Authenticate and SelectDriver stages
struct Prepared<'a> {
    device: DeviceDescriptor,
    credential: Credential,
    driver: &'a Arc<dyn DeviceDriver>,
    deadline: Deadline,
}

impl Dispatcher {
    pub fn new(context: Arc<GatewayContext>) -> Self {
        Self { context }
    }

    pub fn context(&self) -> &GatewayContext {
        &self.context
    }

    /// Run a get or set and return its canonical result
    pub async fn dispatch(&self, request: OperationRequest) -> GatewayResult<CanonicalValue> {
        let span = info_span!(
            "dispatch",
            device = %request.device_name,
            operation = request.kind.as_str()
        );
        self.run(request).instrument(span).await
    }

    async fn run(&self, request: OperationRequest) -> GatewayResult<CanonicalValue> {
        let prepared = self.prepare(&request.device_name).await?;
        match request.kind {
            OperationKind::Get => self.execute_get(&prepared, request.path.as_deref()).await,
            OperationKind::Set => {
                let payload = request.body.as_ref().ok_or_else(|| {
                    GatewayError::BadRequest("set requires a request body".to_string())
                })?;
                self.execute_set(&prepared, payload).await
            }
        }
    }

    /// Run a set whose body is decoded only once the device has resolved.
    ///
    /// Unknown devices and unusable registry entries are reported ahead of
    /// body errors, matching the stage order of [`Dispatcher::dispatch`].
    pub async fn dispatch_set<F>(&self, device_name: &str, decode: F) -> GatewayResult<CanonicalValue>
    where
        F: FnOnce() -> GatewayResult<SetPayload> + Send,
    {
        let span = info_span!("dispatch", device = %device_name, operation = "set");
        async {
            let prepared = self.prepare(device_name).await?;
            debug!(stage = "decode", "Decoding request body");
            let payload = decode()?;
            self.execute_set(&prepared, &payload).await
        }
        .instrument(span)
        .await
    }

    async fn execute_get(
        &self,
        prepared: &Prepared<'_>,
        path: Option<&str>,
    ) -> GatewayResult<CanonicalValue> {
        debug!(stage = "execute", "Executing get");
        let result = prepared
            .driver
            .get(&prepared.device, &prepared.credential, path, prepared.deadline)
            .await;
        log_outcome(&result);
        result
    }

    async fn execute_set(
        &self,
        prepared: &Prepared<'_>,
        payload: &SetPayload,
    ) -> GatewayResult<CanonicalValue> {
        debug!(stage = "execute", "Executing set");
        let result = prepared
            .driver
            .set(&prepared.device, &prepared.credential, payload, prepared.deadline)
            .await;
        log_outcome(&result);
        result
    }

    /// Fetch the device's native document, bypassing normalization
    pub async fn native_get(&self, device_name: &str) -> GatewayResult<NativeDocument> {
        let span = info_span!("dispatch", device = %device_name, operation = "native_get");
        async {
            let prepared = self.prepare(device_name).await?;
            debug!(stage = "execute", "Fetching native document");
            prepared
                .driver
                .get_native(&prepared.device, &prepared.credential, prepared.deadline)
                .await
        }
        .instrument(span)
        .await
    }

    /// Registered devices, in registry order
    pub async fn list_devices(&self) -> GatewayResult<Vec<DeviceSummary>> {
        self.context.registry().list().await
    }

    async fn prepare(&self, device_name: &str) -> GatewayResult<Prepared<'_>> {
        debug!(stage = "resolve", registry = %self.context.registry().describe(), "Resolving device");
        let device = self.context.registry().lookup(device_name).await?;

        debug!(stage = "authenticate", "Resolving credential");
        let credential = self.context.credentials().resolve(&device.name)?;

        let kind = device.kind();
        debug!(stage = "select_driver", protocol = %kind, "Selecting driver");
        let driver = self.context.driver(kind)?;

        Ok(Prepared {
            device,
            credential,
            driver,
            deadline: Deadline::after(self.context.request_timeout()),
        })
    }
}

fn log_outcome(result: &GatewayResult<CanonicalValue>) {
    match result {
        Ok(_) => debug!(stage = "return", "Operation succeeded"),
        Err(e) => debug!(stage = "return", error = %e, "Operation failed"),
    }
}
