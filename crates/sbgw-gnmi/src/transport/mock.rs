//! Mock gNMI transport for testing

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;

use super::{GnmiConnector, GnmiSession, GnmiTarget, GnmiTransportError};
use crate::path::path_to_string;
use crate::proto::{
    typed_value, update_result, GetRequest, GetResponse, Notification, SetRequest, SetResponse,
    TypedValue, Update, UpdateResult,
};

/// Mock transport settings
#[derive(Debug, Clone, Default)]
pub struct MockGnmiConfig {
    /// Delay added to every RPC
    pub latency_ms: u64,
}

/// A Get RPC as seen by the mock
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedGet {
    pub device: String,
    pub paths: Vec<String>,
    pub encoding: i32,
}

/// A Set RPC as seen by the mock
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedSet {
    pub device: String,
    pub request: SetRequest,
}

#[derive(Debug, Clone)]
enum MockReply {
    Value(TypedValue),
    Response(GetResponse),
    Error(tonic::Code, String),
}

struct MockState {
    config: MockGnmiConfig,
    timestamp: i64,
    /// Canned replies keyed by rendered path (`origin:elem/elem[k=v]`)
    replies: RwLock<HashMap<String, MockReply>>,
    unreachable: RwLock<Vec<String>>,
    connects: RwLock<Vec<String>>,
    gets: RwLock<Vec<RecordedGet>>,
    sets: RwLock<Vec<RecordedSet>>,
    active: AtomicUsize,
    peak: AtomicUsize,
    released: AtomicUsize,
}

/// Mock connector; clones share state
#[derive(Clone)]
pub struct MockGnmiConnector {
    state: Arc<MockState>,
}

impl MockGnmiConnector {
    pub fn new(config: MockGnmiConfig) -> Self {
        Self {
            state: Arc::new(MockState {
                config,
                timestamp: 1_700_000_000_000_000_000,
                replies: RwLock::new(HashMap::new()),
                unreachable: RwLock::new(Vec::new()),
                connects: RwLock::new(Vec::new()),
                gets: RwLock::new(Vec::new()),
                sets: RwLock::new(Vec::new()),
                active: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
                released: AtomicUsize::new(0),
            }),
        }
    }

    /// Answer gets for `path` with a single update carrying `value`
    pub fn add_value(&self, path: &str, value: TypedValue) {
        self.state
            .replies
            .write()
            .insert(path.to_string(), MockReply::Value(value));
    }

    /// Answer gets for `path` with a JSON_IETF value
    pub fn add_json(&self, path: &str, value: serde_json::Value) {
        self.add_value(
            path,
            TypedValue {
                value: Some(typed_value::Value::JsonIetfVal(value.to_string().into_bytes())),
            },
        );
    }

    /// Answer gets for `path` with a complete response
    pub fn add_response(&self, path: &str, response: GetResponse) {
        self.state
            .replies
            .write()
            .insert(path.to_string(), MockReply::Response(response));
    }

    /// Fail RPCs touching `path` with the given status
    pub fn add_error(&self, path: &str, code: tonic::Code, message: &str) {
        self.state
            .replies
            .write()
            .insert(path.to_string(), MockReply::Error(code, message.to_string()));
    }

    /// Refuse connections to `device`
    pub fn set_unreachable(&self, device: &str) {
        self.state.unreachable.write().push(device.to_string());
    }

    pub fn timestamp(&self) -> i64 {
        self.state.timestamp
    }

    /// Devices connected to, in order (including refused attempts)
    pub fn connects(&self) -> Vec<String> {
        self.state.connects.read().clone()
    }

    pub fn gets(&self) -> Vec<RecordedGet> {
        self.state.gets.read().clone()
    }

    pub fn sets(&self) -> Vec<RecordedSet> {
        self.state.sets.read().clone()
    }

    /// Sessions currently open
    pub fn active_sessions(&self) -> usize {
        self.state.active.load(Ordering::SeqCst)
    }

    /// Highest number of sessions open at the same time
    pub fn peak_sessions(&self) -> usize {
        self.state.peak.load(Ordering::SeqCst)
    }

    /// Sessions dropped so far
    pub fn released_sessions(&self) -> usize {
        self.state.released.load(Ordering::SeqCst)
    }
}

impl Default for MockGnmiConnector {
    fn default() -> Self {
        Self::new(MockGnmiConfig::default())
    }
}

#[async_trait]
impl GnmiConnector for MockGnmiConnector {
    async fn connect(&self, target: &GnmiTarget) -> Result<Box<dyn GnmiSession>, GnmiTransportError> {
        self.state.connects.write().push(target.device.clone());

        if self.state.unreachable.read().contains(&target.device) {
            return Err(GnmiTransportError::ConnectionFailed(format!(
                "{}: connection refused",
                target.address
            )));
        }

        let active = self.state.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.peak.fetch_max(active, Ordering::SeqCst);

        Ok(Box::new(MockSession {
            device: target.device.clone(),
            state: self.state.clone(),
        }))
    }
}

struct MockSession {
    device: String,
    state: Arc<MockState>,
}

impl MockSession {
    async fn simulate_latency(&self) {
        if self.state.config.latency_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.state.config.latency_ms)).await;
        }
    }

    fn check_error(&self, path: &str) -> Result<(), GnmiTransportError> {
        match self.state.replies.read().get(path) {
            Some(MockReply::Error(code, message)) => Err(GnmiTransportError::Status {
                code: *code,
                message: message.clone(),
            }),
            _ => Ok(()),
        }
    }
}

impl Drop for MockSession {
    fn drop(&mut self) {
        self.state.active.fetch_sub(1, Ordering::SeqCst);
        self.state.released.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl GnmiSession for MockSession {
    async fn get(&mut self, request: GetRequest) -> Result<GetResponse, GnmiTransportError> {
        let paths: Vec<String> = request.path.iter().map(path_to_string).collect();
        self.state.gets.write().push(RecordedGet {
            device: self.device.clone(),
            paths: paths.clone(),
            encoding: request.encoding,
        });

        self.simulate_latency().await;

        let mut notification = Notification {
            timestamp: self.state.timestamp,
            ..Default::default()
        };
        for (rendered, path) in paths.iter().zip(request.path) {
            let reply = self.state.replies.read().get(rendered).cloned();
            match reply {
                Some(MockReply::Value(val)) => notification.update.push(Update {
                    path: Some(path),
                    val: Some(val),
                    duplicates: 0,
                }),
                Some(MockReply::Response(response)) => return Ok(response),
                Some(MockReply::Error(code, message)) => {
                    return Err(GnmiTransportError::Status { code, message })
                }
                None => {
                    return Err(GnmiTransportError::Status {
                        code: tonic::Code::NotFound,
                        message: format!("path {} not found", rendered),
                    })
                }
            }
        }

        Ok(GetResponse {
            notification: vec![notification],
        })
    }

    async fn set(&mut self, request: SetRequest) -> Result<SetResponse, GnmiTransportError> {
        self.state.sets.write().push(RecordedSet {
            device: self.device.clone(),
            request: request.clone(),
        });

        self.simulate_latency().await;

        let mut response = Vec::new();
        for path in &request.delete {
            self.check_error(&path_to_string(path))?;
            response.push(UpdateResult {
                path: Some(path.clone()),
                op: update_result::Operation::Delete as i32,
            });
        }
        for (updates, op) in [
            (&request.replace, update_result::Operation::Replace),
            (&request.update, update_result::Operation::Update),
        ] {
            for update in updates {
                let path = update.path.clone().unwrap_or_default();
                self.check_error(&path_to_string(&path))?;
                response.push(UpdateResult {
                    path: Some(path),
                    op: op as i32,
                });
            }
        }

        Ok(SetResponse {
            prefix: request.prefix,
            response,
            timestamp: self.state.timestamp,
        })
    }
}
