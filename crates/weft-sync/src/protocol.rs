//! Request/response wire protocol between sessions and a log server.
//!
//! Requests and responses are tagged JSON bodies posted with the
//! `application/x-sjson` content type:
//!
//! ```text
//! {"ops/nw.request":  ["Append", [ops...], -1, -1, 0]}
//! {"ops/nw.request":  ["GetSince", [], version, limit, duration_ns]}
//! {"ops/nw.response": [[ops...] | null, {"ops/nw.strError": msg} | null]}
//! ```
//!
//! [`Server`] answers encoded requests against any [`Connection`];
//! [`HttpConnection`] is a [`Connection`] that sends them through a
//! [`Transport`].

use crate::connection::Connection;
use crate::error::{Result, SyncError};
use crate::operation::{decode_ops, encode_ops, Operation};
use async_trait::async_trait;
use serde_json::{json, Value as Json};
use std::sync::Arc;
use weft_core::{CoreError, Registry};

pub const CONTENT_TYPE: &str = "application/x-sjson";
pub const REQUEST_TAG: &str = "ops/nw.request";
pub const RESPONSE_TAG: &str = "ops/nw.response";
pub const ERROR_TAG: &str = "ops/nw.strError";

const NANOS_PER_MILLI: i64 = 1_000_000;

/// A request to the log server.
#[derive(Clone, Debug, PartialEq)]
pub enum Request {
    Append(Vec<Operation>),
    GetSince {
        version: i64,
        limit: usize,
        duration_ms: i64,
    },
}

impl Request {
    pub fn encode(&self) -> Json {
        let body = match self {
            Request::Append(ops) => json!(["Append", encode_ops(ops), -1, -1, 0]),
            Request::GetSince {
                version,
                limit,
                duration_ms,
            } => json!([
                "GetSince",
                [],
                version,
                limit,
                duration_ms.saturating_mul(NANOS_PER_MILLI)
            ]),
        };
        json!({ REQUEST_TAG: body })
    }

    pub fn decode(registry: &Registry, json: &Json) -> Result<Request> {
        let body = json
            .get(REQUEST_TAG)
            .and_then(Json::as_array)
            .ok_or_else(|| SyncError::Protocol(format!("expected {}", REQUEST_TAG)))?;
        if body.len() != 5 {
            return Err(CoreError::Arity {
                tag: REQUEST_TAG.to_string(),
                expected: 5,
                found: body.len(),
            }
            .into());
        }

        match body[0].as_str() {
            Some("Append") => Ok(Request::Append(decode_ops(registry, &body[1])?)),
            Some("GetSince") => {
                let int = |j: &Json| {
                    j.as_i64()
                        .ok_or_else(|| SyncError::Protocol(format!("expected an integer, got {}", j)))
                };
                Ok(Request::GetSince {
                    version: int(&body[2])?,
                    limit: usize::try_from(int(&body[3])?).unwrap_or(0),
                    duration_ms: int(&body[4])? / NANOS_PER_MILLI,
                })
            }
            _ => Err(SyncError::Protocol(format!("unknown request {}", body[0]))),
        }
    }
}

/// The server's answer: operations read, or an error message.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Response {
    pub ops: Vec<Operation>,
    pub error: Option<String>,
}

impl Response {
    pub fn ok(ops: Vec<Operation>) -> Self {
        Self { ops, error: None }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            ops: Vec::new(),
            error: Some(message.into()),
        }
    }

    pub fn encode(&self) -> Json {
        let ops = if self.ops.is_empty() {
            Json::Null
        } else {
            encode_ops(&self.ops)
        };
        let error = match &self.error {
            Some(message) => json!({ ERROR_TAG: message }),
            None => Json::Null,
        };
        json!({ RESPONSE_TAG: [ops, error] })
    }

    pub fn decode(registry: &Registry, json: &Json) -> Result<Response> {
        let body = json
            .get(RESPONSE_TAG)
            .and_then(Json::as_array)
            .ok_or_else(|| SyncError::Protocol(format!("expected {}", RESPONSE_TAG)))?;
        let ops = decode_ops(registry, body.first().unwrap_or(&Json::Null))?;
        let error = body
            .get(1)
            .and_then(|e| e.get(ERROR_TAG))
            .and_then(Json::as_str)
            .map(str::to_string);
        Ok(Response { ops, error })
    }
}

/// Moves an encoded request body to a server and returns the reply body.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    async fn post(&self, content_type: &str, body: String) -> Result<String>;
}

/// Serves encoded requests from a [`Connection`].
pub struct Server<C: Connection> {
    conn: Arc<C>,
    registry: Registry,
}

impl<C: Connection> Server<C> {
    pub fn new(conn: Arc<C>, registry: Registry) -> Self {
        Self { conn, registry }
    }

    /// Answer one request.
    ///
    /// Only a wrong content type is an error; everything else, including
    /// undecodable bodies and connection failures, is reported inside the
    /// response.
    pub async fn handle(&self, content_type: &str, body: &str) -> Result<String> {
        if content_type.trim() != CONTENT_TYPE {
            return Err(SyncError::Protocol(format!(
                "content-type is not {}: {}",
                CONTENT_TYPE, content_type
            )));
        }

        let response = match self.dispatch(body).await {
            Ok(ops) => Response::ok(ops),
            Err(err) => {
                tracing::warn!(error = %err, "request failed");
                Response::error(err.to_string())
            }
        };
        Ok(response.encode().to_string())
    }

    async fn dispatch(&self, body: &str) -> Result<Vec<Operation>> {
        let json: Json = serde_json::from_str(body)?;
        match Request::decode(&self.registry, &json)? {
            Request::Append(ops) => {
                self.conn.write(ops).await?;
                Ok(Vec::new())
            }
            Request::GetSince {
                version,
                limit,
                duration_ms,
            } => Ok(self.conn.read(version, limit, duration_ms).await?.unwrap_or_default()),
        }
    }
}

#[async_trait]
impl<C: Connection> Transport for Server<C> {
    async fn post(&self, content_type: &str, body: String) -> Result<String> {
        self.handle(content_type, &body).await
    }
}

/// A [`Connection`] to a remote log reached through a [`Transport`].
pub struct HttpConnection<T: Transport> {
    transport: Arc<T>,
    registry: Registry,
}

impl<T: Transport> HttpConnection<T> {
    pub fn new(transport: Arc<T>, registry: Registry) -> Self {
        Self { transport, registry }
    }

    async fn request(&self, request: Request) -> Result<Vec<Operation>> {
        let body = request.encode().to_string();
        let reply = self.transport.post(CONTENT_TYPE, body).await?;
        let json: Json = serde_json::from_str(&reply)?;
        let response = Response::decode(&self.registry, &json)?;
        match response.error {
            Some(message) => Err(SyncError::Transport(message)),
            None => Ok(response.ops),
        }
    }
}

#[async_trait]
impl<T: Transport> Connection for HttpConnection<T> {
    async fn write(&self, ops: Vec<Operation>) -> Result<()> {
        self.request(Request::Append(ops)).await.map(|_| ())
    }

    async fn read(&self, version: i64, limit: usize, duration_ms: i64) -> Result<Option<Vec<Operation>>> {
        let ops = self
            .request(Request::GetSince {
                version,
                limit,
                duration_ms,
            })
            .await?;
        Ok(if ops.is_empty() { None } else { Some(ops) })
    }
}
