//! Scripted gateway for testing call sequences.
//!
//! Tests queue responses in the order statements are expected, then
//! assert on the recorded statement text and bound parameters
//! afterwards. An unscripted call fails with `Rejected`, which doubles
//! as a generic injected store failure.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::error::{Result, StoreError};
use crate::gateway::{Row, StoreGateway, Value};

/// One recorded gateway call.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub sql: String,
    pub params: Vec<Value>,
}

#[derive(Debug, Clone)]
enum Response {
    Affected(u64),
    Rows(Vec<Row>),
    Error(String),
}

#[derive(Debug, Default)]
struct ScriptState {
    responses: VecDeque<Response>,
    calls: Vec<RecordedCall>,
}

/// In-memory gateway that plays back queued responses.
#[derive(Debug, Clone, Default)]
pub struct ScriptedGateway {
    state: Arc<Mutex<ScriptState>>,
}

impl ScriptedGateway {
    /// Creates an empty scripted gateway.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues an affected-row count for the next `run` call.
    pub fn push_affected(&self, rows: u64) {
        self.state
            .lock()
            .unwrap()
            .responses
            .push_back(Response::Affected(rows));
    }

    /// Queues a row set for the next `get`/`all` call.
    pub fn push_rows(&self, rows: Vec<Row>) {
        self.state
            .lock()
            .unwrap()
            .responses
            .push_back(Response::Rows(rows));
    }

    /// Queues a single row.
    pub fn push_row(&self, row: Row) {
        self.push_rows(vec![row]);
    }

    /// Queues an injected failure.
    pub fn push_error(&self, message: impl Into<String>) {
        self.state
            .lock()
            .unwrap()
            .responses
            .push_back(Response::Error(message.into()));
    }

    /// Returns every call recorded so far, in order.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.state.lock().unwrap().calls.clone()
    }

    fn next(&self, sql: &str, params: &[Value]) -> Result<Response> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(RecordedCall {
            sql: sql.to_string(),
            params: params.to_vec(),
        });
        state
            .responses
            .pop_front()
            .ok_or_else(|| StoreError::Rejected(format!("no scripted response for: {sql}")))
    }
}

#[async_trait]
impl StoreGateway for ScriptedGateway {
    async fn run(&self, sql: &str, params: &[Value]) -> Result<u64> {
        match self.next(sql, params)? {
            Response::Affected(n) => Ok(n),
            Response::Rows(rows) => Ok(rows.len() as u64),
            Response::Error(message) => Err(StoreError::Rejected(message)),
        }
    }

    async fn get(&self, sql: &str, params: &[Value]) -> Result<Option<Row>> {
        match self.next(sql, params)? {
            Response::Rows(rows) => Ok(rows.into_iter().next()),
            Response::Affected(_) => Ok(None),
            Response::Error(message) => Err(StoreError::Rejected(message)),
        }
    }

    async fn all(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        match self.next(sql, params)? {
            Response::Rows(rows) => Ok(rows),
            Response::Affected(_) => Ok(Vec::new()),
            Response::Error(message) => Err(StoreError::Rejected(message)),
        }
    }
}
