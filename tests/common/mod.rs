//! Shared test doubles: a scripted batch transport and an in-memory local cache.

#![allow(dead_code)]

use async_trait::async_trait;
use batchsave::{
    BatchSaveRequest, BatchTransport, LocalCache, Record, SaveError, SaveResult,
    TransportResponse,
};
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

pub const MOCK_URL: &str = "http://mock.test/api/data/batch";

type Responder = Box<dyn Fn(&BatchSaveRequest) -> SaveResult<TransportResponse> + Send + Sync>;

/// Replies with queued responders in order; records every request it receives.
/// Once the queue is empty every call succeeds with no ids.
pub struct MockTransport {
    responders: Mutex<VecDeque<Responder>>,
    requests: Mutex<Vec<BatchSaveRequest>>,
}

impl MockTransport {
    pub fn new() -> Self {
        MockTransport {
            responders: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn then<F>(self, responder: F) -> Self
    where
        F: Fn(&BatchSaveRequest) -> SaveResult<TransportResponse> + Send + Sync + 'static,
    {
        self.responders.lock().unwrap().push_back(Box::new(responder));
        self
    }

    /// Success assigning ids `first, first + 1, ...` to the operations in order.
    pub fn then_assign_ids(self, first: i64) -> Self {
        self.then(move |request| Ok(TransportResponse::ok(assign_ids(request, first))))
    }

    pub fn then_reply(self, status: u16, body: Value) -> Self {
        self.then(move |_| Ok(TransportResponse::new(status, body.clone())))
    }

    pub fn then_fail(self, err: SaveError) -> Self {
        self.then(move |_| Err(err.clone()))
    }

    pub fn requests(&self) -> Vec<BatchSaveRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl BatchTransport for MockTransport {
    fn endpoint(&self) -> String {
        MOCK_URL.to_string()
    }

    async fn post_batch(&self, request: &BatchSaveRequest) -> SaveResult<TransportResponse> {
        self.requests.lock().unwrap().push(request.clone());
        let responder = self.responders.lock().unwrap().pop_front();
        match responder {
            Some(responder) => responder(request),
            None => Ok(TransportResponse::ok(json!({"success": true}))),
        }
    }
}

pub fn assign_ids(request: &BatchSaveRequest, first: i64) -> Value {
    let ids: serde_json::Map<String, Value> = request
        .operations
        .iter()
        .zip(first..)
        .map(|(op, id)| (op.temp_id.clone(), json!(id)))
        .collect();
    json!({"success": true, "ids": ids})
}

/// Local cache over fixed table contents.
pub struct MemoryCache {
    pub initialized: bool,
    pub tables: HashMap<String, Vec<Record>>,
}

impl MemoryCache {
    pub fn with_table(table: &str, rows: Vec<Record>) -> Self {
        let mut tables = HashMap::new();
        tables.insert(table.to_string(), rows);
        MemoryCache {
            initialized: true,
            tables,
        }
    }
}

#[async_trait]
impl LocalCache for MemoryCache {
    fn is_initialized(&self) -> bool {
        self.initialized
    }

    async fn load_table_data(&self, table: &str) -> anyhow::Result<Vec<Record>> {
        self.tables
            .get(table)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("table '{table}' not cached"))
    }

    async fn sync(&self) -> anyhow::Result<()> {
        Ok(())
    }

    fn table_data(&self) -> HashMap<String, Vec<Record>> {
        self.tables.clone()
    }
}

pub fn record(value: Value) -> Record {
    match value {
        Value::Object(map) => map,
        other => panic!("expected a JSON object, got {other}"),
    }
}
