//! Per-item ledger for batch tools
//!
//! Sub-items are processed in input order. The ledger records one entry per
//! attempted item and never turns a partial failure into a call failure.

use serde_json::{Map, Value, json};

use super::{Args, ToolResult};
use super::args::get_bool_or;

pub const CONTINUE_ON_ERROR: &str = "continue_on_error";

#[derive(Debug, Clone)]
pub struct BatchLedger {
    id_key: &'static str,
    continue_on_error: bool,
    success: usize,
    failed: usize,
    results: Vec<Value>,
}

impl BatchLedger {
    pub fn new(id_key: &'static str, continue_on_error: bool) -> Self {
        Self {
            id_key,
            continue_on_error,
            success: 0,
            failed: 0,
            results: Vec::new(),
        }
    }

    /// Read `continue_on_error` from the call arguments (default true)
    pub fn from_args(args: &Args, id_key: &'static str) -> Self {
        Self::new(id_key, get_bool_or(args, CONTINUE_ON_ERROR, true))
    }

    pub fn succeed(&mut self, index: usize, id: Option<Value>) {
        self.success += 1;
        let entry = self.entry(index, id, "success", None);
        self.results.push(entry);
    }

    pub fn fail(&mut self, index: usize, id: Option<Value>, error: impl Into<String>) {
        self.failed += 1;
        let entry = self.entry(index, id, "failed", Some(error.into()));
        self.results.push(entry);
    }

    /// True once a failure has been recorded and the caller asked to stop on error
    pub fn should_stop(&self) -> bool {
        !self.continue_on_error && self.failed > 0
    }

    pub fn success_count(&self) -> usize {
        self.success
    }

    pub fn failed_count(&self) -> usize {
        self.failed
    }

    pub fn into_value(self) -> Value {
        json!({
            "success": self.success,
            "failed": self.failed,
            "results": self.results,
        })
    }

    pub fn into_result(self) -> ToolResult {
        ToolResult::json(&self.into_value())
    }

    fn entry(&self, index: usize, id: Option<Value>, status: &str, error: Option<String>) -> Value {
        let mut entry = Map::new();
        entry.insert("index".to_string(), json!(index));
        if let Some(id) = id {
            entry.insert(self.id_key.to_string(), id);
        }
        entry.insert("status".to_string(), json!(status));
        if let Some(error) = error {
            entry.insert("error".to_string(), json!(error));
        }
        Value::Object(entry)
    }
}
