//! Bounded log of bridge exchanges, kept per client for diagnostics.

use std::collections::{HashMap, VecDeque};
use std::time::Instant;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::endpoint::CommandKind;
use crate::transport::Method;

/// Direction of a recorded message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageType {
    Send,
    Receive,
}

/// One request body or reply, tagged with the command it belonged to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub msg_type: MessageType,
    pub kind: CommandKind,
    pub method: Method,
    pub message: Value,
    /// Seconds since the history was created
    pub timestamp: f64,
}

/// Exchanges with one bridge, oldest first.
///
/// Only the newest `max_entries` entries are kept; the latest body per
/// direction and command kind survives eviction.
#[derive(Debug, Clone)]
pub struct MessageHistory {
    entries: VecDeque<HistoryEntry>,
    latest: HashMap<(MessageType, CommandKind), Value>,
    last_error: Option<String>,
    errors: usize,
    max_entries: usize,
    created: Instant,
}

impl Default for MessageHistory {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageHistory {
    pub const DEFAULT_MAX_ENTRIES: usize = 100;

    pub fn new() -> Self {
        Self::with_max_entries(Self::DEFAULT_MAX_ENTRIES)
    }

    /// A history that keeps at most `max_entries` entries.
    pub fn with_max_entries(max_entries: usize) -> Self {
        MessageHistory {
            entries: VecDeque::with_capacity(max_entries.min(Self::DEFAULT_MAX_ENTRIES)),
            latest: HashMap::new(),
            last_error: None,
            errors: 0,
            max_entries,
            created: Instant::now(),
        }
    }

    /// Append a message, evicting the oldest entry when full.
    pub fn record(&mut self, msg_type: MessageType, kind: CommandKind, method: Method, message: &Value) {
        self.latest.insert((msg_type, kind), message.clone());

        if self.max_entries == 0 {
            return;
        }
        if self.entries.len() == self.max_entries {
            self.entries.pop_front();
        }
        self.entries.push_back(HistoryEntry {
            msg_type,
            kind,
            method,
            message: message.clone(),
            timestamp: self.created.elapsed().as_secs_f64(),
        });
    }

    /// Remember a failed exchange.
    pub fn record_error(&mut self, error: &str) {
        self.errors += 1;
        self.last_error = Some(error.to_string());
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Most recent body of the given direction for a command kind.
    pub fn latest(&self, msg_type: MessageType, kind: CommandKind) -> Option<&Value> {
        self.latest.get(&(msg_type, kind))
    }

    pub fn entries(&self) -> &VecDeque<HistoryEntry> {
        &self.entries
    }

    /// Entries that belong to one command kind.
    pub fn for_kind(&self, kind: CommandKind) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter().filter(move |e| e.kind == kind)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.latest.clear();
        self.last_error = None;
        self.errors = 0;
    }

    pub fn summary(&self) -> HistorySummary {
        let mut summary = HistorySummary {
            send_count: 0,
            receive_count: 0,
            error_count: self.errors,
            total_entries: self.entries.len(),
            last_command: self.entries.back().map(|e| format!("{} {}", e.method, e.kind)),
            last_error: self.last_error.clone(),
        };
        for entry in &self.entries {
            match entry.msg_type {
                MessageType::Send => summary.send_count += 1,
                MessageType::Receive => summary.receive_count += 1,
            }
        }
        summary
    }
}

/// Counters over the retained history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistorySummary {
    pub send_count: usize,
    pub receive_count: usize,
    pub error_count: usize,
    pub total_entries: usize,
    pub last_command: Option<String>,
    pub last_error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_record_exchange() {
        let mut history = MessageHistory::new();
        history.record(MessageType::Send, CommandKind::LightState, Method::Put, &json!({"on": true}));
        history.record(
            MessageType::Receive,
            CommandKind::LightState,
            Method::Put,
            &json!([{"success": {}}]),
        );

        assert_eq!(history.len(), 2);
        assert_eq!(history.entries()[0].kind, CommandKind::LightState);
        assert_eq!(history.entries()[0].method, Method::Put);
        assert_eq!(
            history.latest(MessageType::Send, CommandKind::LightState),
            Some(&json!({"on": true}))
        );

        let summary = history.summary();
        assert_eq!(summary.receive_count, 1);
        assert_eq!(summary.last_command.as_deref(), Some("PUT light_state"));
    }

    #[test]
    fn test_record_error() {
        let mut history = MessageHistory::new();
        history.record_error("Connection timeout");
        history.record_error("Connection refused");
        assert_eq!(history.last_error(), Some("Connection refused"));
        assert_eq!(history.summary().error_count, 2);
        history.clear();
        assert_eq!(history.last_error(), None);
        assert_eq!(history.summary().error_count, 0);
    }

    #[test]
    fn test_oldest_entries_are_evicted() {
        let mut history = MessageHistory::with_max_entries(2);
        for i in 0..5 {
            history.record(MessageType::Send, CommandKind::Lights, Method::Get, &json!({"n": i}));
        }
        history.record(MessageType::Send, CommandKind::Scenes, Method::Get, &json!({"n": 5}));

        assert_eq!(history.len(), 2);
        assert_eq!(history.entries()[0].message, json!({"n": 4}));
        assert_eq!(history.for_kind(CommandKind::Scenes).count(), 1);
        assert_eq!(
            history.latest(MessageType::Send, CommandKind::Lights),
            Some(&json!({"n": 4}))
        );
    }

    #[test]
    fn test_entries_serialize_with_wire_names() {
        let mut history = MessageHistory::new();
        history.record(MessageType::Receive, CommandKind::GroupAction, Method::Put, &json!([]));

        let entry = serde_json::to_value(&history.entries()[0]).unwrap();
        assert_eq!(entry["kind"], "group_action");
        assert_eq!(entry["method"], "PUT");
    }
}
