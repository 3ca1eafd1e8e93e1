//! Bolt response messages.
//!
//! The server answers every request with SUCCESS, FAILURE or IGNORED;
//! PULL and DISCARD may stream RECORD messages first. SUCCESS metadata is
//! flattened into a typed envelope in a single pass; unrecognized keys are
//! silently ignored so newer servers stay compatible.

use std::collections::HashMap;

use super::metadata::{Notification, Plan, ProfiledPlan, RoutingTable};
use crate::bolt::error::Neo4jError;
use crate::bolt::packstream::PackStreamValue;
use crate::driver::types::Record;

/// One hydrated response message.
#[derive(Debug, Clone)]
pub enum BoltResponse {
    /// Request completed; metadata parsed into the envelope
    Success(SuccessMessage),
    /// One streamed result row
    Record(Record),
    /// Request failed server-side
    Failure(FailureMessage),
    /// Request skipped because the connection is in the failed state
    Ignored,
}

impl BoltResponse {
    /// Message name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            BoltResponse::Success(_) => "SUCCESS",
            BoltResponse::Record(_) => "RECORD",
            BoltResponse::Failure(_) => "FAILURE",
            BoltResponse::Ignored => "IGNORED",
        }
    }
}

/// Statement type reported in a result summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatementType {
    /// The server did not report a type
    #[default]
    Unknown,
    /// Read-only query (`r`)
    Read,
    /// Write-only query (`w`)
    Write,
    /// Read-write query (`rw`)
    ReadWrite,
    /// Schema command (`s`)
    Schema,
}

impl StatementType {
    fn from_wire(s: &str) -> Self {
        match s {
            "r" => StatementType::Read,
            "w" => StatementType::Write,
            "rw" => StatementType::ReadWrite,
            "s" => StatementType::Schema,
            _ => StatementType::Unknown,
        }
    }
}

/// Parsed SUCCESS metadata.
///
/// All fields the protocol may deliver, flattened with defaults:
/// numeric sentinels are `-1`, strings are empty, optionals are `None`.
/// `num` records how many keys the raw map carried.
#[derive(Debug, Clone)]
pub struct SuccessMessage {
    /// ms until the first record was available (RUN)
    pub tfirst: i64,
    /// ms until streaming finished (PULL/DISCARD)
    pub tlast: i64,
    /// Query id for interleaved streams; -1 addresses the latest
    pub qid: i64,
    /// Result column names (RUN)
    pub fields: Vec<String>,
    /// Causal-consistency token (PULL/COMMIT)
    pub bookmark: String,
    /// Statement type (`type` key)
    pub qtype: StatementType,
    /// Database the work ran against
    pub db: String,
    /// More records buffered server-side; PULL again to continue
    pub has_more: bool,
    /// Server-assigned connection id (HELLO)
    pub connection_id: String,
    /// Server agent string (HELLO)
    pub server: String,
    /// Acknowledged protocol patches (HELLO)
    pub patches: Vec<String>,
    /// Connection hints (HELLO), e.g. `connection.recv_timeout_seconds`
    pub hints: HashMap<String, PackStreamValue>,
    /// EXPLAIN plan
    pub plan: Option<Plan>,
    /// PROFILE plan
    pub profile: Option<ProfiledPlan>,
    /// Notifications attached to the summary
    pub notifications: Vec<Notification>,
    /// Routing table (ROUTE)
    pub routing_table: Option<RoutingTable>,
    /// Number of keys the metadata map carried
    pub num: usize,
}

impl Default for SuccessMessage {
    fn default() -> Self {
        Self {
            tfirst: -1,
            tlast: -1,
            qid: -1,
            fields: Vec::new(),
            bookmark: String::new(),
            qtype: StatementType::Unknown,
            db: String::new(),
            has_more: false,
            connection_id: String::new(),
            server: String::new(),
            patches: Vec::new(),
            hints: HashMap::new(),
            plan: None,
            profile: None,
            notifications: Vec::new(),
            routing_table: None,
            num: 0,
        }
    }
}

impl SuccessMessage {
    /// Flatten a raw metadata map in one pass.
    pub fn parse(metadata: HashMap<String, PackStreamValue>) -> Self {
        let mut success = SuccessMessage {
            num: metadata.len(),
            ..Default::default()
        };

        for (key, value) in metadata {
            match key.as_str() {
                "t_first" => success.tfirst = value.as_int().unwrap_or(-1),
                "t_last" => success.tlast = value.as_int().unwrap_or(-1),
                "qid" => success.qid = value.as_int().unwrap_or(-1),
                "fields" => {
                    if let PackStreamValue::List(items) = value {
                        success.fields = items
                            .into_iter()
                            .filter_map(|item| match item {
                                PackStreamValue::String(s) => Some(s),
                                _ => None,
                            })
                            .collect();
                    }
                }
                "bookmark" => {
                    if let PackStreamValue::String(s) = value {
                        success.bookmark = s;
                    }
                }
                "type" => {
                    if let Some(s) = value.as_str() {
                        success.qtype = StatementType::from_wire(s);
                    }
                }
                "db" => {
                    if let PackStreamValue::String(s) = value {
                        success.db = s;
                    }
                }
                "has_more" => success.has_more = value.as_bool().unwrap_or(false),
                "connection_id" => {
                    if let PackStreamValue::String(s) = value {
                        success.connection_id = s;
                    }
                }
                "server" => {
                    if let PackStreamValue::String(s) = value {
                        success.server = s;
                    }
                }
                "patch_bolt" => {
                    if let PackStreamValue::List(items) = value {
                        success.patches = items
                            .into_iter()
                            .filter_map(|item| match item {
                                PackStreamValue::String(s) => Some(s),
                                _ => None,
                            })
                            .collect();
                    }
                }
                "hints" => {
                    if let PackStreamValue::Map(m) = value {
                        success.hints = m;
                    }
                }
                "plan" => success.plan = value.as_map().and_then(Plan::from_map),
                "profile" => success.profile = value.as_map().and_then(ProfiledPlan::from_map),
                "notifications" => {
                    if let Some(items) = value.as_list() {
                        success.notifications = items
                            .iter()
                            .filter_map(|item| item.as_map().and_then(Notification::from_map))
                            .collect();
                    }
                }
                "rt" => {
                    success.routing_table = value.as_map().map(RoutingTable::from_map);
                }
                // Unknown keys are tolerated by design.
                _ => {}
            }
        }

        success
    }

    /// The acknowledged patch list contains `utc`.
    pub fn utc_patch_acknowledged(&self) -> bool {
        self.patches.iter().any(|p| p == "utc")
    }

    /// Hint value of `connection.recv_timeout_seconds`, when present
    /// and positive.
    pub fn recv_timeout_seconds(&self) -> Option<u64> {
        self.hints
            .get("connection.recv_timeout_seconds")
            .and_then(|v| v.as_int())
            .filter(|secs| *secs > 0)
            .map(|secs| secs as u64)
    }
}

/// Parsed FAILURE metadata.
#[derive(Debug, Clone)]
pub struct FailureMessage {
    /// Namespaced failure code
    pub code: String,
    /// Human-readable message
    pub message: String,
}

impl FailureMessage {
    /// Extract code and message; everything else in the map is ignored.
    pub fn parse(metadata: &HashMap<String, PackStreamValue>) -> Self {
        Self {
            code: metadata
                .get("code")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string(),
            message: metadata
                .get("message")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string(),
        }
    }

    /// Convert into the error representation.
    pub fn into_error(self) -> Neo4jError {
        Neo4jError::new(self.code, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn value_map(pairs: Vec<(&str, PackStreamValue)>) -> HashMap<String, PackStreamValue> {
        pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
    }

    #[test]
    fn empty_metadata_uses_defaults() {
        let s = SuccessMessage::parse(HashMap::new());
        assert_eq!(s.tfirst, -1);
        assert_eq!(s.tlast, -1);
        assert_eq!(s.qid, -1);
        assert_eq!(s.num, 0);
        assert!(s.fields.is_empty());
        assert!(!s.has_more);
        assert_eq!(s.qtype, StatementType::Unknown);
    }

    #[test]
    fn hello_response() {
        let s = SuccessMessage::parse(value_map(vec![
            ("connection_id", "connid".into()),
            ("server", "srv".into()),
            ("details", PackStreamValue::Integer(1)), // ignored
        ]));
        assert_eq!(s.connection_id, "connid");
        assert_eq!(s.server, "srv");
        assert_eq!(s.num, 3);
        assert_eq!(s.qid, -1);
    }

    #[test]
    fn run_response_with_unknown_keys() {
        let s = SuccessMessage::parse(value_map(vec![
            ("unknown", PackStreamValue::Integer(666)),
            (
                "fields",
                PackStreamValue::List(vec!["field1".into(), "field2".into()]),
            ),
            ("t_first", PackStreamValue::Integer(10_000)),
        ]));
        assert_eq!(s.fields, vec!["field1", "field2"]);
        assert_eq!(s.tfirst, 10_000);
        assert_eq!(s.tlast, -1);
        assert_eq!(s.qid, -1);
        assert_eq!(s.num, 3);
    }

    #[test]
    fn run_response_with_qid() {
        let s = SuccessMessage::parse(value_map(vec![
            ("qid", PackStreamValue::Integer(777)),
            ("fields", PackStreamValue::List(vec!["f".into()])),
        ]));
        assert_eq!(s.qid, 777);
    }

    #[test]
    fn streaming_page_with_more_data() {
        let s = SuccessMessage::parse(value_map(vec![(
            "has_more",
            PackStreamValue::Boolean(true),
        )]));
        assert!(s.has_more);
        assert_eq!(s.num, 1);
    }

    #[test]
    fn pull_summary() {
        let s = SuccessMessage::parse(value_map(vec![
            ("bookmark", "b".into()),
            ("t_last", PackStreamValue::Integer(124)),
            ("type", "w".into()),
            ("db", "s".into()),
        ]));
        assert_eq!(s.bookmark, "b");
        assert_eq!(s.tlast, 124);
        assert_eq!(s.qtype, StatementType::Write);
        assert_eq!(s.db, "s");
    }

    #[test]
    fn statement_types() {
        for (wire, expected) in [
            ("r", StatementType::Read),
            ("w", StatementType::Write),
            ("rw", StatementType::ReadWrite),
            ("s", StatementType::Schema),
            ("??", StatementType::Unknown),
        ] {
            let s = SuccessMessage::parse(value_map(vec![("type", wire.into())]));
            assert_eq!(s.qtype, expected);
        }
    }

    #[test]
    fn patches_and_hints() {
        let s = SuccessMessage::parse(value_map(vec![
            (
                "patch_bolt",
                PackStreamValue::List(vec!["utc".into(), "mystery".into()]),
            ),
            (
                "hints",
                PackStreamValue::Map(value_map(vec![(
                    "connection.recv_timeout_seconds",
                    PackStreamValue::Integer(30),
                )])),
            ),
        ]));
        assert!(s.utc_patch_acknowledged());
        assert_eq!(s.recv_timeout_seconds(), Some(30));
    }

    #[test]
    fn non_positive_recv_timeout_is_ignored() {
        let s = SuccessMessage::parse(value_map(vec![(
            "hints",
            PackStreamValue::Map(value_map(vec![(
                "connection.recv_timeout_seconds",
                PackStreamValue::Integer(0),
            )])),
        )]));
        assert_eq!(s.recv_timeout_seconds(), None);
    }

    #[test]
    fn route_response() {
        let rt = value_map(vec![
            ("ttl", PackStreamValue::Integer(1001)),
            ("db", "dbname".into()),
            ("servers", PackStreamValue::List(vec![])),
        ]);
        let s = SuccessMessage::parse(value_map(vec![("rt", PackStreamValue::Map(rt))]));
        let table = s.routing_table.unwrap();
        assert_eq!(table.time_to_live, 1001);
        assert_eq!(table.database_name.as_deref(), Some("dbname"));
    }

    #[test]
    fn failure_parse() {
        let f = FailureMessage::parse(&value_map(vec![
            ("code", "the code".into()),
            ("message", "mess".into()),
            ("extra key", PackStreamValue::Integer(1)), // ignored
        ]));
        assert_eq!(f.code, "the code");
        assert_eq!(f.message, "mess");

        let err = f.into_error();
        assert_eq!(err.code, "the code");
    }

    #[test]
    fn response_names() {
        assert_eq!(
            BoltResponse::Success(SuccessMessage::default()).name(),
            "SUCCESS"
        );
        assert_eq!(BoltResponse::Ignored.name(), "IGNORED");
    }
}
