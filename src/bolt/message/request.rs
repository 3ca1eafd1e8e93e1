//! Bolt request messages.
//!
//! Each request knows how to encode itself to a PackStream structure for
//! a given protocol version. This client never decodes requests; the
//! server side of the conversation is out of scope.

use std::collections::HashMap;
use std::time::Duration;

use super::tag;
use crate::bolt::handshake::BoltVersion;
use crate::bolt::packstream::{PackStreamStructure, PackStreamValue};
use crate::driver::config::AccessMode;

/// All request messages this client can send.
#[derive(Debug, Clone)]
pub enum BoltRequest {
    /// HELLO - open and configure the connection
    Hello(HelloMessage),
    /// LOGON - authenticate (Bolt 5.1+)
    Logon(LogonMessage),
    /// LOGOFF - drop authentication (Bolt 5.1+)
    Logoff,
    /// GOODBYE - clean shutdown, no response expected
    Goodbye,
    /// RESET - discard pending work, return to ready
    Reset,
    /// RUN - execute a query
    Run(RunMessage),
    /// PULL - fetch buffered records
    Pull(PullMessage),
    /// DISCARD - drop buffered records
    Discard(DiscardMessage),
    /// BEGIN - open an explicit transaction
    Begin(BeginMessage),
    /// COMMIT - commit the open transaction
    Commit,
    /// ROLLBACK - roll back the open transaction
    Rollback,
    /// ROUTE - fetch the routing table (Bolt 4.3+)
    Route(RouteMessage),
    /// TELEMETRY - report driver API usage (Bolt 5.4+)
    Telemetry(TelemetryMessage),
}

impl BoltRequest {
    /// Message name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            BoltRequest::Hello(_) => "HELLO",
            BoltRequest::Logon(_) => "LOGON",
            BoltRequest::Logoff => "LOGOFF",
            BoltRequest::Goodbye => "GOODBYE",
            BoltRequest::Reset => "RESET",
            BoltRequest::Run(_) => "RUN",
            BoltRequest::Pull(_) => "PULL",
            BoltRequest::Discard(_) => "DISCARD",
            BoltRequest::Begin(_) => "BEGIN",
            BoltRequest::Commit => "COMMIT",
            BoltRequest::Rollback => "ROLLBACK",
            BoltRequest::Route(_) => "ROUTE",
            BoltRequest::Telemetry(_) => "TELEMETRY",
        }
    }

    /// Encode to the wire structure for the negotiated version.
    pub fn to_structure(&self, version: BoltVersion) -> PackStreamStructure {
        match self {
            BoltRequest::Hello(msg) => msg.to_structure(version),
            BoltRequest::Logon(msg) => msg.to_structure(),
            BoltRequest::Logoff => PackStreamStructure::new(tag::LOGOFF, vec![]),
            BoltRequest::Goodbye => PackStreamStructure::new(tag::GOODBYE, vec![]),
            BoltRequest::Reset => PackStreamStructure::new(tag::RESET, vec![]),
            BoltRequest::Run(msg) => msg.to_structure(),
            BoltRequest::Pull(msg) => msg.to_structure(version),
            BoltRequest::Discard(msg) => msg.to_structure(version),
            BoltRequest::Begin(msg) => msg.to_structure(),
            BoltRequest::Commit => PackStreamStructure::new(tag::COMMIT, vec![]),
            BoltRequest::Rollback => PackStreamStructure::new(tag::ROLLBACK, vec![]),
            BoltRequest::Route(msg) => msg.to_structure(version),
            BoltRequest::Telemetry(msg) => msg.to_structure(),
        }
    }
}

/// HELLO - opens the connection.
///
/// Carries a single map with `user_agent`, the auth token fields (Bolt
/// < 5.1 only; later versions authenticate via LOGON), an optional
/// routing context and the requested `patch_bolt` list.
#[derive(Debug, Clone)]
pub struct HelloMessage {
    /// Client identification, required by the server
    pub user_agent: String,
    /// Auth token fields, flattened into the map on Bolt < 5.1
    pub auth: Option<HashMap<String, PackStreamValue>>,
    /// Routing context, present when the URI scheme enables routing
    pub routing: Option<HashMap<String, PackStreamValue>>,
    /// Protocol patches to request (4.3/4.4 only)
    pub patch_bolt: Vec<String>,
}

impl HelloMessage {
    /// Create a HELLO for the given user agent.
    pub fn new(user_agent: impl Into<String>) -> Self {
        Self {
            user_agent: user_agent.into(),
            auth: None,
            routing: None,
            patch_bolt: Vec::new(),
        }
    }

    /// Flatten an auth token into the HELLO map (Bolt < 5.1).
    pub fn with_auth(mut self, auth: HashMap<String, PackStreamValue>) -> Self {
        self.auth = Some(auth);
        self
    }

    /// Attach a routing context.
    pub fn with_routing(mut self, routing: HashMap<String, PackStreamValue>) -> Self {
        self.routing = Some(routing);
        self
    }

    /// Request protocol patches.
    pub fn with_patches(mut self, patches: Vec<String>) -> Self {
        self.patch_bolt = patches;
        self
    }

    fn to_structure(&self, version: BoltVersion) -> PackStreamStructure {
        let mut extra = HashMap::new();
        extra.insert(
            "user_agent".to_string(),
            PackStreamValue::String(self.user_agent.clone()),
        );
        if !version.supports_logon() {
            if let Some(auth) = &self.auth {
                for (k, v) in auth {
                    extra.insert(k.clone(), v.clone());
                }
            }
        }
        if let Some(routing) = &self.routing {
            extra.insert(
                "routing".to_string(),
                PackStreamValue::Map(routing.clone()),
            );
        }
        if version.supports_utc_patch() && !self.patch_bolt.is_empty() {
            extra.insert(
                "patch_bolt".to_string(),
                PackStreamValue::List(
                    self.patch_bolt
                        .iter()
                        .map(|p| PackStreamValue::String(p.clone()))
                        .collect(),
                ),
            );
        }
        PackStreamStructure::new(tag::HELLO, vec![PackStreamValue::Map(extra)])
    }
}

/// LOGON - authenticates on Bolt 5.1+.
#[derive(Debug, Clone)]
pub struct LogonMessage {
    /// Scheme-tagged credential map
    pub auth: HashMap<String, PackStreamValue>,
}

impl LogonMessage {
    /// Create a LOGON carrying the given credential map.
    pub fn new(auth: HashMap<String, PackStreamValue>) -> Self {
        Self { auth }
    }

    fn to_structure(&self) -> PackStreamStructure {
        PackStreamStructure::new(tag::LOGON, vec![PackStreamValue::Map(self.auth.clone())])
    }
}

/// Shared `extra` map for RUN (auto-commit) and BEGIN.
#[derive(Debug, Clone, Default)]
pub struct TxExtra {
    /// Target database; absent means the server default
    pub db: Option<String>,
    /// User to impersonate (Bolt 4.4+)
    pub imp_user: Option<String>,
    /// Read or write routing hint
    pub mode: AccessMode,
    /// Causal-consistency bookmarks to wait for
    pub bookmarks: Vec<String>,
    /// Transaction timeout, sent as whole milliseconds
    pub tx_timeout: Option<Duration>,
    /// Arbitrary transaction metadata
    pub tx_metadata: HashMap<String, PackStreamValue>,
}

impl TxExtra {
    /// Empty settings; every key is omitted on the wire.
    pub fn new() -> Self {
        Self::default()
    }

    /// Target a specific database.
    pub fn with_database(mut self, db: impl Into<String>) -> Self {
        self.db = Some(db.into());
        self
    }

    /// Impersonate another user (Bolt 4.4+).
    pub fn with_impersonated_user(mut self, user: impl Into<String>) -> Self {
        self.imp_user = Some(user.into());
        self
    }

    /// Set the routing access mode.
    pub fn with_mode(mut self, mode: AccessMode) -> Self {
        self.mode = mode;
        self
    }

    /// Wait for the given bookmarks before starting.
    pub fn with_bookmarks(mut self, bookmarks: Vec<String>) -> Self {
        self.bookmarks = bookmarks;
        self
    }

    /// Bound the transaction's server-side runtime.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.tx_timeout = Some(timeout);
        self
    }

    /// Attach arbitrary transaction metadata.
    pub fn with_metadata(mut self, metadata: HashMap<String, PackStreamValue>) -> Self {
        self.tx_metadata = metadata;
        self
    }

    /// Render to the wire map. Defaults are omitted entirely; the mode
    /// key only appears for read access.
    pub fn to_map(&self) -> HashMap<String, PackStreamValue> {
        let mut map = HashMap::new();
        if let Some(db) = &self.db {
            map.insert("db".to_string(), PackStreamValue::String(db.clone()));
        }
        if let Some(user) = &self.imp_user {
            map.insert(
                "imp_user".to_string(),
                PackStreamValue::String(user.clone()),
            );
        }
        if self.mode == AccessMode::Read {
            map.insert("mode".to_string(), PackStreamValue::String("r".into()));
        }
        if !self.bookmarks.is_empty() {
            map.insert(
                "bookmarks".to_string(),
                PackStreamValue::List(
                    self.bookmarks
                        .iter()
                        .map(|b| PackStreamValue::String(b.clone()))
                        .collect(),
                ),
            );
        }
        if let Some(timeout) = self.tx_timeout {
            map.insert(
                "tx_timeout".to_string(),
                PackStreamValue::Integer(timeout.as_millis() as i64),
            );
        }
        if !self.tx_metadata.is_empty() {
            map.insert(
                "tx_metadata".to_string(),
                PackStreamValue::Map(self.tx_metadata.clone()),
            );
        }
        map
    }
}

/// RUN - executes a query.
#[derive(Debug, Clone)]
pub struct RunMessage {
    /// Query text
    pub query: String,
    /// Query parameters
    pub parameters: HashMap<String, PackStreamValue>,
    /// Auto-commit transaction settings; empty inside an explicit
    /// transaction
    pub extra: TxExtra,
}

impl RunMessage {
    /// Create a RUN for the given query text.
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            parameters: HashMap::new(),
            extra: TxExtra::default(),
        }
    }

    /// Set the query parameters.
    pub fn with_parameters(mut self, parameters: HashMap<String, PackStreamValue>) -> Self {
        self.parameters = parameters;
        self
    }

    /// Set the auto-commit transaction settings.
    pub fn with_extra(mut self, extra: TxExtra) -> Self {
        self.extra = extra;
        self
    }

    fn to_structure(&self) -> PackStreamStructure {
        PackStreamStructure::new(
            tag::RUN,
            vec![
                PackStreamValue::String(self.query.clone()),
                PackStreamValue::Map(self.parameters.clone()),
                PackStreamValue::Map(self.extra.to_map()),
            ],
        )
    }
}

/// PULL - fetches up to `n` buffered records; `-1` means all.
#[derive(Debug, Clone, Copy)]
pub struct PullMessage {
    /// Fetch size; -1 for unlimited
    pub n: i64,
    /// Query to pull from; absent or -1 addresses the latest
    pub qid: Option<i64>,
}

impl PullMessage {
    /// Pull everything that is buffered.
    pub fn all() -> Self {
        Self { n: -1, qid: None }
    }

    /// Pull at most `n` records.
    pub fn with_n(n: i64) -> Self {
        Self { n, qid: None }
    }

    /// Address a specific query in an interleaved stream.
    pub fn with_qid(mut self, qid: i64) -> Self {
        self.qid = Some(qid);
        self
    }

    fn to_structure(&self, version: BoltVersion) -> PackStreamStructure {
        // Bolt 3 has no flow control: PULL_ALL carries no fields.
        if !version.has_pull_extra() {
            return PackStreamStructure::new(tag::PULL, vec![]);
        }
        PackStreamStructure::new(tag::PULL, vec![PackStreamValue::Map(flow_extra(self.n, self.qid))])
    }
}

/// DISCARD - drops up to `n` buffered records; `-1` means all.
#[derive(Debug, Clone, Copy)]
pub struct DiscardMessage {
    /// Discard size; -1 for unlimited
    pub n: i64,
    /// Query to discard from; absent or -1 addresses the latest
    pub qid: Option<i64>,
}

impl DiscardMessage {
    /// Discard everything that is buffered.
    pub fn all() -> Self {
        Self { n: -1, qid: None }
    }

    /// Discard at most `n` records.
    pub fn with_n(n: i64) -> Self {
        Self { n, qid: None }
    }

    /// Address a specific query in an interleaved stream.
    pub fn with_qid(mut self, qid: i64) -> Self {
        self.qid = Some(qid);
        self
    }

    fn to_structure(&self, version: BoltVersion) -> PackStreamStructure {
        if !version.has_pull_extra() {
            return PackStreamStructure::new(tag::DISCARD, vec![]);
        }
        PackStreamStructure::new(
            tag::DISCARD,
            vec![PackStreamValue::Map(flow_extra(self.n, self.qid))],
        )
    }
}

fn flow_extra(n: i64, qid: Option<i64>) -> HashMap<String, PackStreamValue> {
    let mut extra = HashMap::new();
    extra.insert("n".to_string(), PackStreamValue::Integer(n));
    if let Some(qid) = qid {
        extra.insert("qid".to_string(), PackStreamValue::Integer(qid));
    }
    extra
}

/// BEGIN - opens an explicit transaction.
#[derive(Debug, Clone, Default)]
pub struct BeginMessage {
    /// Transaction settings, same semantics as the RUN extra map
    pub extra: TxExtra,
}

impl BeginMessage {
    /// Create a BEGIN with the given transaction settings.
    pub fn new(extra: TxExtra) -> Self {
        Self { extra }
    }

    fn to_structure(&self) -> PackStreamStructure {
        PackStreamStructure::new(tag::BEGIN, vec![PackStreamValue::Map(self.extra.to_map())])
    }
}

/// ROUTE - fetches the routing table (Bolt 4.3+).
#[derive(Debug, Clone, Default)]
pub struct RouteMessage {
    /// Routing context from HELLO, including the original address
    pub routing: HashMap<String, PackStreamValue>,
    /// Bookmarks the table must be causally consistent with
    pub bookmarks: Vec<String>,
    /// Target database
    pub db: Option<String>,
    /// User to impersonate (Bolt 4.4+)
    pub imp_user: Option<String>,
}

impl RouteMessage {
    /// Create a ROUTE with the connection's routing context.
    pub fn new(routing: HashMap<String, PackStreamValue>) -> Self {
        Self {
            routing,
            bookmarks: Vec::new(),
            db: None,
            imp_user: None,
        }
    }

    /// Require causal consistency with the given bookmarks.
    pub fn with_bookmarks(mut self, bookmarks: Vec<String>) -> Self {
        self.bookmarks = bookmarks;
        self
    }

    /// Target a specific database.
    pub fn with_database(mut self, db: impl Into<String>) -> Self {
        self.db = Some(db.into());
        self
    }

    /// Impersonate another user (Bolt 4.4+).
    pub fn with_impersonated_user(mut self, user: impl Into<String>) -> Self {
        self.imp_user = Some(user.into());
        self
    }

    fn to_structure(&self, version: BoltVersion) -> PackStreamStructure {
        let bookmarks = PackStreamValue::List(
            self.bookmarks
                .iter()
                .map(|b| PackStreamValue::String(b.clone()))
                .collect(),
        );

        // 4.3 sends the database name directly; 4.4+ wraps db and
        // imp_user in an extra map.
        let third = if version.supports_route_extra() {
            let mut extra = HashMap::new();
            if let Some(db) = &self.db {
                extra.insert("db".to_string(), PackStreamValue::String(db.clone()));
            }
            if let Some(user) = &self.imp_user {
                extra.insert(
                    "imp_user".to_string(),
                    PackStreamValue::String(user.clone()),
                );
            }
            PackStreamValue::Map(extra)
        } else {
            match &self.db {
                Some(db) => PackStreamValue::String(db.clone()),
                None => PackStreamValue::Null,
            }
        };

        PackStreamStructure::new(
            tag::ROUTE,
            vec![PackStreamValue::Map(self.routing.clone()), bookmarks, third],
        )
    }
}

/// TELEMETRY - reports which driver API drove the work (Bolt 5.4+).
#[derive(Debug, Clone, Copy)]
pub struct TelemetryMessage {
    /// API kind discriminator defined by the protocol
    pub api: i64,
}

impl TelemetryMessage {
    /// Create a TELEMETRY report for the given API kind.
    pub fn new(api: i64) -> Self {
        Self { api }
    }

    fn to_structure(&self) -> PackStreamStructure {
        PackStreamStructure::new(tag::TELEMETRY, vec![PackStreamValue::Integer(self.api)])
    }
}
