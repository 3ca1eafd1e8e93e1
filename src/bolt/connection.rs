//! Bolt connection state machine.
//!
//! Owns the transport, the framing codec, the hydrator and the response
//! handler queue. The connection is synchronous per caller: one logical
//! operation at a time, strict request/response over a single stream.
//! Requests may be pipelined before any response is read; the receive
//! loop dispatches inbound messages to the handler queue in FIFO order.
//!
//! After a server FAILURE the connection parks in the failed state and
//! every queued request is answered with IGNORED until a RESET succeeds.
//! Transport errors, timeouts and cancellation are fatal: the connection
//! transitions to dead and cannot be reused.

use std::collections::HashMap;
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use bytes::BytesMut;
use parking_lot::Mutex;
use rustls::pki_types::ServerName;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadBuf};
use tokio::net::{lookup_host, TcpSocket, TcpStream};
use tokio_rustls::TlsConnector;
use tokio_util::codec::{Decoder, Encoder};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::codec::BoltCodec;
use super::error::{BoltError, BoltResult, HandshakeError, Neo4jError};
use super::handler::{HandlerQueue, ResponseHandler};
use super::handshake::{build_handshake, parse_server_choice, BoltVersion, HANDSHAKE_REPLY_SIZE};
use super::hydrator::Hydrator;
use super::message::request::{
    BeginMessage, BoltRequest, DiscardMessage, HelloMessage, LogonMessage, PullMessage,
    RouteMessage, RunMessage, TelemetryMessage, TxExtra,
};
use super::message::response::{BoltResponse, SuccessMessage};
use super::message::metadata::RoutingTable;
use super::packstream::PackStreamValue;
use crate::driver::auth::AuthToken;
use crate::driver::config::ConnectionConfig;
use crate::driver::types::Record;

/// Connection lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No transport yet
    Disconnected,
    /// Transport open, handshake in progress
    Connecting,
    /// Version negotiated, HELLO not yet exchanged
    Negotiated,
    /// HELLO done, LOGON outstanding (Bolt 5.1+)
    Authenticating,
    /// Idle, ready for work
    Ready,
    /// Auto-commit result stream open
    Streaming,
    /// Explicit transaction open, no stream
    TxReady,
    /// Explicit transaction open with a result stream
    TxStreaming,
    /// Server reported FAILURE; only RESET is legal
    Failed,
    /// Unusable; transport closed or poisoned
    Dead,
}

/// Fully drained result of a query.
#[derive(Debug, Clone)]
pub struct QueryResult {
    /// Column names from the RUN summary
    pub keys: Vec<String>,
    /// All streamed records
    pub records: Vec<Record>,
    /// The final PULL summary (bookmark, type, db, plan, ...)
    pub summary: SuccessMessage,
}

/// Transport: plain TCP or TLS over TCP.
enum BoltStream {
    Plain(TcpStream),
    Tls(Box<tokio_rustls::client::TlsStream<TcpStream>>),
}

impl AsyncRead for BoltStream {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match &mut *self {
            BoltStream::Plain(s) => Pin::new(s).poll_read(cx, buf),
            BoltStream::Tls(s) => Pin::new(s.as_mut()).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for BoltStream {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match &mut *self {
            BoltStream::Plain(s) => Pin::new(s).poll_write(cx, buf),
            BoltStream::Tls(s) => Pin::new(s.as_mut()).poll_write(cx, buf),
        }
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match &mut *self {
            BoltStream::Plain(s) => Pin::new(s).poll_flush(cx),
            BoltStream::Tls(s) => Pin::new(s.as_mut()).poll_flush(cx),
        }
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match &mut *self {
            BoltStream::Plain(s) => Pin::new(s).poll_shutdown(cx),
            BoltStream::Tls(s) => Pin::new(s.as_mut()).poll_shutdown(cx),
        }
    }
}

/// Accumulated terminal outcome of one request.
#[derive(Default)]
struct Capture {
    success: Option<SuccessMessage>,
    failure: Option<Neo4jError>,
    ignored: bool,
}

type SharedCapture = Arc<Mutex<Capture>>;
type SharedRecords = Arc<Mutex<Vec<Record>>>;

fn capture() -> SharedCapture {
    Arc::new(Mutex::new(Capture::default()))
}

fn capture_handler(shared: &SharedCapture) -> ResponseHandler {
    let on_success = shared.clone();
    let on_failure = shared.clone();
    let on_ignored = shared.clone();
    ResponseHandler::default()
        .on_success(move |s| on_success.lock().success = Some(s.clone()))
        .on_failure(move |e| on_failure.lock().failure = Some(e.clone()))
        .on_ignored(move || on_ignored.lock().ignored = true)
}

fn streaming_handler(records: &SharedRecords, shared: &SharedCapture) -> ResponseHandler {
    let sink = records.clone();
    capture_handler(shared).on_record(move |record| sink.lock().push(record))
}

/// One Bolt client connection.
pub struct BoltConnection {
    stream: BoltStream,
    codec: BoltCodec,
    read_buffer: BytesMut,
    write_buffer: BytesMut,
    version: BoltVersion,
    hydrator: Hydrator,
    handlers: HandlerQueue,
    state: ConnectionState,
    /// Per-read deadline; may be set by the server's HELLO hint
    recv_timeout: Option<Duration>,
    cancel: CancellationToken,
    fetch_size: i64,
    routing_context: HashMap<String, PackStreamValue>,
    server_agent: Option<String>,
    connection_id: Option<String>,
}

impl BoltConnection {
    /// Connect, handshake and authenticate.
    ///
    /// The whole sequence is bounded by the configured connect timeout.
    pub async fn connect(config: &ConnectionConfig) -> BoltResult<Self> {
        Self::connect_with_cancellation(config, CancellationToken::new()).await
    }

    /// Like [`connect`](Self::connect), with a caller-supplied
    /// cancellation token that stays attached to the connection.
    pub async fn connect_with_cancellation(
        config: &ConnectionConfig,
        cancel: CancellationToken,
    ) -> BoltResult<Self> {
        let guard = cancel.clone();
        tokio::select! {
            _ = guard.cancelled() => Err(BoltError::Cancelled),
            result = tokio::time::timeout(config.connect_timeout, Self::establish(config, cancel)) => {
                match result {
                    Ok(connection) => connection,
                    Err(_) => Err(BoltError::Timeout),
                }
            }
        }
    }

    async fn establish(config: &ConnectionConfig, cancel: CancellationToken) -> BoltResult<Self> {
        let tcp = open_tcp(config).await?;
        let stream = secure(config, tcp).await?;

        let mut routing_context = HashMap::new();
        routing_context.insert(
            "address".to_string(),
            PackStreamValue::String(config.address.to_string()),
        );

        let mut connection = Self {
            stream,
            codec: BoltCodec::new(),
            read_buffer: BytesMut::with_capacity(8192),
            write_buffer: BytesMut::with_capacity(8192),
            // Placeholders until the handshake settles the real version.
            version: BoltVersion::V3_0,
            hydrator: Hydrator::new(BoltVersion::V3_0),
            handlers: HandlerQueue::new(),
            state: ConnectionState::Connecting,
            recv_timeout: None,
            cancel,
            fetch_size: config.fetch_size,
            routing_context,
            server_agent: None,
            connection_id: None,
        };
        connection.handshake().await?;
        connection.authenticate(config).await?;
        Ok(connection)
    }

    async fn handshake(&mut self) -> BoltResult<()> {
        let proposal = build_handshake();
        self.write_raw(&proposal).await?;

        let mut reply = [0u8; HANDSHAKE_REPLY_SIZE];
        self.read_exact_raw(&mut reply).await.map_err(|e| match e {
            BoltError::Transport(io)
                if io.kind() == io::ErrorKind::UnexpectedEof
                    || io.kind() == io::ErrorKind::ConnectionReset =>
            {
                BoltError::Handshake(HandshakeError::ConnectionClosed)
            }
            other => other,
        })?;

        let version = parse_server_choice(reply).map_err(|e| {
            self.state = ConnectionState::Dead;
            BoltError::Handshake(e)
        })?;

        self.version = version;
        self.hydrator = Hydrator::new(version);
        self.state = ConnectionState::Negotiated;
        debug!("negotiated Bolt {}", version);
        Ok(())
    }

    async fn authenticate(&mut self, config: &ConnectionConfig) -> BoltResult<()> {
        let mut hello = HelloMessage::new(&config.user_agent).with_auth(config.auth.to_map());
        if config.scheme.is_routing() {
            hello = hello.with_routing(self.routing_context.clone());
        }
        if self.version.supports_utc_patch() {
            hello = hello.with_patches(vec!["utc".to_string()]);
        }

        let hello_outcome = capture();
        self.enqueue(&BoltRequest::Hello(hello), capture_handler(&hello_outcome))?;

        // On 5.1+ credentials travel in a separate LOGON, pipelined
        // right behind HELLO.
        let logon_outcome = if self.version.supports_logon() {
            let outcome = capture();
            self.enqueue(
                &BoltRequest::Logon(LogonMessage::new(config.auth.to_map())),
                capture_handler(&outcome),
            )?;
            Some(outcome)
        } else {
            None
        };

        self.state = ConnectionState::Authenticating;
        self.flush().await?;
        self.settle().await?;

        let success = match take_outcome(&hello_outcome, "HELLO") {
            Ok(success) => success,
            Err(e) => {
                self.state = ConnectionState::Dead;
                return Err(e);
            }
        };
        self.apply_hello(&success);

        if let Some(outcome) = logon_outcome {
            if let Err(e) = take_outcome(&outcome, "LOGON") {
                self.state = ConnectionState::Dead;
                return Err(e);
            }
        }

        self.state = ConnectionState::Ready;
        Ok(())
    }

    fn apply_hello(&mut self, success: &SuccessMessage) {
        if !success.server.is_empty() {
            self.server_agent = Some(success.server.clone());
        }
        if !success.connection_id.is_empty() {
            self.connection_id = Some(success.connection_id.clone());
        }
        if let Some(secs) = success.recv_timeout_seconds() {
            self.recv_timeout = Some(Duration::from_secs(secs));
        }
        for patch in &success.patches {
            if patch == "utc" {
                self.hydrator.enable_utc();
            } else {
                // Unknown acknowledged patches are tolerated.
                warn!("server acknowledged unknown patch '{}'", patch);
            }
        }
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Run a query and drain its stream, pipelining RUN with the first
    /// PULL and following `has_more` pages until the stream ends.
    ///
    /// Inside an explicit transaction the `extra` settings are ignored;
    /// they belong to BEGIN there.
    pub async fn run(
        &mut self,
        query: &str,
        parameters: HashMap<String, PackStreamValue>,
        extra: TxExtra,
    ) -> BoltResult<QueryResult> {
        self.ensure_ready("RUN")?;
        let in_tx = self.state == ConnectionState::TxReady;

        let run_extra = if in_tx { TxExtra::default() } else { extra };
        let run = RunMessage::new(query)
            .with_parameters(parameters)
            .with_extra(run_extra);

        let run_outcome = capture();
        self.enqueue(&BoltRequest::Run(run), capture_handler(&run_outcome))?;

        let records = Arc::new(Mutex::new(Vec::new()));
        let pull_outcome = capture();
        self.enqueue(
            &BoltRequest::Pull(PullMessage::with_n(self.fetch_size)),
            streaming_handler(&records, &pull_outcome),
        )?;

        self.state = if in_tx {
            ConnectionState::TxStreaming
        } else {
            ConnectionState::Streaming
        };
        self.flush().await?;
        self.settle().await?;

        let run_success = take_outcome(&run_outcome, "RUN")?;
        let mut summary = take_outcome(&pull_outcome, "PULL")?;

        while summary.has_more {
            let page_outcome = capture();
            self.enqueue(
                &BoltRequest::Pull(PullMessage::with_n(self.fetch_size)),
                streaming_handler(&records, &page_outcome),
            )?;
            self.flush().await?;
            self.settle().await?;
            summary = take_outcome(&page_outcome, "PULL")?;
        }

        self.state = if in_tx {
            ConnectionState::TxReady
        } else {
            ConnectionState::Ready
        };

        let records = std::mem::take(&mut *records.lock());
        Ok(QueryResult {
            keys: run_success.fields,
            records,
            summary,
        })
    }

    /// Send RUN alone and leave the stream open. The caller drives it
    /// with [`pull`](Self::pull) and [`discard`](Self::discard).
    pub async fn run_streaming(
        &mut self,
        query: &str,
        parameters: HashMap<String, PackStreamValue>,
        extra: TxExtra,
    ) -> BoltResult<SuccessMessage> {
        self.ensure_ready("RUN")?;
        let in_tx = self.state == ConnectionState::TxReady;

        let run_extra = if in_tx { TxExtra::default() } else { extra };
        let run = RunMessage::new(query)
            .with_parameters(parameters)
            .with_extra(run_extra);

        let outcome = capture();
        self.enqueue(&BoltRequest::Run(run), capture_handler(&outcome))?;
        self.flush().await?;
        self.settle().await?;

        let success = take_outcome(&outcome, "RUN")?;
        self.state = if in_tx {
            ConnectionState::TxStreaming
        } else {
            ConnectionState::Streaming
        };
        Ok(success)
    }

    /// Fetch up to `n` records from the open stream (`-1` for all).
    pub async fn pull(&mut self, n: i64) -> BoltResult<(Vec<Record>, SuccessMessage)> {
        self.ensure_streaming("PULL")?;

        let records = Arc::new(Mutex::new(Vec::new()));
        let outcome = capture();
        self.enqueue(
            &BoltRequest::Pull(PullMessage::with_n(n)),
            streaming_handler(&records, &outcome),
        )?;
        self.flush().await?;
        self.settle().await?;

        let summary = take_outcome(&outcome, "PULL")?;
        if !summary.has_more {
            self.leave_streaming();
        }
        let records = std::mem::take(&mut *records.lock());
        Ok((records, summary))
    }

    /// Drop the rest of the open stream.
    pub async fn discard(&mut self) -> BoltResult<SuccessMessage> {
        self.ensure_streaming("DISCARD")?;

        let outcome = capture();
        self.enqueue(
            &BoltRequest::Discard(DiscardMessage::all()),
            capture_handler(&outcome),
        )?;
        self.flush().await?;
        self.settle().await?;

        let summary = take_outcome(&outcome, "DISCARD")?;
        if !summary.has_more {
            self.leave_streaming();
        }
        Ok(summary)
    }

    // ------------------------------------------------------------------
    // Transactions
    // ------------------------------------------------------------------

    /// Open an explicit transaction.
    pub async fn begin(&mut self, extra: TxExtra) -> BoltResult<()> {
        if self.state != ConnectionState::Ready {
            return self.state_error("BEGIN");
        }

        let outcome = capture();
        self.enqueue(
            &BoltRequest::Begin(BeginMessage::new(extra)),
            capture_handler(&outcome),
        )?;
        self.flush().await?;
        self.settle().await?;

        take_outcome(&outcome, "BEGIN")?;
        self.state = ConnectionState::TxReady;
        Ok(())
    }

    /// Pipeline BEGIN + RUN + PULL in one round trip and drain the
    /// stream. On success the transaction stays open for more work.
    pub async fn begin_run(
        &mut self,
        query: &str,
        parameters: HashMap<String, PackStreamValue>,
        extra: TxExtra,
    ) -> BoltResult<QueryResult> {
        if self.state != ConnectionState::Ready {
            return self.state_error("BEGIN");
        }

        let begin_outcome = capture();
        self.enqueue(
            &BoltRequest::Begin(BeginMessage::new(extra)),
            capture_handler(&begin_outcome),
        )?;

        let run_outcome = capture();
        self.enqueue(
            &BoltRequest::Run(RunMessage::new(query).with_parameters(parameters)),
            capture_handler(&run_outcome),
        )?;

        let records = Arc::new(Mutex::new(Vec::new()));
        let pull_outcome = capture();
        self.enqueue(
            &BoltRequest::Pull(PullMessage::with_n(self.fetch_size)),
            streaming_handler(&records, &pull_outcome),
        )?;

        self.state = ConnectionState::TxStreaming;
        self.flush().await?;
        self.settle().await?;

        take_outcome(&begin_outcome, "BEGIN")?;
        let run_success = take_outcome(&run_outcome, "RUN")?;
        let mut summary = take_outcome(&pull_outcome, "PULL")?;

        while summary.has_more {
            let page_outcome = capture();
            self.enqueue(
                &BoltRequest::Pull(PullMessage::with_n(self.fetch_size)),
                streaming_handler(&records, &page_outcome),
            )?;
            self.flush().await?;
            self.settle().await?;
            summary = take_outcome(&page_outcome, "PULL")?;
        }

        self.state = ConnectionState::TxReady;
        let records = std::mem::take(&mut *records.lock());
        Ok(QueryResult {
            keys: run_success.fields,
            records,
            summary,
        })
    }

    /// Commit the open transaction, returning the bookmark when the
    /// server hands one out.
    pub async fn commit(&mut self) -> BoltResult<Option<String>> {
        if self.state != ConnectionState::TxReady {
            return self.state_error("COMMIT");
        }

        let outcome = capture();
        self.enqueue(&BoltRequest::Commit, capture_handler(&outcome))?;
        self.flush().await?;
        self.settle().await?;

        let success = take_outcome(&outcome, "COMMIT")?;
        self.state = ConnectionState::Ready;
        Ok((!success.bookmark.is_empty()).then(|| success.bookmark))
    }

    /// Roll back the open transaction.
    pub async fn rollback(&mut self) -> BoltResult<()> {
        if self.state != ConnectionState::TxReady {
            return self.state_error("ROLLBACK");
        }

        let outcome = capture();
        self.enqueue(&BoltRequest::Rollback, capture_handler(&outcome))?;
        self.flush().await?;
        self.settle().await?;

        take_outcome(&outcome, "ROLLBACK")?;
        self.state = ConnectionState::Ready;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Housekeeping
    // ------------------------------------------------------------------

    /// Clear failed state and drop any server-side work. Every pending
    /// request is answered with IGNORED before the RESET's SUCCESS.
    pub async fn reset(&mut self) -> BoltResult<()> {
        match self.state {
            ConnectionState::Dead
            | ConnectionState::Disconnected
            | ConnectionState::Connecting
            | ConnectionState::Negotiated
            | ConnectionState::Authenticating => return self.state_error("RESET"),
            _ => {}
        }

        let outcome = capture();
        self.enqueue(&BoltRequest::Reset, capture_handler(&outcome))?;
        self.flush().await?;
        self.settle().await?;

        match take_outcome(&outcome, "RESET") {
            Ok(_) => {
                self.state = ConnectionState::Ready;
                Ok(())
            }
            Err(e) => {
                // A failed RESET leaves nothing to salvage.
                self.state = ConnectionState::Dead;
                Err(e)
            }
        }
    }

    /// Fetch the routing table (Bolt 4.3+).
    pub async fn route(
        &mut self,
        bookmarks: Vec<String>,
        db: Option<&str>,
        imp_user: Option<&str>,
    ) -> BoltResult<RoutingTable> {
        if !self.version.supports_route() {
            return Err(self.unsupported("ROUTE"));
        }
        if imp_user.is_some() && !self.version.supports_impersonation() {
            return Err(self.unsupported("impersonation"));
        }
        if self.state != ConnectionState::Ready {
            return self.state_error("ROUTE");
        }

        let mut route = RouteMessage::new(self.routing_context.clone()).with_bookmarks(bookmarks);
        if let Some(db) = db {
            route = route.with_database(db);
        }
        if let Some(user) = imp_user {
            route = route.with_impersonated_user(user);
        }

        let outcome = capture();
        self.enqueue(&BoltRequest::Route(route), capture_handler(&outcome))?;
        self.flush().await?;
        self.settle().await?;

        let success = take_outcome(&outcome, "ROUTE")?;
        success
            .routing_table
            .ok_or_else(|| BoltError::Protocol("ROUTE response carried no routing table".to_string()))
    }

    /// Drop authentication (Bolt 5.1+). The connection expects a LOGON
    /// next.
    pub async fn logoff(&mut self) -> BoltResult<()> {
        if !self.version.supports_logon() {
            return Err(self.unsupported("LOGOFF"));
        }
        if self.state != ConnectionState::Ready {
            return self.state_error("LOGOFF");
        }

        let outcome = capture();
        self.enqueue(&BoltRequest::Logoff, capture_handler(&outcome))?;
        self.flush().await?;
        self.settle().await?;

        take_outcome(&outcome, "LOGOFF")?;
        self.state = ConnectionState::Authenticating;
        Ok(())
    }

    /// Authenticate with fresh credentials (Bolt 5.1+).
    pub async fn logon(&mut self, auth: &AuthToken) -> BoltResult<()> {
        if !self.version.supports_logon() {
            return Err(self.unsupported("LOGON"));
        }
        if self.state != ConnectionState::Authenticating {
            return self.state_error("LOGON");
        }

        let outcome = capture();
        self.enqueue(
            &BoltRequest::Logon(LogonMessage::new(auth.to_map())),
            capture_handler(&outcome),
        )?;
        self.flush().await?;
        self.settle().await?;

        match take_outcome(&outcome, "LOGON") {
            Ok(_) => {
                self.state = ConnectionState::Ready;
                Ok(())
            }
            Err(e) => {
                self.state = ConnectionState::Dead;
                Err(e)
            }
        }
    }

    /// Report driver API usage (Bolt 5.4+).
    pub async fn telemetry(&mut self, api: i64) -> BoltResult<()> {
        if !self.version.supports_telemetry() {
            return Err(self.unsupported("TELEMETRY"));
        }
        if self.state != ConnectionState::Ready {
            return self.state_error("TELEMETRY");
        }

        let outcome = capture();
        self.enqueue(
            &BoltRequest::Telemetry(TelemetryMessage::new(api)),
            capture_handler(&outcome),
        )?;
        self.flush().await?;
        self.settle().await?;
        take_outcome(&outcome, "TELEMETRY")?;
        Ok(())
    }

    /// Say GOODBYE and close the transport. GOODBYE has no response;
    /// send errors at this point are logged, not surfaced.
    pub async fn close(&mut self) -> BoltResult<()> {
        if matches!(
            self.state,
            ConnectionState::Ready
                | ConnectionState::TxReady
                | ConnectionState::Streaming
                | ConnectionState::TxStreaming
                | ConnectionState::Failed
        ) {
            let structure = BoltRequest::Goodbye.to_structure(self.version);
            if self.codec.encode(&structure, &mut self.write_buffer).is_ok() {
                if let Err(e) = self.flush().await {
                    warn!("GOODBYE delivery failed: {}", e);
                }
            }
        }
        self.state = ConnectionState::Dead;
        self.handlers.clear();
        let _ = self.stream.shutdown().await;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    /// Negotiated protocol version.
    pub fn version(&self) -> BoltVersion {
        self.version
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Server agent string from HELLO.
    pub fn server_agent(&self) -> Option<&str> {
        self.server_agent.as_deref()
    }

    /// Server-assigned connection id from HELLO.
    pub fn connection_id(&self) -> Option<&str> {
        self.connection_id.as_deref()
    }

    /// Whether UTC datetime structs were negotiated.
    pub fn uses_utc(&self) -> bool {
        self.hydrator.uses_utc()
    }

    /// The cancellation token bound to this connection.
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Per-read deadline, when one applies.
    pub fn recv_timeout(&self) -> Option<Duration> {
        self.recv_timeout
    }

    // ------------------------------------------------------------------
    // Wire plumbing
    // ------------------------------------------------------------------

    fn ensure_ready(&self, op: &str) -> BoltResult<()> {
        match self.state {
            ConnectionState::Ready | ConnectionState::TxReady => Ok(()),
            _ => self.state_error(op),
        }
    }

    fn ensure_streaming(&self, op: &str) -> BoltResult<()> {
        match self.state {
            ConnectionState::Streaming | ConnectionState::TxStreaming => Ok(()),
            _ => self.state_error(op),
        }
    }

    fn leave_streaming(&mut self) {
        self.state = match self.state {
            ConnectionState::TxStreaming => ConnectionState::TxReady,
            _ => ConnectionState::Ready,
        };
    }

    fn state_error<T>(&self, op: &str) -> BoltResult<T> {
        let hint = match self.state {
            ConnectionState::Failed => "; send RESET to recover",
            _ => "",
        };
        Err(BoltError::Usage(format!(
            "{} is not legal in state {:?}{}",
            op, self.state, hint
        )))
    }

    fn unsupported(&self, feature: &'static str) -> BoltError {
        BoltError::FeatureNotSupported {
            feature,
            version: self.version.to_string(),
        }
    }

    /// Encode a request into the write buffer and register its handler.
    /// Nothing hits the wire until [`flush`](Self::flush); callers may
    /// enqueue several requests to pipeline them.
    fn enqueue(&mut self, request: &BoltRequest, handler: ResponseHandler) -> BoltResult<()> {
        debug!("C: {}", request.name());
        let structure = request.to_structure(self.version);
        self.codec.encode(&structure, &mut self.write_buffer)?;
        self.handlers.push(handler);
        Ok(())
    }

    /// Push the write buffer to the transport.
    async fn flush(&mut self) -> BoltResult<()> {
        if self.write_buffer.is_empty() {
            return Ok(());
        }
        let buffer = self.write_buffer.split();
        self.write_raw(&buffer).await
    }

    /// Receive until every outstanding request has its terminal answer.
    async fn settle(&mut self) -> BoltResult<()> {
        while !self.handlers.is_empty() {
            self.receive_one().await?;
        }
        Ok(())
    }

    /// Read and dispatch exactly one message.
    async fn receive_one(&mut self) -> BoltResult<()> {
        loop {
            match self.codec.decode(&mut self.read_buffer) {
                Ok(Some(value)) => {
                    let response = self.hydrator.hydrate_message(value).map_err(|e| {
                        self.state = ConnectionState::Dead;
                        e
                    })?;
                    return self.dispatch(response);
                }
                Ok(None) => {}
                Err(e) => {
                    self.state = ConnectionState::Dead;
                    return Err(e);
                }
            }
            self.fill_read_buffer().await?;
        }
    }

    fn dispatch(&mut self, response: BoltResponse) -> BoltResult<()> {
        debug!("S: {}", response.name());
        match response {
            BoltResponse::Record(record) => {
                let handler = self.handlers.head_mut().ok_or_else(|| {
                    BoltError::Protocol("Received RECORD with no outstanding request".to_string())
                })?;
                handler.handle_record(record);
            }
            BoltResponse::Success(success) => {
                let mut handler = self.handlers.pop().ok_or_else(|| {
                    BoltError::Protocol("Received SUCCESS with no outstanding request".to_string())
                })?;
                handler.handle_success(&success);
            }
            BoltResponse::Failure(failure) => {
                let mut handler = self.handlers.pop().ok_or_else(|| {
                    BoltError::Protocol("Received FAILURE with no outstanding request".to_string())
                })?;
                let error = failure.into_error();
                // The server ignores everything else until RESET.
                self.state = ConnectionState::Failed;
                handler.handle_failure(&error);
            }
            BoltResponse::Ignored => {
                let mut handler = self.handlers.pop().ok_or_else(|| {
                    BoltError::Protocol("Received IGNORED with no outstanding request".to_string())
                })?;
                handler.handle_ignored();
            }
        }
        Ok(())
    }

    async fn fill_read_buffer(&mut self) -> BoltResult<()> {
        let cancel = self.cancel.clone();
        let timeout = self.recv_timeout;
        let result = {
            let read = read_some(&mut self.stream, &mut self.read_buffer, timeout);
            tokio::select! {
                _ = cancel.cancelled() => Err(BoltError::Cancelled),
                r = read => r,
            }
        };
        match result {
            Ok(0) => {
                self.state = ConnectionState::Dead;
                Err(BoltError::ConnectionClosed)
            }
            Ok(_) => Ok(()),
            Err(e) => {
                self.state = ConnectionState::Dead;
                Err(e)
            }
        }
    }

    async fn write_raw(&mut self, bytes: &[u8]) -> BoltResult<()> {
        let cancel = self.cancel.clone();
        let result = {
            let write = async {
                self.stream.write_all(bytes).await?;
                self.stream.flush().await
            };
            tokio::select! {
                _ = cancel.cancelled() => Err(BoltError::Cancelled),
                r = write => r.map_err(BoltError::Transport),
            }
        };
        if let Err(e) = result {
            self.state = ConnectionState::Dead;
            return Err(e);
        }
        Ok(())
    }

    async fn read_exact_raw(&mut self, buf: &mut [u8]) -> BoltResult<()> {
        let cancel = self.cancel.clone();
        let timeout = self.recv_timeout;
        let result = {
            let read = async {
                match timeout {
                    Some(limit) => tokio::time::timeout(limit, self.stream.read_exact(buf))
                        .await
                        .map_err(|_| BoltError::Timeout)?
                        .map_err(BoltError::Transport),
                    None => self.stream.read_exact(buf).await.map_err(BoltError::Transport),
                }
            };
            tokio::select! {
                _ = cancel.cancelled() => Err(BoltError::Cancelled),
                r = read => r.map(|_| ()),
            }
        };
        if let Err(e) = result {
            self.state = ConnectionState::Dead;
            return Err(e);
        }
        Ok(())
    }
}

impl std::fmt::Debug for BoltConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoltConnection")
            .field("state", &self.state)
            .field("version", &self.version)
            .field("server_agent", &self.server_agent)
            .field("connection_id", &self.connection_id)
            .field("outstanding", &self.handlers.len())
            .finish()
    }
}

async fn read_some(
    stream: &mut BoltStream,
    buffer: &mut BytesMut,
    timeout: Option<Duration>,
) -> BoltResult<usize> {
    match timeout {
        Some(limit) => tokio::time::timeout(limit, stream.read_buf(buffer))
            .await
            .map_err(|_| BoltError::Timeout)?
            .map_err(BoltError::Transport),
        None => stream.read_buf(buffer).await.map_err(BoltError::Transport),
    }
}

async fn open_tcp(config: &ConnectionConfig) -> BoltResult<TcpStream> {
    let mut last_error = None;
    let addresses = lookup_host(config.address.to_socket_addr())
        .await
        .map_err(BoltError::Transport)?;

    for address in addresses {
        let socket = if address.is_ipv4() {
            TcpSocket::new_v4()
        } else {
            TcpSocket::new_v6()
        }
        .map_err(BoltError::Transport)?;
        // Best effort; a platform refusing these is not fatal.
        let _ = socket.set_keepalive(config.keep_alive);
        let _ = socket.set_nodelay(true);
        match socket.connect(address).await {
            Ok(stream) => return Ok(stream),
            Err(e) => last_error = Some(e),
        }
    }

    Err(BoltError::Transport(last_error.unwrap_or_else(|| {
        io::Error::new(
            io::ErrorKind::NotFound,
            format!("no addresses resolved for {}", config.address),
        )
    })))
}

async fn secure(config: &ConnectionConfig, tcp: TcpStream) -> BoltResult<BoltStream> {
    let tls_config = config
        .tls_client_config()
        .map_err(|e| BoltError::Usage(e.to_string()))?;
    match tls_config {
        None => Ok(BoltStream::Plain(tcp)),
        Some(client_config) => {
            let connector = TlsConnector::from(Arc::new(client_config));
            let name = ServerName::try_from(config.address.host.clone()).map_err(|_| {
                BoltError::Usage(format!(
                    "'{}' is not a valid TLS server name",
                    config.address.host
                ))
            })?;
            let tls = connector
                .connect(name, tcp)
                .await
                .map_err(BoltError::Transport)?;
            Ok(BoltStream::Tls(Box::new(tls)))
        }
    }
}

fn take_outcome(outcome: &SharedCapture, what: &str) -> BoltResult<SuccessMessage> {
    let mut guard = outcome.lock();
    if let Some(error) = guard.failure.take() {
        return Err(BoltError::from_failure(error));
    }
    if guard.ignored {
        return Err(BoltError::Usage(format!(
            "{} was ignored by the server; RESET the connection",
            what
        )));
    }
    guard
        .success
        .take()
        .ok_or_else(|| BoltError::Protocol(format!("No response received for {}", what)))
}
