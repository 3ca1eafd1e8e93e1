//! # Bolt Protocol Implementation
//!
//! Client-side implementation of the Bolt binary protocol, versions 3
//! through 5.4.
//!
//! ## Layers
//!
//! - [`packstream`] - the tagged binary value format Bolt carries
//! - [`codec`] - chunked message framing over the byte stream
//! - [`handshake`] - magic preamble and version negotiation
//! - [`message`] - request builders and response envelopes
//! - [`hydrator`] - wire structures to domain values, per negotiated
//!   version
//! - [`handler`] - FIFO response-handler queue
//! - [`connection`] - the connection state machine tying it together
//! - [`error`] - protocol error taxonomy
//!
//! Data flows caller → outgoing buffer → chunker → transport, and back
//! transport → dechunker → unpacker → hydrator → handler queue → caller.
//! Requests may be pipelined; responses dispatch strictly FIFO.

pub mod codec;
pub mod connection;
pub mod error;
pub mod handler;
pub mod handshake;
pub mod hydrator;
pub mod message;
pub mod packstream;

pub use codec::BoltCodec;
pub use connection::{BoltConnection, ConnectionState, QueryResult};
pub use error::{BoltError, BoltResult, HandshakeError, Neo4jError};
pub use handler::{HandlerQueue, ResponseHandler};
pub use handshake::BoltVersion;
pub use hydrator::Hydrator;
pub use message::{
    BoltRequest, BoltResponse, FailureMessage, Notification, Plan, ProfiledPlan, RoutingTable,
    StatementType, SuccessMessage, TxExtra,
};
pub use packstream::{PackStreamError, PackStreamStructure, PackStreamValue};
