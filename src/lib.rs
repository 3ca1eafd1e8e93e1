//! # BoltKit
//!
//! A low-level Bolt protocol client core for property-graph databases.
//!
//! ## Features
//!
//! - **Bolt 3.0 - 5.4** - handshake negotiation with minor-version
//!   ranges, version-parameterized message encoding and hydration
//! - **PackStream** - the complete tagged binary value grammar
//! - **Async/Await** - built on Tokio; chunked framing via `tokio-util`
//! - **Pipelining** - requests coalesce (BEGIN+RUN+PULL) with strict
//!   FIFO response dispatch
//! - **TLS** - `bolt+s`/`neo4j+s` via rustls, `+ssc` for self-signed
//!   deployments
//!
//! This crate is the protocol core: it exposes a [`BoltConnection`]
//! capability for a higher-level driver (sessions, pooling, cluster
//! routing) to build on. It does not pool connections or cache routing
//! tables itself.
//!
//! ## Basic Usage
//!
//! ```rust,no_run
//! use boltkit::{AuthToken, BoltConnection, ConnectionConfig, TxExtra};
//! use std::collections::HashMap;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConnectionConfig::builder(
//!         "bolt://localhost:7687",
//!         AuthToken::basic("neo4j", "password"),
//!     )?
//!     .with_user_agent("my-app/1.0")
//!     .build();
//!
//!     let mut connection = BoltConnection::connect(&config).await?;
//!
//!     let result = connection
//!         .run("RETURN 1 AS one", HashMap::new(), TxExtra::default())
//!         .await?;
//!     for record in &result.records {
//!         println!("{:?}", record);
//!     }
//!
//!     connection.close().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Transactions
//!
//! ```rust,no_run
//! # use boltkit::{AuthToken, BoltConnection, ConnectionConfig, TxExtra};
//! # use std::collections::HashMap;
//! # async fn example(mut connection: BoltConnection) -> boltkit::BoltResult<()> {
//! connection.begin(TxExtra::new().with_database("movies")).await?;
//! connection.run("CREATE (m:Movie {title: $t})", HashMap::new(), TxExtra::default()).await?;
//! let bookmark = connection.commit().await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Authentication
//!
//! ```rust
//! use boltkit::AuthToken;
//!
//! let basic = AuthToken::basic("neo4j", "password");
//! let bearer = AuthToken::bearer("sso-token");
//! let none = AuthToken::none();
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod bolt;
pub mod driver;

// Re-exports for convenience
pub use bolt::{
    BoltConnection, BoltError, BoltResult, BoltVersion, ConnectionState, HandshakeError,
    Neo4jError, PackStreamValue, QueryResult, RoutingTable, StatementType, SuccessMessage, TxExtra,
};
pub use driver::{
    AccessMode, AuthToken, ConnectionConfig, ConnectionConfigBuilder, DriverError, DriverResult,
    Duration, InvalidValue, Node, Path, Point2D, Point3D, Record, Relationship, ServerAddress,
    TrustStrategy, UriScheme, Value,
};
