//! # dbwarden-server: claim ingestion over HTTP
//!
//! This crate verifies signed claims and exposes the dbwarden pipeline over
//! a minimal HTTP/1.1 endpoint.
//!
//! ## Architecture
//!
//! The server uses `mio` for non-blocking I/O with a poll-based event loop,
//! without an async runtime. Requests are handled one at a time on the loop.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                    dbwarden-server                       │
//! │  ┌─────────────┐   ┌─────────────┐   ┌───────────────┐  │
//! │  │  Listener   │ → │ Connections │ → │ RequestHandler │  │
//! │  │  (TCP)      │   │ (mio poll)  │   │ (→ updater)    │  │
//! │  └─────────────┘   └─────────────┘   └───────────────┘  │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Endpoints
//!
//! - `POST /jwt` with `{"client_message": "<token>"}`: verify, parse, apply
//! - `GET /access/{subject}/{resource}`: the stored window
//! - `GET /check/{subject}/{resource}`: today's access decision
//! - `GET /health`: liveness
//!
//! ## Usage
//!
//! ```ignore
//! use std::sync::Arc;
//! use dbwarden::{AccessWindowUpdater, MemoryStore};
//! use dbwarden_server::{ClaimVerifier, RequestHandler, Server, ServerConfig};
//!
//! let handler = RequestHandler::new(
//!     ClaimVerifier::new("secret"),
//!     AccessWindowUpdater::new(Arc::new(MemoryStore::new())),
//! );
//! let mut server = Server::new(ServerConfig::new(([127, 0, 0, 1], 8080)), handler)?;
//! server.run()?;
//! ```

pub mod auth;
mod config;
mod connection;
mod error;
mod handler;
pub mod http;
mod server;
#[cfg(test)]
mod tests;

pub use auth::{ClaimError, ClaimVerifier, VerifiedClaim};
pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use handler::{CLAIM_RECEIVED, ClaimOutcome, ClaimStatus, Rejection, RequestHandler};
pub use server::{Server, ShutdownHandle};
