//! # tls-handshake - a client-side TLS 1.0-1.2 handshake engine
//!
//! This crate runs the client half of a TLS 1.0, 1.1 or 1.2 handshake as
//! an explicit, resumable state machine.  It owns everything between the
//! first ClientHello and the verified server Finished: message building
//! and parsing, the transcript, the key schedule, session resumption
//! (by session id and by ticket) and renegotiation.  Record protection,
//! certificate path validation and private key operations are left to
//! collaborators supplied by the application.
//!
//! ## Current features
//!
//! * TLS 1.0, 1.1 and 1.2, with version fallback signalling
//!   ([RFC7507](https://tools.ietf.org/html/rfc7507)).
//! * RSA, DHE, ECDHE, PSK, ECDHE-PSK and anonymous key exchange.
//! * Session resumption by id, and via tickets
//!   ([RFC5077](https://tools.ietf.org/html/rfc5077)).
//! * Extended master secret ([RFC7627](https://tools.ietf.org/html/rfc7627)).
//! * Secure renegotiation ([RFC5746](https://tools.ietf.org/html/rfc5746)).
//! * ALPN, NPN and Channel ID.
//! * OCSP stapling and SCT delivery to the certificate verifier.
//! * Client authentication.
//!
//! ## Non-features
//!
//! * TLS 1.3, SSL 3.0, and DTLS.
//! * Record-layer encryption: the keys are handed to a
//!   [`RecordTransport`](transport::RecordTransport) at the right moments.
//! * Server-side handshakes.
//! * X.509 path building: that is the job of a
//!   [`ServerCertVerifier`](verify::ServerCertVerifier).
//!
//! ## Design overview
//!
//! [`client::ClientHandshake`] owns a transport and drives
//! [`client::transition`], a pure function from a state and an event to
//! the next state and the side effects to perform.  Each call to
//! [`client::ClientHandshake::advance`] makes as much progress as it can
//! and then reports why it stopped with a [`client::Progress`]: blocked
//! on the transport, waiting for the certificate verifier or a Channel
//! ID key, or done.  Nothing is lost by stopping; call `advance()` again
//! when the reason has gone away.
//!
//! Any `Err` from `advance()` is fatal.  A best-effort alert has been
//! sent, the handshake is closed, and sessions the failure implicates are
//! no longer resumable.
//!
//! ### Session cache
//!
//! A [`cache::SessionCache`] is shared between connections through the
//! [`client::ClientConfig`].  Entries expire after a configurable timeout
//! and are evicted oldest-first when the cache is full.
//!
//! # Crate features
//!
//! - `logging`: this makes the crate depend on the `log` crate.  It
//!   outputs interesting protocol-level messages at `trace!` and `debug!`
//!   level, and protocol-level errors at `warn!` level.  The log messages
//!   do not contain secret key data, and so are safe to archive without
//!   affecting session security.  This feature is in the default set.

// Require docs for public APIs, deny unsafe code, etc.
#![forbid(unsafe_code, unused_must_use)]
#![deny(
    clippy::clone_on_ref_ptr,
    clippy::use_self,
    trivial_casts,
    trivial_numeric_casts,
    unused_import_braces,
    unused_extern_crates
)]
#![warn(missing_docs, unreachable_pub, unused_qualifications)]
// Relax these clippy lints:
// - ptr_arg: this triggers on references to type aliases that are Vec
//   underneath.
// - too_many_arguments: some things just need a lot of state, wrapping it
//   doesn't necessarily make it easier to follow what's going on
// - single_component_path_imports: our top-level `use log` import causes
//   a false positive, https://github.com/rust-lang/rust-clippy/issues/5210
// - new_without_default: for internal constructors, the indirection is not
//   helpful
#![allow(
    clippy::too_many_arguments,
    clippy::ptr_arg,
    clippy::single_component_path_imports,
    clippy::new_without_default
)]

// log for logging (optional).
#[cfg(feature = "logging")]
use log;

#[cfg(not(feature = "logging"))]
#[macro_use]
mod log {
    macro_rules! trace    ( ($($tt:tt)*) => {{}} );
    macro_rules! debug    ( ($($tt:tt)*) => {{}} );
    macro_rules! warn     ( ($($tt:tt)*) => {{}} );
}

#[macro_use]
pub mod msgs;
#[macro_use]
mod check;

pub mod cache;
pub mod client;
pub mod crypto;
pub mod enums;
pub mod error;
mod hash_hs;
mod rand;
pub mod session;
pub mod sign;
pub mod suites;
pub mod time_provider;
pub mod tls12;
pub mod transport;
pub mod verify;

pub use crate::cache::SessionCache;
pub use crate::client::{ClientConfig, ClientHandshake, HandshakeState, Progress};
pub use crate::enums::{
    AlertDescription, CipherSuite, ContentType, HandshakeType, ProtocolVersion, SignatureScheme,
};
pub use crate::error::{CertificateError, Error, InvalidMessage, PeerIncompatible, PeerMisbehaved};
pub use crate::session::Session;
pub use crate::suites::SupportedCipherSuite;
pub use crate::transport::{RecordTransport, StreamTransport};
pub use crate::verify::ServerCertVerifier;
