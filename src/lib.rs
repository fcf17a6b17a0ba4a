//! Sans-io core of a WebTransport session multiplexed onto an HTTP/3
//! connection (draft-ietf-webtrans-http3).
//!
//! The crate owns the per-session state machine, the bookkeeping that binds
//! data streams to their parent session, the datagram context protocol, and
//! the stream error-code mapping. Everything that touches the wire goes
//! through the [`transport::Http3Transport`] trait supplied by the HTTP/3
//! stack; events come back in through methods on
//! [`session::WebTransportSession`] and [`uni_stream::UnidirectionalStream`],
//! all driven by the single-threaded loop that owns the connection.

pub mod capsule;
pub mod codes;
pub mod error;
pub mod session;
pub mod transport;
pub mod uni_stream;
pub mod varint;
pub mod visitor;

pub use capsule::{Capsule, CapsuleParser};
pub use error::{
    http3_error_to_webtransport, http3_error_to_webtransport_or_default,
    webtransport_error_to_http3, Error,
};
pub use session::WebTransportSession;
pub use transport::{Http3Transport, PacketFlushScope, Perspective};
pub use uni_stream::UnidirectionalStream;
pub use visitor::{NoopSessionVisitor, SessionVisitor, StreamVisitor};

/// QUIC stream id.
pub type StreamId = u64;

/// Session identifier: the stream id of the connect stream that carried the
/// extended CONNECT request.
pub type SessionId = u64;

/// HTTP/3 datagram context id (62 bits).
pub type ContextId = u64;

/// Application error code carried in CLOSE_WEBTRANSPORT_SESSION.
pub type SessionErrorCode = u32;

/// One-byte WebTransport stream error, mapped into the HTTP/3 error space.
pub type StreamErrorCode = u8;
