//! Wire constants for the WebTransport-over-HTTP/3 session layer.
//!
//! All numeric codepoints the session core puts on the wire or hands to the
//! platform are collected here to avoid magic numbers scattered across the
//! codebase.

// ---------------------------------------------------------------------------
// Stream preamble (draft-ietf-webtrans-http3 §4.2)
// ---------------------------------------------------------------------------

/// Stream type carried in the preamble of a WebTransport unidirectional
/// stream, immediately followed by the session id.
pub const UNI_STREAM_TYPE: u64 = 0x54;

// ---------------------------------------------------------------------------
// Capsules (draft-ietf-webtrans-http3 §5)
// ---------------------------------------------------------------------------

/// CLOSE_WEBTRANSPORT_SESSION: terminal close with an application error.
pub const CAPSULE_CLOSE_SESSION: u64 = 0x2843;

/// Longest error message accepted in a CLOSE_WEBTRANSPORT_SESSION capsule.
pub const MAX_CLOSE_MESSAGE_LEN: usize = 1024;

// ---------------------------------------------------------------------------
// Reset codes handed to the platform
// ---------------------------------------------------------------------------

/// Applied to every data stream when the session's connect stream tears down
/// (draft-ietf-webtrans-http3 §9.5).
pub const RESET_SESSION_GONE: u64 = 0x170d7b68;

/// Applied by the platform to a buffered data stream it gives up on because
/// no session could be associated (draft-ietf-webtrans-http3 §9.5).
pub const RESET_BUFFERED_STREAM_REJECTED: u64 = 0x3994bd84;

/// Applied to the connect stream on peer protocol violations in the datagram
/// context protocol (H3_MESSAGE_ERROR).
pub const RESET_BAD_APPLICATION_PAYLOAD: u64 = 0x010e;

/// Applied to the connect stream on a duplicate server-side context
/// registration (H3_REQUEST_CANCELLED).
pub const RESET_STREAM_CANCELLED: u64 = 0x010c;

/// Applied on local misuse, such as emitting a stream preamble twice
/// (H3_INTERNAL_ERROR).
pub const RESET_INTERNAL_ERROR: u64 = 0x0102;

// ---------------------------------------------------------------------------
// HTTP/3 datagrams
// ---------------------------------------------------------------------------

/// WEBTRANSPORT datagram format type for context registration.
pub const DATAGRAM_FORMAT_WEBTRANSPORT: u64 = 0xff7c00;

// ---------------------------------------------------------------------------
// WebTransport stream error range
// ---------------------------------------------------------------------------

/// First HTTP/3 error code of the range reserved for WebTransport stream
/// errors.
pub const STREAM_ERROR_FIRST: u64 = 0x52e4a40fa8db;

/// Last HTTP/3 error code of the reserved range; maps back to 0xff.
pub const STREAM_ERROR_LAST: u64 = 0x52e4a40fa9e2;
