//! Error types and the WebTransport ↔ HTTP/3 stream error-code mapping.

use thiserror::Error;

use crate::codes;
use crate::StreamErrorCode;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("buffer too short")]
    BufferTooShort,

    #[error("varint exceeds maximum value (2^62 - 1)")]
    VarintOverflow,

    #[error("close message too long (max {} bytes)", codes::MAX_CLOSE_MESSAGE_LEN)]
    CloseMessageTooLong,

    #[error("capsule error: {0}")]
    CapsuleError(String),

    #[error("session close already sent")]
    CloseAlreadySent,

    #[error("session close already received")]
    CloseAlreadyReceived,

    #[error("stream preamble already sent")]
    PreambleAlreadySent,

    #[error("transport error: {0}")]
    TransportError(String),
}

// ---------------------------------------------------------------------------
// Stream error-code mapping (draft-ietf-webtrans-http3 §4.4)
//
// A one-byte WebTransport stream error is carried in a reserved slice of the
// HTTP/3 error space.  Every 0x1f-th codepoint of that slice, counted from
// 0x21, is a GREASE value; the encoder steps over them and the decoder
// refuses them, so the mapping stays reversible.
// ---------------------------------------------------------------------------

/// Map a WebTransport stream error onto its HTTP/3 error code.
pub fn webtransport_error_to_http3(error: StreamErrorCode) -> u64 {
    let e = error as u64;
    codes::STREAM_ERROR_FIRST + e + e / 0x1e
}

/// Map an HTTP/3 error code back to a WebTransport stream error.
///
/// Returns `None` when the code lies outside the reserved range or falls on
/// a GREASE codepoint.
pub fn http3_error_to_webtransport(http3_error: u64) -> Option<StreamErrorCode> {
    if !(codes::STREAM_ERROR_FIRST..=codes::STREAM_ERROR_LAST).contains(&http3_error) {
        return None;
    }
    if (http3_error - 0x21) % 0x1f == 0 {
        return None;
    }
    let shifted = http3_error - codes::STREAM_ERROR_FIRST;
    // The range spans exactly the 256 mapped values plus the GREASE points
    // between them, so the result always fits in a byte.
    Some((shifted - shifted / 0x1f) as StreamErrorCode)
}

/// Like [`http3_error_to_webtransport`], but unmapped codes collapse to 0 so
/// that stream resets carrying foreign error codes still reach the visitor.
pub fn http3_error_to_webtransport_or_default(http3_error: u64) -> StreamErrorCode {
    http3_error_to_webtransport(http3_error).unwrap_or(0)
}
