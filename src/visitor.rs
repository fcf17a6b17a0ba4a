//! Callback sinks through which the core reports events to the application.

use crate::{SessionErrorCode, StreamErrorCode};

/// Receiver for session-level events.
///
/// Every method defaults to a no-op, so an application only implements the
/// events it cares about. A [`NoopSessionVisitor`] is installed at session
/// construction until the application supplies its own.
pub trait SessionVisitor {
    /// The session became ready; `headers` is the CONNECT header list.
    fn on_session_ready(&mut self, _headers: &[(String, String)]) {}

    /// Terminal close notification; delivered at most once.
    fn on_session_closed(&mut self, _error_code: SessionErrorCode, _error_message: &str) {}

    fn on_incoming_bidirectional_stream_available(&mut self) {}

    fn on_incoming_unidirectional_stream_available(&mut self) {}

    fn on_datagram_received(&mut self, _payload: &[u8]) {}

    fn on_can_create_new_outgoing_bidirectional_stream(&mut self) {}

    fn on_can_create_new_outgoing_unidirectional_stream(&mut self) {}
}

pub struct NoopSessionVisitor;

impl SessionVisitor for NoopSessionVisitor {}

/// Receiver for per-stream events on a WebTransport data stream.
///
/// Reset and stop-sending codes arrive already translated from the HTTP/3
/// error space into one-byte WebTransport stream errors.
pub trait StreamVisitor {
    fn on_can_read(&mut self) {}

    fn on_can_write(&mut self) {}

    fn on_reset_stream_received(&mut self, _error: StreamErrorCode) {}

    fn on_stop_sending_received(&mut self, _error: StreamErrorCode) {}

    fn on_write_side_in_data_recvd_state(&mut self) {}
}
