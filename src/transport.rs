//! The contract between the session core and the HTTP/3 stack hosting it.
//!
//! The core is sans-io: every operation that touches the wire goes through
//! [`Http3Transport`], and the transport is passed into each call rather
//! than stored, so the HTTP/3 connection that owns both sides never has to
//! hand out long-lived references.

use std::time::Duration;

use crate::capsule::Capsule;
use crate::error::Result;
use crate::{ContextId, SessionId, StreamId};

/// Which endpoint of the connection this session lives on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Perspective {
    Client,
    Server,
}

/// Everything the session core needs from the HTTP/3 stack.
///
/// Stream classification is keyed on the negotiated version by the
/// implementation; the core never interprets stream-id bits itself.
pub trait Http3Transport {
    // -- stream classification ----------------------------------------------

    fn is_valid_session_id(&self, id: StreamId) -> bool;

    fn is_outgoing_stream(&self, id: StreamId) -> bool;

    fn is_bidi_stream(&self, id: StreamId) -> bool;

    /// Whether `id` still resolves to a live stream. Streams reset between
    /// receipt and the application's accept poll stop resolving.
    fn stream_is_open(&self, id: StreamId) -> bool;

    // -- stream control ------------------------------------------------------

    fn reset_stream(&mut self, id: StreamId, code: u64);

    /// Raw write on a data stream; used for the unidirectional preamble.
    fn write_stream_data(&mut self, id: StreamId, data: &[u8]) -> Result<()>;

    // -- connect stream ------------------------------------------------------

    fn write_capsule(&mut self, id: StreamId, capsule: &Capsule, fin: bool) -> Result<()>;

    fn write_body(&mut self, id: StreamId, body: &[u8], fin: bool) -> Result<()>;

    // -- outgoing data streams ----------------------------------------------

    fn can_open_outgoing_bidi_stream(&self, session_id: SessionId) -> bool;

    fn can_open_outgoing_uni_stream(&self, session_id: SessionId) -> bool;

    fn open_outgoing_bidi_stream(&mut self, session_id: SessionId) -> Option<StreamId>;

    fn open_outgoing_uni_stream(&mut self, session_id: SessionId) -> Option<StreamId>;

    // -- buffered incoming streams ------------------------------------------

    /// Hand over data streams that arrived before the session was known, so
    /// the session can associate them once it becomes ready.
    fn take_buffered_streams(&mut self, session_id: SessionId) -> Vec<StreamId>;

    // -- HTTP/3 datagrams ----------------------------------------------------

    fn send_datagram(
        &mut self,
        id: StreamId,
        context_id: Option<ContextId>,
        payload: &[u8],
    ) -> Result<()>;

    fn max_datagram_size(&self, id: StreamId, context_id: Option<ContextId>) -> usize;

    fn set_max_datagram_queue_time(&mut self, id: StreamId, max: Duration);

    fn next_datagram_context_id(&mut self, id: StreamId) -> ContextId;

    fn register_datagram_visitor(&mut self, id: StreamId, attempt_contexts: bool);

    fn register_datagram_context(&mut self, id: StreamId, context_id: Option<ContextId>);

    fn unregister_datagram_context(&mut self, id: StreamId, context_id: Option<ContextId>);

    fn unregister_datagram_visitor(&mut self, id: StreamId);

    // -- packet coalescing ---------------------------------------------------

    fn begin_packet_batch(&mut self) {}

    fn end_packet_batch(&mut self) {}
}

/// RAII scope under which writes coalesce into the minimal number of QUIC
/// packets.
pub struct PacketFlushScope<'a, T: Http3Transport + ?Sized> {
    transport: &'a mut T,
}

impl<'a, T: Http3Transport + ?Sized> PacketFlushScope<'a, T> {
    pub fn new(transport: &'a mut T) -> Self {
        transport.begin_packet_batch();
        Self { transport }
    }

    pub fn transport(&mut self) -> &mut T {
        self.transport
    }
}

impl<T: Http3Transport + ?Sized> Drop for PacketFlushScope<'_, T> {
    fn drop(&mut self) {
        self.transport.end_packet_batch();
    }
}
