//! WebTransport unidirectional streams.
//!
//! A unidirectional stream opens with a preamble of two varint62 integers:
//! the stream type tag and the id of the session the stream belongs to. The
//! send side emits the preamble before any application data; the receive
//! side must parse the session id off the front of the stream before any
//! payload becomes visible, because until then nobody knows which session
//! the bytes are for.

use bytes::{Buf, Bytes, BytesMut};
use tracing::{error, warn};

use crate::codes;
use crate::error::{http3_error_to_webtransport_or_default, Error, Result};
use crate::transport::{Http3Transport, PacketFlushScope};
use crate::visitor::StreamVisitor;
use crate::{SessionId, StreamId};

pub struct UnidirectionalStream {
    id: StreamId,
    session_id: Option<SessionId>,
    needs_to_send_preamble: bool,
    buffered: BytesMut,
    fin_received: bool,
    abandoned: bool,
    visitor: Option<Box<dyn StreamVisitor>>,
}

impl UnidirectionalStream {
    /// A locally opened stream; the session is known up front and the
    /// preamble still has to be written.
    pub fn outgoing(id: StreamId, session_id: SessionId) -> Self {
        Self {
            id,
            session_id: Some(session_id),
            needs_to_send_preamble: true,
            buffered: BytesMut::new(),
            fin_received: false,
            abandoned: false,
            visitor: None,
        }
    }

    /// A peer-opened stream; the session id is discovered from the preamble.
    pub fn incoming(id: StreamId) -> Self {
        Self {
            id,
            session_id: None,
            needs_to_send_preamble: false,
            buffered: BytesMut::new(),
            fin_received: false,
            abandoned: false,
            visitor: None,
        }
    }

    pub fn id(&self) -> StreamId {
        self.id
    }

    /// The owning session, once known. Immutable after it is first set.
    pub fn session_id(&self) -> Option<SessionId> {
        self.session_id
    }

    /// Whether the stream ended before its session id could be parsed.
    pub fn is_abandoned(&self) -> bool {
        self.abandoned
    }

    pub fn set_visitor(&mut self, visitor: Box<dyn StreamVisitor>) {
        self.visitor = Some(visitor);
    }

    /// Emit the stream type tag and session id, coalesced with whatever the
    /// caller writes next.
    ///
    /// Calling this twice, or on a receive stream, is a programming error:
    /// the stream is reset with [`codes::RESET_INTERNAL_ERROR`] and
    /// [`Error::PreambleAlreadySent`] is returned.
    pub fn write_preamble<T: Http3Transport + ?Sized>(&mut self, transport: &mut T) -> Result<()> {
        let (true, Some(session_id)) = (self.needs_to_send_preamble, self.session_id) else {
            error!(
                stream_id = self.id,
                "attempted to send a unidirectional stream preamble at the wrong time"
            );
            transport.reset_stream(self.id, codes::RESET_INTERNAL_ERROR);
            return Err(Error::PreambleAlreadySent);
        };

        let mut preamble = Vec::with_capacity(16);
        crate::varint::put(codes::UNI_STREAM_TYPE, &mut preamble)?;
        crate::varint::put(session_id, &mut preamble)?;

        let mut scope = PacketFlushScope::new(transport);
        scope.transport().write_stream_data(self.id, &preamble)?;
        self.needs_to_send_preamble = false;
        Ok(())
    }

    /// Feed bytes received from the transport.
    ///
    /// Returns `Some(session_id)` on the call that completes the preamble;
    /// the caller then associates this stream with that session. Already
    /// associated streams buffer the data and tell the visitor it can read.
    pub fn on_data_available(&mut self, data: &[u8], fin: bool) -> Option<SessionId> {
        self.buffered.extend_from_slice(data);
        if fin {
            self.fin_received = true;
        }
        if self.session_id.is_some() {
            self.notify_readable();
            return None;
        }
        self.read_session_id()
    }

    /// Take every buffered payload byte received so far.
    pub fn take_payload(&mut self) -> Bytes {
        self.buffered.split().freeze()
    }

    pub fn on_can_write_new_data(&mut self) {
        if let Some(visitor) = &mut self.visitor {
            visitor.on_can_write();
        }
    }

    /// The peer reset the stream; the HTTP/3 error code is translated before
    /// delivery.
    pub fn on_stream_reset(&mut self, http3_error_code: u64) {
        if let Some(visitor) = &mut self.visitor {
            visitor.on_reset_stream_received(http3_error_to_webtransport_or_default(
                http3_error_code,
            ));
        }
    }

    /// The peer asked us to stop sending; the HTTP/3 error code is
    /// translated before delivery.
    pub fn on_stop_sending(&mut self, http3_error_code: u64) {
        if let Some(visitor) = &mut self.visitor {
            visitor.on_stop_sending_received(http3_error_to_webtransport_or_default(
                http3_error_code,
            ));
        }
    }

    pub fn on_write_side_in_data_recvd_state(&mut self) {
        if let Some(visitor) = &mut self.visitor {
            visitor.on_write_side_in_data_recvd_state();
        }
    }

    fn read_session_id(&mut self) -> Option<SessionId> {
        match crate::varint::decode(&self.buffered) {
            Ok((session_id, consumed)) => {
                self.buffered.advance(consumed);
                self.session_id = Some(session_id);
                self.notify_readable();
                Some(session_id)
            }
            Err(_) => {
                if self.fin_received {
                    // All data has arrived and the session id still cannot
                    // be parsed; drain the buffer so the stream can close.
                    warn!(
                        stream_id = self.id,
                        "stream ended before its session id completed; dropping"
                    );
                    self.buffered.clear();
                    self.abandoned = true;
                }
                None
            }
        }
    }

    fn notify_readable(&mut self) {
        if self.buffered.is_empty() && !self.fin_received {
            return;
        }
        if let Some(visitor) = &mut self.visitor {
            visitor.on_can_read();
        }
    }
}
