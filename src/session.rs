//! The WebTransport session: readiness and close state machine, data stream
//! bookkeeping, and the datagram context protocol.
//!
//! A session is identified by the QUIC stream id of the connect stream that
//! carried its extended CONNECT request. The session holds no reference to
//! that stream; the transport is passed into each operation and addressed by
//! id, which keeps the connection → stream → session ownership chain
//! acyclic.

use std::collections::{BTreeSet, VecDeque};
use std::time::Duration;

use tracing::{debug, error};

use crate::capsule::Capsule;
use crate::codes;
use crate::error::{Error, Result};
use crate::transport::{Http3Transport, PacketFlushScope, Perspective};
use crate::visitor::{NoopSessionVisitor, SessionVisitor};
use crate::{ContextId, SessionErrorCode, SessionId, StreamId};

pub struct WebTransportSession {
    id: SessionId,
    perspective: Perspective,
    visitor: Box<dyn SessionVisitor>,

    ready: bool,
    close_sent: bool,
    close_received: bool,
    close_notified: bool,
    error_code: SessionErrorCode,
    error_message: String,

    /// Every data stream currently bound to this session, both directions.
    streams: BTreeSet<StreamId>,
    incoming_bidi: VecDeque<StreamId>,
    incoming_uni: VecDeque<StreamId>,

    context_is_known: bool,
    context_id: Option<ContextId>,
    context_currently_registered: bool,
}

impl WebTransportSession {
    /// Create the session for a connect stream.
    ///
    /// Clients decide their datagram context usage immediately: when
    /// `attempt_to_use_datagram_contexts` is set, a fresh context id is
    /// allocated from the connect stream. Servers learn the context id from
    /// the peer's first registration.
    pub fn new<T: Http3Transport + ?Sized>(
        transport: &mut T,
        id: SessionId,
        perspective: Perspective,
        attempt_to_use_datagram_contexts: bool,
    ) -> Self {
        debug_assert!(transport.is_valid_session_id(id));
        transport.register_datagram_visitor(id, attempt_to_use_datagram_contexts);

        let mut session = Self {
            id,
            perspective,
            visitor: Box::new(NoopSessionVisitor),
            ready: false,
            close_sent: false,
            close_received: false,
            close_notified: false,
            error_code: 0,
            error_message: String::new(),
            streams: BTreeSet::new(),
            incoming_bidi: VecDeque::new(),
            incoming_uni: VecDeque::new(),
            context_is_known: false,
            context_id: None,
            context_currently_registered: false,
        };
        if perspective == Perspective::Client {
            session.context_is_known = true;
            session.context_currently_registered = true;
            if attempt_to_use_datagram_contexts {
                session.context_id = Some(transport.next_datagram_context_id(id));
            }
        }
        session
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn perspective(&self) -> Perspective {
        self.perspective
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn close_sent(&self) -> bool {
        self.close_sent
    }

    pub fn close_received(&self) -> bool {
        self.close_received
    }

    /// Meaningful only once a close has been sent or received.
    pub fn error_code(&self) -> SessionErrorCode {
        self.error_code
    }

    pub fn error_message(&self) -> &str {
        &self.error_message
    }

    pub fn context_id(&self) -> Option<ContextId> {
        self.context_id
    }

    /// Replace the no-op visitor installed at construction.
    pub fn set_visitor(&mut self, visitor: Box<dyn SessionVisitor>) {
        self.visitor = visitor;
    }

    // -----------------------------------------------------------------------
    // Readiness
    // -----------------------------------------------------------------------

    /// The connect stream's response (client) or request (server) headers
    /// arrived.
    ///
    /// Clients require a 2xx status; anything else leaves the session
    /// not-ready without telling the visitor. On success the visitor is
    /// notified and data streams that arrived before the session existed
    /// are drained from the transport and associated.
    pub fn headers_received<T: Http3Transport + ?Sized>(
        &mut self,
        transport: &mut T,
        headers: &[(String, String)],
    ) {
        if self.perspective == Perspective::Client {
            let status = headers
                .iter()
                .find(|(name, _)| name == ":status")
                .and_then(|(_, value)| value.parse::<u16>().ok());
            match status {
                None => {
                    debug!(
                        session_id = self.id,
                        "response headers carry no valid status code, rejecting"
                    );
                    return;
                }
                Some(status) if !(200..300).contains(&status) => {
                    debug!(session_id = self.id, status, "non-2xx response, rejecting");
                    return;
                }
                Some(_) => {}
            }
        }

        debug!(session_id = self.id, "session ready");
        self.ready = true;
        self.visitor.on_session_ready(headers);
        for stream_id in transport.take_buffered_streams(self.id) {
            self.associate_stream(transport, stream_id);
        }
    }

    // -----------------------------------------------------------------------
    // Data stream bookkeeping
    // -----------------------------------------------------------------------

    /// Bind a data stream to this session.
    ///
    /// Outgoing streams are only tracked; incoming ones are queued for the
    /// application and announced through the visitor.
    pub fn associate_stream<T: Http3Transport + ?Sized>(
        &mut self,
        transport: &T,
        stream_id: StreamId,
    ) {
        self.streams.insert(stream_id);

        if transport.is_outgoing_stream(stream_id) {
            return;
        }
        if transport.is_bidi_stream(stream_id) {
            self.incoming_bidi.push_back(stream_id);
            self.visitor.on_incoming_bidirectional_stream_available();
        } else {
            self.incoming_uni.push_back(stream_id);
            self.visitor.on_incoming_unidirectional_stream_available();
        }
    }

    /// A data stream closed on its own; forget it.
    pub fn on_stream_closed(&mut self, stream_id: StreamId) {
        self.streams.remove(&stream_id);
    }

    /// Pop the next incoming bidirectional stream, skipping streams that
    /// were reset between receipt and this poll.
    pub fn accept_incoming_bidirectional_stream<T: Http3Transport + ?Sized>(
        &mut self,
        transport: &T,
    ) -> Option<StreamId> {
        while let Some(stream_id) = self.incoming_bidi.pop_front() {
            if transport.stream_is_open(stream_id) {
                return Some(stream_id);
            }
        }
        None
    }

    /// Pop the next incoming unidirectional stream, skipping streams that
    /// were reset between receipt and this poll.
    pub fn accept_incoming_unidirectional_stream<T: Http3Transport + ?Sized>(
        &mut self,
        transport: &T,
    ) -> Option<StreamId> {
        while let Some(stream_id) = self.incoming_uni.pop_front() {
            if transport.stream_is_open(stream_id) {
                return Some(stream_id);
            }
        }
        None
    }

    pub fn can_open_next_outgoing_bidirectional_stream<T: Http3Transport + ?Sized>(
        &self,
        transport: &T,
    ) -> bool {
        transport.can_open_outgoing_bidi_stream(self.id)
    }

    pub fn can_open_next_outgoing_unidirectional_stream<T: Http3Transport + ?Sized>(
        &self,
        transport: &T,
    ) -> bool {
        transport.can_open_outgoing_uni_stream(self.id)
    }

    /// Open an outgoing bidirectional stream, or `None` when flow control
    /// blocks it.
    pub fn open_outgoing_bidirectional_stream<T: Http3Transport + ?Sized>(
        &mut self,
        transport: &mut T,
    ) -> Option<StreamId> {
        let stream_id = transport.open_outgoing_bidi_stream(self.id)?;
        self.associate_stream(transport, stream_id);
        Some(stream_id)
    }

    /// Open an outgoing unidirectional stream, or `None` when flow control
    /// blocks it.
    pub fn open_outgoing_unidirectional_stream<T: Http3Transport + ?Sized>(
        &mut self,
        transport: &mut T,
    ) -> Option<StreamId> {
        let stream_id = transport.open_outgoing_uni_stream(self.id)?;
        self.associate_stream(transport, stream_id);
        Some(stream_id)
    }

    /// Forwarded by the platform when stream flow control opens up.
    pub fn on_can_create_new_outgoing_bidirectional_stream(&mut self) {
        self.visitor.on_can_create_new_outgoing_bidirectional_stream();
    }

    /// Forwarded by the platform when stream flow control opens up.
    pub fn on_can_create_new_outgoing_unidirectional_stream(&mut self) {
        self.visitor.on_can_create_new_outgoing_unidirectional_stream();
    }

    // -----------------------------------------------------------------------
    // Closing
    // -----------------------------------------------------------------------

    /// Close the session with an application error.
    ///
    /// If the peer's close was already received, no capsule is emitted (the
    /// FIN answering it is already on the wire) and the peer's error keeps
    /// precedence over `error_code`/`error_message`.
    pub fn close_session<T: Http3Transport + ?Sized>(
        &mut self,
        transport: &mut T,
        error_code: SessionErrorCode,
        error_message: &str,
    ) -> Result<()> {
        if self.close_sent {
            error!(session_id = self.id, "close_session called more than once");
            return Err(Error::CloseAlreadySent);
        }
        self.close_sent = true;

        if self.close_received {
            debug!(
                session_id = self.id,
                "skipping CLOSE_WEBTRANSPORT_SESSION, peer already closed"
            );
            return Ok(());
        }

        self.error_code = error_code;
        self.error_message = error_message.to_string();
        let capsule = Capsule::CloseSession {
            error_code,
            error_message: error_message.to_string(),
        };
        let mut scope = PacketFlushScope::new(transport);
        scope.transport().write_capsule(self.id, &capsule, true)
    }

    /// The peer's CLOSE_WEBTRANSPORT_SESSION capsule arrived.
    pub fn on_close_received<T: Http3Transport + ?Sized>(
        &mut self,
        transport: &mut T,
        error_code: SessionErrorCode,
        error_message: &str,
    ) -> Result<()> {
        if self.close_received {
            error!(
                session_id = self.id,
                "on_close_received called more than once"
            );
            return Err(Error::CloseAlreadyReceived);
        }
        self.close_received = true;

        if self.close_sent {
            debug!(
                session_id = self.id,
                "ignoring peer CLOSE_WEBTRANSPORT_SESSION, local close already sent"
            );
            return Ok(());
        }

        self.error_code = error_code;
        self.error_message = error_message.to_string();
        transport.write_body(self.id, &[], true)?;
        self.maybe_notify_close();
        Ok(())
    }

    /// The connect stream's FIN arrived without a preceding close capsule.
    pub fn on_connect_stream_fin_received<T: Http3Transport + ?Sized>(
        &mut self,
        transport: &mut T,
    ) -> Result<()> {
        if self.close_received {
            // The close capsule already answered with a FIN of its own.
            return Ok(());
        }
        self.close_received = true;

        if self.close_sent {
            debug!(session_id = self.id, "ignoring FIN, local close already sent");
            return Ok(());
        }

        transport.write_body(self.id, &[], true)?;
        self.maybe_notify_close();
        Ok(())
    }

    /// The connect stream is being torn down; the session dies with it.
    pub fn on_connect_stream_closing<T: Http3Transport + ?Sized>(&mut self, transport: &mut T) {
        // Snapshot and clear first: resetting a stream can re-enter the
        // platform, which must observe a stable, empty stream set.
        let streams: Vec<StreamId> = std::mem::take(&mut self.streams).into_iter().collect();
        for stream_id in streams {
            transport.reset_stream(stream_id, codes::RESET_SESSION_GONE);
        }
        if self.context_currently_registered {
            self.context_currently_registered = false;
            transport.unregister_datagram_context(self.id, self.context_id);
        }
        transport.unregister_datagram_visitor(self.id);

        self.maybe_notify_close();
    }

    /// Mark the session closed and send a bare FIN, bypassing the capsule.
    #[cfg(test)]
    pub(crate) fn close_with_fin_only<T: Http3Transport + ?Sized>(
        &mut self,
        transport: &mut T,
    ) -> Result<()> {
        debug_assert!(!self.close_sent);
        self.close_sent = true;
        if self.close_received {
            return Ok(());
        }
        transport.write_body(self.id, &[], true)
    }

    fn maybe_notify_close(&mut self) {
        if self.close_notified {
            return;
        }
        self.close_notified = true;
        self.visitor
            .on_session_closed(self.error_code, &self.error_message);
    }

    // -----------------------------------------------------------------------
    // Datagrams
    // -----------------------------------------------------------------------

    pub fn send_or_queue_datagram<T: Http3Transport + ?Sized>(
        &mut self,
        transport: &mut T,
        payload: &[u8],
    ) -> Result<()> {
        transport.send_datagram(self.id, self.context_id, payload)
    }

    pub fn get_max_datagram_size<T: Http3Transport + ?Sized>(&self, transport: &T) -> usize {
        transport.max_datagram_size(self.id, self.context_id)
    }

    pub fn set_datagram_max_time_in_queue<T: Http3Transport + ?Sized>(
        &mut self,
        transport: &mut T,
        max: Duration,
    ) {
        transport.set_max_datagram_queue_time(self.id, max);
    }

    /// An HTTP/3 datagram arrived for this session.
    pub fn on_http3_datagram(
        &mut self,
        stream_id: StreamId,
        context_id: Option<ContextId>,
        payload: &[u8],
    ) {
        debug_assert_eq!(stream_id, self.id);
        debug_assert_eq!(context_id, self.context_id);
        self.visitor.on_datagram_received(payload);
    }

    /// The peer registered a datagram context on the connect stream.
    pub fn on_context_received<T: Http3Transport + ?Sized>(
        &mut self,
        transport: &mut T,
        stream_id: StreamId,
        context_id: Option<ContextId>,
        format_type: u64,
        format_additional_data: &[u8],
    ) {
        if stream_id != self.id {
            error!(
                session_id = self.id,
                stream_id, "datagram context registered on the wrong stream"
            );
            return;
        }
        if format_type != codes::DATAGRAM_FORMAT_WEBTRANSPORT {
            debug!(
                session_id = self.id,
                format_type, "ignoring unexpected datagram format type"
            );
            return;
        }
        if !format_additional_data.is_empty() {
            error!(
                session_id = self.id,
                "non-empty format additional data in context registration"
            );
            transport.reset_stream(self.id, codes::RESET_BAD_APPLICATION_PAYLOAD);
            return;
        }
        if !self.context_is_known {
            self.context_is_known = true;
            self.context_id = context_id;
        }
        if context_id != self.context_id {
            debug!(
                session_id = self.id,
                "ignoring registration for an unexpected context id"
            );
            return;
        }
        if self.perspective == Perspective::Server {
            if self.context_currently_registered {
                error!(session_id = self.id, "duplicate datagram context registration");
                transport.reset_stream(self.id, codes::RESET_STREAM_CANCELLED);
                return;
            }
            self.context_currently_registered = true;
            transport.register_datagram_context(self.id, self.context_id);
        }
    }

    /// The peer closed a datagram context. A close of the adopted context is
    /// always terminal.
    pub fn on_context_closed<T: Http3Transport + ?Sized>(
        &mut self,
        transport: &mut T,
        stream_id: StreamId,
        context_id: Option<ContextId>,
        close_code: u64,
        close_details: &str,
    ) {
        if stream_id != self.id {
            error!(
                session_id = self.id,
                stream_id, "datagram context closed on the wrong stream"
            );
            return;
        }
        if context_id != self.context_id {
            debug!(
                session_id = self.id,
                "ignoring close of an unexpected context id"
            );
            return;
        }
        debug!(
            session_id = self.id,
            close_code, close_details, "peer closed the datagram context, resetting connect stream"
        );
        transport.reset_stream(self.id, codes::RESET_BAD_APPLICATION_PAYLOAD);
    }
}
