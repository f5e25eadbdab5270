use core::task::Poll;
use std::io;
use std::mem;
use std::sync::Arc;

use pki_types::ServerName;

use super::config::ClientConfig;
use super::context::{ConnectionContext, OutboundItem};
use super::state::{transition, Action, Event, HandshakeState, Transition};
use super::{hs, tls12};
use crate::check::inappropriate_message;
use crate::enums::{AlertDescription, ContentType, HandshakeType, ProtocolVersion};
use crate::error::{Error, InvalidMessage, PeerIncompatible};
#[cfg(feature = "logging")]
use crate::log::{debug, trace, warn};
use crate::msgs::alert::AlertMessagePayload;
use crate::msgs::enums::AlertLevel;
use crate::msgs::hsjoiner::HandshakeJoiner;
use crate::msgs::message::{Message, MessagePayload};
use crate::session::Session;
use crate::suites::SupportedCipherSuite;
use crate::transport::RecordTransport;
use crate::verify::ServerCertVerified;

/// What a call to [`ClientHandshake::advance`] achieved.
///
/// None of these are errors: call `advance()` again once the reason
/// for stopping has gone away.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Progress {
    /// The handshake is complete.
    Established,
    /// The transport could not make progress without blocking.
    WouldBlock,
    /// The certificate verifier has not finished with the server's chain.
    PendingCertificateVerification,
    /// The Channel ID provider has not produced a key yet.
    PendingChannelId,
    /// The client certificate resolver has not decided yet.
    PendingClientCertificate,
    /// Our Finished is on its way and the write keys are installed, but
    /// the server's Finished has not arrived.  Application data may be
    /// written now; call `advance()` again to finish the handshake.
    ///
    /// Only reported with [`ClientConfig::enable_false_start`].
    FalseStart,
    /// The server asked for a new handshake with HelloRequest.
    ///
    /// Call [`ClientHandshake::renegotiate`] to honour it, or ignore it.
    RenegotiationRequested,
}

/// A client handshake in progress over a [`RecordTransport`].
///
/// This owns the transport.  Drive it with [`ClientHandshake::advance`]
/// until it returns [`Progress::Established`].
pub struct ClientHandshake<T: RecordTransport> {
    state: HandshakeState,
    cx: ConnectionContext,
    transport: T,
    joiner: HandshakeJoiner,
    /// A message the state machine skipped past, to be offered again
    /// in the next state.
    pending: Option<Message>,
    established_reported: bool,
    false_start_pending: bool,
}

impl<T: RecordTransport> ClientHandshake<T> {
    /// Prepare a handshake with `server_name`.
    ///
    /// `resume` is a session from an earlier connection to the same
    /// server, to be resumed if it is still usable.
    pub fn new(
        config: Arc<ClientConfig>,
        server_name: ServerName<'static>,
        transport: T,
        resume: Option<Arc<Session>>,
    ) -> Result<Self, Error> {
        Ok(Self {
            state: HandshakeState::Start,
            cx: ConnectionContext::new(config, server_name, resume)?,
            transport,
            joiner: HandshakeJoiner::new(),
            pending: None,
            established_reported: false,
            false_start_pending: false,
        })
    }

    /// Make as much progress as possible.
    ///
    /// Any error is fatal: a best-effort alert has been sent and the
    /// handshake is `Closed`.  Later calls return
    /// [`Error::HandshakeClosed`].
    pub fn advance(&mut self) -> Result<Progress, Error> {
        if self.state == HandshakeState::Closed {
            return Err(Error::HandshakeClosed);
        }

        match self.drive() {
            Ok(progress) => Ok(progress),
            Err(err) => {
                self.fail(&err);
                Err(err)
            }
        }
    }

    /// Start a new handshake on an established connection.
    ///
    /// Only servers that support secure renegotiation are renegotiated
    /// with.  The new handshake never resumes, and its session replaces
    /// the current one.
    pub fn renegotiate(&mut self) -> Result<(), Error> {
        if self.state != HandshakeState::Established {
            return Err(Error::HandshakeNotComplete);
        }
        if !self.cx.secure_renegotiation {
            return Err(PeerIncompatible::SecureRenegotiationUnsupported.into());
        }

        debug!("Renegotiating with {:?}", self.cx.server_name);
        self.cx.begin_handshake()?;
        self.established_reported = false;
        self.apply(Event::Start)
    }

    /// Give up on the handshake, telling the server so.
    ///
    /// The session in use is left resumable.
    pub fn abort(&mut self) {
        if self.state == HandshakeState::Closed {
            return;
        }

        self.cx.outbound.clear();
        self.cx
            .emit_alert(AlertLevel::Fatal, AlertDescription::UserCanceled);
        let _ = self.flush_outbound();
        self.close();
    }

    /// Where the handshake is.
    pub fn state(&self) -> HandshakeState {
        self.state
    }

    /// Whether the most recent handshake resumed a session.
    pub fn is_resumption(&self) -> bool {
        self.cx.is_resumption
    }

    /// The negotiated protocol version.
    pub fn protocol_version(&self) -> Option<ProtocolVersion> {
        self.cx.version
    }

    /// The negotiated cipher suite.
    pub fn negotiated_cipher_suite(&self) -> Option<&'static SupportedCipherSuite> {
        self.cx.suite
    }

    /// The session established by the most recent complete handshake.
    pub fn session(&self) -> Option<&Arc<Session>> {
        self.cx.current.as_ref()
    }

    /// The protocol the server selected with ALPN.
    pub fn alpn_protocol(&self) -> Option<&[u8]> {
        self.cx
            .extensions
            .alpn_protocol
            .as_deref()
    }

    /// The protocol we chose from the server's NPN list.
    pub fn next_protocol(&self) -> Option<&[u8]> {
        self.cx.next_protocol.as_deref()
    }

    /// The OCSP response the server stapled.
    pub fn ocsp_response(&self) -> Option<&[u8]> {
        self.cx
            .extensions
            .ocsp_response
            .as_deref()
    }

    /// The signed certificate timestamp list the server sent.
    pub fn sct_list(&self) -> Option<&[u8]> {
        self.cx.extensions.sct_list.as_deref()
    }

    /// Whether Channel ID was negotiated.
    pub fn channel_id_negotiated(&self) -> bool {
        self.cx.extensions.channel_id_negotiated
    }

    /// What the verifier concluded about the server's chain.
    pub fn server_cert_verified(&self) -> Option<&ServerCertVerified> {
        self.cx.cert_verified.as_ref()
    }

    /// The transport.
    pub fn get_ref(&self) -> &T {
        &self.transport
    }

    /// The transport, mutably.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    fn drive(&mut self) -> Result<Progress, Error> {
        use HandshakeState::*;

        loop {
            match self.state {
                Start => self.apply(Event::Start)?,

                Established => {
                    if !self.flush_outbound()? {
                        return Ok(Progress::WouldBlock);
                    }
                    if !self.established_reported {
                        self.established_reported = true;
                        return Ok(Progress::Established);
                    }
                    return self.read_while_established();
                }

                AwaitCertificateVerification => {
                    match tls12::poll_certificate_verification(&mut self.cx)? {
                        Poll::Pending => {
                            self.flush_outbound()?;
                            return Ok(Progress::PendingCertificateVerification);
                        }
                        Poll::Ready(()) => self.apply(Event::VerifierDone)?,
                    }
                }

                SendClientCertificate if self.cx.client_auth.is_none() => {
                    if tls12::poll_client_auth(&mut self.cx)?.is_pending() {
                        self.flush_outbound()?;
                        return Ok(Progress::PendingClientCertificate);
                    }
                }

                SendChannelId if self.cx.channel_id_key.is_none() => {
                    let provider = self
                        .cx
                        .config
                        .channel_id
                        .clone()
                        .ok_or_else(|| Error::General("Channel ID without a provider".into()))?;

                    match provider.channel_id_key(&self.cx.server_name) {
                        Poll::Pending => {
                            self.flush_outbound()?;
                            return Ok(Progress::PendingChannelId);
                        }
                        Poll::Ready(key) => self.cx.channel_id_key = Some(key?),
                    }
                }

                state if state.is_sending() => self.apply(Event::Send)?,

                state if state.is_awaiting() => {
                    if !self.flush_outbound()? {
                        return Ok(Progress::WouldBlock);
                    }
                    if mem::take(&mut self.false_start_pending) {
                        debug!("False Start with {:?}", self.cx.suite);
                        return Ok(Progress::FalseStart);
                    }
                    match self.next_message()? {
                        Some(m) => self.dispatch(m)?,
                        None => return Ok(Progress::WouldBlock),
                    }
                }

                _ => return Err(Error::HandshakeClosed),
            }
        }
    }

    /// Watch for HelloRequest once established.
    fn read_while_established(&mut self) -> Result<Progress, Error> {
        let m = match self.next_message()? {
            Some(m) => m,
            None => return Ok(Progress::Established),
        };

        match &m.payload {
            MessagePayload::Handshake { parsed, .. } if parsed.typ == HandshakeType::HelloRequest => {
                debug!("Server requested renegotiation");
                Ok(Progress::RenegotiationRequested)
            }
            MessagePayload::Alert(alert) => {
                self.handle_alert(alert)?;
                Ok(Progress::Established)
            }
            _ => Err(inappropriate_message(&m, &[ContentType::Alert])),
        }
    }

    /// The next whole message: a skipped one first, then anything the
    /// joiner has, then a new record.
    fn next_message(&mut self) -> Result<Option<Message>, Error> {
        if let Some(m) = self.pending.take() {
            return Ok(Some(m));
        }

        loop {
            if let Some(m) = self.joiner.pop(self.cx.parse_version()) {
                return Ok(Some(m?));
            }

            let record = match self.transport.read_record() {
                Ok(record) => record,
                Err(err) if err.kind() == io::ErrorKind::WouldBlock => return Ok(None),
                Err(err) => return Err(Error::Transport(err.kind())),
            };

            if self.joiner.want_message(&record) {
                self.joiner.take_message(record)?;
                continue;
            }

            if !self.joiner.is_empty() {
                return Err(InvalidMessage::UnexpectedMessage(
                    "record interleaved with a fragmented handshake message",
                )
                .into());
            }

            return Ok(Some(Message::try_from(record)?));
        }
    }

    fn dispatch(&mut self, m: Message) -> Result<(), Error> {
        let typ = match &m.payload {
            MessagePayload::Alert(alert) => return self.handle_alert(alert),
            MessagePayload::ChangeCipherSpec(_) => {
                if !self.joiner.is_empty() || self.joiner.has_frames() {
                    return Err(InvalidMessage::UnexpectedMessage(
                        "ChangeCipherSpec inside a handshake flight",
                    )
                    .into());
                }
                return self.apply(Event::ReceivedChangeCipherSpec);
            }
            MessagePayload::ApplicationData(_) => {
                return Err(inappropriate_message(
                    &m,
                    &[ContentType::Handshake, ContentType::ChangeCipherSpec],
                ));
            }
            MessagePayload::Handshake { parsed, .. } => parsed.typ,
        };

        if typ == HandshakeType::HelloRequest {
            debug!("Ignoring HelloRequest during a handshake");
            return Ok(());
        }

        let at = self.state;
        let next = transition(at, Event::Received(typ), &self.cx.negotiated())?;
        let process = next.actions.contains(&Action::Process);
        self.enter(next)?;

        if !process {
            trace!("{:?} skipped, offering {:?} to {:?}", at, typ, self.state);
            self.pending = Some(m);
            return Ok(());
        }

        self.process(at, &m)?;
        self.apply(Event::Processed(typ))
    }

    fn process(&mut self, state: HandshakeState, m: &Message) -> Result<(), Error> {
        use HandshakeState::*;

        let cx = &mut self.cx;
        match state {
            AwaitServerHello => hs::handle_server_hello(cx, m),
            AwaitCertificate => tls12::handle_certificate(cx, m),
            AwaitCertificateStatus => tls12::handle_certificate_status(cx, m),
            AwaitServerKeyExchange => tls12::handle_server_kx(cx, m),
            AwaitCertificateRequest => tls12::handle_certificate_request(cx, m),
            AwaitServerHelloDone => tls12::handle_server_hello_done(cx, m),
            AwaitNewSessionTicket => tls12::handle_new_ticket(cx, m),
            AwaitFinished => tls12::handle_server_finished(cx, m),
            _ => Err(Error::General(format!("no handler in state {:?}", state))),
        }
    }

    fn handle_alert(&self, alert: &AlertMessagePayload) -> Result<(), Error> {
        if alert.level == AlertLevel::Warning && alert.description != AlertDescription::CloseNotify {
            warn!("Ignoring warning alert {:?}", alert.description);
            return Ok(());
        }

        // no alert goes back for one received
        warn!("Received alert {:?}", alert);
        Err(Error::AlertReceived(alert.description))
    }

    fn apply(&mut self, event: Event) -> Result<(), Error> {
        let next = transition(self.state, event, &self.cx.negotiated())?;
        self.enter(next)
    }

    fn enter(&mut self, next: Transition) -> Result<(), Error> {
        if next.next != self.state {
            trace!("{:?} -> {:?}", self.state, next.next);
        }
        let was = self.state;
        self.state = next.next;

        for action in next.actions {
            self.perform(action)?;
        }

        if self.state == HandshakeState::Established && was != HandshakeState::Established {
            debug!(
                "Handshake complete: {:?} {:?} resumed={}",
                self.cx.version, self.cx.suite, self.cx.is_resumption
            );
            self.cx.initial_handshake_complete = true;
            self.cx.zeroize_secrets();
        }
        Ok(())
    }

    fn perform(&mut self, action: Action) -> Result<(), Error> {
        let cx = &mut self.cx;
        match action {
            // run by dispatch() once the state has been entered
            Action::Process => Ok(()),
            Action::EmitClientHello => hs::emit_client_hello(cx),
            Action::BeginCertificateVerification => tls12::begin_certificate_verification(cx),
            Action::EmitClientCertificate => {
                tls12::emit_client_certificate(cx);
                Ok(())
            }
            Action::EmitClientKeyExchange => tls12::emit_client_kx(cx),
            Action::EmitCertificateVerify => tls12::emit_certificate_verify(cx),
            Action::EmitChangeCipherSpec => {
                tls12::emit_ccs(cx);
                Ok(())
            }
            Action::InstallWriteKeys => tls12::install_write_keys(cx),
            Action::EmitNextProtocol => tls12::emit_next_protocol(cx),
            Action::EmitChannelId => tls12::emit_channel_id(cx),
            Action::EmitFinished => tls12::emit_finished(cx),
            Action::BeginFalseStart => {
                self.false_start_pending = true;
                Ok(())
            }
            Action::InstallReadKeys => {
                let keys = tls12::take_read_keys(cx)?;
                self.transport.install_read_keys(keys);
                Ok(())
            }
            Action::CacheSession => tls12::cache_session(cx),
        }
    }

    /// Write everything queued.  Returns false if the transport would
    /// block; nothing is lost in that case.
    fn flush_outbound(&mut self) -> Result<bool, Error> {
        while let Some(item) = self.cx.outbound.pop_front() {
            match item {
                OutboundItem::Record(record) => match self.transport.write_record(&record) {
                    Ok(()) => {}
                    Err(err) if err.kind() == io::ErrorKind::WouldBlock => {
                        self.cx
                            .outbound
                            .push_front(OutboundItem::Record(record));
                        return Ok(false);
                    }
                    Err(err) => return Err(Error::Transport(err.kind())),
                },
                OutboundItem::InstallWriteKeys(keys) => self.transport.install_write_keys(keys),
            }
        }

        match self.transport.flush() {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == io::ErrorKind::WouldBlock => Ok(false),
            Err(err) => Err(Error::Transport(err.kind())),
        }
    }

    fn fail(&mut self, err: &Error) {
        warn!("Handshake failed: {}", err);

        // records still queued never reached the peer, so neither did our CCS
        self.cx.outbound.clear();
        if let Some(desc) = err.alert() {
            self.cx.emit_alert(AlertLevel::Fatal, desc);
            let _ = self.flush_outbound();
        }

        if err.invalidates_session() {
            self.cx.invalidate_session();
        }
        self.close();
    }

    fn close(&mut self) {
        self.state = HandshakeState::Closed;
        self.pending = None;
        self.false_start_pending = false;
        self.joiner.clear();
        self.cx.zeroize_secrets();
    }
}
