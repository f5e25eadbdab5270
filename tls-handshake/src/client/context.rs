use std::collections::VecDeque;
use std::sync::Arc;

use pki_types::{CertificateDer, ServerName};

use super::config::{ChannelIdKey, ClientConfig};
use super::state::{Negotiated, ServerKxExpectation};
use crate::crypto::hash;
use crate::crypto::KeyExchangeAlgorithm;
use crate::enums::{AlertDescription, CipherSuite, ProtocolVersion, SignatureScheme};
use crate::error::Error;
use crate::hash_hs::Transcript;
#[cfg(feature = "logging")]
use crate::log::trace;
use crate::msgs::enums::{AlertLevel, ClientCertificateType, ExtensionType, NamedGroup};
use crate::msgs::handshake::{
    CertificatePayload, HandshakeMessagePayload, ServerKeyExchange, SessionId,
};
use crate::msgs::message::{Message, PlainMessage};
use crate::session::{NegotiatedExtensions, Session};
use crate::sign;
use crate::suites::SupportedCipherSuite;
use crate::tls12::{ConnectionRandoms, DirectionalKeys, MasterSecret};
use crate::verify::{ServerCertVerified, VerifyTicket};

/// Something waiting to go to the transport, in order.
pub(crate) enum OutboundItem {
    Record(PlainMessage),
    /// Protect everything after this point with new keys.
    InstallWriteKeys(DirectionalKeys),
}

/// What our ClientHello offered.
pub(crate) struct Offered {
    /// ClientHello.client_version: our highest enabled version.
    pub(crate) version: ProtocolVersion,
    pub(crate) suites: Vec<CipherSuite>,
    /// Every extension sent, plus `RenegotiationInfo` when the SCSV
    /// stood in for it.
    pub(crate) extensions: Vec<ExtensionType>,
    pub(crate) groups: Vec<NamedGroup>,
    pub(crate) sigschemes: Vec<SignatureScheme>,
    pub(crate) alpn_protocols: Vec<Vec<u8>>,
    pub(crate) session_id: SessionId,
    pub(crate) ticket: Option<Vec<u8>>,
}

impl Offered {
    fn new(version: ProtocolVersion) -> Self {
        Self {
            version,
            suites: Vec::new(),
            extensions: Vec::new(),
            groups: Vec::new(),
            sigschemes: Vec::new(),
            alpn_protocols: Vec::new(),
            session_id: SessionId::empty(),
            ticket: None,
        }
    }

    pub(crate) fn sent(&self, ext: ExtensionType) -> bool {
        self.extensions.contains(&ext)
    }
}

/// What the server's CertificateRequest asked for, kept until the
/// resolver answers.
pub(crate) struct ClientCertRequest {
    pub(crate) canames: Vec<Vec<u8>>,
    /// Under TLS 1.0 and 1.1, just the legacy schemes.
    pub(crate) sigschemes: Vec<SignatureScheme>,
    pub(crate) cert_types: Vec<ClientCertificateType>,
}

/// Our answer to a CertificateRequest.
pub(crate) struct ClientAuthDetails {
    /// `None` sends an empty Certificate.
    pub(crate) certkey: Option<Arc<sign::CertifiedKey>>,
    /// `None` skips CertificateVerify.
    pub(crate) signer: Option<Box<dyn sign::Signer>>,
}

/// Verify data from the most recent completed handshake, which the
/// next renegotiation is bound to.
#[derive(Clone, Default)]
pub(crate) struct FinishedData {
    pub(crate) client: Vec<u8>,
    pub(crate) server: Vec<u8>,
}

/// Everything one connection knows about its handshake.
///
/// Fields that belong to a single handshake are reset by
/// [`ConnectionContext::begin_handshake`]; the rest (the established
/// session, renegotiation binding) outlive it.
pub(crate) struct ConnectionContext {
    pub(crate) config: Arc<ClientConfig>,
    pub(crate) server_name: ServerName<'static>,

    /// A session the caller would like to resume.
    pub(crate) resume: Option<Arc<Session>>,
    /// The session this connection has established, if any.
    pub(crate) current: Option<Arc<Session>>,
    /// True once the first handshake completed; later ones are
    /// renegotiations.
    pub(crate) initial_handshake_complete: bool,
    /// The server supports RFC 5746.
    pub(crate) secure_renegotiation: bool,
    pub(crate) finished: FinishedData,

    // per handshake
    pub(crate) randoms: ConnectionRandoms,
    pub(crate) transcript: Transcript,
    pub(crate) offered: Offered,
    pub(crate) version: Option<ProtocolVersion>,
    pub(crate) suite: Option<&'static SupportedCipherSuite>,
    pub(crate) is_resumption: bool,
    /// ServerHello has said whether the offered session is resumed.
    pub(crate) resumption_decided: bool,
    /// The id the ServerHello assigned.
    pub(crate) server_session_id: SessionId,
    /// The session being built by a full handshake, or a resumed one
    /// renewed with a fresh ticket.
    pub(crate) session: Option<Session>,
    pub(crate) extensions: NegotiatedExtensions,
    pub(crate) ticket_expected: bool,
    pub(crate) certificate_status_expected: bool,
    pub(crate) next_protocol: Option<Vec<u8>>,
    pub(crate) channel_id: Option<ExtensionType>,
    pub(crate) server_cert_chain: CertificatePayload,
    pub(crate) verify_ticket: Option<VerifyTicket>,
    pub(crate) cert_verified: Option<ServerCertVerified>,
    pub(crate) server_kx: Option<ServerKeyExchange>,
    pub(crate) cert_request: Option<ClientCertRequest>,
    pub(crate) client_auth: Option<ClientAuthDetails>,
    pub(crate) master_secret: Option<MasterSecret>,
    pub(crate) pending_write: Option<DirectionalKeys>,
    pub(crate) pending_read: Option<DirectionalKeys>,
    pub(crate) channel_id_key: Option<Arc<dyn ChannelIdKey>>,

    pub(crate) outbound: VecDeque<OutboundItem>,
}

impl ConnectionContext {
    pub(crate) fn new(
        config: Arc<ClientConfig>,
        server_name: ServerName<'static>,
        resume: Option<Arc<Session>>,
    ) -> Result<Self, Error> {
        let max_version = config
            .max_version()
            .ok_or_else(|| Error::General("no protocol versions enabled".into()))?;

        Ok(Self {
            config,
            server_name,
            resume,
            current: None,
            initial_handshake_complete: false,
            secure_renegotiation: false,
            finished: FinishedData::default(),
            randoms: ConnectionRandoms {
                client: [0u8; 32],
                server: [0u8; 32],
            },
            transcript: Transcript::new(),
            offered: Offered::new(max_version),
            version: None,
            suite: None,
            is_resumption: false,
            resumption_decided: false,
            server_session_id: SessionId::empty(),
            session: None,
            extensions: NegotiatedExtensions::default(),
            ticket_expected: false,
            certificate_status_expected: false,
            next_protocol: None,
            channel_id: None,
            server_cert_chain: Vec::new(),
            verify_ticket: None,
            cert_verified: None,
            server_kx: None,
            cert_request: None,
            client_auth: None,
            master_secret: None,
            pending_write: None,
            pending_read: None,
            channel_id_key: None,
            outbound: VecDeque::new(),
        })
    }

    /// Forget everything about the previous handshake except what a
    /// renegotiation needs.
    pub(crate) fn begin_handshake(&mut self) -> Result<(), Error> {
        let max_version = self
            .config
            .max_version()
            .ok_or_else(|| Error::General("no protocol versions enabled".into()))?;

        self.randoms = ConnectionRandoms {
            client: [0u8; 32],
            server: [0u8; 32],
        };
        self.transcript = Transcript::new();
        self.offered = Offered::new(max_version);
        self.suite = None;
        self.is_resumption = false;
        self.resumption_decided = false;
        self.server_session_id = SessionId::empty();
        self.session = None;
        self.extensions = NegotiatedExtensions::default();
        self.ticket_expected = false;
        self.certificate_status_expected = false;
        self.next_protocol = None;
        self.channel_id = None;
        self.server_cert_chain = Vec::new();
        self.verify_ticket = None;
        self.cert_verified = None;
        self.cert_request = None;
        self.zeroize_secrets();
        if self.initial_handshake_complete {
            // no resumption on renegotiation
            self.resume = None;
        } else {
            self.version = None;
        }
        Ok(())
    }

    pub(crate) fn is_renegotiation(&self) -> bool {
        self.initial_handshake_complete
    }

    /// The facts the state machine branches on.
    pub(crate) fn negotiated(&self) -> Negotiated {
        let suite = self.suite;
        Negotiated {
            resuming: self.is_resumption,
            server_sends_certificate: suite
                .map(|scs| scs.server_sends_certificate())
                .unwrap_or(true),
            server_kx: match suite.map(|scs| scs.kx) {
                Some(KeyExchangeAlgorithm::Rsa) => ServerKxExpectation::Absent,
                Some(KeyExchangeAlgorithm::Psk) => ServerKxExpectation::Optional,
                _ => ServerKxExpectation::Required,
            },
            certificate_status_expected: self.certificate_status_expected,
            client_auth_requested: self.cert_request.is_some(),
            sends_certificate_verify: self
                .client_auth
                .as_ref()
                .map(|auth| auth.certkey.is_some() && auth.signer.is_some())
                .unwrap_or(false),
            ticket_expected: self.ticket_expected,
            next_protocol: self.next_protocol.is_some(),
            channel_id: self.channel_id.is_some(),
            false_start: self.false_start_allowed(),
        }
    }

    fn false_start_allowed(&self) -> bool {
        let protocol_agreed =
            self.extensions.alpn_protocol.is_some() || self.next_protocol.is_some();
        self.config.enable_false_start
            && !self.is_resumption
            && !self.is_renegotiation()
            && protocol_agreed
            && self
                .suite
                .map(|scs| scs.allows_false_start())
                .unwrap_or(false)
    }

    /// The version handshake messages are parsed under: the negotiated
    /// one, or what we offered before the ServerHello.
    pub(crate) fn parse_version(&self) -> ProtocolVersion {
        self.version
            .unwrap_or(self.offered.version)
    }

    /// The version stamped on records we send.
    pub(crate) fn record_version(&self) -> ProtocolVersion {
        self.version
            .unwrap_or(ProtocolVersion::TLSv1_0)
    }

    pub(crate) fn negotiated_version(&self) -> Result<ProtocolVersion, Error> {
        self.version
            .ok_or_else(|| missing("version"))
    }

    pub(crate) fn negotiated_suite(&self) -> Result<&'static SupportedCipherSuite, Error> {
        self.suite
            .ok_or_else(|| missing("cipher suite"))
    }

    pub(crate) fn master_secret(&self) -> Result<&MasterSecret, Error> {
        self.master_secret
            .as_ref()
            .ok_or_else(|| missing("master secret"))
    }

    pub(crate) fn transcript_hash(&self) -> Result<hash::Output, Error> {
        self.transcript
            .current_hash()
            .ok_or_else(|| missing("transcript hash"))
    }

    pub(crate) fn end_entity_cert(&self) -> Result<&CertificateDer<'static>, Error> {
        self.server_cert_chain
            .first()
            .ok_or(Error::NoCertificatesPresented)
    }

    /// Queue a handshake message, adding it to the transcript.
    pub(crate) fn emit_handshake(&mut self, payload: HandshakeMessagePayload) {
        let m = Message::build_handshake(self.record_version(), payload);
        trace!("Sending {:?}", m);
        self.transcript.add_message(&m);
        self.outbound
            .push_back(OutboundItem::Record(PlainMessage::from(m)));
    }

    pub(crate) fn emit_ccs(&mut self) {
        let m = Message::build_ccs(self.record_version());
        trace!("Sending ChangeCipherSpec");
        self.outbound
            .push_back(OutboundItem::Record(PlainMessage::from(m)));
    }

    pub(crate) fn emit_alert(&mut self, level: AlertLevel, desc: AlertDescription) {
        let m = Message::build_alert(self.record_version(), level, desc);
        self.outbound
            .push_back(OutboundItem::Record(PlainMessage::from(m)));
    }

    /// Add a received message to the transcript.
    pub(crate) fn record_received(&mut self, m: &Message) {
        self.transcript.add_message(m);
    }

    /// Drop ephemeral key material and pending keys.  Everything
    /// dropped here zeroizes itself.
    pub(crate) fn zeroize_secrets(&mut self) {
        self.server_kx = None;
        self.client_auth = None;
        self.master_secret = None;
        self.pending_write = None;
        self.pending_read = None;
        self.channel_id_key = None;
    }

    /// Mark whatever session this handshake was using as never to be
    /// resumed.
    ///
    /// Until ServerHello decides otherwise, the session we offered is
    /// the one in use.
    pub(crate) fn invalidate_session(&mut self) {
        if self.is_resumption || !self.resumption_decided {
            if let Some(session) = &self.resume {
                session.mark_not_resumable();
                if let Some(cache) = &self.config.session_cache {
                    cache.invalidate(session.id());
                }
            }
        }
        if let Some(session) = &self.session {
            session.mark_not_resumable();
        }
    }
}

/// A handshake fact was needed before it was established.  The state
/// machine makes this unreachable.
fn missing(what: &str) -> Error {
    Error::General(format!("handshake has no {} yet", what))
}
