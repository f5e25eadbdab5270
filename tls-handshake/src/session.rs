use core::fmt;
use core::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use pki_types::UnixTime;

use crate::enums::{CipherSuite, ProtocolVersion};
use crate::error::InvalidMessage;
use crate::msgs::base::{PayloadU16, PayloadU24, PayloadU8};
use crate::msgs::codec::{Codec, Reader};
use crate::msgs::handshake::{CertificatePayload, SessionId};
use crate::suites::{self, SupportedCipherSuite};
use crate::tls12::{MasterSecret, MASTER_SECRET_LEN};

/// What the handshake that created a session negotiated, beyond the
/// version and suite.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NegotiatedExtensions {
    /// The ALPN protocol the server selected.
    pub alpn_protocol: Option<Vec<u8>>,
    /// The server's signed certificate timestamp list, as sent.
    pub sct_list: Option<Vec<u8>>,
    /// The stapled OCSP response.
    pub ocsp_response: Option<Vec<u8>>,
    /// Channel ID was negotiated.
    pub channel_id_negotiated: bool,
    /// ...under the new-style extension, which binds resumptions to the
    /// original handshake.
    pub channel_id_new: bool,
    /// The master secret is an extended master secret (RFC 7627).
    pub extended_ms: bool,
    /// Transcript hash after the client Finished of the full handshake;
    /// signed again in resumed Channel ID handshakes.
    pub original_handshake_hash: Option<Vec<u8>>,
}

/// A session ticket issued by the server.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionTicket {
    /// The server's suggested lifetime, in seconds.  Zero means unspecified.
    pub lifetime_hint: u32,
    /// The opaque ticket.
    pub ticket: Vec<u8>,
}

/// A resumable TLS session.
///
/// Once published (in a [`crate::SessionCache`] or as a connection's
/// current session) a session is shared by `Arc` and never mutated,
/// except that it can be marked not resumable.
pub struct Session {
    session_id: SessionId,
    version: ProtocolVersion,
    suite: &'static SupportedCipherSuite,
    master_secret: MasterSecret,
    peer_certificates: CertificatePayload,
    extensions: NegotiatedExtensions,
    ticket: Option<SessionTicket>,
    creation_time: UnixTime,
    not_resumable: AtomicBool,
}

impl Session {
    pub(crate) fn new(
        session_id: SessionId,
        version: ProtocolVersion,
        suite: &'static SupportedCipherSuite,
        master_secret: MasterSecret,
        creation_time: UnixTime,
    ) -> Self {
        Self {
            session_id,
            version,
            suite,
            master_secret,
            peer_certificates: Vec::new(),
            extensions: NegotiatedExtensions::default(),
            ticket: None,
            creation_time,
            not_resumable: AtomicBool::new(false),
        }
    }

    /// The session id, possibly empty.
    pub fn id(&self) -> &SessionId {
        &self.session_id
    }

    /// The protocol version negotiated.
    pub fn version(&self) -> ProtocolVersion {
        self.version
    }

    /// The cipher suite negotiated.
    pub fn suite(&self) -> &'static SupportedCipherSuite {
        self.suite
    }

    pub(crate) fn master_secret(&self) -> &MasterSecret {
        &self.master_secret
    }

    /// The server's certificate chain, end-entity first.
    pub fn peer_certificates(&self) -> &CertificatePayload {
        &self.peer_certificates
    }

    /// Extension results of the handshake that created this session.
    pub fn extensions(&self) -> &NegotiatedExtensions {
        &self.extensions
    }

    /// The session ticket, if the server issued one.
    pub fn ticket(&self) -> Option<&SessionTicket> {
        self.ticket.as_ref()
    }

    /// When the session was created.
    pub fn creation_time(&self) -> UnixTime {
        self.creation_time
    }

    /// False once the session has been invalidated.
    pub fn is_resumable(&self) -> bool {
        !self.not_resumable.load(Ordering::Acquire)
    }

    /// Mark the session never to be resumed again.  Idempotent.
    pub fn mark_not_resumable(&self) {
        self.not_resumable
            .store(true, Ordering::Release);
    }

    /// True if the session is older than `timeout` at `now`.
    pub fn has_expired(&self, now: UnixTime, timeout: Duration) -> bool {
        now.as_secs()
            .saturating_sub(self.creation_time.as_secs())
            > timeout.as_secs()
    }

    pub(crate) fn set_session_id(&mut self, id: SessionId) {
        self.session_id = id;
    }

    pub(crate) fn set_peer_certificates(&mut self, chain: CertificatePayload) {
        self.peer_certificates = chain;
    }

    pub(crate) fn extensions_mut(&mut self) -> &mut NegotiatedExtensions {
        &mut self.extensions
    }

    pub(crate) fn set_ticket(&mut self, ticket: SessionTicket) {
        self.ticket = Some(ticket);
    }

    /// A copy of this session carrying a new ticket, for when a server
    /// reissues one during a resumption.
    pub(crate) fn renewed(&self, ticket: SessionTicket, session_id: SessionId, now: UnixTime) -> Self {
        Self {
            session_id,
            version: self.version,
            suite: self.suite,
            master_secret: self.master_secret.clone(),
            peer_certificates: self.peer_certificates.clone(),
            extensions: self.extensions.clone(),
            ticket: Some(ticket),
            creation_time: now,
            not_resumable: AtomicBool::new(false),
        }
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("session_id", &self.session_id)
            .field("version", &self.version)
            .field("suite", &self.suite)
            .field("extensions", &self.extensions)
            .field("ticket", &self.ticket)
            .field("creation_time", &self.creation_time)
            .field("resumable", &self.is_resumable())
            .finish_non_exhaustive()
    }
}

const FLAG_CHANNEL_ID: u8 = 0x01;
const FLAG_CHANNEL_ID_NEW: u8 = 0x02;
const FLAG_EXTENDED_MS: u8 = 0x04;
const FLAG_NOT_RESUMABLE: u8 = 0x08;

fn encode_optional<P: Codec>(value: &Option<Vec<u8>>, wrap: fn(Vec<u8>) -> P, bytes: &mut Vec<u8>) {
    wrap(value.clone().unwrap_or_default()).encode(bytes);
}

fn non_empty(bytes: Vec<u8>) -> Option<Vec<u8>> {
    match bytes.is_empty() {
        true => None,
        false => Some(bytes),
    }
}

/// Persistence format.  Empty values stand for absent ones: none of the
/// optional fields can legitimately be empty.
impl Codec for Session {
    fn encode(&self, bytes: &mut Vec<u8>) {
        self.version.encode(bytes);
        self.suite.suite.encode(bytes);
        self.session_id.encode(bytes);
        bytes.extend_from_slice(self.master_secret.as_bytes());
        self.peer_certificates.encode(bytes);
        self.creation_time.as_secs().encode(bytes);

        let ext = &self.extensions;
        let mut flags = 0u8;
        if ext.channel_id_negotiated {
            flags |= FLAG_CHANNEL_ID;
        }
        if ext.channel_id_new {
            flags |= FLAG_CHANNEL_ID_NEW;
        }
        if ext.extended_ms {
            flags |= FLAG_EXTENDED_MS;
        }
        if !self.is_resumable() {
            flags |= FLAG_NOT_RESUMABLE;
        }
        flags.encode(bytes);

        encode_optional(&ext.alpn_protocol, PayloadU8::new, bytes);
        encode_optional(&ext.sct_list, PayloadU16::new, bytes);
        encode_optional(&ext.ocsp_response, PayloadU24::new, bytes);
        encode_optional(&ext.original_handshake_hash, PayloadU8::new, bytes);

        match &self.ticket {
            Some(t) => {
                t.lifetime_hint.encode(bytes);
                PayloadU16::encode_slice(&t.ticket, bytes);
            }
            None => {
                0u32.encode(bytes);
                PayloadU16::empty().encode(bytes);
            }
        }
    }

    fn read(r: &mut Reader) -> Result<Self, InvalidMessage> {
        let version = ProtocolVersion::read(r)?;
        let suite = suites::lookup_by_id(CipherSuite::read(r)?)
            .ok_or(InvalidMessage::UnknownCipherSuite)?;
        let session_id = SessionId::read(r)?;
        let master_secret = r
            .take(MASTER_SECRET_LEN)
            .and_then(MasterSecret::from_slice)
            .ok_or(InvalidMessage::MissingData("MasterSecret"))?;
        let peer_certificates = CertificatePayload::read(r)?;
        let creation_time = UnixTime::since_unix_epoch(Duration::from_secs(u64::read(r)?));
        let flags = u8::read(r)?;

        let extensions = NegotiatedExtensions {
            alpn_protocol: non_empty(PayloadU8::read(r)?.0),
            sct_list: non_empty(PayloadU16::read(r)?.0),
            ocsp_response: non_empty(PayloadU24::read(r)?.0),
            channel_id_negotiated: flags & FLAG_CHANNEL_ID != 0,
            channel_id_new: flags & FLAG_CHANNEL_ID_NEW != 0,
            extended_ms: flags & FLAG_EXTENDED_MS != 0,
            original_handshake_hash: non_empty(PayloadU8::read(r)?.0),
        };

        let lifetime_hint = u32::read(r)?;
        let ticket = non_empty(PayloadU16::read(r)?.0).map(|ticket| SessionTicket {
            lifetime_hint,
            ticket,
        });

        Ok(Self {
            session_id,
            version,
            suite,
            master_secret,
            peer_certificates,
            extensions,
            ticket,
            creation_time,
            not_resumable: AtomicBool::new(flags & FLAG_NOT_RESUMABLE != 0),
        })
    }
}

#[cfg(test)]
mod tests {
    use pki_types::CertificateDer;

    use super::*;
    use crate::suites::TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256;

    fn at(secs: u64) -> UnixTime {
        UnixTime::since_unix_epoch(Duration::from_secs(secs))
    }

    fn session() -> Session {
        let mut s = Session::new(
            SessionId::new(&[1, 2, 3, 4]).unwrap(),
            ProtocolVersion::TLSv1_2,
            &TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256,
            MasterSecret::new([0x42; 48]),
            at(1_000),
        );
        s.set_peer_certificates(vec![CertificateDer::from(vec![0x30, 0x03, 1, 2, 3])]);
        s
    }

    #[test]
    fn persisted_session_reads_back() {
        let mut original = session();
        {
            let ext = original.extensions_mut();
            ext.alpn_protocol = Some(b"h2".to_vec());
            ext.ocsp_response = Some(vec![9; 300]);
            ext.extended_ms = true;
            ext.channel_id_new = true;
        }
        original.set_ticket(SessionTicket {
            lifetime_hint: 7200,
            ticket: vec![5; 40],
        });

        let bytes = original.get_encoding();
        let back = Session::read_bytes(&bytes).unwrap();
        assert_eq!(back.id(), original.id());
        assert_eq!(back.suite(), original.suite());
        assert_eq!(back.master_secret(), original.master_secret());
        assert_eq!(back.peer_certificates(), original.peer_certificates());
        assert_eq!(back.extensions(), original.extensions());
        assert_eq!(back.ticket(), original.ticket());
        assert_eq!(back.creation_time(), original.creation_time());
        assert!(back.is_resumable());
    }

    #[test]
    fn unknown_suite_is_rejected() {
        let mut bytes = session().get_encoding();
        // suite id follows the version
        bytes[2] = 0x13;
        bytes[3] = 0x01;
        assert_eq!(
            Session::read_bytes(&bytes).err(),
            Some(InvalidMessage::UnknownCipherSuite)
        );
    }

    #[test]
    fn invalidation_is_sticky() {
        let s = session();
        assert!(s.is_resumable());
        s.mark_not_resumable();
        s.mark_not_resumable();
        assert!(!s.is_resumable());
        let back = Session::read_bytes(&s.get_encoding()).unwrap();
        assert!(!back.is_resumable());
    }

    #[test]
    fn expiry() {
        let s = session();
        let timeout = Duration::from_secs(300);
        assert!(!s.has_expired(at(1_300), timeout));
        assert!(s.has_expired(at(1_301), timeout));
        // clocks that go backwards do not expire anything
        assert!(!s.has_expired(at(10), timeout));
    }

    #[test]
    fn renewal_keeps_secret_and_replaces_ticket() {
        let s = session();
        s.mark_not_resumable();
        let t = SessionTicket {
            lifetime_hint: 1,
            ticket: vec![1],
        };
        let renewed = s.renewed(t.clone(), SessionId::empty(), at(5_000));
        assert_eq!(renewed.master_secret(), s.master_secret());
        assert_eq!(renewed.ticket(), Some(&t));
        assert!(renewed.is_resumable());
        assert_eq!(renewed.creation_time().as_secs(), 5_000);
    }
}
