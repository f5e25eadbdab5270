use std::collections;
use std::fmt;
use std::hash::{Hash, Hasher};

use pki_types::CertificateDer;

use crate::crypto::SecureRandom;
use crate::enums::{
    CipherSuite, HandshakeType, ProtocolVersion, SignatureAlgorithm, SignatureScheme,
};
use crate::error::InvalidMessage;
use crate::msgs::base::{Payload, PayloadU16, PayloadU24, PayloadU8};
use crate::msgs::codec::{self, Codec, ListLength, Reader, TlsListElement};
use crate::msgs::enums::{
    CertificateStatusType, ClientCertificateType, Compression, ECCurveType, ECPointFormat,
    ExtensionType, NamedGroup, ServerNameType,
};
use crate::rand;
use crate::verify::DigitallySignedStruct;

/// Create a newtype wrapper around a given type.
///
/// This is used to create newtypes for the various TLS message types which is used to wrap
/// the `PayloadU8`, `PayloadU16` or `PayloadU24` types. This is typically used for types
/// where we don't need anything other than access to the underlying bytes.
macro_rules! wrapped_payload(
  ($(#[$comment:meta])* $name:ident, $inner:ident,) => {
    $(#[$comment])*
    #[derive(Clone, Debug, PartialEq, Eq)]
    pub struct $name($inner);

    impl From<Vec<u8>> for $name {
        fn from(v: Vec<u8>) -> Self {
            Self($inner::new(v))
        }
    }

    impl AsRef<[u8]> for $name {
        fn as_ref(&self) -> &[u8] {
            self.0.0.as_slice()
        }
    }

    impl Codec for $name {
        fn encode(&self, bytes: &mut Vec<u8>) {
            self.0.encode(bytes);
        }

        fn read(r: &mut Reader) -> Result<Self, InvalidMessage> {
            Ok(Self($inner::read(r)?))
        }
    }
  }
);

#[derive(Clone, Copy, Eq, PartialEq)]
pub struct Random(pub [u8; 32]);

impl fmt::Debug for Random {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        super::base::hex(f, &self.0)
    }
}

impl Codec for Random {
    fn encode(&self, bytes: &mut Vec<u8>) {
        bytes.extend_from_slice(&self.0);
    }

    fn read(r: &mut Reader) -> Result<Self, InvalidMessage> {
        let bytes = match r.take(32) {
            Some(bytes) => bytes,
            None => return Err(InvalidMessage::MissingData("Random")),
        };

        let mut opaque = [0; 32];
        opaque.clone_from_slice(bytes);
        Ok(Self(opaque))
    }
}

impl Random {
    pub fn new(secure_random: &dyn SecureRandom) -> Result<Self, rand::GetRandomFailed> {
        Ok(Self(rand::random_array(secure_random)?))
    }
}

impl From<[u8; 32]> for Random {
    #[inline]
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

#[derive(Copy, Clone)]
pub struct SessionId {
    len: usize,
    data: [u8; 32],
}

impl fmt::Debug for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        super::base::hex(f, &self.data[..self.len])
    }
}

impl PartialEq for SessionId {
    fn eq(&self, other: &Self) -> bool {
        if self.len != other.len {
            return false;
        }

        let mut diff = 0u8;
        for i in 0..self.len {
            diff |= self.data[i] ^ other.data[i];
        }

        diff == 0u8
    }
}

impl Eq for SessionId {}

impl Hash for SessionId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_ref().hash(state);
    }
}

impl Codec for SessionId {
    fn encode(&self, bytes: &mut Vec<u8>) {
        debug_assert!(self.len <= 32);
        bytes.push(self.len as u8);
        bytes.extend_from_slice(&self.data[..self.len]);
    }

    fn read(r: &mut Reader) -> Result<Self, InvalidMessage> {
        let len = u8::read(r)? as usize;
        if len > 32 {
            return Err(InvalidMessage::SessionIdTooLong);
        }

        let bytes = match r.take(len) {
            Some(bytes) => bytes,
            None => return Err(InvalidMessage::MissingData("SessionID")),
        };

        let mut out = [0u8; 32];
        out[..len].clone_from_slice(&bytes[..len]);
        Ok(Self { data: out, len })
    }
}

impl SessionId {
    pub fn random(secure_random: &dyn SecureRandom) -> Result<Self, rand::GetRandomFailed> {
        Ok(Self {
            data: rand::random_array(secure_random)?,
            len: 32,
        })
    }

    pub fn empty() -> Self {
        Self {
            data: [0u8; 32],
            len: 0,
        }
    }

    /// Make a session id from `bytes`, which must be at most 32 bytes.
    pub fn new(bytes: &[u8]) -> Option<Self> {
        if bytes.len() > 32 {
            return None;
        }
        let mut data = [0u8; 32];
        data[..bytes.len()].copy_from_slice(bytes);
        Some(Self {
            data,
            len: bytes.len(),
        })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl AsRef<[u8]> for SessionId {
    fn as_ref(&self) -> &[u8] {
        &self.data[..self.len]
    }
}

#[derive(Clone, Debug)]
pub struct UnknownExtension {
    pub typ: ExtensionType,
    pub payload: Payload,
}

impl UnknownExtension {
    fn encode(&self, bytes: &mut Vec<u8>) {
        self.payload.encode(bytes);
    }

    fn read(typ: ExtensionType, r: &mut Reader) -> Self {
        let payload = Payload::read(r);
        Self { typ, payload }
    }
}

impl TlsListElement for CipherSuite {
    const SIZE_LEN: ListLength = ListLength::U16;
}

impl TlsListElement for Compression {
    const SIZE_LEN: ListLength = ListLength::U8;
}

impl TlsListElement for ECPointFormat {
    const SIZE_LEN: ListLength = ListLength::U8;
}

impl TlsListElement for NamedGroup {
    const SIZE_LEN: ListLength = ListLength::U16;
}

impl TlsListElement for SignatureScheme {
    const SIZE_LEN: ListLength = ListLength::U16;
}

impl TlsListElement for ClientCertificateType {
    const SIZE_LEN: ListLength = ListLength::U8;
}

/// One entry of a `server_name` extension.  Only `host_name` entries are
/// ever produced; other types are carried opaquely.
#[derive(Clone, Debug)]
pub struct ServerName {
    pub typ: ServerNameType,
    pub name: PayloadU16,
}

impl ServerName {
    pub fn host_name(host: &str) -> Self {
        Self {
            typ: ServerNameType::HostName,
            name: PayloadU16::new(host.as_bytes().to_vec()),
        }
    }
}

impl Codec for ServerName {
    fn encode(&self, bytes: &mut Vec<u8>) {
        self.typ.encode(bytes);
        self.name.encode(bytes);
    }

    fn read(r: &mut Reader) -> Result<Self, InvalidMessage> {
        Ok(Self {
            typ: ServerNameType::read(r)?,
            name: PayloadU16::read(r)?,
        })
    }
}

impl TlsListElement for ServerName {
    const SIZE_LEN: ListLength = ListLength::U16;
}

wrapped_payload!(ProtocolName, PayloadU8,);

impl TlsListElement for ProtocolName {
    const SIZE_LEN: ListLength = ListLength::U16;
}

pub trait ConvertProtocolNameList {
    fn from_slices(names: &[Vec<u8>]) -> Self;
    fn as_single_slice(&self) -> Option<&[u8]>;
}

impl ConvertProtocolNameList for Vec<ProtocolName> {
    fn from_slices(names: &[Vec<u8>]) -> Self {
        names
            .iter()
            .map(|name| ProtocolName::from(name.clone()))
            .collect()
    }

    fn as_single_slice(&self) -> Option<&[u8]> {
        match self.as_slice() {
            [single] => Some(single.as_ref()),
            _ => None,
        }
    }
}

/// The NPN list in a ServerHello is a bare sequence of u8-prefixed
/// names running to the end of the extension.
fn read_npn_protocols(r: &mut Reader) -> Result<Vec<ProtocolName>, InvalidMessage> {
    let mut ret = Vec::new();
    while r.any_left() {
        let proto = ProtocolName::read(r)?;
        if proto.as_ref().is_empty() {
            return Err(InvalidMessage::IllegalEmptyValue);
        }
        ret.push(proto);
    }
    Ok(ret)
}

fn encode_npn_protocols(protos: &[ProtocolName], bytes: &mut Vec<u8>) {
    for proto in protos {
        proto.encode(bytes);
    }
}

#[derive(Clone, Debug)]
pub enum ClientSessionTicket {
    Request,
    Offer(Payload),
}

#[derive(Clone, Debug)]
pub enum ClientExtension {
    EcPointFormats(Vec<ECPointFormat>),
    NamedGroups(Vec<NamedGroup>),
    SignatureAlgorithms(Vec<SignatureScheme>),
    ServerName(Vec<ServerName>),
    SessionTicket(ClientSessionTicket),
    Protocols(Vec<ProtocolName>),
    CertificateStatusRequest,
    NextProtocolNegotiation,
    SignedCertificateTimestampRequest,
    ChannelIdRequest,
    ChannelIdNewRequest,
    ExtendedMasterSecretRequest,
    RenegotiationInfo(PayloadU8),
    Unknown(UnknownExtension),
}

impl ClientExtension {
    pub fn ext_type(&self) -> ExtensionType {
        match *self {
            Self::EcPointFormats(_) => ExtensionType::ECPointFormats,
            Self::NamedGroups(_) => ExtensionType::EllipticCurves,
            Self::SignatureAlgorithms(_) => ExtensionType::SignatureAlgorithms,
            Self::ServerName(_) => ExtensionType::ServerName,
            Self::SessionTicket(_) => ExtensionType::SessionTicket,
            Self::Protocols(_) => ExtensionType::ALProtocolNegotiation,
            Self::CertificateStatusRequest => ExtensionType::StatusRequest,
            Self::NextProtocolNegotiation => ExtensionType::NextProtocolNegotiation,
            Self::SignedCertificateTimestampRequest => ExtensionType::SCT,
            Self::ChannelIdRequest => ExtensionType::ChannelId,
            Self::ChannelIdNewRequest => ExtensionType::ChannelIdNew,
            Self::ExtendedMasterSecretRequest => ExtensionType::ExtendedMasterSecret,
            Self::RenegotiationInfo(_) => ExtensionType::RenegotiationInfo,
            Self::Unknown(ref r) => r.typ,
        }
    }

    /// Make a `server_name` extension naming `host`.
    pub fn make_sni(host: &str) -> Self {
        Self::ServerName(vec![ServerName::host_name(host)])
    }
}

impl Codec for ClientExtension {
    fn encode(&self, bytes: &mut Vec<u8>) {
        self.ext_type().encode(bytes);

        let nested = codec::LengthPrefixedBuffer::new(ListLength::U16, bytes);
        match *self {
            Self::EcPointFormats(ref r) => r.encode(nested.buf),
            Self::NamedGroups(ref r) => r.encode(nested.buf),
            Self::SignatureAlgorithms(ref r) => r.encode(nested.buf),
            Self::ServerName(ref r) => r.encode(nested.buf),
            Self::SessionTicket(ClientSessionTicket::Request)
            | Self::NextProtocolNegotiation
            | Self::SignedCertificateTimestampRequest
            | Self::ChannelIdRequest
            | Self::ChannelIdNewRequest
            | Self::ExtendedMasterSecretRequest => {}
            Self::SessionTicket(ClientSessionTicket::Offer(ref r)) => r.encode(nested.buf),
            Self::Protocols(ref r) => r.encode(nested.buf),
            Self::CertificateStatusRequest => {
                // OCSP, with empty responder_id_list and request_extensions
                CertificateStatusType::OCSP.encode(nested.buf);
                0u16.encode(nested.buf);
                0u16.encode(nested.buf);
            }
            Self::RenegotiationInfo(ref r) => r.encode(nested.buf),
            Self::Unknown(ref r) => r.encode(nested.buf),
        }
    }

    fn read(r: &mut Reader) -> Result<Self, InvalidMessage> {
        let typ = ExtensionType::read(r)?;
        let len = u16::read(r)? as usize;
        let mut sub = r.sub(len)?;

        let ext = match typ {
            ExtensionType::ECPointFormats => Self::EcPointFormats(Vec::read(&mut sub)?),
            ExtensionType::EllipticCurves => Self::NamedGroups(Vec::read(&mut sub)?),
            ExtensionType::SignatureAlgorithms => Self::SignatureAlgorithms(Vec::read(&mut sub)?),
            ExtensionType::ServerName => Self::ServerName(Vec::read(&mut sub)?),
            ExtensionType::SessionTicket => {
                if sub.any_left() {
                    Self::SessionTicket(ClientSessionTicket::Offer(Payload::read(&mut sub)))
                } else {
                    Self::SessionTicket(ClientSessionTicket::Request)
                }
            }
            ExtensionType::ALProtocolNegotiation => Self::Protocols(Vec::read(&mut sub)?),
            ExtensionType::StatusRequest => {
                let typ = CertificateStatusType::read(&mut sub)?;
                if typ != CertificateStatusType::OCSP {
                    return Err(InvalidMessage::InvalidCertificateStatusType);
                }
                PayloadU16::read(&mut sub)?;
                PayloadU16::read(&mut sub)?;
                Self::CertificateStatusRequest
            }
            ExtensionType::NextProtocolNegotiation => Self::NextProtocolNegotiation,
            ExtensionType::SCT => Self::SignedCertificateTimestampRequest,
            ExtensionType::ChannelId => Self::ChannelIdRequest,
            ExtensionType::ChannelIdNew => Self::ChannelIdNewRequest,
            ExtensionType::ExtendedMasterSecret => Self::ExtendedMasterSecretRequest,
            ExtensionType::RenegotiationInfo => Self::RenegotiationInfo(PayloadU8::read(&mut sub)?),
            _ => Self::Unknown(UnknownExtension::read(typ, &mut sub)),
        };

        sub.expect_empty("ClientExtension")
            .map(|_| ext)
    }
}

impl TlsListElement for ClientExtension {
    const SIZE_LEN: ListLength = ListLength::U16;
}

#[derive(Clone, Debug)]
pub enum ServerExtension {
    EcPointFormats(Vec<ECPointFormat>),
    ServerNameAck,
    SessionTicketAck,
    CertificateStatusAck,
    RenegotiationInfo(PayloadU8),
    Protocols(Vec<ProtocolName>),
    NextProtocols(Vec<ProtocolName>),
    /// The raw `SignedCertificateTimestampList`, kept whole.
    SignedCertificateTimestamp(Payload),
    ExtendedMasterSecretAck,
    ChannelIdAck,
    ChannelIdNewAck,
    Unknown(UnknownExtension),
}

impl ServerExtension {
    pub fn ext_type(&self) -> ExtensionType {
        match *self {
            Self::EcPointFormats(_) => ExtensionType::ECPointFormats,
            Self::ServerNameAck => ExtensionType::ServerName,
            Self::SessionTicketAck => ExtensionType::SessionTicket,
            Self::CertificateStatusAck => ExtensionType::StatusRequest,
            Self::RenegotiationInfo(_) => ExtensionType::RenegotiationInfo,
            Self::Protocols(_) => ExtensionType::ALProtocolNegotiation,
            Self::NextProtocols(_) => ExtensionType::NextProtocolNegotiation,
            Self::SignedCertificateTimestamp(_) => ExtensionType::SCT,
            Self::ExtendedMasterSecretAck => ExtensionType::ExtendedMasterSecret,
            Self::ChannelIdAck => ExtensionType::ChannelId,
            Self::ChannelIdNewAck => ExtensionType::ChannelIdNew,
            Self::Unknown(ref r) => r.typ,
        }
    }

    pub fn make_alpn(proto: &[u8]) -> Self {
        Self::Protocols(vec![ProtocolName::from(proto.to_vec())])
    }

    pub fn make_empty_renegotiation_info() -> Self {
        Self::RenegotiationInfo(PayloadU8::empty())
    }
}

impl Codec for ServerExtension {
    fn encode(&self, bytes: &mut Vec<u8>) {
        self.ext_type().encode(bytes);

        let nested = codec::LengthPrefixedBuffer::new(ListLength::U16, bytes);
        match *self {
            Self::EcPointFormats(ref r) => r.encode(nested.buf),
            Self::ServerNameAck
            | Self::SessionTicketAck
            | Self::CertificateStatusAck
            | Self::ExtendedMasterSecretAck
            | Self::ChannelIdAck
            | Self::ChannelIdNewAck => {}
            Self::RenegotiationInfo(ref r) => r.encode(nested.buf),
            Self::Protocols(ref r) => r.encode(nested.buf),
            Self::NextProtocols(ref r) => encode_npn_protocols(r, nested.buf),
            Self::SignedCertificateTimestamp(ref r) => r.encode(nested.buf),
            Self::Unknown(ref r) => r.encode(nested.buf),
        }
    }

    fn read(r: &mut Reader) -> Result<Self, InvalidMessage> {
        let typ = ExtensionType::read(r)?;
        let len = u16::read(r)? as usize;
        let mut sub = r.sub(len)?;

        // acknowledgements carry no body: anything left over is a
        // decode error via `expect_empty` below.
        let ext = match typ {
            ExtensionType::ECPointFormats => Self::EcPointFormats(Vec::read(&mut sub)?),
            ExtensionType::ServerName => Self::ServerNameAck,
            ExtensionType::SessionTicket => Self::SessionTicketAck,
            ExtensionType::StatusRequest => Self::CertificateStatusAck,
            ExtensionType::RenegotiationInfo => Self::RenegotiationInfo(PayloadU8::read(&mut sub)?),
            ExtensionType::ALProtocolNegotiation => Self::Protocols(Vec::read(&mut sub)?),
            ExtensionType::NextProtocolNegotiation => {
                Self::NextProtocols(read_npn_protocols(&mut sub)?)
            }
            ExtensionType::SCT => {
                let list = Payload::read(&mut sub);
                if list.0.is_empty() {
                    return Err(InvalidMessage::IllegalEmptyValue);
                }
                Self::SignedCertificateTimestamp(list)
            }
            ExtensionType::ExtendedMasterSecret => Self::ExtendedMasterSecretAck,
            ExtensionType::ChannelId => Self::ChannelIdAck,
            ExtensionType::ChannelIdNew => Self::ChannelIdNewAck,
            _ => Self::Unknown(UnknownExtension::read(typ, &mut sub)),
        };

        sub.expect_empty("ServerExtension")
            .map(|_| ext)
    }
}

impl TlsListElement for ServerExtension {
    const SIZE_LEN: ListLength = ListLength::U16;
}

#[derive(Clone, Debug)]
pub struct ClientHelloPayload {
    pub client_version: ProtocolVersion,
    pub random: Random,
    pub session_id: SessionId,
    pub cipher_suites: Vec<CipherSuite>,
    pub compression_methods: Vec<Compression>,
    pub extensions: Vec<ClientExtension>,
}

impl Codec for ClientHelloPayload {
    fn encode(&self, bytes: &mut Vec<u8>) {
        self.client_version.encode(bytes);
        self.random.encode(bytes);
        self.session_id.encode(bytes);
        self.cipher_suites.encode(bytes);
        self.compression_methods.encode(bytes);

        if !self.extensions.is_empty() {
            self.extensions.encode(bytes);
        }
    }

    fn read(r: &mut Reader) -> Result<Self, InvalidMessage> {
        let mut ret = Self {
            client_version: ProtocolVersion::read(r)?,
            random: Random::read(r)?,
            session_id: SessionId::read(r)?,
            cipher_suites: Vec::read(r)?,
            compression_methods: Vec::read(r)?,
            extensions: Vec::new(),
        };

        if r.any_left() {
            ret.extensions = Vec::read(r)?;
        }

        r.expect_empty("ClientHelloPayload")
            .map(|_| ret)
    }
}

impl ClientHelloPayload {
    pub fn find_extension(&self, ext: ExtensionType) -> Option<&ClientExtension> {
        self.extensions
            .iter()
            .find(|x| x.ext_type() == ext)
    }

    pub fn renegotiation_info(&self) -> Option<&[u8]> {
        match self.find_extension(ExtensionType::RenegotiationInfo)? {
            ClientExtension::RenegotiationInfo(ri) => Some(&ri.0),
            _ => None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct ServerHelloPayload {
    pub server_version: ProtocolVersion,
    pub random: Random,
    pub session_id: SessionId,
    pub cipher_suite: CipherSuite,
    pub compression_method: Compression,
    pub extensions: Vec<ServerExtension>,
}

impl Codec for ServerHelloPayload {
    fn encode(&self, bytes: &mut Vec<u8>) {
        self.server_version.encode(bytes);
        self.random.encode(bytes);
        self.session_id.encode(bytes);
        self.cipher_suite.encode(bytes);
        self.compression_method.encode(bytes);

        if !self.extensions.is_empty() {
            self.extensions.encode(bytes);
        }
    }

    fn read(r: &mut Reader) -> Result<Self, InvalidMessage> {
        let server_version = ProtocolVersion::read(r)?;
        let random = Random::read(r)?;
        let session_id = SessionId::read(r)?;
        let suite = CipherSuite::read(r)?;
        let compression = Compression::read(r)?;

        // RFC5246:
        // "The presence of extensions can be detected by determining whether
        //  there are bytes following the compression_method field at the end of
        //  the ServerHello."
        let extensions = if r.any_left() { Vec::read(r)? } else { vec![] };

        let ret = Self {
            server_version,
            random,
            session_id,
            cipher_suite: suite,
            compression_method: compression,
            extensions,
        };

        r.expect_empty("ServerHelloPayload")
            .map(|_| ret)
    }
}

impl ServerHelloPayload {
    /// Returns true if there is more than one extension of a given
    /// type.
    pub fn has_duplicate_extension(&self) -> bool {
        let mut seen = collections::HashSet::new();

        for ext in &self.extensions {
            if !seen.insert(u16::from(ext.ext_type())) {
                return true;
            }
        }

        false
    }

    pub fn find_extension(&self, ext: ExtensionType) -> Option<&ServerExtension> {
        self.extensions
            .iter()
            .find(|x| x.ext_type() == ext)
    }
}

impl TlsListElement for CertificateDer<'static> {
    const SIZE_LEN: ListLength = ListLength::U24 {
        max: CERTIFICATE_MAX_SIZE_LIMIT,
    };
}

/// TLS has a 16MB size limit on any handshake message,
/// plus a 16MB limit on any given certificate.
///
/// We contract that to 64KB to limit the amount of memory allocation
/// that is directly controllable by the peer.
pub(crate) const CERTIFICATE_MAX_SIZE_LIMIT: usize = 0x1_0000;

/// The chain, end-entity first.  Certificates are opaque DER here.
pub type CertificatePayload = Vec<CertificateDer<'static>>;

/// How a cipher suite establishes its pre-master secret.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyExchangeAlgorithm {
    /// Client encrypts a random pre-master secret to the server's RSA key.
    Rsa,
    /// Signed ephemeral finite-field Diffie-Hellman.
    Dhe,
    /// Signed ephemeral elliptic-curve Diffie-Hellman.
    Ecdhe,
    /// Pre-shared key only.
    Psk,
    /// ECDHE combined with a pre-shared key.
    EcdhePsk,
    /// Unauthenticated finite-field Diffie-Hellman.
    DhAnon,
    /// Unauthenticated elliptic-curve Diffie-Hellman.
    EcdhAnon,
}

impl KeyExchangeAlgorithm {
    /// Whether the server's ServerKeyExchange starts with a PSK identity hint.
    pub fn uses_psk(self) -> bool {
        matches!(self, Self::Psk | Self::EcdhePsk)
    }

    /// Whether a ServerKeyExchange is mandatory for this method.
    pub fn requires_server_kx(self) -> bool {
        !matches!(self, Self::Rsa | Self::Psk)
    }
}

#[derive(Clone, Debug)]
pub struct ECParameters {
    pub curve_type: ECCurveType,
    pub named_group: NamedGroup,
}

impl Codec for ECParameters {
    fn encode(&self, bytes: &mut Vec<u8>) {
        self.curve_type.encode(bytes);
        self.named_group.encode(bytes);
    }

    fn read(r: &mut Reader) -> Result<Self, InvalidMessage> {
        let ct = ECCurveType::read(r)?;
        if ct != ECCurveType::NamedCurve {
            return Err(InvalidMessage::UnsupportedCurveType);
        }

        let grp = NamedGroup::read(r)?;

        Ok(Self {
            curve_type: ct,
            named_group: grp,
        })
    }
}

#[derive(Clone, Debug)]
pub struct ServerEcdhParams {
    pub curve_params: ECParameters,
    pub public: PayloadU8,
}

impl ServerEcdhParams {
    pub fn new(named_group: NamedGroup, pubkey: &[u8]) -> Self {
        Self {
            curve_params: ECParameters {
                curve_type: ECCurveType::NamedCurve,
                named_group,
            },
            public: PayloadU8::new(pubkey.to_vec()),
        }
    }
}

impl Codec for ServerEcdhParams {
    fn encode(&self, bytes: &mut Vec<u8>) {
        self.curve_params.encode(bytes);
        self.public.encode(bytes);
    }

    fn read(r: &mut Reader) -> Result<Self, InvalidMessage> {
        let cp = ECParameters::read(r)?;
        let pb = PayloadU8::read(r)?;
        if pb.0.is_empty() {
            return Err(InvalidMessage::IllegalEmptyValue);
        }

        Ok(Self {
            curve_params: cp,
            public: pb,
        })
    }
}

#[derive(Clone, Debug)]
#[allow(non_snake_case)]
pub struct ServerDhParams {
    pub dh_p: PayloadU16,
    pub dh_g: PayloadU16,
    pub dh_Ys: PayloadU16,
}

impl Codec for ServerDhParams {
    fn encode(&self, bytes: &mut Vec<u8>) {
        self.dh_p.encode(bytes);
        self.dh_g.encode(bytes);
        self.dh_Ys.encode(bytes);
    }

    fn read(r: &mut Reader) -> Result<Self, InvalidMessage> {
        let read_nonempty = |r: &mut Reader| -> Result<PayloadU16, InvalidMessage> {
            let value = PayloadU16::read(r)?;
            match value.0.is_empty() {
                true => Err(InvalidMessage::EmptyDhParameter),
                false => Ok(value),
            }
        };

        Ok(Self {
            dh_p: read_nonempty(r)?,
            dh_g: read_nonempty(r)?,
            dh_Ys: read_nonempty(r)?,
        })
    }
}

#[derive(Clone, Debug)]
pub enum ServerKeyExchangeParams {
    Dh(ServerDhParams),
    Ecdh(ServerEcdhParams),
    /// Plain PSK: only the identity hint is present.
    None,
}

/// A ServerKeyExchange parsed according to a negotiated cipher suite.
#[derive(Clone, Debug)]
pub struct ServerKeyExchange {
    pub psk_identity_hint: Option<PayloadU16>,
    pub params: ServerKeyExchangeParams,
    /// Exactly the bytes covered by the server's signature.
    pub params_encoding: Vec<u8>,
    pub dss: Option<DigitallySignedStruct>,
}

/// A ServerKeyExchange body, which can only be interpreted once the
/// cipher suite is known.
#[derive(Clone, Debug)]
pub struct ServerKeyExchangePayload(pub Payload);

impl Codec for ServerKeyExchangePayload {
    fn encode(&self, bytes: &mut Vec<u8>) {
        self.0.encode(bytes);
    }

    fn read(r: &mut Reader) -> Result<Self, InvalidMessage> {
        Ok(Self(Payload::read(r)))
    }
}

impl ServerKeyExchangePayload {
    /// Parse the body for key exchange `kxa`.
    ///
    /// `signed_by` is the suite's authentication algorithm, or `None` for
    /// anonymous and PSK suites whose parameters are unsigned.  Before
    /// TLS 1.2 the signature carries no algorithm identifier; the implied
    /// legacy scheme is filled in.
    pub fn unwrap_given_kxa(
        &self,
        kxa: KeyExchangeAlgorithm,
        signed_by: Option<SignatureAlgorithm>,
        version: ProtocolVersion,
    ) -> Result<ServerKeyExchange, InvalidMessage> {
        let body = &self.0 .0;
        let mut rd = Reader::init(body);

        let psk_identity_hint = match kxa.uses_psk() {
            true => Some(PayloadU16::read(&mut rd)?),
            false => None,
        };

        let params = match kxa {
            KeyExchangeAlgorithm::Dhe | KeyExchangeAlgorithm::DhAnon => {
                ServerKeyExchangeParams::Dh(ServerDhParams::read(&mut rd)?)
            }
            KeyExchangeAlgorithm::Ecdhe
            | KeyExchangeAlgorithm::EcdhePsk
            | KeyExchangeAlgorithm::EcdhAnon => {
                ServerKeyExchangeParams::Ecdh(ServerEcdhParams::read(&mut rd)?)
            }
            KeyExchangeAlgorithm::Psk => ServerKeyExchangeParams::None,
            KeyExchangeAlgorithm::Rsa => {
                return Err(InvalidMessage::UnexpectedMessage("ServerKeyExchange"))
            }
        };

        let params_encoding = body[..rd.used()].to_vec();

        let dss = match signed_by {
            Some(_) if version >= ProtocolVersion::TLSv1_2 => {
                Some(DigitallySignedStruct::read(&mut rd)?)
            }
            Some(SignatureAlgorithm::ECDSA) => Some(DigitallySignedStruct::new(
                SignatureScheme::ECDSA_SHA1_Legacy,
                PayloadU16::read(&mut rd)?.0,
            )),
            Some(_) => Some(DigitallySignedStruct::new(
                SignatureScheme::RSA_PKCS1_MD5_SHA1,
                PayloadU16::read(&mut rd)?.0,
            )),
            None => None,
        };

        rd.expect_empty("ServerKeyExchange")?;

        Ok(ServerKeyExchange {
            psk_identity_hint,
            params,
            params_encoding,
            dss,
        })
    }
}

wrapped_payload!(
    /// A DER-encoded X.500 distinguished name from a CertificateRequest.
    DistinguishedName,
    PayloadU16,
);

impl TlsListElement for DistinguishedName {
    const SIZE_LEN: ListLength = ListLength::U16;
}

#[derive(Clone, Debug)]
pub struct CertificateRequestPayload {
    pub certtypes: Vec<ClientCertificateType>,
    /// Empty before TLS 1.2.
    pub sigschemes: Vec<SignatureScheme>,
    pub canames: Vec<DistinguishedName>,
}

impl CertificateRequestPayload {
    fn encode(&self, bytes: &mut Vec<u8>, vers: ProtocolVersion) {
        self.certtypes.encode(bytes);
        if vers >= ProtocolVersion::TLSv1_2 {
            self.sigschemes.encode(bytes);
        }
        self.canames.encode(bytes);
    }

    fn read_version(r: &mut Reader, vers: ProtocolVersion) -> Result<Self, InvalidMessage> {
        let certtypes = Vec::read(r)?;
        let sigschemes = match vers >= ProtocolVersion::TLSv1_2 {
            true => Vec::read(r)?,
            false => Vec::new(),
        };
        let canames = Vec::read(r)?;

        Ok(Self {
            certtypes,
            sigschemes,
            canames,
        })
    }
}

#[derive(Clone, Debug)]
pub struct NewSessionTicketPayload {
    pub lifetime_hint: u32,
    pub ticket: PayloadU16,
}

impl NewSessionTicketPayload {
    pub fn new(lifetime_hint: u32, ticket: Vec<u8>) -> Self {
        Self {
            lifetime_hint,
            ticket: PayloadU16::new(ticket),
        }
    }
}

impl Codec for NewSessionTicketPayload {
    fn encode(&self, bytes: &mut Vec<u8>) {
        self.lifetime_hint.encode(bytes);
        self.ticket.encode(bytes);
    }

    fn read(r: &mut Reader) -> Result<Self, InvalidMessage> {
        let lifetime = u32::read(r)?;
        let ticket = PayloadU16::read(r)?;

        Ok(Self {
            lifetime_hint: lifetime,
            ticket,
        })
    }
}

/// A stapled OCSP response.
#[derive(Clone, Debug)]
pub struct CertificateStatus {
    pub ocsp_response: PayloadU24,
}

impl Codec for CertificateStatus {
    fn encode(&self, bytes: &mut Vec<u8>) {
        CertificateStatusType::OCSP.encode(bytes);
        self.ocsp_response.encode(bytes);
    }

    fn read(r: &mut Reader) -> Result<Self, InvalidMessage> {
        let typ = CertificateStatusType::read(r)?;

        match typ {
            CertificateStatusType::OCSP => {
                let ocsp_response = PayloadU24::read(r)?;
                if ocsp_response.0.is_empty() {
                    return Err(InvalidMessage::EmptyCertificateStatus);
                }
                Ok(Self { ocsp_response })
            }
            _ => Err(InvalidMessage::InvalidCertificateStatusType),
        }
    }
}

impl CertificateStatus {
    pub fn new(ocsp: Vec<u8>) -> Self {
        Self {
            ocsp_response: PayloadU24::new(ocsp),
        }
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.ocsp_response.0
    }
}

/// The NextProtocol message, padded so that its length does not reveal
/// the chosen protocol.
#[derive(Clone, Debug)]
pub struct NextProtocolPayload {
    pub protocol: PayloadU8,
    pub padding: PayloadU8,
}

impl NextProtocolPayload {
    pub fn new(protocol: Vec<u8>) -> Self {
        let padding_len = 32 - ((protocol.len() + 2) % 32);
        Self {
            protocol: PayloadU8::new(protocol),
            padding: PayloadU8::new(vec![0u8; padding_len]),
        }
    }
}

impl Codec for NextProtocolPayload {
    fn encode(&self, bytes: &mut Vec<u8>) {
        self.protocol.encode(bytes);
        self.padding.encode(bytes);
    }

    fn read(r: &mut Reader) -> Result<Self, InvalidMessage> {
        Ok(Self {
            protocol: PayloadU8::read(r)?,
            padding: PayloadU8::read(r)?,
        })
    }
}

/// Length of the Channel ID extension body: the P-256 public key's
/// affine coordinates followed by the signature's r and s.
pub const CHANNEL_ID_BODY_LEN: usize = 128;

/// The Channel ID proof, carried in an EncryptedExtensions message.
#[derive(Clone, Debug)]
pub struct ChannelIdPayload {
    /// `ChannelId` or `ChannelIdNew`, echoing what was negotiated.
    pub typ: ExtensionType,
    pub body: PayloadU16,
}

impl Codec for ChannelIdPayload {
    fn encode(&self, bytes: &mut Vec<u8>) {
        self.typ.encode(bytes);
        self.body.encode(bytes);
    }

    fn read(r: &mut Reader) -> Result<Self, InvalidMessage> {
        let typ = ExtensionType::read(r)?;
        let body = PayloadU16::read(r)?;
        if body.0.len() != CHANNEL_ID_BODY_LEN {
            return Err(InvalidMessage::MissingData("ChannelIdPayload"));
        }
        Ok(Self { typ, body })
    }
}

#[derive(Clone, Debug)]
pub enum HandshakePayload {
    HelloRequest,
    ClientHello(ClientHelloPayload),
    ServerHello(ServerHelloPayload),
    Certificate(CertificatePayload),
    ServerKeyExchange(ServerKeyExchangePayload),
    CertificateRequest(CertificateRequestPayload),
    CertificateVerify(DigitallySignedStruct),
    /// A pre-TLS 1.2 CertificateVerify: a bare signature.
    CertificateVerifyLegacy(PayloadU16),
    ServerHelloDone,
    ClientKeyExchange(Payload),
    NewSessionTicket(NewSessionTicketPayload),
    Finished(Payload),
    CertificateStatus(CertificateStatus),
    NextProtocol(NextProtocolPayload),
    ChannelId(ChannelIdPayload),
    Unknown(Payload),
}

impl HandshakePayload {
    fn encode(&self, bytes: &mut Vec<u8>) {
        use self::HandshakePayload::*;
        match *self {
            HelloRequest | ServerHelloDone => {}
            ClientHello(ref x) => x.encode(bytes),
            ServerHello(ref x) => x.encode(bytes),
            Certificate(ref x) => x.encode(bytes),
            ServerKeyExchange(ref x) => x.encode(bytes),
            ClientKeyExchange(ref x) => x.encode(bytes),
            CertificateRequest(ref x) => {
                // a TLS 1.2 request always names at least one scheme
                let vers = match x.sigschemes.is_empty() {
                    true => ProtocolVersion::TLSv1_0,
                    false => ProtocolVersion::TLSv1_2,
                };
                x.encode(bytes, vers)
            }
            CertificateVerify(ref x) => x.encode(bytes),
            CertificateVerifyLegacy(ref x) => x.encode(bytes),
            NewSessionTicket(ref x) => x.encode(bytes),
            Finished(ref x) => x.encode(bytes),
            CertificateStatus(ref x) => x.encode(bytes),
            NextProtocol(ref x) => x.encode(bytes),
            ChannelId(ref x) => x.encode(bytes),
            Unknown(ref x) => x.encode(bytes),
        }
    }
}

#[derive(Clone, Debug)]
pub struct HandshakeMessagePayload {
    pub typ: HandshakeType,
    pub payload: HandshakePayload,
}

impl Codec for HandshakeMessagePayload {
    fn encode(&self, bytes: &mut Vec<u8>) {
        // encode payload to learn length
        let mut sub: Vec<u8> = Vec::new();
        self.payload.encode(&mut sub);

        // output type, length, and encoded payload
        self.typ.encode(bytes);
        codec::u24(sub.len() as u32).encode(bytes);
        bytes.append(&mut sub);
    }

    fn read(r: &mut Reader) -> Result<Self, InvalidMessage> {
        Self::read_version(r, ProtocolVersion::TLSv1_2)
    }
}

impl HandshakeMessagePayload {
    /// Parse one handshake message.  The bodies of CertificateRequest
    /// and CertificateVerify depend on the negotiated version `vers`.
    pub fn read_version(r: &mut Reader, vers: ProtocolVersion) -> Result<Self, InvalidMessage> {
        let typ = HandshakeType::read(r)?;
        let len = codec::u24::read(r)?.0 as usize;
        let mut sub = r.sub(len)?;

        let payload = match typ {
            HandshakeType::HelloRequest => {
                sub.expect_empty("HelloRequest")?;
                HandshakePayload::HelloRequest
            }
            HandshakeType::ClientHello => {
                HandshakePayload::ClientHello(ClientHelloPayload::read(&mut sub)?)
            }
            HandshakeType::ServerHello => {
                HandshakePayload::ServerHello(ServerHelloPayload::read(&mut sub)?)
            }
            HandshakeType::Certificate => {
                HandshakePayload::Certificate(CertificatePayload::read(&mut sub)?)
            }
            HandshakeType::ServerKeyExchange => {
                HandshakePayload::ServerKeyExchange(ServerKeyExchangePayload::read(&mut sub)?)
            }
            HandshakeType::ServerHelloDone => {
                sub.expect_empty("ServerHelloDone")?;
                HandshakePayload::ServerHelloDone
            }
            HandshakeType::ClientKeyExchange => {
                HandshakePayload::ClientKeyExchange(Payload::read(&mut sub))
            }
            HandshakeType::CertificateRequest => {
                let p = CertificateRequestPayload::read_version(&mut sub, vers)?;
                HandshakePayload::CertificateRequest(p)
            }
            HandshakeType::CertificateVerify if vers >= ProtocolVersion::TLSv1_2 => {
                HandshakePayload::CertificateVerify(DigitallySignedStruct::read(&mut sub)?)
            }
            HandshakeType::CertificateVerify => {
                HandshakePayload::CertificateVerifyLegacy(PayloadU16::read(&mut sub)?)
            }
            HandshakeType::NewSessionTicket => {
                HandshakePayload::NewSessionTicket(NewSessionTicketPayload::read(&mut sub)?)
            }
            HandshakeType::Finished => HandshakePayload::Finished(Payload::read(&mut sub)),
            HandshakeType::CertificateStatus => {
                HandshakePayload::CertificateStatus(CertificateStatus::read(&mut sub)?)
            }
            HandshakeType::NextProtocol => {
                HandshakePayload::NextProtocol(NextProtocolPayload::read(&mut sub)?)
            }
            HandshakeType::EncryptedExtensions => {
                HandshakePayload::ChannelId(ChannelIdPayload::read(&mut sub)?)
            }
            _ => HandshakePayload::Unknown(Payload::read(&mut sub)),
        };

        sub.expect_empty("HandshakeMessagePayload")
            .map(|_| Self { typ, payload })
    }

    pub fn build_finished(verify_data: &[u8]) -> Self {
        Self {
            typ: HandshakeType::Finished,
            payload: HandshakePayload::Finished(Payload::new(verify_data)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn server_hello(extensions: Vec<ServerExtension>) -> ServerHelloPayload {
        ServerHelloPayload {
            server_version: ProtocolVersion::TLSv1_2,
            random: Random([0x11; 32]),
            session_id: SessionId::new(&[0x22; 32]).unwrap(),
            cipher_suite: CipherSuite::TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256,
            compression_method: Compression::Null,
            extensions,
        }
    }

    fn wrap(typ: HandshakeType, payload: HandshakePayload) -> Vec<u8> {
        HandshakeMessagePayload { typ, payload }.get_encoding()
    }

    #[test]
    fn server_hello_roundtrips_with_extensions() {
        let shp = server_hello(vec![
            ServerExtension::make_empty_renegotiation_info(),
            ServerExtension::ExtendedMasterSecretAck,
            ServerExtension::make_alpn(b"h2"),
        ]);
        let bytes = wrap(HandshakeType::ServerHello, HandshakePayload::ServerHello(shp));

        let parsed = HandshakeMessagePayload::read_bytes(&bytes).unwrap();
        let HandshakePayload::ServerHello(shp) = parsed.payload else {
            panic!("not a server hello");
        };
        assert_eq!(shp.extensions.len(), 3);
        assert!(!shp.has_duplicate_extension());
        assert!(shp
            .find_extension(ExtensionType::ExtendedMasterSecret)
            .is_some());
        match shp.find_extension(ExtensionType::ALProtocolNegotiation) {
            Some(ServerExtension::Protocols(protos)) => {
                assert_eq!(protos.as_single_slice(), Some(&b"h2"[..]))
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn server_hello_without_extensions_is_accepted() {
        let bytes = server_hello(vec![]).get_encoding();
        let shp = ServerHelloPayload::read_bytes(&bytes).unwrap();
        assert!(shp.extensions.is_empty());
    }

    #[test]
    fn server_hello_with_trailing_data_is_rejected() {
        let mut bytes = server_hello(vec![]).get_encoding();
        bytes.extend_from_slice(&[0, 0, 0xff]);
        assert!(ServerHelloPayload::read_bytes(&bytes).is_err());
    }

    #[test]
    fn overlong_session_id_is_rejected() {
        let mut bytes = vec![0x03, 0x03];
        bytes.extend_from_slice(&[0u8; 32]);
        bytes.push(33);
        bytes.extend_from_slice(&[0u8; 33]);
        assert_eq!(
            ServerHelloPayload::read_bytes(&bytes).unwrap_err(),
            InvalidMessage::SessionIdTooLong
        );
    }

    #[test]
    fn duplicate_server_extensions_are_detected() {
        let shp = server_hello(vec![
            ServerExtension::SessionTicketAck,
            ServerExtension::SessionTicketAck,
        ]);
        assert!(shp.has_duplicate_extension());
    }

    #[test]
    fn acknowledgement_with_body_is_a_decode_error() {
        // server_name, length 1, one byte of body
        let bytes = [0x00, 0x00, 0x00, 0x01, 0x00];
        assert!(ServerExtension::read_bytes(&bytes).is_err());
    }

    #[test]
    fn npn_server_list_parses_to_end_of_extension() {
        let bytes = [
            0x33, 0x74, 0x00, 0x0c, 0x02, b'h', b'2', 0x08, b'h', b't', b't', b'p', b'/', b'1',
            b'.', b'1',
        ];
        match ServerExtension::read_bytes(&bytes).unwrap() {
            ServerExtension::NextProtocols(protos) => {
                assert_eq!(protos.len(), 2);
                assert_eq!(protos[1].as_ref(), b"http/1.1");
            }
            other => panic!("unexpected {other:?}"),
        }

        let empty_entry = [0x33, 0x74, 0x00, 0x01, 0x00];
        assert!(ServerExtension::read_bytes(&empty_entry).is_err());
    }

    #[test]
    fn next_protocol_is_padded_to_32_bytes() {
        for len in [0usize, 2, 8, 29, 30, 31, 62] {
            let np = NextProtocolPayload::new(vec![b'x'; len]);
            let enc = np.get_encoding();
            assert_eq!(enc.len() % 32, 0, "length {len}");
            assert!(np.padding.0.iter().all(|b| *b == 0));
        }
    }

    #[test]
    fn status_request_extension_encoding() {
        let enc = ClientExtension::CertificateStatusRequest.get_encoding();
        assert_eq!(enc, vec![0x00, 0x05, 0x00, 0x05, 0x01, 0x00, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn client_hello_roundtrip_keeps_extension_order() {
        let chp = ClientHelloPayload {
            client_version: ProtocolVersion::TLSv1_2,
            random: Random([1; 32]),
            session_id: SessionId::empty(),
            cipher_suites: vec![
                CipherSuite::TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256,
                CipherSuite::TLS_EMPTY_RENEGOTIATION_INFO_SCSV,
            ],
            compression_methods: vec![Compression::Null],
            extensions: vec![
                ClientExtension::make_sni("example.com"),
                ClientExtension::SessionTicket(ClientSessionTicket::Request),
                ClientExtension::ChannelIdNewRequest,
                ClientExtension::RenegotiationInfo(PayloadU8::new(vec![9; 12])),
            ],
        };
        let parsed = ClientHelloPayload::read_bytes(&chp.get_encoding()).unwrap();
        let types: Vec<_> = parsed
            .extensions
            .iter()
            .map(ClientExtension::ext_type)
            .collect();
        assert_eq!(
            types,
            vec![
                ExtensionType::ServerName,
                ExtensionType::SessionTicket,
                ExtensionType::ChannelIdNew,
                ExtensionType::RenegotiationInfo
            ]
        );
        assert_eq!(parsed.renegotiation_info(), Some(&[9u8; 12][..]));
    }

    fn ecdhe_params() -> Vec<u8> {
        ServerEcdhParams::new(NamedGroup::X25519, &[7u8; 32]).get_encoding()
    }

    #[test]
    fn ecdhe_kx_tls12_carries_scheme() {
        let mut body = ecdhe_params();
        DigitallySignedStruct::new(SignatureScheme::RSA_PKCS1_SHA256, vec![1, 2, 3]).encode(&mut body);

        let skx = ServerKeyExchangePayload(Payload::new(body))
            .unwrap_given_kxa(
                KeyExchangeAlgorithm::Ecdhe,
                Some(SignatureAlgorithm::RSA),
                ProtocolVersion::TLSv1_2,
            )
            .unwrap();
        assert_eq!(skx.params_encoding, ecdhe_params());
        assert_eq!(skx.dss.unwrap().scheme, SignatureScheme::RSA_PKCS1_SHA256);
    }

    #[test]
    fn ecdhe_kx_before_tls12_implies_legacy_scheme() {
        let mut body = ecdhe_params();
        PayloadU16::new(vec![4, 5, 6]).encode(&mut body);

        let skx = ServerKeyExchangePayload(Payload::new(body))
            .unwrap_given_kxa(
                KeyExchangeAlgorithm::Ecdhe,
                Some(SignatureAlgorithm::RSA),
                ProtocolVersion::TLSv1_0,
            )
            .unwrap();
        let dss = skx.dss.unwrap();
        assert_eq!(dss.scheme, SignatureScheme::RSA_PKCS1_MD5_SHA1);
        assert_eq!(dss.signature(), &[4, 5, 6]);
    }

    #[test]
    fn psk_kx_hint_is_covered_by_params_encoding() {
        let mut body = Vec::new();
        PayloadU16::new(b"hint".to_vec()).encode(&mut body);
        body.extend(ecdhe_params());

        let skx = ServerKeyExchangePayload(Payload::new(body.clone()))
            .unwrap_given_kxa(KeyExchangeAlgorithm::EcdhePsk, None, ProtocolVersion::TLSv1_2)
            .unwrap();
        assert_eq!(skx.psk_identity_hint.unwrap().0, b"hint");
        assert_eq!(skx.params_encoding, body);
        assert!(skx.dss.is_none());
    }

    #[test]
    fn dhe_kx_rejects_empty_values() {
        let mut body = Vec::new();
        PayloadU16::new(vec![0xff; 128]).encode(&mut body);
        PayloadU16::new(vec![]).encode(&mut body);
        PayloadU16::new(vec![0x02]).encode(&mut body);

        let err = ServerKeyExchangePayload(Payload::new(body))
            .unwrap_given_kxa(KeyExchangeAlgorithm::DhAnon, None, ProtocolVersion::TLSv1_2)
            .unwrap_err();
        assert_eq!(err, InvalidMessage::EmptyDhParameter);
    }

    #[test]
    fn ecdhe_kx_requires_named_curve() {
        let body = vec![0x01, 0x00, 0x17, 0x01, 0x04];
        let err = ServerKeyExchangePayload(Payload::new(body))
            .unwrap_given_kxa(KeyExchangeAlgorithm::EcdhAnon, None, ProtocolVersion::TLSv1_2)
            .unwrap_err();
        assert_eq!(err, InvalidMessage::UnsupportedCurveType);
    }

    #[test]
    fn kx_with_trailing_data_is_rejected() {
        let mut body = ecdhe_params();
        body.push(0);
        assert!(ServerKeyExchangePayload(Payload::new(body))
            .unwrap_given_kxa(KeyExchangeAlgorithm::EcdhAnon, None, ProtocolVersion::TLSv1_2)
            .is_err());
    }

    #[test]
    fn certificate_request_layout_depends_on_version() {
        let body = [0x01, 0x01, 0x00, 0x00];
        let mut bytes = vec![0x0d, 0x00, 0x00, body.len() as u8];
        bytes.extend_from_slice(&body);

        let msg =
            HandshakeMessagePayload::read_version(&mut Reader::init(&bytes), ProtocolVersion::TLSv1_1)
                .unwrap();
        match msg.payload {
            HandshakePayload::CertificateRequest(cr) => {
                assert_eq!(cr.certtypes, vec![ClientCertificateType::RSASign]);
                assert!(cr.sigschemes.is_empty());
                assert!(cr.canames.is_empty());
            }
            other => panic!("unexpected {other:?}"),
        }

        // the same bytes are truncated under TLS 1.2
        assert!(HandshakeMessagePayload::read_version(
            &mut Reader::init(&bytes),
            ProtocolVersion::TLSv1_2
        )
        .is_err());
    }

    #[test]
    fn certificate_status_must_be_ocsp_and_nonempty() {
        assert_eq!(
            CertificateStatus::read_bytes(&[0x01, 0x00, 0x00, 0x00]).unwrap_err(),
            InvalidMessage::EmptyCertificateStatus
        );
        assert_eq!(
            CertificateStatus::read_bytes(&[0x02, 0x00, 0x00, 0x01, 0xaa]).unwrap_err(),
            InvalidMessage::InvalidCertificateStatusType
        );
        let ok = CertificateStatus::read_bytes(&[0x01, 0x00, 0x00, 0x01, 0xaa]).unwrap();
        assert_eq!(ok.into_inner(), vec![0xaa]);
    }

    #[test]
    fn server_hello_done_must_be_empty() {
        assert!(HandshakeMessagePayload::read_bytes(&[0x0e, 0x00, 0x00, 0x01, 0x00]).is_err());
        assert!(HandshakeMessagePayload::read_bytes(&[0x0e, 0x00, 0x00, 0x00]).is_ok());
    }

    #[test]
    fn channel_id_message_layout() {
        let msg = HandshakeMessagePayload {
            typ: HandshakeType::EncryptedExtensions,
            payload: HandshakePayload::ChannelId(ChannelIdPayload {
                typ: ExtensionType::ChannelId,
                body: PayloadU16::new(vec![0x5a; CHANNEL_ID_BODY_LEN]),
            }),
        };
        let enc = msg.get_encoding();
        assert_eq!(&enc[..8], &[0xcb, 0x00, 0x00, 0x84, 0x75, 0x50, 0x00, 0x80]);
        assert_eq!(enc.len(), 4 + 2 + 2 + CHANNEL_ID_BODY_LEN);
    }

    #[test]
    fn session_id_hash_matches_equality() {
        use std::collections::HashSet;
        let a = SessionId::new(&[1, 2, 3]).unwrap();
        let b = SessionId::new(&[1, 2, 3]).unwrap();
        let mut set = HashSet::new();
        set.insert(a);
        assert!(set.contains(&b));
        assert!(SessionId::new(&[0u8; 33]).is_none());
    }
}
