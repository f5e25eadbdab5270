use crate::enums::{AlertDescription, ContentType, HandshakeType};
use crate::rand;

use std::error::Error as StdError;
use std::fmt;
use std::io;

/// The handshake core reports protocol errors using this type.
///
/// Transient conditions (a transport that would block, a certificate
/// verification or Channel ID lookup still in flight) are never errors:
/// they are reported through [`crate::client::Progress`].
#[non_exhaustive]
#[derive(Debug, PartialEq, Clone)]
pub enum Error {
    /// We received a TLS message that isn't valid right now.
    /// `expect_types` lists the message types we can expect right now.
    /// `got_type` is the type we found.  This error is typically
    /// caused by a buggy TLS stack (the peer or this one), a broken
    /// network, or an attack.
    InappropriateMessage {
        /// Which types we expected
        expect_types: Vec<ContentType>,
        /// What type we received
        got_type: ContentType,
    },

    /// We received a TLS handshake message that isn't valid right now.
    /// `expect_types` lists the handshake message types we can expect
    /// right now.  `got_type` is the type we found.
    InappropriateHandshakeMessage {
        /// Which handshake type we expected
        expect_types: Vec<HandshakeType>,
        /// What handshake type we received
        got_type: HandshakeType,
    },

    /// The peer sent us a TLS message with invalid contents.
    InvalidMessage(InvalidMessage),

    /// The peer didn't give us any certificates.
    NoCertificatesPresented,

    /// The peer's Finished message or signature did not verify.
    DecryptError,

    /// The peer doesn't support a protocol version/feature we require.
    /// The parameter gives a hint as to what version/feature it is.
    PeerIncompatible(PeerIncompatible),

    /// The peer deviated from the standard TLS protocol.
    /// The parameter gives a hint where.
    PeerMisbehaved(PeerMisbehaved),

    /// We received a fatal alert.  This means the peer is unhappy.
    AlertReceived(AlertDescription),

    /// We saw an invalid certificate.
    ///
    /// The contained error is from the certificate validation trait
    /// implementation.
    InvalidCertificate(CertificateError),

    /// A PSK cipher suite was negotiated but the configured PSK provider
    /// had no key for the server's identity hint.
    NoPskAvailable,

    /// We couldn't get random bytes.
    FailedToGetRandomBytes,

    /// The configured time provider could not tell the time.
    FailedToGetCurrentTime,

    /// This function doesn't work until the TLS handshake
    /// is complete.
    HandshakeNotComplete,

    /// The handshake already failed or was aborted; it cannot be
    /// advanced any further.
    HandshakeClosed,

    /// The transport failed with something other than would-block.
    Transport(io::ErrorKind),

    /// A catch-all error for unlikely errors, and local configuration
    /// problems that do not involve the peer.
    General(String),
}

impl Error {
    /// The alert we send to the peer when failing with this error, if any.
    ///
    /// Local failures and alerts we received ourselves produce no alert.
    pub fn alert(&self) -> Option<AlertDescription> {
        match self {
            Self::InappropriateMessage { .. } | Self::InappropriateHandshakeMessage { .. } => {
                Some(AlertDescription::UnexpectedMessage)
            }
            Self::InvalidMessage(_) | Self::NoCertificatesPresented => {
                Some(AlertDescription::DecodeError)
            }
            Self::DecryptError => Some(AlertDescription::DecryptError),
            Self::PeerIncompatible(why) => Some(why.alert()),
            Self::PeerMisbehaved(why) => Some(why.alert()),
            Self::InvalidCertificate(err) => Some(err.clone().into()),
            Self::NoPskAvailable => Some(AlertDescription::HandshakeFailure),
            Self::FailedToGetRandomBytes => Some(AlertDescription::InternalError),
            Self::AlertReceived(_)
            | Self::FailedToGetCurrentTime
            | Self::HandshakeNotComplete
            | Self::HandshakeClosed
            | Self::Transport(_)
            | Self::General(_) => None,
        }
    }

    /// True for failures that mean the session we were negotiating (or
    /// resuming) must not be resumed again: every fatal alert, whichever
    /// side sent it.
    ///
    /// A received close_notify, a transport failure or a local error
    /// leaves the session alone.
    pub(crate) fn invalidates_session(&self) -> bool {
        match self {
            Self::AlertReceived(desc) => *desc != AlertDescription::CloseNotify,
            _ => self.alert().is_some(),
        }
    }
}

/// A corrupt TLS message payload that resulted in an error.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InvalidMessage {
    /// A certificate status message carried an empty response.
    EmptyCertificateStatus,
    /// A DHE parameter (p, g or Ys) was empty.
    EmptyDhParameter,
    /// A handshake message exceeded the size we are prepared to buffer.
    HandshakePayloadTooLarge,
    /// An advertised message was larger then expected.
    MessageTooLarge,
    /// Message is shorter than the expected length
    MessageTooShort,
    /// Missing data for the named handshake payload value
    MissingData(&'static str),
    /// A peer sent an empty list of items, but a non-empty list is required.
    IllegalEmptyList(&'static str),
    /// A peer sent an empty value, but a non-empty value is required.
    IllegalEmptyValue,
    /// Context was incorrectly attached to a certificate status message.
    InvalidCertificateStatusType,
    /// A peer's change cipher spec payload was not the single byte `1`.
    InvalidCcs,
    /// An unknown content type was encountered during message decoding.
    InvalidContentType,
    /// A stored session named a cipher suite we do not implement.
    UnknownCipherSuite,
    /// An extension that must have an empty body carried data.
    InvalidEmptyExtension,
    /// A session id longer than 32 bytes.
    SessionIdTooLong,
    /// Trailing data found for the named payload
    TrailingData(&'static str),
    /// A peer sent an unexpected message type.
    UnexpectedMessage(&'static str),
    /// An unknown TLS protocol was encountered during message decoding.
    UnknownProtocolVersion,
    /// A peer sent a non-null compression method.
    UnsupportedCompression,
    /// A peer sent an unknown elliptic curve type.
    UnsupportedCurveType,
}

impl From<InvalidMessage> for Error {
    #[inline]
    fn from(e: InvalidMessage) -> Self {
        Self::InvalidMessage(e)
    }
}

#[non_exhaustive]
#[allow(missing_docs)]
#[derive(Debug, PartialEq, Clone)]
/// The set of cases where we failed to make a connection because we thought
/// the peer was misbehaving.
///
/// This is `non_exhaustive`: we might add or stop using items here in minor
/// versions.  We also don't document what they mean.  Generally a user of
/// this crate shouldn't vary its behaviour on these error codes, and there is
/// nothing it can do to improve matters.
pub enum PeerMisbehaved {
    AcceptedAlpnAndNpn,
    CertificateRequestWithAnonymousSuite,
    DuplicateServerHelloExtensions,
    IllegalRenegotiationInfo,
    InappropriateFallback,
    InvalidKeyShare,
    InvalidPskIdentityHint,
    MissingRenegotiationInfo,
    ResumptionWithVariedCipherSuite,
    ResumptionWithVariedExtendedMasterSecret,
    ResumptionWithVariedVersion,
    SelectedUnknownCipherSuite,
    SelectedUnofferedApplicationProtocol,
    SelectedUnofferedCipherSuite,
    SelectedUnofferedCompression,
    SelectedUnofferedKxGroup,
    SelectedUnusableCipherSuiteForVersion,
    ServerHelloMustOfferUncompressedEcPoints,
    SignedKxWithWrongAlgorithm,
    SignedHandshakeWithUnadvertisedSigScheme,
    UnsolicitedServerHelloExtension,
    VersionChangedDuringRenegotiation,
    WrongProtocolVersion,
}

impl PeerMisbehaved {
    fn alert(&self) -> AlertDescription {
        match self {
            Self::DuplicateServerHelloExtensions => AlertDescription::DecodeError,
            Self::UnsolicitedServerHelloExtension => AlertDescription::UnsupportedExtension,
            Self::IllegalRenegotiationInfo
            | Self::MissingRenegotiationInfo
            | Self::InvalidPskIdentityHint
            | Self::CertificateRequestWithAnonymousSuite
            | Self::ResumptionWithVariedExtendedMasterSecret => AlertDescription::HandshakeFailure,
            Self::InappropriateFallback => AlertDescription::InappropriateFallback,
            Self::ResumptionWithVariedVersion | Self::WrongProtocolVersion => {
                AlertDescription::ProtocolVersion
            }
            Self::AcceptedAlpnAndNpn
            | Self::InvalidKeyShare
            | Self::ResumptionWithVariedCipherSuite
            | Self::SelectedUnknownCipherSuite
            | Self::SelectedUnofferedApplicationProtocol
            | Self::SelectedUnofferedCipherSuite
            | Self::SelectedUnofferedCompression
            | Self::SelectedUnofferedKxGroup
            | Self::SelectedUnusableCipherSuiteForVersion
            | Self::ServerHelloMustOfferUncompressedEcPoints
            | Self::SignedKxWithWrongAlgorithm
            | Self::SignedHandshakeWithUnadvertisedSigScheme
            | Self::VersionChangedDuringRenegotiation => AlertDescription::IllegalParameter,
        }
    }
}

impl From<PeerMisbehaved> for Error {
    #[inline]
    fn from(e: PeerMisbehaved) -> Self {
        Self::PeerMisbehaved(e)
    }
}

#[non_exhaustive]
#[allow(missing_docs)]
#[derive(Debug, PartialEq, Clone)]
/// The set of cases where we failed to make a connection because a peer
/// doesn't support a TLS version/feature we require.
///
/// This is `non_exhaustive`: we might add or stop using items here in minor
/// versions.
pub enum PeerIncompatible {
    DhParamsTooSmall,
    NoSignatureSchemesInCommon,
    SecureRenegotiationUnsupported,
    ServerTlsVersionIsDisabledByOurConfig,
    UnsupportedKeyExchange,
}

impl PeerIncompatible {
    fn alert(&self) -> AlertDescription {
        match self {
            Self::ServerTlsVersionIsDisabledByOurConfig => AlertDescription::ProtocolVersion,
            Self::DhParamsTooSmall => AlertDescription::IllegalParameter,
            Self::NoSignatureSchemesInCommon
            | Self::SecureRenegotiationUnsupported
            | Self::UnsupportedKeyExchange => AlertDescription::HandshakeFailure,
        }
    }
}

impl From<PeerIncompatible> for Error {
    #[inline]
    fn from(e: PeerIncompatible) -> Self {
        Self::PeerIncompatible(e)
    }
}

#[non_exhaustive]
#[derive(Debug, Clone, PartialEq)]
/// The ways in which certificate validators can express errors.
///
/// Note that the handshake code interprets specifically these
/// error codes to send specific TLS alerts.  Therefore, if a
/// custom certificate validator uses incorrect errors the library as
/// a whole will send alerts that do not match the standard (this is usually
/// a minor issue, but could be misleading).
pub enum CertificateError {
    /// The certificate is not correctly encoded.
    BadEncoding,

    /// The current time is after the `notAfter` time in the certificate.
    Expired,

    /// The current time is before the `notBefore` time in the certificate.
    NotValidYet,

    /// The certificate has been revoked.
    Revoked,

    /// The certificate contains an extension marked critical, but it was
    /// not processed by the certificate validator.
    UnhandledCriticalExtension,

    /// The certificate chain is not issued by a known root certificate.
    UnknownIssuer,

    /// A certificate is not correctly signed by the key of its alleged
    /// issuer.
    BadSignature,

    /// The subject names in an end-entity certificate do not include
    /// the expected name.
    NotValidForName,

    /// The certificate is being used for a different purpose than allowed.
    InvalidPurpose,

    /// The certificate is valid, but the handshake is rejected for other
    /// reasons.
    ApplicationVerificationFailure,

    /// Any other error, described by the verifier.
    Other(String),
}

// The following mapping follows the alerts OpenSSL and BoringSSL send for
// the same verification failures.
impl From<CertificateError> for AlertDescription {
    fn from(e: CertificateError) -> Self {
        use CertificateError::*;
        match e {
            BadEncoding | UnhandledCriticalExtension | NotValidForName => Self::BadCertificate,
            // RFC 5246
            // certificate_expired
            //  A certificate has expired or **is not currently valid**.
            Expired | NotValidYet => Self::CertificateExpired,
            Revoked => Self::CertificateRevoked,
            UnknownIssuer => Self::UnknownCA,
            BadSignature => Self::DecryptError,
            InvalidPurpose => Self::UnsupportedCertificate,
            ApplicationVerificationFailure => Self::AccessDenied,
            // RFC 5246
            // certificate_unknown
            //  Some other (unspecified) issue arose in processing the
            //  certificate, rendering it unacceptable.
            Other(_) => Self::CertificateUnknown,
        }
    }
}

impl From<CertificateError> for Error {
    #[inline]
    fn from(e: CertificateError) -> Self {
        Self::InvalidCertificate(e)
    }
}

fn join<T: fmt::Debug>(items: &[T]) -> String {
    items
        .iter()
        .map(|x| format!("{:?}", x))
        .collect::<Vec<String>>()
        .join(" or ")
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Self::InappropriateMessage {
                ref expect_types,
                ref got_type,
            } => write!(
                f,
                "received unexpected message: got {:?} when expecting {}",
                got_type,
                join::<ContentType>(expect_types)
            ),
            Self::InappropriateHandshakeMessage {
                ref expect_types,
                ref got_type,
            } => write!(
                f,
                "received unexpected handshake message: got {:?} when expecting {}",
                got_type,
                join::<HandshakeType>(expect_types)
            ),
            Self::InvalidMessage(ref typ) => {
                write!(f, "received corrupt message of type {:?}", typ)
            }
            Self::PeerIncompatible(ref why) => write!(f, "peer is incompatible: {:?}", why),
            Self::PeerMisbehaved(ref why) => write!(f, "peer misbehaved: {:?}", why),
            Self::AlertReceived(ref alert) => write!(f, "received fatal alert: {:?}", alert),
            Self::InvalidCertificate(ref err) => {
                write!(f, "invalid peer certificate: {:?}", err)
            }
            Self::NoCertificatesPresented => write!(f, "peer sent no certificates"),
            Self::DecryptError => write!(f, "cannot verify peer's handshake"),
            Self::NoPskAvailable => write!(f, "no pre-shared key for the server's identity hint"),
            Self::FailedToGetRandomBytes => write!(f, "failed to get random bytes"),
            Self::FailedToGetCurrentTime => write!(f, "failed to get current time"),
            Self::HandshakeNotComplete => write!(f, "handshake not complete"),
            Self::HandshakeClosed => write!(f, "handshake already closed"),
            Self::Transport(kind) => write!(f, "transport failed: {:?}", kind),
            Self::General(ref err) => write!(f, "unexpected error: {}", err),
        }
    }
}

impl StdError for Error {}

impl From<rand::GetRandomFailed> for Error {
    fn from(_: rand::GetRandomFailed) -> Self {
        Self::FailedToGetRandomBytes
    }
}
