use core::fmt;
use core::task::Poll;
use std::sync::Arc;
use std::time::Duration;

use pki_types::{ServerName, UnixTime};

use super::handy::FailResolveClientCert;
use crate::cache::{SessionCache, DEFAULT_SESSION_TIMEOUT};
use crate::crypto::{CryptoProvider, KeyExchangeAlgorithm};
use crate::enums::{ProtocolVersion, SignatureScheme};
use crate::error::Error;
use crate::msgs::enums::ClientCertificateType;
use crate::sign;
use crate::suites::{self, CipherPolicy, SupportedCipherSuite};
use crate::time_provider::{DefaultTimeProvider, TimeProvider};
use crate::tls12::MasterSecret;
use crate::verify::ServerCertVerifier;

/// A trait for the ability to choose a certificate chain and
/// private key for the purposes of client authentication.
pub trait ResolvesClientCert: fmt::Debug + Send + Sync {
    /// Resolve a client certificate chain/private key to use as the client's
    /// identity.
    ///
    /// `root_hint_subjects` is an optional list of certificate authority
    /// subject distinguished names that the client can use to help
    /// decide on a client certificate the server is likely to accept. If
    /// the list is empty, the client should send whatever certificate it
    /// has.
    ///
    /// `sigschemes` is the list of the [`SignatureScheme`]s the server
    /// supports.  Before TLS 1.2 it holds just the legacy schemes.
    ///
    /// `cert_types` is the list of key types the server accepts; a chain
    /// whose key is of another type is not sent.
    ///
    /// Return `None` to continue the handshake without any client
    /// authentication.  The server may reject the handshake later
    /// if it requires authentication.
    fn resolve(
        &self,
        root_hint_subjects: &[&[u8]],
        sigschemes: &[SignatureScheme],
        cert_types: &[ClientCertificateType],
    ) -> Option<Arc<sign::CertifiedKey>>;

    /// As [`ResolvesClientCert::resolve`], for resolvers whose keys live
    /// somewhere slow.
    ///
    /// While this is `Poll::Pending` the handshake reports
    /// [`super::Progress::PendingClientCertificate`], and asks again on
    /// the next `advance()`.
    fn poll_resolve(
        &self,
        root_hint_subjects: &[&[u8]],
        sigschemes: &[SignatureScheme],
        cert_types: &[ClientCertificateType],
    ) -> Poll<Option<Arc<sign::CertifiedKey>>> {
        Poll::Ready(self.resolve(root_hint_subjects, sigschemes, cert_types))
    }

    /// Return true if any certificates at all are available.
    fn has_certs(&self) -> bool;
}

/// The outcome of a [`PskProvider`] lookup.
pub enum PskLookup {
    /// Use this identity and key.
    Found {
        /// Sent to the server in the ClientKeyExchange.
        identity: Vec<u8>,
        /// The pre-shared key itself.
        key: Vec<u8>,
    },
    /// No key matches; the handshake fails.
    NotFound,
}

impl fmt::Debug for PskLookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Found { identity, .. } => f
                .debug_struct("Found")
                .field("identity", identity)
                .finish_non_exhaustive(),
            Self::NotFound => f.write_str("NotFound"),
        }
    }
}

/// Supplies pre-shared keys for PSK cipher suites.
pub trait PskProvider: fmt::Debug + Send + Sync {
    /// Find the key to use, given the server's identity hint (if it sent
    /// one).
    fn lookup(&self, identity_hint: Option<&[u8]>) -> PskLookup;
}

/// A P-256 key proving the client's Channel ID.
pub trait ChannelIdKey: Send + Sync {
    /// The public key's affine coordinates, `x ‖ y`.
    fn public_key(&self) -> [u8; 64];

    /// ECDSA-sign SHA-256(`message`), returning `r ‖ s`.
    fn sign(&self, message: &[u8]) -> Result<[u8; 64], Error>;
}

/// Finds the Channel ID key to use for a host.
///
/// Keys may live somewhere slow, so lookups can be pending: the
/// handshake then reports [`super::Progress::PendingChannelId`] and asks
/// again on the next `advance()`.
pub trait ChannelIdProvider: fmt::Debug + Send + Sync {
    /// Return the key for `server_name`.
    fn channel_id_key(
        &self,
        server_name: &ServerName<'_>,
    ) -> Poll<Result<Arc<dyn ChannelIdKey>, Error>>;
}

/// Chooses a protocol from those a server advertises with Next
/// Protocol Negotiation.
pub trait NextProtocolSelector: fmt::Debug + Send + Sync {
    /// Return the protocol to use.  It need not be one the server
    /// listed.
    fn select(&self, server_protocols: &[&[u8]]) -> Vec<u8>;
}

/// Supplies a master secret out of band, for servers that resume
/// from a ticket without echoing a session id.
pub trait SessionSecretCallback: fmt::Debug + Send + Sync {
    /// Given the offered `ticket` and the `server_random`, return the
    /// master secret to resume with, or `None` to do a full handshake.
    fn session_secret(&self, ticket: &[u8], server_random: &[u8; 32]) -> Option<MasterSecret>;
}

/// Common configuration for (typically) all connections made by a
/// program.
///
/// Making one of these is cheap.  It is shared between connections by
/// `Arc`, and connections never modify it.
///
/// # Defaults
///
/// * `versions`: TLS 1.2, 1.1 and 1.0.
/// * `cipher_policy`: [`CipherPolicy::default()`].
/// * `alpn_protocols`: empty, so no ALPN extension is sent.
/// * `enable_sni`, `enable_tickets`, `enable_extended_master_secret`: true.
/// * `enable_ocsp_stapling`, `enable_signed_cert_timestamps`: false.
/// * `allow_legacy_server_connect`, `enable_false_start`, `fallback_scsv`: false.
/// * `channel_id_new`: true, though Channel ID is only offered with a
///   provider.
/// * `session_cache`: none.
#[derive(Clone)]
pub struct ClientConfig {
    /// Versions we are willing to negotiate.  The highest is offered.
    pub versions: Vec<ProtocolVersion>,

    /// Which cipher suites we offer, and in what order.
    pub cipher_policy: CipherPolicy,

    /// Which ALPN protocols we include in our client hello.
    /// If empty, no ALPN extension is sent.
    pub alpn_protocols: Vec<Vec<u8>>,

    /// Whether to send the Server Name Indication (SNI) extension.
    pub enable_sni: bool,

    /// Whether to ask for a stapled OCSP response.
    pub enable_ocsp_stapling: bool,

    /// Whether to ask for signed certificate timestamps.
    pub enable_signed_cert_timestamps: bool,

    /// Whether to ask for, and resume with, session tickets.
    pub enable_tickets: bool,

    /// Whether to offer the extended master secret (RFC 7627).
    pub enable_extended_master_secret: bool,

    /// Accept servers that do not support secure renegotiation
    /// (RFC 5746) on the initial handshake.
    pub allow_legacy_server_connect: bool,

    /// Report [`super::Progress::FalseStart`] once our Finished is sent
    /// on a full handshake whose suite allows it and where ALPN or NPN
    /// picked a protocol.  Application data may then be written before
    /// the server's Finished arrives.
    pub enable_false_start: bool,

    /// Set when this connection is a retry at a lower version after a
    /// failed attempt.  The fallback SCSV is sent, and a server choosing
    /// a version below our highest is refused.
    pub fallback_scsv: bool,

    /// Where completed sessions are stored for resumption.
    pub session_cache: Option<Arc<SessionCache>>,

    /// Verifies the server's certificate chain and key exchange
    /// signature.
    pub verifier: Arc<dyn ServerCertVerifier>,

    /// How to decide what client auth certificate/keys to use.
    pub client_auth_cert_resolver: Arc<dyn ResolvesClientCert>,

    /// Supplies keys for PSK suites.  PSK suites are not offered
    /// without one.
    pub psk_provider: Option<Arc<dyn PskProvider>>,

    /// Offers Next Protocol Negotiation, and picks from the server's
    /// list.
    pub next_protocol_selector: Option<Arc<dyn NextProtocolSelector>>,

    /// Offers Channel ID, and supplies the key.
    pub channel_id: Option<Arc<dyn ChannelIdProvider>>,

    /// Offer Channel ID under the new code point, which binds resumed
    /// handshakes to the original one.
    pub channel_id_new: bool,

    /// See [`SessionSecretCallback`].
    pub session_secret_callback: Option<Arc<dyn SessionSecretCallback>>,

    /// Provides the key exchanges and randomness.
    pub provider: Arc<CryptoProvider>,

    /// Provides the current system time.
    pub time_provider: Arc<dyn TimeProvider>,
}

impl ClientConfig {
    /// Make a configuration with the defaults listed above.
    pub fn new(provider: CryptoProvider, verifier: Arc<dyn ServerCertVerifier>) -> Self {
        Self {
            versions: vec![
                ProtocolVersion::TLSv1_2,
                ProtocolVersion::TLSv1_1,
                ProtocolVersion::TLSv1_0,
            ],
            cipher_policy: CipherPolicy::default(),
            alpn_protocols: Vec::new(),
            enable_sni: true,
            enable_ocsp_stapling: false,
            enable_signed_cert_timestamps: false,
            enable_tickets: true,
            enable_extended_master_secret: true,
            allow_legacy_server_connect: false,
            enable_false_start: false,
            fallback_scsv: false,
            session_cache: None,
            verifier,
            client_auth_cert_resolver: Arc::new(FailResolveClientCert {}),
            psk_provider: None,
            next_protocol_selector: None,
            channel_id: None,
            channel_id_new: true,
            session_secret_callback: None,
            provider: Arc::new(provider),
            time_provider: Arc::new(DefaultTimeProvider),
        }
    }

    /// Restrict the versions offered.
    pub fn with_versions(mut self, versions: &[ProtocolVersion]) -> Self {
        self.versions = versions.to_vec();
        self
    }

    /// Offer these suites, most preferred first.
    pub fn with_cipher_suites(mut self, suites: &[&'static SupportedCipherSuite]) -> Self {
        self.cipher_policy.preference = suites.to_vec();
        self
    }

    /// Offer these ALPN protocols.
    pub fn with_alpn_protocols(mut self, protocols: &[&[u8]]) -> Self {
        self.alpn_protocols = protocols
            .iter()
            .map(|p| p.to_vec())
            .collect();
        self
    }

    /// Store completed sessions in `cache`.
    pub fn with_session_cache(mut self, cache: Arc<SessionCache>) -> Self {
        self.session_cache = Some(cache);
        self
    }

    /// Authenticate with `resolver` when the server asks.
    pub fn with_client_cert_resolver(mut self, resolver: Arc<dyn ResolvesClientCert>) -> Self {
        self.client_auth_cert_resolver = resolver;
        self
    }

    /// Enable PSK suites, with keys from `provider`.
    pub fn with_psk_provider(mut self, provider: Arc<dyn PskProvider>) -> Self {
        self.psk_provider = Some(provider);
        self
    }

    /// Offer NPN, choosing with `selector`.
    pub fn with_next_protocol_selector(mut self, selector: Arc<dyn NextProtocolSelector>) -> Self {
        self.next_protocol_selector = Some(selector);
        self
    }

    /// Offer Channel ID, with keys from `provider`.
    pub fn with_channel_id(mut self, provider: Arc<dyn ChannelIdProvider>) -> Self {
        self.channel_id = Some(provider);
        self
    }

    /// Use `callback` to resume from tickets without a session id.
    pub fn with_session_secret_callback(mut self, callback: Arc<dyn SessionSecretCallback>) -> Self {
        self.session_secret_callback = Some(callback);
        self
    }

    /// Read the time from `time_provider`.
    pub fn with_time_provider(mut self, time_provider: Arc<dyn TimeProvider>) -> Self {
        self.time_provider = time_provider;
        self
    }

    /// Allow False Start where it is safe.
    pub fn with_false_start(mut self) -> Self {
        self.enable_false_start = true;
        self
    }

    /// Mark connections made with this config as fallback retries.
    pub fn with_fallback_scsv(mut self) -> Self {
        self.fallback_scsv = true;
        self
    }

    /// The highest enabled version, which is the one offered.
    pub fn max_version(&self) -> Option<ProtocolVersion> {
        self.versions
            .iter()
            .copied()
            .max_by_key(|v| v.wire())
    }

    /// Whether `version` is enabled.
    pub fn supports_version(&self, version: ProtocolVersion) -> bool {
        self.versions.contains(&version)
    }

    /// The suites offered when `version` is the highest version.
    ///
    /// Suites whose key exchange this configuration cannot carry out are
    /// left out: RSA without an RSA provider, PSK without a PSK provider,
    /// and elliptic curve suites without any groups.
    pub fn offered_suites(&self, version: ProtocolVersion) -> Vec<&'static SupportedCipherSuite> {
        suites::enumerate_supported(version, &self.cipher_policy)
            .into_iter()
            .filter(|scs| self.can_do_kx(scs.kx))
            .collect()
    }

    fn can_do_kx(&self, kx: KeyExchangeAlgorithm) -> bool {
        match kx {
            KeyExchangeAlgorithm::Rsa => self.provider.rsa_kx.is_some(),
            KeyExchangeAlgorithm::Psk => self.psk_provider.is_some(),
            KeyExchangeAlgorithm::EcdhePsk => {
                self.psk_provider.is_some() && !self.provider.kx_groups.is_empty()
            }
            KeyExchangeAlgorithm::Ecdhe | KeyExchangeAlgorithm::EcdhAnon => {
                !self.provider.kx_groups.is_empty()
            }
            KeyExchangeAlgorithm::Dhe | KeyExchangeAlgorithm::DhAnon => true,
        }
    }

    /// How long sessions stay resumable.
    pub fn session_timeout(&self) -> Duration {
        self.session_cache
            .as_ref()
            .map(|cache| cache.timeout())
            .unwrap_or(DEFAULT_SESSION_TIMEOUT)
    }

    pub(crate) fn current_time(&self) -> Result<UnixTime, Error> {
        self.time_provider
            .current_time()
            .ok_or(Error::FailedToGetCurrentTime)
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("versions", &self.versions)
            .field("cipher_policy", &self.cipher_policy)
            .field("alpn_protocols", &self.alpn_protocols)
            .field("enable_sni", &self.enable_sni)
            .field("enable_ocsp_stapling", &self.enable_ocsp_stapling)
            .field("enable_signed_cert_timestamps", &self.enable_signed_cert_timestamps)
            .field("enable_tickets", &self.enable_tickets)
            .field("enable_extended_master_secret", &self.enable_extended_master_secret)
            .field("allow_legacy_server_connect", &self.allow_legacy_server_connect)
            .field("fallback_scsv", &self.fallback_scsv)
            .field("session_cache", &self.session_cache)
            .field("verifier", &self.verifier)
            .field("client_auth_cert_resolver", &self.client_auth_cert_resolver)
            .field("psk_provider", &self.psk_provider)
            .field("next_protocol_selector", &self.next_protocol_selector)
            .field("channel_id", &self.channel_id)
            .field("channel_id_new", &self.channel_id_new)
            .field("session_secret_callback", &self.session_secret_callback)
            .field("provider", &self.provider)
            .finish_non_exhaustive()
    }
}
