#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::io;
use std::mem;
use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
pub use std::sync::Arc;
use std::sync::Mutex;
use std::task::Poll;
use std::time::Duration;

use md5::{Digest, Md5};
use num_bigint::BigUint;
use pki_types::{CertificateDer, ServerName, UnixTime};
use ring::{agreement, digest};

use tls_handshake::client::{ClientConfig, ClientHandshake, Progress};
use tls_handshake::crypto::{CryptoProvider, GetRandomFailed, RsaKeyExchange, SecureRandom};
use tls_handshake::msgs::base::{Payload, PayloadU16, PayloadU8};
use tls_handshake::msgs::codec::{Codec, Reader};
use tls_handshake::msgs::enums::{
    AlertLevel, ClientCertificateType, Compression, ExtensionType, NamedGroup,
};
use tls_handshake::msgs::handshake::{
    CertificatePayload, CertificateRequestPayload, CertificateStatus, ChannelIdPayload,
    ClientExtension, ClientHelloPayload, ClientSessionTicket,
    HandshakeMessagePayload, HandshakePayload, NewSessionTicketPayload, ProtocolName, Random,
    ServerDhParams, ServerEcdhParams, ServerExtension, ServerHelloPayload,
    ServerKeyExchangePayload, SessionId,
};
use tls_handshake::msgs::message::{Message, PlainMessage};
use tls_handshake::suites::{self, Authentication, SupportedCipherSuite};
use tls_handshake::tls12::{ConnectionRandoms, DirectionalKeys, KeyScheduler, MasterSecretInput};
use tls_handshake::verify::{
    DigitallySignedStruct, HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier,
    VerifyTicket,
};
use tls_handshake::{
    AlertDescription, CertificateError, CipherSuite, ContentType, Error, HandshakeType,
    ProtocolVersion, SessionCache, SignatureScheme,
};

pub const SERVER_NAME: &str = "example.com";
pub const SERVER_CERT: &[u8] = b"server end-entity certificate";

// RFC 2409 Oakley group 2 (1024-bit MODP)
const OAKLEY_GROUP_2: &str = "FFFFFFFFFFFFFFFFC90FDAA22168C234C4C6628B80DC1CD1\
                              29024E088A67CC74020BBEA63B139B22514A08798E3404DD\
                              EF9519B3CD3A431B302B0A6DF25F14374FE1356D6D51C245\
                              E485B576625E7EC6F44C42E9A637ED6B0BFF5CB6F406B7ED\
                              EE386BFB5A899FA5AE9F24117C4B1FE649286651ECE65381\
                              FFFFFFFFFFFFFFFF";

pub fn init_logging() {
    let _ = env_logger::builder()
        .is_test(true)
        .try_init();
}

/// Predictable "randomness": a counter.
#[derive(Debug)]
pub struct CountingRandom(AtomicU8);

impl SecureRandom for CountingRandom {
    fn fill(&self, buf: &mut [u8]) -> Result<(), GetRandomFailed> {
        for byte in buf.iter_mut() {
            *byte = self.0.fetch_add(1, Ordering::Relaxed);
        }
        Ok(())
    }
}

pub static COUNTING_RANDOM: CountingRandom = CountingRandom(AtomicU8::new(1));

#[derive(Debug)]
pub struct BrokenRandom;

impl SecureRandom for BrokenRandom {
    fn fill(&self, _buf: &mut [u8]) -> Result<(), GetRandomFailed> {
        Err(GetRandomFailed)
    }
}

pub static BROKEN_RANDOM: BrokenRandom = BrokenRandom;

/// "Encrypts" the pre-master secret by sending it as it is, so the test
/// server can read it back.
#[derive(Debug)]
pub struct TransparentRsa;

impl RsaKeyExchange for TransparentRsa {
    fn encrypt_premaster(&self, end_entity_der: &[u8], premaster: &[u8]) -> Result<Vec<u8>, Error> {
        assert_eq!(end_entity_der, SERVER_CERT);
        Ok(premaster.to_vec())
    }
}

pub fn provider() -> CryptoProvider {
    let mut provider = tls_handshake::crypto::ring::default_provider();
    provider.rsa_kx = Some(Arc::new(TransparentRsa));
    provider.secure_random = &COUNTING_RANDOM;
    provider
}

#[derive(Clone, Debug, PartialEq)]
pub struct VerifyRequest {
    pub server_name: ServerName<'static>,
    pub chain_len: usize,
    pub ocsp_response: Vec<u8>,
    pub scts: Vec<u8>,
}

/// A certificate verifier that accepts (or refuses) everything, after
/// optionally making the handshake wait.
#[derive(Debug, Default)]
pub struct MockVerifier {
    pub pending_polls: AtomicUsize,
    pub chain_error: Option<CertificateError>,
    pub reject_signatures: bool,
    pub requests: Mutex<Vec<VerifyRequest>>,
    pub signatures_checked: AtomicUsize,
}

impl MockVerifier {
    pub fn pending_for(polls: usize) -> Self {
        Self {
            pending_polls: AtomicUsize::new(polls),
            ..Self::default()
        }
    }

    pub fn failing(err: CertificateError) -> Self {
        Self {
            chain_error: Some(err),
            ..Self::default()
        }
    }

    pub fn requests(&self) -> Vec<VerifyRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn check_signature(&self) -> Result<HandshakeSignatureValid, Error> {
        self.signatures_checked
            .fetch_add(1, Ordering::SeqCst);
        match self.reject_signatures {
            true => Err(Error::InvalidCertificate(CertificateError::BadSignature)),
            false => Ok(HandshakeSignatureValid::assertion()),
        }
    }
}

impl ServerCertVerifier for MockVerifier {
    fn begin_verify(
        &self,
        end_entity: &CertificateDer<'_>,
        intermediates: &[CertificateDer<'_>],
        server_name: &ServerName<'_>,
        ocsp_response: &[u8],
        scts: &[u8],
        _now: UnixTime,
    ) -> Result<VerifyTicket, Error> {
        assert_eq!(end_entity.as_ref(), SERVER_CERT);
        self.requests
            .lock()
            .unwrap()
            .push(VerifyRequest {
                server_name: server_name.to_owned(),
                chain_len: 1 + intermediates.len(),
                ocsp_response: ocsp_response.to_vec(),
                scts: scts.to_vec(),
            });
        Ok(VerifyTicket::new(7))
    }

    fn poll(&self, ticket: &VerifyTicket) -> Poll<Result<ServerCertVerified, Error>> {
        assert_eq!(ticket.id(), 7);
        let waiting = self.pending_polls.load(Ordering::SeqCst);
        if waiting > 0 {
            self.pending_polls
                .store(waiting - 1, Ordering::SeqCst);
            return Poll::Pending;
        }

        match &self.chain_error {
            Some(err) => Poll::Ready(Err(Error::InvalidCertificate(err.clone()))),
            None => Poll::Ready(Ok(ServerCertVerified::new(
                false,
                vec![b"server key hash".to_vec()],
            ))),
        }
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, Error> {
        self.check_signature()
    }

    fn verify_legacy_signature(
        &self,
        _digest: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, Error> {
        self.check_signature()
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        vec![
            SignatureScheme::RSA_PKCS1_SHA256,
            SignatureScheme::ECDSA_NISTP256_SHA256,
        ]
    }
}

pub fn make_client_config() -> ClientConfig {
    make_client_config_with_verifier(Arc::new(MockVerifier::default()))
}

pub fn make_client_config_with_verifier(verifier: Arc<dyn ServerCertVerifier>) -> ClientConfig {
    ClientConfig::new(provider(), verifier)
        .with_session_cache(Arc::new(SessionCache::new(32, Duration::from_secs(3600))))
}

/// An in-memory transport: what the server says waits in `incoming`,
/// what the client says lands in `outgoing`.
#[derive(Debug, Default)]
pub struct Pipe {
    pub incoming: VecDeque<PlainMessage>,
    pub outgoing: Vec<PlainMessage>,
    pub read_keys: Option<DirectionalKeys>,
    pub write_keys: Option<DirectionalKeys>,
    /// Records written after the write keys were installed.
    pub protected_writes: usize,
    pub eof: bool,
    /// Deliver one record per `advance()`, blocking in between.
    pub trickle: bool,
    blocked: bool,
}

impl tls_handshake::RecordTransport for Pipe {
    fn read_record(&mut self) -> io::Result<PlainMessage> {
        if self.trickle {
            self.blocked = !self.blocked;
            if !self.blocked {
                return Err(io::ErrorKind::WouldBlock.into());
            }
        }

        match self.incoming.pop_front() {
            Some(record) => Ok(record),
            None if self.eof => Err(io::ErrorKind::UnexpectedEof.into()),
            None => Err(io::ErrorKind::WouldBlock.into()),
        }
    }

    fn write_record(&mut self, record: &PlainMessage) -> io::Result<()> {
        if self.write_keys.is_some() {
            self.protected_writes += 1;
        }
        self.outgoing.push(record.clone());
        Ok(())
    }

    fn install_read_keys(&mut self, keys: DirectionalKeys) {
        self.read_keys = Some(keys);
    }

    fn install_write_keys(&mut self, keys: DirectionalKeys) {
        self.write_keys = Some(keys);
    }
}

pub fn server_name() -> ServerName<'static> {
    ServerName::try_from(SERVER_NAME).unwrap()
}

pub fn make_client(config: &Arc<ClientConfig>) -> ClientHandshake<Pipe> {
    ClientHandshake::new(Arc::clone(config), server_name(), Pipe::default(), None).unwrap()
}

pub fn make_resuming_client(config: &Arc<ClientConfig>, previous: &ClientHandshake<Pipe>) -> ClientHandshake<Pipe> {
    let session = previous.session().cloned();
    assert!(session.is_some());
    ClientHandshake::new(Arc::clone(config), server_name(), Pipe::default(), session).unwrap()
}

/// Move records both ways until the client is established.
pub fn do_handshake(client: &mut ClientHandshake<Pipe>, server: &mut TestServer) -> Result<(), Error> {
    for _ in 0..10_000 {
        let progress = client.advance()?;
        transfer(client, server);
        if progress == Progress::Established && client.get_ref().incoming.is_empty() {
            return Ok(());
        }
    }

    panic!("handshake made no progress");
}

pub fn do_handshake_until_error(client: &mut ClientHandshake<Pipe>, server: &mut TestServer) -> Error {
    match do_handshake(client, server) {
        Ok(()) => panic!("handshake unexpectedly succeeded"),
        Err(err) => {
            transfer(client, server);
            err
        }
    }
}

/// Like `transfer`, but split each server handshake record into one-byte
/// records.
pub fn transfer_fragmented(client: &mut ClientHandshake<Pipe>, server: &mut TestServer) {
    let sent = mem::take(&mut client.get_mut().outgoing);
    for record in server.receive(sent) {
        if record.typ != ContentType::Handshake {
            client.get_mut().incoming.push_back(record);
            continue;
        }

        for byte in record.payload.0 {
            client
                .get_mut()
                .incoming
                .push_back(PlainMessage {
                    typ: record.typ,
                    version: record.version,
                    payload: Payload::new(vec![byte]),
                });
        }
    }
}

pub fn transfer(client: &mut ClientHandshake<Pipe>, server: &mut TestServer) {
    let sent = mem::take(&mut client.get_mut().outgoing);
    let replies = server.receive(sent);
    client
        .get_mut()
        .incoming
        .extend(replies);
}

pub fn handshake_types(records: &[PlainMessage]) -> Vec<HandshakeType> {
    records
        .iter()
        .filter(|r| r.typ == ContentType::Handshake)
        .map(|r| HandshakeType::from(r.payload.0[0]))
        .collect()
}

/// How the scripted server behaves.
#[derive(Clone, Debug)]
pub struct ServerOptions {
    pub version: ProtocolVersion,
    pub suite: &'static SupportedCipherSuite,
    /// The id given to new sessions; empty for none.
    pub session_id: Vec<u8>,
    pub renegotiation_info: bool,
    pub extended_ms: bool,
    /// Issue this ticket when the client asks for one.
    pub ticket: Option<Vec<u8>>,
    pub ocsp_response: Option<Vec<u8>>,
    pub scts: Option<Vec<u8>>,
    pub alpn: Option<Vec<u8>>,
    pub npn: Option<Vec<Vec<u8>>>,
    pub channel_id: bool,
    pub client_auth: bool,
    pub psk: Option<(Vec<u8>, Vec<u8>)>,
    pub psk_hint: Option<Vec<u8>>,
    pub resumption: bool,
    pub extra_extensions: Vec<ServerExtension>,
    pub corrupt_finished: bool,
    pub dh_prime: Vec<u8>,
    /// Abort with this fatal alert straight after ServerHello.
    pub abort_after_hello: Option<AlertDescription>,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            version: ProtocolVersion::TLSv1_2,
            suite: &suites::TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256,
            session_id: vec![0x5a; 32],
            renegotiation_info: true,
            extended_ms: false,
            ticket: None,
            ocsp_response: None,
            scts: None,
            alpn: None,
            npn: None,
            channel_id: false,
            client_auth: false,
            psk: None,
            psk_hint: None,
            resumption: true,
            extra_extensions: Vec::new(),
            corrupt_finished: false,
            abort_after_hello: None,
            dh_prime: BigUint::parse_bytes(OAKLEY_GROUP_2.as_bytes(), 16)
                .unwrap()
                .to_bytes_be(),
        }
    }
}

#[derive(Default)]
struct ServerHandshake {
    transcript: Vec<u8>,
    randoms: Option<ConnectionRandoms>,
    resuming: bool,
    master: Option<Vec<u8>>,
    extended_ms: bool,
    issue_ticket: bool,
    session_id: Vec<u8>,
    ecdh: Option<agreement::EphemeralPrivateKey>,
    dh_exponent: Option<BigUint>,
    server_verify: Vec<u8>,
}

/// Just enough of a TLS server to hold up the other end of a handshake.
/// Records arrive and leave in the clear.
pub struct TestServer {
    pub options: ServerOptions,
    sessions: HashMap<Vec<u8>, Vec<u8>>,
    tickets: HashMap<Vec<u8>, Vec<u8>>,
    hs: ServerHandshake,
    /// (client, server) verify data of the last completed handshake.
    pub verify_data: Option<(Vec<u8>, Vec<u8>)>,
    pub client_hellos: Vec<ClientHelloPayload>,
    pub received: Vec<HandshakeType>,
    pub received_ccs: usize,
    pub alerts: Vec<Vec<u8>>,
    pub client_certificate: Option<CertificatePayload>,
    pub next_protocol: Option<Vec<u8>>,
    pub channel_id: Option<ChannelIdPayload>,
    pub client_finished_ok: Option<bool>,
    pub renegotiation_info_ok: Option<bool>,
    pub resumed: bool,
}

impl TestServer {
    pub fn new(options: ServerOptions) -> Self {
        Self {
            options,
            sessions: HashMap::new(),
            tickets: HashMap::new(),
            hs: ServerHandshake::default(),
            verify_data: None,
            client_hellos: Vec::new(),
            received: Vec::new(),
            received_ccs: 0,
            alerts: Vec::new(),
            client_certificate: None,
            next_protocol: None,
            channel_id: None,
            client_finished_ok: None,
            renegotiation_info_ok: None,
            resumed: false,
        }
    }

    /// A server for another connection, sharing this one's sessions.
    pub fn fork(&self) -> Self {
        let mut server = Self::new(self.options.clone());
        server.sessions = self.sessions.clone();
        server.tickets = self.tickets.clone();
        server
    }

    /// Forget the connection, keeping the session store.
    pub fn new_connection(&mut self) {
        self.hs = ServerHandshake::default();
        self.verify_data = None;
        self.resumed = false;
        self.client_finished_ok = None;
        self.renegotiation_info_ok = None;
    }

    pub fn hello_request(&self) -> PlainMessage {
        self.message(HandshakeMessagePayload {
            typ: HandshakeType::HelloRequest,
            payload: HandshakePayload::HelloRequest,
        })
    }

    pub fn last_client_hello(&self) -> &ClientHelloPayload {
        self.client_hellos.last().unwrap()
    }

    pub fn receive(&mut self, records: Vec<PlainMessage>) -> Vec<PlainMessage> {
        let mut out = Vec::new();
        for record in records {
            match record.typ {
                ContentType::Handshake => self.handshake(&record.payload.0, &mut out),
                ContentType::ChangeCipherSpec => self.received_ccs += 1,
                ContentType::Alert => self.alerts.push(record.payload.0.clone()),
                _ => {}
            }
        }
        out
    }

    fn handshake(&mut self, bytes: &[u8], out: &mut Vec<PlainMessage>) {
        let parsed =
            HandshakeMessagePayload::read_version(&mut Reader::init(bytes), self.options.version)
                .unwrap();
        self.received.push(parsed.typ);

        match parsed.payload {
            HandshakePayload::ClientHello(hello) => self.client_hello(bytes, hello, out),
            HandshakePayload::Certificate(chain) => {
                self.hs.transcript.extend_from_slice(bytes);
                self.client_certificate = Some(chain);
            }
            HandshakePayload::ClientKeyExchange(body) => {
                self.hs.transcript.extend_from_slice(bytes);
                self.client_kx(&body.0);
            }
            HandshakePayload::NextProtocol(np) => {
                self.hs.transcript.extend_from_slice(bytes);
                self.next_protocol = Some(np.protocol.0);
            }
            HandshakePayload::ChannelId(cid) => {
                self.hs.transcript.extend_from_slice(bytes);
                self.channel_id = Some(cid);
            }
            HandshakePayload::Finished(fin) => self.client_finished(bytes, &fin.0, out),
            _ => self.hs.transcript.extend_from_slice(bytes),
        }
    }

    fn client_hello(&mut self, bytes: &[u8], hello: ClientHelloPayload, out: &mut Vec<PlainMessage>) {
        let previous = self.verify_data.clone();
        self.hs = ServerHandshake::default();
        self.hs.transcript.extend_from_slice(bytes);
        self.client_hellos.push(hello.clone());

        let server_random = [0x42u8; 32];
        self.hs.randoms = Some(ConnectionRandoms {
            client: hello.random.0,
            server: server_random,
        });

        self.renegotiation_info_ok = Some(match &previous {
            Some((client, _)) => hello.renegotiation_info() == Some(client.as_slice()),
            None => {
                hello.renegotiation_info() == Some(&[][..])
                    || hello
                        .cipher_suites
                        .contains(&CipherSuite::TLS_EMPTY_RENEGOTIATION_INFO_SCSV)
            }
        });

        let offered_ticket = match hello.find_extension(ExtensionType::SessionTicket) {
            Some(ClientExtension::SessionTicket(ClientSessionTicket::Offer(ticket))) => {
                Some(ticket.0.clone())
            }
            _ => None,
        };
        let stored = match self.options.resumption {
            true => offered_ticket
                .as_ref()
                .and_then(|ticket| self.tickets.get(ticket))
                .or_else(|| self.sessions.get(hello.session_id.as_ref()))
                .cloned(),
            false => None,
        };

        self.hs.resuming = stored.is_some();
        self.resumed = self.hs.resuming;
        self.hs.session_id = match self.hs.resuming {
            true => hello.session_id.as_ref().to_vec(),
            false => self.options.session_id.clone(),
        };
        self.hs.master = stored;
        self.hs.extended_ms = self.options.extended_ms
            && hello
                .find_extension(ExtensionType::ExtendedMasterSecret)
                .is_some();
        self.hs.issue_ticket = self.options.ticket.is_some()
            && hello
                .find_extension(ExtensionType::SessionTicket)
                .is_some();

        let mut extensions = Vec::new();
        if self.options.renegotiation_info {
            let mut binding = Vec::new();
            if let Some((client, server)) = &previous {
                binding.extend_from_slice(client);
                binding.extend_from_slice(server);
            }
            extensions.push(ServerExtension::RenegotiationInfo(PayloadU8::new(binding)));
        }
        if self.hs.extended_ms {
            extensions.push(ServerExtension::ExtendedMasterSecretAck);
        }
        if self.hs.issue_ticket {
            extensions.push(ServerExtension::SessionTicketAck);
        }
        let staple = !self.hs.resuming
            && self.options.ocsp_response.is_some()
            && hello
                .find_extension(ExtensionType::StatusRequest)
                .is_some();
        if staple {
            extensions.push(ServerExtension::CertificateStatusAck);
        }
        if let Some(scts) = &self.options.scts {
            if hello.find_extension(ExtensionType::SCT).is_some() {
                extensions.push(ServerExtension::SignedCertificateTimestamp(Payload::new(
                    scts.clone(),
                )));
            }
        }
        if let Some(alpn) = &self.options.alpn {
            extensions.push(ServerExtension::make_alpn(alpn));
        }
        if let Some(npn) = &self.options.npn {
            if hello
                .find_extension(ExtensionType::NextProtocolNegotiation)
                .is_some()
            {
                extensions.push(ServerExtension::NextProtocols(
                    npn.iter()
                        .map(|p| ProtocolName::from(p.clone()))
                        .collect(),
                ));
            }
        }
        if self.options.channel_id {
            if hello
                .find_extension(ExtensionType::ChannelIdNew)
                .is_some()
            {
                extensions.push(ServerExtension::ChannelIdNewAck);
            } else if hello
                .find_extension(ExtensionType::ChannelId)
                .is_some()
            {
                extensions.push(ServerExtension::ChannelIdAck);
            }
        }
        extensions.extend(self.options.extra_extensions.iter().cloned());

        self.send(
            HandshakeMessagePayload {
                typ: HandshakeType::ServerHello,
                payload: HandshakePayload::ServerHello(ServerHelloPayload {
                    server_version: self.options.version,
                    random: Random::from(server_random),
                    session_id: SessionId::new(&self.hs.session_id).unwrap(),
                    cipher_suite: self.options.suite.suite,
                    compression_method: Compression::Null,
                    extensions,
                }),
            },
            out,
        );

        if let Some(desc) = self.options.abort_after_hello {
            out.push(PlainMessage::from(Message::build_alert(
                self.options.version,
                AlertLevel::Fatal,
                desc,
            )));
            return;
        }

        if self.hs.resuming {
            self.finish_flight(out);
            return;
        }

        let suite = self.options.suite;
        if suite.server_sends_certificate() {
            self.send(
                HandshakeMessagePayload {
                    typ: HandshakeType::Certificate,
                    payload: HandshakePayload::Certificate(vec![CertificateDer::from(
                        SERVER_CERT.to_vec(),
                    )]),
                },
                out,
            );
        }

        if staple {
            let ocsp = self.options.ocsp_response.clone().unwrap();
            self.send(
                HandshakeMessagePayload {
                    typ: HandshakeType::CertificateStatus,
                    payload: HandshakePayload::CertificateStatus(CertificateStatus::new(ocsp)),
                },
                out,
            );
        }

        if let Some(skx) = self.server_kx() {
            self.send(
                HandshakeMessagePayload {
                    typ: HandshakeType::ServerKeyExchange,
                    payload: HandshakePayload::ServerKeyExchange(ServerKeyExchangePayload(
                        Payload::new(skx),
                    )),
                },
                out,
            );
        }

        if self.options.client_auth {
            let sigschemes = match self.options.version >= ProtocolVersion::TLSv1_2 {
                true => vec![
                    SignatureScheme::RSA_PKCS1_SHA256,
                    SignatureScheme::ECDSA_NISTP256_SHA256,
                ],
                false => Vec::new(),
            };
            self.send(
                HandshakeMessagePayload {
                    typ: HandshakeType::CertificateRequest,
                    payload: HandshakePayload::CertificateRequest(CertificateRequestPayload {
                        certtypes: vec![
                            ClientCertificateType::RSASign,
                            ClientCertificateType::ECDSASign,
                        ],
                        sigschemes,
                        canames: Vec::new(),
                    }),
                },
                out,
            );
        }

        self.send(
            HandshakeMessagePayload {
                typ: HandshakeType::ServerHelloDone,
                payload: HandshakePayload::ServerHelloDone,
            },
            out,
        );
    }

    /// The ServerKeyExchange body for the configured suite, if it has one.
    fn server_kx(&mut self) -> Option<Vec<u8>> {
        use tls_handshake::crypto::KeyExchangeAlgorithm::*;

        let suite = self.options.suite;
        let mut body = Vec::new();

        match suite.kx {
            Psk | EcdhePsk => {
                let hint = self.options.psk_hint.clone();
                if suite.kx == Psk && hint.is_none() {
                    return None;
                }
                PayloadU16::new(hint.unwrap_or_default()).encode(&mut body);
            }
            Rsa => return None,
            _ => {}
        }

        match suite.kx {
            Ecdhe | EcdhePsk | EcdhAnon => {
                let rng = ring::rand::SystemRandom::new();
                let key = agreement::EphemeralPrivateKey::generate(&agreement::X25519, &rng).unwrap();
                let public = key.compute_public_key().unwrap();
                ServerEcdhParams::new(NamedGroup::X25519, public.as_ref()).encode(&mut body);
                self.hs.ecdh = Some(key);
            }
            Dhe | DhAnon => {
                let p = BigUint::from_bytes_be(&self.options.dh_prime);
                let exponent = BigUint::from_bytes_be(&[7u8; 32]);
                let public = BigUint::from(2u8).modpow(&exponent, &p);
                ServerDhParams {
                    dh_p: PayloadU16::new(self.options.dh_prime.clone()),
                    dh_g: PayloadU16::new(vec![2]),
                    dh_Ys: PayloadU16::new(public.to_bytes_be()),
                }
                .encode(&mut body);
                self.hs.dh_exponent = Some(exponent);
            }
            _ => {}
        }

        let scheme = match (suite.auth, self.options.version >= ProtocolVersion::TLSv1_2) {
            (Authentication::Rsa, true) => Some(SignatureScheme::RSA_PKCS1_SHA256),
            (Authentication::Ecdsa, true) => Some(SignatureScheme::ECDSA_NISTP256_SHA256),
            (Authentication::Rsa | Authentication::Ecdsa, false) => None,
            _ => return Some(body),
        };
        match scheme {
            Some(scheme) => {
                DigitallySignedStruct::new(scheme, b"server signature".to_vec()).encode(&mut body)
            }
            None => PayloadU16::new(b"legacy signature".to_vec()).encode(&mut body),
        }
        Some(body)
    }

    fn client_kx(&mut self, body: &[u8]) {
        use tls_handshake::crypto::KeyExchangeAlgorithm::*;

        let suite = self.options.suite;
        let mut rd = Reader::init(body);

        let psk = match suite.kx.uses_psk() {
            true => {
                let identity = PayloadU16::read(&mut rd).unwrap();
                let (expected, key) = self.options.psk.clone().unwrap();
                assert_eq!(identity.0, expected);
                Some(key)
            }
            false => None,
        };

        let other = match suite.kx {
            Rsa => PayloadU16::read(&mut rd).unwrap().0,
            Ecdhe | EcdhePsk | EcdhAnon => {
                let point = PayloadU8::read(&mut rd).unwrap();
                let key = self.hs.ecdh.take().unwrap();
                agreement::agree_ephemeral(
                    key,
                    &agreement::UnparsedPublicKey::new(&agreement::X25519, &point.0),
                    |secret| secret.to_vec(),
                )
                .unwrap()
            }
            Dhe | DhAnon => {
                let peer = BigUint::from_bytes_be(&PayloadU16::read(&mut rd).unwrap().0);
                let p = BigUint::from_bytes_be(&self.options.dh_prime);
                peer.modpow(self.hs.dh_exponent.as_ref().unwrap(), &p)
                    .to_bytes_be()
            }
            Psk => vec![0u8; psk.as_ref().unwrap().len()],
        };

        let pre_master = match psk {
            Some(key) => {
                let mut pms = Vec::new();
                PayloadU16::new(other).encode(&mut pms);
                PayloadU16::new(key).encode(&mut pms);
                pms
            }
            None => other,
        };

        let session_hash = match self.hs.extended_ms {
            true => Some(self.transcript_hash()),
            false => None,
        };
        let keys = KeyScheduler::derive(
            MasterSecretInput::PreMaster {
                pre_master: &pre_master,
                session_hash: session_hash.as_deref(),
            },
            self.hs.randoms.as_ref().unwrap(),
            suite,
            self.options.version,
        );
        self.hs.master = Some(
            keys.master_secret()
                .as_bytes()
                .to_vec(),
        );
    }

    fn client_finished(&mut self, bytes: &[u8], verify_data: &[u8], out: &mut Vec<PlainMessage>) {
        let expected = self.verify_data_for(b"client finished");
        self.client_finished_ok = Some(expected == verify_data);
        self.hs.transcript.extend_from_slice(bytes);

        if self.hs.resuming {
            self.verify_data = Some((expected, self.hs.server_verify.clone()));
            return;
        }

        let master = self.hs.master.clone().unwrap();
        if !self.hs.session_id.is_empty() {
            self.sessions
                .insert(self.hs.session_id.clone(), master);
        }
        self.finish_flight(out);
        self.verify_data = Some((expected, self.hs.server_verify.clone()));
    }

    /// NewSessionTicket if promised, then ChangeCipherSpec and Finished.
    fn finish_flight(&mut self, out: &mut Vec<PlainMessage>) {
        if self.hs.issue_ticket {
            let ticket = self.options.ticket.clone().unwrap();
            self.tickets
                .insert(ticket.clone(), self.hs.master.clone().unwrap());
            self.send(
                HandshakeMessagePayload {
                    typ: HandshakeType::NewSessionTicket,
                    payload: HandshakePayload::NewSessionTicket(NewSessionTicketPayload::new(
                        300, ticket,
                    )),
                },
                out,
            );
        }

        out.push(PlainMessage::from(Message::build_ccs(self.options.version)));

        let mut verify_data = self.verify_data_for(b"server finished");
        self.hs.server_verify = verify_data.clone();
        if self.options.corrupt_finished {
            verify_data[0] ^= 1;
        }
        self.send(HandshakeMessagePayload::build_finished(&verify_data), out);
    }

    fn verify_data_for(&self, label: &[u8]) -> Vec<u8> {
        KeyScheduler::verify_data(
            self.hs.master.as_ref().unwrap(),
            self.options.suite,
            self.options.version,
            label,
            &self.transcript_hash(),
        )
        .to_vec()
    }

    fn transcript_hash(&self) -> Vec<u8> {
        let data = &self.hs.transcript;
        if self.options.version >= ProtocolVersion::TLSv1_2 {
            let alg = match self.options.suite.prf {
                tls_handshake::crypto::hash::HashAlgorithm::SHA384 => &digest::SHA384,
                _ => &digest::SHA256,
            };
            return digest::digest(alg, data).as_ref().to_vec();
        }

        let mut out = Md5::digest(data).to_vec();
        out.extend_from_slice(digest::digest(&digest::SHA1_FOR_LEGACY_USE_ONLY, data).as_ref());
        out
    }

    fn message(&self, payload: HandshakeMessagePayload) -> PlainMessage {
        PlainMessage::from(Message::build_handshake(self.options.version, payload))
    }

    fn send(&mut self, payload: HandshakeMessagePayload, out: &mut Vec<PlainMessage>) {
        let record = self.message(payload);
        self.hs
            .transcript
            .extend_from_slice(&record.payload.0);
        out.push(record);
    }
}
