use std::sync::Arc;

use pki_types::ServerName;

use super::context::ConnectionContext;
use crate::crypto::KeyExchangeAlgorithm;
use crate::enums::{CipherSuite, HandshakeType, ProtocolVersion};
use crate::error::{Error, InvalidMessage, PeerIncompatible, PeerMisbehaved};
use crate::hash_hs::transcript_hash_for;
#[cfg(feature = "logging")]
use crate::log::{debug, trace, warn};
use crate::msgs::base::{Payload, PayloadU8};
use crate::msgs::enums::{Compression, ECPointFormat, ExtensionType};
use crate::msgs::handshake::{
    ClientExtension, ClientHelloPayload, ClientSessionTicket, ConvertProtocolNameList,
    HandshakeMessagePayload, HandshakePayload, Random, ServerExtension, ServerHelloPayload,
    SessionId,
};
use crate::msgs::message::Message;
use crate::session::Session;
use crate::suites::{self, SupportedCipherSuite};
use crate::tls12::{KeyScheduler, MasterSecretInput};

/// Pick the session to offer, if the caller's candidate is still usable
/// with this configuration.
fn find_session(
    cx: &ConnectionContext,
    offered_suites: &[&'static SupportedCipherSuite],
) -> Result<Option<Arc<Session>>, Error> {
    let session = match &cx.resume {
        Some(session) => session,
        None => return Ok(None),
    };

    let now = cx.config.current_time()?;
    let usable = session.is_resumable()
        && !session.has_expired(now, cx.config.session_timeout())
        && cx.config.supports_version(session.version())
        && offered_suites.contains(&session.suite());

    if !usable {
        debug!("Not resuming {:?}", session);
        return Ok(None);
    }

    Ok(Some(Arc::clone(session)))
}

fn offers_ec_suite(suites: &[&'static SupportedCipherSuite]) -> bool {
    suites.iter().any(|scs| {
        matches!(
            scs.kx,
            KeyExchangeAlgorithm::Ecdhe
                | KeyExchangeAlgorithm::EcdhePsk
                | KeyExchangeAlgorithm::EcdhAnon
        )
    })
}

/// Build our ClientHello, record what it offered, and queue it.
pub(super) fn emit_client_hello(cx: &mut ConnectionContext) -> Result<(), Error> {
    let config = Arc::clone(&cx.config);
    let max_version = cx.offered.version;
    let renegotiating = cx.is_renegotiation();

    let offered_suites = config.offered_suites(max_version);
    if offered_suites.is_empty() {
        return Err(Error::General(format!(
            "no cipher suites enabled for {:?}",
            max_version
        )));
    }

    let resuming = match renegotiating {
        true => None,
        false => find_session(cx, &offered_suites)?,
    };
    match &resuming {
        Some(_) => debug!("Resuming session"),
        None => debug!("Not resuming any session"),
    }

    let random = Random::new(config.provider.secure_random)?;
    cx.randoms.client = random.0;

    let session_id = resuming
        .as_ref()
        .map(|session| session.id().clone())
        .unwrap_or_else(SessionId::empty);

    let mut exts = Vec::new();
    if let (ServerName::DnsName(dns_name), true) = (&cx.server_name, config.enable_sni) {
        exts.push(ClientExtension::make_sni(dns_name.as_ref()));
    }

    if renegotiating {
        exts.push(ClientExtension::RenegotiationInfo(PayloadU8::new(
            cx.finished.client.clone(),
        )));
    }

    if config.enable_tickets && !renegotiating {
        let ticket = resuming
            .as_ref()
            .and_then(|session| session.ticket())
            .map(|ticket| ticket.ticket.clone());
        exts.push(ClientExtension::SessionTicket(match &ticket {
            Some(ticket) => ClientSessionTicket::Offer(Payload::new(ticket.clone())),
            None => ClientSessionTicket::Request,
        }));
        cx.offered.ticket = ticket;
    }

    if max_version >= ProtocolVersion::TLSv1_2 {
        let sigschemes = config.verifier.supported_verify_schemes();
        exts.push(ClientExtension::SignatureAlgorithms(sigschemes.clone()));
        cx.offered.sigschemes = sigschemes;
    }

    if config.enable_ocsp_stapling {
        exts.push(ClientExtension::CertificateStatusRequest);
    }

    if config.next_protocol_selector.is_some() && !renegotiating {
        exts.push(ClientExtension::NextProtocolNegotiation);
    }

    if config.enable_signed_cert_timestamps {
        exts.push(ClientExtension::SignedCertificateTimestampRequest);
    }

    if !config.alpn_protocols.is_empty() && !renegotiating {
        exts.push(ClientExtension::Protocols(Vec::from_slices(
            &config.alpn_protocols,
        )));
        cx.offered.alpn_protocols = config.alpn_protocols.clone();
    }

    if config.channel_id.is_some() && !renegotiating {
        exts.push(match config.channel_id_new {
            true => ClientExtension::ChannelIdNewRequest,
            false => ClientExtension::ChannelIdRequest,
        });
    }

    if config.enable_extended_master_secret {
        exts.push(ClientExtension::ExtendedMasterSecretRequest);
    }

    if offers_ec_suite(&offered_suites) {
        let groups: Vec<_> = config
            .provider
            .kx_groups
            .iter()
            .map(|group| group.name())
            .collect();
        exts.push(ClientExtension::EcPointFormats(vec![
            ECPointFormat::Uncompressed,
        ]));
        exts.push(ClientExtension::NamedGroups(groups.clone()));
        cx.offered.groups = groups;
    }

    let mut cipher_suites: Vec<CipherSuite> = offered_suites
        .iter()
        .map(|scs| scs.suite)
        .collect();
    if !renegotiating {
        cipher_suites.push(CipherSuite::TLS_EMPTY_RENEGOTIATION_INFO_SCSV);
    }
    if config.fallback_scsv {
        cipher_suites.push(CipherSuite::TLS_FALLBACK_SCSV);
    }

    cx.offered.extensions = exts
        .iter()
        .map(ClientExtension::ext_type)
        .collect();
    if !renegotiating {
        // the SCSV stands in for the extension
        cx.offered
            .extensions
            .push(ExtensionType::RenegotiationInfo);
    }
    cx.offered.suites = cipher_suites.clone();
    cx.offered.session_id = session_id.clone();
    cx.resume = resuming;

    if config
        .client_auth_cert_resolver
        .has_certs()
    {
        cx.transcript.set_client_auth_enabled();
    }

    let ch = HandshakeMessagePayload {
        typ: HandshakeType::ClientHello,
        payload: HandshakePayload::ClientHello(ClientHelloPayload {
            client_version: max_version,
            random,
            session_id,
            cipher_suites,
            compression_methods: vec![Compression::Null],
            extensions: exts,
        }),
    };

    trace!("Sending ClientHello {:#?}", ch);
    cx.emit_handshake(ch);
    Ok(())
}

/// Check the ServerHello against what we offered, and fix the version,
/// suite and (if it resumes) the keys.
pub(super) fn handle_server_hello(cx: &mut ConnectionContext, m: &Message) -> Result<(), Error> {
    let server_hello =
        require_handshake_msg!(m, HandshakeType::ServerHello, HandshakePayload::ServerHello)?;
    trace!("We got ServerHello {:#?}", server_hello);

    let config = Arc::clone(&cx.config);
    let version = server_hello.server_version;

    if !config.supports_version(version) || version > cx.offered.version {
        return Err(PeerIncompatible::ServerTlsVersionIsDisabledByOurConfig.into());
    }

    if cx.is_renegotiation() && cx.version != Some(version) {
        return Err(PeerMisbehaved::VersionChangedDuringRenegotiation.into());
    }

    if config.fallback_scsv && version < cx.offered.version {
        warn!(
            "Server chose {:?} on a fallback connection offering {:?}",
            version, cx.offered.version
        );
        return Err(PeerMisbehaved::InappropriateFallback.into());
    }

    if server_hello.compression_method != Compression::Null {
        return Err(PeerMisbehaved::SelectedUnofferedCompression.into());
    }

    let suite = suites::lookup_by_id(server_hello.cipher_suite)
        .ok_or(PeerMisbehaved::SelectedUnknownCipherSuite)?;
    if !cx.offered.suites.contains(&suite.suite) {
        return Err(PeerMisbehaved::SelectedUnofferedCipherSuite.into());
    }
    if !suite.usable_for_version(version) {
        return Err(PeerMisbehaved::SelectedUnusableCipherSuiteForVersion.into());
    }

    if server_hello.has_duplicate_extension() {
        return Err(PeerMisbehaved::DuplicateServerHelloExtensions.into());
    }
    if let Some(ext) = server_hello
        .extensions
        .iter()
        .find(|ext| !cx.offered.sent(ext.ext_type()))
    {
        warn!("Server sent unsolicited extension {:?}", ext.ext_type());
        return Err(PeerMisbehaved::UnsolicitedServerHelloExtension.into());
    }

    debug!("Using ciphersuite {:?}", suite);
    cx.version = Some(version);
    cx.suite = Some(suite);
    cx.randoms.server = server_hello.random.0;
    cx.server_session_id = server_hello.session_id.clone();

    let resumed = resumed_session(cx, server_hello, suite, version)?;
    cx.is_resumption = resumed.is_some();
    cx.resumption_decided = true;

    process_extensions(cx, server_hello)?;

    if let Some(session) = &resumed {
        if session.extensions().extended_ms != cx.extensions.extended_ms {
            return Err(PeerMisbehaved::ResumptionWithVariedExtendedMasterSecret.into());
        }
    }

    cx.record_received(m);
    cx.transcript
        .start_hash(transcript_hash_for(suite, version));

    if let Some(session) = resumed {
        debug!("Server agreed to resume");
        cx.extensions.sct_list = session.extensions().sct_list.clone();
        cx.extensions.ocsp_response = session
            .extensions()
            .ocsp_response
            .clone();
        cx.extensions.original_handshake_hash = session
            .extensions()
            .original_handshake_hash
            .clone();
        cx.server_cert_chain = session.peer_certificates().clone();

        let keys = KeyScheduler::derive(
            MasterSecretInput::Master(session.master_secret()),
            &cx.randoms,
            suite,
            version,
        );
        cx.master_secret = Some(keys.master_secret().clone());
        cx.pending_write = Some(keys.client);
        cx.pending_read = Some(keys.server);
        cx.resume = Some(session);
    }

    Ok(())
}

/// Decide whether the server is resuming, and with what.
fn resumed_session(
    cx: &ConnectionContext,
    server_hello: &ServerHelloPayload,
    suite: &'static SupportedCipherSuite,
    version: ProtocolVersion,
) -> Result<Option<Arc<Session>>, Error> {
    let offered = match &cx.resume {
        Some(offered) => offered,
        None => return Ok(None),
    };

    if !server_hello.session_id.is_empty() && server_hello.session_id == *offered.id() {
        if offered.suite().suite != suite.suite {
            return Err(PeerMisbehaved::ResumptionWithVariedCipherSuite.into());
        }
        if offered.version() != version {
            return Err(PeerMisbehaved::ResumptionWithVariedVersion.into());
        }
        return Ok(Some(Arc::clone(offered)));
    }

    // A server resuming from a ticket need not echo our id.
    let (ticket, callback) = match (&cx.offered.ticket, &cx.config.session_secret_callback) {
        (Some(ticket), Some(callback)) => (ticket, callback),
        _ => return Ok(None),
    };
    let master_secret = match callback.session_secret(ticket, &cx.randoms.server) {
        Some(master_secret) => master_secret,
        None => return Ok(None),
    };

    debug!("Resuming with an externally supplied master secret");
    let mut session = Session::new(
        server_hello.session_id.clone(),
        version,
        suite,
        master_secret,
        cx.config.current_time()?,
    );
    session.set_peer_certificates(offered.peer_certificates().clone());
    *session.extensions_mut() = offered.extensions().clone();
    if let Some(ticket) = offered.ticket() {
        session.set_ticket(ticket.clone());
    }
    Ok(Some(Arc::new(session)))
}

fn process_extensions(
    cx: &mut ConnectionContext,
    server_hello: &ServerHelloPayload,
) -> Result<(), Error> {
    let config = Arc::clone(&cx.config);
    let resuming = cx.is_resumption;

    for ext in &server_hello.extensions {
        match ext {
            ServerExtension::EcPointFormats(formats) => {
                if !formats.contains(&ECPointFormat::Uncompressed) {
                    return Err(PeerMisbehaved::ServerHelloMustOfferUncompressedEcPoints.into());
                }
            }
            ServerExtension::SessionTicketAck => cx.ticket_expected = true,
            ServerExtension::CertificateStatusAck => {
                if !resuming {
                    cx.certificate_status_expected = true;
                }
            }
            ServerExtension::NextProtocols(protocols) => {
                let selector = config
                    .next_protocol_selector
                    .as_ref()
                    .ok_or(PeerMisbehaved::UnsolicitedServerHelloExtension)?;
                let listed: Vec<&[u8]> = protocols
                    .iter()
                    .map(|proto| proto.as_ref())
                    .collect();
                let chosen = selector.select(&listed);
                debug!("NPN protocol is {:?}", String::from_utf8_lossy(&chosen));
                cx.next_protocol = Some(chosen);
            }
            ServerExtension::Protocols(protocols) => {
                let chosen = protocols
                    .as_single_slice()
                    .ok_or(PeerMisbehaved::SelectedUnofferedApplicationProtocol)?;
                if !cx
                    .offered
                    .alpn_protocols
                    .iter()
                    .any(|ours| ours == chosen)
                {
                    return Err(PeerMisbehaved::SelectedUnofferedApplicationProtocol.into());
                }
                debug!("ALPN protocol is {:?}", String::from_utf8_lossy(chosen));
                cx.extensions.alpn_protocol = Some(chosen.to_vec());
            }
            ServerExtension::SignedCertificateTimestamp(list) => {
                if list.0.is_empty() {
                    return Err(InvalidMessage::IllegalEmptyValue.into());
                }
                if !resuming {
                    cx.extensions.sct_list = Some(list.0.clone());
                }
            }
            ServerExtension::ExtendedMasterSecretAck => cx.extensions.extended_ms = true,
            ServerExtension::ChannelIdAck => cx.channel_id = Some(ExtensionType::ChannelId),
            ServerExtension::ChannelIdNewAck => cx.channel_id = Some(ExtensionType::ChannelIdNew),
            ServerExtension::ServerNameAck
            | ServerExtension::RenegotiationInfo(_)
            | ServerExtension::Unknown(_) => {}
        }
    }

    if cx.next_protocol.is_some() && cx.extensions.alpn_protocol.is_some() {
        return Err(PeerMisbehaved::AcceptedAlpnAndNpn.into());
    }

    cx.extensions.channel_id_negotiated = cx.channel_id.is_some();
    cx.extensions.channel_id_new = cx.channel_id == Some(ExtensionType::ChannelIdNew);

    check_renegotiation_info(cx, server_hello)
}

fn check_renegotiation_info(
    cx: &mut ConnectionContext,
    server_hello: &ServerHelloPayload,
) -> Result<(), Error> {
    let echoed = match server_hello.find_extension(ExtensionType::RenegotiationInfo) {
        Some(ServerExtension::RenegotiationInfo(echoed)) => Some(&echoed.0),
        _ => None,
    };

    match (echoed, cx.is_renegotiation()) {
        (Some(echoed), false) => {
            if !echoed.is_empty() {
                return Err(PeerMisbehaved::IllegalRenegotiationInfo.into());
            }
            cx.secure_renegotiation = true;
        }
        (Some(echoed), true) => {
            let expected = [
                cx.finished.client.as_slice(),
                cx.finished.server.as_slice(),
            ]
            .concat();
            if *echoed != expected {
                return Err(PeerMisbehaved::IllegalRenegotiationInfo.into());
            }
        }
        (None, false) if cx.config.allow_legacy_server_connect => {
            warn!("Server does not support secure renegotiation");
        }
        (None, _) => return Err(PeerMisbehaved::MissingRenegotiationInfo.into()),
    }

    Ok(())
}
