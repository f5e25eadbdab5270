use core::task::Poll;
use std::sync::Arc;

use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use super::config::PskLookup;
use super::context::{ClientAuthDetails, ClientCertRequest, ConnectionContext, OutboundItem};
use super::handy::certificate_type_for;
use crate::crypto::dhe;
use crate::crypto::hash::Hash;
use crate::crypto::KeyExchangeAlgorithm;
use crate::crypto::ring::hash::SHA256;
use crate::check::check_message;
use crate::enums::{ContentType, HandshakeType, ProtocolVersion, SignatureScheme};
use crate::error::{Error, PeerIncompatible, PeerMisbehaved};
#[cfg(feature = "logging")]
use crate::log::{debug, trace, warn};
use crate::msgs::base::{Payload, PayloadU16, PayloadU8};
use crate::msgs::codec::Codec;
use crate::msgs::enums::ExtensionType;
use crate::msgs::handshake::{
    ChannelIdPayload, HandshakeMessagePayload, HandshakePayload, NextProtocolPayload,
    ServerKeyExchangeParams, SessionId,
};
use crate::msgs::message::Message;
use crate::rand;
use crate::session::{Session, SessionTicket};
use crate::tls12::{DirectionalKeys, KeyScheduler, MasterSecretInput};
use crate::verify::{self, DigitallySignedStruct, FinishedMessageVerified};

/// Smallest finite-field group we accept from a server.
const MIN_DH_BITS: u64 = 1024;

/// Longest PSK identity hint we accept.
const MAX_PSK_HINT_LEN: usize = 128;

const CHANNEL_ID_MAGIC: &[u8] = b"TLS Channel ID signature\0";
const CHANNEL_ID_RESUMPTION_MAGIC: &[u8] = b"Resumption\0";

pub(super) fn handle_certificate(cx: &mut ConnectionContext, m: &Message) -> Result<(), Error> {
    let chain = require_handshake_msg!(m, HandshakeType::Certificate, HandshakePayload::Certificate)?;
    if chain.is_empty() {
        warn!("Server sent an empty certificate chain");
        return Err(Error::NoCertificatesPresented);
    }

    trace!("Server cert is {:?}", chain);
    cx.record_received(m);
    cx.server_cert_chain = chain.clone();
    Ok(())
}

pub(super) fn handle_certificate_status(
    cx: &mut ConnectionContext,
    m: &Message,
) -> Result<(), Error> {
    let status = require_handshake_msg!(
        m,
        HandshakeType::CertificateStatus,
        HandshakePayload::CertificateStatus
    )?;

    cx.record_received(m);
    let response = status.clone().into_inner();
    trace!("Server stapled OCSP response is {:?}", &response);
    cx.extensions.ocsp_response = Some(response);
    Ok(())
}

/// Hand the server's chain to the verifier.
pub(super) fn begin_certificate_verification(cx: &mut ConnectionContext) -> Result<(), Error> {
    let config = Arc::clone(&cx.config);
    let (end_entity, intermediates) = cx
        .server_cert_chain
        .split_first()
        .ok_or(Error::NoCertificatesPresented)?;

    let ticket = config.verifier.begin_verify(
        end_entity,
        intermediates,
        &cx.server_name,
        cx.extensions
            .ocsp_response
            .as_deref()
            .unwrap_or_default(),
        cx.extensions
            .sct_list
            .as_deref()
            .unwrap_or_default(),
        config.current_time()?,
    )?;

    cx.verify_ticket = Some(ticket);
    Ok(())
}

/// Ask the verifier whether it has finished with the chain.
pub(super) fn poll_certificate_verification(cx: &mut ConnectionContext) -> Result<Poll<()>, Error> {
    let ticket = cx
        .verify_ticket
        .as_ref()
        .ok_or_else(|| Error::General("no certificate verification in progress".into()))?;

    match cx.config.verifier.poll(ticket) {
        Poll::Pending => Ok(Poll::Pending),
        Poll::Ready(Ok(verified)) => {
            debug!("Server certificate verified");
            cx.verify_ticket = None;
            cx.cert_verified = Some(verified);
            Ok(Poll::Ready(()))
        }
        Poll::Ready(Err(err)) => {
            cx.verify_ticket = None;
            Err(err)
        }
    }
}

pub(super) fn handle_server_kx(cx: &mut ConnectionContext, m: &Message) -> Result<(), Error> {
    let opaque_kx = require_handshake_msg!(
        m,
        HandshakeType::ServerKeyExchange,
        HandshakePayload::ServerKeyExchange
    )?;
    let config = Arc::clone(&cx.config);
    let suite = cx.negotiated_suite()?;
    let version = cx.negotiated_version()?;

    let skx = opaque_kx.unwrap_given_kxa(suite.kx, suite.sign_algorithm(), version)?;
    cx.record_received(m);

    if let Some(hint) = &skx.psk_identity_hint {
        if hint.0.len() > MAX_PSK_HINT_LEN || hint.0.contains(&0) {
            return Err(PeerMisbehaved::InvalidPskIdentityHint.into());
        }
    }

    match &skx.params {
        ServerKeyExchangeParams::Dh(params) => {
            let bits = dhe::bit_length(&params.dh_p.0);
            if bits < MIN_DH_BITS {
                warn!("Server DH group is only {} bits", bits);
                return Err(PeerIncompatible::DhParamsTooSmall.into());
            }
        }
        ServerKeyExchangeParams::Ecdh(params) => {
            let group = params.curve_params.named_group;
            if !cx.offered.groups.contains(&group) || config.provider.find_kx_group(group).is_none()
            {
                return Err(PeerMisbehaved::SelectedUnofferedKxGroup.into());
            }
        }
        ServerKeyExchangeParams::None => {}
    }

    if let Some(dss) = &skx.dss {
        let message = verify::construct_server_verify_message(&cx.randoms, &skx.params_encoding);
        let cert = cx.end_entity_cert()?;

        if version >= ProtocolVersion::TLSv1_2 {
            if !cx.offered.sigschemes.contains(&dss.scheme) {
                return Err(PeerMisbehaved::SignedHandshakeWithUnadvertisedSigScheme.into());
            }
            if Some(dss.scheme.sign()) != suite.sign_algorithm() {
                return Err(PeerMisbehaved::SignedKxWithWrongAlgorithm.into());
            }
            config
                .verifier
                .verify_tls12_signature(&message, cert, dss)?;
        } else {
            let digest = verify::legacy_digest(dss.scheme, &message)
                .ok_or(PeerMisbehaved::SignedKxWithWrongAlgorithm)?;
            config
                .verifier
                .verify_legacy_signature(&digest, cert, dss)?;
        }
    }

    cx.server_kx = Some(skx);
    Ok(())
}

pub(super) fn handle_certificate_request(
    cx: &mut ConnectionContext,
    m: &Message,
) -> Result<(), Error> {
    let certreq = require_handshake_msg!(
        m,
        HandshakeType::CertificateRequest,
        HandshakePayload::CertificateRequest
    )?;
    let suite = cx.negotiated_suite()?;
    let version = cx.negotiated_version()?;

    if !suite.server_sends_certificate() {
        return Err(PeerMisbehaved::CertificateRequestWithAnonymousSuite.into());
    }

    cx.record_received(m);
    debug!("Got CertificateRequest {:?}", certreq);

    let sigschemes = match version >= ProtocolVersion::TLSv1_2 {
        true => certreq.sigschemes.clone(),
        false => vec![
            SignatureScheme::RSA_PKCS1_MD5_SHA1,
            SignatureScheme::ECDSA_SHA1_Legacy,
        ],
    };

    cx.cert_request = Some(ClientCertRequest {
        canames: certreq
            .canames
            .iter()
            .map(|name| name.as_ref().to_vec())
            .collect(),
        sigschemes,
        cert_types: certreq.certtypes.clone(),
    });
    Ok(())
}

/// Ask the resolver for our certificate, once the server has asked for
/// one.  The resolver may not have an answer yet.
pub(super) fn poll_client_auth(cx: &mut ConnectionContext) -> Result<Poll<()>, Error> {
    let request = cx
        .cert_request
        .as_ref()
        .ok_or_else(|| Error::General("client certificate without a request".into()))?;
    let canames: Vec<&[u8]> = request
        .canames
        .iter()
        .map(|name| name.as_slice())
        .collect();

    let resolved = match cx
        .config
        .client_auth_cert_resolver
        .poll_resolve(&canames, &request.sigschemes, &request.cert_types)
    {
        Poll::Pending => {
            trace!("Client certificate lookup is pending");
            return Ok(Poll::Pending);
        }
        Poll::Ready(resolved) => resolved,
    };

    let signer = resolved.as_ref().and_then(|certkey| {
        let acceptable = certificate_type_for(certkey.key.algorithm())
            .map(|typ| request.cert_types.contains(&typ))
            .unwrap_or(false);
        match acceptable {
            true => certkey
                .key
                .choose_scheme(&request.sigschemes),
            false => None,
        }
    });

    let details = match signer {
        Some(signer) => ClientAuthDetails {
            certkey: resolved,
            signer: Some(signer),
        },
        None => {
            debug!("Client auth requested but no cert/sigscheme available");
            if let Some(hash) = cx.transcript.hash_mut() {
                hash.abandon_client_auth();
            }
            ClientAuthDetails {
                certkey: None,
                signer: None,
            }
        }
    };

    cx.client_auth = Some(details);
    Ok(Poll::Ready(()))
}

pub(super) fn handle_server_hello_done(
    cx: &mut ConnectionContext,
    m: &Message,
) -> Result<(), Error> {
    check_message(m, &[ContentType::Handshake], &[HandshakeType::ServerHelloDone])?;
    cx.record_received(m);

    // with a request outstanding this waits for the resolver
    if cx.cert_request.is_none() {
        if let Some(hash) = cx.transcript.hash_mut() {
            hash.abandon_client_auth();
        }
    }
    Ok(())
}

pub(super) fn emit_client_certificate(cx: &mut ConnectionContext) {
    let chain = cx
        .client_auth
        .as_ref()
        .and_then(|auth| auth.certkey.as_ref())
        .map(|certkey| certkey.cert.clone())
        .unwrap_or_default();

    cx.emit_handshake(HandshakeMessagePayload {
        typ: HandshakeType::Certificate,
        payload: HandshakePayload::Certificate(chain),
    });
}

fn find_psk(cx: &ConnectionContext) -> Result<(Vec<u8>, Zeroizing<Vec<u8>>), Error> {
    let provider = cx
        .config
        .psk_provider
        .as_ref()
        .ok_or_else(|| Error::General("PSK suite negotiated without a PSK provider".into()))?;
    let hint = cx
        .server_kx
        .as_ref()
        .and_then(|skx| skx.psk_identity_hint.as_ref())
        .map(|hint| hint.0.as_slice());

    match provider.lookup(hint) {
        PskLookup::Found { identity, key } => Ok((identity, Zeroizing::new(key))),
        PskLookup::NotFound => {
            warn!("No PSK for identity hint {:?}", hint);
            Err(Error::NoPskAvailable)
        }
    }
}

/// `u16 len ‖ other ‖ u16 len ‖ psk`
fn psk_premaster(other: &[u8], psk: &[u8]) -> Zeroizing<Vec<u8>> {
    let mut pms = Zeroizing::new(Vec::with_capacity(4 + other.len() + psk.len()));
    PayloadU16::encode_slice(other, &mut pms);
    PayloadU16::encode_slice(psk, &mut pms);
    pms
}

/// Agree the pre-master secret, send our half, and derive the keys.
pub(super) fn emit_client_kx(cx: &mut ConnectionContext) -> Result<(), Error> {
    let config = Arc::clone(&cx.config);
    let suite = cx.negotiated_suite()?;
    let version = cx.negotiated_version()?;
    let now = config.current_time()?;

    let psk = match suite.kx.uses_psk() {
        true => Some(find_psk(cx)?),
        false => None,
    };

    let mut body = Vec::new();
    if let Some((identity, _)) = &psk {
        PayloadU16::encode_slice(identity, &mut body);
    }

    let other_secret = match suite.kx {
        KeyExchangeAlgorithm::Rsa => {
            let rsa = config
                .provider
                .rsa_kx
                .as_ref()
                .ok_or(PeerIncompatible::UnsupportedKeyExchange)?;
            let mut pms = Zeroizing::new(cx.offered.version.wire().to_be_bytes().to_vec());
            pms.extend_from_slice(&rand::random_vec(config.provider.secure_random, 46)?);
            let encrypted = rsa.encrypt_premaster(cx.end_entity_cert()?.as_ref(), &pms)?;
            PayloadU16::encode_slice(&encrypted, &mut body);
            pms
        }
        KeyExchangeAlgorithm::Dhe | KeyExchangeAlgorithm::DhAnon => {
            let params = match cx.server_kx.as_ref().map(|skx| &skx.params) {
                Some(ServerKeyExchangeParams::Dh(params)) => params,
                _ => return Err(Error::General("no DH parameters from server".into())),
            };
            let kx = config
                .provider
                .dhe
                .start(&params.dh_p.0, &params.dh_g.0, config.provider.secure_random)?;
            PayloadU16::encode_slice(kx.pub_key(), &mut body);
            let shared = kx.complete(&params.dh_Ys.0)?;
            Zeroizing::new(shared.secret_bytes().to_vec())
        }
        KeyExchangeAlgorithm::Ecdhe | KeyExchangeAlgorithm::EcdhePsk | KeyExchangeAlgorithm::EcdhAnon => {
            let params = match cx.server_kx.as_ref().map(|skx| &skx.params) {
                Some(ServerKeyExchangeParams::Ecdh(params)) => params,
                _ => return Err(Error::General("no ECDH parameters from server".into())),
            };
            let group = config
                .provider
                .find_kx_group(params.curve_params.named_group)
                .ok_or(PeerMisbehaved::SelectedUnofferedKxGroup)?;
            let kx = group.start()?;
            PayloadU8::new(kx.pub_key().to_vec()).encode(&mut body);
            let shared = kx.complete(&params.public.0)?;
            Zeroizing::new(shared.secret_bytes().to_vec())
        }
        KeyExchangeAlgorithm::Psk => {
            let psk_len = psk
                .as_ref()
                .map(|(_, key)| key.len())
                .unwrap_or_default();
            Zeroizing::new(vec![0u8; psk_len])
        }
    };

    let pre_master = match &psk {
        Some((_, key)) => psk_premaster(&other_secret, key),
        None => other_secret,
    };

    cx.emit_handshake(HandshakeMessagePayload {
        typ: HandshakeType::ClientKeyExchange,
        payload: HandshakePayload::ClientKeyExchange(Payload::new(body)),
    });

    let session_hash = match cx.extensions.extended_ms {
        true => Some(cx.transcript_hash()?),
        false => None,
    };
    let keys = KeyScheduler::derive(
        MasterSecretInput::PreMaster {
            pre_master: &pre_master,
            session_hash: session_hash.as_ref().map(|hash| hash.as_ref()),
        },
        &cx.randoms,
        suite,
        version,
    );

    cx.session = Some(Session::new(
        cx.server_session_id.clone(),
        version,
        suite,
        keys.master_secret().clone(),
        now,
    ));
    cx.master_secret = Some(keys.master_secret().clone());
    cx.pending_write = Some(keys.client);
    cx.pending_read = Some(keys.server);
    cx.server_kx = None;
    Ok(())
}

pub(super) fn emit_certificate_verify(cx: &mut ConnectionContext) -> Result<(), Error> {
    let version = cx.negotiated_version()?;
    let message = cx
        .transcript
        .hash_mut()
        .and_then(|hash| hash.take_handshake_buf())
        .ok_or_else(|| Error::General("handshake transcript was not kept".into()))?;

    let signer = cx
        .client_auth
        .as_ref()
        .and_then(|auth| auth.signer.as_ref())
        .ok_or_else(|| Error::General("no client signing key".into()))?;

    let payload = if version >= ProtocolVersion::TLSv1_2 {
        let sig = signer.sign(&message)?;
        HandshakePayload::CertificateVerify(DigitallySignedStruct::new(signer.scheme(), sig))
    } else {
        let digest = verify::legacy_digest(signer.scheme(), &message).ok_or_else(|| {
            Error::General(format!("{:?} cannot sign before TLS 1.2", signer.scheme()))
        })?;
        HandshakePayload::CertificateVerifyLegacy(PayloadU16::new(signer.sign(&digest)?))
    };

    cx.emit_handshake(HandshakeMessagePayload {
        typ: HandshakeType::CertificateVerify,
        payload,
    });
    Ok(())
}

pub(super) fn emit_ccs(cx: &mut ConnectionContext) {
    cx.emit_ccs();
}

/// Queue the switch to our new write keys, right after our CCS.
pub(super) fn install_write_keys(cx: &mut ConnectionContext) -> Result<(), Error> {
    let keys = cx
        .pending_write
        .take()
        .ok_or_else(|| Error::General("no write keys derived".into()))?;
    cx.outbound
        .push_back(OutboundItem::InstallWriteKeys(keys));
    Ok(())
}

pub(super) fn emit_next_protocol(cx: &mut ConnectionContext) -> Result<(), Error> {
    let protocol = cx
        .next_protocol
        .clone()
        .ok_or_else(|| Error::General("no next protocol chosen".into()))?;

    cx.emit_handshake(HandshakeMessagePayload {
        typ: HandshakeType::NextProtocol,
        payload: HandshakePayload::NextProtocol(NextProtocolPayload::new(protocol)),
    });
    Ok(())
}

pub(super) fn emit_channel_id(cx: &mut ConnectionContext) -> Result<(), Error> {
    let typ = cx
        .channel_id
        .ok_or_else(|| Error::General("Channel ID not negotiated".into()))?;
    let key = cx
        .channel_id_key
        .clone()
        .ok_or_else(|| Error::General("no Channel ID key".into()))?;

    let mut signed = CHANNEL_ID_MAGIC.to_vec();
    let resumed_new_style = cx.is_resumption
        && cx
            .resume
            .as_ref()
            .map(|session| session.extensions().channel_id_new)
            .unwrap_or(false);
    if resumed_new_style {
        let original = cx
            .extensions
            .original_handshake_hash
            .as_ref()
            .ok_or_else(|| Error::General("resumed session lacks its original handshake hash".into()))?;
        signed.extend_from_slice(CHANNEL_ID_RESUMPTION_MAGIC);
        signed.extend_from_slice(original);
    }
    signed.extend_from_slice(cx.transcript_hash()?.as_ref());

    let sig = key.sign(&signed)?;
    let mut body = Vec::with_capacity(128);
    body.extend_from_slice(&key.public_key());
    body.extend_from_slice(&sig);

    cx.emit_handshake(HandshakeMessagePayload {
        typ: HandshakeType::EncryptedExtensions,
        payload: HandshakePayload::ChannelId(ChannelIdPayload {
            typ,
            body: PayloadU16::new(body),
        }),
    });
    Ok(())
}

pub(super) fn emit_finished(cx: &mut ConnectionContext) -> Result<(), Error> {
    let suite = cx.negotiated_suite()?;
    let version = cx.negotiated_version()?;
    let handshake_hash = cx.transcript_hash()?;
    let verify_data = KeyScheduler::verify_data(
        cx.master_secret()?.as_bytes(),
        suite,
        version,
        b"client finished",
        handshake_hash.as_ref(),
    );

    cx.emit_handshake(HandshakeMessagePayload::build_finished(&verify_data));
    cx.finished.client = verify_data.to_vec();

    if !cx.is_resumption && cx.channel_id == Some(ExtensionType::ChannelIdNew) {
        cx.extensions.original_handshake_hash = Some(cx.transcript_hash()?.as_ref().to_vec());
    }
    Ok(())
}

pub(super) fn handle_new_ticket(cx: &mut ConnectionContext, m: &Message) -> Result<(), Error> {
    let nst = require_handshake_msg!(
        m,
        HandshakeType::NewSessionTicket,
        HandshakePayload::NewSessionTicket
    )?;
    cx.record_received(m);

    if nst.ticket.0.is_empty() {
        debug!("Server sent an empty ticket");
        return Ok(());
    }

    let ticket = SessionTicket {
        lifetime_hint: nst.lifetime_hint,
        ticket: nst.ticket.0.clone(),
    };
    let id = SessionId::new(SHA256.hash(&ticket.ticket).as_ref())
        .ok_or_else(|| Error::General("ticket digest is not a session id".into()))?;

    if cx.is_resumption {
        let resumed = cx
            .resume
            .as_ref()
            .ok_or_else(|| Error::General("resuming without a session".into()))?;
        cx.session = Some(resumed.renewed(ticket, id, cx.config.current_time()?));
        return Ok(());
    }

    let session = cx
        .session
        .as_mut()
        .ok_or_else(|| Error::General("ticket arrived before the session existed".into()))?;
    session.set_ticket(ticket);
    session.set_session_id(id);
    Ok(())
}

/// Switch to the server's keys after its ChangeCipherSpec.
pub(super) fn take_read_keys(cx: &mut ConnectionContext) -> Result<DirectionalKeys, Error> {
    cx.pending_read
        .take()
        .ok_or_else(|| Error::General("no read keys derived".into()))
}

pub(super) fn handle_server_finished(
    cx: &mut ConnectionContext,
    m: &Message,
) -> Result<(), Error> {
    let finished = require_handshake_msg!(m, HandshakeType::Finished, HandshakePayload::Finished)?;
    let suite = cx.negotiated_suite()?;
    let version = cx.negotiated_version()?;

    let handshake_hash = cx.transcript_hash()?;
    let expect_verify_data = KeyScheduler::verify_data(
        cx.master_secret()?.as_bytes(),
        suite,
        version,
        b"server finished",
        handshake_hash.as_ref(),
    );

    let _fin_verified = match ConstantTimeEq::ct_eq(&expect_verify_data[..], &finished.0[..]).into()
    {
        true => FinishedMessageVerified::assertion(),
        false => {
            warn!("Finished wrong");
            return Err(Error::DecryptError);
        }
    };

    cx.record_received(m);
    cx.finished.server = expect_verify_data.to_vec();

    if cx.is_resumption {
        let current = match cx.session.take() {
            Some(renewed) => {
                let renewed = Arc::new(renewed);
                save_session(cx, &renewed);
                renewed
            }
            None => cx
                .resume
                .clone()
                .ok_or_else(|| Error::General("resuming without a session".into()))?,
        };
        cx.current = Some(current);
    }
    Ok(())
}

/// Publish the session a full handshake built.
pub(super) fn cache_session(cx: &mut ConnectionContext) -> Result<(), Error> {
    let mut session = cx
        .session
        .take()
        .ok_or_else(|| Error::General("handshake built no session".into()))?;
    session.set_peer_certificates(cx.server_cert_chain.clone());
    *session.extensions_mut() = cx.extensions.clone();

    let session = Arc::new(session);
    save_session(cx, &session);
    cx.current = Some(session);
    Ok(())
}

fn save_session(cx: &ConnectionContext, session: &Arc<Session>) {
    let cache = match &cx.config.session_cache {
        Some(cache) => cache,
        None => return,
    };

    if session.id().is_empty() {
        debug!("Session not saved: server didn't allocate id or ticket");
        return;
    }

    cache.insert(Arc::clone(session));
    debug!("Session saved");
}
