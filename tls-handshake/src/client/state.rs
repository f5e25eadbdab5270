//! The client handshake as an explicit state machine.
//!
//! [`transition`] is a pure function: given where we are, what just
//! happened and what has been negotiated so far, it names the next state
//! and the [`Action`]s the driver must carry out.  It never touches the
//! network or any secrets.

use crate::enums::HandshakeType;
use crate::error::Error;
#[cfg(feature = "logging")]
use crate::log::warn;

/// Where a client handshake is.
///
/// `Await*` states wait for a message from the server; `Send*` states
/// emit one.  `Closed` is terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HandshakeState {
    /// Nothing has happened yet.
    Start,
    SendClientHello,
    AwaitServerHello,
    AwaitCertificate,
    AwaitCertificateStatus,
    /// The server's chain is with the verifier.
    AwaitCertificateVerification,
    AwaitServerKeyExchange,
    AwaitCertificateRequest,
    AwaitServerHelloDone,
    SendClientCertificate,
    SendClientKeyExchange,
    SendCertificateVerify,
    SendChangeCipherSpec,
    SendNextProtocol,
    SendChannelId,
    SendFinished,
    AwaitNewSessionTicket,
    AwaitChangeCipherSpec,
    AwaitFinished,
    /// Keys are agreed and both Finished messages verified.
    Established,
    /// The handshake failed or was aborted.
    Closed,
}

impl HandshakeState {
    /// True for states that wait on the server.
    pub fn is_awaiting(self) -> bool {
        matches!(
            self,
            Self::AwaitServerHello
                | Self::AwaitCertificate
                | Self::AwaitCertificateStatus
                | Self::AwaitServerKeyExchange
                | Self::AwaitCertificateRequest
                | Self::AwaitServerHelloDone
                | Self::AwaitNewSessionTicket
                | Self::AwaitChangeCipherSpec
                | Self::AwaitFinished
        )
    }

    /// True for states that emit a message.
    pub fn is_sending(self) -> bool {
        matches!(
            self,
            Self::SendClientHello
                | Self::SendClientCertificate
                | Self::SendClientKeyExchange
                | Self::SendCertificateVerify
                | Self::SendChangeCipherSpec
                | Self::SendNextProtocol
                | Self::SendChannelId
                | Self::SendFinished
        )
    }

    /// The handshake message this state waits for, if any.
    pub(crate) fn expected_message(self) -> Option<HandshakeType> {
        Some(match self {
            Self::AwaitServerHello => HandshakeType::ServerHello,
            Self::AwaitCertificate => HandshakeType::Certificate,
            Self::AwaitCertificateStatus => HandshakeType::CertificateStatus,
            Self::AwaitServerKeyExchange => HandshakeType::ServerKeyExchange,
            Self::AwaitCertificateRequest => HandshakeType::CertificateRequest,
            Self::AwaitServerHelloDone => HandshakeType::ServerHelloDone,
            Self::AwaitNewSessionTicket => HandshakeType::NewSessionTicket,
            Self::AwaitFinished => HandshakeType::Finished,
            _ => return None,
        })
    }
}

/// Something that moves the handshake on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Event {
    /// The caller started (or restarted, to renegotiate) the handshake.
    Start,
    /// A whole handshake message of this type is ready to be dispatched.
    Received(HandshakeType),
    /// The server's ChangeCipherSpec arrived.
    ReceivedChangeCipherSpec,
    /// A received message was dispatched and accepted.
    Processed(HandshakeType),
    /// The driver is ready to emit this state's message.
    Send,
    /// The certificate verifier accepted the server's chain.
    VerifierDone,
}

/// A side effect the driver performs, in order, after a transition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    EmitClientHello,
    /// Dispatch the received message to its handler.
    Process,
    BeginCertificateVerification,
    EmitClientCertificate,
    EmitClientKeyExchange,
    EmitCertificateVerify,
    EmitChangeCipherSpec,
    InstallWriteKeys,
    EmitNextProtocol,
    EmitChannelId,
    EmitFinished,
    /// Our side of a full handshake is out: tell the caller it may write.
    BeginFalseStart,
    InstallReadKeys,
    CacheSession,
}

/// Whether a ServerKeyExchange may or must follow.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ServerKxExpectation {
    /// The suite never sends one (RSA key transport).
    Absent,
    /// Plain PSK: sent only when the server has an identity hint.
    Optional,
    /// Ephemeral key exchange: missing is an error.
    Required,
}

/// What the handshake has agreed so far, as far as choosing the next
/// state is concerned.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Negotiated {
    pub resuming: bool,
    pub server_sends_certificate: bool,
    pub server_kx: ServerKxExpectation,
    pub certificate_status_expected: bool,
    pub client_auth_requested: bool,
    /// A client certificate was chosen that can sign.
    pub sends_certificate_verify: bool,
    pub ticket_expected: bool,
    pub next_protocol: bool,
    pub channel_id: bool,
    pub false_start: bool,
}

impl Default for Negotiated {
    fn default() -> Self {
        Self {
            resuming: false,
            server_sends_certificate: true,
            server_kx: ServerKxExpectation::Required,
            certificate_status_expected: false,
            client_auth_requested: false,
            sends_certificate_verify: false,
            ticket_expected: false,
            next_protocol: false,
            channel_id: false,
            false_start: false,
        }
    }
}

/// The result of [`transition`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transition {
    pub next: HandshakeState,
    pub actions: Vec<Action>,
}

impl Transition {
    fn to(next: HandshakeState) -> Self {
        Self {
            next,
            actions: Vec::new(),
        }
    }

    fn with(next: HandshakeState, actions: &[Action]) -> Self {
        Self {
            next,
            actions: actions.to_vec(),
        }
    }
}

/// Compute the state following `state` on `event`.
///
/// An unexpected message is an error.  A message that arrives in place
/// of an optional one skips that state without being dispatched: the
/// returned transition has no actions, and the driver offers the same
/// message again in the new state.
pub fn transition(
    state: HandshakeState,
    event: Event,
    negotiated: &Negotiated,
) -> Result<Transition, Error> {
    use HandshakeState::*;

    match (state, event) {
        (Closed, _) => Err(Error::HandshakeClosed),

        (Start | Established, Event::Start) => Ok(Transition::to(SendClientHello)),

        (_, Event::ReceivedChangeCipherSpec) => match state {
            AwaitChangeCipherSpec => Ok(Transition::with(AwaitFinished, &[Action::InstallReadKeys])),
            _ => Err(unexpected_ccs(state)),
        },

        (_, Event::Received(typ)) => received(state, typ, negotiated),

        (_, Event::Processed(typ)) => processed(state, typ, negotiated),

        (AwaitCertificateVerification, Event::VerifierDone) => Ok(Transition::to(
            after_certificate_verified(negotiated),
        )),

        (_, Event::Send) if state.is_sending() => Ok(sent(state, negotiated)),

        _ => Err(Error::General(format!(
            "{:?} is not valid in state {:?}",
            event, state
        ))),
    }
}

fn received(
    state: HandshakeState,
    typ: HandshakeType,
    negotiated: &Negotiated,
) -> Result<Transition, Error> {
    use HandshakeState::*;

    let expected = match state.expected_message() {
        Some(expected) => expected,
        None => return Err(unexpected_message(state, typ, &[])),
    };

    if typ == expected {
        return Ok(Transition::with(state, &[Action::Process]));
    }

    match state {
        AwaitCertificateStatus => Ok(Transition::with(
            AwaitCertificateVerification,
            &[Action::BeginCertificateVerification],
        )),
        AwaitServerKeyExchange if negotiated.server_kx == ServerKxExpectation::Optional => {
            Ok(Transition::to(AwaitCertificateRequest))
        }
        AwaitCertificateRequest => Ok(Transition::to(AwaitServerHelloDone)),
        _ => Err(unexpected_message(state, typ, &[expected])),
    }
}

fn processed(
    state: HandshakeState,
    typ: HandshakeType,
    negotiated: &Negotiated,
) -> Result<Transition, Error> {
    use HandshakeState::*;

    if state.expected_message() != Some(typ) {
        return Err(Error::General(format!(
            "processed {:?} in state {:?}",
            typ, state
        )));
    }

    Ok(match state {
        AwaitServerHello if negotiated.resuming => Transition::to(await_server_flight_end(negotiated)),
        AwaitServerHello if negotiated.server_sends_certificate => Transition::to(AwaitCertificate),
        AwaitServerHello => Transition::to(after_certificate_verified(negotiated)),

        AwaitCertificate if negotiated.certificate_status_expected => {
            Transition::to(AwaitCertificateStatus)
        }
        AwaitCertificate | AwaitCertificateStatus => Transition::with(
            AwaitCertificateVerification,
            &[Action::BeginCertificateVerification],
        ),

        AwaitServerKeyExchange => Transition::to(AwaitCertificateRequest),
        AwaitCertificateRequest => Transition::to(AwaitServerHelloDone),

        AwaitServerHelloDone if negotiated.client_auth_requested => {
            Transition::to(SendClientCertificate)
        }
        AwaitServerHelloDone => Transition::to(SendClientKeyExchange),

        AwaitNewSessionTicket => Transition::to(AwaitChangeCipherSpec),

        AwaitFinished if negotiated.resuming => Transition::to(SendChangeCipherSpec),
        AwaitFinished => Transition::with(Established, &[Action::CacheSession]),

        // expected_message() covers no other states
        _ => Transition::to(state),
    })
}

fn sent(state: HandshakeState, negotiated: &Negotiated) -> Transition {
    use HandshakeState::*;

    match state {
        SendClientHello => Transition::with(AwaitServerHello, &[Action::EmitClientHello]),
        SendClientCertificate => Transition::with(
            SendClientKeyExchange,
            &[Action::EmitClientCertificate],
        ),
        SendClientKeyExchange if negotiated.sends_certificate_verify => Transition::with(
            SendCertificateVerify,
            &[Action::EmitClientKeyExchange],
        ),
        SendClientKeyExchange => Transition::with(
            SendChangeCipherSpec,
            &[Action::EmitClientKeyExchange],
        ),
        SendCertificateVerify => Transition::with(
            SendChangeCipherSpec,
            &[Action::EmitCertificateVerify],
        ),
        SendChangeCipherSpec => Transition::with(
            after_change_cipher_spec(negotiated),
            &[Action::EmitChangeCipherSpec, Action::InstallWriteKeys],
        ),
        SendNextProtocol => Transition::with(
            match negotiated.channel_id {
                true => SendChannelId,
                false => SendFinished,
            },
            &[Action::EmitNextProtocol],
        ),
        SendChannelId => Transition::with(SendFinished, &[Action::EmitChannelId]),
        SendFinished if negotiated.resuming => Transition::with(Established, &[Action::EmitFinished]),
        SendFinished if negotiated.false_start => Transition::with(
            await_server_flight_end(negotiated),
            &[Action::EmitFinished, Action::BeginFalseStart],
        ),
        SendFinished => Transition::with(
            await_server_flight_end(negotiated),
            &[Action::EmitFinished],
        ),
        // is_sending() admits no other states
        _ => Transition::to(state),
    }
}

fn after_certificate_verified(negotiated: &Negotiated) -> HandshakeState {
    match negotiated.server_kx {
        ServerKxExpectation::Absent => HandshakeState::AwaitCertificateRequest,
        _ => HandshakeState::AwaitServerKeyExchange,
    }
}

fn after_change_cipher_spec(negotiated: &Negotiated) -> HandshakeState {
    if negotiated.next_protocol {
        HandshakeState::SendNextProtocol
    } else if negotiated.channel_id {
        HandshakeState::SendChannelId
    } else {
        HandshakeState::SendFinished
    }
}

fn await_server_flight_end(negotiated: &Negotiated) -> HandshakeState {
    match negotiated.ticket_expected {
        true => HandshakeState::AwaitNewSessionTicket,
        false => HandshakeState::AwaitChangeCipherSpec,
    }
}

fn unexpected_message(
    state: HandshakeState,
    got_type: HandshakeType,
    expect_types: &[HandshakeType],
) -> Error {
    warn!(
        "Received a {:?} handshake message in state {:?}",
        got_type, state
    );
    Error::InappropriateHandshakeMessage {
        expect_types: expect_types.to_vec(),
        got_type,
    }
}

fn unexpected_ccs(state: HandshakeState) -> Error {
    use crate::enums::ContentType;

    warn!("Received a ChangeCipherSpec in state {:?}", state);
    Error::InappropriateMessage {
        expect_types: vec![ContentType::Handshake],
        got_type: ContentType::ChangeCipherSpec,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use HandshakeState::*;

    fn step(state: HandshakeState, event: Event, n: &Negotiated) -> Transition {
        transition(state, event, n).unwrap()
    }

    /// Feed `events` from `Start`, returning every state visited.
    fn walk(events: &[Event], n: &Negotiated) -> Vec<HandshakeState> {
        let mut state = Start;
        let mut seen = vec![state];
        for event in events {
            state = step(state, *event, n).next;
            seen.push(state);
        }
        seen
    }

    fn recv(typ: HandshakeType) -> [Event; 2] {
        [Event::Received(typ), Event::Processed(typ)]
    }

    #[test]
    fn full_handshake_path() {
        let n = Negotiated::default();
        let mut events = vec![Event::Start, Event::Send];
        events.extend(recv(HandshakeType::ServerHello));
        events.extend(recv(HandshakeType::Certificate));
        events.push(Event::VerifierDone);
        events.extend(recv(HandshakeType::ServerKeyExchange));
        // no CertificateRequest: ServerHelloDone skips the state
        events.push(Event::Received(HandshakeType::ServerHelloDone));
        events.extend(recv(HandshakeType::ServerHelloDone));
        events.extend([Event::Send, Event::Send, Event::Send]);
        events.push(Event::ReceivedChangeCipherSpec);
        events.extend(recv(HandshakeType::Finished));

        assert_eq!(
            walk(&events, &n),
            vec![
                Start,
                SendClientHello,
                AwaitServerHello,
                AwaitServerHello,
                AwaitCertificate,
                AwaitCertificate,
                AwaitCertificateVerification,
                AwaitServerKeyExchange,
                AwaitServerKeyExchange,
                AwaitCertificateRequest,
                AwaitServerHelloDone,
                AwaitServerHelloDone,
                SendClientKeyExchange,
                SendChangeCipherSpec,
                SendFinished,
                AwaitChangeCipherSpec,
                AwaitFinished,
                AwaitFinished,
                Established,
            ]
        );
    }

    #[test]
    fn resumption_path_skips_key_exchange() {
        let n = Negotiated {
            resuming: true,
            ..Negotiated::default()
        };
        let mut events = vec![Event::Start, Event::Send];
        events.extend(recv(HandshakeType::ServerHello));
        events.push(Event::ReceivedChangeCipherSpec);
        events.extend(recv(HandshakeType::Finished));
        events.extend([Event::Send, Event::Send]);

        let states = walk(&events, &n);
        assert_eq!(
            &states[3..],
            &[
                AwaitServerHello,
                AwaitChangeCipherSpec,
                AwaitFinished,
                AwaitFinished,
                SendChangeCipherSpec,
                SendFinished,
                Established,
            ]
        );
        assert!(!states.contains(&AwaitCertificate));
        assert!(!states.contains(&SendClientKeyExchange));
    }

    #[test]
    fn resumption_does_not_cache() {
        let n = Negotiated {
            resuming: true,
            ..Negotiated::default()
        };
        let t = step(SendFinished, Event::Send, &n);
        assert_eq!(t.next, Established);
        assert_eq!(t.actions, vec![Action::EmitFinished]);

        let full = step(AwaitFinished, Event::Processed(HandshakeType::Finished), &Negotiated::default());
        assert_eq!(full.actions, vec![Action::CacheSession]);
    }

    #[test]
    fn ticket_slot_comes_before_ccs() {
        let n = Negotiated {
            ticket_expected: true,
            ..Negotiated::default()
        };
        assert_eq!(step(SendFinished, Event::Send, &n).next, AwaitNewSessionTicket);
        assert_eq!(
            step(
                AwaitNewSessionTicket,
                Event::Processed(HandshakeType::NewSessionTicket),
                &n
            )
            .next,
            AwaitChangeCipherSpec
        );
        assert!(matches!(
            transition(
                AwaitNewSessionTicket,
                Event::ReceivedChangeCipherSpec,
                &n
            ),
            Err(Error::InappropriateMessage { .. })
        ));
        assert!(matches!(
            transition(
                AwaitNewSessionTicket,
                Event::Received(HandshakeType::Finished),
                &n
            ),
            Err(Error::InappropriateHandshakeMessage { .. })
        ));
    }

    #[test]
    fn certificate_status_is_optional() {
        let n = Negotiated {
            certificate_status_expected: true,
            ..Negotiated::default()
        };
        assert_eq!(
            step(AwaitCertificate, Event::Processed(HandshakeType::Certificate), &n).next,
            AwaitCertificateStatus
        );

        let stapled = step(
            AwaitCertificateStatus,
            Event::Processed(HandshakeType::CertificateStatus),
            &n,
        );
        assert_eq!(stapled.next, AwaitCertificateVerification);
        assert_eq!(stapled.actions, vec![Action::BeginCertificateVerification]);

        let skipped = step(
            AwaitCertificateStatus,
            Event::Received(HandshakeType::ServerKeyExchange),
            &n,
        );
        assert_eq!(skipped, stapled);
    }

    #[test]
    fn missing_ephemeral_server_kx_is_fatal() {
        let n = Negotiated::default();
        let err = transition(
            AwaitServerKeyExchange,
            Event::Received(HandshakeType::ServerHelloDone),
            &n,
        )
        .unwrap_err();
        assert_eq!(
            err,
            Error::InappropriateHandshakeMessage {
                expect_types: vec![HandshakeType::ServerKeyExchange],
                got_type: HandshakeType::ServerHelloDone,
            }
        );
        assert_eq!(
            err.alert(),
            Some(crate::enums::AlertDescription::UnexpectedMessage)
        );
    }

    #[test]
    fn plain_psk_may_omit_server_kx() {
        let n = Negotiated {
            server_sends_certificate: false,
            server_kx: ServerKxExpectation::Optional,
            ..Negotiated::default()
        };
        assert_eq!(
            step(AwaitServerHello, Event::Processed(HandshakeType::ServerHello), &n).next,
            AwaitServerKeyExchange
        );
        assert_eq!(
            step(
                AwaitServerKeyExchange,
                Event::Received(HandshakeType::ServerHelloDone),
                &n
            ),
            Transition::to(AwaitCertificateRequest)
        );
    }

    #[test]
    fn rsa_kx_goes_straight_to_certificate_request() {
        let n = Negotiated {
            server_kx: ServerKxExpectation::Absent,
            ..Negotiated::default()
        };
        assert_eq!(
            step(AwaitCertificateVerification, Event::VerifierDone, &n).next,
            AwaitCertificateRequest
        );
    }

    #[test]
    fn client_auth_sends_certificate_and_verify() {
        let n = Negotiated {
            client_auth_requested: true,
            sends_certificate_verify: true,
            ..Negotiated::default()
        };
        let mut events = vec![Event::Processed(HandshakeType::ServerHelloDone)];
        events.extend([Event::Send; 4]);

        let mut state = AwaitServerHelloDone;
        let mut actions = Vec::new();
        for event in events {
            let t = step(state, event, &n);
            state = t.next;
            actions.extend(t.actions);
        }
        assert_eq!(state, SendFinished);
        assert_eq!(
            actions,
            vec![
                Action::EmitClientCertificate,
                Action::EmitClientKeyExchange,
                Action::EmitCertificateVerify,
                Action::EmitChangeCipherSpec,
                Action::InstallWriteKeys,
            ]
        );
    }

    #[test]
    fn npn_and_channel_id_follow_ccs() {
        let n = Negotiated {
            next_protocol: true,
            channel_id: true,
            ..Negotiated::default()
        };
        assert_eq!(step(SendChangeCipherSpec, Event::Send, &n).next, SendNextProtocol);
        assert_eq!(step(SendNextProtocol, Event::Send, &n).next, SendChannelId);
        assert_eq!(step(SendChannelId, Event::Send, &n).next, SendFinished);

        let only_channel_id = Negotiated {
            channel_id: true,
            ..Negotiated::default()
        };
        assert_eq!(
            step(SendChangeCipherSpec, Event::Send, &only_channel_id).next,
            SendChannelId
        );
    }

    #[test]
    fn false_start_follows_our_finished() {
        let n = Negotiated {
            false_start: true,
            ticket_expected: true,
            ..Negotiated::default()
        };
        let t = step(SendFinished, Event::Send, &n);
        assert_eq!(t.next, AwaitNewSessionTicket);
        assert_eq!(t.actions, vec![Action::EmitFinished, Action::BeginFalseStart]);

        // the server's Finished still completes the handshake
        let done = step(AwaitFinished, Event::Processed(HandshakeType::Finished), &n);
        assert_eq!(done.next, Established);
        assert_eq!(done.actions, vec![Action::CacheSession]);

        let plain = step(SendFinished, Event::Send, &Negotiated::default());
        assert_eq!(plain.actions, vec![Action::EmitFinished]);
    }

    #[test]
    fn stray_ccs_is_rejected() {
        for state in [AwaitServerHello, AwaitCertificate, AwaitServerHelloDone, AwaitFinished] {
            assert!(matches!(
                transition(state, Event::ReceivedChangeCipherSpec, &Negotiated::default()),
                Err(Error::InappropriateMessage { .. })
            ));
        }
    }

    #[test]
    fn closed_is_terminal() {
        for event in [Event::Start, Event::Send, Event::VerifierDone] {
            assert_eq!(
                transition(Closed, event, &Negotiated::default()),
                Err(Error::HandshakeClosed)
            );
        }
    }

    #[test]
    fn renegotiation_restarts_from_established() {
        assert_eq!(
            step(Established, Event::Start, &Negotiated::default()).next,
            SendClientHello
        );
        assert!(transition(AwaitServerHello, Event::Start, &Negotiated::default()).is_err());
    }

    #[test]
    fn states_classify() {
        assert!(AwaitFinished.is_awaiting());
        assert!(!AwaitCertificateVerification.is_awaiting());
        assert!(SendChannelId.is_sending());
        assert!(!Established.is_sending());
        assert_eq!(AwaitCertificateVerification.expected_message(), None);
    }
}
