use crate::enums::{ContentType, HandshakeType};
use crate::error::Error;
#[cfg(feature = "logging")]
use crate::log::warn;
use crate::msgs::handshake::HandshakeMessagePayload;
use crate::msgs::message::{Message, MessagePayload};

/// For a Message $m, and a HandshakePayload enum member $payload_type,
/// return Ok(payload) if $m is both a handshake message and one that
/// has the given $payload_type.  If not, return Err(Error) quoting
/// $handshake_type as the expected handshake type.
macro_rules! require_handshake_msg(
  ( $m:expr, $handshake_type:path, $payload_type:path ) => (
    match &$m.payload {
        $crate::msgs::message::MessagePayload::Handshake { parsed, .. } => match &parsed.payload {
            $payload_type(hm) => Ok(hm),
            _ => Err($crate::check::inappropriate_handshake_message(
                     parsed,
                     &[ $handshake_type ]))
        }
        payload => Err($crate::error::Error::InappropriateMessage {
                 expect_types: vec![ $crate::enums::ContentType::Handshake ],
                 got_type: payload.content_type()})
    }
  )
);

/// Validate the message `m`: return an error if:
///
/// - the type of m does not appear in `content_types`.
/// - if m is a handshake message, the handshake message type does
///   not appear in `handshake_types`.
pub(crate) fn check_message(
    m: &Message,
    content_types: &[ContentType],
    handshake_types: &[HandshakeType],
) -> Result<(), Error> {
    if !content_types.contains(&m.payload.content_type()) {
        return Err(inappropriate_message(m, content_types));
    }

    if let MessagePayload::Handshake { parsed, .. } = &m.payload {
        if !handshake_types.is_empty() && !handshake_types.contains(&parsed.typ) {
            return Err(inappropriate_handshake_message(parsed, handshake_types));
        }
    }

    Ok(())
}

pub(crate) fn inappropriate_message(m: &Message, content_types: &[ContentType]) -> Error {
    warn!(
        "Received a {:?} message while expecting {:?}",
        m.payload.content_type(),
        content_types
    );
    Error::InappropriateMessage {
        expect_types: content_types.to_vec(),
        got_type: m.payload.content_type(),
    }
}

pub(crate) fn inappropriate_handshake_message(
    hsp: &HandshakeMessagePayload,
    handshake_types: &[HandshakeType],
) -> Error {
    warn!(
        "Received a {:?} handshake message while expecting {:?}",
        hsp.typ, handshake_types
    );
    Error::InappropriateHandshakeMessage {
        expect_types: handshake_types.to_vec(),
        got_type: hsp.typ,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enums::{AlertDescription, ProtocolVersion};
    use crate::msgs::enums::AlertLevel;
    use crate::msgs::handshake::HandshakePayload;

    fn done() -> Message {
        Message::build_handshake(
            ProtocolVersion::TLSv1_2,
            HandshakeMessagePayload {
                typ: HandshakeType::ServerHelloDone,
                payload: HandshakePayload::ServerHelloDone,
            },
        )
    }

    #[test]
    fn accepts_expected_handshake_type() {
        assert!(check_message(
            &done(),
            &[ContentType::Handshake],
            &[HandshakeType::CertificateRequest, HandshakeType::ServerHelloDone]
        )
        .is_ok());
    }

    #[test]
    fn rejects_unexpected_handshake_type() {
        let err = check_message(
            &done(),
            &[ContentType::Handshake],
            &[HandshakeType::ServerKeyExchange],
        )
        .unwrap_err();
        assert_eq!(
            err,
            Error::InappropriateHandshakeMessage {
                expect_types: vec![HandshakeType::ServerKeyExchange],
                got_type: HandshakeType::ServerHelloDone,
            }
        );
    }

    #[test]
    fn rejects_unexpected_content_type() {
        let alert = Message::build_alert(
            ProtocolVersion::TLSv1_2,
            AlertLevel::Warning,
            AlertDescription::CloseNotify,
        );
        assert!(matches!(
            check_message(&alert, &[ContentType::Handshake], &[]),
            Err(Error::InappropriateMessage { .. })
        ));
    }

    #[test]
    fn require_macro_extracts_payload() {
        let msg = Message::build_handshake(
            ProtocolVersion::TLSv1_2,
            HandshakeMessagePayload::build_finished(&[1; 12]),
        );
        let fin: Result<_, Error> =
            require_handshake_msg!(msg, HandshakeType::Finished, HandshakePayload::Finished);
        assert_eq!(fin.unwrap().0, vec![1; 12]);

        let done = done();
        let wrong: Result<_, Error> =
            require_handshake_msg!(done, HandshakeType::Finished, HandshakePayload::Finished);
        assert!(wrong.is_err());
    }
}
