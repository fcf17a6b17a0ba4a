//! Capsules carried on the connect stream's body (RFC 9297).
//!
//! The session core only ever interprets CLOSE_WEBTRANSPORT_SESSION; any
//! other capsule type is surfaced as [`Capsule::Unknown`] so the caller can
//! skip it, as RFC 9297 requires.

use crate::codes;
use crate::error::{Error, Result};
use crate::varint;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Capsule {
    /// Terminal session close with an application error code and message.
    CloseSession {
        error_code: u32,
        error_message: String,
    },
    /// A capsule type this layer does not interpret; its payload was skipped.
    Unknown { capsule_type: u64 },
}

impl Capsule {
    /// Append the wire encoding of this capsule to `buf`.
    pub fn encode(&self, buf: &mut Vec<u8>) -> Result<usize> {
        let start = buf.len();
        match self {
            Capsule::CloseSession {
                error_code,
                error_message,
            } => {
                if error_message.len() > codes::MAX_CLOSE_MESSAGE_LEN {
                    return Err(Error::CloseMessageTooLong);
                }
                varint::put(codes::CAPSULE_CLOSE_SESSION, buf)?;
                varint::put((4 + error_message.len()) as u64, buf)?;
                buf.extend_from_slice(&error_code.to_be_bytes());
                buf.extend_from_slice(error_message.as_bytes());
            }
            Capsule::Unknown { capsule_type } => {
                return Err(Error::CapsuleError(format!(
                    "cannot encode unknown capsule type {capsule_type:#x}"
                )));
            }
        }
        Ok(buf.len() - start)
    }

    /// Decode one capsule from the start of `buf`.
    ///
    /// Returns `(capsule, bytes_consumed)`, or [`Error::BufferTooShort`]
    /// when the capsule is not yet complete.
    pub fn decode(buf: &[u8]) -> Result<(Self, usize)> {
        let (capsule_type, n) = varint::decode(buf)?;
        let mut offset = n;
        let (payload_len, n) = varint::decode(&buf[offset..])?;
        offset += n;
        let payload_len = payload_len as usize;

        if buf.len() < offset + payload_len {
            return Err(Error::BufferTooShort);
        }
        let payload = &buf[offset..offset + payload_len];

        let capsule = match capsule_type {
            codes::CAPSULE_CLOSE_SESSION => {
                if payload_len < 4 {
                    return Err(Error::CapsuleError(
                        "CLOSE_WEBTRANSPORT_SESSION payload too short".into(),
                    ));
                }
                let error_code =
                    u32::from_be_bytes([payload[0], payload[1], payload[2], payload[3]]);
                let message = &payload[4..];
                if message.len() > codes::MAX_CLOSE_MESSAGE_LEN {
                    return Err(Error::CloseMessageTooLong);
                }
                let error_message = String::from_utf8(message.to_vec()).map_err(|_| {
                    Error::CapsuleError("CLOSE_WEBTRANSPORT_SESSION message is not UTF-8".into())
                })?;
                Capsule::CloseSession {
                    error_code,
                    error_message,
                }
            }
            _ => Capsule::Unknown { capsule_type },
        };

        Ok((capsule, offset + payload_len))
    }
}

/// Incremental parser for extracting capsules from the connect stream body.
#[derive(Debug, Default)]
pub struct CapsuleParser {
    buf: Vec<u8>,
}

impl CapsuleParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed received bytes and collect every capsule that completed.
    pub fn feed(&mut self, data: &[u8]) -> Vec<Result<Capsule>> {
        self.buf.extend_from_slice(data);
        let mut capsules = Vec::new();
        loop {
            match Capsule::decode(&self.buf) {
                Ok((capsule, consumed)) => {
                    self.buf.drain(..consumed);
                    capsules.push(Ok(capsule));
                }
                Err(Error::BufferTooShort) => break,
                Err(e) => {
                    capsules.push(Err(e));
                    break;
                }
            }
        }
        capsules
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(error_code: u32, error_message: &str) -> Capsule {
        Capsule::CloseSession {
            error_code,
            error_message: error_message.into(),
        }
    }

    #[test]
    fn close_session_wire_format() {
        let mut buf = Vec::new();
        close(0x0102_0304, "bye").encode(&mut buf).unwrap();
        // type 0x2843 as a two-byte varint, length 7, error code, message.
        assert_eq!(
            buf,
            [0x68, 0x43, 0x07, 0x01, 0x02, 0x03, 0x04, b'b', b'y', b'e']
        );
    }

    #[test]
    fn close_session_round_trip() {
        for capsule in [close(42, "goodbye"), close(0, "")] {
            let mut buf = Vec::new();
            capsule.encode(&mut buf).unwrap();
            let (decoded, consumed) = Capsule::decode(&buf).unwrap();
            assert_eq!(consumed, buf.len());
            assert_eq!(decoded, capsule);
        }
    }

    #[test]
    fn oversized_message_rejected() {
        let mut buf = Vec::new();
        let result = close(0, &"x".repeat(codes::MAX_CLOSE_MESSAGE_LEN + 1)).encode(&mut buf);
        assert!(matches!(result, Err(Error::CloseMessageTooLong)));
    }

    #[test]
    fn truncated_close_payload_rejected() {
        let mut buf = Vec::new();
        varint::put(codes::CAPSULE_CLOSE_SESSION, &mut buf).unwrap();
        varint::put(2, &mut buf).unwrap();
        buf.extend_from_slice(&[0x00, 0x00]);
        assert!(matches!(
            Capsule::decode(&buf),
            Err(Error::CapsuleError(_))
        ));
    }

    #[test]
    fn unknown_capsule_skipped() {
        let mut buf = Vec::new();
        varint::put(0x190b4d3d, &mut buf).unwrap();
        varint::put(3, &mut buf).unwrap();
        buf.extend_from_slice(&[1, 2, 3]);

        let (capsule, consumed) = Capsule::decode(&buf).unwrap();
        assert_eq!(consumed, buf.len());
        assert_eq!(
            capsule,
            Capsule::Unknown {
                capsule_type: 0x190b4d3d
            }
        );
    }

    #[test]
    fn parser_handles_byte_at_a_time_delivery() {
        let mut buf = Vec::new();
        close(7, "slow").encode(&mut buf).unwrap();
        close(8, "").encode(&mut buf).unwrap();

        let mut parser = CapsuleParser::new();
        let mut capsules = Vec::new();
        for &byte in &buf {
            for result in parser.feed(&[byte]) {
                capsules.push(result.unwrap());
            }
        }
        assert_eq!(capsules, [close(7, "slow"), close(8, "")]);
    }

    #[test]
    fn parser_reports_malformed_capsule() {
        let mut buf = Vec::new();
        varint::put(codes::CAPSULE_CLOSE_SESSION, &mut buf).unwrap();
        varint::put(1, &mut buf).unwrap();
        buf.push(0xff);

        let results = CapsuleParser::new().feed(&buf);
        assert_eq!(results.len(), 1);
        assert!(results[0].is_err());
    }
}
