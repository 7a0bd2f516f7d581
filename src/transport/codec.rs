//! Newline-delimited JSON framing.
//!
//! `JsonLinesCodec<D>` decodes lines into `D` and encodes any `Serialize`
//! value as one line. The decoder yields `Result<D, FrameError>` as its item
//! so that a malformed or over-long frame is reported to the caller without
//! ending the stream; only I/O errors terminate a `FramedRead`.

use std::{cmp, io, marker::PhantomData};

use bytes::{Buf, BufMut, BytesMut};
use serde::{Serialize, de::DeserializeOwned};
use tokio_util::codec::{Decoder, Encoder};

use crate::utils::FrameError;

pub const DEFAULT_MAX_FRAME_LENGTH: usize = 64 * 1024;

#[derive(Debug)]
pub struct JsonLinesCodec<D> {
    max_length: usize,
    // Where to resume scanning for a newline on the next call.
    next_index: usize,
    is_discarding: bool,
    _decoded: PhantomData<fn() -> D>,
}

impl<D> JsonLinesCodec<D> {
    pub fn new(max_length: usize) -> Self {
        Self {
            max_length,
            next_index: 0,
            is_discarding: false,
            _decoded: PhantomData,
        }
    }
}

impl<D> Default for JsonLinesCodec<D> {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FRAME_LENGTH)
    }
}

/// Parse one line (without its terminator) into a frame.
pub fn decode_line<D: DeserializeOwned>(line: &[u8]) -> Result<D, FrameError> {
    serde_json::from_slice(line).map_err(FrameError::Decode)
}

fn without_carriage_return(line: &[u8]) -> &[u8] {
    match line.last() {
        Some(b'\r') => &line[..line.len() - 1],
        _ => line,
    }
}

fn is_blank(line: &[u8]) -> bool {
    line.iter().all(u8::is_ascii_whitespace)
}

impl<D: DeserializeOwned> Decoder for JsonLinesCodec<D> {
    type Item = Result<D, FrameError>;
    type Error = io::Error;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<Self::Item>, io::Error> {
        loop {
            let read_to = cmp::min(self.max_length.saturating_add(1), buf.len());
            let newline_offset = buf[self.next_index..read_to]
                .iter()
                .position(|b| *b == b'\n');

            match (self.is_discarding, newline_offset) {
                (true, Some(offset)) => {
                    buf.advance(offset + self.next_index + 1);
                    self.is_discarding = false;
                    self.next_index = 0;
                }
                (true, None) => {
                    buf.advance(read_to);
                    self.next_index = 0;
                    if buf.is_empty() {
                        return Ok(None);
                    }
                }
                (false, Some(offset)) => {
                    let newline_index = offset + self.next_index;
                    self.next_index = 0;
                    let line = buf.split_to(newline_index + 1);
                    let line = without_carriage_return(&line[..newline_index]);
                    if is_blank(line) {
                        continue;
                    }
                    return Ok(Some(decode_line(line)));
                }
                (false, None) if buf.len() > self.max_length => {
                    self.is_discarding = true;
                    return Ok(Some(Err(FrameError::TooLong {
                        max: self.max_length,
                    })));
                }
                (false, None) => {
                    self.next_index = read_to;
                    return Ok(None);
                }
            }
        }
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<Self::Item>, io::Error> {
        if let Some(frame) = self.decode(buf)? {
            return Ok(Some(frame));
        }
        if self.is_discarding || buf.is_empty() {
            buf.clear();
            self.next_index = 0;
            return Ok(None);
        }
        let rest = buf.split_to(buf.len());
        self.next_index = 0;
        let line = without_carriage_return(&rest);
        if is_blank(line) {
            return Ok(None);
        }
        Ok(Some(decode_line(line)))
    }
}

impl<D, E: Serialize> Encoder<E> for JsonLinesCodec<D> {
    type Error = FrameError;

    fn encode(&mut self, item: E, dst: &mut BytesMut) -> Result<(), FrameError> {
        let json = serde_json::to_vec(&item).map_err(FrameError::Encode)?;
        dst.reserve(json.len() + 1);
        dst.put_slice(&json);
        dst.put_u8(b'\n');
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::message::{ClientMessage, ServerMessage};

    fn codec() -> JsonLinesCodec<ClientMessage> {
        JsonLinesCodec::new(64)
    }

    #[test]
    fn decodes_frames_split_across_reads() {
        let mut codec = codec();
        let mut buf = BytesMut::from(&br#"{"type":"subscribe","#[..]);
        assert!(codec.decode(&mut buf).unwrap().is_none());

        buf.extend_from_slice(br#""topic":"news"}"#);
        buf.extend_from_slice(b"\r\n");
        let frame = codec.decode(&mut buf).unwrap().unwrap().unwrap();
        assert_eq!(
            frame,
            ClientMessage::Subscribe {
                topic: "news".to_string()
            }
        );
        assert!(buf.is_empty());
    }

    #[test]
    fn malformed_line_does_not_poison_following_frames() {
        let mut codec = codec();
        let mut buf = BytesMut::from(&b"not json\n{\"type\":\"subscribe\",\"topic\":\"a\"}\n"[..]);

        let first = codec.decode(&mut buf).unwrap().unwrap();
        assert!(matches!(first, Err(FrameError::Decode(_))));

        let second = codec.decode(&mut buf).unwrap().unwrap().unwrap();
        assert_eq!(
            second,
            ClientMessage::Subscribe {
                topic: "a".to_string()
            }
        );
    }

    #[test]
    fn missing_required_field_is_a_decode_error() {
        let mut codec = codec();
        let mut buf = BytesMut::from(&b"{\"type\":\"publish\",\"topic\":\"a\"}\n"[..]);
        let frame = codec.decode(&mut buf).unwrap().unwrap();
        assert!(matches!(frame, Err(FrameError::Decode(_))));
    }

    #[test]
    fn unknown_type_decodes_as_unknown() {
        let mut codec = codec();
        let mut buf = BytesMut::from(&b"{\"type\":\"ping\",\"topic\":\"a\"}\n"[..]);
        let frame = codec.decode(&mut buf).unwrap().unwrap().unwrap();
        assert_eq!(frame, ClientMessage::Unknown);
    }

    #[test]
    fn blank_lines_are_skipped() {
        let mut codec = codec();
        let mut buf = BytesMut::from(&b"\n  \r\n{\"type\":\"auth\",\"payload\":\"u:p\"}\n"[..]);
        let frame = codec.decode(&mut buf).unwrap().unwrap().unwrap();
        assert_eq!(
            frame,
            ClientMessage::Auth {
                payload: "u:p".to_string()
            }
        );
    }

    #[test]
    fn over_long_line_is_reported_then_discarded() {
        let mut codec = JsonLinesCodec::<ClientMessage>::new(16);
        let mut buf = BytesMut::from(&[b'x'; 40][..]);

        let first = codec.decode(&mut buf).unwrap().unwrap();
        assert!(matches!(first, Err(FrameError::TooLong { max: 16 })));

        buf.extend_from_slice(b"xxxx\n{\"type\":\"x\"}\n");
        let next = codec.decode(&mut buf).unwrap().unwrap().unwrap();
        assert_eq!(next, ClientMessage::Unknown);
    }

    #[test]
    fn unterminated_final_line_is_decoded_at_eof() {
        let mut codec = codec();
        let mut buf = BytesMut::from(&b"{\"type\":\"subscribe\",\"topic\":\"t\"}"[..]);
        assert!(codec.decode(&mut buf).unwrap().is_none());
        let frame = codec.decode_eof(&mut buf).unwrap().unwrap().unwrap();
        assert_eq!(
            frame,
            ClientMessage::Subscribe {
                topic: "t".to_string()
            }
        );
        assert!(codec.decode_eof(&mut buf).unwrap().is_none());
    }

    #[test]
    fn encoder_escapes_payload_content() {
        let mut codec = JsonLinesCodec::<ServerMessage>::default();
        let mut dst = BytesMut::new();
        let msg = ServerMessage::Publish {
            topic: "t".to_string(),
            payload: "say \"hi\"\nbye".to_string(),
        };
        codec.encode(msg.clone(), &mut dst).unwrap();

        assert_eq!(dst.iter().filter(|b| **b == b'\n').count(), 1);
        assert_eq!(dst.last(), Some(&b'\n'));
        let decoded: ServerMessage = serde_json::from_slice(&dst[..dst.len() - 1]).unwrap();
        assert_eq!(decoded, msg);
    }

    #[test]
    fn auth_ack_has_the_documented_shape() {
        let json = serde_json::to_value(ServerMessage::auth_ack(true)).unwrap();
        assert_eq!(json, serde_json::json!({"type": "auth", "payload": "success"}));
        let json = serde_json::to_value(ServerMessage::auth_ack(false)).unwrap();
        assert_eq!(json, serde_json::json!({"type": "auth", "payload": "failed"}));
    }
}
