//! Frame codec for chat messages
//!
//! Every frame is a 32-bit big-endian payload length followed by the payload.
//! The payload starts with a tag byte selecting the message variant.
//!
//! Field encodings:
//! ```text
//! string          u32 length (big-endian) + UTF-8 bytes
//! optional string 0x00 (absent) | 0x01 + string
//! ```
//!
//! Message layouts:
//! ```text
//! 0x01 ChangeName     new_name
//! 0x02 GlobalMessage  text
//! 0x03 DirectMessage  target_name, text
//! 0x81 Notification   text, optional sender
//! ```
//!
//! `max_frame_size` bounds request frames. Response frames are bounded by
//! [`response_frame_limit`] of it.
//!
//! Unknown request tags decode to [`Request::Unrecognized`] so the hub can
//! skip them without dropping the connection. Bytes after the last known
//! field of a message are ignored.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use super::constants::*;
use super::message::{Request, Response};
use crate::error::ProtocolError;

/// Hub-side codec: decodes requests, encodes responses
#[derive(Debug, Clone)]
pub struct ServerCodec {
    max_frame_size: usize,
}

/// Client-side codec: encodes requests, decodes responses
#[derive(Debug, Clone)]
pub struct ClientCodec {
    max_frame_size: usize,
}

impl ServerCodec {
    pub fn new() -> Self {
        Self::with_max_frame_size(DEFAULT_MAX_FRAME_SIZE)
    }

    pub fn with_max_frame_size(max_frame_size: usize) -> Self {
        Self { max_frame_size }
    }
}

impl Default for ServerCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientCodec {
    pub fn new() -> Self {
        Self::with_max_frame_size(DEFAULT_MAX_FRAME_SIZE)
    }

    pub fn with_max_frame_size(max_frame_size: usize) -> Self {
        Self { max_frame_size }
    }
}

impl Default for ClientCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for ServerCodec {
    type Item = Request;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Request>, ProtocolError> {
        match split_frame(src, self.max_frame_size)? {
            Some(mut payload) => decode_request(&mut payload).map(Some),
            None => Ok(None),
        }
    }
}

impl Encoder<Response> for ServerCodec {
    type Error = ProtocolError;

    fn encode(&mut self, item: Response, dst: &mut BytesMut) -> Result<(), ProtocolError> {
        let mut payload = BytesMut::new();
        encode_response(&item, &mut payload);
        write_frame(payload, dst, response_frame_limit(self.max_frame_size))
    }
}

impl Decoder for ClientCodec {
    type Item = Response;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Response>, ProtocolError> {
        match split_frame(src, response_frame_limit(self.max_frame_size))? {
            Some(mut payload) => decode_response(&mut payload).map(Some),
            None => Ok(None),
        }
    }
}

impl Encoder<Request> for ClientCodec {
    type Error = ProtocolError;

    fn encode(&mut self, item: Request, dst: &mut BytesMut) -> Result<(), ProtocolError> {
        let mut payload = BytesMut::new();
        encode_request(&item, &mut payload);
        write_frame(payload, dst, self.max_frame_size)
    }
}

/// Take one complete frame payload off the front of `src`, if buffered
fn split_frame(src: &mut BytesMut, max_frame_size: usize) -> Result<Option<Bytes>, ProtocolError> {
    if src.len() < FRAME_HEADER_SIZE {
        return Ok(None);
    }

    let len = u32::from_be_bytes([src[0], src[1], src[2], src[3]]) as usize;
    if len > max_frame_size {
        return Err(ProtocolError::FrameTooLarge {
            size: len,
            max: max_frame_size,
        });
    }

    if src.len() < FRAME_HEADER_SIZE + len {
        src.reserve(FRAME_HEADER_SIZE + len - src.len());
        return Ok(None);
    }

    src.advance(FRAME_HEADER_SIZE);
    Ok(Some(src.split_to(len).freeze()))
}

fn write_frame(payload: BytesMut, dst: &mut BytesMut, max_frame_size: usize) -> Result<(), ProtocolError> {
    if payload.len() > max_frame_size {
        return Err(ProtocolError::FrameTooLarge {
            size: payload.len(),
            max: max_frame_size,
        });
    }

    dst.reserve(FRAME_HEADER_SIZE + payload.len());
    dst.put_u32(payload.len() as u32);
    dst.extend_from_slice(&payload);
    Ok(())
}

/// Encode a request payload (without frame header)
pub fn encode_request(request: &Request, buf: &mut BytesMut) {
    match request {
        Request::ChangeName { new_name } => {
            buf.put_u8(TAG_CHANGE_NAME);
            put_string(buf, new_name);
        }
        Request::GlobalMessage { text } => {
            buf.put_u8(TAG_GLOBAL_MESSAGE);
            put_string(buf, text);
        }
        Request::DirectMessage { target_name, text } => {
            buf.put_u8(TAG_DIRECT_MESSAGE);
            put_string(buf, target_name);
            put_string(buf, text);
        }
        Request::Unrecognized { tag } => buf.put_u8(*tag),
    }
}

/// Decode a request payload (without frame header)
pub fn decode_request(buf: &mut Bytes) -> Result<Request, ProtocolError> {
    if buf.is_empty() {
        return Err(ProtocolError::EmptyFrame);
    }

    match buf.get_u8() {
        TAG_CHANGE_NAME => Ok(Request::ChangeName {
            new_name: get_string(buf)?,
        }),
        TAG_GLOBAL_MESSAGE => Ok(Request::GlobalMessage {
            text: get_string(buf)?,
        }),
        TAG_DIRECT_MESSAGE => {
            let target_name = get_string(buf)?;
            let text = get_string(buf)?;
            Ok(Request::DirectMessage { target_name, text })
        }
        tag => {
            buf.advance(buf.remaining());
            Ok(Request::Unrecognized { tag })
        }
    }
}

/// Encode a response payload (without frame header)
pub fn encode_response(response: &Response, buf: &mut BytesMut) {
    match response {
        Response::Notification { text, sender } => {
            buf.put_u8(TAG_NOTIFICATION);
            put_string(buf, text);
            match sender {
                Some(name) => {
                    buf.put_u8(MARKER_PRESENT);
                    put_string(buf, name);
                }
                None => buf.put_u8(MARKER_ABSENT),
            }
        }
    }
}

/// Decode a response payload (without frame header)
pub fn decode_response(buf: &mut Bytes) -> Result<Response, ProtocolError> {
    if buf.is_empty() {
        return Err(ProtocolError::EmptyFrame);
    }

    match buf.get_u8() {
        TAG_NOTIFICATION => {
            let text = get_string(buf)?;
            let sender = get_optional_string(buf)?;
            Ok(Response::Notification { text, sender })
        }
        tag => Err(ProtocolError::UnknownTag(tag)),
    }
}

fn put_string(buf: &mut BytesMut, s: &str) {
    buf.put_u32(s.len() as u32);
    buf.put_slice(s.as_bytes());
}

fn get_string(buf: &mut Bytes) -> Result<String, ProtocolError> {
    if buf.remaining() < 4 {
        return Err(ProtocolError::UnexpectedEof);
    }
    let len = buf.get_u32() as usize;
    if buf.remaining() < len {
        return Err(ProtocolError::UnexpectedEof);
    }
    let bytes = buf.split_to(len);
    String::from_utf8(bytes.to_vec()).map_err(|_| ProtocolError::InvalidUtf8)
}

fn get_optional_string(buf: &mut Bytes) -> Result<Option<String>, ProtocolError> {
    if buf.is_empty() {
        return Err(ProtocolError::UnexpectedEof);
    }
    match buf.get_u8() {
        MARKER_ABSENT => Ok(None),
        MARKER_PRESENT => get_string(buf).map(Some),
        marker => Err(ProtocolError::InvalidMarker(marker)),
    }
}
