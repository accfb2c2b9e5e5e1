//! Length-prefixed binary frame codec for the WebSocket event transport.
//!
//! Wire layout: each frame is an 8-byte little-endian length followed by a
//! bincode-encoded value. The server may batch several frames into a single
//! WebSocket message, so decoding always walks the whole buffer.

use codee::{Decoder, Encoder};
use serde::{Serialize, de::DeserializeOwned};

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("frame serialization failed")]
    Serialization,
    #[error("truncated frame: need {need} bytes, have {have}")]
    Truncated { need: usize, have: usize },
}

/// Codec for a single length-prefixed frame.
///
/// Usable directly as a `codee` codec with `use_websocket`, though the sync
/// provider prefers the raw-bytes path plus [`decode_batch`] so batched
/// server frames are not silently truncated to their first entry.
pub struct FrameCodec;

impl<T: Serialize> Encoder<T> for FrameCodec {
    type Error = CodecError;
    type Encoded = Vec<u8>;

    fn encode(val: &T) -> Result<Self::Encoded, Self::Error> {
        encode_frame(val)
    }
}

impl<T: DeserializeOwned> Decoder<T> for FrameCodec {
    type Error = CodecError;
    type Encoded = [u8];

    fn decode(val: &Self::Encoded) -> Result<T, Self::Error> {
        if val.len() < 8 {
            return Err(CodecError::Truncated {
                need: 8,
                have: val.len(),
            });
        }
        let length_bytes: [u8; 8] = val[..8]
            .try_into()
            .map_err(|_| CodecError::Serialization)?;
        let length = u64::from_le_bytes(length_bytes) as usize;
        if val.len() < 8 + length {
            return Err(CodecError::Truncated {
                need: 8 + length,
                have: val.len(),
            });
        }
        bincode::serde::decode_from_slice(&val[8..8 + length], bincode::config::standard())
            .map(|(frame, _)| frame)
            .map_err(|_| CodecError::Serialization)
    }
}

/// Encode one value as a length-prefixed frame.
pub fn encode_frame<T: Serialize>(val: &T) -> Result<Vec<u8>, CodecError> {
    let encoded = bincode::serde::encode_to_vec(val, bincode::config::standard())
        .map_err(|_| CodecError::Serialization)?;
    let len = encoded.len() as u64;
    let mut buffer = Vec::with_capacity(8 + encoded.len());
    buffer.extend_from_slice(&len.to_le_bytes());
    buffer.extend_from_slice(&encoded);
    Ok(buffer)
}

/// Decode every length-prefixed frame in `data`.
///
/// Stops at the first malformed or truncated frame; anything decoded up to
/// that point is still returned.
pub fn decode_batch<T: DeserializeOwned>(data: &[u8]) -> Vec<T> {
    let mut frames = Vec::new();
    let mut offset = 0;

    while offset + 8 <= data.len() {
        let length_bytes: [u8; 8] = match data[offset..offset + 8].try_into() {
            Ok(b) => b,
            Err(_) => break,
        };
        let length = u64::from_le_bytes(length_bytes) as usize;
        offset += 8;

        if offset + length > data.len() {
            log::warn!(
                "[codec] incomplete frame: need {} bytes, have {}",
                length,
                data.len() - offset
            );
            break;
        }

        match bincode::serde::decode_from_slice::<T, _>(
            &data[offset..offset + length],
            bincode::config::standard(),
        ) {
            Ok((frame, _)) => frames.push(frame),
            Err(e) => {
                log::warn!("[codec] failed to decode frame at offset {offset}: {e:?}");
                break;
            }
        }

        offset += length;
    }

    frames
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Ping {
        seq: u32,
        note: String,
    }

    #[test]
    fn batch_of_frames_round_trips() {
        let a = Ping { seq: 1, note: "a".into() };
        let b = Ping { seq: 2, note: "b".into() };
        let mut wire = encode_frame(&a).unwrap();
        wire.extend(encode_frame(&b).unwrap());

        let decoded: Vec<Ping> = decode_batch(&wire);
        assert_eq!(decoded, vec![a, b]);
    }

    #[test]
    fn truncated_tail_is_dropped() {
        let a = Ping { seq: 1, note: "a".into() };
        let mut wire = encode_frame(&a).unwrap();
        let tail = encode_frame(&Ping { seq: 2, note: "b".into() }).unwrap();
        wire.extend_from_slice(&tail[..tail.len() - 3]);

        let decoded: Vec<Ping> = decode_batch(&wire);
        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded[0].seq, 1);
    }

    #[test]
    fn single_frame_decoder_matches_encoder() {
        let ping = Ping { seq: 7, note: "x".into() };
        let wire = <FrameCodec as Encoder<Ping>>::encode(&ping).unwrap();
        let back: Ping = <FrameCodec as Decoder<Ping>>::decode(&wire).unwrap();
        assert_eq!(back, ping);
    }
}
