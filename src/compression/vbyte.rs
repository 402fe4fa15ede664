use crate::core::error::{Error, ErrorKind, Result};

/// Variable byte encoding: 7 payload bits per byte, high bit set on
/// continuation bytes, little-endian. Values use at most 5 bytes.
pub struct VByteEncoder;

impl VByteEncoder {
    pub fn encode_u32(output: &mut Vec<u8>, mut value: u32) {
        while value >= 128 {
            output.push((value & 127) as u8 | 128);
            value >>= 7;
        }
        output.push(value as u8);
    }

    /// Decodes one value, returning `(value, bytes_consumed)`.
    pub fn decode_u32(input: &[u8]) -> Result<(u32, usize)> {
        let mut value = 0u32;
        let mut shift = 0;
        let mut consumed = 0;

        for &byte in input {
            consumed += 1;
            value |= ((byte & 127) as u32) << shift;

            if byte & 128 == 0 {
                return Ok((value, consumed));
            }

            shift += 7;
            if shift > 28 {
                // Max 5 bytes for u32
                return Err(Error::new(ErrorKind::Codec, "varint overflow"));
            }
        }

        Err(Error::new(ErrorKind::Codec, "truncated varint input"))
    }
}

/// Delta encoding over sorted ids: each value is stored as the varint of its
/// difference from the previous one (the first from zero).
pub struct DeltaEncoder;

impl DeltaEncoder {
    pub fn encode_sorted(values: &[u32]) -> Vec<u8> {
        let mut output = Vec::new();
        let mut previous = 0u32;
        for &value in values {
            VByteEncoder::encode_u32(&mut output, value.wrapping_sub(previous));
            previous = value;
        }
        output
    }

    pub fn decode(data: &[u8]) -> Result<Vec<u32>> {
        let mut values = Vec::new();
        let mut previous = 0u32;
        let mut pos = 0;

        while pos < data.len() {
            let (delta, consumed) = VByteEncoder::decode_u32(&data[pos..])?;
            let value = previous.wrapping_add(delta);
            values.push(value);
            previous = value;
            pos += consumed;
        }

        Ok(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::ErrorKind;

    #[test]
    fn single_value_byte_lengths() {
        for (value, expected_len) in [(0u32, 1usize), (127, 1), (128, 2), (16383, 2), (16384, 3)] {
            let mut buf = Vec::new();
            VByteEncoder::encode_u32(&mut buf, value);
            assert_eq!(buf.len(), expected_len, "value {}", value);
            assert_eq!(VByteEncoder::decode_u32(&buf).unwrap(), (value, expected_len));
        }
    }

    #[test]
    fn max_value_round_trips() {
        let mut buf = Vec::new();
        VByteEncoder::encode_u32(&mut buf, u32::MAX);
        assert_eq!(buf.len(), 5);
        assert_eq!(VByteEncoder::decode_u32(&buf).unwrap().0, u32::MAX);
    }

    #[test]
    fn overflow_is_detected() {
        let err = VByteEncoder::decode_u32(&[0x80; 6]).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Codec);
        assert!(err.context.contains("overflow"));
    }

    #[test]
    fn truncation_is_detected() {
        let err = VByteEncoder::decode_u32(&[0x80]).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Codec);
        assert!(err.context.contains("truncated"));
    }

    #[test]
    fn delta_round_trip() {
        let values = vec![3u32, 10, 11, 25, 26];
        let encoded = DeltaEncoder::encode_sorted(&values);
        assert_eq!(DeltaEncoder::decode(&encoded).unwrap(), values);
    }

    #[test]
    fn delta_empty() {
        assert!(DeltaEncoder::encode_sorted(&[]).is_empty());
        assert!(DeltaEncoder::decode(&[]).unwrap().is_empty());
    }
}
