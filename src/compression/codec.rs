use serde_json::Value;

use crate::compression::vbyte::DeltaEncoder;
use crate::core::error::{Error, Result};
use crate::core::types::Encoding;

/// Posting-list payload codec.
///
/// Lists made entirely of non-negative integers are sorted and stored as
/// delta+varint; anything else (strings, objects, mixed) is stored as UTF-8
/// JSON in its original order.
pub struct PostingCodec;

impl PostingCodec {
    pub fn encode(values: &[Value]) -> Result<(Vec<u8>, Encoding)> {
        if values.is_empty() {
            return Ok((Vec::new(), Encoding::DeltaVarint));
        }

        if let Some(mut ids) = Self::as_integer_ids(values) {
            ids.sort_unstable();
            return Ok((DeltaEncoder::encode_sorted(&ids), Encoding::DeltaVarint));
        }

        Ok((serde_json::to_vec(values)?, Encoding::Json))
    }

    pub fn decode(payload: &[u8], encoding: Encoding) -> Result<Vec<Value>> {
        match encoding {
            Encoding::DeltaVarint => {
                if payload.is_empty() {
                    return Ok(Vec::new());
                }
                let ids = DeltaEncoder::decode(payload)?;
                Ok(ids.into_iter().map(|id| Value::from(id as u64)).collect())
            }
            Encoding::Json => {
                let parsed: Value = serde_json::from_slice(payload)
                    .map_err(|e| Error::codec(format!("invalid JSON payload: {}", e)))?;
                match parsed {
                    Value::Array(values) => Ok(values),
                    other => Err(Error::codec(format!(
                        "JSON payload must be an array, got {}",
                        kind_of(&other)
                    ))),
                }
            }
        }
    }

    fn as_integer_ids(values: &[Value]) -> Option<Vec<u32>> {
        values
            .iter()
            .map(|v| {
                v.as_u64()
                    .filter(|n| *n <= u32::MAX as u64)
                    .map(|n| n as u32)
            })
            .collect()
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::ErrorKind;
    use serde_json::json;

    #[test]
    fn empty_list_is_zero_bytes_delta_varint() {
        let (bytes, encoding) = PostingCodec::encode(&[]).unwrap();
        assert!(bytes.is_empty());
        assert_eq!(encoding, Encoding::DeltaVarint);
        assert!(PostingCodec::decode(&bytes, encoding).unwrap().is_empty());
    }

    #[test]
    fn integer_list_round_trips_sorted() {
        let values = vec![json!(3), json!(10), json!(11), json!(25), json!(26)];
        let (bytes, encoding) = PostingCodec::encode(&values).unwrap();
        assert_eq!(encoding, Encoding::DeltaVarint);
        assert_eq!(PostingCodec::decode(&bytes, encoding).unwrap(), values);
    }

    #[test]
    fn unsorted_integers_decode_sorted() {
        let values = vec![json!(26), json!(3), json!(11)];
        let (bytes, encoding) = PostingCodec::encode(&values).unwrap();
        assert_eq!(encoding, Encoding::DeltaVarint);
        assert_eq!(
            PostingCodec::decode(&bytes, encoding).unwrap(),
            vec![json!(3), json!(11), json!(26)]
        );
    }

    #[test]
    fn string_list_takes_json_path_in_order() {
        let values = vec![json!("doc-1"), json!("doc-2")];
        let (bytes, encoding) = PostingCodec::encode(&values).unwrap();
        assert_eq!(encoding, Encoding::Json);
        assert_eq!(PostingCodec::decode(&bytes, encoding).unwrap(), values);
    }

    #[test]
    fn mixed_list_takes_json_path() {
        let values = vec![json!(1), json!("doc-2"), json!({"docId": "doc-3"})];
        let (bytes, encoding) = PostingCodec::encode(&values).unwrap();
        assert_eq!(encoding, Encoding::Json);
        assert_eq!(PostingCodec::decode(&bytes, encoding).unwrap(), values);
    }

    #[test]
    fn negative_or_fractional_numbers_take_json_path() {
        let values = vec![json!(-1), json!(2)];
        let (_, encoding) = PostingCodec::encode(&values).unwrap();
        assert_eq!(encoding, Encoding::Json);

        let values = vec![json!(1.5)];
        let (_, encoding) = PostingCodec::encode(&values).unwrap();
        assert_eq!(encoding, Encoding::Json);
    }

    #[test]
    fn non_array_json_is_a_decode_error() {
        let err = PostingCodec::decode(b"{\"docId\":1}", Encoding::Json).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Codec);
        assert!(err.context.contains("array"));
    }
}
