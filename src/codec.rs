//! Opaque, URL-safe cursor tokens.
//!
//! A token is the cursor written as a small JSON object and then encoded with
//! unpadded URL-safe base64, so it can travel in a query parameter without
//! further escaping.

use crate::{Cursor, OrderingSpec, PaginationError, Position, Result, Value, TRACING_TARGET_CODEC};
use ::base64::prelude::*;

#[derive(Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
struct CursorToken {
    #[serde(rename = "o")]
    offset: usize,
    #[serde(rename = "r")]
    reverse: bool,
    #[serde(rename = "p", default, skip_serializing_if = "Option::is_none")]
    position: Option<Vec<(String, Value)>>,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct CursorCodec;

impl CursorCodec {
    pub fn encode(cursor: &Cursor) -> Result<String> {
        let token = CursorToken {
            offset: cursor.offset,
            reverse: cursor.reverse,
            position: cursor.position.clone().map(|position| position.into_iter().collect()),
        };
        let json = serde_json::to_vec(&token)
            .map_err(|err| PaginationError::malformed(format!("cursor cannot be serialized: {err}")))?;
        let encoded = BASE64_URL_SAFE_NO_PAD.encode(json);
        tracing::trace!(target: TRACING_TARGET_CODEC, offset = cursor.offset, reverse = cursor.reverse, "Encoded cursor");
        Ok(encoded)
    }

    /// Decodes a token without looking at any ordering.
    pub fn decode(encoded: &str) -> Result<Cursor> {
        let bytes = BASE64_URL_SAFE_NO_PAD
            .decode(encoded.trim())
            .map_err(|err| PaginationError::malformed(format!("not base64: {err}")))?;
        let token: CursorToken =
            serde_json::from_slice(&bytes).map_err(|err| PaginationError::malformed(format!("invalid token: {err}")))?;
        tracing::trace!(target: TRACING_TARGET_CODEC, offset = token.offset, reverse = token.reverse, "Decoded cursor");
        Ok(Cursor {
            offset: token.offset,
            reverse: token.reverse,
            position: token.position.map(Position::new),
        })
    }

    /// Decodes a token and checks its position against `ordering`: the field
    /// names must line up and every value must coerce to its field's declared
    /// kind.
    pub fn decode_for(encoded: &str, ordering: &OrderingSpec) -> Result<Cursor> {
        let mut cursor = Self::decode(encoded)?;
        if let Some(position) = cursor.position.take() {
            position.check_aligned(ordering)?;
            let coerced = position
                .into_iter()
                .zip(ordering.iter())
                .map(|((name, value), field)| match field.kind {
                    Some(kind) => value.coerce(kind).map(|value| (name, value)),
                    None => Ok((name, value)),
                })
                .collect::<Result<Vec<_>>>()?;
            cursor.position = Some(Position::new(coerced));
        }
        Ok(cursor)
    }
}
