//! Response envelope decoding.
//!
//! The API wraps payloads as `{status_code, status, data}`, but not
//! consistently:
//!
//! - single resources put the resource under `data`;
//! - collections put an array under `data` and the pagination fields
//!   (`page`, `total_entries`, ...) next to it at the top level;
//! - a few endpoints return the payload bare.
//!
//! `Envelope::classify` decides which of these a body is, and
//! `Envelope::into_target` decodes the matching part of the body into the
//! caller's type. For collections that is the whole body, since
//! `Paginated<T>` carries the top-level pagination fields.

use serde::de::DeserializeOwned;
use serde_json::Value;

use super::error::{DecodeError, DecodeStage};

#[derive(Debug, Clone, PartialEq)]
pub enum Envelope {
    /// `data` holds a single resource; only it is decoded.
    Object(Value),
    /// `data` holds an array; the whole body is decoded.
    Collection,
    /// No envelope; the whole body is decoded.
    Bare,
}

impl Envelope {
    pub fn classify(raw: &[u8]) -> Self {
        match serde_json::from_slice::<Value>(raw) {
            Ok(Value::Object(mut map)) => match map.remove("data") {
                Some(Value::Array(_)) => Envelope::Collection,
                Some(Value::Null) | None => Envelope::Bare,
                Some(data) => Envelope::Object(data),
            },
            _ => Envelope::Bare,
        }
    }

    pub fn stage(&self) -> DecodeStage {
        match self {
            Envelope::Object(_) => DecodeStage::Object,
            Envelope::Collection => DecodeStage::Collection,
            Envelope::Bare => DecodeStage::Bare,
        }
    }

    /// Decode `raw`, the body this envelope was classified from, into `T`.
    pub fn into_target<T: DeserializeOwned>(self, raw: &[u8]) -> Result<T, DecodeError> {
        let stage = self.stage();
        let result = match self {
            Envelope::Object(data) => serde_json::from_value(data),
            Envelope::Collection | Envelope::Bare => serde_json::from_slice(raw),
        };
        result.map_err(|source| DecodeError { stage, source })
    }
}

/// Decode a response body into `T`, unwrapping the envelope as needed.
///
/// An empty body decodes as JSON `null`, which `()` and `Option<_>` accept.
pub fn decode<T: DeserializeOwned>(raw: &[u8]) -> Result<T, DecodeError> {
    if raw.iter().all(u8::is_ascii_whitespace) {
        return serde_json::from_value(Value::Null).map_err(|source| DecodeError {
            stage: DecodeStage::Bare,
            source,
        });
    }
    Envelope::classify(raw).into_target(raw)
}
