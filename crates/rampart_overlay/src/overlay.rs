//! The typed overlay itself.

use serde::de::{DeserializeOwned, Error as _};
use serde::ser::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::{DecodeError, EncodeError, OverlayResult};
use crate::merge::{deep_merge, value_type_name};

/// A typed view paired with the verbatim structure it was decoded from.
///
/// The raw capture is taken once, at decode time, and is never modified
/// afterwards. Only the typed view is mutable. Encoding produces the raw
/// capture with every key emitted by the typed view overwritten by the typed
/// value; keys the typed view does not emit are passed through verbatim.
///
/// For the round-trip law to hold (decode then encode reproduces the input),
/// the typed schema must not emit keys that were absent from the input: unset
/// fields should be skipped on serialization (`Option::is_none`,
/// `Vec::is_empty`, `String::is_empty` or [`is_default`]).
#[derive(Debug, Clone, PartialEq)]
pub struct Overlaid<T> {
    typed: T,
    raw: Map<String, Value>,
}

impl<T> Overlaid<T> {
    /// Wrap a typed value that has no original input, e.g. an entry injected by policy.
    pub fn new(typed: T) -> Self {
        Self {
            typed,
            raw: Map::new(),
        }
    }

    /// The typed view.
    pub fn typed(&self) -> &T {
        &self.typed
    }

    /// Mutable access to the typed view.
    pub fn typed_mut(&mut self) -> &mut T {
        &mut self.typed
    }

    /// The raw capture taken at decode time.
    pub fn raw(&self) -> &Map<String, Value> {
        &self.raw
    }

    /// Split into the typed view and the raw capture.
    pub fn into_parts(self) -> (T, Map<String, Value>) {
        (self.typed, self.raw)
    }
}

impl<T: DeserializeOwned> Overlaid<T> {
    /// Decode from JSON bytes.
    pub fn decode(bytes: &[u8]) -> OverlayResult<Self> {
        let value: Value = serde_json::from_slice(bytes).map_err(DecodeError::Malformed)?;
        Self::from_value(value)
    }

    /// Decode from an already parsed structured value.
    ///
    /// Unknown keys are ignored by the typed view and kept in the raw capture.
    pub fn from_value(value: Value) -> OverlayResult<Self> {
        let raw = match value {
            Value::Object(map) => map,
            other => return Err(DecodeError::NotAMapping(value_type_name(&other))),
        };
        let typed = serde_json::from_value(Value::Object(raw.clone())).map_err(DecodeError::Schema)?;
        Ok(Self { typed, raw })
    }
}

impl<T: Serialize> Overlaid<T> {
    /// Encode to a structured value: the raw capture with the typed view merged over it.
    pub fn to_value(&self) -> Result<Value, EncodeError> {
        let typed = match serde_json::to_value(&self.typed)? {
            Value::Object(map) => map,
            other => return Err(EncodeError::NotAMapping(value_type_name(&other))),
        };
        let mut merged = self.raw.clone();
        deep_merge(&mut merged, typed);
        Ok(Value::Object(merged))
    }

    /// Encode to compact JSON bytes.
    pub fn encode(&self) -> Result<Vec<u8>, EncodeError> {
        Ok(serde_json::to_vec(&self.to_value()?)?)
    }

    /// Encode to indented JSON bytes.
    pub fn encode_pretty(&self) -> Result<Vec<u8>, EncodeError> {
        Ok(serde_json::to_vec_pretty(&self.to_value()?)?)
    }
}

impl<T: Default> Default for Overlaid<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: Serialize> Serialize for Overlaid<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().map_err(S::Error::custom)?.serialize(serializer)
    }
}

impl<'de, T: DeserializeOwned> Deserialize<'de> for Overlaid<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::from_value(value).map_err(D::Error::custom)
    }
}

/// `skip_serializing_if` helper for nested structs that were absent from the input.
pub fn is_default<T: Default + PartialEq>(value: &T) -> bool {
    *value == T::default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    struct Rule {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        age: Option<i64>,
    }

    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct Bucket {
        #[serde(default, skip_serializing_if = "String::is_empty")]
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        versioning: Option<Versioning>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        rules: Vec<Overlaid<Rule>>,
    }

    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    struct Versioning {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        enabled: Option<bool>,
    }

    #[test]
    fn test_roundtrip_preserves_unknown_fields() {
        let input = json!({
            "name": "data",
            "storageClass": "NEARLINE",
            "labels": {"team": "genomics"},
            "versioning": {"enabled": true, "extra": 1}
        });

        let bucket: Overlaid<Bucket> = Overlaid::from_value(input.clone()).unwrap();

        assert_eq!(bucket.typed().name, "data");
        assert_eq!(bucket.to_value().unwrap(), input);
    }

    #[test]
    fn test_roundtrip_does_not_add_absent_fields() {
        let input = json!({"labels": {"a": "b"}});
        let bucket: Overlaid<Bucket> = Overlaid::from_value(input.clone()).unwrap();
        assert_eq!(bucket.to_value().unwrap(), input);
    }

    #[test]
    fn test_mutation_overrides_raw_value() {
        let input = json!({"name": "data", "versioning": {"enabled": false, "extra": 1}});
        let mut bucket: Overlaid<Bucket> = Overlaid::from_value(input).unwrap();

        bucket.typed_mut().versioning = Some(Versioning { enabled: Some(true) });

        assert_eq!(
            bucket.to_value().unwrap(),
            json!({"name": "data", "versioning": {"enabled": true, "extra": 1}})
        );
    }

    #[test]
    fn test_nested_overlays_keep_their_own_extras() {
        let input = json!({"rules": [{"age": 3, "note": "first"}, {"storageClass": "COLDLINE"}]});
        let mut bucket: Overlaid<Bucket> = Overlaid::from_value(input).unwrap();

        bucket.typed_mut().rules.push(Overlaid::new(Rule { age: Some(30) }));

        assert_eq!(
            bucket.to_value().unwrap(),
            json!({"rules": [
                {"age": 3, "note": "first"},
                {"storageClass": "COLDLINE"},
                {"age": 30}
            ]})
        );
    }

    #[test]
    fn test_decode_rejects_malformed_bytes() {
        let err = Overlaid::<Bucket>::decode(b"{\"name\": ").unwrap_err();
        assert!(matches!(err, DecodeError::Malformed(_)));
    }

    #[test]
    fn test_decode_rejects_type_mismatch() {
        let err = Overlaid::<Bucket>::decode(br#"{"name": 42}"#).unwrap_err();
        assert!(matches!(err, DecodeError::Schema(_)));
    }

    #[test]
    fn test_decode_rejects_non_mapping() {
        let err = Overlaid::<Bucket>::decode(b"[1, 2]").unwrap_err();
        assert!(matches!(err, DecodeError::NotAMapping("a list")));
    }

    #[test]
    fn test_encode_bytes_are_stable() {
        let input = br#"{"name":"data","zeta":1,"alpha":{"b":2,"a":1}}"#;
        let bucket: Overlaid<Bucket> = Overlaid::decode(input).unwrap();

        let first = bucket.encode().unwrap();
        let second = bucket.encode().unwrap();

        assert_eq!(first, second);
        assert_eq!(first, input.to_vec());
    }

    #[test]
    fn test_is_default() {
        assert!(is_default(&Versioning::default()));
        assert!(!is_default(&Versioning { enabled: Some(false) }));
    }
}
