//! Datum and redeemer payloads.
//!
//! Scripts receive their arguments as [`PlutusData`], a small tree of constructors, maps,
//! lists, integers and byte strings. Callers may hand the builder such a tree directly,
//! a JSON document in the detailed-schema encoding used by ledger tooling, or bytes that
//! were already encoded elsewhere; [`BuilderData`] carries whichever form was given.

use std::error;
use std::fmt;

use serde_json::{json, Value as Json};

/// A value that can be passed to a script.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum PlutusData {
    /// A constructor application: the index of the alternative and its fields.
    Constr { alternative: u64, fields: Vec<PlutusData> },
    Map(Vec<(PlutusData, PlutusData)>),
    List(Vec<PlutusData>),
    Int(i128),
    Bytes(Vec<u8>),
}

/// Errors that can occur when interpreting a datum or redeemer payload.
#[derive(Debug)]
pub enum DataError {
    /// The payload was not well-formed JSON.
    Json(serde_json::Error),
    /// The JSON document did not follow the detailed schema. The string names the
    /// offending node.
    Schema(String),
}

impl fmt::Display for DataError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataError::Json(e) => write!(f, "Invalid JSON payload: {}", e),
            DataError::Schema(node) => write!(f, "Not a detailed-schema data node: {}", node),
        }
    }
}

impl error::Error for DataError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            DataError::Json(e) => Some(e),
            DataError::Schema(_) => None,
        }
    }
}

impl From<serde_json::Error> for DataError {
    fn from(e: serde_json::Error) -> Self {
        DataError::Json(e)
    }
}

impl PlutusData {
    /// Constructs the constructor application `Constr alternative fields`.
    pub fn constr(alternative: u64, fields: Vec<PlutusData>) -> Self {
        PlutusData::Constr {
            alternative,
            fields,
        }
    }

    /// The unit value, `Constr 0 []`.
    pub fn unit() -> Self {
        PlutusData::constr(0, vec![])
    }

    /// Returns the detailed-schema JSON encoding of this value.
    pub fn to_json(&self) -> Json {
        match self {
            PlutusData::Constr {
                alternative,
                fields,
            } => json!({
                "constructor": alternative,
                "fields": fields.iter().map(PlutusData::to_json).collect::<Vec<_>>(),
            }),
            PlutusData::Map(entries) => json!({
                "map": entries
                    .iter()
                    .map(|(k, v)| json!({ "k": k.to_json(), "v": v.to_json() }))
                    .collect::<Vec<_>>(),
            }),
            PlutusData::List(items) => json!({
                "list": items.iter().map(PlutusData::to_json).collect::<Vec<_>>(),
            }),
            // JSON numbers outside the i64/u64 range are not portable.
            PlutusData::Int(i) => match (i64::try_from(*i), u64::try_from(*i)) {
                (Ok(i), _) => json!({ "int": i }),
                (_, Ok(u)) => json!({ "int": u }),
                _ => json!({ "int": i.to_string() }),
            },
            PlutusData::Bytes(b) => json!({ "bytes": hex::encode(b) }),
        }
    }

    /// Parses a value from its detailed-schema JSON encoding.
    pub fn from_json(json: &Json) -> Result<Self, DataError> {
        let schema_err = || DataError::Schema(json.to_string());
        let obj = json.as_object().ok_or_else(schema_err)?;

        if let Some(alternative) = obj.get("constructor") {
            let alternative = alternative.as_u64().ok_or_else(schema_err)?;
            let fields = obj
                .get("fields")
                .and_then(Json::as_array)
                .ok_or_else(schema_err)?
                .iter()
                .map(PlutusData::from_json)
                .collect::<Result<_, _>>()?;
            Ok(PlutusData::Constr {
                alternative,
                fields,
            })
        } else if let Some(entries) = obj.get("map") {
            entries
                .as_array()
                .ok_or_else(schema_err)?
                .iter()
                .map(|entry| -> Result<_, DataError> {
                    let k = entry.get("k").ok_or_else(schema_err)?;
                    let v = entry.get("v").ok_or_else(schema_err)?;
                    Ok((PlutusData::from_json(k)?, PlutusData::from_json(v)?))
                })
                .collect::<Result<_, _>>()
                .map(PlutusData::Map)
        } else if let Some(items) = obj.get("list") {
            items
                .as_array()
                .ok_or_else(schema_err)?
                .iter()
                .map(PlutusData::from_json)
                .collect::<Result<_, _>>()
                .map(PlutusData::List)
        } else if let Some(int) = obj.get("int") {
            int_from_json(int).map(PlutusData::Int).ok_or_else(schema_err)
        } else if let Some(bytes) = obj.get("bytes") {
            bytes
                .as_str()
                .and_then(|s| hex::decode(s).ok())
                .map(PlutusData::Bytes)
                .ok_or_else(schema_err)
        } else {
            Err(schema_err())
        }
    }
}

fn int_from_json(json: &Json) -> Option<i128> {
    match json {
        Json::Number(n) => n
            .as_i64()
            .map(i128::from)
            .or_else(|| n.as_u64().map(i128::from)),
        Json::String(s) => s.parse().ok(),
        _ => None,
    }
}

/// A datum or redeemer payload as supplied to the builder.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum BuilderData {
    /// A structured value.
    Structured(PlutusData),
    /// A detailed-schema JSON document, stored in compact form.
    Json(String),
    /// A value that has already been encoded, passed through untouched.
    Cbor(Vec<u8>),
}

impl BuilderData {
    /// Parses and validates a detailed-schema JSON document.
    ///
    /// The document is stored re-serialized in compact form, so two payloads that differ
    /// only in whitespace compare equal.
    pub fn json(document: &str) -> Result<Self, DataError> {
        let parsed: Json = serde_json::from_str(document)?;
        PlutusData::from_json(&parsed)?;
        Ok(BuilderData::Json(serde_json::to_string(&parsed)?))
    }

    /// Wraps bytes that are already encoded.
    pub fn cbor(bytes: impl Into<Vec<u8>>) -> Self {
        BuilderData::Cbor(bytes.into())
    }

    /// Returns the structured form of this payload, if it is available without decoding
    /// pre-encoded bytes.
    pub fn to_plutus_data(&self) -> Option<PlutusData> {
        match self {
            BuilderData::Structured(d) => Some(d.clone()),
            BuilderData::Json(s) => serde_json::from_str::<Json>(s)
                .ok()
                .and_then(|j| PlutusData::from_json(&j).ok()),
            BuilderData::Cbor(_) => None,
        }
    }
}

impl From<PlutusData> for BuilderData {
    fn from(data: PlutusData) -> Self {
        BuilderData::Structured(data)
    }
}

#[cfg(any(test, feature = "test-dependencies"))]
pub mod testing {
    use proptest::collection::vec;
    use proptest::prelude::*;

    use super::{BuilderData, PlutusData};

    pub fn arb_plutus_data() -> impl Strategy<Value = PlutusData> {
        let leaf = prop_oneof![
            any::<i64>().prop_map(|i| PlutusData::Int(i.into())),
            vec(any::<u8>(), 0..16).prop_map(PlutusData::Bytes),
        ];
        leaf.prop_recursive(3, 16, 4, |inner| {
            prop_oneof![
                (0u64..4, vec(inner.clone(), 0..4))
                    .prop_map(|(alternative, fields)| PlutusData::constr(alternative, fields)),
                vec(inner.clone(), 0..4).prop_map(PlutusData::List),
                vec((inner.clone(), inner), 0..3).prop_map(PlutusData::Map),
            ]
        })
    }

    prop_compose! {
        pub fn arb_builder_data()(data in arb_plutus_data()) -> BuilderData {
            BuilderData::Structured(data)
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use proptest::prelude::*;

    use super::{testing::arb_plutus_data, BuilderData, DataError, PlutusData};

    #[test]
    fn parses_detailed_schema() {
        let data = BuilderData::json(
            r#"{ "constructor": 1, "fields": [ { "int": 42 }, { "bytes": "cafe" },
                 { "list": [] }, { "map": [ { "k": { "int": -1 }, "v": { "bytes": "" } } ] } ] }"#,
        )
        .unwrap();
        assert_eq!(
            data.to_plutus_data(),
            Some(PlutusData::constr(
                1,
                vec![
                    PlutusData::Int(42),
                    PlutusData::Bytes(vec![0xca, 0xfe]),
                    PlutusData::List(vec![]),
                    PlutusData::Map(vec![(PlutusData::Int(-1), PlutusData::Bytes(vec![]))]),
                ]
            ))
        );
    }

    #[test]
    fn json_is_stored_compactly() {
        let a = BuilderData::json(r#"{ "int" : 1 }"#).unwrap();
        let b = BuilderData::json(r#"{"int":1}"#).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn rejects_malformed_documents() {
        assert_matches!(BuilderData::json("{"), Err(DataError::Json(_)));
        assert_matches!(BuilderData::json(r#"{"text":"hi"}"#), Err(DataError::Schema(_)));
        assert_matches!(
            BuilderData::json(r#"{"bytes":"not hex"}"#),
            Err(DataError::Schema(_))
        );
        assert_matches!(
            BuilderData::json(r#"{"constructor":0}"#),
            Err(DataError::Schema(_))
        );
    }

    #[test]
    fn big_integers_survive_as_strings() {
        let big = PlutusData::Int(i128::from(u64::MAX) + 1);
        assert_eq!(PlutusData::from_json(&big.to_json()).unwrap(), big);
    }

    #[test]
    fn cbor_is_opaque() {
        assert_eq!(BuilderData::cbor(vec![0xd8, 0x79]).to_plutus_data(), None);
    }

    proptest! {
        #[test]
        fn json_encoding_round_trips(data in arb_plutus_data()) {
            prop_assert_eq!(PlutusData::from_json(&data.to_json()).unwrap(), data);
        }
    }
}
