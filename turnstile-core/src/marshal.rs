//! The marshaling boundary between live values and their wire form.
//!
//! `decode(encode(v)) == v` holds for plain data and actor references. An
//! actor reference encodes as exactly its token string. Turning a decoded
//! token back into something deliverable is the job of the runtime that
//! owns the address space, not of this module.

use crate::Value;

#[derive(Debug, thiserror::Error)]
#[error("unable to marshal value: {0}")]
pub struct MarshalError(#[from] serde_json::Error);

/// Fails if `value` holds a non-finite float.
pub fn encode(value: &Value) -> Result<String, MarshalError> {
    Ok(serde_json::to_string(value)?)
}

pub fn decode(wire: &str) -> Result<Value, MarshalError> {
    Ok(serde_json::from_str(wire)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Token;

    #[test]
    fn reference_encodes_as_its_token() {
        let token = Token::parse("checkpoint#abc").unwrap();
        assert_eq!(
            encode(&Value::Ref(token.clone())).unwrap(),
            "\"checkpoint#abc\""
        );
        assert_eq!(decode("\"checkpoint#abc\"").unwrap(), Value::Ref(token));
    }

    #[test]
    fn strings_that_look_like_tokens_stay_strings() {
        let values = [
            Value::from("checkpoint#abc"),
            Value::from("~"),
            Value::from("~~checkpoint#abc"),
            Value::from("plain"),
        ];
        for v in values {
            let wire = encode(&v).unwrap();
            assert_eq!(decode(&wire).unwrap(), v, "wire form {wire}");
        }
    }

    #[test]
    fn nested_state_round_trips() {
        let peer = Token::parse("checkpoint#peer").unwrap();
        let remote = Token::parse("elsewhere#x").unwrap();
        let state: Value = [
            ("balance", Value::from(42)),
            ("rate", Value::from(1.5)),
            ("open", Value::from(true)),
            ("note", Value::Null),
            (
                "peers",
                Value::List(vec![Value::from(&peer), Value::from(&remote), "x".into()]),
            ),
        ]
        .into_iter()
        .collect();
        let wire = encode(&state).unwrap();
        let back = decode(&wire).unwrap();
        assert_eq!(back, state);
        assert_eq!(back.refs(), vec![&peer, &remote]);
    }

    #[test]
    fn map_keys_are_ordered() {
        let a: Value = [("b", 1), ("a", 2)].into_iter().collect();
        assert_eq!(encode(&a).unwrap(), r#"{"a":2,"b":1}"#);
    }

    #[test]
    fn non_finite_floats_are_refused() {
        for f in [f64::INFINITY, f64::NEG_INFINITY, f64::NAN] {
            let v = Value::List(vec![Value::from(1), Value::Float(f)]);
            assert!(!v.is_encodable());
            assert!(encode(&v).is_err());
        }
        assert!(Value::from(1.5).is_encodable());
    }
}
