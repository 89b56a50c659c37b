//! The backend mixes numeric and string ids (`"doctorId": "12"` next to
//! `"id": 12`). These helpers accept both.

use serde::{Deserialize, Deserializer};

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Number(i64),
    Text(String),
}

fn parse<E: serde::de::Error>(raw: RawId) -> Result<i64, E> {
    match raw {
        RawId::Number(n) => Ok(n),
        RawId::Text(s) => s
            .trim()
            .parse()
            .map_err(|_| E::custom(format!("expected numeric id, got '{s}'"))),
    }
}

pub fn lenient<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    parse(RawId::deserialize(deserializer)?)
}

pub fn lenient_opt<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
    match Option::<RawId>::deserialize(deserializer)? {
        Some(raw) => parse(raw).map(Some),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct Row {
        #[serde(deserialize_with = "super::lenient")]
        id: i64,
        #[serde(default, deserialize_with = "super::lenient_opt")]
        other: Option<i64>,
    }

    #[test]
    fn accepts_numbers_and_strings() {
        let a: Row = serde_json::from_str(r#"{"id": 4, "other": "9"}"#).unwrap();
        assert_eq!((a.id, a.other), (4, Some(9)));
        let b: Row = serde_json::from_str(r#"{"id": " 12 "}"#).unwrap();
        assert_eq!((b.id, b.other), (12, None));
        let c: Row = serde_json::from_str(r#"{"id": 1, "other": null}"#).unwrap();
        assert_eq!(c.other, None);
    }

    #[test]
    fn rejects_non_numeric_text() {
        assert!(serde_json::from_str::<Row>(r#"{"id": "abc"}"#).is_err());
    }
}
