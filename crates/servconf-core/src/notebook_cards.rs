//! Codec for the notebook cards feature flag.
//!
//! Notebook cards live inside the feature flag map under a reserved key, and
//! their value is a JSON document encoded as a JSON string:
//!
//! ```json
//! "feature_flags": {
//!   "dev/sql_notebook_cards": "{\"mydb\":[{\"text\":\"hi\",\"dataSources\":[\"t1\"]}]}"
//! }
//! ```
//!
//! Other consumers of the document read that key as-is, so the double
//! encoding stays. These two functions are the only place the raw string is
//! handled.

use thiserror::Error;

use crate::types::NotebookCards;

/// Feature flag key whose value holds the encoded notebook cards.
pub const NOTEBOOK_CARDS_KEY: &str = "dev/sql_notebook_cards";

#[derive(Error, Debug)]
pub enum CardsError {
    #[error("Invalid notebook cards JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Encode cards as single-line JSON, keeping database, card and data source
/// order.
pub fn encode(cards: &NotebookCards) -> Result<String, CardsError> {
    Ok(serde_json::to_string(cards)?)
}

/// Decode the reserved flag's string value.
pub fn decode(raw: &str) -> Result<NotebookCards, CardsError> {
    Ok(serde_json::from_str(raw)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NotebookCard;

    fn cards() -> NotebookCards {
        let mut cards = NotebookCards::new();
        cards.insert(
            "zdb",
            vec![
                NotebookCard::new("second", vec!["t9".to_string(), "t1".to_string()]),
                NotebookCard::new("first", vec![]),
            ],
        );
        cards.insert(
            "adb",
            vec![NotebookCard::new("only", vec!["x".to_string()])],
        );
        cards
    }

    #[test]
    fn decode_reads_double_encoded_value() {
        let decoded = decode(r#"{"mydb":[{"text":"hi","dataSources":["t1"]}]}"#).unwrap();

        let mut expected = NotebookCards::new();
        expected.insert("mydb", vec![NotebookCard::new("hi", vec!["t1".to_string()])]);
        assert_eq!(decoded, expected);
    }

    #[test]
    fn encode_is_single_line_and_ordered() {
        let encoded = encode(&cards()).unwrap();

        assert!(!encoded.contains('\n'));
        assert_eq!(
            encoded,
            r#"{"zdb":[{"text":"second","dataSources":["t9","t1"]},{"text":"first","dataSources":[]}],"adb":[{"text":"only","dataSources":["x"]}]}"#
        );
    }

    #[test]
    fn decode_of_encode_keeps_every_order() {
        let original = cards();
        let decoded = decode(&encode(&original).unwrap()).unwrap();

        assert_eq!(decoded, original);
        assert_eq!(decoded.keys().collect::<Vec<_>>(), vec!["zdb", "adb"]);
        assert_eq!(decoded.get("zdb").unwrap()[0].data_sources, vec!["t9", "t1"]);
    }

    #[test]
    fn decode_rejects_malformed_json() {
        assert!(decode("{not json").is_err());
        assert!(decode(r#"["a list"]"#).is_err());
    }

    #[test]
    fn card_without_data_sources_decodes_empty() {
        let decoded = decode(r#"{"db":[{"text":"bare"}]}"#).unwrap();
        assert!(decoded.get("db").unwrap()[0].data_sources.is_empty());
    }
}
