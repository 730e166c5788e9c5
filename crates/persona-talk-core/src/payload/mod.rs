//! Embedded-payload codec for tutoring replies.
//!
//! The tutoring persona appends a `[SAVE_DATA: {...}]` tag to a reply when the
//! student agrees to save the session. [`decode`] splits a raw reply into the
//! text that is shown (and spoken) and the typed record carried by the tag.
//!
//! Outcomes, for the first marker followed by an object only:
//! - no tag: text unchanged, [`PayloadOutcome::Absent`];
//! - tag with malformed or unterminated JSON: text unchanged,
//!   [`PayloadError::Malformed`];
//! - tag with valid JSON of the wrong shape: tag removed, record rejected;
//! - tag with a complete record: tag removed, [`PayloadOutcome::Record`].
//!
//! Decoding has no side effects.

mod scanner;

use persona_talk_protocol::{EmbeddedRecord, Evaluation, ParseEvaluationError, SAVE_DATA_TAG};
use scanner::TagScan;
use serde_json::{Map, Value};

/// Reasons an embedded payload was not turned into a record.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PayloadError {
    /// The tag body is not valid JSON.
    #[error("embedded payload is not valid JSON: {0}")]
    Malformed(String),
    /// The tag body is JSON but not an object.
    #[error("embedded payload is not a JSON object")]
    NotAnObject,
    /// A required field is missing.
    #[error("embedded payload is missing field `{0}`")]
    MissingField(&'static str),
    /// A required field is present but not a string.
    #[error("embedded payload field `{0}` is not a string")]
    NotAString(&'static str),
    /// The evaluation is not one of the four grade letters.
    #[error(transparent)]
    Evaluation(#[from] ParseEvaluationError),
}

/// What the first embedded tag of a reply yielded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayloadOutcome {
    /// No tag present.
    Absent,
    /// A complete record was decoded.
    Record(EmbeddedRecord),
    /// A tag was present but produced no record.
    Rejected(PayloadError),
}

/// A reply split into visible text and payload outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedReply {
    /// Text to display and speak.
    pub visible_text: String,
    /// Result of decoding the first tag.
    pub outcome: PayloadOutcome,
}

impl DecodedReply {
    /// The decoded record, if any.
    pub fn record(&self) -> Option<&EmbeddedRecord> {
        match &self.outcome {
            PayloadOutcome::Record(record) => Some(record),
            _ => None,
        }
    }

    /// Split into the `(visible_text, record)` pair.
    pub fn into_parts(self) -> (String, Option<EmbeddedRecord>) {
        match self.outcome {
            PayloadOutcome::Record(record) => (self.visible_text, Some(record)),
            _ => (self.visible_text, None),
        }
    }
}

/// Decode the first embedded tag of `raw`.
pub fn decode(raw: &str) -> DecodedReply {
    let found = match scanner::find_tag(raw, SAVE_DATA_TAG) {
        TagScan::Absent => return unchanged(raw, PayloadOutcome::Absent),
        TagScan::Incomplete(offset) => {
            return unchanged(
                raw,
                PayloadOutcome::Rejected(PayloadError::Malformed(format!(
                    "unterminated tag at byte {offset}"
                ))),
            );
        }
        TagScan::Complete(found) => found,
    };
    let value = match serde_json::from_str::<Value>(&raw[found.body.clone()]) {
        Ok(value) => value,
        Err(err) => {
            return unchanged(
                raw,
                PayloadOutcome::Rejected(PayloadError::Malformed(err.to_string())),
            );
        }
    };
    let mut visible = String::with_capacity(raw.len());
    visible.push_str(&raw[..found.span.start]);
    visible.push_str(&raw[found.span.end..]);
    let outcome = match record_from_value(value) {
        Ok(record) => PayloadOutcome::Record(record),
        Err(err) => PayloadOutcome::Rejected(err),
    };
    DecodedReply {
        visible_text: visible.trim().to_string(),
        outcome,
    }
}

/// Decode `raw` into `(visible_text, record)`.
pub fn extract(raw: &str) -> (String, Option<EmbeddedRecord>) {
    decode(raw).into_parts()
}

fn unchanged(raw: &str, outcome: PayloadOutcome) -> DecodedReply {
    DecodedReply {
        visible_text: raw.to_string(),
        outcome,
    }
}

/// Require the four record fields as JSON strings; extra keys are ignored.
fn record_from_value(value: Value) -> Result<EmbeddedRecord, PayloadError> {
    let Value::Object(map) = value else {
        return Err(PayloadError::NotAnObject);
    };
    let subject = string_field(&map, "subject")?;
    let topic = string_field(&map, "topic")?;
    let evaluation = string_field(&map, "evaluation")?.parse::<Evaluation>()?;
    let summary = string_field(&map, "summary")?;
    Ok(EmbeddedRecord {
        subject,
        topic,
        evaluation,
        summary,
    })
}

fn string_field(map: &Map<String, Value>, key: &'static str) -> Result<String, PayloadError> {
    match map.get(key) {
        Some(Value::String(value)) => Ok(value.clone()),
        Some(_) => Err(PayloadError::NotAString(key)),
        None => Err(PayloadError::MissingField(key)),
    }
}

#[cfg(test)]
mod tests {
    use super::{PayloadError, PayloadOutcome, decode, extract};
    use persona_talk_protocol::{EmbeddedRecord, Evaluation, ParseEvaluationError};
    use pretty_assertions::assert_eq;

    fn record(subject: &str, topic: &str, evaluation: Evaluation, summary: &str) -> EmbeddedRecord {
        EmbeddedRecord {
            subject: subject.to_string(),
            topic: topic.to_string(),
            evaluation,
            summary: summary.to_string(),
        }
    }

    #[test]
    fn reply_without_tag_is_unchanged() {
        for raw in ["こんにちは！", "", "   padded   ", "[SAVE_DATA] no colon", "{\"a\":1}"] {
            assert_eq!(extract(raw), (raw.to_string(), None));
        }
    }

    #[test]
    fn trailing_tag_is_stripped_and_decoded() {
        let raw = r#"よく頑張ったね！[SAVE_DATA: {"subject":"数学","topic":"二次関数","evaluation":"A","summary":"理解できた"}]"#;
        assert_eq!(
            extract(raw),
            (
                "よく頑張ったね！".to_string(),
                Some(record("数学", "二次関数", Evaluation::A, "理解できた"))
            )
        );
    }

    #[test]
    fn tag_mid_sentence_leaves_surrounding_text() {
        let raw = r#"Great work [SAVE_DATA: {"subject":"math","topic":"limits","evaluation":"B","summary":"ok"}] see you!"#;
        let (visible, parsed) = extract(raw);
        assert_eq!(visible, "Great work  see you!");
        assert_eq!(parsed.map(|r| r.evaluation), Some(Evaluation::B));
    }

    #[test]
    fn reply_of_only_a_tag_becomes_empty() {
        let raw = r#"  [SAVE_DATA: {"subject":"s","topic":"t","evaluation":"D","summary":"x"}]  "#;
        let (visible, parsed) = extract(raw);
        assert_eq!(visible, "");
        assert!(parsed.is_some());
    }

    #[test]
    fn nested_values_do_not_end_the_tag_early() {
        let raw = r#"Done.
[SAVE_DATA: {"subject":"physics","topic":"forces","evaluation":"C","summary":"mostly","extra":{"steps":[{"n":1}]}}]"#;
        let (visible, parsed) = extract(raw);
        assert_eq!(visible, "Done.");
        assert_eq!(
            parsed,
            Some(record("physics", "forces", Evaluation::C, "mostly"))
        );
    }

    #[test]
    fn only_first_of_two_tags_is_honored() {
        let raw = r#"a [SAVE_DATA: {"subject":"one","topic":"t","evaluation":"A","summary":"s"}] b [SAVE_DATA: {"subject":"two","topic":"t","evaluation":"B","summary":"s"}]"#;
        let (visible, parsed) = extract(raw);
        assert_eq!(parsed.map(|r| r.subject), Some("one".to_string()));
        assert_eq!(
            visible,
            r#"a  b [SAVE_DATA: {"subject":"two","topic":"t","evaluation":"B","summary":"s"}]"#
        );
    }

    #[test]
    fn malformed_json_leaves_text_unchanged() {
        let raw = r#"Saved! [SAVE_DATA: {"subject": "math", "topic": }]"#;
        let decoded = decode(raw);
        assert_eq!(decoded.visible_text, raw);
        assert!(matches!(
            decoded.outcome,
            PayloadOutcome::Rejected(PayloadError::Malformed(_))
        ));
        assert_eq!(decode(&decoded.visible_text), decoded);
    }

    #[test]
    fn truncated_tag_leaves_text_unchanged() {
        let raw = r#"Saved! [SAVE_DATA: {"subject": "math", "topic": "alg"#;
        assert_eq!(extract(raw), (raw.to_string(), None));
        assert!(matches!(
            decode(raw).outcome,
            PayloadOutcome::Rejected(PayloadError::Malformed(_))
        ));
    }

    #[test]
    fn unbalanced_first_tag_hides_a_later_valid_one() {
        let raw = r#"a [SAVE_DATA: {"subject": {"b": 1}] b [SAVE_DATA: {"subject":"s","topic":"t","evaluation":"A","summary":"x"}] c"#;
        let decoded = decode(raw);
        assert_eq!(decoded.visible_text, raw);
        assert!(matches!(
            decoded.outcome,
            PayloadOutcome::Rejected(PayloadError::Malformed(_))
        ));
        assert_eq!(decoded.record(), None);
    }

    #[test]
    fn unclosed_string_in_first_tag_hides_a_later_valid_one() {
        let raw = r#"a [SAVE_DATA: {"subject": "x}] b [SAVE_DATA: {"subject":"s","topic":"t","evaluation":"A","summary":"x"}] c"#;
        assert_eq!(extract(raw), (raw.to_string(), None));
        assert!(matches!(
            decode(raw).outcome,
            PayloadOutcome::Rejected(PayloadError::Malformed(_))
        ));
    }

    #[test]
    fn marker_without_object_does_not_block_a_later_tag() {
        let raw = r#"[SAVE_DATA: later] ok [SAVE_DATA: {"subject":"s","topic":"t","evaluation":"B","summary":"x"}]"#;
        let (visible, parsed) = extract(raw);
        assert_eq!(visible, "[SAVE_DATA: later] ok");
        assert_eq!(parsed, Some(record("s", "t", Evaluation::B, "x")));
    }

    #[test]
    fn wrong_shape_is_stripped_but_rejected() {
        let missing = decode(r#"ok [SAVE_DATA: {"subject":"s","topic":"t","evaluation":"A"}]"#);
        assert_eq!(missing.visible_text, "ok");
        assert_eq!(
            missing.outcome,
            PayloadOutcome::Rejected(PayloadError::MissingField("summary"))
        );

        let bad_grade =
            decode(r#"ok [SAVE_DATA: {"subject":"s","topic":"t","evaluation":"E","summary":"x"}]"#);
        assert_eq!(
            bad_grade.outcome,
            PayloadOutcome::Rejected(PayloadError::Evaluation(ParseEvaluationError(
                "E".to_string()
            )))
        );

        let not_string =
            decode(r#"ok [SAVE_DATA: {"subject":1,"topic":"t","evaluation":"A","summary":"x"}]"#);
        assert_eq!(
            not_string.outcome,
            PayloadOutcome::Rejected(PayloadError::NotAString("subject"))
        );

        let empty = decode("ok [SAVE_DATA: {}]");
        assert_eq!(
            empty.outcome,
            PayloadOutcome::Rejected(PayloadError::MissingField("subject"))
        );
    }

    #[test]
    fn decoding_visible_text_again_is_stable() {
        let raw = r#"  Nice!  [SAVE_DATA: {"subject":"s","topic":"t","evaluation":"B","summary":"x"}]"#;
        let (visible, parsed) = extract(raw);
        assert!(parsed.is_some());
        assert_eq!(extract(&visible), (visible.clone(), None));
    }
}
