//! Learning record types carried by the tutoring persona's embedded tag.

use crate::Message;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Tag name the tutoring persona uses for its embedded payload.
pub const SAVE_DATA_TAG: &str = "SAVE_DATA";

/// Understanding grade assigned by the tutor.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Evaluation {
    A,
    B,
    C,
    D,
}

impl Evaluation {
    /// Return the grade letter.
    pub fn as_str(&self) -> &'static str {
        match self {
            Evaluation::A => "A",
            Evaluation::B => "B",
            Evaluation::C => "C",
            Evaluation::D => "D",
        }
    }

    /// Human readable rubric for the grade.
    pub fn label(&self) -> &'static str {
        match self {
            Evaluation::A => "deep understanding",
            Evaluation::B => "basic understanding",
            Evaluation::C => "partial understanding",
            Evaluation::D => "needs review",
        }
    }
}

impl fmt::Display for Evaluation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string is not one of the four grade letters.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid evaluation: {0:?} (expected A, B, C or D)")]
pub struct ParseEvaluationError(pub String);

impl FromStr for Evaluation {
    type Err = ParseEvaluationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "A" => Ok(Evaluation::A),
            "B" => Ok(Evaluation::B),
            "C" => Ok(Evaluation::C),
            "D" => Ok(Evaluation::D),
            other => Err(ParseEvaluationError(other.to_string())),
        }
    }
}

/// Structured summary of a tutoring session, decoded from a reply.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EmbeddedRecord {
    /// School subject.
    pub subject: String,
    /// Topic within the subject.
    pub topic: String,
    /// Understanding grade.
    pub evaluation: Evaluation,
    /// Short summary, about 50 characters by convention.
    pub summary: String,
}

/// Persisted learning record with its transcript snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LearningLog {
    /// Record identifier.
    pub id: Uuid,
    /// Principal that owns the record.
    pub user_id: String,
    /// School subject.
    pub subject: String,
    /// Topic within the subject.
    pub topic: String,
    /// Understanding grade.
    pub evaluation: Evaluation,
    /// Short summary.
    pub summary: String,
    /// Conversation at the time the record was extracted.
    pub transcript: Vec<Message>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::{Evaluation, ParseEvaluationError};
    use pretty_assertions::assert_eq;

    #[test]
    fn evaluation_parses_only_grade_letters() {
        assert_eq!("A".parse::<Evaluation>(), Ok(Evaluation::A));
        assert_eq!("D".parse::<Evaluation>(), Ok(Evaluation::D));
        assert_eq!(
            "a".parse::<Evaluation>(),
            Err(ParseEvaluationError("a".to_string()))
        );
        assert!("E".parse::<Evaluation>().is_err());
        assert!("".parse::<Evaluation>().is_err());
    }

    #[test]
    fn evaluation_serializes_as_letter() {
        let value = serde_json::to_string(&Evaluation::C).expect("serialize");
        assert_eq!(value, "\"C\"");
        assert_eq!(Evaluation::C.label(), "partial understanding");
    }
}
