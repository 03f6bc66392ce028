//! Question catalog types

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::DomainError;

/// One of the four option symbols
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OptionTag {
    A,
    B,
    C,
    D,
}

impl OptionTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            OptionTag::A => "A",
            OptionTag::B => "B",
            OptionTag::C => "C",
            OptionTag::D => "D",
        }
    }
}

impl fmt::Display for OptionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OptionTag {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "A" => Ok(OptionTag::A),
            "B" => Ok(OptionTag::B),
            "C" => Ok(OptionTag::C),
            "D" => Ok(OptionTag::D),
            other => Err(DomainError::InvalidInput(format!("unknown option tag: {}", other))),
        }
    }
}

/// Full catalog item including the answer key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    pub id: Uuid,
    pub question_text: String,
    pub options: [String; 4],
    pub correct_answer: OptionTag,
    pub image_url: Option<String>,
    pub difficulty: i32,
}

impl Question {
    /// Strip the answer key for presentation before scoring
    pub fn to_public(&self) -> PublicQuestion {
        let [option_a, option_b, option_c, option_d] = self.options.clone();
        PublicQuestion {
            id: self.id,
            question_text: self.question_text.clone(),
            option_a,
            option_b,
            option_c,
            option_d,
            image_url: self.image_url.clone(),
            difficulty: self.difficulty,
        }
    }
}

/// Catalog item as served to a test taker; has no answer key field at all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicQuestion {
    pub id: Uuid,
    pub question_text: String,
    pub option_a: String,
    pub option_b: String,
    pub option_c: String,
    pub option_d: String,
    pub image_url: Option<String>,
    pub difficulty: i32,
}

/// New catalog item to be loaded into the store
#[derive(Debug, Clone)]
pub struct NewQuestion {
    pub question_text: String,
    pub options: [String; 4],
    pub correct_answer: OptionTag,
    pub image_url: Option<String>,
    pub difficulty: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_option_tag_parse() {
        assert_eq!("C".parse::<OptionTag>().unwrap(), OptionTag::C);
        assert!("c".parse::<OptionTag>().is_err());
        assert!("E".parse::<OptionTag>().is_err());
    }

    #[test]
    fn test_public_question_has_no_answer_key() {
        let question = Question {
            id: Uuid::new_v4(),
            question_text: "2, 6, 12, 20, 30, ?".to_string(),
            options: ["40".into(), "42".into(), "38".into(), "44".into()],
            correct_answer: OptionTag::B,
            image_url: None,
            difficulty: 2,
        };

        let json = serde_json::to_value(question.to_public()).unwrap();
        assert_eq!(json["optionB"], "42");
        assert!(json.get("correctAnswer").is_none());
        assert!(json.get("correct_answer").is_none());
    }
}
