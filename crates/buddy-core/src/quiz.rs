//! Quiz extraction from free-form generated text.
//!
//! Generated text is often wrapped in markdown fences or surrounded by prose,
//! so extraction looks for the outermost `{ ... }` span before decoding.

use serde::Deserialize;

/// Number of options every quiz poll carries.
pub const CHOICE_COUNT: usize = 4;

/// A validated multiple-choice quiz.
///
/// Fields are private so a `Quiz` with a bad choice count or answer index
/// cannot be built outside of [`Quiz::new`] / [`extract_quiz`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Quiz {
    question: String,
    choices: Vec<String>,
    correct_index: usize,
}

/// One reason a decoded quiz was rejected.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum QuizViolation {
    #[error("missing question")]
    EmptyQuestion,
    #[error("expected 4 choices, got {0}")]
    ChoiceCount(usize),
    #[error("missing answer index")]
    MissingAnswerIndex,
    #[error("answer index {0} is outside 0..=3")]
    AnswerIndex(i64),
}

#[derive(Debug, thiserror::Error)]
pub enum QuizError {
    #[error("no JSON object found in generated text")]
    MissingObject,
    #[error("generated JSON could not be decoded: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("invalid quiz: {}", join_violations(.0))]
    Invalid(Vec<QuizViolation>),
}

impl QuizError {
    pub fn violations(&self) -> &[QuizViolation] {
        match self {
            QuizError::Invalid(v) => v,
            _ => &[],
        }
    }
}

fn join_violations(v: &[QuizViolation]) -> String {
    v.iter()
        .map(|x| x.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, Default, Deserialize)]
struct RawQuiz {
    #[serde(default)]
    question: String,
    #[serde(default)]
    choices: Vec<String>,
    #[serde(default)]
    answer_index: Option<i64>,
}

impl Quiz {
    /// Validate and build a quiz. Every failing check is reported.
    pub fn new(
        question: impl Into<String>,
        choices: Vec<String>,
        answer_index: Option<i64>,
    ) -> std::result::Result<Self, QuizError> {
        let question = question.into();
        let mut violations = Vec::new();

        if question.trim().is_empty() {
            violations.push(QuizViolation::EmptyQuestion);
        }
        if choices.len() != CHOICE_COUNT {
            violations.push(QuizViolation::ChoiceCount(choices.len()));
        }
        let correct_index = match answer_index {
            None => {
                violations.push(QuizViolation::MissingAnswerIndex);
                None
            }
            Some(i) if i < 0 || i >= CHOICE_COUNT as i64 => {
                violations.push(QuizViolation::AnswerIndex(i));
                None
            }
            Some(i) => Some(i as usize),
        };

        match correct_index {
            Some(correct_index) if violations.is_empty() => Ok(Self {
                question: question.trim().to_string(),
                choices,
                correct_index,
            }),
            _ => Err(QuizError::Invalid(violations)),
        }
    }

    pub fn question(&self) -> &str {
        &self.question
    }

    pub fn choices(&self) -> &[String] {
        &self.choices
    }

    pub fn correct_index(&self) -> usize {
        self.correct_index
    }

    pub fn correct_choice(&self) -> &str {
        &self.choices[self.correct_index]
    }
}

/// Parse generated text into a [`Quiz`].
pub fn extract_quiz(raw: &str) -> std::result::Result<Quiz, QuizError> {
    let cleaned = strip_code_fences(raw);
    let json = json_object_span(&cleaned).ok_or(QuizError::MissingObject)?;
    let decoded: RawQuiz = serde_json::from_str(json)?;
    Quiz::new(decoded.question, decoded.choices, decoded.answer_index)
}

/// Remove markdown code-fence markers (with or without a language tag).
pub fn strip_code_fences(raw: &str) -> String {
    raw.replace("```json", "")
        .replace("```JSON", "")
        .replace("```", "")
}

/// The span from the first `{` to the last `}`, if both exist in order.
fn json_object_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }
    Some(&text[start..=end])
}

#[cfg(test)]
mod tests {
    use super::*;

    const CLEAN: &str =
        r#"{"question":"Q","choices":["a","b","c","d"],"answer_index":2}"#;

    fn abcd() -> Vec<String> {
        ["a", "b", "c", "d"].iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn clean_json_matches_direct_construction() {
        let q = extract_quiz(CLEAN).unwrap();
        assert_eq!(q, Quiz::new("Q", abcd(), Some(2)).unwrap());
        assert_eq!(q.correct_choice(), "c");
    }

    #[test]
    fn recovers_from_fences_and_prose() {
        let fenced = format!("```json\n{CLEAN}\n```");
        let prose = format!("Sure! Here is your quiz:\n{CLEAN}\nGood luck.");
        let both = format!("Here you go\n```\n{CLEAN}\n```\nEnjoy");

        let expected = extract_quiz(CLEAN).unwrap();
        assert_eq!(extract_quiz(&fenced).unwrap(), expected);
        assert_eq!(extract_quiz(&prose).unwrap(), expected);
        assert_eq!(extract_quiz(&both).unwrap(), expected);
    }

    #[test]
    fn missing_or_inverted_braces_fail() {
        assert!(matches!(
            extract_quiz("no json here"),
            Err(QuizError::MissingObject)
        ));
        assert!(matches!(
            extract_quiz("} backwards {"),
            Err(QuizError::MissingObject)
        ));
    }

    #[test]
    fn malformed_json_is_a_decode_error() {
        assert!(matches!(
            extract_quiz(r#"{"question": "Q", "choices": [}"#),
            Err(QuizError::Decode(_))
        ));
    }

    #[test]
    fn reports_every_violation() {
        let err = extract_quiz(r#"{"question":"  ","choices":["a","b"],"answer_index":7}"#)
            .unwrap_err();
        assert_eq!(
            err.violations(),
            &[
                QuizViolation::EmptyQuestion,
                QuizViolation::ChoiceCount(2),
                QuizViolation::AnswerIndex(7),
            ]
        );
        let msg = err.to_string();
        assert!(msg.contains("missing question"));
        assert!(msg.contains("got 2"));
        assert!(msg.contains("index 7"));
    }

    #[test]
    fn each_violation_is_distinguishable_alone() {
        let wrong_count = extract_quiz(
            r#"{"question":"Q","choices":["a","b","c","d","e"],"answer_index":0}"#,
        )
        .unwrap_err();
        assert_eq!(wrong_count.violations(), &[QuizViolation::ChoiceCount(5)]);

        let negative =
            extract_quiz(r#"{"question":"Q","choices":["a","b","c","d"],"answer_index":-1}"#)
                .unwrap_err();
        assert_eq!(negative.violations(), &[QuizViolation::AnswerIndex(-1)]);

        let missing =
            extract_quiz(r#"{"question":"Q","choices":["a","b","c","d"]}"#).unwrap_err();
        assert_eq!(missing.violations(), &[QuizViolation::MissingAnswerIndex]);
    }

    #[test]
    fn strips_inline_fences() {
        let s = "```json{\"a\":1}```";
        assert_eq!(strip_code_fences(s), "{\"a\":1}");
    }
}
