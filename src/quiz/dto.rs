use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::{
    grading::{Grade, QuestionKind, Score},
    repo_types::{Question, QuizAttempt},
};

/// A question as handed to the student: no answer key.
#[derive(Debug, Serialize)]
pub struct QuestionView {
    pub id: Uuid,
    pub text: String,
    pub kind: QuestionKind,
    pub topic: Option<String>,
    pub options: Vec<String>,
}

/// Options are stored as a JSON array, sometimes as a JSON string holding the
/// array. Anything else decodes to no options.
pub fn decode_options(raw: Option<&Value>) -> Vec<String> {
    match raw {
        Some(Value::Array(items)) => items
            .iter()
            .map(|v| match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect(),
        Some(Value::String(text)) => serde_json::from_str::<Value>(text)
            .ok()
            .filter(Value::is_array)
            .map(|v| decode_options(Some(&v)))
            .unwrap_or_default(),
        _ => Vec::new(),
    }
}

impl From<Question> for QuestionView {
    fn from(q: Question) -> Self {
        let options = match q.kind {
            QuestionKind::Objective => decode_options(q.options.as_ref()),
            QuestionKind::Theory => Vec::new(),
        };
        Self {
            id: q.id,
            text: q.text,
            kind: q.kind,
            topic: q.topic,
            options,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TopicList {
    pub subject_id: Uuid,
    pub quiz_id: Uuid,
    pub topics: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct QuestionSheet {
    pub quiz_id: Uuid,
    pub questions: Vec<QuestionView>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SubmitRequest {
    #[serde(default)]
    pub answers: HashMap<Uuid, String>,
}

#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub attempt: QuizAttempt,
    pub correct: u32,
    pub total: u32,
    pub percentage: f64,
    pub grade: Grade,
    pub message: String,
    /// Set when the student should try a fresh sheet.
    pub retry: bool,
}

impl SubmitResponse {
    pub fn new(attempt: QuizAttempt, score: Score) -> Self {
        let retry = score.grade == Grade::Fail;
        let message = if retry {
            "You failed. Try similar questions again.".to_string()
        } else {
            format!("Quiz completed! Grade: {}", score.grade.as_str())
        };
        Self {
            attempt,
            correct: score.correct,
            total: score.total,
            percentage: score.percentage,
            grade: score.grade,
            message,
            retry,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn options_from_array_or_encoded_string() {
        let arr = json!(["Mitochondria", "Nucleus", 3]);
        assert_eq!(decode_options(Some(&arr)), vec!["Mitochondria", "Nucleus", "3"]);

        let encoded = Value::String(r#"["A", "B"]"#.into());
        assert_eq!(decode_options(Some(&encoded)), vec!["A", "B"]);

        let broken = Value::String("A, B".into());
        assert!(decode_options(Some(&broken)).is_empty());
        assert!(decode_options(None).is_empty());
        assert!(decode_options(Some(&json!({"a": 1}))).is_empty());
    }

    #[test]
    fn view_never_carries_the_answer() {
        let q = Question {
            id: Uuid::new_v4(),
            quiz_id: Uuid::new_v4(),
            text: "Capital of Ghana?".into(),
            kind: QuestionKind::Objective,
            correct_answer: Some("Accra".into()),
            topic: Some("Geography".into()),
            options: Some(json!(["Accra", "Kumasi"])),
        };
        let json = serde_json::to_string(&QuestionView::from(q)).unwrap();
        assert!(json.contains("Kumasi"));
        assert!(!json.contains("correct_answer"));
    }

    #[test]
    fn submit_body_accepts_uuid_keys() {
        let id = Uuid::new_v4();
        let body = format!(r#"{{"answers": {{"{id}": "B"}}}}"#);
        let req: SubmitRequest = serde_json::from_str(&body).unwrap();
        assert_eq!(req.answers.get(&id).map(String::as_str), Some("B"));
        let empty: SubmitRequest = serde_json::from_str("{}").unwrap();
        assert!(empty.answers.is_empty());
    }
}
