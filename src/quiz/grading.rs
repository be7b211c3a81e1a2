//! Auto-grading of quiz submissions.
//!
//! Objective answers are compared case- and whitespace-insensitively against
//! the stored answer. Theory answers are accepted but never earn a point; they
//! still count towards the total, so a sheet mixing both kinds can not reach
//! 100% without manual marking.

use std::collections::HashMap;
use std::str::FromStr;

use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use super::repo_types::Question;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionKind {
    Objective,
    Theory,
}

#[derive(Debug, Error)]
#[error("unknown value: {0}")]
pub struct UnknownValue(String);

impl FromStr for QuestionKind {
    type Err = UnknownValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "objective" => Ok(QuestionKind::Objective),
            "theory" => Ok(QuestionKind::Theory),
            other => Err(UnknownValue(other.to_string())),
        }
    }
}

impl TryFrom<String> for QuestionKind {
    type Error = UnknownValue;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl QuestionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            QuestionKind::Objective => "objective",
            QuestionKind::Theory => "theory",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Grade {
    Excellent,
    Good,
    Average,
    Pass,
    Fail,
}

impl Grade {
    pub fn from_percentage(pct: f64) -> Self {
        if pct >= 90.0 {
            Grade::Excellent
        } else if pct >= 75.0 {
            Grade::Good
        } else if pct >= 60.0 {
            Grade::Average
        } else if pct >= 50.0 {
            Grade::Pass
        } else {
            Grade::Fail
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Grade::Excellent => "Excellent",
            Grade::Good => "Good",
            Grade::Average => "Average",
            Grade::Pass => "Pass",
            Grade::Fail => "Fail",
        }
    }
}

impl TryFrom<String> for Grade {
    type Error = UnknownValue;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.as_str() {
            "Excellent" => Ok(Grade::Excellent),
            "Good" => Ok(Grade::Good),
            "Average" => Ok(Grade::Average),
            "Pass" => Ok(Grade::Pass),
            "Fail" => Ok(Grade::Fail),
            _ => Err(UnknownValue(s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Score {
    pub correct: u32,
    pub total: u32,
    pub percentage: f64,
    pub grade: Grade,
}

fn normalize(s: &str) -> String {
    s.trim().to_lowercase()
}

pub fn answer_matches(answer: &str, correct: &str) -> bool {
    normalize(answer) == normalize(correct)
}

/// Scores `answers` (keyed by question id) against every question in scope.
/// Unanswered questions count as wrong; an empty scope scores 0.
pub fn score(questions: &[Question], answers: &HashMap<Uuid, String>) -> Score {
    let total = questions.len() as u32;
    let correct = questions
        .iter()
        .filter(|q| q.kind == QuestionKind::Objective)
        .filter(|q| match (answers.get(&q.id), q.correct_answer.as_deref()) {
            (Some(given), Some(expected)) => answer_matches(given, expected),
            _ => false,
        })
        .count() as u32;

    let percentage = if total == 0 {
        0.0
    } else {
        f64::from(correct) * 100.0 / f64::from(total)
    };

    Score {
        correct,
        total,
        percentage,
        grade: Grade::from_percentage(percentage),
    }
}
