//! Question bank loading.
//!
//! A bank is a JSON document of sections, each holding quizzes of
//! questions:
//!
//! ```json
//! { "sections": [ { "name": "Basics", "quizzes": [
//!     { "name": "Ownership", "questions": [
//!         { "id": "own-1", "prompt": "Who frees a Box?", "answer": "Its owner" }
//!     ] }
//! ] } ] }
//! ```

use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use study_engine::QuestionRef;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BankError {
    #[error("failed to read question bank: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid question bank: {0}")]
    Json(#[from] serde_json::Error),

    #[error("duplicate question id: {0}")]
    DuplicateId(String),

    #[error("question in {section}/{quiz} has an empty id")]
    EmptyId { section: String, quiz: String },
}

#[derive(Debug, Deserialize)]
struct BankFile {
    sections: Vec<SectionFile>,
}

#[derive(Debug, Deserialize)]
struct SectionFile {
    name: String,
    quizzes: Vec<QuizFile>,
}

#[derive(Debug, Deserialize)]
struct QuizFile {
    name: String,
    questions: Vec<CardFile>,
}

#[derive(Debug, Deserialize)]
struct CardFile {
    id: String,
    prompt: String,
    answer: String,
}

/// Display text for one question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Card {
    pub prompt: String,
    pub answer: String,
}

/// Loaded questions in bank order, with their display text.
#[derive(Debug, Clone, Default)]
pub struct QuestionBank {
    questions: Vec<QuestionRef>,
    cards: HashMap<String, Card>,
}

impl QuestionBank {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, BankError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn from_json(json: &str) -> Result<Self, BankError> {
        let file: BankFile = serde_json::from_str(json)?;
        let mut bank = Self::default();

        for section in file.sections {
            for quiz in section.quizzes {
                for card in quiz.questions {
                    if card.id.trim().is_empty() {
                        return Err(BankError::EmptyId {
                            section: section.name.clone(),
                            quiz: quiz.name.clone(),
                        });
                    }
                    if bank.cards.contains_key(&card.id) {
                        return Err(BankError::DuplicateId(card.id));
                    }

                    bank.questions.push(
                        QuestionRef::new(card.id.clone())
                            .with_section(section.name.clone())
                            .with_quiz(quiz.name.clone()),
                    );
                    bank.cards.insert(
                        card.id,
                        Card {
                            prompt: card.prompt,
                            answer: card.answer,
                        },
                    );
                }
            }
        }

        Ok(bank)
    }

    pub fn questions(&self) -> &[QuestionRef] {
        &self.questions
    }

    pub fn card(&self, id: &str) -> Option<&Card> {
        self.cards.get(id)
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    /// Distinct section names in bank order.
    pub fn sections(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for name in self.questions.iter().filter_map(|q| q.section.as_deref()) {
            if !names.contains(&name) {
                names.push(name);
            }
        }
        names
    }
}
