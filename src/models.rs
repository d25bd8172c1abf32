//! Data models for flashcards and review history.

use std::fmt;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

/// A validated recall quality on the SM-2 0-5 scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct Quality(u8);

impl Quality {
    pub const MAX: u8 = 5;

    pub fn new(value: i64) -> Result<Self, ValidationError> {
        if (0..=Self::MAX as i64).contains(&value) {
            Ok(Self(value as u8))
        } else {
            Err(ValidationError::InvalidQuality(value))
        }
    }

    pub fn value(self) -> u8 {
        self.0
    }

    pub fn is_perfect(self) -> bool {
        self.0 == Self::MAX
    }
}

impl TryFrom<i64> for Quality {
    type Error = ValidationError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Quality> for u8 {
    fn from(q: Quality) -> Self {
        q.0
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Coarse three-button rating shown on the study screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReviewRating {
    /// Struggled to recall ("Difícil"), quality 1.
    Hard,
    /// Recalled with some effort ("Bom"), quality 3.
    Good,
    /// Instant recall ("Fácil"), quality 5.
    Easy,
}

impl ReviewRating {
    pub const ALL: [ReviewRating; 3] = [Self::Hard, Self::Good, Self::Easy];

    pub fn from_key(c: char) -> Option<Self> {
        match c {
            '1' => Some(Self::Hard),
            '2' => Some(Self::Good),
            '3' => Some(Self::Easy),
            _ => None,
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        let mut chars = s.chars();
        if let (Some(c), None) = (chars.next(), chars.next()) {
            if let Some(rating) = Self::from_key(c) {
                return Some(rating);
            }
        }
        match s.to_ascii_lowercase().as_str() {
            "hard" => Some(Self::Hard),
            "good" => Some(Self::Good),
            "easy" => Some(Self::Easy),
            _ => None,
        }
    }

    pub fn quality(&self) -> Quality {
        match self {
            Self::Hard => Quality(1),
            Self::Good => Quality(3),
            Self::Easy => Quality(5),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Hard => "Hard",
            Self::Good => "Good",
            Self::Easy => "Easy",
        }
    }
}

/// Learning stage of a card.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardStatus {
    #[default]
    New,
    Learning,
    Review,
    Graduated,
}

impl CardStatus {
    pub fn name(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Learning => "learning",
            Self::Review => "review",
            Self::Graduated => "graduated",
        }
    }
}

/// A single flashcard owned by one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Flashcard {
    pub id: String,
    pub front: String,
    pub back: String,

    // SM-2 fields
    #[serde(default)]
    pub status: CardStatus,
    pub interval: u32,
    pub repetitions: u32,
    pub ease_factor: f64,

    // Tracking
    pub next_review: DateTime<Local>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_reviewed_at: Option<DateTime<Local>>,
    #[serde(default)]
    pub total_reviews: u32,
    #[serde(default)]
    pub lapses: u32,
    pub created_at: DateTime<Local>,
}

impl Flashcard {
    pub fn new(front: String, back: String, initial_ease: f64, now: DateTime<Local>) -> Self {
        Self {
            id: Uuid::new_v4().to_string()[..8].to_string(),
            front,
            back,
            status: CardStatus::New,
            interval: 0,
            repetitions: 0,
            ease_factor: initial_ease,
            next_review: now,
            last_reviewed_at: None,
            total_reviews: 0,
            lapses: 0,
            created_at: now,
        }
    }

    pub fn is_new(&self) -> bool {
        self.status == CardStatus::New
    }

    pub fn is_due(&self, now: DateTime<Local>) -> bool {
        now >= self.next_review
    }
}

/// Immutable audit record of one review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewLogEntry {
    pub flashcard_id: String,
    pub user_id: String,
    pub quality: Quality,
    pub reviewed_at: DateTime<Local>,
}

/// Card counts for a user's collection.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct StudySummary {
    pub total_cards: usize,
    pub new_cards: usize,
    pub due_cards: usize,
    pub learning_cards: usize,
    pub review_cards: usize,
    pub graduated_cards: usize,
}

impl StudySummary {
    pub fn from_cards(cards: &[Flashcard], now: DateTime<Local>) -> Self {
        let mut summary = Self {
            total_cards: cards.len(),
            ..Default::default()
        };

        for card in cards {
            match card.status {
                CardStatus::New => summary.new_cards += 1,
                CardStatus::Learning => summary.learning_cards += 1,
                CardStatus::Review => summary.review_cards += 1,
                CardStatus::Graduated => summary.graduated_cards += 1,
            }
            if !card.is_new() && card.is_due(now) {
                summary.due_cards += 1;
            }
        }

        summary
    }
}
