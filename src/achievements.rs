//! Achievement catalog and progress tracking.
//!
//! [`AchievementStats`] is the only stored state. [`Achievement`] views are
//! derived from it on demand and never persisted.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AchievementType {
    Certification,
    Mastery,
    Streak,
    Special,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AchievementLevel {
    Bronze,
    Silver,
    Gold,
    Platinum,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AchievementId {
    FirstExam,
    ExamMaster,
    PerfectScore,
    Perfectionist,
    FlashcardNovice,
    FlashcardMaster,
    PerfectRecall,
    WeekStreak,
    MonthStreak,
    DedicatedLearner,
}

impl AchievementId {
    /// The stats counter this achievement measures.
    pub fn counter(self, stats: &AchievementStats) -> u32 {
        match self {
            Self::FirstExam | Self::ExamMaster => stats.exams_completed,
            Self::PerfectScore | Self::Perfectionist => stats.perfect_scores,
            Self::FlashcardNovice | Self::FlashcardMaster => stats.flashcards_reviewed,
            Self::PerfectRecall => stats.perfect_reviews,
            Self::WeekStreak | Self::MonthStreak => stats.current_streak,
            Self::DedicatedLearner => stats
                .exams_completed
                .saturating_add(stats.flashcards_reviewed),
        }
    }
}

/// Static catalog entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AchievementDefinition {
    pub id: AchievementId,
    #[serde(rename = "type")]
    pub kind: AchievementType,
    pub title: &'static str,
    pub description: &'static str,
    pub level: AchievementLevel,
    pub icon: &'static str,
    pub requirement: u32,
}

const CATALOG: &[AchievementDefinition] = &[
    AchievementDefinition {
        id: AchievementId::FirstExam,
        kind: AchievementType::Certification,
        title: "First Steps",
        description: "Complete your first practice exam",
        level: AchievementLevel::Bronze,
        icon: "award",
        requirement: 1,
    },
    AchievementDefinition {
        id: AchievementId::ExamMaster,
        kind: AchievementType::Certification,
        title: "Exam Master",
        description: "Complete 10 practice exams",
        level: AchievementLevel::Gold,
        icon: "trophy",
        requirement: 10,
    },
    AchievementDefinition {
        id: AchievementId::PerfectScore,
        kind: AchievementType::Certification,
        title: "Flawless",
        description: "Score 100% on a practice exam",
        level: AchievementLevel::Silver,
        icon: "star",
        requirement: 1,
    },
    AchievementDefinition {
        id: AchievementId::Perfectionist,
        kind: AchievementType::Certification,
        title: "Perfectionist",
        description: "Score 100% on 5 practice exams",
        level: AchievementLevel::Platinum,
        icon: "crown",
        requirement: 5,
    },
    AchievementDefinition {
        id: AchievementId::FlashcardNovice,
        kind: AchievementType::Mastery,
        title: "Card Collector",
        description: "Review 50 flashcards",
        level: AchievementLevel::Bronze,
        icon: "layers",
        requirement: 50,
    },
    AchievementDefinition {
        id: AchievementId::FlashcardMaster,
        kind: AchievementType::Mastery,
        title: "Flashcard Master",
        description: "Review 500 flashcards",
        level: AchievementLevel::Gold,
        icon: "brain",
        requirement: 500,
    },
    AchievementDefinition {
        id: AchievementId::PerfectRecall,
        kind: AchievementType::Mastery,
        title: "Perfect Recall",
        description: "Rate 100 flashcard reviews as easy",
        level: AchievementLevel::Silver,
        icon: "zap",
        requirement: 100,
    },
    AchievementDefinition {
        id: AchievementId::WeekStreak,
        kind: AchievementType::Streak,
        title: "Week Warrior",
        description: "Study 7 days in a row",
        level: AchievementLevel::Silver,
        icon: "flame",
        requirement: 7,
    },
    AchievementDefinition {
        id: AchievementId::MonthStreak,
        kind: AchievementType::Streak,
        title: "Unstoppable",
        description: "Study 30 days in a row",
        level: AchievementLevel::Platinum,
        icon: "calendar",
        requirement: 30,
    },
    AchievementDefinition {
        id: AchievementId::DedicatedLearner,
        kind: AchievementType::Special,
        title: "Dedicated Learner",
        description: "Complete 250 exams and flashcard reviews combined",
        level: AchievementLevel::Gold,
        icon: "medal",
        requirement: 250,
    },
];

pub fn catalog() -> &'static [AchievementDefinition] {
    CATALOG
}

/// Catalog entries are laid out in `AchievementId` declaration order.
pub fn definition(id: AchievementId) -> &'static AchievementDefinition {
    &CATALOG[id as usize]
}

/// Per-user aggregate counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "StatsRow")]
pub struct AchievementStats {
    pub exams_completed: u32,
    pub flashcards_reviewed: u32,
    pub perfect_reviews: u32,
    pub current_streak: u32,
    pub perfect_scores: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_study_date: Option<NaiveDate>,
}

/// Stored shape of the stats row; counters arrive as signed integers.
#[derive(Debug, Deserialize)]
struct StatsRow {
    #[serde(default)]
    exams_completed: i64,
    #[serde(default)]
    flashcards_reviewed: i64,
    #[serde(default)]
    perfect_reviews: i64,
    #[serde(default)]
    current_streak: i64,
    #[serde(default)]
    perfect_scores: i64,
    #[serde(default)]
    last_study_date: Option<NaiveDate>,
}

fn counter(name: &str, value: i64) -> Result<u32, ValidationError> {
    u32::try_from(value).map_err(|_| {
        ValidationError::InvalidStatsInput(format!("{} out of range: {}", name, value))
    })
}

impl TryFrom<StatsRow> for AchievementStats {
    type Error = ValidationError;

    fn try_from(row: StatsRow) -> Result<Self, Self::Error> {
        let stats = Self {
            exams_completed: counter("exams_completed", row.exams_completed)?,
            flashcards_reviewed: counter("flashcards_reviewed", row.flashcards_reviewed)?,
            perfect_reviews: counter("perfect_reviews", row.perfect_reviews)?,
            current_streak: counter("current_streak", row.current_streak)?,
            perfect_scores: counter("perfect_scores", row.perfect_scores)?,
            last_study_date: row.last_study_date,
        };
        stats.validate()?;
        Ok(stats)
    }
}

impl AchievementStats {
    /// Reject counter combinations no sequence of events can produce.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.perfect_scores > self.exams_completed {
            return Err(ValidationError::InvalidStatsInput(format!(
                "perfect_scores ({}) exceeds exams_completed ({})",
                self.perfect_scores, self.exams_completed
            )));
        }
        if self.perfect_reviews > self.flashcards_reviewed {
            return Err(ValidationError::InvalidStatsInput(format!(
                "perfect_reviews ({}) exceeds flashcards_reviewed ({})",
                self.perfect_reviews, self.flashcards_reviewed
            )));
        }
        if self.current_streak > 0 && self.last_study_date.is_none() {
            return Err(ValidationError::InvalidStatsInput(
                "current_streak set without last_study_date".to_string(),
            ));
        }
        Ok(())
    }
}

/// Progress view of one catalog entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Achievement {
    #[serde(flatten)]
    pub definition: &'static AchievementDefinition,
    pub progress: u8,
    pub unlocked: bool,
}

impl Achievement {
    fn derive(definition: &'static AchievementDefinition, stats: &AchievementStats) -> Self {
        let value = definition.id.counter(stats) as u64;
        let progress = (value * 100 / definition.requirement as u64).min(100) as u8;
        Self {
            definition,
            progress,
            unlocked: progress >= 100,
        }
    }
}

/// Derive the progress of every catalog entry, in catalog order.
pub fn compute_progress(stats: &AchievementStats) -> Result<Vec<Achievement>, ValidationError> {
    stats.validate()?;
    Ok(CATALOG
        .iter()
        .map(|definition| Achievement::derive(definition, stats))
        .collect())
}

/// Achievements unlocked in `after` that were still locked in `before`.
pub fn newly_unlocked(before: &[Achievement], after: &[Achievement]) -> Vec<AchievementId> {
    after
        .iter()
        .filter(|a| a.unlocked)
        .filter(|a| {
            !before
                .iter()
                .any(|b| b.definition.id == a.definition.id && b.unlocked)
        })
        .map(|a| a.definition.id)
        .collect()
}

pub fn record_exam_completion(
    stats: &AchievementStats,
    score: i64,
) -> Result<AchievementStats, ValidationError> {
    if !(0..=100).contains(&score) {
        return Err(ValidationError::InvalidScore(score));
    }
    let mut next = stats.clone();
    next.exams_completed = next.exams_completed.saturating_add(1);
    if score == 100 {
        next.perfect_scores = next.perfect_scores.saturating_add(1);
    }
    Ok(next)
}

pub fn record_flashcard_review(stats: &AchievementStats, is_perfect: bool) -> AchievementStats {
    let mut next = stats.clone();
    next.flashcards_reviewed = next.flashcards_reviewed.saturating_add(1);
    if is_perfect {
        next.perfect_reviews = next.perfect_reviews.saturating_add(1);
    }
    next
}

/// Advance the daily streak using whole calendar days between study dates.
pub fn update_streak(stats: &AchievementStats, today: NaiveDate) -> AchievementStats {
    let mut next = stats.clone();
    let days = stats
        .last_study_date
        .map(|last| today.signed_duration_since(last).num_days());

    next.current_streak = match days {
        Some(0) => stats.current_streak,
        Some(1) => stats.current_streak.saturating_add(1),
        _ => 1,
    };
    next.last_study_date = Some(today);
    next
}
