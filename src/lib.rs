//! CertQuest study engine
//!
//! SM-2 flashcard scheduling and achievement progress for certification exam
//! practice, behind a pluggable storage layer.

pub mod achievements;
pub mod config;
mod error;
pub mod logging;
pub mod models;
pub mod service;
pub mod sm2;
pub mod storage;

pub use error::ValidationError;
pub use models::{CardStatus, Flashcard, Quality, ReviewLogEntry, ReviewRating, StudySummary};
pub use service::{ReviewOutcome, StatsOutcome, StudyService};
pub use sm2::{Scheduler, SchedulerConfig};
pub use storage::{JsonStore, MemoryStore, Repository};
