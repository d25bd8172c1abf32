//! Persistence for flashcards, review history and achievement stats.

use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::achievements::AchievementStats;
use crate::models::{Flashcard, ReviewLogEntry};

/// Storage seam for everything the study service reads and writes.
///
/// Card writes replace the row keyed by `(user_id, card.id)`; concurrent
/// writers are last-write-wins. The review log is append-only.
pub trait Repository {
    fn list_cards(&self, user_id: &str) -> Result<Vec<Flashcard>>;
    fn load_card(&self, user_id: &str, card_id: &str) -> Result<Option<Flashcard>>;
    fn save_card(&mut self, user_id: &str, card: &Flashcard) -> Result<()>;
    fn delete_card(&mut self, user_id: &str, card_id: &str) -> Result<bool>;
    fn append_review(&mut self, entry: &ReviewLogEntry) -> Result<()>;
    fn list_reviews(&self, user_id: &str) -> Result<Vec<ReviewLogEntry>>;
    /// Stats for a user, defaulted when none are stored yet.
    fn load_stats(&self, user_id: &str) -> Result<AchievementStats>;
    fn save_stats(&mut self, user_id: &str, stats: &AchievementStats) -> Result<()>;
}

/// On-disk profile for one user.
#[derive(Debug, Default, Serialize, Deserialize)]
struct UserProfile {
    #[serde(default)]
    cards: Vec<Flashcard>,
    #[serde(default)]
    stats: AchievementStats,
}

/// JSON files under a data directory: `<user>.json` holds cards and stats,
/// `<user>.reviews.jsonl` the review log.
pub struct JsonStore {
    data_dir: PathBuf,
}

impl JsonStore {
    pub fn new(data_dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&data_dir)
            .with_context(|| format!("Failed to create data directory: {:?}", data_dir))?;
        Ok(Self { data_dir })
    }

    /// Get default storage location.
    pub fn default_path() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("certquest")
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn profile_path(&self, user_id: &str) -> Result<PathBuf> {
        check_user_id(user_id)?;
        Ok(self.data_dir.join(format!("{}.json", user_id)))
    }

    fn review_log_path(&self, user_id: &str) -> Result<PathBuf> {
        check_user_id(user_id)?;
        Ok(self.data_dir.join(format!("{}.reviews.jsonl", user_id)))
    }

    fn load_profile(&self, user_id: &str) -> Result<UserProfile> {
        let path = self.profile_path(user_id)?;
        if !path.exists() {
            return Ok(UserProfile::default());
        }

        let json = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read profile: {:?}", path))?;
        let profile = serde_json::from_str(&json)
            .with_context(|| format!("Failed to parse profile: {:?}", path))?;
        tracing::debug!(user_id, path = %path.display(), "loaded profile");
        Ok(profile)
    }

    fn save_profile(&self, user_id: &str, profile: &UserProfile) -> Result<()> {
        let path = self.profile_path(user_id)?;
        let json = serde_json::to_string_pretty(profile)?;
        fs::write(&path, json).with_context(|| format!("Failed to write profile: {:?}", path))?;
        tracing::debug!(user_id, path = %path.display(), "saved profile");
        Ok(())
    }
}

/// User ids become file names, so keep them to a safe alphabet.
fn check_user_id(user_id: &str) -> Result<()> {
    let valid = !user_id.is_empty()
        && user_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if !valid {
        bail!("Invalid user id: {:?}", user_id);
    }
    Ok(())
}

impl Repository for JsonStore {
    fn list_cards(&self, user_id: &str) -> Result<Vec<Flashcard>> {
        Ok(self.load_profile(user_id)?.cards)
    }

    fn load_card(&self, user_id: &str, card_id: &str) -> Result<Option<Flashcard>> {
        Ok(self
            .load_profile(user_id)?
            .cards
            .into_iter()
            .find(|c| c.id == card_id))
    }

    fn save_card(&mut self, user_id: &str, card: &Flashcard) -> Result<()> {
        let mut profile = self.load_profile(user_id)?;
        upsert(&mut profile.cards, card);
        self.save_profile(user_id, &profile)
    }

    fn delete_card(&mut self, user_id: &str, card_id: &str) -> Result<bool> {
        let mut profile = self.load_profile(user_id)?;
        let before = profile.cards.len();
        profile.cards.retain(|c| c.id != card_id);
        if profile.cards.len() == before {
            return Ok(false);
        }
        self.save_profile(user_id, &profile)?;
        Ok(true)
    }

    fn append_review(&mut self, entry: &ReviewLogEntry) -> Result<()> {
        let path = self.review_log_path(&entry.user_id)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Failed to open review log: {:?}", path))?;
        let line = serde_json::to_string(entry)?;
        writeln!(file, "{}", line)
            .with_context(|| format!("Failed to append to review log: {:?}", path))?;
        Ok(())
    }

    fn list_reviews(&self, user_id: &str) -> Result<Vec<ReviewLogEntry>> {
        let path = self.review_log_path(user_id)?;
        if !path.exists() {
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read review log: {:?}", path))?;
        let mut entries = Vec::new();
        for (i, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<ReviewLogEntry>(line) {
                Ok(entry) => entries.push(entry),
                Err(e) => {
                    tracing::warn!(path = %path.display(), line = i + 1, error = %e, "skipping malformed review log entry");
                }
            }
        }
        Ok(entries)
    }

    fn load_stats(&self, user_id: &str) -> Result<AchievementStats> {
        Ok(self.load_profile(user_id)?.stats)
    }

    fn save_stats(&mut self, user_id: &str, stats: &AchievementStats) -> Result<()> {
        stats.validate()?;
        let mut profile = self.load_profile(user_id)?;
        profile.stats = stats.clone();
        self.save_profile(user_id, &profile)
    }
}

/// In-memory store for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    cards: HashMap<String, Vec<Flashcard>>,
    reviews: Vec<ReviewLogEntry>,
    stats: HashMap<String, AchievementStats>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Repository for MemoryStore {
    fn list_cards(&self, user_id: &str) -> Result<Vec<Flashcard>> {
        Ok(self.cards.get(user_id).cloned().unwrap_or_default())
    }

    fn load_card(&self, user_id: &str, card_id: &str) -> Result<Option<Flashcard>> {
        Ok(self
            .cards
            .get(user_id)
            .and_then(|cards| cards.iter().find(|c| c.id == card_id))
            .cloned())
    }

    fn save_card(&mut self, user_id: &str, card: &Flashcard) -> Result<()> {
        upsert(self.cards.entry(user_id.to_string()).or_default(), card);
        Ok(())
    }

    fn delete_card(&mut self, user_id: &str, card_id: &str) -> Result<bool> {
        let Some(cards) = self.cards.get_mut(user_id) else {
            return Ok(false);
        };
        let before = cards.len();
        cards.retain(|c| c.id != card_id);
        Ok(cards.len() != before)
    }

    fn append_review(&mut self, entry: &ReviewLogEntry) -> Result<()> {
        self.reviews.push(entry.clone());
        Ok(())
    }

    fn list_reviews(&self, user_id: &str) -> Result<Vec<ReviewLogEntry>> {
        Ok(self
            .reviews
            .iter()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect())
    }

    fn load_stats(&self, user_id: &str) -> Result<AchievementStats> {
        Ok(self.stats.get(user_id).cloned().unwrap_or_default())
    }

    fn save_stats(&mut self, user_id: &str, stats: &AchievementStats) -> Result<()> {
        stats.validate()?;
        self.stats.insert(user_id.to_string(), stats.clone());
        Ok(())
    }
}

fn upsert(cards: &mut Vec<Flashcard>, card: &Flashcard) {
    match cards.iter_mut().find(|c| c.id == card.id) {
        Some(existing) => *existing = card.clone(),
        None => cards.push(card.clone()),
    }
}
