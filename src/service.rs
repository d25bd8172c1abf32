//! Study service: fetch state, apply the pure updates, persist the result.

use anyhow::{anyhow, Result};
use chrono::{DateTime, Local, NaiveDate};

use crate::achievements::{self, Achievement, AchievementId, AchievementStats};
use crate::models::{Flashcard, Quality, ReviewLogEntry, StudySummary};
use crate::sm2::Scheduler;
use crate::storage::Repository;

/// Result of reviewing one card.
#[derive(Debug, Clone)]
pub struct ReviewOutcome {
    pub card: Flashcard,
    pub stats: AchievementStats,
    pub unlocked: Vec<AchievementId>,
}

/// Stats after an exam or a check-in, with anything it unlocked.
#[derive(Debug, Clone)]
pub struct StatsOutcome {
    pub stats: AchievementStats,
    pub unlocked: Vec<AchievementId>,
}

pub struct StudyService<R> {
    repo: R,
    scheduler: Scheduler,
}

impl<R: Repository> StudyService<R> {
    pub fn new(repo: R, scheduler: Scheduler) -> Self {
        Self { repo, scheduler }
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn add_card(
        &mut self,
        user_id: &str,
        front: String,
        back: String,
        now: DateTime<Local>,
    ) -> Result<Flashcard> {
        if front.trim().is_empty() || back.trim().is_empty() {
            return Err(anyhow!("Card front and back must not be empty"));
        }
        let card = self.scheduler.new_card(front, back, now);
        self.repo.save_card(user_id, &card)?;
        tracing::info!(user_id, card_id = %card.id, "added card");
        Ok(card)
    }

    pub fn card(&self, user_id: &str, card_id: &str) -> Result<Flashcard> {
        self.repo
            .load_card(user_id, card_id)?
            .ok_or_else(|| anyhow!("Card not found: {}", card_id))
    }

    /// Remove a card. Its review history stays in the log.
    pub fn delete_card(&mut self, user_id: &str, card_id: &str) -> Result<()> {
        if !self.repo.delete_card(user_id, card_id)? {
            return Err(anyhow!("Card not found: {}", card_id));
        }
        tracing::info!(user_id, card_id, "deleted card");
        Ok(())
    }

    /// Review a card with a raw 0-5 quality.
    pub fn review(
        &mut self,
        user_id: &str,
        card_id: &str,
        quality: i64,
        now: DateTime<Local>,
    ) -> Result<ReviewOutcome> {
        let quality = Quality::new(quality)?;
        let card = self.card(user_id, card_id)?;
        let card = self.scheduler.review(&card, quality, now);
        let change = self.plan_stats(user_id, |stats| {
            let stats = achievements::record_flashcard_review(stats, quality.is_perfect());
            Ok(achievements::update_streak(&stats, now.date_naive()))
        })?;

        // Nothing is written until every check above has passed.
        self.repo.save_card(user_id, &card)?;
        self.repo.append_review(&ReviewLogEntry {
            flashcard_id: card.id.clone(),
            user_id: user_id.to_string(),
            quality,
            reviewed_at: now,
        })?;
        tracing::info!(
            user_id,
            card_id = %card.id,
            quality = quality.value(),
            interval = card.interval,
            status = card.status.name(),
            "reviewed card"
        );

        self.commit_stats(user_id, &change)?;

        Ok(ReviewOutcome {
            card,
            stats: change.stats,
            unlocked: change.unlocked,
        })
    }

    pub fn complete_exam(
        &mut self,
        user_id: &str,
        score: i64,
        today: NaiveDate,
    ) -> Result<StatsOutcome> {
        let change = self.plan_stats(user_id, |stats| {
            let stats = achievements::record_exam_completion(stats, score)?;
            Ok(achievements::update_streak(&stats, today))
        })?;
        self.commit_stats(user_id, &change)?;
        tracing::info!(user_id, score, exams = change.stats.exams_completed, "completed exam");
        Ok(change)
    }

    /// Daily login: count today toward the study streak.
    pub fn check_in(&mut self, user_id: &str, today: NaiveDate) -> Result<StatsOutcome> {
        let change = self.plan_stats(user_id, |stats| {
            Ok(achievements::update_streak(stats, today))
        })?;
        self.commit_stats(user_id, &change)?;
        Ok(change)
    }

    pub fn achievements(&self, user_id: &str) -> Result<Vec<Achievement>> {
        let stats = self.repo.load_stats(user_id)?;
        Ok(achievements::compute_progress(&stats)?)
    }

    pub fn due_cards(&self, user_id: &str, now: DateTime<Local>) -> Result<Vec<Flashcard>> {
        let mut cards: Vec<_> = self
            .repo
            .list_cards(user_id)?
            .into_iter()
            .filter(|c| c.is_due(now))
            .collect();
        cards.sort_by_key(|c| c.next_review);
        Ok(cards)
    }

    pub fn summary(&self, user_id: &str, now: DateTime<Local>) -> Result<StudySummary> {
        Ok(StudySummary::from_cards(&self.repo.list_cards(user_id)?, now))
    }

    pub fn history(&self, user_id: &str, card_id: &str) -> Result<Vec<ReviewLogEntry>> {
        Ok(self
            .repo
            .list_reviews(user_id)?
            .into_iter()
            .filter(|r| r.flashcard_id == card_id)
            .collect())
    }

    /// Apply `update` to the stored stats and diff the unlocked set, without writing.
    fn plan_stats<F>(&self, user_id: &str, update: F) -> Result<StatsOutcome>
    where
        F: FnOnce(&AchievementStats) -> Result<AchievementStats, crate::ValidationError>,
    {
        let before = self.repo.load_stats(user_id)?;
        let before_progress = achievements::compute_progress(&before)?;
        let after = update(&before)?;
        let after_progress = achievements::compute_progress(&after)?;

        Ok(StatsOutcome {
            unlocked: achievements::newly_unlocked(&before_progress, &after_progress),
            stats: after,
        })
    }

    fn commit_stats(&mut self, user_id: &str, change: &StatsOutcome) -> Result<()> {
        self.repo.save_stats(user_id, &change.stats)?;
        for id in &change.unlocked {
            let def = achievements::definition(*id);
            tracing::info!(user_id, achievement = ?id, title = def.title, "achievement unlocked");
        }
        Ok(())
    }
}
