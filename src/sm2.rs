//! SM-2 spaced repetition scheduling.
//!
//! Algorithm (Wozniak):
//! 1. quality < 3: reset repetitions to 0, interval to 1
//! 2. quality >= 3: n=1 → 1 day, n=2 → 6 days, n>2 → round(prev * EF)
//! 3. EF' = EF + (0.1 - (5-q) * (0.08 + (5-q) * 0.02))
//! 4. EF never drops below the configured minimum (1.3)

use anyhow::{bail, Result};
use chrono::{DateTime, Duration, Local};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::models::{CardStatus, Flashcard, Quality, ReviewRating};

/// Lowest quality that counts as a successful recall.
pub const PASSING_QUALITY: u8 = 3;

/// Floor of the ease factor in classic SM-2.
pub const MIN_EASE_FLOOR: f64 = 1.3;

/// Tunable scheduler parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub initial_ease: f64,
    pub minimum_ease: f64,
    /// A review card graduates once its interval exceeds this many days.
    pub graduation_interval: u32,
    /// Upper bound on any scheduled interval, in days.
    pub maximum_interval: u32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            initial_ease: 2.5,
            minimum_ease: 1.3,
            graduation_interval: 21,
            maximum_interval: 36_500,
        }
    }
}

impl SchedulerConfig {
    /// Reject values that would break the ease floor or the interval bounds.
    pub fn validate(&self) -> Result<()> {
        if !(self.minimum_ease >= MIN_EASE_FLOOR) {
            bail!(
                "minimum_ease must be at least {}, got {}",
                MIN_EASE_FLOOR,
                self.minimum_ease
            );
        }
        if !(self.initial_ease >= self.minimum_ease) {
            bail!(
                "initial_ease ({}) must not be below minimum_ease ({})",
                self.initial_ease,
                self.minimum_ease
            );
        }
        if self.graduation_interval < 1 {
            bail!("graduation_interval must be at least 1 day");
        }
        if self.graduation_interval >= self.maximum_interval {
            bail!(
                "graduation_interval ({}) must be below maximum_interval ({})",
                self.graduation_interval,
                self.maximum_interval
            );
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct Scheduler {
    config: SchedulerConfig,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: SchedulerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Create a fresh card using the configured starting ease.
    pub fn new_card(&self, front: String, back: String, now: DateTime<Local>) -> Flashcard {
        Flashcard::new(front, back, self.config.initial_ease, now)
    }

    /// Validate a raw 0-5 rating and schedule the card.
    pub fn review_card(
        &self,
        card: &Flashcard,
        quality: i64,
        now: DateTime<Local>,
    ) -> Result<Flashcard, ValidationError> {
        let quality = Quality::new(quality)?;
        Ok(self.review(card, quality, now))
    }

    /// Schedule the card after a review of the given quality.
    pub fn review(&self, card: &Flashcard, quality: Quality, now: DateTime<Local>) -> Flashcard {
        let mut next = card.clone();
        next.ease_factor = self.next_ease(card.ease_factor, quality);

        if quality.value() < PASSING_QUALITY {
            if card.repetitions > 0 {
                next.lapses += 1;
            }
            next.repetitions = 0;
            next.interval = 1;
            next.status = CardStatus::Learning;
        } else {
            next.repetitions = card.repetitions.saturating_add(1);
            next.interval = match next.repetitions {
                1 => 1,
                2 => 6,
                _ => (card.interval as f64 * card.ease_factor).round() as u32,
            }
            .min(self.config.maximum_interval)
            .max(1);
            next.status = self.next_status(card.status, next.repetitions, next.interval);
        }

        next.next_review = now + Duration::days(next.interval as i64);
        next.last_reviewed_at = Some(now);
        next.total_reviews = card.total_reviews.saturating_add(1);
        next
    }

    /// Intervals each rating button would produce, formatted for display.
    pub fn preview_intervals(
        &self,
        card: &Flashcard,
        now: DateTime<Local>,
    ) -> [(ReviewRating, String); 3] {
        ReviewRating::ALL.map(|rating| {
            let next = self.review(card, rating.quality(), now);
            (rating, format_interval(next.interval))
        })
    }

    fn next_ease(&self, ease: f64, quality: Quality) -> f64 {
        let penalty = (Quality::MAX - quality.value()) as f64;
        let ease = ease + (0.1 - penalty * (0.08 + penalty * 0.02));
        ease.max(self.config.minimum_ease)
    }

    fn next_status(&self, current: CardStatus, repetitions: u32, interval: u32) -> CardStatus {
        if repetitions < 2 {
            return CardStatus::Learning;
        }
        match current {
            CardStatus::Review | CardStatus::Graduated
                if interval > self.config.graduation_interval =>
            {
                CardStatus::Graduated
            }
            _ => CardStatus::Review,
        }
    }
}

/// Format a day count the way the study screen shows it.
pub fn format_interval(days: u32) -> String {
    match days {
        0 => "now".to_string(),
        1..=29 => format!("{}d", days),
        30..=364 => format!("{}mo", days / 30),
        _ => format!("{:.1}y", days as f64 / 365.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fresh_card(now: DateTime<Local>) -> Flashcard {
        Scheduler::new().new_card("Q".into(), "A".into(), now)
    }

    #[test]
    fn first_pass_schedules_one_day() {
        let now = Local::now();
        let scheduler = Scheduler::new();
        let card = scheduler.review_card(&fresh_card(now), 5, now).unwrap();
        assert_eq!(card.repetitions, 1);
        assert_eq!(card.interval, 1);
        assert_eq!(card.status, CardStatus::Learning);
        assert_eq!(card.next_review, now + Duration::days(1));
        assert_eq!(card.last_reviewed_at, Some(now));
    }

    #[test]
    fn third_pass_uses_previous_ease() {
        let now = Local::now();
        let scheduler = Scheduler::new();
        let mut card = fresh_card(now);
        for _ in 0..3 {
            card = scheduler.review_card(&card, 5, now).unwrap();
        }
        assert_eq!(card.repetitions, 3);
        // 6 * 2.7 = 16.2
        assert_eq!(card.interval, 16);
        assert_eq!(card.status, CardStatus::Review);
        assert!((card.ease_factor - 2.8).abs() < 1e-9);
    }

    #[test]
    fn second_pass_enters_review() {
        let now = Local::now();
        let scheduler = Scheduler::new();
        let card = scheduler.review_card(&fresh_card(now), 3, now).unwrap();
        let card = scheduler.review_card(&card, 3, now).unwrap();
        assert_eq!(card.interval, 6);
        assert_eq!(card.status, CardStatus::Review);
    }

    #[test]
    fn failure_resets_and_counts_lapse() {
        let now = Local::now();
        let scheduler = Scheduler::new();
        let mut card = fresh_card(now);
        card.status = CardStatus::Review;
        card.repetitions = 4;
        card.interval = 30;

        let next = scheduler.review_card(&card, 2, now).unwrap();
        assert_eq!(next.repetitions, 0);
        assert_eq!(next.interval, 1);
        assert_eq!(next.status, CardStatus::Learning);
        assert_eq!(next.lapses, 1);
        assert!(next.ease_factor < card.ease_factor);
        assert_eq!(next.next_review, now + Duration::days(1));
    }

    #[test]
    fn failing_a_new_card_is_not_a_lapse() {
        let now = Local::now();
        let next = Scheduler::new().review_card(&fresh_card(now), 0, now).unwrap();
        assert_eq!(next.lapses, 0);
        assert_eq!(next.total_reviews, 1);
    }

    #[test]
    fn review_card_graduates_past_threshold() {
        let now = Local::now();
        let scheduler = Scheduler::new();
        let mut card = fresh_card(now);
        card.status = CardStatus::Review;
        card.repetitions = 3;
        card.interval = 16;
        card.ease_factor = 2.5;

        let next = scheduler.review_card(&card, 4, now).unwrap();
        assert_eq!(next.interval, 40);
        assert_eq!(next.status, CardStatus::Graduated);
    }

    #[test]
    fn graduation_threshold_is_configurable() {
        let now = Local::now();
        let scheduler = Scheduler::with_config(SchedulerConfig {
            graduation_interval: 60,
            ..Default::default()
        });
        let mut card = fresh_card(now);
        card.status = CardStatus::Review;
        card.repetitions = 3;
        card.interval = 16;

        let next = scheduler.review_card(&card, 4, now).unwrap();
        assert_eq!(next.status, CardStatus::Review);
    }

    #[test]
    fn default_config_is_valid() {
        assert!(SchedulerConfig::default().validate().is_ok());
    }

    #[test]
    fn config_rejects_out_of_bounds_values() {
        let low_floor = SchedulerConfig {
            minimum_ease: 0.5,
            ..Default::default()
        };
        assert!(low_floor.validate().is_err());

        let low_start = SchedulerConfig {
            initial_ease: 1.4,
            minimum_ease: 1.5,
            ..Default::default()
        };
        assert!(low_start.validate().is_err());

        let no_graduation = SchedulerConfig {
            graduation_interval: 0,
            ..Default::default()
        };
        assert!(no_graduation.validate().is_err());

        let graduation_past_cap = SchedulerConfig {
            graduation_interval: 100,
            maximum_interval: 100,
            ..Default::default()
        };
        assert!(graduation_past_cap.validate().is_err());

        let nan_ease = SchedulerConfig {
            minimum_ease: f64::NAN,
            ..Default::default()
        };
        assert!(nan_ease.validate().is_err());
    }

    #[test]
    fn quality_two_resets_under_any_valid_config() {
        let now = Local::now();
        let scheduler = Scheduler::with_config(SchedulerConfig {
            minimum_ease: 1.5,
            initial_ease: 2.0,
            graduation_interval: 10,
            maximum_interval: 400,
        });
        let mut card = fresh_card(now);
        card.status = CardStatus::Review;
        card.repetitions = 5;
        card.interval = 25;

        let next = scheduler.review_card(&card, 2, now).unwrap();
        assert_eq!(next.repetitions, 0);
        assert_eq!(next.interval, 1);

        let passed = scheduler.review_card(&card, 3, now).unwrap();
        assert_eq!(passed.repetitions, 6);
    }

    #[test]
    fn interval_is_capped() {
        let now = Local::now();
        let mut card = fresh_card(now);
        card.status = CardStatus::Graduated;
        card.repetitions = 10;
        card.interval = 30_000;
        card.ease_factor = 2.5;

        let next = Scheduler::new().review_card(&card, 5, now).unwrap();
        assert_eq!(next.interval, 36_500);
    }

    #[test]
    fn invalid_quality_is_rejected() {
        let now = Local::now();
        let card = fresh_card(now);
        let scheduler = Scheduler::new();
        assert_eq!(
            scheduler.review_card(&card, 6, now),
            Err(ValidationError::InvalidQuality(6))
        );
        assert_eq!(
            scheduler.review_card(&card, -1, now),
            Err(ValidationError::InvalidQuality(-1))
        );
    }

    #[test]
    fn ease_factor_floor_at_1_3() {
        let now = Local::now();
        let mut card = fresh_card(now);
        card.ease_factor = 1.35;
        let next = Scheduler::new().review_card(&card, 0, now).unwrap();
        assert_eq!(next.ease_factor, 1.3);
    }

    #[test]
    fn preview_covers_every_rating() {
        let now = Local::now();
        let mut card = fresh_card(now);
        card.repetitions = 1;
        card.interval = 1;
        let preview = Scheduler::new().preview_intervals(&card, now);
        assert_eq!(preview[0], (ReviewRating::Hard, "1d".to_string()));
        assert_eq!(preview[1], (ReviewRating::Good, "6d".to_string()));
        assert_eq!(preview[2], (ReviewRating::Easy, "6d".to_string()));
    }

    #[test]
    fn interval_formatting() {
        assert_eq!(format_interval(1), "1d");
        assert_eq!(format_interval(29), "29d");
        assert_eq!(format_interval(65), "2mo");
        assert_eq!(format_interval(730), "2.0y");
    }
}
