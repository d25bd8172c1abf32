//! Property-based tests for scheduling and achievement progress.
//!
//! - Same-day streak updates are idempotent
//! - Raising a counter never lowers progress
//! - unlocked ⟺ progress >= 100
//! - Quality 2 resets a card, quality 3 advances it by one repetition
//! - Ease factor never drops below 1.3

use chrono::{Duration, Local, NaiveDate, TimeZone};
use proptest::prelude::*;

use certquest::achievements::{
    catalog, compute_progress, record_exam_completion, record_flashcard_review, update_streak,
    AchievementStats,
};
use certquest::{CardStatus, Flashcard, Scheduler};

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_date() -> impl Strategy<Value = NaiveDate> {
    (0i64..20_000).prop_map(|offset| {
        NaiveDate::from_ymd_opt(1990, 1, 1).unwrap() + Duration::days(offset)
    })
}

fn arb_stats() -> impl Strategy<Value = AchievementStats> {
    (
        0u32..1_000,
        0u32..1_000,
        0u32..1_000,
        0u32..1_000,
        0u32..100,
        proptest::option::of(arb_date()),
    )
        .prop_map(|(exams, perfect_exams, reviews, perfect_reviews, streak, last)| {
            AchievementStats {
                exams_completed: exams,
                perfect_scores: perfect_exams.min(exams),
                flashcards_reviewed: reviews,
                perfect_reviews: perfect_reviews.min(reviews),
                current_streak: if last.is_some() { streak } else { 0 },
                last_study_date: last,
            }
        })
}

fn arb_status() -> impl Strategy<Value = CardStatus> {
    prop_oneof![
        Just(CardStatus::New),
        Just(CardStatus::Learning),
        Just(CardStatus::Review),
        Just(CardStatus::Graduated),
    ]
}

fn arb_card() -> impl Strategy<Value = Flashcard> {
    (arb_status(), 0u32..400, 0u32..20, 130u32..=300).prop_map(
        |(status, interval, repetitions, ease)| {
            let now = Local.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();
            let mut card = Flashcard::new("front".into(), "back".into(), 2.5, now);
            card.status = status;
            card.interval = interval;
            card.repetitions = repetitions;
            card.ease_factor = ease as f64 / 100.0;
            card
        },
    )
}

// ============================================================================
// Streaks
// ============================================================================

proptest! {
    #[test]
    fn streak_same_day_is_idempotent(stats in arb_stats(), today in arb_date()) {
        let once = update_streak(&stats, today);
        let twice = update_streak(&once, today);
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn streak_consecutive_days_increment(stats in arb_stats(), today in arb_date()) {
        let mut stats = stats;
        stats.last_study_date = Some(today - Duration::days(1));
        let next = update_streak(&stats, today);
        prop_assert_eq!(next.current_streak, stats.current_streak + 1);
        prop_assert_eq!(next.last_study_date, Some(today));
    }
}

// ============================================================================
// Achievement Progress
// ============================================================================

proptest! {
    #[test]
    fn unlocked_iff_full_progress(stats in arb_stats()) {
        for achievement in compute_progress(&stats).unwrap() {
            prop_assert!(achievement.progress <= 100);
            prop_assert_eq!(achievement.unlocked, achievement.progress >= 100);
            let counter = achievement.definition.id.counter(&stats);
            prop_assert_eq!(achievement.unlocked, counter >= achievement.definition.requirement);
        }
    }

    #[test]
    fn progress_is_deterministic(stats in arb_stats()) {
        prop_assert_eq!(compute_progress(&stats).unwrap(), compute_progress(&stats).unwrap());
    }

    #[test]
    fn recording_activity_never_lowers_progress(
        stats in arb_stats(),
        score in 0i64..=100,
        perfect in any::<bool>(),
    ) {
        let before = compute_progress(&stats).unwrap();
        let after_exam = compute_progress(&record_exam_completion(&stats, score).unwrap()).unwrap();
        let after_review = compute_progress(&record_flashcard_review(&stats, perfect)).unwrap();

        prop_assert_eq!(before.len(), catalog().len());
        for (b, a) in before.iter().zip(&after_exam) {
            prop_assert!(a.progress >= b.progress);
        }
        for (b, a) in before.iter().zip(&after_review) {
            prop_assert!(a.progress >= b.progress);
        }
    }
}

proptest! {
    #[test]
    fn raising_any_single_counter_never_lowers_progress(
        stats in arb_stats(),
        field in 0usize..5,
        bump in 1u32..50,
    ) {
        let mut raised = stats.clone();
        match field {
            0 => raised.exams_completed += bump,
            // perfect counters stay within their totals
            1 => raised.perfect_scores += bump.min(stats.exams_completed - stats.perfect_scores),
            2 => raised.flashcards_reviewed += bump,
            3 => raised.perfect_reviews += bump.min(stats.flashcards_reviewed - stats.perfect_reviews),
            _ => {
                raised.current_streak += bump;
                raised.last_study_date.get_or_insert(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
            }
        }

        let before = compute_progress(&stats).unwrap();
        let after = compute_progress(&raised).unwrap();
        for (b, a) in before.iter().zip(&after) {
            prop_assert_eq!(b.definition.id, a.definition.id);
            prop_assert!(
                a.progress >= b.progress,
                "{:?} dropped from {} to {}",
                a.definition.id,
                b.progress,
                a.progress
            );
        }
    }
}

// ============================================================================
// Scheduler
// ============================================================================

proptest! {
    #[test]
    fn quality_two_always_resets(card in arb_card()) {
        let now = Local::now();
        let next = Scheduler::new().review_card(&card, 2, now).unwrap();
        prop_assert_eq!(next.repetitions, 0);
        prop_assert_eq!(next.interval, 1);
        prop_assert_eq!(next.status, CardStatus::Learning);
    }

    #[test]
    fn quality_three_advances_one_repetition(card in arb_card()) {
        let now = Local::now();
        let next = Scheduler::new().review_card(&card, 3, now).unwrap();
        prop_assert_eq!(next.repetitions, card.repetitions + 1);
        prop_assert!(next.interval >= 1);
        prop_assert_eq!(next.next_review, now + Duration::days(next.interval as i64));
    }

    #[test]
    fn ease_factor_never_below_floor(
        card in arb_card(),
        qualities in proptest::collection::vec(0i64..=5, 1..40),
    ) {
        let scheduler = Scheduler::new();
        let now = Local::now();
        let mut card = card;
        for q in qualities {
            card = scheduler.review_card(&card, q, now).unwrap();
            prop_assert!(card.ease_factor >= 1.3);
            prop_assert!(card.interval >= 1);
        }
    }

    #[test]
    fn out_of_range_quality_is_rejected(card in arb_card(), q in prop_oneof![-100i64..0, 6i64..100]) {
        prop_assert!(Scheduler::new().review_card(&card, q, Local::now()).is_err());
    }
}
