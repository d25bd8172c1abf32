//! CertQuest - flashcard scheduling and achievements from the command line.

use std::path::PathBuf;

use anyhow::{anyhow, Result};
use chrono::Local;
use clap::{Parser, Subcommand};

use certquest::achievements::definition;
use certquest::config::Config;
use certquest::logging::init_tracing;
use certquest::sm2::{format_interval, Scheduler};
use certquest::{JsonStore, Repository, ReviewRating, StudyService};

// ══════════════════════════════════════════════════════════════════════════
// CLI Arguments
// ══════════════════════════════════════════════════════════════════════════

#[derive(Parser, Debug)]
#[command(name = "certquest")]
#[command(author, version, about = "Spaced repetition and achievements for exam practice", long_about = None)]
struct Args {
    /// Directory holding user profiles and review logs
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    /// User whose cards and stats to use
    #[arg(short, long)]
    user: Option<String>,

    /// Config file (defaults to the platform config directory)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a new flashcard
    Add { front: String, back: String },
    /// Delete a flashcard
    Delete { card_id: String },
    /// List cards due for review
    Due,
    /// Review a card
    Review {
        card_id: String,
        /// Recall quality on the 0-5 scale
        #[arg(short, long, conflicts_with = "rating", allow_negative_numbers = true)]
        quality: Option<i64>,
        /// hard, good or easy (or 1, 2, 3)
        #[arg(short, long)]
        rating: Option<String>,
    },
    /// Show the interval each rating would give
    Preview { card_id: String },
    /// Record a completed practice exam
    Exam {
        /// Score percentage, 0-100
        #[arg(allow_negative_numbers = true)]
        score: i64,
    },
    /// Count today toward the study streak
    CheckIn,
    /// Show achievement progress
    Achievements,
    /// Show card and study counters
    Stats,
    /// Show the review history of a card
    History { card_id: String },
}

// ══════════════════════════════════════════════════════════════════════════
// Main Entry Point
// ══════════════════════════════════════════════════════════════════════════

fn main() -> Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load().unwrap_or_default(),
    };
    init_tracing(&config.log_level);

    let data_dir = args
        .data_dir
        .or_else(|| config.data_dir.clone())
        .unwrap_or_else(JsonStore::default_path);
    let user = args.user.unwrap_or_else(|| config.default_user.clone());

    let store = JsonStore::new(data_dir)?;
    let mut service = StudyService::new(store, Scheduler::with_config(config.scheduler.clone()));

    run(&mut service, &user, args.command)
}

fn run(service: &mut StudyService<JsonStore>, user: &str, command: Command) -> Result<()> {
    let now = Local::now();

    match command {
        Command::Add { front, back } => {
            let card = service.add_card(user, front, back, now)?;
            println!("✓ Added card {}", card.id);
        }
        Command::Delete { card_id } => {
            service.delete_card(user, &card_id)?;
            println!("✓ Deleted card {}", card_id);
        }
        Command::Due => {
            let due = service.due_cards(user, now)?;
            if due.is_empty() {
                println!("Nothing due. Come back later!");
            }
            for card in due {
                println!("{}  [{:>9}]  {}", card.id, card.status.name(), card.front);
            }
        }
        Command::Review {
            card_id,
            quality,
            rating,
        } => {
            let quality = match (quality, rating) {
                (Some(q), _) => q,
                (None, Some(r)) => ReviewRating::parse(&r)
                    .map(|r| r.quality().value() as i64)
                    .ok_or_else(|| anyhow!("Unknown rating: {} (use hard, good or easy)", r))?,
                (None, None) => return Err(anyhow!("Pass --quality or --rating")),
            };
            let outcome = service.review(user, &card_id, quality, now)?;
            println!(
                "✓ {} → {} (next review in {})",
                outcome.card.id,
                outcome.card.status.name(),
                format_interval(outcome.card.interval)
            );
            print_unlocked(&outcome.unlocked);
        }
        Command::Preview { card_id } => {
            let card = service.card(user, &card_id)?;
            println!("{}", card.front);
            for (rating, interval) in service.scheduler().preview_intervals(&card, now) {
                println!("  {:<5} {}", rating.name(), interval);
            }
        }
        Command::Exam { score } => {
            let outcome = service.complete_exam(user, score, now.date_naive())?;
            println!(
                "✓ Exam recorded ({} completed, {} perfect)",
                outcome.stats.exams_completed, outcome.stats.perfect_scores
            );
            print_unlocked(&outcome.unlocked);
        }
        Command::CheckIn => {
            let outcome = service.check_in(user, now.date_naive())?;
            println!("🔥 {} day streak", outcome.stats.current_streak);
            print_unlocked(&outcome.unlocked);
        }
        Command::Achievements => {
            for achievement in service.achievements(user)? {
                let def = achievement.definition;
                let mark = if achievement.unlocked { "✓" } else { " " };
                println!(
                    "[{}] {:<18} {:>3}%  {:?}  {}",
                    mark, def.title, achievement.progress, def.level, def.description
                );
            }
        }
        Command::Stats => {
            let summary = service.summary(user, now)?;
            let stats = service.repository().load_stats(user)?;
            println!("Cards:      {} total, {} due", summary.total_cards, summary.due_cards);
            println!(
                "            {} new, {} learning, {} review, {} graduated",
                summary.new_cards,
                summary.learning_cards,
                summary.review_cards,
                summary.graduated_cards
            );
            println!(
                "Reviews:    {} ({} perfect)",
                stats.flashcards_reviewed, stats.perfect_reviews
            );
            println!(
                "Exams:      {} ({} perfect)",
                stats.exams_completed, stats.perfect_scores
            );
            println!("Streak:     {} days", stats.current_streak);
        }
        Command::History { card_id } => {
            for entry in service.history(user, &card_id)? {
                println!(
                    "{}  quality {}",
                    entry.reviewed_at.format("%Y-%m-%d %H:%M"),
                    entry.quality
                );
            }
        }
    }

    Ok(())
}

fn print_unlocked(unlocked: &[certquest::achievements::AchievementId]) {
    for id in unlocked {
        let def = definition(*id);
        println!("🏆 Achievement unlocked: {} ({:?})", def.title, def.level);
    }
}
