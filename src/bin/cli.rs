use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use spread_pickem::data::{save_standings_to_csv, save_state};
use spread_pickem::feed::{apply_feed_week, import_feed_file, FeedClient};
use spread_pickem::models::{
    Audience, Choice, GameId, MembershipBasis, Period, PickId, PickRequest, SquadId, UserId,
    WeekId,
};
use spread_pickem::service::PickemService;

#[derive(Parser)]
#[command(name = "pickem")]
#[command(about = "Pick three against the spread: season driver", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the current week and its submission window
    Status,
    /// List a week's slate with lines and results
    Games {
        /// Week id, e.g. 2025-W03 (defaults to the current week)
        #[arg(short, long)]
        week: Option<String>,
    },
    /// Save a draft of one to three picks
    Draft {
        #[arg(short, long)]
        user: String,
        #[arg(short, long)]
        week: Option<String>,
        /// Pick spec game-id:home or game-id:away, repeatable
        #[arg(short, long = "pick", required = true)]
        picks: Vec<String>,
    },
    /// Submit the week's three picks
    Submit {
        #[arg(short, long)]
        user: String,
        #[arg(short, long)]
        week: Option<String>,
        /// Pick spec game-id:home or game-id:away, exactly three
        #[arg(short, long = "pick", required = true)]
        picks: Vec<String>,
    },
    /// Grade a single pick
    Grade {
        #[arg(short, long)]
        user: String,
        #[arg(short, long)]
        week: Option<String>,
        #[arg(short, long)]
        game: String,
    },
    /// Apply due locks and grade everything finished
    Sweep {
        /// Restrict to one week
        #[arg(short, long)]
        week: Option<String>,
    },
    /// Print standings (season unless --week is given)
    Standings {
        #[arg(short, long)]
        week: Option<String>,
        /// Restrict to a squad
        #[arg(long)]
        squad: Option<String>,
        /// Count picks only while the user was a squad member
        #[arg(long)]
        at_submission: bool,
        /// Also write the table to a CSV file
        #[arg(long)]
        csv: Option<String>,
    },
    /// Write the penalty set for one user who missed a week
    Backfill {
        #[arg(short, long)]
        user: String,
        #[arg(short, long)]
        week: String,
    },
    /// Write penalty sets for every user who missed a week
    BackfillWeek {
        #[arg(short, long)]
        week: String,
    },
    /// Import a feed payload from a JSON file
    Import {
        #[arg(short, long)]
        file: PathBuf,
    },
    /// Pull a week from the configured feed URL
    Sync {
        #[arg(short, long)]
        week: Option<String>,
    },
    /// Register a user
    Register {
        #[arg(short, long)]
        user: String,
    },
    /// Manage squads
    Squad {
        #[command(subcommand)]
        action: SquadAction,
    },
}

#[derive(Subcommand)]
enum SquadAction {
    /// Create a squad
    Add {
        #[arg(long)]
        id: String,
        #[arg(long)]
        name: String,
    },
    /// Join a squad
    Join {
        #[arg(long)]
        id: String,
        #[arg(long)]
        user: String,
    },
    /// Leave a squad
    Leave {
        #[arg(long)]
        id: String,
        #[arg(long)]
        user: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let (config, service) = spread_pickem::bootstrap()?;

    match cli.command {
        Commands::Status => {
            let window = service.window_state();
            println!("Week {}", window.week);
            println!("  opens: {}", window.opens_at);
            println!("  locks: {}", window.locks_at);
            let state = if window.is_open {
                "open for picks"
            } else if window.is_locked {
                "locked"
            } else {
                "not yet open"
            };
            println!("  state: {}", state);
        }
        Commands::Games { week } => {
            let week = parse_week(&service, week.as_deref())?;
            let games = service.games_for_week(week);
            if games.is_empty() {
                println!("No games loaded for {}.", week);
            }
            let now = chrono::Utc::now();
            for game in games {
                let line = service
                    .line_in_effect(&game.id, now)
                    .map(|l| format!("home {:+.1} ({})", l.spread_home, l.source))
                    .unwrap_or_else(|| "no line".to_string());
                let score = match (game.home_score, game.away_score) {
                    (Some(h), Some(a)) if game.completed => format!("final {}-{}", h, a),
                    (Some(h), Some(a)) => format!("{}-{} in progress", h, a),
                    _ => format!("kicks {}", game.kickoff),
                };
                println!(
                    "{:<14} {:<30} {:<24} {}",
                    game.id.as_str(),
                    game.matchup(),
                    line,
                    score
                );
            }
        }
        Commands::Draft { user, week, picks } => {
            let week = parse_week(&service, week.as_deref())?;
            let requests = parse_picks(&picks)?;
            let set = service.save_draft(&UserId::from(user.as_str()), week, &requests)?;
            println!("Draft saved for {} in {}:", set.user, set.week);
            print_picks(&set);
        }
        Commands::Submit { user, week, picks } => {
            let week = parse_week(&service, week.as_deref())?;
            let requests = parse_picks(&picks)?;
            let set = service.submit_picks(&UserId::from(user.as_str()), week, &requests)?;
            println!("Picks submitted for {} in {}:", set.user, set.week);
            print_picks(&set);
        }
        Commands::Grade { user, week, game } => {
            let week = parse_week(&service, week.as_deref())?;
            let id = PickId {
                user: UserId::from(user.as_str()),
                week,
                game: GameId::from(game.as_str()),
            };
            let grade = service.grade_pick(&id)?;
            println!(
                "{}: {} ({}, {:+.1} payout units)",
                id, grade.outcome, grade.result, grade.payout
            );
        }
        Commands::Sweep { week } => {
            let week = week.as_deref().map(|w| parse_week_spec(&service, w)).transpose()?;
            service.poll_transitions();
            let report = service.grade_sweep(week);
            println!(
                "Sweep done: {} graded, {} pending, {} already graded.",
                report.graded, report.pending, report.already_graded
            );
        }
        Commands::Standings {
            week,
            squad,
            at_submission,
            csv,
        } => {
            let period = match week {
                Some(raw) => Period::Week(parse_week_spec(&service, &raw)?),
                None => Period::Season,
            };
            let audience = match squad {
                Some(id) => Audience::Squad(SquadId::from(id.as_str())),
                None => Audience::Global,
            };
            let basis = if at_submission {
                MembershipBasis::AtSubmission
            } else {
                MembershipBasis::Current
            };
            let entries = service.leaderboard(period, audience, basis)?;

            println!(
                "{:<5} {:<20} {:>4} {:>4} {:>5} {:>7} {:>7}",
                "rank", "user", "w", "l", "push", "points", "pct"
            );
            for entry in &entries {
                println!(
                    "{:<5} {:<20} {:>4} {:>4} {:>5} {:>7.1} {:>7.3}",
                    entry.rank,
                    entry.user.as_str(),
                    entry.wins,
                    entry.losses,
                    entry.pushes,
                    entry.points,
                    entry.win_pct
                );
            }
            if let Some(path) = csv {
                save_standings_to_csv(&entries, &path)?;
                println!("\nSaved standings to {}", path);
            }
        }
        Commands::Backfill { user, week } => {
            let week = parse_week_spec(&service, &week)?;
            let set = service.backfill_missing_week(&UserId::from(user.as_str()), week)?;
            println!("Penalty set written for {} in {} (0-3).", set.user, set.week);
        }
        Commands::BackfillWeek { week } => {
            let week = parse_week_spec(&service, &week)?;
            let written = service.backfill_week(week)?;
            println!("Penalty backfill for {}: {} sets written.", week, written);
        }
        Commands::Import { file } => {
            let report = import_feed_file(&service, &file)?;
            println!(
                "Imported {}: {} games, {} lines.",
                file.display(),
                report.games,
                report.lines
            );
        }
        Commands::Sync { week } => {
            let base_url = match config.feed_url.clone() {
                Some(url) => url,
                None => bail!("PICKEM_FEED_URL is not set"),
            };
            let week = parse_week(&service, week.as_deref())?;
            let client = FeedClient::new(base_url);
            let payload = client
                .fetch_week(week.season, week.number)
                .await
                .context("Failed to fetch feed week")?;
            let report = apply_feed_week(&service, payload)?;
            println!("Synced {}: {} games, {} lines.", week, report.games, report.lines);
        }
        Commands::Register { user } => {
            service.register_user(&UserId::from(user.as_str()));
            println!("Registered {}.", user);
        }
        Commands::Squad { action } => match action {
            SquadAction::Add { id, name } => {
                service.create_squad(&SquadId::from(id.as_str()), &name);
                println!("Squad {} created.", id);
            }
            SquadAction::Join { id, user } => {
                service.join_squad(&SquadId::from(id.as_str()), &UserId::from(user.as_str()))?;
                println!("{} joined {}.", user, id);
            }
            SquadAction::Leave { id, user } => {
                service.leave_squad(&SquadId::from(id.as_str()), &UserId::from(user.as_str()))?;
                println!("{} left {}.", user, id);
            }
        },
    }

    save_state(&service, &config.state_file)?;
    Ok(())
}

/// Resolve an optional week argument, defaulting to the current week.
fn parse_week(service: &PickemService, raw: Option<&str>) -> Result<WeekId> {
    match raw {
        Some(raw) => parse_week_spec(service, raw),
        None => Ok(service.current_week()),
    }
}

/// Parse a week spec; a bare number means a week of the configured season.
fn parse_week_spec(service: &PickemService, raw: &str) -> Result<WeekId> {
    if let Ok(number) = raw.parse::<u8>() {
        return Ok(service.schedule().week(number));
    }
    raw.parse::<WeekId>().map_err(|e| anyhow::anyhow!(e))
}

fn parse_picks(raw: &[String]) -> Result<Vec<PickRequest>> {
    raw.iter()
        .map(|spec| {
            let (game, side) = spec
                .split_once(':')
                .with_context(|| format!("pick '{}' must look like game-id:home", spec))?;
            let choice = side
                .parse::<Choice>()
                .map_err(|e| anyhow::anyhow!(e))?;
            Ok(PickRequest {
                game: GameId::from(game),
                choice,
            })
        })
        .collect()
}

fn print_picks(set: &spread_pickem::models::PickSet) {
    for pick in &set.picks {
        println!(
            "  {} {} at home {:+.1}",
            pick.id.game, pick.choice, pick.spread_at_pick
        );
    }
}
