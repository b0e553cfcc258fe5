use askama::Template;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio_stream::{wrappers::IntervalStream, StreamExt};
use tower_http::{services::ServeDir, trace::TraceLayer};

use spread_pickem::data::save_state;
use spread_pickem::models::{
    Audience, Game, LeaderboardEntry, MembershipBasis, Period, SquadId, WeekId,
};
use spread_pickem::service::PickemService;

// Custom filters for formatting
mod filters {
    use chrono::{DateTime, Utc};

    pub fn format_spread(value: &f64) -> ::askama::Result<String> {
        Ok(format!("{:+.1}", value))
    }

    pub fn format_points(value: &f64) -> ::askama::Result<String> {
        Ok(format!("{:.1}", value))
    }

    pub fn format_pct(value: &f64) -> ::askama::Result<String> {
        Ok(format!("{:.3}", value))
    }

    pub fn date(dt: &DateTime<Utc>) -> ::askama::Result<String> {
        Ok(dt.format("%a %b %e, %H:%M UTC").to_string())
    }
}

#[derive(Template)]
#[template(path = "home.html")]
struct HomeTemplate {
    active_page: String,
    week: String,
    state_text: String,
    opens_at: chrono::DateTime<chrono::Utc>,
    locks_at: chrono::DateTime<chrono::Utc>,
    game_count: usize,
    set_count: usize,
    user_count: usize,
}

#[derive(Template)]
#[template(path = "games.html")]
struct GamesTemplate {
    active_page: String,
    week: String,
    rows: Vec<GameRow>,
}

struct GameRow {
    game: Game,
    line_text: String,
    status: String,
}

#[derive(Template)]
#[template(path = "picks.html")]
struct PicksTemplate {
    active_page: String,
    week: String,
    sets: Vec<SetRow>,
}

struct SetRow {
    user: String,
    status: String,
    picks: Vec<PickRow>,
}

struct PickRow {
    game: String,
    choice: String,
    spread: f64,
    outcome: String,
}

#[derive(Template)]
#[template(path = "standings.html")]
struct StandingsTemplate {
    active_page: String,
    scope: String,
    entries: Vec<LeaderboardEntry>,
}

struct HtmlTemplate<T>(T);

impl<T> IntoResponse for HtmlTemplate<T>
where
    T: Template,
{
    fn into_response(self) -> Response {
        match self.0.render() {
            Ok(html) => Html(html).into_response(),
            Err(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to render template: {}", err),
            )
                .into_response(),
        }
    }
}

type SharedService = Arc<PickemService>;

fn resolve_week(service: &PickemService, raw: Option<&str>) -> Result<WeekId, String> {
    match raw {
        Some(raw) => {
            if let Ok(number) = raw.parse::<u8>() {
                return Ok(service.schedule().week(number));
            }
            raw.parse::<WeekId>()
        }
        None => Ok(service.current_week()),
    }
}

async fn home(State(service): State<SharedService>) -> impl IntoResponse {
    let window = service.window_state();
    let week = window.week;

    let state_text = if window.is_open {
        "open for picks"
    } else if window.is_locked {
        "locked"
    } else {
        "not yet open"
    };

    let template = HomeTemplate {
        active_page: "home".to_string(),
        week: week.to_string(),
        state_text: state_text.to_string(),
        opens_at: window.opens_at,
        locks_at: window.locks_at,
        game_count: service.games_for_week(week).len(),
        set_count: service.pick_sets_for_week(week).len(),
        user_count: service.users().len(),
    };

    HtmlTemplate(template).into_response()
}

#[derive(Deserialize)]
struct WeekQuery {
    week: Option<String>,
}

async fn games(
    State(service): State<SharedService>,
    Query(query): Query<WeekQuery>,
) -> impl IntoResponse {
    let week = match resolve_week(&service, query.week.as_deref()) {
        Ok(week) => week,
        Err(msg) => return (StatusCode::BAD_REQUEST, msg).into_response(),
    };

    let now = chrono::Utc::now();
    let rows: Vec<GameRow> = service
        .games_for_week(week)
        .into_iter()
        .map(|game| {
            let line_text = service
                .line_in_effect(&game.id, now)
                .map(|l| format!("{:+.1} ({})", l.spread_home, l.source))
                .unwrap_or_else(|| "no line".to_string());
            let status = match (game.home_score, game.away_score) {
                (Some(h), Some(a)) if game.completed => format!("final {}-{}", h, a),
                (Some(h), Some(a)) => format!("{}-{}", h, a),
                _ => "scheduled".to_string(),
            };
            GameRow {
                game,
                line_text,
                status,
            }
        })
        .collect();

    let template = GamesTemplate {
        active_page: "games".to_string(),
        week: week.to_string(),
        rows,
    };

    HtmlTemplate(template).into_response()
}

async fn picks(
    State(service): State<SharedService>,
    Query(query): Query<WeekQuery>,
) -> impl IntoResponse {
    let week = match resolve_week(&service, query.week.as_deref()) {
        Ok(week) => week,
        Err(msg) => return (StatusCode::BAD_REQUEST, msg).into_response(),
    };

    let sets: Vec<SetRow> = service
        .pick_sets_for_week(week)
        .into_iter()
        .map(|set| SetRow {
            user: set.user.to_string(),
            status: set.status.to_string(),
            picks: set
                .picks
                .iter()
                .map(|pick| PickRow {
                    game: pick.id.game.to_string(),
                    choice: pick.choice.to_string(),
                    spread: pick.spread_at_pick,
                    outcome: pick
                        .grade
                        .as_ref()
                        .map(|g| g.outcome.to_string())
                        .unwrap_or_else(|| "pending".to_string()),
                })
                .collect(),
        })
        .collect();

    let template = PicksTemplate {
        active_page: "picks".to_string(),
        week: week.to_string(),
        sets,
    };

    HtmlTemplate(template).into_response()
}

#[derive(Deserialize)]
struct StandingsQuery {
    week: Option<String>,
    squad: Option<String>,
    basis: Option<String>,
}

async fn standings(
    State(service): State<SharedService>,
    Query(query): Query<StandingsQuery>,
) -> impl IntoResponse {
    let period = match query.week.as_deref() {
        Some(raw) => match resolve_week(&service, Some(raw)) {
            Ok(week) => Period::Week(week),
            Err(msg) => return (StatusCode::BAD_REQUEST, msg).into_response(),
        },
        None => Period::Season,
    };
    let audience = match query.squad.as_deref() {
        Some(id) => Audience::Squad(SquadId::from(id)),
        None => Audience::Global,
    };
    let basis = match query.basis.as_deref() {
        Some("at-submission") => MembershipBasis::AtSubmission,
        _ => MembershipBasis::Current,
    };

    let entries = match service.leaderboard(period, audience, basis) {
        Ok(entries) => entries,
        Err(e) => return (StatusCode::BAD_REQUEST, e.to_string()).into_response(),
    };

    let scope = match period {
        Period::Week(week) => week.to_string(),
        Period::Season => "season".to_string(),
    };

    let template = StandingsTemplate {
        active_page: "standings".to_string(),
        scope,
        entries,
    };

    HtmlTemplate(template).into_response()
}

#[tokio::main]
async fn main() {
    // Load environment variables
    dotenv::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt::init();

    let (config, service) = match spread_pickem::bootstrap() {
        Ok(pair) => pair,
        Err(e) => {
            eprintln!("Failed to start: {}", e);
            std::process::exit(1);
        }
    };
    let service = Arc::new(service);

    let window = service.window_state();
    println!(
        "Loaded {} games, {} pick sets, {} users",
        service.all_games().len(),
        service.all_pick_sets().len(),
        service.users().len()
    );
    println!(
        "Current week {} ({})",
        window.week,
        if window.is_open {
            "open"
        } else if window.is_locked {
            "locked"
        } else {
            "not yet open"
        }
    );

    // Background sweep: lock due windows and grade finished games
    let sweeper = service.clone();
    let state_file = config.state_file.clone();
    tokio::spawn(async move {
        let mut ticks = IntervalStream::new(tokio::time::interval(Duration::from_secs(60)));
        while ticks.next().await.is_some() {
            let events = sweeper.poll_transitions();
            let report = sweeper.grade_sweep(None);
            if !events.is_empty() || report.graded > 0 {
                if let Err(e) = save_state(&sweeper, &state_file) {
                    tracing::warn!("Failed to save state: {}", e);
                }
            }
        }
    });

    println!("\nStarting web server at http://{}", config.bind);
    println!("Press Ctrl+C to stop\n");

    // Build router with routes
    let app = Router::new()
        // This will serve files from the "static" directory at the "/static" URL path
        .nest_service("/static", ServeDir::new("static"))
        .route("/", get(home))
        .route("/games", get(games))
        .route("/picks", get(picks))
        .route("/standings", get(standings))
        .layer(TraceLayer::new_for_http())
        .with_state(service);

    // Run server
    let listener = tokio::net::TcpListener::bind(&config.bind).await.unwrap();

    axum::serve(listener, app).await.unwrap();
}
