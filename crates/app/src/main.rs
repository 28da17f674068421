use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use exam_core::model::{ExamId, SessionMode};
use services::{
    Clock, ExamSession, ResultsClient, SessionError, SessionHistoryService, SessionLoopService,
    TileCategory,
};
use storage::repository::Storage;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::{MissedTickBehavior, interval, timeout};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use ui::vm::{
    FooterVm, HeaderVm, LOW_TIME_MILLIS, NavigatorVm, QuestionVm, SessionIntent, SessionOutcome,
    SummaryVm, apply_intent, format_countdown, map_result_cards,
};
use ui::{SessionContext, UiApp, UserProfile, build_session_context};

const DEFAULT_TEST_MINUTES: u64 = 30;
const SUBMISSION_GRACE: Duration = Duration::from_secs(5);

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidExamId { raw: String },
    InvalidMode { raw: String },
    InvalidMinutes { raw: String },
    InvalidLimit { raw: String },
    InvalidDbUrl { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidExamId { raw } => write!(f, "invalid --exam-id value: {raw}"),
            ArgsError::InvalidMode { raw } => write!(f, "invalid --mode value: {raw}"),
            ArgsError::InvalidMinutes { raw } => write!(f, "invalid --minutes value: {raw}"),
            ArgsError::InvalidLimit { raw } => write!(f, "invalid --limit value: {raw}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

struct TerminalApp {
    user: Option<UserProfile>,
    session_loop: Arc<SessionLoopService>,
}

impl UiApp for TerminalApp {
    fn user_profile(&self) -> Option<UserProfile> {
        self.user.clone()
    }

    fn session_loop(&self) -> Arc<SessionLoopService> {
        Arc::clone(&self.session_loop)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Run,
    History,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "run" => Some(Self::Run),
            "history" => Some(Self::History),
            _ => None,
        }
    }
}

struct Args {
    db_url: String,
    exam_id: ExamId,
    mode: SessionMode,
    minutes: Option<u64>,
    limit: u32,
    shuffle: bool,
    user: Option<String>,
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- run     [options]");
    eprintln!("  cargo run -p app -- history [--db <sqlite_url>] [--limit <n>]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>   SQLite URL (default: sqlite://dev.sqlite3)");
    eprintln!("  --exam-id <id>      Exam to draw questions from (default: 1)");
    eprintln!("  --mode <test|study> Session mode (default: test)");
    eprintln!("  --minutes <n>       Time limit; test mode defaults to {DEFAULT_TEST_MINUTES}");
    eprintln!("  --limit <n>         Maximum number of questions (default: 20)");
    eprintln!("  --shuffle           Randomise question order");
    eprintln!("  --user <name>       Name shown in the footer");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  EXAM_DB_URL, EXAM_ID, EXAM_MODE, EXAM_MINUTES, EXAM_USER");
    eprintln!("  EXAM_RESULTS_URL, EXAM_RESULTS_TOKEN (optional result submission)");
    eprintln!("  RUST_LOG (default: info)");
}

fn print_commands() {
    println!(
        "Commands: a <key> | mark | submit | next | prev | goto <n> | pause | resume | finish | exit"
    );
}

impl Args {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut db_url = std::env::var("EXAM_DB_URL")
            .ok()
            .map_or_else(|| "sqlite://dev.sqlite3".into(), normalize_sqlite_url);
        let mut exam_id = std::env::var("EXAM_ID")
            .ok()
            .and_then(|value| value.parse::<ExamId>().ok())
            .unwrap_or_else(|| ExamId::new(1));
        let mut mode = std::env::var("EXAM_MODE")
            .ok()
            .and_then(|value| SessionMode::parse(&value).ok())
            .unwrap_or(SessionMode::Test);
        let mut minutes = std::env::var("EXAM_MINUTES")
            .ok()
            .and_then(|value| value.trim().parse::<u64>().ok());
        let mut limit = 20_u32;
        let mut shuffle = false;
        let mut user = std::env::var("EXAM_USER").ok();

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = normalize_sqlite_url(value);
                }
                "--exam-id" => {
                    let value = require_value(args, "--exam-id")?;
                    exam_id = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidExamId { raw: value.clone() })?;
                }
                "--mode" => {
                    let value = require_value(args, "--mode")?;
                    mode = SessionMode::parse(&value)
                        .map_err(|_| ArgsError::InvalidMode { raw: value.clone() })?;
                }
                "--minutes" => {
                    let value = require_value(args, "--minutes")?;
                    let parsed: u64 = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidMinutes { raw: value.clone() })?;
                    minutes = Some(parsed);
                }
                "--limit" => {
                    let value = require_value(args, "--limit")?;
                    limit = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidLimit { raw: value.clone() })?;
                }
                "--shuffle" => shuffle = true,
                "--user" => user = Some(require_value(args, "--user")?),
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            db_url,
            exam_id,
            mode,
            minutes,
            limit,
            shuffle,
            user,
        })
    }

    /// Test sessions always carry a limit; study sessions only when asked.
    fn duration_millis(&self) -> Result<Option<u64>, ArgsError> {
        let minutes = match (self.mode, self.minutes) {
            (_, Some(minutes)) => minutes,
            (SessionMode::Test, None) => DEFAULT_TEST_MINUTES,
            (SessionMode::Study, None) => return Ok(None),
        };
        minutes
            .checked_mul(60_000)
            .map(Some)
            .ok_or(ArgsError::InvalidMinutes {
                raw: minutes.to_string(),
            })
    }
}

fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = std::path::Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| std::path::PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = std::path::Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }

    Ok(())
}

// ─── Rendering ─────────────────────────────────────────────────────────────────

fn render(session: &ExamSession, ctx: &SessionContext) {
    let snapshot = session.snapshot();
    let header = HeaderVm::from_snapshot(&snapshot);
    let question = QuestionVm::from_snapshot(&snapshot);
    let navigator = NavigatorVm::from_snapshot(&snapshot);
    let footer = FooterVm::with_context(&snapshot, ctx);

    println!();
    let timer = header.timer_label.as_deref().unwrap_or("untimed");
    let paused = if header.is_paused { " [paused]" } else { "" };
    println!(
        "{}  |  {}  |  {timer}{paused}",
        header.position_label, header.progress_label
    );

    let tiles: Vec<String> = navigator
        .tiles
        .iter()
        .map(|tile| {
            let mark = if tile.is_marked_for_review { "*" } else { "" };
            match tile.category {
                TileCategory::Current => format!("[{}{mark}]", tile.label),
                TileCategory::SubmittedLocked => format!("#{}{mark}", tile.label),
                TileCategory::VisitedUnsubmitted => format!("{}{mark}", tile.label),
                TileCategory::Unvisited => format!(".{}{mark}", tile.label),
            }
        })
        .collect();
    println!("{}", tiles.join(" "));

    println!();
    println!("{}. {}", question.number, question.prompt);
    for option in &question.options {
        let marker = if option.selected { ">" } else { " " };
        println!(" {marker} {}) {}", option.key, option.text);
    }
    if question.locked {
        println!("   (submitted)");
    }

    println!();
    let mut actions = vec![header.mark_label];
    if header.submit_enabled {
        actions.push("Submit");
    }
    if footer.previous_enabled {
        actions.push("Prev");
    }
    if footer.next_enabled {
        actions.push("Next");
    }
    actions.extend([footer.pause_label, "Finish", "Exit"]);
    println!("{}  |  {}", footer.user_label, actions.join(" / "));
}

fn render_summary(vm: &SummaryVm) {
    println!();
    println!("{}", vm.headline);
    println!(
        "Answered {}  |  correct {}  |  incorrect {}  |  accuracy {}  |  time {}",
        vm.answered_label, vm.correct, vm.incorrect, vm.accuracy_label, vm.time_taken_label
    );
    for row in &vm.rows {
        let mark = if row.marked { " *" } else { "" };
        println!(
            "  {:>3}. selected {:<3} correct {:<3} {}{mark}",
            row.number, row.selected, row.correct, row.outcome
        );
    }
}

// ─── Commands ──────────────────────────────────────────────────────────────────

async fn run_session(args: &Args, storage: Storage) -> Result<(), Box<dyn std::error::Error>> {
    let clock = Clock::default_clock();
    let mut session_loop = SessionLoopService::new(
        clock,
        Arc::clone(&storage.questions),
        Arc::clone(&storage.results),
    )
    .with_shuffle(args.shuffle);
    match ResultsClient::from_env() {
        Ok(client) if client.enabled() => {
            session_loop = session_loop.with_submitter(Arc::new(client));
        }
        Ok(_) => info!("results endpoint not configured; results stay local"),
        Err(err) => warn!(error = %err, "ignoring results endpoint configuration"),
    }

    let app: Arc<dyn UiApp> = Arc::new(TerminalApp {
        user: args.user.clone().map(UserProfile::new),
        session_loop: Arc::new(session_loop),
    });
    let ctx = build_session_context(&app);
    let session_loop = ctx.session_loop();

    let mut session = match session_loop
        .start_exam_session(args.exam_id, args.mode, args.duration_millis()?, args.limit)
        .await
    {
        Ok(session) => session,
        Err(SessionError::Empty) => {
            eprintln!(
                "exam {} has no questions; run `cargo run -p storage --bin seed` first",
                args.exam_id
            );
            return Ok(());
        }
        Err(err) => return Err(err.into()),
    };

    print_commands();
    render(&session, &ctx);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut ticker = interval(Duration::from_secs(1));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut warned_low_time = false;

    while !session.is_ended() {
        tokio::select! {
            _ = ticker.tick() => {
                if let Err(err) = session_loop.tick(&mut session) {
                    warn!(error = %err, "countdown update failed");
                    break;
                }
                let remaining = session.store().state().remaining_time_millis();
                if !warned_low_time && !session.is_ended()
                    && remaining.is_some_and(|ms| ms <= LOW_TIME_MILLIS)
                {
                    warned_low_time = true;
                    println!("{} remaining", format_countdown(remaining.unwrap_or(0)));
                }
            }
            line = lines.next_line() => {
                let line = line.unwrap_or_else(|err| {
                    warn!(error = %err, "reading input failed");
                    None
                });
                let Some(line) = line else {
                    // stdin closed: leave, unless the countdown already ended it.
                    session_loop.leave(&mut session)?;
                    break;
                };
                let intent = match SessionIntent::parse(&line) {
                    Ok(intent) => intent,
                    Err(err) => {
                        println!("{err}");
                        print_commands();
                        continue;
                    }
                };
                match apply_intent(session_loop, &mut session, intent) {
                    Ok(SessionOutcome::Continue) => render(&session, &ctx),
                    Ok(SessionOutcome::Ended(_)) => break,
                    Err(SessionError::Store(err)) => {
                        session_loop.note_rejected(&session, &err);
                        println!("{err}");
                    }
                    Err(err) => return Err(err.into()),
                }
            }
        }
    }

    let finalized = session_loop.finalize(&mut session).await?;
    render_summary(&SummaryVm::from(&finalized.summary));
    println!("Saved as result #{}", finalized.result_id);

    if let Some(handle) = finalized.submission {
        if timeout(SUBMISSION_GRACE, handle).await.is_err() {
            warn!("result submission still pending at shutdown");
        }
    }
    Ok(())
}

async fn show_history(limit: u32, storage: Storage) -> Result<(), Box<dyn std::error::Error>> {
    let history = SessionHistoryService::new(storage.results);
    let cards = map_result_cards(&history.list_recent(limit).await?);
    if cards.is_empty() {
        println!("No results yet.");
    }
    for card in cards {
        println!(
            "#{:<4} {}  {:<5}  {:<17}  {}  ({})",
            card.id, card.ended_at_str, card.mode, card.headline, card.score_label, card.accuracy_label
        );
    }
    Ok(())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv: Vec<String> = std::env::args().skip(1).collect();

    let cmd = match argv.first().map(String::as_str) {
        None => Command::Run,
        Some("--help" | "-h") => {
            print_usage();
            return Ok(());
        }
        Some(first) if first.starts_with("--") => Command::Run,
        Some(first) => Command::from_arg(first).ok_or_else(|| {
            eprintln!("unknown subcommand: {first}");
            print_usage();
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "unknown subcommand")
        })?,
    };

    if !argv.is_empty() && !argv[0].starts_with("--") {
        argv.remove(0);
    }

    let mut iter = argv.into_iter();
    let parsed = Args::parse(&mut iter).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    // Open + migrate SQLite at startup. Keep this in the binary glue so core/services stay pure.
    prepare_sqlite_file(&parsed.db_url)?;
    let storage = Storage::sqlite(&parsed.db_url).await?;
    info!(db = %parsed.db_url, "storage ready");

    match cmd {
        Command::Run => run_session(&parsed, storage).await,
        Command::History => show_history(parsed.limit, storage).await,
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run().await {
        // At this layer (binary glue), printing once is fine.
        eprintln!("{err}");
        std::process::exit(2);
    }
}
