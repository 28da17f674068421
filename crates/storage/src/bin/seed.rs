use std::fmt;

use exam_core::model::{ExamId, QuestionDraft, QuestionId};
use storage::repository::Storage;

#[derive(Debug, Clone)]
struct Args {
    db_url: String,
    exam_id: ExamId,
    first_id: u64,
}

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidExamId { raw: String },
    InvalidFirstId { raw: String },
    InvalidDbUrl { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidExamId { raw } => write!(f, "invalid --exam-id value: {raw}"),
            ArgsError::InvalidFirstId { raw } => write!(f, "invalid --first-id value: {raw}"),
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

impl Args {
    fn parse() -> Result<Self, ArgsError> {
        let mut db_url = std::env::var("EXAM_DB_URL")
            .unwrap_or_else(|_| "sqlite://dev.sqlite3?mode=rwc".into());
        let mut exam_id = std::env::var("EXAM_ID")
            .ok()
            .and_then(|value| value.parse::<ExamId>().ok())
            .unwrap_or_else(|| ExamId::new(1));
        let mut first_id = 1_u64;

        let mut args = std::env::args().skip(1);
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = value;
                }
                "--exam-id" => {
                    let value = require_value(&mut args, "--exam-id")?;
                    exam_id = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidExamId { raw: value.clone() })?;
                }
                "--first-id" => {
                    let value = require_value(&mut args, "--first-id")?;
                    first_id = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidFirstId { raw: value.clone() })?;
                }
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
            first_id,
        })
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p storage --bin seed -- [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>         SQLite URL (default: sqlite://dev.sqlite3?mode=rwc)");
    eprintln!("  --exam-id <id>            Exam the sample questions belong to (default: 1)");
    eprintln!("  --first-id <id>           Id of the first sample question (default: 1)");
    eprintln!("  -h, --help                Show this help");
    eprintln!();
    eprintln!("Environment (same as flags):");
    eprintln!("  EXAM_DB_URL, EXAM_ID");
}

const SAMPLES: &[(&str, [&str; 4], &str)] = &[
    (
        "Which gas do plants absorb from the atmosphere for photosynthesis?",
        ["Oxygen", "Carbon dioxide", "Nitrogen", "Hydrogen"],
        "B",
    ),
    (
        "What is the derivative of x^2?",
        ["x", "2", "2x", "x^3 / 3"],
        "C",
    ),
    (
        "Which organelle is known as the powerhouse of the cell?",
        ["Mitochondrion", "Nucleus", "Ribosome", "Golgi apparatus"],
        "A",
    ),
    (
        "What is the SI unit of electric resistance?",
        ["Volt", "Ampere", "Watt", "Ohm"],
        "D",
    ),
    (
        "Solve for x: 3x + 5 = 20",
        ["3", "5", "15", "25 / 3"],
        "B",
    ),
    (
        "Which element has the atomic number 6?",
        ["Oxygen", "Carbon", "Helium", "Lithium"],
        "B",
    ),
];

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse().map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let storage = Storage::sqlite(&args.db_url).await?;

    for (offset, (prompt, options, correct)) in (0_u64..).zip(SAMPLES) {
        let draft = QuestionDraft {
            exam_id: args.exam_id,
            prompt: (*prompt).to_string(),
            options: ["A", "B", "C", "D"]
                .iter()
                .zip(options.iter())
                .map(|(key, text)| ((*key).to_string(), (*text).to_string()))
                .collect(),
            correct_answer: (*correct).to_string(),
        };
        let question = draft.validate(QuestionId::new(args.first_id + offset))?;
        storage.questions.upsert_question(&question).await?;
    }

    println!(
        "Seeded exam {} with {} questions into {}",
        args.exam_id,
        SAMPLES.len(),
        args.db_url
    );

    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
