//! TEMPORA CLI
//!
//! Lists the bundled timing cases, verifies a case against its expected
//! fixture, or records a fresh fixture:
//!
//! ```text
//! tempora list
//! tempora run PauseResume
//! tempora run FeatureTests\Animation\PauseResumeExpect.txt R
//! tempora run Begin C BeginExpect.txt --fixtures-dir fixtures
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use tempora_oracle::{
    case_name_from_path, CaseRegistry, CaseRunner, ComparatorConfig, Locale, RunOutcome, RunRequest, RunnerConfig,
};

/// Deterministic timing oracle
#[derive(Parser, Debug)]
#[command(name = "tempora")]
#[command(about = "Run timing oracle cases against expected transcripts", long_about = None)]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Verbosity level (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the registered cases
    List,

    /// Run one case in verify (R) or create (C) mode
    Run {
        /// Case name or fixture-style path
        case: String,

        /// R to verify, C to create
        mode: Option<String>,

        /// Fixture file name ("x" for the default)
        fixture: Option<String>,

        /// Directory holding expected fixtures
        #[arg(long, value_name = "DIR", default_value = "fixtures")]
        fixtures_dir: PathBuf,

        /// Locale tag for decimal formatting (default: from the environment)
        #[arg(long, value_name = "TAG")]
        locale: Option<String>,

        /// Tolerance for progress comparisons
        #[arg(long, value_name = "EPSILON")]
        tolerance: Option<f64>,
    },

    /// Print a case transcript without touching fixtures
    Show {
        case: String,
    },
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose, args.quiet);

    match execute(args.command) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            eprintln!("Error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}

/// Returns whether the command passed
fn execute(command: Command) -> Result<bool> {
    match command {
        Command::List => {
            for entry in CaseRegistry::builtin().entries() {
                println!("{:<16} {}", entry.id, entry.description);
            }
            Ok(true)
        }
        Command::Show { case } => {
            print!("{}", show(&case)?);
            Ok(true)
        }
        Command::Run {
            case,
            mode,
            fixture,
            fixtures_dir,
            locale,
            tolerance,
        } => {
            let request = RunRequest::parse(&case, mode.as_deref(), fixture.as_deref())
                .with_context(|| format!("invalid case selection {}", case))?;
            let config = RunnerConfig::default()
                .with_fixture_dir(fixtures_dir)
                .with_comparator(comparator_config(locale.as_deref(), tolerance));

            let runner = CaseRunner::builtin(config);
            let outcome = runner
                .run(&request)
                .with_context(|| format!("running case {}", request.case))?;
            report(&outcome);
            Ok(outcome.passed())
        }
    }
}

/// Transcript of a case named directly or by fixture path
fn show(identifier: &str) -> Result<String> {
    let case = case_name_from_path(identifier);
    CaseRunner::builtin(RunnerConfig::default())
        .transcript(&case)
        .with_context(|| format!("running case {}", case))
}

fn comparator_config(locale: Option<&str>, tolerance: Option<f64>) -> ComparatorConfig {
    let mut config = ComparatorConfig::from_env();
    if let Some(tag) = locale {
        config = config.with_locale(Locale::from_tag(tag));
    }
    if let Some(tolerance) = tolerance {
        config = config.with_tolerance(tolerance);
    }
    config
}

fn report(outcome: &RunOutcome) {
    match outcome {
        RunOutcome::Created { case, path } => {
            println!("{}: wrote {}", case, path.display());
        }
        RunOutcome::Verified { case, comparison } if comparison.passed() => {
            println!("{}: passed ({} lines)", case, comparison.lines_compared);
        }
        RunOutcome::Verified { case, comparison } => {
            print!("{}", comparison.log());
            println!(
                "{}: FAILED ({} mismatches in {} lines)",
                case,
                comparison.mismatches.len(),
                comparison.lines_compared
            );
        }
    }
}

/// Initialize logging; `RUST_LOG` overrides the flags
fn init_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        "error"
    } else {
        match verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_run_arguments() {
        let args = Args::try_parse_from(["tempora", "-vv", "run", "Begin", "C", "x", "--fixtures-dir", "out"])
            .unwrap();

        assert_eq!(args.verbose, 2);
        match args.command {
            Command::Run {
                case,
                mode,
                fixture,
                fixtures_dir,
                ..
            } => {
                assert_eq!(case, "Begin");
                assert_eq!(mode.as_deref(), Some("C"));
                assert_eq!(fixture.as_deref(), Some("x"));
                assert_eq!(fixtures_dir, PathBuf::from("out"));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_comparator_overrides() {
        let config = comparator_config(Some("de-DE"), Some(0.01));

        assert_eq!(config.locale, Locale::with_separator(','));
        assert_eq!(config.tolerance, 0.01);
    }

    #[test]
    fn test_create_then_verify() {
        let dir = TempDir::new().unwrap();
        let run = |mode: &str| Command::Run {
            case: "Repeat".to_string(),
            mode: Some(mode.to_string()),
            fixture: None,
            fixtures_dir: dir.path().to_path_buf(),
            locale: Some("en-US".to_string()),
            tolerance: None,
        };

        assert!(execute(run("C")).unwrap());
        assert!(dir.path().join("RepeatExpect.txt").exists());
        assert!(execute(run("R")).unwrap());
    }

    #[test]
    fn test_missing_fixture_is_an_error() {
        let dir = TempDir::new().unwrap();
        let command = Command::Run {
            case: "Begin".to_string(),
            mode: None,
            fixture: None,
            fixtures_dir: dir.path().to_path_buf(),
            locale: None,
            tolerance: None,
        };

        assert!(execute(command).is_err());
    }

    #[test]
    fn test_show_accepts_fixture_paths() {
        let direct = show("Begin").unwrap();

        assert_eq!(show(r"FeatureTests\Animation\BeginExpect.txt").unwrap(), direct);
        assert_eq!(show("FeatureTests/Animation/BeginExpect.txt").unwrap(), direct);
    }

    #[test]
    fn test_unknown_case_is_an_error() {
        assert!(execute(Command::Show {
            case: "Missing".to_string()
        })
        .is_err());
    }
}
