//! Case runner
//!
//! Resolves a case selection to a registered case, runs it, and either
//! verifies the transcript against its fixture or writes a fresh fixture.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use tempora_core::{OracleError, OracleResult};

use crate::comparator::{Comparator, ComparatorConfig, Comparison};
use crate::fixture::{case_name_from_path, default_fixture_name, FixtureStore};
use crate::registry::CaseRegistry;

/// Placeholder meaning "use the default"
pub const PLACEHOLDER: &str = "x";

/// What to do with a case transcript
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum RunMode {
    /// `R`: compare against the fixture
    #[default]
    Verify,
    /// `C`: write the transcript as the new fixture
    Create,
}

impl FromStr for RunMode {
    type Err = OracleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "R" | "r" => Ok(RunMode::Verify),
            "C" | "c" => Ok(RunMode::Create),
            other => Err(OracleError::config(format!("unknown run mode {:?}, expected R or C", other))),
        }
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RunMode::Verify => "R",
            RunMode::Create => "C",
        })
    }
}

/// Parsed case selection
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunRequest {
    pub case: String,
    pub mode: RunMode,
    /// Explicit fixture name; `None` uses `<Case>Expect.txt`
    pub fixture: Option<String>,
}

impl RunRequest {
    pub fn new(case: impl Into<String>, mode: RunMode) -> Self {
        RunRequest {
            case: case.into(),
            mode,
            fixture: None,
        }
    }

    /// From the (identifier, mode, fixture) triple; `x` stands for the default
    pub fn parse(identifier: &str, mode: Option<&str>, fixture: Option<&str>) -> OracleResult<Self> {
        let case = case_name_from_path(identifier);
        if case.is_empty() {
            return Err(OracleError::config(format!("no case name in {:?}", identifier)));
        }
        let mode = match mode {
            None | Some(PLACEHOLDER) => RunMode::Verify,
            Some(mode) => mode.parse()?,
        };
        let fixture = match fixture {
            None | Some(PLACEHOLDER) | Some("") => None,
            Some(name) => Some(name.to_string()),
        };
        Ok(RunRequest { case, mode, fixture })
    }

    pub fn fixture_name(&self) -> String {
        self.fixture
            .clone()
            .unwrap_or_else(|| default_fixture_name(&self.case))
    }
}

/// Runner settings
#[derive(Clone, Debug)]
pub struct RunnerConfig {
    pub fixture_dir: PathBuf,
    pub comparator: ComparatorConfig,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        RunnerConfig {
            fixture_dir: PathBuf::from("fixtures"),
            comparator: ComparatorConfig::from_env(),
        }
    }
}

impl RunnerConfig {
    pub fn with_fixture_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.fixture_dir = dir.into();
        self
    }

    pub fn with_comparator(mut self, comparator: ComparatorConfig) -> Self {
        self.comparator = comparator;
        self
    }
}

/// Result of running one case
#[derive(Debug)]
pub enum RunOutcome {
    Verified { case: String, comparison: Comparison },
    Created { case: String, path: PathBuf },
}

impl RunOutcome {
    /// Create mode always passes
    pub fn passed(&self) -> bool {
        match self {
            RunOutcome::Verified { comparison, .. } => comparison.passed(),
            RunOutcome::Created { .. } => true,
        }
    }
}

/// Runs registered cases
pub struct CaseRunner<'r> {
    registry: &'r CaseRegistry,
    store: FixtureStore,
    comparator: Comparator,
}

impl CaseRunner<'static> {
    /// Runner over the bundled cases
    pub fn builtin(config: RunnerConfig) -> Self {
        CaseRunner::new(CaseRegistry::builtin(), config)
    }
}

impl<'r> CaseRunner<'r> {
    pub fn new(registry: &'r CaseRegistry, config: RunnerConfig) -> Self {
        CaseRunner {
            registry,
            store: FixtureStore::new(config.fixture_dir),
            comparator: Comparator::new(config.comparator),
        }
    }

    pub fn store(&self) -> &FixtureStore {
        &self.store
    }

    /// Run the case body and return its transcript
    pub fn transcript(&self, case: &str) -> OracleResult<String> {
        let mut instance = self.registry.construct(case)?;
        tracing::info!(case, "running case");
        instance.test().map_err(|err| match err {
            OracleError::EngineInvocation { .. } => err,
            other => OracleError::invocation(case, other.to_string()),
        })
    }

    pub fn run(&self, request: &RunRequest) -> OracleResult<RunOutcome> {
        let actual = self.transcript(&request.case)?;
        let fixture = request.fixture_name();

        match request.mode {
            RunMode::Create => {
                let path = self.store.store(&fixture, &actual)?;
                Ok(RunOutcome::Created {
                    case: request.case.clone(),
                    path,
                })
            }
            RunMode::Verify => {
                let expected = self.store.load(&fixture)?;
                let comparison = self.comparator.compare(&actual, expected.text());
                if comparison.passed() {
                    tracing::info!(case = %request.case, lines = comparison.lines_compared, "case passed");
                } else {
                    tracing::warn!(
                        case = %request.case,
                        mismatches = comparison.mismatches.len(),
                        "case failed"
                    );
                }
                Ok(RunOutcome::Verified {
                    case: request.case.clone(),
                    comparison,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comparator::Locale;
    use crate::registry::{CaseEntry, TimingCase};
    use tempfile::TempDir;

    struct Fixed;

    impl TimingCase for Fixed {
        fn test(&mut self) -> OracleResult<String> {
            Ok("Processing time 0 ms\n  Fixed: Progress = 0.5\n".to_string())
        }
    }

    struct NamedWithZero;

    impl TimingCase for NamedWithZero {
        fn test(&mut self) -> OracleResult<String> {
            Ok("Processing time 10 ms\n  Clock0: CurrentTimeInvalidated fired (Progress = 0.125)\n  \
                Clock0: Progress = 0.125\n"
                .to_string())
        }
    }

    struct Broken;

    impl TimingCase for Broken {
        fn test(&mut self) -> OracleResult<String> {
            Err(OracleError::config("engine not bound"))
        }
    }

    fn registry() -> CaseRegistry {
        let mut registry = CaseRegistry::new();
        registry
            .register(CaseEntry {
                id: "Fixed",
                description: "",
                constructor: || Box::new(Fixed),
            })
            .unwrap();
        registry
            .register(CaseEntry {
                id: "NamedWithZero",
                description: "",
                constructor: || Box::new(NamedWithZero),
            })
            .unwrap();
        registry
            .register(CaseEntry {
                id: "Broken",
                description: "",
                constructor: || Box::new(Broken),
            })
            .unwrap();
        registry
    }

    fn config(dir: &TempDir) -> RunnerConfig {
        RunnerConfig::default()
            .with_fixture_dir(dir.path())
            .with_comparator(ComparatorConfig::default())
    }

    #[test]
    fn test_parse_request() {
        let request = RunRequest::parse(r"FeatureTests\Animation\SBPause1Expect.txt", Some("R"), Some("x")).unwrap();
        assert_eq!(request, RunRequest::new("SBPause1", RunMode::Verify));
        assert_eq!(request.fixture_name(), "SBPause1Expect.txt");

        let request = RunRequest::parse("Repeat", Some("C"), Some("custom.txt")).unwrap();
        assert_eq!(request.mode, RunMode::Create);
        assert_eq!(request.fixture_name(), "custom.txt");

        assert!(RunRequest::parse("Repeat", Some("Q"), None).is_err());
    }

    #[test]
    fn test_create_then_verify() {
        let dir = TempDir::new().unwrap();
        let registry = registry();
        let runner = CaseRunner::new(&registry, config(&dir));

        let created = runner.run(&RunRequest::new("Fixed", RunMode::Create)).unwrap();
        assert!(created.passed());
        assert!(dir.path().join("FixedExpect.txt").exists());

        let verified = runner.run(&RunRequest::new("Fixed", RunMode::Verify)).unwrap();
        assert!(verified.passed());
    }

    #[test]
    fn test_create_then_verify_in_comma_locale() {
        let dir = TempDir::new().unwrap();
        let registry = registry();
        let comma = ComparatorConfig::default().with_locale(Locale::with_separator(','));
        let runner = CaseRunner::new(&registry, config(&dir).with_comparator(comma));

        assert!(runner.run(&RunRequest::new("NamedWithZero", RunMode::Create)).unwrap().passed());
        let verified = runner.run(&RunRequest::new("NamedWithZero", RunMode::Verify)).unwrap();
        assert!(verified.passed(), "{:?}", verified);
    }

    #[test]
    fn test_verify_reports_mismatch() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("FixedExpect.txt"),
            "\u{feff}Processing time 0 ms\n  Fixed: Progress = 0.6\n",
        )
        .unwrap();
        let registry = registry();
        let runner = CaseRunner::new(&registry, config(&dir));

        match runner.run(&RunRequest::new("Fixed", RunMode::Verify)).unwrap() {
            RunOutcome::Verified { comparison, .. } => {
                assert_eq!(comparison.mismatches.len(), 1);
                assert_eq!(comparison.mismatches[0].marker, "Processing time 0 ms");
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn test_errors() {
        let dir = TempDir::new().unwrap();
        let registry = registry();
        let runner = CaseRunner::new(&registry, config(&dir));

        assert!(matches!(
            runner.run(&RunRequest::new("Nope", RunMode::Verify)),
            Err(OracleError::EngineInvocation { .. })
        ));
        assert!(matches!(
            runner.run(&RunRequest::new("Broken", RunMode::Verify)),
            Err(OracleError::EngineInvocation { .. })
        ));
        assert!(matches!(
            runner.run(&RunRequest::new("Fixed", RunMode::Verify)),
            Err(OracleError::FixtureIo { .. })
        ));
    }
}
