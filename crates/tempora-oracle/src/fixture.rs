//! Expected-output fixtures
//!
//! Fixtures are UTF-8 text files holding the transcript a case must
//! produce. A leading byte-order mark is ignored on read; fixtures are
//! written without one.

use std::fs;
use std::path::{Path, PathBuf};

use tempora_core::{OracleError, OracleResult};

const BOM: char = '\u{feff}';

/// Case name from a case identifier that may be a fixture-style path,
/// e.g. `FeatureTests\Animation\SBPause1Expect.txt` gives `SBPause1`
pub fn case_name_from_path(identifier: &str) -> String {
    let file = match identifier.rfind(|c| c == '\\' || c == '/') {
        Some(pos) => &identifier[pos + 1..],
        None => identifier,
    };
    let stem = match file.rfind('.') {
        Some(pos) if pos > 0 => &file[..pos],
        _ => file,
    };
    match stem.rfind("Expect") {
        Some(pos) => format!("{}{}", &stem[..pos], &stem[pos + "Expect".len()..]),
        None => stem.to_string(),
    }
}

/// Fixture file name used when none is given
pub fn default_fixture_name(case: &str) -> String {
    format!("{}Expect.txt", case)
}

/// Loaded fixture contents
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExpectedFixture {
    text: String,
}

impl ExpectedFixture {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let text = match text.strip_prefix(BOM) {
            Some(rest) => rest.to_string(),
            None => text,
        };
        ExpectedFixture { text }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Lines as the comparator sees them
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.text.split('\n')
    }
}

/// Directory holding fixtures
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FixtureStore {
    root: PathBuf,
}

impl FixtureStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        FixtureStore { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of a fixture; absolute names are used as given
    pub fn path_of(&self, name: &str) -> PathBuf {
        let name = Path::new(name);
        if name.is_absolute() {
            name.to_path_buf()
        } else {
            self.root.join(name)
        }
    }

    pub fn load(&self, name: &str) -> OracleResult<ExpectedFixture> {
        let path = self.path_of(name);
        let text = fs::read_to_string(&path).map_err(|source| OracleError::FixtureIo {
            path: path.clone(),
            source,
        })?;
        tracing::debug!(path = %path.display(), bytes = text.len(), "fixture loaded");
        Ok(ExpectedFixture::new(text))
    }

    /// Write `text` verbatim; returns the path written
    pub fn store(&self, name: &str, text: &str) -> OracleResult<PathBuf> {
        let path = self.path_of(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| OracleError::FixtureIo {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        fs::write(&path, text).map_err(|source| OracleError::FixtureIo {
            path: path.clone(),
            source,
        })?;
        tracing::info!(path = %path.display(), "fixture written");
        Ok(path)
    }
}
