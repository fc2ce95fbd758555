//! Case registry
//!
//! Maps case identifiers to constructors. The built-in registry is
//! populated once and is read-only afterwards.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::OnceLock;

use tempora_core::{OracleError, OracleResult};

/// A runnable timing scenario
pub trait TimingCase {
    /// Run the scenario and return its transcript
    fn test(&mut self) -> OracleResult<String>;
}

/// Builds a fresh case instance
pub type CaseConstructor = fn() -> Box<dyn TimingCase>;

/// One registered case
#[derive(Clone, Copy)]
pub struct CaseEntry {
    pub id: &'static str,
    pub description: &'static str,
    pub constructor: CaseConstructor,
}

impl fmt::Debug for CaseEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CaseEntry")
            .field("id", &self.id)
            .field("description", &self.description)
            .finish()
    }
}

/// Identifier to constructor map
#[derive(Debug, Default)]
pub struct CaseRegistry {
    cases: BTreeMap<&'static str, CaseEntry>,
}

static BUILTIN: OnceLock<CaseRegistry> = OnceLock::new();

impl CaseRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every bundled case
    pub fn builtin() -> &'static CaseRegistry {
        BUILTIN.get_or_init(|| {
            let mut registry = CaseRegistry::new();
            for entry in crate::cases::BUILTIN_CASES {
                if let Err(err) = registry.register(*entry) {
                    tracing::warn!(%err, "skipping bundled case");
                }
            }
            registry
        })
    }

    pub fn register(&mut self, entry: CaseEntry) -> OracleResult<()> {
        if self.cases.contains_key(entry.id) {
            return Err(OracleError::config(format!("case {} is already registered", entry.id)));
        }
        self.cases.insert(entry.id, entry);
        Ok(())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.cases.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&CaseEntry> {
        self.cases.get(id)
    }

    /// Build a case by identifier
    pub fn construct(&self, id: &str) -> OracleResult<Box<dyn TimingCase>> {
        self.cases
            .get(id)
            .map(|entry| (entry.constructor)())
            .ok_or_else(|| OracleError::invocation(id, format!("Cannot find class {}", id)))
    }

    /// Registered identifiers, sorted
    pub fn ids(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.cases.keys().copied()
    }

    pub fn entries(&self) -> impl Iterator<Item = &CaseEntry> {
        self.cases.values()
    }

    pub fn len(&self) -> usize {
        self.cases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }
}
