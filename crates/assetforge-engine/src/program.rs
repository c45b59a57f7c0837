//! Program text parsing.
//!
//! A program is a JSON array of entries, each either
//! `{"node": "literal", "kind": .., "data": ..}` or
//! `{"node": "derived", "kind": .., "deps": [indices]}`. Entry *i* may only
//! reference entries before it; the program's result is its last entry.

use serde::Deserialize;
use serde_json::json;
use smallvec::SmallVec;

use assetforge_core::LiteralData;

use crate::error::ExecError;

#[derive(Debug, Deserialize)]
#[serde(tag = "node", rename_all = "lowercase")]
enum RawEntry {
    Literal {
        kind: String,
        #[serde(default)]
        data: serde_json::Value,
    },
    Derived {
        kind: String,
        #[serde(default)]
        deps: SmallVec<[usize; 4]>,
    },
}

/// Shape of a parsed entry. Derived deps are indices of earlier entries.
#[derive(Debug, Clone, PartialEq)]
pub enum EntryShape {
    Literal(LiteralData),
    Derived(SmallVec<[usize; 4]>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProgramEntry {
    pub kind: String,
    pub shape: EntryShape,
}

/// A validated, non-empty, topologically ordered program.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    entries: Vec<ProgramEntry>,
}

impl Program {
    pub fn entries(&self) -> &[ProgramEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Parses and validates program text.
pub fn parse_program(text: &str) -> Result<Program, ExecError> {
    let raw: Vec<RawEntry> =
        serde_json::from_str(text).map_err(|e| ExecError::parse(e.to_string()))?;
    if raw.is_empty() {
        return Err(ExecError::parse("program has no entries"));
    }

    let mut entries = Vec::with_capacity(raw.len());
    for (index, entry) in raw.into_iter().enumerate() {
        let entry = match entry {
            RawEntry::Literal { kind, data } => {
                let data = LiteralData::from_json(&data).ok_or_else(|| {
                    ExecError::parse(format!(
                        "entry {index} ({kind}): literal data must be a primitive, got {data}"
                    ))
                })?;
                ProgramEntry {
                    kind,
                    shape: EntryShape::Literal(data),
                }
            }
            RawEntry::Derived { kind, deps } => {
                if let Some(&bad) = deps.iter().find(|&&dep| dep >= index) {
                    return Err(ExecError::parse(format!(
                        "entry {index} ({kind}): dependency {bad} does not refer to an earlier entry"
                    )));
                }
                ProgramEntry {
                    kind,
                    shape: EntryShape::Derived(deps),
                }
            }
        };
        entries.push(entry);
    }
    Ok(Program { entries })
}

/// Builds program text programmatically. Indices returned by `literal` and
/// `derived` are valid dependency references for later entries.
#[derive(Debug, Default, Clone)]
pub struct ProgramBuilder {
    entries: Vec<serde_json::Value>,
}

impl ProgramBuilder {
    pub fn new() -> Self {
        ProgramBuilder::default()
    }

    pub fn literal(&mut self, kind: &str, data: impl Into<serde_json::Value>) -> usize {
        self.entries
            .push(json!({ "node": "literal", "kind": kind, "data": data.into() }));
        self.entries.len() - 1
    }

    pub fn derived(&mut self, kind: &str, deps: impl IntoIterator<Item = usize>) -> usize {
        let deps: Vec<usize> = deps.into_iter().collect();
        self.entries
            .push(json!({ "node": "derived", "kind": kind, "deps": deps }));
        self.entries.len() - 1
    }

    /// Compact JSON text for the program.
    pub fn to_text(&self) -> String {
        serde_json::Value::Array(self.entries.clone()).to_string()
    }
}
