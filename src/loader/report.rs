//! Summary of what a load run did, including the rows it had to degrade.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::ir::Split;

/// Counts and issues collected while a [`Loader`](super::Loader) is drained.
///
/// The report grows as records are pulled, so it describes the part of the
/// dataset consumed so far.
#[derive(Clone, Debug, Default, Serialize)]
pub struct LoadReport {
    /// Per-split counts, in canonical split order.
    pub splits: BTreeMap<Split, LoadCounts>,
    pub issues: Vec<LoadIssue>,
}

impl LoadReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, issue: LoadIssue) {
        self.issues.push(issue);
    }

    pub(crate) fn counts_mut(&mut self, split: Split) -> &mut LoadCounts {
        self.splits.entry(split).or_default()
    }

    /// Total records over all splits.
    pub fn records(&self) -> usize {
        self.splits.values().map(|c| c.records).sum()
    }

    /// Total objects over all splits.
    pub fn objects(&self) -> usize {
        self.splits.values().map(|c| c.objects).sum()
    }

    pub fn warning_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == LoadSeverity::Warning)
            .count()
    }

    pub fn info_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == LoadSeverity::Info)
            .count()
    }

    /// Issues carrying the given code.
    pub fn issues_with(&self, code: LoadIssueCode) -> impl Iterator<Item = &LoadIssue> {
        self.issues.iter().filter(move |i| i.code == code)
    }
}

impl fmt::Display for LoadReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "  {} records, {} objects",
            self.records(),
            self.objects()
        )?;
        for (split, counts) in &self.splits {
            writeln!(
                f,
                "    {split}: {} records, {} objects",
                counts.records, counts.objects
            )?;
        }

        let warnings = self.warning_count();
        if warnings > 0 {
            writeln!(f)?;
            writeln!(f, "Warnings ({warnings}):")?;
            for issue in self
                .issues
                .iter()
                .filter(|i| i.severity == LoadSeverity::Warning)
            {
                writeln!(f, "  - {}", issue.message)?;
            }
        }

        let infos = self.info_count();
        if infos > 0 {
            writeln!(f)?;
            writeln!(f, "Notes ({infos}):")?;
            for issue in self
                .issues
                .iter()
                .filter(|i| i.severity == LoadSeverity::Info)
            {
                writeln!(f, "  - {}", issue.message)?;
            }
        }

        Ok(())
    }
}

/// Counts for one split.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct LoadCounts {
    pub records: usize,
    pub objects: usize,
    /// Rows dropped under [`RowErrorPolicy::Skip`](super::RowErrorPolicy::Skip).
    pub skipped_rows: usize,
}

#[derive(Clone, Debug, Serialize)]
pub struct LoadIssue {
    pub severity: LoadSeverity,
    pub code: LoadIssueCode,
    pub message: String,
}

impl LoadIssue {
    pub fn warning(code: LoadIssueCode, message: impl Into<String>) -> Self {
        Self {
            severity: LoadSeverity::Warning,
            code,
            message: message.into(),
        }
    }

    pub fn info(code: LoadIssueCode, message: impl Into<String>) -> Self {
        Self {
            severity: LoadSeverity::Info,
            code,
            message: message.into(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadSeverity {
    /// Data was altered or dropped.
    Warning,
    /// Nothing was lost; noted for completeness.
    Info,
}

/// Stable issue codes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadIssueCode {
    /// No folder alias of a requested split exists.
    MissingSplitFolder,
    /// An image had no annotation file; it was loaded without objects.
    MissingLabelFile,
    /// An enum token was outside its value list and became a sentinel.
    EnumOutOfRange,
    /// A class outside the allowlist was replaced by the first allowed class.
    ClassSubstituted,
    /// A row failed to decode and was dropped.
    SkippedRow,
    /// A whole record failed and was reported to the caller as an error.
    FailedRecord,
}
