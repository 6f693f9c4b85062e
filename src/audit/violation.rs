//! Violation and report types shared by the three audit mechanisms.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

/// Which audit mechanism produced a finding.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationSource {
    Static,
    Runtime,
    Drift,
}

impl std::fmt::Display for ViolationSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            ViolationSource::Static => "static",
            ViolationSource::Runtime => "runtime",
            ViolationSource::Drift => "drift",
        };
        write!(f, "{}", label)
    }
}

/// Closed set of violation kinds. Keeping this an enum makes the severity
/// and fix-suggestion mappings exhaustive at compile time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    BareTableStatement,
    UnscopedDataAccess,
    SharedSchemaReference,
    MissingTenantValidation,
    SharedSchemaQuery,
    IncompleteSchema,
}

impl std::fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            ViolationKind::BareTableStatement => "bare_table_statement",
            ViolationKind::UnscopedDataAccess => "unscoped_data_access",
            ViolationKind::SharedSchemaReference => "shared_schema_reference",
            ViolationKind::MissingTenantValidation => "missing_tenant_validation",
            ViolationKind::SharedSchemaQuery => "shared_schema_query",
            ViolationKind::IncompleteSchema => "incomplete_schema",
        };
        write!(f, "{}", label)
    }
}

/// Alerting urgency. Ordering follows declaration order, so `Critical`
/// compares greatest.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn parse(value: &str) -> Option<Severity> {
        match value.to_ascii_lowercase().as_str() {
            "low" => Some(Severity::Low),
            "medium" => Some(Severity::Medium),
            "high" => Some(Severity::High),
            "critical" => Some(Severity::Critical),
            _ => None,
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        };
        write!(f, "{}", label)
    }
}

/// A single audit finding. Immutable once created; aggregated into
/// `AuditReport`s and emitted as log/alert records.
#[derive(Clone, Debug, Serialize)]
pub struct Violation {
    pub source: ViolationSource,
    pub kind: ViolationKind,
    pub severity: Severity,
    pub location: String,
    pub detail: String,
    pub timestamp: DateTime<Utc>,
}

impl Violation {
    pub fn new(
        source: ViolationSource,
        kind: ViolationKind,
        severity: Severity,
        location: impl Into<String>,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            source,
            kind,
            severity,
            location: location.into(),
            detail: detail.into(),
            timestamp: Utc::now(),
        }
    }

    /// Human-readable remediation hint for this finding.
    pub fn suggested_fix(&self) -> String {
        match self.kind {
            ViolationKind::BareTableStatement => format!(
                "Qualify '{}' with the tenant schema instead of relying on search_path ({})",
                self.detail, self.location
            ),
            ViolationKind::UnscopedDataAccess => format!(
                "Add tenant scoping to the data access at {}",
                self.location
            ),
            ViolationKind::SharedSchemaReference => format!(
                "Replace the shared-schema reference at {} with a tenant-aware query",
                self.location
            ),
            ViolationKind::MissingTenantValidation => format!(
                "Thread tenant context through {} before it touches data",
                self.location
            ),
            ViolationKind::SharedSchemaQuery => format!(
                "Rewrite '{}' to target the tenant schema",
                self.location
            ),
            ViolationKind::IncompleteSchema => format!(
                "Re-run provisioning migrations for schema '{}' ({})",
                self.location, self.detail
            ),
        }
    }
}

/// Violation totals per severity level.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SeverityCounts {
    pub low: usize,
    pub medium: usize,
    pub high: usize,
    pub critical: usize,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct AuditSummary {
    pub total: usize,
    pub by_severity: SeverityCounts,
    pub by_kind: BTreeMap<ViolationKind, usize>,
}

/// Result of one audit run. Produced fresh each time and immutable once
/// returned; violations are ordered most severe first.
#[derive(Clone, Debug, Serialize)]
pub struct AuditReport {
    pub violations: Vec<Violation>,
    pub summary: AuditSummary,
    pub suggested_fixes: Vec<String>,
}

impl AuditReport {
    pub fn from_violations(mut violations: Vec<Violation>) -> Self {
        violations.sort_by(|a, b| b.severity.cmp(&a.severity));
        let summary = summarize(&violations);
        let suggested_fixes = violations.iter().map(Violation::suggested_fix).collect();
        Self {
            violations,
            summary,
            suggested_fixes,
        }
    }

    pub fn has_critical(&self) -> bool {
        self.summary.by_severity.critical > 0
    }
}

fn summarize(violations: &[Violation]) -> AuditSummary {
    let mut by_severity = SeverityCounts::default();
    let mut by_kind = BTreeMap::new();

    for violation in violations {
        match violation.severity {
            Severity::Low => by_severity.low += 1,
            Severity::Medium => by_severity.medium += 1,
            Severity::High => by_severity.high += 1,
            Severity::Critical => by_severity.critical += 1,
        }
        *by_kind.entry(violation.kind).or_insert(0) += 1;
    }

    AuditSummary {
        total: violations.len(),
        by_severity,
        by_kind,
    }
}
