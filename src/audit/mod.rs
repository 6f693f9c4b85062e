//! Tenant isolation auditing: the violation model, the three detectors,
//! and the monitoring service that runs them on a schedule.

pub mod monitor;
pub mod query_monitor;
pub mod schema_drift;
pub mod source_auditor;
pub mod violation;

pub use monitor::{MonitoringStatus, SchemaMonitor};
pub use query_monitor::QueryStatsMonitor;
pub use schema_drift::SchemaDriftDetector;
pub use source_auditor::SourceAuditor;
pub use violation::{
    AuditReport, AuditSummary, Severity, SeverityCounts, Violation, ViolationKind,
    ViolationSource,
};
