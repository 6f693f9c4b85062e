//! Static source auditor.
//!
//! Scans the configured source roots line by line for SQL that bypasses
//! per-tenant schemas. Regex heuristics rather than a SQL parser: the scan
//! is read-only, tolerates unreadable files, and produces the same summary
//! every run over an unchanged tree. What a text scan cannot see, the
//! runtime query monitor picks up.

use std::fs;
use std::path::{Path, PathBuf};

use regex::Regex;

use super::violation::{Severity, Violation, ViolationKind, ViolationSource};

/// File extensions the scanner treats as source code.
const SOURCE_EXTENSIONS: [&str; 4] = ["rs", "ts", "js", "sql"];

/// Lines on either side of a data-access call searched for tenant-scoping
/// evidence before the call is flagged.
const EVIDENCE_WINDOW: usize = 2;

/// Compiled pattern battery for a single auditor instance.
#[derive(Debug, Clone)]
struct SourcePatterns {
    delete_bare: Regex,
    update_bare: Regex,
    insert_bare: Regex,
    select_bare: Regex,
    shared_ref: Regex,
    data_access: Regex,
    tenant_evidence: Regex,
}

impl SourcePatterns {
    fn new() -> Self {
        Self {
            // The optional trailing dot distinguishes `FROM users` from the
            // schema-qualified `FROM tenant_x.users`.
            delete_bare: Regex::new(r"(?i)\bDELETE\s+FROM\s+([a-z_][a-z0-9_]*)(\.)?").unwrap(),
            update_bare: Regex::new(r"(?i)\bUPDATE\s+([a-z_][a-z0-9_]*)(\.)?\s+SET\b").unwrap(),
            insert_bare: Regex::new(r"(?i)\bINSERT\s+INTO\s+([a-z_][a-z0-9_]*)(\.)?").unwrap(),
            select_bare: Regex::new(r"(?i)\bSELECT\s+.+\s+FROM\s+([a-z_][a-z0-9_]*)(\.)?").unwrap(),
            shared_ref: Regex::new(r"(?i)\bpublic\.").unwrap(),
            data_access: Regex::new(
                r"\.select\(|\.insert\(|\.update\(|\.delete\(|sqlx::query|\.execute\(|\.query\(",
            )
            .unwrap(),
            tenant_evidence: Regex::new(r"(?i)tenant").unwrap(),
        }
    }
}

/// Scans source trees for statements and calls that sidestep tenant schemas.
#[derive(Debug, Clone)]
pub struct SourceAuditor {
    roots: Vec<PathBuf>,
    allowlist: Vec<String>,
    patterns: SourcePatterns,
}

impl SourceAuditor {
    /// `allowlist` entries are path fragments; any file whose path contains
    /// one is exempt from scanning (migrations, the enforcement layer
    /// itself, and so on).
    pub fn new(roots: Vec<PathBuf>, allowlist: Vec<String>) -> Self {
        Self {
            roots,
            allowlist,
            patterns: SourcePatterns::new(),
        }
    }

    /// Walk every configured root and collect violations across all
    /// readable source files. Unreadable files are logged and skipped.
    pub fn audit(&self) -> Vec<Violation> {
        let files = self.collect_files();
        tracing::debug!("Static audit scanning {} source files", files.len());

        let mut violations = Vec::new();
        for path in &files {
            let text = match fs::read_to_string(path) {
                Ok(text) => text,
                Err(e) => {
                    tracing::warn!("Skipping unreadable source file {}: {}", path.display(), e);
                    continue;
                }
            };
            self.audit_text(&path.to_string_lossy(), &text, &mut violations);
        }
        violations
    }

    /// Run the pattern battery over one file's text. At most one violation
    /// per line, worst pattern first; plus one file-level finding when data
    /// access appears in a file that never mentions tenants at all.
    pub(crate) fn audit_text(&self, name: &str, text: &str, out: &mut Vec<Violation>) {
        let lines: Vec<&str> = text.lines().collect();
        let mut saw_data_access = false;

        for (idx, line) in lines.iter().enumerate() {
            let location = format!("{}:{}", name, idx + 1);
            let is_access = self.patterns.data_access.is_match(line);
            saw_data_access |= is_access;

            if self.patterns.shared_ref.is_match(line) {
                out.push(Violation::new(
                    ViolationSource::Static,
                    ViolationKind::SharedSchemaReference,
                    statement_severity(line),
                    location,
                    excerpt(line),
                ));
                continue;
            }

            if let Some((table, severity)) = self.bare_table(line) {
                out.push(Violation::new(
                    ViolationSource::Static,
                    ViolationKind::BareTableStatement,
                    severity,
                    location,
                    table,
                ));
                continue;
            }

            if is_access && !self.evidence_nearby(&lines, idx) {
                out.push(Violation::new(
                    ViolationSource::Static,
                    ViolationKind::UnscopedDataAccess,
                    call_severity(line),
                    location,
                    excerpt(line),
                ));
            }
        }

        if saw_data_access && !self.patterns.tenant_evidence.is_match(text) {
            out.push(Violation::new(
                ViolationSource::Static,
                ViolationKind::MissingTenantValidation,
                Severity::High,
                name,
                "data access with no tenant handling anywhere in the file",
            ));
        }
    }

    /// First bare (schema-unqualified) table reference on the line, checked
    /// in order of how much damage the statement can do.
    fn bare_table(&self, line: &str) -> Option<(String, Severity)> {
        let battery = [
            (&self.patterns.delete_bare, Severity::Critical),
            (&self.patterns.update_bare, Severity::Critical),
            (&self.patterns.insert_bare, Severity::High),
            (&self.patterns.select_bare, Severity::Medium),
        ];
        for (pattern, severity) in battery {
            for caps in pattern.captures_iter(line) {
                if caps.get(2).is_some() {
                    // Schema-qualified; keep looking for a bare reference.
                    continue;
                }
                if let Some(table) = caps.get(1) {
                    return Some((table.as_str().to_string(), severity));
                }
            }
        }
        None
    }

    fn evidence_nearby(&self, lines: &[&str], idx: usize) -> bool {
        let start = idx.saturating_sub(EVIDENCE_WINDOW);
        let end = (idx + EVIDENCE_WINDOW).min(lines.len() - 1);
        lines[start..=end]
            .iter()
            .any(|line| self.patterns.tenant_evidence.is_match(line))
    }

    /// Scan targets in deterministic order: recursive walk of each root,
    /// extension filter, allowlist filter, then sort and dedup.
    fn collect_files(&self) -> Vec<PathBuf> {
        let mut files = Vec::new();
        for root in &self.roots {
            collect_into(root, &mut files);
        }
        files.retain(|path| !self.is_allowlisted(path));
        files.sort();
        files.dedup();
        files
    }

    fn is_allowlisted(&self, path: &Path) -> bool {
        let text = path.to_string_lossy();
        self.allowlist
            .iter()
            .any(|fragment| text.contains(fragment.as_str()))
    }
}

fn collect_into(path: &Path, files: &mut Vec<PathBuf>) {
    let entries = match fs::read_dir(path) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::debug!("Skipping unreadable directory {}: {}", path.display(), e);
            return;
        }
    };
    for entry in entries.flatten() {
        let entry_path = entry.path();
        if entry_path.is_dir() {
            collect_into(&entry_path, files);
        } else if has_source_extension(&entry_path) {
            files.push(entry_path);
        }
    }
}

fn has_source_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map_or(false, |ext| SOURCE_EXTENSIONS.contains(&ext))
}

/// Severity of a `public.` reference, judged by the worst SQL verb sharing
/// the line. A reference outside any recognizable statement stays low.
fn statement_severity(line: &str) -> Severity {
    let lower = line.to_lowercase();
    if lower.contains("delete") || lower.contains("update") {
        Severity::Critical
    } else if lower.contains("insert") {
        Severity::High
    } else if lower.contains("select") || lower.contains("from") {
        Severity::Medium
    } else {
        Severity::Low
    }
}

/// Severity of an unscoped data-access invocation. Calls that do not reveal
/// their verb (`.execute(`, `.query(`, `sqlx::query`) stay low.
fn call_severity(line: &str) -> Severity {
    if line.contains(".delete(") || line.contains(".update(") {
        Severity::Critical
    } else if line.contains(".insert(") {
        Severity::High
    } else if line.contains(".select(") {
        Severity::Medium
    } else {
        Severity::Low
    }
}

fn excerpt(line: &str) -> String {
    let trimmed = line.trim();
    if trimmed.len() <= 120 {
        return trimmed.to_string();
    }
    let mut cut = 120;
    while !trimmed.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}...", &trimmed[..cut])
}

#[cfg(test)]
mod tests {
    use super::super::violation::AuditReport;
    use super::*;

    fn auditor() -> SourceAuditor {
        SourceAuditor::new(Vec::new(), Vec::new())
    }

    fn scan(text: &str) -> Vec<Violation> {
        let mut out = Vec::new();
        auditor().audit_text("app/src/queries.rs", text, &mut out);
        out
    }

    fn temp_tree(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "omnidesk-audit-{}-{}",
            tag,
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(dir.join("db")).unwrap();
        dir
    }

    #[test]
    fn bare_statements_ranked_by_verb() {
        let text = "DELETE FROM customers WHERE id = $1\n\
                    UPDATE tickets SET status = 'closed'\n\
                    INSERT INTO notifications (body) VALUES ($1)\n\
                    SELECT id FROM parts\n";
        let found = scan(text);
        assert_eq!(found.len(), 4);
        assert!(found
            .iter()
            .all(|v| v.kind == ViolationKind::BareTableStatement));
        assert_eq!(found[0].severity, Severity::Critical);
        assert_eq!(found[0].detail, "customers");
        assert_eq!(found[1].severity, Severity::Critical);
        assert_eq!(found[1].detail, "tickets");
        assert_eq!(found[2].severity, Severity::High);
        assert_eq!(found[2].detail, "notifications");
        assert_eq!(found[3].severity, Severity::Medium);
        assert_eq!(found[3].detail, "parts");
        assert_eq!(found[0].location, "app/src/queries.rs:1");
    }

    #[test]
    fn schema_qualified_statements_pass() {
        let text = "SELECT id FROM tenant_abc.customers\n\
                    DELETE FROM tenant_abc.sessions WHERE expired\n\
                    INSERT INTO tenant_abc.notes (body) VALUES ($1)\n\
                    UPDATE tenant_abc.tickets SET status = 'open'\n";
        assert!(scan(text).is_empty());
    }

    #[test]
    fn shared_schema_reference_severity_tracks_statement() {
        let critical = scan("DELETE FROM public.customers WHERE id = $1\n");
        assert_eq!(critical.len(), 1);
        assert_eq!(critical[0].kind, ViolationKind::SharedSchemaReference);
        assert_eq!(critical[0].severity, Severity::Critical);

        let medium = scan("SELECT id FROM public.customers\n");
        assert_eq!(medium.len(), 1);
        assert_eq!(medium[0].severity, Severity::Medium);

        let low = scan("let prefix = \"public.\";\n");
        assert_eq!(low.len(), 1);
        assert_eq!(low[0].severity, Severity::Low);
    }

    #[test]
    fn unscoped_access_flags_line_and_file() {
        let text = "let rows = sqlx::query(\"SELECT 1\").fetch_all(pool).await?;\n\
                    client.execute(statement).await?;\n";
        let found = scan(text);
        assert_eq!(found.len(), 3);
        assert_eq!(found[0].kind, ViolationKind::UnscopedDataAccess);
        assert_eq!(found[0].severity, Severity::Low);
        assert_eq!(found[1].kind, ViolationKind::UnscopedDataAccess);
        assert_eq!(found[2].kind, ViolationKind::MissingTenantValidation);
        assert_eq!(found[2].severity, Severity::High);
        assert_eq!(found[2].location, "app/src/queries.rs");
    }

    #[test]
    fn tenant_evidence_nearby_suppresses_call_findings() {
        let text = "let schema = ctx.tenant_schema();\n\
                    let rows = sqlx::query(&sql).fetch_all(pool).await?;\n";
        assert!(scan(text).is_empty());
    }

    #[test]
    fn orm_verbs_set_call_severity() {
        let text = "builder.delete().execute(conn)?;\n";
        let found = scan(text);
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].kind, ViolationKind::UnscopedDataAccess);
        assert_eq!(found[0].severity, Severity::Critical);
        assert_eq!(found[1].kind, ViolationKind::MissingTenantValidation);
    }

    #[test]
    fn repeated_runs_over_an_unchanged_tree_agree() {
        let dir = temp_tree("stable");
        fs::write(dir.join("db/queries.sql"), "DELETE FROM customers;\n").unwrap();
        fs::write(dir.join("db/report.sql"), "SELECT id FROM public.tickets;\n").unwrap();

        let auditor = SourceAuditor::new(vec![dir.clone()], Vec::new());
        let first = AuditReport::from_violations(auditor.audit());
        let second = AuditReport::from_violations(auditor.audit());

        assert_eq!(first.summary, second.summary);
        assert_eq!(first.violations.len(), 2);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn unreadable_files_are_skipped_not_fatal() {
        let dir = temp_tree("unreadable");
        fs::write(dir.join("db/good.sql"), "DELETE FROM customers;\n").unwrap();
        fs::write(dir.join("db/bad.sql"), [0xff_u8, 0xfe, 0x00, 0x41]).unwrap();

        let auditor = SourceAuditor::new(vec![dir.clone()], Vec::new());
        let found = auditor.audit();

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].detail, "customers");
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn own_source_tree_scans_clean_under_the_default_allowlist() {
        // The platform's own shared-schema queries (tenant directory lookup,
        // pool health ping) and extension-map inserts live in allowlisted
        // paths; an audit of this crate must not flag its own plumbing.
        let isolation = &crate::config::config().isolation;
        let auditor = SourceAuditor::new(
            isolation
                .audit_source_roots
                .iter()
                .map(PathBuf::from)
                .collect(),
            isolation.audit_allowlist.clone(),
        );
        let found = auditor.audit();
        assert!(found.is_empty(), "self-scan flagged: {:#?}", found);
    }

    #[test]
    fn allowlisted_paths_and_foreign_extensions_are_not_scanned() {
        let dir = temp_tree("allowlist");
        fs::create_dir_all(dir.join("migrations")).unwrap();
        fs::write(dir.join("migrations/0001_init.sql"), "DELETE FROM customers;\n").unwrap();
        fs::write(dir.join("db/notes.txt"), "DELETE FROM customers\n").unwrap();
        fs::write(dir.join("db/live.sql"), "DELETE FROM customers;\n").unwrap();

        let auditor = SourceAuditor::new(vec![dir.clone()], vec!["migrations".to_string()]);
        let found = auditor.audit();

        assert_eq!(found.len(), 1);
        assert!(found[0].location.contains("live.sql"));
        let _ = fs::remove_dir_all(&dir);
    }
}
