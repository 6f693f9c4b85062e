use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde_json::json;
use uuid::Uuid;

use crate::audit::{AuditReport, SchemaMonitor, SourceAuditor};
use crate::auth::{generate_jwt, Claims};
use crate::config;
use crate::database::DatabaseManager;
use crate::middleware::TenantId;
use crate::services::IsolationService;

#[derive(Parser)]
#[command(name = "omnidesk")]
#[command(about = "OmniDesk CLI - isolation audits and tenant operations")]
#[command(version)]
pub struct Cli {
    #[arg(
        long,
        global = true,
        conflicts_with = "json",
        help = "Output in human-readable text format (default)"
    )]
    pub text: bool,

    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Run the full isolation audit (exits 1 if criticals are found)")]
    Audit,

    #[command(about = "Emergency-isolate a tenant by pinning the database search_path")]
    Isolate {
        #[arg(help = "Tenant UUID")]
        tenant_id: String,
    },

    #[command(about = "Mint a signed JWT for a tenant")]
    Token {
        #[arg(long, help = "Tenant UUID the token is scoped to")]
        tenant: String,

        #[arg(long, default_value = "agent", help = "Role claim")]
        role: String,

        #[arg(long, default_value = "cli", help = "User claim")]
        user: String,
    },
}

#[derive(Debug, Clone)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);

    match cli.command {
        Commands::Audit => run_audit(output_format).await,
        Commands::Isolate { tenant_id } => run_isolate(&tenant_id, output_format).await,
        Commands::Token { tenant, role, user } => mint_token(&tenant, role, user, output_format),
    }
}

async fn run_audit(output_format: OutputFormat) -> anyhow::Result<()> {
    let report = match DatabaseManager::platform_pool().await {
        Ok(pool) => SchemaMonitor::from_config(pool).audit_complete_system().await,
        Err(e) => {
            // Runtime and drift checks need a database; the source scan does not.
            eprintln!("Database unavailable ({}), running the static source audit only", e);
            let isolation = &config::config().isolation;
            let auditor = SourceAuditor::new(
                isolation.audit_source_roots.iter().map(PathBuf::from).collect(),
                isolation.audit_allowlist.clone(),
            );
            let violations = tokio::task::spawn_blocking(move || auditor.audit()).await?;
            AuditReport::from_violations(violations)
        }
    };

    match output_format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Text => print_report(&report),
    }

    if report.has_critical() {
        std::process::exit(1);
    }
    Ok(())
}

fn print_report(report: &AuditReport) {
    let counts = &report.summary.by_severity;
    println!(
        "Isolation audit: {} violations ({} critical, {} high, {} medium, {} low)",
        report.summary.total, counts.critical, counts.high, counts.medium, counts.low
    );

    for violation in &report.violations {
        println!();
        println!(
            "[{:>8}] {}/{} at {}",
            violation.severity, violation.source, violation.kind, violation.location
        );
        println!("           {}", violation.detail);
        println!("           fix: {}", violation.suggested_fix());
    }
}

async fn run_isolate(tenant_id: &str, output_format: OutputFormat) -> anyhow::Result<()> {
    let tenant = TenantId::parse(tenant_id).map_err(|_| {
        anyhow::anyhow!("'{}' is not a canonical lowercase UUIDv4", tenant_id)
    })?;

    let pool = DatabaseManager::platform_pool()
        .await
        .context("emergency isolation requires DATABASE_URL")?;
    IsolationService::new(pool).emergency_isolate(&tenant).await?;

    match output_format {
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string_pretty(&json!({
                "tenant_id": tenant.to_string(),
                "schema": tenant.schema_name(),
                "isolated": true
            }))?
        ),
        OutputFormat::Text => {
            println!("Emergency isolation applied for tenant {}", tenant);
            println!("Database search_path is pinned to {}", tenant.schema_name());
        }
    }

    Ok(())
}

fn mint_token(
    tenant: &str,
    role: String,
    user: String,
    output_format: OutputFormat,
) -> anyhow::Result<()> {
    let tenant = TenantId::parse(tenant).map_err(|_| {
        anyhow::anyhow!("'{}' is not a canonical lowercase UUIDv4", tenant)
    })?;

    let claims = Claims::new(tenant.to_string(), user.clone(), role.clone(), Uuid::new_v4());
    let token = generate_jwt(claims).context("JWT_SECRET must be configured")?;

    match output_format {
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string_pretty(&json!({
                "token": token,
                "tenant_id": tenant.to_string(),
                "role": role,
                "user": user
            }))?
        ),
        OutputFormat::Text => println!("{}", token),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_flags_conflict() {
        assert!(Cli::try_parse_from(["omnidesk", "--text", "--json", "audit"]).is_err());
        assert!(Cli::try_parse_from(["omnidesk", "--json", "--text", "audit"]).is_err());
    }

    #[test]
    fn output_format_defaults_to_text() {
        let cli = Cli::try_parse_from(["omnidesk", "audit"]).unwrap();
        assert!(matches!(OutputFormat::from_cli(&cli), OutputFormat::Text));

        let cli = Cli::try_parse_from(["omnidesk", "--text", "audit"]).unwrap();
        assert!(matches!(OutputFormat::from_cli(&cli), OutputFormat::Text));

        let cli = Cli::try_parse_from(["omnidesk", "--json", "audit"]).unwrap();
        assert!(matches!(OutputFormat::from_cli(&cli), OutputFormat::Json));
    }
}
