mod common;

use anyhow::Result;
use reqwest::StatusCode;

// Platform-admin surface: on-demand audits, monitoring status, emergency
// isolation. Admin tokens carry no tenant binding; the route prefix plus
// role is what lets them through the resolver.

#[tokio::test]
async fn audit_endpoint_returns_a_report() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{}/api/saas-admin/audit", server.base_url))
        .header("authorization", common::admin_bearer())
        .send()
        .await?;

    assert_eq!(res.status(), StatusCode::OK, "unexpected status: {}", res.status());

    let body = res.json::<serde_json::Value>().await?;
    assert!(body["success"].as_bool().unwrap_or(false), "success=false: {}", body);

    let report = &body["data"];
    assert!(report["violations"].is_array(), "missing violations: {}", body);
    assert!(report["summary"]["total"].is_u64(), "missing summary total: {}", body);
    assert!(
        report["suggested_fixes"].is_array(),
        "missing suggested fixes: {}",
        body
    );

    // Each violation carries the fields alert consumers rely on
    for violation in report["violations"].as_array().into_iter().flatten() {
        assert!(violation["severity"].is_string(), "bad violation: {}", violation);
        assert!(violation["location"].is_string(), "bad violation: {}", violation);
        assert!(violation["detail"].is_string(), "bad violation: {}", violation);
    }
    Ok(())
}

#[tokio::test]
async fn monitoring_status_reports_an_active_monitor() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let res = client
        .get(format!("{}/api/saas-admin/monitoring", server.base_url))
        .header("authorization", common::admin_bearer())
        .send()
        .await?;

    assert_eq!(res.status(), StatusCode::OK, "unexpected status: {}", res.status());

    let body = res.json::<serde_json::Value>().await?;
    assert!(body["success"].as_bool().unwrap_or(false), "success=false: {}", body);

    let status = &body["data"];
    assert_eq!(status["active"], serde_json::json!(true), "body: {}", body);
    assert!(status["violation_count"].is_u64(), "body: {}", body);
    assert!(status["uptime_seconds"].is_u64(), "body: {}", body);
    Ok(())
}

#[tokio::test]
async fn isolation_rejects_malformed_tenant_ids() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let res = client
        .post(format!(
            "{}/api/saas-admin/isolation/drop-schema-public",
            server.base_url
        ))
        .header("authorization", common::admin_bearer())
        .send()
        .await?;

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body = res.json::<serde_json::Value>().await?;
    assert_eq!(body["success"], serde_json::json!(false), "body: {}", body);
    assert_eq!(body["code"], "INVALID_TENANT_ID", "body: {}", body);
    Ok(())
}

#[tokio::test]
async fn isolation_without_a_database_fails_closed() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let res = client
        .post(format!(
            "{}/api/saas-admin/isolation/{}",
            server.base_url,
            common::TENANT_A
        ))
        .header("authorization", common::admin_bearer())
        .send()
        .await?;

    // Well-formed id, but the activity check cannot run; nothing is mutated
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = res.json::<serde_json::Value>().await?;
    assert_eq!(body["code"], "INTERNAL_SERVER_ERROR", "body: {}", body);
    Ok(())
}

#[tokio::test]
async fn admin_path_without_admin_role_gets_no_bypass() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    // The path matches the admin prefix but the role does not, so the
    // resolver falls through to normal enforcement and the missing tenant
    // binding rejects the request before any role check.
    let res = client
        .get(format!("{}/api/saas-admin/monitoring", server.base_url))
        .header("authorization", common::agent_bearer(""))
        .send()
        .await?;

    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body = res.json::<serde_json::Value>().await?;
    assert_eq!(body["code"], "MISSING_TENANT_CONTEXT", "body: {}", body);
    Ok(())
}

#[tokio::test]
async fn non_admin_roles_are_forbidden() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    for path in ["/api/saas-admin/audit", "/api/saas-admin/monitoring"] {
        let res = client
            .request(
                if path.ends_with("monitoring") {
                    reqwest::Method::GET
                } else {
                    reqwest::Method::POST
                },
                format!("{}{}", server.base_url, path),
            )
            .header("authorization", common::agent_bearer(common::TENANT_A))
            .send()
            .await?;

        assert_eq!(res.status(), StatusCode::FORBIDDEN, "path: {}", path);
        let body = res.json::<serde_json::Value>().await?;
        assert_eq!(body["code"], "FORBIDDEN", "body: {}", body);
    }
    Ok(())
}
