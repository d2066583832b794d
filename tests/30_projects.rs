mod common;

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::json;
use uuid::Uuid;

use cascade_seo::services::domain::{DomainProbe, ProbeError, ProbeMethod};
use cascade_seo::services::projects::ProjectPatch;
use cascade_seo::services::ProjectService;
use cascade_seo::types::VerificationStatus;
use common::TestContext;

fn domain() -> String {
    format!("site-{}.example.com", Uuid::new_v4().simple())
}

#[tokio::test]
async fn free_plan_allows_one_domain() -> Result<()> {
    let Some(mut ctx) = TestContext::new().await? else {
        return Ok(());
    };
    let user = ctx.create_user(false, "USER").await?;
    let first = domain();

    let res = ctx
        .client
        .post(ctx.url("/api/projects"))
        .bearer_auth(&user.token)
        .json(&json!({ "name": "Main site", "domain": format!("https://{}/landing", first.to_uppercase()) }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::CREATED);
    let created = common::data(res).await?;
    assert_eq!(created["projects"][0]["domain"], first);
    assert_eq!(created["projects"][0]["verificationStatus"], "PENDING");

    let res = ctx
        .client
        .post(ctx.url("/api/projects"))
        .bearer_auth(&user.token)
        .json(&json!({ "name": "Second site", "domain": domain() }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    assert_eq!(common::error_message(res).await?, "Free plan allows only 1 domain.");

    let res = ctx
        .client
        .post(ctx.url("/api/projects"))
        .bearer_auth(&user.token)
        .json(&json!({ "name": "Same site", "domain": first }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::CONFLICT);

    ctx.cleanup().await
}

#[tokio::test]
async fn free_plan_allows_one_audit_per_week() -> Result<()> {
    let Some(mut ctx) = TestContext::new().await? else {
        return Ok(());
    };
    let user = ctx.create_user(false, "USER").await?;
    let site = domain();

    let res = ctx
        .client
        .post(ctx.url("/api/audits"))
        .bearer_auth(&user.token)
        .json(&json!({ "name": "Main site", "domain": site }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::CREATED);
    let audit = common::data(res).await?;
    let audit_id = audit["id"].as_str().unwrap_or_default().to_string();

    let res = ctx
        .client
        .get(ctx.url(&format!("/api/audits/{}", audit_id)))
        .bearer_auth(&user.token)
        .send()
        .await?;
    let status = common::data(res).await?;
    assert_eq!(status["status"], "PENDING");
    assert_eq!(status["domain"], site);
    assert_eq!(status["canRetry"], false);

    let res = ctx
        .client
        .post(ctx.url("/api/audits"))
        .bearer_auth(&user.token)
        .json(&json!({ "name": "Main site", "domain": site }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    // Only failed audits go back in the queue
    let res = ctx
        .client
        .post(ctx.url(&format!("/api/audits/{}/retry", audit_id)))
        .bearer_auth(&user.token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    ctx.cleanup().await
}

#[tokio::test]
async fn other_users_cannot_see_or_delete_a_project() -> Result<()> {
    let Some(mut ctx) = TestContext::new().await? else {
        return Ok(());
    };
    let owner = ctx.create_user(true, "USER").await?;
    let stranger = ctx.create_user(true, "USER").await?;

    let res = ctx
        .client
        .post(ctx.url("/api/audits"))
        .bearer_auth(&owner.token)
        .json(&json!({ "name": "Owner site", "domain": domain() }))
        .send()
        .await?;
    let created = common::data(res).await?;
    let audit_id = created["id"].as_str().unwrap_or_default().to_string();
    let project_id = created["projectId"].as_str().unwrap_or_default().to_string();
    let audit_uuid = Uuid::parse_str(&audit_id)?;
    ctx.seed_issue(audit_uuid, "TECHNICAL").await?;
    ctx.seed_report(audit_uuid, owner.id, "https://files.test/report.pdf").await?;

    let res = ctx
        .client
        .get(ctx.url(&format!("/api/audits/{}", audit_id)))
        .bearer_auth(&stranger.token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = ctx
        .client
        .delete(ctx.url(&format!("/api/projects/{}", project_id)))
        .bearer_auth(&stranger.token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    // Deleting takes the audits and their findings with it
    let res = ctx
        .client
        .delete(ctx.url(&format!("/api/projects/{}", project_id)))
        .bearer_auth(&owner.token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);

    let res = ctx
        .client
        .get(ctx.url(&format!("/api/audits/{}", audit_id)))
        .bearer_auth(&owner.token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let projects = common::data(ctx.client.get(ctx.url("/api/projects")).bearer_auth(&owner.token).send().await?).await?;
    assert_eq!(projects["projects"].as_array().map(Vec::len), Some(0));
    for table in ["audits", "issues", "pages", "reports"] {
        assert_eq!(ctx.count_for_audit(table, audit_uuid).await?, 0, "{} left behind", table);
    }

    ctx.cleanup().await
}

#[tokio::test]
async fn patch_without_changes_is_rejected() -> Result<()> {
    let Some(mut ctx) = TestContext::new().await? else {
        return Ok(());
    };
    let user = ctx.create_user(false, "USER").await?;
    let site = domain();

    let created = common::data(
        ctx.client
            .post(ctx.url("/api/projects"))
            .bearer_auth(&user.token)
            .json(&json!({ "name": "Main site", "domain": site }))
            .send()
            .await?,
    )
    .await?;
    let project_id = created["projectId"].as_str().unwrap_or_default().to_string();

    let res = ctx
        .client
        .patch(ctx.url(&format!("/api/projects/{}", project_id)))
        .bearer_auth(&user.token)
        .json(&json!({ "name": "Main site" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = ctx
        .client
        .patch(ctx.url(&format!("/api/projects/{}", project_id)))
        .bearer_auth(&user.token)
        .json(&json!({ "name": "Renamed site" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);

    ctx.cleanup().await
}

#[tokio::test]
async fn dashboard_reports_usage_and_plan() -> Result<()> {
    let Some(mut ctx) = TestContext::new().await? else {
        return Ok(());
    };
    let user = ctx.create_user(false, "USER").await?;

    let res = ctx.client.get(ctx.url("/api/dashboard")).bearer_auth(&user.token).send().await?;
    assert_eq!(res.status(), StatusCode::OK);
    let dashboard = common::data(res).await?;
    assert_eq!(dashboard["counts"]["projects"], 0);
    assert_eq!(dashboard["plan"], "FREE");

    let plans = common::data(ctx.client.get(ctx.url("/api/plans")).bearer_auth(&user.token).send().await?).await?;
    assert_eq!(plans["currentPlan"], "FREE");

    ctx.cleanup().await
}

/// Every request fails to connect
struct OfflineProbe;

#[async_trait]
impl DomainProbe for OfflineProbe {
    async fn probe(&self, _method: ProbeMethod, _url: &str) -> Result<u16, ProbeError> {
        Err(ProbeError("connection refused".to_string()))
    }
}

#[tokio::test]
async fn failed_verification_clears_verified_at() -> Result<()> {
    let Some(mut ctx) = TestContext::new().await? else {
        return Ok(());
    };
    let user = ctx.create_user(false, "USER").await?;

    let created = common::data(
        ctx.client
            .post(ctx.url("/api/projects"))
            .bearer_auth(&user.token)
            .json(&json!({ "name": "Main site", "domain": domain() }))
            .send()
            .await?,
    )
    .await?;
    let project_id = Uuid::parse_str(created["projectId"].as_str().unwrap_or_default())?;

    sqlx::query("UPDATE projects SET verification_status = 'VERIFIED', verified_at = now() WHERE id = $1")
        .bind(project_id)
        .execute(&ctx.pool)
        .await?;

    let patch = ProjectPatch {
        verify: true,
        ..Default::default()
    };
    let project = ProjectService::new(ctx.pool.clone())
        .update(user.id, project_id, patch, &OfflineProbe, Duration::from_millis(500))
        .await?;
    assert_eq!(project.verification_status, VerificationStatus::Failed);
    assert!(project.verified_at.is_none());
    assert!(project.verification_error.is_some());

    ctx.cleanup().await
}

#[tokio::test]
async fn concurrent_audits_respect_the_weekly_limit() -> Result<()> {
    let Some(mut ctx) = TestContext::new().await? else {
        return Ok(());
    };
    let user = ctx.create_user(false, "USER").await?;
    let site = domain();

    let start = || {
        ctx.client
            .post(ctx.url("/api/audits"))
            .bearer_auth(&user.token)
            .json(&json!({ "name": "Main site", "domain": site }))
            .send()
    };
    let (first, second) = tokio::join!(start(), start());
    let mut statuses = vec![first?.status(), second?.status()];
    statuses.sort();
    assert_eq!(statuses, vec![StatusCode::CREATED, StatusCode::FORBIDDEN]);

    let audits = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM audits WHERE runner_id = $1")
        .bind(user.id)
        .fetch_one(&ctx.pool)
        .await?;
    assert_eq!(audits, 1);

    ctx.cleanup().await
}

#[tokio::test]
async fn issue_summary_and_latest_audit_are_per_user() -> Result<()> {
    let Some(mut ctx) = TestContext::new().await? else {
        return Ok(());
    };
    let user = ctx.create_user(true, "USER").await?;
    let other = ctx.create_user(true, "USER").await?;

    let latest = common::data(ctx.client.get(ctx.url("/api/overview/latest")).bearer_auth(&user.token).send().await?).await?;
    assert!(latest["auditId"].is_null());

    let created = common::data(
        ctx.client
            .post(ctx.url("/api/audits"))
            .bearer_auth(&user.token)
            .json(&json!({ "name": "Main site", "domain": domain() }))
            .send()
            .await?,
    )
    .await?;
    let audit_id = Uuid::parse_str(created["id"].as_str().unwrap_or_default())?;
    ctx.seed_issue(audit_id, "TECHNICAL").await?;
    ctx.seed_issue(audit_id, "TECHNICAL").await?;
    ctx.seed_issue(audit_id, "OFF_PAGE").await?;

    let totals = common::data(ctx.client.get(ctx.url("/api/issues/summary")).bearer_auth(&user.token).send().await?).await?;
    assert_eq!(totals, json!({ "technical": 2, "onPage": 0, "offPage": 1, "performance": 0 }));

    let latest = common::data(ctx.client.get(ctx.url("/api/overview/latest")).bearer_auth(&user.token).send().await?).await?;
    assert_eq!(latest["auditId"], audit_id.to_string());

    let totals = common::data(ctx.client.get(ctx.url("/api/issues/summary")).bearer_auth(&other.token).send().await?).await?;
    assert_eq!(totals["technical"], 0);
    let latest = common::data(ctx.client.get(ctx.url("/api/overview/latest")).bearer_auth(&other.token).send().await?).await?;
    assert!(latest["auditId"].is_null());

    ctx.cleanup().await
}

#[tokio::test]
async fn audit_overview_ignores_reports_of_other_users() -> Result<()> {
    let Some(mut ctx) = TestContext::new().await? else {
        return Ok(());
    };
    let owner = ctx.create_user(true, "USER").await?;
    let other = ctx.create_user(true, "USER").await?;

    let created = common::data(
        ctx.client
            .post(ctx.url("/api/audits"))
            .bearer_auth(&owner.token)
            .json(&json!({ "name": "Owner site", "domain": domain() }))
            .send()
            .await?,
    )
    .await?;
    let audit_id = Uuid::parse_str(created["id"].as_str().unwrap_or_default())?;
    ctx.seed_report(audit_id, other.id, "https://files.test/someone-else.pdf").await?;

    let url = ctx.url(&format!("/api/audits/{}/overview", audit_id));
    let overview = common::data(ctx.client.get(&url).bearer_auth(&owner.token).send().await?).await?;
    assert!(overview["reportUrl"].is_null());

    ctx.seed_report(audit_id, owner.id, "https://files.test/own.pdf").await?;
    let overview = common::data(ctx.client.get(&url).bearer_auth(&owner.token).send().await?).await?;
    assert_eq!(overview["reportUrl"], "https://files.test/own.pdf");

    ctx.cleanup().await
}
