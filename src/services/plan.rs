//! FREE/PRO limits. Everything here is arithmetic over counts the caller has
//! already queried, so the rules can be exercised without a database.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::config::PlanConfig;
use crate::error::ApiError;
use crate::types::Plan;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PlanViolation {
    #[error("Free plan allows only 1 domain.")]
    ProjectLimit,

    #[error("Free plan allows 1 audit per week.")]
    WeeklyAuditLimit,

    #[error("Please wait a minute before starting another audit.")]
    Cooldown { retry_after_secs: i64 },

    #[error("Too many audits in progress. Please wait for one to finish.")]
    ConcurrencyLimit,
}

impl From<PlanViolation> for ApiError {
    fn from(err: PlanViolation) -> Self {
        match err {
            PlanViolation::ProjectLimit | PlanViolation::WeeklyAuditLimit => ApiError::forbidden(err.to_string()),
            PlanViolation::Cooldown { .. } | PlanViolation::ConcurrencyLimit => {
                ApiError::too_many_requests(err.to_string())
            }
        }
    }
}

/// Plan limits resolved for one user
#[derive(Debug, Clone, Copy)]
pub struct PlanLimits<'a> {
    config: &'a PlanConfig,
    plan: Plan,
}

impl<'a> PlanLimits<'a> {
    pub fn new(config: &'a PlanConfig, is_pro: bool) -> Self {
        Self {
            config,
            plan: Plan::for_user(is_pro),
        }
    }

    pub fn plan(&self) -> Plan {
        self.plan
    }

    pub fn pages_per_crawl(&self) -> i32 {
        match self.plan {
            Plan::Pro => self.config.pro_pages_per_crawl,
            Plan::Free => self.config.free_pages_per_crawl,
        }
    }

    /// Re-using a domain the user already owns is not a new project
    pub fn check_new_project(&self, project_count: i64, domain_already_owned: bool) -> Result<(), PlanViolation> {
        if self.plan == Plan::Free && !domain_already_owned && project_count >= self.config.free_max_projects {
            return Err(PlanViolation::ProjectLimit);
        }
        Ok(())
    }

    pub fn check_weekly_audits(&self, audits_last_week: i64) -> Result<(), PlanViolation> {
        if self.plan == Plan::Free && audits_last_week >= self.config.free_audits_per_week {
            return Err(PlanViolation::WeeklyAuditLimit);
        }
        Ok(())
    }

    pub fn check_cooldown(&self, last_audit_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Result<(), PlanViolation> {
        let Some(last) = last_audit_at else {
            return Ok(());
        };
        let elapsed = (now - last).num_seconds();
        let cooldown = self.config.audit_cooldown_secs;
        if elapsed < cooldown {
            return Err(PlanViolation::Cooldown {
                retry_after_secs: cooldown - elapsed.max(0),
            });
        }
        Ok(())
    }

    pub fn max_active_audits(&self) -> i64 {
        match self.plan {
            Plan::Pro => self.config.pro_max_active_audits,
            Plan::Free => self.config.free_max_active_audits,
        }
    }

    pub fn check_concurrency(&self, active_audits: i64) -> Result<(), PlanViolation> {
        if active_audits >= self.max_active_audits() {
            return Err(PlanViolation::ConcurrencyLimit);
        }
        Ok(())
    }
}

/// Start of the rolling window used by the weekly audit limit
pub fn week_ago(now: DateTime<Utc>) -> DateTime<Utc> {
    now - Duration::days(7)
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanSummary {
    pub plan: Plan,
    pub features: Vec<String>,
}

/// Feature lines shown on the dashboard and plans page
pub fn plan_summary(config: &PlanConfig, plan: Plan) -> PlanSummary {
    let features = match plan {
        Plan::Pro => vec![
            "Unlimited domains".to_string(),
            "Unlimited audits".to_string(),
            format!("{}+ pages per crawl", config.pro_pages_per_crawl),
        ],
        Plan::Free => vec![
            format!("{} domain", config.free_max_projects),
            format!("{} audit per week", config.free_audits_per_week),
            format!("{} pages per crawl", config.free_pages_per_crawl),
        ],
    };
    PlanSummary { plan, features }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> PlanConfig {
        PlanConfig {
            free_max_projects: 1,
            free_audits_per_week: 1,
            free_pages_per_crawl: 10,
            pro_pages_per_crawl: 100,
            free_max_active_audits: 1,
            pro_max_active_audits: 3,
            audit_cooldown_secs: 60,
        }
    }

    #[test]
    fn free_plan_allows_a_single_domain() {
        let config = config();
        let free = PlanLimits::new(&config, false);
        assert!(free.check_new_project(0, false).is_ok());
        assert_eq!(free.check_new_project(1, false), Err(PlanViolation::ProjectLimit));
        // Same domain again is an update, not a second project
        assert!(free.check_new_project(1, true).is_ok());

        let pro = PlanLimits::new(&config, true);
        assert!(pro.check_new_project(25, false).is_ok());
    }

    #[test]
    fn free_plan_allows_one_audit_per_week() {
        let config = config();
        assert!(PlanLimits::new(&config, false).check_weekly_audits(0).is_ok());
        assert_eq!(
            PlanLimits::new(&config, false).check_weekly_audits(1),
            Err(PlanViolation::WeeklyAuditLimit)
        );
        assert!(PlanLimits::new(&config, true).check_weekly_audits(40).is_ok());
    }

    #[test]
    fn cooldown_applies_to_every_plan() {
        let config = config();
        let now = Utc::now();
        let pro = PlanLimits::new(&config, true);
        assert!(pro.check_cooldown(None, now).is_ok());
        assert_eq!(
            pro.check_cooldown(Some(now - Duration::seconds(45)), now),
            Err(PlanViolation::Cooldown { retry_after_secs: 15 })
        );
        assert!(pro.check_cooldown(Some(now - Duration::seconds(60)), now).is_ok());
    }

    #[test]
    fn concurrency_cap_depends_on_plan() {
        let config = config();
        assert_eq!(
            PlanLimits::new(&config, false).check_concurrency(1),
            Err(PlanViolation::ConcurrencyLimit)
        );
        assert!(PlanLimits::new(&config, true).check_concurrency(2).is_ok());
        assert!(PlanLimits::new(&config, true).check_concurrency(3).is_err());
    }

    #[test]
    fn page_limits_and_statuses() {
        let config = config();
        assert_eq!(PlanLimits::new(&config, false).pages_per_crawl(), 10);
        assert_eq!(PlanLimits::new(&config, true).pages_per_crawl(), 100);

        let forbidden: ApiError = PlanViolation::WeeklyAuditLimit.into();
        assert_eq!(forbidden.status_code(), 403);
        let throttled: ApiError = PlanViolation::Cooldown { retry_after_secs: 5 }.into();
        assert_eq!(throttled.status_code(), 429);
    }

    #[test]
    fn summaries_match_published_plans() {
        let config = config();
        assert_eq!(
            plan_summary(&config, Plan::Free).features,
            vec!["1 domain", "1 audit per week", "10 pages per crawl"]
        );
        assert_eq!(
            plan_summary(&config, Plan::Pro).features,
            vec!["Unlimited domains", "Unlimited audits", "100+ pages per crawl"]
        );
    }
}
