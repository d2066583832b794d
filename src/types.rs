//! Shared types used across the codebase
//!
//! Each enum mirrors a PostgreSQL enum type from the initial migration and
//! travels over the wire in the same SCREAMING_SNAKE_CASE spelling.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "role", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    #[default]
    User,
    SuperAdmin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserStatus {
    Active,
    Disabled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "plan", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Plan {
    Free,
    Pro,
}

impl Plan {
    pub fn for_user(is_pro: bool) -> Self {
        if is_pro {
            Plan::Pro
        } else {
            Plan::Free
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "audit_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl AuditStatus {
    /// Pending and running audits count against the concurrency cap.
    pub fn is_active(self) -> bool {
        matches!(self, AuditStatus::Pending | AuditStatus::Running)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "verification_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerificationStatus {
    Pending,
    Verified,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "issue_category", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssueCategory {
    Technical,
    OnPage,
    OffPage,
    Performance,
}

impl IssueCategory {
    /// Parses the URL slug used by the issue views (`on-page`, `technical`, ...).
    pub fn from_slug(slug: &str) -> Option<Self> {
        match slug.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "technical" => Some(IssueCategory::Technical),
            "on-page" | "onpage" => Some(IssueCategory::OnPage),
            "off-page" | "offpage" => Some(IssueCategory::OffPage),
            "performance" => Some(IssueCategory::Performance),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            IssueCategory::Technical => "Technical",
            IssueCategory::OnPage => "On-Page",
            IssueCategory::OffPage => "Off-Page",
            IssueCategory::Performance => "Performance",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "issue_severity", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Info,
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Numeric rank, CRITICAL = 5 down to INFO = 1.
    pub fn rank(self) -> u8 {
        match self {
            Severity::Critical => 5,
            Severity::High => 4,
            Severity::Medium => 3,
            Severity::Low => 2,
            Severity::Info => 1,
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "CRITICAL" => Some(Severity::Critical),
            "HIGH" => Some(Severity::High),
            "MEDIUM" => Some(Severity::Medium),
            "LOW" => Some(Severity::Low),
            "INFO" => Some(Severity::Info),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "report_type", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReportType {
    Pdf,
    Docx,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "report_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReportStatus {
    Pending,
    Ready,
    Failed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_rank_orders_critical_first() {
        let mut all = vec![Severity::Low, Severity::Critical, Severity::Info, Severity::High, Severity::Medium];
        all.sort_by_key(|s| std::cmp::Reverse(s.rank()));
        assert_eq!(
            all,
            vec![Severity::Critical, Severity::High, Severity::Medium, Severity::Low, Severity::Info]
        );
    }

    #[test]
    fn enums_use_screaming_snake_case_on_the_wire() {
        assert_eq!(serde_json::to_value(Role::SuperAdmin).unwrap(), "SUPER_ADMIN");
        assert_eq!(serde_json::to_value(IssueCategory::OnPage).unwrap(), "ON_PAGE");
        let status: UserStatus = serde_json::from_str("\"DISABLED\"").unwrap();
        assert_eq!(status, UserStatus::Disabled);
    }

    #[test]
    fn category_slugs() {
        assert_eq!(IssueCategory::from_slug("on-page"), Some(IssueCategory::OnPage));
        assert_eq!(IssueCategory::from_slug("OFF_PAGE"), Some(IssueCategory::OffPage));
        assert_eq!(IssueCategory::from_slug("links"), None);
    }

    #[test]
    fn plan_follows_pro_flag() {
        assert_eq!(Plan::for_user(true), Plan::Pro);
        assert_eq!(Plan::for_user(false), Plan::Free);
    }
}
