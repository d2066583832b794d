//! Read-side shaping of audit findings: overview rankings, category grouping,
//! issue filters and score history. The worker writes the rows; this module only
//! arranges them for display.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use std::collections::HashMap;
use uuid::Uuid;

use crate::database::models::{Audit, Issue};
use crate::database::DatabaseError;
use crate::types::{AuditStatus, IssueCategory, Severity};

/// Cap on issues pulled for any single view
pub const ISSUE_SCAN_LIMIT: i64 = 500;
pub const TOP_GROUPS: usize = 10;
pub const PAGE_FILTER_LIMIT: usize = 50;
pub const HISTORY_LIMIT: i64 = 200;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RankedGroup {
    pub key: String,
    pub title: String,
    pub count: usize,
    pub severity: Severity,
}

/// Collapse issues by `key_of`, keep the worst severity per group, and return
/// the top groups ordered by severity then frequency.
pub fn rank_groups<F>(issues: &[Issue], key_of: F, limit: usize) -> Vec<RankedGroup>
where
    F: Fn(&Issue) -> String,
{
    let mut groups: Vec<RankedGroup> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for issue in issues {
        let key = key_of(issue);
        match index.get(&key) {
            Some(&i) => {
                let group = &mut groups[i];
                group.count += 1;
                if issue.severity.rank() > group.severity.rank() {
                    group.severity = issue.severity;
                }
            }
            None => {
                index.insert(key.clone(), groups.len());
                groups.push(RankedGroup {
                    key,
                    title: issue.title.clone(),
                    count: 1,
                    severity: issue.severity,
                });
            }
        }
    }

    // Stable sort keeps first-seen order among equals
    groups.sort_by(|a, b| {
        b.severity
            .rank()
            .cmp(&a.severity.rank())
            .then(b.count.cmp(&a.count))
    });
    groups.truncate(limit);
    groups
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

pub fn issue_key(issue: &Issue) -> String {
    non_empty(issue.rule_id.as_deref()).unwrap_or(&issue.title).to_string()
}

pub fn fix_key(issue: &Issue) -> String {
    non_empty(issue.fix.as_deref()).unwrap_or(&issue.title).to_string()
}

fn haystack(issue: &Issue) -> String {
    format!("{} {}", issue.title, issue.rule_id.as_deref().unwrap_or_default()).to_lowercase()
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}

/// Display group for a technical finding; first matching rule wins
pub fn technical_group(issue: &Issue) -> &'static str {
    let text = haystack(issue);
    if contains_any(&text, &["index", "noindex"]) {
        "Indexability"
    } else if text.contains("crawl") {
        "Crawlability"
    } else if text.contains("redirect") {
        "Redirects"
    } else if contains_any(&text, &["https", "ssl"]) {
        "HTTPS"
    } else if text.contains("robots") {
        "Robots"
    } else if text.contains("sitemap") {
        "Sitemaps"
    } else if contains_any(&text, &["broken", "404"]) {
        "Broken Links"
    } else {
        "Other Technical"
    }
}

/// Display group for an on-page finding; first matching rule wins
pub fn on_page_group(issue: &Issue) -> &'static str {
    let text = haystack(issue);
    if contains_any(&text, &["meta", "title", "description"]) {
        "Meta"
    } else if contains_any(&text, &["heading", "h1", "h2"]) {
        "Headings"
    } else if contains_any(&text, &["image", "alt"]) {
        "Images"
    } else if contains_any(&text, &["schema", "structured"]) {
        "Schema"
    } else {
        "Content"
    }
}

pub fn display_group(category: IssueCategory, issue: &Issue) -> &'static str {
    match category {
        IssueCategory::Technical => technical_group(issue),
        IssueCategory::OnPage => on_page_group(issue),
        other => other.label(),
    }
}

#[derive(Debug, Clone, Default)]
pub struct IssueFilters {
    pub severity: Option<Severity>,
    pub page_url: Option<String>,
    pub search: Option<String>,
}

impl IssueFilters {
    pub fn matches(&self, issue: &Issue) -> bool {
        if let Some(severity) = self.severity {
            if issue.severity != severity {
                return false;
            }
        }
        if let Some(page) = self.page_url.as_deref() {
            if issue.page_url.as_deref() != Some(page) {
                return false;
            }
        }
        if let Some(search) = self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            let needle = search.to_lowercase();
            let text = format!(
                "{} {} {}",
                issue.title,
                issue.description.as_deref().unwrap_or_default(),
                issue.fix.as_deref().unwrap_or_default()
            )
            .to_lowercase();
            if !text.contains(&needle) {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueGroup {
    pub name: &'static str,
    pub issues: Vec<Issue>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryIssues {
    pub category: IssueCategory,
    pub total: usize,
    pub pages: Vec<String>,
    pub groups: Vec<IssueGroup>,
}

/// Filter, then bucket into display groups in first-seen order.
/// `pages` lists distinct URLs from the unfiltered set for the page picker.
pub fn group_category_issues(category: IssueCategory, issues: Vec<Issue>, filters: &IssueFilters) -> CategoryIssues {
    let mut pages: Vec<String> = Vec::new();
    for url in issues.iter().filter_map(|i| i.page_url.as_ref()) {
        if pages.len() >= PAGE_FILTER_LIMIT {
            break;
        }
        if !pages.contains(url) {
            pages.push(url.clone());
        }
    }

    let mut groups: Vec<IssueGroup> = Vec::new();
    let mut total = 0;
    for issue in issues.into_iter().filter(|i| filters.matches(i)) {
        total += 1;
        let name = display_group(category, &issue);
        match groups.iter_mut().find(|g| g.name == name) {
            Some(group) => group.issues.push(issue),
            None => groups.push(IssueGroup { name, issues: vec![issue] }),
        }
    }

    CategoryIssues { category, total, pages, groups }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Scores {
    pub overall: Option<i32>,
    pub performance: Option<i32>,
    pub on_page: Option<i32>,
    pub technical: Option<i32>,
    pub off_page: Option<i32>,
}

impl From<&Audit> for Scores {
    fn from(audit: &Audit) -> Self {
        Self {
            overall: audit.score_overall,
            performance: audit.score_performance,
            on_page: audit.score_on_page,
            technical: audit.score_technical,
            off_page: audit.score_off_page,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditOverview {
    pub audit_id: Uuid,
    pub domain: String,
    pub status: AuditStatus,
    pub scores: Scores,
    pub top_issues: Vec<RankedGroup>,
    pub top_fixes: Vec<RankedGroup>,
    pub report_url: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OffPageSummary {
    pub indexed_pages: i64,
    pub off_page_issues: i64,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub id: Uuid,
    pub domain: String,
    pub status: AuditStatus,
    pub score_overall: Option<i32>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct HistoryFilters {
    pub domain: Option<String>,
    pub min_score: Option<i32>,
    pub max_score: Option<i32>,
}

impl HistoryFilters {
    /// Missing scores count as 0
    pub fn matches(&self, entry: &HistoryEntry) -> bool {
        let score = entry.score_overall.unwrap_or(0);
        if let Some(domain) = self.domain.as_deref().map(str::trim).filter(|d| !d.is_empty()) {
            if !entry.domain.to_lowercase().contains(&domain.to_lowercase()) {
                return false;
            }
        }
        if self.min_score.is_some_and(|min| score < min) {
            return false;
        }
        if self.max_score.is_some_and(|max| score > max) {
            return false;
        }
        true
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Comparison {
    pub first: HistoryEntry,
    pub second: HistoryEntry,
    pub score_change: i32,
}

pub fn compare(first: HistoryEntry, second: HistoryEntry) -> Comparison {
    let score_change = second.score_overall.unwrap_or(0) - first.score_overall.unwrap_or(0);
    Comparison { first, second, score_change }
}

const ISSUE_SELECT: &str = r#"
    SELECT i.*, p.url AS page_url
    FROM issues i
    LEFT JOIN pages p ON p.id = i.page_id
"#;

pub struct InsightService {
    pool: PgPool,
}

impl InsightService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Newest first, for the overview rankings
    pub async fn recent_issues(&self, audit_id: Uuid) -> Result<Vec<Issue>, DatabaseError> {
        let query = format!("{} WHERE i.audit_id = $1 ORDER BY i.created_at DESC LIMIT $2", ISSUE_SELECT);
        Ok(sqlx::query_as::<_, Issue>(&query)
            .bind(audit_id)
            .bind(ISSUE_SCAN_LIMIT)
            .fetch_all(&self.pool)
            .await?)
    }

    /// Most severe first, for the category views
    pub async fn category_issues(&self, audit_id: Uuid, category: IssueCategory) -> Result<Vec<Issue>, DatabaseError> {
        let query = format!(
            "{} WHERE i.audit_id = $1 AND i.category = $2 ORDER BY i.severity DESC, i.created_at DESC LIMIT $3",
            ISSUE_SELECT
        );
        Ok(sqlx::query_as::<_, Issue>(&query)
            .bind(audit_id)
            .bind(category)
            .bind(ISSUE_SCAN_LIMIT)
            .fetch_all(&self.pool)
            .await?)
    }

    pub async fn off_page_summary(&self, audit_id: Uuid) -> Result<OffPageSummary, DatabaseError> {
        let indexed_pages = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM pages WHERE audit_id = $1 AND indexable",
        )
        .bind(audit_id)
        .fetch_one(&self.pool)
        .await?;
        let off_page_issues = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM issues WHERE audit_id = $1 AND category = 'OFF_PAGE'",
        )
        .bind(audit_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(OffPageSummary { indexed_pages, off_page_issues })
    }

    pub async fn history(&self, runner_id: Uuid, filters: &HistoryFilters) -> Result<Vec<HistoryEntry>, DatabaseError> {
        let rows = sqlx::query_as::<_, HistoryEntry>(
            r#"
            SELECT a.id, p.domain, a.status, a.score_overall, a.created_at
            FROM audits a
            JOIN projects p ON p.id = a.project_id
            WHERE a.runner_id = $1
            ORDER BY a.created_at DESC
            LIMIT $2
            "#,
        )
        .bind(runner_id)
        .bind(HISTORY_LIMIT)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().filter(|r| filters.matches(r)).collect())
    }

    pub async fn history_entry(&self, runner_id: Uuid, audit_id: Uuid) -> Result<Option<HistoryEntry>, DatabaseError> {
        Ok(sqlx::query_as::<_, HistoryEntry>(
            r#"
            SELECT a.id, p.domain, a.status, a.score_overall, a.created_at
            FROM audits a
            JOIN projects p ON p.id = a.project_id
            WHERE a.runner_id = $1 AND a.id = $2
            "#,
        )
        .bind(runner_id)
        .bind(audit_id)
        .fetch_optional(&self.pool)
        .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issue(title: &str, rule: Option<&str>, severity: Severity) -> Issue {
        Issue {
            id: Uuid::new_v4(),
            audit_id: Uuid::nil(),
            page_id: None,
            page_url: None,
            category: IssueCategory::Technical,
            severity,
            rule_id: rule.map(str::to_string),
            title: title.to_string(),
            description: None,
            fix: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn ranks_by_worst_severity_then_count() {
        let issues = vec![
            issue("Missing alt", Some("img-alt"), Severity::Low),
            issue("Missing alt", Some("img-alt"), Severity::Low),
            issue("Missing alt", Some("img-alt"), Severity::Medium),
            issue("Broken link", Some("broken-link"), Severity::High),
            issue("Thin content", None, Severity::Medium),
        ];
        let ranked = rank_groups(&issues, issue_key, TOP_GROUPS);
        assert_eq!(ranked.len(), 3);
        assert_eq!(ranked[0].key, "broken-link");
        assert_eq!(ranked[1].key, "img-alt");
        assert_eq!(ranked[1].count, 3);
        assert_eq!(ranked[1].severity, Severity::Medium);
        // Falls back to the title when there is no rule id
        assert_eq!(ranked[2].key, "Thin content");
    }

    #[test]
    fn ranking_is_truncated() {
        let issues: Vec<Issue> = (0..15).map(|n| issue(&format!("Issue {n}"), None, Severity::Info)).collect();
        assert_eq!(rank_groups(&issues, issue_key, TOP_GROUPS).len(), 10);
    }

    #[test]
    fn fixes_group_by_fix_text() {
        let mut a = issue("Title too long", Some("title-len"), Severity::Low);
        a.fix = Some("Shorten the title".to_string());
        let mut b = issue("Title duplicated", Some("title-dup"), Severity::High);
        b.fix = Some("Shorten the title".to_string());
        let ranked = rank_groups(&[a, b], fix_key, TOP_GROUPS);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].count, 2);
        assert_eq!(ranked[0].severity, Severity::High);
    }

    #[test]
    fn technical_groups_follow_keyword_rules() {
        let cases = [
            ("Page is noindex", None, "Indexability"),
            ("Crawl depth too high", None, "Crawlability"),
            ("Redirect chain", None, "Redirects"),
            ("Mixed content", Some("https-mixed"), "HTTPS"),
            ("Blocked by robots.txt", None, "Robots"),
            ("Sitemap missing", None, "Sitemaps"),
            ("Link returns 404", None, "Broken Links"),
            ("Slow server", None, "Other Technical"),
        ];
        for (title, rule, expected) in cases {
            assert_eq!(technical_group(&issue(title, rule, Severity::Low)), expected, "{title}");
        }
    }

    #[test]
    fn on_page_groups_follow_keyword_rules() {
        let cases = [
            ("Missing meta description", "Meta"),
            ("Multiple H1 tags", "Headings"),
            ("Image without alt", "Images"),
            ("Invalid structured data", "Schema"),
            ("Low word count", "Content"),
        ];
        for (title, expected) in cases {
            assert_eq!(on_page_group(&issue(title, None, Severity::Low)), expected, "{title}");
        }
    }

    #[test]
    fn filters_and_groups_category_issues() {
        let mut a = issue("Redirect chain", None, Severity::High);
        a.page_url = Some("https://example.com/a".to_string());
        let mut b = issue("Sitemap missing", None, Severity::Low);
        b.page_url = Some("https://example.com/b".to_string());
        b.description = Some("No sitemap.xml found".to_string());
        let mut c = issue("Redirect loop", None, Severity::High);
        c.page_url = Some("https://example.com/a".to_string());

        let all = group_category_issues(IssueCategory::Technical, vec![a.clone(), b.clone(), c.clone()], &IssueFilters::default());
        assert_eq!(all.total, 3);
        assert_eq!(all.pages, vec!["https://example.com/a", "https://example.com/b"]);
        assert_eq!(all.groups.iter().map(|g| g.name).collect::<Vec<_>>(), vec!["Redirects", "Sitemaps"]);
        assert_eq!(all.groups[0].issues.len(), 2);

        let searched = group_category_issues(
            IssueCategory::Technical,
            vec![a.clone(), b.clone(), c.clone()],
            &IssueFilters {
                search: Some("SITEMAP.XML".to_string()),
                ..Default::default()
            },
        );
        assert_eq!(searched.total, 1);

        let by_page = group_category_issues(
            IssueCategory::Technical,
            vec![a, b, c],
            &IssueFilters {
                severity: Some(Severity::High),
                page_url: Some("https://example.com/a".to_string()),
                search: None,
            },
        );
        assert_eq!(by_page.total, 2);
    }

    fn entry(domain: &str, score: Option<i32>) -> HistoryEntry {
        HistoryEntry {
            id: Uuid::new_v4(),
            domain: domain.to_string(),
            status: AuditStatus::Completed,
            score_overall: score,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn history_filters_treat_missing_score_as_zero() {
        let filters = HistoryFilters {
            domain: Some("Example".to_string()),
            min_score: Some(10),
            max_score: None,
        };
        assert!(filters.matches(&entry("www.example.com", Some(55))));
        assert!(!filters.matches(&entry("www.example.com", None)));
        assert!(!filters.matches(&entry("other.org", Some(90))));

        let capped = HistoryFilters {
            max_score: Some(0),
            ..Default::default()
        };
        assert!(capped.matches(&entry("example.com", None)));
    }

    #[test]
    fn comparison_is_second_minus_first() {
        let cmp = compare(entry("example.com", Some(62)), entry("example.com", Some(80)));
        assert_eq!(cmp.score_change, 18);
        let cmp = compare(entry("example.com", Some(40)), entry("example.com", None));
        assert_eq!(cmp.score_change, -40);
    }
}
