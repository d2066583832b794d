#![allow(dead_code)]

use std::process::{Child, Command, Stdio};
use std::sync::OnceLock;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use reqwest::{Response, StatusCode};
use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

static SERVER: OnceLock<TestServer> = OnceLock::new();

pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    child: Child,
}

impl TestServer {
    fn spawn() -> Result<Self> {
        // Pick an unused port for isolation
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);

        // Cargo builds the server binary before integration tests run
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_cascade-seo"));
        cmd.env("CASCADE_PORT", port.to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());

        // Inherit environment so the server sees DATABASE_URL and AUTH_SECRET
        let child = cmd.spawn().context("failed to spawn server binary")?;

        Ok(Self { port, base_url, child })
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let client = reqwest::Client::new();
        let deadline = Instant::now() + timeout;
        loop {
            if Instant::now() > deadline {
                break;
            }
            let url = format!("{}/health", self.base_url);
            if let Ok(resp) = client.get(&url).send().await {
                // Ready once it answers, with or without a database
                if resp.status() == StatusCode::OK || resp.status() == StatusCode::SERVICE_UNAVAILABLE {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(150)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }
}

pub async fn ensure_server() -> Result<&'static TestServer> {
    let server = SERVER.get_or_init(|| TestServer::spawn().expect("failed to spawn server binary"));
    server.wait_ready(Duration::from_secs(10)).await?;
    Ok(server)
}

/// Pool for seeding fixtures, or `None` when no database is configured
pub async fn database() -> Option<PgPool> {
    let url = std::env::var("DATABASE_URL").ok()?;
    let pool = match PgPool::connect(&url).await {
        Ok(pool) => pool,
        Err(e) => {
            eprintln!("skipping database test: {}", e);
            return None;
        }
    };
    if let Err(e) = sqlx::migrate!("./migrations").run(&pool).await {
        eprintln!("skipping database test, migrations failed: {}", e);
        return None;
    }
    Some(pool)
}

/// Envelope payload of a successful response
pub async fn data(res: Response) -> Result<Value> {
    let body = res.json::<Value>().await?;
    anyhow::ensure!(body["success"] == true, "expected success envelope, got {}", body);
    Ok(body["data"].clone())
}

/// Error message of a failed response
pub async fn error_message(res: Response) -> Result<String> {
    let body = res.json::<Value>().await?;
    anyhow::ensure!(body["success"] == false, "expected error envelope, got {}", body);
    Ok(body["error"].as_str().unwrap_or_default().to_string())
}

#[derive(Debug, Clone)]
pub struct TestUser {
    pub id: Uuid,
    pub email: String,
    pub password: String,
    pub token: String,
}

/// Seeds users straight into the database and removes everything they created on cleanup
pub struct TestContext {
    pub pool: PgPool,
    pub client: reqwest::Client,
    pub base_url: String,
    created_users: Vec<Uuid>,
    created_invites: Vec<String>,
}

impl TestContext {
    /// `None` when the database is unavailable; callers skip the test
    pub async fn new() -> Result<Option<Self>> {
        let server = ensure_server().await?;
        let Some(pool) = database().await else {
            return Ok(None);
        };
        Ok(Some(Self {
            pool,
            client: reqwest::Client::new(),
            base_url: server.base_url.clone(),
            created_users: Vec::new(),
            created_invites: Vec::new(),
        }))
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn unique_email(prefix: &str) -> String {
        format!("{}-{}@cascade.test", prefix, Uuid::new_v4().simple())
    }

    /// Insert an active user and sign them in
    pub async fn create_user(&mut self, is_pro: bool, role: &str) -> Result<TestUser> {
        let email = Self::unique_email("user");
        let password = format!("pw-{}", Uuid::new_v4().simple());
        let hash = bcrypt::hash(&password, 4)?;
        let id = Uuid::new_v4();

        sqlx::query(
            r#"
            INSERT INTO users (id, email, password_hash, role, is_pro)
            VALUES ($1, $2, $3, $4::role, $5)
            "#,
        )
        .bind(id)
        .bind(&email)
        .bind(&hash)
        .bind(role)
        .bind(is_pro)
        .execute(&self.pool)
        .await?;
        self.created_users.push(id);

        let token = self.sign_in(&email, &password).await?;
        Ok(TestUser {
            id,
            email,
            password,
            token,
        })
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<String> {
        let res = self
            .client
            .post(self.url("/auth/sign-in"))
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await?;
        anyhow::ensure!(res.status() == StatusCode::OK, "sign-in failed with {}", res.status());
        let data = data(res).await?;
        data["token"]
            .as_str()
            .map(str::to_string)
            .context("sign-in response has no token")
    }

    /// Remember a user created through the API so cleanup removes it
    pub async fn track_email(&mut self, email: &str) -> Result<()> {
        if let Some(id) = sqlx::query_scalar::<_, Uuid>("SELECT id FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?
        {
            self.created_users.push(id);
        }
        Ok(())
    }

    pub fn track_invite(&mut self, token: &str) {
        self.created_invites.push(token.to_string());
    }

    /// Insert an invite row directly, bypassing the admin API
    pub async fn create_invite(&mut self, email: Option<&str>, is_pro: bool, expires_in: chrono::Duration) -> Result<String> {
        let token = format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple());
        sqlx::query(
            r#"
            INSERT INTO invite_tokens (id, token, email, is_pro, role, expires_at)
            VALUES ($1, $2, $3, $4, 'USER', $5)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&token)
        .bind(email)
        .bind(is_pro)
        .bind(chrono::Utc::now() + expires_in)
        .execute(&self.pool)
        .await?;
        self.track_invite(&token);
        Ok(token)
    }

    /// One crawled page with an issue on it, for an existing audit
    pub async fn seed_issue(&self, audit_id: Uuid, category: &str) -> Result<Uuid> {
        let page_id = Uuid::new_v4();
        sqlx::query("INSERT INTO pages (id, audit_id, url, status_code) VALUES ($1, $2, $3, 200)")
            .bind(page_id)
            .bind(audit_id)
            .bind(format!("https://seeded.test/{}", page_id.simple()))
            .execute(&self.pool)
            .await?;

        let issue_id = Uuid::new_v4();
        sqlx::query(
            r#"
            INSERT INTO issues (id, audit_id, page_id, category, severity, title)
            VALUES ($1, $2, $3, $4::issue_category, 'HIGH', 'Missing title tag')
            "#,
        )
        .bind(issue_id)
        .bind(audit_id)
        .bind(page_id)
        .bind(category)
        .execute(&self.pool)
        .await?;
        Ok(issue_id)
    }

    /// A ready report owned by `user_id`
    pub async fn seed_report(&self, audit_id: Uuid, user_id: Uuid, file_url: &str) -> Result<Uuid> {
        let id = Uuid::new_v4();
        sqlx::query(
            r#"
            INSERT INTO reports (id, audit_id, user_id, status, file_url)
            VALUES ($1, $2, $3, 'READY', $4)
            "#,
        )
        .bind(id)
        .bind(audit_id)
        .bind(user_id)
        .bind(file_url)
        .execute(&self.pool)
        .await?;
        Ok(id)
    }

    pub async fn count_for_audit(&self, table: &str, audit_id: Uuid) -> Result<i64> {
        let column = if table == "audits" { "id" } else { "audit_id" };
        let query = format!("SELECT COUNT(*) FROM {} WHERE {} = $1", table, column);
        Ok(sqlx::query_scalar::<_, i64>(&query).bind(audit_id).fetch_one(&self.pool).await?)
    }

    pub async fn cleanup(self) -> Result<()> {
        let users = &self.created_users;
        let audits = "SELECT id FROM audits WHERE runner_id = ANY($1) \
                      OR project_id IN (SELECT id FROM projects WHERE owner_id = ANY($1))";
        for table in ["issues", "pages", "reports"] {
            let query = format!("DELETE FROM {} WHERE audit_id IN ({})", table, audits);
            sqlx::query(&query).bind(users).execute(&self.pool).await?;
        }
        sqlx::query("DELETE FROM reports WHERE user_id = ANY($1)")
            .bind(users)
            .execute(&self.pool)
            .await?;
        let query = format!("DELETE FROM audits WHERE id IN ({})", audits);
        sqlx::query(&query).bind(users).execute(&self.pool).await?;
        sqlx::query("DELETE FROM invite_tokens WHERE token = ANY($1) OR created_by_id = ANY($2)")
            .bind(&self.created_invites)
            .bind(users)
            .execute(&self.pool)
            .await?;
        sqlx::query("DELETE FROM users WHERE id = ANY($1)")
            .bind(users)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
