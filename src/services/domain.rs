//! Domain normalization and reachability checks for project verification.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use url::Url;

use crate::error::ApiError;

pub const VERIFICATION_FAILED_MESSAGE: &str = "Unable to reach the domain over HTTPS or HTTP.";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("Invalid domain.")]
    Invalid,
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        ApiError::bad_request(err.to_string())
    }
}

/// Reduce user input (`Example.com/path`, `http://www.example.com`) to a bare hostname
pub fn normalize_domain(input: &str) -> Result<String, DomainError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(DomainError::Invalid);
    }

    let lower = trimmed.to_ascii_lowercase();
    let with_scheme = if lower.starts_with("http://") || lower.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    };

    let url = Url::parse(&with_scheme).map_err(|_| DomainError::Invalid)?;
    match url.host_str() {
        Some(host) if !host.is_empty() => Ok(host.trim_end_matches('.').to_ascii_lowercase()),
        _ => Err(DomainError::Invalid),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProbeMethod {
    Head,
    Get,
}

/// Transport-level failure (DNS, TLS, connect, timeout); HTTP statuses are not errors
#[derive(Debug, Error)]
#[error("probe failed: {0}")]
pub struct ProbeError(pub String);

/// One HTTP request against a candidate URL, following redirects
#[async_trait]
pub trait DomainProbe: Send + Sync {
    async fn probe(&self, method: ProbeMethod, url: &str) -> Result<u16, ProbeError>;
}

pub struct HttpProbe {
    client: reqwest::Client,
}

impl HttpProbe {
    pub fn new() -> Result<Self, ProbeError> {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::limited(10))
            .user_agent(concat!("cascade-seo/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ProbeError(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl DomainProbe for HttpProbe {
    async fn probe(&self, method: ProbeMethod, url: &str) -> Result<u16, ProbeError> {
        let request = match method {
            ProbeMethod::Head => self.client.head(url),
            ProbeMethod::Get => self.client.get(url),
        };
        let response = request.send().await.map_err(|e| ProbeError(e.to_string()))?;
        Ok(response.status().as_u16())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationOutcome {
    pub reachable: bool,
    pub status: Option<u16>,
}

fn acceptable(status: u16) -> bool {
    (200..400).contains(&status)
}

/// HTTPS first, then HTTP. HEAD is retried as GET only when it fails to connect
/// at all; a HEAD that answers with an error status moves on to the next scheme.
pub async fn verify_domain(probe: &dyn DomainProbe, domain: &str, deadline: Duration) -> VerificationOutcome {
    let attempts = async {
        for url in [format!("https://{}", domain), format!("http://{}", domain)] {
            match probe.probe(ProbeMethod::Head, &url).await {
                Ok(status) if acceptable(status) => {
                    return VerificationOutcome { reachable: true, status: Some(status) };
                }
                Ok(status) => {
                    tracing::debug!("HEAD {} answered {}", url, status);
                }
                Err(head_err) => {
                    tracing::debug!("HEAD {} failed: {}", url, head_err);
                    match probe.probe(ProbeMethod::Get, &url).await {
                        Ok(status) if acceptable(status) => {
                            return VerificationOutcome { reachable: true, status: Some(status) };
                        }
                        Ok(status) => tracing::debug!("GET {} answered {}", url, status),
                        Err(get_err) => tracing::debug!("GET {} failed: {}", url, get_err),
                    }
                }
            }
        }
        VerificationOutcome { reachable: false, status: None }
    };

    match tokio::time::timeout(deadline, attempts).await {
        Ok(outcome) => outcome,
        Err(_) => {
            tracing::warn!("Verification of {} timed out after {:?}", domain, deadline);
            VerificationOutcome { reachable: false, status: None }
        }
    }
}
