//! source.rs — Fonte do cronograma publicado num repositório GitHub
//!
//! O token de versão é o sha do último commit do branch; o JSON e a imagem
//! são baixados exatamente nesse sha.

use crate::config::GithubConfig;
use crate::schedule::SchedulePayload;
use async_trait::async_trait;
use reqwest::{StatusCode, header};
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

/// Atualização obtida da fonte.
#[derive(Debug, Clone)]
pub struct ScheduleUpdate {
    pub payload: SchedulePayload,
    pub image: Vec<u8>,
    pub token: String,
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("falha HTTP: {0}")]
    Http(#[from] reqwest::Error),
    #[error("resposta inesperada {status} de {url}")]
    Status { status: StatusCode, url: String },
    #[error("referência do branch sem sha")]
    MissingSha,
    #[error("JSON do cronograma inválido: {0}")]
    Json(#[from] serde_json::Error),
}

#[async_trait]
pub trait ScheduleSource: Send + Sync {
    /// `Ok(None)` quando nada mudou desde `last_token`.
    async fn fetch(&self, last_token: &str) -> Result<Option<ScheduleUpdate>, SourceError>;
}

#[derive(Deserialize)]
struct GitRef {
    object: Option<GitObject>,
}

#[derive(Deserialize)]
struct GitObject {
    sha: Option<String>,
}

pub struct GithubSource {
    client: reqwest::Client,
    config: GithubConfig,
}

impl GithubSource {
    pub fn new(config: GithubConfig) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("monitoramento_energia/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client, config })
    }

    async fn latest_sha(&self) -> Result<String, SourceError> {
        let url = format!(
            "{}/repos/{}/git/refs/heads/{}",
            self.config.api_url.trim_end_matches('/'),
            self.config.repo,
            self.config.branch
        );
        let mut request = self
            .client
            .get(&url)
            .timeout(Duration::from_secs(10))
            .header(header::ACCEPT, "application/vnd.github+json")
            .header(header::CACHE_CONTROL, "no-cache, no-store, must-revalidate")
            .header(header::PRAGMA, "no-cache");
        if let Some(token) = &self.config.token {
            request = request.bearer_auth(token);
        }

        let resp = request.send().await?;
        if resp.status() != StatusCode::OK {
            return Err(SourceError::Status {
                status: resp.status(),
                url,
            });
        }
        let git_ref: GitRef = resp.json().await?;
        git_ref
            .object
            .and_then(|o| o.sha)
            .ok_or(SourceError::MissingSha)
    }

    async fn download(&self, path: &str, sha: &str) -> Result<reqwest::Response, SourceError> {
        let url = format!(
            "{}/{}/{}/{}",
            self.config.raw_url.trim_end_matches('/'),
            self.config.repo,
            sha,
            path
        );
        let resp = self
            .client
            .get(&url)
            .timeout(Duration::from_secs(30))
            .send()
            .await?;
        if resp.status() != StatusCode::OK {
            return Err(SourceError::Status {
                status: resp.status(),
                url,
            });
        }
        Ok(resp)
    }
}

#[async_trait]
impl ScheduleSource for GithubSource {
    async fn fetch(&self, last_token: &str) -> Result<Option<ScheduleUpdate>, SourceError> {
        let sha = self.latest_sha().await?;
        if sha == last_token {
            return Ok(None);
        }
        info!(
            "[AGENDA] Novo commit detectado: {}. Baixando arquivos...",
            sha.get(..7).unwrap_or(&sha)
        );

        let image = self
            .download(&self.config.image_path, &sha)
            .await?
            .bytes()
            .await?
            .to_vec();
        // raw.githubusercontent.com serve JSON como text/plain
        let text = self.download(&self.config.json_path, &sha).await?.text().await?;
        let payload = SchedulePayload(serde_json::from_str(&text)?);

        Ok(Some(ScheduleUpdate {
            payload,
            image,
            token: sha,
        }))
    }
}
