// ============================================================================
// Client HTTP : un GET, le corps complet en retour
// ============================================================================
// CONCEPT RUST : trait comme point d'injection
// - HttpFetch est le seul point de contact avec le réseau
// - ReqwestFetcher : implémentation réelle
// - Les tests passent soit par un faux fetcher, soit par un serveur simulé
// ============================================================================

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::config::ProviderConfig;
use crate::error::{redact_url, FetchError, Result};

/// Récupère le corps brut d'une URL
///
/// Pas de retry ici : la politique de retry vit dans le découpage historique.
/// Un statut non-2xx n'est pas une erreur à ce niveau, c'est le décodage qui
/// le détectera.
#[async_trait]
pub trait HttpFetch: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

/// Implémentation basée sur reqwest
#[derive(Debug, Clone)]
pub struct ReqwestFetcher {
    client: reqwest::Client,
}

impl ReqwestFetcher {
    /// Crée le client HTTP avec le User-Agent et le timeout configurés
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| FetchError::transport(config.base(), e))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpFetch for ReqwestFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        debug!(url = %redact_url(url), "Sending HTTP request");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::transport(url, e))?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = %status, url = %redact_url(url), "Provider returned non-success status");
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::transport(url, e))?;

        debug!(status = %status, bytes = body.len(), "Received HTTP response");
        Ok(body.to_vec())
    }
}
