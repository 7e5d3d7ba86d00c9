// ============================================================================
// Module : config
// ============================================================================
// Paramètres du fournisseur (URL de base, limites de débit) et clé API
//
// CONCEPT : Pas de constantes globales
// - Tout passe par ProviderConfig, injecté dans le client
// - Les tests remplacent l'URL par un serveur simulé et le cool-down par 0
// ============================================================================

use std::fmt;
use std::path::Path;
use std::time::Duration;

use crate::error::{FetchError, Result};

/// URL de base de l'API Polygon
pub const DEFAULT_BASE_URL: &str = "https://api.polygon.io";

/// Nombre maximal de chandelles demandées par requête
pub const DEFAULT_ITEM_CAP: u32 = 1150;

/// Configuration du fournisseur de données
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    /// URL de base, sans slash final
    pub base_url: String,

    /// Pause imposée entre deux groupes de requêtes
    pub cooldown: Duration,

    /// Nombre de requêtes entre deux pauses
    pub requests_per_cooldown: u32,

    /// Chandelles maximum par sous-fenêtre
    pub item_cap: u32,

    /// Tentatives supplémentaires après une erreur réseau (0 = aucune)
    pub max_retries: u32,

    /// Première attente avant une nouvelle tentative (doublée ensuite)
    pub retry_backoff: Duration,

    /// Timeout par requête HTTP
    pub request_timeout: Duration,

    pub user_agent: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            cooldown: Duration::from_secs(60),
            requests_per_cooldown: 2,
            item_cap: DEFAULT_ITEM_CAP,
            max_retries: 0,
            retry_backoff: Duration::from_secs(1),
            request_timeout: Duration::from_secs(30),
            user_agent: concat!("candlefetch/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl ProviderConfig {
    /// Configuration pointant vers une autre URL (serveur de test, proxy)
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// URL de base normalisée (sans slash final)
    pub fn base(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    pub fn validate(&self) -> Result<()> {
        if self.base().is_empty() {
            return Err(FetchError::invalid_format(&self.base_url, "URL de base vide"));
        }
        if self.item_cap == 0 {
            return Err(FetchError::invalid_format("0", "item_cap doit être > 0"));
        }
        if self.requests_per_cooldown == 0 {
            return Err(FetchError::invalid_format(
                "0",
                "requests_per_cooldown doit être > 0",
            ));
        }
        Ok(())
    }
}

/// Clé API Polygon
///
/// CONCEPT RUST : Newtype
/// - Enveloppe une String pour contrôler son affichage
/// - Debug n'affiche jamais la valeur, pas de Display du tout
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    /// Crée une clé en retirant les espaces autour
    pub fn new(raw: impl AsRef<str>) -> Result<Self> {
        let key = raw.as_ref().trim();
        if key.is_empty() {
            return Err(FetchError::invalid_format("<clé API>", "clé API vide"));
        }
        Ok(Self(key.to_string()))
    }

    /// Lit la clé depuis un fichier (ex: API_KEY.secret)
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| FetchError::io(path, e))?;
        Self::new(raw)
    }

    /// Valeur brute, à n'utiliser que pour construire une URL
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(<redacted>)")
    }
}
