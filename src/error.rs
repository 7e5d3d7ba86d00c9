// ============================================================================
// Module : error
// ============================================================================
// Erreurs typées de la librairie
//
// CONCEPTS RUST :
// 1. thiserror : génère Display + Error à partir d'attributs
// 2. #[source] : chaîne l'erreur d'origine (reqwest, io)
// 3. Le binaire convertit tout en anyhow::Error avec .context()
// ============================================================================

use std::path::PathBuf;

use thiserror::Error;

/// Nom du paramètre de requête qui porte la clé API
pub const API_KEY_PARAM: &str = "apiKey";

/// Toutes les erreurs possibles de la librairie
#[derive(Debug, Error)]
pub enum FetchError {
    /// Texte de date ou de nombre invalide
    #[error("format invalide pour '{input}' : {reason}")]
    InvalidFormat { input: String, reason: String },

    /// Échec réseau / HTTP (l'URL est toujours expurgée de la clé API)
    #[error("échec de la requête vers {url}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Réponse JSON ou ligne CSV qui ne correspond pas au format attendu
    #[error("données mal formées ({context}) : {reason}")]
    Malformed { context: String, reason: String },

    /// Lecture / écriture de fichier
    #[error("erreur d'E/S sur {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl FetchError {
    pub fn invalid_format(input: impl Into<String>, reason: impl ToString) -> Self {
        FetchError::InvalidFormat {
            input: input.into(),
            reason: reason.to_string(),
        }
    }

    pub fn malformed(context: impl Into<String>, reason: impl ToString) -> Self {
        FetchError::Malformed {
            context: context.into(),
            reason: reason.to_string(),
        }
    }

    /// Construit une erreur de transport en retirant l'URL de l'erreur reqwest
    ///
    /// CONCEPT : reqwest::Error inclut l'URL complète dans son Display,
    /// clé API comprise. without_url() la supprime, on garde la version
    /// expurgée dans notre propre champ.
    pub fn transport(url: &str, source: reqwest::Error) -> Self {
        FetchError::Transport {
            url: redact_url(url),
            source: source.without_url(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        FetchError::Io {
            path: path.into(),
            source,
        }
    }

    /// Seules les erreurs réseau peuvent être retentées
    pub fn is_transport(&self) -> bool {
        matches!(self, FetchError::Transport { .. })
    }
}

/// Alias pratique : Result<T> = Result<T, FetchError>
pub type Result<T> = std::result::Result<T, FetchError>;

/// Remplace la valeur du paramètre apiKey par "REDACTED"
///
/// Toute URL qui finit dans un log ou un message d'erreur passe par ici.
pub fn redact_url(url: &str) -> String {
    match reqwest::Url::parse(url) {
        Ok(mut parsed) => {
            if parsed.query().is_none() {
                return parsed.to_string();
            }
            let pairs: Vec<(String, String)> = parsed
                .query_pairs()
                .map(|(k, v)| {
                    if k == API_KEY_PARAM {
                        (k.into_owned(), "REDACTED".to_string())
                    } else {
                        (k.into_owned(), v.into_owned())
                    }
                })
                .collect();
            parsed.query_pairs_mut().clear().extend_pairs(pairs);
            parsed.to_string()
        }
        // URL non parsable : on coupe tout ce qui suit la clé
        Err(_) => match url.find(&format!("{}=", API_KEY_PARAM)) {
            Some(pos) => format!("{}{}=REDACTED", &url[..pos], API_KEY_PARAM),
            None => url.to_string(),
        },
    }
}

// ============================================================================
// Tests unitaires
// ============================================================================
