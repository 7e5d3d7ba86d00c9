// ============================================================================
// candlefetch - Library
// ============================================================================
// Expose les modules publics pour le binaire et les tests d'intégration
// ============================================================================

pub mod api;     // Client Polygon (HTTP, décodage, pagination, découpage)
pub mod config;  // ProviderConfig + ApiKey
pub mod error;   // FetchError
pub mod export;  // Export / import CSV
pub mod models;  // Structures de données
pub mod time;    // Texte local <-> millisecondes epoch

pub use error::{FetchError, Result};
