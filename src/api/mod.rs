// ============================================================================
// Module : api
// ============================================================================
// Client de l'API Polygon : transport HTTP, décodage, pagination et
// découpage des longues périodes
// ============================================================================

pub mod decode;   // Enveloppes JSON -> Page<T>
pub mod history;  // Découpage historique + rythme des requêtes
pub mod http;     // Trait HttpFetch + implémentation reqwest
pub mod polygon;  // URLs + pagination

// Re-export des types principaux
pub use decode::{decode_candle_page, decode_indicator_page, Page};
pub use history::{split_windows, window_step_millis, RequestPacer};
pub use http::{HttpFetch, ReqwestFetcher};
pub use polygon::{continuation_url, PolygonClient};
