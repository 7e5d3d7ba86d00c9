// ============================================================================
// Module : models
// ============================================================================
// Structures de données : chandelles, indicateurs, requêtes
//
// CONCEPT RUST : Modules et visibilité
// - "pub mod" : déclare un sous-module publique (accessible depuis l'extérieur)
// - Sans "pub", le module serait privé au crate
// ============================================================================

pub mod candle;     // Candle, SeriesField, highest_candle
pub mod indicator;  // IndicatorValue, IndicatorKind, IndicatorRequest
pub mod range;      // Timespan, RangeRequest

// Re-export des structures principales pour simplifier les imports
// Au lieu de : use candlefetch::models::candle::Candle;
// On peut faire : use candlefetch::models::Candle;
pub use candle::{highest_candle, Candle, SeriesField};
pub use indicator::{IndicatorKind, IndicatorRequest, IndicatorValue};
pub use range::{RangeRequest, Timespan};
