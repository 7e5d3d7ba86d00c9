// ============================================================================
// Structures : indicateurs techniques (SMA / EMA / RSI)
// ============================================================================
// Polygon calcule les indicateurs côté serveur, on ne fait que les récupérer
// ============================================================================

use std::fmt;
use std::str::FromStr;

use crate::error::FetchError;
use crate::models::{SeriesField, Timespan};

/// Une valeur d'indicateur pour une fenêtre d'échantillons
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndicatorValue {
    /// Millisecondes epoch
    pub timestamp: i64,
    pub value: f64,
}

/// Type d'indicateur supporté
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndicatorKind {
    /// Simple moving average
    Sma,
    /// Exponential moving average
    Ema,
    /// Relative strength index
    Rsi,
}

impl IndicatorKind {
    /// Segment de chemin dans l'URL (/v1/indicators/{kind}/...)
    pub fn as_str(&self) -> &'static str {
        match self {
            IndicatorKind::Sma => "sma",
            IndicatorKind::Ema => "ema",
            IndicatorKind::Rsi => "rsi",
        }
    }
}

impl fmt::Display for IndicatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IndicatorKind {
    type Err = FetchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sma" => Ok(IndicatorKind::Sma),
            "ema" => Ok(IndicatorKind::Ema),
            "rsi" => Ok(IndicatorKind::Rsi),
            _ => Err(FetchError::invalid_format(s, "indicateur attendu : sma, ema ou rsi")),
        }
    }
}

/// Paramètres d'une requête d'indicateur
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndicatorRequest {
    pub kind: IndicatorKind,
    pub ticker: String,
    /// Valeurs dont le timestamp est <= à cette borne (millisecondes epoch)
    pub timestamp_lte: i64,
    pub timespan: Timespan,
    /// Champ de prix sur lequel l'indicateur est calculé
    pub series_type: SeriesField,
    /// Nombre de chandelles par fenêtre
    pub window: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indicator_kind_parse() {
        assert_eq!("SMA".parse::<IndicatorKind>().unwrap(), IndicatorKind::Sma);
        assert_eq!("rsi".parse::<IndicatorKind>().unwrap(), IndicatorKind::Rsi);
        assert!("macd".parse::<IndicatorKind>().is_err());
    }
}
