// ============================================================================
// Structure : Candle (Open, High, Low, Close, Volume)
// ============================================================================
// Représente une chandelle japonaise (candlestick) telle que renvoyée par
// l'endpoint aggregates de Polygon
//
// CONCEPTS RUST :
// 1. i64 : timestamp en millisecondes epoch (UTC), affiché en heure locale
// 2. f64 : floating point 64 bits pour les prix ET le volume
//    (Polygon renvoie parfois un volume fractionnaire)
// 3. Copy : 6 champs primitifs, copier coûte moins cher que référencer
// ============================================================================

use std::fmt;
use std::str::FromStr;

use crate::error::FetchError;
use crate::time::to_local_text;

/// Une chandelle OHLCV
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candle {
    /// Prix d'ouverture (Open)
    pub open: f64,

    /// Prix le plus haut (High)
    pub high: f64,

    /// Prix le plus bas (Low)
    pub low: f64,

    /// Prix de clôture (Close)
    pub close: f64,

    /// Volume échangé
    pub volume: f64,

    /// Début du bucket, millisecondes epoch
    pub timestamp: i64,
}

impl Candle {
    /// Constructeur : crée une nouvelle chandelle
    pub fn new(open: f64, high: f64, low: f64, close: f64, volume: f64, timestamp: i64) -> Self {
        Self {
            open,
            high,
            low,
            close,
            volume,
            timestamp,
        }
    }

    /// Vérifie si la chandelle est haussière (bullish)
    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }
}

impl fmt::Display for Candle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Candle {{")?;
        writeln!(f, "   open: {:.2}", self.open)?;
        writeln!(f, "   high: {:.2}", self.high)?;
        writeln!(f, "   low: {:.2}", self.low)?;
        writeln!(f, "   close: {:.2}", self.close)?;
        writeln!(f, "   volume: {:.1}", self.volume)?;
        writeln!(f, "   timestamp: {}", to_local_text(self.timestamp))?;
        write!(f, "}}")
    }
}

/// Champ de prix utilisé pour classer / comparer les chandelles
///
/// CONCEPT RUST : enum fermée
/// - Un nom inconnu est refusé au parsing (FromStr)
/// - Ensuite, le match est exhaustif : plus de cas "erreur" possible
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SeriesField {
    Open,
    High,
    Low,
    #[default]
    Close,
}

impl SeriesField {
    /// Extrait la valeur correspondante d'une chandelle
    pub fn value(&self, candle: &Candle) -> f64 {
        match self {
            SeriesField::Open => candle.open,
            SeriesField::High => candle.high,
            SeriesField::Low => candle.low,
            SeriesField::Close => candle.close,
        }
    }

    /// Nom attendu par l'API (paramètre series_type)
    pub fn as_str(&self) -> &'static str {
        match self {
            SeriesField::Open => "open",
            SeriesField::High => "high",
            SeriesField::Low => "low",
            SeriesField::Close => "close",
        }
    }
}

impl fmt::Display for SeriesField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SeriesField {
    type Err = FetchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "open" => Ok(SeriesField::Open),
            "high" => Ok(SeriesField::High),
            "low" => Ok(SeriesField::Low),
            "close" => Ok(SeriesField::Close),
            _ => Err(FetchError::invalid_format(
                s,
                "champ attendu : open, high, low ou close",
            )),
        }
    }
}

/// Index de la chandelle la plus haute parmi les `n` dernières
///
/// - Égalité : la première rencontrée gagne
/// - `n` plus grand que la série : on regarde toute la série
/// - Série vide ou `n == 0` : None
pub fn highest_candle(candles: &[Candle], field: SeriesField, n: usize) -> Option<usize> {
    let from = candles.len().saturating_sub(n);
    candles[from..]
        .iter()
        .enumerate()
        .fold(None, |best: Option<(usize, f64)>, (i, c)| {
            let v = field.value(c);
            match best {
                Some((_, best_v)) if best_v >= v => best,
                _ => Some((from + i, v)),
            }
        })
        .map(|(i, _)| i)
}

// ============================================================================
// Tests unitaires
// ============================================================================
