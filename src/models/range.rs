// ============================================================================
// Structures : Timespan et RangeRequest
// ============================================================================
// Décrit une requête historique : ticker, fenêtre [start, end), largeur des
// chandelles (multiplier x timespan)
// ============================================================================

use std::fmt;
use std::str::FromStr;

use crate::error::{FetchError, Result};

const SECOND_MS: i64 = 1_000;
const MINUTE_MS: i64 = 60 * SECOND_MS;
const HOUR_MS: i64 = 60 * MINUTE_MS;
const DAY_MS: i64 = 24 * HOUR_MS;

/// Unité de largeur d'une chandelle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timespan {
    Second,
    Minute,
    Hour,
    Day,
    Week,
    Month,
    Year,
}

impl Timespan {
    /// Nom attendu dans l'URL Polygon
    pub fn as_str(&self) -> &'static str {
        match self {
            Timespan::Second => "second",
            Timespan::Minute => "minute",
            Timespan::Hour => "hour",
            Timespan::Day => "day",
            Timespan::Week => "week",
            Timespan::Month => "month",
            Timespan::Year => "year",
        }
    }

    /// Durée d'une unité en millisecondes
    ///
    /// Mois = 30 jours, année = 365 jours : légèrement plus court que la
    /// réalité, une sous-fenêtre ne dépasse donc jamais la limite d'items.
    pub fn base_millis(&self) -> i64 {
        match self {
            Timespan::Second => SECOND_MS,
            Timespan::Minute => MINUTE_MS,
            Timespan::Hour => HOUR_MS,
            Timespan::Day => DAY_MS,
            Timespan::Week => 7 * DAY_MS,
            Timespan::Month => 30 * DAY_MS,
            Timespan::Year => 365 * DAY_MS,
        }
    }

    /// Retourne toutes les unités (pour l'aide de la CLI)
    pub fn all() -> [Timespan; 7] {
        [
            Timespan::Second,
            Timespan::Minute,
            Timespan::Hour,
            Timespan::Day,
            Timespan::Week,
            Timespan::Month,
            Timespan::Year,
        ]
    }
}

impl Default for Timespan {
    fn default() -> Self {
        Timespan::Minute
    }
}

impl fmt::Display for Timespan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Timespan {
    type Err = FetchError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_ascii_lowercase();
        Timespan::all()
            .into_iter()
            .find(|t| t.as_str() == wanted)
            .ok_or_else(|| {
                FetchError::invalid_format(s, "unité attendue : second, minute, hour, day, week, month ou year")
            })
    }
}

/// Requête de chandelles sur une fenêtre [start, end)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeRequest {
    /// Symbole du ticker (ex: "SPY")
    pub ticker: String,

    /// Début, millisecondes epoch
    pub start: i64,

    /// Fin, millisecondes epoch
    pub end: i64,

    /// Nombre d'unités par chandelle (5 pour des chandelles de 5 minutes)
    pub multiplier: u32,

    /// Unité de la chandelle
    pub timespan: Timespan,
}

impl RangeRequest {
    pub fn new(
        ticker: impl Into<String>,
        start: i64,
        end: i64,
        multiplier: u32,
        timespan: Timespan,
    ) -> Self {
        Self {
            ticker: ticker.into(),
            start,
            end,
            multiplier,
            timespan,
        }
    }

    /// Vérifie les invariants : ticker non vide, start < end, multiplier > 0
    pub fn validate(&self) -> Result<()> {
        if self.ticker.trim().is_empty() {
            return Err(FetchError::invalid_format(&self.ticker, "ticker vide"));
        }
        if self.start >= self.end {
            return Err(FetchError::invalid_format(
                format!("{}..{}", self.start, self.end),
                "start doit précéder end",
            ));
        }
        if self.multiplier == 0 {
            return Err(FetchError::invalid_format("0", "multiplier doit être > 0"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timespan_parse() {
        assert_eq!("minute".parse::<Timespan>().unwrap(), Timespan::Minute);
        assert_eq!("Day".parse::<Timespan>().unwrap(), Timespan::Day);
        assert!("fortnight".parse::<Timespan>().is_err());
    }

    #[test]
    fn test_timespan_base_millis() {
        assert_eq!(Timespan::Second.base_millis(), 1_000);
        assert_eq!(Timespan::Minute.base_millis(), 60_000);
        assert_eq!(Timespan::Week.base_millis(), 604_800_000);
    }

    #[test]
    fn test_range_request_validate() {
        assert!(RangeRequest::new("SPY", 0, 10, 5, Timespan::Minute).validate().is_ok());
        assert!(RangeRequest::new("SPY", 10, 10, 5, Timespan::Minute).validate().is_err());
        assert!(RangeRequest::new("SPY", 0, 10, 0, Timespan::Minute).validate().is_err());
        assert!(RangeRequest::new(" ", 0, 10, 1, Timespan::Minute).validate().is_err());
    }
}
