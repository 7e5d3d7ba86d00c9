// ============================================================================
// Module : time
// ============================================================================
// Conversion texte "YYYY-MM-DD HH:MM:SS" (heure locale) <-> millisecondes epoch
//
// L'API Polygon parle en millisecondes Unix, l'utilisateur et le CSV en
// heure locale lisible. Ce module est le seul endroit qui fait le pont.
// ============================================================================

use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};

use crate::error::{FetchError, Result};

/// Format unique accepté et produit
pub const DATE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Parse "YYYY-MM-DD HH:MM:SS" (heure locale) en millisecondes epoch
///
/// Le motif est strict : chrono accepte par exemple "2024-1-2 3:04:05",
/// on le refuse avant même d'appeler le parser.
///
/// Heure inexistante (saut DST) : InvalidFormat.
/// Heure ambiguë (retour DST) : on prend l'instant le plus tôt.
pub fn to_epoch_millis(text: &str) -> Result<i64> {
    if !has_exact_shape(text) {
        return Err(FetchError::invalid_format(
            text,
            "attendu YYYY-MM-DD HH:MM:SS",
        ));
    }

    let naive = NaiveDateTime::parse_from_str(text, DATE_TIME_FORMAT)
        .map_err(|e| FetchError::invalid_format(text, e))?;

    let local = Local
        .from_local_datetime(&naive)
        .earliest()
        .ok_or_else(|| FetchError::invalid_format(text, "heure locale inexistante"))?;

    Ok(local.timestamp_millis())
}

/// Formate des millisecondes epoch en "YYYY-MM-DD HH:MM:SS" (heure locale)
///
/// Les millisecondes résiduelles sont tronquées.
pub fn to_local_text(millis: i64) -> String {
    local_datetime(millis).format(DATE_TIME_FORMAT).to_string()
}

/// Étiquette mois+année courte ("Jan24"), utilisée pour nommer les exports
pub fn month_year_tag(millis: i64) -> String {
    local_datetime(millis).format("%b%y").to_string()
}

fn local_datetime(millis: i64) -> DateTime<Local> {
    // Hors de la plage chrono (an > 262143) : on retombe sur l'epoch
    DateTime::<Utc>::from_timestamp_millis(millis)
        .unwrap_or_default()
        .with_timezone(&Local)
}

/// Vérifie la forme exacte : 19 caractères, chiffres et séparateurs à leur place
fn has_exact_shape(text: &str) -> bool {
    let bytes = text.as_bytes();
    if bytes.len() != 19 {
        return false;
    }
    bytes.iter().enumerate().all(|(i, &b)| match i {
        4 | 7 => b == b'-',
        10 => b == b' ',
        13 | 16 => b == b':',
        _ => b.is_ascii_digit(),
    })
}

// ============================================================================
// Tests unitaires
// ============================================================================
