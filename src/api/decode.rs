// ============================================================================
// Décodage des réponses Polygon
// ============================================================================
// On déclare exactement la forme JSON attendue pour chaque endpoint, serde
// fait le reste. Toute différence devient FetchError::Malformed.
//
// CONCEPT RUST : Option<T> pour les champs facultatifs
// - next_url absent => None => fin de la pagination
// - Un champ absent n'est jamais confondu avec 0 ou ""
// ============================================================================

use serde::Deserialize;

use crate::error::{FetchError, Result};
use crate::models::{Candle, IndicatorValue};

/// Statuts Polygon qui accompagnent des données valides
const ACCEPTED_STATUSES: [&str; 2] = ["OK", "DELAYED"];

/// Une page de résultats et le lien éventuel vers la suivante
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// URL complète de la page suivante, sans clé API
    pub next_url: Option<String>,
}

// ============================================================================
// Structures qui matchent exactement le JSON
// ============================================================================

/// Lecture minimale, utilisée avant le décodage complet pour remonter le
/// message d'erreur du fournisseur plutôt qu'un "missing field"
#[derive(Debug, Deserialize)]
struct StatusProbe {
    status: Option<String>,
    error: Option<String>,
    message: Option<String>,
}

/// Réponse de /v2/aggs/ticker/...
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AggregatesEnvelope {
    #[allow(dead_code)]
    ticker: String,
    #[allow(dead_code)]
    query_count: u64,
    results_count: u64,
    #[allow(dead_code)]
    status: String,
    // Absent quand la fenêtre ne contient aucune chandelle
    results: Option<Vec<AggregateBar>>,
    #[serde(rename = "next_url")]
    next_url: Option<String>,
}

/// Une chandelle au format compact de Polygon
#[derive(Debug, Deserialize)]
struct AggregateBar {
    o: f64,
    h: f64,
    l: f64,
    c: f64,
    v: f64,
    t: i64,
}

/// Réponse de /v1/indicators/...
#[derive(Debug, Deserialize)]
struct IndicatorEnvelope {
    #[allow(dead_code)]
    status: String,
    next_url: Option<String>,
    results: IndicatorResults,
}

#[derive(Debug, Deserialize)]
struct IndicatorResults {
    #[serde(default)]
    values: Vec<IndicatorWire>,
}

#[derive(Debug, Deserialize)]
struct IndicatorWire {
    timestamp: i64,
    value: f64,
}

// ============================================================================
// Fonctions publiques
// ============================================================================

/// Décode une page de chandelles (endpoint aggregates)
pub fn decode_candle_page(bytes: &[u8]) -> Result<Page<Candle>> {
    check_status(bytes, "aggregates")?;

    let envelope: AggregatesEnvelope = serde_json::from_slice(bytes)
        .map_err(|e| FetchError::malformed("aggregates", format!("{e} (body: {})", snippet(bytes))))?;

    let items: Vec<Candle> = envelope
        .results
        .unwrap_or_default()
        .into_iter()
        .map(|b| Candle::new(b.o, b.h, b.l, b.c, b.v, b.t))
        .collect();

    if items.len() as u64 != envelope.results_count {
        tracing::debug!(
            declared = envelope.results_count,
            received = items.len(),
            "resultsCount differs from page length"
        );
    }

    Ok(Page {
        items,
        next_url: non_empty(envelope.next_url),
    })
}

/// Décode une page de valeurs d'indicateur (enveloppe imbriquée results.values)
pub fn decode_indicator_page(bytes: &[u8]) -> Result<Page<IndicatorValue>> {
    check_status(bytes, "indicator")?;

    let envelope: IndicatorEnvelope = serde_json::from_slice(bytes)
        .map_err(|e| FetchError::malformed("indicator", format!("{e} (body: {})", snippet(bytes))))?;

    let items = envelope
        .results
        .values
        .into_iter()
        .map(|v| IndicatorValue {
            timestamp: v.timestamp,
            value: v.value,
        })
        .collect();

    Ok(Page {
        items,
        next_url: non_empty(envelope.next_url),
    })
}

/// Refuse les enveloppes d'erreur ("status": "ERROR", "NOT_AUTHORIZED", ...)
///
/// Sans ce contrôle, une erreur sans champ "results" passerait pour une page vide.
fn check_status(bytes: &[u8], context: &str) -> Result<()> {
    let probe: StatusProbe = serde_json::from_slice(bytes)
        .map_err(|e| FetchError::malformed(context, format!("{e} (body: {})", snippet(bytes))))?;

    match probe.status.as_deref() {
        Some(status) if ACCEPTED_STATUSES.contains(&status) => Ok(()),
        Some(status) => {
            let detail = probe
                .error
                .or(probe.message)
                .unwrap_or_else(|| "pas de détail".to_string());
            Err(FetchError::malformed(
                context,
                format!("statut {status} : {detail}"),
            ))
        }
        None => Err(FetchError::malformed(context, "champ status manquant")),
    }
}

fn non_empty(url: Option<String>) -> Option<String> {
    url.filter(|u| !u.trim().is_empty())
}

/// Début du corps pour les messages d'erreur
fn snippet(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).chars().take(200).collect()
}

// ============================================================================
// Tests unitaires
// ============================================================================
