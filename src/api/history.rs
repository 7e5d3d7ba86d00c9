// ============================================================================
// Découpage historique
// ============================================================================
// Polygon limite le nombre de chandelles par requête et le nombre de
// requêtes par minute. Une longue période est donc :
// 1. découpée en sous-fenêtres contiguës qui restent sous la limite
// 2. récupérée fenêtre par fenêtre (pagination comprise)
// 3. rythmée : une pause après chaque groupe de N requêtes
//
// CONCEPT : Tout est séquentiel
// - Une seule requête en vol à la fois
// - La série accumulée appartient à l'appel en cours
// ============================================================================

use std::time::Duration;

use tracing::{debug, info, instrument, warn};

use crate::api::http::HttpFetch;
use crate::api::polygon::PolygonClient;
use crate::error::{FetchError, Result};
use crate::models::{Candle, RangeRequest, Timespan};
use crate::time::to_local_text;

/// Découpe [start, end) en fenêtres contiguës de largeur `step`
///
/// La dernière fenêtre est tronquée à `end`. Pas de fenêtre vide en fin de
/// découpage, et aucune fenêtre si `start >= end`.
pub fn split_windows(start: i64, end: i64, step: i64) -> Vec<(i64, i64)> {
    let step = step.max(1);
    let mut windows = Vec::new();
    let mut current = start;
    while current < end {
        let next = current.saturating_add(step).min(end);
        windows.push((current, next));
        current = next;
    }
    windows
}

/// Largeur d'une sous-fenêtre en millisecondes : cap x multiplier x unité
pub fn window_step_millis(item_cap: u32, multiplier: u32, timespan: Timespan) -> i64 {
    i64::from(item_cap)
        .saturating_mul(i64::from(multiplier))
        .saturating_mul(timespan.base_millis())
}

/// Rythme les requêtes : pause de `cooldown` après chaque groupe de `every`
///
/// Pas de pause après la dernière requête : `remaining` indique s'il reste
/// du travail derrière.
#[derive(Debug)]
pub struct RequestPacer {
    every: u32,
    cooldown: Duration,
    issued: u32,
    pauses: u32,
}

impl RequestPacer {
    pub fn new(every: u32, cooldown: Duration) -> Self {
        Self {
            every: every.max(1),
            cooldown,
            issued: 0,
            pauses: 0,
        }
    }

    /// À appeler après chaque requête terminée
    pub async fn request_done(&mut self, remaining: bool) {
        self.issued += 1;
        if self.issued % self.every != 0 || !remaining {
            return;
        }

        self.pauses += 1;
        if self.cooldown.is_zero() {
            return;
        }
        info!(
            requests = self.issued,
            cooldown_secs = self.cooldown.as_secs_f64(),
            "Rate limit cool-down before next request"
        );
        tokio::time::sleep(self.cooldown).await;
    }

    pub fn issued(&self) -> u32 {
        self.issued
    }

    pub fn pauses(&self) -> u32 {
        self.pauses
    }
}

impl<F: HttpFetch> PolygonClient<F> {
    /// Récupère une longue période en la découpant en sous-requêtes
    ///
    /// La série retournée respecte l'ordre des fenêtres, puis l'ordre de
    /// réponse du fournisseur. Polygon inclut la borne de fin : une chandelle
    /// posée exactement sur la frontière entre deux fenêtres arrive deux fois,
    /// le doublon est retiré. Seule une copie identique (tous champs égaux)
    /// est retirée, une chandelle différente au même timestamp est gardée.
    ///
    /// Chaque requête HTTP de fenêtre compte pour le rythme, tentatives
    /// après erreur réseau comprises.
    ///
    /// `start == end` : aucune requête, série vide.
    #[instrument(skip(self, timespan), fields(timespan = %timespan))]
    pub async fn fetch_historical(
        &self,
        ticker: &str,
        start: i64,
        end: i64,
        multiplier: u32,
        timespan: Timespan,
        item_cap: u32,
    ) -> Result<Vec<Candle>> {
        if start > end {
            return Err(FetchError::invalid_format(
                format!("{start}..{end}"),
                "start doit précéder end",
            ));
        }
        if multiplier == 0 {
            return Err(FetchError::invalid_format("0", "multiplier doit être > 0"));
        }
        if item_cap == 0 {
            return Err(FetchError::invalid_format("0", "item_cap doit être > 0"));
        }

        let step = window_step_millis(item_cap, multiplier, timespan);
        let windows = split_windows(start, end, step);
        info!(windows = windows.len(), step_ms = step, "Starting historical fetch");

        let config = self.config();
        let mut pacer = RequestPacer::new(config.requests_per_cooldown, config.cooldown);
        let mut candles: Vec<Candle> = Vec::new();
        let mut duplicates = 0usize;

        for (i, &(window_start, window_end)) in windows.iter().enumerate() {
            let batch = self
                .fetch_window(&mut pacer, ticker, window_start, window_end, multiplier, timespan)
                .await?;

            let mut fresh = batch.as_slice();
            if let Some(last) = candles.last().copied() {
                let skip = fresh.iter().take_while(|c| **c == last).count();
                duplicates += skip;
                fresh = &fresh[skip..];
            }
            candles.extend_from_slice(fresh);

            info!(
                window = i + 1,
                total = windows.len(),
                from = %to_local_text(window_start),
                to = %to_local_text(window_end),
                candles = candles.len(),
                "Query complete"
            );

            pacer.request_done(i + 1 < windows.len()).await;
        }

        if duplicates > 0 {
            debug!(duplicates, "Dropped boundary duplicates");
        }
        info!(
            candles = candles.len(),
            requests = pacer.issued(),
            pauses = pacer.pauses(),
            "Historical fetch complete"
        );
        Ok(candles)
    }

    /// Variante qui prend une RangeRequest déjà construite (et la valide)
    pub async fn fetch_range(&self, request: &RangeRequest) -> Result<Vec<Candle>> {
        request.validate()?;
        self.fetch_historical(
            &request.ticker,
            request.start,
            request.end,
            request.multiplier,
            request.timespan,
            self.config().item_cap,
        )
        .await
    }

    /// Une sous-fenêtre, retentée sur erreur réseau si max_retries > 0
    ///
    /// Une erreur de décodage ou de format n'est jamais retentée : sauter une
    /// fenêtre laisserait un trou dans la série. Chaque tentative ratée est
    /// comptée par le pacer avant la suivante.
    async fn fetch_window(
        &self,
        pacer: &mut RequestPacer,
        ticker: &str,
        start: i64,
        end: i64,
        multiplier: u32,
        timespan: Timespan,
    ) -> Result<Vec<Candle>> {
        let max_retries = self.config().max_retries;
        let mut backoff = self.config().retry_backoff;
        let mut attempt = 0u32;

        loop {
            match self.fetch_candles(ticker, start, end, multiplier, timespan).await {
                Ok(batch) => return Ok(batch),
                Err(err) if err.is_transport() && attempt < max_retries => {
                    attempt += 1;
                    warn!(attempt, max_retries, error = %err, "Transport error, retrying window");
                    pacer.request_done(true).await;
                    tokio::time::sleep(backoff).await;
                    backoff = backoff.saturating_mul(2);
                }
                Err(err) => return Err(err),
            }
        }
    }
}

// ============================================================================
// Tests unitaires
// ============================================================================
