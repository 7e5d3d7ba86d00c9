// ============================================================================
// API Client : Polygon
// ============================================================================
// Construit les URLs, suit la pagination (next_url) et décode les pages
//
// CONCEPTS RUST :
// 1. Générique sur le fetcher : PolygonClient<F: HttpFetch>
// 2. Closures en paramètre : décodeur et constructeur d'URL de continuation
// 3. #[instrument] : span tracing avec les paramètres de la requête
// ============================================================================

use std::collections::HashSet;

use tracing::{debug, info, instrument};

use crate::api::decode::{decode_candle_page, decode_indicator_page, Page};
use crate::api::http::{HttpFetch, ReqwestFetcher};
use crate::config::{ApiKey, ProviderConfig};
use crate::error::{redact_url, FetchError, Result, API_KEY_PARAM};
use crate::models::{Candle, IndicatorRequest, IndicatorValue, Timespan};

/// Ajoute la clé API à une URL de continuation renvoyée par Polygon
///
/// next_url contient en général déjà "?cursor=...", la clé est alors
/// ajoutée avec '&'.
pub fn continuation_url(next_url: &str, api_key: &ApiKey) -> String {
    let separator = if next_url.contains('?') { '&' } else { '?' };
    format!("{next_url}{separator}{API_KEY_PARAM}={}", api_key.expose())
}

/// Client de l'API Polygon
pub struct PolygonClient<F = ReqwestFetcher> {
    config: ProviderConfig,
    api_key: ApiKey,
    fetcher: F,
}

impl PolygonClient<ReqwestFetcher> {
    /// Crée un client réel (reqwest)
    pub fn new(config: ProviderConfig, api_key: ApiKey) -> Result<Self> {
        config.validate()?;
        let fetcher = ReqwestFetcher::new(&config)?;
        Ok(Self {
            config,
            api_key,
            fetcher,
        })
    }
}

impl<F: HttpFetch> PolygonClient<F> {
    /// Crée un client avec un fetcher fourni (tests, proxy maison)
    pub fn with_fetcher(config: ProviderConfig, api_key: ApiKey, fetcher: F) -> Self {
        Self {
            config,
            api_key,
            fetcher,
        }
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    /// URL de l'endpoint aggregates (chandelles)
    pub fn aggregates_url(
        &self,
        ticker: &str,
        multiplier: u32,
        timespan: Timespan,
        start: i64,
        end: i64,
    ) -> String {
        format!(
            "{}/v2/aggs/ticker/{}/range/{}/{}/{}/{}?{}={}",
            self.config.base(),
            ticker,
            multiplier,
            timespan.as_str(),
            start,
            end,
            API_KEY_PARAM,
            self.api_key.expose()
        )
    }

    /// URL de l'endpoint indicators
    pub fn indicator_url(&self, request: &IndicatorRequest) -> String {
        format!(
            "{}/v1/indicators/{}/{}?timestamp.lte={}&timespan={}&series_type={}&window={}&{}={}",
            self.config.base(),
            request.kind.as_str(),
            request.ticker,
            request.timestamp_lte,
            request.timespan.as_str(),
            request.series_type.as_str(),
            request.window,
            API_KEY_PARAM,
            self.api_key.expose()
        )
    }

    /// Suit la chaîne de pagination jusqu'au bout
    ///
    /// Boucle : fetch -> decode -> append -> next_url ? -> recommence.
    /// Aucune limite de profondeur. La moindre erreur abandonne tout :
    /// les pages déjà reçues sont jetées. Un next_url déjà visité (cycle
    /// A -> B -> A) est une réponse mal formée.
    pub async fn fetch_all_pages<T, D, B>(
        &self,
        initial_url: String,
        decode: D,
        build_next: B,
    ) -> Result<Vec<T>>
    where
        D: Fn(&[u8]) -> Result<Page<T>>,
        B: Fn(&str) -> String,
    {
        let mut items = Vec::new();
        let mut url = initial_url;
        let mut visited: HashSet<String> = HashSet::new();
        let mut page_number = 0usize;

        loop {
            page_number += 1;
            let body = self.fetcher.fetch(&url).await?;
            let page = decode(&body)?;

            debug!(
                page = page_number,
                items = page.items.len(),
                url = %redact_url(&url),
                "Decoded page"
            );
            items.extend(page.items);

            match page.next_url {
                Some(next) => {
                    let next_url = build_next(&next);
                    visited.insert(std::mem::replace(&mut url, next_url));
                    if visited.contains(&url) {
                        return Err(FetchError::malformed(
                            "pagination",
                            format!("next_url déjà visité : {}", redact_url(&url)),
                        ));
                    }
                }
                None => break,
            }
        }

        debug!(pages = page_number, items = items.len(), "Pagination complete");
        Ok(items)
    }

    /// Récupère les chandelles d'une seule fenêtre (toutes pages confondues)
    #[instrument(skip(self, timespan), fields(timespan = %timespan))]
    pub async fn fetch_candles(
        &self,
        ticker: &str,
        start: i64,
        end: i64,
        multiplier: u32,
        timespan: Timespan,
    ) -> Result<Vec<Candle>> {
        let url = self.aggregates_url(ticker, multiplier, timespan, start, end);
        self.fetch_all_pages(url, decode_candle_page, |next| {
            continuation_url(next, &self.api_key)
        })
        .await
    }

    /// Récupère toutes les valeurs d'un indicateur, pagination comprise
    #[instrument(skip(self, request), fields(kind = %request.kind, ticker = %request.ticker))]
    pub async fn fetch_indicator(&self, request: &IndicatorRequest) -> Result<Vec<IndicatorValue>> {
        let url = self.indicator_url(request);
        let values = self
            .fetch_all_pages(url, decode_indicator_page, |next| {
                continuation_url(next, &self.api_key)
            })
            .await?;

        info!(values = values.len(), "Indicator fetched");
        Ok(values)
    }
}

// ============================================================================
// Tests unitaires
// ============================================================================
