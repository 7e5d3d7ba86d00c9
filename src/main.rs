// ============================================================================
// candlefetch - Point d'entrée
// ============================================================================
// Récupère des chandelles et des indicateurs depuis Polygon, exporte en CSV
//
// Sous-commandes :
// - fetch     : période historique -> fichier CSV
// - indicator : SMA / EMA / RSI -> stdout
// - inspect   : relit un CSV et affiche un résumé
// ============================================================================

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{error, info};

use candlefetch::api::PolygonClient;
use candlefetch::config::{ApiKey, ProviderConfig, DEFAULT_BASE_URL, DEFAULT_ITEM_CAP};
use candlefetch::export::{default_export_path, export_csv, import_csv};
use candlefetch::models::{
    highest_candle, IndicatorKind, IndicatorRequest, RangeRequest, SeriesField, Timespan,
};
use candlefetch::time::{to_epoch_millis, to_local_text};

// ============================================================================
// Arguments de la ligne de commande
// ============================================================================

#[derive(Debug, Parser)]
#[command(author, version, about = "Historique OHLCV et indicateurs Polygon", long_about = None)]
struct Cli {
    /// Fichier contenant la clé API
    #[arg(long, global = true, default_value = "API_KEY.secret")]
    api_key_file: PathBuf,

    /// URL de base de l'API
    #[arg(long, global = true, default_value = DEFAULT_BASE_URL)]
    base_url: String,

    /// Pause (secondes) après chaque groupe de requêtes
    #[arg(long, global = true, default_value_t = 60)]
    cooldown_secs: u64,

    /// Nouvelles tentatives sur erreur réseau, par fenêtre
    #[arg(long, global = true, default_value_t = 0)]
    max_retries: u32,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Télécharge une période et l'exporte en CSV
    Fetch {
        #[arg(long)]
        ticker: String,

        /// Début, "YYYY-MM-DD HH:MM:SS" (heure locale)
        #[arg(long)]
        start: String,

        /// Fin, "YYYY-MM-DD HH:MM:SS" (heure locale)
        #[arg(long)]
        end: String,

        #[arg(long, default_value_t = 5)]
        multiplier: u32,

        #[arg(long, default_value = "minute")]
        timespan: Timespan,

        /// Chandelles maximum par requête
        #[arg(long, default_value_t = DEFAULT_ITEM_CAP)]
        item_cap: u32,

        /// Fichier de sortie (par défaut : ohlcv-<début>-<fin>-<largeur>-<ticker>.csv)
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Affiche les valeurs d'un indicateur
    Indicator {
        #[arg(long, default_value = "sma")]
        kind: IndicatorKind,

        #[arg(long)]
        ticker: String,

        /// Borne haute, "YYYY-MM-DD HH:MM:SS" (heure locale)
        #[arg(long)]
        timestamp_lte: String,

        #[arg(long, default_value = "day")]
        timespan: Timespan,

        #[arg(long, default_value = "close")]
        series: SeriesField,

        #[arg(long, default_value_t = 50)]
        window: u32,
    },

    /// Relit un CSV exporté et affiche un résumé
    Inspect {
        #[arg(long)]
        input: PathBuf,

        #[arg(long, default_value = "close")]
        series: SeriesField,

        /// Nombre de dernières chandelles pour la recherche du plus haut
        #[arg(long, default_value_t = 20)]
        last: usize,
    },
}

impl Cli {
    fn provider_config(&self) -> ProviderConfig {
        ProviderConfig {
            base_url: self.base_url.clone(),
            cooldown: Duration::from_secs(self.cooldown_secs),
            max_retries: self.max_retries,
            ..ProviderConfig::default()
        }
    }
}

// ============================================================================
// Initialisation du logging
// ============================================================================

/// Initialise le système de logging vers fichier
///
/// Les logs sont écrits dans :
/// - Linux : ~/.local/share/candlefetch/logs/candlefetch.log
/// - macOS : ~/Library/Application Support/candlefetch/logs/candlefetch.log
/// - Sinon : ./logs/candlefetch.log
///
/// # Utilisation
/// ```bash
/// RUST_LOG=debug candlefetch fetch ...
/// RUST_LOG=candlefetch=trace candlefetch fetch ...
/// ```
fn init_logging() -> Result<()> {
    use tracing_appender::rolling::{RollingFileAppender, Rotation};
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let log_dir = dirs::data_local_dir()
        .map(|dir| dir.join("candlefetch").join("logs"))
        .unwrap_or_else(|| PathBuf::from("./logs"));

    std::fs::create_dir_all(&log_dir).context("Échec de la création du répertoire de logs")?;

    let file_appender = RollingFileAppender::new(Rotation::DAILY, log_dir.clone(), "candlefetch.log");

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(file_appender)
                .with_ansi(false)
                .with_target(true)
                .with_line_number(true),
        )
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "candlefetch=debug,info".into()),
        )
        .init();

    info!(?log_dir, "Logging initialisé");
    Ok(())
}

// ============================================================================
// Point d'entrée du programme
// ============================================================================

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging().unwrap_or_else(|e| {
        eprintln!("⚠️  Warning: Failed to initialize logging: {}", e);
        eprintln!("   Continuing without logging...");
    });

    let runtime = tokio::runtime::Runtime::new()?;
    let result = runtime.block_on(run(cli));

    match &result {
        Ok(_) => info!("candlefetch exited normally"),
        Err(e) => error!(error = ?e, "candlefetch exited with error"),
    }
    result
}

async fn run(cli: Cli) -> Result<()> {
    match &cli.command {
        Command::Fetch {
            ticker,
            start,
            end,
            multiplier,
            timespan,
            item_cap,
            output,
        } => {
            let start_ms = to_epoch_millis(start).context("Date de début invalide")?;
            let end_ms = to_epoch_millis(end).context("Date de fin invalide")?;
            let request = RangeRequest::new(ticker.as_str(), start_ms, end_ms, *multiplier, *timespan);
            request.validate().context("Requête invalide")?;

            let config = ProviderConfig {
                item_cap: *item_cap,
                ..cli.provider_config()
            };
            let client = build_client(&cli, config)?;

            println!("📊 Téléchargement de {} du {} au {}...", ticker, start, end);
            let candles = client
                .fetch_range(&request)
                .await
                .with_context(|| format!("Échec du téléchargement de {}", ticker))?;

            let path = output.clone().unwrap_or_else(|| {
                default_export_path(ticker, start_ms, end_ms, *multiplier, *timespan)
            });
            export_csv(&candles, &path)
                .with_context(|| format!("Échec de l'export vers {}", path.display()))?;

            println!("✅ {} chandelles écrites dans {}", candles.len(), path.display());
        }

        Command::Indicator {
            kind,
            ticker,
            timestamp_lte,
            timespan,
            series,
            window,
        } => {
            let request = IndicatorRequest {
                kind: *kind,
                ticker: ticker.clone(),
                timestamp_lte: to_epoch_millis(timestamp_lte).context("Borne timestamp.lte invalide")?,
                timespan: *timespan,
                series_type: *series,
                window: *window,
            };
            let client = build_client(&cli, cli.provider_config())?;

            let values = client
                .fetch_indicator(&request)
                .await
                .with_context(|| format!("Échec de la récupération de {} pour {}", kind, ticker))?;

            println!("{} {} ({} sur {}, fenêtre {})", kind, ticker, timespan, series, window);
            for v in &values {
                println!("  {}  {:.4}", to_local_text(v.timestamp), v.value);
            }
            println!("{} valeurs", values.len());
        }

        Command::Inspect { input, series, last } => {
            let candles = import_csv(input)
                .with_context(|| format!("Échec de l'import de {}", input.display()))?;

            println!("{} chandelles dans {}", candles.len(), input.display());
            if let (Some(first), Some(latest)) = (candles.first(), candles.last()) {
                println!(
                    "  du {} au {}",
                    to_local_text(first.timestamp),
                    to_local_text(latest.timestamp)
                );
            }
            let bullish = candles.iter().filter(|c| c.is_bullish()).count();
            println!("  {} haussières, {} autres", bullish, candles.len() - bullish);
            match highest_candle(&candles, *series, *last) {
                Some(i) => println!("Plus haut ({} sur les {} dernières) : #{}\n{}", series, last, i, candles[i]),
                None => println!("Aucune chandelle à analyser"),
            }
        }
    }
    Ok(())
}

/// Lit la clé API et crée le client
fn build_client(cli: &Cli, config: ProviderConfig) -> Result<PolygonClient> {
    let api_key = ApiKey::from_file(&cli.api_key_file).with_context(|| {
        format!("Impossible de lire la clé API depuis {}", cli.api_key_file.display())
    })?;
    PolygonClient::new(config, api_key).context("Échec de la création du client HTTP")
}
