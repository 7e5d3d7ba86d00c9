// ============================================================================
// Module : export
// ============================================================================
// Export / import CSV d'une série de chandelles
//
// Format (colonnes fixes) :
//   ,date,open,high,low,close,volume
//   0,2024-01-02 10:00:00,100.0000,110.0000,90.0000,105.0000,1000
//
// - 1re colonne : index de ligne (positionnel, ignoré à l'import)
// - date : heure locale, voir crate::time
// - prix : 4 décimales, volume : entier
// ============================================================================

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{FetchError, Result};
use crate::models::{Candle, Timespan};
use crate::time::{month_year_tag, to_epoch_millis, to_local_text};

/// Ligne d'en-tête
pub const CSV_HEADER: [&str; 7] = ["", "date", "open", "high", "low", "close", "volume"];

/// Écrit la série dans `path` (fichier écrasé s'il existe)
pub fn export_csv(candles: &[Candle], path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let mut writer = csv::Writer::from_path(path).map_err(|e| csv_error(path, e))?;

    writer.write_record(CSV_HEADER).map_err(|e| csv_error(path, e))?;
    for (i, c) in candles.iter().enumerate() {
        writer
            .write_record([
                i.to_string(),
                to_local_text(c.timestamp),
                format!("{:.4}", c.open),
                format!("{:.4}", c.high),
                format!("{:.4}", c.low),
                format!("{:.4}", c.close),
                format!("{:.0}", c.volume),
            ])
            .map_err(|e| csv_error(path, e))?;
    }
    writer.flush().map_err(|e| FetchError::io(path, e))?;

    info!(path = %path.display(), rows = candles.len(), "Exported candles");
    Ok(())
}

/// Relit un fichier produit par export_csv
///
/// La moindre ligne invalide (nombre de colonnes, date, nombre) fait échouer
/// tout l'import.
pub fn import_csv(path: impl AsRef<Path>) -> Result<Vec<Candle>> {
    let path = path.as_ref();
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .map_err(|e| csv_error(path, e))?;

    let mut candles = Vec::new();
    for (i, record) in reader.records().enumerate() {
        // +2 : numéro de ligne dans le fichier, en-tête compris
        let line = i + 2;
        let record = record.map_err(|e| csv_error(path, e))?;
        if record.len() != CSV_HEADER.len() {
            return Err(FetchError::malformed(
                format!("{} ligne {line}", path.display()),
                format!("{} colonnes, {} attendues", record.len(), CSV_HEADER.len()),
            ));
        }

        let context = |field: &str| format!("{} ligne {line} champ {field}", path.display());
        let timestamp = to_epoch_millis(&record[1])
            .map_err(|e| FetchError::malformed(context("date"), e))?;
        let number = |idx: usize| -> Result<f64> {
            record[idx]
                .trim()
                .parse::<f64>()
                .map_err(|e| FetchError::malformed(context(CSV_HEADER[idx]), format!("'{}' : {e}", &record[idx])))
        };

        candles.push(Candle {
            open: number(2)?,
            high: number(3)?,
            low: number(4)?,
            close: number(5)?,
            volume: number(6)?,
            timestamp,
        });
    }

    debug!(path = %path.display(), rows = candles.len(), "Imported candles");
    Ok(candles)
}

/// Nom de fichier par défaut : ohlcv-Jan24-Apr25-5minute-SPY.csv
pub fn default_export_path(
    ticker: &str,
    start: i64,
    end: i64,
    multiplier: u32,
    timespan: Timespan,
) -> PathBuf {
    PathBuf::from(format!(
        "ohlcv-{}-{}-{}{}-{}.csv",
        month_year_tag(start),
        month_year_tag(end),
        multiplier,
        timespan.as_str(),
        ticker
    ))
}

/// Distingue les erreurs d'E/S des erreurs de contenu CSV
fn csv_error(path: &Path, err: csv::Error) -> FetchError {
    if err.is_io_error() {
        match err.into_kind() {
            csv::ErrorKind::Io(io) => FetchError::io(path, io),
            other => FetchError::malformed(path.display().to_string(), format!("{other:?}")),
        }
    } else {
        FetchError::malformed(path.display().to_string(), err)
    }
}

// ============================================================================
// Tests unitaires
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn three_candles() -> Vec<Candle> {
        let t0 = to_epoch_millis("2024-01-02 10:00:00").unwrap();
        let five_min = 5 * 60 * 1000;
        vec![
            Candle::new(100.0, 110.0, 90.0, 105.0, 1000.0, t0),
            Candle::new(105.0, 108.0, 95.0, 100.0, 800.0, t0 + five_min),
            Candle::new(100.0, 103.0, 98.0, 101.0, 1200.0, t0 + 2 * five_min),
        ]
    }

    #[test]
    fn test_export_three_candles_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        export_csv(&three_candles(), &path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], ",date,open,high,low,close,volume");
        assert_eq!(
            lines[1],
            "0,2024-01-02 10:00:00,100.0000,110.0000,90.0000,105.0000,1000"
        );
        assert_eq!(
            lines[2],
            "1,2024-01-02 10:05:00,105.0000,108.0000,95.0000,100.0000,800"
        );
        assert!(lines[3].starts_with("2,2024-01-02 10:10:00,"));
        assert!(lines[3].ends_with(",1200"));
    }

    #[test]
    fn test_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rt.csv");
        let series = three_candles();
        export_csv(&series, &path).unwrap();
        assert_eq!(import_csv(&path).unwrap(), series);
    }

    #[test]
    fn test_round_trip_rounds_to_precision() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prec.csv");
        let t = to_epoch_millis("2024-06-03 09:30:00").unwrap();
        let series = vec![Candle::new(1.234567, 2.00004, 0.99996, 1.5, 1234.6, t)];
        export_csv(&series, &path).unwrap();

        let back = import_csv(&path).unwrap();
        assert_eq!(back.len(), 1);
        assert!((back[0].open - 1.2346).abs() < 1e-9);
        assert!((back[0].high - 2.0).abs() < 1e-9);
        assert!((back[0].low - 1.0).abs() < 1e-9);
        assert_eq!(back[0].volume, 1235.0);
        assert_eq!(back[0].timestamp, t);
    }

    #[test]
    fn test_export_empty_series() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.csv");
        export_csv(&[], &path).unwrap();
        assert!(import_csv(&path).unwrap().is_empty());
    }

    #[test]
    fn test_import_bad_number_aborts() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.csv");
        std::fs::write(
            &path,
            ",date,open,high,low,close,volume\n\
             0,2024-01-02 10:00:00,1.0,2.0,0.5,1.5,10\n\
             1,2024-01-02 10:05:00,abc,2.0,0.5,1.5,10\n",
        )
        .unwrap();

        match import_csv(&path).unwrap_err() {
            FetchError::Malformed { context, .. } => {
                assert!(context.contains("ligne 3"));
                assert!(context.contains("open"));
            }
            other => panic!("erreur inattendue : {other:?}"),
        }
    }

    #[test]
    fn test_import_bad_date_aborts() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad_date.csv");
        std::fs::write(
            &path,
            ",date,open,high,low,close,volume\n0,2024-01-02T10:00:00,1,2,0.5,1.5,10\n",
        )
        .unwrap();
        assert!(matches!(
            import_csv(&path),
            Err(FetchError::Malformed { .. })
        ));
    }

    #[test]
    fn test_import_wrong_column_count() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cols.csv");
        std::fs::write(
            &path,
            ",date,open,high,low,close,volume\n0,2024-01-02 10:00:00,1,2,0.5\n",
        )
        .unwrap();
        assert!(matches!(
            import_csv(&path),
            Err(FetchError::Malformed { .. })
        ));
    }

    #[test]
    fn test_import_missing_file() {
        assert!(matches!(
            import_csv("/nonexistent/dir/file.csv"),
            Err(FetchError::Io { .. })
        ));
    }

    #[test]
    fn test_default_export_path() {
        let start = to_epoch_millis("2024-01-01 10:00:00").unwrap();
        let end = to_epoch_millis("2025-04-30 16:00:00").unwrap();
        let path = default_export_path("SPY", start, end, 5, Timespan::Minute);
        assert_eq!(path, PathBuf::from("ohlcv-Jan24-Apr25-5minute-SPY.csv"));
    }
}
