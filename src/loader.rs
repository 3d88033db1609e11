use std::path::Path;

use csv::ReaderBuilder;
use tracing::{info, warn};

use crate::config::PipelineConfig;
use crate::errors::PipelineError;
use crate::models::{QualityReport, RawRecord};

/// Delimiters attempted, in priority order.
const DELIMITERS: [u8; 3] = [b',', b'\t', b';'];

/// Load the source file into raw records and compute the quality report.
///
/// Delimiter detection tries comma, tab and semicolon; a delimiter is
/// accepted only if the normalized header contains both configured columns.
/// The raw values are kept verbatim so the report describes the file as-is;
/// nothing is repaired here.
pub fn load(
    path: &Path,
    config: &PipelineConfig,
) -> Result<(Vec<RawRecord>, QualityReport), PipelineError> {
    info!("Loading data from {}", path.display());

    if !path.exists() {
        return Err(PipelineError::SourceNotFound {
            path: path.to_path_buf(),
        });
    }
    let content =
        std::fs::read_to_string(path).map_err(|e| PipelineError::UnparseableSource {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

    let date_column = normalize_column(&config.schema.date_column);
    let price_column = normalize_column(&config.schema.price_column);

    // Headers of the best structurally-valid attempt, kept for the
    // SchemaMismatch message if no delimiter yields the required columns.
    let mut best_headers: Option<Vec<String>> = None;

    for (attempt, &delimiter) in DELIMITERS.iter().enumerate() {
        let parsed = match parse_with_delimiter(&content, delimiter) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(
                    "Delimiter {:?} failed on {}: {}",
                    delimiter as char,
                    path.display(),
                    e
                );
                continue;
            }
        };

        let date_idx = parsed.headers.iter().position(|h| *h == date_column);
        let price_idx = parsed.headers.iter().position(|h| *h == price_column);

        if let (Some(date_idx), Some(price_idx)) = (date_idx, price_idx) {
            if attempt > 0 {
                warn!(
                    "Standard read failed, using delimiter {:?}",
                    delimiter as char
                );
            }
            let records = to_raw_records(&parsed.rows, date_idx, price_idx);
            let report = quality_report(&records, &config.date_format);
            info!("Loaded {} rows", records.len());
            return Ok((records, report));
        }

        let replace = best_headers
            .as_ref()
            .map(|prev| parsed.headers.len() > prev.len())
            .unwrap_or(true);
        if replace {
            best_headers = Some(parsed.headers);
        }
    }

    match best_headers {
        Some(found) => {
            let missing = [date_column, price_column]
                .into_iter()
                .filter(|required| !found.contains(required))
                .collect();
            Err(PipelineError::SchemaMismatch { missing, found })
        }
        None => Err(PipelineError::UnparseableSource {
            path: path.to_path_buf(),
            reason: "no supported delimiter produced a valid table (tried ',', '\\t', ';')"
                .to_string(),
        }),
    }
}

struct ParsedTable {
    headers: Vec<String>,
    rows: Vec<csv::StringRecord>,
}

fn parse_with_delimiter(content: &str, delimiter: u8) -> Result<ParsedTable, csv::Error> {
    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .from_reader(content.as_bytes());
    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(normalize_column)
        .collect();
    let rows = reader.records().collect::<Result<Vec<_>, _>>()?;
    Ok(ParsedTable { headers, rows })
}

/// Trim and title-case a header name: `" brent PRICE "` becomes
/// `"Brent Price"`, `"date"` becomes `"Date"`.
fn normalize_column(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut at_word_start = true;
    for c in name.trim().chars() {
        if c.is_alphabetic() {
            if at_word_start {
                out.extend(c.to_uppercase());
            } else {
                out.extend(c.to_lowercase());
            }
            at_word_start = false;
        } else {
            out.push(c);
            at_word_start = true;
        }
    }
    out
}

fn to_raw_records(rows: &[csv::StringRecord], date_idx: usize, price_idx: usize) -> Vec<RawRecord> {
    rows.iter()
        .map(|row| {
            let date = row
                .get(date_idx)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string);
            let price = row
                .get(price_idx)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .and_then(|s| s.parse::<f64>().ok());
            RawRecord { date, price }
        })
        .collect()
}

/// Quality checks over the raw, unrepaired table. The trial date parse only
/// sets the `dates_parseable` flag; the stored raw values are untouched.
fn quality_report(records: &[RawRecord], date_format: &str) -> QualityReport {
    let missing_dates = records.iter().filter(|r| r.date.is_none()).count();
    let missing_prices = records.iter().filter(|r| r.price.is_none()).count();

    let mut seen = std::collections::HashSet::new();
    let duplicate_dates = records
        .iter()
        .filter_map(|r| r.date.as_deref())
        .filter(|d| !seen.insert(d.to_string()))
        .count();

    let prices: Vec<f64> = records.iter().filter_map(|r| r.price).collect();
    let negative_prices = prices.iter().filter(|&&p| p < 0.0).count();
    let zero_prices = prices.iter().filter(|&&p| p == 0.0).count();
    let price_min = prices.iter().copied().reduce(f64::min);
    let price_max = prices.iter().copied().reduce(f64::max);

    let dates_parseable = records
        .iter()
        .filter_map(|r| r.date.as_deref())
        .all(|d| chrono::NaiveDate::parse_from_str(d, date_format).is_ok());

    QualityReport {
        total_rows: records.len(),
        missing_dates,
        missing_prices,
        duplicate_dates,
        negative_prices,
        zero_prices,
        price_min,
        price_max,
        dates_parseable,
    }
}
