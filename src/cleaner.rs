use chrono::NaiveDate;
use tracing::{info, warn};

use crate::config::{MissingPriceStrategy, OutlierStrategy, PipelineConfig};
use crate::errors::PipelineError;
use crate::models::{PriceRecord, RawRecord, RunDiagnostics};
use crate::stats;

/// A row between date parsing and missing-price handling: the date is valid,
/// the price may still be null.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParsedRow {
    pub date: NaiveDate,
    pub price: Option<f64>,
}

/// Run the full cleaning stage in canonical order: parse dates, sort,
/// deduplicate dates, handle missing prices, filter outliers. Defects are
/// repaired or dropped and counted; the only fatal outcome is a table with
/// no rows left, signalled as [`PipelineError::EmptyDataset`].
pub fn clean(
    raw: Vec<RawRecord>,
    config: &PipelineConfig,
    diagnostics: &mut RunDiagnostics,
) -> Result<Vec<PriceRecord>, PipelineError> {
    let mut rows = parse_dates(raw, &config.date_format, diagnostics);
    sort_by_date(&mut rows);
    let rows = dedupe_dates(rows, diagnostics);
    let records = handle_missing_prices(rows, config.missing_price_strategy, diagnostics);
    let records = remove_outliers(records, config.outlier_strategy, diagnostics);

    if records.is_empty() {
        return Err(PipelineError::EmptyDataset);
    }
    diagnostics.rows_clean = records.len();
    info!("Cleaning complete: {} rows", records.len());
    Ok(records)
}

/// Parse the raw date strings with the configured format. Rows whose date is
/// missing or does not parse are dropped and counted, never fatal.
pub fn parse_dates(
    raw: Vec<RawRecord>,
    date_format: &str,
    diagnostics: &mut RunDiagnostics,
) -> Vec<ParsedRow> {
    info!("Parsing dates with format: {date_format}");
    let total = raw.len();
    let rows: Vec<ParsedRow> = raw
        .into_iter()
        .filter_map(|record| {
            let date = record
                .date
                .as_deref()
                .and_then(|d| NaiveDate::parse_from_str(d, date_format).ok())?;
            Some(ParsedRow {
                date,
                price: record.price,
            })
        })
        .collect();

    let dropped = total - rows.len();
    if dropped > 0 {
        warn!("Dropping {dropped} rows with invalid dates");
        diagnostics.dropped_unparseable_dates += dropped;
    }
    rows
}

/// Sort ascending by date. Stable, so duplicate dates keep file order.
pub fn sort_by_date(rows: &mut [ParsedRow]) {
    rows.sort_by_key(|row| row.date);
}

/// Keep the first row per date. The clean table must be unique per day for
/// every trailing-window derivation downstream; the removals are surfaced in
/// the diagnostics rather than silently merged.
pub fn dedupe_dates(rows: Vec<ParsedRow>, diagnostics: &mut RunDiagnostics) -> Vec<ParsedRow> {
    let total = rows.len();
    let mut out: Vec<ParsedRow> = Vec::with_capacity(total);
    for row in rows {
        if out.last().map(|last| last.date) == Some(row.date) {
            continue;
        }
        out.push(row);
    }
    let dropped = total - out.len();
    if dropped > 0 {
        warn!("Dropping {dropped} duplicate-date rows (keeping first occurrence)");
        diagnostics.duplicate_dates_dropped += dropped;
    }
    out
}

/// Apply the configured missing-price strategy, then drop any row whose
/// price is still null (a leading run that interpolation or forward fill
/// cannot reach). Expects rows already sorted by date.
pub fn handle_missing_prices(
    mut rows: Vec<ParsedRow>,
    strategy: MissingPriceStrategy,
    diagnostics: &mut RunDiagnostics,
) -> Vec<PriceRecord> {
    let missing = rows.iter().filter(|r| r.price.is_none()).count();
    if missing > 0 {
        info!("Handling {missing} missing prices using {strategy:?}");
        match strategy {
            MissingPriceStrategy::Interpolate => interpolate_prices(&mut rows),
            MissingPriceStrategy::ForwardFill => forward_fill_prices(&mut rows),
            MissingPriceStrategy::Drop => {}
            MissingPriceStrategy::Mean => {
                let known: Vec<f64> = rows.iter().filter_map(|r| r.price).collect();
                if let Some(mean) = stats::mean(&known) {
                    for row in rows.iter_mut() {
                        row.price.get_or_insert(mean);
                    }
                }
            }
        }
    }

    let mut dropped = 0;
    let records: Vec<PriceRecord> = rows
        .into_iter()
        .filter_map(|row| match row.price {
            Some(price) => Some(PriceRecord {
                date: row.date,
                price,
            }),
            None => {
                dropped += 1;
                None
            }
        })
        .collect();

    if missing > 0 {
        diagnostics.filled_missing_prices += missing - dropped;
        diagnostics.dropped_missing_prices += dropped;
        if dropped > 0 {
            warn!("Dropping {dropped} rows whose price could not be repaired");
        }
    }
    records
}

/// Linear interpolation between the nearest non-null neighbors by position.
/// Trailing nulls extend the last observed value; leading nulls stay null.
fn interpolate_prices(rows: &mut [ParsedRow]) {
    let mut prev_known: Option<(usize, f64)> = None;
    let mut gap_start: Option<usize> = None;

    for i in 0..rows.len() {
        match rows[i].price {
            Some(price) => {
                if let (Some(start), Some((prev_idx, prev_price))) = (gap_start, prev_known) {
                    let span = (i - prev_idx) as f64;
                    for k in start..i {
                        let t = (k - prev_idx) as f64 / span;
                        rows[k].price = Some(prev_price + t * (price - prev_price));
                    }
                }
                prev_known = Some((i, price));
                gap_start = None;
            }
            None => {
                if gap_start.is_none() {
                    gap_start = Some(i);
                }
            }
        }
    }

    // Trailing gap: no right neighbor, extend the last known value.
    if let (Some(start), Some((_, prev_price))) = (gap_start, prev_known) {
        for row in rows[start..].iter_mut() {
            row.price = Some(prev_price);
        }
    }
}

fn forward_fill_prices(rows: &mut [ParsedRow]) {
    let mut last: Option<f64> = None;
    for row in rows.iter_mut() {
        match row.price {
            Some(price) => last = Some(price),
            None => row.price = last,
        }
    }
}

/// Optional outlier filter. Fences are computed on the price level series,
/// exactly as the upstream analysis does; note that this can remove a
/// genuine large one-day move, which is why the default is `None`.
pub fn remove_outliers(
    records: Vec<PriceRecord>,
    strategy: OutlierStrategy,
    diagnostics: &mut RunDiagnostics,
) -> Vec<PriceRecord> {
    let prices: Vec<f64> = records.iter().map(|r| r.price).collect();
    let keep: Box<dyn Fn(f64) -> bool> = match strategy {
        OutlierStrategy::None => return records,
        OutlierStrategy::Iqr => {
            let Some((q1, q3)) = stats::quartiles(&prices) else {
                return records;
            };
            let iqr = q3 - q1;
            let (lo, hi) = (q1 - 1.5 * iqr, q3 + 1.5 * iqr);
            Box::new(move |p| p >= lo && p <= hi)
        }
        OutlierStrategy::ZScore { threshold } => {
            let (Some(mean), Some(sd)) = (stats::mean(&prices), stats::stdev(&prices)) else {
                return records;
            };
            if sd == 0.0 {
                return records;
            }
            Box::new(move |p| ((p - mean) / sd).abs() < threshold)
        }
    };

    let total = records.len();
    let kept: Vec<PriceRecord> = records.into_iter().filter(|r| keep(r.price)).collect();
    let removed = total - kept.len();
    if removed > 0 {
        info!("Removed {removed} outliers using {strategy:?}");
        diagnostics.dropped_outliers += removed;
    }
    kept
}
