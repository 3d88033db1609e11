use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Write;

/// One row of the source file as loaded, before any repair. A price cell
/// that is empty or not numeric is kept as `None`; the date is kept verbatim
/// so the quality report can describe the file as it actually is.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawRecord {
    pub date: Option<String>,
    pub price: Option<f64>,
}

/// One row of the cleaned working table. After the cleaner stage records
/// are unique per date and sorted ascending.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceRecord {
    pub date: NaiveDate,
    pub price: f64,
}

/// Data-quality counts computed once over the raw table at load time.
/// Immutable afterwards; attached to the run as metadata and never used to
/// mutate the working table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityReport {
    pub total_rows: usize,
    pub missing_dates: usize,
    pub missing_prices: usize,
    pub duplicate_dates: usize,
    pub negative_prices: usize,
    pub zero_prices: usize,
    pub price_min: Option<f64>,
    pub price_max: Option<f64>,
    /// True only if every non-null raw date parses with the configured
    /// format. Predicts what the cleaner's date-parsing step will drop.
    pub dates_parseable: bool,
}

impl QualityReport {
    /// Human-readable summary for logs and notebooks.
    pub fn summary(&self) -> String {
        let price_range = match (self.price_min, self.price_max) {
            (Some(min), Some(max)) => format!("${min:.2} - ${max:.2}"),
            _ => "n/a".to_string(),
        };
        format!(
            "=== BRENT OIL DATA SUMMARY ===\n\
             Total Records: {}\n\
             Price Range: {}\n\
             \n\
             Quality Checks:\n\
             - Missing Dates: {}\n\
             - Missing Prices: {}\n\
             - Duplicate Dates: {}\n\
             - Negative Prices: {}\n\
             - Zero Prices: {}\n\
             - Dates Parseable: {}\n\
             ==============================",
            self.total_rows,
            price_range,
            self.missing_dates,
            self.missing_prices,
            self.duplicate_dates,
            self.negative_prices,
            self.zero_prices,
            self.dates_parseable,
        )
    }
}

/// Quality counts from the loader plus repair counts from the cleaner.
/// Lets the caller judge whether the repair volume is acceptable; the
/// pipeline itself only fails on the terminal errors in
/// [`crate::errors::PipelineError`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunDiagnostics {
    pub quality: QualityReport,
    pub rows_loaded: usize,
    pub dropped_unparseable_dates: usize,
    pub duplicate_dates_dropped: usize,
    pub filled_missing_prices: usize,
    pub dropped_missing_prices: usize,
    pub dropped_outliers: usize,
    pub rows_clean: usize,
}

impl RunDiagnostics {
    pub fn new(quality: QualityReport) -> Self {
        let rows_loaded = quality.total_rows;
        Self {
            quality,
            rows_loaded,
            dropped_unparseable_dates: 0,
            duplicate_dates_dropped: 0,
            filled_missing_prices: 0,
            dropped_missing_prices: 0,
            dropped_outliers: 0,
            rows_clean: 0,
        }
    }

    /// Diagnostics as a plain mapping, the exchange format promised to
    /// callers (CLI, dashboards) that do not link against this crate's types.
    pub fn as_map(&self) -> BTreeMap<String, serde_json::Value> {
        match serde_json::to_value(self) {
            Ok(serde_json::Value::Object(map)) => map.into_iter().collect(),
            _ => BTreeMap::new(),
        }
    }
}

/// One row of the final feature table: the cleaned price record extended
/// with the derived families. Windowed columns are keyed by their configured
/// window/lag so the set of columns follows the configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureRecord {
    pub date: NaiveDate,
    pub price: f64,
    pub log_price: f64,
    /// None on the first row: no prior observation.
    pub log_return: Option<f64>,
    pub simple_return: Option<f64>,
    /// Annualized rolling stdev of log returns, keyed by window (days).
    pub volatility: BTreeMap<usize, Option<f64>>,
    pub year: i32,
    pub month: u32,
    pub quarter: u32,
    pub day_of_year: u32,
    /// Monday = 0 .. Sunday = 6.
    pub day_of_week: u32,
    pub moving_average: BTreeMap<usize, f64>,
    pub price_to_ma: BTreeMap<usize, f64>,
    /// `price[t] - price[t - lag]`, keyed by lag; None while `t < lag`.
    pub momentum: BTreeMap<usize, Option<f64>>,
    pub cumulative_return: f64,
}

/// The ordered feature table plus the window/lag lists that drive column
/// order in the CSV export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureTable {
    pub records: Vec<FeatureRecord>,
    pub volatility_windows: Vec<usize>,
    pub ma_windows: Vec<usize>,
    pub momentum_lags: Vec<usize>,
}

impl FeatureTable {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Column names in export order.
    pub fn column_names(&self) -> Vec<String> {
        let mut names = vec![
            "Date".to_string(),
            "Price".to_string(),
            "Log_Price".to_string(),
            "Log_Return".to_string(),
            "Simple_Return".to_string(),
        ];
        for w in &self.volatility_windows {
            names.push(format!("Volatility_{w}d"));
        }
        names.extend(
            ["Year", "Month", "Quarter", "DayOfYear", "DayOfWeek"]
                .iter()
                .map(|s| s.to_string()),
        );
        for w in &self.ma_windows {
            names.push(format!("MA_{w}"));
        }
        for w in &self.ma_windows {
            names.push(format!("Price_to_MA_{w}"));
        }
        for lag in &self.momentum_lags {
            names.push(format!("Momentum_{lag}d"));
        }
        names.push("Cumulative_Return".to_string());
        names
    }

    /// Serialize the table to CSV. Null cells are written empty so the file
    /// round-trips through pandas and spreadsheet tools.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), csv::Error> {
        let mut out = csv::Writer::from_writer(writer);
        out.write_record(self.column_names())?;
        for record in &self.records {
            let mut row: Vec<String> = vec![
                record.date.format("%Y-%m-%d").to_string(),
                record.price.to_string(),
                record.log_price.to_string(),
                opt_cell(record.log_return),
                opt_cell(record.simple_return),
            ];
            for w in &self.volatility_windows {
                row.push(opt_cell(record.volatility.get(w).copied().flatten()));
            }
            row.push(record.year.to_string());
            row.push(record.month.to_string());
            row.push(record.quarter.to_string());
            row.push(record.day_of_year.to_string());
            row.push(record.day_of_week.to_string());
            for w in &self.ma_windows {
                row.push(opt_cell(record.moving_average.get(w).copied()));
            }
            for w in &self.ma_windows {
                row.push(opt_cell(record.price_to_ma.get(w).copied()));
            }
            for lag in &self.momentum_lags {
                row.push(opt_cell(record.momentum.get(lag).copied().flatten()));
            }
            row.push(record.cumulative_return.to_string());
            out.write_record(&row)?;
        }
        out.flush()?;
        Ok(())
    }
}

fn opt_cell(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}
