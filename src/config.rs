use serde::{Deserialize, Serialize};

/// How missing prices are repaired after the table is sorted by date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingPriceStrategy {
    /// Linear interpolation between the nearest non-null neighbors by
    /// position. Trailing nulls extend the last observed value; leading
    /// nulls cannot be repaired and the rows are dropped.
    Interpolate,
    /// Propagate the last non-null price forward.
    ForwardFill,
    /// Remove rows with a missing price.
    Drop,
    /// Replace nulls with the mean of the non-null prices, computed before
    /// any fill is applied.
    Mean,
}

/// Optional outlier filter applied after missing prices are handled.
///
/// Both filters operate on the price level series, not on returns. A fence
/// on price can remove a genuine large one-day move, so the filter is
/// disabled by default and the removal count is always reported.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutlierStrategy {
    None,
    /// Drop rows outside `[Q1 - 1.5*IQR, Q3 + 1.5*IQR]`.
    Iqr,
    /// Drop rows where `|price - mean| / stdev` meets or exceeds the
    /// configured threshold.
    ZScore { threshold: f64 },
}

/// Expected columns in the source file, matched against normalized
/// (trimmed, title-cased) header names.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceSchema {
    pub date_column: String,
    pub price_column: String,
}

impl Default for SourceSchema {
    fn default() -> Self {
        Self {
            date_column: "Date".to_string(),
            price_column: "Price".to_string(),
        }
    }
}

/// Pipeline configuration. Defaults mirror the canonical Brent oil dataset;
/// every field can be overridden with the fluent `with_*` methods before the
/// run starts. The config is immutable once handed to the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub schema: SourceSchema,
    /// chrono format string for the date column, e.g. `20-May-87`.
    pub date_format: String,
    /// Windows (days) for annualized rolling volatility columns.
    pub volatility_windows: Vec<usize>,
    /// Windows (observations) for moving average and price-to-MA columns.
    pub ma_windows: Vec<usize>,
    /// Lags (days) for momentum columns.
    pub momentum_lags: Vec<usize>,
    pub missing_price_strategy: MissingPriceStrategy,
    pub outlier_strategy: OutlierStrategy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            schema: SourceSchema::default(),
            date_format: "%d-%b-%y".to_string(),
            volatility_windows: vec![7, 30, 90],
            ma_windows: vec![10, 30, 100, 200],
            momentum_lags: vec![1, 5, 10, 30],
            missing_price_strategy: MissingPriceStrategy::Interpolate,
            outlier_strategy: OutlierStrategy::None,
        }
    }
}

impl PipelineConfig {
    pub fn with_schema(mut self, date_column: &str, price_column: &str) -> Self {
        self.schema = SourceSchema {
            date_column: date_column.to_string(),
            price_column: price_column.to_string(),
        };
        self
    }

    pub fn with_date_format(mut self, format: &str) -> Self {
        self.date_format = format.to_string();
        self
    }

    pub fn with_volatility_windows(mut self, windows: Vec<usize>) -> Self {
        self.volatility_windows = windows;
        self
    }

    pub fn with_ma_windows(mut self, windows: Vec<usize>) -> Self {
        self.ma_windows = windows;
        self
    }

    pub fn with_momentum_lags(mut self, lags: Vec<usize>) -> Self {
        self.momentum_lags = lags;
        self
    }

    pub fn with_missing_price_strategy(mut self, strategy: MissingPriceStrategy) -> Self {
        self.missing_price_strategy = strategy;
        self
    }

    pub fn with_outlier_strategy(mut self, strategy: OutlierStrategy) -> Self {
        self.outlier_strategy = strategy;
        self
    }
}
