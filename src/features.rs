use chrono::Datelike;
use tracing::info;

use crate::config::PipelineConfig;
use crate::errors::PipelineError;
use crate::models::{FeatureRecord, FeatureTable, PriceRecord};
use crate::stats;

/// Trading days per year, used to annualize rolling volatility.
const TRADING_DAYS: f64 = 252.0;

/// Derive the feature table from the clean, sorted, unique-by-date records.
///
/// Every derivation is a pure function of the price and date columns and
/// uses trailing windows only. The row count is preserved exactly; rows with
/// insufficient history get null entries, never zeros.
///
/// Fails with [`PipelineError::NonPositivePrice`] if any price is zero or
/// negative, since the log transform is undefined there.
pub fn engineer(
    records: &[PriceRecord],
    config: &PipelineConfig,
) -> Result<FeatureTable, PipelineError> {
    if let Some(bad) = records.iter().find(|r| r.price <= 0.0) {
        return Err(PipelineError::NonPositivePrice {
            date: bad.date,
            price: bad.price,
        });
    }

    let prices: Vec<f64> = records.iter().map(|r| r.price).collect();

    info!("Calculating returns...");
    let log_price: Vec<f64> = prices.iter().map(|p| p.ln()).collect();
    let log_return = diff(&log_price);
    let simple_return: Vec<Option<f64>> = prices
        .iter()
        .enumerate()
        .map(|(i, &p)| (i > 0).then(|| p / prices[i - 1] - 1.0))
        .collect();

    info!(
        "Calculating volatility for windows: {:?}",
        config.volatility_windows
    );
    let volatility: Vec<(usize, Vec<Option<f64>>)> = config
        .volatility_windows
        .iter()
        .map(|&w| (w, annualized_volatility(&log_return, w)))
        .collect();

    info!("Adding moving averages: {:?}", config.ma_windows);
    let moving_average: Vec<(usize, Vec<f64>)> = config
        .ma_windows
        .iter()
        .map(|&w| (w, stats::rolling_mean(&prices, w)))
        .collect();

    let momentum: Vec<(usize, Vec<Option<f64>>)> = config
        .momentum_lags
        .iter()
        .map(|&lag| {
            let series: Vec<Option<f64>> = prices
                .iter()
                .enumerate()
                .map(|(i, &p)| (lag > 0 && i >= lag).then(|| p - prices[i - lag]))
                .collect();
            (lag, series)
        })
        .collect();

    let cumulative_return = cumulative_returns(&simple_return);

    let out: Vec<FeatureRecord> = records
        .iter()
        .enumerate()
        .map(|(i, record)| {
            let date = record.date;
            FeatureRecord {
                date,
                price: record.price,
                log_price: log_price[i],
                log_return: log_return[i],
                simple_return: simple_return[i],
                volatility: volatility
                    .iter()
                    .map(|(w, series)| (*w, series[i]))
                    .collect(),
                year: date.year(),
                month: date.month(),
                quarter: (date.month() - 1) / 3 + 1,
                day_of_year: date.ordinal(),
                day_of_week: date.weekday().num_days_from_monday(),
                moving_average: moving_average
                    .iter()
                    .map(|(w, series)| (*w, series[i]))
                    .collect(),
                price_to_ma: moving_average
                    .iter()
                    .map(|(w, series)| (*w, record.price / series[i]))
                    .collect(),
                momentum: momentum
                    .iter()
                    .map(|(lag, series)| (*lag, series[i]))
                    .collect(),
                cumulative_return: cumulative_return[i],
            }
        })
        .collect();

    info!("Created {} feature rows", out.len());
    Ok(FeatureTable {
        records: out,
        volatility_windows: config.volatility_windows.clone(),
        ma_windows: config.ma_windows.clone(),
        momentum_lags: config.momentum_lags.clone(),
    })
}

/// First difference; the first entry has no prior observation and is null.
fn diff(values: &[f64]) -> Vec<Option<f64>> {
    values
        .iter()
        .enumerate()
        .map(|(i, &v)| (i > 0).then(|| v - values[i - 1]))
        .collect()
}

/// Rolling sample stdev of log returns over a trailing `window`, annualized
/// by sqrt(252). Null until at least ceil(window / 2) returns are available.
fn annualized_volatility(log_return: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    let min_periods = window.div_ceil(2);
    stats::rolling_std(log_return, window, min_periods)
        .into_iter()
        .map(|v| v.map(|sd| sd * TRADING_DAYS.sqrt()))
        .collect()
}

/// Running product of (1 + simple_return) minus 1. The first-row null return
/// counts as 0 in the accumulation only; the stored null is not overwritten.
fn cumulative_returns(simple_return: &[Option<f64>]) -> Vec<f64> {
    let mut acc = 1.0;
    simple_return
        .iter()
        .map(|r| {
            acc *= 1.0 + r.unwrap_or(0.0);
            acc - 1.0
        })
        .collect()
}
