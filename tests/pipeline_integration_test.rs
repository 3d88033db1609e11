/// End-to-end pipeline scenarios over real temp files:
/// load -> clean -> engineer-features, including delimiter detection,
/// schema validation, repair diagnostics and the terminal error paths.
use std::io::Write;
use std::path::PathBuf;

use chrono::NaiveDate;
use tempfile::TempDir;

use brent_pipeline::{
    MissingPriceStrategy, Pipeline, PipelineConfig, PipelineError,
};

fn write_source(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(content.as_bytes()).unwrap();
    path
}

/// `Date,Price` CSV with `n` consecutive days starting 2020-01-01, all at
/// the given price, in the canonical `%d-%b-%y` date format.
fn flat_series_csv(n: usize, price: f64) -> String {
    let start = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
    let mut out = String::from("Date,Price\n");
    for i in 0..n {
        let date = start + chrono::Days::new(i as u64);
        out.push_str(&format!("{},{}\n", date.format("%d-%b-%y"), price));
    }
    out
}

mod loading {
    use super::*;

    #[test]
    fn missing_file_is_source_not_found() {
        let err = Pipeline::default()
            .run(&PathBuf::from("/nonexistent/brent.csv"))
            .unwrap_err();
        assert!(matches!(err, PipelineError::SourceNotFound { .. }));
    }

    #[test]
    fn binary_file_is_unparseable_source() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("garbage.csv");
        std::fs::write(&path, [0xff_u8, 0xfe, 0x00, 0x41]).unwrap();
        let err = Pipeline::default().run(&path).unwrap_err();
        assert!(matches!(err, PipelineError::UnparseableSource { .. }));
    }

    #[test]
    fn no_consistent_delimiter_is_unparseable_source() {
        let dir = TempDir::new().unwrap();
        // Every delimiter yields rows whose field count disagrees with the
        // header: the comma header has 2 fields but the rows have 1, and
        // each row splits into 3 fields under one of the other delimiters.
        let path = write_source(
            &dir,
            "ragged.csv",
            "Date,Price\nx\ty\tz\np;q;r\n",
        );
        let err = Pipeline::default().run(&path).unwrap_err();
        assert!(matches!(err, PipelineError::UnparseableSource { .. }));
    }

    #[test]
    fn missing_price_column_is_schema_mismatch() {
        let dir = TempDir::new().unwrap();
        let path = write_source(&dir, "no_price.csv", "Date,Close\n20-May-87,18.63\n");
        let err = Pipeline::default().run(&path).unwrap_err();
        match err {
            PipelineError::SchemaMismatch { missing, found } => {
                assert_eq!(missing, vec!["Price".to_string()]);
                assert!(found.contains(&"Date".to_string()));
                assert!(found.contains(&"Close".to_string()));
            }
            other => panic!("expected SchemaMismatch, got {other:?}"),
        }
    }

    #[test]
    fn header_matching_ignores_case_and_whitespace() {
        let dir = TempDir::new().unwrap();
        let path = write_source(&dir, "messy.csv", " DATE , price \n20-May-87,18.63\n");
        let run = Pipeline::default().run(&path).unwrap();
        assert_eq!(run.features.len(), 1);
    }

    #[test]
    fn tab_delimited_source_is_detected() {
        let dir = TempDir::new().unwrap();
        let path = write_source(
            &dir,
            "tabs.tsv",
            "Date\tPrice\n20-May-87\t18.63\n21-May-87\t18.45\n",
        );
        let run = Pipeline::default().run(&path).unwrap();
        assert_eq!(run.features.len(), 2);
    }

    #[test]
    fn semicolon_delimited_source_is_detected() {
        let dir = TempDir::new().unwrap();
        let path = write_source(
            &dir,
            "semi.csv",
            "Date;Price\n20-May-87;18.63\n21-May-87;18.45\n",
        );
        let run = Pipeline::default().run(&path).unwrap();
        assert_eq!(run.features.len(), 2);
    }

    #[test]
    fn quality_report_reflects_raw_defects() {
        let dir = TempDir::new().unwrap();
        let path = write_source(
            &dir,
            "defects.csv",
            "Date,Price\n20-May-87,18.63\n20-May-87,18.63\n21-May-87,\n22-May-87,-4.0\n",
        );
        // The loader reports on the raw table; the negative price would
        // abort feature engineering, which is covered separately.
        let config = PipelineConfig::default();
        let (_, quality) = brent_pipeline::loader::load(&path, &config).unwrap();
        assert_eq!(quality.total_rows, 4);
        assert_eq!(quality.duplicate_dates, 1);
        assert_eq!(quality.missing_prices, 1);
        assert_eq!(quality.negative_prices, 1);
        assert_eq!(quality.price_min, Some(-4.0));
        assert!(quality.dates_parseable);
    }
}

mod cleaning {
    use super::*;

    #[test]
    fn one_bad_date_yields_two_clean_rows_and_a_count() {
        let dir = TempDir::new().unwrap();
        let path = write_source(
            &dir,
            "bad_date.csv",
            "Date,Price\n20-May-87,18.63\nBOGUS,18.45\n22-May-87,18.55\n",
        );
        let run = Pipeline::default().run(&path).unwrap();
        assert_eq!(run.features.len(), 2);
        assert_eq!(run.diagnostics.dropped_unparseable_dates, 1);
        assert!(!run.quality().dates_parseable);
    }

    #[test]
    fn interior_null_interpolates_to_midpoint() {
        let dir = TempDir::new().unwrap();
        let path = write_source(
            &dir,
            "gap.csv",
            "Date,Price\n20-May-87,50.0\n21-May-87,\n22-May-87,52.0\n",
        );
        let run = Pipeline::default().run(&path).unwrap();
        assert_eq!(run.features.len(), 3);
        assert_eq!(run.features.records[1].price, 51.0);
        assert_eq!(run.diagnostics.filled_missing_prices, 1);
    }

    #[test]
    fn drop_strategy_shrinks_the_table_instead() {
        let dir = TempDir::new().unwrap();
        let path = write_source(
            &dir,
            "gap.csv",
            "Date,Price\n20-May-87,50.0\n21-May-87,\n22-May-87,52.0\n",
        );
        let config = PipelineConfig::default()
            .with_missing_price_strategy(MissingPriceStrategy::Drop);
        let run = Pipeline::new(config).run(&path).unwrap();
        assert_eq!(run.features.len(), 2);
        assert_eq!(run.diagnostics.dropped_missing_prices, 1);
    }

    #[test]
    fn out_of_order_rows_come_back_sorted() {
        let dir = TempDir::new().unwrap();
        let path = write_source(
            &dir,
            "unsorted.csv",
            "Date,Price\n22-May-87,18.55\n20-May-87,18.63\n21-May-87,18.45\n",
        );
        let run = Pipeline::default().run(&path).unwrap();
        let dates: Vec<NaiveDate> = run.features.records.iter().map(|r| r.date).collect();
        let mut sorted = dates.clone();
        sorted.sort();
        assert_eq!(dates, sorted);
    }

    #[test]
    fn all_rows_invalid_is_empty_dataset() {
        let dir = TempDir::new().unwrap();
        let path = write_source(&dir, "hopeless.csv", "Date,Price\nBOGUS,18.63\n");
        let err = Pipeline::default().run(&path).unwrap_err();
        assert!(matches!(err, PipelineError::EmptyDataset));
    }
}

mod feature_engineering {
    use super::*;

    #[test]
    fn flat_hundred_row_series_has_textbook_features() {
        let dir = TempDir::new().unwrap();
        let path = write_source(&dir, "flat.csv", &flat_series_csv(100, 100.0));
        let run = Pipeline::default().run(&path).unwrap();
        assert_eq!(run.features.len(), 100);

        let records = &run.features.records;
        assert_eq!(records[0].log_return, None);
        assert_eq!(records[0].momentum[&1], None);
        for row in &records[1..] {
            assert!(row.log_return.unwrap().abs() < 1e-12);
            assert_eq!(row.momentum[&1], Some(0.0));
        }
        for row in records {
            assert_eq!(row.moving_average[&10], 100.0);
            assert!((row.price_to_ma[&10] - 1.0).abs() < 1e-12);
            assert!(row.cumulative_return.abs() < 1e-12);
        }
    }

    #[test]
    fn negative_price_aborts_with_offending_date() {
        let dir = TempDir::new().unwrap();
        let path = write_source(
            &dir,
            "negative.csv",
            "Date,Price\n20-May-87,18.63\n21-May-87,-4.0\n22-May-87,18.55\n",
        );
        let err = Pipeline::default().run(&path).unwrap_err();
        match err {
            PipelineError::NonPositivePrice { date, price } => {
                assert_eq!(date, NaiveDate::from_ymd_opt(1987, 5, 21).unwrap());
                assert_eq!(price, -4.0);
            }
            other => panic!("expected NonPositivePrice, got {other:?}"),
        }
    }

    #[test]
    fn volatility_columns_turn_on_after_half_window() {
        let dir = TempDir::new().unwrap();
        // Vary the price so the stdev is well-defined and non-zero.
        let start = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        let mut csv = String::from("Date,Price\n");
        for i in 0..30 {
            let date = start + chrono::Days::new(i as u64);
            let price = 100.0 + (i as f64 * 0.7).sin() * 5.0;
            csv.push_str(&format!("{},{}\n", date.format("%d-%b-%y"), price));
        }
        let path = write_source(&dir, "wavy.csv", &csv);
        let config = PipelineConfig::default().with_volatility_windows(vec![7]);
        let run = Pipeline::new(config).run(&path).unwrap();
        let records = &run.features.records;
        for row in &records[..4] {
            assert_eq!(row.volatility[&7], None);
        }
        for row in &records[4..] {
            assert!(row.volatility[&7].is_some());
        }
    }
}

mod export {
    use super::*;

    #[test]
    fn csv_export_has_configured_columns_and_all_rows() {
        let dir = TempDir::new().unwrap();
        let path = write_source(&dir, "flat.csv", &flat_series_csv(20, 100.0));
        let run = Pipeline::default().run(&path).unwrap();

        let mut buffer = Vec::new();
        run.features.write_csv(&mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        let mut lines = text.lines();

        let header = lines.next().unwrap();
        assert!(header.starts_with("Date,Price,Log_Price,Log_Return,Simple_Return"));
        assert!(header.contains("Volatility_7d"));
        assert!(header.contains("MA_200"));
        assert!(header.contains("Price_to_MA_10"));
        assert!(header.contains("Momentum_30d"));
        assert!(header.ends_with("Cumulative_Return"));
        assert_eq!(lines.count(), 20);

        // First data row: null returns serialize as empty cells.
        let first_row = text.lines().nth(1).unwrap();
        assert!(first_row.starts_with("2020-01-01,100,"));
        assert!(first_row.contains(",,"));
    }

    #[test]
    fn diagnostics_mapping_is_json_compatible() {
        let dir = TempDir::new().unwrap();
        let path = write_source(
            &dir,
            "gap.csv",
            "Date,Price\n20-May-87,50.0\n21-May-87,\n22-May-87,52.0\n",
        );
        let run = Pipeline::default().run(&path).unwrap();
        let map = run.diagnostics.as_map();
        assert_eq!(map["rows_loaded"], 3);
        assert_eq!(map["rows_clean"], 3);
        assert_eq!(map["filled_missing_prices"], 1);
        assert_eq!(map["quality"]["missing_prices"], 1);
    }
}
