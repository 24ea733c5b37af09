//! Trains the random forest on the processed table and saves the model.

use std::path::PathBuf;

use creditrisk::config::PipelineConfig;
use creditrisk::logging;
use creditrisk::training::train_model;

fn main() {
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

#[derive(Debug, Clone, Default)]
struct CliOptions {
    config_path: Option<PathBuf>,
    data: Option<PathBuf>,
    model_out: Option<PathBuf>,
    target: Option<String>,
    seed: Option<u64>,
    trees: Option<usize>,
    test_fraction: Option<f64>,
}

fn run() -> Result<(), String> {
    let options = parse_args(std::env::args().skip(1).collect())?;
    let mut config =
        PipelineConfig::resolve(options.config_path.as_deref()).map_err(|err| err.to_string())?;
    if let Some(target) = options.target {
        config.training.target_column = target;
    }
    if let Some(seed) = options.seed {
        config.training.seed = seed;
    }
    if let Some(trees) = options.trees {
        config.training.n_trees = trees;
    }
    if let Some(fraction) = options.test_fraction {
        config.training.test_fraction = fraction;
    }
    config.validate().map_err(|err| err.to_string())?;
    if let Err(err) = logging::init(&config.logging) {
        eprintln!("Logging disabled: {err}");
    }

    let data = options.data.unwrap_or(config.paths.processed_data);
    let model_out = options.model_out.unwrap_or(config.paths.model);
    let report = train_model(&data, &model_out, &config.training).map_err(|err| err.to_string())?;

    println!("test accuracy: {:.4}", report.accuracy);
    println!(
        "rows: train={}  test={}  features={}",
        report.train_rows,
        report.test_rows,
        report.feature_columns.join(",")
    );
    for (idx, stats) in report.per_class.iter().enumerate() {
        println!(
            "class {:>2} {:<16}  precision={:.3}  recall={:.3}  support={}",
            idx, stats.label, stats.precision, stats.recall, stats.support
        );
    }
    Ok(())
}

fn parse_args(args: Vec<String>) -> Result<CliOptions, String> {
    let mut options = CliOptions::default();

    let mut idx = 0usize;
    while idx < args.len() {
        match args[idx].as_str() {
            "-h" | "--help" => return Err(help_text()),
            "--config" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--config requires a value".to_string())?;
                options.config_path = Some(PathBuf::from(value));
            }
            "--data" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--data requires a value".to_string())?;
                options.data = Some(PathBuf::from(value));
            }
            "--out" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--out requires a value".to_string())?;
                options.model_out = Some(PathBuf::from(value));
            }
            "--target" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--target requires a value".to_string())?;
                options.target = Some(value.to_string());
            }
            "--seed" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--seed requires a value".to_string())?;
                options.seed = Some(
                    value
                        .parse::<u64>()
                        .map_err(|_| format!("Invalid --seed value: {value}"))?,
                );
            }
            "--trees" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--trees requires a value".to_string())?;
                options.trees = Some(
                    value
                        .parse::<usize>()
                        .map_err(|_| format!("Invalid --trees value: {value}"))?,
                );
            }
            "--test-fraction" => {
                idx += 1;
                let value = args
                    .get(idx)
                    .ok_or_else(|| "--test-fraction requires a value".to_string())?;
                options.test_fraction = Some(
                    value
                        .parse::<f64>()
                        .map_err(|_| format!("Invalid --test-fraction value: {value}"))?,
                );
            }
            unknown => return Err(format!("Unknown argument: {unknown}\n\n{}", help_text())),
        }
        idx += 1;
    }
    Ok(options)
}

fn help_text() -> String {
    [
        "creditrisk-train",
        "",
        "Trains a seeded random forest on the processed table and saves it as JSON.",
        "",
        "Usage:",
        "  creditrisk-train [--data processed.csv] [--out model.json] [options]",
        "",
        "Options:",
        "  --config <file>          TOML config (default: $CREDITRISK_CONFIG if set).",
        "  --data <file>            Processed CSV (default: paths.processed_data).",
        "  --out <file>             Output model path (default: paths.model, models/rf_model.json).",
        "  --target <column>        Label column (default: FraudResult).",
        "  --seed <n>               Seed for the split and the forest (default: 42).",
        "  --trees <n>              Number of trees (default: 100).",
        "  --test-fraction <f64>    Held-out share of rows (default: 0.2).",
    ]
    .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn parses_training_overrides() {
        let options = parse_args(args(&[
            "--target",
            "Label",
            "--seed",
            "7",
            "--trees",
            "10",
            "--test-fraction",
            "0.25",
        ]))
        .unwrap();
        assert_eq!(options.target.as_deref(), Some("Label"));
        assert_eq!(options.seed, Some(7));
        assert_eq!(options.trees, Some(10));
        assert_eq!(options.test_fraction, Some(0.25));
    }

    #[test]
    fn invalid_number_is_reported() {
        assert_eq!(
            parse_args(args(&["--trees", "many"])).unwrap_err(),
            "Invalid --trees value: many"
        );
    }

    #[test]
    fn help_is_returned_as_error_text() {
        assert!(parse_args(args(&["--help"])).unwrap_err().starts_with("creditrisk-train"));
    }
}
