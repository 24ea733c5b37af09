//! Loads the raw transactions CSV, engineers features and writes the
//! processed table.

use std::path::PathBuf;

use creditrisk::config::PipelineConfig;
use creditrisk::features::DataProcessor;
use creditrisk::logging;

fn main() {
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

#[derive(Debug, Clone, Default)]
struct CliOptions {
    config_path: Option<PathBuf>,
    input: Option<PathBuf>,
    output: Option<PathBuf>,
    head: usize,
}

fn run() -> Result<(), String> {
    let options = parse_args(std::env::args().skip(1).collect())?;
    let config =
        PipelineConfig::resolve(options.config_path.as_deref()).map_err(|err| err.to_string())?;
    if let Err(err) = logging::init(&config.logging) {
        eprintln!("Logging disabled: {err}");
    }

    let input = options.input.unwrap_or(config.paths.raw_data);
    let output = options.output.unwrap_or(config.paths.processed_data);

    let mut processor = DataProcessor::new(config.features);
    processor.load(&input).map_err(|err| err.to_string())?;
    let table = processor
        .engineer_features()
        .map_err(|err| err.to_string())?;
    if options.head > 0 {
        println!("{}", table.head(options.head));
    }
    processor.save(&output).map_err(|err| err.to_string())?;
    Ok(())
}

fn parse_args(args: Vec<String>) -> Result<CliOptions, String> {
    let mut options = CliOptions {
        head: 5,
        ..CliOptions::default()
    };

    let mut idx = 0usize;
    while idx < args.len() {
        match args[idx].as_str() {
            "-h" | "--help" => return Err(help_text()),
            "--config" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--config requires a value".to_string())?;
                options.config_path = Some(PathBuf::from(value));
            }
            "--input" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--input requires a value".to_string())?;
                options.input = Some(PathBuf::from(value));
            }
            "--out" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--out requires a value".to_string())?;
                options.output = Some(PathBuf::from(value));
            }
            "--head" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--head requires a value".to_string())?;
                options.head = value
                    .parse::<usize>()
                    .map_err(|_| format!("Invalid --head value: {value}"))?;
            }
            unknown => return Err(format!("Unknown argument: {unknown}\n\n{}", help_text())),
        }
        idx += 1;
    }
    Ok(options)
}

fn help_text() -> String {
    [
        "creditrisk-process",
        "",
        "Derives Transaction_Hour/Transaction_Day and mean-imputes numeric columns.",
        "",
        "Usage:",
        "  creditrisk-process [--input raw.csv] [--out processed.csv] [options]",
        "",
        "Options:",
        "  --config <file>   TOML config (default: $CREDITRISK_CONFIG if set).",
        "  --input <file>    Raw CSV (default: paths.raw_data, data/raw/data.csv).",
        "  --out <file>      Processed CSV (default: paths.processed_data, data/processed/data.csv).",
        "  --head <n>        Rows of the processed table to print, 0 to disable (default: 5).",
    ]
    .join("\n")
}
