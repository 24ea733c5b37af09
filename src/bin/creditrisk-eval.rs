//! Scores a CSV with a saved model and reports accuracy against its labels.

use std::path::PathBuf;

use creditrisk::ml::metrics::{ConfusionMatrix, accuracy, precision_recall_by_class};
use creditrisk::table::read_csv;
use creditrisk::training::ModelArtifact;

fn main() {
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

#[derive(Debug, Clone)]
struct CliOptions {
    model_path: PathBuf,
    data_path: PathBuf,
    top: usize,
}

fn run() -> Result<(), String> {
    let options = parse_args(std::env::args().skip(1).collect())?;
    let artifact = ModelArtifact::load_json(&options.model_path).map_err(|err| err.to_string())?;
    let table = read_csv(&options.data_path).map_err(|err| err.to_string())?;
    let target = table.column(&artifact.target_column).ok_or_else(|| {
        format!(
            "Target column '{}' not found in {}",
            artifact.target_column,
            options.data_path.display()
        )
    })?;
    let predicted = artifact.predict_indices(&table).map_err(|err| err.to_string())?;

    let classes = artifact.classes();
    let mut cm = ConfusionMatrix::new(classes.len());
    let mut unknown = 0usize;
    for (row, &pred) in predicted.iter().enumerate() {
        let truth = target.cell(row).to_string();
        match classes.iter().position(|class| *class == truth) {
            Some(truth_idx) => cm.add(truth_idx, pred),
            None => unknown += 1,
        }
    }

    println!("accuracy: {:.4}", accuracy(&cm));
    if unknown > 0 {
        println!("skipped {unknown} rows with labels unseen during training");
    }
    let per_class = precision_recall_by_class(&cm, classes);
    for (idx, stats) in per_class.iter().enumerate() {
        println!(
            "class {:>2} {:<16}  precision={:.3}  recall={:.3}  support={}",
            idx, stats.label, stats.precision, stats.recall, stats.support
        );
    }
    println!("confusion matrix (rows=true, cols=pred):");
    for truth in 0..cm.n_classes {
        let mut row = String::new();
        for pred in 0..cm.n_classes {
            row.push_str(&format!("{:6}", cm.get(truth, pred)));
        }
        println!("{row}");
    }

    println!();
    println!("Top confusions:");
    let mut confusions = Vec::new();
    for truth in 0..cm.n_classes {
        for pred in 0..cm.n_classes {
            let count = cm.get(truth, pred);
            if truth != pred && count > 0 {
                confusions.push((count, truth, pred));
            }
        }
    }
    confusions.sort_by(|a, b| b.0.cmp(&a.0));
    for (count, truth, pred) in confusions.into_iter().take(options.top) {
        println!("- {} -> {}: {}", classes[truth], classes[pred], count);
    }
    Ok(())
}

fn parse_args(args: Vec<String>) -> Result<CliOptions, String> {
    let mut model_path: Option<PathBuf> = None;
    let mut data_path: Option<PathBuf> = None;
    let mut top = 10usize;

    let mut idx = 0usize;
    while idx < args.len() {
        match args[idx].as_str() {
            "-h" | "--help" => return Err(help_text()),
            "--model" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--model requires a value".to_string())?;
                model_path = Some(PathBuf::from(value));
            }
            "--data" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--data requires a value".to_string())?;
                data_path = Some(PathBuf::from(value));
            }
            "--top" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--top requires a value".to_string())?;
                top = value
                    .parse::<usize>()
                    .map_err(|_| format!("Invalid --top value: {value}"))?;
            }
            unknown => return Err(format!("Unknown argument: {unknown}\n\n{}", help_text())),
        }
        idx += 1;
    }

    let model_path = model_path.ok_or_else(|| "--model is required".to_string())?;
    let data_path = data_path.ok_or_else(|| "--data is required".to_string())?;
    Ok(CliOptions {
        model_path,
        data_path,
        top,
    })
}

fn help_text() -> String {
    [
        "creditrisk-eval",
        "",
        "Usage:",
        "  creditrisk-eval --model <model.json> --data <processed.csv> [options]",
        "",
        "Options:",
        "  --top <n>   Top N confusions (default: 10).",
    ]
    .join("\n")
}
