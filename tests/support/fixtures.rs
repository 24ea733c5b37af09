use std::path::{Path, PathBuf};

pub const RAW_HEADER: &str = "TransactionId,TransactionStartTime,CurrencyCode,Amount,Value,FraudResult";

pub fn write_file(path: &Path, contents: &str) -> PathBuf {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("create fixture parent dirs");
    }
    std::fs::write(path, contents).expect("write fixture");
    path.to_path_buf()
}

/// Two-row raw file with one missing `Amount`.
pub fn write_small_raw(path: &Path) -> PathBuf {
    write_file(
        path,
        "TransactionStartTime,Amount,FraudResult\n\
         2024-01-05T13:00:00,100,0\n\
         2024-01-06T09:00:00,,1\n",
    )
}

/// Raw transactions where every numeric feature separates the two classes
/// with a wide gap, so a fitted forest classifies every row correctly.
///
/// One row in five is fraudulent.
pub fn write_separable_raw(path: &Path, n_rows: usize) -> PathBuf {
    let mut contents = String::from(RAW_HEADER);
    contents.push('\n');
    for i in 0..n_rows {
        let fraud = i % 5 == 0;
        let (day, hour, amount, value) = if fraud {
            (1 + i % 3, 1 + i % 3, 10_000 + i * 100, 20_000 + i)
        } else {
            (10 + i % 12, 10 + i % 12, 100 + i * 10, 50 + i)
        };
        contents.push_str(&format!(
            "T{i},2024-01-{day:02}T{hour:02}:15:00Z,UGX,{amount}.0,{value},{}\n",
            u8::from(fraud)
        ));
    }
    write_file(path, &contents)
}

/// Expected `FraudResult` labels for [`write_separable_raw`].
pub fn separable_labels(n_rows: usize) -> Vec<String> {
    (0..n_rows)
        .map(|i| if i % 5 == 0 { "1" } else { "0" }.to_string())
        .collect()
}
