//! Mean imputation for numeric columns.

use super::ProcessError;
use crate::config::AllNullPolicy;
use crate::table::{ColumnData, Table};

/// Fill applied to one column.
#[derive(Debug, Clone, PartialEq)]
pub struct Imputed {
    pub column: String,
    /// `None` when the column had no values and was left as-is.
    pub mean: Option<f64>,
    pub filled: usize,
}

/// Replace nulls in every numeric column with that column's mean.
///
/// Means come from the whole column as it is now, before any train/test
/// split. Every mean is computed before anything is written, so a failing
/// column leaves the table untouched.
pub fn impute_means(table: &mut Table, policy: AllNullPolicy) -> Result<Vec<Imputed>, ProcessError> {
    let mut plan = Vec::new();
    for (idx, column) in table.columns().iter().enumerate() {
        // Int columns cannot hold nulls.
        let ColumnData::Float(values) = column.data() else {
            continue;
        };
        let nulls = values.iter().filter(|v| v.is_none()).count();
        if nulls == 0 {
            continue;
        }
        let mean = column_mean(values);
        if mean.is_none() && policy == AllNullPolicy::Fail {
            return Err(ProcessError::Imputation {
                column: column.name().to_string(),
            });
        }
        plan.push((idx, mean, nulls));
    }

    let mut report = Vec::with_capacity(plan.len());
    let mut columns: Vec<_> = table.columns_mut().collect();
    for (idx, mean, nulls) in plan {
        let column = &mut columns[idx];
        if let (Some(mean), ColumnData::Float(values)) = (mean, column.data_mut()) {
            for value in values.iter_mut().filter(|v| v.is_none()) {
                *value = Some(mean);
            }
        }
        report.push(Imputed {
            column: column.name().to_string(),
            mean,
            filled: if mean.is_some() { nulls } else { 0 },
        });
    }
    Ok(report)
}

/// Arithmetic mean of the present values.
pub fn column_mean(values: &[Option<f64>]) -> Option<f64> {
    let (sum, count) = values
        .iter()
        .flatten()
        .fold((0.0f64, 0usize), |(sum, count), v| (sum + v, count + 1));
    (count > 0).then(|| sum / count as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Column;

    fn table() -> Table {
        Table::from_columns(vec![
            Column::float("Amount", vec![Some(100.0), None, Some(50.0)]),
            Column::int("Count", vec![1, 2, 3]),
            Column::text("Currency", vec![Some("UGX"), None, Some("UGX")]),
        ])
        .unwrap()
    }

    #[test]
    fn fills_nulls_with_column_mean() {
        let mut table = table();
        let report = impute_means(&mut table, AllNullPolicy::LeaveNull).unwrap();
        assert_eq!(
            table.column("Amount").unwrap().data(),
            &ColumnData::Float(vec![Some(100.0), Some(75.0), Some(50.0)])
        );
        assert_eq!(report.len(), 1);
        assert_eq!(report[0].mean, Some(75.0));
        // Text columns are not numeric and keep their nulls.
        assert_eq!(table.column("Currency").unwrap().null_count(), 1);
    }

    #[test]
    fn imputation_is_idempotent() {
        let mut table = table();
        impute_means(&mut table, AllNullPolicy::LeaveNull).unwrap();
        let once = table.clone();
        let report = impute_means(&mut table, AllNullPolicy::LeaveNull).unwrap();
        assert!(report.is_empty());
        assert_eq!(table, once);
    }

    #[test]
    fn mean_is_preserved_by_fill() {
        let mut table = table();
        let ColumnData::Float(before) = table.column("Amount").unwrap().data().clone() else {
            unreachable!()
        };
        impute_means(&mut table, AllNullPolicy::LeaveNull).unwrap();
        let ColumnData::Float(after) = table.column("Amount").unwrap().data().clone() else {
            unreachable!()
        };
        assert_eq!(column_mean(&before), column_mean(&after));
    }

    #[test]
    fn all_null_column_follows_policy() {
        let build = || {
            Table::from_columns(vec![
                Column::float("a", vec![Some(1.0), None]),
                Column::float("empty", vec![None, None]),
            ])
            .unwrap()
        };

        let mut table = build();
        let report = impute_means(&mut table, AllNullPolicy::LeaveNull).unwrap();
        assert_eq!(table.column("empty").unwrap().null_count(), 2);
        assert_eq!(table.column("a").unwrap().null_count(), 0);
        assert_eq!(report[1].mean, None);

        let mut table = build();
        let err = impute_means(&mut table, AllNullPolicy::Fail).unwrap_err();
        assert!(matches!(err, ProcessError::Imputation { ref column } if column == "empty"));
        // Nothing was filled before the failure.
        assert_eq!(table, build());
    }
}
