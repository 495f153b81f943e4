//! Tabular dataset representation
//!
//! A [`Table`] is a dense numeric feature matrix with named columns; the target is a
//! plain `Array1<f64>`. Stages may change the column set, so every table carries its
//! own names rather than relying on positional agreement with some outer schema.

use crate::error::{ConveyorError, Result};
use ndarray::{Array1, Array2, ArrayView1, Axis};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Feature table: rows are samples, columns are named features.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    names: Vec<String>,
    data: Array2<f64>,
}

impl Table {
    /// Create a table from column names and a matrix. The number of names must match
    /// the matrix width.
    pub fn new(names: Vec<String>, data: Array2<f64>) -> Result<Self> {
        if names.len() != data.ncols() {
            return Err(ConveyorError::ShapeError {
                expected: format!("{} columns", names.len()),
                actual: format!("{} columns", data.ncols()),
            });
        }
        Ok(Self { names, data })
    }

    /// Build a table from named columns of equal length.
    pub fn from_columns(columns: &[(&str, Vec<f64>)]) -> Result<Self> {
        if columns.is_empty() {
            return Err(ConveyorError::DataError("no columns given".to_string()));
        }
        let n_rows = columns[0].1.len();
        for (name, values) in columns {
            if values.len() != n_rows {
                return Err(ConveyorError::ShapeError {
                    expected: format!("{} rows in column '{}'", n_rows, columns[0].0),
                    actual: format!("{} rows in column '{}'", values.len(), name),
                });
            }
        }
        let data = Array2::from_shape_fn((n_rows, columns.len()), |(r, c)| columns[c].1[r]);
        let names = columns.iter().map(|(n, _)| n.to_string()).collect();
        Ok(Self { names, data })
    }

    pub fn n_rows(&self) -> usize {
        self.data.nrows()
    }

    pub fn n_cols(&self) -> usize {
        self.data.ncols()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn data(&self) -> &Array2<f64> {
        &self.data
    }

    fn position(&self, name: &str) -> Result<usize> {
        self.names
            .iter()
            .position(|n| n == name)
            .ok_or_else(|| ConveyorError::ColumnNotFound(name.to_string()))
    }

    /// View of one named column.
    pub fn column(&self, name: &str) -> Result<ArrayView1<'_, f64>> {
        let idx = self.position(name)?;
        Ok(self.data.column(idx))
    }

    /// New table without the named column.
    pub fn drop_column(&self, name: &str) -> Result<Table> {
        let idx = self.position(name)?;
        let keep: Vec<usize> = (0..self.n_cols()).filter(|&i| i != idx).collect();
        if keep.is_empty() {
            return Err(ConveyorError::DataError(format!(
                "dropping '{}' would leave an empty table",
                name
            )));
        }
        let names = keep.iter().map(|&i| self.names[i].clone()).collect();
        Ok(Table {
            names,
            data: self.data.select(Axis(1), &keep),
        })
    }

    /// New table restricted to the named columns, in the given order.
    pub fn select(&self, names: &[&str]) -> Result<Table> {
        let idx: Vec<usize> = names
            .iter()
            .map(|n| self.position(n))
            .collect::<Result<_>>()?;
        Ok(Table {
            names: names.iter().map(|n| n.to_string()).collect(),
            data: self.data.select(Axis(1), &idx),
        })
    }

    /// New table containing the given rows, in index order.
    pub fn take_rows(&self, indices: &[usize]) -> Table {
        Table {
            names: self.names.clone(),
            data: self.data.select(Axis(0), indices),
        }
    }
}

/// Check the core dataset invariant: feature rows match target length whenever the
/// target is non-empty.
pub fn validate(x: &Table, y: &Array1<f64>) -> Result<()> {
    if !y.is_empty() && x.n_rows() != y.len() {
        return Err(ConveyorError::ShapeError {
            expected: format!("{} target values", x.n_rows()),
            actual: format!("{}", y.len()),
        });
    }
    Ok(())
}

/// Seeded shuffled split into (train_x, train_y, test_x, test_y).
///
/// The test side gets `round(n * test_fraction)` rows, clamped so both sides are
/// non-empty.
pub fn train_test_split(
    x: &Table,
    y: &Array1<f64>,
    test_fraction: f64,
    seed: u64,
) -> Result<(Table, Array1<f64>, Table, Array1<f64>)> {
    validate(x, y)?;
    if !(0.0..1.0).contains(&test_fraction) || test_fraction <= 0.0 {
        return Err(ConveyorError::ConfigError(format!(
            "test_fraction must be in (0, 1), got {}",
            test_fraction
        )));
    }
    let n = x.n_rows();
    if n < 2 {
        return Err(ConveyorError::DataError(
            "need at least 2 rows to split".to_string(),
        ));
    }
    let n_test = ((n as f64 * test_fraction).round() as usize).clamp(1, n - 1);

    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let (test_idx, train_idx) = indices.split_at(n_test);
    let take_y = |idx: &[usize]| Array1::from(idx.iter().map(|&i| y[i]).collect::<Vec<f64>>());

    Ok((
        x.take_rows(train_idx),
        take_y(train_idx),
        x.take_rows(test_idx),
        take_y(test_idx),
    ))
}
