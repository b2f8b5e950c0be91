// src/scale.rs

use thiserror::Error;

use crate::extract::CaseTable;

#[derive(Debug, Error, PartialEq)]
pub enum ScaleError {
    #[error("metric column {0:?} has no numeric values")]
    EmptyColumn(String),
    #[error("minimum value {0} is not strictly positive; logarithmic scaling needs values > 0")]
    NonPositive(f64),
}

/// Logarithmic normalization range.
///
/// Maps `[min, max]` onto `[0, 1]` so that multiplicative differences come
/// out as equal visual steps: `intensity(v) = ln(v/min) / ln(max/min)`.
/// Construction rejects non-positive minima outright, so the mapping can
/// never produce NaN or infinities.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LogScale {
    min: f64,
    max: f64,
}

impl LogScale {
    pub fn from_range(min: f64, max: f64) -> Result<Self, ScaleError> {
        if min <= 0.0 {
            return Err(ScaleError::NonPositive(min));
        }
        debug_assert!(min <= max);
        Ok(Self { min, max })
    }

    /// Scan one metric column across all retained rows. Non-numeric cells are
    /// skipped; a column with no numeric values at all is an error.
    pub fn from_table(table: &CaseTable, column: &str) -> Result<Self, ScaleError> {
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        let mut seen = false;
        for v in table.column_values(column) {
            seen = true;
            min = min.min(v);
            max = max.max(v);
        }
        if !seen {
            return Err(ScaleError::EmptyColumn(column.to_string()));
        }
        Self::from_range(min, max)
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    /// Log-scaled position of `v` in `[0, 1]`. Input is clamped into
    /// `[min, max]`; a degenerate range maps everything to 0.
    pub fn intensity(&self, v: f64) -> f64 {
        if self.min == self.max {
            return 0.0;
        }
        let v = v.clamp(self.min, self.max);
        (v / self.min).ln() / (self.max / self.min).ln()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::extract_table;

    #[test]
    fn endpoints_map_to_zero_and_one() {
        let scale = LogScale::from_range(3.0, 90_000.0).unwrap();
        assert_eq!(scale.intensity(3.0), 0.0);
        assert_eq!(scale.intensity(90_000.0), 1.0);
    }

    #[test]
    fn log_midpoint_known_value() {
        // ln(10)/ln(1000) = 1/3
        let scale = LogScale::from_range(1.0, 1000.0).unwrap();
        assert!((scale.intensity(10.0) - 1.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn output_stays_in_unit_interval() {
        let scale = LogScale::from_range(7.0, 250_000.0).unwrap();
        for v in [-5.0, 0.0, 6.9, 7.0, 123.0, 99_999.0, 250_000.0, 1e12] {
            let t = scale.intensity(v);
            assert!(t.is_finite(), "intensity({v}) = {t}");
            assert!((0.0..=1.0).contains(&t), "intensity({v}) = {t}");
        }
    }

    #[test]
    fn out_of_range_values_clamp() {
        let scale = LogScale::from_range(10.0, 1000.0).unwrap();
        assert_eq!(scale.intensity(1.0), 0.0);
        assert_eq!(scale.intensity(1e9), 1.0);
    }

    #[test]
    fn degenerate_range_maps_to_zero() {
        let scale = LogScale::from_range(42.0, 42.0).unwrap();
        assert_eq!(scale.intensity(42.0), 0.0);
    }

    #[test]
    fn rejects_zero_and_negative_minima() {
        assert_eq!(
            LogScale::from_range(0.0, 10.0),
            Err(ScaleError::NonPositive(0.0))
        );
        assert_eq!(
            LogScale::from_range(-3.0, 10.0),
            Err(ScaleError::NonPositive(-3.0))
        );
    }

    #[test]
    fn from_table_scans_the_metric_column() {
        let html = "<table><tr><th>State</th><th>TotalCases</th></tr>\
                    <tr><td>Ohio</td><td>1,000</td></tr>\
                    <tr><td>Utah</td><td>10</td></tr>\
                    <tr><td>Iowa</td><td>N/A</td></tr></table>";
        let table = extract_table(html, 62).unwrap();
        let scale = LogScale::from_table(&table, "TotalCases").unwrap();
        assert_eq!(scale.min(), 10.0);
        assert_eq!(scale.max(), 1000.0);
    }

    #[test]
    fn from_table_rejects_zero_cases() {
        let html = "<table><tr><th>State</th><th>TotalCases</th></tr>\
                    <tr><td>Ohio</td><td>0</td></tr>\
                    <tr><td>Utah</td><td>10</td></tr></table>";
        let table = extract_table(html, 62).unwrap();
        assert_eq!(
            LogScale::from_table(&table, "TotalCases"),
            Err(ScaleError::NonPositive(0.0))
        );
    }

    #[test]
    fn from_table_with_no_numbers_is_an_error() {
        let html = "<table><tr><th>State</th><th>TotalCases</th></tr>\
                    <tr><td>Ohio</td><td>N/A</td></tr></table>";
        let table = extract_table(html, 62).unwrap();
        assert_eq!(
            LogScale::from_table(&table, "TotalCases"),
            Err(ScaleError::EmptyColumn("TotalCases".to_string()))
        );
    }
}
