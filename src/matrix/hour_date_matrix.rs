use chrono::NaiveDate;

/// Rows in every matrix, one per hour of the day.
pub const HOURS: usize = 24;

/// A dense hour × calendar-date grid of values.
///
/// Row `h` holds hour `h` (0 at index 0). Columns are dates in ascending order.
/// Cells are stored row-major and are always finite.
#[derive(Debug, Clone, PartialEq)]
pub struct HourDateMatrix {
    dates: Vec<NaiveDate>,
    cells: Vec<f64>,
}

impl HourDateMatrix {
    /// A 24×0 matrix.
    pub fn empty() -> Self {
        Self {
            dates: Vec::new(),
            cells: Vec::new(),
        }
    }

    /// Builds a matrix from row-major `cells`; non-finite values become zero.
    ///
    /// Returns `None` when `cells` is not `24 * dates.len()` long.
    pub fn from_cells(dates: Vec<NaiveDate>, cells: Vec<f64>) -> Option<Self> {
        if cells.len() != HOURS * dates.len() {
            return None;
        }
        let cells = cells
            .into_iter()
            .map(|v| if v.is_finite() { v } else { 0.0 })
            .collect();
        Some(Self { dates, cells })
    }

    /// Caller guarantees `cells.len() == 24 * dates.len()` and finite values.
    pub(crate) fn from_dense(dates: Vec<NaiveDate>, cells: Vec<f64>) -> Self {
        debug_assert_eq!(cells.len(), HOURS * dates.len());
        Self { dates, cells }
    }

    /// `(rows, columns)`. Rows is always 24.
    pub fn shape(&self) -> (usize, usize) {
        (HOURS, self.dates.len())
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn get(&self, hour: usize, column: usize) -> Option<f64> {
        if hour >= HOURS || column >= self.dates.len() {
            return None;
        }
        self.cells.get(hour * self.dates.len() + column).copied()
    }

    /// All cells of one hour, in date order.
    pub fn row(&self, hour: usize) -> Option<&[f64]> {
        if hour >= HOURS {
            return None;
        }
        let width = self.dates.len();
        self.cells.get(hour * width..(hour + 1) * width)
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn min(&self) -> Option<f64> {
        self.cells.iter().copied().reduce(f64::min)
    }

    pub fn max(&self) -> Option<f64> {
        self.cells.iter().copied().reduce(f64::max)
    }

    /// Largest absolute value; zero for an empty matrix.
    pub fn max_abs(&self) -> f64 {
        self.cells.iter().fold(0.0, |acc, v| acc.max(v.abs()))
    }
}
