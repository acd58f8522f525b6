/// A `[row, column]` index into a raster slice
pub type GridIdx2D = [usize; 2];

/// A rectangular, half-open range of pixels `[row_start, row_end) × [column_start, column_end)`
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct PixelWindow {
    pub row_start: usize,
    pub row_end: usize,
    pub column_start: usize,
    pub column_end: usize,
}

impl PixelWindow {
    pub fn rows(&self) -> usize {
        self.row_end.saturating_sub(self.row_start)
    }

    pub fn columns(&self) -> usize {
        self.column_end.saturating_sub(self.column_start)
    }

    pub fn number_of_pixels(&self) -> usize {
        self.rows() * self.columns()
    }

    pub fn is_empty(&self) -> bool {
        self.number_of_pixels() == 0
    }

    /// Iterates all pixel indices of the window in row-major order
    pub fn indices(&self) -> impl Iterator<Item = GridIdx2D> + '_ {
        (self.row_start..self.row_end).flat_map(move |row| {
            (self.column_start..self.column_end).map(move |column| [row, column])
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indices_are_row_major() {
        let window = PixelWindow {
            row_start: 1,
            row_end: 3,
            column_start: 4,
            column_end: 6,
        };

        assert_eq!(window.number_of_pixels(), 4);
        assert_eq!(
            window.indices().collect::<Vec<_>>(),
            vec![[1, 4], [1, 5], [2, 4], [2, 5]]
        );
    }

    #[test]
    fn empty() {
        let window = PixelWindow {
            row_start: 3,
            row_end: 3,
            column_start: 0,
            column_end: 10,
        };

        assert!(window.is_empty());
        assert_eq!(window.indices().count(), 0);
    }
}
