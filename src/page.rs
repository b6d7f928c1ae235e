//! Page requests derived from `from`/`size` query parameters
use super::error::{ShareItError, ShareItResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub index: usize,
    pub size: usize,
}

impl PageRequest {
    /// `from` is not an offset: it snaps down to the page `from / size`
    /// lands on, so `from = 15, size = 10` is page 1, same as `from = 10`.
    pub fn of(from: usize, size: usize) -> ShareItResult<Self> {
        if size == 0 {
            return Err(ShareItError::validation("Page size must be positive"));
        }
        Ok(Self {
            index: from / size,
            size,
        })
    }

    pub fn unpaged() -> Self {
        Self {
            index: 0,
            size: usize::MAX,
        }
    }

    pub fn offset(&self) -> usize {
        self.index.saturating_mul(self.size)
    }

    /// Slice an already sorted sequence down to this page.
    pub fn apply<T>(&self, rows: impl IntoIterator<Item = T>) -> Vec<T> {
        rows.into_iter().skip(self.offset()).take(self.size).collect()
    }
}
