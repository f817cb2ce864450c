use super::model::ReportRow;
use crate::error::{ReportError, Result};
use crate::settings::ReportSettings;

/// A validated 1-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub number: usize,
    pub size: usize,
}

fn positive(name: &str, value: i64) -> Result<usize> {
    if value < 1 {
        return Err(ReportError::InvalidArgument(format!(
            "{} must be >= 1, got {}",
            name, value
        )));
    }
    usize::try_from(value)
        .map_err(|_| ReportError::InvalidArgument(format!("{} out of range: {}", name, value)))
}

impl Page {
    pub fn new(number: i64, size: i64) -> Result<Self> {
        Ok(Self {
            number: positive("page", number)?,
            size: positive("pageSize", size)?,
        })
    }

    /// Fill unspecified values from settings, then validate.
    pub fn resolve(number: Option<i64>, size: Option<i64>, settings: &ReportSettings) -> Result<Self> {
        Self::new(
            number.unwrap_or(settings.default_page),
            size.unwrap_or(settings.default_page_size),
        )
    }

    pub fn offset(&self) -> usize {
        (self.number - 1).saturating_mul(self.size)
    }
}

/// Sort by remaining days (stable, so ties keep input order) and cut out one page.
/// Returns the page together with the number of rows before pagination.
pub fn rank(mut rows: Vec<ReportRow>, page: Page) -> (Vec<ReportRow>, usize) {
    let total = rows.len();
    rows.sort_by_key(|row| row.days);
    let items = rows.into_iter().skip(page.offset()).take(page.size).collect();
    (items, total)
}
