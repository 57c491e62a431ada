//! Aggregation with absent-vs-zero semantics
//!
//! A value is absent (`None`) when it was never measured, which is different
//! from measured as zero. Combining skips absent values; the result is absent
//! only if every input was.

/// Sum the present values, or `None` if there are none
pub fn combine_sum<I>(values: I) -> Option<u64>
where
    I: IntoIterator<Item = Option<u64>>,
{
    values
        .into_iter()
        .flatten()
        .fold(None, |acc, v| Some(acc.unwrap_or(0).saturating_add(v)))
}

/// Maximum of the present values, or `None` if there are none
pub fn combine_max<T, I>(values: I) -> Option<T>
where
    T: Ord,
    I: IntoIterator<Item = Option<T>>,
{
    values.into_iter().flatten().max()
}

/// File count, sizes and newest mtime over some set of files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Totals {
    pub file_count: Option<u64>,
    pub allocated_size: Option<u64>,
    pub apparent_size: Option<u64>,
    pub mtime: Option<i64>,
}

impl Totals {
    /// Combine several totals field by field
    pub fn combine<'a, I>(parts: I) -> Totals
    where
        I: IntoIterator<Item = &'a Totals>,
    {
        let parts: Vec<&Totals> = parts.into_iter().collect();
        Totals {
            file_count: combine_sum(parts.iter().map(|t| t.file_count)),
            allocated_size: combine_sum(parts.iter().map(|t| t.allocated_size)),
            apparent_size: combine_sum(parts.iter().map(|t| t.apparent_size)),
            mtime: combine_max(parts.iter().map(|t| t.mtime)),
        }
    }
}
