use crate::error::AllocationError;
use crate::models::{Measure, Practice, Totals};

/// Sum the figures of a place's practices. A place needs at least one practice.
pub fn aggregate<'a, I>(practices: I) -> Result<Totals, AllocationError>
where
    I: IntoIterator<Item = &'a Practice>,
{
    let mut practices = practices.into_iter().peekable();
    if practices.peek().is_none() {
        return Err(AllocationError::EmptySelection);
    }
    Ok(sum(practices))
}

/// Sum the figures of every practice given; nothing sums to all-zero totals.
///
/// Figures are added as read and only truncated toward zero once summed.
pub fn sum<'a, I>(practices: I) -> Totals
where
    I: IntoIterator<Item = &'a Practice>,
{
    let mut sums = [0.0f64; Measure::COUNT];
    for practice in practices {
        for (total, measure) in sums.iter_mut().zip(Measure::ALL) {
            *total += practice.figures[measure];
        }
    }
    Totals::from_fn(|measure| sums[measure as usize] as i64)
}
