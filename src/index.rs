use crate::error::AllocationError;
use crate::models::{Measure, NeedIndices, ResultRow, RowKind};

/// Recompute the need indices of every row against the last row, which must
/// be a region total:
///
/// `index = (row[m] / row[GP_pop]) / (last[m] / last[GP_pop])`
///
/// A measure the region has none of is left undefined. A zero GP population
/// on any row is an error, and then rows are left untouched.
pub fn compute_indices(rows: &mut [ResultRow]) -> Result<(), AllocationError> {
    let denominator = match rows.last() {
        Some(last) if last.kind == RowKind::RegionTotal => last,
        _ => return Err(AllocationError::MissingRegionTotal),
    };
    let region_population = population(denominator)?;

    let mut computed = Vec::with_capacity(rows.len());
    for row in rows.iter() {
        let row_population = population(row)?;
        computed.push(NeedIndices::from_fn(|measure| {
            let region_rate = denominator.totals[measure] as f64 / region_population;
            if region_rate == 0.0 {
                return None;
            }
            let index = row.totals[measure] as f64 / row_population / region_rate;
            Some(index).filter(|index| index.is_finite())
        }));
    }

    for (row, indices) in rows.iter_mut().zip(computed) {
        row.indices = indices;
    }
    Ok(())
}

fn population(row: &ResultRow) -> Result<f64, AllocationError> {
    match row.totals[Measure::GpPop] {
        0 => Err(AllocationError::DivisionByZero {
            row: row.label.clone(),
        }),
        population => Ok(population as f64),
    }
}
