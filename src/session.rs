use crate::aggregate;
use crate::catalog::PracticeCatalog;
use crate::error::AllocationError;
use crate::index::compute_indices;
use crate::models::{Practice, ResultRow, RowKind, Totals};
use crate::tracker::{AssignmentTracker, ClaimedGroup};

/// A named practice selection, whether picked by hand or imported in bulk.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaceSelection {
    pub name: String,
    pub practices: Vec<String>,
}

impl PlaceSelection {
    pub fn new<I, S>(name: &str, practices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.to_string(),
            practices: practices.into_iter().map(Into::into).collect(),
        }
    }
}

impl From<(String, Vec<String>)> for PlaceSelection {
    fn from((name, practices): (String, Vec<String>)) -> Self {
        Self { name, practices }
    }
}

/// Result table built up over a session, with the practice groups behind it.
#[derive(Debug, Clone, Default)]
pub struct SessionAccumulator {
    rows: Vec<ResultRow>,
    groups: Vec<ClaimedGroup>,
}

impl SessionAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rows(&self) -> &[ResultRow] {
        &self.rows
    }

    pub fn groups(&self) -> &[ClaimedGroup] {
        &self.groups
    }

    pub fn has_place(&self, name: &str) -> bool {
        self.groups.iter().any(|group| group.place == name)
    }

    /// Append a place row and a fresh region total, then re-index every row.
    pub fn add_place(
        &mut self,
        group: ClaimedGroup,
        totals: Totals,
        region: &str,
        region_totals: Totals,
    ) -> Result<(), AllocationError> {
        let mut rows = Vec::with_capacity(self.rows.len() + 2);
        rows.extend_from_slice(&self.rows);
        rows.push(ResultRow::place(&group.place, totals));
        rows.push(ResultRow::region_total(region, region_totals));
        compute_indices(&mut rows)?;

        self.rows = rows;
        self.groups.push(group);
        Ok(())
    }

    /// Place rows only, in creation order.
    pub fn places(&self) -> impl Iterator<Item = &ResultRow> {
        self.rows.iter().filter(|row| row.kind == RowKind::Place)
    }

    /// One row per group: the place name followed by its practices. Rows are ragged.
    pub fn export_places_table(&self) -> Vec<Vec<String>> {
        self.groups
            .iter()
            .map(|group| {
                std::iter::once(group.place.clone())
                    .chain(group.practices.iter().cloned())
                    .collect()
            })
            .collect()
    }

    pub fn reset(&mut self) {
        self.rows.clear();
        self.groups.clear();
    }
}

/// One analyst's working state over a shared catalog.
#[derive(Debug)]
pub struct AllocationSession<'a> {
    catalog: &'a PracticeCatalog,
    tracker: AssignmentTracker,
    accumulator: SessionAccumulator,
}

impl<'a> AllocationSession<'a> {
    pub fn new(catalog: &'a PracticeCatalog) -> Self {
        Self {
            catalog,
            tracker: AssignmentTracker::new(),
            accumulator: SessionAccumulator::new(),
        }
    }

    pub fn catalog(&self) -> &'a PracticeCatalog {
        self.catalog
    }

    pub fn available(&self, region: &str) -> Vec<&'a Practice> {
        self.tracker.available(self.catalog, region)
    }

    /// Every still-available practice of `region` as one selection.
    pub fn select_all(&self, region: &str, name: &str) -> PlaceSelection {
        PlaceSelection::new(name, self.available(region).into_iter().map(|p| p.id.clone()))
    }

    pub fn rows(&self) -> &[ResultRow] {
        self.accumulator.rows()
    }

    pub fn accumulator(&self) -> &SessionAccumulator {
        &self.accumulator
    }

    pub fn tracker(&self) -> &AssignmentTracker {
        &self.tracker
    }

    /// Claim the selected practices as a new place in `region`, aggregate it
    /// and re-index the whole table against `region`. On error nothing changes.
    pub fn add_place(
        &mut self,
        region: &str,
        selection: PlaceSelection,
    ) -> Result<(), AllocationError> {
        let name = selection.name.trim();
        if name.is_empty() {
            return Err(AllocationError::MissingName);
        }
        if self.accumulator.has_place(name) {
            return Err(AllocationError::DuplicateName(name.to_string()));
        }
        if selection.practices.is_empty() {
            return Err(AllocationError::EmptySelection);
        }

        let mut members: Vec<&Practice> = Vec::with_capacity(selection.practices.len());
        for id in &selection.practices {
            let practice = self
                .catalog
                .get(id)
                .ok_or_else(|| AllocationError::UnknownPractice(id.clone()))?;
            if members.iter().any(|m| m.id == practice.id) {
                continue;
            }
            if practice.region != region {
                return Err(AllocationError::OutsideRegion {
                    practice: practice.id.clone(),
                    region: region.to_string(),
                    actual: practice.region.clone(),
                });
            }
            members.push(practice);
        }
        let ids: Vec<String> = members.iter().map(|p| p.id.clone()).collect();
        self.tracker.check(&ids)?;

        let totals = aggregate::aggregate(members.iter().copied())?;
        let region_totals = aggregate::sum(self.catalog.region(region));
        let group = ClaimedGroup {
            place: name.to_string(),
            practices: ids.clone(),
        };
        self.accumulator.add_place(group, totals, region, region_totals)?;

        // cannot fail: the selection was checked above
        self.tracker.claim(&ids, name)?;
        Ok(())
    }

    /// Forget every place and claim. The catalog is untouched.
    pub fn reset(&mut self) {
        self.tracker.reset();
        self.accumulator.reset();
    }
}
