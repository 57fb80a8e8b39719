use crate::catalog::PracticeCatalog;
use crate::error::AllocationError;
use crate::models::Practice;
use std::collections::{HashMap, HashSet};

/// Practices claimed by one place, in selection order.
#[derive(Debug, Clone, PartialEq)]
pub struct ClaimedGroup {
    pub place: String,
    pub practices: Vec<String>,
}

/// Records which practices have been claimed this session. A practice
/// belongs to at most one place until `reset`.
#[derive(Debug, Clone, Default)]
pub struct AssignmentTracker {
    history: Vec<ClaimedGroup>,
    owner: HashMap<String, usize>,
}

impl AssignmentTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Unclaimed practices of `region`, in catalog order.
    pub fn available<'a>(&self, catalog: &'a PracticeCatalog, region: &str) -> Vec<&'a Practice> {
        catalog
            .practices()
            .iter()
            .filter(|p| p.region == region && !self.is_claimed(&p.id))
            .collect()
    }

    pub fn is_claimed(&self, practice: &str) -> bool {
        self.owner.contains_key(practice)
    }

    /// Check a claim without recording it.
    pub fn check(&self, practices: &[String]) -> Result<(), AllocationError> {
        if practices.is_empty() {
            return Err(AllocationError::EmptySelection);
        }
        let mut seen = HashSet::with_capacity(practices.len());
        for practice in practices {
            if !seen.insert(practice.as_str()) {
                return Err(AllocationError::RepeatedPractice(practice.clone()));
            }
            if let Some(&group) = self.owner.get(practice) {
                return Err(AllocationError::AlreadyClaimed {
                    practice: practice.clone(),
                    place: self.history[group].place.clone(),
                });
            }
        }
        Ok(())
    }

    /// Claim `practices` for `place` as one group. Nothing is recorded on error.
    pub fn claim(&mut self, practices: &[String], place: &str) -> Result<(), AllocationError> {
        self.check(practices)?;

        let group = self.history.len();
        for practice in practices {
            self.owner.insert(practice.clone(), group);
        }
        self.history.push(ClaimedGroup {
            place: place.to_string(),
            practices: practices.to_vec(),
        });
        Ok(())
    }

    pub fn history(&self) -> &[ClaimedGroup] {
        &self.history
    }

    pub fn claimed_count(&self) -> usize {
        self.owner.len()
    }

    pub fn reset(&mut self) {
        self.history.clear();
        self.owner.clear();
    }
}
