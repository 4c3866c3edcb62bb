use crate::error::SelectionError;
use configuration::SelectionPolicy;
use core_types::Instrument;
use serde::Serialize;

pub mod error;

/// Which selection controls should be enabled after a mutation.
///
/// Derived from the size of the working set and the policy alone; the
/// instruments themselves are never re-inspected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Availability {
    pub size: usize,
    /// Another instrument may be added.
    pub can_add: bool,
    /// At least one instrument can be removed.
    pub can_remove: bool,
    /// Optimization actions may be submitted.
    pub actionable: bool,
}

impl Availability {
    pub fn for_size(size: usize, policy: &SelectionPolicy) -> Self {
        let within_max = policy.max_instruments.is_none_or(|max| size <= max);
        Self {
            size,
            can_add: policy.max_instruments.is_none_or(|max| size < max),
            can_remove: size > 0,
            actionable: size >= policy.min_instruments && within_max,
        }
    }
}

/// The bounded, duplicate-free working set of instruments plus the pool of
/// candidates not yet selected.
#[derive(Debug, Clone)]
pub struct SelectionSet {
    policy: SelectionPolicy,
    selected: Vec<Instrument>,
    candidates: Vec<Instrument>,
}

impl SelectionSet {
    /// Creates an empty working set whose candidate pool is the given catalog.
    pub fn new(policy: SelectionPolicy, catalog: impl IntoIterator<Item = Instrument>) -> Self {
        Self {
            policy,
            selected: Vec::new(),
            candidates: catalog.into_iter().collect(),
        }
    }

    /// Adds an instrument to the end of the working set and takes it out of the candidate pool.
    pub fn add(&mut self, instrument: Instrument) -> Result<Availability, SelectionError> {
        if self.contains(&instrument.identifier) {
            return Err(SelectionError::Duplicate(instrument.identifier));
        }
        if let Some(max) = self.policy.max_instruments {
            if self.selected.len() >= max {
                return Err(SelectionError::CapacityExceeded { max });
            }
        }

        self.candidates.retain(|c| c.identifier != instrument.identifier);
        tracing::debug!(identifier = %instrument.identifier, "Instrument added to working set.");
        self.selected.push(instrument);
        Ok(self.availability())
    }

    /// Moves a candidate, looked up by identifier, into the working set.
    pub fn add_by_identifier(&mut self, identifier: &str) -> Result<Availability, SelectionError> {
        if self.contains(identifier) {
            return Err(SelectionError::Duplicate(identifier.to_string()));
        }
        let instrument = self
            .candidates
            .iter()
            .find(|c| c.identifier == identifier)
            .cloned()
            .ok_or_else(|| SelectionError::UnknownInstrument(identifier.to_string()))?;
        self.add(instrument)
    }

    /// Removes an instrument from the working set and returns it, unchanged, to
    /// the candidate pool. Removing an absent identifier does nothing.
    pub fn remove(&mut self, identifier: &str) -> Availability {
        if let Some(index) = self.selected.iter().position(|i| i.identifier == identifier) {
            let instrument = self.selected.remove(index);
            tracing::debug!(identifier = %instrument.identifier, "Instrument returned to candidate pool.");
            self.candidates.push(instrument);
        }
        self.availability()
    }

    pub fn size(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.selected.iter().any(|i| i.identifier == identifier)
    }

    /// Selected instruments in the order they were added.
    pub fn instruments(&self) -> &[Instrument] {
        &self.selected
    }

    /// Selected identifiers in the order they were added. This is the ticker order of requests.
    pub fn identifiers(&self) -> Vec<String> {
        self.selected.iter().map(|i| i.identifier.clone()).collect()
    }

    /// Instruments that can still be added.
    pub fn candidates(&self) -> &[Instrument] {
        &self.candidates
    }

    pub fn policy(&self) -> &SelectionPolicy {
        &self.policy
    }

    pub fn availability(&self) -> Availability {
        Availability::for_size(self.selected.len(), &self.policy)
    }
}
