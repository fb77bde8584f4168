//! Independent regional trees driven side by side.

use rayon::prelude::*;
use tracing::debug;

use crate::domain::allocator::LandAllocator;
use crate::domain::error::DomainError;

/// One allocator per region. Regions share no state, so a period can be
/// computed for all of them in parallel.
#[derive(Debug, Default)]
pub struct RegionSet {
    allocators: Vec<LandAllocator>,
}

impl RegionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, allocator: LandAllocator) -> Result<(), DomainError> {
        if self.get(allocator.region()).is_some() {
            return Err(DomainError::DuplicateRegion(allocator.region().to_string()));
        }
        self.allocators.push(allocator);
        Ok(())
    }

    pub fn get(&self, region: &str) -> Option<&LandAllocator> {
        self.allocators.iter().find(|a| a.region() == region)
    }

    pub fn get_mut(&mut self, region: &str) -> Option<&mut LandAllocator> {
        self.allocators.iter_mut().find(|a| a.region() == region)
    }

    pub fn iter(&self) -> impl Iterator<Item = &LandAllocator> {
        self.allocators.iter()
    }

    pub fn len(&self) -> usize {
        self.allocators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.allocators.is_empty()
    }

    /// Apply `f` to every region in parallel.
    pub fn for_each_parallel<F>(&mut self, f: F)
    where
        F: Fn(&mut LandAllocator) + Send + Sync,
    {
        debug!(regions = self.allocators.len(), "running regions in parallel");
        self.allocators.par_iter_mut().for_each(f);
    }

    /// Shares then allocation for `period`, every region in parallel.
    pub fn calc_period(&mut self, period: usize) {
        self.for_each_parallel(|allocator| allocator.calc_period(period));
    }
}
