//! Unmanaged leaf: the reserved pool of land not driven by profit.

use tracing::trace;

use crate::domain::context::ModelContext;
use crate::domain::item::{share_from_rate, AllocationItem, ItemKind, ItemState, PeriodValues};

/// Terminal item whose share follows a fixed baseline weight.
///
/// Its intrinsic rate is refreshed from `base_intrinsic_rate` before every
/// share computation, and when its parent hands it a base-land total its
/// share is scaled by `base_land_allocation / total`, so reserved land keeps
/// its original proportions rather than chasing profitability.
#[derive(Debug, Clone)]
pub struct UnmanagedLeaf {
    state: ItemState,
    base_land_allocation: PeriodValues,
    base_intrinsic_rate: PeriodValues,
    /// Periods whose rate was set explicitly and must not be carried over
    rate_given: Vec<bool>,
}

impl UnmanagedLeaf {
    pub fn new(name: impl Into<String>, ctx: &ModelContext) -> Self {
        let periods = ctx.period_count();
        Self {
            state: ItemState::new(name, ctx),
            base_land_allocation: PeriodValues::zeros(periods),
            base_intrinsic_rate: PeriodValues::zeros(periods),
            rate_given: vec![false; periods],
        }
    }

    pub fn base_land_allocation(&self, period: usize) -> f64 {
        self.base_land_allocation.get(period)
    }

    pub fn set_base_land_allocation(&mut self, period: usize, value: f64) {
        self.base_land_allocation.set(period, value);
    }

    pub fn base_intrinsic_rate(&self, period: usize) -> f64 {
        self.base_intrinsic_rate.get(period)
    }

    pub fn set_base_intrinsic_rate(&mut self, period: usize, value: f64) {
        self.base_intrinsic_rate.set(period, value);
        self.mark_rate_given(period);
    }

    fn mark_rate_given(&mut self, period: usize) {
        if let Some(given) = self.rate_given.get_mut(period) {
            *given = true;
        }
    }

    fn rate_given(&self, period: usize) -> bool {
        self.rate_given.get(period).copied().unwrap_or(false)
    }

    /// Treat every period of the baseline rate as explicitly given.
    pub(crate) fn mark_all_rates_given(&mut self) {
        self.rate_given.iter_mut().for_each(|given| *given = true);
    }

    pub(crate) fn base_land_allocation_mut(&mut self) -> &mut PeriodValues {
        &mut self.base_land_allocation
    }

    pub(crate) fn base_intrinsic_rate_mut(&mut self) -> &mut PeriodValues {
        &mut self.base_intrinsic_rate
    }
}

impl AllocationItem for UnmanagedLeaf {
    fn as_item(&self) -> &dyn AllocationItem {
        self
    }

    fn as_item_mut(&mut self) -> &mut dyn AllocationItem {
        self
    }

    fn state(&self) -> &ItemState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut ItemState {
        &mut self.state
    }

    fn kind(&self) -> ItemKind {
        ItemKind::Unmanaged
    }

    fn is_production_leaf(&self) -> bool {
        false
    }

    /// Overrides the baseline rate; picked up by the next share computation.
    fn set_intrinsic_rate(
        &mut self,
        _region: &str,
        _land_type: &str,
        _product: &str,
        rate: f64,
        period: usize,
    ) -> bool {
        self.base_intrinsic_rate.set(period, rate.max(0.0));
        self.mark_rate_given(period);
        true
    }

    fn calc_land_shares(
        &mut self,
        _region: &str,
        sigma_above: f64,
        total_land_allocated: f64,
        period: usize,
    ) {
        let Some(mut share) = share_from_rate(self.state.intrinsic_rate.get(period), sigma_above)
        else {
            trace!(leaf = %self.state.name, period, "sigma above not positive, share kept");
            return;
        };
        if total_land_allocated > 0.0 {
            share *= self.base_land_allocation.get(period) / total_land_allocated;
        }
        self.state.share.set(period, share);
    }

    fn set_init_shares(&mut self, allocation_above: f64, period: usize) {
        let land = self.state.land_allocation.get(period);
        if self.base_land_allocation.get(period) == 0.0 {
            self.base_land_allocation.set(period, land);
        }
        if allocation_above > 0.0 {
            self.state.share.set(period, land / allocation_above);
        }
    }

    fn set_unmanaged_land_allocation(&mut self, _region: &str, allocation: f64, period: usize) {
        self.state.land_allocation.set(period, allocation.max(0.0));
        // The leaf is the whole of the pool it was handed.
        self.state.share.set(period, 1.0);
    }

    fn clear_unmanaged_land(&mut self, period: usize) {
        self.state.land_allocation.set(period, 0.0);
        self.state.share.set(period, 0.0);
    }

    /// Refresh the rate from the baseline, carrying baselines forward into
    /// periods that were never given one.
    fn set_unmanaged_land_values(&mut self, _region: &str, period: usize) {
        if period > 0 {
            if self.base_land_allocation.get(period) == 0.0 {
                let previous = self.base_land_allocation.get(period - 1);
                self.base_land_allocation.set(period, previous);
            }
            if !self.rate_given(period) && self.base_intrinsic_rate.get(period) == 0.0 {
                let previous = self.base_intrinsic_rate.get(period - 1);
                self.base_intrinsic_rate.set(period, previous);
            }
        }
        let rate = self.base_intrinsic_rate.get(period);
        self.state.intrinsic_rate.set(period, rate);
    }

    fn get_base_land_allocation(&self, period: usize) -> f64 {
        self.base_land_allocation.get(period)
    }
}
