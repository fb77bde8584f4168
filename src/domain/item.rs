//! Shared capability set of every member of an allocation tree.

use std::fmt;

use tracing::trace;

use crate::domain::context::ModelContext;
use crate::domain::node::LandNode;

/// One value per model period, sized once at construction.
///
/// Reads outside the horizon yield 0 and writes outside it are dropped, so
/// a caller passing a bad period gets a degraded result instead of a panic.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PeriodValues(Vec<f64>);

impl PeriodValues {
    pub fn zeros(period_count: usize) -> Self {
        Self(vec![0.0; period_count])
    }

    pub fn get(&self, period: usize) -> f64 {
        self.0.get(period).copied().unwrap_or(0.0)
    }

    pub fn set(&mut self, period: usize, value: f64) {
        match self.0.get_mut(period) {
            Some(slot) => *slot = value,
            None => trace!(period, len = self.0.len(), "period outside horizon, write dropped"),
        }
    }

    /// Overwrite all periods from `values`; lengths must already match.
    pub fn fill_from(&mut self, values: &[f64]) {
        for (slot, value) in self.0.iter_mut().zip(values) {
            *slot = *value;
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }
}

/// Per-period state common to nodes and leaves.
#[derive(Debug, Clone)]
pub struct ItemState {
    /// Unique among siblings under one parent
    pub name: String,
    pub land_allocation: PeriodValues,
    pub share: PeriodValues,
    pub intrinsic_rate: PeriodValues,
}

impl ItemState {
    pub fn new(name: impl Into<String>, ctx: &ModelContext) -> Self {
        let periods = ctx.period_count();
        Self {
            name: name.into(),
            land_allocation: PeriodValues::zeros(periods),
            share: PeriodValues::zeros(periods),
            intrinsic_rate: PeriodValues::zeros(periods),
        }
    }
}

/// Variant label, used for reporting and rendering only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    Node,
    Production,
    Unmanaged,
    Vintage,
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ItemKind::Node => "node",
            ItemKind::Production => "leaf",
            ItemKind::Unmanaged => "unmanaged",
            ItemKind::Vintage => "vintage",
        };
        f.write_str(label)
    }
}

/// Receives every item of a tree in preorder (self, then children left to right).
pub trait ItemVisitor {
    fn visit(&mut self, item: &dyn AllocationItem, depth: usize);
}

/// Unnormalized share from an intrinsic rate: `rate^(1/sigma_above)`.
///
/// `None` when `sigma_above` is not positive: the exponent is undefined and
/// the caller keeps whatever share it had. Non-positive rates give 0.
pub(crate) fn share_from_rate(rate: f64, sigma_above: f64) -> Option<f64> {
    if sigma_above <= 0.0 {
        return None;
    }
    if rate > 0.0 {
        Some(rate.powf(1.0 / sigma_above))
    } else {
        Some(0.0)
    }
}

/// Member of a land allocation tree.
///
/// Name-addressed operations (`set_intrinsic_rate` and friends) are only
/// meaningful on leaves; nodes forward them to the first descendant with
/// the requested name. They return whether the call was taken by someone,
/// callers at the public boundary treat `false` as a silent no-op.
pub trait AllocationItem: fmt::Debug + Send + Sync {
    fn as_item(&self) -> &dyn AllocationItem;
    fn as_item_mut(&mut self) -> &mut dyn AllocationItem;
    fn state(&self) -> &ItemState;
    fn state_mut(&mut self) -> &mut ItemState;
    fn kind(&self) -> ItemKind;

    fn name(&self) -> &str {
        &self.state().name
    }

    fn land_allocation(&self, period: usize) -> f64 {
        self.state().land_allocation.get(period)
    }

    fn share(&self, period: usize) -> f64 {
        self.state().share.get(period)
    }

    fn intrinsic_rate(&self, period: usize) -> f64 {
        self.state().intrinsic_rate.get(period)
    }

    /// Elasticity among this item's children; leaves have none.
    fn sigma(&self) -> Option<f64> {
        None
    }

    fn children(&self) -> &[Box<dyn AllocationItem>] {
        &[]
    }

    fn children_mut(&mut self) -> &mut [Box<dyn AllocationItem>] {
        &mut []
    }

    fn as_node_mut(&mut self) -> Option<&mut LandNode> {
        None
    }

    /// Adopt `child` unless its name already exists in this subtree.
    fn add_child(&mut self, child: Box<dyn AllocationItem>) -> bool {
        trace!(parent = self.name(), child = child.name(), "leaves cannot adopt children");
        false
    }

    /// First item named `target` in preorder, this item included.
    fn find_item(&self, target: &str) -> Option<&dyn AllocationItem> {
        if self.name() == target {
            return Some(self.as_item());
        }
        self.children()
            .iter()
            .find_map(|child| child.find_item(target))
    }

    fn find_item_mut(&mut self, target: &str) -> Option<&mut dyn AllocationItem> {
        if self.name() == target {
            return Some(self.as_item_mut());
        }
        self.children_mut()
            .iter_mut()
            .find_map(|child| child.find_item_mut(target))
    }

    fn accept(&self, visitor: &mut dyn ItemVisitor, depth: usize) {
        visitor.visit(self.as_item(), depth);
        for child in self.children() {
            child.accept(visitor, depth + 1);
        }
    }

    /// True iff every leaf beneath (or this leaf itself) is a production leaf.
    fn is_production_leaf(&self) -> bool;

    fn set_intrinsic_rate(
        &mut self,
        _region: &str,
        _land_type: &str,
        _product: &str,
        _rate: f64,
        _period: usize,
    ) -> bool {
        false
    }

    fn set_cal_land_allocation(
        &mut self,
        _land_type: &str,
        _product: &str,
        _cal_land_used: f64,
        _harvest_period: usize,
        _current_period: usize,
    ) -> bool {
        false
    }

    fn set_cal_observed_yield(
        &mut self,
        _land_type: &str,
        _product: &str,
        _observed_yield: f64,
        _period: usize,
    ) -> bool {
        false
    }

    fn apply_ag_prod_change(
        &mut self,
        _land_type: &str,
        _product: &str,
        _ag_prod_change: f64,
        _period: usize,
    ) -> bool {
        false
    }

    fn calc_yield_internal(
        &mut self,
        _land_type: &str,
        _product: &str,
        _profit_rate: f64,
        _avg_intrinsic_rate: f64,
        _period: usize,
    ) -> bool {
        false
    }

    fn get_yield(&self, _land_type: &str, _product: &str, _period: usize) -> f64 {
        0.0
    }

    /// Compute this item's unnormalized share for `period`.
    fn calc_land_shares(
        &mut self,
        region: &str,
        sigma_above: f64,
        total_land_allocated: f64,
        period: usize,
    );

    fn normalize_land_allocation(&mut self, sum_of_shares: f64, period: usize) {
        let share = &mut self.state_mut().share;
        if sum_of_shares > 0.0 {
            let normalized = share.get(period) / sum_of_shares;
            share.set(period, normalized);
        } else {
            share.set(period, 0.0);
        }
    }

    fn calc_land_allocation(&mut self, allocation_above: f64, period: usize) {
        let state = self.state_mut();
        let allocation = allocation_above * state.share.get(period);
        state.land_allocation.set(period, allocation);
    }

    /// Calibration pass: derive the share from the known allocation.
    fn set_init_shares(&mut self, allocation_above: f64, period: usize) {
        let state = self.state_mut();
        if allocation_above > 0.0 {
            let share = state.land_allocation.get(period) / allocation_above;
            state.share.set(period, share);
        }
    }

    fn set_intrinsic_yield_mode(&mut self, _rate_above: f64, _sigma_above: f64, _period: usize) {}

    fn set_unmanaged_land_allocation(&mut self, _region: &str, _allocation: f64, _period: usize) {}

    /// Release every unmanaged hectare held in this subtree.
    fn clear_unmanaged_land(&mut self, _period: usize) {}

    fn set_unmanaged_land_values(&mut self, _region: &str, _period: usize) {}

    /// Baseline allocation weighting the reserved portion of a node.
    fn get_base_land_allocation(&self, _period: usize) -> f64 {
        0.0
    }

    fn get_land_allocation(&self, product: &str, period: usize) -> f64 {
        if self.name() == product {
            self.land_allocation(period)
        } else {
            0.0
        }
    }

    fn get_total_land_allocation(&self, product: &str, period: usize) -> f64 {
        self.get_land_allocation(product, period)
    }

    /// `intrinsic_rate / share^sigma` of the item named `target`.
    fn get_cal_ave_observed_rate(&self, target: &str, period: usize, sigma: f64) -> Option<f64> {
        if self.name() != target {
            return None;
        }
        let share = self.share(period);
        if share > 0.0 {
            Some(self.intrinsic_rate(period) / share.powf(sigma))
        } else {
            Some(0.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_period_outside_horizon_when_reading_then_zero() {
        let mut values = PeriodValues::zeros(2);
        values.set(1, 3.5);
        values.set(7, 9.0);
        assert_eq!(values.get(1), 3.5);
        assert_eq!(values.get(7), 0.0);
        assert_eq!(values.len(), 2);
    }

    #[test]
    fn given_non_positive_sigma_above_when_computing_share_then_none() {
        assert_eq!(share_from_rate(4.0, 0.0), None);
        assert_eq!(share_from_rate(4.0, -1.0), None);
        assert_eq!(share_from_rate(-2.0, 1.0), Some(0.0));
        assert_eq!(share_from_rate(4.0, 0.5), Some(16.0));
    }
}
