//! Interior node of an allocation tree.

use tracing::{debug, trace};

use crate::domain::context::ModelContext;
use crate::domain::item::{share_from_rate, AllocationItem, ItemKind, ItemState};

/// Interior item owning an ordered set of children.
///
/// Children compete for the node's allocation with elasticity `sigma`:
/// a child's unnormalized share is `rate^(1/sigma)` and the node's own
/// aggregated rate is `(sum of children's unnormalized shares)^sigma`.
/// Dropping a node drops its whole subtree.
#[derive(Debug)]
pub struct LandNode {
    state: ItemState,
    sigma: f64,
    children: Vec<Box<dyn AllocationItem>>,
}

impl LandNode {
    pub fn new(name: impl Into<String>, sigma: f64, ctx: &ModelContext) -> Self {
        Self {
            state: ItemState::new(name, ctx),
            sigma,
            children: Vec::new(),
        }
    }

    pub fn set_sigma(&mut self, sigma: f64) {
        self.sigma = sigma;
    }

    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    /// Hand this node's current allocation down to its children.
    ///
    /// Used for the root, whose allocation is the region's total land and
    /// must not be rescaled by its own (meaningless) share.
    pub fn allocate_children(&mut self, period: usize) {
        let allocation = self.state.land_allocation.get(period);
        for child in self.children.iter_mut() {
            child.calc_land_allocation(allocation, period);
        }
    }

    /// Push `rate` down to every child with this node's sigma.
    pub fn propagate_intrinsic_yield_mode(&mut self, rate: f64, period: usize) {
        if rate <= 0.0 {
            trace!(node = %self.state.name, period, rate, "non-positive rate, propagation stops");
            return;
        }
        for child in self.children.iter_mut() {
            child.set_intrinsic_yield_mode(rate, self.sigma, period);
        }
    }

    /// Give unmanaged children whatever land production children leave over.
    ///
    /// The residual is `land_allocation - managed land` at this level and is
    /// split among the non-production children in proportion to their
    /// current allocation (equally when none of them holds land yet). A child
    /// left with nothing has its whole unmanaged subtree emptied.
    pub fn reconcile_unmanaged_land(&mut self, region: &str, period: usize) {
        let mut managed = 0.0;
        let mut unmanaged_current = 0.0;
        let mut unmanaged_count = 0usize;
        for child in &self.children {
            let land = child.get_total_land_allocation(child.name(), period);
            if child.is_production_leaf() {
                managed += land;
            } else {
                unmanaged_current += land;
                unmanaged_count += 1;
            }
        }
        if unmanaged_count == 0 {
            return;
        }

        let mut residual = self.state.land_allocation.get(period) - managed;
        if residual < 0.0 {
            debug!(
                region,
                node = %self.state.name,
                period,
                residual,
                "land allocation above is less than land allocated, clamping unmanaged land to zero"
            );
            residual = 0.0;
        }

        for child in self.children.iter_mut() {
            if child.is_production_leaf() {
                continue;
            }
            let portion = if unmanaged_current > 0.0 {
                residual * child.get_total_land_allocation(child.name(), period) / unmanaged_current
            } else {
                residual / unmanaged_count as f64
            };
            if portion > 0.0 {
                child.set_unmanaged_land_allocation(region, portion, period);
            } else {
                child.clear_unmanaged_land(period);
            }
        }
    }

    fn find_descendant_mut(&mut self, target: &str) -> Option<&mut dyn AllocationItem> {
        self.children
            .iter_mut()
            .find_map(|child| child.find_item_mut(target))
    }

    fn find_descendant(&self, target: &str) -> Option<&dyn AllocationItem> {
        self.children
            .iter()
            .find_map(|child| child.find_item(target))
    }
}

impl AllocationItem for LandNode {
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
        ItemKind::Node
    }

    fn sigma(&self) -> Option<f64> {
        Some(self.sigma)
    }

    fn children(&self) -> &[Box<dyn AllocationItem>] {
        &self.children
    }

    fn children_mut(&mut self) -> &mut [Box<dyn AllocationItem>] {
        &mut self.children
    }

    fn as_node_mut(&mut self) -> Option<&mut LandNode> {
        Some(self)
    }

    fn add_child(&mut self, child: Box<dyn AllocationItem>) -> bool {
        // The search covers the whole subtree, not just direct children.
        if self.find_item(child.name()).is_some() {
            debug!(
                node = %self.state.name,
                child = child.name(),
                "child name already present, discarding duplicate"
            );
            return false;
        }
        self.children.push(child);
        true
    }

    fn is_production_leaf(&self) -> bool {
        self.children.iter().all(|child| child.is_production_leaf())
    }

    fn set_intrinsic_rate(
        &mut self,
        region: &str,
        land_type: &str,
        product: &str,
        rate: f64,
        period: usize,
    ) -> bool {
        self.find_descendant_mut(product)
            .map(|item| item.set_intrinsic_rate(region, land_type, product, rate, period))
            .unwrap_or(false)
    }

    fn set_cal_land_allocation(
        &mut self,
        land_type: &str,
        product: &str,
        cal_land_used: f64,
        harvest_period: usize,
        current_period: usize,
    ) -> bool {
        self.find_descendant_mut(product)
            .map(|item| {
                item.set_cal_land_allocation(
                    land_type,
                    product,
                    cal_land_used,
                    harvest_period,
                    current_period,
                )
            })
            .unwrap_or(false)
    }

    fn set_cal_observed_yield(
        &mut self,
        land_type: &str,
        product: &str,
        observed_yield: f64,
        period: usize,
    ) -> bool {
        self.find_descendant_mut(product)
            .map(|item| item.set_cal_observed_yield(land_type, product, observed_yield, period))
            .unwrap_or(false)
    }

    fn apply_ag_prod_change(
        &mut self,
        land_type: &str,
        product: &str,
        ag_prod_change: f64,
        period: usize,
    ) -> bool {
        self.find_descendant_mut(product)
            .map(|item| item.apply_ag_prod_change(land_type, product, ag_prod_change, period))
            .unwrap_or(false)
    }

    fn calc_yield_internal(
        &mut self,
        land_type: &str,
        product: &str,
        profit_rate: f64,
        avg_intrinsic_rate: f64,
        period: usize,
    ) -> bool {
        self.find_descendant_mut(product)
            .map(|item| {
                item.calc_yield_internal(land_type, product, profit_rate, avg_intrinsic_rate, period)
            })
            .unwrap_or(false)
    }

    fn get_yield(&self, land_type: &str, product: &str, period: usize) -> f64 {
        self.find_descendant(product)
            .map(|item| item.get_yield(land_type, product, period))
            .unwrap_or(0.0)
    }

    fn calc_land_shares(
        &mut self,
        region: &str,
        sigma_above: f64,
        _total_land_allocated: f64,
        period: usize,
    ) {
        self.set_unmanaged_land_values(region, period);

        // Unmanaged portions keep the weight of their baseline allocation
        // instead of competing on profitability alone.
        let total_base = self.get_base_land_allocation(period);
        let child_total = if self.is_production_leaf() || total_base == 0.0 {
            0.0
        } else {
            total_base
        };

        let mut unnormalized_sum = 0.0;
        for child in self.children.iter_mut() {
            child.calc_land_shares(region, self.sigma, child_total, period);
            unnormalized_sum += child.share(period);
        }

        for child in self.children.iter_mut() {
            child.normalize_land_allocation(unnormalized_sum, period);
        }

        let rate = if unnormalized_sum > 0.0 {
            unnormalized_sum.powf(self.sigma)
        } else {
            0.0
        };
        self.state.intrinsic_rate.set(period, rate);

        match share_from_rate(rate, sigma_above) {
            Some(share) => self.state.share.set(period, share),
            None => trace!(node = %self.state.name, period, "sigma above not positive, own share kept"),
        }
    }

    fn calc_land_allocation(&mut self, allocation_above: f64, period: usize) {
        let allocation = allocation_above * self.state.share.get(period);
        self.state.land_allocation.set(period, allocation);
        self.allocate_children(period);
    }

    fn set_init_shares(&mut self, allocation_above: f64, period: usize) {
        let total = self.get_total_land_allocation(&self.state.name, period);
        self.state.land_allocation.set(period, total);

        for child in self.children.iter_mut() {
            child.set_init_shares(total, period);
        }

        // The root is called with zero: its share is never used.
        if allocation_above > 0.0 {
            self.state.share.set(period, total / allocation_above);
        }
    }

    fn set_intrinsic_yield_mode(&mut self, rate_above: f64, sigma_above: f64, period: usize) {
        let share = self.state.share.get(period);
        let rate = if share > 0.0 {
            rate_above * share.powf(sigma_above)
        } else {
            0.0
        };
        self.propagate_intrinsic_yield_mode(rate, period);
    }

    fn set_unmanaged_land_allocation(&mut self, region: &str, allocation: f64, period: usize) {
        if self.is_production_leaf() {
            return;
        }
        if allocation <= 0.0 {
            if allocation < 0.0 {
                debug!(
                    region,
                    node = %self.state.name,
                    period,
                    allocation,
                    "land allocation above is less than land allocated"
                );
            }
            return;
        }
        self.state.land_allocation.set(period, allocation);

        let total = self.get_land_allocation(&self.state.name, period);
        if total > 0.0 {
            let scale = allocation / total;
            for child in self.children.iter_mut() {
                let current = child.get_land_allocation(child.name(), period);
                child.set_unmanaged_land_allocation(region, current * scale, period);
            }
        }
        self.calc_land_shares(region, 0.0, 0.0, period);
    }

    fn clear_unmanaged_land(&mut self, period: usize) {
        if self.is_production_leaf() {
            return;
        }
        for child in self.children.iter_mut() {
            child.clear_unmanaged_land(period);
        }
        let remaining = self.get_land_allocation(&self.state.name, period);
        self.state.land_allocation.set(period, remaining);
    }

    fn set_unmanaged_land_values(&mut self, region: &str, period: usize) {
        for child in self.children.iter_mut() {
            child.set_unmanaged_land_values(region, period);
        }
    }

    fn get_base_land_allocation(&self, period: usize) -> f64 {
        self.children
            .iter()
            .filter(|child| !child.is_production_leaf())
            .map(|child| child.get_base_land_allocation(period))
            .sum()
    }

    fn get_land_allocation(&self, product: &str, period: usize) -> f64 {
        let mut sum = 0.0;
        for child in &self.children {
            // Once this node matches, every child is summed under its own name.
            if self.state.name == product {
                sum += self.get_land_allocation(child.name(), period);
            } else {
                sum += child.get_land_allocation(product, period);
            }
        }
        sum
    }

    fn get_total_land_allocation(&self, product: &str, period: usize) -> f64 {
        let mut sum = 0.0;
        for child in &self.children {
            if self.state.name == product {
                sum += self.get_total_land_allocation(child.name(), period);
            } else {
                sum += child.get_total_land_allocation(product, period);
            }
        }
        sum
    }

    fn get_cal_ave_observed_rate(&self, target: &str, period: usize, sigma: f64) -> Option<f64> {
        if self.state.name == target {
            let share = self.state.share.get(period);
            let rate = self.state.intrinsic_rate.get(period);
            return Some(if share > 0.0 { rate / share.powf(sigma) } else { 0.0 });
        }
        self.find_descendant(target)
            .and_then(|item| item.get_cal_ave_observed_rate(target, period, sigma))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::leaf::ProductionLeaf;

    fn ctx() -> ModelContext {
        ModelContext::new(2005, 5, 3).unwrap()
    }

    #[test]
    fn given_nested_duplicate_when_adding_then_rejected() {
        let ctx = ctx();
        let mut inner = LandNode::new("crops", 0.5, &ctx);
        inner.add_child(Box::new(ProductionLeaf::new("corn", &ctx)));
        let mut root = LandNode::new("land", 1.0, &ctx);
        assert!(root.add_child(Box::new(inner)));

        assert!(!root.add_child(Box::new(ProductionLeaf::new("corn", &ctx))));
        assert!(!root.add_child(Box::new(ProductionLeaf::new("land", &ctx))));
        assert_eq!(root.child_count(), 1);
    }

    #[test]
    fn given_node_target_when_forwarding_setter_then_no_recursion_and_not_taken() {
        let ctx = ctx();
        let mut root = LandNode::new("land", 1.0, &ctx);
        root.add_child(Box::new(LandNode::new("crops", 1.0, &ctx)));

        assert!(!root.set_intrinsic_rate("r", "land", "crops", 2.0, 0));
        assert!(!root.set_intrinsic_rate("r", "land", "land", 2.0, 0));
    }

    #[test]
    fn given_empty_node_when_calculating_shares_then_zero_weight() {
        let ctx = ctx();
        let mut node = LandNode::new("empty", 1.0, &ctx);
        node.calc_land_shares("r", 1.0, 0.0, 0);
        assert_eq!(node.intrinsic_rate(0), 0.0);
        assert_eq!(node.share(0), 0.0);
        assert!(node.is_production_leaf());
    }
}
