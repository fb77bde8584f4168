//! Region-level entry point that an outer market solver drives.

use tracing::{debug, instrument, warn};

use crate::domain::item::{AllocationItem, ItemVisitor};
use crate::domain::leaf::ProductionLeaf;
use crate::domain::node::LandNode;
use crate::domain::ModelContext;

/// Controls how loudly the tree reports requests it cannot satisfy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Diagnostics {
    /// WARN when a name-addressed call finds no target
    pub warn_on_missing: bool,
    /// WARN when a duplicate child is discarded
    pub warn_on_duplicate: bool,
}

/// Land allocation tree of one region.
///
/// Owns the root node, whose `land_allocation` is the region's total land.
/// All name-addressed calls silently do nothing when the name is absent so
/// that calibration data for subtrees that were never built cannot abort a
/// run.
#[derive(Debug)]
pub struct LandAllocator {
    region: String,
    root: LandNode,
    context: ModelContext,
    diagnostics: Diagnostics,
}

impl LandAllocator {
    pub fn new(region: impl Into<String>, root: LandNode, context: ModelContext) -> Self {
        Self {
            region: region.into(),
            root,
            context,
            diagnostics: Diagnostics::default(),
        }
    }

    pub fn with_diagnostics(mut self, diagnostics: Diagnostics) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn context(&self) -> &ModelContext {
        &self.context
    }

    pub fn root(&self) -> &LandNode {
        &self.root
    }

    pub fn root_mut(&mut self) -> &mut LandNode {
        &mut self.root
    }

    pub fn total_land_allocation(&self, period: usize) -> f64 {
        self.root.land_allocation(period)
    }

    pub fn set_total_land_allocation(&mut self, period: usize, land: f64) {
        self.root.state_mut().land_allocation.set(period, land);
    }

    pub fn find_item(&self, name: &str) -> Option<&dyn AllocationItem> {
        self.root.find_item(name)
    }

    pub fn add_child(&mut self, child: Box<dyn AllocationItem>) -> bool {
        let name = child.name().to_string();
        let adopted = self.root.add_child(child);
        if !adopted && self.diagnostics.warn_on_duplicate {
            warn!(region = %self.region, child = %name, "duplicate land item discarded");
        }
        adopted
    }

    /// Add a production leaf `product` under the existing item `land_type`.
    pub fn add_land_usage(&mut self, land_type: &str, product: &str) -> bool {
        let context = self.context;
        let Some(parent) = self.root.find_item_mut(land_type) else {
            warn!(
                region = %self.region,
                land_type,
                product,
                "cannot add land usage, land type does not exist"
            );
            return false;
        };
        let Some(node) = parent.as_node_mut() else {
            warn!(
                region = %self.region,
                land_type,
                product,
                "cannot add land usage, land type is a leaf"
            );
            return false;
        };
        let adopted = node.add_child(Box::new(ProductionLeaf::new(product, &context)));
        if !adopted && self.diagnostics.warn_on_duplicate {
            warn!(region = %self.region, land_type, product, "land usage already present");
        }
        adopted
    }

    fn report_missing(&self, operation: &str, product: &str, delivered: bool) {
        if delivered {
            return;
        }
        if self.diagnostics.warn_on_missing {
            warn!(region = %self.region, operation, product, "no land item took this call");
        } else {
            debug!(region = %self.region, operation, product, "no land item took this call");
        }
    }

    pub fn set_intrinsic_rate(&mut self, land_type: &str, product: &str, rate: f64, period: usize) {
        let delivered = self
            .root
            .set_intrinsic_rate(&self.region, land_type, product, rate, period);
        self.report_missing("set_intrinsic_rate", product, delivered);
    }

    pub fn set_cal_land_allocation(
        &mut self,
        land_type: &str,
        product: &str,
        cal_land_used: f64,
        harvest_period: usize,
        current_period: usize,
    ) {
        let delivered = self.root.set_cal_land_allocation(
            land_type,
            product,
            cal_land_used,
            harvest_period,
            current_period,
        );
        self.report_missing("set_cal_land_allocation", product, delivered);
    }

    pub fn set_cal_observed_yield(
        &mut self,
        land_type: &str,
        product: &str,
        observed_yield: f64,
        period: usize,
    ) {
        let delivered = self
            .root
            .set_cal_observed_yield(land_type, product, observed_yield, period);
        self.report_missing("set_cal_observed_yield", product, delivered);
    }

    pub fn apply_ag_prod_change(
        &mut self,
        land_type: &str,
        product: &str,
        ag_prod_change: f64,
        period: usize,
    ) {
        let delivered = self
            .root
            .apply_ag_prod_change(land_type, product, ag_prod_change, period);
        self.report_missing("apply_ag_prod_change", product, delivered);
    }

    pub fn calc_yield_internal(
        &mut self,
        land_type: &str,
        product: &str,
        profit_rate: f64,
        avg_intrinsic_rate: f64,
        period: usize,
    ) {
        let delivered = self.root.calc_yield_internal(
            land_type,
            product,
            profit_rate,
            avg_intrinsic_rate,
            period,
        );
        self.report_missing("calc_yield_internal", product, delivered);
    }

    pub fn get_yield(&self, land_type: &str, product: &str, period: usize) -> f64 {
        self.root.get_yield(land_type, product, period)
    }

    /// Recompute every share in the tree; the root's own share is discarded.
    #[instrument(level = "trace", skip(self), fields(region = %self.region))]
    pub fn calc_land_shares(&mut self, period: usize) {
        self.root.calc_land_shares(&self.region, 1.0, 0.0, period);
    }

    /// Distribute the region's total land through the freshly computed shares.
    #[instrument(level = "trace", skip(self), fields(region = %self.region))]
    pub fn calc_land_allocation(&mut self, period: usize) {
        self.root.allocate_children(period);
    }

    /// Share recomputation followed by allocation, one solver iteration.
    pub fn calc_period(&mut self, period: usize) {
        self.calc_land_shares(period);
        self.calc_land_allocation(period);
    }

    pub fn get_land_allocation(&self, product: &str, period: usize) -> f64 {
        self.root.get_land_allocation(product, period)
    }

    pub fn get_total_land_allocation(&self, product: &str, period: usize) -> f64 {
        self.root.get_total_land_allocation(product, period)
    }

    /// Observed average rate of `land_type`; 0 when the name is absent.
    pub fn get_cal_ave_observed_rate(&self, land_type: &str, period: usize, sigma: f64) -> f64 {
        self.find_cal_ave_observed_rate(land_type, period, sigma)
            .unwrap_or(0.0)
    }

    /// Like `get_cal_ave_observed_rate`, but tells "absent" apart from zero.
    pub fn find_cal_ave_observed_rate(
        &self,
        land_type: &str,
        period: usize,
        sigma: f64,
    ) -> Option<f64> {
        self.root.get_cal_ave_observed_rate(land_type, period, sigma)
    }

    /// Calibration pass: derive every allocation and share from the leaves.
    #[instrument(level = "debug", skip(self), fields(region = %self.region))]
    pub fn set_init_shares(&mut self, period: usize) {
        let total = self.total_land_allocation(period);
        self.root.set_init_shares(0.0, period);
        // A region without calibrated land keeps its configured total.
        if self.total_land_allocation(period) <= 0.0 && total > 0.0 {
            debug!(region = %self.region, period, total, "no calibrated land, keeping region total");
            self.set_total_land_allocation(period, total);
        }
    }

    /// Push the root's aggregated rate down so leaves learn their yield mode.
    #[instrument(level = "debug", skip(self), fields(region = %self.region))]
    pub fn set_intrinsic_yield_mode(&mut self, period: usize) {
        let rate = self.root.intrinsic_rate(period);
        self.root.propagate_intrinsic_yield_mode(rate, period);
    }

    /// Rebalance the reserved subtree named `land_type` to `allocation`.
    ///
    /// Returns false when the name is absent or names production land,
    /// which ignores the call.
    pub fn set_unmanaged_land_allocation(
        &mut self,
        land_type: &str,
        allocation: f64,
        period: usize,
    ) -> bool {
        let delivered = match self.root.find_item_mut(land_type) {
            Some(item) if !item.is_production_leaf() => {
                item.set_unmanaged_land_allocation(&self.region, allocation, period);
                true
            }
            _ => false,
        };
        self.report_missing("set_unmanaged_land_allocation", land_type, delivered);
        delivered
    }

    /// Give unmanaged land at the top level whatever production leaves over.
    #[instrument(level = "debug", skip(self), fields(region = %self.region))]
    pub fn reconcile_unmanaged_land(&mut self, period: usize) {
        self.root.reconcile_unmanaged_land(&self.region, period);
    }

    /// Walk the tree in preorder.
    pub fn accept(&self, visitor: &mut dyn ItemVisitor) {
        self.root.accept(visitor, 0);
    }
}
