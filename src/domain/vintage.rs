//! Production leaf with a planting-to-harvest lag.

use crate::domain::context::ModelContext;
use crate::domain::item::{AllocationItem, ItemKind, ItemState, PeriodValues};
use crate::domain::leaf::ProductionLeaf;

/// Production leaf whose land stays occupied for `rotation` periods.
///
/// Land allocated in period `p` is harvested in `p + rotation`; the land it
/// holds in total is everything planted over the last `rotation` periods.
#[derive(Debug, Clone)]
pub struct VintageLeaf {
    inner: ProductionLeaf,
    rotation: usize,
    land_to_be_harvested: PeriodValues,
}

impl VintageLeaf {
    pub fn new(name: impl Into<String>, rotation: usize, ctx: &ModelContext) -> Self {
        Self {
            inner: ProductionLeaf::new(name, ctx),
            rotation: rotation.max(1),
            land_to_be_harvested: PeriodValues::zeros(ctx.period_count()),
        }
    }

    pub fn rotation(&self) -> usize {
        self.rotation
    }

    pub fn land_to_be_harvested(&self, period: usize) -> f64 {
        self.land_to_be_harvested.get(period)
    }

    /// Land planted in the `rotation` periods ending at `period`.
    pub fn standing_land(&self, period: usize) -> f64 {
        let first = (period + 1).saturating_sub(self.rotation);
        (first..=period)
            .map(|p| self.inner.land_allocation(p))
            .sum()
    }
}

impl AllocationItem for VintageLeaf {
    fn as_item(&self) -> &dyn AllocationItem {
        self
    }

    fn as_item_mut(&mut self) -> &mut dyn AllocationItem {
        self
    }

    fn state(&self) -> &ItemState {
        self.inner.state()
    }

    fn state_mut(&mut self) -> &mut ItemState {
        self.inner.state_mut()
    }

    fn kind(&self) -> ItemKind {
        ItemKind::Vintage
    }

    fn is_production_leaf(&self) -> bool {
        true
    }

    fn set_intrinsic_rate(
        &mut self,
        region: &str,
        land_type: &str,
        product: &str,
        rate: f64,
        period: usize,
    ) -> bool {
        self.inner
            .set_intrinsic_rate(region, land_type, product, rate, period)
    }

    fn set_cal_land_allocation(
        &mut self,
        _land_type: &str,
        _product: &str,
        cal_land_used: f64,
        harvest_period: usize,
        current_period: usize,
    ) -> bool {
        self.land_to_be_harvested.set(harvest_period, cal_land_used);
        // Observed land is the standing stock of every cohort still growing.
        let planted = cal_land_used / self.rotation as f64;
        self.inner
            .state_mut()
            .land_allocation
            .set(current_period, planted);
        true
    }

    fn set_cal_observed_yield(
        &mut self,
        land_type: &str,
        product: &str,
        observed_yield: f64,
        period: usize,
    ) -> bool {
        self.inner
            .set_cal_observed_yield(land_type, product, observed_yield, period)
    }

    fn apply_ag_prod_change(
        &mut self,
        land_type: &str,
        product: &str,
        ag_prod_change: f64,
        period: usize,
    ) -> bool {
        self.inner
            .apply_ag_prod_change(land_type, product, ag_prod_change, period)
    }

    fn calc_yield_internal(
        &mut self,
        land_type: &str,
        product: &str,
        profit_rate: f64,
        avg_intrinsic_rate: f64,
        period: usize,
    ) -> bool {
        self.inner
            .calc_yield_internal(land_type, product, profit_rate, avg_intrinsic_rate, period)
    }

    fn get_yield(&self, land_type: &str, product: &str, period: usize) -> f64 {
        self.inner.get_yield(land_type, product, period)
    }

    fn calc_land_shares(
        &mut self,
        region: &str,
        sigma_above: f64,
        total_land_allocated: f64,
        period: usize,
    ) {
        self.inner
            .calc_land_shares(region, sigma_above, total_land_allocated, period);
    }

    fn calc_land_allocation(&mut self, allocation_above: f64, period: usize) {
        self.inner.calc_land_allocation(allocation_above, period);
        let planted = self.inner.land_allocation(period);
        self.land_to_be_harvested
            .set(period + self.rotation, planted);
    }

    /// Share of the standing stock, matching what the parent sums.
    fn set_init_shares(&mut self, allocation_above: f64, period: usize) {
        if allocation_above > 0.0 {
            let share = self.standing_land(period) / allocation_above;
            self.inner.state_mut().share.set(period, share);
        }
    }

    fn set_intrinsic_yield_mode(&mut self, rate_above: f64, sigma_above: f64, period: usize) {
        self.inner
            .set_intrinsic_yield_mode(rate_above, sigma_above, period);
    }

    fn get_total_land_allocation(&self, product: &str, period: usize) -> f64 {
        if self.name() == product {
            self.standing_land(period)
        } else {
            0.0
        }
    }
}
