//! Production leaf: land whose allocation follows profitability.

use tracing::trace;

use crate::domain::context::ModelContext;
use crate::domain::item::{share_from_rate, AllocationItem, ItemKind, ItemState, PeriodValues};

/// Terminal allocation unit driven by a profit signal (an active economic use).
#[derive(Debug, Clone)]
pub struct ProductionLeaf {
    state: ItemState,
    cal_observed_yield: PeriodValues,
    yields: PeriodValues,
    intrinsic_yield_mode: PeriodValues,
    /// Annual productivity change per period
    ag_prod_change: PeriodValues,
    timestep: u32,
}

impl ProductionLeaf {
    pub fn new(name: impl Into<String>, ctx: &ModelContext) -> Self {
        let periods = ctx.period_count();
        Self {
            state: ItemState::new(name, ctx),
            cal_observed_yield: PeriodValues::zeros(periods),
            yields: PeriodValues::zeros(periods),
            intrinsic_yield_mode: PeriodValues::zeros(periods),
            ag_prod_change: PeriodValues::zeros(periods),
            timestep: ctx.timestep(),
        }
    }

    pub fn cal_observed_yield(&self, period: usize) -> f64 {
        self.cal_observed_yield.get(period)
    }

    pub fn intrinsic_yield_mode(&self, period: usize) -> f64 {
        self.intrinsic_yield_mode.get(period)
    }

    /// Productivity multiplier accumulated from period 1 up to `period`.
    pub fn cumulative_ag_prod(&self, period: usize) -> f64 {
        (1..=period)
            .map(|p| (1.0 + self.ag_prod_change.get(p)).powi(self.timestep as i32))
            .product()
    }
}

impl AllocationItem for ProductionLeaf {
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
        ItemKind::Production
    }

    fn is_production_leaf(&self) -> bool {
        true
    }

    fn set_intrinsic_rate(
        &mut self,
        _region: &str,
        _land_type: &str,
        _product: &str,
        rate: f64,
        period: usize,
    ) -> bool {
        self.state.intrinsic_rate.set(period, rate.max(0.0));
        true
    }

    fn set_cal_land_allocation(
        &mut self,
        _land_type: &str,
        _product: &str,
        cal_land_used: f64,
        harvest_period: usize,
        _current_period: usize,
    ) -> bool {
        self.state.land_allocation.set(harvest_period, cal_land_used);
        true
    }

    fn set_cal_observed_yield(
        &mut self,
        _land_type: &str,
        _product: &str,
        observed_yield: f64,
        period: usize,
    ) -> bool {
        self.cal_observed_yield.set(period, observed_yield);
        self.yields.set(period, observed_yield);
        true
    }

    fn apply_ag_prod_change(
        &mut self,
        _land_type: &str,
        _product: &str,
        ag_prod_change: f64,
        period: usize,
    ) -> bool {
        self.ag_prod_change.set(period, ag_prod_change);
        true
    }

    fn calc_yield_internal(
        &mut self,
        _land_type: &str,
        _product: &str,
        profit_rate: f64,
        avg_intrinsic_rate: f64,
        period: usize,
    ) -> bool {
        let rate = if avg_intrinsic_rate > 0.0 {
            avg_intrinsic_rate
        } else {
            self.intrinsic_yield_mode.get(period)
        };
        let yield_ = if profit_rate > 0.0 && rate > 0.0 {
            rate / profit_rate * self.cumulative_ag_prod(period)
        } else {
            0.0
        };
        self.yields.set(period, yield_);
        true
    }

    fn get_yield(&self, _land_type: &str, _product: &str, period: usize) -> f64 {
        self.yields.get(period)
    }

    fn calc_land_shares(
        &mut self,
        _region: &str,
        sigma_above: f64,
        _total_land_allocated: f64,
        period: usize,
    ) {
        match share_from_rate(self.state.intrinsic_rate.get(period), sigma_above) {
            Some(share) => self.state.share.set(period, share),
            None => trace!(leaf = %self.state.name, period, "sigma above not positive, share kept"),
        }
    }

    fn set_intrinsic_yield_mode(&mut self, rate_above: f64, sigma_above: f64, period: usize) {
        let share = self.state.share.get(period);
        let rate = if share > 0.0 {
            rate_above * share.powf(sigma_above)
        } else {
            0.0
        };
        self.intrinsic_yield_mode.set(period, rate);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_negative_rate_when_setting_then_clamped_to_zero() {
        let ctx = ModelContext::new(2005, 5, 2).unwrap();
        let mut leaf = ProductionLeaf::new("corn", &ctx);
        assert!(leaf.set_intrinsic_rate("r", "crops", "corn", -3.0, 0));
        assert_eq!(leaf.intrinsic_rate(0), 0.0);

        leaf.calc_land_shares("r", 1.0, 0.0, 0);
        assert_eq!(leaf.share(0), 0.0);
    }

    #[test]
    fn given_ag_prod_change_when_compounding_then_uses_timestep() {
        let ctx = ModelContext::new(2005, 5, 3).unwrap();
        let mut leaf = ProductionLeaf::new("corn", &ctx);
        leaf.apply_ag_prod_change("crops", "corn", 0.01, 1);
        leaf.apply_ag_prod_change("crops", "corn", 0.02, 2);

        let expected = 1.01f64.powi(5) * 1.02f64.powi(5);
        assert!((leaf.cumulative_ag_prod(2) - expected).abs() < 1e-12);
        assert_eq!(leaf.cumulative_ag_prod(0), 1.0);
    }
}
