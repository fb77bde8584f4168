//! Scenario service
//!
//! Loads scenario files, builds one allocator per region, applies
//! calibration data and runs periods the way an outer market solver would.

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info, instrument};

use crate::application::error_ext::{IoResultExt, ParseResultExt};
use crate::application::{ApplicationError, ApplicationResult};
use crate::domain::{
    CalibrationDef, Diagnostics, LandAllocator, ModelContext, RegionDef, RegionSet, ScenarioDef,
    TreeBuilder,
};
use crate::infrastructure::traits::FileSystem;

/// Service for loading and driving allocation scenarios.
pub struct ScenarioService {
    fs: Arc<dyn FileSystem>,
    context: ModelContext,
    diagnostics: Diagnostics,
}

impl ScenarioService {
    /// Create a new scenario service.
    pub fn new(fs: Arc<dyn FileSystem>, context: ModelContext, diagnostics: Diagnostics) -> Self {
        Self {
            fs,
            context,
            diagnostics,
        }
    }

    pub fn context(&self) -> &ModelContext {
        &self.context
    }

    /// Read and parse a scenario file.
    #[instrument(level = "debug", skip(self))]
    pub fn load(&self, path: &Path) -> ApplicationResult<ScenarioDef> {
        if !self.fs.exists(path) {
            return Err(ApplicationError::Scenario {
                path: path.to_path_buf(),
                message: "file not found".into(),
            });
        }
        let content = self
            .fs
            .read_to_string(path)
            .with_path_context("read scenario", path)?;
        let scenario: ScenarioDef = toml::from_str(&content).with_scenario_path(path)?;
        if scenario.regions.is_empty() {
            return Err(ApplicationError::Scenario {
                path: path.to_path_buf(),
                message: "no regions defined".into(),
            });
        }
        debug!(regions = scenario.regions.len(), "scenario loaded");
        Ok(scenario)
    }

    /// Build one allocator per region, in file order.
    pub fn build(&self, scenario: &ScenarioDef) -> ApplicationResult<RegionSet> {
        let builder = TreeBuilder::new(self.context).with_diagnostics(self.diagnostics);
        let mut regions = RegionSet::new();
        for region in &scenario.regions {
            regions.insert(builder.build_region(region)?)?;
        }
        Ok(regions)
    }

    fn check_period(&self, period: usize) -> ApplicationResult<()> {
        if period >= self.context.period_count() {
            return Err(ApplicationError::PeriodOutOfRange {
                period,
                period_count: self.context.period_count(),
            });
        }
        Ok(())
    }

    fn region_mut<'a>(
        regions: &'a mut RegionSet,
        name: &str,
    ) -> ApplicationResult<&'a mut LandAllocator> {
        regions
            .get_mut(name)
            .ok_or_else(|| ApplicationError::RegionNotFound(name.to_string()))
    }

    /// Push observed calibration data for `period` into the trees.
    ///
    /// Productivity changes are applied for every period at once, since
    /// yields compound them from the first period onwards.
    pub fn apply_calibration(
        &self,
        regions: &mut RegionSet,
        scenario: &ScenarioDef,
        period: usize,
    ) -> ApplicationResult<()> {
        for region in &scenario.regions {
            let allocator = Self::region_mut(regions, &region.name)?;
            for entry in &region.calibration {
                match entry {
                    CalibrationDef::Land {
                        land_type,
                        product,
                        value,
                        period: p,
                        harvest_period,
                    } if *p == period => allocator.set_cal_land_allocation(
                        land_type,
                        product,
                        *value,
                        harvest_period.unwrap_or(*p),
                        *p,
                    ),
                    CalibrationDef::Yield {
                        land_type,
                        product,
                        value,
                        period: p,
                    } if *p == period => {
                        allocator.set_cal_observed_yield(land_type, product, *value, *p)
                    }
                    CalibrationDef::AgProdChange {
                        land_type,
                        product,
                        value,
                        period: p,
                    } => allocator.apply_ag_prod_change(land_type, product, *value, *p),
                    _ => {}
                }
            }
        }
        Ok(())
    }

    /// Push the profitability signals listed for `period`.
    pub fn apply_rates(
        &self,
        regions: &mut RegionSet,
        scenario: &ScenarioDef,
        period: usize,
    ) -> ApplicationResult<()> {
        for region in &scenario.regions {
            let allocator = Self::region_mut(regions, &region.name)?;
            for rate in region.rates.iter().filter(|r| r.period == period) {
                allocator.set_intrinsic_rate(&rate.land_type, &rate.product, rate.rate, period);
            }
        }
        Ok(())
    }

    /// Calibration pass for `period`.
    ///
    /// Observed data and rates go in first; unmanaged land then takes the
    /// residual of each region's total, shares are derived from the known
    /// allocations and finally yield modes are pushed down to the leaves.
    #[instrument(level = "debug", skip(self, regions, scenario))]
    pub fn calibrate(
        &self,
        regions: &mut RegionSet,
        scenario: &ScenarioDef,
        period: usize,
    ) -> ApplicationResult<()> {
        self.check_period(period)?;
        self.apply_calibration(regions, scenario, period)?;
        self.apply_rates(regions, scenario, period)?;
        regions.for_each_parallel(|allocator| {
            allocator.reconcile_unmanaged_land(period);
            allocator.set_init_shares(period);
            allocator.calc_land_shares(period);
            allocator.set_intrinsic_yield_mode(period);
        });
        info!(period, regions = regions.len(), "calibration complete");
        Ok(())
    }

    /// One solver iteration for `period`: rates, shares, allocation.
    #[instrument(level = "debug", skip(self, regions, scenario))]
    pub fn run_period(
        &self,
        regions: &mut RegionSet,
        scenario: &ScenarioDef,
        period: usize,
    ) -> ApplicationResult<()> {
        self.check_period(period)?;
        self.apply_rates(regions, scenario, period)?;
        regions.for_each_parallel(|allocator| {
            // Total land is fixed over time unless the scenario says otherwise.
            if period > 0 && allocator.total_land_allocation(period) <= 0.0 {
                let previous = allocator.total_land_allocation(period - 1);
                allocator.set_total_land_allocation(period, previous);
            }
        });
        regions.calc_period(period);
        Ok(())
    }

    /// Build, calibrate at period 0 and run every period up to `through`.
    pub fn simulate(&self, scenario: &ScenarioDef, through: usize) -> ApplicationResult<RegionSet> {
        self.check_period(through)?;
        let mut regions = self.build(scenario)?;
        self.calibrate(&mut regions, scenario, 0)?;
        for period in 0..=through {
            self.run_period(&mut regions, scenario, period)?;
        }
        Ok(regions)
    }

    /// Look up a region definition by name.
    pub fn region_def<'a>(scenario: &'a ScenarioDef, name: &str) -> Option<&'a RegionDef> {
        scenario.regions.iter().find(|r| r.name == name)
    }
}
