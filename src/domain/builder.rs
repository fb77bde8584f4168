//! Tree builder: turns definitions into allocation trees.

use tracing::{debug, warn};

use crate::domain::allocator::{Diagnostics, LandAllocator};
use crate::domain::context::ModelContext;
use crate::domain::definition::{ItemDef, NodeDef, RegionDef};
use crate::domain::error::DomainError;
use crate::domain::item::{AllocationItem, PeriodValues};
use crate::domain::leaf::ProductionLeaf;
use crate::domain::node::LandNode;
use crate::domain::unmanaged::UnmanagedLeaf;
use crate::domain::vintage::VintageLeaf;

/// Result type for tree operations.
pub type TreeResult<T> = Result<T, DomainError>;

/// Constructs allocation trees from definitions.
///
/// Children are registered through `add_child` in document order, so a
/// repeated name is discarded exactly as it would be at run time.
pub struct TreeBuilder {
    context: ModelContext,
    diagnostics: Diagnostics,
}

impl TreeBuilder {
    pub fn new(context: ModelContext) -> Self {
        Self {
            context,
            diagnostics: Diagnostics::default(),
        }
    }

    pub fn with_diagnostics(mut self, diagnostics: Diagnostics) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    /// Build the allocator of one region; the root's allocation is the total land.
    pub fn build_region(&self, region: &RegionDef) -> TreeResult<LandAllocator> {
        debug!(region = %region.name, "building land allocator");
        let root = self.build_node(&region.root)?;
        Ok(LandAllocator::new(&region.name, root, self.context).with_diagnostics(self.diagnostics))
    }

    pub fn build_node(&self, def: &NodeDef) -> TreeResult<LandNode> {
        if def.children.len() > 1 && !(def.sigma > 0.0) {
            return Err(DomainError::InvalidSigma {
                name: def.name.clone(),
                sigma: def.sigma,
                children: def.children.len(),
            });
        }
        // A lone child takes the whole node for any positive sigma.
        let sigma = if def.sigma > 0.0 {
            def.sigma
        } else {
            debug!(
                node = %def.name,
                sigma = def.sigma,
                "non-positive sigma on single-child node, using 1"
            );
            1.0
        };
        let mut node = LandNode::new(&def.name, sigma, &self.context);
        self.fill(
            &def.name,
            "land_allocation",
            &def.land_allocation,
            &mut node.state_mut().land_allocation,
        )?;

        for (index, child_def) in def.children.iter().enumerate() {
            if child_def.name().trim().is_empty() {
                return Err(DomainError::EmptyName {
                    parent: def.name.clone(),
                    index,
                });
            }
            let child = self.build_item(child_def)?;
            if !node.add_child(child) && self.diagnostics.warn_on_duplicate {
                warn!(
                    node = %def.name,
                    child = child_def.name(),
                    "land type already has a child with this name"
                );
            }
        }
        Ok(node)
    }

    pub fn build_item(&self, def: &ItemDef) -> TreeResult<Box<dyn AllocationItem>> {
        let item: Box<dyn AllocationItem> = match def {
            ItemDef::Node(node) => Box::new(self.build_node(node)?),
            ItemDef::Leaf(leaf) => {
                let mut item = ProductionLeaf::new(&leaf.name, &self.context);
                self.fill(
                    &leaf.name,
                    "land_allocation",
                    &leaf.land_allocation,
                    &mut item.state_mut().land_allocation,
                )?;
                Box::new(item)
            }
            ItemDef::Unmanaged(leaf) => {
                let mut item = UnmanagedLeaf::new(&leaf.name, &self.context);
                self.fill(
                    &leaf.name,
                    "base_land_allocation",
                    &leaf.base_land_allocation,
                    item.base_land_allocation_mut(),
                )?;
                self.fill(
                    &leaf.name,
                    "base_intrinsic_rate",
                    &leaf.base_intrinsic_rate,
                    item.base_intrinsic_rate_mut(),
                )?;
                if !leaf.base_intrinsic_rate.is_empty() {
                    item.mark_all_rates_given();
                }
                let allocation = if leaf.land_allocation.is_empty() {
                    &leaf.base_land_allocation
                } else {
                    &leaf.land_allocation
                };
                self.fill(
                    &leaf.name,
                    "land_allocation",
                    allocation,
                    &mut item.state_mut().land_allocation,
                )?;
                Box::new(item)
            }
            ItemDef::Vintage(leaf) => {
                if leaf.rotation == 0 {
                    return Err(DomainError::InvalidRotation(leaf.name.clone()));
                }
                let mut item = VintageLeaf::new(&leaf.name, leaf.rotation, &self.context);
                self.fill(
                    &leaf.name,
                    "land_allocation",
                    &leaf.land_allocation,
                    &mut item.state_mut().land_allocation,
                )?;
                Box::new(item)
            }
        };
        Ok(item)
    }

    /// Copy an optional per-period series; empty means "not given".
    fn fill(
        &self,
        name: &str,
        field: &'static str,
        values: &[f64],
        target: &mut PeriodValues,
    ) -> TreeResult<()> {
        if values.is_empty() {
            return Ok(());
        }
        if values.len() != self.context.period_count() {
            return Err(DomainError::PeriodMismatch {
                name: name.to_string(),
                field,
                expected: self.context.period_count(),
                actual: values.len(),
            });
        }
        target.fill_from(values);
        Ok(())
    }
}
