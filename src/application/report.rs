//! Flat per-item view of allocation trees, in preorder.

use itertools::Itertools;

use crate::domain::{AllocationItem, ItemKind, ItemVisitor, LandAllocator, RegionSet};

/// One tree item at one period.
#[derive(Debug, Clone, PartialEq)]
pub struct AllocationRow {
    pub region: String,
    pub depth: usize,
    pub name: String,
    pub kind: ItemKind,
    pub land_allocation: f64,
    pub share: f64,
    pub intrinsic_rate: f64,
}

/// Rows of every region, each tree in preorder.
#[derive(Debug, Clone, Default)]
pub struct AllocationReport {
    pub period: usize,
    pub rows: Vec<AllocationRow>,
}

/// Children shares of one node; after a share pass they sum to one.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeShares {
    pub region: String,
    pub node: String,
    pub shares: Vec<(String, f64)>,
}

impl NodeShares {
    pub fn sum(&self) -> f64 {
        self.shares.iter().map(|(_, share)| share).sum()
    }

    /// Every node with children, all regions, preorder.
    pub fn for_regions(regions: &RegionSet, period: usize) -> Vec<NodeShares> {
        let mut nodes = Vec::new();
        for allocator in regions.iter() {
            let mut collector = ShareCollector {
                region: allocator.region(),
                period,
                nodes: &mut nodes,
            };
            allocator.accept(&mut collector);
        }
        nodes
    }
}

struct ShareCollector<'a> {
    region: &'a str,
    period: usize,
    nodes: &'a mut Vec<NodeShares>,
}

impl ItemVisitor for ShareCollector<'_> {
    fn visit(&mut self, item: &dyn AllocationItem, _depth: usize) {
        if item.children().is_empty() {
            return;
        }
        self.nodes.push(NodeShares {
            region: self.region.to_string(),
            node: item.name().to_string(),
            shares: item
                .children()
                .iter()
                .map(|child| (child.name().to_string(), child.share(self.period)))
                .collect(),
        });
    }
}

struct RowCollector<'a> {
    region: &'a str,
    period: usize,
    rows: &'a mut Vec<AllocationRow>,
}

impl ItemVisitor for RowCollector<'_> {
    fn visit(&mut self, item: &dyn AllocationItem, depth: usize) {
        self.rows.push(AllocationRow {
            region: self.region.to_string(),
            depth,
            name: item.name().to_string(),
            kind: item.kind(),
            land_allocation: item.land_allocation(self.period),
            share: item.share(self.period),
            intrinsic_rate: item.intrinsic_rate(self.period),
        });
    }
}

impl AllocationReport {
    pub fn for_allocator(allocator: &LandAllocator, period: usize) -> Self {
        let mut report = Self {
            period,
            rows: Vec::new(),
        };
        report.extend(allocator);
        report
    }

    pub fn for_regions(regions: &RegionSet, period: usize) -> Self {
        let mut report = Self {
            period,
            rows: Vec::new(),
        };
        for allocator in regions.iter() {
            report.extend(allocator);
        }
        report
    }

    fn extend(&mut self, allocator: &LandAllocator) {
        let mut collector = RowCollector {
            region: allocator.region(),
            period: self.period,
            rows: &mut self.rows,
        };
        allocator.accept(&mut collector);
    }

    pub fn find(&self, region: &str, name: &str) -> Option<&AllocationRow> {
        self.rows
            .iter()
            .find(|row| row.region == region && row.name == name)
    }

    /// Indented, fixed-width table for terminal output.
    pub fn to_table(&self) -> String {
        let header = format!(
            "{:<12} {:<28} {:<10} {:>14} {:>10} {:>14}",
            "region", "item", "kind", "land", "share", "rate"
        );
        let body = self
            .rows
            .iter()
            .map(|row| {
                let name = format!("{}{}", "  ".repeat(row.depth), row.name);
                format!(
                    "{:<12} {:<28} {:<10} {:>14.4} {:>10.6} {:>14.6}",
                    row.region,
                    name,
                    row.kind.to_string(),
                    row.land_allocation,
                    row.share,
                    row.intrinsic_rate
                )
            })
            .join("\n");
        format!("{header}\n{body}")
    }

    /// Comma-separated rows, header first.
    pub fn to_csv(&self) -> String {
        let lines = self.rows.iter().map(|row| {
            [
                row.region.clone(),
                self.period.to_string(),
                row.depth.to_string(),
                row.name.clone(),
                row.kind.to_string(),
                row.land_allocation.to_string(),
                row.share.to_string(),
                row.intrinsic_rate.to_string(),
            ]
            .iter()
            .join(",")
        });
        std::iter::once("region,period,depth,name,kind,land_allocation,share,intrinsic_rate".to_string())
            .chain(lines)
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{LandNode, ModelContext, ProductionLeaf, UnmanagedLeaf};

    fn region() -> RegionSet {
        let ctx = ModelContext::new(2005, 5, 1).unwrap();
        let mut root = LandNode::new("land", 1.0, &ctx);
        root.add_child(Box::new(ProductionLeaf::new("corn", &ctx)));
        let mut pasture = UnmanagedLeaf::new("pasture", &ctx);
        pasture.set_base_land_allocation(0, 100.0);
        pasture.set_base_intrinsic_rate(0, 1.0);
        root.add_child(Box::new(pasture));
        let mut allocator = LandAllocator::new("usa", root, ctx);
        allocator.set_total_land_allocation(0, 200.0);
        allocator.set_intrinsic_rate("", "corn", 4.0, 0);
        allocator.calc_period(0);
        let mut regions = RegionSet::new();
        regions.insert(allocator).unwrap();
        regions
    }

    #[test]
    fn given_computed_region_when_reporting_then_rows_in_preorder() {
        let regions = region();

        let report = AllocationReport::for_regions(&regions, 0);

        let names: Vec<_> = report.rows.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["land", "corn", "pasture"]);
        assert_eq!(report.find("usa", "corn").map(|r| r.depth), Some(1));
        assert!(report.to_csv().starts_with("region,period,depth,name"));
        assert_eq!(report.to_csv().lines().count(), 4);
    }

    #[test]
    fn given_computed_region_when_collecting_shares_then_children_sum_to_one() {
        let regions = region();

        let nodes = NodeShares::for_regions(&regions, 0);

        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].node, "land");
        assert!((nodes[0].sum() - 1.0).abs() < 1e-12);
    }
}
