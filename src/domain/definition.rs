//! Declarative description of allocation trees, as read from scenario files.
//!
//! Every item carries a `type` tag selecting the variant to build:
//! `node`, `leaf`, `unmanaged` or `vintage`. Children are built in
//! document order.

use serde::{Deserialize, Serialize};

/// A complete scenario: one or more independent regions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ScenarioDef {
    #[serde(default)]
    pub regions: Vec<RegionDef>,
}

/// Tree and calibration inputs of one region.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RegionDef {
    pub name: String,
    pub root: NodeDef,
    #[serde(default)]
    pub calibration: Vec<CalibrationDef>,
    #[serde(default)]
    pub rates: Vec<RateDef>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ItemDef {
    Node(NodeDef),
    Leaf(LeafDef),
    Unmanaged(UnmanagedDef),
    Vintage(VintageDef),
}

impl ItemDef {
    pub fn name(&self) -> &str {
        match self {
            ItemDef::Node(def) => &def.name,
            ItemDef::Leaf(def) => &def.name,
            ItemDef::Unmanaged(def) => &def.name,
            ItemDef::Vintage(def) => &def.name,
        }
    }
}

fn default_sigma() -> f64 {
    1.0
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NodeDef {
    pub name: String,
    #[serde(default = "default_sigma")]
    pub sigma: f64,
    /// Optional precomputed allocation, one value per period
    #[serde(default)]
    pub land_allocation: Vec<f64>,
    #[serde(default)]
    pub children: Vec<ItemDef>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LeafDef {
    pub name: String,
    #[serde(default)]
    pub land_allocation: Vec<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UnmanagedDef {
    pub name: String,
    /// Defaults to `base_land_allocation` when omitted
    #[serde(default)]
    pub land_allocation: Vec<f64>,
    #[serde(default)]
    pub base_land_allocation: Vec<f64>,
    #[serde(default)]
    pub base_intrinsic_rate: Vec<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VintageDef {
    pub name: String,
    pub rotation: usize,
    #[serde(default)]
    pub land_allocation: Vec<f64>,
}

/// Observed data applied before the calibration pass.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CalibrationDef {
    Land {
        #[serde(default)]
        land_type: String,
        product: String,
        value: f64,
        period: usize,
        /// Defaults to `period`
        #[serde(default)]
        harvest_period: Option<usize>,
    },
    Yield {
        #[serde(default)]
        land_type: String,
        product: String,
        value: f64,
        period: usize,
    },
    AgProdChange {
        #[serde(default)]
        land_type: String,
        product: String,
        value: f64,
        period: usize,
    },
}

/// Profitability signal pushed into a leaf, as an outer solver would.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RateDef {
    #[serde(default)]
    pub land_type: String,
    pub product: String,
    pub period: usize,
    pub rate: f64,
}
