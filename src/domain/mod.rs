//! Domain layer: allocation trees and their algorithms
//!
//! This layer is independent of external concerns (no I/O, no CLI, no config loading).

pub mod allocator;
pub mod builder;
pub mod context;
pub mod definition;
pub mod error;
pub mod item;
pub mod leaf;
pub mod node;
pub mod regions;
pub mod render;
pub mod unmanaged;
pub mod vintage;

pub use allocator::{Diagnostics, LandAllocator};
pub use builder::{TreeBuilder, TreeResult};
pub use context::ModelContext;
pub use definition::{
    CalibrationDef, ItemDef, LeafDef, NodeDef, RateDef, RegionDef, ScenarioDef, UnmanagedDef,
    VintageDef,
};
pub use error::DomainError;
pub use item::{AllocationItem, ItemKind, ItemState, ItemVisitor, PeriodValues};
pub use leaf::ProductionLeaf;
pub use node::LandNode;
pub use regions::RegionSet;
pub use render::TreeRender;
pub use unmanaged::UnmanagedLeaf;
pub use vintage::VintageLeaf;
