//! Nested-logit land allocation.
//!
//! Each region owns a tree of land types. Interior nodes split the land
//! handed to them among their children in proportion to
//! `rate^(1/sigma)` shares, leaves carry profitability, yields and
//! calibration data fed by an outer market solver.

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod util;
