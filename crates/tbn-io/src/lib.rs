//! # tbn-io
//!
//! Text format contracts for TBN analysis: the `.tbn` monomer-list format,
//! the `.tbnpolys` human polymer-list format, the `.tbnpolymat` cache
//! format, and the `{{expr}}` arithmetic evaluator used for templated
//! concentrations.

pub mod expr;
pub mod tbn_format;
pub mod tbnpolymat;
pub mod tbnpolys;

pub use tbn_format::{format_tbn, parse_str as parse_tbn};
pub use tbnpolymat::{PolymatHeader, PolymatRow};
pub use tbnpolys::RawMonomerRef;
