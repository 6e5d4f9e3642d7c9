pub mod context;
pub mod distribution;
pub mod generator;
pub mod import;
pub mod ir;
pub mod policy;
pub mod production;
pub mod render;
pub mod runtime;
pub mod seed;
pub mod statistics;
pub mod symbol_table;
pub mod ty;
pub mod utils;
