//! CLI subcommands

pub mod domain;
pub mod keygen;
pub mod permit;
pub mod simulate;
