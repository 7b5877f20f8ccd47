//! Command line front end and prebuilt attack scenarios for `speke-core`.

pub mod cli;
pub mod scenarios;
