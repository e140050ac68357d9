//! Command-line driver for `corical`: loads the configured models once and answers queries
//! given on the command line or in a JSON file.

pub mod config;
pub mod facts;
pub mod logging;
