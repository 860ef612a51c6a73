pub mod baseline;
pub mod config;
pub mod decision;
pub mod error;
pub mod gate;
pub mod io;
pub mod manifest;
pub mod marker;
pub mod paths;
pub mod pillar;
pub mod templates;
pub mod trace;
pub mod validation;

pub use error::{LedgerError, Result};
