//! Input import, synthetic generation and output export.

pub mod export;
pub mod import;
pub mod synthetic;
