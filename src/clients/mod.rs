pub mod base;
pub mod fmp;
