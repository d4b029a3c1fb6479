pub mod outcome;
pub mod summary;
pub mod table;
