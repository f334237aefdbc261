pub mod truncation;
pub mod formatting;
