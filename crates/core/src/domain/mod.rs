pub mod average;
pub mod sentiment;
