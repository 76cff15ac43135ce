pub mod match_result;
pub mod opportunity;
pub mod profile;
