pub mod engagement;
pub mod estimate;
pub mod opportunity;
pub mod plan;
pub mod quote;
