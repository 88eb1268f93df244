pub mod clinic;
pub mod enums;
pub mod filters;
pub mod patient;

pub use clinic::*;
pub use filters::*;
pub use patient::*;
