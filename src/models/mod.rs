pub mod schema;
pub mod paper;
pub mod report;

pub use schema::*;
pub use paper::*;
pub use report::*;
