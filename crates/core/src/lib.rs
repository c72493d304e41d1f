pub mod models;
pub mod traits;
pub mod validation;

pub use models::*;
pub use traits::*;
pub use validation::*;
