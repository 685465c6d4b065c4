mod models;
mod selector;

pub use models::*;
pub use selector::*;
