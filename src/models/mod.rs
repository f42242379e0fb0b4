//! Smaily Connect Models

pub mod cart;
pub mod product;
pub mod settings;
pub mod user;

pub use cart::*;
pub use product::*;
pub use settings::*;
pub use user::*;
