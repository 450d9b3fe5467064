pub mod model;
pub mod repo;

pub use model::PublicUser;
pub use repo::{RetryPolicy, UserRepo};
