pub mod actor;
pub mod jwt;
pub mod password;

pub use actor::{assert_registered, Actor};
