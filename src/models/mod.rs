pub mod asset;
pub mod order;
pub mod token;
pub mod user;
