//! PicNode client core library.
//!
//! Service objects behind the token checkout, the API playground, the asset
//! gallery and the customer dashboard. All business logic lives in the remote
//! backend; these modules orchestrate calls to it and keep local state.

pub mod assets;
pub mod backend;
pub mod calculator;
pub mod checkout;
pub mod config;
pub mod dashboard;
pub mod errors;
pub mod models;
pub mod playground;
pub mod preferences;
pub mod session;
pub mod store;
