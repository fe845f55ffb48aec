//! Client core for a classroom assignment manager: session state, the
//! assignment/submission store, derived statistics and the access layer
//! that talks to the REST backend.

pub mod access;
pub mod backend;
pub mod config;
pub mod dashboard;
pub mod demo;
pub mod error;
pub mod grade;
pub mod http;
pub mod models;
pub mod role;
pub mod session;
pub mod stats;
pub mod status;
pub mod storage;
pub mod store;
pub mod validate;

pub use access::AccessService;
pub use error::{ClientError, Result};
pub use grade::Grade;
pub use role::Role;
