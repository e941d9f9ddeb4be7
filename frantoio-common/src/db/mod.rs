//! Database schema, models and repository queries

pub mod clienti;
pub mod init;
pub mod models;
pub mod moliture;
pub mod sessions;
pub mod users;

pub use init::*;
pub use models::*;
