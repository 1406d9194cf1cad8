pub mod filesystem;
mod register;
pub mod sql;

pub use register::DatabaseConfig;
