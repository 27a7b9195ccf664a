//! proteka-db — PostgreSQL persistence for proteins, ligands, categories,
//! integrity records, and docking results.

pub mod database;
pub mod models;
pub mod repository;
pub mod schema;

pub use database::Database;
pub use repository::Repository;
