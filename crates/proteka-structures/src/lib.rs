//! proteka-structures — the ingestion pipeline.
//!
//! Fetches structure files from the RCSB archive, extracts chains and
//! candidate ligands with pdbtbx, applies the categorization rule table,
//! and imports the result into the relational store. Each phase is
//! independent and idempotent; one identifier's failure never aborts a
//! batch.

pub mod categorize;
pub mod docking;
pub mod extract;
pub mod fetch;
pub mod pipeline;
pub mod properties;
