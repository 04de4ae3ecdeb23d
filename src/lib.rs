//! Column mapping and type coercion for ETL workflow nodes.
//!
//! `db` holds the resolver itself: native type normalization, cast
//! suggestions, mapping-set construction and editing. `workflow` places
//! mapping sets inside workflow definitions and drives editing sessions
//! against a schema introspection service.

pub mod config;
pub mod context;
pub mod db;
pub mod logging;
pub mod workflow;
