pub mod connectors;
pub mod mapping;
pub mod schema;
pub mod transformer;
pub mod type_mapper;
