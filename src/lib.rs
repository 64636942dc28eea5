pub mod annotate;
pub mod anonymize;
pub mod blame;
pub mod builder;
pub mod classify;
pub mod config;
pub mod corpus;
pub mod errors;
pub mod extract;
pub mod grouper;
pub mod language;
pub mod repo;
pub mod types;
