//! Edges of the engine: the CSV operation reader and report writer the CLI
//! is built on.

pub mod csv;
