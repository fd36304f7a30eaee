pub mod analyzer;
pub mod annotate;
pub mod cli;
pub mod config;
pub mod driver;
pub mod error;
pub mod methods;
pub mod metrics;
pub mod model;
pub mod parsers;
pub mod path;
pub mod project;
pub mod runner;
pub mod tokenizer;
