#![doc = "userfeed-core: concurrent fetch, parse, aggregate and enrich pipeline."]

//! This crate contains all pipeline logic for userfeed: the source registry,
//! typed records, the retrieval and parse stages, the aggregation store,
//! enrichment and error reporting. Transports and output formatting live in
//! the `userfeed` binary crate and plug in through [`contract`].
//!
//! # Usage
//! Build a [`registry::SourceRegistry`], supply a [`contract::Fetcher`] and a
//! [`contract::Sink`], and call [`pipeline::run_pipeline`].

pub mod aggregate;
pub mod config;
pub mod contract;
pub mod enrich;
pub mod error;
pub mod parse;
pub mod pipeline;
pub mod records;
pub mod registry;
pub mod report;
pub mod retrieval;
