//! News feed harvesting worker.
//!
//! Fetches a fixed set of feeds (RSS/Atom, HTML index pages, and a
//! JSON-embedded single-page-app format), extracts normalized article
//! records, appends them to a dated artifact and optionally forwards each
//! batch to a remote collector.

pub mod config;
pub mod extractor;
pub mod feed;
pub mod fetcher;
pub mod image;
pub mod jobs;
pub mod model;
pub mod output;
pub mod sources;
pub mod upload;
