#![doc = "plurackup-core: fetch, aggregation and rendering pipeline for plurackup."]

//! This crate contains everything needed to back up one account's plurks and
//! their responses: the remote API client, the pagination and reply fan-out
//! pipeline, the in-memory aggregate, and the XML/XHTML renderers.
//! Interactive glue (argument parsing, secrets, config files) lives in the
//! `plurackup` binary crate.
//!
//! # Usage
//! Build a [`config::BackupConfig`], construct a [`client::PlurkClient`] (or any
//! [`contract::PlurkApi`] implementation) and call [`backup::backup`].

pub mod aggregate;
pub mod backup;
pub mod client;
pub mod config;
pub mod contract;
pub mod error;
pub mod model;
pub mod paginate;
pub mod render;
pub mod replies;
