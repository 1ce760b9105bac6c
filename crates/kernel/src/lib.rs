//! Vetrina Commerce Kernel Library
//!
//! Back-office catalog services: the dynamic listing query engine,
//! per-user filter persistence, and the listing extension points.
//! HTTP controllers live outside the kernel and consume
//! [`catalog::CatalogService`].

pub mod catalog;
pub mod config;
pub mod db;
pub mod error;
