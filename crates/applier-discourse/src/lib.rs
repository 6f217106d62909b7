//! # applier-discourse
//!
//! [`RemoteDirectory`](applier_core::RemoteDirectory) backed by the Discourse
//! REST API.
//!
//! Group listings are read in a single request; pagination is not followed.

mod client;

pub use client::DiscourseClient;
