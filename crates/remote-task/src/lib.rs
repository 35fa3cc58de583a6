//! Generic remote task client and polling
//!
//! Every pipeline stage delegates its media transformation to a remote
//! asynchronous job provider. This crate owns the two provider-agnostic
//! pieces: the HTTP task client (submit, upload, status fetch) and the
//! bounded poll-until-terminal loop. Provider-specific payloads and output
//! extraction live in `ugc-providers`.

mod client;
mod poller;

pub use client::{AuthScheme, MultipartField, StatusSnapshot, TaskApi, TaskClient, TaskPayload};
pub use poller::Poller;
