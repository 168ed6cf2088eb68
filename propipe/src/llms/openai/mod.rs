//! OpenAI Responses API client.
//!
//! Only non-streaming `POST /responses` is supported, so usage counters are
//! complete when a call returns.

mod client;
mod responses;

pub use client::OpenAI;
