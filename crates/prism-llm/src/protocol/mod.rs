//! Wire format types for each supported protocol
//!
//! These structs mirror each provider's JSON shapes exactly; all semantic
//! mapping lives in [`crate::convert`].

pub mod anthropic;
pub mod google;
pub mod ollama;
pub mod openai;
pub mod responses;
