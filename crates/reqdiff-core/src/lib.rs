//! Core types for reqdiff
//!
//! reqdiff runs the same set of cURL-style commands against several hosts
//! and lines up the responses for comparison. This crate holds the pure,
//! synchronous half of that:
//!
//! - [`host`] - free-form host text to a canonical base URL
//! - [`command`] - free-form command text to a [`RequestTemplate`]
//! - [`resolve`] - template + host to an absolute [`ResolvedRequest`]
//! - [`outcome`] - what came back from one dispatched request
//!
//! # Example
//!
//! ```
//! use reqdiff_core::{command, host, resolve};
//!
//! let template = command::parse("curl {host}/users");
//! let request = resolve::resolve(&template, &host::parse("api.example.com"));
//! assert_eq!(request.url, "http://api.example.com/users");
//! ```

pub mod command;
pub mod host;
pub mod outcome;
pub mod resolve;

pub use command::{CommandError, RequestTemplate, PLACEHOLDER};
pub use host::{HostError, HostSpec};
pub use outcome::{ExecutionOutcome, OutcomeResult, ResponseData};
pub use resolve::ResolvedRequest;
