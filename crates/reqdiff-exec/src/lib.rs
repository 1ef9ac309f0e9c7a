//! Request execution for reqdiff
//!
//! Dispatches resolved requests concurrently and gathers one
//! [`ExecutionOutcome`](reqdiff_core::ExecutionOutcome) per
//! (template, host) pair.
//!
//! # Architecture
//!
//! ```text
//! templates x hosts
//!        │
//!  ┌─────▼─────┐   progress    ┌──────────┐
//!  │ Scheduler ├──────────────►│ listener │
//!  └─────┬─────┘               └──────────┘
//!        │ send
//!  ┌─────▼──────────┐  on failure  ┌────────────────┐
//!  │ HttpTransport  ├─────────────►│ ProxyTransport │
//!  └────────────────┘   (once)     └────────────────┘
//! ```

pub mod scheduler;
pub mod transport;

pub use scheduler::{ExecutionMode, PairCompleted, Scheduler, DEFAULT_TIMEOUT};
pub use transport::{HttpTransport, ProxyTransport, Transport, TransportError, PROXY_URL};
