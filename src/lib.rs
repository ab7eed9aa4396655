//! # fanline
//!
//! **Concurrent, order-preserving transformation pipelines in Rust.**
//!
//! `fanline` applies a chain of transformation stages to a sequence or stream
//! of items using a pool of concurrent workers per stage, then reassembles
//! the results. It is built for the unglamorous middle of data processing:
//!
//! - fan-out across a fixed number of workers, fan-in to one result
//! - input order preserved for bounded inputs, even though workers race
//! - fail-fast error discipline, or none at all, chosen at the type level
//! - bounded channels everywhere, so memory stays a budget
//!
//! > Order comes from an index stamp, not from luck.
//!
//! ---
//!
//! ## Core Model
//!
//! A pipeline is a chain of stages, each backed by its own worker pool:
//!
//! ```text
//! Source → Stage 1 (W workers) → … → Stage N (W workers) → Collect
//! ```
//!
//! Stages are composed as a [`Flow`] and communicate through bounded Tokio
//! channels. Every item travels inside an envelope carrying its original
//! input position; workers complete in whatever order they like, and the
//! collector puts things back where they belong.
//!
//! ---
//!
//! ## Example
//!
//! An ordered parallel map:
//!
//! ```no_run
//! use fanline::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> fanline::error::Result<()> {
//!     let transformer = Transformer::new(4)?;
//!
//!     let out = transformer
//!         .transform(vec![1u32, 2, 3], stage(|x: u32| x * 2).map(|x| x + 1))
//!         .await;
//!
//!     assert_eq!(out, vec![3, 5, 7]);
//!     Ok(())
//! }
//! ```
//!
//! Fallible stages return `Result` and the whole run is all-or-nothing:
//!
//! ```no_run
//! use fanline::error::{Error, Result};
//! use fanline::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let transformer = Transformer::new(4)?;
//!
//!     let parsed = transformer
//!         .try_transform(
//!             vec!["1".to_string(), "2".to_string()],
//!             try_stage("parse", |s: String| {
//!                 s.parse::<u32>().map_err(|_| Error::action("not a number"))
//!             }),
//!         )
//!         .await?;
//!
//!     assert_eq!(parsed, vec![1, 2]);
//!     Ok(())
//! }
//! ```
//!
//! ---
//!
//! ## Channel Pipelines
//!
//! For open-ended sources, feed a `tokio::sync::mpsc::Receiver` instead of a
//! `Vec`. No ordering guarantee holds; results arrive as workers finish:
//!
//! ```no_run
//! use fanline::prelude::*;
//!
//! # async fn demo(input: tokio::sync::mpsc::Receiver<u32>) -> fanline::error::Result<()> {
//! let transformer = Transformer::new(8)?;
//! let mut out = transformer.transform_channel(input, stage(|x: u32| x * 2));
//!
//! while let Some(value) = out.recv().await {
//!     println!("{value}");
//! }
//! # Ok(())
//! # }
//! ```
//!
//! The fallible variant returns a second, capacity-one channel that delivers
//! at most the first error; items transformed before the failure was observed
//! are still delivered, which is weaker than the all-or-nothing contract of
//! [`Transformer::try_transform`].
//!
//! ---
//!
//! ## API Contracts
//!
//! - Ordered APIs: output length equals input length, position `i` holds the
//!   composition of every stage applied to input `i`, independent of worker
//!   count.
//! - Channel APIs: the output multiset equals the transformed input multiset
//!   (minus items past the first error, under fail-fast); order unspecified.
//! - An error, once attached to an item, is never overwritten and later
//!   stages never invoke their action on that item.
//! - Fail-fast aborts the run promptly: the feeder and every worker pool
//!   observe the abort and stop instead of processing the rest of the input.
//! - Dropping a channel API's output receiver aborts the remaining upstream
//!   work.
//! - Infallible actions cannot signal failure at the type level; a panicking
//!   action propagates a panic out of [`Transformer::transform`].
//!
//! ---
//!
//! ## Observability
//!
//! Enable tracing instrumentation with:
//!
//! ```toml
//! fanline = { version = "0.2", features = ["tracing"] }
//! ```
//!
//! `fanline` emits structured spans/events such as `fanline.stage`,
//! `fanline.worker.exit`, `fanline.downstream.closed`, and
//! `fanline.error.short_circuit`.
//!
//! ---
//!
//! ## Feature Flags
//!
//! - `tracing` *(default)*: enables optional tracing spans/logging.
//!
//! [`Flow`]: pipeline::flow::Flow
//! [`Transformer::try_transform`]: pipeline::transformer::Transformer::try_transform
//! [`Transformer::transform`]: pipeline::transformer::Transformer::transform

// Public modules
pub mod error;
pub mod pipeline;

pub mod prelude {
    //! Convenient imports for most `fanline` users.

    pub use crate::pipeline::abort::AbortToken;
    pub use crate::pipeline::flow::{identity, stage, try_stage, Flow, FlowExt, TryFlowExt};
    pub use crate::pipeline::transformer::Transformer;
}
