//! # dog-loader: Decompressing resource loader
//!
//! `dog-loader` turns the URL of a gzip-compressed resource (typically a
//! `.png.gz` contact-map preview) into a locally addressable handle to the
//! inflated bytes, and keeps that handle's lifetime correct while the source
//! keeps changing underneath it.
//!
//! ## Key Features
//!
//! - **Explicit lifecycle**: `absent → pending → ready | failed`, one current
//!   request per consumer, stale completions discarded by request id
//! - **Leak-free handles**: each successful load allocates exactly one handle,
//!   released exactly once on supersession or detach
//! - **Memoized sources**: handing the loader the same URL twice never refetches
//! - **Injected routing**: dev-proxy URL rewriting is configuration, not an
//!   ambient environment check
//! - **Pluggable backends**: any [`Fetcher`] transport, any [`HandleStore`]
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use dog_loader::prelude::*;
//!
//! # #[tokio::main]
//! # async fn main() -> LoadResult<()> {
//! let loader = DecompressingLoader::http(LoaderConfig::from_env()?)?;
//!
//! loader.set_source(Some("https://genomeark.s3.amazonaws.com/genomeark/species/contact.png.gz"))?;
//! let snapshot = loader.settled().await;
//!
//! match (&snapshot.image, &snapshot.error) {
//!     (Some(image), _) => println!("display {image}"),
//!     (None, Some(error)) => println!("could not load preview: {error}"),
//!     (None, None) => println!("no preview"),
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────┐
//! │       Consumer       │  ← reads LoadSnapshot
//! ├──────────────────────┤
//! │  DecompressingLoader │  ← spawns loads, publishes snapshots
//! ├──────────────────────┤
//! │      LoadMachine     │  ← request ids, supersession, handle ownership
//! ├──────────┬───────────┤
//! │ Fetcher  │HandleStore│  ← transport / local object registry
//! └──────────┴───────────┘
//! ```

mod config;
mod error;
pub mod fetch;
pub mod handles;
pub mod inflate;
mod loader;
pub mod machine;
pub mod rewrite;
mod types;

pub use config::{ExecutionMode, LoaderConfig};
pub use error::{LoadError, LoadResult};
pub use fetch::{Fetcher, HttpFetcher};
pub use handles::{HandleStats, HandleStore, LocalHandle, MemoryHandleStore, StoredObject};
pub use inflate::gunzip;
pub use loader::DecompressingLoader;
pub use machine::{LoadMachine, LoadTicket};
pub use rewrite::{DevProxyRewrite, PassThrough, SourceRewrite};
pub use types::{HandleUrl, LoadSnapshot, LoadStatus, RequestId, SourceRef};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        DecompressingLoader, ExecutionMode, HandleStore, LoadError, LoadResult, LoadSnapshot,
        LoadStatus, LoaderConfig,
    };
}
