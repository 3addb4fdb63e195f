//! # zimage-client
//!
//! Async Rust client for AI image generation backends.
//!
//! Talks to four kinds of backend behind one [`ImageBackend`] trait: a hosted
//! model called directly, a workflow-engine webhook, a task server that is
//! polled until the task finishes, and an arbitrary user-configured endpoint.
//! Finished images land in a persisted, newest-first history that can also
//! be paged in from the task server as the user scrolls.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//! use zimage_client::{
//!     build_backend, AppState, ClientConfig, FileStore, GenerationEvent, GenerationRequest,
//!     Generator,
//! };
//!
//! # async fn example() -> zimage_client::Result<()> {
//! let config = ClientConfig::from_env()?;
//! let state = AppState::load(Arc::new(FileStore::new(".zimage")), &config)?;
//! let generator = Generator::new(build_backend(&config, &state.settings())?);
//!
//! let image = generator
//!     .generate(
//!         &state,
//!         GenerationRequest::new("a lighthouse in a storm"),
//!         &CancellationToken::new(),
//!         |event| {
//!             if let GenerationEvent::Progress(p) = event {
//!                 println!("{}%", p.percent);
//!             }
//!         },
//!     )
//!     .await?;
//! println!("{}", image.url);
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod config;
pub mod endpoint;
pub mod error;
pub mod gallery;
pub mod generator;
pub mod history;
pub mod logging;
pub mod normalize;
pub mod state;
pub mod store;
pub mod tasks;
pub mod transport;
pub mod types;

pub use backend::{
    build_backend, BackendKind, CustomEndpointBackend, DirectModelBackend, ImageBackend,
    ProgressSink, TaskBackend, WebhookBackend,
};
pub use config::{ClientConfig, ClientConfigBuilder};
pub use endpoint::{resolve_endpoint, BuildMode, WebhookEndpoints};
pub use error::{GenError, Result};
pub use gallery::Gallery;
pub use generator::{GenerationEvent, Generator};
pub use history::{HistoryPager, PageLoad, ScrollPosition};
pub use logging::init_tracing;
pub use normalize::{extract_image_field, normalize};
pub use state::AppState;
pub use store::{FileStore, ImageStore, MemoryStore};
pub use tasks::{generate_image, poll_task, PollOptions, TaskApi, TaskClient};
pub use transport::{HttpTransport, RequestOptions};
pub use types::{
    AppSettings, AspectRatio, GeneratedImage, GenerationOutcome, GenerationRequest,
    ProgressUpdate, Task, TaskCreate, TaskStatus,
};
