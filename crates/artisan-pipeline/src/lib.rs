//! Artisan Pipeline
//!
//! The generation orchestrator behind every artisan use case. A request names
//! a set of variations; each variation becomes one task that calls an external
//! generative service. Tasks run concurrently, each gets at most one fallback
//! attempt, and the run settles into an ordered [`GenerationResult`].
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       Orchestrator                          │
//! │  - run(request, builder, cancel) → GenerationResult         │
//! │  - builds one task per variation via PromptBuilder          │
//! │  - spawns all tasks, restores request order on fan-in       │
//! └─────────────────────────────────────────────────────────────┘
//!                               │
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       TaskExecutor                          │
//! │  - primary attempt, then fallback attempt on failure        │
//! │  - immediate calls, or submit + Poller for video            │
//! └─────────────────────────────────────────────────────────────┘
//!                               │
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    GenerationClient                         │
//! │  - provider implementation (artisan-provider) or a fake     │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! let orchestrator = Orchestrator::new(client, PollConfig::default());
//! let request = GenerationRequest::new(media, params, vec!["natural".into()]);
//! let result = orchestrator.run(request, &builder, CancellationToken::new()).await?;
//! ```

mod client;
mod error;
mod events;
mod orchestrator;
mod poller;
mod prompt;
mod request;
mod result;
mod task;

pub use client::{GenerationCall, GenerationClient, OperationHandle, OperationStatus, TaskPayload};
pub use error::{GenerationError, PipelineError, PollError, PromptError, TaskError, TaskFailure};
pub use events::{ChannelNotifier, GenerationEvent, GenerationNotifier, NoopNotifier};
pub use orchestrator::Orchestrator;
pub use poller::{LongRunningOperation, PollConfig, Poller};
pub use prompt::{PromptBuilder, PromptTemplate, TemplatePromptBuilder};
pub use request::{GenerationRequest, MediaKind, MediaPayload};
pub use result::{GenerationResult, OverallStatus, TaskOutcome};
pub use task::{Capability, GenerationTask, TaskContext, TaskExecutor, TaskPlan, TaskStatus};
