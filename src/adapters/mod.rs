//! Adapters implementing the domain ports.

pub mod completion;
pub mod history;
pub mod mock;
pub mod reasoning;
pub mod registry;
pub mod workers;

pub use completion::{create_backend, AnthropicApiBackend, ClaudeCodeBackend};
pub use history::{SqliteHistorySink, TracingHistorySink};
pub use mock::{MockWorkerRuntime, ScriptedReasoningService};
pub use reasoning::LlmReasoningService;
pub use registry::StaticWorkerRegistry;
pub use workers::LlmWorkerRuntime;
