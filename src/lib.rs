pub mod capability;
pub mod core;
pub mod evaluation;
pub mod handlers;
pub mod pipeline;
pub mod router;
pub mod server;
pub mod state;
pub mod text;
pub mod vector_math;

pub use pipeline::{AssistantPipeline, AssistantReply, Capabilities, RequestConfig};
