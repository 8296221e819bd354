//! Answer generation: prompt assembly and response streaming

pub mod answer;
pub mod prompt;
pub mod stream;

pub use answer::AnswerGenerator;
pub use prompt::PromptBuilder;
pub use stream::{sse_frame, FramedStream, StreamMode};
