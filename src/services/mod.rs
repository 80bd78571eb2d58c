pub mod export;
pub mod image;
pub mod llm;
pub mod prompt;
pub mod setup;
pub mod story;
pub mod workflow;
