//! Prompt construction: token estimation, budgeted context assembly,
//! template rendering, and post-processing of model output.

pub mod assembler;
pub mod cleanup;
pub mod estimator;
pub mod smalltalk;
pub mod template;

pub use assembler::ContextAssembler;
pub use cleanup::clean_output;
pub use estimator::TokenEstimator;
pub use smalltalk::SmallTalk;
pub use template::PromptTemplate;
