//! Interactive chat bound to one conversation room.
//!
//! Entry point: `loop_runner::run_chat_loop`.

pub mod commands;
pub mod input;
pub mod loop_runner;
