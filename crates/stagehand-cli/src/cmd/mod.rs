pub mod classify;
pub mod context;
pub mod hook;
pub mod state;
