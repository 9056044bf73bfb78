//! Ratatui front-end for the billing desk. The `App` state machine owns the
//! store handle and the cached result sets; forms collect and validate
//! user input before anything reaches the persistence layer; the terminal
//! module drives the draw/input loop.

mod app;
mod forms;
mod helpers;
mod screens;
mod terminal;

pub use app::App;
pub use terminal::run_app;
