//! PneumoScan application: local web page and CLI around the classifier

pub mod cli;
pub mod config;
pub mod display;
pub mod server;
pub mod state;

pub use cli::*;
pub use config::*;
pub use display::*;
pub use server::*;
pub use state::*;
