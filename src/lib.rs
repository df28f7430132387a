pub mod clipboard;
pub mod display;
pub mod engine;
pub mod error;
pub mod input;
pub mod logging;
pub mod settings;
pub mod shim;
pub mod startup;
pub mod ui;

pub use error::ShimError;
pub use shim::DisplayShim;
