// ABOUTME: Command module aggregator for the bgctl CLI.
// ABOUTME: Re-exports promote, status, history and unit command handlers.

mod history;
mod promote;
mod status;
mod unit;

pub use history::history;
pub use promote::{PromoteRequest, promote};
pub use status::status;
pub use unit::unit;
