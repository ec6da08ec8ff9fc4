// ABOUTME: Process supervisor adapter for the virtual machine substrate.
// ABOUTME: Installs and swaps systemd units that run an application build.

mod error;
mod systemd;
mod unit;

pub use error::SupervisorError;
pub use systemd::{ProcessSupervisor, SystemdSupervisor, replace_unit};
pub use unit::{UnitSpec, UnitStatus, unit_name};
