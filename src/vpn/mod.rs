//! VPN on/off control
//!
//! This module tracks the VPN state and invokes the external on/off
//! operations through a [`ToggleRunner`].

mod controller;
mod runner;
mod state;

pub use controller::VpnController;
pub use runner::{
    capture, runner_from_config, CaptureError, Captured, CommandRunner, OperationOutput,
    ToggleOutcome, ToggleRunner, WgQuickRunner,
};
pub use state::{Direction, VpnState};

#[cfg(test)]
pub use runner::MockToggleRunner;
