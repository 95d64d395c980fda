//! VPN state and toggle direction

use serde::{Deserialize, Serialize};

/// Whether the last successful toggle left the VPN on or off
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VpnState {
    /// VPN is off (initial state)
    #[default]
    Off,
    /// VPN is on
    On,
}

impl VpnState {
    /// Check if the VPN is on
    pub fn is_on(&self) -> bool {
        matches!(self, VpnState::On)
    }
}

impl std::fmt::Display for VpnState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VpnState::Off => write!(f, "off"),
            VpnState::On => write!(f, "on"),
        }
    }
}

/// Which external operation to invoke
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Turn the VPN on
    On,
    /// Turn the VPN off
    Off,
}

impl Direction {
    /// State the controller moves to when this operation succeeds
    pub fn target_state(&self) -> VpnState {
        match self {
            Direction::On => VpnState::On,
            Direction::Off => VpnState::Off,
        }
    }

    /// wg-quick subcommand for this direction
    pub fn wg_quick_verb(&self) -> &'static str {
        match self {
            Direction::On => "up",
            Direction::Off => "down",
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::On => write!(f, "ON"),
            Direction::Off => write!(f, "OFF"),
        }
    }
}
