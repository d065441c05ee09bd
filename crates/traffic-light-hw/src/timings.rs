//! Phase durations for the regular light cycle.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Shortest allowed phase, in milliseconds.
pub const MIN_PHASE_MS: u32 = 500;

/// Longest allowed phase, in milliseconds.
pub const MAX_PHASE_MS: u32 = 5000;

/// Granularity of phase durations, in milliseconds.
pub const PHASE_STEP_MS: u32 = 100;

/// One of the three lights.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Light {
    Red,
    Yellow,
    Green,
}

impl Light {
    /// Token the controller reports while this light is lit.
    pub fn lit_token(&self) -> &'static str {
        match self {
            Light::Red => "R1",
            Light::Yellow => "Y1",
            Light::Green => "G1",
        }
    }
}

impl FromStr for Light {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "red" | "r" => Ok(Light::Red),
            "yellow" | "y" => Ok(Light::Yellow),
            "green" | "g" => Ok(Light::Green),
            _ => Err(Error::InvalidLight(s.to_string())),
        }
    }
}

impl std::fmt::Display for Light {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Light::Red => write!(f, "red"),
            Light::Yellow => write!(f, "yellow"),
            Light::Green => write!(f, "green"),
        }
    }
}

/// Direction of a single-step timing adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
}

impl FromStr for Direction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "up" | "+" => Ok(Direction::Up),
            "down" | "-" => Ok(Direction::Down),
            _ => Err(Error::InvalidDirection(s.to_string())),
        }
    }
}

/// Red, yellow and green phase durations in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LightTimings {
    pub red: u32,
    pub yellow: u32,
    pub green: u32,
}

impl LightTimings {
    /// Creates timings, clamping and snapping each phase.
    pub fn new(red: u32, yellow: u32, green: u32) -> Self {
        Self {
            red: normalize(red),
            yellow: normalize(yellow),
            green: normalize(green),
        }
    }

    /// Returns a copy with every phase clamped and snapped.
    pub fn normalized(&self) -> Self {
        Self::new(self.red, self.yellow, self.green)
    }

    /// Gets the duration of one phase.
    pub fn get(&self, light: Light) -> u32 {
        match light {
            Light::Red => self.red,
            Light::Yellow => self.yellow,
            Light::Green => self.green,
        }
    }

    /// Sets the duration of one phase (clamped and snapped).
    pub fn set(&mut self, light: Light, ms: u32) {
        let ms = normalize(ms);
        match light {
            Light::Red => self.red = ms,
            Light::Yellow => self.yellow = ms,
            Light::Green => self.green = ms,
        }
    }

    /// Moves one phase by a single step.
    pub fn nudge(&mut self, light: Light, direction: Direction) {
        let current = self.get(light);
        let next = match direction {
            Direction::Up => current.saturating_add(PHASE_STEP_MS),
            Direction::Down => current.saturating_sub(PHASE_STEP_MS),
        };
        self.set(light, next);
    }
}

impl Default for LightTimings {
    fn default() -> Self {
        Self {
            red: 2000,
            yellow: 500,
            green: 2000,
        }
    }
}

fn normalize(ms: u32) -> u32 {
    let clamped = ms.clamp(MIN_PHASE_MS, MAX_PHASE_MS);
    (clamped + PHASE_STEP_MS / 2) / PHASE_STEP_MS * PHASE_STEP_MS
}
