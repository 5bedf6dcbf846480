use std::fmt;

use chrono::{DateTime, Utc};
use error_stack::Report;
use serde::Deserialize;

use crate::error::ValidationError;

pub const DEFAULT_SYMBOL: &str = "BTCUSDT";
pub const DEFAULT_TARGET: f64 = 70_000.0;

/// Position of an alert in the store. Alerts are never removed, so the index
/// stays valid for the lifetime of the process.
pub type AlertId = usize;

/// Comparison applied between the live price and an alert's target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Above,
    Below,
}

impl Direction {
    /// Parse `"above"` / `"below"`, ignoring case.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "above" => Some(Self::Above),
            "below" => Some(Self::Below),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Above => "Above",
            Self::Below => "Below",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Unvalidated alert submission, as entered by the user or read from config.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NewAlert {
    pub symbol: String,
    pub target: f64,
    #[serde(default)]
    pub direction: Direction,
}

impl Default for NewAlert {
    fn default() -> Self {
        Self {
            symbol: DEFAULT_SYMBOL.into(),
            target: DEFAULT_TARGET,
            direction: Direction::Above,
        }
    }
}

impl NewAlert {
    /// Check the submission without building an alert: the symbol must not
    /// be blank and the target must be a finite number above zero.
    pub fn validate(&self) -> Result<(), Report<ValidationError>> {
        if self.symbol.trim().is_empty() {
            return Err(Report::new(ValidationError::EmptySymbol));
        }
        // NaN fails this comparison too
        if !(self.target > 0.0 && self.target.is_finite()) {
            return Err(Report::new(ValidationError::NonPositiveTarget {
                target: self.target,
            }));
        }
        Ok(())
    }

    /// Validate and turn the submission into a pending alert with an
    /// uppercased symbol.
    pub fn into_alert(self) -> Result<Alert, Report<ValidationError>> {
        self.validate()?;
        Ok(Alert {
            symbol: self.symbol.trim().to_uppercase(),
            target: self.target,
            direction: self.direction,
            triggered: false,
            created_at: Utc::now(),
            triggered_at: None,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Alert {
    pub symbol: String,
    pub target: f64,
    pub direction: Direction,
    pub triggered: bool,
    pub created_at: DateTime<Utc>,
    pub triggered_at: Option<DateTime<Utc>>,
}

impl Alert {
    pub fn is_pending(&self) -> bool {
        !self.triggered
    }
}
