//! Context for the current backup unit
//!

use core::fmt::{self, Display};

/// Holds the context for the current unit of work. Used for prefixing logs.
#[derive(Default, Debug, Clone)]
pub struct Context {
    /// The unit being backed up.
    pub unit: Option<String>,

    /// The current stage.
    pub stage: &'static str,
}

impl Context {
    /// A context for a named unit.
    pub fn for_unit(unit: &str) -> Self {
        Self {
            unit: Some(unit.to_string()),
            stage: "",
        }
    }
}

impl Display for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(unit) = &self.unit {
            write!(f, "[{unit}] ")?;
        }

        if !self.stage.is_empty() {
            write!(f, "[{}] ", self.stage)?;
        }

        Ok(())
    }
}
