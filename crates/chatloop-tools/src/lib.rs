//! # chatloop-tools
//!
//! The tools a chat session ships with:
//!
//! - `calculator`: arithmetic with functions and constants
//! - `get_current_time`: current time in UTC, Beijing time or a fixed offset
//! - `end_chat`: lets the model close the session
//!
//! ```rust,ignore
//! let registry = chatloop_tools::default_registry()?;
//! assert!(registry.contains("calculator"));
//! ```

pub mod calculator;
pub mod clock;
pub mod expr;
pub mod farewell;

pub use calculator::{CALCULATOR_TOOL, CalculatorTool};
pub use clock::{CLOCK_TOOL, ClockTool};
pub use farewell::{END_CHAT_TOOL, FarewellTool};

use chatloop_core::ToolRegistry;

/// Registry holding every tool in this crate
pub fn default_registry() -> chatloop_core::Result<ToolRegistry> {
    ToolRegistry::builder()
        .register(ClockTool::new())
        .register(CalculatorTool)
        .register(FarewellTool)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_registry() {
        let registry = default_registry().unwrap();
        assert_eq!(registry.len(), 3);
        for name in [CALCULATOR_TOOL, CLOCK_TOOL, END_CHAT_TOOL] {
            assert!(registry.contains(name), "missing {name}");
        }
    }

    #[test]
    fn test_schemas_are_objects() {
        for schema in default_registry().unwrap().schemas() {
            let json = schema.json_schema();
            assert_eq!(json["type"], "object", "{}", schema.name);
        }
    }
}
