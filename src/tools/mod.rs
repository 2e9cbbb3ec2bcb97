pub mod calendar;
pub mod common;
pub mod control;
pub mod email;
pub mod registry;
pub mod traits;

pub use calendar::{CheckCalendarTool, ScheduleMeetingTool};
pub use common::{CHECK_CALENDAR, DONE, QUESTION, SCHEDULE_MEETING, WRITE_EMAIL};
pub use control::{DoneTool, QuestionTool};
pub use email::WriteEmailTool;
pub use registry::ToolRegistry;
pub use traits::{ReviewConfig, ReviewKind, Tool, ToolResult, ToolSpec};

use crate::providers::Collaborators;
use std::sync::Arc;

/// The assistant's tool set, in the order the model sees it.
pub fn assistant_tools(collaborators: &Collaborators, user_address: &str, timezone: &str) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(WriteEmailTool::new(
        Arc::clone(&collaborators.mail),
        user_address,
    )));
    registry.register(Arc::new(ScheduleMeetingTool::new(
        Arc::clone(&collaborators.calendar),
        user_address,
        timezone,
    )));
    registry.register(Arc::new(CheckCalendarTool::new(
        Arc::clone(&collaborators.calendar),
        collaborators.working_hours,
    )));
    registry.register(Arc::new(QuestionTool));
    registry.register(Arc::new(DoneTool));
    registry
}
