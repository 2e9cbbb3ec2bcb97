pub mod availability;
pub mod error;
pub mod factory;
pub mod google;
pub mod simulated;
pub mod traits;

pub use availability::{WorkingHours, render_schedules};
pub use error::{ProviderError, ProviderResult};
pub use factory::{Collaborators, create_collaborators};
pub use simulated::{SimulatedCalendar, SimulatedMail};
pub use traits::{
    CalendarEvent, CalendarProvider, DaySchedule, EventSpan, FetchFilter, FetchedMessage,
    MailItem, MailProvider, NewEvent, OutgoingEmail,
};
