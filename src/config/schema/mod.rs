mod assistant;
mod core;
mod gateway;
mod ingest;
mod mail;
mod observability;
mod reliability;

pub use assistant::AssistantConfig;
pub use self::core::Config;
pub use gateway::GatewayConfig;
pub use ingest::{DEFAULT_GRAPH_NAME, IngestConfig, SchedulerConfig};
pub use mail::{CalendarConfig, MailConfig};
pub use observability::{LogFormat, ObservabilityConfig};
pub use reliability::ReliabilityConfig;
