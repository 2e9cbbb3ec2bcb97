pub mod schema;

pub use schema::{
    AssistantConfig, CalendarConfig, Config, DEFAULT_GRAPH_NAME, GatewayConfig, IngestConfig,
    LogFormat, MailConfig, ObservabilityConfig, ReliabilityConfig, SchedulerConfig,
};
