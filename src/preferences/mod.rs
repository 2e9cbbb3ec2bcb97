pub mod memory;
pub mod service;
pub mod sqlite;
pub mod traits;

pub use memory::InMemoryPreferenceStore;
pub use service::Preferences;
pub use sqlite::SqlitePreferenceStore;
pub use traits::{Namespace, PreferenceRevision, PreferenceStore};
