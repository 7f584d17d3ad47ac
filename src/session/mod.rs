/// Session management module - Gateway

mod manager;
mod profile;
mod types;

pub use manager::{ConcurrencyMode, SessionDependencies, SessionManager, SessionSettings};
pub(crate) use manager::validate_owner_id;
pub use profile::{default_welcome_text, entity_slug, normalize_key, EntityKind, EntityProfile, ProfileRegistry};
pub use types::{Session, SessionState, TurnReply};
