//! Common type definitions.
//!
//! Generation ids are UUIDs generated locally. User ids are the identity
//! provider's opaque subject strings (e.g. `user_2abc…`) and are passed
//! around as plain `String`s; the service never mints them.

use uuid::Uuid;

pub type GenerationId = Uuid;

/// Abbreviate a UUID to its first 8 characters for more readable logs and traces
/// Example: "550e8400-e29b-41d4-a716-446655440000" -> "550e8400"
pub fn abbrev_uuid(uuid: &Uuid) -> String {
    uuid.to_string().chars().take(8).collect()
}
