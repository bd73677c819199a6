//! Small shared helpers
//!
//! Client id generation and the default color assigned to records that
//! don't pick one themselves.

use rand::Rng;

/// Generate a candidate client id from the microsecond clock.
///
/// Ids are decimal digit strings, effectively monotonic across a process.
/// Uniqueness is not guaranteed under clock coarseness; the registry
/// treats a collision as a fatal invariant violation rather than
/// retrying, since it means this generator's assumption broke.
pub fn next_client_id() -> String {
    let micros = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_micros();
    micros.to_string()
}

/// Check that an id has the shape produced by [`next_client_id`].
pub fn is_client_id(id: &str) -> bool {
    !id.is_empty() && id.bytes().all(|b| b.is_ascii_digit())
}

/// Return a random half-transparent RGBA color string.
pub fn random_color() -> String {
    let mut rng = rand::rng();
    format!(
        "rgba({}, {}, {}, 0.5)",
        rng.random_range(0..=255),
        rng.random_range(0..=255),
        rng.random_range(0..=255),
    )
}
