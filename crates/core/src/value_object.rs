//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Everything that flows through the pipeline (observations, series points,
/// forecast points, recommendations) is a value: created once, never mutated,
/// compared by its fields. To "change" one, build a new one.
///
/// ## Design Constraints
///
/// - **Clone**: values are handed to worker threads by copy/move, never shared mutably
/// - **PartialEq**: compared by attribute values (tests rely on this for idempotence checks)
/// - **Debug**: shows up in structured log fields
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
