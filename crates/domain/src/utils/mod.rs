//! Small serde helpers shared by domain types

pub mod serde;

pub use self::serde::duration_millis;
