//! Metadata dialects
//!
//! Item metadata arrives in the native shape or one of three foreign
//! dialects. Foreign dialects pass through an external XSL-style transform
//! to the native shape before parsing; the transform itself is an external
//! collaborator behind the [`DialectTransform`] seam.

use crate::error::{ConvertError, Result};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Closed set of metadata dialects
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    Native,
    Etd,
    Biomed,
    Springer,
}

/// Converts a foreign-dialect document into the native shape.
pub trait DialectTransform: Send + Sync {
    /// Produce native-shape XML from a document in the given dialect.
    /// Implementations must pass native input through unchanged.
    fn to_native(&self, dialect: Dialect, xml: &str) -> Result<String>;
}

/// Transform that only accepts native input. Used when the external
/// transform step is not wired up (tests, database-only runs).
pub struct NativeOnly;

impl DialectTransform for NativeOnly {
    fn to_native(&self, dialect: Dialect, xml: &str) -> Result<String> {
        match dialect {
            Dialect::Native => Ok(xml.to_string()),
            other => Err(ConvertError::Configuration(format!(
                "no transform configured for dialect {}",
                other
            ))),
        }
    }
}
