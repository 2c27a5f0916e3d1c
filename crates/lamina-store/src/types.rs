//! Core identifiers: [`Layer`], [`SegmentId`], and the [`StoreKey`] /
//! [`StoreValue`] bounds.

use std::fmt;
use std::hash::Hash;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::StoreError;

// ---------------------------------------------------------------------------
// Layer
// ---------------------------------------------------------------------------

/// A priority level. Higher values override lower ones.
///
/// Layers are implicit: a layer exists in storage only while at least one
/// segment holds a value on it.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Layer(i32);

impl Layer {
    /// Create a layer from its priority.
    pub const fn new(priority: i32) -> Self {
        Self(priority)
    }

    /// The numeric priority.
    pub const fn priority(self) -> i32 {
        self.0
    }
}

impl From<i32> for Layer {
    fn from(priority: i32) -> Self {
        Self(priority)
    }
}

impl TryFrom<f64> for Layer {
    type Error = StoreError;

    /// Accept only finite whole numbers within `i32` range.
    fn try_from(value: f64) -> Result<Self, Self::Error> {
        let invalid = |reason: &str| StoreError::InvalidLayer {
            layer: value.to_string(),
            reason: reason.to_string(),
        };
        if !value.is_finite() || value.fract() != 0.0 {
            return Err(invalid("layers have to be integers"));
        }
        if value < f64::from(i32::MIN) || value > f64::from(i32::MAX) {
            return Err(invalid("layer is out of range"));
        }
        Ok(Self(value as i32))
    }
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// SegmentId
// ---------------------------------------------------------------------------

/// Identifier of a storage partition.
///
/// [`SegmentId::Global`] is reserved: it is the fallback every segment
/// inherits from unless its inheritance chain says otherwise.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SegmentId {
    /// The reserved global segment.
    Global,
    /// A segment named by a string.
    Named(String),
    /// A segment named by a number.
    Numbered(i64),
    /// An anonymous segment identified by a generated token.
    Token(Uuid),
}

impl SegmentId {
    /// Generate a fresh anonymous segment identifier.
    pub fn unique() -> Self {
        Self::Token(Uuid::now_v7())
    }

    /// Returns `true` for the reserved global segment.
    pub fn is_global(&self) -> bool {
        matches!(self, Self::Global)
    }
}

impl From<&str> for SegmentId {
    fn from(name: &str) -> Self {
        Self::Named(name.to_string())
    }
}

impl From<String> for SegmentId {
    fn from(name: String) -> Self {
        Self::Named(name)
    }
}

impl From<i64> for SegmentId {
    fn from(number: i64) -> Self {
        Self::Numbered(number)
    }
}

impl From<i32> for SegmentId {
    fn from(number: i32) -> Self {
        Self::Numbered(i64::from(number))
    }
}

impl From<Uuid> for SegmentId {
    fn from(token: Uuid) -> Self {
        Self::Token(token)
    }
}

impl From<&SegmentId> for SegmentId {
    fn from(id: &SegmentId) -> Self {
        id.clone()
    }
}

impl fmt::Display for SegmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Global => write!(f, "<global>"),
            Self::Named(name) => write!(f, "{name}"),
            Self::Numbered(number) => write!(f, "#{number}"),
            Self::Token(token) => write!(f, "token:{token}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Keys and values
// ---------------------------------------------------------------------------

/// A key that can address a storage slot.
///
/// Keys with a text view can be matched by listener patterns and are
/// exported as dotted paths ("a.b.c" becomes `{"a": {"b": {"c": ..}}}`).
pub trait StoreKey: Clone + Eq + Hash + fmt::Debug + Send + Sync + 'static {
    /// The key as text, if it has a text form.
    fn as_text(&self) -> Option<&str> {
        None
    }

    /// The property name used when the key is exported without a path.
    fn property_name(&self) -> String {
        match self.as_text() {
            Some(text) => text.to_string(),
            None => format!("{self:?}"),
        }
    }
}

impl StoreKey for String {
    fn as_text(&self) -> Option<&str> {
        Some(self.as_str())
    }
}

impl StoreKey for &'static str {
    fn as_text(&self) -> Option<&str> {
        Some(*self)
    }
}

macro_rules! numeric_key {
    ($($ty:ty),* $(,)?) => {
        $(
            impl StoreKey for $ty {
                fn property_name(&self) -> String {
                    self.to_string()
                }
            }
        )*
    };
}

numeric_key!(i8, i16, i32, i64, u8, u16, u32, u64, usize);

/// Bound for stored values.
pub trait StoreValue: Clone + fmt::Debug + Send + Sync + 'static {}

impl<T> StoreValue for T where T: Clone + fmt::Debug + Send + Sync + 'static {}
