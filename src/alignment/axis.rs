use std::{fmt, sync::Arc};

use serde::{Deserialize, Serialize};

/// One-directional text transform carried by an axis. The traversal engine never calls
/// it; it is kept for callers that want to project one pole onto the other.
pub type AxisMap = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// A labeled pair of opposing concepts explored at one tree level.
///
/// An axis with an empty label on either side is the leaf sentinel.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct Axis {
    pub left: String,
    pub right: String,
    #[serde(skip)]
    map: Option<AxisMap>,
}

impl Axis {
    pub fn new(left: impl Into<String>, right: impl Into<String>) -> Self {
        Self {
            left: left.into(),
            right: right.into(),
            map: None,
        }
    }

    pub fn sentinel() -> Self {
        Self::default()
    }

    pub fn with_map(mut self, map: impl Fn(&str) -> String + Send + Sync + 'static) -> Self {
        self.map = Some(Arc::new(map));
        self
    }

    pub fn is_live(&self) -> bool {
        !self.left.is_empty() && !self.right.is_empty()
    }

    pub fn has_map(&self) -> bool {
        self.map.is_some()
    }

    pub fn apply_map(&self, text: &str) -> Option<String> {
        self.map.as_ref().map(|map| map(text))
    }
}

impl PartialEq for Axis {
    fn eq(&self, other: &Self) -> bool {
        self.left == other.left && self.right == other.right
    }
}

impl Eq for Axis {}

impl fmt::Debug for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Axis")
            .field("left", &self.left)
            .field("right", &self.right)
            .field("map", &self.map.as_ref().map(|_| "<fn>"))
            .finish()
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.left, self.right)
    }
}
