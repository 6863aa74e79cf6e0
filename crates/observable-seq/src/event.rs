#![forbid(unsafe_code)]

//! Change events delivered to subscribers.
//!
//! Field population per kind:
//!
//! | Kind              | `index` | `old_value` | `new_value` | `new_size` |
//! |-------------------|---------|-------------|-------------|------------|
//! | `ElementAdded`    | yes     | -           | yes         | -          |
//! | `ElementRemoved`  | yes     | yes         | -           | -          |
//! | `ElementModified` | yes     | yes         | yes         | -          |
//! | `SizeChanged`     | -       | -           | -           | yes        |
//! | `BatchUpdate`     | -       | -           | -           | -          |

use std::fmt;

/// What kind of change an event describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    ElementAdded,
    ElementRemoved,
    ElementModified,
    SizeChanged,
    /// Coalesced notification for one or more changes made inside a batch,
    /// or for a wholesale replacement of the contents.
    BatchUpdate,
}

impl ChangeKind {
    /// Stable name, used in logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ElementAdded => "ElementAdded",
            Self::ElementRemoved => "ElementRemoved",
            Self::ElementModified => "ElementModified",
            Self::SizeChanged => "SizeChanged",
            Self::BatchUpdate => "BatchUpdate",
        }
    }

    /// Whether this kind reflects a change in the number of elements.
    #[must_use]
    pub const fn is_structural(self) -> bool {
        matches!(
            self,
            Self::ElementAdded | Self::ElementRemoved | Self::SizeChanged
        )
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A structured change notification.
///
/// Values are cloned out of the container, so a subscriber may hold on to
/// an event after the container has moved on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent<T> {
    pub kind: ChangeKind,
    pub index: Option<usize>,
    pub old_value: Option<T>,
    pub new_value: Option<T>,
    pub new_size: Option<usize>,
}

impl<T> ChangeEvent<T> {
    fn bare(kind: ChangeKind) -> Self {
        Self {
            kind,
            index: None,
            old_value: None,
            new_value: None,
            new_size: None,
        }
    }

    /// `value` now lives at `index`.
    #[must_use]
    pub fn added(index: usize, value: T) -> Self {
        Self {
            index: Some(index),
            new_value: Some(value),
            ..Self::bare(ChangeKind::ElementAdded)
        }
    }

    /// `value` was taken out of `index`.
    #[must_use]
    pub fn removed(index: usize, value: T) -> Self {
        Self {
            index: Some(index),
            old_value: Some(value),
            ..Self::bare(ChangeKind::ElementRemoved)
        }
    }

    #[must_use]
    pub fn modified(index: usize, old: T, new: T) -> Self {
        Self {
            index: Some(index),
            old_value: Some(old),
            new_value: Some(new),
            ..Self::bare(ChangeKind::ElementModified)
        }
    }

    #[must_use]
    pub fn size_changed(new_size: usize) -> Self {
        Self {
            new_size: Some(new_size),
            ..Self::bare(ChangeKind::SizeChanged)
        }
    }

    #[must_use]
    pub fn batch_update() -> Self {
        Self::bare(ChangeKind::BatchUpdate)
    }

    /// Batch-completion events bypass deferral.
    #[must_use]
    pub fn is_batch_update(&self) -> bool {
        self.kind == ChangeKind::BatchUpdate
    }
}
