//! Item selection: which playlist entries a run processes.
//!
//! [`plan`] never rejects input; it clamps and filters. Contradictory user
//! input is rejected earlier by [`SelectionPolicy::from_flags`].

use thiserror::Error;

use crate::extract::{ItemSummary, PlaylistMetadata};

/// Rejected selection input. Raised before any network activity.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A single index was combined with range bounds.
    #[error("cannot combine --item with --start or --end")]
    ConflictingSelection,

    /// Range start is greater than range end.
    #[error("start index ({start}) must be less than or equal to end index ({end})")]
    InvertedRange {
        /// Requested start.
        start: usize,
        /// Requested end.
        end: usize,
    },

    /// Positions are 1-based.
    #[error("playlist positions start at 1, got 0 for {flag}")]
    ZeroIndex {
        /// Which flag carried the zero.
        flag: &'static str,
    },
}

/// Which items of a playlist to process. 1-based, inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectionPolicy {
    /// Every item.
    #[default]
    All,
    /// Only the item at this position.
    SingleIndex(usize),
    /// Items between the bounds; an open bound means first/last.
    Range {
        /// First position, defaults to 1.
        start: Option<usize>,
        /// Last position, defaults to the playlist length.
        end: Option<usize>,
    },
}

impl SelectionPolicy {
    /// Builds a policy from the three user-facing options.
    ///
    /// # Errors
    ///
    /// - [`ValidationError::ConflictingSelection`] when `item` is combined with a bound
    /// - [`ValidationError::InvertedRange`] when `start > end`
    /// - [`ValidationError::ZeroIndex`] when any value is 0
    pub fn from_flags(
        item: Option<usize>,
        start: Option<usize>,
        end: Option<usize>,
    ) -> Result<Self, ValidationError> {
        if item.is_some() && (start.is_some() || end.is_some()) {
            return Err(ValidationError::ConflictingSelection);
        }

        let policy = match (item, start, end) {
            (Some(item), _, _) => Self::SingleIndex(item),
            (None, None, None) => Self::All,
            (None, start, end) => Self::Range { start, end },
        };
        policy.validate()?;
        Ok(policy)
    }

    /// Checks the policy's own invariants.
    ///
    /// # Errors
    ///
    /// - [`ValidationError::InvertedRange`] when both bounds are set and `start > end`
    /// - [`ValidationError::ZeroIndex`] when any position is 0
    pub fn validate(&self) -> Result<(), ValidationError> {
        match *self {
            Self::All => Ok(()),
            Self::SingleIndex(0) => Err(ValidationError::ZeroIndex { flag: "--item" }),
            Self::SingleIndex(_) => Ok(()),
            Self::Range { start, end } => {
                if start == Some(0) {
                    return Err(ValidationError::ZeroIndex { flag: "--start" });
                }
                if end == Some(0) {
                    return Err(ValidationError::ZeroIndex { flag: "--end" });
                }
                match (start, end) {
                    (Some(start), Some(end)) if start > end => {
                        Err(ValidationError::InvertedRange { start, end })
                    }
                    _ => Ok(()),
                }
            }
        }
    }

    /// Returns true unless the policy is [`SelectionPolicy::All`].
    #[must_use]
    pub fn is_partial(&self) -> bool {
        !matches!(self, Self::All)
    }
}

/// An item chosen for processing, with its playlist position.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedItem {
    /// 1-based position in the playlist.
    pub position: usize,
    /// The listed entry.
    pub item: ItemSummary,
}

/// Computes the ordered items a run will process.
///
/// Out-of-range positions yield fewer (possibly zero) items, never an error.
#[must_use]
pub fn plan(metadata: &PlaylistMetadata, policy: SelectionPolicy) -> Vec<PlannedItem> {
    let count = metadata.items.len();
    let (first, last) = match policy {
        SelectionPolicy::All => (1, count),
        SelectionPolicy::SingleIndex(n) => (n, n),
        SelectionPolicy::Range { start, end } => {
            (start.unwrap_or(1).max(1), end.unwrap_or(count).min(count))
        }
    };

    if first == 0 || first > last || first > count {
        return Vec::new();
    }

    metadata.items[first - 1..last.min(count)]
        .iter()
        .enumerate()
        .map(|(offset, item)| PlannedItem {
            position: first + offset,
            item: item.clone(),
        })
        .collect()
}
