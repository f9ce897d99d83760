//! Store snapshots

use crate::operation::Selector;
use crate::variables::SelectorData;

/// A materialized read of store data for a selector.
#[derive(Debug, Clone)]
pub struct Snapshot {
	/// The selector that was read.
	pub selector: Selector,
	/// Data read for the selector; `None` when the root is absent.
	pub data: Option<SelectorData>,
	/// Whether any selected field was missing from the store.
	pub is_missing_data: bool,
}

/// Whether an operation can be fulfilled from the store alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Availability {
	/// Every selected field is present.
	Available,
	/// At least one selected field is missing.
	Missing,
}

impl Availability {
	/// Returns whether the store can fulfil the operation.
	pub fn is_available(self) -> bool {
		matches!(self, Self::Available)
	}
}
