//! In-memory record store
//!
//! Records live under a single root object. Each field is stored under its
//! storage key (field name plus arguments), so the same field requested with
//! different arguments does not collide. Linked fields are stored as nested
//! objects and lists are replaced wholesale on write.
//!
//! The store tracks retain counts per operation but never evicts data.

use crate::disposable::Disposable;
use crate::environment::SnapshotCallback;
use crate::operation::Selector;
use crate::request::Selection;
use crate::snapshot::{Availability, Snapshot};
use crate::variables::{SelectorData, Variables};
use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::{Arc, Weak};

struct StoreSubscription {
	id: u64,
	selector: Selector,
	data: Option<SelectorData>,
	callback: SnapshotCallback,
}

#[derive(Default)]
struct StoreState {
	root: Map<String, Value>,
	subscriptions: Vec<StoreSubscription>,
	next_subscription_id: u64,
	retains: HashMap<String, usize>,
}

/// Shared, normalized-by-storage-key record store.
///
/// # Examples
///
/// ```
/// use reinhardt_relay_runtime::request::{ConcreteRequest, Field, Query};
/// use reinhardt_relay_runtime::{OperationDescriptor, RecordStore, Variables};
/// use serde_json::json;
///
/// let query = Query::new(
///     ConcreteRequest::new("widget_Query")
///         .select(Field::linked("widget", vec![Field::scalar("name").into()])),
/// );
/// let operation = OperationDescriptor::new(&query, &Variables::new());
///
/// let store = RecordStore::new();
/// assert!(!store.check(&operation.fragment()).is_available());
///
/// store.publish(&operation.fragment(), &json!({"widget": {"name": "foo"}}));
/// let snapshot = store.lookup(&operation.fragment());
/// assert_eq!(
///     serde_json::Value::Object(snapshot.data.unwrap()),
///     json!({"widget": {"name": "foo"}}),
/// );
/// ```
#[derive(Clone, Default)]
pub struct RecordStore {
	state: Arc<Mutex<StoreState>>,
}

impl RecordStore {
	/// Creates an empty store.
	pub fn new() -> Self {
		Self::default()
	}

	/// Creates a store seeded with root records keyed by storage key.
	pub fn with_records(records: Value) -> Self {
		let store = Self::new();
		if let Value::Object(root) = records {
			store.state.lock().root = root;
		}
		store
	}

	/// Returns a copy of every record under the root.
	pub fn records(&self) -> Value {
		Value::Object(self.state.lock().root.clone())
	}

	/// Reads the selector's data.
	pub fn lookup(&self, selector: &Selector) -> Snapshot {
		let state = self.state.lock();
		read_snapshot(&state.root, selector)
	}

	/// Reports whether every selected field is present.
	pub fn check(&self, selector: &Selector) -> Availability {
		if self.lookup(selector).is_missing_data {
			Availability::Missing
		} else {
			Availability::Available
		}
	}

	/// Writes response data for the selector and notifies changed subscribers.
	pub fn publish(&self, selector: &Selector, data: &Value) {
		let notifications = {
			let mut state = self.state.lock();
			if let Value::Object(data) = data {
				write_selections(
					&mut state.root,
					&selector.query().request().selections,
					selector.variables(),
					data,
				);
			}

			let StoreState {
				root,
				subscriptions,
				..
			} = &mut *state;

			let mut notifications = Vec::new();
			for subscription in subscriptions.iter_mut() {
				let snapshot = read_snapshot(root, &subscription.selector);
				if snapshot.data != subscription.data {
					subscription.data = snapshot.data.clone();
					notifications.push((subscription.callback.clone(), snapshot));
				}
			}
			notifications
		};

		tracing::trace!(
			operation = selector.query().name(),
			notified = notifications.len(),
			"published response to store"
		);

		for (callback, snapshot) in notifications {
			callback(&snapshot);
		}
	}

	/// Calls `callback` whenever the data read by `snapshot` changes.
	///
	/// If the store already moved past `snapshot`, the callback is called
	/// once with the current data before this returns.
	pub fn subscribe(&self, snapshot: &Snapshot, callback: SnapshotCallback) -> Disposable {
		let (id, missed) = {
			let mut state = self.state.lock();
			let id = state.next_subscription_id;
			state.next_subscription_id += 1;

			let current = read_snapshot(&state.root, &snapshot.selector);
			state.subscriptions.push(StoreSubscription {
				id,
				selector: snapshot.selector.clone(),
				data: current.data.clone(),
				callback: callback.clone(),
			});
			(id, (current.data != snapshot.data).then_some(current))
		};

		if let Some(current) = missed {
			tracing::trace!(
				operation = snapshot.selector.query().name(),
				"store changed before subscribing"
			);
			callback(&current);
		}

		let state = Arc::downgrade(&self.state);
		Disposable::new(move || {
			if let Some(state) = state.upgrade() {
				state
					.lock()
					.subscriptions
					.retain(|subscription| subscription.id != id);
			}
		})
	}

	/// Returns the number of live store subscriptions.
	pub fn subscription_count(&self) -> usize {
		self.state.lock().subscriptions.len()
	}

	/// Increments the retain count for an operation identifier.
	pub fn retain(&self, identifier: &str) -> Disposable {
		*self
			.state
			.lock()
			.retains
			.entry(identifier.to_string())
			.or_insert(0) += 1;

		let state: Weak<Mutex<StoreState>> = Arc::downgrade(&self.state);
		let identifier = identifier.to_string();
		Disposable::new(move || {
			if let Some(state) = state.upgrade() {
				let mut state = state.lock();
				if let Some(count) = state.retains.get_mut(&identifier) {
					*count -= 1;
					if *count == 0 {
						state.retains.remove(&identifier);
					}
				}
			}
		})
	}

	/// Returns how many handles currently retain the operation identifier.
	pub fn retain_count(&self, identifier: &str) -> usize {
		self.state
			.lock()
			.retains
			.get(identifier)
			.copied()
			.unwrap_or(0)
	}
}

fn read_snapshot(root: &Map<String, Value>, selector: &Selector) -> Snapshot {
	let mut data = SelectorData::new();
	let mut is_missing_data = false;
	read_selections(
		root,
		&selector.query().request().selections,
		selector.variables(),
		&mut data,
		&mut is_missing_data,
	);

	Snapshot {
		selector: selector.clone(),
		data: Some(data),
		is_missing_data,
	}
}

fn read_selections(
	record: &Map<String, Value>,
	selections: &[Selection],
	variables: &Variables,
	out: &mut SelectorData,
	missing: &mut bool,
) {
	for selection in selections {
		match selection {
			Selection::Field(field) => {
				let Some(value) = record.get(&field.storage_key(variables)) else {
					*missing = true;
					continue;
				};

				let read = if field.is_linked() {
					read_linked(value, &field.selections, variables, missing)
				} else {
					value.clone()
				};
				out.insert(field.response_name().to_string(), read);
			}
			Selection::Condition(condition) => {
				if condition.passes(variables) {
					read_selections(record, &condition.selections, variables, out, missing);
				}
			}
		}
	}
}

fn read_linked(
	value: &Value,
	selections: &[Selection],
	variables: &Variables,
	missing: &mut bool,
) -> Value {
	match value {
		Value::Object(record) => {
			let mut nested = SelectorData::new();
			read_selections(record, selections, variables, &mut nested, missing);
			Value::Object(nested)
		}
		Value::Array(items) => Value::Array(
			items
				.iter()
				.map(|item| read_linked(item, selections, variables, missing))
				.collect(),
		),
		Value::Null => Value::Null,
		_ => {
			*missing = true;
			Value::Null
		}
	}
}

fn write_selections(
	record: &mut Map<String, Value>,
	selections: &[Selection],
	variables: &Variables,
	data: &Map<String, Value>,
) {
	for selection in selections {
		match selection {
			Selection::Field(field) => {
				let Some(value) = data.get(field.response_name()) else {
					continue;
				};
				let key = field.storage_key(variables);

				if !field.is_linked() {
					record.insert(key, value.clone());
					continue;
				}

				match value {
					Value::Object(object) => {
						let entry = record
							.entry(key)
							.or_insert_with(|| Value::Object(Map::new()));
						if !entry.is_object() {
							*entry = Value::Object(Map::new());
						}
						if let Value::Object(nested) = entry {
							write_selections(nested, &field.selections, variables, object);
						}
					}
					Value::Array(items) => {
						let written = items
							.iter()
							.map(|item| match item {
								Value::Object(object) => {
									let mut nested = Map::new();
									write_selections(
										&mut nested,
										&field.selections,
										variables,
										object,
									);
									Value::Object(nested)
								}
								other => other.clone(),
							})
							.collect();
						record.insert(key, Value::Array(written));
					}
					other => {
						record.insert(key, other.clone());
					}
				}
			}
			Selection::Condition(condition) => {
				if condition.passes(variables) {
					write_selections(record, &condition.selections, variables, data);
				}
			}
		}
	}
}
