//! # Reinhardt Relay Resolver
//!
//! Resolves the data of matched route trees through query subscriptions and
//! produces element trees for the view layer.
//!
//! ## Overview
//!
//! - [`Route`]: per-segment query, variables, fetch policy, cache config and
//!   rendering instructions
//! - [`QuerySubscription`]: the fetch lifecycle of one operation
//! - [`Resolver`]: reuses subscriptions across navigations and yields
//!   [`Resolution::Pending`] then [`Resolution::Settled`] element trees
//! - [`ReadyStateRenderer`]: keeps a mounted query element current
//! - [`null_data_props`]: `null` placeholders for a segment's data props
//!
//! ## Architecture
//!
//! ```text
//! RouteMatch ──▶ Resolver ──▶ route_variables ──▶ QuerySubscription (per segment)
//!                    │                                   │
//!                    │                                   ▼
//!                    │                              Environment
//!                    ▼
//!            Resolution::{Pending, Settled}(ElementTree)
//!                    │
//!                    ▼
//!           ReadyStateRenderer (live updates)
//! ```
//!
//! ## Logging
//!
//! The crate emits `tracing` events and installs no subscriber. Misconfigured
//! routes and shadowed props are reported at `warn` level; subscription
//! lifecycle and resolution phases at `debug` and `trace`.

pub mod element;
pub mod null_props;
pub mod renderer;
pub mod resolver;
pub mod route;
pub mod settings;
pub mod subscription;
pub mod variables;

// Re-exports
pub use element::{
	ComponentState, Element, ElementTree, Props, ReadyStateElement, RenderArgs, RenderFn,
	RenderStrategy, RouteElement, create_elements, render_element,
};
pub use null_props::null_data_props;
pub use renderer::{ReadyStateRenderer, RenderedElement};
pub use resolver::{Resolution, ResolveElements, Resolver};
pub use route::{
	Component, ComponentSource, Location, MatchedRoute, Params, Route, RouteMatch, SegmentMatch,
};
pub use settings::{ResolverSettings, SettingsError};
pub use subscription::{
	FetchFuture, ListenerId, QuerySubscription, ReadyState, RelayContext, Retry,
	WeakQuerySubscription,
};
