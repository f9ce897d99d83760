//! Resolver module.
//!
//! This module provides routes, query subscriptions, the resolver and the
//! element trees it produces.
//!
//! # Examples
//!
//! ```rust,no_run
//! use reinhardt_relay::resolver::{Resolver, Route, RouteMatch};
//! ```

pub use reinhardt_relay_resolver::*;
