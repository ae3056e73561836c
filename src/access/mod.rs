//! Route and menu authorization for the dashboard.
//!
//! Pure pieces (`filter_menu`, `authorize`, route matching) sit in their own
//! sub-modules; `Gate` is the boundary that wires them to the session resolver
//! and the router.

mod navigator;
mod menu;
mod routes;
mod authorizer;
mod gate;

pub use navigator::{Navigator, HistoryNavigator, NoopNavigator};
pub use menu::{NavEntry, MenuPolicy, RenameRule, nav_data, policy_for, filter_menu, active_entry};
pub use routes::{RouteSpec, RouteKind, RouteMatch, RouteTable, dashboard_specs, dashboard_routes, normalize_request_path};
pub use authorizer::{Decision, Redirect, authorize, authorize_chain, decide_route, decide_unmatched, check_path, menu_for};
pub use gate::{Gate, GuardOutcome, PageContext};
