#![forbid(unsafe_code)]
#![warn(
    unused,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    missing_docs
)]
#![allow(clippy::module_name_repetitions)]

//! Page controllers, views and components for the Storewatch dashboard.
//!
//! Layout: `vdom.rs` (UI tree + HTML rendering), `route.rs` (routes and
//! parameters), `schedule.rs` (repeating timers), `components/` (line graph,
//! detail tables), `pages/` (controllers and views), `layout.rs` (document shell).

pub mod components;
pub mod layout;
pub mod pages;
pub mod route;
pub mod schedule;
pub mod vdom;

pub use components::{LineGraph, all_details, store_details};
pub use layout::document;
pub use pages::{
    DEFAULT_REFRESH_INTERVAL, NodePage, Page, PageContext, QueryHolder, STORE_CHARTS, StorePage,
    StoresPage, mount,
};
pub use route::{Route, RouteParams, parse_id};
pub use schedule::{ManualScheduler, Scheduler, TimerHandle, TimerTask, TokioScheduler};
pub use vdom::{Element, Node};
