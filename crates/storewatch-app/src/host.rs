//! Page host: owns the mounted page controllers.
//!
//! # Design
//! - One controller per route. Viewers of different routes never remount each
//!   other's controller, so caches filled by a fire-and-forget refresh are there
//!   for the next render of the same route.
//! - Rendering a mounted route reuses its controller and its timer.
//! - An idle sweep unloads each controller once nobody has rendered its route
//!   for a while, so periodic refreshes never outlive their viewers.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use storewatch_ui::{Node, Page, PageContext, Route, mount};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval};
use tracing::{debug, info};

/// Title and body of a rendered page.
#[derive(Debug, Clone)]
pub struct RenderedPage {
    /// Document title.
    pub title: String,
    /// Page view.
    pub body: Node,
}

struct Mounted {
    page: Box<dyn Page>,
    last_render: Instant,
}

/// Mounts page controllers on demand and renders them.
pub struct PageHost {
    ctx: PageContext,
    mounted: Mutex<HashMap<Route, Mounted>>,
}

impl PageHost {
    /// Host with nothing mounted.
    #[must_use]
    pub fn new(ctx: PageContext) -> Self {
        Self {
            ctx,
            mounted: Mutex::new(HashMap::new()),
        }
    }

    /// Collaborators handed to every controller.
    #[must_use]
    pub const fn context(&self) -> &PageContext {
        &self.ctx
    }

    /// Render `route`, mounting its controller first when it is not mounted.
    pub fn render(&self, route: &Route) -> RenderedPage {
        let mut mounted = self.lock();
        let current = mounted.entry(route.clone()).or_insert_with(|| {
            self.ctx.metrics.inc_page_mount(route.page_name());
            debug!(route = %route, "mounting page");
            Mounted {
                page: mount(route, &self.ctx),
                last_render: Instant::now(),
            }
        });
        current.last_render = Instant::now();
        RenderedPage {
            title: current.page.title(),
            body: current.page.view(),
        }
    }

    /// Routes with a mounted controller, ordered by path.
    #[must_use]
    pub fn mounted_routes(&self) -> Vec<Route> {
        let mut routes: Vec<Route> = self.lock().keys().cloned().collect();
        routes.sort_by_key(Route::path);
        routes
    }

    /// Unload every mounted controller. Returns how many were mounted.
    pub fn unmount_all(&self) -> usize {
        let drained: Vec<Mounted> = self.lock().drain().map(|(_, current)| current).collect();
        let count = drained.len();
        for mut previous in drained {
            previous.page.unload();
            info!(route = %previous.page.route(), "page unmounted");
        }
        count
    }

    /// Unload each controller whose route has not rendered for `idle`.
    /// Returns how many were unloaded.
    pub fn unmount_idle(&self, idle: Duration) -> usize {
        let mut mounted = self.lock();
        let expired: Vec<Route> = mounted
            .iter()
            .filter(|(_, current)| current.last_render.elapsed() >= idle)
            .map(|(route, _)| route.clone())
            .collect();
        for route in &expired {
            if let Some(mut previous) = mounted.remove(route) {
                previous.page.unload();
                info!(route = %route, idle_secs = idle.as_secs(), "idle page unmounted");
            }
        }
        expired.len()
    }

    /// Periodically unload pages that have been idle for `idle`.
    pub fn spawn_idle_sweep(self: &Arc<Self>, idle: Duration) -> JoinHandle<()> {
        let host = Arc::clone(self);
        let period = (idle / 2).max(Duration::from_secs(1));
        tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                host.unmount_idle(idle);
            }
        })
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Route, Mounted>> {
        self.mounted.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for PageHost {
    fn drop(&mut self) {
        self.unmount_all();
    }
}
