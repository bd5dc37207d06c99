use command_bridge::CommandBridge;
use once_cell::sync::Lazy;
use serde::Serialize;
use tokio::sync::OnceCell;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StartupRoute {
    Library,
    Onboarding,
}

/// Decides once whether the app opens on the library or on onboarding.
#[derive(Debug, Default)]
pub struct StartupGuard {
    route: OnceCell<StartupRoute>,
}

static PROCESS_GUARD: Lazy<StartupGuard> = Lazy::new(StartupGuard::new);

/// Guard shared by the whole process.
pub fn process_guard() -> &'static StartupGuard {
    &PROCESS_GUARD
}

impl StartupGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(&self) -> Option<StartupRoute> {
        self.route.get().copied()
    }

    /// Asks the backend for an active user on first call; later calls return
    /// the cached route. A failed check routes to onboarding.
    pub async fn resolve(&self, bridge: &dyn CommandBridge) -> StartupRoute {
        *self
            .route
            .get_or_init(|| async {
                let route = match bridge.check_if_there_is_active_user_status().await {
                    Ok(true) => StartupRoute::Library,
                    Ok(false) => StartupRoute::Onboarding,
                    Err(err) => {
                        warn!("active user check failed, assuming none: {err}");
                        StartupRoute::Onboarding
                    }
                };
                info!(?route, "resolved startup route");
                route
            })
            .await
    }
}
