//! Smaily Connect Plugin Entry Point

use std::sync::Arc;

use chrono::Duration;
use tokio::sync::RwLock;

use crate::handlers::SettingsHandler;
use crate::models::{CartItem, CustomerId, SiteConfig};
use crate::services::cart::CartUpdate;
use crate::services::cron::ReminderSweepReport;
use crate::services::cypher::CypherError;
use crate::services::sync::SyncReport;
use crate::services::{
    CartService, CatalogService, CronService, Cypher, CypherKeys, OptionsService, SmailyClient,
    SubscriberSyncService, UserService,
};

/// Host integrations resolved at startup. An absent capability is a
/// configuration state, not a runtime lookup.
#[derive(Debug, Clone, Copy, Default)]
pub struct Capabilities {
    /// Store integration providing carts, orders and products
    pub woocommerce: bool,
}

/// Context of the request a hook fired in.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    /// Logged-in customer, if any
    pub customer: Option<CustomerId>,
    /// Request targets an admin screen
    pub admin_screen: bool,
    /// Request is one of the well-known browser asset probes
    pub asset_request: bool,
}

impl RequestContext {
    /// Frontend request from a logged-in customer.
    pub fn for_customer(customer_id: CustomerId) -> Self {
        Self {
            customer: Some(customer_id),
            ..Self::default()
        }
    }

    /// Frontend request without a logged-in user.
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn admin(mut self) -> Self {
        self.admin_screen = true;
        self
    }

    pub fn asset(mut self) -> Self {
        self.asset_request = true;
        self
    }
}

/// Browser probes that fire page-load hooks without being a page view.
pub fn is_asset_request(path: &str) -> bool {
    matches!(
        path,
        "/favicon.ico" | "/apple-touch-icon.png" | "/apple-touch-icon-precomposed.png"
    )
}

/// The scheduled jobs the plugin registers with the host scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduledJob {
    /// Age open carts into abandoned status
    AbandonedCartStatus,
    /// Dispatch reminders for abandoned carts
    AbandonedCartEmail,
    /// Reconcile subscribers with the remote list
    SubscriberSync,
}

impl ScheduledJob {
    /// Cadence the job runs at.
    pub fn interval(&self) -> Duration {
        match self {
            Self::AbandonedCartStatus | Self::AbandonedCartEmail => Duration::minutes(15),
            Self::SubscriberSync => Duration::days(1),
        }
    }

    pub fn all() -> [Self; 3] {
        [
            Self::AbandonedCartStatus,
            Self::AbandonedCartEmail,
            Self::SubscriberSync,
        ]
    }
}

/// The closed set of host events the plugin reacts to.
#[derive(Debug, Clone)]
pub enum HookEvent {
    /// Cart contents changed during a request
    CartUpdated {
        context: RequestContext,
        items: Vec<CartItem>,
    },
    /// Customer completed checkout
    OrderPlaced { customer_id: CustomerId },
    /// Scheduler invoked one of the registered jobs
    ScheduledTick(ScheduledJob),
}

/// What a dispatched event did.
#[derive(Debug)]
pub enum HookOutcome {
    /// Cart table write result
    CartChange(CartUpdate),
    /// Checkout removed the record (false when none existed)
    CartRemoved(bool),
    /// Carts flipped to abandoned
    AbandonSweep(usize),
    /// Reminder dispatch results
    ReminderSweep(ReminderSweepReport),
    /// Subscriber synchronization results
    SubscriberSync(SyncReport),
    /// Event did not apply in this context
    Skipped,
}

/// Smaily Connect Plugin
pub struct SmailyConnectPlugin {
    capabilities: Capabilities,
    /// Options repository
    options: Arc<OptionsService>,
    /// Cart table service
    carts: Arc<CartService>,
    /// Store user service
    users: Arc<UserService>,
    /// Product catalog service
    catalog: Arc<CatalogService>,
    /// Cart lifecycle job runner
    cron: CronService,
    /// Subscriber synchronization job runner
    sync: SubscriberSyncService,
    /// Settings handler
    settings_handler: SettingsHandler,
    /// Jobs currently registered with the host scheduler
    scheduled: RwLock<Vec<ScheduledJob>>,
}

impl SmailyConnectPlugin {
    /// Create a new plugin instance. Fails when the host's auth keys
    /// are unusable for credential encryption.
    pub fn new(
        keys: &CypherKeys,
        site: SiteConfig,
        capabilities: Capabilities,
    ) -> Result<Self, CypherError> {
        let cypher = Cypher::new(keys)?;
        let options = Arc::new(OptionsService::new(cypher, site));
        let carts = Arc::new(CartService::new());
        let users = Arc::new(UserService::new());
        let catalog = Arc::new(CatalogService::new());

        let api: Arc<dyn crate::services::SmailyApi> =
            Arc::new(SmailyClient::from_options(Arc::clone(&options)));

        let cron = CronService::new(
            Arc::clone(&options),
            Arc::clone(&carts),
            Arc::clone(&users),
            Arc::clone(&catalog),
            Arc::clone(&api),
        );
        let sync = SubscriberSyncService::new(
            Arc::clone(&options),
            Arc::clone(&users),
            Arc::clone(&api),
        );
        let settings_handler = SettingsHandler::new(Arc::clone(&options));

        Ok(Self {
            capabilities,
            options,
            carts,
            users,
            catalog,
            cron,
            sync,
            settings_handler,
            scheduled: RwLock::new(Vec::new()),
        })
    }

    /// Register scheduled jobs. Cart jobs are only registered when the
    /// store capability is present.
    pub async fn activate(&self) {
        let mut scheduled = self.scheduled.write().await;
        scheduled.clear();

        for job in ScheduledJob::all() {
            let needs_store = matches!(
                job,
                ScheduledJob::AbandonedCartStatus | ScheduledJob::AbandonedCartEmail
            );
            if needs_store && !self.capabilities.woocommerce {
                continue;
            }
            scheduled.push(job);
        }

        tracing::info!(jobs = scheduled.len(), "plugin activated");
    }

    /// Unregister every scheduled job. Stored options are kept.
    pub async fn deactivate(&self) {
        let mut scheduled = self.scheduled.write().await;
        scheduled.clear();
        tracing::info!("plugin deactivated");
    }

    /// Remove every stored option. Deactivates first.
    pub async fn uninstall(&self) {
        self.deactivate().await;
        self.options.delete_all().await;
    }

    /// Jobs currently registered with the scheduler.
    pub async fn scheduled_jobs(&self) -> Vec<ScheduledJob> {
        let scheduled = self.scheduled.read().await;
        scheduled.clone()
    }

    /// Dispatch a host event to the responsible service.
    pub async fn handle_event(&self, event: HookEvent) -> HookOutcome {
        match event {
            HookEvent::CartUpdated { context, items } => {
                if !self.capabilities.woocommerce {
                    return HookOutcome::Skipped;
                }
                if context.admin_screen || context.asset_request {
                    return HookOutcome::Skipped;
                }
                let Some(customer_id) = context.customer else {
                    return HookOutcome::Skipped;
                };

                HookOutcome::CartChange(self.carts.upsert_cart(customer_id, items).await)
            }
            HookEvent::OrderPlaced { customer_id } => {
                if !self.capabilities.woocommerce {
                    return HookOutcome::Skipped;
                }

                HookOutcome::CartRemoved(self.carts.delete_cart(customer_id).await)
            }
            HookEvent::ScheduledTick(job) => match job {
                ScheduledJob::AbandonedCartStatus => {
                    HookOutcome::AbandonSweep(self.cron.abandon_sweep().await)
                }
                ScheduledJob::AbandonedCartEmail => {
                    HookOutcome::ReminderSweep(self.cron.reminder_sweep().await)
                }
                ScheduledJob::SubscriberSync => {
                    HookOutcome::SubscriberSync(self.sync.sync_subscribers().await)
                }
            },
        }
    }

    /// Get plugin name
    pub fn name(&self) -> &'static str {
        "Smaily Connect"
    }

    /// Get plugin version
    pub fn version(&self) -> &'static str {
        env!("CARGO_PKG_VERSION")
    }

    /// Get plugin description
    pub fn description(&self) -> &'static str {
        "Smaily email marketing integration for RustPress"
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    // Service accessors
    pub fn options(&self) -> &Arc<OptionsService> {
        &self.options
    }

    pub fn carts(&self) -> &Arc<CartService> {
        &self.carts
    }

    pub fn users(&self) -> &Arc<UserService> {
        &self.users
    }

    pub fn catalog(&self) -> &Arc<CatalogService> {
        &self.catalog
    }

    pub fn cron(&self) -> &CronService {
        &self.cron
    }

    pub fn sync(&self) -> &SubscriberSyncService {
        &self.sync
    }

    // Handler accessors
    pub fn settings_handler(&self) -> &SettingsHandler {
        &self.settings_handler
    }
}

/// Plugin metadata for registration
pub fn plugin_info() -> PluginInfo {
    PluginInfo {
        name: "Smaily Connect",
        version: env!("CARGO_PKG_VERSION"),
        description: "Smaily email marketing integration for RustPress",
        author: "RustPress Team",
        homepage: "https://rustpress.dev/plugins/smaily-connect",
        license: "MIT",
        dependencies: vec![],
        hooks: vec![
            "cart.updated",
            "order.placed",
            "cron.abandoned_cart_status",
            "cron.abandoned_cart_email",
            "cron.subscriber_sync",
        ],
        routes: vec![
            "/admin/smaily-connect",
            "/admin/smaily-connect/credentials",
            "/admin/smaily-connect/abandoned-cart",
            "/admin/smaily-connect/subscriber-sync",
            "/api/smaily/configuration",
            "/api/smaily/autoresponders",
        ],
    }
}

/// Plugin information
#[derive(Debug)]
pub struct PluginInfo {
    pub name: &'static str,
    pub version: &'static str,
    pub description: &'static str,
    pub author: &'static str,
    pub homepage: &'static str,
    pub license: &'static str,
    pub dependencies: Vec<&'static str>,
    pub hooks: Vec<&'static str>,
    pub routes: Vec<&'static str>,
}
