use std::sync::Arc;

use crate::config::CheckoutSettings;
use crate::db::OrmConn;
use crate::services::checkout_service::CheckoutService;
use crate::services::notification::SharedNotifier;

#[derive(Clone)]
pub struct AppState {
    pub orm: OrmConn,
    pub checkout: Arc<CheckoutService>,
}

impl AppState {
    pub fn new(orm: OrmConn, settings: CheckoutSettings, notifier: SharedNotifier) -> Self {
        let checkout = Arc::new(CheckoutService::new(orm.clone(), settings, notifier));
        Self { orm, checkout }
    }

    pub fn settings(&self) -> &CheckoutSettings {
        self.checkout.settings()
    }
}
