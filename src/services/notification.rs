use std::sync::Arc;

use tokio::sync::mpsc;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LowStockAlert {
    pub product_id: Uuid,
    pub name: String,
    pub stock_remaining: i32,
    pub threshold: i32,
}

/// Fire-and-forget sink for low-stock alerts. Must not block.
pub trait LowStockNotifier: Send + Sync {
    fn notify_low_stock(&self, alert: LowStockAlert);
}

impl<T: LowStockNotifier + ?Sized> LowStockNotifier for Arc<T> {
    fn notify_low_stock(&self, alert: LowStockAlert) {
        (**self).notify_low_stock(alert)
    }
}

pub type SharedNotifier = Arc<dyn LowStockNotifier>;

/// Drops alerts; for contexts with nobody to tell.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

impl LowStockNotifier for NoopNotifier {
    fn notify_low_stock(&self, _alert: LowStockAlert) {}
}

#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    tx: mpsc::UnboundedSender<LowStockAlert>,
}

impl LowStockNotifier for ChannelNotifier {
    fn notify_low_stock(&self, alert: LowStockAlert) {
        if let Err(err) = self.tx.send(alert) {
            tracing::warn!(product_id = %err.0.product_id, "low stock worker is gone, alert dropped");
        }
    }
}

/// Spawns the worker that drains low-stock alerts and reports them.
pub fn spawn_low_stock_worker(admin_email: Option<String>) -> ChannelNotifier {
    let (tx, mut rx) = mpsc::unbounded_channel::<LowStockAlert>();
    tokio::spawn(async move {
        let recipient = admin_email.as_deref().unwrap_or("-");
        while let Some(alert) = rx.recv().await {
            tracing::warn!(
                product_id = %alert.product_id,
                product = %alert.name,
                stock_remaining = alert.stock_remaining,
                threshold = alert.threshold,
                recipient,
                "low stock"
            );
        }
        tracing::debug!("low stock worker stopped");
    });
    ChannelNotifier { tx }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn channel_notifier_never_blocks_after_worker_exit() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        let notifier = ChannelNotifier { tx };
        notifier.notify_low_stock(LowStockAlert {
            product_id: Uuid::new_v4(),
            name: "Mug".into(),
            stock_remaining: 1,
            threshold: 10,
        });
    }
}
