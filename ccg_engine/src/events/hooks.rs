use std::{future::Future, pin::Pin, sync::Arc};

use crate::events::{AnomalyEvent, Handler, HookSender, HookWorker, OrderPaidEvent, PaymentFailedEvent};

/// The publishing side of the registered hooks. An empty set (the default) publishes nothing.
#[derive(Default, Clone)]
pub struct EventProducers {
    pub order_paid_producer: Vec<HookSender<OrderPaidEvent>>,
    pub payment_failed_producer: Vec<HookSender<PaymentFailedEvent>>,
    pub anomaly_producer: Vec<HookSender<AnomalyEvent>>,
}

/// One worker per registered hook.
pub struct EventHandlers {
    order_paid: Option<HookWorker<OrderPaidEvent>>,
    payment_failed: Option<HookWorker<PaymentFailedEvent>>,
    anomaly: Option<HookWorker<AnomalyEvent>>,
}

impl EventHandlers {
    pub fn new(buffer_size: usize, hooks: EventHooks) -> Self {
        Self {
            order_paid: hooks.on_order_paid.map(|f| HookWorker::new("order paid", buffer_size, f)),
            payment_failed: hooks.on_payment_failed.map(|f| HookWorker::new("payment failed", buffer_size, f)),
            anomaly: hooks.on_anomaly.map(|f| HookWorker::new("anomaly", buffer_size, f)),
        }
    }

    pub fn producers(&self) -> EventProducers {
        EventProducers {
            order_paid_producer: self.order_paid.iter().map(HookWorker::sender).collect(),
            payment_failed_producer: self.payment_failed.iter().map(HookWorker::sender).collect(),
            anomaly_producer: self.anomaly.iter().map(HookWorker::sender).collect(),
        }
    }

    /// Spawns a task per registered hook. The tasks end once every producer has been dropped.
    pub async fn start_handlers(self) {
        if let Some(worker) = self.order_paid {
            tokio::spawn(worker.run());
        }
        if let Some(worker) = self.payment_failed {
            tokio::spawn(worker.run());
        }
        if let Some(worker) = self.anomaly {
            tokio::spawn(worker.run());
        }
    }
}

type HookFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

#[derive(Default, Clone)]
pub struct EventHooks {
    pub on_order_paid: Option<Handler<OrderPaidEvent>>,
    pub on_payment_failed: Option<Handler<PaymentFailedEvent>>,
    pub on_anomaly: Option<Handler<AnomalyEvent>>,
}

impl EventHooks {
    pub fn on_order_paid<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(OrderPaidEvent) -> HookFuture) + Send + Sync + 'static {
        self.on_order_paid = Some(Arc::new(f));
        self
    }

    pub fn on_payment_failed<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(PaymentFailedEvent) -> HookFuture) + Send + Sync + 'static {
        self.on_payment_failed = Some(Arc::new(f));
        self
    }

    pub fn on_anomaly<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(AnomalyEvent) -> HookFuture) + Send + Sync + 'static {
        self.on_anomaly = Some(Arc::new(f));
        self
    }
}
