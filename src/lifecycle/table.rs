use prometheus::IntGauge;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::AbortHandle;
use tokio::time::Instant;

use crate::domain::order::{OrderId, OrderStatus};

// ============================================================================
// Scheduled Transition Table
// ============================================================================
//
// Registry of still-pending timer handles per order. Each timer is a tokio
// task sleeping until its deadline, then running the fire callback. A timer
// removes its own handle once it has fired; an order's entry disappears when
// its last handle is gone or when the order is cancelled.
//
// Cancelling aborts the tasks. A task that is already running its callback may
// still complete; callers rely on the terminal-state guard, not on the abort.
//
// ============================================================================

struct ScheduledTransition {
    target: OrderStatus,
    handle: AbortHandle,
}

#[derive(Default)]
pub struct TransitionTable {
    entries: Mutex<HashMap<OrderId, Vec<ScheduledTransition>>>,
    pending_gauge: Option<IntGauge>,
}

impl TransitionTable {
    pub fn new(pending_gauge: Option<IntGauge>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            pending_gauge,
        }
    }

    /// Spawn one timer per `(delay, target)` pair, each due at `origin + delay`,
    /// and register their handles under `order_id`.
    ///
    /// The table lock is held while spawning, so a timer that fires
    /// immediately still finds its handle registered. A deadline that does not
    /// fit in an `Instant` is logged and not scheduled.
    pub async fn schedule<F, Fut>(
        self: &Arc<Self>,
        order_id: OrderId,
        origin: Instant,
        plan: &[(Duration, OrderStatus)],
        fire: F,
    ) where
        F: Fn(OrderStatus) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let fire = Arc::new(fire);
        let mut entries = self.entries.lock().await;

        let transitions = entries.entry(order_id).or_default();
        for &(delay, target) in plan {
            let Some(deadline) = origin.checked_add(delay) else {
                tracing::error!(
                    order_id = %order_id,
                    target = %target,
                    delay_secs = delay.as_secs(),
                    "Transition delay out of range, not scheduling"
                );
                continue;
            };

            let fire = Arc::clone(&fire);
            let table = Arc::clone(self);

            let task = tokio::spawn(async move {
                tokio::time::sleep_until(deadline).await;
                fire(target).await;
                table.complete(order_id, target).await;
            });

            transitions.push(ScheduledTransition {
                target,
                handle: task.abort_handle(),
            });
        }

        let timers = transitions.len();
        if timers == 0 {
            entries.remove(&order_id);
        }

        tracing::debug!(order_id = %order_id, timers, "Scheduled status transitions");

        self.refresh_gauge(&entries);
    }

    /// Drop the handle of a timer that has fired.
    async fn complete(&self, order_id: OrderId, target: OrderStatus) {
        let mut entries = self.entries.lock().await;

        if let Some(transitions) = entries.get_mut(&order_id) {
            transitions.retain(|t| t.target != target);
            if transitions.is_empty() {
                entries.remove(&order_id);
            }
        }

        self.refresh_gauge(&entries);
    }

    /// Remove the order's entry and abort every pending timer in it.
    /// Returns the number of handles aborted.
    pub async fn cancel(&self, order_id: OrderId) -> usize {
        let mut entries = self.entries.lock().await;

        let aborted = match entries.remove(&order_id) {
            Some(transitions) => {
                for transition in &transitions {
                    transition.handle.abort();
                }
                transitions.len()
            }
            None => 0,
        };

        self.refresh_gauge(&entries);
        aborted
    }

    /// Abort every pending timer of every order.
    pub async fn cancel_all(&self) -> usize {
        let mut entries = self.entries.lock().await;

        let mut aborted = 0;
        for (_, transitions) in entries.drain() {
            for transition in transitions {
                transition.handle.abort();
                aborted += 1;
            }
        }

        self.refresh_gauge(&entries);
        aborted
    }

    pub async fn pending(&self, order_id: OrderId) -> usize {
        self.entries
            .lock()
            .await
            .get(&order_id)
            .map_or(0, |transitions| transitions.len())
    }

    /// Orders that still have at least one pending timer.
    pub async fn active_orders(&self) -> usize {
        self.entries.lock().await.len()
    }

    fn refresh_gauge(&self, entries: &HashMap<OrderId, Vec<ScheduledTransition>>) {
        if let Some(gauge) = &self.pending_gauge {
            let total: usize = entries.values().map(Vec::len).sum();
            gauge.set(total as i64);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;

    type Fired = Arc<StdMutex<Vec<OrderStatus>>>;

    const PLAN: [(Duration, OrderStatus); 3] = [
        (Duration::from_secs(10), OrderStatus::Cooking),
        (Duration::from_secs(20), OrderStatus::OutForDelivery),
        (Duration::from_secs(30), OrderStatus::Delivered),
    ];

    async fn schedule_recording(table: &Arc<TransitionTable>, order_id: OrderId) -> Fired {
        let fired: Fired = Arc::default();
        let sink = fired.clone();

        table
            .schedule(order_id, Instant::now(), &PLAN, move |target| {
                let sink = sink.clone();
                async move {
                    sink.lock().unwrap().push(target);
                }
            })
            .await;

        fired
    }

    #[tokio::test(start_paused = true)]
    async fn test_timers_fire_in_order_and_clear_entry() {
        let table = Arc::new(TransitionTable::default());
        let order_id = OrderId::new();
        let fired = schedule_recording(&table, order_id).await;

        assert_eq!(table.pending(order_id).await, 3);

        tokio::time::sleep(Duration::from_secs(15)).await;
        assert_eq!(*fired.lock().unwrap(), vec![OrderStatus::Cooking]);
        assert_eq!(table.pending(order_id).await, 2);

        tokio::time::sleep(Duration::from_secs(20)).await;
        assert_eq!(
            *fired.lock().unwrap(),
            vec![
                OrderStatus::Cooking,
                OrderStatus::OutForDelivery,
                OrderStatus::Delivered
            ]
        );
        assert_eq!(table.pending(order_id).await, 0);
        assert_eq!(table.active_orders().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_remaining_timers() {
        let table = Arc::new(TransitionTable::default());
        let order_id = OrderId::new();
        let fired = schedule_recording(&table, order_id).await;

        tokio::time::sleep(Duration::from_secs(15)).await;
        assert_eq!(table.cancel(order_id).await, 2);
        assert_eq!(table.cancel(order_id).await, 0);

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(*fired.lock().unwrap(), vec![OrderStatus::Cooking]);
        assert_eq!(table.active_orders().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_orders_do_not_share_timer_sets() {
        let gauge = IntGauge::new("test_pending_timers", "pending").unwrap();
        let table = Arc::new(TransitionTable::new(Some(gauge.clone())));
        let first = OrderId::new();
        let second = OrderId::new();

        let first_fired = schedule_recording(&table, first).await;
        let second_fired = schedule_recording(&table, second).await;
        assert_eq!(gauge.get(), 6);

        assert_eq!(table.cancel(first).await, 3);
        assert_eq!(gauge.get(), 3);

        tokio::time::sleep(Duration::from_secs(31)).await;
        assert!(first_fired.lock().unwrap().is_empty());
        assert_eq!(second_fired.lock().unwrap().len(), 3);
        assert_eq!(gauge.get(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_out_of_range_delay_is_not_scheduled() {
        let table = Arc::new(TransitionTable::default());
        let order_id = OrderId::new();
        let fired: Fired = Arc::default();
        let sink = fired.clone();

        let plan = [
            (Duration::from_secs(10), OrderStatus::Cooking),
            (Duration::MAX, OrderStatus::Delivered),
        ];
        table
            .schedule(order_id, Instant::now(), &plan, move |target| {
                let sink = sink.clone();
                async move {
                    sink.lock().unwrap().push(target);
                }
            })
            .await;
        assert_eq!(table.pending(order_id).await, 1);

        tokio::time::sleep(Duration::from_secs(15)).await;
        assert_eq!(*fired.lock().unwrap(), vec![OrderStatus::Cooking]);
        assert_eq!(table.active_orders().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_all() {
        let table = Arc::new(TransitionTable::default());
        let fired = schedule_recording(&table, OrderId::new()).await;
        schedule_recording(&table, OrderId::new()).await;

        assert_eq!(table.cancel_all().await, 6);
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert!(fired.lock().unwrap().is_empty());
    }
}
