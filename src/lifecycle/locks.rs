use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::domain::order::OrderId;

type LockMap = HashMap<OrderId, Arc<Mutex<()>>>;

/// Per-order async locks. Operations on one order are serialized; operations
/// on different orders never wait on each other beyond the brief map lookup.
///
/// An order's entry lives only while someone holds or waits for its lock.
#[derive(Default)]
pub struct OrderLocks {
    locks: Arc<StdMutex<LockMap>>,
}

/// Held for the duration of one order's critical section.
pub struct OrderLockGuard {
    order_id: OrderId,
    lock: Arc<Mutex<()>>,
    locks: Arc<StdMutex<LockMap>>,
    _held: OwnedMutexGuard<()>,
}

impl OrderLocks {
    pub async fn acquire(&self, order_id: OrderId) -> OrderLockGuard {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(locks.entry(order_id).or_default())
        };
        let held = Arc::clone(&lock).lock_owned().await;

        OrderLockGuard {
            order_id,
            lock,
            locks: Arc::clone(&self.locks),
            _held: held,
        }
    }

    pub fn len(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Drop for OrderLockGuard {
    fn drop(&mut self) {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);

        // Map, `self.lock` and the held guard account for three references.
        // Anything above that is a waiter that still needs this entry.
        let idle = locks
            .get(&self.order_id)
            .is_some_and(|entry| Arc::ptr_eq(entry, &self.lock))
            && Arc::strong_count(&self.lock) <= 3;

        if idle {
            locks.remove(&self.order_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_same_order_is_serialized() {
        let locks = Arc::new(OrderLocks::default());
        let order_id = OrderId::new();

        let guard = locks.acquire(order_id).await;

        let contender = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _guard = locks.acquire(order_id).await;
            })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!contender.is_finished());

        drop(guard);
        contender.await.unwrap();
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn test_other_orders_do_not_block() {
        let locks = OrderLocks::default();
        let _first = locks.acquire(OrderId::new()).await;
        let _second = locks.acquire(OrderId::new()).await;

        assert_eq!(locks.len(), 2);
    }

    #[tokio::test]
    async fn test_entry_dropped_with_last_guard() {
        let locks = OrderLocks::default();

        for _ in 0..100 {
            drop(locks.acquire(OrderId::new()).await);
        }

        assert!(locks.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_entry_kept_while_a_waiter_queues() {
        let locks = Arc::new(OrderLocks::default());
        let order_id = OrderId::new();

        let first = locks.acquire(order_id).await;
        let waiter = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _guard = locks.acquire(order_id).await;
                tokio::time::sleep(Duration::from_millis(10)).await;
            })
        };
        tokio::time::sleep(Duration::from_millis(1)).await;

        drop(first);
        assert_eq!(locks.len(), 1);

        // A third caller must still queue behind the waiter, not get a fresh lock.
        let third = locks.acquire(order_id).await;
        waiter.await.unwrap();
        drop(third);

        assert!(locks.is_empty());
    }
}
