//! 生命周期事件（保存 / 载入 / 清空）
//!
//! 同步投递，按订阅顺序调用；订阅返回句柄，凭句柄退订。

use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// 订阅句柄
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Callback = Rc<dyn Fn()>;

/// 无负载事件的订阅中心
pub struct EventHub {
    name: &'static str,
    next_id: Cell<u64>,
    subscribers: RefCell<Vec<(SubscriptionId, Callback)>>,
}

impl EventHub {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            next_id: Cell::new(0),
            subscribers: RefCell::new(Vec::new()),
        }
    }

    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn() + 'static,
    {
        let id = SubscriptionId(self.next_id.get());
        self.next_id.set(self.next_id.get() + 1);
        self.subscribers
            .borrow_mut()
            .push((id, Rc::new(callback)));
        id
    }

    /// 退订；句柄不存在时返回 `false`
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.subscribers.borrow_mut();
        match subscribers.iter().position(|(sid, _)| *sid == id) {
            Some(pos) => {
                subscribers.remove(pos);
                true
            }
            None => false,
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.borrow().len()
    }

    /// 同步通知所有订阅者
    pub fn emit(&self) {
        let snapshot: Vec<Callback> = self
            .subscribers
            .borrow()
            .iter()
            .map(|(_, cb)| Rc::clone(cb))
            .collect();
        tracing::trace!(event = self.name, subscribers = snapshot.len(), "触发事件");
        for callback in snapshot {
            callback();
        }
    }
}
