//! 类型化键值存储（带按键变更监听）
//!
//! 单线程、同步、可重入：所有方法只需 `&self`，监听器回调期间不持有内部借用，
//! 因此回调内部可以再次调用同一存储的 `set`。

use crate::services::codec::StoredValue;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// 变更监听器，参数为 `(key, new_value)`
///
/// 以 `Rc` 指针身份区分监听器：同一个 `Rc` 重复注册会被调用多次，
/// 移除时只移除第一个相同实例。
pub type Listener<T> = Rc<dyn Fn(&str, &T)>;

/// 单一值类型的内存存储
pub struct TypedStore<T: StoredValue> {
    values: RefCell<HashMap<String, T>>,
    listeners: RefCell<HashMap<String, Vec<Listener<T>>>>,
}

impl<T: StoredValue> TypedStore<T> {
    pub fn new() -> Self {
        Self {
            values: RefCell::new(HashMap::new()),
            listeners: RefCell::new(HashMap::new()),
        }
    }

    /// 读取值，不存在时返回 `default`
    pub fn get(&self, key: &str, default: T) -> T {
        self.values.borrow().get(key).cloned().unwrap_or(default)
    }

    /// 写入值
    ///
    /// 值与当前值相同（见 [`StoredValue::same_value`]）时不做任何事；否则更新并按注册顺序通知该键的监听器。
    pub fn set(&self, key: &str, value: T) {
        {
            let mut values = self.values.borrow_mut();
            match values.get_mut(key) {
                Some(current) if current.same_value(&value) => return,
                Some(current) => *current = value.clone(),
                None => {
                    values.insert(key.to_string(), value.clone());
                }
            }
        }

        // 快照后释放借用，回调可重入 set / add_change_listener
        let snapshot: Vec<Listener<T>> = match self.listeners.borrow().get(key) {
            Some(list) => list.clone(),
            None => return,
        };
        for listener in snapshot {
            listener(key, &value);
        }
    }

    /// 注册监听器（不会立即触发）
    pub fn add_change_listener(&self, key: &str, callback: Listener<T>) {
        self.listeners
            .borrow_mut()
            .entry(key.to_string())
            .or_default()
            .push(callback);
    }

    /// 移除第一个相同实例的监听器；键或监听器不存在时无操作
    pub fn remove_change_listener(&self, key: &str, callback: &Listener<T>) {
        let mut listeners = self.listeners.borrow_mut();
        if let Some(list) = listeners.get_mut(key) {
            if let Some(pos) = list.iter().position(|l| same_listener(l, callback)) {
                list.remove(pos);
            }
        }
    }

    /// 某个键上的监听器数量
    pub fn listener_count(&self, key: &str) -> usize {
        self.listeners.borrow().get(key).map_or(0, Vec::len)
    }

    /// 清空所有值和所有监听器
    ///
    /// 之后重新写入的值不会再通知旧监听器，调用方需要重新注册。
    pub fn clear(&self) {
        self.values.borrow_mut().clear();
        self.listeners.borrow_mut().clear();
    }

    /// 只清空值，保留监听器
    pub fn clear_values(&self) {
        self.values.borrow_mut().clear();
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.borrow().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.values.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.borrow().is_empty()
    }

    /// 所有条目的快照（按键排序，保证落盘内容稳定）
    pub fn entries(&self) -> Vec<(String, T)> {
        let mut entries: Vec<(String, T)> = self
            .values
            .borrow()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }

    /// 以调试日志输出所有条目
    pub fn dump(&self) {
        for (key, value) in self.entries() {
            tracing::debug!("{}: {:?} ({})", key, value, T::TYPE_NAME);
        }
    }
}

impl<T: StoredValue> Default for TypedStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// 只比较数据指针（忽略 vtable）
fn same_listener<T>(a: &Listener<T>, b: &Listener<T>) -> bool {
    std::ptr::eq(
        Rc::as_ptr(a) as *const (),
        Rc::as_ptr(b) as *const (),
    )
}
