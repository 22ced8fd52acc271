use std::collections::VecDeque;

/// Moves `key` to the back of the order queue, marking it most recently used.
///
/// Keys that are not in the queue are left alone. O(n) in the queue length.
///
/// # Examples
///
/// ```
/// use std::collections::VecDeque;
/// use memparams_core::utils::move_key_to_end;
///
/// let mut order = VecDeque::from(vec!["a", "b", "c"]);
/// move_key_to_end(&mut order, &"a");
/// assert_eq!(order, VecDeque::from(vec!["b", "c", "a"]));
/// ```
pub fn move_key_to_end<K: PartialEq>(order: &mut VecDeque<K>, key: &K) {
    if let Some(pos) = order.iter().position(|k| k == key) {
        if let Some(k) = order.remove(pos) {
            order.push_back(k);
        }
    }
}

/// Records an insertion of `key`: any previous position is dropped and the key
/// is appended at the back.
pub fn touch_inserted<K: PartialEq>(order: &mut VecDeque<K>, key: K) {
    if let Some(pos) = order.iter().position(|k| *k == key) {
        order.remove(pos);
    }
    order.push_back(key);
}

/// Pops keys from the front of the queue until at most `limit` remain,
/// returning them in eviction order.
pub fn drain_over_limit<K>(order: &mut VecDeque<K>, limit: usize) -> Vec<K> {
    let excess = order.len().saturating_sub(limit);
    order.drain(..excess).collect()
}
