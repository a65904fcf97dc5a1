//! Change notification from tree nodes to whoever owns the tree.
//!
//! Nodes hold a [`ListenerRef`], a weak handle, so the tree never keeps its
//! owner alive and no reference cycle forms between a vault and its nodes.

use std::sync::{Arc, Weak};

/// Receives one `sync` call for every top-level mutation of a node.
pub trait GroupListener: Send + Sync {
    fn sync(&self);
}

/// Non-owning handle to a listener, shared by every node of a tree.
pub type ListenerRef = Weak<dyn GroupListener>;

/// Make a [`ListenerRef`] pointing at `listener`.
pub fn listener_ref<L: GroupListener + 'static>(listener: &Arc<L>) -> ListenerRef {
    let weak: Weak<L> = Arc::downgrade(listener);
    weak
}

/// Whether two optional handles point at the same listener.
pub fn same_listener(a: Option<&ListenerRef>, b: Option<&ListenerRef>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => Weak::ptr_eq(a, b),
        (None, None) => true,
        _ => false,
    }
}

/// Call the listener if it is set and still alive.
pub(crate) fn notify(listener: Option<&ListenerRef>) {
    if let Some(listener) = listener.and_then(Weak::upgrade) {
        listener.sync();
    }
}


#[cfg(test)]
mod tests {
    use super::testing::CountingListener;
    use super::*;

    #[test]
    fn test_notify_reaches_live_listener() {
        let listener = Arc::new(CountingListener::default());
        let handle = listener_ref(&listener);

        notify(Some(&handle));
        notify(Some(&handle));

        assert_eq!(listener.count(), 2);
    }

    #[test]
    fn test_notify_after_drop_is_noop() {
        let listener = Arc::new(CountingListener::default());
        let handle = listener_ref(&listener);
        drop(listener);

        notify(Some(&handle));
        notify(None);
    }

    #[test]
    fn test_listener_ref_from_concrete_type() {
        let listener: Arc<CountingListener> = Arc::new(CountingListener::default());
        let handle: ListenerRef = listener_ref(&listener);

        assert_eq!(handle.strong_count(), 1);
        if let Some(upgraded) = handle.upgrade() {
            upgraded.sync();
        }
        assert_eq!(listener.count(), 1);
    }

    #[test]
    fn test_same_listener() {
        let a = Arc::new(CountingListener::default());
        let b = Arc::new(CountingListener::default());
        let ha = listener_ref(&a);
        let hb = listener_ref(&b);

        assert!(same_listener(Some(&ha), Some(&ha.clone())));
        assert!(!same_listener(Some(&ha), Some(&hb)));
        assert!(!same_listener(Some(&ha), None));
        assert!(same_listener(None, None));
    }
}
