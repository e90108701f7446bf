//! Gesture listener registry, routing and focus
//!
//! Listeners are offered an event in descending z-index, ties broken by
//! registration order. Routing rules:
//!
//! - up-type events (Up, Cancelled) are offered to every listener so drag
//!   state can reset
//! - other events only reach listeners whose last-known bounds contain the
//!   gesture's start location, or the focused listener
//! - input-transparent listeners only ever see up-type events, and only
//!   while focused
//!
//! The first listener returning `Some(Consumed)` ends propagation. On Up the
//! consumer (or nobody) becomes the focused listener. Listeners reporting
//! `is_disposed` are unregistered before routing.

use std::cmp::Reverse;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use ember_core::{GestureEvent, GestureKind, GestureListener, NodeId};
use ember_platform::InputMethod;
use rustc_hash::FxHashMap;
use slotmap::{new_key_type, SlotMap};

use crate::deferred::panic_message;

new_key_type! {
    /// Handle to a registered gesture listener
    pub struct ListenerKey;
}

struct Registration {
    node: NodeId,
    listener: Arc<dyn GestureListener>,
    seq: u64,
    registered_at: Instant,
}

#[derive(Default)]
struct Listeners {
    arena: SlotMap<ListenerKey, Registration>,
    by_node: FxHashMap<NodeId, ListenerKey>,
    next_seq: u64,
    focused: Option<NodeId>,
}

/// Result of routing one event
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DispatchOutcome {
    /// Listener that consumed the event
    pub consumer: Option<NodeId>,
    /// Listeners the event was offered to
    pub offered: usize,
}

/// Per-root gesture router
pub struct GestureDispatcher {
    listeners: Mutex<Listeners>,
    input_method: Arc<dyn InputMethod>,
}

impl GestureDispatcher {
    pub fn new(input_method: Arc<dyn InputMethod>) -> Self {
        Self {
            listeners: Mutex::new(Listeners::default()),
            input_method,
        }
    }

    /// Register a listener; registering the same node again keeps its
    /// original ordering slot
    pub fn register(&self, listener: Arc<dyn GestureListener>) -> ListenerKey {
        let node = listener.listener_id();
        let mut listeners = self.listeners.lock().unwrap();
        let existing = listeners.by_node.get(&node).copied();
        if let Some(key) = existing {
            if let Some(registration) = listeners.arena.get_mut(key) {
                registration.listener = listener;
            }
            return key;
        }
        let seq = listeners.next_seq;
        listeners.next_seq += 1;
        let key = listeners.arena.insert(Registration {
            node,
            listener,
            seq,
            registered_at: Instant::now(),
        });
        listeners.by_node.insert(node, key);
        key
    }

    /// Remove a listener, clearing focus if it held it
    pub fn unregister(&self, node: NodeId) -> bool {
        let (removed, lost_focus) = {
            let mut listeners = self.listeners.lock().unwrap();
            let Some(key) = listeners.by_node.remove(&node) else {
                return false;
            };
            let removed = listeners.arena.remove(key);
            let lost_focus = listeners.focused == Some(node);
            if lost_focus {
                listeners.focused = None;
            }
            (removed, lost_focus)
        };

        if lost_focus {
            if let Some(registration) = &removed {
                notify_focus(registration.listener.as_ref(), false);
            }
            self.input_method.dismiss();
            tracing::debug!("GestureDispatcher: focused {} unregistered", node);
        }
        removed.is_some()
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.listeners.lock().unwrap().by_node.contains_key(&node)
    }

    pub fn len(&self) -> usize {
        self.listeners.lock().unwrap().arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// When `node` was registered
    pub fn registered_at(&self, node: NodeId) -> Option<Instant> {
        let listeners = self.listeners.lock().unwrap();
        let key = *listeners.by_node.get(&node)?;
        listeners.arena.get(key).map(|r| r.registered_at)
    }

    pub fn focused(&self) -> Option<NodeId> {
        self.listeners.lock().unwrap().focused
    }

    /// Move focus to `node` (or clear it), notifying both sides
    ///
    /// Focusing an unregistered node is ignored.
    pub fn set_focus(&self, node: Option<NodeId>) {
        let (previous, next) = {
            let mut listeners = self.listeners.lock().unwrap();
            if listeners.focused == node {
                return;
            }
            let next = match node {
                Some(id) => match listeners.by_node.get(&id) {
                    Some(&key) => listeners.arena.get(key).map(|r| Arc::clone(&r.listener)),
                    None => return,
                },
                None => None,
            };
            let previous = listeners
                .focused
                .and_then(|id| listeners.by_node.get(&id).copied())
                .and_then(|key| listeners.arena.get(key))
                .map(|r| Arc::clone(&r.listener));
            listeners.focused = node;
            (previous, next)
        };

        if let Some(previous) = previous {
            notify_focus(previous.as_ref(), false);
        }
        match next {
            Some(next) => notify_focus(next.as_ref(), true),
            None => self.input_method.dismiss(),
        }
        tracing::trace!("GestureDispatcher: focus -> {:?}", node);
    }

    /// Route `event` to the listeners; see the module docs for the rules
    pub fn dispatch(&self, event: &GestureEvent) -> DispatchOutcome {
        let (snapshot, focused) = {
            let listeners = self.listeners.lock().unwrap();
            let mut ordered: Vec<_> = listeners
                .arena
                .values()
                .map(|r| (Reverse(r.listener.z_index()), r.seq, r.node, Arc::clone(&r.listener)))
                .collect();
            ordered.sort_by_key(|(z, seq, _, _)| (*z, *seq));
            (ordered, listeners.focused)
        };

        let (snapshot, disposed): (Vec<_>, Vec<_>) = snapshot
            .into_iter()
            .partition(|(_, _, _, listener)| !listener.is_disposed());
        let focused = if disposed.is_empty() {
            focused
        } else {
            for (_, _, node, _) in disposed {
                tracing::debug!("GestureDispatcher: dropping disposed listener {}", node);
                self.unregister(node);
            }
            self.focused()
        };

        let up = event.is_up_type();
        let mut outcome = DispatchOutcome::default();

        for (_, _, node, listener) in snapshot {
            if !listener.accepts_gestures() {
                continue;
            }
            let is_focused = focused == Some(node);
            if listener.input_transparent() && !(up && is_focused) {
                continue;
            }
            if !up && !is_focused && !listener.hit_test(event.start_location) {
                continue;
            }

            outcome.offered += 1;
            match catch_unwind(AssertUnwindSafe(|| listener.on_gesture(event))) {
                Ok(Some(_)) => {
                    outcome.consumer = Some(node);
                    break;
                }
                Ok(None) => {}
                Err(panic) => tracing::error!(
                    "Gesture listener {} panicked on {:?}: {}",
                    node,
                    event.kind,
                    panic_message(panic.as_ref())
                ),
            }
        }

        if event.kind == GestureKind::Up && outcome.consumer != focused {
            self.set_focus(outcome.consumer);
        }
        outcome
    }

    /// Drop every listener, blurring the focused one
    pub fn clear(&self) {
        let focused = self.focused();
        if let Some(node) = focused {
            self.unregister(node);
        }
        let mut listeners = self.listeners.lock().unwrap();
        listeners.arena.clear();
        listeners.by_node.clear();
    }
}

fn notify_focus(listener: &dyn GestureListener, focused: bool) {
    if let Err(panic) = catch_unwind(AssertUnwindSafe(|| listener.on_focus_changed(focused))) {
        tracing::error!(
            "Focus notification to {} panicked: {}",
            listener.listener_id(),
            panic_message(panic.as_ref())
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ember_core::{Consumed, FocusObservable, HitTestable, Point, Rect};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    struct Recorder {
        id: NodeId,
        bounds: Rect,
        z: i32,
        transparent: bool,
        consume: AtomicBool,
        seen: Mutex<Vec<GestureKind>>,
        blurs: AtomicUsize,
        focuses: AtomicUsize,
        disposed: AtomicBool,
    }

    impl Recorder {
        fn new(bounds: Rect, z: i32) -> Arc<Self> {
            Self::build(bounds, z, false)
        }

        fn build(bounds: Rect, z: i32, transparent: bool) -> Arc<Self> {
            Arc::new(Self {
                id: NodeId::next(),
                bounds,
                z,
                transparent,
                consume: AtomicBool::new(true),
                seen: Mutex::new(Vec::new()),
                blurs: AtomicUsize::new(0),
                focuses: AtomicUsize::new(0),
                disposed: AtomicBool::new(false),
            })
        }

        fn seen(&self) -> Vec<GestureKind> {
            self.seen.lock().unwrap().clone()
        }
    }

    impl HitTestable for Recorder {
        fn hit_bounds(&self) -> Rect {
            self.bounds
        }
    }

    impl FocusObservable for Recorder {
        fn on_focus_changed(&self, focused: bool) {
            let counter = if focused { &self.focuses } else { &self.blurs };
            counter.fetch_add(1, Ordering::SeqCst);
        }
    }

    impl GestureListener for Recorder {
        fn listener_id(&self) -> NodeId {
            self.id
        }

        fn z_index(&self) -> i32 {
            self.z
        }

        fn input_transparent(&self) -> bool {
            self.transparent
        }

        fn is_disposed(&self) -> bool {
            self.disposed.load(Ordering::SeqCst)
        }

        fn on_gesture(&self, event: &GestureEvent) -> Option<Consumed> {
            self.seen.lock().unwrap().push(event.kind);
            self.consume.load(Ordering::SeqCst).then_some(Consumed)
        }
    }

    struct CountingIme(AtomicUsize);

    impl InputMethod for CountingIme {
        fn dismiss(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn at(kind: GestureKind, x: f32, y: f32) -> GestureEvent {
        GestureEvent::new(kind, Point::new(x, y))
    }

    fn dispatcher() -> (GestureDispatcher, Arc<CountingIme>) {
        let ime = Arc::new(CountingIme(AtomicUsize::new(0)));
        (GestureDispatcher::new(ime.clone()), ime)
    }

    #[test]
    fn test_higher_z_is_offered_first_and_consumes() {
        let (dispatcher, _) = dispatcher();
        let low = Recorder::new(Rect::new(0.0, 0.0, 100.0, 100.0), 5);
        let high = Recorder::new(Rect::new(0.0, 0.0, 100.0, 100.0), 10);
        dispatcher.register(low.clone());
        dispatcher.register(high.clone());

        let outcome = dispatcher.dispatch(&at(GestureKind::Down, 10.0, 10.0));
        assert_eq!(outcome.consumer, Some(high.id));
        assert_eq!(outcome.offered, 1);
        assert!(low.seen().is_empty());
    }

    #[test]
    fn test_equal_z_uses_registration_order() {
        let (dispatcher, _) = dispatcher();
        let first = Recorder::new(Rect::new(0.0, 0.0, 10.0, 10.0), 0);
        let second = Recorder::new(Rect::new(0.0, 0.0, 10.0, 10.0), 0);
        dispatcher.register(first.clone());
        dispatcher.register(second.clone());
        // Re-registering keeps the original slot
        dispatcher.register(first.clone());

        let outcome = dispatcher.dispatch(&at(GestureKind::Down, 1.0, 1.0));
        assert_eq!(outcome.consumer, Some(first.id));
        assert_eq!(dispatcher.len(), 2);
    }

    #[test]
    fn test_non_up_events_need_a_hit_on_start_location() {
        let (dispatcher, _) = dispatcher();
        let recorder = Recorder::new(Rect::new(0.0, 0.0, 10.0, 10.0), 0);
        dispatcher.register(recorder.clone());

        let outside = at(GestureKind::Panning, 5.0, 5.0).with_start(Point::new(50.0, 50.0));
        assert_eq!(dispatcher.dispatch(&outside).offered, 0);

        let inside = at(GestureKind::Panning, 50.0, 50.0).with_start(Point::new(5.0, 5.0));
        assert_eq!(dispatcher.dispatch(&inside).offered, 1);
    }

    #[test]
    fn test_up_reaches_everyone_until_consumed() {
        let (dispatcher, _) = dispatcher();
        let a = Recorder::new(Rect::new(0.0, 0.0, 1.0, 1.0), 2);
        let b = Recorder::new(Rect::new(0.0, 0.0, 1.0, 1.0), 1);
        a.consume.store(false, Ordering::SeqCst);
        b.consume.store(false, Ordering::SeqCst);
        dispatcher.register(a.clone());
        dispatcher.register(b.clone());

        let outcome = dispatcher.dispatch(&at(GestureKind::Cancelled, 500.0, 500.0));
        assert_eq!(outcome.offered, 2);
        assert_eq!(outcome.consumer, None);
    }

    #[test]
    fn test_transparent_listener_only_sees_up_while_focused() {
        let (dispatcher, _) = dispatcher();
        let ghost = Recorder::build(Rect::new(0.0, 0.0, 10.0, 10.0), 0, true);
        dispatcher.register(ghost.clone());

        dispatcher.dispatch(&at(GestureKind::Down, 1.0, 1.0));
        dispatcher.dispatch(&at(GestureKind::Up, 1.0, 1.0));
        assert!(ghost.seen().is_empty());

        dispatcher.set_focus(Some(ghost.id));
        dispatcher.dispatch(&at(GestureKind::Down, 1.0, 1.0));
        dispatcher.dispatch(&at(GestureKind::Panning, 1.0, 1.0));
        dispatcher.dispatch(&at(GestureKind::Up, 1.0, 1.0));
        assert_eq!(ghost.seen(), vec![GestureKind::Up]);
    }

    #[test]
    fn test_focus_moves_to_up_consumer() {
        let (dispatcher, ime) = dispatcher();
        let a = Recorder::new(Rect::new(0.0, 0.0, 10.0, 10.0), 0);
        let b = Recorder::new(Rect::new(20.0, 0.0, 10.0, 10.0), 0);
        dispatcher.register(a.clone());
        dispatcher.register(b.clone());

        dispatcher.dispatch(&at(GestureKind::Up, 5.0, 5.0));
        // Up is offered to everyone; `a` registered first and consumes
        assert_eq!(dispatcher.focused(), Some(a.id));
        assert_eq!(a.focuses.load(Ordering::SeqCst), 1);

        a.consume.store(false, Ordering::SeqCst);
        dispatcher.dispatch(&at(GestureKind::Up, 25.0, 5.0));
        assert_eq!(dispatcher.focused(), Some(b.id));
        assert_eq!(a.blurs.load(Ordering::SeqCst), 1);

        b.consume.store(false, Ordering::SeqCst);
        dispatcher.dispatch(&at(GestureKind::Up, 90.0, 90.0));
        assert_eq!(dispatcher.focused(), None);
        assert_eq!(b.blurs.load(Ordering::SeqCst), 1);
        assert_eq!(ime.0.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_unregistering_focused_listener_blurs_once() {
        let (dispatcher, ime) = dispatcher();
        let recorder = Recorder::new(Rect::new(0.0, 0.0, 10.0, 10.0), 0);
        dispatcher.register(recorder.clone());
        dispatcher.set_focus(Some(recorder.id));

        assert!(dispatcher.unregister(recorder.id));
        assert!(!dispatcher.unregister(recorder.id));
        assert_eq!(recorder.blurs.load(Ordering::SeqCst), 1);
        assert_eq!(dispatcher.focused(), None);
        assert_eq!(ime.0.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_disposed_focused_listener_is_dropped_on_next_event() {
        let (dispatcher, ime) = dispatcher();
        let focused = Recorder::new(Rect::new(0.0, 0.0, 10.0, 10.0), 0);
        let other = Recorder::new(Rect::new(20.0, 0.0, 10.0, 10.0), 0);
        other.consume.store(false, Ordering::SeqCst);
        dispatcher.register(focused.clone());
        dispatcher.register(other.clone());
        dispatcher.set_focus(Some(focused.id));

        focused.disposed.store(true, Ordering::SeqCst);
        let outcome = dispatcher.dispatch(&at(GestureKind::Down, 5.0, 5.0));
        assert_eq!(outcome.offered, 0);
        assert!(focused.seen().is_empty());
        assert!(!dispatcher.contains(focused.id));
        assert_eq!(dispatcher.focused(), None);
        assert_eq!(focused.blurs.load(Ordering::SeqCst), 1);
        assert_eq!(ime.0.load(Ordering::SeqCst), 1);

        // An unconsumed Up afterwards does not blur or dismiss again
        dispatcher.dispatch(&at(GestureKind::Up, 25.0, 5.0));
        assert_eq!(focused.blurs.load(Ordering::SeqCst), 1);
        assert_eq!(ime.0.load(Ordering::SeqCst), 1);
        assert_eq!(other.seen(), vec![GestureKind::Up]);
    }

    #[test]
    fn test_panicking_listener_does_not_block_others() {
        struct Bomb(NodeId);
        impl HitTestable for Bomb {
            fn hit_bounds(&self) -> Rect {
                Rect::new(0.0, 0.0, 10.0, 10.0)
            }
        }
        impl FocusObservable for Bomb {}
        impl GestureListener for Bomb {
            fn listener_id(&self) -> NodeId {
                self.0
            }
            fn z_index(&self) -> i32 {
                100
            }
            fn on_gesture(&self, _event: &GestureEvent) -> Option<Consumed> {
                panic!("listener bug")
            }
        }

        let (dispatcher, _) = dispatcher();
        let recorder = Recorder::new(Rect::new(0.0, 0.0, 10.0, 10.0), 0);
        dispatcher.register(Arc::new(Bomb(NodeId::next())));
        dispatcher.register(recorder.clone());

        let outcome = dispatcher.dispatch(&at(GestureKind::Down, 1.0, 1.0));
        assert_eq!(outcome.consumer, Some(recorder.id));
        assert_eq!(outcome.offered, 2);
    }
}
