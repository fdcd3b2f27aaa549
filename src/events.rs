//! Generic event hook registry, mirroring `Utils/EventExecutor.h`: a fixed
//! set of event kinds, each with an ordered list of registered actions
//! that run against a caller-chosen target type.

/// An enum of event kinds usable as an [`EventExecutor`] key: contiguous
/// `0..COUNT` indices so actions can be stored in a flat `Vec` of slots.
pub trait EventKind: Copy {
    const COUNT: usize;
    fn index(&self) -> usize;
}

/// A handle to a registered action, returned by `add_action` and required
/// to `remove_action` it again.
pub type ActionHandle = usize;

/// Per-event-kind lists of boxed actions, applied in registration order
/// against a mutable `Target`.
pub struct EventExecutor<E: EventKind, Target> {
    actions: Vec<Vec<Option<Box<dyn FnMut(&mut Target)>>>>,
    _marker: std::marker::PhantomData<E>,
}

impl<E: EventKind, Target> Default for EventExecutor<E, Target> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: EventKind, Target> EventExecutor<E, Target> {
    pub fn new() -> Self {
        Self {
            actions: (0..E::COUNT).map(|_| Vec::new()).collect(),
            _marker: std::marker::PhantomData,
        }
    }

    pub fn add_action(&mut self, event: E, action: Box<dyn FnMut(&mut Target)>) -> ActionHandle {
        let slot = &mut self.actions[event.index()];
        slot.push(Some(action));
        slot.len() - 1
    }

    pub fn remove_action(&mut self, event: E, handle: ActionHandle) {
        if let Some(slot) = self.actions[event.index()].get_mut(handle) {
            *slot = None;
        }
    }

    pub fn apply_actions(&mut self, event: E, target: &mut Target) {
        for action in self.actions[event.index()].iter_mut().flatten() {
            action(target);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Copy)]
    enum TestEvent {
        Start,
        Finish,
    }

    impl EventKind for TestEvent {
        const COUNT: usize = 2;
        fn index(&self) -> usize {
            *self as usize
        }
    }

    #[test]
    fn registered_actions_run_in_order() {
        let mut exec: EventExecutor<TestEvent, Vec<i32>> = EventExecutor::new();
        exec.add_action(TestEvent::Start, Box::new(|v: &mut Vec<i32>| v.push(1)));
        exec.add_action(TestEvent::Start, Box::new(|v: &mut Vec<i32>| v.push(2)));
        let mut target = Vec::new();
        exec.apply_actions(TestEvent::Start, &mut target);
        assert_eq!(target, vec![1, 2]);
    }

    #[test]
    fn removed_action_does_not_run() {
        let mut exec: EventExecutor<TestEvent, Vec<i32>> = EventExecutor::new();
        let handle = exec.add_action(TestEvent::Finish, Box::new(|v: &mut Vec<i32>| v.push(1)));
        exec.remove_action(TestEvent::Finish, handle);
        let mut target = Vec::new();
        exec.apply_actions(TestEvent::Finish, &mut target);
        assert!(target.is_empty());
    }
}
