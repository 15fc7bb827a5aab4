/// Receives solver events and decides how the iteration should proceed.
///
/// Observers let callers monitor or steer a solver without changing its API.
/// The sizing engine uses them to record per-iteration history; callers can
/// use them for logging or to stop a long hourly sizing early.
///
/// The `observe` method returns `Option<A>`, where `Some(action)` requests a
/// solver-specific action and `None` lets the solver continue unchanged.
///
/// Closures automatically implement `Observer`, and a built-in impl for `()`
/// provides a no-op observer that always returns `None`.
pub trait Observer<E, A> {
    /// Observes a solver event and optionally returns a control action.
    fn observe(&mut self, event: &E) -> Option<A>;
}

impl<E, A, F> Observer<E, A> for F
where
    F: FnMut(&E) -> Option<A>,
{
    fn observe(&mut self, event: &E) -> Option<A> {
        self(event)
    }
}

impl<E, A> Observer<E, A> for () {
    fn observe(&mut self, _event: &E) -> Option<A> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closure_observer_forwards_events() {
        let mut seen = Vec::new();
        let mut observer = |event: &f64| {
            seen.push(*event);
            (*event > 1.0).then_some("stop")
        };

        assert_eq!(observer.observe(&0.5), None);
        assert_eq!(observer.observe(&2.0), Some("stop"));
        assert_eq!(seen, vec![0.5, 2.0]);
    }

    #[test]
    fn unit_observer_never_acts() {
        let mut observer = ();
        let action: Option<()> = Observer::<f64, ()>::observe(&mut observer, &3.0);
        assert!(action.is_none());
    }
}
