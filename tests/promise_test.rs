#[cfg(test)]
mod tests {
    use promise_then::{Error, Promise, PromiseLike, Thenable};
    use std::{cell::RefCell, rc::Rc};

    fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }

    /// A bare thenable that reports whatever it is handed later.
    #[derive(Clone, Default)]
    struct Later {
        on_fulfilled: Rc<RefCell<Option<Box<dyn FnOnce(i32)>>>>,
        on_rejected: Rc<RefCell<Option<Box<dyn FnOnce(String)>>>>,
    }

    impl Later {
        fn fire(&self, value: i32) {
            let callback = self.on_fulfilled.borrow_mut().take();
            if let Some(callback) = callback {
                callback(value)
            }
        }

        fn fail(&self, reason: &str) {
            let callback = self.on_rejected.borrow_mut().take();
            if let Some(callback) = callback {
                callback(reason.to_string())
            }
        }
    }

    impl Thenable<i32, String> for Later {
        fn then(&self, on_fulfilled: Box<dyn FnOnce(i32)>, on_rejected: Box<dyn FnOnce(String)>) {
            *self.on_fulfilled.borrow_mut() = Some(on_fulfilled);
            *self.on_rejected.borrow_mut() = Some(on_rejected);
        }
    }

    #[test]
    fn test_succeed_then_adds_one() {
        init_tracing();
        let promise: Promise<i32, String> = Promise::new(|resolver| {
            resolver.resolve(42);
            Ok(())
        });
        let next = promise.then(|value| Ok(value + 1));
        assert_eq!(next.outcome(), Some(Ok(43)));
    }

    #[test]
    fn test_fail_is_handled() {
        let promise: Promise<String, String> = Promise::new(|resolver| {
            resolver.reject("boom".to_string());
            Ok(())
        });
        let handled = promise.otherwise(|reason| Ok(format!("handled:{reason}")));
        assert_eq!(handled.outcome(), Some(Ok("handled:boom".to_string())));
    }

    #[test]
    fn test_resolver_error_is_rejection() {
        let promise: Promise<i32, String> = Promise::new(|_| Err("bad".to_string()));
        assert_eq!(promise.outcome(), Some(Err("bad".to_string())));
    }

    #[test]
    fn test_progress_then_settle() {
        init_tracing();
        let (promise, resolver) = Promise::<i32, String, i32>::pending();
        let updates = Rc::new(RefCell::new(Vec::new()));
        let values = Rc::new(RefCell::new(Vec::new()));
        let (update_sink, value_sink) = (Rc::clone(&updates), Rc::clone(&values));
        promise.done_with(
            move |value| value_sink.borrow_mut().push(value),
            |_| panic!("unexpected rejection"),
            move |update| update_sink.borrow_mut().push(update),
        );
        resolver.notify(1);
        resolver.notify(2);
        resolver.resolve(3);
        resolver.notify(4);
        assert_eq!(*updates.borrow(), vec![1, 2]);
        assert_eq!(*values.borrow(), vec![3]);
    }

    #[test]
    fn test_progress_reaches_every_listener_in_order() {
        let (promise, resolver) = Promise::<i32, String, u32>::pending();
        let seen = Rc::new(RefCell::new(Vec::new()));
        for listener in 0..2 {
            let sink = Rc::clone(&seen);
            promise.done_with(|_| {}, |_| {}, move |update| sink.borrow_mut().push((listener, update)));
        }
        resolver.notify(7);
        resolver.notify(8);
        assert_eq!(*seen.borrow(), vec![(0, 7), (1, 7), (0, 8), (1, 8)]);
    }

    #[test]
    fn test_progress_transform_error_becomes_progress() {
        let (promise, resolver) = Promise::<i32, String, String>::pending();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        promise
            .progress(|update: String| {
                if update == "bad" {
                    Err("oops".to_string())
                } else {
                    Ok(update.to_uppercase())
                }
            })
            .done_with(|_| {}, |_| panic!("unexpected rejection"), move |update| {
                sink.borrow_mut().push(update)
            });
        resolver.notify("a".to_string());
        resolver.notify("bad".to_string());
        resolver.resolve(1);
        assert_eq!(*seen.borrow(), vec!["A".to_string(), "oops".to_string()]);
    }

    #[test]
    fn test_progress_passes_through_chain() {
        let (promise, resolver) = Promise::<i32, String, u8>::pending();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        promise
            .then(|value| Ok(value + 1))
            .then(|value| Ok(value * 2))
            .done_with(|_| {}, |_| {}, move |update| sink.borrow_mut().push(update));
        resolver.notify(1);
        resolver.notify(2);
        assert_eq!(*seen.borrow(), vec![1, 2]);
    }

    #[test]
    fn test_plain_value_fulfills_chain() {
        let (promise, resolver) = Promise::<&str, String>::pending();
        let chained = promise.then(|value| Ok(value.len()));
        resolver.resolve("four");
        assert_eq!(chained.outcome(), Some(Ok(4)));
    }

    #[test]
    fn test_flattening_three_levels() {
        let (innermost, innermost_resolver) = Promise::<i32, String>::pending();
        let (middle, middle_resolver) = Promise::<i32, String>::pending();
        let (outer, outer_resolver) = Promise::<i32, String>::pending();
        outer_resolver.adopt(middle.clone()).unwrap();
        middle_resolver.adopt(innermost.clone()).unwrap();
        let doubled = outer.then(|value| Ok(value * 2));
        assert!(outer.is_settled());
        assert_eq!(outer.outcome(), None);
        innermost_resolver.resolve(5);
        assert_eq!(outer.outcome(), Some(Ok(5)));
        assert_eq!(doubled.outcome(), Some(Ok(10)));
    }

    #[test]
    fn test_handler_returning_promise_is_adopted() {
        let (later, later_resolver) = Promise::<String, String>::pending();
        let promise = Promise::<i32, String>::fulfilled(1);
        let chained = promise.then(move |_| later);
        assert_eq!(chained.outcome(), None);
        later_resolver.resolve("later".to_string());
        assert_eq!(chained.outcome(), Some(Ok("later".to_string())));
    }

    #[test]
    fn test_all_handlers_see_same_outcome() {
        let (promise, resolver) = Promise::<i32, String>::pending();
        let (inner, inner_resolver) = Promise::<i32, String>::pending();
        let seen = Rc::new(RefCell::new(Vec::new()));
        for tag in 0..4 {
            let sink = Rc::clone(&seen);
            promise.done(move |value| sink.borrow_mut().push((tag, value)), |_| {});
        }
        resolver.adopt(inner).unwrap();
        assert!(seen.borrow().is_empty());
        inner_resolver.resolve(9);
        assert_eq!(*seen.borrow(), vec![(0, 9), (1, 9), (2, 9), (3, 9)]);
    }

    #[test]
    fn test_done_rejection_fires_once_through_nesting() {
        let (inner, inner_resolver) = Promise::<i32, String>::pending();
        let (outer, outer_resolver) = Promise::<i32, String>::pending();
        let rejections = Rc::new(RefCell::new(0));
        let counter = Rc::clone(&rejections);
        outer.done(|_| panic!("unexpected fulfillment"), move |_| *counter.borrow_mut() += 1);
        outer_resolver.adopt(inner).unwrap();
        inner_resolver.reject("no".to_string());
        inner_resolver.reject("again".to_string());
        assert_eq!(*rejections.borrow(), 1);
    }

    #[test]
    fn test_basic_thenable_is_adopted() {
        let later = Later::default();
        let (promise, resolver) = Promise::<i32, String>::pending();
        resolver.adopt(PromiseLike::basic(later.clone())).unwrap();
        let chained = promise.then(|value| Ok(value + 1));
        assert_eq!(chained.outcome(), None);
        later.fire(1);
        assert_eq!(chained.outcome(), Some(Ok(2)));
    }

    #[test]
    fn test_cyclic_adoption_is_refused() {
        let (first, first_resolver) = Promise::<i32, String>::pending();
        let (second, second_resolver) = Promise::<i32, String>::pending();
        let (third, third_resolver) = Promise::<i32, String>::pending();
        first_resolver.adopt(second.clone()).unwrap();
        second_resolver.adopt(third.clone()).unwrap();
        assert_eq!(third_resolver.adopt(first.clone()), Err(Error::Cycle));
        assert!(!third.is_settled());
    }

    #[test]
    fn test_settle_dispatches_results() {
        let (promise, resolver) = Promise::<i32, String>::pending();
        resolver.settle(Err::<i32, String>("nope".to_string())).unwrap();
        resolver.settle(Ok::<i32, String>(1)).unwrap();
        assert_eq!(promise.outcome(), Some(Err("nope".to_string())));
        assert!(resolver.is_settled());
    }

    #[test]
    fn test_free_normalizers() {
        let fulfilled: Promise<i32, String> = promise_then::resolve(1);
        let rejected: Promise<i32, String> = promise_then::reject("x".to_string());
        assert_eq!(fulfilled.outcome(), Some(Ok(1)));
        assert_eq!(rejected.outcome(), Some(Err("x".to_string())));
    }

    #[test]
    fn test_then_with_all_handlers() {
        let (promise, resolver) = Promise::<i32, String, String>::pending();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let chained = promise.then_with(
            |value| Ok(value.to_string()),
            |reason| Ok(format!("recovered {reason}")),
            |update| Ok(format!("{update}%")),
        );
        chained.done_with(|_| {}, |_| {}, move |update| sink.borrow_mut().push(update));
        resolver.notify("50".to_string());
        resolver.reject("late".to_string());
        assert_eq!(*seen.borrow(), vec!["50%".to_string()]);
        assert_eq!(chained.outcome(), Some(Ok("recovered late".to_string())));
    }

    #[test]
    fn test_basic_thenable_rejection_is_adopted() {
        let later = Later::default();
        let (promise, resolver) = Promise::<i32, String>::pending();
        resolver.adopt(PromiseLike::basic(later.clone())).unwrap();
        let handled = promise
            .then(|value| Ok(value + 1))
            .otherwise(|reason| Ok(reason.len() as i32));
        assert_eq!(promise.outcome(), None);
        later.fail("boom");
        later.fire(1);
        assert_eq!(promise.outcome(), Some(Err("boom".to_string())));
        assert_eq!(handled.outcome(), Some(Ok(4)));
    }

    #[test]
    fn test_chain_receives_progress_from_adopted_promise() {
        let (source, source_resolver) = Promise::<i32, String, u8>::pending();
        let (inner, inner_resolver) = Promise::<i32, String, u8>::pending();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let chained = source.then(|value| Ok(value * 10));
        chained.done_with(|_| {}, |_| {}, move |update| sink.borrow_mut().push(update));
        source_resolver.notify(1);
        source_resolver.adopt(inner).unwrap();
        source_resolver.notify(2);
        inner_resolver.notify(3);
        inner_resolver.notify(4);
        inner_resolver.resolve(5);
        inner_resolver.notify(6);
        assert_eq!(*seen.borrow(), vec![1, 3, 4]);
        assert_eq!(chained.outcome(), Some(Ok(50)));
    }
}
