//! Scheduling and hook protocol properties.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use spark_reconciler::{
    Container, Error, HookKind, Mode, RenderOptions, Result, Setter, Value, cleanup,
    create_element, is_rendering, render, use_effect, use_environment, use_ref, use_state,
    use_state_by,
};

type Slot<T> = Rc<RefCell<Option<Setter<T>>>>;

fn take<T>(slot: &Slot<T>) -> Setter<T> {
    match slot.borrow().clone() {
        Some(setter) => setter,
        None => panic!("component never ran"),
    }
}

fn mount(element: spark_reconciler::Element) -> Container {
    let container = render(element, RenderOptions::default());
    assert!(container.run_until_idle().is_ok());
    container
}

// =============================================================================
// Ordering
// =============================================================================

#[test]
fn test_parent_runs_before_child_in_one_pass() {
    let order: Rc<RefCell<Vec<&'static str>>> = Rc::default();
    let parent_slot: Slot<i64> = Rc::default();
    let child_slot: Slot<i64> = Rc::default();

    let (log, captured) = (order.clone(), child_slot.clone());
    let child = move |_props: &Value| -> Result<Value> {
        let (_, set) = use_state(0_i64)?;
        *captured.borrow_mut() = Some(set);
        log.borrow_mut().push("child");
        Ok(Value::Null)
    };

    let (log, captured) = (order.clone(), parent_slot.clone());
    let parent = move |_props: &Value| -> Result<Value> {
        let (_, set) = use_state(0_i64)?;
        *captured.borrow_mut() = Some(set);
        log.borrow_mut().push("parent");
        Ok(Value::from(create_element(child.clone(), Value::Null)))
    };

    let container = mount(create_element(parent, Value::Null));
    assert_eq!(*order.borrow(), vec!["parent", "child"]);
    order.borrow_mut().clear();

    // Child queued first; depth still decides.
    take(&child_slot).trigger();
    take(&parent_slot).trigger();
    assert_eq!(container.flush().ok(), Some(false));
    assert_eq!(*order.borrow(), vec!["parent", "child"]);
}

#[test]
fn test_idle_fires_once_per_drain() {
    fn deep(props: &Value) -> Result<Value> {
        let level = props.as_i64().unwrap_or(0);
        if level == 0 {
            return Ok(Value::Null);
        }
        Ok(Value::from(create_element(deep, level - 1)))
    }

    let container = render(create_element(deep, 5), RenderOptions::default());
    let idle = Rc::new(Cell::new(0));
    let counter = idle.clone();
    container.on_idle(move || counter.set(counter.get() + 1));

    assert!(container.run_until_idle().is_ok());
    assert_eq!(container.instance_count(), 6);
    assert_eq!(idle.get(), 1);

    // A drain with nothing to do is not a drain.
    assert!(container.run_until_idle().is_ok());
    assert_eq!(idle.get(), 1);
}

#[test]
fn test_work_queued_by_idle_listener_is_drained() {
    let slot: Slot<i64> = Rc::default();
    let captured = slot.clone();
    let app = move |_props: &Value| -> Result<Value> {
        let (value, set) = use_state(0_i64)?;
        *captured.borrow_mut() = Some(set);
        Ok(Value::from(value))
    };

    let container = render(create_element(app, Value::Null), RenderOptions::default());
    let idle = Rc::new(Cell::new(0));
    let (counter, pending) = (idle.clone(), slot.clone());
    container.on_idle(move || {
        counter.set(counter.get() + 1);
        if counter.get() > 1 {
            return;
        }
        if let Some(set) = pending.borrow().clone() {
            set.set(1);
        }
    });

    assert!(container.run_until_idle().is_ok());
    assert_eq!(container.state(), Value::from(1));
    assert!(!container.has_pending_work());
    assert_eq!(idle.get(), 2);
}

#[test]
fn test_setter_of_removed_instance_schedules_nothing() {
    let shown: Slot<bool> = Rc::default();
    let child_slot: Slot<i64> = Rc::default();

    let captured = child_slot.clone();
    let child = move |_props: &Value| -> Result<Value> {
        let (value, set) = use_state(0_i64)?;
        *captured.borrow_mut() = Some(set);
        Ok(Value::from(value))
    };
    let captured = shown.clone();
    let parent = move |_props: &Value| -> Result<Value> {
        let (visible, set) = use_state(true)?;
        *captured.borrow_mut() = Some(set);
        Ok(Value::from(visible.then(|| create_element(child.clone(), Value::Null))))
    };

    let container = mount(create_element(parent, Value::Null));
    let orphan = take(&child_slot);
    take(&shown).set(false);
    assert!(container.run_until_idle().is_ok());
    assert_eq!(container.instance_count(), 1);

    let idle = Rc::new(Cell::new(0));
    let counter = idle.clone();
    container.on_idle(move || counter.set(counter.get() + 1));

    orphan.set(5);
    assert_eq!(orphan.get(), 5);
    orphan.trigger();
    assert!(!container.has_pending_work());

    assert!(container.run_until_idle().is_ok());
    assert_eq!(idle.get(), 0);
}

#[test]
fn test_off_idle() {
    let container = render(create_element(|_: &Value| -> Result<Value> { Ok(Value::Null) }, Value::Null), RenderOptions::default());
    let idle = Rc::new(Cell::new(0));
    let counter = idle.clone();
    let id = container.on_idle(move || counter.set(counter.get() + 1));
    assert!(container.off_idle(id));
    assert!(!container.off_idle(id));

    assert!(container.run_until_idle().is_ok());
    assert_eq!(idle.get(), 0);
}

// =============================================================================
// Gating
// =============================================================================

#[test]
fn test_equal_state_write_is_dropped() {
    let slot: Slot<String> = Rc::default();
    let captured = slot.clone();
    let app = move |_props: &Value| -> Result<Value> {
        let (value, set) = use_state(String::from("same"))?;
        *captured.borrow_mut() = Some(set);
        Ok(Value::from(value))
    };

    let container = mount(create_element(app, Value::Null));
    take(&slot).set(String::from("same"));
    assert!(!container.has_pending_work());
    assert!(!container.is_flush_scheduled());

    take(&slot).set(String::from("different"));
    assert!(container.has_pending_work());
    assert!(container.run_until_idle().is_ok());
    assert_eq!(container.state(), Value::from("different"));
    assert_eq!(container.inspect()[0].execution_count, 2);
}

#[test]
fn test_custom_state_equality() {
    let slot: Slot<String> = Rc::default();
    let captured = slot.clone();
    let app = move |_props: &Value| -> Result<Value> {
        let (value, set) = use_state_by(|| String::from("Hello"), |a: &String, b: &String| {
            a.eq_ignore_ascii_case(b)
        })?;
        *captured.borrow_mut() = Some(set);
        Ok(Value::from(value))
    };

    let container = mount(create_element(app, Value::Null));
    take(&slot).set(String::from("HELLO"));
    assert!(!container.has_pending_work());
    assert_eq!(take(&slot).get(), "Hello");
}

#[test]
fn test_effect_runs_only_when_deps_change() {
    let runs = Rc::new(Cell::new(0));
    let cleanups = Rc::new(Cell::new(0));
    let slot: Slot<(i64, i64)> = Rc::default();

    let (run_count, cleanup_count, captured) = (runs.clone(), cleanups.clone(), slot.clone());
    let app = move |_props: &Value| -> Result<Value> {
        let ((tracked, untracked), set) = use_state((0_i64, 0_i64))?;
        *captured.borrow_mut() = Some(set);
        let (runs, cleanups) = (run_count.clone(), cleanup_count.clone());
        use_effect(tracked, move || {
            runs.set(runs.get() + 1);
            cleanup(move || cleanups.set(cleanups.get() + 1))
        })?;
        Ok(Value::list([tracked, untracked]))
    };

    let container = mount(create_element(app, Value::Null));
    assert_eq!(runs.get(), 1);

    take(&slot).update(|&(tracked, untracked)| (tracked, untracked + 1));
    assert!(container.run_until_idle().is_ok());
    assert_eq!(runs.get(), 1);
    assert_eq!(cleanups.get(), 0);

    take(&slot).update(|&(tracked, untracked)| (tracked + 1, untracked));
    assert!(container.run_until_idle().is_ok());
    assert_eq!(runs.get(), 2);
    assert_eq!(cleanups.get(), 1);

    drop(container);
    assert_eq!(cleanups.get(), 2);
}

#[test]
fn test_child_reruns_only_on_prop_change() {
    let child_runs = Rc::new(Cell::new(0));
    let slot: Slot<i64> = Rc::default();

    let runs = child_runs.clone();
    let child = move |_props: &Value| -> Result<Value> {
        runs.set(runs.get() + 1);
        Ok(Value::Null)
    };
    let captured = slot.clone();
    let parent = move |_props: &Value| -> Result<Value> {
        let (n, set) = use_state(0_i64)?;
        *captured.borrow_mut() = Some(set);
        Ok(Value::map([
            ("fixed", create_element(child.clone(), Value::map([("n", 1)]))),
            ("tracking", create_element(child.clone(), Value::map([("n", n)]))),
        ]))
    };

    let container = mount(create_element(parent, Value::Null));
    assert_eq!(child_runs.get(), 2);

    take(&slot).set(7);
    assert!(container.run_until_idle().is_ok());
    assert_eq!(child_runs.get(), 3);
}

#[test]
fn test_changed_component_at_same_key_is_replaced() {
    let cleanups = Rc::new(Cell::new(0));
    let slot: Slot<bool> = Rc::default();

    fn plain(_props: &Value) -> Result<Value> {
        Ok(Value::from("plain"))
    }

    let count = cleanups.clone();
    let tracked = move |_props: &Value| -> Result<Value> {
        let count = count.clone();
        use_effect((), move || cleanup(move || count.set(count.get() + 1)))?;
        Ok(Value::from("tracked"))
    };

    let captured = slot.clone();
    let parent = move |_props: &Value| -> Result<Value> {
        let (use_tracked, set) = use_state(true)?;
        *captured.borrow_mut() = Some(set);
        let child = if use_tracked {
            create_element(tracked.clone(), Value::Null)
        } else {
            create_element(plain, Value::Null)
        };
        Ok(Value::map([("slot", child)]))
    };

    let container = mount(create_element(parent, Value::Null));
    assert_eq!(container.state()["slot"], Value::from("tracked"));

    take(&slot).set(false);
    assert!(container.run_until_idle().is_ok());
    assert_eq!(cleanups.get(), 1);
    assert_eq!(container.state()["slot"], Value::from("plain"));
    assert_eq!(container.instance_count(), 2);
}

// =============================================================================
// Hook protocol errors
// =============================================================================

#[test]
fn test_hook_outside_render() {
    assert!(!is_rendering());
    assert!(matches!(use_ref(0), Err(Error::Context)));
    assert!(matches!(use_environment(), Err(Error::Context)));
}

#[test]
fn test_reordered_hooks_fail() {
    let slot: Slot<bool> = Rc::default();
    let captured = slot.clone();
    let app = move |_props: &Value| -> Result<Value> {
        let (flipped, set) = use_state(false)?;
        *captured.borrow_mut() = Some(set);
        if flipped {
            use_ref(0)?;
        } else {
            use_effect((), || ())?;
        }
        Ok(Value::Null)
    };

    let container = mount(create_element(app, Value::Null));
    take(&slot).set(true);
    let err = container.run_until_idle().err();
    assert!(matches!(
        err,
        Some(Error::HookOrder {
            slot: 1,
            requested: Some(HookKind::Ref),
            recorded: Some(HookKind::Effect),
            ..
        })
    ));
}

#[test]
fn test_missing_hooks_fail() {
    let slot: Slot<bool> = Rc::default();
    let captured = slot.clone();
    let app = move |_props: &Value| -> Result<Value> {
        let (short, set) = use_state(false)?;
        *captured.borrow_mut() = Some(set);
        if !short {
            use_ref(0)?;
        }
        Ok(Value::Null)
    };

    let container = mount(create_element(app, Value::Null));
    take(&slot).set(true);
    let err = container.run_until_idle().err();
    assert!(matches!(
        err,
        Some(Error::HookOrder { requested: None, recorded: Some(HookKind::Ref), .. })
    ));
    assert!(container.inspect()[0].errored);
}

#[test]
fn test_changed_state_type_fails() {
    let slot: Slot<bool> = Rc::default();
    let captured = slot.clone();
    let app = move |_props: &Value| -> Result<Value> {
        let (switched, set) = use_state(false)?;
        *captured.borrow_mut() = Some(set);
        if switched {
            use_state(String::new())?;
        } else {
            use_state(0_i64)?;
        }
        Ok(Value::Null)
    };

    let container = mount(create_element(app, Value::Null));
    take(&slot).set(true);
    assert!(matches!(
        container.run_until_idle(),
        Err(Error::HookType { slot: 1, kind: HookKind::State, .. })
    ));
}

// =============================================================================
// Failures
// =============================================================================

#[test]
fn test_component_error_carries_name() {
    fn broken(_props: &Value) -> Result<Value> {
        Err(Error::custom("disk on fire"))
    }

    let container = render(create_element(broken, Value::Null), RenderOptions::default());
    match container.run_until_idle() {
        Err(Error::Component { component, source }) => {
            assert!(component.ends_with("broken"));
            assert_eq!(source.to_string(), "disk on fire");
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
}

#[test]
fn test_failed_first_run_starts_fresh() {
    let attempts = Rc::new(Cell::new(0));
    let cleanups = Rc::new(Cell::new(0));
    let slot: Slot<i64> = Rc::default();

    let (tries, count, captured) = (attempts.clone(), cleanups.clone(), slot.clone());
    let flaky = move |_props: &Value| -> Result<Value> {
        let (value, set) = use_state(0_i64)?;
        *captured.borrow_mut() = Some(set);
        let count = count.clone();
        use_effect((), move || cleanup(move || count.set(count.get() + 1)))?;
        tries.set(tries.get() + 1);
        if tries.get() == 1 {
            return Err(Error::custom("first attempt"));
        }
        Ok(Value::from(value))
    };

    let container = render(create_element(flaky, Value::Null), RenderOptions::default());
    assert!(container.run_until_idle().is_err());
    assert_eq!(container.inspect()[0].execution_count, 0);

    // Retry through the instance's own setter.
    take(&slot).trigger();
    assert!(container.run_until_idle().is_ok());
    assert_eq!(cleanups.get(), 1);
    assert_eq!(container.inspect()[0].execution_count, 1);
    assert_eq!(container.state(), Value::from(0));
}

#[test]
fn test_runaway_updates_hit_the_pass_limit() {
    fn runaway(_props: &Value) -> Result<Value> {
        let (n, set) = use_state(0_i64)?;
        use_effect(n, move || set.set(n + 1))?;
        Ok(Value::from(n))
    }

    let options = RenderOptions::new().with_max_passes(5);
    let container = render(create_element(runaway, Value::Null), options);
    assert!(matches!(
        container.run_until_idle(),
        Err(Error::FlushLimit { passes: 5 })
    ));
    assert!(container.has_pending_work());
}

#[test]
fn test_environment_reports_mode() {
    let seen = Rc::new(Cell::new(None));
    let captured = seen.clone();
    let app = move |_props: &Value| -> Result<Value> {
        captured.set(Some(use_environment()?.mode));
        Ok(Value::Null)
    };

    let options = RenderOptions::new().with_mode(Mode::Continuous);
    let container = render(create_element(app, Value::Null), options);
    assert!(container.run_until_idle().is_ok());
    assert_eq!(seen.get(), Some(Mode::Continuous));
}
