//! End-to-end rendering scenarios.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use serde_json::json;
use spark_reconciler::{
    Container, RenderOptions, Result, Setter, Value, cleanup, create_element, render, use_effect,
    use_named_singleton, use_state,
};

fn setup() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn mount(element: spark_reconciler::Element) -> Container {
    let container = render(element, RenderOptions::default());
    assert!(container.run_until_idle().is_ok());
    container
}

// =============================================================================
// Static trees
// =============================================================================

fn leaf(_props: &Value) -> Result<Value> {
    Ok(Value::map([("value", 42)]))
}

fn with_child(_props: &Value) -> Result<Value> {
    Ok(Value::map([
        ("count", Value::from(0)),
        ("child", Value::from(create_element(leaf, Value::Null))),
    ]))
}

#[test]
fn test_nested_child_state_is_merged() {
    setup();
    let container = mount(create_element(with_child, Value::Null));
    assert_eq!(container.state().to_json(), json!({"count": 0, "child": {"value": 42}}));
    assert_eq!(container.instance_count(), 2);
}

#[test]
fn test_scalar_root() {
    fn answer(_props: &Value) -> Result<Value> {
        Ok(Value::from("forty-two"))
    }
    let container = mount(create_element(answer, Value::Null));
    assert_eq!(container.state(), Value::from("forty-two"));
}

#[test]
fn test_props_reach_the_component() {
    fn greet(props: &Value) -> Result<Value> {
        let name = props["name"].as_str().unwrap_or("nobody");
        Ok(Value::from(format!("hello {name}")))
    }
    let container = mount(create_element(greet, Value::map([("name", "ada")])));
    assert_eq!(container.state(), Value::from("hello ada"));
}

// =============================================================================
// State changes
// =============================================================================

#[test]
fn test_external_update_settles_with_one_idle() {
    setup();
    let setter: Rc<RefCell<Option<Setter<i64>>>> = Rc::default();
    let captured = setter.clone();
    let app = move |_props: &Value| -> Result<Value> {
        let (value, set_value) = use_state(0_i64)?;
        *captured.borrow_mut() = Some(set_value);
        Ok(Value::map([("value", value)]))
    };

    let container = mount(create_element(app, Value::Null));
    let idle = Rc::new(Cell::new(0));
    let counter = idle.clone();
    container.on_idle(move || counter.set(counter.get() + 1));
    assert_eq!(container.state()["value"], Value::from(0));

    let Some(set_value) = setter.borrow().clone() else {
        panic!("component never ran");
    };
    set_value.update(|v| v + 1);
    assert!(container.has_pending_work());
    assert!(container.run_until_idle().is_ok());

    assert_eq!(container.state()["value"], Value::from(1));
    assert_eq!(idle.get(), 1);
}

#[test]
fn test_effect_driven_state_converges() {
    fn counter(_props: &Value) -> Result<Value> {
        let (count, set_count) = use_state(0_i64)?;
        use_effect((), move || set_count.set(1))?;
        Ok(Value::from(count))
    }

    let container = render(create_element(counter, Value::Null), RenderOptions::default());
    let idle = Rc::new(Cell::new(0));
    let counter_calls = idle.clone();
    container.on_idle(move || counter_calls.set(counter_calls.get() + 1));

    assert!(container.run_until_idle().is_ok());
    assert_eq!(container.state(), Value::from(1));
    assert_eq!(idle.get(), 1);
    assert_eq!(container.inspect()[0].execution_count, 2);
}

// =============================================================================
// Keyed lists
// =============================================================================

#[test]
fn test_removed_list_item_is_torn_down() {
    setup();
    let removed: Rc<RefCell<Vec<String>>> = Rc::default();
    let setter: Rc<RefCell<Option<Setter<Vec<&'static str>>>>> = Rc::default();

    let log = removed.clone();
    let captured = setter.clone();
    let list = move |_props: &Value| -> Result<Value> {
        let (keys, set_keys) = use_state(vec!["a", "b", "c"])?;
        *captured.borrow_mut() = Some(set_keys);
        Ok(keys
            .iter()
            .map(|&key| {
                let log = log.clone();
                let item = move |props: &Value| -> Result<Value> {
                    let name = props["key"].as_str().unwrap_or_default().to_string();
                    let log = log.clone();
                    use_effect((), move || cleanup(move || log.borrow_mut().push(name)))?;
                    Ok(Value::map([("key", props["key"].clone())]))
                };
                create_element(item, Value::map([("key", key)]))
            })
            .collect())
    };

    let container = mount(create_element(list, Value::Null));
    assert_eq!(
        container.state().to_json(),
        json!([{"key": "a"}, {"key": "b"}, {"key": "c"}])
    );
    let paths: Vec<Vec<String>> = container.inspect().into_iter().map(|info| info.path).collect();
    assert_eq!(paths[1], vec!["", "a"]);

    let Some(set_keys) = setter.borrow().clone() else {
        panic!("component never ran");
    };
    set_keys.set(vec!["a", "c"]);
    assert!(container.run_until_idle().is_ok());

    assert_eq!(*removed.borrow(), vec!["b".to_string()]);
    assert_eq!(container.state().to_json(), json!([{"key": "a"}, {"key": "c"}]));
    assert_eq!(container.instance_count(), 3);

    // Retained items keep their instance and do not re-run.
    let runs: Vec<u64> = container.inspect().iter().skip(1).map(|i| i.execution_count).collect();
    assert_eq!(runs, vec![1, 1]);
}

#[test]
fn test_removed_child_tears_down_its_descendants() {
    setup();
    let order: Rc<RefCell<Vec<&'static str>>> = Rc::default();
    let setter: Rc<RefCell<Option<Setter<bool>>>> = Rc::default();

    let log = order.clone();
    let inner = move |_props: &Value| -> Result<Value> {
        let log = log.clone();
        use_effect((), move || cleanup(move || log.borrow_mut().push("inner")))?;
        Ok(Value::from("leaf"))
    };
    let log = order.clone();
    let outer = move |_props: &Value| -> Result<Value> {
        let log = log.clone();
        use_effect((), move || cleanup(move || log.borrow_mut().push("outer")))?;
        Ok(Value::map([("inner", create_element(inner.clone(), Value::Null))]))
    };
    let captured = setter.clone();
    let app = move |_props: &Value| -> Result<Value> {
        let (shown, set_shown) = use_state(true)?;
        *captured.borrow_mut() = Some(set_shown);
        let child = shown.then(|| create_element(outer.clone(), Value::Null));
        Ok(Value::map([("outer", Value::from(child))]))
    };

    let container = mount(create_element(app, Value::Null));
    assert_eq!(container.instance_count(), 3);
    assert_eq!(container.state().to_json(), json!({"outer": {"inner": "leaf"}}));

    let Some(set_shown) = setter.borrow().clone() else {
        panic!("component never ran");
    };
    set_shown.set(false);
    assert!(container.run_until_idle().is_ok());

    assert_eq!(*order.borrow(), vec!["inner", "outer"]);
    assert_eq!(container.instance_count(), 1);
    assert_eq!(container.state().to_json(), json!({"outer": null}));
}

#[test]
fn test_duplicate_key_resolves_to_null() {
    setup();
    fn echo(props: &Value) -> Result<Value> {
        Ok(props.clone())
    }

    fn pair(_props: &Value) -> Result<Value> {
        Ok(Value::list([
            create_element(echo, 1).with_key("same"),
            create_element(echo, 2).with_key("same"),
        ]))
    }

    let container = mount(create_element(pair, Value::Null));
    assert_eq!(container.instance_count(), 2);
    assert_eq!(container.state().to_json(), json!([1, null]));
}

// =============================================================================
// Singletons
// =============================================================================

#[test]
fn test_named_singleton_shared_by_siblings() {
    setup();
    let created = Rc::new(Cell::new(0));
    let seen: Rc<RefCell<Vec<Rc<String>>>> = Rc::default();

    let (factory_calls, observed) = (created.clone(), seen.clone());
    let sibling = move |_props: &Value| -> Result<Value> {
        let calls = factory_calls.clone();
        let cache = use_named_singleton("cache", move || {
            calls.set(calls.get() + 1);
            String::from("shared")
        })?;
        observed.borrow_mut().push(cache.clone());
        Ok(Value::from(cache.as_str()))
    };

    let make = sibling.clone();
    let pair = move |_props: &Value| -> Result<Value> {
        Ok(Value::map([
            ("left", create_element(make.clone(), Value::Null)),
            ("right", create_element(make.clone(), Value::Null)),
        ]))
    };

    let container = mount(create_element(pair, Value::Null));
    assert_eq!(created.get(), 1);
    assert_eq!(container.state().to_json(), json!({"left": "shared", "right": "shared"}));

    let seen = seen.borrow();
    assert_eq!(seen.len(), 2);
    assert!(Rc::ptr_eq(&seen[0], &seen[1]));

    let from_container = container.named_singleton("cache", || String::from("never"));
    assert!(from_container.is_ok_and(|value| Rc::ptr_eq(&value, &seen[0])));
}
