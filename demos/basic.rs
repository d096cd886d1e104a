//! Basic Example - components, state, effects and keyed lists
//!
//! This example demonstrates basic usage of spark-reconciler:
//! - Nesting components inside plain data
//! - A list keyed by item ids
//! - State updated from an effect, and an idle listener
//!
//! Run with: RUST_LOG=debug cargo run --example basic

use std::cell::Cell;
use std::rc::Rc;

use spark_reconciler::{
    RenderOptions, Result, Value, cleanup, create_element, render, use_effect, use_state,
};

/// One row of the list. Reports its own teardown.
fn task(props: &Value) -> Result<Value> {
    let title = props["title"].clone();
    let id = props["key"].clone();
    use_effect(id.clone(), move || {
        cleanup(move || println!("  (task {id} removed)"))
    })?;
    Ok(Value::map([("title", title), ("done", Value::from(false))]))
}

fn summary(props: &Value) -> Result<Value> {
    let total = props["total"].as_i64().unwrap_or(0);
    Ok(Value::from(format!("{total} task(s)")))
}

fn app(_props: &Value) -> Result<Value> {
    let (tasks, set_tasks) = use_state(vec![("a", "write docs"), ("b", "fix bug"), ("c", "ship")])?;

    // Finish "b" right after mounting.
    use_effect((), move || {
        set_tasks.update(|tasks| tasks.iter().copied().filter(|&(id, _)| id != "b").collect())
    })?;

    let items: Value = tasks
        .iter()
        .map(|&(id, title)| create_element(task, Value::map([("key", id), ("title", title)])))
        .collect();

    Ok(Value::map([
        ("summary", Value::from(create_element(summary, Value::map([("total", tasks.len())])))),
        ("tasks", items),
    ]))
}

fn main() -> Result<()> {
    env_logger::init();

    println!("=== spark-reconciler Basic Example ===\n");

    let container = render(create_element(app, Value::Null), RenderOptions::default());
    let drains = Rc::new(Cell::new(0));
    let counter = drains.clone();
    container.on_idle(move || counter.set(counter.get() + 1));

    container.run_until_idle()?;

    println!("\nState after {} drain(s):", drains.get());
    println!("{}", container.state());

    println!("\nInstances:");
    for info in container.inspect() {
        println!(
            "  {:<12} depth={} runs={} hooks={}",
            info.path.join("/"),
            info.depth,
            info.execution_count,
            info.hook_count
        );
    }

    container.unmount();
    println!("\n=== Done ===");
    Ok(())
}
