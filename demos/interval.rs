//! Interval Example - a continuous container fed by a timer thread
//!
//! A ticker component starts a background thread from an effect. The thread
//! pushes updates through a remote setter; the effect's cleanup stops it when
//! the container is unmounted.
//!
//! Run with: RUST_LOG=debug cargo run --example interval

use std::rc::Rc;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use spark_reconciler::{
    Mode, RenderOptions, Result, Value, cleanup, create_element, render, use_effect,
    use_environment, use_state,
};

const TICKS: i64 = 5;

fn ticker(props: &Value) -> Result<Value> {
    let period = Duration::from_millis(props["period_ms"].as_i64().unwrap_or(100) as u64);
    let (ticks, set_ticks) = use_state(0_i64)?;
    let environment = use_environment()?;

    use_effect(period, move || {
        let remote = set_ticks.remote();
        let running = Arc::new(AtomicBool::new(true));
        let flag = running.clone();
        thread::spawn(move || {
            while flag.load(Ordering::Relaxed) && remote.update(|n| n + 1) {
                thread::sleep(period);
            }
        });
        cleanup(move || running.store(false, Ordering::Relaxed))
    })?;

    Ok(Value::map([
        ("ticks", Value::from(ticks)),
        ("continuous", Value::from(environment.mode == Mode::Continuous)),
    ]))
}

fn main() -> Result<()> {
    env_logger::init();

    println!("=== spark-reconciler Interval Example ===\n");

    let options = RenderOptions::new().with_mode(Mode::Continuous);
    let container = Rc::new(render(
        create_element(ticker, Value::map([("period_ms", 50)])),
        options,
    ));

    let handle = container.remote();
    let observer = Rc::downgrade(&container);
    container.on_idle(move || {
        let Some(container) = observer.upgrade() else { return };
        let state = container.state();
        println!("tick: {state}");
        if state["ticks"].as_i64().is_some_and(|ticks| ticks >= TICKS) {
            handle.stop();
        }
    });

    container.run()?;
    println!("\nStopped at {}", container.state());
    println!("\n=== Done ===");
    Ok(())
}
