// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Counter.
//!
//! Mount a component, click its button a few times through the in-memory host, and print
//! the adapter calls each pass produced.
//!
//! Run:
//! - `RUST_LOG=understory_fiber=debug cargo run -p understory_demos --example counter`

use understory_fiber::{Callback, Component, Element, Hooks, MemoryHost, Props, Root, Value};
use understory_scheduler::StdClock;

fn counter(cx: &mut Hooks<'_>, props: &Props) -> Element {
    let step = props.get("step").and_then(Value::as_int).unwrap_or(1);
    let (count, set_count) = cx.use_state(|| 0_i64);
    Element::host("div").child((
        Element::host("span").child(count),
        Element::host("button")
            .prop("id", "increment")
            .prop("onclick", Callback::new(move || set_count.update(move |c| c + step)))
            .child("+"),
    ))
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let mut host = MemoryHost::new();
    let container = host.create_container();
    let mut root = Root::new(host, container);
    let clock = StdClock::new();

    root.render(Element::component(Component::new(counter).named("Counter")).prop("step", 2));
    root.flush_until_idle(&clock).expect("memory host accepts every element");
    println!("mounted: {}", root.host().render_to_string(container));
    for op in root.host_mut().take_ops() {
        println!("  {op:?}");
    }

    let button = root
        .host()
        .find_by_attr(container, "id", &Value::from("increment"))
        .expect("button is mounted");
    for click in 1..=3 {
        root.host().dispatch(button, "onclick").expect("button is live");
        root.flush_until_idle(&clock).expect("memory host accepts every element");
        println!("click {click}: {}", root.host().render_to_string(container));
        for op in root.host_mut().take_ops() {
            println!("  {op:?}");
        }
    }
    tracing::info!(commits = root.commit_count(), "done");
}
