// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Transition.
//!
//! Typing into an input while a large filtered list re-renders in a transition. The input
//! commits on the first flush; the list follows on a later one.
//!
//! Run:
//! - `RUST_LOG=understory_fiber=debug cargo run -p understory_demos --example transition`

use std::cell::RefCell;
use std::rc::Rc;

use understory_fiber::{
    Component, Element, Hooks, MemoryHost, Props, Root, RootConfig, StateSetter, Transition, Value,
};
use understory_scheduler::{Flush, SchedulerConfig, StdClock};

const ITEMS: usize = 20_000;

type Controls = (StateSetter<String>, StateSetter<String>, Transition);

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let controls: Rc<RefCell<Option<Controls>>> = Rc::new(RefCell::new(None));
    let app = {
        let controls = controls.clone();
        move |cx: &mut Hooks<'_>, _: &Props| {
            let (input, set_input) = cx.use_state(String::new);
            let (query, set_query) = cx.use_state(String::new);
            let (pending, transition) = cx.use_transition();
            *controls.borrow_mut() = Some((set_input, set_query, transition));

            let items = (0..ITEMS)
                .map(|i| format!("item {i}"))
                .filter(|label| label.contains(query.as_str()))
                .map(|label| Element::host("li").child(label));
            Element::host("main").child((
                Element::host("input")
                    .prop("id", "search")
                    .prop("value", input)
                    .prop("pending", pending),
                Element::host("ul").children(items),
            ))
        }
    };

    let mut host = MemoryHost::new();
    let container = host.create_container();
    let config = RootConfig {
        scheduler: SchedulerConfig::with_time_slice(0),
        ..RootConfig::default()
    };
    let mut root = Root::with_config(host, container, config);
    let clock = StdClock::new();
    root.render(Element::component(Component::new(app).named("App")));
    root.flush_until_idle(&clock).expect("memory host accepts every element");
    root.take_reports();

    let (set_input, set_query, transition) = controls
        .borrow()
        .clone()
        .expect("app is mounted");
    set_input.set("7".to_owned());
    transition.start(|| set_query.set("7".to_owned()));

    let input = root
        .host()
        .find_by_attr(container, "id", &Value::from("search"))
        .expect("input is mounted");
    tracing::info!(items = ITEMS, "typing while the list filters in a transition");
    let mut flush = 0;
    while root.needs_flush() {
        flush += 1;
        let outcome = root.flush(&clock).expect("memory host accepts every element");
        let list = root.host().children(root.host().children(container)[0])[1];
        println!(
            "flush {flush}: value={:?} pending={:?} items={} ({outcome:?})",
            root.host().attr(input, "value"),
            root.host().attr(input, "pending"),
            root.host().children(list).len(),
        );
        if outcome == Flush::Idle {
            break;
        }
    }
    for report in root.take_reports() {
        println!("  {report:?}");
    }
}
