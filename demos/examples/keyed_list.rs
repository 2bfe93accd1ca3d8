// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Keyed list.
//!
//! Children are paired by position. This shows what that means for a reordered list,
//! with and without keys, by printing each pass's commit report and adapter calls.
//!
//! Run:
//! - `cargo run -p understory_demos --example keyed_list`

use understory_fiber::{Element, MemoryHost, Root};
use understory_scheduler::ManualClock;

fn list(items: &[&'static str], keyed: bool) -> Element {
    Element::host("ul").children(items.iter().map(|&item| {
        let li = Element::host("li").child(item);
        if keyed { li.key(item) } else { li }
    }))
}

fn reorder(keyed: bool) {
    let mut host = MemoryHost::new();
    let container = host.create_container();
    let mut root = Root::new(host, container);
    let clock = ManualClock::new();

    root.render(list(&["A", "B", "C"], keyed));
    root.flush_until_idle(&clock).expect("memory host accepts every element");
    root.host_mut().take_ops();
    root.take_reports();

    root.render(list(&["C", "B", "A"], keyed));
    root.flush_until_idle(&clock).expect("memory host accepts every element");
    println!(
        "{} reorder -> {}",
        if keyed { "keyed" } else { "unkeyed" },
        root.host().render_to_string(container)
    );
    for report in root.take_reports() {
        println!("  {report:?}");
    }
    for op in root.host_mut().take_ops() {
        println!("    {op:?}");
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    tracing::info!("pairing is positional; keys only decide whether a slot matches");
    reorder(false);
    reorder(true);
}
