// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::cell::RefCell;
use std::rc::Rc;

use criterion::{BatchSize, Criterion, Throughput, black_box, criterion_group, criterion_main};
use understory_fiber::{
    Component, Element, Hooks, Lane, MemoryHost, Props, Root, RootConfig, StateSetter,
};
use understory_scheduler::{ManualClock, SchedulerConfig};

fn rows(n: usize, offset: usize, keyed: bool) -> Element {
    Element::host("ul").children((0..n).map(|i| {
        let row = Element::host("li")
            .prop("class", if (i + offset) % 2 == 0 { "even" } else { "odd" })
            .child(i + offset);
        if keyed { row.key(i) } else { row }
    }))
}

fn mounted(element: Element) -> Root<MemoryHost> {
    let mut host = MemoryHost::new();
    let container = host.create_container();
    let mut root = Root::new(host, container);
    root.render(element);
    root.flush_until_idle(&ManualClock::new()).unwrap();
    root.host_mut().take_ops();
    root
}

fn bench_mount(c: &mut Criterion) {
    let mut group = c.benchmark_group("mount");
    for &n in &[100usize, 1_000, 10_000] {
        group.throughput(Throughput::Elements(n as u64));
        group.bench_function(format!("list_n{}", n), |b| {
            b.iter_batched(
                || {
                    let mut host = MemoryHost::new();
                    let container = host.create_container();
                    (Root::new(host, container), rows(n, 0, true))
                },
                |(mut root, element)| {
                    root.render(element);
                    root.flush_until_idle(&ManualClock::new()).unwrap();
                    black_box(root.host().live_nodes());
                },
                BatchSize::LargeInput,
            )
        });
    }
    group.finish();
}

fn bench_update(c: &mut Criterion) {
    let mut group = c.benchmark_group("update");
    for &n in &[100usize, 1_000, 10_000] {
        group.throughput(Throughput::Elements(n as u64));
        group.bench_function(format!("shift_n{}", n), |b| {
            b.iter_batched(
                || (mounted(rows(n, 0, false)), rows(n, 1, false)),
                |(mut root, next)| {
                    root.render(next);
                    root.flush_until_idle(&ManualClock::new()).unwrap();
                    black_box(root.take_reports());
                },
                BatchSize::LargeInput,
            )
        });
        group.bench_function(format!("unchanged_n{}", n), |b| {
            b.iter_batched(
                || mounted(rows(n, 0, true)),
                |mut root| {
                    root.session().request_update(Lane::Immediate);
                    root.flush_until_idle(&ManualClock::new()).unwrap();
                    black_box(root.take_reports());
                },
                BatchSize::LargeInput,
            )
        });
    }
    group.finish();
}

type Setters = (StateSetter<u32>, StateSetter<usize>);

fn bench_lanes(c: &mut Criterion) {
    let mut group = c.benchmark_group("lanes");
    group.bench_function("urgent_over_transition_n5000", |b| {
        b.iter_batched(
            || {
                let setters: Rc<RefCell<Option<Setters>>> = Rc::new(RefCell::new(None));
                let app = {
                    let setters = setters.clone();
                    move |cx: &mut Hooks<'_>, _: &Props| {
                        let (ticks, set_ticks) = cx.use_state(|| 0_u32);
                        let (len, set_len) = cx.use_state(|| 0_usize);
                        *setters.borrow_mut() = Some((set_ticks, set_len));
                        Element::host("div")
                            .child((Element::host("b").child(ticks), rows(len, 0, true)))
                    }
                };
                let mut host = MemoryHost::new();
                let container = host.create_container();
                let config = RootConfig {
                    scheduler: SchedulerConfig::with_time_slice(0),
                    ..RootConfig::default()
                };
                let mut root = Root::with_config(host, container, config);
                root.render(Element::component(Component::new(app)));
                root.flush_until_idle(&ManualClock::new()).unwrap();
                let setters = setters.borrow().clone().unwrap();
                (root, setters)
            },
            |(mut root, (set_ticks, set_len))| {
                let session = root.session();
                session.run_under_lane(Lane::Transition, || set_len.set(5_000));
                for _ in 0..8 {
                    set_ticks.update(|t| t + 1);
                    root.flush(&ManualClock::new()).unwrap();
                }
                root.flush_until_idle(&ManualClock::new()).unwrap();
                black_box(root.commit_count());
            },
            BatchSize::LargeInput,
        )
    });
    group.finish();
}

criterion_group!(benches, bench_mount, bench_update, bench_lanes);
criterion_main!(benches);
