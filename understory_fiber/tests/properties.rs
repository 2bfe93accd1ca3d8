// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Property tests for update ordering and dependency comparison.

use std::cell::RefCell;
use std::rc::Rc;

use proptest::prelude::*;
use understory_fiber::{
    Component, Element, Hooks, Lane, MemoryHandle, MemoryHost, Props, Root, StateSetter, Value,
    deps_changed,
};
use understory_scheduler::ManualClock;

#[derive(Clone, Copy, Debug)]
enum Op {
    Add(i64),
    Double,
    Set(i64),
}

impl Op {
    fn apply(self, n: i64) -> i64 {
        match self {
            Self::Add(k) => n.wrapping_add(k),
            Self::Double => n.wrapping_mul(2),
            Self::Set(k) => k,
        }
    }

    fn send(self, setter: &StateSetter<i64>) {
        match self {
            Self::Set(k) => setter.set(k),
            op => setter.update(move |n| op.apply(*n)),
        }
    }
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (-100_i64..100).prop_map(Op::Add),
        Just(Op::Double),
        (-1_000_i64..1_000).prop_map(Op::Set),
    ]
}

fn arb_lane() -> impl Strategy<Value = Lane> {
    prop::sample::select(Lane::ALL.to_vec())
}

fn arb_deps() -> impl Strategy<Value = Option<Vec<i64>>> {
    prop::option::of(prop::collection::vec(0_i64..3, 0..4))
}

struct Counter {
    root: Root<MemoryHost>,
    container: MemoryHandle,
    setter: StateSetter<i64>,
}

fn mount_counter() -> Counter {
    let published: Rc<RefCell<Option<StateSetter<i64>>>> = Rc::new(RefCell::new(None));
    let counter = {
        let published = published.clone();
        move |cx: &mut Hooks<'_>, _: &Props| {
            let (n, set_n) = cx.use_state(|| 0_i64);
            *published.borrow_mut() = Some(set_n);
            Element::host("output").child(n)
        }
    };
    let mut host = MemoryHost::new();
    let container = host.create_container();
    let mut root = Root::new(host, container);
    root.render(Element::component(Component::new(counter)));
    root.flush_until_idle(&ManualClock::new()).expect("memory host does not fail");
    let setter = published.borrow().clone().expect("mounted");
    Counter {
        root,
        container,
        setter,
    }
}

proptest! {
    #[test]
    fn batched_updates_fold_in_order(ops in prop::collection::vec(arb_op(), 1..20)) {
        let Counter { mut root, container, setter } = mount_counter();
        let before = root.commit_count();
        for op in &ops {
            op.send(&setter);
        }
        root.flush_until_idle(&ManualClock::new()).expect("memory host does not fail");

        let expected = ops.iter().fold(0_i64, |n, op| op.apply(n));
        prop_assert_eq!(root.host().text_content(container), expected.to_string());
        prop_assert_eq!(root.commit_count(), before + 1);
    }

    #[test]
    fn lane_tagged_updates_settle_on_the_sequential_fold(
        ops in prop::collection::vec((arb_op(), arb_lane()), 1..20)
    ) {
        let Counter { mut root, container, setter } = mount_counter();
        let session = root.session();
        for &(op, lane) in &ops {
            session.run_under_lane(lane, || op.send(&setter));
        }
        let clock = ManualClock::new();
        root.flush_until_idle(&clock).expect("memory host does not fail");

        let expected = ops.iter().fold(0_i64, |n, (op, _)| op.apply(n));
        prop_assert_eq!(root.host().text_content(container), expected.to_string());
        prop_assert!(!root.needs_flush());
    }

    #[test]
    fn deps_changed_matches_list_equality(prev in arb_deps(), next in arb_deps()) {
        let to_values = |deps: &Option<Vec<i64>>| {
            deps.as_ref().map(|d| d.iter().copied().map(Value::from).collect::<Vec<_>>())
        };
        let (prev_values, next_values) = (to_values(&prev), to_values(&next));
        let expected = match (&prev, &next) {
            (Some(a), Some(b)) => a != b,
            _ => true,
        };
        prop_assert_eq!(
            deps_changed(prev_values.as_deref(), next_values.as_deref()),
            expected
        );
    }
}
