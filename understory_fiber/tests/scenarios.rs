// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! End-to-end behavior of roots driven through the in-memory host.

use std::cell::RefCell;
use std::rc::Rc;

use understory_fiber::{
    Callback, Cleanup, Component, Element, HostAdapter, HostOp, Hooks, Lane, MemoryHandle,
    MemoryHost, MemoryHostError, Props, Root, RootConfig, StateSetter, Transition, Value,
};
use understory_scheduler::{Flush, ManualClock, SchedulerConfig};

fn memory_root() -> (Root<MemoryHost>, MemoryHandle) {
    let mut host = MemoryHost::new();
    let container = host.create_container();
    (Root::new(host, container), container)
}

/// Shared slot a component publishes a handle into, so tests can drive it from outside.
type Stash<T> = Rc<RefCell<Option<T>>>;

fn stash<T>() -> Stash<T> {
    Rc::new(RefCell::new(None))
}

fn taken<T: Clone>(stash: &Stash<T>) -> T {
    stash.borrow().clone().expect("component rendered at least once")
}

#[test]
fn three_updates_commit_once() {
    let setter: Stash<StateSetter<i64>> = stash();
    let counter = {
        let setter = setter.clone();
        move |cx: &mut Hooks<'_>, _: &Props| {
            let (count, set_count) = cx.use_state(|| 0_i64);
            *setter.borrow_mut() = Some(set_count);
            Element::host("span").child(count)
        }
    };
    let (mut root, container) = memory_root();
    let clock = ManualClock::new();
    root.render(Element::component(Component::new(counter)));
    root.flush_until_idle(&clock).expect("no host errors");
    root.host_mut().take_ops();
    root.take_reports();

    let set_count = taken(&setter);
    for _ in 0..3 {
        set_count.update(|c| c + 1);
    }
    root.flush_until_idle(&clock).expect("no host errors");

    let reports = root.take_reports();
    assert_eq!(reports.len(), 1, "a single work-loop pass");
    assert_eq!(reports[0].updates, 1, "only the text changed");
    let ops = root.host_mut().take_ops();
    assert_eq!(ops.len(), 1, "one adapter call: {ops:?}");
    assert!(matches!(&ops[0], HostOp::UpdateText { text, .. } if text == "3"));
    assert_eq!(root.host().render_to_string(container), "<span>3</span>");
}

fn list(items: &[&'static str], keyed: bool) -> Element {
    Element::host("ul").children(items.iter().map(|&item| {
        let li = Element::host("li").prop("id", item).child(item);
        if keyed { li.key(item) } else { li }
    }))
}

#[test]
fn reordered_list_updates_in_place_without_moving_handles() {
    let (mut root, container) = memory_root();
    let clock = ManualClock::new();
    root.render(list(&["A", "B", "C"], false));
    root.flush_until_idle(&clock).expect("no host errors");
    let ul = root.host().children(container)[0];
    let before = root.host().children(ul).to_vec();
    root.host_mut().take_ops();
    root.take_reports();

    root.render(list(&["C", "B", "A"], false));
    root.flush_until_idle(&clock).expect("no host errors");

    let report = root.take_reports()[0];
    assert_eq!(
        (report.placements, report.updates, report.deletions),
        (0, 4, 0),
        "li and text at both ends are updated; the middle is unchanged"
    );
    assert_eq!(root.host().children(ul), before.as_slice(), "handles stay in their slots");
    assert_eq!(
        root.host().attr(before[0], "id"),
        Some(&Value::from("C")),
        "the first handle now shows the last item"
    );
    assert!(
        root.host()
            .ops()
            .iter()
            .all(|op| matches!(op, HostOp::SetProps { .. } | HostOp::UpdateText { .. })),
        "no attach, insert or detach"
    );
    assert_eq!(root.host().text_content(container), "CBA");
}

#[test]
fn reordered_keyed_list_is_still_paired_by_position() {
    let (mut root, container) = memory_root();
    let clock = ManualClock::new();
    root.render(list(&["A", "B", "C"], true));
    root.flush_until_idle(&clock).expect("no host errors");
    let ul = root.host().children(container)[0];
    let before = root.host().children(ul).to_vec();
    root.take_reports();

    root.render(list(&["C", "B", "A"], true));
    root.flush_until_idle(&clock).expect("no host errors");

    let report = root.take_reports()[0];
    assert_eq!(
        (report.placements, report.deletions),
        (4, 2),
        "keys differ at both ends, so both items and their text are created anew"
    );
    let after = root.host().children(ul).to_vec();
    assert_eq!(after[1], before[1], "B kept its position and handle");
    assert_eq!(root.host().text_content(container), "CBA");
}

#[test]
fn effect_reruns_only_when_deps_change() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let watcher = {
        let log = log.clone();
        move |cx: &mut Hooks<'_>, props: &Props| {
            let x = props.get("x").and_then(Value::as_int).unwrap_or_default();
            let log = log.clone();
            cx.use_effect(Some(vec![Value::from(x)]), move || {
                log.borrow_mut().push(format!("run {x}"));
                Cleanup::new(move || log.borrow_mut().push(format!("cleanup {x}")))
            });
            Element::text(format!("{x}"))
        }
    };
    let (mut root, _) = memory_root();
    let clock = ManualClock::new();
    let view = |x: i64| Element::component(Component::new(watcher.clone())).prop("x", x);

    root.render(view(1));
    root.flush_until_idle(&clock).expect("no host errors");
    root.render(view(1));
    root.flush_until_idle(&clock).expect("no host errors");
    assert_eq!(*log.borrow(), ["run 1"], "same deps: neither cleanup nor callback");

    root.render(view(2));
    root.flush_until_idle(&clock).expect("no host errors");
    assert_eq!(*log.borrow(), ["run 1", "cleanup 1", "run 2"]);
}

#[test]
fn transition_commits_after_the_urgent_input() {
    type Handles = (StateSetter<String>, Transition, StateSetter<usize>);
    let handles: Stash<Handles> = stash();
    let app = {
        let handles = handles.clone();
        move |cx: &mut Hooks<'_>, _: &Props| {
            let (input, set_input) = cx.use_state(String::new);
            let (count, set_count) = cx.use_state(|| 0_usize);
            let (pending, transition) = cx.use_transition();
            *handles.borrow_mut() = Some((set_input, transition, set_count));
            Element::host("div").child(vec![
                Element::host("input").prop("value", input).prop("pending", pending),
                Element::host("ul")
                    .children((0..count).map(|i| Element::host("li").key(i).child(i))),
            ])
        }
    };

    let mut host = MemoryHost::new();
    let container = host.create_container();
    let config = RootConfig {
        scheduler: SchedulerConfig::with_time_slice(0),
        ..RootConfig::default()
    };
    let mut root = Root::with_config(host, container, config);
    let clock = ManualClock::new();
    root.render(Element::component(Component::new(app)));
    root.flush_until_idle(&clock).expect("no host errors");
    root.take_reports();

    let (set_input, transition, set_count) = taken(&handles);
    transition.start(|| set_count.set(2_000));
    set_input.set("h".to_owned());

    let first = root.flush(&clock).expect("no host errors");
    assert_eq!(first, Flush::Yielded { remaining: 1 }, "the transition waits for the next flush");
    let input = root
        .host()
        .find_by_attr(container, "value", &Value::from("h"))
        .expect("urgent input committed first");
    assert_eq!(root.host().attr(input, "pending"), Some(&Value::Bool(true)));
    let ul = root.host().children(root.host().children(container)[0])[1];
    assert!(root.host().children(ul).is_empty(), "large list not committed yet");

    root.flush_until_idle(&clock).expect("no host errors");
    assert_eq!(root.host().children(ul).len(), 2_000);
    assert_eq!(root.host().attr(input, "pending"), Some(&Value::Bool(false)));
    let lanes: Vec<_> = root.take_reports().iter().map(|r| r.lane).collect();
    assert_eq!(lanes, [Lane::Immediate, Lane::Transition]);
}

#[test]
fn immediate_root_overtakes_a_queued_transition() {
    let (mut root, container) = memory_root();
    let clock = ManualClock::new();
    root.render_with_lane(Element::text("slow"), Lane::Transition);
    root.render_with_lane(Element::text("fast"), Lane::Immediate);

    root.flush_until_idle(&clock).expect("no host errors");
    let lanes: Vec<_> = root.take_reports().iter().map(|r| r.lane).collect();
    assert_eq!(lanes, [Lane::Immediate, Lane::Transition]);
    assert_eq!(root.host().text_content(container), "slow", "transition committed last");
}

#[test]
fn unchanged_pass_is_a_no_op() {
    fn greeting(cx: &mut Hooks<'_>, props: &Props) -> Element {
        let (name, _) = cx.use_state(|| "world");
        Element::host("h1")
            .prop("class", props.get("class").cloned().unwrap_or(Value::Null))
            .child(("hello ", name))
    }
    let (mut root, _) = memory_root();
    let clock = ManualClock::new();
    root.render(Element::component(Component::new(greeting)).prop("class", "big"));
    root.flush_until_idle(&clock).expect("no host errors");
    root.host_mut().take_ops();
    root.take_reports();

    root.session().request_update(Lane::Immediate);
    root.flush_until_idle(&clock).expect("no host errors");
    let reports = root.take_reports();
    assert_eq!(reports.len(), 1);
    assert!(reports[0].is_empty(), "no tags: {:?}", reports[0]);
    assert!(root.host().ops().is_empty(), "no adapter calls");
}

#[test]
fn state_and_handles_survive_matching_passes() {
    let setter: Stash<StateSetter<u32>> = stash();
    let item = {
        let setter = setter.clone();
        move |cx: &mut Hooks<'_>, _: &Props| {
            let (clicks, set_clicks) = cx.use_state(|| 0_u32);
            *setter.borrow_mut() = Some(set_clicks);
            Element::host("button").child(clicks)
        }
    };
    let (mut root, container) = memory_root();
    let clock = ManualClock::new();
    let view = |title: &'static str| {
        Element::host("section")
            .prop("title", title)
            .child(Element::component(Component::new(item.clone())))
    };
    root.render(view("a"));
    root.flush_until_idle(&clock).expect("no host errors");
    taken(&setter).set(7);
    root.flush_until_idle(&clock).expect("no host errors");
    let section = root.host().children(container)[0];
    let button = root.host().children(section)[0];
    root.host_mut().take_ops();

    root.render(view("b"));
    root.flush_until_idle(&clock).expect("no host errors");
    assert_eq!(root.host().children(container), [section], "section handle reused");
    assert_eq!(root.host().children(section), [button], "button handle reused");
    assert_eq!(root.host().text_content(container), "7", "state was not reinitialized");
    assert!(
        !root
            .host()
            .ops()
            .iter()
            .any(|op| matches!(op, HostOp::Create { .. } | HostOp::CreateText { .. })),
        "nothing was recreated"
    );
}

/// Records adapter calls into a log shared with effect cleanups.
#[derive(Debug)]
struct Journal {
    inner: MemoryHost,
    log: Rc<RefCell<Vec<String>>>,
}

impl HostAdapter for Journal {
    type Handle = MemoryHandle;
    type Error = MemoryHostError;

    fn create_handle(&mut self, tag: &str) -> Result<MemoryHandle, MemoryHostError> {
        self.log.borrow_mut().push(format!("create {tag}"));
        self.inner.create_handle(tag)
    }

    fn create_text_handle(&mut self, text: &str) -> Result<MemoryHandle, MemoryHostError> {
        self.inner.create_text_handle(text)
    }

    fn update_text_handle(
        &mut self,
        handle: &MemoryHandle,
        text: &str,
    ) -> Result<(), MemoryHostError> {
        self.inner.update_text_handle(handle, text)
    }

    fn apply_props_diff(
        &mut self,
        handle: &MemoryHandle,
        prev: &Props,
        next: &Props,
    ) -> Result<(), MemoryHostError> {
        self.inner.apply_props_diff(handle, prev, next)
    }

    fn attach(
        &mut self,
        parent: &MemoryHandle,
        handle: &MemoryHandle,
    ) -> Result<(), MemoryHostError> {
        self.log.borrow_mut().push("attach".to_owned());
        self.inner.attach(parent, handle)
    }

    fn insert_before(
        &mut self,
        parent: &MemoryHandle,
        handle: &MemoryHandle,
        anchor: &MemoryHandle,
    ) -> Result<(), MemoryHostError> {
        self.log.borrow_mut().push("insert".to_owned());
        self.inner.insert_before(parent, handle, anchor)
    }

    fn detach(
        &mut self,
        parent: &MemoryHandle,
        handle: &MemoryHandle,
    ) -> Result<(), MemoryHostError> {
        self.log.borrow_mut().push("detach".to_owned());
        self.inner.detach(parent, handle)
    }

    fn release(&mut self, handle: &MemoryHandle) -> Result<(), MemoryHostError> {
        self.inner.release(handle)
    }
}

fn journal_root(log: &Rc<RefCell<Vec<String>>>) -> Root<Journal> {
    let mut inner = MemoryHost::new();
    let container = inner.create_container();
    let host = Journal {
        inner,
        log: log.clone(),
    };
    Root::new(host, container)
}

#[test]
fn replaced_subtree_cleans_up_once_before_the_replacement_is_attached() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let widget = {
        let log = log.clone();
        move |cx: &mut Hooks<'_>, _: &Props| {
            let log = log.clone();
            cx.use_effect(None, move || {
                Cleanup::new(move || log.borrow_mut().push("cleanup".to_owned()))
            });
            Element::host("old")
        }
    };
    let mut root = journal_root(&log);
    let clock = ManualClock::new();
    root.render(Element::host("main").child(Element::component(Component::new(widget))));
    root.flush_until_idle(&clock).expect("no host errors");
    log.borrow_mut().clear();

    root.render(Element::host("main").child(Element::host("new")));
    root.flush_until_idle(&clock).expect("no host errors");
    assert_eq!(
        *log.borrow(),
        ["create new", "cleanup", "detach", "attach"],
        "cleanup runs once, before the new node is attached"
    );
}

#[test]
fn setters_of_unmounted_components_are_dropped() {
    let setter: Stash<StateSetter<i64>> = stash();
    let child = {
        let setter = setter.clone();
        move |cx: &mut Hooks<'_>, _: &Props| {
            let (value, set_value) = cx.use_state(|| 1_i64);
            *setter.borrow_mut() = Some(set_value);
            value
        }
    };
    let (mut root, container) = memory_root();
    let clock = ManualClock::new();
    root.render(Element::component(Component::new(child)));
    root.flush_until_idle(&clock).expect("no host errors");
    root.unmount();
    root.flush_until_idle(&clock).expect("no host errors");

    let set_value = taken(&setter);
    set_value.set(2);
    assert!(!set_value.is_mounted());
    assert!(!root.needs_flush(), "nothing was requested");
    assert_eq!(root.host().render_to_string(container), "");
}

#[test]
fn host_callbacks_can_update_state() {
    fn toggle(cx: &mut Hooks<'_>, _: &Props) -> Element {
        let (on, set_on) = cx.use_state(|| false);
        Element::host("button")
            .prop("id", "toggle")
            .prop("onclick", Callback::new(move || set_on.update(|on| !on)))
            .child(if on { "on" } else { "off" })
    }
    let (mut root, container) = memory_root();
    let clock = ManualClock::new();
    root.render(Element::component(Component::new(toggle)));
    root.flush_until_idle(&clock).expect("no host errors");

    let button = root
        .host()
        .find_by_attr(container, "id", &Value::from("toggle"))
        .expect("button mounted");
    assert_eq!(root.host().dispatch(button, "onclick"), Ok(true));
    assert!(root.needs_flush(), "the click requested a pass");
    root.flush_until_idle(&clock).expect("no host errors");
    assert_eq!(root.host().text_content(container), "on");
}

#[test]
fn changed_key_cleans_up_once_before_the_replacement_is_attached() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let item = {
        let log = log.clone();
        move |cx: &mut Hooks<'_>, props: &Props| {
            let name = props.get("name").and_then(Value::as_str).unwrap_or_default();
            let name = name.to_owned();
            let log = log.clone();
            cx.use_effect(Some(vec![]), move || {
                Cleanup::new(move || log.borrow_mut().push(format!("cleanup {name}")))
            });
            Element::host("item")
        }
    };
    let view = |key: &'static str| {
        Element::host("main").child(
            Element::component(Component::new(item.clone()))
                .key(key)
                .prop("name", key),
        )
    };
    let mut root = journal_root(&log);
    let clock = ManualClock::new();
    root.render(view("a"));
    root.flush_until_idle(&clock).expect("no host errors");
    log.borrow_mut().clear();

    root.render(view("b"));
    root.flush_until_idle(&clock).expect("no host errors");
    assert_eq!(
        *log.borrow(),
        ["create item", "cleanup a", "detach", "attach"],
        "same type, new key: the old item is cleaned up before its replacement is attached"
    );

    root.unmount();
    root.flush_until_idle(&clock).expect("no host errors");
    let cleanups: Vec<_> = log
        .borrow()
        .iter()
        .filter(|e| e.starts_with("cleanup"))
        .cloned()
        .collect();
    assert_eq!(cleanups, ["cleanup a", "cleanup b"], "each instance cleaned up exactly once");
}

#[test]
fn failed_commit_remounts_on_the_next_render() {
    let view = |inner: Element| Element::host("div").child(inner);
    let (mut root, container) = memory_root();
    let clock = ManualClock::new();
    root.render(view(Element::host("x").child("keep")));
    root.flush_until_idle(&clock).expect("no host errors");

    root.host_mut().fail_next_placement();
    root.render(view(Element::host("y")));
    let err = root.flush_until_idle(&clock).expect_err("placing <y> is refused");
    assert_eq!(err.phase(), understory_fiber::Phase::Commit);
    assert_eq!(root.host().render_to_string(container), "", "nothing stale is left behind");
    assert_eq!(root.live_fibers(), 0);

    root.render(view(Element::host("x").child("keep")));
    root.flush_until_idle(&clock).expect("no host errors");
    assert_eq!(root.host().render_to_string(container), "<div><x>keep</x></div>");
}
