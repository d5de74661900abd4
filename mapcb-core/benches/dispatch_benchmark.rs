use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;
use std::sync::Once;

use mapcb_core::{
    BoundArgs, Classifier, CustomHandler, HandlerKind, HostEvent, InteractionState, Maps,
    MouseButton, PointerEvent,
};

static INIT: Once = Once::new();

fn init_tracing_once() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt().with_env_filter("warn").try_init();
    });
}

fn noop(name: &str) -> CustomHandler {
    CustomHandler::new(name, |_, _| Ok(()))
}

/// Parent map with `count` custom click callbacks and a temporary marker.
fn map_with_callbacks(count: usize) -> Maps {
    let m = Maps::builder().build();
    let click = m.cb().click();
    for i in 0..count {
        let _ = click.attach_custom(
            noop(&format!("handler{i}")),
            Classifier::default(),
            BoundArgs::new(),
        );
    }
    let _ = click.attach(HandlerKind::Mark, Classifier::default(), BoundArgs::new());
    m
}

fn bench_click_dispatch(c: &mut Criterion) {
    init_tracing_once();
    let mut group = c.benchmark_group("click_dispatch");

    for count in [1usize, 8, 64] {
        let m = map_with_callbacks(count);
        let state = InteractionState::idle();
        let event =
            HostEvent::ButtonPress(PointerEvent::press(m.axes(), (1.0, 2.0), MouseButton::LEFT));

        group.throughput(Throughput::Elements(count as u64 + 1));
        group.bench_with_input(BenchmarkId::from_parameter(count), &event, |b, event| {
            b.iter(|| black_box(m.handle_event(black_box(event), &state)));
        });
    }

    group.finish();
}

fn bench_forwarding(c: &mut Criterion) {
    init_tracing_once();
    let mut group = c.benchmark_group("shared_keypress");

    for peers in [2usize, 4, 8] {
        let maps: Vec<Maps> = (0..peers).map(|_| Maps::builder().build()).collect();
        for m in &maps {
            let _ = m
                .cb()
                .keypress()
                .attach_custom(noop("watch"), Classifier::key("a"), BoundArgs::new());
        }
        let rest: Vec<&Maps> = maps.iter().skip(1).collect();
        maps[0].cb().keypress().share(&rest);

        let state = InteractionState::idle();
        let event = HostEvent::key("a");

        group.throughput(Throughput::Elements(peers as u64));
        group.bench_with_input(BenchmarkId::from_parameter(peers), &event, |b, event| {
            b.iter(|| black_box(maps[0].handle_event(black_box(event), &state)));
        });
    }

    group.finish();
}

fn bench_attach_remove(c: &mut Criterion) {
    c.bench_function("attach_remove_mark", |b| {
        let m = Maps::builder().build();
        b.iter(|| {
            let click = m.cb().click();
            let attached = click.attach(HandlerKind::Mark, Classifier::default(), BoundArgs::new());
            if let Ok(id) = attached {
                black_box(click.remove_id(&id));
            }
        });
    });
}

criterion_group!(benches, bench_click_dispatch, bench_forwarding, bench_attach_remove);
criterion_main!(benches);
