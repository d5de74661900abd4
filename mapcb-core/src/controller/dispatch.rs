//! Dispatch engines for click, pick and keypress events.
//!
//! A host event starts one dispatch cycle on the parent map. The cycle runs
//! the matching bucket of every affected view in [`OrderingPolicy`] order,
//! replays the event on forwarding peers and finally asks every touched
//! figure for a redraw. Views run at most once per cycle.

use std::rc::Rc;

use compact_str::CompactString;
use smallvec::SmallVec;
use tracing::{debug, trace, warn};

use crate::config::{Config, HandlerErrorPolicy};
use crate::controller::ordering::OrderingPolicy;
use crate::error::CallbackResult;
use crate::figure::Figure;
use crate::host::canvas::{HostEvent, PickEvent, PointerEvent};
use crate::maps::{MapId, Maps, MapsInner};
use crate::model::identity::{CallbackId, Classifier, EventClass};
use crate::model::interaction::{InteractionState, SuppressReason};
use crate::model::payload::{CallbackArgs, EventPayload, PointPayload};

/// One callback invocation of a cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    pub map: MapId,
    pub id: CallbackId,
    /// Forwarding hops from the view that received the host event.
    pub depth: usize,
    pub error: Option<String>,
}

/// Outcome of one host event.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DispatchReport {
    pub class: Option<EventClass>,
    pub suppressed: Option<SuppressReason>,
    pub invocations: Vec<Invocation>,
    /// Peers skipped because the position could not be reprojected.
    pub skipped_peers: Vec<MapId>,
    pub closed: bool,
}

impl DispatchReport {
    fn suppressed(class: EventClass, reason: SuppressReason) -> Self {
        trace!(%class, ?reason, "dispatch suppressed");
        Self {
            class: Some(class),
            suppressed: Some(reason),
            ..Self::default()
        }
    }

    /// Identities invoked on `map`, in invocation order.
    pub fn invoked_on(&self, map: MapId) -> Vec<&CallbackId> {
        self.invocations
            .iter()
            .filter(|inv| inv.map == map)
            .map(|inv| &inv.id)
            .collect()
    }

    pub fn failures(&self) -> usize {
        self.invocations.iter().filter(|inv| inv.error.is_some()).count()
    }
}

/// The event as seen by the view handling it; positions are in that
/// view's projection.
#[derive(Debug, Clone)]
pub(crate) enum Trigger {
    Click { pos: (f64, f64) },
    Pick { pos: (f64, f64) },
    Key { key: CompactString },
}

pub(crate) struct DispatchCycle {
    pub(crate) class: EventClass,
    classifier: Classifier,
    policy: OrderingPolicy,
    on_error: HandlerErrorPolicy,
    pub(crate) max_depth: usize,
    pub(crate) search_radius: Option<f64>,
    visited: SmallVec<[MapId; 8]>,
    touched: SmallVec<[Rc<Figure>; 2]>,
    /// Views whose temporary artifacts this cycle drew.
    drew: SmallVec<[Rc<MapsInner>; 4]>,
    pub(crate) report: DispatchReport,
}

impl DispatchCycle {
    fn new(class: EventClass, classifier: Classifier, config: &Config) -> Self {
        Self {
            class,
            classifier,
            policy: OrderingPolicy::for_class(class),
            on_error: config.dispatch.on_handler_error,
            max_depth: config.dispatch.max_forward_depth,
            search_radius: config.pick.search_radius,
            visited: SmallVec::new(),
            touched: SmallVec::new(),
            drew: SmallVec::new(),
            report: DispatchReport {
                class: Some(class),
                ..DispatchReport::default()
            },
        }
    }

    pub(crate) fn is_visited(&self, map: MapId) -> bool {
        self.visited.contains(&map)
    }

    pub(crate) fn mark(&mut self, map: MapId) {
        if !self.is_visited(map) {
            self.visited.push(map);
        }
    }

    fn touch(&mut self, figure: &Rc<Figure>) {
        if !self.touched.iter().any(|f| Rc::ptr_eq(f, figure)) {
            self.touched.push(Rc::clone(figure));
        }
    }

    /// Run `view`'s bucket for this cycle's classifier.
    pub(crate) fn run_view(
        &mut self,
        view: &Rc<MapsInner>,
        payload: &EventPayload,
        depth: usize,
    ) -> CallbackResult<()> {
        self.mark(view.id);

        // Snapshot so callbacks may attach or remove entries while running.
        let entries = view.containers[self.class]
            .borrow()
            .registry
            .ordered(&self.classifier, &self.policy);

        if self.class == EventClass::Click || !entries.is_empty() {
            self.touch(&view.figure);
        }
        if entries.is_empty() {
            return Ok(());
        }

        let maps = Maps::from_inner(Rc::clone(view));
        for entry in &entries {
            let args = CallbackArgs {
                payload,
                bound: &entry.bound,
            };
            let result = entry.handler.invoke(&maps, &args);

            self.report.invocations.push(Invocation {
                map: view.id,
                id: entry.id.clone(),
                depth,
                error: result.as_ref().err().map(ToString::to_string),
            });

            if let Err(err) = result {
                warn!(map = %view.id, id = %entry.id, %err, "callback failed");
                if self.on_error == HandlerErrorPolicy::Abort {
                    return Err(err);
                }
            }
        }

        if self.class.is_spatial() {
            self.drew.push(Rc::clone(view));
        }

        debug!(
            map = %view.id,
            class = %self.class,
            classifier = %self.classifier,
            depth,
            count = entries.len(),
            "callbacks executed"
        );
        Ok(())
    }

    /// Request the redraw of every touched figure and return the report.
    ///
    /// Clear actions for the temporary artifacts drawn in this cycle are
    /// queued right before each figure's final redraw.
    fn finish(self, blit: Option<bool>) -> DispatchReport {
        if let Some(blit) = blit {
            for figure in &self.touched {
                for view in self.drew.iter().filter(|v| Rc::ptr_eq(&v.figure, figure)) {
                    figure.schedule_clear(view, self.class);
                }
                figure.update(Some(self.class), blit);
            }
        }
        self.report
    }
}

pub(crate) fn handle_host_event(
    origin: &Rc<MapsInner>,
    event: &HostEvent,
    state: &InteractionState,
) -> CallbackResult<DispatchReport> {
    let root = origin.root();

    match event {
        HostEvent::ButtonPress(pointer) | HostEvent::Motion(pointer) => {
            dispatch_click(&root, pointer, state)
        }
        HostEvent::Pick(pick) => dispatch_pick(&root, pick, state),
        HostEvent::KeyPress { key } => dispatch_keypress(&root, key),
        HostEvent::Close => {
            Maps::from_inner(root).close();
            Ok(DispatchReport {
                closed: true,
                ..DispatchReport::default()
            })
        }
    }
}

fn dispatch_click(
    root: &Rc<MapsInner>,
    pointer: &PointerEvent,
    state: &InteractionState,
) -> CallbackResult<DispatchReport> {
    let class = EventClass::Click;
    if let Some(reason) = state.pointer_guard() {
        return Ok(DispatchReport::suppressed(class, reason));
    }
    let Some(button) = pointer.button else {
        return Ok(DispatchReport::suppressed(class, SuppressReason::NoButtonHeld));
    };

    let classifier = Classifier::Button {
        arity: pointer.arity(),
        button,
    };
    let mut cycle = DispatchCycle::new(class, classifier, &root.config);

    if let (Some(axes), Some(pos)) = (pointer.axes, pointer.pos) {
        for view in root.views() {
            if view.axes != axes {
                continue;
            }
            if !cycle.is_visited(view.id) {
                cycle.run_view(&view, &EventPayload::Click(PointPayload::at(pos)), 0)?;
            }
            cycle.forward_from(&view, &Trigger::Click { pos }, 0)?;
        }
    }

    cycle.touch(&root.figure);
    Ok(cycle.finish(Some(true)))
}

fn dispatch_pick(
    root: &Rc<MapsInner>,
    pick: &PickEvent,
    state: &InteractionState,
) -> CallbackResult<DispatchReport> {
    let class = EventClass::Pick;
    if let Some(reason) = state.pointer_guard() {
        return Ok(DispatchReport::suppressed(class, reason));
    }

    let mouse = &pick.mouse;
    let classifier = Classifier::Button {
        arity: mouse.arity(),
        button: mouse.button.unwrap_or_default(),
    };
    let mut cycle = DispatchCycle::new(class, classifier, &root.config);

    for view in root.views() {
        if let Some(point) = view.pick_payload(pick.artist, pick.index, mouse.pos)
            && !cycle.is_visited(view.id)
        {
            cycle.run_view(&view, &EventPayload::Pick(point), 0)?;
        }

        if let (Some(axes), Some(pos)) = (mouse.axes, mouse.pos)
            && axes == view.axes
        {
            cycle.forward_from(&view, &Trigger::Pick { pos }, 0)?;
        }
    }

    Ok(cycle.finish(Some(false)))
}

fn dispatch_keypress(root: &Rc<MapsInner>, key: &CompactString) -> CallbackResult<DispatchReport> {
    let mut cycle = DispatchCycle::new(
        EventClass::Keypress,
        Classifier::Key(key.clone()),
        &root.config,
    );

    for view in root.views() {
        if !cycle.is_visited(view.id) {
            cycle.run_view(&view, &EventPayload::key(key.clone()), 0)?;
        }
        cycle.forward_from(&view, &Trigger::Key { key: key.clone() }, 0)?;
    }

    Ok(cycle.finish(None))
}
