//! Host canvas interface: event subscriptions, raw events and redraws.
//!
//! The plotting toolkit owns the window and the render loop. It exposes a
//! connect/disconnect primitive for named event types, delivers raw events
//! to [`Maps::handle_event`](crate::Maps::handle_event) and renders on
//! request. [`HeadlessCanvas`] records everything it is asked to do.

use std::cell::RefCell;
use std::rc::Rc;

use compact_str::CompactString;
use enum_map::Enum;
use indexmap::IndexMap;

use crate::model::artifacts::ArtifactId;
use crate::model::data::CollectionId;
use crate::model::identity::{ClickArity, EventClass, MouseButton};

/// Named host event types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Enum)]
pub enum HostEventKind {
    ButtonPress,
    Motion,
    Pick,
    KeyPress,
    Close,
}

/// Disposable subscription handle returned by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

/// Identity of a host axes; a map and its layers share one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AxesId(pub u64);

/// Raw pointer event.
#[derive(Debug, Clone, PartialEq)]
pub struct PointerEvent {
    /// Axes under the pointer, `None` outside all axes.
    pub axes: Option<AxesId>,
    /// Data coordinates within `axes`.
    pub pos: Option<(f64, f64)>,
    /// Held or pressed button; `None` for a bare motion.
    pub button: Option<MouseButton>,
    pub dblclick: bool,
}

impl PointerEvent {
    pub fn press(axes: AxesId, pos: (f64, f64), button: MouseButton) -> Self {
        Self {
            axes: Some(axes),
            pos: Some(pos),
            button: Some(button),
            dblclick: false,
        }
    }

    /// Motion without any button held.
    pub fn hover(axes: AxesId, pos: (f64, f64)) -> Self {
        Self {
            axes: Some(axes),
            pos: Some(pos),
            button: None,
            dblclick: false,
        }
    }

    #[must_use]
    pub fn double(mut self) -> Self {
        self.dblclick = true;
        self
    }

    pub fn arity(&self) -> ClickArity {
        ClickArity::from_dblclick(self.dblclick)
    }
}

/// Raw pick event with the nearest index already resolved by the host.
#[derive(Debug, Clone, PartialEq)]
pub struct PickEvent {
    pub artist: Option<CollectionId>,
    pub index: Option<usize>,
    pub mouse: PointerEvent,
}

#[derive(Debug, Clone, PartialEq)]
pub enum HostEvent {
    ButtonPress(PointerEvent),
    Motion(PointerEvent),
    Pick(PickEvent),
    KeyPress { key: CompactString },
    Close,
}

impl HostEvent {
    pub fn key<K: Into<CompactString>>(key: K) -> Self {
        Self::KeyPress { key: key.into() }
    }
}

/// Redraw scoped to one event class.
#[derive(Debug, Clone, PartialEq)]
pub struct RedrawRequest {
    pub scope: Option<EventClass>,
    /// Lightweight refresh when `true`, full redraw otherwise.
    pub blit: bool,
    /// Artifacts the host must remove before drawing.
    pub cleared: Vec<ArtifactId>,
}

/// Services consumed from the plotting toolkit.
pub trait HostCanvas {
    fn connect(&mut self, kind: HostEventKind) -> SubscriptionId;

    fn disconnect(&mut self, id: SubscriptionId);

    fn redraw(&mut self, request: &RedrawRequest);

    /// Remove `key` from the toolkit's default binding for `action`.
    fn release_keymap(&mut self, _action: &str, _key: &str) -> bool {
        false
    }
}

/// Everything a [`HeadlessCanvas`] was asked to do.
#[derive(Debug, Default)]
pub struct CanvasLog {
    pub connected: IndexMap<SubscriptionId, HostEventKind>,
    pub disconnected: Vec<SubscriptionId>,
    pub redraws: Vec<RedrawRequest>,
    pub released_keymaps: Vec<(CompactString, CompactString)>,
}

impl CanvasLog {
    /// Subscriptions that are still live.
    pub fn active(&self) -> Vec<HostEventKind> {
        self.connected
            .iter()
            .filter(|(id, _)| !self.disconnected.contains(id))
            .map(|(_, kind)| *kind)
            .collect()
    }
}

/// Host without a window; records requests in a shared [`CanvasLog`].
#[derive(Debug, Default)]
pub struct HeadlessCanvas {
    log: Rc<RefCell<CanvasLog>>,
    next_id: u64,
}

impl HeadlessCanvas {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared handle to the log; stays valid after the canvas is moved.
    pub fn log(&self) -> Rc<RefCell<CanvasLog>> {
        Rc::clone(&self.log)
    }
}

impl HostCanvas for HeadlessCanvas {
    fn connect(&mut self, kind: HostEventKind) -> SubscriptionId {
        self.next_id += 1;
        let id = SubscriptionId(self.next_id);
        self.log.borrow_mut().connected.insert(id, kind);
        id
    }

    fn disconnect(&mut self, id: SubscriptionId) {
        self.log.borrow_mut().disconnected.push(id);
    }

    fn redraw(&mut self, request: &RedrawRequest) {
        self.log.borrow_mut().redraws.push(request.clone());
    }

    fn release_keymap(&mut self, action: &str, key: &str) -> bool {
        self.log
            .borrow_mut()
            .released_keymaps
            .push((action.into(), key.into()));
        true
    }
}
