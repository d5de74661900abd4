//! Figure shared by a parent map and its layers and insets.
//!
//! Owns the host canvas, the host subscriptions and the redraw queue:
//! artifacts waiting to be cleared per event class and the after-update
//! actions scheduled by dispatch cycles.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use compact_str::CompactString;
use enum_map::EnumMap;
use tracing::{debug, trace};

use crate::host::canvas::{HostCanvas, HostEventKind, RedrawRequest, SubscriptionId};
use crate::maps::MapsInner;
use crate::model::artifacts::ArtifactId;
use crate::model::identity::EventClass;

#[derive(Default)]
struct RedrawQueue {
    to_clear: EnumMap<EventClass, Vec<ArtifactId>>,
    discarded: Vec<ArtifactId>,
    after_update: Vec<(Weak<MapsInner>, EventClass)>,
}

pub struct Figure {
    host: RefCell<Box<dyn HostCanvas>>,
    connections: RefCell<EnumMap<HostEventKind, Option<SubscriptionId>>>,
    queue: RefCell<RedrawQueue>,
    next_artifact: Cell<u64>,
    active_layer: RefCell<CompactString>,
    initialized: Cell<bool>,
}

impl Figure {
    pub(crate) fn new(host: Box<dyn HostCanvas>) -> Self {
        Self {
            host: RefCell::new(host),
            connections: RefCell::new(EnumMap::default()),
            queue: RefCell::new(RedrawQueue::default()),
            next_artifact: Cell::new(0),
            active_layer: RefCell::new(CompactString::const_new("base")),
            initialized: Cell::new(false),
        }
    }

    pub fn active_layer(&self) -> CompactString {
        self.active_layer.borrow().clone()
    }

    pub fn set_active_layer<L: Into<CompactString>>(&self, layer: L) {
        let layer = layer.into();
        debug!(%layer, "switching active layer");
        *self.active_layer.borrow_mut() = layer;
    }

    pub fn is_connected(&self, kind: HostEventKind) -> bool {
        self.connections.borrow()[kind].is_some()
    }

    /// Whether the host subscriptions were set up by `init_callbacks`.
    pub fn is_initialized(&self) -> bool {
        self.initialized.get()
    }

    pub(crate) fn set_initialized(&self, initialized: bool) {
        self.initialized.set(initialized);
    }

    /// Subscribe to `kind` unless already subscribed.
    pub(crate) fn connect(&self, kind: HostEventKind) -> bool {
        let mut connections = self.connections.borrow_mut();
        if connections[kind].is_some() {
            return false;
        }
        let id = self.host.borrow_mut().connect(kind);
        trace!(?kind, ?id, "connected host event");
        connections[kind] = Some(id);
        true
    }

    /// Drop every host subscription, returning how many were live.
    pub(crate) fn disconnect_all(&self) -> usize {
        let mut connections = self.connections.borrow_mut();
        let mut host = self.host.borrow_mut();
        let mut count = 0;
        for (_, slot) in connections.iter_mut() {
            if let Some(id) = slot.take() {
                host.disconnect(id);
                count += 1;
            }
        }
        count
    }

    pub(crate) fn release_keymap(&self, action: &str, key: &str) -> bool {
        self.host.borrow_mut().release_keymap(action, key)
    }

    pub(crate) fn next_artifact_id(&self) -> ArtifactId {
        let id = self.next_artifact.get() + 1;
        self.next_artifact.set(id);
        ArtifactId(id)
    }

    /// Queue artifacts for removal with the next redraw of any scope.
    pub(crate) fn discard(&self, ids: Vec<ArtifactId>) {
        if !ids.is_empty() {
            self.queue.borrow_mut().discarded.extend(ids);
        }
    }

    /// After the next update, hand `view`'s temporary `class` artifacts
    /// over for clearing at the following one.
    pub(crate) fn schedule_clear(&self, view: &Rc<MapsInner>, class: EventClass) {
        self.queue
            .borrow_mut()
            .after_update
            .push((Rc::downgrade(view), class));
    }

    #[cfg(test)]
    pub(crate) fn scheduled_clears(&self) -> usize {
        self.queue.borrow().after_update.len()
    }

    /// Artifacts that will be removed by the next `class` redraw.
    pub fn pending_clear(&self, class: EventClass) -> Vec<ArtifactId> {
        self.queue.borrow().to_clear[class].clone()
    }

    /// Redraw the canvas.
    ///
    /// Artifacts queued for `clear` are removed first, then the after-update
    /// actions run so that this cycle's temporary artifacts are cleared by
    /// the next cycle of their class.
    pub fn update(&self, clear: Option<EventClass>, blit: bool) {
        let cleared = {
            let mut queue = self.queue.borrow_mut();
            let mut cleared = std::mem::take(&mut queue.discarded);
            if let Some(class) = clear {
                cleared.append(&mut queue.to_clear[class]);
            }
            cleared
        };

        let request = RedrawRequest {
            scope: clear,
            blit,
            cleared,
        };
        trace!(scope = ?request.scope, blit, cleared = request.cleared.len(), "redraw");
        self.host.borrow_mut().redraw(&request);

        let actions = std::mem::take(&mut self.queue.borrow_mut().after_update);
        for (view, class) in actions {
            let Some(view) = view.upgrade() else {
                continue;
            };
            let taken = view.take_temporary(class);
            if !taken.is_empty() {
                self.queue.borrow_mut().to_clear[class].extend(taken);
            }
        }
    }
}

impl fmt::Debug for Figure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let connected = self
            .connections
            .borrow()
            .iter()
            .filter(|(_, id)| id.is_some())
            .count();
        f.debug_struct("Figure")
            .field("connected", &connected)
            .field("active_layer", &*self.active_layer.borrow())
            .field("initialized", &self.initialized.get())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::canvas::HeadlessCanvas;

    #[test]
    fn test_connect_once_and_disconnect_all() {
        let canvas = HeadlessCanvas::new();
        let log = canvas.log();
        let figure = Figure::new(Box::new(canvas));

        assert!(figure.connect(HostEventKind::ButtonPress));
        assert!(!figure.connect(HostEventKind::ButtonPress));
        assert!(figure.connect(HostEventKind::KeyPress));
        assert!(figure.is_connected(HostEventKind::KeyPress));
        assert_eq!(log.borrow().connected.len(), 2);

        assert_eq!(figure.disconnect_all(), 2);
        assert!(!figure.is_connected(HostEventKind::ButtonPress));
        assert!(log.borrow().active().is_empty());
        assert_eq!(figure.disconnect_all(), 0);
    }

    #[test]
    fn test_discarded_artifacts_cleared_with_next_redraw() {
        let canvas = HeadlessCanvas::new();
        let log = canvas.log();
        let figure = Figure::new(Box::new(canvas));

        let a = figure.next_artifact_id();
        let b = figure.next_artifact_id();
        assert_ne!(a, b);

        figure.discard(vec![a, b]);
        figure.update(None, false);
        figure.update(None, false);

        let log = log.borrow();
        assert_eq!(log.redraws.len(), 2);
        assert_eq!(log.redraws[0].cleared, vec![a, b]);
        assert!(log.redraws[1].cleared.is_empty());
        assert!(!log.redraws[0].blit);
    }
}
