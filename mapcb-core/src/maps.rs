//! Map views and the callback container facade.
//!
//! A [`Maps`] is a cheap handle to one map view. The first view built owns a
//! [`Figure`]; layers and insets created from it share that figure and are
//! dispatched together with their parent. Each view carries one callback
//! container per [`EventClass`], reached through [`Maps::cb`].

use std::cell::{RefCell, RefMut};
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use enum_map::EnumMap;
use indexmap::IndexMap;
use tracing::{debug, trace, warn};

use crate::config::Config;
use crate::controller::catalog::{BuiltinCallback, HandlerKind};
use crate::controller::dispatch::{self, DispatchReport};
use crate::controller::registry::{CallbackRegistry, CustomHandler, Handler};
use crate::error::CallbackResult;
use crate::figure::Figure;
use crate::host::canvas::{AxesId, HeadlessCanvas, HostCanvas, HostEvent, HostEventKind};
use crate::model::artifacts::{Artifact, ArtifactId, ArtifactKind, ArtifactStore, PickedValues};
use crate::model::data::{CollectionId, Crs, DataCollection, IdentityReprojector, Reprojector};
use crate::model::identity::{CallbackId, Classifier, EventClass};
use crate::model::interaction::InteractionState;
use crate::model::payload::{BoundArgs, PointPayload};

static NEXT_MAP_ID: AtomicU64 = AtomicU64::new(1);
static NEXT_AXES_ID: AtomicU64 = AtomicU64::new(1);

/// Host default key bindings released by `init_callbacks`.
pub const DEFAULT_KEYMAP: &[(&str, &[&str])] = &[
    ("back", &["c", "left"]),
    ("forward", &["v", "right"]),
    ("grid", &["g"]),
    ("grid_minor", &["G"]),
    ("home", &["h", "r"]),
    ("pan", &["p"]),
    ("quit", &["q"]),
    ("save", &["s"]),
    ("xscale", &["k", "L"]),
    ("yscale", &["l"]),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MapId(u64);

impl fmt::Display for MapId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "m{}", self.0)
    }
}

fn next_axes() -> AxesId {
    AxesId(NEXT_AXES_ID.fetch_add(1, Ordering::Relaxed))
}

#[derive(Debug)]
pub(crate) struct CallbackContainer {
    pub(crate) registry: CallbackRegistry,
    pub(crate) forwards: IndexMap<MapId, Weak<MapsInner>>,
}

pub(crate) struct MapsInner {
    pub(crate) id: MapId,
    pub(crate) crs: Crs,
    pub(crate) axes: AxesId,
    pub(crate) figure: Rc<Figure>,
    parent: Option<Weak<MapsInner>>,
    children: RefCell<Vec<Rc<MapsInner>>>,
    pub(crate) reprojector: Rc<dyn Reprojector>,
    pub(crate) config: Rc<Config>,
    collection: RefCell<Option<DataCollection>>,
    artifacts: RefCell<ArtifactStore>,
    pub(crate) containers: EnumMap<EventClass, RefCell<CallbackContainer>>,
}

impl MapsInner {
    fn new(
        axes: AxesId,
        crs: Crs,
        figure: Rc<Figure>,
        parent: Option<Weak<MapsInner>>,
        reprojector: Rc<dyn Reprojector>,
        config: Rc<Config>,
    ) -> Self {
        Self {
            id: MapId(NEXT_MAP_ID.fetch_add(1, Ordering::Relaxed)),
            crs,
            axes,
            figure,
            parent,
            children: RefCell::new(Vec::new()),
            reprojector,
            config,
            collection: RefCell::new(None),
            artifacts: RefCell::new(ArtifactStore::default()),
            containers: EnumMap::from_fn(|class| {
                RefCell::new(CallbackContainer {
                    registry: CallbackRegistry::new(class),
                    forwards: IndexMap::new(),
                })
            }),
        }
    }

    /// The parent view, or `self` for a parent or an orphaned child.
    pub(crate) fn root(self: &Rc<Self>) -> Rc<Self> {
        self.parent
            .as_ref()
            .and_then(Weak::upgrade)
            .unwrap_or_else(|| Rc::clone(self))
    }

    /// `self` followed by its children.
    pub(crate) fn views(self: &Rc<Self>) -> Vec<Rc<Self>> {
        let mut views = vec![Rc::clone(self)];
        views.extend(self.children.borrow().iter().cloned());
        views
    }

    /// Temporary artifacts of `class`, removed from the store.
    pub(crate) fn take_temporary(&self, class: EventClass) -> Vec<ArtifactId> {
        self.artifacts
            .borrow_mut()
            .take_temporary(class)
            .into_iter()
            .map(|a| a.id)
            .collect()
    }

    /// Payload of a host pick on this view, `None` unless `artist` is this
    /// view's collection.
    pub(crate) fn pick_payload(
        &self,
        artist: Option<CollectionId>,
        index: Option<usize>,
        mouse: Option<(f64, f64)>,
    ) -> Option<PointPayload> {
        let collection = self.collection.borrow();
        let collection = collection.as_ref()?;
        if artist != Some(collection.id()) {
            return None;
        }
        let resolved = index.and_then(|i| collection.point(i));
        Some(resolved.unwrap_or_else(|| PointPayload::at(mouse.unwrap_or((f64::NAN, f64::NAN)))))
    }

    /// Nearest point of this view's collection; null fields when nothing
    /// lies within `radius` or no collection is set.
    pub(crate) fn resolve_pick(&self, pos: (f64, f64), radius: Option<f64>) -> PointPayload {
        let collection = self.collection.borrow();
        collection
            .as_ref()
            .and_then(|c| c.nearest(pos, radius).and_then(|i| c.point(i)))
            .unwrap_or_else(|| PointPayload::at(pos))
    }
}

impl fmt::Debug for MapsInner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MapsInner")
            .field("id", &self.id)
            .field("crs", &self.crs)
            .field("axes", &self.axes)
            .field("is_parent", &self.parent.is_none())
            .field("children", &self.children.borrow().len())
            .finish_non_exhaustive()
    }
}

/// Builder for a parent map with its own figure.
pub struct MapsBuilder {
    crs: Crs,
    config: Config,
    reprojector: Rc<dyn Reprojector>,
    canvas: Option<Box<dyn HostCanvas>>,
}

impl MapsBuilder {
    pub fn new() -> Self {
        Self {
            crs: Crs::default(),
            config: Config::default(),
            reprojector: Rc::new(IdentityReprojector),
            canvas: None,
        }
    }

    #[must_use]
    pub fn crs(mut self, crs: Crs) -> Self {
        self.crs = crs;
        self
    }

    #[must_use]
    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn reprojector<R: Reprojector + 'static>(mut self, reprojector: R) -> Self {
        self.reprojector = Rc::new(reprojector);
        self
    }

    #[must_use]
    pub fn canvas<C: HostCanvas + 'static>(mut self, canvas: C) -> Self {
        self.canvas = Some(Box::new(canvas));
        self
    }

    pub fn build(self) -> Maps {
        let canvas: Box<dyn HostCanvas> = match self.canvas {
            Some(canvas) => canvas,
            None => Box::new(HeadlessCanvas::new()),
        };
        let inner = MapsInner::new(
            next_axes(),
            self.crs,
            Rc::new(Figure::new(canvas)),
            None,
            self.reprojector,
            Rc::new(self.config),
        );
        debug!(map = %inner.id, crs = %inner.crs, "map created");
        Maps::from_inner(Rc::new(inner))
    }
}

impl Default for MapsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle to one map view.
#[derive(Debug, Clone)]
pub struct Maps {
    inner: Rc<MapsInner>,
}

impl Maps {
    pub fn builder() -> MapsBuilder {
        MapsBuilder::new()
    }

    pub(crate) fn from_inner(inner: Rc<MapsInner>) -> Self {
        Self { inner }
    }

    pub fn id(&self) -> MapId {
        self.inner.id
    }

    pub fn crs(&self) -> &Crs {
        &self.inner.crs
    }

    pub fn axes(&self) -> AxesId {
        self.inner.axes
    }

    pub fn figure(&self) -> &Figure {
        &self.inner.figure
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    pub fn is_parent(&self) -> bool {
        Rc::ptr_eq(&self.inner.root(), &self.inner)
    }

    pub fn parent(&self) -> Maps {
        Self::from_inner(self.inner.root())
    }

    pub fn children(&self) -> Vec<Maps> {
        self.inner
            .children
            .borrow()
            .iter()
            .cloned()
            .map(Self::from_inner)
            .collect()
    }

    /// New view on the parent's axes and projection.
    pub fn new_layer(&self) -> Maps {
        let root = self.inner.root();
        let (axes, crs) = (root.axes, root.crs.clone());
        Self::spawn_child(&root, axes, crs)
    }

    /// New view with its own axes and projection in the parent's figure.
    pub fn new_inset(&self, crs: Crs) -> Maps {
        let root = self.inner.root();
        Self::spawn_child(&root, next_axes(), crs)
    }

    fn spawn_child(root: &Rc<MapsInner>, axes: AxesId, crs: Crs) -> Maps {
        let child = Rc::new(MapsInner::new(
            axes,
            crs,
            Rc::clone(&root.figure),
            Some(Rc::downgrade(root)),
            Rc::clone(&root.reprojector),
            Rc::clone(&root.config),
        ));
        root.children.borrow_mut().push(Rc::clone(&child));
        debug!(parent = %root.id, child = %child.id, "child map created");
        Self::from_inner(child)
    }

    /// Plot `collection` on this view; it becomes the pick target.
    pub fn set_data(&self, collection: DataCollection) {
        debug!(map = %self.id(), points = collection.len(), "collection set");
        *self.inner.collection.borrow_mut() = Some(collection);

        let figure = self.figure();
        if figure.is_initialized() {
            figure.connect(HostEventKind::Pick);
        }
    }

    pub fn collection_id(&self) -> Option<CollectionId> {
        self.inner.collection.borrow().as_ref().map(DataCollection::id)
    }

    /// Subscribe to the host events of the figure. Only effective on a
    /// parent, and only once until the figure is closed.
    pub fn init_callbacks(&self) {
        if !self.is_parent() {
            debug!(map = %self.id(), "init_callbacks ignored on a child map");
            return;
        }

        let figure = self.figure();
        if figure.is_initialized() {
            return;
        }

        for kind in [
            HostEventKind::ButtonPress,
            HostEventKind::Motion,
            HostEventKind::KeyPress,
            HostEventKind::Close,
        ] {
            figure.connect(kind);
        }

        let has_data = self
            .inner
            .views()
            .iter()
            .any(|view| view.collection.borrow().is_some());
        if has_data {
            figure.connect(HostEventKind::Pick);
        }

        if self.config().keymap.release_defaults {
            for (action, keys) in DEFAULT_KEYMAP {
                for key in *keys {
                    if !figure.release_keymap(action, key) {
                        trace!(action, key, "default key binding not released");
                    }
                }
            }
        }

        figure.set_initialized(true);
        debug!(map = %self.id(), pick = has_data, "callbacks initialized");
    }

    /// Entry point for raw host events.
    pub fn handle_event(
        &self,
        event: &HostEvent,
        state: &InteractionState,
    ) -> CallbackResult<DispatchReport> {
        dispatch::handle_host_event(&self.inner, event, state)
    }

    /// Remove every callback of the parent and all children through the
    /// cleanup path, then drop the host subscriptions.
    pub fn close(&self) {
        let root = self.inner.root();
        let mut removed = 0;

        for view in root.views() {
            let maps = Self::from_inner(Rc::clone(&view));
            for (class, container) in &view.containers {
                let entries = container.borrow_mut().registry.drain();
                for entry in entries {
                    entry.handler.cleanup(&maps, class);
                    removed += 1;
                }
            }
        }

        let disconnected = root.figure.disconnect_all();
        root.figure.set_initialized(false);
        debug!(map = %root.id, removed, disconnected, "figure closed");
    }

    pub fn cb(&self) -> CallbackAccess<'_> {
        CallbackAccess { maps: self }
    }

    /// Values collected by `get_values` callbacks.
    pub fn picked_values(&self) -> PickedValues {
        self.inner.artifacts.borrow().picked_values().clone()
    }

    pub fn permanent_markers(&self) -> Vec<Artifact> {
        self.inner.artifacts.borrow().permanent_markers().to_vec()
    }

    pub fn permanent_annotations(&self) -> Vec<Artifact> {
        self.inner.artifacts.borrow().permanent_annotations().to_vec()
    }

    /// Temporary artifacts drawn by the current cycle of `class`.
    pub fn temporary_artifacts(&self, class: EventClass) -> Vec<Artifact> {
        self.inner.artifacts.borrow().temporary(class).to_vec()
    }

    /// Register an overlay drawn at `pos`. Temporary overlays are cleared by
    /// the next cycle of `class`.
    pub fn add_artifact(
        &self,
        class: EventClass,
        pos: (f64, f64),
        kind: ArtifactKind,
        permanent: bool,
    ) -> ArtifactId {
        let id = self.figure().next_artifact_id();
        self.artifacts_mut().add(Artifact {
            id,
            class,
            pos,
            kind,
            permanent,
        });
        id
    }

    pub(crate) fn artifacts_mut(&self) -> RefMut<'_, ArtifactStore> {
        self.inner.artifacts.borrow_mut()
    }
}

/// Accessor for the three callback containers of a map.
#[derive(Debug, Clone, Copy)]
pub struct CallbackAccess<'a> {
    maps: &'a Maps,
}

impl<'a> CallbackAccess<'a> {
    pub fn click(&self) -> ContainerHandle<'a> {
        self.container(EventClass::Click)
    }

    pub fn pick(&self) -> ContainerHandle<'a> {
        self.container(EventClass::Pick)
    }

    pub fn keypress(&self) -> ContainerHandle<'a> {
        self.container(EventClass::Keypress)
    }

    pub fn container(&self, class: EventClass) -> ContainerHandle<'a> {
        ContainerHandle {
            maps: self.maps,
            class,
        }
    }
}

/// Attach, enumerate, remove and forward callbacks of one event class.
#[derive(Debug, Clone, Copy)]
pub struct ContainerHandle<'a> {
    maps: &'a Maps,
    class: EventClass,
}

impl ContainerHandle<'_> {
    pub fn class(&self) -> EventClass {
        self.class
    }

    /// Attach a built-in callback.
    pub fn attach(
        &self,
        kind: HandlerKind,
        classifier: Classifier,
        args: BoundArgs,
    ) -> CallbackResult<CallbackId> {
        let kind = HandlerKind::lookup(self.class, kind.name())?;
        let builtin = BuiltinCallback::from_args(kind, &args)?;
        self.insert(classifier, Handler::Builtin(builtin), args)
    }

    /// Attach a built-in callback by catalog name.
    pub fn attach_named(
        &self,
        name: &str,
        classifier: Classifier,
        args: BoundArgs,
    ) -> CallbackResult<CallbackId> {
        let kind = HandlerKind::lookup(self.class, name)?;
        self.attach(kind, classifier, args)
    }

    pub fn attach_custom(
        &self,
        handler: CustomHandler,
        classifier: Classifier,
        args: BoundArgs,
    ) -> CallbackResult<CallbackId> {
        self.insert(classifier, Handler::Custom(handler), args)
    }

    fn insert(
        &self,
        classifier: Classifier,
        handler: Handler,
        args: BoundArgs,
    ) -> CallbackResult<CallbackId> {
        self.maps.inner.containers[self.class]
            .borrow_mut()
            .registry
            .insert(classifier, handler, args)
    }

    /// Remove by identity string. Unknown and malformed identities are
    /// ignored; returns whether an entry was removed.
    pub fn remove(&self, id: &str) -> bool {
        match CallbackId::parse(self.class, id) {
            Ok(id) => self.remove_id(&id),
            Err(err) => {
                warn!(map = %self.maps.id(), class = %self.class, %err, "callback not removed");
                false
            }
        }
    }

    pub fn remove_id(&self, id: &CallbackId) -> bool {
        let removed = self.maps.inner.containers[self.class]
            .borrow_mut()
            .registry
            .remove(id);

        match removed {
            Some(entry) => {
                entry.handler.cleanup(self.maps, self.class);
                debug!(map = %self.maps.id(), class = %self.class, %id, "callback removed");
                true
            }
            None => {
                debug!(map = %self.maps.id(), class = %self.class, %id, "no such callback");
                false
            }
        }
    }

    /// Identity strings of all attached callbacks.
    pub fn attached(&self) -> Vec<String> {
        self.ids().iter().map(ToString::to_string).collect()
    }

    pub fn ids(&self) -> Vec<CallbackId> {
        self.maps.inner.containers[self.class].borrow().registry.ids()
    }

    /// Replay events of this class on `peers` after they ran here.
    pub fn forward(&self, peers: &[&Maps]) {
        let mut container = self.maps.inner.containers[self.class].borrow_mut();
        for peer in peers {
            if peer.id() == self.maps.id() {
                continue;
            }
            container
                .forwards
                .insert(peer.id(), Rc::downgrade(&peer.inner));
            debug!(
                class = %self.class,
                from = %self.maps.id(),
                to = %peer.id(),
                "forwarding events"
            );
        }
    }

    /// Forward in both directions between every pair of this map and `peers`.
    pub fn share(&self, peers: &[&Maps]) {
        let group: Vec<&Maps> = std::iter::once(self.maps).chain(peers.iter().copied()).collect();
        for source in &group {
            source.cb().container(self.class).forward(&group);
        }
    }

    /// Human-readable listing of the attached callbacks.
    pub fn summary(&self) -> String {
        let mut text = format!("Attached {} callbacks:", self.class);
        for id in self.attached() {
            text.push_str("\n    ");
            text.push_str(&id);
        }
        text
    }
}
