pub mod error;
pub use error::{CallbackError, CallbackResult};

pub mod config;
pub use config::{Config, HandlerErrorPolicy};

pub mod logging;

pub mod model {
    pub mod identity;
    pub use identity::{CallbackId, ClickArity, Classifier, EntryKey, EventClass, MouseButton};

    pub mod payload;
    pub use payload::{ArgValue, BoundArgs, CallbackArgs, EventPayload, KeyPayload, PointPayload};

    pub mod data;
    pub use data::{CollectionId, Crs, DataCollection, DataId, FnReprojector, Reprojector};

    pub mod artifacts;
    pub use artifacts::{Artifact, ArtifactId, ArtifactKind, MarkerShape, PeekRegion, PickedValues};

    pub mod interaction;
    pub use interaction::{InteractionState, SuppressReason, ToolbarMode};
}

pub mod controller {
    pub mod catalog;
    pub use catalog::{BuiltinCallback, HandlerKind};

    pub mod registry;
    pub use registry::{CallbackEntry, CallbackRegistry, CustomHandler, Handler};

    pub mod ordering;
    pub use ordering::OrderingPolicy;

    pub mod dispatch;
    pub use dispatch::{DispatchReport, Invocation};

    mod forwarding;
}

pub mod host {
    pub mod canvas;
    pub use canvas::{
        AxesId, CanvasLog, HeadlessCanvas, HostCanvas, HostEvent, HostEventKind, PickEvent,
        PointerEvent, RedrawRequest, SubscriptionId,
    };
}

pub mod figure;
pub use figure::Figure;

pub mod maps;
pub use maps::{CallbackAccess, ContainerHandle, MapId, Maps, MapsBuilder};

pub use controller::*;
pub use host::*;
pub use model::*;
