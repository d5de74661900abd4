//! Replay of processed events on forwarding peers.

use std::rc::{Rc, Weak};

use tracing::{debug, trace, warn};

use crate::controller::dispatch::{DispatchCycle, Trigger};
use crate::error::CallbackResult;
use crate::maps::MapsInner;
use crate::model::data::reproject_point;
use crate::model::payload::{EventPayload, PointPayload};

impl DispatchCycle {
    /// Replay `trigger` on the peers `source` forwards to, then recurse into
    /// their own peers. Views already dispatched in this cycle are skipped.
    pub(crate) fn forward_from(
        &mut self,
        source: &Rc<MapsInner>,
        trigger: &Trigger,
        depth: usize,
    ) -> CallbackResult<()> {
        self.mark(source.id);

        let peers: Vec<Rc<MapsInner>> = source.containers[self.class]
            .borrow()
            .forwards
            .values()
            .filter_map(Weak::upgrade)
            .collect();
        if peers.is_empty() {
            return Ok(());
        }
        if depth >= self.max_depth {
            debug!(map = %source.id, depth, "forwarding depth limit reached");
            return Ok(());
        }

        for peer in peers {
            if self.is_visited(peer.id) {
                trace!(from = %source.id, to = %peer.id, "peer already dispatched");
                continue;
            }

            let (payload, next) = match trigger {
                Trigger::Click { pos } => {
                    let Some(pos) = self.reproject(source, &peer, *pos) else {
                        continue;
                    };
                    (
                        EventPayload::Click(PointPayload::at(pos)),
                        Trigger::Click { pos },
                    )
                }
                Trigger::Pick { pos } => {
                    let Some(pos) = self.reproject(source, &peer, *pos) else {
                        continue;
                    };
                    (
                        EventPayload::Pick(peer.resolve_pick(pos, self.search_radius)),
                        Trigger::Pick { pos },
                    )
                }
                Trigger::Key { key } => (EventPayload::key(key.clone()), trigger.clone()),
            };

            self.run_view(&peer, &payload, depth + 1)?;
            self.forward_from(&peer, &next, depth + 1)?;
        }

        Ok(())
    }

    /// Position of `pos` in `peer`'s projection; failures skip the peer.
    fn reproject(
        &mut self,
        source: &MapsInner,
        peer: &MapsInner,
        pos: (f64, f64),
    ) -> Option<(f64, f64)> {
        match reproject_point(source.reprojector.as_ref(), &source.crs, &peer.crs, pos) {
            Ok(pos) => Some(pos),
            Err(err) => {
                warn!(from = %source.id, to = %peer.id, %err, "event not forwarded");
                self.report.skipped_peers.push(peer.id);
                None
            }
        }
    }
}
