//! Snapshot of host interaction flags that gate pointer dispatch.

use compact_str::CompactString;

/// Navigation toolbar mode reported by the host.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ToolbarMode {
    #[default]
    Idle,
    Zoom,
    Pan,
    Other(CompactString),
}

/// Why a pointer dispatch cycle was skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuppressReason {
    AxisDrag,
    ToolbarActive,
    NoButtonHeld,
}

/// Read-only interaction state passed into each dispatch call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InteractionState {
    /// The modifier that turns pointer drags into axes moves is held.
    pub axis_drag_modifier: bool,
    pub toolbar_mode: ToolbarMode,
}

impl InteractionState {
    pub fn idle() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_toolbar(mut self, mode: ToolbarMode) -> Self {
        self.toolbar_mode = mode;
        self
    }

    #[must_use]
    pub fn with_axis_drag(mut self, active: bool) -> Self {
        self.axis_drag_modifier = active;
        self
    }

    /// Guard shared by click and pick dispatch.
    pub fn pointer_guard(&self) -> Option<SuppressReason> {
        if self.axis_drag_modifier {
            Some(SuppressReason::AxisDrag)
        } else if self.toolbar_mode != ToolbarMode::Idle {
            Some(SuppressReason::ToolbarActive)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pointer_guard() {
        assert_eq!(InteractionState::idle().pointer_guard(), None);
        assert_eq!(
            InteractionState::idle().with_axis_drag(true).pointer_guard(),
            Some(SuppressReason::AxisDrag)
        );
        assert_eq!(
            InteractionState::idle()
                .with_toolbar(ToolbarMode::Zoom)
                .pointer_guard(),
            Some(SuppressReason::ToolbarActive)
        );
    }
}
