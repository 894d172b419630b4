//! Drag-and-drop editor for the bar layout.
//!
//! [`LayoutEditor`] is a two-state machine, *viewing* and *editing*, driven
//! by a shared `Variable<bool>`.  While editing, a front-end reports drag
//! gestures through [`begin_drag`](LayoutEditor::begin_drag),
//! [`drop_on_widget`](LayoutEditor::drop_on_widget),
//! [`drop_on_zone`](LayoutEditor::drop_on_zone) and
//! [`end_drag`](LayoutEditor::end_drag).  A successful drop updates the
//! layout variable (which re-renders every subscriber) and persists the whole
//! layout through a [`LayoutStore`].

use crate::layout::{BarLayout, DropSide, Slot, WidgetKind};
use crate::traits::LayoutStore;
use crate::variable::Variable;
use log::{debug, error, info};
use std::cell::Cell;

/// Reorders bar widgets between the three slots.
///
/// All methods take `&self`; the editor is shared between widget callbacks
/// behind an `Rc`.
pub struct LayoutEditor<S: LayoutStore> {
    layout: Variable<BarLayout>,
    edit_mode: Variable<bool>,
    dragged: Cell<Option<WidgetKind>>,
    store: S,
}

impl<S: LayoutStore> LayoutEditor<S> {
    /// Create an editor over the given cells.  Both variables are shared with
    /// whoever else holds a handle to them.
    pub fn new(layout: Variable<BarLayout>, edit_mode: Variable<bool>, store: S) -> Self {
        Self {
            layout,
            edit_mode,
            dragged: Cell::new(None),
            store,
        }
    }

    pub fn layout(&self) -> &Variable<BarLayout> {
        &self.layout
    }

    pub fn edit_mode(&self) -> &Variable<bool> {
        &self.edit_mode
    }

    pub fn is_editing(&self) -> bool {
        self.edit_mode.get()
    }

    /// Flip between viewing and editing.  Leaving edit mode abandons any
    /// drag in progress.  Returns the new mode.
    pub fn toggle_edit_mode(&self) -> bool {
        let editing = !self.edit_mode.get();
        if !editing {
            self.dragged.set(None);
        }
        self.edit_mode.set(editing);
        info!("edit mode {}", if editing { "enabled" } else { "disabled" });
        editing
    }

    /// The widget currently being dragged, if any.
    pub fn dragged(&self) -> Option<WidgetKind> {
        self.dragged.get()
    }

    /// Record `kind` as the dragged widget.  Rejected while viewing.
    pub fn begin_drag(&self, kind: WidgetKind) -> bool {
        if !self.is_editing() {
            return false;
        }
        debug!("drag begin: {}", kind);
        self.dragged.set(Some(kind));
        true
    }

    /// Forget the dragged widget without changing the layout.
    pub fn end_drag(&self) {
        if let Some(kind) = self.dragged.take() {
            debug!("drag end: {}", kind);
        }
    }

    /// Drop the dragged widget onto `target`.
    ///
    /// `x` is the pointer position relative to the target and `width` its
    /// allocated width; see [`DropSide::from_pointer`].  Returns `false`
    /// (the drop is not accepted) when not editing, when nothing is being
    /// dragged, when the dragged widget is `target` itself, or when `target`
    /// is not on the bar.
    pub fn drop_on_widget(&self, target: WidgetKind, x: f64, width: f64) -> bool {
        let Some(kind) = self.accepting_drop() else {
            return false;
        };
        if kind == target {
            return false;
        }
        let side = DropSide::from_pointer(x, width);
        let mut layout = self.layout.get();
        if !layout.move_next_to(kind, target, side) {
            debug!("drop of {} onto {} rejected", kind, target);
            return false;
        }
        debug!("dropped {} {:?} {}", kind, side, target);
        self.commit(layout);
        true
    }

    /// Drop the dragged widget into the empty-slot placeholder of `slot`,
    /// appending it to that slot.
    pub fn drop_on_zone(&self, slot: Slot) -> bool {
        let Some(kind) = self.accepting_drop() else {
            return false;
        };
        let mut layout = self.layout.get();
        layout.append(kind, slot);
        debug!("dropped {} into {} zone", kind, slot);
        self.commit(layout);
        true
    }

    /// Replace the whole layout (e.g. a reset) and persist it.
    pub fn replace(&self, layout: BarLayout) {
        self.dragged.set(None);
        self.commit(layout);
    }

    fn accepting_drop(&self) -> Option<WidgetKind> {
        if !self.is_editing() {
            return None;
        }
        self.dragged.get()
    }

    fn commit(&self, layout: BarLayout) {
        self.dragged.set(None);
        if let Err(e) = self.store.save(&layout) {
            error!("failed to save bar layout: {}", e);
        }
        self.layout.set(layout);
    }
}
