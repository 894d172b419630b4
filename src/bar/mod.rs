//! Bar front-ends.
//!
//! When the `bar-gtk` feature is enabled, [`gtk::run_main_loop`] takes over
//! the main thread and drives both command processing and the bar window
//! through the GLib main loop.

use std::cell::Cell;

#[cfg(feature = "bar-gtk")]
pub mod gtk;

/// Coalesces re-render requests.
///
/// A layout change raised inside a drop handler must not tear down the
/// widget that is still emitting the signal, so front-ends render from an
/// idle callback instead.  Any number of requests before that callback runs
/// collapse into one render.
#[derive(Debug, Default)]
pub struct RenderQueue {
    pending: Cell<bool>,
}

impl RenderQueue {
    /// Mark a render as wanted.  Returns `true` when the caller must
    /// schedule the idle callback, `false` when one is already queued.
    pub fn request(&self) -> bool {
        !self.pending.replace(true)
    }

    /// Called from the idle callback.  Returns whether a render is due.
    pub fn take(&self) -> bool {
        self.pending.replace(false)
    }

    pub fn is_pending(&self) -> bool {
        self.pending.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::LayoutEditor;
    use crate::layout::{BarLayout, Slot, WidgetKind};
    use crate::traits::LayoutStore;
    use crate::variable::Variable;
    use std::rc::Rc;

    struct NullStore;

    #[derive(Debug, thiserror::Error)]
    #[error("unused")]
    struct NullErr;

    impl LayoutStore for NullStore {
        type Error = NullErr;

        fn save(&self, _: &BarLayout) -> Result<(), NullErr> {
            Ok(())
        }
    }

    #[test]
    fn requests_collapse_until_taken() {
        let q = RenderQueue::default();
        assert!(q.request());
        assert!(!q.request());
        assert!(q.take());
        assert!(!q.take());
        assert!(q.request());
    }

    #[test]
    fn drop_only_queues_a_render() {
        let editor = LayoutEditor::new(Variable::new(BarLayout::default()), Variable::new(true), NullStore);
        let queue = Rc::new(RenderQueue::default());
        let scheduled = Rc::new(Cell::new(0));

        let (q, s) = (Rc::clone(&queue), Rc::clone(&scheduled));
        let sub = editor.layout().subscribe(move |_| {
            if q.request() {
                s.set(s.get() + 1);
            }
        });
        assert!(queue.take());

        editor.begin_drag(WidgetKind::Clock);
        assert!(editor.drop_on_zone(Slot::Center));
        editor.replace(BarLayout::default());

        assert!(queue.is_pending());
        assert_eq!(scheduled.get(), 2);
        assert!(queue.take());
        sub.unsubscribe();
    }
}
