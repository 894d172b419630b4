//! GTK4 + layer-shell bar that runs on the **main thread**.
//!
//! # Widget tree
//!
//! ```text
//! window.bar                     (layer-shell, anchored top/left/right)
//! └ GtkCenterBox
//!     ├ start  GtkBox            (left slot)
//!     ├ center GtkBox            (center slot)
//!     └ end    GtkBox            (right slot)
//!         ├ .draggable-widget    (one per placed widget tag)
//!         │   └ .bar-widget      (label; the real widget goes here)
//!         └ .drop-zone           (only for an empty slot in edit mode)
//! ```
//!
//! # CSS selectors
//!
//! | Selector                         | Targets                               |
//! |----------------------------------|---------------------------------------|
//! | `window.bar`                     | The bar window                        |
//! | `window.bar-edit-mode`           | The bar while edit mode is on         |
//! | `.draggable-widget.edit-mode`    | Widgets that can be dragged           |
//! | `.draggable-widget.dragging`     | The widget being dragged              |
//! | `.drop-before` / `.drop-after`   | Insertion marker under the pointer    |
//! | `.drop-zone` / `.drop-zone-active` | Placeholder of an empty slot        |

use super::RenderQueue;
use crate::command::Request;
use crate::config::Config;
use crate::debounce::Debounce;
use crate::editor::LayoutEditor;
use crate::layout::{DropSide, Slot, WidgetKind};
use crate::shell::Shell;
use crate::traits::{CommandRunner, LayoutStore};
use crate::variable::Subscription;
use gtk4::prelude::*;
use gtk4::{gdk, glib};
use gtk4_layer_shell::{Edge, Layer, LayerShell};
use log::{debug, error, info, warn};
use std::cell::RefCell;
use std::collections::HashMap;
use std::path::Path;
use std::rc::Rc;
use std::sync::mpsc;
use std::time::{Duration, Instant, SystemTime};

const BAR_HEIGHT: i32 = 24;

//  Default CSS

const DEFAULT_CSS: &str = r#"
window.bar {
    background-color: rgba(20, 20, 24, 0.85);
}

.bar-widget {
    padding: 0 8px;
}

.draggable-widget.edit-mode {
    border: 1px dashed rgba(255, 255, 255, 0.4);
    border-radius: 6px;
}

.draggable-widget.dragging {
    opacity: 0.4;
}

.drop-before {
    box-shadow: inset 2px 0 0 0 #8ab4f8;
}

.drop-after {
    box-shadow: inset -2px 0 0 0 #8ab4f8;
}

.drop-zone {
    border: 1px dashed rgba(255, 255, 255, 0.25);
    border-radius: 6px;
}

.drop-zone-active {
    background-color: rgba(138, 180, 248, 0.25);
}
"#;

//  Bar view

/// The three slot boxes plus one reusable container per widget tag.
struct BarView<S: LayoutStore> {
    boxes: [(Slot, gtk4::Box); 3],
    editor: Rc<LayoutEditor<S>>,
    containers: RefCell<HashMap<WidgetKind, gtk4::Box>>,
    queue: RenderQueue,
}

impl<S: LayoutStore + 'static> BarView<S> {
    fn new(left: gtk4::Box, center: gtk4::Box, right: gtk4::Box, editor: Rc<LayoutEditor<S>>) -> Self {
        Self {
            boxes: [(Slot::Left, left), (Slot::Center, center), (Slot::Right, right)],
            editor,
            containers: RefCell::new(HashMap::new()),
            queue: RenderQueue::default(),
        }
    }

    /// Render from an idle callback, after the drag or drop handler that
    /// changed the layout has returned.
    fn schedule_render(view: &Rc<Self>) {
        if view.queue.request() {
            let view = Rc::clone(view);
            glib::idle_add_local_once(move || {
                if view.queue.take() {
                    view.render();
                }
            });
        }
    }

    /// Rebuild all three slots from the current layout and edit mode.
    fn render(&self) {
        let layout = self.editor.layout().get();
        let editing = self.editor.is_editing();

        for (_, slot_box) in &self.boxes {
            while let Some(child) = slot_box.first_child() {
                slot_box.remove(&child);
            }
        }

        for (slot, slot_box) in &self.boxes {
            let items = layout.slot(*slot);
            if items.is_empty() && editing {
                slot_box.append(&drop_zone(*slot, &self.editor));
                continue;
            }
            for kind in items {
                let container = self.container(*kind);
                if editing {
                    container.add_css_class("edit-mode");
                } else {
                    container.remove_css_class("edit-mode");
                }
                slot_box.append(&container);
            }
        }
        debug!("bar rendered (editing: {})", editing);
    }

    fn container(&self, kind: WidgetKind) -> gtk4::Box {
        if let Some(existing) = self.containers.borrow().get(&kind) {
            return existing.clone();
        }
        let container = draggable_container(kind, &self.editor);
        self.containers.borrow_mut().insert(kind, container.clone());
        container
    }
}

fn mark_drop_side(container: &gtk4::Box, side: Option<DropSide>) {
    container.remove_css_class("drop-before");
    container.remove_css_class("drop-after");
    match side {
        Some(DropSide::Before) => container.add_css_class("drop-before"),
        Some(DropSide::After) => container.add_css_class("drop-after"),
        None => {}
    }
}

/// Wrap the widget for `kind` in a box that is a drag source and a drop
/// target.  Both controllers stay attached; the editor rejects them while
/// viewing.
fn draggable_container<S: LayoutStore + 'static>(
    kind: WidgetKind,
    editor: &Rc<LayoutEditor<S>>,
) -> gtk4::Box {
    let container = gtk4::Box::new(gtk4::Orientation::Horizontal, 0);
    container.add_css_class("draggable-widget");
    container.set_valign(gtk4::Align::Center);

    let label = gtk4::Label::new(Some(kind.as_str()));
    label.add_css_class("bar-widget");
    label.add_css_class(kind.as_str());
    container.append(&label);

    //  Drag source
    let source = gtk4::DragSource::new();
    source.set_actions(gdk::DragAction::MOVE);
    {
        let editor = Rc::clone(editor);
        source.connect_prepare(move |_, _, _| {
            if !editor.begin_drag(kind) {
                return None;
            }
            Some(gdk::ContentProvider::for_value(&kind.as_str().to_value()))
        });
    }
    {
        let weak = container.downgrade();
        source.connect_drag_begin(move |_, _| {
            if let Some(c) = weak.upgrade() {
                c.add_css_class("dragging");
            }
        });
    }
    {
        let editor = Rc::clone(editor);
        let weak = container.downgrade();
        source.connect_drag_end(move |_, _, _| {
            if let Some(c) = weak.upgrade() {
                c.remove_css_class("dragging");
            }
            editor.end_drag();
        });
    }
    container.add_controller(source);

    //  Drop target
    let target = gtk4::DropTarget::new(glib::Type::STRING, gdk::DragAction::MOVE);
    {
        let weak = container.downgrade();
        target.connect_motion(move |_, x, _| {
            if let Some(c) = weak.upgrade() {
                mark_drop_side(&c, Some(DropSide::from_pointer(x, f64::from(c.width()))));
            }
            gdk::DragAction::MOVE
        });
    }
    {
        let weak = container.downgrade();
        target.connect_leave(move |_| {
            if let Some(c) = weak.upgrade() {
                mark_drop_side(&c, None);
            }
        });
    }
    {
        let editor = Rc::clone(editor);
        let weak = container.downgrade();
        target.connect_drop(move |_, _, x, _| {
            let Some(c) = weak.upgrade() else {
                return false;
            };
            mark_drop_side(&c, None);
            editor.drop_on_widget(kind, x, f64::from(c.width()))
        });
    }
    container.add_controller(target);

    container
}

/// Placeholder shown in an empty slot while editing.
fn drop_zone<S: LayoutStore + 'static>(slot: Slot, editor: &Rc<LayoutEditor<S>>) -> gtk4::Box {
    let zone = gtk4::Box::new(gtk4::Orientation::Horizontal, 0);
    zone.add_css_class("drop-zone");
    zone.set_hexpand(true);
    zone.set_size_request(40, BAR_HEIGHT);

    let label = gtk4::Label::new(Some(&format!("Drop here ({})", slot)));
    label.add_css_class("drop-zone-label");
    zone.append(&label);

    let target = gtk4::DropTarget::new(glib::Type::STRING, gdk::DragAction::MOVE);
    {
        let weak = zone.downgrade();
        target.connect_enter(move |_, _, _| {
            if let Some(z) = weak.upgrade() {
                z.add_css_class("drop-zone-active");
            }
            gdk::DragAction::MOVE
        });
    }
    {
        let weak = zone.downgrade();
        target.connect_leave(move |_| {
            if let Some(z) = weak.upgrade() {
                z.remove_css_class("drop-zone-active");
            }
        });
    }
    {
        let editor = Rc::clone(editor);
        target.connect_drop(move |_, _, _, _| editor.drop_on_zone(slot));
    }
    zone.add_controller(target);
    zone
}

//  Public API

/// Run the GTK4 main loop on the **current** (main) thread.
pub fn run_main_loop<S, R>(mut shell: Shell<S, R>, cmd_rx: mpsc::Receiver<Request>, config: Config)
where
    S: LayoutStore + 'static,
    R: CommandRunner + 'static,
{
    if let Err(e) = gtk4::init() {
        error!("failed to initialise GTK4: {}", e);
        return;
    }
    info!("GTK4 initialised on main thread");

    let provider = gtk4::CssProvider::new();
    load_css(&provider, &config.style.css_path);
    match gdk::Display::default() {
        Some(display) => {
            gtk4::style_context_add_provider_for_display(
                &display,
                &provider,
                gtk4::STYLE_PROVIDER_PRIORITY_APPLICATION,
            );
            info!("CSS registered on display");
        }
        None => warn!("no GDK display, CSS will not be applied"),
    }

    //  Layer-shell bar window
    let window = gtk4::Window::new();
    window.init_layer_shell();
    window.set_layer(Layer::Top);
    window.set_namespace("shellbar");
    window.auto_exclusive_zone_enable();
    for edge in [Edge::Top, Edge::Left, Edge::Right] {
        window.set_anchor(edge, true);
    }
    window.add_css_class("bar");

    let centerbox = gtk4::CenterBox::new();
    centerbox.set_height_request(BAR_HEIGHT);
    centerbox.set_valign(gtk4::Align::Center);
    let left = gtk4::Box::new(gtk4::Orientation::Horizontal, 4);
    let center = gtk4::Box::new(gtk4::Orientation::Horizontal, 0);
    let right = gtk4::Box::new(gtk4::Orientation::Horizontal, 8);
    centerbox.set_start_widget(Some(&left));
    centerbox.set_center_widget(Some(&center));
    centerbox.set_end_widget(Some(&right));
    window.set_child(Some(&centerbox));

    //  Bindings
    let state = shell.state().clone();
    let view = Rc::new(BarView::new(left, center, right, Rc::clone(shell.editor())));
    let mut subscriptions: Vec<Subscription> = Vec::new();
    {
        let view = Rc::clone(&view);
        subscriptions.push(state.layout.subscribe(move |_| BarView::schedule_render(&view)));
    }
    {
        let view = Rc::clone(&view);
        subscriptions.push(state.edit_mode.subscribe(move |_| BarView::schedule_render(&view)));
    }
    {
        let window = window.clone();
        subscriptions.push(state.edit_mode.subscribe(move |editing| {
            if *editing {
                window.add_css_class("bar-edit-mode");
            } else {
                window.remove_css_class("bar-edit-mode");
            }
        }));
    }
    window.present();
    info!("bar mapped");

    //  Main event loop (~60 fps)
    let main_loop = glib::MainLoop::new(None, false);
    let poll_interval = Duration::from_millis(config.brightness.poll_interval_ms.max(100));
    let mut next_poll = Instant::now();
    let mut colors_mtime = modified(&config.style.colors_path);
    let mut reload = Debounce::new(Duration::from_millis(config.style.reload_debounce_ms));
    {
        let main_loop = main_loop.clone();
        glib::timeout_add_local(Duration::from_millis(16), move || {
            // 1. Drain commands.
            loop {
                match cmd_rx.try_recv() {
                    Ok(request) => shell.respond(request),
                    Err(mpsc::TryRecvError::Empty) => break,
                    Err(mpsc::TryRecvError::Disconnected) => {
                        info!("all sources closed, exiting");
                        for sub in &subscriptions {
                            sub.unsubscribe();
                        }
                        main_loop.quit();
                        return glib::ControlFlow::Break;
                    }
                }
            }

            let now = Instant::now();

            // 2. Refresh live system values.
            if now >= next_poll {
                shell.tick();
                next_poll = now + poll_interval;

                // 3. Watch the generated color file.
                let mtime = modified(&config.style.colors_path);
                if mtime != colors_mtime {
                    colors_mtime = mtime;
                    reload.trigger(now);
                }
            }

            // 4. Reload CSS once the color file settles.
            if reload.poll(now) {
                info!("color file changed, reloading CSS");
                load_css(&provider, &config.style.css_path);
            }

            glib::ControlFlow::Continue
        });
    }

    info!("entering GLib main loop");
    main_loop.run();
    info!("GLib main loop exited");
}

fn modified(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}

//  CSS loading

fn load_css(provider: &gtk4::CssProvider, css_path: &Path) {
    let css_content = if css_path.exists() {
        match std::fs::read_to_string(css_path) {
            Ok(content) => {
                info!("user CSS: {} ({} bytes)", css_path.display(), content.len());
                content
            }
            Err(e) => {
                warn!("CSS read failed ({}): {}; using built-in", css_path.display(), e);
                DEFAULT_CSS.to_string()
            }
        }
    } else {
        info!("no user CSS, using built-in default");
        DEFAULT_CSS.to_string()
    };

    #[allow(deprecated)]
    provider.load_from_data(&css_content);
}
