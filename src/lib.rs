//! **shellbar**: reactive state core and layout editor for a Wayland
//! desktop shell bar.
//!
//! The bar shows three slots (left, center, right) of widgets.  Users
//! rearrange widgets by drag-and-drop while *edit mode* is on; the resulting
//! layout is persisted as JSON and restored on the next start.
//!
//! # Architecture
//!
//! * [`variable::Variable`]: an observable value cell.  Every piece of live
//!   state in [`state::ShellState`] is one, and front-ends bind to them with
//!   [`Variable::subscribe`](variable::Variable::subscribe).
//! * [`editor::LayoutEditor`]: the edit-mode gate and the drag/drop rules
//!   over a [`layout::BarLayout`].
//! * [`traits::LayoutStore`], [`traits::CommandRunner`] and
//!   [`traits::CommandSource`]: seams for persistence, OS tools and the
//!   transport that delivers commands, so [`shell::Shell`] can be driven by
//!   test doubles.
//!
//! Concrete implementations live in [`system`] (brightnessctl, iwctl, awww,
//! matugen), [`ipc`] (Unix-socket command listener) and, behind the
//! `bar-gtk` feature, [`bar`] (GTK4 layer-shell bar).

pub mod bar;
pub mod command;
pub mod config;
pub mod debounce;
pub mod editor;
pub mod ipc;
pub mod layout;
pub mod settings;
pub mod shell;
pub mod state;
pub mod system;
pub mod traits;
pub mod variable;
