//! Editor Core - Plain-text note editing engine.
//!
//! This crate contains all editor state and behavior without any
//! dependencies on rendering, storage or an async runtime. Hosts drive an
//! [`Editor`] and observe it through subscriptions and the event bus.

pub mod buffer;
pub mod builtin;
pub mod command;
pub mod config;
pub mod decoration;
pub mod editor;
pub mod error;
pub mod events;
pub mod format;
pub mod history;
pub mod keymap;
pub mod plugin;
mod registry;
pub mod selection;
pub mod stats;

pub use buffer::TextBuffer;
pub use builtin::{BuiltinCommands, BUILTIN_PLUGIN_ID};
pub use command::{Command, CommandRegistry};
pub use config::EditorConfig;
pub use decoration::{Decoration, DecorationKind, DecorationRegistry};
pub use editor::{Editor, Panels, SaveStatus, Subscription, Toolbar};
pub use error::{CommandError, EditorError, Result};
pub use events::{ChangeOrigin, EditorEvent, HandlerId};
pub use format::FormatKind;
pub use history::{History, HistoryConfig, UndoEntry};
pub use keymap::{KeyChord, Keymap};
pub use plugin::{Cleanup, Plugin, PluginContext};
pub use registry::Owner;
pub use selection::Selection;
pub use stats::Stats;
