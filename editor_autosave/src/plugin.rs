//! Connects an [`Editor`] to the autosave pipeline.

use crate::messages::AutosaveEvent;
use crate::pipeline::{Autosave, AutosaveHandle};
use crate::store::NoteDraft;
use note_editor_core::{Cleanup, Editor, EditorEvent, Plugin, PluginContext, Result};

/// Plugin id of [`AutosavePlugin`].
pub const AUTOSAVE_PLUGIN_ID: &str = "autosave";

/// Forwards every user edit to the autosave worker.
///
/// Content loaded with [`Editor::load`] is already persisted and is not
/// forwarded. Unregistering the plugin requests a flush.
pub struct AutosavePlugin {
    handle: AutosaveHandle,
}

impl AutosavePlugin {
    pub fn new(handle: AutosaveHandle) -> Self {
        Self { handle }
    }
}

impl Plugin for AutosavePlugin {
    fn id(&self) -> &str {
        AUTOSAVE_PLUGIN_ID
    }

    fn name(&self) -> &str {
        "Autosave"
    }

    fn setup(&mut self, ctx: &mut PluginContext<'_>) -> Result<Option<Cleanup>> {
        let handle = self.handle.clone();
        ctx.subscribe(move |event| {
            if let EditorEvent::ContentChanged { content, origin } = event {
                if origin.is_user_change() {
                    handle.content_changed(NoteDraft::from_content(content));
                }
            }
        });

        let handle = self.handle.clone();
        Ok(Some(Box::new(move || {
            handle.request_flush();
        })))
    }
}

/// Drains pending autosave events and mirrors the pipeline status onto the
/// editor's save indicator. Returns the number of events handled.
pub fn sync_save_status(autosave: &Autosave, editor: &mut Editor) -> usize {
    let mut handled = 0;
    while let Some(event) = autosave.try_recv_event() {
        match event {
            AutosaveEvent::StatusChanged(status) => editor.set_save_status(status.save_status()),
            AutosaveEvent::Failed {
                error,
                will_retry: false,
                ..
            } => log::warn!("Autosave gave up: {}", error),
            _ => {}
        }
        handled += 1;
    }
    handled
}
