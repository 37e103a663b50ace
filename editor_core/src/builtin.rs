//! Commands every note editor ships with.

use crate::command::Command;
use crate::editor::Editor;
use crate::error::CommandError;
use crate::format::FormatKind;
use crate::plugin::Plugin;

/// Plugin id under which the built-in commands are registered.
pub const BUILTIN_PLUGIN_ID: &str = "core";

/// Registers undo/redo, formatting and panel commands.
#[derive(Debug, Default)]
pub struct BuiltinCommands;

impl BuiltinCommands {
    pub fn new() -> Self {
        Self
    }
}

fn shortcut_for(kind: FormatKind) -> Option<&'static str> {
    match kind {
        FormatKind::Bold => Some("Mod+B"),
        FormatKind::Italic => Some("Mod+I"),
        FormatKind::Code => Some("Mod+`"),
        _ => None,
    }
}

fn format_command(kind: FormatKind) -> Command {
    let name = {
        let mut chars = kind.name().chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
            None => String::new(),
        }
    };
    let command = Command::new(format!("format.{}", kind.name()), name, move |editor, _| {
        editor
            .format_active(kind)
            .map(|_| ())
            .map_err(|e| CommandError::new(e.to_string()))
    })
    .with_description(format!("Apply {} formatting to the selection", kind))
    .with_category("Format")
    .with_enabled(|editor: &Editor| editor.selection().is_some());

    match shortcut_for(kind) {
        Some(shortcut) => command.with_shortcut(shortcut),
        None => command,
    }
}

impl Plugin for BuiltinCommands {
    fn id(&self) -> &str {
        BUILTIN_PLUGIN_ID
    }

    fn name(&self) -> &str {
        "Built-in commands"
    }

    fn commands(&self) -> Vec<Command> {
        let mut commands = vec![
            Command::new("history.undo", "Undo", |editor, _| {
                editor.undo();
                Ok(())
            })
            .with_shortcut("Mod+Z")
            .with_category("Edit")
            .with_enabled(|editor: &Editor| editor.can_undo()),
            Command::new("history.redo", "Redo", |editor, _| {
                editor.redo();
                Ok(())
            })
            .with_shortcut("Mod+Shift+Z")
            .with_category("Edit")
            .with_enabled(|editor: &Editor| editor.can_redo()),
            Command::new("search.toggle", "Find", |editor, _| {
                editor.toggle_search();
                Ok(())
            })
            .with_shortcut("Mod+F")
            .with_category("View"),
            Command::new("palette.toggle", "Command Palette", |editor, _| {
                editor.toggle_command_palette();
                Ok(())
            })
            .with_shortcut("Mod+K")
            .with_category("View"),
        ];
        commands.extend(FormatKind::ALL.into_iter().map(format_command));
        commands
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keymap::KeyChord;

    fn editor_with_builtins(content: &str) -> Editor {
        let mut editor = Editor::with_content(content);
        editor.register_plugin(BuiltinCommands::new()).unwrap();
        editor
    }

    #[test]
    fn test_registers_all_commands() {
        let editor = editor_with_builtins("");
        assert_eq!(editor.commands().len(), 4 + FormatKind::ALL.len());
        assert!(editor.commands().contains("format.link"));
        assert_eq!(editor.commands().get("format.bold").unwrap().name, "Bold");
    }

    #[test]
    fn test_undo_disabled_until_edit() {
        let mut editor = editor_with_builtins("");
        assert!(!editor.execute_command("history.undo", None).unwrap());

        editor.set_content("text");
        assert!(editor.execute_command("history.undo", None).unwrap());
        assert_eq!(editor.content(), "");
        assert!(editor.execute_command("history.redo", None).unwrap());
        assert_eq!(editor.content(), "text");
    }

    #[test]
    fn test_shortcuts_dispatch() {
        let mut editor = editor_with_builtins("hello world");
        editor.select(0, 5).unwrap();
        assert!(editor.handle_key(&KeyChord::primary("b")).unwrap());
        assert_eq!(editor.content(), "**hello** world");

        assert!(editor.handle_key(&KeyChord::primary("z")).unwrap());
        assert_eq!(editor.content(), "hello world");
        assert!(editor
            .handle_key(&KeyChord::primary("z").with_shift())
            .unwrap());
        assert_eq!(editor.content(), "**hello** world");

        assert!(editor.handle_key(&KeyChord::primary("k")).unwrap());
        assert!(editor.panels().palette_open);
        assert!(!editor.handle_key(&KeyChord::primary("q")).unwrap());
    }

    #[test]
    fn test_format_disabled_without_selection() {
        let mut editor = editor_with_builtins("hello");
        assert!(!editor.execute_command("format.italic", None).unwrap());
        assert_eq!(editor.content(), "hello");
    }
}
