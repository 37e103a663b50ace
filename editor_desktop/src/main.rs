//! Note Editor - Edit a note line by line with autosave.
//!
//! Usage: note-editor --dir NOTES --note ID [--config autosave.json]
//!
//! Plain input lines are appended to the note. Lines starting with `:` are
//! editor commands, see `:help`.

use clap::Parser;
use note_editor_autosave::{
    sync_save_status, Autosave, AutosaveConfig, AutosavePlugin, FileStore,
};
use note_editor_core::{BuiltinCommands, Editor, FormatKind, KeyChord};
use std::error::Error;
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

const HELP: &str = "\
commands:
  :undo | :redo
  :select <start> <end>
  :bold | :italic | :code | :heading | :quote | :list | :link
  :run <command-id>
  :key <chord>            e.g. Mod+Shift+Z
  :commands [query]
  :stats | :status | :show
  :quit";

#[derive(Parser, Debug)]
#[command(name = "note-editor", version, about = "Terminal note editor with autosave")]
struct Args {
    /// Directory notes are stored in.
    #[arg(short = 'd', long = "dir", value_name = "PATH")]
    dir: PathBuf,

    /// Id of the note to open; created on first save.
    #[arg(short = 'n', long = "note", value_name = "ID")]
    note: String,

    /// Autosave settings as JSON.
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    config: Option<PathBuf>,
}

/// One line of user input.
#[derive(Debug, PartialEq)]
enum Input {
    Append(String),
    Undo,
    Redo,
    Select(usize, usize),
    Format(FormatKind),
    Run(String),
    Key(KeyChord),
    Commands(Option<String>),
    Stats,
    Status,
    Show,
    Help,
    Quit,
}

fn parse_input(line: &str) -> Result<Input, String> {
    let Some(command) = line.strip_prefix(':') else {
        return Ok(Input::Append(line.to_string()));
    };
    let mut parts = command.split_whitespace();
    let name = parts.next().unwrap_or_default();
    let rest: Vec<&str> = parts.collect();

    let input = match (name, rest.as_slice()) {
        ("undo", []) => Input::Undo,
        ("redo", []) => Input::Redo,
        ("select", [start, end]) => {
            let start = start.parse().map_err(|_| format!("invalid offset '{start}'"))?;
            let end = end.parse().map_err(|_| format!("invalid offset '{end}'"))?;
            Input::Select(start, end)
        }
        ("run", [id]) => Input::Run(id.to_string()),
        ("key", [chord]) => Input::Key(chord.parse()?),
        ("commands", []) => Input::Commands(None),
        ("commands", [query]) => Input::Commands(Some(query.to_string())),
        ("stats", []) => Input::Stats,
        ("status", []) => Input::Status,
        ("show", []) => Input::Show,
        ("help", []) => Input::Help,
        ("quit" | "q", []) => Input::Quit,
        (name, []) => Input::Format(
            name.parse()
                .map_err(|_| format!("unknown command ':{name}', try :help"))?,
        ),
        _ => return Err(format!("bad arguments for ':{name}', try :help")),
    };
    Ok(input)
}

fn apply(
    editor: &mut Editor,
    autosave: &Autosave,
    input: Input,
    out: &mut impl Write,
) -> Result<(), Box<dyn Error>> {
    match input {
        Input::Append(line) => {
            let content = editor.content();
            let content = if content.is_empty() {
                line
            } else {
                format!("{content}\n{line}")
            };
            editor.set_content(content);
        }
        Input::Undo => {
            if !editor.undo() {
                writeln!(out, "nothing to undo")?;
            }
        }
        Input::Redo => {
            if !editor.redo() {
                writeln!(out, "nothing to redo")?;
            }
        }
        Input::Select(start, end) => {
            let selection = editor.select(start, end)?;
            writeln!(out, "selected {:?}", selection.text)?;
        }
        Input::Format(kind) => {
            if !editor.format_active(kind)? {
                writeln!(out, "select some text first")?;
            }
        }
        Input::Run(id) => {
            if !editor.execute_command(&id, None)? {
                writeln!(out, "{id} is not available right now")?;
            }
        }
        Input::Key(chord) => {
            if !editor.handle_key(&chord)? {
                writeln!(out, "nothing bound to {chord}")?;
            }
        }
        Input::Commands(query) => {
            let commands = match &query {
                Some(query) => editor.commands().search(query),
                None => editor.commands().sorted(),
            };
            for command in commands {
                let shortcut = command.shortcut.as_deref().unwrap_or("");
                writeln!(out, "{:<18} {:<20} {}", command.id, command.name, shortcut)?;
            }
        }
        Input::Stats => writeln!(out, "{}", serde_json::to_string(&editor.stats())?)?,
        Input::Status => {
            writeln!(out, "editor: {:?}", editor.save_status())?;
            writeln!(out, "autosave: {}", serde_json::to_string(&autosave.status())?)?;
        }
        Input::Show => writeln!(out, "{}", editor.content())?,
        Input::Help => writeln!(out, "{HELP}")?,
        Input::Quit => {}
    }
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<AutosaveConfig, Box<dyn Error>> {
    match path {
        Some(path) => {
            let json = fs::read_to_string(path)?;
            Ok(AutosaveConfig::from_json(&json)?)
        }
        None => Ok(AutosaveConfig::default()),
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    log::info!("Starting Note Editor");

    let config = load_config(args.config.as_deref())?;
    let store = FileStore::new(&args.dir);
    let path = store.path_for(&args.note)?;
    let existing = match fs::read_to_string(&path) {
        Ok(content) => Some(content),
        Err(e) if e.kind() == io::ErrorKind::NotFound => None,
        Err(e) => return Err(e.into()),
    };

    let autosave = Autosave::start(args.note.as_str(), Arc::new(store), config)?;
    let mut editor = Editor::new();
    if let Some(content) = existing {
        log::info!("Opening note: {}", path.display());
        editor.load(&content);
    }
    editor.register_plugin(BuiltinCommands::new())?;
    editor.register_plugin(AutosavePlugin::new(autosave.handle()))?;

    let mut stdout = io::stdout();
    for line in io::stdin().lock().lines() {
        let line = line?;
        sync_save_status(&autosave, &mut editor);
        match parse_input(&line) {
            Ok(Input::Quit) => break,
            Ok(input) => {
                if let Err(e) = apply(&mut editor, &autosave, input, &mut stdout) {
                    eprintln!("error: {e}");
                }
            }
            Err(e) => eprintln!("{e}"),
        }
        stdout.flush()?;
    }

    match autosave.handle().shutdown_blocking() {
        Ok(()) => log::info!("All changes saved to {}", path.display()),
        Err(e) => log::error!("Final save failed: {}", e),
    }
    sync_save_status(&autosave, &mut editor);
    log::info!("Note Editor exited ({:?})", editor.save_status());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_input() {
        assert_eq!(parse_input("plain text"), Ok(Input::Append("plain text".into())));
        assert_eq!(parse_input(":undo"), Ok(Input::Undo));
        assert_eq!(parse_input(":select 2 7"), Ok(Input::Select(2, 7)));
        assert_eq!(parse_input(":Bold"), Ok(Input::Format(FormatKind::Bold)));
        assert_eq!(
            parse_input(":key Mod+Shift+Z"),
            Ok(Input::Key(KeyChord::primary("z").with_shift()))
        );
        assert_eq!(
            parse_input(":commands format"),
            Ok(Input::Commands(Some("format".into())))
        );
        assert!(parse_input(":select 2").is_err());
        assert!(parse_input(":select a b").is_err());
        assert!(parse_input(":frobnicate").is_err());
    }
}
