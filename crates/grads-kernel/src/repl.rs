//! Interactive REPL (Read-Eval-Print Loop) for the GrADS kernel.

use std::fs;
use std::path::{Path, PathBuf};

use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::history::DefaultHistory;
use rustyline::validate::{ValidationContext, ValidationResult, Validator};
use rustyline::{Context, Editor, Helper};
use tracing::{debug, warn};

use crate::cell::SizeRequest;
use crate::kernel::{GradsKernel, ReplyStatus};
use crate::paths;
use crate::Result;

/// Help information for a command.
pub struct CommandHelp {
    /// Command name (e.g., "size").
    pub name: &'static str,
    /// Command aliases (e.g., ["q"]).
    pub aliases: &'static [&'static str],
    /// Brief one-line description.
    pub brief: &'static str,
    /// Usage syntax.
    pub usage: &'static str,
}

/// Static help entries for all commands.
static COMMAND_HELP: &[CommandHelp] = &[
    CommandHelp {
        name: "size",
        aliases: &[],
        brief: "Show or change the figure size",
        usage: "/size [W H | default]",
    },
    CommandHelp {
        name: "save",
        aliases: &[],
        brief: "Export the current figure to a file",
        usage: "/save <path>",
    },
    CommandHelp {
        name: "help",
        aliases: &["h", "?"],
        brief: "Show help",
        usage: "/help",
    },
    CommandHelp {
        name: "quit",
        aliases: &["q", "exit"],
        brief: "Exit the REPL and stop GrADS",
        usage: "/quit",
    },
];

/// Slash commands available in the REPL.
#[derive(Debug, Clone, PartialEq)]
pub enum ReplCommand {
    /// Show help
    Help,
    /// Exit the REPL
    Quit,
    /// Show the figure size, or change it
    Size(Option<SizeRequest>),
    /// Export the current figure
    Save(PathBuf),
    /// A cell for GrADS
    Cell(String),
    /// Blank input
    Empty,
    /// Unknown or malformed command
    Unknown(String),
}

impl ReplCommand {
    /// Parses input into a REPL command.
    pub fn parse(input: &str) -> Self {
        let trimmed = input.trim();

        if trimmed.is_empty() {
            return ReplCommand::Empty;
        }

        let Some(stripped) = trimmed.strip_prefix('/') else {
            return ReplCommand::Cell(input.to_string());
        };

        let parts: Vec<&str> = stripped.split_whitespace().collect();
        let cmd = parts.first().map(|c| c.to_lowercase()).unwrap_or_default();
        let args = parts.get(1..).unwrap_or_default();

        match cmd.as_str() {
            "help" | "h" | "?" => ReplCommand::Help,
            "quit" | "q" | "exit" => ReplCommand::Quit,
            "size" if args.is_empty() => ReplCommand::Size(None),
            "size" => ReplCommand::Size(Some(SizeRequest::parse(args))),
            "save" => match args.first() {
                Some(path) => ReplCommand::Save(PathBuf::from(shellexpand::tilde(path).as_ref())),
                None => ReplCommand::Unknown("save requires a path".to_string()),
            },
            _ => ReplCommand::Unknown(cmd),
        }
    }
}

/// True once a cell is ready to run. A cell opened with `*%script` runs
/// when a blank line is entered; everything else runs on Enter.
pub fn is_cell_complete(input: &str) -> bool {
    if !input.trim_start().starts_with("*%script") {
        return true;
    }
    match input.rsplit_once('\n') {
        Some((_, last)) => last.trim().is_empty(),
        None => false,
    }
}

/// Line-editor helper: slash-command completion and multi-line scripts.
struct CellHelper;

impl CellHelper {
    const COMMANDS: &'static [&'static str] = &["/exit", "/help", "/quit", "/save", "/size"];
}

impl Completer for CellHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        if !line.starts_with('/') {
            return Ok((0, vec![]));
        }

        let prefix = &line[..pos];
        let matches: Vec<Pair> = Self::COMMANDS
            .iter()
            .filter(|cmd| cmd.starts_with(prefix))
            .map(|cmd| Pair {
                display: cmd.to_string(),
                replacement: cmd.to_string(),
            })
            .collect();

        Ok((0, matches))
    }
}

impl Hinter for CellHelper {
    type Hint = String;
}

impl Highlighter for CellHelper {}

impl Validator for CellHelper {
    fn validate(&self, ctx: &mut ValidationContext<'_>) -> rustyline::Result<ValidationResult> {
        if is_cell_complete(ctx.input()) {
            Ok(ValidationResult::Valid(None))
        } else {
            Ok(ValidationResult::Incomplete)
        }
    }
}

impl Helper for CellHelper {}

/// REPL state
pub struct Repl {
    editor: Editor<CellHelper, DefaultHistory>,
    kernel: GradsKernel,
    history_path: PathBuf,
}

impl Repl {
    /// Creates a REPL around a running kernel, loading history from
    /// `state_dir`.
    pub fn new(kernel: GradsKernel, state_dir: &Path) -> Result<Self> {
        let config = rustyline::Config::builder()
            .completion_type(rustyline::CompletionType::List)
            .build();
        let mut editor = Editor::with_config(config)?;
        editor.set_helper(Some(CellHelper));

        if let Err(e) = fs::create_dir_all(state_dir) {
            warn!(dir = %state_dir.display(), error = %e, "cannot create state directory");
        }
        let history_path = paths::history_file(state_dir);
        if history_path.exists() {
            let _ = editor.load_history(&history_path);
        }

        Ok(Self {
            editor,
            kernel,
            history_path,
        })
    }

    /// Runs the REPL loop, then stops GrADS.
    pub fn run(&mut self) -> Result<()> {
        println!("grads-kernel v{}", env!("CARGO_PKG_VERSION"));
        println!("Type /help for commands, /quit to exit");
        println!();

        loop {
            let prompt = self.prompt();

            match self.editor.readline(&prompt) {
                Ok(line) => {
                    self.editor.add_history_entry(line.as_str())?;

                    let cmd = ReplCommand::parse(&line);
                    debug!(?cmd, "Parsed command");

                    match self.handle_command(cmd) {
                        Ok(true) => break, // Quit requested
                        Ok(false) => {}
                        Err(e) => eprintln!("Error: {}", e),
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    println!("^C");
                }
                Err(ReadlineError::Eof) => {
                    println!("^D");
                    break;
                }
                Err(err) => {
                    eprintln!("Error: {:?}", err);
                    break;
                }
            }
        }

        if let Err(e) = self.editor.save_history(&self.history_path) {
            warn!(path = %self.history_path.display(), error = %e, "failed to save history");
        }

        self.kernel.shutdown()?;
        println!("Goodbye!");
        Ok(())
    }

    /// Returns the prompt string.
    fn prompt(&self) -> String {
        format!("In [{}]: ", self.kernel.execution_count() + 1)
    }

    /// Handles a REPL command. Returns Ok(true) if should quit.
    fn handle_command(&mut self, cmd: ReplCommand) -> Result<bool> {
        match cmd {
            ReplCommand::Help => print_help(),
            ReplCommand::Quit => return Ok(true),
            ReplCommand::Size(None) => println!("Figure size: {}", self.kernel.display_size()),
            ReplCommand::Size(Some(request)) => {
                self.kernel.set_display_size(request);
                if request != SizeRequest::Invalid {
                    println!("Figure size: {}", self.kernel.display_size());
                }
            }
            ReplCommand::Save(path) => {
                let saved = self.kernel.save_figure(&path)?;
                println!("Saved {}", saved.display());
            }
            ReplCommand::Cell(code) => {
                let reply = self.kernel.execute_cell(&code)?;
                if reply.status == ReplyStatus::Error && !self.kernel.is_alive() {
                    println!("GrADS is no longer running.");
                    return Ok(true);
                }
            }
            ReplCommand::Empty => {}
            ReplCommand::Unknown(cmd) => {
                println!("Unknown command: /{}. Type /help for commands.", cmd);
            }
        }
        Ok(false)
    }
}

fn print_help() {
    println!("Commands:");
    for help in COMMAND_HELP {
        let aliases = if help.aliases.is_empty() {
            String::new()
        } else {
            format!(
                " ({})",
                help.aliases
                    .iter()
                    .map(|a| format!("/{}", a))
                    .collect::<Vec<_>>()
                    .join(", ")
            )
        };
        println!("  {:<24} {}{}", help.usage, help.brief, aliases);
    }
    println!();
    println!("Anything else runs as GrADS commands. Cell directives:");
    println!("  *%display                show the figure after the cell");
    println!("  *%display_size W H       change the figure size (or 'default')");
    println!("  *%script                 run the cell as a script; end with a blank line");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::DisplaySize;

    #[test]
    fn test_parse_slash_commands() {
        assert_eq!(ReplCommand::parse("/help"), ReplCommand::Help);
        assert_eq!(ReplCommand::parse("/?"), ReplCommand::Help);
        assert_eq!(ReplCommand::parse("/q"), ReplCommand::Quit);
        assert_eq!(ReplCommand::parse("  /EXIT  "), ReplCommand::Quit);
        assert_eq!(ReplCommand::parse("/bogus"), ReplCommand::Unknown("bogus".to_string()));
    }

    #[test]
    fn test_parse_size() {
        assert_eq!(ReplCommand::parse("/size"), ReplCommand::Size(None));
        assert_eq!(
            ReplCommand::parse("/size 800 600"),
            ReplCommand::Size(Some(SizeRequest::Custom(DisplaySize::new(800, 600))))
        );
        assert_eq!(
            ReplCommand::parse("/size default"),
            ReplCommand::Size(Some(SizeRequest::Default))
        );
        assert_eq!(
            ReplCommand::parse("/size big"),
            ReplCommand::Size(Some(SizeRequest::Invalid))
        );
    }

    #[test]
    fn test_parse_save() {
        assert_eq!(
            ReplCommand::parse("/save /tmp/fig.png"),
            ReplCommand::Save(PathBuf::from("/tmp/fig.png"))
        );
        assert!(matches!(ReplCommand::parse("/save"), ReplCommand::Unknown(_)));
    }

    #[test]
    fn test_parse_cell_keeps_text() {
        assert_eq!(ReplCommand::parse("   "), ReplCommand::Empty);
        assert_eq!(
            ReplCommand::parse("*%script\n'd t'\n"),
            ReplCommand::Cell("*%script\n'd t'\n".to_string())
        );
        assert_eq!(ReplCommand::parse("q dims"), ReplCommand::Cell("q dims".to_string()));
    }

    #[test]
    fn test_script_cells_wait_for_blank_line() {
        assert!(is_cell_complete("d t"));
        assert!(!is_cell_complete("*%script"));
        assert!(!is_cell_complete("*%script\n'd t'"));
        assert!(is_cell_complete("*%script\n'd t'\n"));
        assert!(is_cell_complete("*%script\n'd t'\n   "));
    }

    #[test]
    fn test_completer_matches_prefix() {
        let helper = CellHelper;
        let history = DefaultHistory::new();
        let ctx = Context::new(&history);

        let (pos, matches) = helper.complete("/sa", 3, &ctx).unwrap();
        assert_eq!(pos, 0);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].replacement, "/save");
    }

    #[test]
    fn test_completer_multiple_matches() {
        let helper = CellHelper;
        let history = DefaultHistory::new();
        let ctx = Context::new(&history);

        let (_, matches) = helper.complete("/s", 2, &ctx).unwrap();
        let replacements: Vec<&str> = matches.iter().map(|m| m.replacement.as_str()).collect();
        assert_eq!(replacements, vec!["/save", "/size"]);
    }

    #[test]
    fn test_completer_non_slash_ignored() {
        let helper = CellHelper;
        let history = DefaultHistory::new();
        let ctx = Context::new(&history);

        let (_, matches) = helper.complete("d t", 3, &ctx).unwrap();
        assert!(matches.is_empty());
    }

    #[test]
    fn test_help_covers_completions() {
        for cmd in CellHelper::COMMANDS {
            let name = cmd.trim_start_matches('/');
            assert!(
                COMMAND_HELP
                    .iter()
                    .any(|h| h.name == name || h.aliases.contains(&name)),
                "no help for {}",
                cmd
            );
        }
    }
}
