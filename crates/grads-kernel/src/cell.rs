//! Splitting a cell into interpreter statements and kernel directives.
//!
//! Lines starting with `*%` are directives for the kernel (GrADS itself
//! treats `*` lines as comments):
//!
//! - `*%script`: the rest of the cell is a GrADS script
//! - `*%display`: show the figure after the cell runs
//! - `*%display_size W H` / `*%display_size default`: change the figure size

use crate::display::DisplaySize;

/// Prefix marking a kernel directive.
pub const MAGIC_PREFIX: &str = "*%";

/// Message shown for a malformed `*%display_size`.
pub const INVALID_SIZE_MESSAGE: &str = "Invalid format for *%display_size";

/// A parsed `*%display_size` request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeRequest {
    /// Back to the default size.
    Default,
    /// An explicit width and height.
    Custom(DisplaySize),
    /// Arguments that could not be parsed.
    Invalid,
}

impl SizeRequest {
    /// Parses the arguments following `*%display_size`.
    pub fn parse(args: &[&str]) -> Self {
        match args {
            ["default", ..] => SizeRequest::Default,
            [w, h, ..] => match (w.parse::<u32>(), h.parse::<u32>()) {
                (Ok(width), Ok(height)) if width > 0 && height > 0 => {
                    SizeRequest::Custom(DisplaySize::new(width, height))
                }
                _ => SizeRequest::Invalid,
            },
            _ => SizeRequest::Invalid,
        }
    }
}

/// A kernel directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Magic {
    Script,
    Display,
    DisplaySize(SizeRequest),
    /// Unrecognised directives are ignored.
    Other(String),
}

impl Magic {
    /// Parses a trimmed line starting with [`MAGIC_PREFIX`].
    pub fn parse(line: &str) -> Option<Self> {
        if !line.starts_with(MAGIC_PREFIX) {
            return None;
        }
        let parts: Vec<&str> = line.split_whitespace().collect();
        let magic = match parts.first().copied() {
            Some("*%script") => Magic::Script,
            Some("*%display") => Magic::Display,
            Some("*%display_size") => Magic::DisplaySize(SizeRequest::parse(&parts[1..])),
            Some(other) => Magic::Other(other.to_string()),
            None => Magic::Other(String::new()),
        };
        Some(magic)
    }
}

/// One in-order action of a cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Send a line to the interpreter.
    Statement(String),
    /// Change the display size.
    Resize(SizeRequest),
}

/// Everything a cell asks the kernel to do.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CellPlan {
    /// Statements and resizes, in source order.
    pub steps: Vec<Step>,
    /// Script body collected after `*%script`.
    pub script: Option<String>,
    /// Whether a figure should be shown afterwards.
    pub display: bool,
}

impl CellPlan {
    /// Plans a cell.
    pub fn parse(code: &str) -> Self {
        let mut plan = CellPlan::default();
        let mut script: Option<String> = None;

        for raw in code.split('\n') {
            let line = raw.trim();
            let magic = Magic::parse(line);

            match &magic {
                Some(Magic::Script) => {
                    script.get_or_insert_with(String::new);
                }
                Some(Magic::Display) => plan.display = true,
                Some(Magic::DisplaySize(request)) => plan.steps.push(Step::Resize(*request)),
                Some(Magic::Other(_)) | None => {}
            }

            if let Some(body) = script.as_mut() {
                body.push_str(line);
                body.push('\n');
            } else if magic.is_none() && !line.is_empty() {
                if draws(line) {
                    plan.display = true;
                }
                plan.steps.push(Step::Statement(line.to_string()));
            }
        }

        plan.script = script;
        plan
    }

    /// Interpreter statements in order.
    pub fn statements(&self) -> impl Iterator<Item = &str> {
        self.steps.iter().filter_map(|step| match step {
            Step::Statement(s) => Some(s.as_str()),
            Step::Resize(_) => None,
        })
    }
}

/// True for statements that draw on the page (`d ...`, `display ...`).
pub fn draws(statement: &str) -> bool {
    statement.starts_with("d ") || statement.starts_with("display")
}
