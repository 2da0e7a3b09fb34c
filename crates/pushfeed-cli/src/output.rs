//! Output formatting for pushfeed (text, json)

use clap::ValueEnum;
use colored::Colorize;
use pushfeed_client::{ErrorEvent, ErrorKind, EventData};

/// Output format options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// One colored line per event (default)
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

impl OutputFormat {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "text" => Some(Self::Text),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Context for output rendering
#[derive(Debug, Clone, Copy)]
pub struct OutputContext {
    pub format: OutputFormat,
    pub quiet: bool,
}

impl OutputContext {
    pub fn new(format: OutputFormat, no_color: bool, quiet: bool) -> Self {
        if no_color {
            colored::control::set_override(false);
        }
        Self { format, quiet }
    }

    /// Print a success message (unless in quiet mode)
    pub fn success(&self, msg: &str) {
        if !self.quiet {
            eprintln!("{}", msg.green());
        }
    }

    /// Print an info message (unless in quiet mode)
    pub fn info(&self, msg: &str) {
        if !self.quiet {
            eprintln!("{}", msg);
        }
    }

    /// Print a decoded event to stdout
    pub fn event(&self, event: &EventData) {
        match self.format {
            OutputFormat::Text => {
                let ty = event.notification_type().as_str();
                let rest = event.to_string();
                let rest = rest.strip_prefix(ty).unwrap_or(&rest);
                println!("{}{}", ty.cyan().bold(), rest);
            }
            OutputFormat::Json => {
                if let Ok(json) = serde_json::to_string(event) {
                    println!("{}", json);
                }
            }
        }
    }

    /// Print a feed error
    ///
    /// JSON output keeps errors on stdout, interleaved with events.
    pub fn feed_error(&self, error: &ErrorEvent) {
        match self.format {
            OutputFormat::Text => {
                let label = format!("{} error:", error.kind);
                let label = match error.kind {
                    ErrorKind::Decode => label.yellow(),
                    ErrorKind::Connect | ErrorKind::Read => label.red(),
                };
                eprintln!("{} {}", label, error.message);
            }
            OutputFormat::Json => {
                let line = serde_json::json!({ "error": error });
                println!("{}", line);
            }
        }
    }
}
