//! Output formatting module
//!
//! Everything the user sees on stdout/stderr goes through here: the styled
//! line helpers on `OutputContext`, the human renderer, the JSON printer and
//! the `ProgressReporter` adapters handed to application services.

pub mod human;
pub mod json;
pub mod progress;
pub mod reporter;
pub mod styles;

use console::Term;
use owo_colors::OwoColorize as _;
pub use human::HumanRenderer;
pub use reporter::{Reporter, SilentReporter, TerminalReporter};
pub use styles::Styles;

/// Output context carrying styling and terminal state.
pub struct OutputContext {
    pub styles: Styles,
    /// Whether stdout is a TTY.
    pub is_tty: bool,
    /// Whether to suppress non-error output.
    pub quiet: bool,
}

impl OutputContext {
    /// Create output context from `--no-color`, `--quiet` and the terminal.
    ///
    /// Colors need a TTY and no `NO_COLOR` in the environment.
    #[must_use]
    pub fn new(no_color: bool, quiet: bool) -> Self {
        let is_tty = Term::stdout().is_term();
        let use_colors = !no_color && is_tty && std::env::var("NO_COLOR").is_err();

        let mut styles = Styles::default();
        if use_colors {
            styles.colorize();
        }

        Self {
            styles,
            is_tty,
            quiet,
        }
    }

    /// Spinners are drawn only on an interactive, non-quiet terminal.
    #[must_use]
    pub fn show_progress(&self) -> bool {
        self.is_tty && !self.quiet
    }

    /// `  ✓ msg`. Suppressed when `quiet`.
    pub fn success(&self, msg: &str) {
        if !self.quiet {
            println!("  {} {msg}", "✓".style(self.styles.success));
        }
    }

    /// `  ⚠ msg`. Suppressed when `quiet`.
    pub fn warn(&self, msg: &str) {
        if !self.quiet {
            println!("  {} {msg}", "⚠".style(self.styles.warning));
        }
    }

    /// `  ✗ msg` on stderr. Never suppressed, so failed commands stay
    /// visible under `--quiet`.
    pub fn error(&self, msg: &str) {
        eprintln!("  {} {msg}", "✗".style(self.styles.error));
    }

    /// `  ℹ msg`. Suppressed when `quiet`.
    pub fn info(&self, msg: &str) {
        if !self.quiet {
            println!("  {} {msg}", "ℹ".style(self.styles.info));
        }
    }

    /// Section header, preceded by a blank line. Suppressed when `quiet`.
    pub fn header(&self, msg: &str) {
        if !self.quiet {
            println!();
            println!("  {}", msg.style(self.styles.header));
        }
    }

    /// Key-value pair with the key dimmed. Suppressed when `quiet`.
    pub fn kv(&self, key: &str, value: &str) {
        if !self.quiet {
            println!("  {}  {value}", key.style(self.styles.dim));
        }
    }

    /// Key with a count; non-zero counts of `bad` things are shown in the
    /// error style. Suppressed when `quiet`.
    pub fn count(&self, key: &str, n: usize, bad: bool) {
        if self.quiet {
            return;
        }
        if bad && n > 0 {
            println!(
                "  {}  {}",
                key.style(self.styles.dim),
                n.style(self.styles.error)
            );
        } else {
            println!("  {}  {n}", key.style(self.styles.dim));
        }
    }
}
