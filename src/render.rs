//! Output rendering for the console.
//!
//! This module provides the [`Renderer`] trait the session drives while a
//! turn is streaming, and a plain-text implementation that writes to stdout
//! with optional ANSI styling.

use std::fmt::Write as _;
use std::io::{self, Stdout, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use time::OffsetDateTime;
use time::macros::format_description;

use crate::types::{Message, ReviewResult, ThoughtStep};

/// ANSI escape code for dim text (used for status narration).
const ANSI_DIM: &str = "\x1b[2m";

/// ANSI escape code for bold text (used for speaker labels).
const ANSI_BOLD: &str = "\x1b[1m";

/// ANSI escape code to reset all styling.
const ANSI_RESET: &str = "\x1b[0m";

/// ANSI escape code for cyan text (used for tool names).
const ANSI_CYAN: &str = "\x1b[36m";

/// ANSI escape code for yellow text (used for tool input and warnings).
const ANSI_YELLOW: &str = "\x1b[33m";

/// ANSI escape code for green text (used for approvals).
const ANSI_GREEN: &str = "\x1b[32m";

/// ANSI escape code for red text (used for errors and rejections).
const ANSI_RED: &str = "\x1b[31m";

/// ANSI escape code for magenta text (used for tool observations).
const ANSI_MAGENTA: &str = "\x1b[35m";

/// Trait for rendering console output.
///
/// The session calls [`print_message`](Renderer::print_message) for every
/// message it appends to the log, and [`print_step`](Renderer::print_step)
/// for each step as it streams in when details are shown.
pub trait Renderer: Send {
    /// Print one message from the conversation log.
    ///
    /// `show_details` gates display of an assistant message's thought process;
    /// the steps are retained either way.
    fn print_message(&mut self, message: &Message, show_details: bool);

    /// Print one step as it arrives.
    fn print_step(&mut self, step_number: Option<u32>, step: &ThoughtStep);

    /// Print a full thought process.
    fn print_thought_process(&mut self, steps: &[ThoughtStep]);

    /// Print an error that is not part of the log.
    fn print_error(&mut self, error: &str);

    /// Print a warning, such as a rejected attachment.
    fn print_warning(&mut self, warning: &str);

    /// Print an informational message.
    fn print_info(&mut self, info: &str);

    /// Called before the first event of a turn is rendered.
    fn start_response(&mut self) {}

    /// Called when a turn is over.
    fn finish_response(&mut self);

    /// Called when the operator interrupts a turn.
    fn print_interrupted(&mut self) {}

    /// Whether the operator has asked to stop the current turn.
    fn should_interrupt(&self) -> bool {
        false
    }
}

/// Plain text renderer with optional ANSI styling.
pub struct PlainTextRenderer {
    stdout: Stdout,
    use_color: bool,
    interrupted: Option<Arc<AtomicBool>>,
}

impl PlainTextRenderer {
    /// Creates a new PlainTextRenderer with ANSI colors enabled.
    pub fn new() -> Self {
        Self::with_color(true)
    }

    /// Creates a new PlainTextRenderer with specified color setting.
    pub fn with_color(use_color: bool) -> Self {
        Self {
            stdout: io::stdout(),
            use_color,
            interrupted: None,
        }
    }

    /// Attaches an interrupt flag to the renderer.
    pub fn with_interrupt(mut self, interrupted: Arc<AtomicBool>) -> Self {
        self.interrupted = Some(interrupted);
        self
    }

    /// Creates a new PlainTextRenderer with specified color and interrupt flag.
    pub fn with_color_and_interrupt(use_color: bool, interrupted: Arc<AtomicBool>) -> Self {
        Self::with_color(use_color).with_interrupt(interrupted)
    }

    fn write(&mut self, text: &str) {
        let _ = self.stdout.write_all(text.as_bytes());
        let _ = self.stdout.flush();
    }
}

impl Default for PlainTextRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer for PlainTextRenderer {
    fn print_message(&mut self, message: &Message, show_details: bool) {
        let text = format_message(message, show_details, self.use_color);
        self.write(&text);
    }

    fn print_step(&mut self, step_number: Option<u32>, step: &ThoughtStep) {
        let text = format_step(step_number, step, self.use_color);
        self.write(&text);
    }

    fn print_thought_process(&mut self, steps: &[ThoughtStep]) {
        if steps.is_empty() {
            self.write("(no steps recorded)\n");
            return;
        }
        let mut text = String::new();
        for (index, step) in steps.iter().enumerate() {
            let number = u32::try_from(index + 1).ok();
            text.push_str(&format_step(number, step, self.use_color));
        }
        self.write(&text);
    }

    fn print_error(&mut self, error: &str) {
        if self.use_color {
            eprintln!("{ANSI_RED}Error: {error}{ANSI_RESET}");
        } else {
            eprintln!("Error: {error}");
        }
    }

    fn print_warning(&mut self, warning: &str) {
        if self.use_color {
            eprintln!("{ANSI_YELLOW}Warning: {warning}{ANSI_RESET}");
        } else {
            eprintln!("Warning: {warning}");
        }
    }

    fn print_info(&mut self, info: &str) {
        self.write(&format!("{info}\n"));
    }

    fn finish_response(&mut self) {
        self.write("\n");
    }

    fn print_interrupted(&mut self) {
        self.write("\n[interrupted]\n");
    }

    fn should_interrupt(&self) -> bool {
        self.interrupted
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }
}

fn style(text: &str, code: &str, use_color: bool) -> String {
    if use_color {
        format!("{code}{text}{ANSI_RESET}")
    } else {
        text.to_string()
    }
}

fn clock(timestamp: Option<OffsetDateTime>) -> String {
    let format = format_description!("[hour]:[minute]:[second]");
    timestamp
        .and_then(|ts| ts.format(&format).ok())
        .map(|ts| format!(" ({ts})"))
        .unwrap_or_default()
}

/// Render one message as terminal text, ending with a newline.
pub fn format_message(message: &Message, show_details: bool, use_color: bool) -> String {
    let mut out = String::new();
    match message {
        Message::User {
            content,
            attachments,
            timestamp,
        } => {
            let label = format!("You{}:", clock(*timestamp));
            let _ = writeln!(out, "{} {content}", style(&label, ANSI_BOLD, use_color));
            if !attachments.is_empty() {
                let files = format!("[attached: {}]", attachments.join(", "));
                let _ = writeln!(out, "  {}", style(&files, ANSI_DIM, use_color));
            }
        }
        Message::Assistant {
            content,
            thought_process,
            timestamp,
        } => {
            let label = format!("Assistant{}:", clock(*timestamp));
            let _ = writeln!(out, "{}", style(&label, ANSI_BOLD, use_color));
            let _ = writeln!(out, "{content}");
            if show_details {
                for (index, step) in thought_process.iter().enumerate() {
                    out.push_str(&format_step(
                        u32::try_from(index + 1).ok(),
                        step,
                        use_color,
                    ));
                }
            } else if !thought_process.is_empty() {
                let hint = format!("({} steps; /steps to show)", thought_process.len());
                let _ = writeln!(out, "{}", style(&hint, ANSI_DIM, use_color));
            }
        }
        Message::Status { content, .. } => {
            let _ = writeln!(out, "{}", style(&format!("... {content}"), ANSI_DIM, use_color));
        }
        Message::Review { review, .. } => out.push_str(&format_review(review, use_color)),
        Message::Error { content, .. } => {
            let _ = writeln!(out, "{}", style(&format!("Error: {content}"), ANSI_RED, use_color));
        }
    }
    out
}

/// Render one agent step.
pub fn format_step(step_number: Option<u32>, step: &ThoughtStep, use_color: bool) -> String {
    let mut out = String::new();
    let label = match step_number {
        Some(n) => format!("[step {n}: {}]", step.action),
        None => format!("[step: {}]", step.action),
    };
    let _ = writeln!(out, "{}", style(&label, ANSI_CYAN, use_color));
    if !step.reasoning.is_empty() {
        let _ = writeln!(out, "  {}", style(&step.reasoning, ANSI_DIM, use_color));
    }
    if !step.action_input.is_empty() {
        let _ = writeln!(out, "  input: {}", style(&step.action_input, ANSI_YELLOW, use_color));
    }
    if !step.observation.is_empty() {
        let _ = writeln!(
            out,
            "  result: {}",
            style(&step.observation, ANSI_MAGENTA, use_color)
        );
    }
    out
}

/// Render a review verdict with its findings.
pub fn format_review(review: &ReviewResult, use_color: bool) -> String {
    let color = match review.decision.as_str() {
        "approved" => ANSI_GREEN,
        "rejected" | "error" => ANSI_RED,
        _ => ANSI_YELLOW,
    };
    let mut out = String::new();
    let header = format!("Review: {}", review.decision_label());
    let _ = writeln!(out, "{}", style(&header, color, use_color));
    if !review.summary.is_empty() {
        let _ = writeln!(out, "{}", review.summary);
    }
    for (title, items) in [
        ("Issues", &review.issues),
        ("Suggestions", &review.suggestions),
        ("Comments", &review.comments),
    ] {
        if items.is_empty() {
            continue;
        }
        let _ = writeln!(out, "  {title}:");
        for item in items {
            let _ = writeln!(out, "    - {item}");
        }
    }
    out
}
