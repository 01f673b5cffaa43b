//! Interactive console for the developer-assistant backend.
//!
//! This binary provides a streaming REPL for sending queries to the
//! backend's agents and managing sessions, settings and attachments.
//!
//! # Usage
//!
//! ```bash
//! # Connect to $DEVCONSOLE_URL, or http://localhost:8000/
//! devconsole-chat
//!
//! # Talk to the devops agent on another host
//! devconsole-chat --url http://assistant.internal:8000 --agent devops
//!
//! # Load defaults from a profile and log every stream event
//! devconsole-chat --profile ~/.devconsole.yaml --log-file events.jsonl
//! ```
//!
//! # Commands
//!
//! While chatting, you can use slash commands:
//! - `/help` - Show available commands
//! - `/new` - Start a fresh session
//! - `/attach <files...>` - Attach files to the next query
//! - `/browse [path]` - Pick a project root on the backend host
//! - `/quit` - Exit the application

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use arrrg::CommandLine;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

use devconsole::chat::{
    ChatArgs, ChatConfig, ChatSession, CommandOutcome, PlainTextRenderer, Renderer, parse_command,
};

/// Main entry point for the devconsole-chat application.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (args, _) = ChatArgs::from_command_line_relaxed("devconsole-chat [OPTIONS]");
    let config = ChatConfig::from_args(args)?;
    let client = config.client()?;

    // Flag for interrupt handling during streaming
    let interrupted = Arc::new(AtomicBool::new(false));
    let interrupted_clone = interrupted.clone();
    ctrlc::set_handler(move || {
        interrupted_clone.store(true, Ordering::Relaxed);
    })?;

    let mut renderer = PlainTextRenderer::with_color_and_interrupt(config.use_color, interrupted.clone());
    let mut rl = DefaultEditor::new()?;

    println!("Developer Console ({})", client.base_url());
    let mut chat = ChatSession::new(Arc::new(client), config);
    if let Err(err) = chat.start(&mut renderer).await {
        renderer.print_error(&format!("Could not open a session: {}", err.user_message()));
        std::process::exit(1);
    }
    println!("Type /help for commands, /quit to exit\n");

    loop {
        // Reset interrupt flag before each input
        interrupted.store(false, Ordering::Relaxed);

        match rl.readline("You: ") {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(line);

                if let Some(cmd) = parse_command(line) {
                    if chat.execute(cmd, &mut renderer).await == CommandOutcome::Quit {
                        println!("Goodbye!");
                        break;
                    }
                    continue;
                }

                if let Err(e) = chat.send(line, &mut renderer).await {
                    renderer.print_error(&e.user_message());
                }
            }
            Err(ReadlineError::Interrupted) => {
                // Ctrl+C at prompt - soft interrupt
                println!();
                continue;
            }
            Err(ReadlineError::Eof) => {
                // Ctrl+D - exit
                println!("\nGoodbye!");
                break;
            }
            Err(err) => {
                renderer.print_error(&format!("Input error: {err}"));
                break;
            }
        }
    }

    Ok(())
}
