//! `doppel chat`: Interactive or single-message chat mode.

use doppel_core::error::{Disposition, SessionError};
use doppel_core::message::ConversationId;
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, warn};

pub async fn run(
    session: Option<String>,
    message: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config()?;

    // Check for API key early: give a clear error
    if config.api_key.is_none() && config.provider != "ollama" && config.provider != "vllm" {
        eprintln!();
        eprintln!("  ERROR: No API key configured!");
        eprintln!();
        eprintln!("  Set one of these environment variables:");
        eprintln!("    DOPPEL_API_KEY = 'sk-...'   (recommended)");
        eprintln!("    OPENAI_API_KEY = 'sk-...'");
        eprintln!();
        eprintln!("  Or add api_key to your config file:");
        eprintln!("    {}", doppel_config::AppConfig::active_path().display());
        eprintln!();
        return Err("No API key found. See above for setup instructions.".into());
    }

    let coordinator = doppel_gateway::build_coordinator(&config)?;
    let id = match session {
        Some(raw) => ConversationId::parse(&raw)?,
        None => ConversationId::generate(),
    };
    debug!(conversation_id = %id, single_shot = message.is_some(), "Chat session starting");

    if let Some(msg) = message {
        // Single message mode
        eprint!("  Thinking...");
        let result = coordinator.handle_message(&id, &msg).await;
        eprint!("\r              \r");
        println!("{}", result?);
        eprintln!("  (session: {id})");
        return Ok(());
    }

    // Interactive mode
    let persona = coordinator.persona();
    println!();
    println!("  ╔══════════════════════════════════════════════╗");
    println!("  ║          Doppel — Interactive Mode           ║");
    println!("  ╚══════════════════════════════════════════════╝");
    println!();
    println!("  Persona:   {}", persona.full_name);
    println!("  Model:     {} ({})", config.model, config.provider);
    println!("  Storage:   {}", config.storage.backend);
    println!("  Session:   {id}");
    println!();
    println!("  Type your message and press Enter.");
    println!("  Type 'exit' or Ctrl+C to quit.");
    println!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("  You > ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if matches!(input, "exit" | "quit") {
            break;
        }

        eprint!("  ...");
        let result = coordinator.handle_message(&id, input).await;
        eprint!("\r     \r");
        match result {
            Ok(reply) => println!("  {} > {reply}\n", persona.display_name),
            Err(e) => print_failure(&e),
        }
    }

    println!("\n  Conversation saved as {id}");
    Ok(())
}

fn print_failure(err: &SessionError) {
    warn!(error = %err, "Message failed");
    match err.disposition() {
        Disposition::Rejected => eprintln!("  ❌ Message rejected: {err}\n"),
        Disposition::RetryLater => {
            eprintln!("  ⏳ Temporarily unavailable, please retry. ({err})\n")
        }
    }
}
