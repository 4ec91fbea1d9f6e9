//! `doppel history`: Print a stored conversation.

use doppel_core::message::{ConversationId, Role};

pub async fn run(id: String, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config()?;
    let id = ConversationId::parse(&id)?;

    let store = doppel_memory::build_from_config(&config.storage)?;
    let history = store.get(&id).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&history)?);
        return Ok(());
    }

    if history.is_empty() {
        println!("  (no turns stored for {id})");
        return Ok(());
    }

    for turn in &history {
        let who = match turn.role {
            Role::User => "You",
            Role::Assistant => "Persona",
        };
        println!(
            "  [{}] {who:>7} > {}",
            turn.timestamp.format("%Y-%m-%d %H:%M:%S"),
            turn.content
        );
    }
    println!("\n  {} turn(s)", history.len());

    Ok(())
}
