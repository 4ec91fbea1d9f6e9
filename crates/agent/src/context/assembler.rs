//! Context assembly: turns a persona, a history and a new message into the
//! payload for one inference call.
//!
//! # Determinism
//!
//! Assembly is a pure function: identical inputs always produce identical
//! payloads. No clock reads, no I/O, no randomness.

use doppel_core::message::{ConversationHistory, Turn};
use doppel_core::persona::PersonaProfile;
use doppel_core::provider::{PromptBlock, PromptPayload};

/// Builds [`PromptPayload`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContextAssembler;

impl ContextAssembler {
    /// Assemble `[system, window of history (oldest first), new user turn]`.
    ///
    /// Only the most recent `window_size` turns of `history` are included.
    /// A window of 0 sends no history at all.
    pub fn assemble(
        persona: &PersonaProfile,
        history: &ConversationHistory,
        new_user_turn: &Turn,
        window_size: usize,
    ) -> PromptPayload {
        let window = history.window(window_size);

        let mut blocks = Vec::with_capacity(window.len() + 2);
        blocks.push(PromptBlock::system(Self::render_system(persona)));
        blocks.extend(window.iter().map(PromptBlock::from));
        blocks.push(PromptBlock::from(new_user_turn));

        PromptPayload { blocks }
    }

    /// Render the system block for a persona.
    pub fn render_system(persona: &PersonaProfile) -> String {
        let mut out = format!(
            "You are acting as {full}. You are answering questions on {full}'s website, \
             particularly questions related to {name}'s career, background, skills and experience.\n\
             Speak in the first person, as {name}. Be professional and engaging, as if talking \
             to a potential client or future employer.\n\
             If you don't know the answer, say so. Never invent facts about {name}.\n",
            full = persona.full_name,
            name = persona.display_name,
        );

        out.push_str("\n## Summary\n");
        out.push_str(persona.summary.trim());
        out.push('\n');

        out.push_str("\n## Communication style\n");
        out.push_str(persona.style_guide.trim());
        out.push('\n');

        if let Some(resume) = persona.resume_extract.as_deref().map(str::trim)
            && !resume.is_empty()
        {
            out.push_str("\n## Resume\n");
            out.push_str(resume);
            out.push('\n');
        }

        out.push_str(&format!(
            "\nWith this context, chat with the user, always staying in character as {}.",
            persona.full_name
        ));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use doppel_core::message::Role;
    use doppel_core::provider::PromptRole;

    fn persona() -> PersonaProfile {
        PersonaProfile {
            full_name: "Ada Lovelace".into(),
            display_name: "Ada".into(),
            summary: "Mathematician and writer.".into(),
            style_guide: "Warm, precise, a little playful.".into(),
            resume_extract: None,
        }
    }

    /// `n` turns starting with `user`, one second apart.
    fn history(n: usize) -> ConversationHistory {
        let base = Utc::now();
        ConversationHistory::from_turns(
            (0..n)
                .map(|i| {
                    let role = if i % 2 == 0 { Role::User } else { Role::Assistant };
                    Turn::at(role, format!("t{i}"), base + Duration::seconds(i as i64))
                })
                .collect(),
        )
    }

    #[test]
    fn system_block_first_and_new_turn_last() {
        let payload =
            ContextAssembler::assemble(&persona(), &history(4), &Turn::user("latest"), 20);

        assert_eq!(payload.blocks.len(), 6);
        assert_eq!(payload.blocks[0].role, PromptRole::System);
        let last = payload.blocks.last().unwrap();
        assert_eq!(last.role, PromptRole::User);
        assert_eq!(last.content, "latest");
    }

    #[test]
    fn window_keeps_most_recent_turns() {
        let payload = ContextAssembler::assemble(&persona(), &history(5), &Turn::user("new"), 2);

        let contents: Vec<_> = payload.blocks.iter().map(|b| b.content.as_str()).collect();
        assert_eq!(contents.len(), 4);
        assert_eq!(&contents[1..], &["t3", "t4", "new"]);
        assert_eq!(payload.blocks[1].role, PromptRole::Assistant);
        assert_eq!(payload.blocks[2].role, PromptRole::User);
    }

    #[test]
    fn short_history_is_used_whole() {
        let payload = ContextAssembler::assemble(&persona(), &history(2), &Turn::user("new"), 20);
        assert_eq!(payload.blocks.len(), 4);
        assert_eq!(payload.blocks[1].content, "t0");
    }

    #[test]
    fn zero_window_sends_no_history() {
        let payload = ContextAssembler::assemble(&persona(), &history(6), &Turn::user("new"), 0);
        assert_eq!(payload.blocks.len(), 2);
    }

    #[test]
    fn empty_history() {
        let payload = ContextAssembler::assemble(
            &persona(),
            &ConversationHistory::new(),
            &Turn::user("hello"),
            20,
        );
        assert_eq!(payload.blocks.len(), 2);
    }

    #[test]
    fn system_prompt_renders_persona() {
        let system = ContextAssembler::render_system(&persona());
        assert!(system.contains("You are acting as Ada Lovelace"));
        assert!(system.contains("first person"));
        assert!(system.contains("Mathematician and writer."));
        assert!(system.contains("a little playful"));
        assert!(!system.contains("## Resume"));
    }

    #[test]
    fn resume_included_when_present() {
        let mut p = persona();
        p.resume_extract = Some("Analytical Engine notes, 1843".into());
        let system = ContextAssembler::render_system(&p);
        assert!(system.contains("## Resume\nAnalytical Engine notes, 1843"));
    }

    #[test]
    fn deterministic_assembly() {
        let h = history(7);
        let turn = Turn::user("same");
        let a = ContextAssembler::assemble(&persona(), &h, &turn, 4);
        let b = ContextAssembler::assemble(&persona(), &h, &turn, 4);
        assert_eq!(a, b);
    }
}
