//! crates/mythquest_core/src/unlock.rs
//!
//! The reward gate: completing every quiz level for a character unlocks the
//! full biography and the chat companion.

use crate::domain::Character;
use crate::progress::ProgressLedger;

/// True once every level is complete. Pure; callers re-evaluate per query
/// instead of caching the verdict.
pub fn reward_unlocked(completed_levels: u32, total_levels: u32) -> bool {
    completed_levels >= total_levels
}

/// Progress summary for one roster entry, as shown on the selection screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharacterStatus {
    pub character_id: String,
    pub completed_levels: u32,
    pub total_levels: u32,
    pub reward_unlocked: bool,
}

pub fn character_status(ledger: &ProgressLedger, character: &Character) -> CharacterStatus {
    let completed = ledger.completed_levels(&character.id);
    CharacterStatus {
        character_id: character.id.clone(),
        completed_levels: completed,
        total_levels: character.total_levels,
        reward_unlocked: reward_unlocked(completed, character.total_levels),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locked_until_every_level_is_complete() {
        assert!(!reward_unlocked(0, 8));
        assert!(!reward_unlocked(7, 8));
        assert!(reward_unlocked(8, 8));
        // Over-recorded ledgers still count as unlocked.
        assert!(reward_unlocked(9, 8));
    }

    #[test]
    fn status_reflects_the_ledger() {
        let character = Character {
            id: "arjuna".into(),
            name: "Arjuna".into(),
            short_bio: "The peerless archer of the Pandavas.".into(),
            skills: vec!["Archery".into()],
            traits: vec!["Focused".into()],
            greeting: "Greetings, seeker.".into(),
            personality: "Disciplined and introspective.".into(),
            response_style: "Measured and precise.".into(),
            total_levels: 8,
        };

        let mut ledger = ProgressLedger::default();
        let status = character_status(&ledger, &character);
        assert_eq!(status.completed_levels, 0);
        assert!(!status.reward_unlocked);

        ledger.record("arjuna", 8);
        let status = character_status(&ledger, &character);
        assert_eq!(status.completed_levels, 8);
        assert!(status.reward_unlocked);
    }
}
