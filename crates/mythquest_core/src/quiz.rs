//! crates/mythquest_core/src/quiz.rs
//!
//! The leveled quiz loop: present the questions for the character's next
//! uncompleted level, bind the first answer to each question, show the
//! explanation, then settle the level. A pass records progress and pauses on
//! a completion screen before the next level; a fail offers the same level
//! again. Running out of authored levels ends the quest.

use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::Question;
use crate::ports::{ContentCatalog, PortError, PortResult};
use crate::progress::ProgressStore;

/// Correct answers needed to pass a level: 70 percent of the question count,
/// rounded up. Five questions need 4; three questions need all 3.
pub fn pass_threshold(question_count: usize) -> usize {
    (question_count * 7).div_ceil(10)
}

/// Result of submitting an answer for the current question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerOutcome {
    /// First answer for this question; it is now binding.
    Recorded { correct: bool },
    /// A later attempt at an already-answered question. Nothing changed.
    AlreadyAnswered,
    /// The index does not name an option. Nothing changed.
    InvalidOption,
}

/// One level's worth of questions mid-play. `current_index` always points at
/// a real question; moving past the last one settles the level instead.
#[derive(Debug, Clone)]
pub struct ActiveRound {
    level: u32,
    questions: Vec<Question>,
    current_index: usize,
    selected_answer: Option<usize>,
    score: usize,
}

impl ActiveRound {
    /// `questions` must be non-empty; an empty level never becomes a round.
    fn new(level: u32, questions: Vec<Question>) -> Self {
        Self {
            level,
            questions,
            current_index: 0,
            selected_answer: None,
            score: 0,
        }
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    /// 1-based position for display.
    pub fn question_number(&self) -> usize {
        self.current_index + 1
    }

    pub fn total_questions(&self) -> usize {
        self.questions.len()
    }

    pub fn score(&self) -> usize {
        self.score
    }

    pub fn selected_answer(&self) -> Option<usize> {
        self.selected_answer
    }

    pub fn current_question(&self) -> &Question {
        &self.questions[self.current_index]
    }

    pub fn is_last_question(&self) -> bool {
        self.current_index + 1 == self.questions.len()
    }

    fn select_answer(&mut self, answer_index: usize) -> AnswerOutcome {
        if self.selected_answer.is_some() {
            return AnswerOutcome::AlreadyAnswered;
        }
        if answer_index >= self.current_question().options.len() {
            return AnswerOutcome::InvalidOption;
        }
        self.selected_answer = Some(answer_index);
        let correct = answer_index == self.current_question().correct_answer;
        if correct {
            self.score += 1;
        }
        AnswerOutcome::Recorded { correct }
    }
}

/// Where a quiz attempt currently stands. `Answering` covers both the
/// answering and explaining screens; `selected_answer` tells them apart.
#[derive(Debug)]
pub enum QuizStage {
    Answering(ActiveRound),
    /// The level was passed and progress recorded. Advancing again continues
    /// into the next level, or into completion if none is authored.
    LevelComplete {
        level: u32,
        score: usize,
        total: usize,
    },
    LevelFailed {
        level: u32,
        score: usize,
        required: usize,
        total: usize,
    },
    AllLevelsComplete {
        completed_levels: u32,
    },
    /// The catalog had no question bank for the character. Terminal for the
    /// attempt but harmless; the caller just navigates away.
    ContentUnavailable,
}

/// What a call to [`QuizEngine::advance`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvanceOutcome {
    NextQuestion,
    /// The level was passed and the ledger updated; the stage is now the
    /// completion pause.
    LevelPassed { level: u32, score: usize, total: usize },
    LevelFailed {
        level: u32,
        score: usize,
        required: usize,
        total: usize,
    },
    /// Left the completion pause; the stage now holds the next level's round
    /// or the all-levels-complete state.
    Continued,
}

/// One user's quiz attempt for one character. Holds handles to the catalog
/// and the progress store so the target level is always re-derived from
/// persisted state, never cached across rounds.
pub struct QuizEngine {
    catalog: Arc<dyn ContentCatalog>,
    progress: ProgressStore,
    user_id: Uuid,
    character_id: String,
    stage: QuizStage,
}

impl QuizEngine {
    /// Opens an attempt at the user's next uncompleted level. An exhausted
    /// question bank is completion, not an error; a missing one parks the
    /// attempt in `ContentUnavailable`.
    pub async fn start(
        catalog: Arc<dyn ContentCatalog>,
        progress: ProgressStore,
        user_id: Uuid,
        character_id: &str,
    ) -> Self {
        let mut engine = Self {
            catalog,
            progress,
            user_id,
            character_id: character_id.to_string(),
            stage: QuizStage::ContentUnavailable,
        };
        engine.stage = engine.load_target_level().await;
        engine
    }

    async fn load_target_level(&self) -> QuizStage {
        let completed = self
            .progress
            .completed_levels(self.user_id, &self.character_id)
            .await;
        let target = completed + 1;
        let bank = match self.catalog.questions(&self.character_id).await {
            Ok(bank) => bank,
            Err(e) => {
                warn!("no question bank for '{}': {e}", self.character_id);
                return QuizStage::ContentUnavailable;
            }
        };
        let questions: Vec<Question> = bank.into_iter().filter(|q| q.level == target).collect();
        if questions.is_empty() {
            // Ran out of authored levels: the quest is complete.
            QuizStage::AllLevelsComplete {
                completed_levels: completed,
            }
        } else {
            QuizStage::Answering(ActiveRound::new(target, questions))
        }
    }

    pub fn character_id(&self) -> &str {
        &self.character_id
    }

    pub fn stage(&self) -> &QuizStage {
        &self.stage
    }

    /// Binds the answer for the current question. Outside the answering
    /// stage there is nothing to answer.
    pub fn select_answer(&mut self, answer_index: usize) -> PortResult<AnswerOutcome> {
        match &mut self.stage {
            QuizStage::Answering(round) => Ok(round.select_answer(answer_index)),
            _ => Err(PortError::Invalid(
                "no question is awaiting an answer".to_string(),
            )),
        }
    }

    /// From the explanation screen: moves to the next question, or past the
    /// last one settles the level. A pass records progress and pauses on the
    /// completion screen; advancing from there continues into the next level.
    /// A fail leaves the ledger untouched.
    pub async fn advance(&mut self) -> PortResult<AdvanceOutcome> {
        if matches!(self.stage, QuizStage::LevelComplete { .. }) {
            self.stage = self.load_target_level().await;
            return Ok(AdvanceOutcome::Continued);
        }
        let round = match &mut self.stage {
            QuizStage::Answering(round) => round,
            _ => return Err(PortError::Invalid("no round is in play".to_string())),
        };
        if round.selected_answer.is_none() {
            return Err(PortError::Invalid(
                "the current question has not been answered".to_string(),
            ));
        }
        if !round.is_last_question() {
            round.current_index += 1;
            round.selected_answer = None;
            return Ok(AdvanceOutcome::NextQuestion);
        }

        let level = round.level;
        let score = round.score;
        let total = round.questions.len();
        let required = pass_threshold(total);
        if score < required {
            info!(
                "level {level} failed for '{}': {score}/{total}",
                self.character_id
            );
            self.stage = QuizStage::LevelFailed {
                level,
                score,
                required,
                total,
            };
            return Ok(AdvanceOutcome::LevelFailed {
                level,
                score,
                required,
                total,
            });
        }

        self.progress
            .record_completion(self.user_id, &self.character_id, level)
            .await?;
        info!(
            "level {level} passed for '{}': {score}/{total}",
            self.character_id
        );
        self.stage = QuizStage::LevelComplete { level, score, total };
        Ok(AdvanceOutcome::LevelPassed { level, score, total })
    }

    /// Restarts from the user's current target level, re-read from the
    /// ledger at call time. Only meaningful once the current round settled.
    pub async fn play_again(&mut self) -> PortResult<()> {
        if matches!(self.stage, QuizStage::Answering(_)) {
            return Err(PortError::Invalid("a round is already in play".to_string()));
        }
        self.stage = self.load_target_level().await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BioForm, Character, CharacterBio};
    use crate::memory::MemoryStateStore;
    use crate::ports::StateStore;
    use async_trait::async_trait;
    use serde_json::Value;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Serves one fixed bank for "arjuna" and nothing for anyone else.
    struct FixedCatalog {
        bank: Vec<Question>,
    }

    #[async_trait]
    impl ContentCatalog for FixedCatalog {
        fn roster(&self) -> &[Character] {
            &[]
        }

        fn character(&self, _character_id: &str) -> Option<&Character> {
            None
        }

        async fn questions(&self, character_id: &str) -> PortResult<Vec<Question>> {
            if character_id == "arjuna" {
                Ok(self.bank.clone())
            } else {
                Err(PortError::NotFound(format!(
                    "question bank for '{character_id}'"
                )))
            }
        }

        async fn biography(&self, character_id: &str, _form: BioForm) -> PortResult<CharacterBio> {
            Err(PortError::NotFound(character_id.to_string()))
        }
    }

    /// Counts writes so tests can assert that settling a level persists
    /// exactly once.
    struct CountingStore {
        inner: MemoryStateStore,
        writes: AtomicUsize,
    }

    impl CountingStore {
        fn new() -> Self {
            Self {
                inner: MemoryStateStore::new(),
                writes: AtomicUsize::new(0),
            }
        }

        fn write_count(&self) -> usize {
            self.writes.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl StateStore for CountingStore {
        async fn read(&self, user_id: Uuid, key: &str) -> PortResult<Option<Value>> {
            self.inner.read(user_id, key).await
        }

        async fn write(&self, user_id: Uuid, key: &str, value: Value) -> PortResult<()> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            self.inner.write(user_id, key, value).await
        }

        async fn remove(&self, user_id: Uuid, key: &str) -> PortResult<()> {
            self.inner.remove(user_id, key).await
        }

        async fn clear(&self, user_id: Uuid) -> PortResult<()> {
            self.inner.clear(user_id).await
        }
    }

    fn question(id: u32, level: u32) -> Question {
        Question {
            id,
            level,
            prompt: format!("question {id}"),
            options: vec!["a".into(), "b".into(), "c".into(), "d".into()],
            correct_answer: 0,
            explanation: "because the texts say so".into(),
        }
    }

    /// `counts[i]` questions at level `i + 1`, ids unique across the bank.
    fn bank(counts: &[usize]) -> Vec<Question> {
        let mut id = 0;
        let mut questions = Vec::new();
        for (i, &count) in counts.iter().enumerate() {
            for _ in 0..count {
                id += 1;
                questions.push(question(id, (i + 1) as u32));
            }
        }
        questions
    }

    async fn engine_over(counts: &[usize], store: Arc<dyn StateStore>, user: Uuid) -> QuizEngine {
        let catalog = Arc::new(FixedCatalog { bank: bank(counts) });
        QuizEngine::start(catalog, ProgressStore::new(store), user, "arjuna").await
    }

    /// Answers the whole current level: `correct` right answers, the rest
    /// wrong. Returns the outcome of the final advance.
    async fn play_level(engine: &mut QuizEngine, correct: usize) -> AdvanceOutcome {
        let total = match engine.stage() {
            QuizStage::Answering(round) => round.total_questions(),
            stage => panic!("expected an active round, got {stage:?}"),
        };
        let mut outcome = AdvanceOutcome::NextQuestion;
        for i in 0..total {
            let answer = if i < correct { 0 } else { 1 };
            match engine.select_answer(answer).unwrap() {
                AnswerOutcome::Recorded { .. } => {}
                other => panic!("expected a recorded answer, got {other:?}"),
            }
            outcome = engine.advance().await.unwrap();
        }
        outcome
    }

    #[test]
    fn threshold_is_seventy_percent_rounded_up() {
        assert_eq!(pass_threshold(5), 4);
        assert_eq!(pass_threshold(3), 3);
        assert_eq!(pass_threshold(4), 3);
        assert_eq!(pass_threshold(10), 7);
        assert_eq!(pass_threshold(1), 1);
    }

    #[tokio::test]
    async fn four_of_five_passes_the_level() {
        let store = Arc::new(MemoryStateStore::new());
        let user = Uuid::new_v4();
        let mut engine = engine_over(&[5], store.clone(), user).await;

        let outcome = play_level(&mut engine, 4).await;

        assert_eq!(
            outcome,
            AdvanceOutcome::LevelPassed {
                level: 1,
                score: 4,
                total: 5
            }
        );
        assert!(matches!(
            engine.stage(),
            QuizStage::LevelComplete {
                level: 1,
                score: 4,
                total: 5
            }
        ));
        let recorded = ProgressStore::new(store)
            .completed_levels(user, "arjuna")
            .await;
        assert_eq!(recorded, 1);
    }

    #[tokio::test]
    async fn three_of_five_fails_the_level() {
        let store = Arc::new(MemoryStateStore::new());
        let user = Uuid::new_v4();
        let mut engine = engine_over(&[5], store.clone(), user).await;

        let outcome = play_level(&mut engine, 3).await;

        assert_eq!(
            outcome,
            AdvanceOutcome::LevelFailed {
                level: 1,
                score: 3,
                required: 4,
                total: 5
            }
        );
        assert!(matches!(engine.stage(), QuizStage::LevelFailed { .. }));
        // A failed level writes nothing to the ledger.
        let recorded = ProgressStore::new(store)
            .completed_levels(user, "arjuna")
            .await;
        assert_eq!(recorded, 0);
    }

    #[tokio::test]
    async fn three_question_level_requires_all_three() {
        let store = Arc::new(MemoryStateStore::new());
        let user = Uuid::new_v4();

        let mut engine = engine_over(&[3], store.clone(), user).await;
        let outcome = play_level(&mut engine, 2).await;
        assert_eq!(
            outcome,
            AdvanceOutcome::LevelFailed {
                level: 1,
                score: 2,
                required: 3,
                total: 3
            }
        );

        engine.play_again().await.unwrap();
        let outcome = play_level(&mut engine, 3).await;
        assert_eq!(
            outcome,
            AdvanceOutcome::LevelPassed {
                level: 1,
                score: 3,
                total: 3
            }
        );
    }

    #[tokio::test]
    async fn continuing_after_a_pass_enters_the_next_level() {
        let store = Arc::new(MemoryStateStore::new());
        let user = Uuid::new_v4();
        let mut engine = engine_over(&[3, 4], store.clone(), user).await;

        play_level(&mut engine, 3).await;
        assert!(matches!(engine.stage(), QuizStage::LevelComplete { .. }));

        let outcome = engine.advance().await.unwrap();
        assert_eq!(outcome, AdvanceOutcome::Continued);
        match engine.stage() {
            QuizStage::Answering(round) => {
                assert_eq!(round.level(), 2);
                assert_eq!(round.question_number(), 1);
                assert_eq!(round.total_questions(), 4);
                assert_eq!(round.score(), 0);
                assert_eq!(round.selected_answer(), None);
            }
            stage => panic!("expected level 2 in play, got {stage:?}"),
        }
    }

    #[tokio::test]
    async fn start_targets_the_next_uncompleted_level() {
        let store = Arc::new(MemoryStateStore::new());
        let user = Uuid::new_v4();
        ProgressStore::new(store.clone())
            .record_completion(user, "arjuna", 1)
            .await
            .unwrap();

        let engine = engine_over(&[3, 3], store, user).await;

        match engine.stage() {
            QuizStage::Answering(round) => assert_eq!(round.level(), 2),
            stage => panic!("expected level 2 in play, got {stage:?}"),
        }
    }

    #[tokio::test]
    async fn continuing_past_the_last_level_completes_with_a_single_write() {
        let store = Arc::new(CountingStore::new());
        let user = Uuid::new_v4();
        let mut engine = engine_over(&[3], store.clone(), user).await;

        let outcome = play_level(&mut engine, 3).await;
        assert_eq!(
            outcome,
            AdvanceOutcome::LevelPassed {
                level: 1,
                score: 3,
                total: 3
            }
        );

        let outcome = engine.advance().await.unwrap();
        assert_eq!(outcome, AdvanceOutcome::Continued);
        match engine.stage() {
            QuizStage::AllLevelsComplete { completed_levels } => {
                assert_eq!(*completed_levels, 1);
            }
            stage => panic!("expected completion, got {stage:?}"),
        }
        // One ledger write for the pass; discovering exhaustion adds none.
        assert_eq!(store.write_count(), 1);
    }

    #[tokio::test]
    async fn exhausted_bank_reports_completion_at_start() {
        let store = Arc::new(MemoryStateStore::new());
        let user = Uuid::new_v4();
        ProgressStore::new(store.clone())
            .record_completion(user, "arjuna", 2)
            .await
            .unwrap();

        // Only levels 1 and 2 are authored, both already complete.
        let engine = engine_over(&[3, 3], store, user).await;

        match engine.stage() {
            QuizStage::AllLevelsComplete { completed_levels } => {
                assert_eq!(*completed_levels, 2);
            }
            stage => panic!("expected completion, got {stage:?}"),
        }
    }

    #[tokio::test]
    async fn missing_bank_parks_the_attempt() {
        let store = Arc::new(MemoryStateStore::new());
        let catalog = Arc::new(FixedCatalog { bank: bank(&[3]) });
        let engine = QuizEngine::start(
            catalog,
            ProgressStore::new(store),
            Uuid::new_v4(),
            "someone-unwritten",
        )
        .await;

        assert!(matches!(engine.stage(), QuizStage::ContentUnavailable));
    }

    #[tokio::test]
    async fn first_answer_is_binding() {
        let store = Arc::new(MemoryStateStore::new());
        let mut engine = engine_over(&[3], store, Uuid::new_v4()).await;

        assert_eq!(
            engine.select_answer(0).unwrap(),
            AnswerOutcome::Recorded { correct: true }
        );
        // Re-selecting, right or wrong, changes nothing.
        assert_eq!(
            engine.select_answer(1).unwrap(),
            AnswerOutcome::AlreadyAnswered
        );
        assert_eq!(
            engine.select_answer(0).unwrap(),
            AnswerOutcome::AlreadyAnswered
        );

        match engine.stage() {
            QuizStage::Answering(round) => {
                assert_eq!(round.score(), 1);
                assert_eq!(round.selected_answer(), Some(0));
            }
            stage => panic!("expected the round to still be in play, got {stage:?}"),
        }
    }

    #[tokio::test]
    async fn out_of_range_answer_is_rejected_without_binding() {
        let store = Arc::new(MemoryStateStore::new());
        let mut engine = engine_over(&[3], store, Uuid::new_v4()).await;

        assert_eq!(
            engine.select_answer(99).unwrap(),
            AnswerOutcome::InvalidOption
        );
        // The question is still open for a real answer.
        assert_eq!(
            engine.select_answer(0).unwrap(),
            AnswerOutcome::Recorded { correct: true }
        );
    }

    #[tokio::test]
    async fn advance_requires_an_answer() {
        let store = Arc::new(MemoryStateStore::new());
        let mut engine = engine_over(&[3], store, Uuid::new_v4()).await;

        assert!(matches!(engine.advance().await, Err(PortError::Invalid(_))));
        match engine.stage() {
            QuizStage::Answering(round) => assert_eq!(round.question_number(), 1),
            stage => panic!("expected the round to still be in play, got {stage:?}"),
        }
    }

    #[tokio::test]
    async fn play_again_rereads_the_ledger() {
        let store = Arc::new(MemoryStateStore::new());
        let user = Uuid::new_v4();
        let mut engine = engine_over(&[3, 3], store.clone(), user).await;

        play_level(&mut engine, 1).await;
        assert!(matches!(
            engine.stage(),
            QuizStage::LevelFailed { level: 1, .. }
        ));

        // Progress recorded elsewhere between the fail and the retry.
        ProgressStore::new(store)
            .record_completion(user, "arjuna", 1)
            .await
            .unwrap();

        engine.play_again().await.unwrap();
        match engine.stage() {
            QuizStage::Answering(round) => assert_eq!(round.level(), 2),
            stage => panic!("expected level 2 in play, got {stage:?}"),
        }
    }

    #[tokio::test]
    async fn play_again_is_rejected_mid_round() {
        let store = Arc::new(MemoryStateStore::new());
        let mut engine = engine_over(&[3], store, Uuid::new_v4()).await;

        assert!(matches!(
            engine.play_again().await,
            Err(PortError::Invalid(_))
        ));
    }
}
