//! Per-channel quiz game: phase state machine, timers, and announcements.

use std::path::PathBuf;
use std::sync::Arc;

use indexmap::IndexSet;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::{
    access::AccessPolicy,
    error::GameError,
    pool::{self, PoolSource, RemainingQuestions},
    timer::{self, TimerHandle},
    transport::ChatSink,
};

/// High-level phases one channel's game can be in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GamePhase {
    /// No game is running; `start` and `reload` are meaningful.
    Stopped,
    /// The join window is open; players may `join`.
    New,
    /// Questions are being asked and answers accepted.
    Started,
}

/// The question currently awaiting an answer.
#[derive(Debug, Clone)]
struct CurrentQuestion {
    text: String,
    answers: Vec<String>,
}

/// The single timer armed for this instance, tagged with the sequence number
/// its callback carries.
#[derive(Debug)]
struct ActiveTimer {
    seq: u64,
    handle: TimerHandle,
}

/// Mutable round data, guarded by the instance mutex.
struct RoundState {
    phase: GamePhase,
    players: IndexSet<String>,
    source: PoolSource,
    remaining: RemainingQuestions,
    current: Option<CurrentQuestion>,
    timer: Option<ActiveTimer>,
    timer_seq: u64,
}

impl RoundState {
    /// Cancel whichever timer is pending, if any.
    fn cancel_timer(&mut self) {
        if let Some(mut active) = self.timer.take() {
            active.handle.cancel();
        }
    }

    /// Cancel any pending timer and hand out the next sequence number.
    ///
    /// At most one timer is ever armed per instance.
    fn next_timer_seq(&mut self) -> u64 {
        self.cancel_timer();
        self.timer_seq += 1;
        self.timer_seq
    }

    /// Consume the armed timer if `seq` is still the current one.
    ///
    /// A fired callback whose sequence no longer matches raced a cancellation
    /// (or a newer schedule) and must not act.
    fn take_if_current(&mut self, seq: u64) -> bool {
        match &self.timer {
            Some(active) if active.seq == seq => {
                self.timer = None;
                true
            }
            _ => false,
        }
    }

    /// Reset every mutable field to its initial value. The instance itself
    /// stays alive for the next round.
    fn reset(&mut self) {
        self.cancel_timer();
        self.phase = GamePhase::Stopped;
        self.remaining = self.source.reset();
        self.players.clear();
        self.current = None;
    }
}

/// Shared handle to a per-channel game instance.
pub type SharedGame = Arc<GameInstance>;

/// One channel's game: immutable wiring plus the mutable round state.
pub struct GameInstance {
    channel: String,
    prefix: char,
    source_path: PathBuf,
    sink: Arc<dyn ChatSink>,
    access: Arc<dyn AccessPolicy>,
    round: Mutex<RoundState>,
}

/// Observable snapshot of a game instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameSnapshot {
    /// Current phase.
    pub phase: GamePhase,
    /// Players who joined the current round, in join order.
    pub players: Vec<String>,
    /// Questions left in the current round.
    pub remaining: usize,
    /// Whether a timer is armed.
    pub timer_armed: bool,
}

impl GameInstance {
    /// Build an instance for `channel` around an already loaded pool source.
    ///
    /// `source_path` is re-read on `reload`.
    pub fn new(
        channel: String,
        source_path: PathBuf,
        source: PoolSource,
        prefix: char,
        sink: Arc<dyn ChatSink>,
        access: Arc<dyn AccessPolicy>,
    ) -> SharedGame {
        let remaining = source.reset();
        Arc::new(Self {
            channel,
            prefix,
            source_path,
            sink,
            access,
            round: Mutex::new(RoundState {
                phase: GamePhase::Stopped,
                players: IndexSet::new(),
                source,
                remaining,
                current: None,
                timer: None,
                timer_seq: 0,
            }),
        })
    }

    /// Channel this instance is attached to.
    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Snapshot the current round state.
    pub async fn snapshot(&self) -> GameSnapshot {
        let round = self.round.lock().await;
        GameSnapshot {
            phase: round.phase,
            players: round.players.iter().cloned().collect(),
            remaining: round.remaining.len(),
            timer_armed: round.timer.is_some(),
        }
    }

    /// Send `text` to the instance's channel.
    async fn say(&self, text: &str) -> Result<(), GameError> {
        self.sink.message(&self.channel, text).await?;
        Ok(())
    }
}

/// Handle one inbound channel message, dispatching on the current phase.
pub async fn handle_message(
    game: &SharedGame,
    sender: &str,
    text: &str,
) -> Result<(), GameError> {
    let mut round = game.round.lock().await;
    match round.phase {
        GamePhase::Stopped => handle_stopped(game, &mut round, sender, text).await,
        GamePhase::New => handle_new(game, &mut round, sender, text).await,
        GamePhase::Started => handle_started(game, &mut round, sender, text).await,
    }
}

/// A message is a command iff the trimmed text starts with the prefix
/// character; the whole remainder is the keyword (`!start now` is not a
/// command).
fn parse_command(prefix: char, text: &str) -> Option<&str> {
    text.trim().strip_prefix(prefix)
}

async fn handle_stopped(
    game: &SharedGame,
    round: &mut RoundState,
    sender: &str,
    text: &str,
) -> Result<(), GameError> {
    match parse_command(game.prefix, text) {
        Some("start") if game.access.can_control(sender) => {
            round.phase = GamePhase::New;
            info!(channel = %game.channel, sender, "join window opened");
            game.say(&format!(
                "Το παιχνίδι γνώσεων ξεκινά σε {} δευτερόλεπτα, για να παίξεις γράψε '{}join'",
                round.source.join_wait.as_secs(),
                game.prefix
            ))
            .await?;
            arm_join_timer(game, round);
            Ok(())
        }
        Some("reload") if game.access.can_control(sender) => {
            // Fatal on failure; the previous pool stays installed.
            let source = PoolSource::load(&game.source_path)?;
            info!(
                channel = %game.channel,
                questions = source.len(),
                "reloaded quiz definition"
            );
            round.remaining = source.reset();
            round.source = source;
            game.say("Η επαναρχικοποίηση ρυθμίσεων και ερωτήσεων ολοκληρώθηκε!")
                .await
        }
        _ => Ok(()),
    }
}

async fn handle_new(
    game: &SharedGame,
    round: &mut RoundState,
    sender: &str,
    text: &str,
) -> Result<(), GameError> {
    match parse_command(game.prefix, text) {
        Some("stop") if game.access.can_control(sender) => {
            round.reset();
            info!(channel = %game.channel, sender, "game cancelled during join window");
            game.say(&format!(
                "Το παιχνίδι γνώσεων ακυρώθηκε. Ξεκίνησε νέο με '{}start'",
                game.prefix
            ))
            .await
        }
        Some("join") => {
            round.players.insert(sender.to_string());
            game.say(&format!("Νέος παίχτης: {sender}")).await
        }
        _ => Ok(()),
    }
}

async fn handle_started(
    game: &SharedGame,
    round: &mut RoundState,
    sender: &str,
    text: &str,
) -> Result<(), GameError> {
    if let Some(command) = parse_command(game.prefix, text) {
        if command == "stop" && game.access.can_control(sender) {
            round.reset();
            info!(channel = %game.channel, sender, "game stopped");
            return game
                .say(&format!(
                    "Το παιχνίδι γνώσεων ολοκληρώθηκε. Ξεκίνησε νέο με '{}start'",
                    game.prefix
                ))
                .await;
        }
        // Prefixed text is never an answer candidate.
        return Ok(());
    }

    let answer = text.trim();
    let Some(current) = &round.current else {
        return Ok(());
    };
    let lowered = answer.to_lowercase();
    if current
        .answers
        .iter()
        .any(|alias| alias.to_lowercase() == lowered)
    {
        answer_found(game, round, sender, answer).await
    } else {
        Ok(())
    }
}

/// First matching sender wins: cancel the pending timeout, credit the
/// winner, move on to the next question.
async fn answer_found(
    game: &SharedGame,
    round: &mut RoundState,
    sender: &str,
    answer: &str,
) -> Result<(), GameError> {
    round.cancel_timer();
    info!(channel = %game.channel, winner = sender, "correct answer given");
    game.say(&format!(
        "Η σωστή απάντηση {answer} δόθηκε από τον/την χρήστη {sender}"
    ))
    .await?;
    round.current = None;
    ask_question(game, round).await
}

/// Post a random question from the remaining pool, or end the game when the
/// pool is exhausted.
async fn ask_question(game: &SharedGame, round: &mut RoundState) -> Result<(), GameError> {
    let Some((question, answers)) = pool::pick_random(&mut round.remaining) else {
        game.say("Δεν υπάρχουν άλλες ερωτήσεις! Το παιχνίδι ολοκληρώθηκε!")
            .await?;
        info!(channel = %game.channel, "question pool exhausted, game over");
        round.reset();
        return Ok(());
    };

    debug!(
        channel = %game.channel,
        question = %question,
        left = round.remaining.len(),
        "posting question"
    );
    let announcement = format!("Ερώτηση: {question}");
    round.current = Some(CurrentQuestion {
        text: question,
        answers,
    });
    game.say(&announcement).await?;
    arm_answer_timer(game, round);
    Ok(())
}

fn arm_join_timer(game: &SharedGame, round: &mut RoundState) {
    let seq = round.next_timer_seq();
    let wait = round.source.join_wait;
    let handle = timer::schedule(wait, {
        let game = Arc::clone(game);
        async move { attempt_start(game, seq).await }
    });
    round.timer = Some(ActiveTimer { seq, handle });
}

fn arm_answer_timer(game: &SharedGame, round: &mut RoundState) {
    let seq = round.next_timer_seq();
    let wait = round.source.answer_wait;
    let handle = timer::schedule(wait, {
        let game = Arc::clone(game);
        async move { answer_timeout(game, seq).await }
    });
    round.timer = Some(ActiveTimer { seq, handle });
}

/// Join-timer callback: begin the round, or cancel it when nobody joined.
async fn attempt_start(game: SharedGame, seq: u64) {
    if let Err(err) = run_attempt_start(&game, seq).await {
        warn!(channel = %game.channel, error = %err, "join timer handler aborted");
    }
}

async fn run_attempt_start(game: &SharedGame, seq: u64) -> Result<(), GameError> {
    let mut round = game.round.lock().await;
    if !round.take_if_current(seq) || round.phase != GamePhase::New {
        debug!(channel = %game.channel, seq, "stale join timer fire ignored");
        return Ok(());
    }

    if round.players.is_empty() {
        game.say("Δεν προστέθηκαν παίχτες, το παιχνίδι ακυρώνεται!")
            .await?;
        info!(channel = %game.channel, "nobody joined, game cancelled");
        round.reset();
        return Ok(());
    }

    let roster = round
        .players
        .iter()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    game.say(&format!("Το παιχνίδι ξεκινά! Παίζουν: {roster}"))
        .await?;
    round.phase = GamePhase::Started;
    info!(channel = %game.channel, players = round.players.len(), "game started");
    ask_question(game, &mut round).await
}

/// Answer-timer callback: reveal the answer and move on.
async fn answer_timeout(game: SharedGame, seq: u64) {
    if let Err(err) = run_answer_timeout(&game, seq).await {
        warn!(channel = %game.channel, error = %err, "answer timer handler aborted");
    }
}

async fn run_answer_timeout(game: &SharedGame, seq: u64) -> Result<(), GameError> {
    let mut round = game.round.lock().await;
    if !round.take_if_current(seq) || round.phase != GamePhase::Started {
        debug!(channel = %game.channel, seq, "stale answer timer fire ignored");
        return Ok(());
    }

    // Load-time validation guarantees every question has at least one alias.
    let Some(current) = round.current.take() else {
        return Ok(());
    };
    let Some(reveal) = current.answers.first() else {
        return Ok(());
    };
    debug!(channel = %game.channel, question = %current.text, "answer window expired");
    game.say(&format!(
        "Ο χρόνο έληξε! Η σωστή απάντηση ήταν : {reveal}"
    ))
    .await?;
    ask_question(game, &mut round).await
}
