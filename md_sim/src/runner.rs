//! Drives bot-vs-bot games through the coordinator.
//!
//! Each player runs in its own task and only talks to the game through
//! [`GameCoordinator`], so both seats race for the same actor the way two
//! remote clients would.

use magic_duel::{
    Coins, GameAction, GameCoordinator, GameError, GameId, Phase, Player, PlayerId, PlayerView,
    SessionError,
    constants::REVEALED_MOVE_LIST_LEN,
    game::{
        ErrorKind, Side, Winner,
        actions::{EndRound, FoldBet, Leave, MakeBet, MakeMove, NextRound, Reveal},
    },
};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::watch;

use crate::bots::{BetDecision, Bot};

/// What a player should do after looking at its view
#[derive(Debug, PartialEq)]
pub enum Turn {
    Act(GameAction),
    /// Nothing to do until the opponent acts
    Wait,
    /// The game is over
    Done,
}

/// Per-game settings handed to both player tasks
#[derive(Clone, Copy, Debug)]
pub struct TableRules {
    /// Rounds after which player 1 walks away
    pub max_rounds: u32,
    /// Board seed for round 1; later rounds offset it by the round number
    pub board_seed: Option<u32>,
}

impl TableRules {
    fn round_seed(&self, next_round: u32) -> Option<u32> {
        self.board_seed.map(|seed| seed.wrapping_add(next_round))
    }
}

/// Result of one simulated game
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSummary {
    pub game_id: GameId,
    pub player1: String,
    pub player2: String,
    pub rounds: u32,
    /// `None` when the run was interrupted
    pub winner: Option<Winner>,
    pub player1_coins: Coins,
    pub player2_coins: Coins,
}

/// Decide the next step for the viewer.
///
/// # Arguments
///
/// * `view` - The viewer's projection of the game
/// * `player_id` - The viewer
/// * `bot` - Strategy making the move, bet and reveal choices
/// * `rules` - Round limit and board seeds
pub fn next_turn(view: &PlayerView, player_id: &PlayerId, bot: &mut dyn Bot, rules: &TableRules) -> Turn {
    let player_id = player_id.clone();
    let me = &view.me;
    let opponent = &view.opponent;

    let over_limit = view.round_number > rules.max_rounds;
    if view.side == Side::Player1 && over_limit && view.phase != Phase::Ended {
        return Turn::Act(Leave { player_id }.into());
    }

    match view.phase {
        Phase::Move1 | Phase::Move2 | Phase::Move3 => {
            let required = view.phase.required_moves().unwrap_or(0);
            if me.moves.len() >= required {
                return Turn::Wait;
            }
            let (self_column, other_row) = bot.choose_move(view);
            Turn::Act(
                MakeMove {
                    player_id,
                    self_column,
                    other_row,
                }
                .into(),
            )
        }

        Phase::Bet1 | Phase::Bet2 | Phase::Bet3 | Phase::FinalBet => {
            if me.bet_made && me.pot_coins >= opponent.pot_coins {
                return Turn::Wait;
            }
            match bot.choose_bet(view) {
                BetDecision::Bet(amount) => Turn::Act(MakeBet { player_id, amount }.into()),
                BetDecision::Fold => Turn::Act(FoldBet { player_id }.into()),
            }
        }

        Phase::Reveal => {
            if me.moves.len() >= REVEALED_MOVE_LIST_LEN {
                return Turn::Wait;
            }
            let column = bot.choose_reveal(view);
            Turn::Act(Reveal { player_id, column }.into())
        }

        Phase::RoundEnd => match (me.ended_round, opponent.ended_round) {
            (false, _) => Turn::Act(EndRound { player_id }.into()),
            (true, true) => Turn::Act(
                NextRound {
                    seed: rules.round_seed(view.round_number + 1),
                }
                .into(),
            ),
            (true, false) => Turn::Wait,
        },

        Phase::Waiting => Turn::Wait,
        Phase::Ended => Turn::Done,
    }
}

/// Play one seat until the game ends or `stop` fires.
///
/// Subscribes before the first look at the game so no change between a view
/// and the wait that follows it can be missed.
pub async fn drive_player(
    coordinator: Arc<GameCoordinator>,
    game_id: GameId,
    player_id: PlayerId,
    mut bot: Box<dyn Bot>,
    rules: TableRules,
    mut stop: watch::Receiver<bool>,
) -> Result<(), SessionError> {
    let mut notifications = coordinator.subscribe(game_id, &player_id).await?;

    loop {
        if *stop.borrow() {
            tracing::debug!(game_id = %game_id, player = %player_id, "Stopping early");
            return Ok(());
        }

        let view = coordinator.view(game_id, &player_id).await?;
        match next_turn(&view, &player_id, bot.as_mut(), &rules) {
            Turn::Done => break,
            Turn::Act(action) => {
                tracing::trace!(game_id = %game_id, bot = bot.name(), %action, "Acting");
                match coordinator.apply(game_id, action).await {
                    Ok(_) => {}
                    Err(SessionError::Game(GameError::AlreadyEnded)) => break,
                    // Lost a race with the opponent; look again.
                    Err(err) if err.kind() == ErrorKind::Conflict => {
                        tracing::debug!(game_id = %game_id, player = %player_id, error = %err, "Retrying");
                        tokio::task::yield_now().await;
                    }
                    Err(err) => return Err(err),
                }
            }
            Turn::Wait => {
                tokio::select! {
                    received = notifications.recv() => {
                        // The actor retired; subscribe to its successor.
                        if received.is_none() {
                            notifications = coordinator.subscribe(game_id, &player_id).await?;
                        }
                    }
                    changed = stop.changed() => {
                        // Sender gone: nobody can ask us to keep going.
                        if changed.is_err() {
                            return Ok(());
                        }
                    }
                }
            }
        }
    }

    coordinator.unsubscribe(game_id, &player_id).await.ok();
    Ok(())
}

/// Create a game, seat two bots and play it to the end.
pub async fn play_game(
    coordinator: Arc<GameCoordinator>,
    stake: Coins,
    rules: TableRules,
    bots: (Box<dyn Bot>, Box<dyn Bot>),
    stop: watch::Receiver<bool>,
) -> anyhow::Result<GameSummary> {
    let (bot1, bot2) = bots;
    let player1 = Player::new("p1", bot1.name());
    let player2 = Player::new("p2", bot2.name());
    let (id1, id2) = (player1.id.clone(), player2.id.clone());

    let state = coordinator
        .create_game(player1, stake, rules.board_seed)
        .await?;
    let game_id = state.id();
    coordinator.join(game_id, player2).await?;
    tracing::info!(game_id = %game_id, p1 = bot1.name(), p2 = bot2.name(), "Game started");

    let (name1, name2) = (bot1.name().to_string(), bot2.name().to_string());
    let seat1 = tokio::spawn(drive_player(
        coordinator.clone(),
        game_id,
        id1,
        bot1,
        rules,
        stop.clone(),
    ));
    let seat2 = tokio::spawn(drive_player(
        coordinator.clone(),
        game_id,
        id2,
        bot2,
        rules,
        stop,
    ));
    seat1.await??;
    seat2.await??;

    let state = coordinator.get_game(game_id).await?;
    Ok(GameSummary {
        game_id,
        player1: name1,
        player2: name2,
        rounds: state.round_number(),
        winner: state.game_winner(),
        player1_coins: state.seat(Side::Player1).coins,
        player2_coins: state.seat(Side::Player2).coins,
    })
}
