use chrono::{DateTime, Duration, Utc};
use log::{debug, warn};

use crate::errors::CustomError;
use crate::models::event::GameEvent;
use crate::models::game::{Game, GameStatus, Side};
use crate::models::user::UserId;

// Timing knobs of the turn protocol
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TurnPolicy {
    /// No action is accepted once the last one is older than this.
    pub hard_timeout: Duration,
    /// Added to the game's move timeout before a waiting player may take the turn over.
    pub forfeit_grace: Duration,
    /// Consecutive events by one author that mean the other side has left.
    pub abandonment_streak: usize,
}

impl Default for TurnPolicy {
    fn default() -> Self {
        TurnPolicy {
            hard_timeout: Duration::seconds(60),
            forfeit_grace: Duration::seconds(2),
            abandonment_streak: 5,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TurnClaim {
    pub side: Side,
    pub user: UserId,
    pub opponent: UserId,
}

/// Checks that `user` may act on `game` right now and hands the turn to the opponent.
///
/// On success the turn is flipped and `last_move_time` moves to `now`. On any error the
/// game is left untouched, so a `NotUserTurn` caller can still try the forfeiture path.
pub fn claim_turn(
    game: &mut Game,
    user: UserId,
    now: DateTime<Utc>,
    policy: &TurnPolicy,
) -> Result<TurnClaim, CustomError> {
    if game.status != GameStatus::Start {
        debug!("game {} is not started", game.id);
        return Err(CustomError::InvalidGameStatus("game is not started".to_string()));
    }

    if game.last_move_time + policy.hard_timeout < now {
        warn!("game {} has been idle since {}", game.id, game.last_move_time);
        return Err(CustomError::GameIsFinished);
    }

    let side = game.participant(user)?;
    let opponent = game.user_of(side.other()).ok_or(CustomError::Internal)?;
    if game.turn != side {
        return Err(CustomError::NotUserTurn);
    }

    game.flip_turn();
    game.last_move_time = now;
    Ok(TurnClaim { side, user, opponent })
}

/// True once the player holding the turn has been silent past their move timeout plus grace.
pub fn forfeit_due(game: &Game, now: DateTime<Utc>, policy: &TurnPolicy) -> bool {
    game.last_move_time + Duration::seconds(i64::from(game.move_timeout_secs)) + policy.forfeit_grace < now
}

/// Looks at the newest events of a game. When the latest `streak` of them share one author,
/// that author is the only one still playing and is returned.
pub fn sole_active_player(recent: &[GameEvent], streak: usize) -> Option<UserId> {
    if streak == 0 || recent.len() < streak {
        return None;
    }
    let author = recent[0].user_id;
    recent[..streak]
        .iter()
        .all(|event| event.user_id == author)
        .then_some(author)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::event::GameEventKind;
    use crate::models::game::GameId;

    const ALICE: UserId = UserId(1);
    const BOB: UserId = UserId(2);

    fn started(turn: Side, last_move: DateTime<Utc>) -> Game {
        let mut game = Game::new(ALICE, 10, turn, last_move).unwrap();
        game.join(BOB).unwrap();
        game.submit_ships(ALICE, &(0..10).collect::<Vec<i64>>(), last_move).unwrap();
        game.submit_ships(BOB, &(0..10).collect::<Vec<i64>>(), last_move).unwrap();
        game
    }

    fn events(authors: &[UserId]) -> Vec<GameEvent> {
        authors
            .iter()
            .map(|&user| GameEvent::new(GameId(1), user, GameEventKind::ChangeTurn))
            .collect()
    }

    #[test]
    fn turn_alternates() {
        let now = Utc::now();
        let policy = TurnPolicy::default();
        let mut game = started(Side::One, now);

        let claim = claim_turn(&mut game, ALICE, now, &policy).unwrap();
        assert_eq!(claim.opponent, BOB);
        assert_eq!(game.turn, Side::Two);

        assert_eq!(claim_turn(&mut game, ALICE, now, &policy), Err(CustomError::NotUserTurn));
        assert_eq!(game.turn, Side::Two);

        claim_turn(&mut game, BOB, now, &policy).unwrap();
        assert_eq!(game.turn, Side::One);
    }

    #[test]
    fn rejected_claims_leave_the_game_untouched() {
        let then = Utc::now() - Duration::seconds(5);
        let policy = TurnPolicy::default();
        let mut game = started(Side::Two, then);
        let before = game.clone();

        assert_eq!(claim_turn(&mut game, ALICE, Utc::now(), &policy), Err(CustomError::NotUserTurn));
        assert!(matches!(
            claim_turn(&mut game, UserId(3), Utc::now(), &policy),
            Err(CustomError::Forbidden(_))
        ));
        assert_eq!(game, before);
    }

    #[test]
    fn only_started_games_accept_actions() {
        let now = Utc::now();
        let mut game = Game::new(ALICE, 10, Side::One, now).unwrap();
        assert!(matches!(
            claim_turn(&mut game, ALICE, now, &TurnPolicy::default()),
            Err(CustomError::InvalidGameStatus(_))
        ));
    }

    #[test]
    fn idle_games_are_gated() {
        let then = Utc::now() - Duration::seconds(61);
        let mut game = started(Side::One, then);
        assert_eq!(
            claim_turn(&mut game, ALICE, Utc::now(), &TurnPolicy::default()),
            Err(CustomError::GameIsFinished)
        );
        assert_eq!(game.status, GameStatus::Start);
    }

    #[test]
    fn forfeit_waits_for_timeout_plus_grace() {
        let now = Utc::now();
        let policy = TurnPolicy::default();
        let game = started(Side::One, now - Duration::seconds(11));
        assert!(!forfeit_due(&game, now, &policy));
        let game = started(Side::One, now - Duration::seconds(13));
        assert!(forfeit_due(&game, now, &policy));
    }

    #[test]
    fn five_events_by_one_author_means_the_other_left() {
        assert_eq!(sole_active_player(&events(&[ALICE; 5]), 5), Some(ALICE));
        assert_eq!(sole_active_player(&events(&[ALICE, ALICE, ALICE, ALICE, ALICE, BOB]), 5), Some(ALICE));
    }

    #[test]
    fn mixed_or_short_history_is_no_verdict() {
        assert_eq!(sole_active_player(&events(&[ALICE; 4]), 5), None);
        assert_eq!(sole_active_player(&events(&[ALICE, ALICE, BOB, ALICE, ALICE]), 5), None);
        assert_eq!(sole_active_player(&[], 5), None);
    }
}
