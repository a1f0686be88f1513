use std::sync::Arc;

use chrono::Utc;
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};

use crate::dispatcher::{
    ChangeTurnEvent, ConnectEvent, Dispatcher, EndGameEvent, ExplosionEvent, GameStartEvent,
    OutgoingEvent, RevealEvent, ShipMovedEvent,
};
use crate::errors::CustomError;
use crate::models::event::{GameEvent, GameEventKind};
use crate::models::game::{Game, GameId, GameStatus, GameView, Side};
use crate::models::user::UserId;
use crate::registry::{ConnectionRegistry, Tx};
use crate::repository::Repository;
use crate::services::arbiter::{claim_turn, forfeit_due, sole_active_player, TurnClaim, TurnPolicy};
use crate::services::locks::GameLocks;

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct SubmitShipsResult {
    pub status: GameStatus,
    pub turn: u8,
}

/// Entry point for every game action.
///
/// Mutating actions run fetch, validate, mutate, persist, log and notify
/// under the game's lock, so two requests on one game never interleave.
pub struct GameService {
    repo: Arc<dyn Repository>,
    registry: Arc<ConnectionRegistry>,
    dispatcher: Dispatcher,
    locks: GameLocks,
    policy: TurnPolicy,
}

impl GameService {
    pub fn new(repo: Arc<dyn Repository>, registry: Arc<ConnectionRegistry>, policy: TurnPolicy) -> Self {
        GameService {
            repo,
            dispatcher: Dispatcher::new(registry.clone()),
            registry,
            locks: GameLocks::new(),
            policy,
        }
    }

    pub async fn create_game(&self, user: UserId, move_timeout_secs: u8) -> Result<GameView, CustomError> {
        self.repo.get_user(user).await?;

        let mut game = Game::new(user, move_timeout_secs, Side::random(), Utc::now())?;
        game.id = self.repo.insert_game(&game).await?;
        self.log_event(game.id, user, GameEventKind::JoinGame).await?;

        info!("user {} created game {}", user, game.id);
        GameView::for_user(&game, user)
    }

    pub async fn get_game(&self, game_id: GameId, user: UserId) -> Result<GameView, CustomError> {
        let game = self.repo.get_game(game_id).await?;
        GameView::for_user(&game, user)
    }

    pub async fn join_game(&self, game_id: GameId, user: UserId) -> Result<GameView, CustomError> {
        self.repo.get_user(user).await?;

        let _guard = self.locks.lock(game_id).await;
        let mut game = self.repo.get_game(game_id).await?;

        if game.join(user)? {
            self.repo.update_game(&game).await?;
            self.log_event(game.id, user, GameEventKind::JoinGame).await?;
            info!("user {} joined game {}", user, game.id);
        } else {
            debug!("user {} is already seated in game {}", user, game.id);
        }
        GameView::for_user(&game, user)
    }

    pub async fn submit_ships(
        &self,
        game_id: GameId,
        user: UserId,
        cells: &[i64],
    ) -> Result<SubmitShipsResult, CustomError> {
        let _guard = self.locks.lock(game_id).await;
        let mut game = self.repo.get_game(game_id).await?;

        let (_, placed) = game.submit_ships(user, cells, Utc::now()).map_err(|err| {
            warn!("game {}: rejected ship locations from user {}: {}", game_id, user, err);
            err
        })?;
        self.repo.update_game(&game).await?;
        self.log_event(game.id, user, GameEventKind::InitialShipLocation { indexes: placed })
            .await?;

        if game.status == GameStatus::Start {
            info!("game {} started, side {} moves first", game.id, game.turn.number());
            for recipient in [Some(game.side1), game.side2].into_iter().flatten() {
                let view = GameView::for_user(&game, recipient)?;
                self.dispatcher.send(
                    game.id,
                    recipient,
                    &OutgoingEvent::GameStart(GameStartEvent { game: view }),
                );
            }
        }

        Ok(SubmitShipsResult {
            status: game.status,
            turn: game.turn.number(),
        })
    }

    pub async fn move_ship(&self, game_id: GameId, user: UserId, from: i64, to: i64) -> Result<(), CustomError> {
        let _guard = self.locks.lock(game_id).await;
        let mut game = self.repo.get_game(game_id).await?;
        let claim = self.claim(&mut game, user)?;

        let (from, to) = game.move_ship(claim.side, from, to)?;
        self.repo.update_game(&game).await?;
        self.log_event(game.id, user, GameEventKind::MoveShip { from, to }).await?;

        self.dispatcher.send(
            game.id,
            claim.opponent,
            &OutgoingEvent::ShipMoved(ShipMovedEvent {
                game_id: game.id,
                user_id: claim.opponent,
                old_ship_index: from,
            }),
        );
        Ok(())
    }

    /// Passes the turn. A player kept waiting past the opponent's timeout may take the turn over,
    /// and if the log shows only that player acting lately the game is awarded to them.
    pub async fn change_turn(&self, game_id: GameId, user: UserId) -> Result<(), CustomError> {
        let _guard = self.locks.lock(game_id).await;
        let mut game = self.repo.get_game(game_id).await?;
        let now = Utc::now();

        let opponent = match claim_turn(&mut game, user, now, &self.policy) {
            Ok(claim) => claim.opponent,
            Err(CustomError::NotUserTurn) if forfeit_due(&game, now, &self.policy) => {
                let side = game.participant(user)?;
                let opponent = game.user_of(side.other()).ok_or(CustomError::Internal)?;
                info!("game {}: user {} takes over the turn from silent user {}", game.id, user, opponent);
                game.flip_turn();
                game.last_move_time = now;

                let recent = self.repo.list_events(game.id, None).await?;
                if let Some(winner) = sole_active_player(&recent, self.policy.abandonment_streak) {
                    info!("game {}: opponent of user {} has left, finishing", game.id, winner);
                    game.finish(winner);
                }
                opponent
            }
            Err(err) => {
                debug!("game {}: user {} cannot change turn: {}", game_id, user, err);
                return Err(err);
            }
        };

        self.repo.update_game(&game).await?;

        if let Some(winner) = game.winner {
            self.dispatcher.send_both(
                &game,
                &OutgoingEvent::EndGame(EndGameEvent {
                    game_id: game.id,
                    winner_user_id: winner,
                }),
            );
            return Ok(());
        }

        self.log_event(game.id, user, GameEventKind::ChangeTurn).await?;
        self.dispatcher.send(
            game.id,
            opponent,
            &OutgoingEvent::ChangeTurn(ChangeTurnEvent {
                game_id: game.id,
                user_id: opponent,
            }),
        );
        Ok(())
    }

    pub async fn reveal_slot(&self, game_id: GameId, user: UserId, index: i64) -> Result<Vec<usize>, CustomError> {
        let _guard = self.locks.lock(game_id).await;
        let mut game = self.repo.get_game(game_id).await?;
        let claim = self.claim(&mut game, user)?;

        let (slots, revealed_ships) = game.reveal(claim.side, index)?;
        self.repo.update_game(&game).await?;
        self.log_event(
            game.id,
            user,
            GameEventKind::Reveal {
                slots: slots.clone(),
                revealed_ships: revealed_ships.clone(),
            },
        )
        .await?;

        self.dispatcher.send(
            game.id,
            claim.opponent,
            &OutgoingEvent::Reveal(RevealEvent {
                game_id: game.id,
                user_id: claim.opponent,
                slots,
                revealed_ships: revealed_ships.clone(),
            }),
        );
        Ok(revealed_ships)
    }

    pub async fn explode(&self, game_id: GameId, user: UserId, index: i64) -> Result<bool, CustomError> {
        let _guard = self.locks.lock(game_id).await;
        let mut game = self.repo.get_game(game_id).await?;
        let claim = self.claim(&mut game, user)?;

        // a hit does not earn another shot, the turn was already passed by the claim
        let has_ship = game.explode(claim.side, index)?;
        // validated by explode above
        let index = index as usize;
        self.repo.update_game(&game).await?;
        let kind = if has_ship {
            GameEventKind::Explosion { index }
        } else {
            GameEventKind::EmptyExplosion { index }
        };
        self.log_event(game.id, user, kind).await?;

        self.dispatcher.send(
            game.id,
            claim.opponent,
            &OutgoingEvent::Explosion(ExplosionEvent {
                game_id: game.id,
                user_id: claim.opponent,
                index,
            }),
        );

        if let Some(winner) = game.winner {
            info!("game {} finished, user {} sank the last ship", game.id, winner);
            self.dispatcher.send_both(
                &game,
                &OutgoingEvent::EndGame(EndGameEvent {
                    game_id: game.id,
                    winner_user_id: winner,
                }),
            );
        }
        Ok(has_ship)
    }

    /// Registers a live channel for `user`. While ships are being placed the peer is told they are online.
    pub async fn connect(&self, game_id: GameId, user: UserId, tx: Tx) -> Result<(), CustomError> {
        let game = self.repo.get_game(game_id).await?;
        self.registry.register(&game, user, tx)?;

        let side = game.participant(user)?;
        // only announced while both are seated and placing ships
        if game.status == GameStatus::Joined {
            if let Some(peer) = game.user_of(side.other()) {
                self.dispatcher.send(
                    game.id,
                    peer,
                    &OutgoingEvent::Connect(ConnectEvent {
                        game_id: game.id,
                        user_id: user,
                    }),
                );
            }
        }
        Ok(())
    }

    fn claim(&self, game: &mut Game, user: UserId) -> Result<TurnClaim, CustomError> {
        claim_turn(game, user, Utc::now(), &self.policy).map_err(|err| {
            debug!("game {}: user {} may not act: {}", game.id, user, err);
            err
        })
    }

    async fn log_event(&self, game_id: GameId, user: UserId, kind: GameEventKind) -> Result<(), CustomError> {
        let event = GameEvent::new(game_id, user, kind);
        self.repo.insert_event(&event).await.map(|_| ()).map_err(|err| {
            error!("game {}: cannot store {} event: {}", game_id, event.kind.event_type(), err);
            err
        })
    }
}
