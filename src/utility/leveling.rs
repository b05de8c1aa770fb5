
use rand::Rng;

use std::collections::HashMap;

use crate::utility::error::Result;
use crate::utility::traits::Singleton;
use crate::databases::*;
use crate::impl_singleton;


/// Total XP required to sit at `level`.
pub fn xp_threshold(level: i64) -> i64 {
    50 * level * level + 100 * level
}

/// Greatest level whose threshold is covered by `xp`.
pub fn level_for_xp(xp: i64) -> i64 {
    let mut level = 0;
    while xp >= xp_threshold(level + 1) {
        level += 1;
    }
    level
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LevelChange {
    pub new_level: i64,
}

/// Applies a raw XP gain to stored values. Level only ever moves up, and a
/// change is reported at most once per gain.
pub fn grant(xp: i64, level: i64, gain: i64) -> (i64, i64, Option<LevelChange>) {
    let new_xp = xp + gain.max(0);
    let derived = level_for_xp(new_xp);
    if derived > level {
        (new_xp, derived, Some(LevelChange { new_level: derived }))
    } else {
        (new_xp, level, None)
    }
}

/// Message XP draws a random base per message; voice XP is session based and
/// only flushed when the leave event is observed, so a session cut short by
/// a crash accrues nothing.
pub struct LevelingEngine {
    voice_sessions: HashMap<(u64, u64), i64>,
}

impl LevelingEngine {

    pub fn new() -> LevelingEngine {
        LevelingEngine {
            voice_sessions: HashMap::new(),
        }
    }

    pub async fn award_message_xp(&self, guild_id: u64, user_id: u64, rate: f64) -> Result<Option<LevelChange>> {
        let gain = {
            let mut rng = rand::rng();
            (rng.random_range(15..=25) as f64 * rate) as i64
        };
        self.award(guild_id, user_id, gain, 0).await
    }

    pub fn voice_connect(&mut self, guild_id: u64, user_id: u64, now: i64) {
        self.voice_sessions.insert((guild_id, user_id), now);
    }

    pub async fn voice_disconnect(&mut self, guild_id: u64, user_id: u64, now: i64,
                                  voice_rate: f64) -> Result<Option<LevelChange>> {
        let joined_at = match self.voice_sessions.remove(&(guild_id, user_id)) {
            Some(joined_at) => joined_at,
            None => return Ok(None),
        };
        let seconds = (now - joined_at).max(0);
        let gain = ((seconds as f64 / 60.0) * 5.0 * voice_rate) as i64;
        self.award(guild_id, user_id, gain, seconds).await
    }

    async fn award(&self, guild_id: u64, user_id: u64, gain: i64, voice_seconds: i64) -> Result<Option<LevelChange>> {
        let key = format!("{}:{}", guild_id, user_id);
        let db = UsersDB::get_instance().lock().await;
        let mut state = db.get(&key).await?.unwrap_or(UserState::fresh());
        let (xp, level, change) = grant(state.xp, state.level, gain);
        state.xp = xp;
        state.level = level;
        state.voice_seconds += voice_seconds.max(0);
        db.set(&key, &state.into()).await?;
        Ok(change)
    }
}

impl_singleton!(LevelingEngine);


#[cfg(test)]
mod tests {

    use super::*;
    use rand::Rng as _;

    fn fresh_ids() -> (u64, u64) {
        let mut rng = rand::rng();
        (rng.random_range(1_000_000..u64::MAX / 2), rng.random_range(1..u64::MAX / 2))
    }

    #[test]
    fn threshold_curve_matches() {
        assert_eq!(xp_threshold(0), 0);
        assert_eq!(xp_threshold(1), 150);
        assert_eq!(xp_threshold(2), 400);
        assert_eq!(xp_threshold(3), 750);
    }

    #[test]
    fn level_for_xp_inverts_thresholds() {
        for level in 0..32 {
            assert_eq!(level_for_xp(xp_threshold(level)), level);
            if level > 0 {
                assert_eq!(level_for_xp(xp_threshold(level) - 1), level - 1);
            }
        }
    }

    #[test]
    fn level_for_xp_is_monotonic() {
        let mut previous = 0;
        for xp in 0..5_000 {
            let level = level_for_xp(xp);
            assert!(level >= previous);
            previous = level;
        }
    }

    #[test]
    fn grant_emits_change_exactly_on_crossing() {
        let (xp, level, change) = grant(90, 0, 25);
        assert_eq!((xp, level), (115, 0));
        assert!(change.is_none());

        let (xp, level, change) = grant(xp, level, 40);
        assert_eq!((xp, level), (155, 1));
        assert_eq!(change, Some(LevelChange { new_level: 1 }));

        let (_, _, change) = grant(xp, level, 10);
        assert!(change.is_none());
    }

    #[tokio::test]
    async fn message_xp_persists_and_levels_up() {
        let (guild, user) = fresh_ids();
        let key = format!("{}:{}", guild, user);
        {
            let db = UsersDB::get_instance().lock().await;
            let mut state = UserState::fresh();
            state.xp = 140;
            db.set(&key, &state.into()).await.unwrap();
        }

        let engine = LevelingEngine::new();
        // any draw from [15, 25] crosses the level-1 threshold of 150
        let change = engine.award_message_xp(guild, user, 1.0).await.unwrap();
        assert_eq!(change, Some(LevelChange { new_level: 1 }));

        let state = UsersDB::get_instance().lock().await
            .get(&key).await.unwrap().unwrap();
        assert!(state.xp >= 155 && state.xp <= 165);
        assert_eq!(state.level, 1);

        // the next draw cannot reach level 2 at 400 xp
        let change = engine.award_message_xp(guild, user, 1.0).await.unwrap();
        assert!(change.is_none());
    }

    #[tokio::test]
    async fn voice_sessions_flush_on_disconnect_only() {
        let (guild, user) = fresh_ids();
        let mut engine = LevelingEngine::new();

        // no session recorded, nothing accrues
        assert!(engine.voice_disconnect(guild, user, 100, 1.0).await.unwrap().is_none());

        engine.voice_connect(guild, user, 0);
        let change = engine.voice_disconnect(guild, user, 600, 1.0).await.unwrap();
        assert!(change.is_none());

        let key = format!("{}:{}", guild, user);
        let state = UsersDB::get_instance().lock().await
            .get(&key).await.unwrap().unwrap();
        assert_eq!(state.xp, 50);
        assert_eq!(state.voice_seconds, 600);
    }
}
