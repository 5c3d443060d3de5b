use dce_core::input::InputSnapshot;
use dce_core::time::FIXED_DT_US;
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Recorded per-tick input used to drive `GameState` headlessly.
#[derive(Debug, Deserialize, Clone)]
pub struct ReplaySequence {
    #[serde(default = "default_dt_us")]
    pub fixed_dt_us: u64,
    pub frames: Vec<ReplayFrame>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ReplayFrame {
    #[serde(flatten)]
    pub input: InputSnapshot,
    #[serde(default = "default_repeat")]
    pub repeat: u32,
}

impl ReplaySequence {
    pub fn expanded_inputs(&self) -> Vec<InputSnapshot> {
        let mut out = Vec::new();
        for frame in &self.frames {
            for _ in 0..frame.repeat.max(1) {
                out.push(frame.input);
            }
        }
        out
    }
}

pub fn load_replay_from_path(path: &Path) -> Result<ReplaySequence, String> {
    let raw =
        fs::read_to_string(path).map_err(|e| format!("Failed to read {}: {e}", path.display()))?;
    let replay: ReplaySequence = serde_json::from_str(&raw)
        .map_err(|e| format!("Failed to parse replay JSON {}: {e}", path.display()))?;
    validate_replay(&replay)?;
    Ok(replay)
}

fn validate_replay(replay: &ReplaySequence) -> Result<(), String> {
    if replay.fixed_dt_us == 0 {
        return Err("Replay validation failed: fixed_dt_us must be > 0".to_string());
    }
    if replay.frames.is_empty() {
        return Err("Replay validation failed: frames list is empty".to_string());
    }
    Ok(())
}

const fn default_dt_us() -> u64 {
    FIXED_DT_US
}

const fn default_repeat() -> u32 {
    1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use crate::game_state::{GameState, TickEvent};
    use crate::level::parse_level;
    use crate::tiles::test_catalog;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_file_path(name_hint: &str) -> std::path::PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system time before unix epoch")
            .as_nanos();
        std::env::temp_dir().join(format!(
            "dce_replay_test_{}_{}_{}.json",
            name_hint,
            std::process::id(),
            nanos
        ))
    }

    const DUNGEON: &str = r#"
    {
      "level": { "width": 12, "height": 8 },
      "start": { "x": 2, "y": 2 },
      "baseMap": [ { "x": 2, "y": 2, "tileKey": "f1" } ],
      "collisionMap": [
        { "x": 6, "y": 2, "tileKey": "w1" },
        { "x": 4, "y": 4, "tileKey": "chest" }
      ],
      "mobs": [
        { "name": "ghoul", "x": 5, "y": 5, "waypoints": [ { "x": 8, "y": 5 }, { "x": 5, "y": 5 } ] },
        { "name": "bat", "x": 3, "y": 2, "health": 1 }
      ],
      "doors": [ { "x": 3, "y": 5 } ],
      "torches": [ { "x": 0, "y": 0 } ]
    }
    "#;

    fn new_session() -> GameState {
        let level = parse_level("replay", DUNGEON, 24.0).expect("replay level should parse");
        GameState::new(level, &test_catalog(), &GameConfig::default())
    }

    fn run(replay: &ReplaySequence) -> (GameState, Vec<TickEvent>) {
        let mut state = new_session();
        let mut events = Vec::new();
        let mut now = 0;
        for input in replay.expanded_inputs() {
            now += replay.fixed_dt_us;
            events.extend(state.tick(&input, now).events);
        }
        (state, events)
    }

    #[test]
    fn replay_file_parses_and_expands() {
        let path = temp_file_path("parse");
        fs::write(
            &path,
            r#"{
              "frames": [
                { "right": true, "repeat": 3 },
                { "attack_pressed": true }
              ]
            }"#,
        )
        .expect("write replay file");

        let replay = load_replay_from_path(&path).expect("replay should load");
        assert_eq!(replay.fixed_dt_us, FIXED_DT_US);
        let expanded = replay.expanded_inputs();
        assert_eq!(expanded.len(), 4);
        assert!(expanded[0].right);
        assert!(!expanded[0].attack_pressed);
        assert!(expanded[3].attack_pressed);

        let _ = fs::remove_file(path);
    }

    #[test]
    fn empty_replay_is_rejected() {
        let path = temp_file_path("empty");
        fs::write(&path, r#"{ "frames": [] }"#).expect("write replay file");
        let err = load_replay_from_path(&path).expect_err("empty replay should fail");
        assert!(err.contains("frames list is empty"));
        let _ = fs::remove_file(path);
    }

    #[test]
    fn replay_run_is_deterministic() {
        let path = temp_file_path("deterministic");
        fs::write(
            &path,
            r#"{
              "frames": [
                { "right": true, "repeat": 20 },
                { "attack_pressed": true },
                { "down": true, "repeat": 60 },
                { "interact_pressed": true },
                { "right": true, "down": true, "repeat": 90 },
                { "attack_pressed": true, "repeat": 2 },
                { "left": true, "repeat": 45 },
                { "up": true, "interact_pressed": true, "repeat": 30 },
                { "repeat": 120 }
              ]
            }"#,
        )
        .expect("write replay file");

        let replay = load_replay_from_path(&path).expect("replay should load");
        let (a, events_a) = run(&replay);
        let (b, events_b) = run(&replay);

        assert_eq!(events_a, events_b);
        assert_eq!(a.player.position, b.player.position);
        assert_eq!(a.player.health, b.player.health);
        assert_eq!(a.player.state(), b.player.state());
        assert_eq!(a.player.frame_index(), b.player.frame_index());
        assert_eq!(a.camera, b.camera);
        assert_eq!(a.live_mob_count(), b.live_mob_count());
        for (mob_a, mob_b) in a.mobs.iter().zip(&b.mobs) {
            assert_eq!(mob_a.name, mob_b.name);
            assert_eq!(mob_a.position, mob_b.position);
            assert_eq!(mob_a.health, mob_b.health);
            assert_eq!(mob_a.waypoint_index(), mob_b.waypoint_index());
        }
        for (door_a, door_b) in a.doors.iter().zip(&b.doors) {
            assert_eq!(door_a.state(), door_b.state());
        }
        assert_eq!(a.hud(), b.hud());

        let _ = fs::remove_file(path);
    }
}
