//! JSON-lines protocol between the engine bridge and the agent.
//!
//! **Input (stdin):** one [`Message`] per line, tagged by `type`.
//! **Output (stdout):** one [`Response`] per line, tagged by `type`.
//!
//! # Protocol Flow
//!
//! 1. Runner starts, outputs `{"type":"ready","version":"1.0"}`
//! 2. Bridge sends `start` with the static map and the first snapshot
//! 3. Bridge sends one `step` per decision tick; the runner answers each
//!    with exactly one `commands` line
//! 4. Bridge sends `end`; the runner answers with `done`
//!
//! Positions and other fixed-point fields travel as raw `I32F32` bits, the
//! same representation the agent uses internally, so a round trip through the
//! protocol never changes a decision.
//!
//! # Example Session
//!
//! ```text
//! <- {"type":"ready","version":"1.0"}
//! -> {"type":"start","map":{...},"snapshot":{...}}
//! -> {"type":"step","snapshot":{"game_loop":16,...}}
//! <- {"type":"commands","tick":1,"game_loop":16,"commands":[...]}
//! -> {"type":"end"}
//! <- {"type":"done","ticks":1}
//! ```

use serde::{Deserialize, Serialize};
use swarm_core::command::Command;
use swarm_core::snapshot::{MapInfo, Snapshot};

/// Protocol version reported in the `ready` line.
pub const PROTOCOL_VERSION: &str = "1.0";

// ============================================================================
// Input Messages (Bridge -> Runner)
// ============================================================================

/// Messages the engine bridge sends to the runner.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Message {
    /// Begin an episode.
    Start {
        /// Static map data.
        map: MapInfo,
        /// World state at game loop zero.
        snapshot: Snapshot,
    },

    /// Decide one tick.
    Step {
        /// Current world state.
        snapshot: Snapshot,
    },

    /// Finish the episode.
    End,
}

// ============================================================================
// Output Responses (Runner -> Bridge)
// ============================================================================

/// Lines the runner writes back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    /// Runner is up and waiting for `start`.
    Ready {
        /// Protocol version.
        version: String,
    },

    /// Command batch for one step.
    Commands {
        /// Steps taken this episode, including this one.
        tick: u64,
        /// Game loop of the snapshot the batch answers.
        game_loop: u32,
        /// Orders to issue, at most one per unit.
        commands: Vec<Command>,
    },

    /// Something went wrong with the last message.
    Error {
        /// Human-readable description.
        message: String,
        /// The episode ended because of this error.
        fatal: bool,
    },

    /// Episode finished.
    Done {
        /// Steps taken.
        ticks: u64,
    },
}

// ============================================================================
// Helpers
// ============================================================================

impl Response {
    /// Create a ready response.
    #[must_use]
    pub fn ready() -> Self {
        Self::Ready {
            version: PROTOCOL_VERSION.to_string(),
        }
    }

    /// Create an error response.
    pub fn error(message: impl Into<String>, fatal: bool) -> Self {
        Self::Error {
            message: message.into(),
            fatal,
        }
    }

    /// Serialize to JSON line (with newline).
    #[must_use]
    pub fn to_json_line(&self) -> String {
        let mut json = serde_json::to_string(self).unwrap_or_else(|e| {
            format!(r#"{{"type":"error","message":"Serialization failed: {e}","fatal":false}}"#)
        });
        json.push('\n');
        json
    }
}

impl Message {
    /// Parse from a JSON line.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Message name for logs.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Start { .. } => "start",
            Self::Step { .. } => "step",
            Self::End => "end",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use swarm_core::command::Target;
    use swarm_core::unit_type::{AbilityId, UnitTypeId};

    #[test]
    fn test_parse_end() {
        let msg = Message::from_json(r#"{"type":"end"}"#).unwrap();
        assert!(matches!(msg, Message::End));
        assert_eq!(msg.name(), "end");
    }

    #[test]
    fn test_parse_step_keeps_snapshot() {
        let snapshot = Snapshot {
            game_loop: 224,
            ..Snapshot::default()
        };
        let line = serde_json::to_string(&Message::Step {
            snapshot: snapshot.clone(),
        })
        .unwrap();
        assert!(line.contains(r#""type":"step""#));

        match Message::from_json(&line).unwrap() {
            Message::Step { snapshot: parsed } => assert_eq!(parsed, snapshot),
            other => panic!("expected step, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_type_rejected() {
        assert!(Message::from_json(r#"{"type":"pause"}"#).is_err());
        assert!(Message::from_json("not json").is_err());
    }

    #[test]
    fn test_serialize_commands_response() {
        let resp = Response::Commands {
            tick: 3,
            game_loop: 48,
            commands: vec![Command::new(
                AbilityId::Train(UnitTypeId::Drone),
                7,
                Target::None,
            )],
        };
        let json = resp.to_json_line();
        assert!(json.ends_with('\n'));
        assert!(json.contains(r#""type":"commands""#));
        assert!(json.contains(r#""tick":3"#));

        let parsed: Response = serde_json::from_str(json.trim_end()).unwrap();
        assert_eq!(parsed, resp);
    }

    #[test]
    fn test_error_response_shape() {
        let json = Response::error("bad line", false).to_json_line();
        assert!(json.contains(r#""type":"error""#));
        assert!(json.contains(r#""fatal":false"#));
    }
}
