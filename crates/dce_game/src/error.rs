//! Error taxonomy for level loading and the simulation tick.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LevelLoadError {
    #[error("failed to read level file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse level JSON {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("level validation failed: {0}")]
    Invalid(String),
}

/// Tile id absent from the catalog. Non-fatal: the tile is skipped.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown tile id '{0}'")]
pub struct UnknownTileError(pub String);

#[derive(Debug, Error)]
pub enum GameError {
    #[error(transparent)]
    LevelLoad(#[from] LevelLoadError),
    #[error(transparent)]
    UnknownTile(#[from] UnknownTileError),
    /// Query against an object that no longer exists, e.g. a consumed tile.
    #[error("invalid collision state: {0}")]
    InvalidCollisionState(String),
    #[error("config error: {0}")]
    Config(String),
    #[error("render setup failed: {0}")]
    Render(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_errors_convert_into_game_error() {
        let err: GameError = LevelLoadError::Invalid("width must be > 0".to_string()).into();
        assert!(matches!(err, GameError::LevelLoad(_)));
        assert_eq!(
            err.to_string(),
            "level validation failed: width must be > 0"
        );
    }

    #[test]
    fn unknown_tile_error_names_the_id() {
        let err: GameError = UnknownTileError("missing_tile".to_string()).into();
        assert_eq!(err.to_string(), "unknown tile id 'missing_tile'");
    }
}
