//! Player state controller.
//!
//! Single source of truth for which track/version is loaded and how the
//! player is displayed, decoupled from the actual media element. State is
//! owned by [`PlayerState`] and mutated only through [`PlayerAction`] values
//! applied by the pure, synchronous [`PlayerState::apply`] reducer.
//! [`SharedPlayer`] wraps the state behind a mutex for single-writer
//! dispatch from multiple readers.
//!
//! The controller never drives the media element from passive `Playback*`
//! events; those only update display flags, so reducer-driven commands and
//! element-driven events cannot feed back into each other.

use serde::Serialize;
use std::sync::{Arc, Mutex};

use crate::types::DbId;

/// Display mode of the player UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ViewState {
    Large,
    Small,
    Hidden,
}

impl std::fmt::Display for ViewState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ViewState::Large => write!(f, "LARGE"),
            ViewState::Small => write!(f, "SMALL"),
            ViewState::Hidden => write!(f, "HIDDEN"),
        }
    }
}

/// Playback flag mirrored from media-element events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Playback {
    Idle,
    Playing,
    Paused,
    Ended,
    Aborted,
}

/// Opaque identity of a mounted media-playback element.
///
/// The controller holds this as an association only; it never owns the
/// underlying object's lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MediaHandle(pub u64);

/// Snapshot of one playable version inside a loaded track.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadedVersion {
    pub id: DbId,
    pub version_number: i32,
    pub title: String,
    /// Playback URL of the version's audio file, when one is attached.
    pub playback_url: Option<String>,
}

/// Snapshot of the track currently loaded into the player.
///
/// Replaced wholesale on each relevant action, never partially mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadedTrack {
    pub id: DbId,
    pub title: String,
    /// Versions in ascending version-number order. Never empty for a
    /// persisted track.
    pub versions: Vec<LoadedVersion>,
    /// The version designated as canonical for playback, if any.
    pub active_version_id: Option<DbId>,
}

impl LoadedTrack {
    /// The version playback should default to: the active version when set,
    /// otherwise the most recent one.
    pub fn default_version_id(&self) -> Option<DbId> {
        self.active_version_id
            .or_else(|| self.versions.last().map(|v| v.id))
    }
}

/// Intents and media-element events dispatched into the reducer.
///
/// `PlayTrack` owns its track by value, so the "play with no track" caller
/// contract violation of looser-typed implementations is unrepresentable.
#[derive(Debug, Clone)]
pub enum PlayerAction {
    /// Load the given track for playback.
    PlayTrack(LoadedTrack),
    /// Request pause. Delegated to the media element; the reducer changes
    /// nothing and relies on the element's own `PlaybackPaused` event.
    Pause,
    /// Select which version of the (possibly already-loaded) track is
    /// considered current. Does not start playback.
    SelectVersion { track: LoadedTrack, version_id: DbId },
    /// Cosmetic transition among the three view states.
    SetViewState(ViewState),
    /// Bind the controller to a mounted media element. Idempotent.
    BindMedia(MediaHandle),
    /// Passive media-element events.
    PlaybackStarted,
    PlaybackPaused,
    PlaybackEnded,
    PlaybackAborted,
    PlaybackError(String),
}

/// The player's complete view state.
#[derive(Debug, Clone, Serialize)]
pub struct PlayerState {
    /// Currently loaded track, exclusively owned by the reducer.
    pub track: Option<LoadedTrack>,
    /// Selected version within `track`.
    pub selected_version_id: Option<DbId>,
    /// Display mode.
    pub view_state: ViewState,
    /// Flag mirrored from media-element events.
    pub playback: Playback,
    /// Transient message from the last `PlaybackError`, cleared when a new
    /// track loads or playback starts.
    pub error: Option<String>,
    /// Bound media element, when one is mounted.
    pub media_handle: Option<MediaHandle>,
}

impl Default for PlayerState {
    fn default() -> Self {
        Self {
            track: None,
            selected_version_id: None,
            view_state: ViewState::Hidden,
            playback: Playback::Idle,
            error: None,
            media_handle: None,
        }
    }
}

impl PlayerState {
    /// Apply one action. Pure and synchronous; never fails.
    ///
    /// Actions on an empty player are safe no-ops, and view-state
    /// transitions are orthogonal to whether a track is loaded.
    pub fn apply(&mut self, action: PlayerAction) {
        match action {
            PlayerAction::PlayTrack(track) => {
                self.selected_version_id = track.default_version_id();
                self.track = Some(track);
                self.error = None;
            }
            PlayerAction::Pause => {
                // No reducer-level change: the element's PlaybackPaused
                // event drives the flag.
            }
            PlayerAction::SelectVersion { track, version_id } => {
                self.selected_version_id = Some(version_id);
                self.track = Some(track);
            }
            PlayerAction::SetViewState(view) => {
                self.view_state = view;
            }
            PlayerAction::BindMedia(handle) => {
                if self.media_handle != Some(handle) {
                    self.media_handle = Some(handle);
                }
            }
            PlayerAction::PlaybackStarted => {
                self.playback = Playback::Playing;
                self.error = None;
            }
            PlayerAction::PlaybackPaused => {
                self.playback = Playback::Paused;
            }
            PlayerAction::PlaybackEnded => {
                self.playback = Playback::Ended;
            }
            PlayerAction::PlaybackAborted => {
                self.playback = Playback::Aborted;
            }
            PlayerAction::PlaybackError(message) => {
                self.error = Some(message);
                self.playback = Playback::Idle;
            }
        }
    }

    /// The currently selected version within the loaded track, if any.
    pub fn selected_version(&self) -> Option<&LoadedVersion> {
        let id = self.selected_version_id?;
        self.track
            .as_ref()?
            .versions
            .iter()
            .find(|v| v.id == id)
    }
}

/// Mutex-guarded single-writer wrapper around [`PlayerState`].
#[derive(Debug, Clone, Default)]
pub struct SharedPlayer {
    inner: Arc<Mutex<PlayerState>>,
}

impl SharedPlayer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Dispatch one action into the reducer.
    pub fn dispatch(&self, action: PlayerAction) {
        let mut state = self.inner.lock().expect("player state lock poisoned");
        state.apply(action);
    }

    /// Clone of the current state for readers.
    pub fn snapshot(&self) -> PlayerState {
        self.inner.lock().expect("player state lock poisoned").clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track_with_versions(id: DbId, active: Option<DbId>) -> LoadedTrack {
        LoadedTrack {
            id,
            title: format!("Track {id}"),
            versions: vec![
                LoadedVersion {
                    id: 10,
                    version_number: 1,
                    title: "v1".into(),
                    playback_url: Some("/api/v1/storage/k/v1.wav".into()),
                },
                LoadedVersion {
                    id: 11,
                    version_number: 2,
                    title: "v2".into(),
                    playback_url: Some("/api/v1/storage/k/v2.wav".into()),
                },
            ],
            active_version_id: active,
        }
    }

    #[test]
    fn play_track_loads_track_and_defaults_to_active_version() {
        let mut state = PlayerState::default();
        state.apply(PlayerAction::PlayTrack(track_with_versions(1, Some(10))));

        assert_eq!(state.track.as_ref().unwrap().id, 1);
        assert_eq!(state.selected_version_id, Some(10));
    }

    #[test]
    fn play_track_without_active_version_selects_latest() {
        let mut state = PlayerState::default();
        state.apply(PlayerAction::PlayTrack(track_with_versions(1, None)));

        assert_eq!(state.selected_version_id, Some(11));
    }

    #[test]
    fn view_state_equals_last_set_action() {
        // For any sequence of SetViewState actions the result is the last
        // value applied, with no coupling to prior state.
        let sequences = [
            vec![ViewState::Large, ViewState::Hidden, ViewState::Small],
            vec![ViewState::Small, ViewState::Small],
            vec![ViewState::Hidden, ViewState::Large],
            vec![ViewState::Large],
        ];
        for seq in sequences {
            let mut state = PlayerState::default();
            for view in &seq {
                state.apply(PlayerAction::SetViewState(*view));
            }
            assert_eq!(state.view_state, *seq.last().unwrap());
        }
    }

    #[test]
    fn view_state_is_orthogonal_to_loaded_track() {
        let mut state = PlayerState::default();
        state.apply(PlayerAction::SetViewState(ViewState::Large));
        state.apply(PlayerAction::PlayTrack(track_with_versions(1, None)));
        assert_eq!(state.view_state, ViewState::Large);

        state.apply(PlayerAction::SetViewState(ViewState::Hidden));
        assert_eq!(state.track.as_ref().unwrap().id, 1);
    }

    #[test]
    fn select_version_survives_passive_playback_events() {
        let track = track_with_versions(7, Some(10));
        let mut state = PlayerState::default();

        state.apply(PlayerAction::PlayTrack(track.clone()));
        state.apply(PlayerAction::PlaybackStarted);
        state.apply(PlayerAction::SelectVersion {
            track: track.clone(),
            version_id: 11,
        });
        state.apply(PlayerAction::PlaybackPaused);
        state.apply(PlayerAction::PlaybackEnded);

        assert_eq!(state.track.as_ref().unwrap().id, 7);
        assert_eq!(state.selected_version_id, Some(11));
        assert_eq!(state.selected_version().unwrap().title, "v2");
    }

    #[test]
    fn select_version_does_not_start_playback() {
        let track = track_with_versions(7, None);
        let mut state = PlayerState::default();
        state.apply(PlayerAction::SelectVersion {
            track,
            version_id: 10,
        });
        assert_eq!(state.playback, Playback::Idle);
    }

    #[test]
    fn pause_is_idempotent_and_changes_nothing() {
        let mut state = PlayerState::default();
        state.apply(PlayerAction::Pause);
        state.apply(PlayerAction::Pause);
        assert!(state.track.is_none());
        assert_eq!(state.playback, Playback::Idle);

        state.apply(PlayerAction::PlayTrack(track_with_versions(1, None)));
        state.apply(PlayerAction::PlaybackStarted);
        state.apply(PlayerAction::Pause);
        // Still playing until the element reports its own pause event.
        assert_eq!(state.playback, Playback::Playing);
        state.apply(PlayerAction::PlaybackPaused);
        assert_eq!(state.playback, Playback::Paused);
    }

    #[test]
    fn bind_media_is_idempotent() {
        let mut state = PlayerState::default();
        state.apply(PlayerAction::BindMedia(MediaHandle(42)));
        assert_eq!(state.media_handle, Some(MediaHandle(42)));

        state.apply(PlayerAction::BindMedia(MediaHandle(42)));
        assert_eq!(state.media_handle, Some(MediaHandle(42)));

        state.apply(PlayerAction::BindMedia(MediaHandle(43)));
        assert_eq!(state.media_handle, Some(MediaHandle(43)));
    }

    #[test]
    fn playback_error_is_transient_display_state() {
        let mut state = PlayerState::default();
        state.apply(PlayerAction::PlayTrack(track_with_versions(1, None)));
        state.apply(PlayerAction::PlaybackError("decode failed".into()));

        assert_eq!(state.error.as_deref(), Some("decode failed"));
        assert_eq!(state.playback, Playback::Idle);
        // The loaded track is untouched; the controller does not crash or
        // unload anything on a media error.
        assert!(state.track.is_some());

        state.apply(PlayerAction::PlaybackStarted);
        assert!(state.error.is_none());
    }

    #[test]
    fn new_track_clears_previous_error() {
        let mut state = PlayerState::default();
        state.apply(PlayerAction::PlaybackError("network".into()));
        state.apply(PlayerAction::PlayTrack(track_with_versions(2, None)));
        assert!(state.error.is_none());
    }

    #[test]
    fn passive_events_on_empty_player_are_safe() {
        let mut state = PlayerState::default();
        state.apply(PlayerAction::PlaybackStarted);
        state.apply(PlayerAction::PlaybackAborted);
        state.apply(PlayerAction::PlaybackEnded);
        assert!(state.track.is_none());
        assert_eq!(state.playback, Playback::Ended);
    }

    #[test]
    fn shared_player_dispatch_and_snapshot() {
        let player = SharedPlayer::new();
        player.dispatch(PlayerAction::PlayTrack(track_with_versions(3, Some(10))));
        player.dispatch(PlayerAction::SetViewState(ViewState::Small));

        let snapshot = player.snapshot();
        assert_eq!(snapshot.track.unwrap().id, 3);
        assert_eq!(snapshot.view_state, ViewState::Small);

        // Snapshots are copies; later dispatches do not mutate them.
        player.dispatch(PlayerAction::SetViewState(ViewState::Hidden));
        assert_eq!(player.snapshot().view_state, ViewState::Hidden);
    }

    #[test]
    fn shared_player_is_single_writer_across_threads() {
        let player = SharedPlayer::new();
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let player = player.clone();
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        player.dispatch(PlayerAction::SetViewState(if i % 2 == 0 {
                            ViewState::Large
                        } else {
                            ViewState::Small
                        }));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        let view = player.snapshot().view_state;
        assert!(view == ViewState::Large || view == ViewState::Small);
    }

    #[test]
    fn view_state_display_matches_wire_names() {
        assert_eq!(ViewState::Large.to_string(), "LARGE");
        assert_eq!(ViewState::Small.to_string(), "SMALL");
        assert_eq!(ViewState::Hidden.to_string(), "HIDDEN");
    }
}
