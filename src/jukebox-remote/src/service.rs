//! Server side of the remote-control protocol.

use crate::protocol::{
    RemoteError, RemoteErrorKind, RemoteMethod, RemoteRequest, RemoteResponse, RemoteResult,
    PROTOCOL_VERSION,
};
use crate::transport::{current_uid, EndpointHandle, TransportError};
use jukebox_core::{
    AttrValue, FacadeError, PlayerFacade, Rating, ResolveError, TrackAttr, TrackResolver,
    VolumeAction, VolumeDelta,
};
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceState {
    Unregistered,
    Registered,
}

/// Decodes remote calls, validates them, forwards them to the player facade
/// and encodes the reply.
pub struct RemoteService {
    facade: Arc<dyn PlayerFacade>,
    resolver: Arc<dyn TrackResolver>,
    object_path: String,
    registered: AtomicBool,
    next_client: AtomicU64,
    owner_uid: libc::uid_t,
}

impl std::fmt::Debug for RemoteService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteService")
            .field("object_path", &self.object_path)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl RemoteService {
    pub fn new(
        facade: Arc<dyn PlayerFacade>,
        resolver: Arc<dyn TrackResolver>,
        object_path: impl Into<String>,
    ) -> Self {
        Self {
            facade,
            resolver,
            object_path: object_path.into(),
            registered: AtomicBool::new(false),
            next_client: AtomicU64::new(1),
            owner_uid: current_uid(),
        }
    }

    /// Only accept clients running as `uid`. Defaults to the effective uid of
    /// this process.
    pub fn with_owner_uid(mut self, uid: libc::uid_t) -> Self {
        self.owner_uid = uid;
        self
    }

    pub fn state(&self) -> ServiceState {
        if self.registered.load(Ordering::SeqCst) {
            ServiceState::Registered
        } else {
            ServiceState::Unregistered
        }
    }

    /// Accept clients on `handle` until `shutdown` resolves, then unregister.
    ///
    /// Each client connection is served by its own task and its calls are
    /// answered in arrival order. Calls run on the blocking pool so track
    /// resolution never stalls the accept loop. Connections from other users
    /// are closed unanswered.
    pub async fn serve<S>(self: Arc<Self>, handle: EndpointHandle, shutdown: S) -> Result<(), TransportError>
    where
        S: Future<Output = ()>,
    {
        let listener = handle.async_listener()?;
        self.registered.store(true, Ordering::SeqCst);
        tracing::info!(
            endpoint = %handle.endpoint().name(),
            object = %self.object_path,
            "remote service registered"
        );

        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                accepted = listener.accept() => match accepted {
                    Ok((stream, _addr)) => {
                        if self.peer_allowed(&stream) {
                            let client = self.next_client.fetch_add(1, Ordering::SeqCst);
                            tokio::spawn(self.clone().serve_connection(stream, client));
                        }
                    }
                    Err(err) => tracing::warn!(error = %err, "failed to accept remote client"),
                },
            }
        }

        drop(listener);
        self.registered.store(false, Ordering::SeqCst);
        drop(handle);
        tracing::info!("remote service unregistered");
        Ok(())
    }

    fn peer_allowed(&self, stream: &UnixStream) -> bool {
        match stream.peer_cred() {
            Ok(cred) if cred.uid() == self.owner_uid => true,
            Ok(cred) => {
                tracing::warn!(uid = cred.uid(), "rejected remote client owned by another user");
                false
            }
            Err(err) => {
                tracing::warn!(error = %err, "could not identify remote client");
                false
            }
        }
    }

    async fn serve_connection(self: Arc<Self>, stream: UnixStream, client: u64) {
        tracing::debug!(client, "remote client connected");
        let (reader, mut writer) = stream.into_split();
        let mut lines = BufReader::new(reader).lines();
        // Enqueue acknowledged but still resolving; the next call waits for it.
        let mut pending: Option<JoinHandle<()>> = None;

        loop {
            let line = match lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(err) => {
                    tracing::debug!(client, error = %err, "remote client read failed");
                    break;
                }
            };
            if line.trim().is_empty() {
                continue;
            }
            if let Some(job) = pending.take() {
                if let Err(err) = job.await {
                    tracing::error!(client, error = %err, "enqueue panicked");
                }
            }

            let response = match self.decode(&line) {
                Ok(RemoteRequest {
                    id,
                    call: RemoteMethod::Enqueue { filenames },
                    ..
                }) => {
                    tracing::debug!(client, id, method = "enqueue", "remote call");
                    let service = self.clone();
                    pending = Some(tokio::task::spawn_blocking(move || {
                        service.enqueue_locations(filenames)
                    }));
                    RemoteResponse {
                        id,
                        result: RemoteResult::Unit,
                    }
                }
                Ok(request) => {
                    tracing::debug!(client, id = request.id, method = request.call.name(), "remote call");
                    let id = request.id;
                    let service = self.clone();
                    match tokio::task::spawn_blocking(move || service.handle(request)).await {
                        Ok(result) => RemoteResponse { id, result },
                        Err(err) => {
                            tracing::error!(client, id, error = %err, "remote call panicked");
                            RemoteResponse {
                                id,
                                result: RemoteResult::Error(RemoteError::new(
                                    RemoteErrorKind::InternalFault,
                                    "internal error while handling call",
                                )),
                            }
                        }
                    }
                }
                Err(response) => response,
            };

            let mut payload = match serde_json::to_string(&response) {
                Ok(payload) => payload,
                Err(err) => {
                    tracing::error!(client, error = %err, "failed to encode remote response");
                    break;
                }
            };
            payload.push('\n');
            if let Err(err) = writer.write_all(payload.as_bytes()).await {
                tracing::debug!(client, error = %err, "remote client went away");
                break;
            }
        }
        tracing::debug!(client, "remote client disconnected");
    }

    /// Decode one request line, or produce the error reply for it.
    pub fn decode(&self, line: &str) -> Result<RemoteRequest, RemoteResponse> {
        let value: serde_json::Value = serde_json::from_str(line).map_err(|err| {
            bad_request(0, format!("malformed request: {err}"))
        })?;
        let id = value.get("id").and_then(serde_json::Value::as_u64).unwrap_or(0);
        let request: RemoteRequest = serde_json::from_value(value)
            .map_err(|err| bad_request(id, format!("invalid call: {err}")))?;
        if request.object != self.object_path {
            return Err(bad_request(
                id,
                format!("no object at path '{}'", request.object),
            ));
        }
        Ok(request)
    }

    /// Decode and handle one request line.
    pub fn handle_line(&self, line: &str) -> RemoteResponse {
        match self.decode(line) {
            Ok(request) => RemoteResponse {
                id: request.id,
                result: self.handle(request),
            },
            Err(response) => response,
        }
    }

    /// Validate a call and forward it to the facade.
    pub fn handle(&self, request: RemoteRequest) -> RemoteResult {
        match self.dispatch(request.call) {
            Ok(result) => result,
            Err(err) => {
                if err.kind == RemoteErrorKind::InternalFault {
                    tracing::error!(id = request.id, error = %err.message, "remote call failed");
                }
                RemoteResult::Error(err)
            }
        }
    }

    /// Resolve `filenames` and hand the tracks to the player.
    ///
    /// Over a connection this runs after the reply has been sent, so the
    /// client never waits on disk scans.
    pub fn enqueue_locations(&self, filenames: Vec<String>) {
        let filenames: Vec<String> = filenames
            .into_iter()
            .filter(|f| !f.trim().is_empty())
            .collect();
        let tracks = self.resolver.resolve_all(&filenames);
        if tracks.is_empty() && !filenames.is_empty() {
            tracing::warn!(requested = filenames.len(), "nothing playable to enqueue");
        } else {
            tracing::debug!(requested = filenames.len(), resolved = tracks.len(), "enqueue");
        }
        self.facade.enqueue(tracks);
    }

    fn dispatch(&self, call: RemoteMethod) -> Result<RemoteResult, RemoteError> {
        let facade = self.facade.as_ref();
        let result = match call {
            RemoteMethod::TestService { message } => {
                tracing::debug!(protocol = PROTOCOL_VERSION, %message, "test_service");
                RemoteResult::Unit
            }
            RemoteMethod::IsPlaying => RemoteResult::Bool(facade.is_playing()),
            RemoteMethod::GetTrackAttr { attr } => {
                let attr = parse_attr(&attr)?;
                RemoteResult::Text(facade.track_attr(attr).unwrap_or_default())
            }
            RemoteMethod::SetTrackAttr { attr, value } => {
                let attr = parse_attr(&attr)?;
                if !attr.is_settable() {
                    return Err(RemoteError::new(
                        RemoteErrorKind::Unsupported,
                        format!("attribute '{attr}' is read-only"),
                    ));
                }
                let value = parse_attr_value(attr, &value)?;
                facade.set_track_attr(attr, value).map_err(facade_error)?;
                RemoteResult::Unit
            }
            RemoteMethod::ChangeVolume { action, value } => {
                let action: VolumeAction = action.parse().map_err(RemoteError::bad_argument)?;
                let amount = u32::try_from(value).map_err(|_| {
                    RemoteError::bad_argument(format!("volume change {value} must be a non-negative percentage"))
                })?;
                let level = facade.change_volume(VolumeDelta::new(action, amount));
                tracing::debug!(%level, "volume changed");
                RemoteResult::Unit
            }
            RemoteMethod::Prev => {
                facade.prev();
                RemoteResult::Unit
            }
            RemoteMethod::Stop => {
                facade.stop();
                RemoteResult::Unit
            }
            RemoteMethod::Next => {
                facade.next();
                RemoteResult::Unit
            }
            RemoteMethod::Play => {
                facade.play();
                RemoteResult::Unit
            }
            RemoteMethod::PlayPause => {
                facade.toggle_pause();
                RemoteResult::Unit
            }
            RemoteMethod::CurrentPosition => RemoteResult::Text(format_position(facade.progress())),
            RemoteMethod::GetVolume => RemoteResult::Text(facade.volume().to_string()),
            RemoteMethod::GetVersion => RemoteResult::Text(facade.version()),
            RemoteMethod::PlayFile { filename } => {
                if filename.trim().is_empty() {
                    return Err(RemoteError::bad_argument("play_file needs a filename"));
                }
                let tracks = self.resolver.resolve(&filename).map_err(resolve_error)?;
                if tracks.is_empty() {
                    return Err(RemoteError::bad_argument(format!(
                        "no playable tracks at '{filename}'"
                    )));
                }
                facade.play_tracks(tracks).map_err(facade_error)?;
                RemoteResult::Unit
            }
            RemoteMethod::Enqueue { filenames } => {
                self.enqueue_locations(filenames);
                RemoteResult::Unit
            }
        };
        Ok(result)
    }
}

/// `"NN%"` for a known position, empty for the unknown sentinel.
pub fn format_position(progress: f64) -> String {
    if !progress.is_finite() || progress < 0.0 {
        return String::new();
    }
    format!("{}%", (progress * 100.0).clamp(0.0, 100.0) as u32)
}

fn bad_request(id: u64, message: String) -> RemoteResponse {
    RemoteResponse {
        id,
        result: RemoteResult::Error(RemoteError::bad_argument(message)),
    }
}

fn parse_attr(attr: &str) -> Result<TrackAttr, RemoteError> {
    attr.parse::<TrackAttr>()
        .map_err(|err| RemoteError::bad_argument(err.to_string()))
}

fn parse_attr_value(attr: TrackAttr, value: &serde_json::Value) -> Result<AttrValue, RemoteError> {
    match attr {
        TrackAttr::Rating => {
            let raw = match value {
                serde_json::Value::Number(n) => n.as_i64(),
                serde_json::Value::String(s) => s.trim().parse::<i64>().ok(),
                _ => None,
            };
            raw.and_then(Rating::new)
                .map(AttrValue::Rating)
                .ok_or_else(|| {
                    RemoteError::bad_argument(format!(
                        "rating must be an integer between 0 and {}, got {value}",
                        Rating::MAX
                    ))
                })
        }
        other => Err(RemoteError::new(
            RemoteErrorKind::Unsupported,
            format!("attribute '{other}' is read-only"),
        )),
    }
}

fn facade_error(err: FacadeError) -> RemoteError {
    match err {
        FacadeError::NotPlaying => RemoteError::new(RemoteErrorKind::NotPlaying, err.to_string()),
        FacadeError::Unsupported { .. } => {
            RemoteError::new(RemoteErrorKind::Unsupported, err.to_string())
        }
        FacadeError::InvalidValue { .. } => RemoteError::bad_argument(err.to_string()),
        FacadeError::Other { .. } => {
            RemoteError::new(RemoteErrorKind::InternalFault, err.to_string())
        }
    }
}

fn resolve_error(err: ResolveError) -> RemoteError {
    match err {
        ResolveError::Unsupported { .. } => RemoteError::bad_argument(err.to_string()),
        ResolveError::Io { .. } => RemoteError::new(RemoteErrorKind::InternalFault, err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jukebox_core::{QueueSort, ResolveResult, SortColumn, Track, TrackId, Volume};
    use jukebox_player::{Player, SharedPlayer};

    const OBJECT: &str = "/org/jukebox/Player";

    /// Resolves `name.mp3` to one track and anything else to nothing.
    struct StubResolver;

    impl TrackResolver for StubResolver {
        fn resolve(&self, location: &str) -> ResolveResult<Vec<Track>> {
            if location.starts_with("bad://") {
                return Err(ResolveError::Unsupported {
                    location: location.into(),
                });
            }
            Ok(location
                .strip_suffix(".mp3")
                .map(|title| Track {
                    id: TrackId::new(location),
                    title: title.to_string(),
                    artists: vec!["Stub".into()],
                    album: None,
                    duration_seconds: Some(100),
                    track_number: None,
                    rating: None,
                })
                .into_iter()
                .collect())
        }
    }

    fn service() -> (RemoteService, SharedPlayer) {
        let player = SharedPlayer::new(Player::with_settings(
            QueueSort::new(SortColumn::Title, false),
            Volume::clamped(50),
        ));
        let service = RemoteService::new(Arc::new(player.clone()), Arc::new(StubResolver), OBJECT);
        (service, player)
    }

    fn call(service: &RemoteService, call: RemoteMethod) -> RemoteResult {
        service.handle(RemoteRequest {
            id: 1,
            object: OBJECT.into(),
            call,
        })
    }

    fn error_kind(result: RemoteResult) -> RemoteErrorKind {
        match result {
            RemoteResult::Error(err) => err.kind,
            other => panic!("expected error, got {other:?}"),
        }
    }

    #[test]
    fn attributes_are_empty_with_nothing_playing() {
        let (service, _) = service();
        for attr in TrackAttr::ALL {
            let result = call(
                &service,
                RemoteMethod::GetTrackAttr {
                    attr: attr.as_str().into(),
                },
            );
            assert_eq!(result, RemoteResult::Text(String::new()));
        }
    }

    #[test]
    fn unknown_attribute_is_bad_argument() {
        let (service, _) = service();
        let result = call(
            &service,
            RemoteMethod::GetTrackAttr {
                attr: "bitrate".into(),
            },
        );
        assert_eq!(error_kind(result), RemoteErrorKind::BadArgument);
    }

    #[test]
    fn set_unknown_attribute_does_not_mutate() {
        let (service, player) = service();
        player.enqueue(vec![Track::from_location("/x.mp3", "x")]);
        let result = call(
            &service,
            RemoteMethod::SetTrackAttr {
                attr: "mood".into(),
                value: serde_json::json!(3),
            },
        );
        assert_eq!(error_kind(result), RemoteErrorKind::BadArgument);
        assert_eq!(player.track_attr(TrackAttr::Rating), None);
    }

    #[test]
    fn set_rating_validates_value_and_current_track() {
        let (service, player) = service();
        let rate = |value: serde_json::Value| {
            call(
                &service,
                RemoteMethod::SetTrackAttr {
                    attr: "rating".into(),
                    value,
                },
            )
        };

        assert_eq!(error_kind(rate(serde_json::json!(4))), RemoteErrorKind::NotPlaying);

        player.enqueue(vec![Track::from_location("/x.mp3", "x")]);
        assert_eq!(error_kind(rate(serde_json::json!(9))), RemoteErrorKind::BadArgument);
        assert_eq!(error_kind(rate(serde_json::json!("loud"))), RemoteErrorKind::BadArgument);
        assert_eq!(rate(serde_json::json!("4")), RemoteResult::Unit);
        assert_eq!(player.track_attr(TrackAttr::Rating).as_deref(), Some("4"));
    }

    #[test]
    fn read_only_attribute_is_unsupported() {
        let (service, player) = service();
        player.enqueue(vec![Track::from_location("/x.mp3", "x")]);
        let result = call(
            &service,
            RemoteMethod::SetTrackAttr {
                attr: "title".into(),
                value: serde_json::json!("renamed"),
            },
        );
        assert_eq!(error_kind(result), RemoteErrorKind::Unsupported);
        assert_eq!(player.track_attr(TrackAttr::Title).as_deref(), Some("x"));
    }

    #[test]
    fn volume_round_trip_restores_level() {
        let (service, _) = service();
        let change = |action: &str, value| {
            call(
                &service,
                RemoteMethod::ChangeVolume {
                    action: action.into(),
                    value,
                },
            )
        };
        assert_eq!(change("inc", 10), RemoteResult::Unit);
        assert_eq!(
            call(&service, RemoteMethod::GetVolume),
            RemoteResult::Text("60%".into())
        );
        assert_eq!(change("dec", 10), RemoteResult::Unit);
        assert_eq!(
            call(&service, RemoteMethod::GetVolume),
            RemoteResult::Text("50%".into())
        );
        assert_eq!(error_kind(change("louder", 10)), RemoteErrorKind::BadArgument);
        assert_eq!(error_kind(change("inc", -5)), RemoteErrorKind::BadArgument);
    }

    #[test]
    fn position_is_empty_for_unknown_progress() {
        assert_eq!(format_position(-1.0), "");
        assert_eq!(format_position(f64::NAN), "");
        assert_eq!(format_position(0.0), "0%");
        assert_eq!(format_position(0.426), "42%");
        assert_eq!(format_position(1.0), "100%");

        let (service, _) = service();
        assert_eq!(
            call(&service, RemoteMethod::CurrentPosition),
            RemoteResult::Text(String::new())
        );
    }

    #[test]
    fn enqueue_resolves_and_starts_playback() {
        let (service, player) = service();
        let result = call(
            &service,
            RemoteMethod::Enqueue {
                filenames: vec!["b.mp3".into(), "".into(), "cover.jpg".into(), "a.mp3".into()],
            },
        );
        assert_eq!(result, RemoteResult::Unit);
        assert!(player.is_playing());
        assert_eq!(player.track_attr(TrackAttr::Title).as_deref(), Some("a"));
        assert_eq!(player.lock().queue().len(), 2);
        assert!(matches!(
            call(&service, RemoteMethod::CurrentPosition),
            RemoteResult::Text(text) if text.ends_with('%')
        ));
    }

    #[test]
    fn enqueue_of_nothing_playable_is_silent() {
        let (service, player) = service();
        let result = call(
            &service,
            RemoteMethod::Enqueue {
                filenames: vec!["notes.txt".into()],
            },
        );
        assert_eq!(result, RemoteResult::Unit);
        assert!(!player.is_playing());
    }

    #[test]
    fn play_file_rejects_unplayable_locations() {
        let (service, player) = service();
        let play = |filename: &str| {
            call(
                &service,
                RemoteMethod::PlayFile {
                    filename: filename.into(),
                },
            )
        };
        assert_eq!(error_kind(play("")), RemoteErrorKind::BadArgument);
        assert_eq!(error_kind(play("notes.txt")), RemoteErrorKind::BadArgument);
        assert_eq!(error_kind(play("bad://x")), RemoteErrorKind::BadArgument);
        assert_eq!(play("song.mp3"), RemoteResult::Unit);
        assert_eq!(player.track_attr(TrackAttr::Title).as_deref(), Some("song"));
    }

    #[test]
    fn malformed_lines_get_bad_argument_replies() {
        let (service, _) = service();

        let garbage = service.handle_line("not json");
        assert_eq!(garbage.id, 0);
        assert_eq!(error_kind(garbage.result), RemoteErrorKind::BadArgument);

        let unknown = service.handle_line(r#"{"id":5,"object":"/org/jukebox/Player","call":{"method":"eject"}}"#);
        assert_eq!(unknown.id, 5);
        assert_eq!(error_kind(unknown.result), RemoteErrorKind::BadArgument);

        let elsewhere = service.handle_line(r#"{"id":6,"object":"/other","call":{"method":"play"}}"#);
        assert_eq!(elsewhere.id, 6);
        assert_eq!(error_kind(elsewhere.result), RemoteErrorKind::BadArgument);

        let ok = service.handle_line(r#"{"id":7,"object":"/org/jukebox/Player","call":{"method":"is_playing"}}"#);
        assert_eq!(ok.result, RemoteResult::Bool(false));
    }

    #[test]
    fn version_comes_from_facade() {
        let (service, player) = service();
        assert_eq!(
            call(&service, RemoteMethod::GetVersion),
            RemoteResult::Text(player.version())
        );
    }
}
