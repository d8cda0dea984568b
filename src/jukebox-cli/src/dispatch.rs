//! Client-side command dispatch.
//!
//! Flags become [`Command`]s which run in a fixed group order: attribute
//! getters, then modifiers, volume changes, transport, and finally queries.

use jukebox_core::{TrackAttr, VolumeAction};
use jukebox_remote::{ClientError, FailureKind, RemoteClient, TransportLink};
use std::io::{self, Write};
use std::process::ExitCode;

/// Order in which command groups run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Group {
    Info,
    Modify,
    Volume,
    Transport,
    Query,
    Unimplemented,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    GetAttr(TrackAttr),
    SetRating(String),
    ChangeVolume { action: VolumeAction, amount: i64 },
    Play,
    Stop,
    Next,
    Prev,
    PlayPause,
    CurrentPosition,
    GetVolume,
    GetVersion,
    Query,
    GuiQuery,
}

impl Command {
    pub fn group(&self) -> Group {
        match self {
            Command::GetAttr(_) => Group::Info,
            Command::SetRating(_) => Group::Modify,
            Command::ChangeVolume { .. } => Group::Volume,
            Command::Play | Command::Stop | Command::Next | Command::Prev | Command::PlayPause => {
                Group::Transport
            }
            Command::CurrentPosition | Command::GetVolume | Command::GetVersion => Group::Query,
            Command::Query | Command::GuiQuery => Group::Unimplemented,
        }
    }

    /// The flag that produced this command, for messages.
    pub fn flag(&self) -> &'static str {
        match self {
            Command::GetAttr(TrackAttr::Artist) => "--get-artist",
            Command::GetAttr(TrackAttr::Title) => "--get-title",
            Command::GetAttr(TrackAttr::Album) => "--get-album",
            Command::GetAttr(TrackAttr::Length) => "--get-length",
            Command::GetAttr(TrackAttr::Rating) => "--get-rating",
            Command::SetRating(_) => "--set-rating",
            Command::ChangeVolume {
                action: VolumeAction::Increase,
                ..
            } => "--inc-vol",
            Command::ChangeVolume {
                action: VolumeAction::Decrease,
                ..
            } => "--dec-vol",
            Command::Play => "--play",
            Command::Stop => "--stop",
            Command::Next => "--next",
            Command::Prev => "--prev",
            Command::PlayPause => "--play-pause",
            Command::CurrentPosition => "--current-position",
            Command::GetVolume => "--get-volume",
            Command::GetVersion => "--get-version",
            Command::Query => "--query",
            Command::GuiQuery => "--gui-query",
        }
    }
}

/// Process exit status of a dispatch run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Success,
    Failure,
}

impl From<Status> for ExitCode {
    fn from(status: Status) -> Self {
        match status {
            Status::Success => ExitCode::SUCCESS,
            Status::Failure => ExitCode::FAILURE,
        }
    }
}

enum Flow {
    Continue,
    Abort,
}

/// Runs commands against one primary instance, printing results to `out`
/// and diagnostics to `err`.
pub struct Dispatcher<'a, O, E> {
    client: &'a RemoteClient,
    out: O,
    err: E,
    failed: bool,
}

impl<'a, O: Write, E: Write> Dispatcher<'a, O, E> {
    pub fn new(client: &'a RemoteClient, out: O, err: E) -> Self {
        Self {
            client,
            out,
            err,
            failed: false,
        }
    }

    /// Enqueue locations, then run `commands` group by group.
    pub fn run(mut self, locations: Vec<String>, mut commands: Vec<Command>) -> io::Result<Status> {
        if !locations.is_empty() {
            let count = locations.len();
            if let Err(err) = self.client.enqueue(locations) {
                if let Flow::Abort = self.report("enqueue", err)? {
                    return Ok(Status::Failure);
                }
            } else {
                tracing::debug!(count, "forwarded locations to primary instance");
            }
        }

        commands.sort_by_key(Command::group);
        let (info, rest): (Vec<_>, Vec<_>) = commands
            .into_iter()
            .partition(|command| command.group() == Group::Info);

        if !info.is_empty() {
            if let Flow::Abort = self.run_info(&info)? {
                return Ok(Status::Failure);
            }
        }
        for command in &rest {
            if let Flow::Abort = self.run_command(command)? {
                return Ok(Status::Failure);
            }
        }

        Ok(if self.failed {
            Status::Failure
        } else {
            Status::Success
        })
    }

    /// Attribute getters share one "is anything playing" check; when nothing
    /// is, the whole group collapses to a single `Not playing.` line.
    fn run_info(&mut self, info: &[Command]) -> io::Result<Flow> {
        let playing = match self.client.is_playing() {
            Ok(playing) => playing,
            Err(err) => return self.report(info[0].flag(), err),
        };
        if !playing {
            writeln!(self.out, "Not playing.")?;
            return Ok(Flow::Continue);
        }
        for command in info {
            if let Flow::Abort = self.run_command(command)? {
                return Ok(Flow::Abort);
            }
        }
        Ok(Flow::Continue)
    }

    fn run_command(&mut self, command: &Command) -> io::Result<Flow> {
        if command.group() == Group::Unimplemented {
            tracing::warn!(flag = command.flag(), "command not implemented");
            writeln!(self.err, "jukebox: {}: not implemented", command.flag())?;
            self.failed = true;
            return Ok(Flow::Continue);
        }
        match self.execute(command) {
            Ok(Some(line)) => {
                writeln!(self.out, "{line}")?;
                Ok(Flow::Continue)
            }
            Ok(None) => Ok(Flow::Continue),
            Err(err) => self.report(command.flag(), err),
        }
    }

    fn execute(&self, command: &Command) -> Result<Option<String>, ClientError> {
        let client = self.client;
        match command {
            Command::GetAttr(attr) => client.get_track_attr(attr.as_str()).map(Some),
            Command::SetRating(value) => client
                .set_track_attr(TrackAttr::Rating.as_str(), rating_value(value))
                .map(|()| None),
            Command::ChangeVolume { action, amount } => client
                .change_volume(action.as_str(), *amount)
                .map(|()| None),
            Command::Play => client.play().map(|()| None),
            Command::Stop => client.stop().map(|()| None),
            Command::Next => client.next().map(|()| None),
            Command::Prev => client.prev().map(|()| None),
            Command::PlayPause => client.play_pause().map(|()| None),
            Command::CurrentPosition => client.current_position().map(Some),
            Command::GetVolume => client.get_volume().map(Some),
            Command::GetVersion => client.get_version().map(Some),
            Command::Query | Command::GuiQuery => Ok(None),
        }
    }

    /// Print a failure. Connection-level failures stop the run since every
    /// later call would fail the same way.
    fn report(&mut self, flag: &str, err: ClientError) -> io::Result<Flow> {
        match err.kind() {
            FailureKind::NotPlaying => {
                writeln!(self.out, "Not playing.")?;
                Ok(Flow::Continue)
            }
            kind @ (FailureKind::NoInstanceRunning
            | FailureKind::ConnectionRefused
            | FailureKind::Timeout) => {
                tracing::debug!(?kind, flag, "remote call aborted");
                writeln!(self.err, "jukebox: {err}")?;
                self.failed = true;
                Ok(Flow::Abort)
            }
            _ => {
                writeln!(self.err, "jukebox: {flag}: {err}")?;
                self.failed = true;
                Ok(Flow::Continue)
            }
        }
    }
}

/// Ratings go over the wire as numbers when they look like one, so the
/// primary can tell "not a number" apart from "out of range".
fn rating_value(value: &str) -> serde_json::Value {
    match value.trim().parse::<i64>() {
        Ok(number) => serde_json::Value::from(number),
        Err(_) => serde_json::Value::String(value.to_string()),
    }
}

/// Connect to the primary instance and run one client session.
pub fn run_client<O: Write, E: Write>(
    link: &TransportLink,
    locations: Vec<String>,
    commands: Vec<Command>,
    out: O,
    mut err: E,
) -> io::Result<Status> {
    let client = match RemoteClient::connect(link) {
        Ok(client) => client,
        Err(error) => {
            writeln!(err, "jukebox: {error}")?;
            return Ok(Status::Failure);
        }
    };
    if let Err(error) = client.test_service("testing remote service") {
        writeln!(err, "jukebox: {error}")?;
        return Ok(Status::Failure);
    }
    Dispatcher::new(&client, out, err).run(locations, commands)
}
