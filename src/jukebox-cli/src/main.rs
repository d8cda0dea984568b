mod dispatch;
mod locations;
mod primary;

use anyhow::Result;
use clap::Parser;
use dispatch::{Command, Status};
use jukebox_core::{init_logging, AppDirs, Config, TrackAttr, VolumeAction};
use jukebox_remote::{Endpoint, EndpointHandle, TransportError, TransportLink};
use std::io;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(name = "jukebox", version, about = "Music player with single-instance remote control")]
struct Cli {
    /// Start a new instance instead of forwarding to a running one
    #[arg(long)]
    new: bool,
    /// Endpoint name override (takes precedence over config)
    #[arg(long)]
    endpoint: Option<String>,

    /// Print the current track's artist
    #[arg(long)]
    get_artist: bool,
    /// Print the current track's title
    #[arg(long)]
    get_title: bool,
    /// Print the current track's album
    #[arg(long)]
    get_album: bool,
    /// Print the current track's length in seconds
    #[arg(long)]
    get_length: bool,
    /// Print the current track's rating
    #[arg(long)]
    get_rating: bool,

    /// Rate the current track (0-5)
    #[arg(long, value_name = "VALUE")]
    set_rating: Option<String>,

    /// Raise the volume by N percent
    #[arg(long, value_name = "N")]
    inc_vol: Option<i64>,
    /// Lower the volume by N percent
    #[arg(long, value_name = "N")]
    dec_vol: Option<i64>,

    #[arg(long)]
    play: bool,
    #[arg(long)]
    stop: bool,
    #[arg(long)]
    next: bool,
    #[arg(long)]
    prev: bool,
    /// Toggle between playing and paused
    #[arg(long)]
    play_pause: bool,

    /// Print the position in the current track as a percentage
    #[arg(long)]
    current_position: bool,
    /// Print the volume as a percentage
    #[arg(long)]
    get_volume: bool,
    /// Print the running instance's version
    #[arg(long)]
    get_version: bool,
    /// Query the player (not implemented)
    #[arg(long)]
    query: bool,
    /// Query the player with a popup (not implemented)
    #[arg(long)]
    gui_query: bool,

    /// Files, directories or URLs to enqueue; `-` reads a list from stdin
    files: Vec<String>,
}

impl Cli {
    /// Commands in documented group order.
    fn commands(&self) -> Vec<Command> {
        let mut commands = Vec::new();

        let getters = [
            (self.get_artist, TrackAttr::Artist),
            (self.get_title, TrackAttr::Title),
            (self.get_album, TrackAttr::Album),
            (self.get_length, TrackAttr::Length),
            (self.get_rating, TrackAttr::Rating),
        ];
        commands.extend(
            getters
                .into_iter()
                .filter(|(set, _)| *set)
                .map(|(_, attr)| Command::GetAttr(attr)),
        );

        if let Some(value) = &self.set_rating {
            commands.push(Command::SetRating(value.clone()));
        }

        let volume = [
            (self.inc_vol, VolumeAction::Increase),
            (self.dec_vol, VolumeAction::Decrease),
        ];
        commands.extend(volume.into_iter().filter_map(|(amount, action)| {
            amount.map(|amount| Command::ChangeVolume { action, amount })
        }));

        let flags = [
            (self.play, Command::Play),
            (self.stop, Command::Stop),
            (self.next, Command::Next),
            (self.prev, Command::Prev),
            (self.play_pause, Command::PlayPause),
            (self.current_position, Command::CurrentPosition),
            (self.get_volume, Command::GetVolume),
            (self.get_version, Command::GetVersion),
            (self.query, Command::Query),
            (self.gui_query, Command::GuiQuery),
        ];
        commands.extend(
            flags
                .into_iter()
                .filter(|(set, _)| *set)
                .map(|(_, command)| command),
        );

        commands
    }
}

/// What this invocation turns into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    /// Forward to the running primary.
    Client,
    /// Become the primary.
    Primary,
    /// Control flags with nobody to control.
    NoInstance,
}

fn role(force_new: bool, instance_running: bool, has_commands: bool, has_files: bool) -> Role {
    if force_new {
        Role::Primary
    } else if instance_running {
        Role::Client
    } else if has_commands && !has_files {
        Role::NoInstance
    } else {
        Role::Primary
    }
}

/// How a would-be primary proceeds after trying to claim the endpoint.
#[derive(Debug)]
enum Startup {
    /// Own the endpoint and serve remote calls.
    Serve(EndpointHandle),
    /// `--new` while another instance holds the endpoint.
    Standalone,
    /// Another instance won the claim; hand over to it.
    Forward,
}

fn claim_endpoint(link: &TransportLink, force_new: bool) -> Result<Startup, TransportError> {
    match link.claim() {
        Ok(handle) => Ok(Startup::Serve(handle)),
        Err(TransportError::AlreadyClaimed(name)) if force_new => {
            tracing::warn!(endpoint = %name, "endpoint in use; running without remote control");
            Ok(Startup::Standalone)
        }
        Err(TransportError::AlreadyClaimed(name)) => {
            tracing::info!(endpoint = %name, "another instance claimed the endpoint first");
            Ok(Startup::Forward)
        }
        Err(err) => Err(err),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(status) => status.into(),
        Err(err) => {
            eprintln!("jukebox: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<Status> {
    let dirs = AppDirs::discover()?;
    let config = Config::load_or_default(&dirs)?.with_endpoint_override(cli.endpoint.as_deref())?;
    let link = TransportLink::new(
        Endpoint::from_config(&config.remote, &dirs),
        config.remote.timeout(),
    );

    let commands = cli.commands();
    let locations = locations::collect(&cli.files, io::stdin().lock())?;
    let role = role(
        cli.new,
        !cli.new && link.probe(),
        !commands.is_empty(),
        !locations.is_empty(),
    );

    let mut logging = config.logging.clone();
    if role != Role::Primary {
        logging.console = false;
    }
    let _logging = init_logging(&logging, &dirs)?;
    tracing::debug!(?role, endpoint = %link.endpoint().name(), "starting");

    match role {
        Role::Client => run_client(&link, locations, commands),
        Role::NoInstance => {
            eprintln!(
                "jukebox: {}",
                TransportError::NoInstanceRunning(link.endpoint().name().to_string())
            );
            Ok(Status::Failure)
        }
        Role::Primary => {
            if !commands.is_empty() {
                tracing::warn!("control flags are ignored when starting a new instance");
            }
            let handle = match claim_endpoint(&link, cli.new)? {
                Startup::Serve(handle) => Some(handle),
                Startup::Standalone => None,
                Startup::Forward => return run_client(&link, locations, commands),
            };
            primary::run(&config, handle, locations)?;
            Ok(Status::Success)
        }
    }
}

fn run_client(link: &TransportLink, locations: Vec<String>, commands: Vec<Command>) -> Result<Status> {
    let cwd = std::env::current_dir()?;
    let locations = locations::absolutize_all(locations, &cwd);
    let status = dispatch::run_client(link, locations, commands, io::stdout().lock(), io::stderr().lock())?;
    Ok(status)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("jukebox").chain(args.iter().copied()))
            .expect("arguments should parse")
    }

    #[test]
    fn flags_map_to_commands_in_group_order() {
        let cli = parse(&[
            "--get-volume",
            "--play",
            "--inc-vol",
            "20",
            "--set-rating",
            "3",
            "--get-title",
            "--get-artist",
        ]);
        assert_eq!(
            cli.commands(),
            vec![
                Command::GetAttr(TrackAttr::Artist),
                Command::GetAttr(TrackAttr::Title),
                Command::SetRating("3".into()),
                Command::ChangeVolume {
                    action: VolumeAction::Increase,
                    amount: 20,
                },
                Command::Play,
                Command::GetVolume,
            ]
        );
    }

    #[test]
    fn files_and_stdin_sentinel_are_positional() {
        let cli = parse(&["--new", "a.mp3", "music/"]);
        assert!(cli.new);
        assert_eq!(cli.files, vec!["a.mp3", "music/"]);
        assert!(cli.commands().is_empty());

        let cli = parse(&["-"]);
        assert_eq!(cli.files, vec!["-"]);
    }

    #[test]
    fn endpoint_override_parses() {
        let cli = parse(&["--endpoint", "alt", "--query"]);
        assert_eq!(cli.endpoint.as_deref(), Some("alt"));
        assert_eq!(cli.commands(), vec![Command::Query]);
    }

    #[test]
    fn role_selection() {
        assert_eq!(role(false, true, true, false), Role::Client);
        assert_eq!(role(false, true, false, true), Role::Client);
        assert_eq!(role(false, false, true, false), Role::NoInstance);
        assert_eq!(role(false, false, false, false), Role::Primary);
        assert_eq!(role(false, false, false, true), Role::Primary);
        assert_eq!(role(true, true, true, false), Role::Primary);
        assert_eq!(role(true, false, false, false), Role::Primary);
    }

    #[test]
    fn control_flags_with_files_start_a_primary() {
        let cli = parse(&["--play", "a.mp3"]);
        let has_files = !cli.files.is_empty();
        assert_eq!(
            role(cli.new, false, !cli.commands().is_empty(), has_files),
            Role::Primary
        );
    }

    fn test_link(dir: &std::path::Path) -> TransportLink {
        TransportLink::new(
            Endpoint::new("startup", "/org/jukebox/Player", dir),
            std::time::Duration::from_millis(500),
        )
    }

    #[test]
    fn free_endpoint_is_served() {
        let temp = tempfile::tempdir().unwrap();
        let link = test_link(temp.path());
        let startup = claim_endpoint(&link, false).unwrap();
        assert!(matches!(startup, Startup::Serve(_)));
        assert!(link.probe());
    }

    #[test]
    fn held_endpoint_with_new_runs_standalone() {
        let temp = tempfile::tempdir().unwrap();
        let link = test_link(temp.path());
        let _held = link.claim().unwrap();
        assert!(matches!(
            claim_endpoint(&link, true).unwrap(),
            Startup::Standalone
        ));
    }

    #[test]
    fn lost_claim_forwards_to_the_winner() {
        let temp = tempfile::tempdir().unwrap();
        let link = test_link(temp.path());
        let _held = link.claim().unwrap();
        assert!(matches!(
            claim_endpoint(&link, false).unwrap(),
            Startup::Forward
        ));
    }
}
