use std::path::PathBuf;

use clap::Parser;
use huddle_client::{
    AudioBackend, ChannelConfig, IdentityStore, JoinOutcome, JoinRequest, SessionController,
    SessionEvent, SignalingChannel, Surface,
};
use huddle_common::{Participant, ValidationError};
use huddle_config::HuddleConfig;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

#[derive(Parser, Debug)]
#[command(name = "huddle", about = "Join a huddle voice room from the terminal")]
struct Args {
    /// Room to join. Omit to start a new room.
    room: Option<String>,

    /// Config file (defaults to the platform config directory).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Relay URL, overriding the config file.
    #[arg(short, long)]
    server: Option<String>,

    /// Display name. Saved for next time.
    #[arg(short, long)]
    name: Option<String>,

    /// Avatar URL.
    #[arg(long)]
    pic: Option<String>,
}

impl Args {
    /// Pick the surface the way the web pages were split: no room starts a
    /// fresh one, a name means the landing form was filled in, otherwise
    /// re-enter the room with whatever identity is stored.
    fn surface(&self) -> Surface {
        match (&self.room, &self.name) {
            (None, _) => Surface::Home,
            (Some(_), Some(_)) => Surface::Landing,
            (Some(_), None) => Surface::Room,
        }
    }
}

fn new_room_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()[..8].to_string()
}

type Input = Lines<BufReader<Stdin>>;

enum Action {
    Event(Option<SessionEvent>),
    Line(Option<String>),
    Quit,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let config = match huddle_config::load_config_from(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("huddle: {e}");
            std::process::exit(1);
        }
    };

    let level = config.logging.level.as_directive();
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("huddle={level},huddle_client={level}").into()
            }),
        )
        .init();

    if let Err(e) = run(args, config).await {
        tracing::error!(error = %e, "Session failed");
        std::process::exit(1);
    }
}

async fn run(args: Args, mut config: HuddleConfig) -> huddle_common::Result<()> {
    if let Some(server) = &args.server {
        config.client.server_url = server.clone();
    }

    let identity = match config.identity.resolved_store_path() {
        Some(path) => IdentityStore::with_file(path),
        None => IdentityStore::in_memory(),
    };
    let channel = SignalingChannel::connect(ChannelConfig::from(&config.client));
    let surface = args.surface();
    let mut session = SessionController::new(surface, channel, identity, audio_backend(&config));
    let mut input = BufReader::new(tokio::io::stdin()).lines();

    let room_id = args.room.clone().unwrap_or_else(new_room_id);
    if surface == Surface::Home {
        println!("New room: {room_id}");
    }

    let outcome = match (surface, &args.name) {
        (Surface::Room, _) => match session.resume(&room_id).await? {
            Some(outcome) => outcome,
            None => join_with_prompt(&mut session, &room_id, &args, &mut input).await?,
        },
        (_, Some(name)) => {
            let request = JoinRequest::new(&room_id).with_profile(name, args.pic.as_deref());
            session.join(request).await?
        }
        (_, None) => match session.join(JoinRequest::new(&room_id)).await {
            Err(ValidationError::MissingName) => {
                join_with_prompt(&mut session, &room_id, &args, &mut input).await?
            }
            other => other?,
        },
    };

    report_join(&room_id, &outcome);
    event_loop(&mut session, &mut input).await;

    session.leave();
    println!("Left {room_id}.");
    Ok(())
}

fn audio_backend(config: &HuddleConfig) -> AudioBackend {
    #[cfg(feature = "native-audio")]
    {
        AudioBackend::native(&config.audio)
    }
    #[cfg(not(feature = "native-audio"))]
    {
        AudioBackend::null(&config.audio)
    }
}

/// Ask for a display name on stdin, then join with it.
async fn join_with_prompt(
    session: &mut SessionController,
    room_id: &str,
    args: &Args,
    input: &mut Input,
) -> huddle_common::Result<JoinOutcome> {
    loop {
        println!("Your name:");
        let Some(line) = input.next_line().await? else {
            return Err(ValidationError::MissingName.into());
        };
        let request = JoinRequest::new(room_id).with_profile(line.trim(), args.pic.as_deref());
        match session.join(request).await {
            Ok(outcome) => return Ok(outcome),
            Err(ValidationError::MissingName) => continue,
            Err(e) => return Err(e.into()),
        }
    }
}

fn report_join(room_id: &str, outcome: &JoinOutcome) {
    println!("Joined {room_id} as {}.", outcome.user.name);
    if let Err(e) = &outcome.capture {
        println!("{} ({e})", e.user_message());
        println!("You can still hear the room.");
    }
    println!("Commands: who, leave");
}

fn print_roster(roster: &[Participant]) {
    let names: Vec<&str> = roster.iter().map(Participant::name).collect();
    println!("In the room ({}): {}", names.len(), names.join(", "));
}

async fn event_loop(session: &mut SessionController, input: &mut Input) {
    loop {
        let action = tokio::select! {
            event = session.next_event() => Action::Event(event),
            line = input.next_line() => Action::Line(line.ok().flatten()),
            _ = tokio::signal::ctrl_c() => Action::Quit,
        };

        match action {
            Action::Event(Some(SessionEvent::RosterUpdated(roster))) => print_roster(&roster),
            Action::Event(Some(_)) => {}
            Action::Event(None) | Action::Quit | Action::Line(None) => break,
            Action::Line(Some(line)) => match line.trim() {
                "" => {}
                "who" => print_roster(session.roster()),
                "leave" | "quit" | "q" => break,
                other => println!("Unknown command: {other}"),
            },
        }
    }
}
