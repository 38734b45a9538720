//! attendctl - command-line client for attendd

use anyhow::{Context, Result, bail};
use attend_api::{
    AttendanceView, Coordinate, EventPayload, GeofenceCheckResult, GeofenceTargetRef,
    HealthStatus, LocationType, SweepSummary,
};
use attend_ipc::IpcClient;
use attend_util::{OfficeId, UserId, default_socket_path, format_datetime_full, format_duration};
use clap::{Args as ClapArgs, Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// attendctl - talk to a running attendd
#[derive(Parser, Debug)]
#[command(name = "attendctl")]
#[command(about = "Command-line client for attendd", long_about = None)]
struct Args {
    /// Socket path (or set ATTEND_SOCKET env var)
    #[arg(short, long, env = "ATTEND_SOCKET", default_value_os_t = default_socket_path())]
    socket: PathBuf,

    /// User to act as (default: your login name). Only admins may name
    /// someone else.
    #[arg(short, long, env = "ATTEND_USER")]
    user: Option<String>,

    /// Print JSON instead of text
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Cmd,
}

#[derive(ClapArgs, Debug, Clone, Copy)]
struct Position {
    /// Latitude in degrees
    #[arg(long, allow_hyphen_values = true)]
    lat: f64,

    /// Longitude in degrees
    #[arg(long, allow_hyphen_values = true)]
    lon: f64,
}

impl Position {
    fn coordinate(self) -> Coordinate {
        Coordinate::new(self.lat, self.lon)
    }
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Check in at an office, a home address, or elsewhere
    CheckIn {
        /// office, home or other
        location_type: LocationType,

        /// Office id or home address id
        target: Option<String>,

        #[command(flatten)]
        position: Position,
    },

    /// Close the open session
    CheckOut {
        #[command(flatten)]
        position: Position,

        /// Run an auto-logout sweep first
        #[arg(long)]
        sweep: bool,
    },

    /// Show the open session
    Status,

    /// List past sessions, newest first
    History {
        /// Another user's history (admin only)
        #[arg(long)]
        of: Option<String>,

        #[arg(long, default_value_t = 0)]
        offset: usize,

        #[arg(long, default_value_t = attend_api::DEFAULT_HISTORY_LIMIT)]
        limit: usize,
    },

    /// Evaluate a position against the office geofences
    Locate {
        #[command(flatten)]
        position: Position,

        /// Only this office
        #[arg(long)]
        office: Option<String>,
    },

    /// Find the closest office
    Nearest {
        #[command(flatten)]
        position: Position,
    },

    /// Close every session past the session limit (admin only)
    Sweep,

    /// Service health
    Health,

    /// Check the service is reachable
    Ping,

    /// Print events as they happen
    Watch,
}

/// The user named on the command line, else the login name attendd binds
/// to this connection
fn resolve_user(explicit: Option<String>, login: Option<String>) -> Result<UserId> {
    match explicit.or(login) {
        Some(user) if !user.is_empty() => Ok(UserId::new(user)),
        _ => bail!("No user given; pass --user or set ATTEND_USER"),
    }
}

fn emit<T: Serialize>(json: bool, value: &T, text: impl FnOnce(&T)) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        text(value);
    }
    Ok(())
}

fn print_view(view: &AttendanceView) {
    let record = &view.record;
    println!("{}  {}", record.id, view.location_name);
    println!(
        "  in:  {} at {}",
        format_datetime_full(&record.check_in_time),
        record.check_in_coordinate
    );
    match &record.check_out {
        Some(out) => println!(
            "  out: {} at {} ({})",
            format_datetime_full(&out.time),
            out.coordinate,
            format_duration(record.duration(out.time))
        ),
        None => println!(
            "  open for {}",
            format_duration(record.duration(attend_util::now()))
        ),
    }
}

fn print_geofence(result: &GeofenceCheckResult) {
    let target = match &result.target {
        GeofenceTargetRef::Office { office_id, name } => format!("{} ({})", name, office_id),
        GeofenceTargetRef::Home {
            home_address_id,
            address_type,
        } => format!("{} home ({})", address_type, home_address_id),
    };
    println!(
        "{:<40} {:>10.1} m  radius {:>7.1} m  {}",
        target,
        result.distance_meters,
        result.radius_meters,
        if result.within { "inside" } else { "outside" }
    );
}

fn print_sweep(summary: &SweepSummary) {
    println!(
        "Closed {} session(s) checked in before {}",
        summary.closed.len(),
        format_datetime_full(&summary.cutoff)
    );
    for record in &summary.closed {
        println!("  {} {}", record.id, record.user_id);
    }
}

fn print_health(health: &HealthStatus) {
    println!("live:        {}", health.live);
    println!("ready:       {}", health.ready);
    println!("store:       {}", if health.store_ok { "ok" } else { "failing" });
    println!("auto-logout: {}", health.auto_logout_enabled);
    println!("offices:     {}", health.office_count);
    if health.mock_time {
        println!("clock:       mocked (ATTEND_MOCK_TIME)");
    }
}

fn print_event(payload: &EventPayload) {
    match payload {
        EventPayload::CheckedIn {
            record,
            location_name,
        } => println!("{} checked in at {}", record.user_id, location_name),
        EventPayload::CheckedOut { record, reason } => {
            println!("{} checked out ({:?})", record.user_id, reason)
        }
        EventPayload::SweepCompleted {
            cutoff,
            closed_count,
        } => println!(
            "Sweep closed {} session(s) older than {}",
            closed_count,
            format_datetime_full(cutoff)
        ),
    }
}

async fn watch(client: IpcClient, json: bool) -> Result<()> {
    let mut events = client.subscribe().await?;
    loop {
        let event = events.next().await?;
        if json {
            println!("{}", serde_json::to_string(&event)?);
        } else {
            print!("[{}] ", format_datetime_full(&event.timestamp));
            print_event(&event.payload);
        }
    }
}

async fn run(mut client: IpcClient, command: Cmd, user: Option<String>, json: bool) -> Result<()> {
    let user = || resolve_user(user.clone(), std::env::var("USER").ok());

    match command {
        Cmd::CheckIn {
            location_type,
            target,
            position,
        } => {
            let view = client
                .check_in(&user()?, location_type, position.coordinate(), target)
                .await?;
            emit(json, &view, |v| {
                println!("Checked in");
                print_view(v);
            })
        }
        Cmd::CheckOut { position, sweep } => {
            let view = client
                .check_out(&user()?, position.coordinate(), sweep)
                .await?;
            emit(json, &view, |v| {
                println!("Checked out");
                print_view(v);
            })
        }
        Cmd::Status => {
            let view = client.status(&user()?).await?;
            emit(json, &view, print_view)
        }
        Cmd::History { of, offset, limit } => {
            let of = of.map(UserId::new);
            let records = client
                .history(&user()?, of.as_ref(), offset, limit)
                .await?;
            emit(json, &records, |records| {
                if records.is_empty() {
                    println!("No sessions");
                }
                records.iter().for_each(print_view);
            })
        }
        Cmd::Locate { position, office } => {
            let office = office.map(OfficeId::new);
            let results = client
                .check_location(position.coordinate(), office.as_ref())
                .await?;
            emit(json, &results, |results| {
                if results.is_empty() {
                    println!("No offices configured");
                }
                results.iter().for_each(print_geofence);
            })
        }
        Cmd::Nearest { position } => {
            let nearest = client.nearest_office(position.coordinate()).await?;
            emit(json, &nearest, |nearest| match nearest {
                Some(result) => print_geofence(result),
                None => println!("No offices configured"),
            })
        }
        Cmd::Sweep => {
            let summary = client.run_sweep().await?;
            emit(json, &summary, print_sweep)
        }
        Cmd::Health => {
            let health = client.health().await?;
            emit(json, &health, print_health)
        }
        Cmd::Ping => {
            client.ping().await?;
            emit(json, &"pong", |pong| println!("{}", pong))
        }
        Cmd::Watch => watch(client, json).await,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    debug!(socket_path = %args.socket.display(), command = ?args.command, "Connecting");

    let client = IpcClient::connect(&args.socket)
        .await
        .context("Is attendd running?")?;

    run(client, args.command, args.user, args.json).await
}
