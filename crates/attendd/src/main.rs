//! attendd - geofenced attendance service
//!
//! This is the main entry point for the attendd service.
//! It wires together all the components:
//! - Configuration loading
//! - Store initialization and seeding
//! - Attendance engine
//! - Auto-logout scheduler
//! - IPC server

use anyhow::{Context, Result};
use attend_api::{
    ClientInfo, ClientRole, Command, ErrorCode, ErrorInfo, Event, EventPayload, HealthStatus, Response,
    ResponsePayload,
};
use attend_config::{Policy, load_config};
use attend_core::{
    AttendanceEngine, AttendanceResult, AutoLogoutScheduler, CheckInRequest, CoreEvent,
};
use attend_ipc::{IpcServer, ServerMessage};
use attend_store::{AuditEvent, AuditEventType, SqliteStore, Store};
use attend_util::{
    ClientId, RateLimiter, SystemClock, UserId, database_path, default_config_path,
    is_mock_time_active,
};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal::unix::{SignalKind, signal};
use tokio::sync::Mutex;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

/// attendd - Geofenced attendance tracking service
#[derive(Parser, Debug)]
#[command(name = "attendd")]
#[command(about = "Geofenced attendance tracking service", long_about = None)]
struct Args {
    /// Configuration file path (default: ~/.config/attendd/config.toml)
    #[arg(short, long, default_value_os_t = default_config_path())]
    config: PathBuf,

    /// Socket path override (or set ATTEND_SOCKET env var)
    #[arg(short, long, env = "ATTEND_SOCKET")]
    socket: Option<PathBuf>,

    /// Data directory override (or set ATTEND_DATA_DIR env var)
    #[arg(short, long, env = "ATTEND_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

/// Main service state
struct Service {
    engine: Arc<AttendanceEngine>,
    ipc: Arc<IpcServer>,
    store: Arc<dyn Store>,
    rate_limiter: RateLimiter,
}

/// What request handlers share
#[derive(Clone)]
struct Handler {
    engine: Arc<AttendanceEngine>,
    ipc: Arc<IpcServer>,
    store: Arc<dyn Store>,
    rate_limiter: Arc<Mutex<RateLimiter>>,
}

impl Service {
    async fn new(args: &Args) -> Result<Self> {
        let policy = if args.config.exists() {
            load_config(&args.config)
                .with_context(|| format!("Failed to load config from {:?}", args.config))?
        } else {
            warn!(
                config_path = %args.config.display(),
                "Config file not found, using defaults with no offices"
            );
            Policy::default()
        };

        info!(
            config_path = %args.config.display(),
            offices = policy.offices.len(),
            home_addresses = policy.home_addresses.len(),
            "Configuration loaded"
        );

        let socket_path = args
            .socket
            .clone()
            .unwrap_or_else(|| policy.service.socket_path.clone());

        let data_dir = args
            .data_dir
            .clone()
            .unwrap_or_else(|| policy.service.data_dir.clone());

        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("Failed to create data directory {:?}", data_dir))?;

        let db_path = database_path(&data_dir);
        let store: Arc<dyn Store> = Arc::new(
            SqliteStore::open_with_busy_timeout(&db_path, policy.service.store_busy_timeout)
                .with_context(|| format!("Failed to open database {:?}", db_path))?,
        );

        info!(db_path = %db_path.display(), "Store initialized");

        store.append_audit(AuditEvent::new(AuditEventType::ServiceStarted))?;

        let engine = AttendanceEngine::new(&policy, store.clone(), Arc::new(SystemClock));
        engine
            .load_policy(&policy)
            .context("Failed to seed offices and home addresses")?;

        let mut ipc = IpcServer::new(&socket_path);
        ipc.start().await?;

        info!(socket_path = %socket_path.display(), "IPC server started");

        // Rate limiter: 30 requests per second per client
        let rate_limiter = RateLimiter::new(30, Duration::from_secs(1));

        Ok(Self {
            engine: Arc::new(engine),
            ipc: Arc::new(ipc),
            store,
            rate_limiter,
        })
    }

    async fn run(self) -> Result<()> {
        let ipc_ref = self.ipc.clone();
        let mut ipc_messages = ipc_ref
            .take_message_receiver()
            .await
            .context("IPC message receiver already taken")?;
        let mut core_events = self.engine.subscribe();

        let handler = Handler {
            engine: self.engine.clone(),
            ipc: ipc_ref.clone(),
            store: self.store.clone(),
            rate_limiter: Arc::new(Mutex::new(self.rate_limiter)),
        };

        let ipc_accept = ipc_ref.clone();
        tokio::spawn(async move {
            if let Err(e) = ipc_accept.run().await {
                error!(error = %e, "IPC server error");
            }
        });

        let auto_logout = self.engine.auto_logout_policy();
        let scheduler = if auto_logout.enabled {
            Some(AutoLogoutScheduler::spawn(
                self.engine.sweeper(),
                auto_logout.interval,
            ))
        } else {
            info!("Scheduled auto-logout disabled");
            None
        };

        let mut sigterm =
            signal(SignalKind::terminate()).context("Failed to create SIGTERM handler")?;
        let mut sigint =
            signal(SignalKind::interrupt()).context("Failed to create SIGINT handler")?;
        let mut sighup = signal(SignalKind::hangup()).context("Failed to create SIGHUP handler")?;

        info!("Service running");

        loop {
            tokio::select! {
                _ = sigterm.recv() => {
                    info!("Received SIGTERM, shutting down gracefully");
                    break;
                }
                _ = sigint.recv() => {
                    info!("Received SIGINT, shutting down gracefully");
                    break;
                }
                _ = sighup.recv() => {
                    info!("Received SIGHUP, shutting down gracefully");
                    break;
                }

                // Engine events fan out to subscribed clients
                event = core_events.recv() => {
                    match event {
                        Ok(event) => ipc_ref.broadcast_event(to_api_event(event)),
                        Err(RecvError::Lagged(skipped)) => {
                            warn!(skipped, "Event forwarder lagged, events dropped");
                        }
                        Err(RecvError::Closed) => {
                            error!("Engine event channel closed");
                            break;
                        }
                    }
                }

                // Requests run concurrently; the store serializes writes
                Some(msg) = ipc_messages.recv() => {
                    let handler = handler.clone();
                    tokio::spawn(async move {
                        handler.handle_ipc_message(msg).await;
                    });
                }
            }
        }

        info!("Shutting down attendd");

        if let Some(scheduler) = scheduler {
            scheduler.shutdown().await;
        }

        if let Err(e) = self
            .store
            .append_audit(AuditEvent::new(AuditEventType::ServiceStopped))
        {
            warn!(error = %e, "Failed to log service shutdown");
        }

        info!("Shutdown complete");
        Ok(())
    }
}

impl Handler {
    async fn handle_ipc_message(&self, msg: ServerMessage) {
        match msg {
            ServerMessage::Request { client_id, request } => {
                {
                    let mut limiter = self.rate_limiter.lock().await;
                    if !limiter.check(&client_id) {
                        let response = Response::error(
                            request.request_id,
                            ErrorInfo::new(ErrorCode::RateLimited, "Too many requests"),
                        );
                        let _ = self.ipc.send_response(&client_id, response).await;
                        return;
                    }
                }

                let response = self
                    .handle_command(&client_id, request.request_id, request.command)
                    .await;

                let _ = self.ipc.send_response(&client_id, response).await;
            }

            ServerMessage::ClientConnected { client_id, info } => {
                info!(
                    client_id = %client_id,
                    role = ?info.role,
                    uid = ?info.uid,
                    "Client connected"
                );

                let _ = self
                    .store
                    .append_audit(AuditEvent::new(AuditEventType::ClientConnected {
                        client_id: client_id.to_string(),
                        role: format!("{:?}", info.role),
                        uid: info.uid,
                    }));
            }

            ServerMessage::ClientDisconnected { client_id } => {
                debug!(client_id = %client_id, "Client disconnected");

                let _ = self
                    .store
                    .append_audit(AuditEvent::new(AuditEventType::ClientDisconnected {
                        client_id: client_id.to_string(),
                    }));

                let mut limiter = self.rate_limiter.lock().await;
                limiter.remove_client(&client_id);
            }
        }
    }

    async fn handle_command(
        &self,
        client_id: &ClientId,
        request_id: u64,
        command: Command,
    ) -> Response {
        // A connection that vanished mid-request gets no privileges
        let client = self
            .ipc
            .get_client_info(client_id)
            .await
            .unwrap_or_else(|| ClientInfo::new(ClientRole::Client));

        if let Err(e) = validate(&command).and_then(|_| authorize(&client, &command)) {
            warn!(
                client_id = %client_id,
                role = ?client.role,
                user_id = ?client.user_id,
                reason = %e.message,
                "Request rejected"
            );
            return Response::error(request_id, e);
        }

        // Store access blocks; keep it off the async workers
        let engine = self.engine.clone();
        let client_id = client_id.clone();
        let result = tokio::task::spawn_blocking(move || execute(&engine, &client_id, command)).await;

        match result {
            Ok(Ok(payload)) => Response::success(request_id, payload),
            Ok(Err(e)) => Response::error(request_id, ErrorInfo::new(e.code(), e.to_string())),
            Err(e) => {
                error!(error = %e, "Request handler panicked");
                Response::error(
                    request_id,
                    ErrorInfo::new(ErrorCode::InternalError, "Request handler failed"),
                )
            }
        }
    }
}

/// Users a command acts on: the caller it names, plus the history owner
/// when that differs
fn named_users(command: &Command) -> Vec<&UserId> {
    match command {
        Command::CheckIn { user_id, .. }
        | Command::CheckOut { user_id, .. }
        | Command::CheckOutWithSweep { user_id, .. }
        | Command::GetStatus { user_id } => vec![user_id],
        Command::GetHistory {
            user_id, for_user, ..
        } => std::iter::once(user_id).chain(for_user.as_ref()).collect(),
        _ => Vec::new(),
    }
}

/// Clients act only as the user bound to their connection; sweeps are
/// admin-only
fn authorize(client: &ClientInfo, command: &Command) -> Result<(), ErrorInfo> {
    if matches!(command, Command::RunSweep) && !client.role.can_run_sweep() {
        return Err(ErrorInfo::new(
            ErrorCode::PermissionDenied,
            "Admin role required to run a sweep",
        ));
    }

    if let Some(user_id) = named_users(command)
        .into_iter()
        .find(|u| !client.may_act_as(u))
    {
        return Err(ErrorInfo::new(
            ErrorCode::PermissionDenied,
            format!("Connection may not act as user {}", user_id),
        ));
    }

    Ok(())
}

/// Reject requests that can never succeed
fn validate(command: &Command) -> Result<(), ErrorInfo> {
    let coordinate = match command {
        Command::CheckIn { coordinate, .. }
        | Command::CheckOut { coordinate, .. }
        | Command::CheckOutWithSweep { coordinate, .. }
        | Command::CheckLocation { coordinate, .. }
        | Command::NearestOffice { coordinate } => Some(coordinate),
        _ => None,
    };

    if let Some(coordinate) = coordinate
        && !coordinate.is_in_range()
    {
        return Err(ErrorInfo::new(
            ErrorCode::InvalidRequest,
            format!("Coordinate out of range: {}", coordinate),
        ));
    }

    if named_users(command).iter().any(|u| u.as_str().is_empty()) {
        return Err(ErrorInfo::new(ErrorCode::InvalidRequest, "user_id is required"));
    }

    Ok(())
}

/// Run one command against the engine
fn execute(
    engine: &AttendanceEngine,
    client_id: &ClientId,
    command: Command,
) -> AttendanceResult<ResponsePayload> {
    let payload = match command {
        Command::CheckIn {
            user_id,
            location_type,
            coordinate,
            target_id,
        } => {
            let record = engine.check_in(
                &user_id,
                CheckInRequest {
                    location_type,
                    coordinate,
                    target_id,
                },
            )?;
            ResponsePayload::CheckedIn(engine.view(record))
        }

        Command::CheckOut {
            user_id,
            coordinate,
        } => ResponsePayload::CheckedOut(engine.view(engine.check_out(&user_id, coordinate)?)),

        Command::CheckOutWithSweep {
            user_id,
            coordinate,
        } => ResponsePayload::CheckedOut(
            engine.view(engine.check_out_with_sweep(&user_id, coordinate)?),
        ),

        Command::GetStatus { user_id } => {
            ResponsePayload::Status(engine.view(engine.status(&user_id)?))
        }

        Command::GetHistory {
            user_id,
            for_user,
            offset,
            limit,
        } => {
            let target = for_user.unwrap_or(user_id);
            let records = engine
                .history(&target, offset, limit)?
                .into_iter()
                .map(|r| engine.view(r))
                .collect();
            ResponsePayload::History { records }
        }

        Command::CheckLocation {
            coordinate,
            office_id,
        } => ResponsePayload::Geofence {
            results: engine.check_location(coordinate, office_id.as_ref())?,
        },

        Command::NearestOffice { coordinate } => ResponsePayload::NearestOffice {
            result: engine.nearest_office(coordinate)?,
        },

        Command::RunSweep => ResponsePayload::Swept(engine.sweep()?.into_summary()),

        Command::GetHealth => {
            let store_ok = engine.store().is_healthy();
            let office_count = engine.store().list_offices().map(|o| o.len()).unwrap_or(0);
            ResponsePayload::Health(HealthStatus {
                live: true,
                ready: store_ok,
                store_ok,
                auto_logout_enabled: engine.auto_logout_policy().enabled,
                office_count,
                mock_time: is_mock_time_active(),
            })
        }

        // The IPC layer tracks the subscription flag itself
        Command::SubscribeEvents => ResponsePayload::Subscribed {
            client_id: client_id.clone(),
        },

        Command::UnsubscribeEvents => ResponsePayload::Unsubscribed,

        Command::Ping => ResponsePayload::Pong,
    };

    Ok(payload)
}

fn to_api_event(event: CoreEvent) -> Event {
    let payload = match event {
        CoreEvent::CheckedIn {
            record,
            location_name,
        } => EventPayload::CheckedIn {
            record,
            location_name,
        },
        CoreEvent::CheckedOut { record, reason } => EventPayload::CheckedOut { record, reason },
        CoreEvent::SweepCompleted { cutoff, closed, .. } => EventPayload::SweepCompleted {
            cutoff,
            closed_count: closed.len(),
        },
    };
    Event::new(payload)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "attendd starting");

    if is_mock_time_active() {
        warn!("ATTEND_MOCK_TIME is set; attendance timestamps are shifted");
    }

    let service = Service::new(&args).await?;
    service.run().await
}
