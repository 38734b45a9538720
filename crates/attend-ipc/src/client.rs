//! Client side of the attendd socket

use attend_api::{
    AttendanceView, Command, Coordinate, Event, GeofenceCheckResult, HealthStatus, LocationType,
    Request, Response, ResponsePayload, ResponseResult, SweepSummary,
};
use attend_util::{OfficeId, UserId};
use std::path::Path;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::UnixStream;
use tokio::net::unix::{OwnedReadHalf, OwnedWriteHalf};

use crate::{IpcError, IpcResult};

/// Pull one payload variant out of a response, or report what came instead
macro_rules! expect_payload {
    ($payload:expr, $pattern:pat => $value:expr) => {
        match $payload {
            $pattern => Ok($value),
            other => Err(unexpected(&other)),
        }
    };
}

fn unexpected(payload: &ResponsePayload) -> IpcError {
    IpcError::Protocol(format!("unexpected response payload: {:?}", payload))
}

/// One connection to attendd. Requests are answered in order.
pub struct IpcClient {
    lines: Lines<BufReader<OwnedReadHalf>>,
    writer: OwnedWriteHalf,
    next_request_id: u64,
}

impl IpcClient {
    pub async fn connect(socket_path: impl AsRef<Path>) -> IpcResult<Self> {
        let path = socket_path.as_ref();
        let stream = UnixStream::connect(path)
            .await
            .map_err(|source| IpcError::Connect {
                path: path.to_path_buf(),
                source,
            })?;
        let (read_half, writer) = stream.into_split();

        Ok(Self {
            lines: BufReader::new(read_half).lines(),
            writer,
            next_request_id: 1,
        })
    }

    async fn read_line(&mut self) -> IpcResult<String> {
        self.lines
            .next_line()
            .await?
            .ok_or(IpcError::ConnectionClosed)
    }

    /// Send a raw command and return the full response
    pub async fn send(&mut self, command: Command) -> IpcResult<Response> {
        let request_id = self.next_request_id;
        self.next_request_id += 1;

        let mut line = serde_json::to_string(&Request::new(request_id, command))?;
        line.push('\n');
        self.writer.write_all(line.as_bytes()).await?;

        let response: Response = serde_json::from_str(self.read_line().await?.trim())?;

        // Id 0 answers a request the server could not parse
        if response.request_id != request_id && response.request_id != 0 {
            return Err(IpcError::Protocol(format!(
                "answer to request {} while waiting on {}",
                response.request_id, request_id
            )));
        }

        Ok(response)
    }

    /// Send a command; a refusal becomes [`IpcError::Rejected`]
    pub async fn call(&mut self, command: Command) -> IpcResult<ResponsePayload> {
        match self.send(command).await?.result {
            ResponseResult::Ok(payload) => Ok(payload),
            ResponseResult::Err(e) => Err(e.into()),
        }
    }

    pub async fn check_in(
        &mut self,
        user_id: &UserId,
        location_type: LocationType,
        coordinate: Coordinate,
        target_id: Option<String>,
    ) -> IpcResult<AttendanceView> {
        let payload = self
            .call(Command::CheckIn {
                user_id: user_id.clone(),
                location_type,
                coordinate,
                target_id,
            })
            .await?;
        expect_payload!(payload, ResponsePayload::CheckedIn(view) => view)
    }

    /// Close the user's session. With `sweep_first`, expired sessions are
    /// auto-logged out before the check-out is attempted.
    pub async fn check_out(
        &mut self,
        user_id: &UserId,
        coordinate: Coordinate,
        sweep_first: bool,
    ) -> IpcResult<AttendanceView> {
        let user_id = user_id.clone();
        let command = if sweep_first {
            Command::CheckOutWithSweep {
                user_id,
                coordinate,
            }
        } else {
            Command::CheckOut {
                user_id,
                coordinate,
            }
        };
        let payload = self.call(command).await?;
        expect_payload!(payload, ResponsePayload::CheckedOut(view) => view)
    }

    pub async fn status(&mut self, user_id: &UserId) -> IpcResult<AttendanceView> {
        let payload = self
            .call(Command::GetStatus {
                user_id: user_id.clone(),
            })
            .await?;
        expect_payload!(payload, ResponsePayload::Status(view) => view)
    }

    /// Sessions newest first. `for_user` reads someone else's (admin only).
    pub async fn history(
        &mut self,
        user_id: &UserId,
        for_user: Option<&UserId>,
        offset: usize,
        limit: usize,
    ) -> IpcResult<Vec<AttendanceView>> {
        let payload = self
            .call(Command::GetHistory {
                user_id: user_id.clone(),
                for_user: for_user.cloned(),
                offset,
                limit,
            })
            .await?;
        expect_payload!(payload, ResponsePayload::History { records } => records)
    }

    pub async fn check_location(
        &mut self,
        coordinate: Coordinate,
        office_id: Option<&OfficeId>,
    ) -> IpcResult<Vec<GeofenceCheckResult>> {
        let payload = self
            .call(Command::CheckLocation {
                coordinate,
                office_id: office_id.cloned(),
            })
            .await?;
        expect_payload!(payload, ResponsePayload::Geofence { results } => results)
    }

    pub async fn nearest_office(
        &mut self,
        coordinate: Coordinate,
    ) -> IpcResult<Option<GeofenceCheckResult>> {
        let payload = self.call(Command::NearestOffice { coordinate }).await?;
        expect_payload!(payload, ResponsePayload::NearestOffice { result } => result)
    }

    pub async fn run_sweep(&mut self) -> IpcResult<SweepSummary> {
        let payload = self.call(Command::RunSweep).await?;
        expect_payload!(payload, ResponsePayload::Swept(summary) => summary)
    }

    pub async fn health(&mut self) -> IpcResult<HealthStatus> {
        let payload = self.call(Command::GetHealth).await?;
        expect_payload!(payload, ResponsePayload::Health(health) => health)
    }

    pub async fn ping(&mut self) -> IpcResult<()> {
        let payload = self.call(Command::Ping).await?;
        expect_payload!(payload, ResponsePayload::Pong => ())
    }

    /// Turn this connection into an event feed
    pub async fn subscribe(mut self) -> IpcResult<EventStream> {
        let payload = self.call(Command::SubscribeEvents).await?;
        expect_payload!(payload, ResponsePayload::Subscribed { .. } => ())?;

        Ok(EventStream { lines: self.lines })
    }
}

/// Check-in, check-out and sweep events pushed by attendd
pub struct EventStream {
    lines: Lines<BufReader<OwnedReadHalf>>,
}

impl EventStream {
    pub async fn next(&mut self) -> IpcResult<Event> {
        let line = self
            .lines
            .next_line()
            .await?
            .ok_or(IpcError::ConnectionClosed)?;
        Ok(serde_json::from_str(line.trim())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use attend_api::{AttendanceRecord, ErrorCode, ErrorInfo, LocationRef};
    use tempfile::tempdir;
    use tokio::net::UnixListener;

    /// Answer requests on one connection with the given results, in order
    fn scripted_attendd(
        listener: UnixListener,
        answers: Vec<Result<ResponsePayload, ErrorInfo>>,
    ) -> tokio::task::JoinHandle<Vec<Command>> {
        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let (read_half, mut write_half) = stream.into_split();
            let mut lines = BufReader::new(read_half).lines();
            let mut seen = Vec::new();

            for answer in answers {
                let line = lines.next_line().await.unwrap().unwrap();
                let request: Request = serde_json::from_str(&line).unwrap();
                seen.push(request.command);

                let response = match answer {
                    Ok(payload) => Response::success(request.request_id, payload),
                    Err(e) => Response::error(request.request_id, e),
                };
                let mut json = serde_json::to_string(&response).unwrap();
                json.push('\n');
                write_half.write_all(json.as_bytes()).await.unwrap();
            }
            seen
        })
    }

    fn open_view(user: &str) -> AttendanceView {
        AttendanceView {
            record: AttendanceRecord::open(
                UserId::new(user),
                LocationRef::Other,
                attend_util::now(),
                Coordinate::new(37.7749, -122.4194),
            ),
            location_name: "Other location".into(),
        }
    }

    #[tokio::test]
    async fn typed_calls_unwrap_their_payload() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("attendd.sock");
        let server = scripted_attendd(
            UnixListener::bind(&path).unwrap(),
            vec![Ok(ResponsePayload::Status(open_view("alice"))), Ok(ResponsePayload::Pong)],
        );

        let mut client = IpcClient::connect(&path).await.unwrap();
        let view = client.status(&UserId::new("alice")).await.unwrap();
        assert_eq!(view.record.user_id, UserId::new("alice"));
        client.ping().await.unwrap();

        let seen = server.await.unwrap();
        assert!(matches!(&seen[0], Command::GetStatus { user_id } if user_id.as_str() == "alice"));
        assert!(matches!(seen[1], Command::Ping));
    }

    #[tokio::test]
    async fn refusal_keeps_its_code() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("attendd.sock");
        let _server = scripted_attendd(
            UnixListener::bind(&path).unwrap(),
            vec![Err(ErrorInfo::new(
                ErrorCode::NoActiveSession,
                "No active attendance session",
            ))],
        );

        let mut client = IpcClient::connect(&path).await.unwrap();
        let err = client
            .check_out(&UserId::new("alice"), Coordinate::new(0.0, 0.0), false)
            .await
            .unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::NoActiveSession));
    }

    #[tokio::test]
    async fn mismatched_payload_is_a_protocol_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("attendd.sock");
        let _server = scripted_attendd(
            UnixListener::bind(&path).unwrap(),
            vec![Ok(ResponsePayload::Pong)],
        );

        let mut client = IpcClient::connect(&path).await.unwrap();
        assert!(matches!(
            client.run_sweep().await,
            Err(IpcError::Protocol(_))
        ));
    }

    #[tokio::test]
    async fn connect_failure_names_the_socket() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing.sock");

        match IpcClient::connect(&path).await {
            Err(IpcError::Connect { path: reported, .. }) => assert_eq!(reported, path),
            other => panic!("Expected Connect error, got {:?}", other.err()),
        }
    }
}
