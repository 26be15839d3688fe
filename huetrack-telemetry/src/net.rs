//! Replication sessions: server mode, client mode, DS discovery.

use crate::error::TelemetryError;
use crate::instance::{EntryUpdate, TelemetryInstance};
use serde_json::Value;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, BufWriter};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

/// Telemetry replication port.
pub const NT_PORT: u16 = 1735;

/// Driver station discovery endpoint (local, JSON lines with `robotIP`).
pub const DS_PORT: u16 = 1742;

const RECONNECT_DELAY: Duration = Duration::from_secs(1);

impl TelemetryInstance {
    /// Server mode: accept subscribers and replicate the table to each.
    /// Returns the bound address (useful when binding port 0).
    pub async fn start_server(&self, bind: SocketAddr) -> Result<SocketAddr, TelemetryError> {
        let listener = TcpListener::bind(bind).await.map_err(TelemetryError::Bind)?;
        let addr = listener.local_addr().map_err(TelemetryError::Bind)?;
        let instance = self.clone();

        tokio::spawn(async move {
            loop {
                match listener.accept().await {
                    Ok((socket, peer)) => {
                        debug!("telemetry subscriber connected from {}", peer);
                        let instance = instance.clone();
                        tokio::spawn(async move {
                            if let Err(e) = replicate(instance, socket).await {
                                debug!("telemetry subscriber {} dropped: {}", peer, e);
                            }
                        });
                    }
                    Err(e) => {
                        warn!("telemetry accept failed: {}", e);
                        tokio::time::sleep(RECONNECT_DELAY).await;
                    }
                }
            }
        });

        info!("telemetry server listening on {}", addr);
        Ok(addr)
    }

    /// Client mode: push the table to the robot controller derived from the
    /// team number, reconnecting forever. Never blocks publishes.
    pub fn start_client(&self, team: u16) {
        let addr = robot_address(team);
        info!("telemetry client for team {} -> {}", team, addr);
        self.spawn_client(addr);
    }

    pub(crate) fn spawn_client(&self, default_addr: SocketAddr) {
        let instance = self.clone();
        tokio::spawn(async move {
            loop {
                let addr = instance.client_target(default_addr);
                match TcpStream::connect(addr).await {
                    Ok(stream) => {
                        info!("telemetry connected to {}", addr);
                        if let Err(e) = replicate(instance.clone(), stream).await {
                            debug!("telemetry session to {} ended: {}", addr, e);
                        }
                    }
                    Err(e) => debug!("telemetry connect to {} failed: {}", addr, e),
                }
                tokio::time::sleep(RECONNECT_DELAY).await;
            }
        });
    }

    /// Attach the driver-station discovery client: when the DS reports a
    /// robot address, the replication client prefers it over the
    /// team-derived one.
    pub fn start_ds_client(&self) {
        let instance = self.clone();
        tokio::spawn(async move {
            loop {
                if let Ok(stream) =
                    TcpStream::connect((Ipv4Addr::LOCALHOST, DS_PORT)).await
                {
                    let mut lines = BufReader::new(stream).lines();
                    while let Ok(Some(line)) = lines.next_line().await {
                        if let Some(ip) = parse_ds_line(&line) {
                            debug!("driver station reports robot at {}", ip);
                            *instance.inner.ds_override.write() = Some(ip);
                        }
                    }
                }
                tokio::time::sleep(RECONNECT_DELAY).await;
            }
        });
    }

    fn client_target(&self, default_addr: SocketAddr) -> SocketAddr {
        match *self.inner.ds_override.read() {
            Some(ip) => SocketAddr::new(ip, NT_PORT),
            None => default_addr,
        }
    }
}

/// `10.TE.AM.2:1735` for a team number.
pub fn robot_address(team: u16) -> SocketAddr {
    let upper = (team / 100) as u8;
    let lower = (team % 100) as u8;
    SocketAddr::new(IpAddr::V4(Ipv4Addr::new(10, upper, lower, 2)), NT_PORT)
}

fn parse_ds_line(line: &str) -> Option<IpAddr> {
    let value: Value = serde_json::from_str(line).ok()?;
    value.get("robotIP")?.as_str()?.parse().ok()
}

/// Push the full table, then follow the update stream. A lagged session
/// resyncs from a fresh snapshot instead of dying.
async fn replicate(instance: TelemetryInstance, socket: TcpStream) -> std::io::Result<()> {
    let mut updates = instance.subscribe_updates();
    let mut writer = BufWriter::new(socket);

    for update in instance.snapshot() {
        write_line(&mut writer, &update).await?;
    }
    writer.flush().await?;

    loop {
        match updates.recv().await {
            Ok(update) => {
                write_line(&mut writer, &update).await?;
                writer.flush().await?;
            }
            Err(RecvError::Lagged(skipped)) => {
                debug!("telemetry session lagged {} updates, resyncing", skipped);
                for update in instance.snapshot() {
                    write_line(&mut writer, &update).await?;
                }
                writer.flush().await?;
            }
            Err(RecvError::Closed) => return Ok(()),
        }
    }
}

async fn write_line<W: AsyncWrite + Unpin>(
    writer: &mut W,
    update: &EntryUpdate,
) -> std::io::Result<()> {
    let mut line = serde_json::to_vec(update)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
    line.push(b'\n');
    writer.write_all(&line).await
}
