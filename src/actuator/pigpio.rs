//! pigpio daemon socket client
//!
//! Speaks the pigpiod command protocol: 16-byte little-endian frames of
//! four u32 words (command, p1, p2, extension length) over TCP, answered
//! by a same-shaped frame whose last word is the status. Servo pulses go
//! through the SERVO command; HWVER doubles as the connectivity probe.

use crate::error::{Error, Result};
use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::Mutex;

/// pigpiod command numbers
const CMD_SERVO: u32 = 8;
const CMD_HWVER: u32 = 17;

/// PWM capability: accepts a pin and a pulse width.
///
/// Connectivity failure is reported distinctly (`Error::BackendUnavailable`)
/// from a successful zero-effect call.
#[async_trait]
pub trait PwmBackend: Send + Sync {
    /// Command `pin` to output pulses of `width_us` microseconds.
    /// A width of 0 disables the output (no drive current).
    async fn set_pulse_width(&self, pin: u8, width_us: u32) -> Result<()>;

    /// Release the backend handle. Further writes fail with
    /// `Error::BackendUnavailable`.
    async fn stop(&self) -> Result<()>;
}

/// Client for a running pigpio daemon
pub struct PigpioClient {
    /// Socket access is serialized so concurrent axes interleave whole
    /// command frames; `None` once the handle has been released.
    stream: Mutex<Option<TcpStream>>,
}

impl PigpioClient {
    /// Connect to the daemon and probe connectivity via HWVER.
    pub async fn connect(addr: &str, port: u16) -> Result<Self> {
        let stream = TcpStream::connect((addr, port)).await.map_err(|e| {
            Error::BackendUnavailable(format!("pigpiod at {}:{}: {}", addr, port, e))
        })?;

        let client = Self {
            stream: Mutex::new(Some(stream)),
        };

        let hwver = client.command(CMD_HWVER, 0, 0).await?;
        tracing::info!(
            addr = %addr,
            port = port,
            hardware_revision = hwver,
            "Connected to pigpio daemon"
        );

        Ok(client)
    }

    /// Send one command frame and read the status word back
    async fn command(&self, cmd: u32, p1: u32, p2: u32) -> Result<i32> {
        let mut guard = self.stream.lock().await;
        let stream = guard
            .as_mut()
            .ok_or_else(|| Error::BackendUnavailable("pigpio handle released".to_string()))?;

        let mut frame = [0u8; 16];
        frame[0..4].copy_from_slice(&cmd.to_le_bytes());
        frame[4..8].copy_from_slice(&p1.to_le_bytes());
        frame[8..12].copy_from_slice(&p2.to_le_bytes());
        // last word is the extension length, always zero for these commands

        stream
            .write_all(&frame)
            .await
            .map_err(|e| Error::BackendUnavailable(format!("pigpiod write failed: {}", e)))?;

        let mut resp = [0u8; 16];
        stream
            .read_exact(&mut resp)
            .await
            .map_err(|e| Error::BackendUnavailable(format!("pigpiod read failed: {}", e)))?;

        let status = i32::from_le_bytes([resp[12], resp[13], resp[14], resp[15]]);

        // HWVER reports the revision in the status word; for everything else
        // a negative status is a daemon-side error
        if cmd != CMD_HWVER && status < 0 {
            return Err(Error::Internal(format!(
                "pigpiod rejected command {} (status {})",
                cmd, status
            )));
        }

        Ok(status)
    }
}

#[async_trait]
impl PwmBackend for PigpioClient {
    async fn set_pulse_width(&self, pin: u8, width_us: u32) -> Result<()> {
        self.command(CMD_SERVO, pin as u32, width_us).await?;
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        let mut guard = self.stream.lock().await;
        if guard.take().is_some() {
            tracing::info!("pigpio handle released");
        }
        Ok(())
    }
}
