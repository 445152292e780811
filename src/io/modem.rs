//! SMS alert delivery over a SIM800L-class GSM modem
//!
//! Protocol (text-mode SMS over AT commands):
//! - `AT+CMGF=1` - select text mode
//! - `AT+CMGS="<recipient>"` - address the message
//! - message body, terminated by Ctrl+Z (0x1A)
//!
//! The modem needs a settle delay after every step before it accepts the
//! next command; these delays come from the transport's turnaround time,
//! not convenience. No delivery acknowledgment is read back.

use crate::infra::config::Config;
use anyhow::Context;
use async_trait::async_trait;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::time::sleep;
use tokio_serial::{SerialPortBuilderExt, SerialStream};
use tracing::{error, info};

/// ASCII SUB, terminates the message body in text mode
const CTRL_Z: u8 = 0x1A;

/// Build the text-mode select command
fn text_mode_command() -> &'static [u8] {
    b"AT+CMGF=1\r"
}

/// Build the destination-address command for a recipient
fn destination_command(recipient: &str) -> Vec<u8> {
    format!("AT+CMGS=\"{}\"\r", recipient).into_bytes()
}

/// Build the message body payload (body followed by carriage return)
fn body_payload(message: &str) -> Vec<u8> {
    let mut payload = message.as_bytes().to_vec();
    payload.push(b'\r');
    payload
}

/// Sink for outgoing alert messages.
///
/// Implemented by the serial modem in production and by in-memory mocks in
/// pipeline tests.
#[async_trait]
pub trait AlertSender: Send {
    async fn send(&mut self, recipient: &str, message: &str) -> anyhow::Result<()>;
}

/// Serial GSM modem held open for the process lifetime
pub struct SmsModem {
    port: SerialStream,
    device: String,
    settle: Duration,
    send_settle: Duration,
}

impl SmsModem {
    /// Open the serial device configured for the modem.
    ///
    /// Failure here is fatal at startup: a device that cannot reach its
    /// modem cannot alert anyone.
    pub fn open(config: &Config) -> anyhow::Result<Self> {
        let device = config.modem_device().to_string();
        let port = tokio_serial::new(&device, config.modem_baud())
            .timeout(Duration::from_millis(100))
            .open_native_async()
            .with_context(|| format!("Failed to open modem device {}", device))?;

        info!(device = %device, baud = %config.modem_baud(), "modem_port_opened");

        Ok(Self {
            port,
            device,
            settle: Duration::from_millis(config.modem_settle_ms()),
            send_settle: Duration::from_millis(config.modem_send_settle_ms()),
        })
    }

    async fn write_step(&mut self, bytes: &[u8]) -> anyhow::Result<()> {
        self.port
            .write_all(bytes)
            .await
            .with_context(|| format!("Modem write failed on {}", self.device))?;
        Ok(())
    }
}

#[async_trait]
impl AlertSender for SmsModem {
    /// Send one SMS with the fixed text-mode handshake.
    ///
    /// Synchronous from the pipeline's point of view: the settle delays are
    /// awaited inline, so a send takes several seconds.
    async fn send(&mut self, recipient: &str, message: &str) -> anyhow::Result<()> {
        self.write_step(text_mode_command()).await?;
        sleep(self.settle).await;

        self.write_step(&destination_command(recipient)).await?;
        sleep(self.settle).await;

        self.write_step(&body_payload(message)).await?;
        sleep(self.settle).await;

        self.write_step(&[CTRL_Z]).await?;
        sleep(self.send_settle).await;

        info!(recipient = %recipient, "sms_sent");
        Ok(())
    }
}

/// Log a modem transport failure (cold path)
#[cold]
pub fn log_send_failed(recipient: &str, e: &anyhow::Error) {
    error!(recipient = %recipient, error = %e, "sms_send_failed");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_mode_command() {
        assert_eq!(text_mode_command(), b"AT+CMGF=1\r");
    }

    #[test]
    fn test_destination_command() {
        let cmd = destination_command("+9779869990884");
        assert_eq!(cmd, b"AT+CMGS=\"+9779869990884\"\r".to_vec());
    }

    #[test]
    fn test_body_payload_carriage_return_terminated() {
        let payload = body_payload("Leopard detected at the site no.1 in Dadagaun");
        assert_eq!(payload.last(), Some(&b'\r'));
        assert!(payload.starts_with(b"Leopard detected"));
    }

    #[test]
    fn test_ctrl_z_terminator() {
        assert_eq!(CTRL_Z, 26);
    }
}
