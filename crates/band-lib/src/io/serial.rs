use crate::acquire::{LineSource, SourcePoll};
use crate::io::wire::LedColor;
use anyhow::{Context, Result};
use serialport::{ClearBuffer, SerialPort};
use std::io::{Read, Write};
use std::time::Duration;

/// Arduino-class boards reset when the port opens; give the sketch time to
/// come back up before expecting data.
const RESET_SETTLE: Duration = Duration::from_secs(2);

/// Per-read timeout used for the raw port. Session-level pacing and duration
/// limits live in the recorder, not here.
const READ_TIMEOUT: Duration = Duration::from_millis(100);

/// The only device configuration surface: port identifier and baud rate,
/// both caller-supplied.
#[derive(Debug, Clone)]
pub struct LinkConfig {
    pub port: String,
    pub baud: u32,
}

impl LinkConfig {
    pub fn new(port: impl Into<String>, baud: u32) -> Self {
        Self {
            port: port.into(),
            baud,
        }
    }
}

/// Open the serial link and wait out the device reset.
pub fn open_link(config: &LinkConfig) -> Result<Box<dyn SerialPort>> {
    let port = serialport::new(config.port.as_str(), config.baud)
        .timeout(READ_TIMEOUT)
        .open()
        .with_context(|| format!("opening serial port {}", config.port))?;
    std::thread::sleep(RESET_SETTLE);
    Ok(port)
}

/// Line assembler over a raw serial port.
///
/// Mirrors the polling discipline of the firmware protocol: check how many
/// bytes are waiting, drain them into a pending string, and hand out one
/// complete line at a time. A quiet port reports `Idle`, never `Closed`: a
/// stalled device keeps the loop polling until the session duration runs out
/// or the process is interrupted.
pub struct SerialLineSource {
    port: Box<dyn SerialPort>,
    pending: String,
}

impl SerialLineSource {
    /// Wrap an open port, discarding anything the device sent before the
    /// session started.
    pub fn new(port: Box<dyn SerialPort>) -> Result<Self> {
        port.clear(ClearBuffer::Input)
            .context("clearing serial input buffer")?;
        Ok(Self {
            port,
            pending: String::new(),
        })
    }
}

impl LineSource for SerialLineSource {
    fn poll_line(&mut self) -> Result<SourcePoll> {
        if let Some(line) = take_line(&mut self.pending) {
            return Ok(SourcePoll::Line(line));
        }
        let waiting = self
            .port
            .bytes_to_read()
            .context("querying serial input")? as usize;
        if waiting == 0 {
            return Ok(SourcePoll::Idle);
        }
        let mut chunk = vec![0u8; waiting.min(4096)];
        let n = match self.port.read(&mut chunk) {
            Ok(n) => n,
            Err(err) if err.kind() == std::io::ErrorKind::TimedOut => 0,
            Err(err) => return Err(err).context("reading serial data"),
        };
        if n == 0 {
            return Ok(SourcePoll::Idle);
        }
        self.pending.push_str(&String::from_utf8_lossy(&chunk[..n]));
        Ok(match take_line(&mut self.pending) {
            Some(line) => SourcePoll::Line(line),
            None => SourcePoll::Idle,
        })
    }
}

fn take_line(pending: &mut String) -> Option<String> {
    let newline = pending.find('\n')?;
    let rest = pending.split_off(newline + 1);
    let mut line = std::mem::replace(pending, rest);
    line.truncate(newline);
    if line.ends_with('\r') {
        line.pop();
    }
    Some(line)
}

/// Send one LED color command byte. The firmware may echo a response line;
/// it is returned as-is, unvalidated, and there is no acknowledgment
/// contract beyond that.
pub fn send_led_command(port: &mut dyn SerialPort, color: LedColor) -> Result<Option<String>> {
    port.write_all(&[color.command_byte()])
        .context("writing LED command")?;
    port.flush().context("flushing LED command")?;
    std::thread::sleep(Duration::from_millis(100));
    let waiting = port.bytes_to_read().unwrap_or(0) as usize;
    if waiting == 0 {
        return Ok(None);
    }
    let mut response = vec![0u8; waiting.min(256)];
    let n = match port.read(&mut response) {
        Ok(n) => n,
        Err(err) if err.kind() == std::io::ErrorKind::TimedOut => 0,
        Err(err) => return Err(err).context("reading LED response"),
    };
    if n == 0 {
        return Ok(None);
    }
    let text = String::from_utf8_lossy(&response[..n]);
    Ok(text.lines().next().map(|line| line.trim().to_string()))
}
