use std::io::{self, Read, Write};
use std::thread;
use std::time::Duration;

use log::debug;
use serialport::SerialPort;
use snafu::ResultExt;

use crate::error::{FaultSnafu, MonitorError, TimeoutSnafu, TransportSnafu};

pub(crate) const BAUD_RATE: u32 = 115_200;

/// Grace period for the target's UART and reset logic after the port opens.
const SETTLE_DELAY: Duration = Duration::from_secs(1);

/// Bound on an ordinary request/reply wait. Waiting for the target to stop
/// running is the exception and retries past this.
const READ_TIMEOUT: Duration = Duration::from_secs(5);

/// First reply token the stub uses to reject a command.
const FAULT_SENTINEL: &str = "x";

/// Tokens of one reply line.
pub type Reply = Vec<String>;

/// Anything that can carry the byte stream to the debug stub. A timed-out
/// read must surface as `io::ErrorKind::TimedOut`.
pub trait Channel: Read + Write {}

impl<T: Read + Write> Channel for T {}

#[derive(PartialEq, Copy, Clone)]
enum Wait {
    Bounded,
    Indefinite,
}

/// Line-oriented request/reply exchange with the debug stub. Strictly one
/// outstanding request: every send is paired with exactly one receive before
/// the next command goes out.
pub struct Link<C: Channel> {
    pub(crate) channel: C,
}

impl Link<Box<dyn SerialPort>> {
    /// Opens the serial device, gives the target a settle interval, then
    /// handshakes with the stub. Only a non-fault reply makes the link usable.
    pub fn open(path: &str) -> Result<Link<Box<dyn SerialPort>>, MonitorError> {
        let port = serialport::new(path, BAUD_RATE)
            .timeout(READ_TIMEOUT)
            .open()
            .map_err(io::Error::from)
            .context(TransportSnafu)?;
        thread::sleep(SETTLE_DELAY);
        let mut link = Link { channel: port };
        link.handshake()?;
        Ok(link)
    }
}

impl<C: Channel> Link<C> {
    pub fn new(channel: C) -> Link<C> {
        Link { channel }
    }

    pub fn handshake(&mut self) -> Result<(), MonitorError> {
        self.transact("h").map(|_| ())
    }

    /// One request, one reply. Fails with `Timeout` if the stub stays silent
    /// past the channel's read timeout.
    pub(crate) fn transact(&mut self, command: &str) -> Result<Reply, MonitorError> {
        self.send(command)?;
        self.recv(Wait::Bounded)
    }

    /// Like `transact`, but keeps waiting past read timeouts. Used while the
    /// target is free-running and the stop reply may be minutes away.
    pub(crate) fn transact_blocking(&mut self, command: &str) -> Result<Reply, MonitorError> {
        self.send(command)?;
        self.recv(Wait::Indefinite)
    }

    pub(crate) fn send(&mut self, command: &str) -> Result<(), MonitorError> {
        debug!("> {}", command);
        let mut line = Vec::with_capacity(command.len() + 1);
        line.extend_from_slice(command.as_bytes());
        line.push(b'\n');
        self.channel.write_all(&line).context(TransportSnafu)?;
        self.channel.flush().context(TransportSnafu)
    }

    fn recv(&mut self, wait: Wait) -> Result<Reply, MonitorError> {
        let line = self.read_line(wait)?;
        let tokens: Vec<String> = line.split_whitespace().map(str::to_owned).collect();
        debug!("< {:?}", tokens);
        if tokens.first().map(String::as_str) == Some(FAULT_SENTINEL) {
            return FaultSnafu.fail();
        }
        Ok(tokens)
    }

    fn read_line(&mut self, wait: Wait) -> Result<String, MonitorError> {
        let mut raw: Vec<u8> = Vec::new();
        let mut byte = [0u8; 1];
        loop {
            match self.channel.read(&mut byte) {
                Ok(0) => {
                    return Err(io::Error::from(io::ErrorKind::UnexpectedEof)).context(TransportSnafu);
                }
                Ok(_) => {
                    if byte[0] == b'\n' {
                        break;
                    }
                    raw.push(byte[0]);
                }
                Err(e) if e.kind() == io::ErrorKind::TimedOut => match wait {
                    Wait::Bounded => return TimeoutSnafu.fail(),
                    Wait::Indefinite => continue,
                },
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e).context(TransportSnafu),
            }
        }
        while raw.last() == Some(&b'\r') {
            raw.pop();
        }
        // The stub speaks a single-byte-per-character encoding.
        Ok(raw.iter().map(|&b| b as char).collect())
    }
}
