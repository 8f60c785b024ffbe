use super::{to_adc, PulseSensor, SensorError};
use std::io::{ErrorKind, Read};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

/// Reads big-endian `i32` samples from a bench sample server.
pub struct TcpSensor {
    address: String,
    stream: TcpStream,
    buffer: [u8; 4],
    /// Bytes of the current frame received so far. A frame split by a read
    /// timeout is resumed on the next read.
    filled: usize,
}

impl TcpSensor {
    /// Connects with `read_timeout` bounding every read, so a stalled server
    /// costs a tick instead of blocking the loop.
    pub fn connect(address: &str, read_timeout: Duration) -> Result<Self, SensorError> {
        let socket_addr = address
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| SensorError::Read(format!("cannot resolve {}", address)))?;
        let stream = TcpStream::connect_timeout(&socket_addr, read_timeout.max(Duration::from_millis(100)))?;
        stream.set_read_timeout(Some(read_timeout))?;
        stream.set_nodelay(true)?;

        Ok(Self {
            address: address.to_string(),
            stream,
            buffer: [0u8; 4],
            filled: 0,
        })
    }
}

impl PulseSensor for TcpSensor {
    fn read(&mut self) -> Result<u16, SensorError> {
        while self.filled < self.buffer.len() {
            match self.stream.read(&mut self.buffer[self.filled..]) {
                Ok(0) => return Err(SensorError::Exhausted),
                Ok(n) => self.filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                    return Err(SensorError::Read(format!(
                        "no sample from {} within timeout ({} of 4 bytes pending)",
                        self.address, self.filled
                    )))
                }
                Err(e) => return Err(SensorError::Io(e)),
            }
        }
        self.filled = 0;
        to_adc(i32::from_be_bytes(self.buffer) as i64)
    }

    fn describe(&self) -> String {
        format!("tcp sample stream from {}", self.address)
    }
}
