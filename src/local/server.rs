use crate::config::Config;
use crate::sensor::{PulseSensor, SimulatedSensor};
use log::{info, warn};
use std::io::{self, Write};
use std::net::{TcpListener, TcpStream};
use std::thread;
use std::time::Duration;

// -----------------------------------------------------------------------------
// RUN CODE
// -----------------------------------------------------------------------------

/// Serves a synthetic pulse waveform on `sensor.tcp_address` until killed.
pub fn run(config: &Config) -> io::Result<()> {
    let listener = TcpListener::bind(&config.sensor.tcp_address)?;
    info!(
        "streaming simulated pulse at {:.0} bpm on {}",
        config.sensor.simulated_bpm, config.sensor.tcp_address
    );

    serve(
        listener,
        config.sensor.simulated_bpm,
        config.sampling.sample_rate_hz,
        config.sampling.sample_period(),
        None,
    )
}

/// Accepts clients forever, one streaming thread each. Every client gets its
/// own waveform starting at phase zero.
pub fn serve(
    listener: TcpListener,
    bpm: f64,
    sample_rate_hz: u32,
    pace: Duration,
    max_samples: Option<usize>,
) -> io::Result<()> {
    for stream in listener.incoming() {
        let stream = stream?;
        let peer = stream
            .peer_addr()
            .map(|addr| addr.to_string())
            .unwrap_or_else(|_| "unknown peer".to_string());
        info!("client connected: {}", peer);

        thread::spawn(move || {
            let mut sensor = SimulatedSensor::new(bpm, sample_rate_hz);
            match send_samples(stream, &mut sensor, pace, max_samples) {
                Ok(sent) => info!("client {} done after {} samples", peer, sent),
                Err(e) => warn!("client {} dropped: {}", peer, e),
            }
        });
    }

    Ok(())
}

// -----------------------------------------------------------------------------
// SENDING SAMPLES
// -----------------------------------------------------------------------------

fn send_samples(
    mut stream: TcpStream,
    sensor: &mut SimulatedSensor,
    pace: Duration,
    max_samples: Option<usize>,
) -> io::Result<usize> {
    stream.set_nodelay(true)?;
    let sent = write_samples(&mut stream, sensor, pace, max_samples)?;
    stream.flush()?;
    Ok(sent)
}

/// Writes samples as big-endian `i32`, pausing `pace` between them.
pub fn write_samples<W: Write, S: PulseSensor>(
    out: &mut W,
    sensor: &mut S,
    pace: Duration,
    max_samples: Option<usize>,
) -> io::Result<usize> {
    let mut sent = 0;
    while max_samples.map_or(true, |max| sent < max) {
        let value = sensor
            .read()
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;
        out.write_all(&(value as i32).to_be_bytes())?;
        sent += 1;

        if !pace.is_zero() {
            thread::sleep(pace);
        }
    }
    Ok(sent)
}
