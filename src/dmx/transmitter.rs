// Copyright (C) 2025 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

use std::net::{SocketAddr, UdpSocket};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, Receiver, Sender};
use parking_lot::Mutex;
use tracing::{debug, error, info};

use crate::cancel::CancelHandle;

use super::artnet;
use super::error::DmxError;
use super::fade::{ChannelChange, FadeEngine};
use super::universe::{DmxFrame, UniverseId};

/// Minimum spacing between sends, capping output at 40Hz.
const MIN_SEND_INTERVAL: Duration = Duration::from_millis(25);

/// Interval for forced full-frame sends when `needs_refresh` is set. Some
/// hardware blacks out if it stops hearing frames.
const REFRESH_INTERVAL: Duration = Duration::from_millis(1000);

/// How long an idle transmitter sleeps between cancellation checks.
const IDLE_POLL: Duration = Duration::from_millis(250);

/// After this many consecutive send errors the transmitter shuts down.
const MAX_CONSECUTIVE_ERRORS: u32 = 20;

/// The configuration for a universe transmitter.
#[derive(Debug, Clone)]
pub struct TransmitterConfig {
    /// The universe this transmitter owns.
    pub universe: UniverseId,
    /// The UDP destination, unicast or broadcast.
    pub destination: SocketAddr,
    /// Whether the socket should be opened with broadcast permission.
    pub broadcast: bool,
    /// Whether to force a full send every second regardless of dirty state.
    pub needs_refresh: bool,
}

/// The externally visible state of a transmitter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransmitterStatus {
    Running,
    Terminated { message: String },
}

/// Called synchronously after each successful send with the changed
/// (channel, byte) pairs. Listeners must not block.
pub type ChangeListener = Box<dyn Fn(UniverseId, &[(u16, u8)]) + Send + Sync>;

struct TransmitterShared {
    fade: Mutex<FadeEngine>,
    status: Mutex<TransmitterStatus>,
    listeners: Mutex<Vec<ChangeListener>>,
    frames_sent: AtomicU64,
}

/// One transmitter per universe: owns the fade engine and a dedicated output
/// thread that services a conflated wakeup signal.
pub struct UniverseTransmitter {
    universe: UniverseId,
    destination: SocketAddr,
    shared: Arc<TransmitterShared>,
    wakeup: Sender<()>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl UniverseTransmitter {
    /// Creates the transmitter and starts its output thread.
    pub fn new(config: TransmitterConfig, cancel_handle: CancelHandle) -> UniverseTransmitter {
        let shared = Arc::new(TransmitterShared {
            fade: Mutex::new(FadeEngine::new(Instant::now())),
            status: Mutex::new(TransmitterStatus::Running),
            listeners: Mutex::new(Vec::new()),
            frames_sent: AtomicU64::new(0),
        });

        // The wakeup channel is conflated: a full channel already means
        // "transmission needed", so additional signals are dropped.
        let (wakeup, wakeup_receiver) = bounded::<()>(1);

        let handle = {
            let shared = shared.clone();
            let config = config.clone();
            thread::spawn(move || {
                Self::run(config, shared, wakeup_receiver, cancel_handle);
            })
        };

        UniverseTransmitter {
            universe: config.universe,
            destination: config.destination,
            shared,
            wakeup,
            handle: Mutex::new(Some(handle)),
        }
    }

    pub fn universe(&self) -> UniverseId {
        self.universe
    }

    pub fn destination(&self) -> SocketAddr {
        self.destination
    }

    /// Stages a channel change and signals the output thread.
    pub fn set(&self, channel: u16, change: ChannelChange) -> Result<(), DmxError> {
        self.stage(channel, change)?;
        self.wake();
        Ok(())
    }

    /// Stages a channel change without waking the output thread. Used by
    /// transactions so a batch signals each universe exactly once.
    pub fn stage(&self, channel: u16, change: ChannelChange) -> Result<(), DmxError> {
        if let TransmitterStatus::Terminated { message } = self.status() {
            return Err(DmxError::TransmitterTerminated {
                universe: self.universe,
                message,
            });
        }
        self.shared.fade.lock().set(channel, change)
    }

    /// Signals the output thread that transmission is needed.
    pub fn wake(&self) {
        // A full channel means a wakeup is already pending.
        let _ = self.wakeup.try_send(());
    }

    /// A read-only view of the current materialized bytes.
    pub fn snapshot(&self) -> DmxFrame {
        self.shared.fade.lock().snapshot()
    }

    /// The materialized byte for a single 1-based channel.
    pub fn value(&self, channel: u16) -> Result<u8, DmxError> {
        self.shared.fade.lock().value(channel)
    }

    /// Registers a channel-change listener.
    pub fn add_listener(&self, listener: ChangeListener) {
        self.shared.listeners.lock().push(listener);
    }

    pub fn status(&self) -> TransmitterStatus {
        self.shared.status.lock().clone()
    }

    pub fn frames_sent(&self) -> u64 {
        self.shared.frames_sent.load(Ordering::Relaxed)
    }

    /// Joins the output thread. Callers must cancel the handle first.
    pub fn join(&self) {
        if let Some(handle) = self.handle.lock().take() {
            if handle.join().is_err() {
                error!(universe = %self.universe, "Error joining transmitter thread");
            }
        }
    }

    fn run(
        config: TransmitterConfig,
        shared: Arc<TransmitterShared>,
        wakeup: Receiver<()>,
        cancel_handle: CancelHandle,
    ) {
        let socket = match Self::open_socket(&config) {
            Ok(socket) => socket,
            Err(message) => {
                error!(universe = %config.universe, message, "Unable to open transmitter socket");
                *shared.status.lock() = TransmitterStatus::Terminated { message };
                return;
            }
        };

        info!(
            universe = %config.universe,
            destination = %config.destination,
            "DMX transmitter started"
        );

        let mut sequence: u8 = 0;
        let mut last_send: Option<Instant> = None;
        let mut last_full_send = Instant::now();
        let mut consecutive_errors: u32 = 0;

        loop {
            if cancel_handle.is_cancelled() {
                return;
            }

            let busy = {
                let fade = shared.fade.lock();
                fade.any_fading() || fade.has_dirty()
            };
            let timeout = if busy {
                MIN_SEND_INTERVAL
            } else if config.needs_refresh {
                REFRESH_INTERVAL.saturating_sub(last_full_send.elapsed())
            } else {
                IDLE_POLL
            };
            let _ = wakeup.recv_timeout(timeout);

            if cancel_handle.is_cancelled() {
                return;
            }

            // Enforce the inter-send floor.
            if let Some(last) = last_send {
                let elapsed = last.elapsed();
                if elapsed < MIN_SEND_INTERVAL {
                    spin_sleep::sleep(MIN_SEND_INTERVAL - elapsed);
                }
            }

            let now = Instant::now();
            let refresh_due =
                config.needs_refresh && now.duration_since(last_full_send) >= REFRESH_INTERVAL;
            let (frame, changes) = {
                let mut fade = shared.fade.lock();
                fade.tick(now);
                let changes = fade.drain_dirty();
                (fade.snapshot(), changes)
            };

            if changes.is_empty() && !refresh_due {
                continue;
            }

            let packet = artnet::artdmx_packet(sequence, config.universe, &frame);
            match socket.send_to(&packet, config.destination) {
                Ok(_) => {
                    sequence = sequence.wrapping_add(1);
                    last_send = Some(now);
                    last_full_send = now;
                    consecutive_errors = 0;
                    shared.frames_sent.fetch_add(1, Ordering::Relaxed);

                    if !changes.is_empty() {
                        for listener in shared.listeners.lock().iter() {
                            listener(config.universe, &changes);
                        }
                    }
                }
                Err(err) => {
                    shared.fade.lock().restore_dirty(&changes);
                    consecutive_errors += 1;
                    if consecutive_errors == 1 {
                        error!(
                            universe = %config.universe,
                            err = err.to_string(),
                            "Error sending DMX packet"
                        );
                    } else {
                        debug!(
                            universe = %config.universe,
                            consecutive_errors,
                            "Suppressed DMX send error"
                        );
                    }
                    if consecutive_errors >= MAX_CONSECUTIVE_ERRORS {
                        let message = format!(
                            "{} consecutive send errors, last: {}",
                            consecutive_errors, err
                        );
                        error!(universe = %config.universe, message, "DMX transmitter terminated");
                        *shared.status.lock() =
                            TransmitterStatus::Terminated { message };
                        return;
                    }
                }
            }
        }
    }

    fn open_socket(config: &TransmitterConfig) -> Result<UdpSocket, String> {
        let socket = UdpSocket::bind(("0.0.0.0", 0)).map_err(|err| err.to_string())?;
        if config.broadcast {
            socket.set_broadcast(true).map_err(|err| err.to_string())?;
        }
        Ok(socket)
    }
}

#[cfg(test)]
mod test {
    use std::net::{Ipv4Addr, SocketAddr};
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    use super::*;

    fn local_receiver() -> (UdpSocket, SocketAddr) {
        let socket = UdpSocket::bind(SocketAddr::new(
            std::net::IpAddr::V4(Ipv4Addr::LOCALHOST),
            0,
        ))
        .unwrap();
        socket
            .set_read_timeout(Some(Duration::from_secs(2)))
            .unwrap();
        let addr = socket.local_addr().unwrap();
        (socket, addr)
    }

    fn transmitter(
        destination: SocketAddr,
        cancel_handle: CancelHandle,
    ) -> UniverseTransmitter {
        UniverseTransmitter::new(
            TransmitterConfig {
                universe: UniverseId::new(0, 1).unwrap(),
                destination,
                broadcast: false,
                needs_refresh: false,
            },
            cancel_handle,
        )
    }

    #[test]
    fn test_set_transmits_frame() {
        let (receiver, addr) = local_receiver();
        let cancel_handle = CancelHandle::new();
        let transmitter = transmitter(addr, cancel_handle.clone());

        transmitter.set(1, ChannelChange::set(200)).unwrap();

        let mut buffer = [0u8; 1024];
        let (len, _) = receiver.recv_from(&mut buffer).unwrap();
        assert_eq!(len, 18 + 512);
        assert_eq!(&buffer[0..8], b"Art-Net\0");
        assert_eq!(buffer[14], 0x01);
        assert_eq!(buffer[18], 200);

        cancel_handle.cancel();
        transmitter.wake();
        transmitter.join();
    }

    #[test]
    fn test_listener_receives_changes() {
        let (receiver, addr) = local_receiver();
        let cancel_handle = CancelHandle::new();
        let transmitter = transmitter(addr, cancel_handle.clone());

        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_count = Arc::new(AtomicUsize::new(0));
        {
            let seen = seen.clone();
            let seen_count = seen_count.clone();
            transmitter.add_listener(Box::new(move |_, changes| {
                seen.lock().extend_from_slice(changes);
                seen_count.fetch_add(1, Ordering::SeqCst);
            }));
        }

        transmitter.set(5, ChannelChange::set(99)).unwrap();

        let mut buffer = [0u8; 1024];
        receiver.recv_from(&mut buffer).unwrap();

        // The listener runs synchronously right after the send.
        let deadline = Instant::now() + Duration::from_secs(1);
        while seen_count.load(Ordering::SeqCst) == 0 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(seen.lock().as_slice(), &[(5u16, 99u8)]);

        cancel_handle.cancel();
        transmitter.wake();
        transmitter.join();
    }

    #[test]
    fn test_fade_produces_multiple_frames() {
        let (receiver, addr) = local_receiver();
        let cancel_handle = CancelHandle::new();
        let transmitter = transmitter(addr, cancel_handle.clone());

        transmitter
            .set(1, ChannelChange::fade(200, Duration::from_millis(200)))
            .unwrap();

        let mut buffer = [0u8; 1024];
        let mut last_value = 0u8;
        let mut frames = 0;
        while last_value < 200 {
            receiver.recv_from(&mut buffer).unwrap();
            let value = buffer[18];
            assert!(value >= last_value, "fade went backwards on the wire");
            last_value = value;
            frames += 1;
        }
        assert_eq!(last_value, 200);
        // A 200ms fade at a 25ms send floor needs several frames.
        assert!(frames > 2, "expected multiple frames, got {}", frames);

        cancel_handle.cancel();
        transmitter.wake();
        transmitter.join();
    }

    #[test]
    fn test_status_running() {
        let (_receiver, addr) = local_receiver();
        let cancel_handle = CancelHandle::new();
        let transmitter = transmitter(addr, cancel_handle.clone());
        assert_eq!(transmitter.status(), TransmitterStatus::Running);

        cancel_handle.cancel();
        transmitter.wake();
        transmitter.join();
    }
}
