//! Where termination notifications come from.

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::MonitorError;
use crate::domain::{TerminationRequest, TerminationSignal};

/// One delivery from a notification source: a request, or a fault of the
/// notification mechanism itself.
pub type Notification = std::result::Result<TerminationRequest, MonitorError>;

/// Sending side of a [`ChannelSource`].
pub type NotificationSender = mpsc::UnboundedSender<Notification>;

/// A stream of termination notifications.
#[async_trait]
pub trait NotificationSource: Send {
    /// Wait for the next notification. `None` means the source is exhausted.
    async fn next(&mut self) -> Option<Notification>;
}

#[async_trait]
impl NotificationSource for Box<dyn NotificationSource> {
    async fn next(&mut self) -> Option<Notification> {
        (**self).next().await
    }
}

/// Notifications fed through an in-process channel.
///
/// Lets embedders deliver their own termination requests, and tests inject
/// requests and faults at precise points.
pub struct ChannelSource {
    rx: mpsc::UnboundedReceiver<Notification>,
}

impl ChannelSource {
    pub fn new() -> (NotificationSender, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        (tx, Self { rx })
    }
}

#[async_trait]
impl NotificationSource for ChannelSource {
    async fn next(&mut self) -> Option<Notification> {
        self.rx.recv().await
    }
}

/// SIGINT, SIGTERM and SIGQUIT delivered by the operating system.
#[cfg(unix)]
pub struct OsSignalSource {
    interrupt: tokio::signal::unix::Signal,
    terminate: tokio::signal::unix::Signal,
    quit: tokio::signal::unix::Signal,
}

#[cfg(unix)]
impl OsSignalSource {
    /// Register interest in all three signals. Must run inside a tokio runtime.
    pub fn install() -> std::result::Result<Self, MonitorError> {
        use tokio::signal::unix::{SignalKind, signal};

        let register = |kind: SignalKind, which: TerminationSignal| {
            signal(kind).map_err(|source| MonitorError::Install {
                signal: which,
                source,
            })
        };
        Ok(Self {
            interrupt: register(SignalKind::interrupt(), TerminationSignal::Interrupt)?,
            terminate: register(SignalKind::terminate(), TerminationSignal::Terminate)?,
            quit: register(SignalKind::quit(), TerminationSignal::Quit)?,
        })
    }
}

#[cfg(unix)]
#[async_trait]
impl NotificationSource for OsSignalSource {
    async fn next(&mut self) -> Option<Notification> {
        let received = tokio::select! {
            got = self.interrupt.recv() => got.map(|()| TerminationSignal::Interrupt),
            got = self.terminate.recv() => got.map(|()| TerminationSignal::Terminate),
            got = self.quit.recv() => got.map(|()| TerminationSignal::Quit),
        };
        received.map(|signal| Ok(TerminationRequest::new(signal)))
    }
}

/// Ctrl-C only; the other signals do not exist on this platform.
#[cfg(not(unix))]
pub struct OsSignalSource {
    installed: bool,
}

#[cfg(not(unix))]
impl OsSignalSource {
    pub fn install() -> std::result::Result<Self, MonitorError> {
        Ok(Self { installed: true })
    }
}

#[cfg(not(unix))]
#[async_trait]
impl NotificationSource for OsSignalSource {
    async fn next(&mut self) -> Option<Notification> {
        if !self.installed {
            return None;
        }
        match tokio::signal::ctrl_c().await {
            Ok(()) => Some(Ok(TerminationRequest::new(TerminationSignal::Interrupt))),
            Err(err) => Some(Err(MonitorError::Notification(err.to_string()))),
        }
    }
}
