use log::warn;
use tokio::sync::watch;

/// One-way switch for the remote reasoning stage. Once tripped it stays
/// tripped for the lifetime of the session that owns it.
#[derive(Debug)]
pub struct Breaker {
    tripped: watch::Sender<bool>,
}

impl Breaker {
    pub fn new() -> Breaker {
        let (tripped, _) = watch::channel(false);
        Breaker { tripped }
    }

    pub fn is_tripped(&self) -> bool {
        *self.tripped.borrow()
    }

    /// Returns true only for the call that actually flipped the switch.
    pub fn trip(&self, reason: &str) -> bool {
        let flipped = self.tripped.send_if_modified(|tripped| {
            if *tripped {
                return false;
            }
            *tripped = true;
            true
        });
        if flipped {
            warn!("remote reasoning disabled for this session: {reason}");
        }
        flipped
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tripped.subscribe()
    }
}

impl Default for Breaker {
    fn default() -> Self {
        Breaker::new()
    }
}
