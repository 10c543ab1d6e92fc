//! The reauthentication coordinator: one dialog, one answer, many waiters.
//!
//! When the backend rejects a credential, someone has to ask the user
//! whether to refresh the session or log out. A page often fires several
//! requests at once, and if they all carry the same expired token they
//! all fail together. The coordinator makes sure the user is asked once
//! per burst and that everyone waiting hears the same answer.
//!
//! ```text
//!            open_dialog()
//!   Closed ───────────────→ Open { cycle }
//!     ↑                         │
//!     └──── resolve(choice) ────┘   (choice broadcast on the way out)
//! ```
//!
//! Each `Closed → Open` transition starts a new *cycle*. A [`ChoiceStream`]
//! belongs to exactly one cycle: it yields that cycle's choice once and
//! then ends. Streams can only be obtained while the cycle is open, so a
//! late caller never attaches to a cycle that has already been answered.

use std::fmt;
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, watch};

use crate::{SessionConfig, SessionError};

// ---------------------------------------------------------------------------
// Choice / DialogStatus
// ---------------------------------------------------------------------------

/// What the user decided when asked to reauthenticate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Choice {
    /// Mint a new access token from the refresh token and retry.
    Refresh,
    /// Drop the session.
    Logout,
}

impl fmt::Display for Choice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Refresh => f.write_str("refresh"),
            Self::Logout => f.write_str("logout"),
        }
    }
}

/// Whether a dialog is currently waiting for the user.
///
/// Published through [`ReauthCoordinator::watch`] so a presentation
/// surface knows when to show the prompt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DialogStatus {
    #[default]
    Closed,
    Open {
        /// 1-based counter of dialogs opened by this coordinator.
        cycle: u64,
    },
}

impl DialogStatus {
    pub fn is_open(self) -> bool {
        matches!(self, Self::Open { .. })
    }
}

// ---------------------------------------------------------------------------
// ChoiceStream
// ---------------------------------------------------------------------------

/// Receives the choice of one dialog cycle.
pub struct ChoiceStream {
    cycle: u64,
    rx: broadcast::Receiver<Choice>,
}

impl ChoiceStream {
    /// The cycle this stream listens to.
    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    /// Waits for the cycle's choice.
    ///
    /// Returns `Some(choice)` once, then `None` on every later call.
    /// `None` on the first call means the cycle ended without an answer
    /// (the coordinator was dropped).
    pub async fn recv(&mut self) -> Option<Choice> {
        self.rx.recv().await.ok()
    }
}

impl fmt::Debug for ChoiceStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChoiceStream")
            .field("cycle", &self.cycle)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// ReauthCoordinator
// ---------------------------------------------------------------------------

enum DialogState {
    Closed,
    Open {
        cycle: u64,
        tx: broadcast::Sender<Choice>,
    },
}

struct Inner {
    dialog: DialogState,
    cycles: u64,
}

/// Single-flight broker for "the backend rejected our credential, what now?".
///
/// Create one per process and share it behind an `Arc` between the
/// request interceptor and whatever renders the dialog.
///
/// # Example
///
/// ```rust
/// use dojo_session::{Choice, ReauthCoordinator};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let coordinator = ReauthCoordinator::default();
///
/// let mut first = coordinator.open_dialog();
/// let mut second = coordinator.open_dialog(); // joins the same cycle
/// assert_eq!(coordinator.cycles_opened(), 1);
///
/// coordinator.resolve(Choice::Refresh).unwrap();
/// assert_eq!(first.recv().await, Some(Choice::Refresh));
/// assert_eq!(second.recv().await, Some(Choice::Refresh));
/// assert!(!coordinator.is_dialog_open());
/// # }
/// ```
pub struct ReauthCoordinator {
    config: SessionConfig,
    inner: Mutex<Inner>,
    status: watch::Sender<DialogStatus>,
}

impl ReauthCoordinator {
    pub fn new(config: SessionConfig) -> Self {
        let (status, _) = watch::channel(DialogStatus::Closed);
        Self {
            config,
            inner: Mutex::new(Inner {
                dialog: DialogState::Closed,
                cycles: 0,
            }),
            status,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// `true` between a dialog being opened and its choice being broadcast.
    pub fn is_dialog_open(&self) -> bool {
        matches!(self.inner.lock().dialog, DialogState::Open { .. })
    }

    pub fn status(&self) -> DialogStatus {
        *self.status.borrow()
    }

    /// Subscribes to open/close transitions.
    pub fn watch(&self) -> watch::Receiver<DialogStatus> {
        self.status.subscribe()
    }

    /// How many dialogs this coordinator has opened so far.
    pub fn cycles_opened(&self) -> u64 {
        self.inner.lock().cycles
    }

    /// Opens a dialog, or joins the one already open.
    ///
    /// Calling this while a dialog is open does NOT start a second cycle:
    /// the returned stream listens to the existing one.
    pub fn open_dialog(&self) -> ChoiceStream {
        let mut inner = self.inner.lock();
        if let DialogState::Open { cycle, tx } = &inner.dialog {
            return ChoiceStream {
                cycle: *cycle,
                rx: tx.subscribe(),
            };
        }
        self.open_locked(&mut inner)
    }

    /// Opens a dialog only if none is open.
    ///
    /// Returns `None` when a cycle is already in flight. The check and
    /// the open happen under one lock, so among any number of concurrent
    /// callers exactly one gets `Some`.
    pub fn try_open_dialog(&self) -> Option<ChoiceStream> {
        let mut inner = self.inner.lock();
        if matches!(inner.dialog, DialogState::Open { .. }) {
            return None;
        }
        Some(self.open_locked(&mut inner))
    }

    /// Joins the open cycle without opening one.
    pub fn subscribe(&self) -> Option<ChoiceStream> {
        match &self.inner.lock().dialog {
            DialogState::Open { cycle, tx } => Some(ChoiceStream {
                cycle: *cycle,
                rx: tx.subscribe(),
            }),
            DialogState::Closed => None,
        }
    }

    /// Broadcasts the user's choice and closes the dialog.
    ///
    /// Returns how many streams received the choice.
    ///
    /// # Errors
    /// [`SessionError::DialogNotOpen`] if no dialog is open. Every open
    /// cycle must be resolved exactly once.
    pub fn resolve(&self, choice: Choice) -> Result<usize, SessionError> {
        self.resolve_matching(None, choice)
    }

    /// Like [`resolve`](Self::resolve), but only if `cycle` is the dialog
    /// still open.
    ///
    /// A presenter should answer with the cycle it prompted for: if that
    /// dialog timed out and a new one opened in the meantime, the answer
    /// must not be applied to a question the user never saw.
    ///
    /// # Errors
    /// [`SessionError::DialogNotOpen`] if no dialog is open or a different
    /// cycle is.
    pub fn resolve_cycle(&self, cycle: u64, choice: Choice) -> Result<usize, SessionError> {
        self.resolve_matching(Some(cycle), choice)
    }

    /// Waits for the choice on `stream`, honoring the configured
    /// [`dialog_timeout`](SessionConfig::dialog_timeout).
    ///
    /// On timeout the cycle is resolved with
    /// [`timeout_choice`](SessionConfig::timeout_choice), which releases
    /// every other waiter too. `None` means the cycle ended with no
    /// answer at all.
    pub async fn wait(&self, mut stream: ChoiceStream) -> Option<Choice> {
        let Some(limit) = self.config.dialog_timeout else {
            return stream.recv().await;
        };

        match tokio::time::timeout(limit, stream.recv()).await {
            Ok(choice) => choice,
            Err(_) => self.expire(stream, limit),
        }
    }

    fn expire(&self, mut stream: ChoiceStream, limit: Duration) -> Option<Choice> {
        let fallback = self.config.timeout_choice;
        match self.resolve_matching(Some(stream.cycle), fallback) {
            Ok(_) => {
                tracing::warn!(
                    cycle = stream.cycle,
                    ?limit,
                    %fallback,
                    "reauthentication dialog timed out"
                );
                Some(fallback)
            }
            // The user answered between the timer firing and us taking
            // the lock; their choice is already sitting in the stream.
            Err(_) => stream.rx.try_recv().ok(),
        }
    }

    fn open_locked(&self, inner: &mut Inner) -> ChoiceStream {
        inner.cycles += 1;
        let cycle = inner.cycles;
        // Capacity 1: exactly one value is ever sent per cycle.
        let (tx, rx) = broadcast::channel(1);
        inner.dialog = DialogState::Open { cycle, tx };
        self.status.send_replace(DialogStatus::Open { cycle });
        tracing::info!(cycle, "reauthentication dialog opened");
        ChoiceStream { cycle, rx }
    }

    /// Resolves the open cycle, optionally only if it is `expected`.
    fn resolve_matching(
        &self,
        expected: Option<u64>,
        choice: Choice,
    ) -> Result<usize, SessionError> {
        let mut inner = self.inner.lock();
        let (cycle, tx) =
            match std::mem::replace(&mut inner.dialog, DialogState::Closed) {
                DialogState::Open { cycle, tx }
                    if expected.map_or(true, |want| want == cycle) =>
                {
                    (cycle, tx)
                }
                other => {
                    inner.dialog = other;
                    return Err(SessionError::DialogNotOpen);
                }
            };

        // `send` only fails when nobody is listening, which is fine.
        let delivered = tx.send(choice).unwrap_or(0);
        // Dropping the sender ends every stream of this cycle after the
        // choice has been read.
        drop(tx);
        self.status.send_replace(DialogStatus::Closed);
        drop(inner);

        tracing::info!(cycle, %choice, delivered, "reauthentication dialog resolved");
        Ok(delivered)
    }
}

impl Default for ReauthCoordinator {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}

impl fmt::Debug for ReauthCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReauthCoordinator")
            .field("status", &self.status())
            .field("cycles_opened", &self.cycles_opened())
            .finish()
    }
}
