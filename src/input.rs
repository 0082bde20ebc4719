//! Keyboard input.
//!
//! A dedicated thread owns the raw-mode terminal and blocks on key reads,
//! handing presses to the session loop through a bounded queue. The only
//! other shared state is the quit flag, which either side may set.

use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    terminal,
};
use std::{
    io,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
        mpsc::{self, Receiver, RecvTimeoutError, SyncSender, TrySendError},
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use crate::error::TerminalError;

pub const QUEUE_CAPACITY: usize = 32;
/// How long a single terminal poll may block before the quit flag is checked again.
const READ_POLL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    TogglePause,
    AddMinute,
    Skip,
    Quit,
}

impl Command {
    /// `None` for keys the timer does not react to.
    pub fn from_key(key: &KeyEvent) -> Option<Self> {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            return Some(Self::Quit);
        }
        match key.code {
            KeyCode::Char('p') | KeyCode::Char('P') => Some(Self::TogglePause),
            KeyCode::Char('+') => Some(Self::AddMinute),
            KeyCode::Char('n') | KeyCode::Char('N') => Some(Self::Skip),
            KeyCode::Char('q') | KeyCode::Char('Q') => Some(Self::Quit),
            _ => None,
        }
    }
}

/// Where the session loop gets its key presses from.
pub trait KeySource {
    /// Waits at most `timeout` for a key. `None` means no event this tick.
    fn next_key(&mut self, timeout: Duration) -> Option<KeyEvent>;
    fn quit_requested(&self) -> bool;
    fn request_quit(&self);
}

// ============================================================================
// Raw Mode
// ============================================================================

/// Unbuffered, no-echo terminal for as long as the guard lives.
pub struct RawModeGuard {
    _private: (),
}

impl RawModeGuard {
    pub fn enable() -> Result<Self, TerminalError> {
        if let Err(e) = terminal::enable_raw_mode() {
            // Best effort, in case the mode was partially applied.
            let _ = terminal::disable_raw_mode();
            return Err(TerminalError::RawMode(e));
        }
        Ok(Self { _private: () })
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        if let Err(e) = terminal::disable_raw_mode() {
            log::error!("Failed to restore terminal mode: {}", e);
        }
    }
}

// ============================================================================
// Keyboard Thread
// ============================================================================

pub struct InputChannel {
    rx: Receiver<KeyEvent>,
    quit: Arc<AtomicBool>,
    handle: Option<JoinHandle<io::Result<()>>>,
}

impl InputChannel {
    /// Puts the terminal into raw mode and starts reading keys. The mode is
    /// restored when the keyboard thread exits.
    pub fn spawn(capacity: usize) -> Result<Self, TerminalError> {
        let guard = RawModeGuard::enable()?;
        Self::start(capacity, read_terminal_key, Some(guard))
    }

    fn start<F>(capacity: usize, read_key: F, guard: Option<RawModeGuard>) -> Result<Self, TerminalError>
    where
        F: FnMut() -> io::Result<Option<KeyEvent>> + Send + 'static,
    {
        let (tx, rx) = mpsc::sync_channel(capacity);
        let quit = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&quit);

        let handle = thread::Builder::new()
            .name("keyboard".into())
            .spawn(move || {
                let _guard = guard;
                log::debug!("Keyboard thread started");
                let result = pump(read_key, &tx, &flag);
                log::debug!("Keyboard thread stopped");
                result
            })
            .map_err(TerminalError::Spawn)?;

        Ok(Self { rx, quit, handle: Some(handle) })
    }

    /// Stops the keyboard thread and reports why it ended if it was not a
    /// clean shutdown.
    pub fn close(mut self) -> Result<(), TerminalError> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> Result<(), TerminalError> {
        self.quit.store(true, Ordering::SeqCst);
        let Some(handle) = self.handle.take() else {
            return Ok(());
        };
        match handle.join() {
            Ok(result) => result.map_err(TerminalError::Input),
            Err(_) => Err(TerminalError::Input(io::Error::other("keyboard thread panicked"))),
        }
    }
}

impl Drop for InputChannel {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            log::error!("{}", e);
        }
    }
}

impl KeySource for InputChannel {
    fn next_key(&mut self, timeout: Duration) -> Option<KeyEvent> {
        match self.rx.recv_timeout(timeout) {
            Ok(key) => Some(key),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => {
                // Keyboard thread is gone, so nothing could ever quit by key.
                self.quit.store(true, Ordering::SeqCst);
                None
            }
        }
    }

    fn quit_requested(&self) -> bool {
        self.quit.load(Ordering::SeqCst)
    }

    fn request_quit(&self) {
        self.quit.store(true, Ordering::SeqCst);
    }
}

fn read_terminal_key() -> io::Result<Option<KeyEvent>> {
    if !event::poll(READ_POLL)? {
        return Ok(None);
    }
    match event::read()? {
        Event::Key(key) if key.kind == KeyEventKind::Press => Ok(Some(key)),
        _ => Ok(None),
    }
}

/// Reads keys until quit is requested, the reader fails, or the session
/// side hangs up. A quit key sets the flag before it is queued, and so does
/// a read error, which is handed back to whoever joins the thread.
fn pump<F>(mut read_key: F, tx: &SyncSender<KeyEvent>, quit: &AtomicBool) -> io::Result<()>
where
    F: FnMut() -> io::Result<Option<KeyEvent>>,
{
    while !quit.load(Ordering::SeqCst) {
        let key = match read_key() {
            Ok(Some(key)) => key,
            Ok(None) => continue,
            Err(e) => {
                log::error!("Keyboard read failed: {}", e);
                quit.store(true, Ordering::SeqCst);
                return Err(e);
            }
        };

        if Command::from_key(&key) == Some(Command::Quit) {
            quit.store(true, Ordering::SeqCst);
        }

        match tx.try_send(key) {
            Ok(()) => {}
            Err(TrySendError::Full(key)) => log::warn!("Key queue full, dropping {:?}", key.code),
            Err(TrySendError::Disconnected(_)) => break,
        }
    }
    Ok(())
}

// ============================================================================
// Non-interactive Mode
// ============================================================================

/// Key source for `--passive`: never produces keys, only paces the loop.
#[derive(Default)]
pub struct Passive {
    quit: Arc<AtomicBool>,
}

impl Passive {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared flag for a signal handler to set.
    pub fn quit_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.quit)
    }
}

impl KeySource for Passive {
    fn next_key(&mut self, timeout: Duration) -> Option<KeyEvent> {
        let mut left = timeout;
        while !left.is_zero() && !self.quit_requested() {
            let step = left.min(READ_POLL);
            thread::sleep(step);
            left -= step;
        }
        None
    }

    fn quit_requested(&self) -> bool {
        self.quit.load(Ordering::SeqCst)
    }

    fn request_quit(&self) {
        self.quit.store(true, Ordering::SeqCst);
    }
}
