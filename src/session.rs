//! The session loop: one tick merges at most one key press, the countdown,
//! the status line and reminders.

use crossterm::event::KeyEvent;

use crate::clock::Clock;
use crate::config::Config;
use crate::input::{Command, KeySource};
use crate::notify::Notifier;
use crate::timer::{Notice, TimerState};
use crate::ui::{Renderer, Status};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

pub struct Session<C, N, R> {
    config: Config,
    clock: C,
    notifier: N,
    renderer: R,
    timer: TimerState,
    interactive: bool,
}

impl<C: Clock, N: Notifier, R: Renderer> Session<C, N, R> {
    /// Starts the first work period and draws it.
    pub fn start(config: Config, clock: C, notifier: N, renderer: R, interactive: bool) -> Self {
        let (timer, notice) = TimerState::start(config, clock.now());
        let mut session = Self { config, clock, notifier, renderer, timer, interactive };
        session.announce(&notice);
        session.draw();
        session
    }

    #[cfg(test)]
    pub fn timer(&self) -> &TimerState {
        &self.timer
    }

    #[cfg(test)]
    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn into_renderer(self) -> R {
        self.renderer
    }

    /// Runs until a quit key arrives or the quit flag is raised elsewhere.
    pub fn run<K: KeySource>(&mut self, keys: &mut K) {
        let tick = self.config.tick_interval();
        while !keys.quit_requested() {
            let key = keys.next_key(tick);
            if self.tick(key) == Flow::Quit {
                break;
            }
        }
        keys.request_quit();
        log::info!(
            "Session finished in {} after {} work periods since the last long break",
            self.timer.phase(),
            self.timer.rep_count()
        );
    }

    pub fn tick(&mut self, key: Option<KeyEvent>) -> Flow {
        let now = self.clock.now();

        if let Some(command) = key.as_ref().and_then(Command::from_key) {
            if self.apply(command) == Flow::Quit {
                return Flow::Quit;
            }
        }

        if self.timer.is_paused() {
            self.timer.hold(now);
        } else if let Some(notice) = self.timer.advance(now) {
            self.announce(&notice);
        }

        self.draw();

        if let Some(notice) = self.timer.check_reminder(now) {
            self.announce(&notice);
        }
        Flow::Continue
    }

    fn apply(&mut self, command: Command) -> Flow {
        if !self.interactive {
            return Flow::Continue;
        }
        let now = self.clock.now();
        match command {
            Command::TogglePause => {
                if let Some(notice) = self.timer.toggle_pause(now) {
                    self.announce(&notice);
                }
            }
            Command::AddMinute => {
                self.timer.add_minute();
            }
            Command::Skip => {
                self.timer.skip(now);
            }
            Command::Quit => {
                log::info!("Quit requested");
                return Flow::Quit;
            }
        }
        Flow::Continue
    }

    fn announce(&self, notice: &Notice) {
        self.notifier.notify(&notice.title(), notice.body());
    }

    fn draw(&mut self) {
        let status = Status {
            phase: self.timer.phase(),
            remaining: self.timer.remaining(),
            interactive: self.interactive,
        };
        self.renderer.render(&status);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::Timestamp;
    use crate::countdown::Remaining;
    use crate::timer::Phase;
    use chrono::{Duration, Local, TimeZone};
    use crossterm::event::{KeyCode, KeyModifiers};
    use std::{
        cell::{Cell, RefCell},
        collections::VecDeque,
        rc::Rc,
    };

    #[derive(Clone)]
    struct ManualClock(Rc<Cell<Timestamp>>);

    impl ManualClock {
        fn advance(&self, by: Duration) {
            self.0.set(self.0.get() + by);
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> Timestamp {
            self.0.get()
        }
    }

    #[derive(Clone, Default)]
    struct Recorder(Rc<RefCell<Vec<String>>>);

    impl Recorder {
        fn take(&self) -> Vec<String> {
            self.0.borrow_mut().drain(..).collect()
        }
    }

    impl Notifier for Recorder {
        fn notify(&self, title: &str, _body: &str) {
            self.0.borrow_mut().push(title.to_string());
        }
    }

    #[derive(Default)]
    struct Screen(Vec<Status>);

    impl Renderer for Screen {
        fn render(&mut self, status: &Status) {
            self.0.push(*status);
        }
    }

    struct Script {
        keys: VecDeque<Option<char>>,
        clock: ManualClock,
        quit: Cell<bool>,
    }

    impl KeySource for Script {
        fn next_key(&mut self, timeout: std::time::Duration) -> Option<KeyEvent> {
            self.clock.advance(Duration::from_std(timeout).unwrap());
            match self.keys.pop_front() {
                Some(key) => key.map(press),
                None => {
                    self.quit.set(true);
                    None
                }
            }
        }

        fn quit_requested(&self) -> bool {
            self.quit.get()
        }

        fn request_quit(&self) {
            self.quit.set(true);
        }
    }

    fn press(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE)
    }

    fn t0() -> Timestamp {
        Local.with_ymd_and_hms(2024, 3, 4, 9, 0, 0).unwrap()
    }

    fn session(interactive: bool) -> (Session<ManualClock, Recorder, Screen>, ManualClock, Recorder) {
        let clock = ManualClock(Rc::new(Cell::new(t0())));
        let notes = Recorder::default();
        let session = Session::start(
            Config::default(),
            clock.clone(),
            notes.clone(),
            Screen::default(),
            interactive,
        );
        (session, clock, notes)
    }

    fn last_status<C: Clock, N: Notifier>(s: &Session<C, N, Screen>) -> Status {
        *s.renderer().0.last().unwrap()
    }

    #[test]
    fn start_announces_and_draws() {
        let (s, _, notes) = session(true);
        assert_eq!(notes.take(), vec!["Start Work for 25 minutes"]);
        let status = last_status(&s);
        assert_eq!(status.phase, Phase::Work);
        assert_eq!(status.remaining, Remaining { minutes: 25, seconds: 0 });
        assert!(status.interactive);
    }

    #[test]
    fn full_cycle_by_the_clock() {
        let (mut s, clock, notes) = session(true);
        notes.take();

        clock.advance(Duration::minutes(25));
        s.tick(None);
        assert_eq!(s.timer().phase(), Phase::ShortBreak);
        assert_eq!(notes.take(), vec!["Start Short Break for 5 minutes"]);

        clock.advance(Duration::minutes(5));
        s.tick(None);
        assert_eq!(s.timer().phase(), Phase::Work);

        for _ in 0..2 {
            clock.advance(Duration::minutes(25));
            s.tick(None);
            assert_eq!(s.timer().phase(), Phase::ShortBreak);
            clock.advance(Duration::minutes(5));
            s.tick(None);
        }
        notes.take();

        clock.advance(Duration::minutes(25));
        s.tick(None);
        assert_eq!(s.timer().phase(), Phase::LongBreak);
        assert_eq!(s.timer().rep_count(), 0);
        assert_eq!(notes.take(), vec!["Start Long Break for 15 minutes"]);

        clock.advance(Duration::minutes(15));
        s.tick(None);
        assert_eq!(s.timer().phase(), Phase::Work);
    }

    #[test]
    fn second_by_second_reaches_short_break_at_25_minutes() {
        let (mut s, clock, _) = session(false);
        for _ in 0..(25 * 60 - 1) {
            clock.advance(Duration::seconds(1));
            s.tick(None);
            assert_eq!(s.timer().phase(), Phase::Work);
        }
        clock.advance(Duration::seconds(1));
        s.tick(None);
        assert_eq!(s.timer().phase(), Phase::ShortBreak);
    }

    #[test]
    fn reminders_every_five_minutes() {
        let (mut s, clock, notes) = session(false);
        notes.take();
        for _ in 0..(25 * 60 - 1) {
            clock.advance(Duration::seconds(1));
            s.tick(None);
        }
        assert_eq!(notes.take(), vec!["Work for 20:00", "Work for 15:00", "Work for 10:00", "Work for 5:00"]);
    }

    #[test]
    fn pause_key_freezes_countdown() {
        let (mut s, clock, notes) = session(true);
        notes.take();
        clock.advance(Duration::seconds(21 * 60 + 30));
        s.tick(Some(press('p')));
        assert_eq!(s.timer().phase(), Phase::Paused);
        assert_eq!(notes.take(), vec!["Paused. 3:30 remaining"]);

        for _ in 0..10 {
            clock.advance(Duration::seconds(1));
            s.tick(None);
            assert_eq!(last_status(&s).remaining, Remaining { minutes: 3, seconds: 30 });
            assert_eq!(last_status(&s).phase, Phase::Paused);
        }

        s.tick(Some(press('P')));
        assert_eq!(s.timer().phase(), Phase::Work);
        assert_eq!(notes.take(), vec!["Resumed: Work for 3:30"]);
        assert_eq!(last_status(&s).remaining, Remaining { minutes: 3, seconds: 30 });
    }

    #[test]
    fn plus_adds_a_minute() {
        let (mut s, clock, _) = session(true);
        clock.advance(Duration::seconds(25 * 60 - 10));
        s.tick(None);
        assert_eq!(last_status(&s).remaining, Remaining { minutes: 0, seconds: 10 });
        s.tick(Some(press('+')));
        assert_eq!(last_status(&s).remaining, Remaining { minutes: 1, seconds: 10 });
    }

    #[test]
    fn skip_moves_on_in_the_same_tick() {
        let (mut s, clock, notes) = session(true);
        notes.take();
        clock.advance(Duration::seconds(42));
        s.tick(Some(press('n')));
        assert_eq!(s.timer().phase(), Phase::ShortBreak);
        assert_eq!(s.timer().rep_count(), 1);
        assert_eq!(notes.take(), vec!["Start Short Break for 5 minutes"]);
    }

    #[test]
    fn keys_ignored_while_paused_or_unknown() {
        let (mut s, _, notes) = session(true);
        s.tick(Some(press('p')));
        notes.take();
        s.tick(Some(press('n')));
        s.tick(Some(press('+')));
        s.tick(Some(press('z')));
        assert_eq!(s.timer().phase(), Phase::Paused);
        assert_eq!(last_status(&s).remaining, Remaining { minutes: 25, seconds: 0 });
        assert!(notes.take().is_empty());
    }

    #[test]
    fn passive_mode_ignores_commands() {
        let (mut s, _, _) = session(false);
        assert_eq!(s.tick(Some(press('p'))), Flow::Continue);
        assert_eq!(s.timer().phase(), Phase::Work);
        assert!(!last_status(&s).interactive);
    }

    #[test]
    fn quit_stops_the_loop() {
        let (mut s, clock, _) = session(true);
        let frames = s.renderer().0.len();
        assert_eq!(s.tick(Some(press('q'))), Flow::Quit);
        assert_eq!(s.renderer().0.len(), frames);

        let mut keys = Script {
            keys: VecDeque::from(vec![None, Some('p'), None, Some('Q'), None]),
            clock,
            quit: Cell::new(false),
        };
        s.run(&mut keys);
        assert!(keys.quit_requested());
        // the trailing `None` was never consumed
        assert_eq!(keys.keys.len(), 1);
        assert_eq!(s.timer().phase(), Phase::Paused);
    }
}
