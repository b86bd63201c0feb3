use crate::input::{collect_input_nonblocking, map_event_to_action, UiAction};
use crate::render::{draw_scene, Palette, Terminal};
use pocketpet::config::{save_settings_atomic, Paths, Settings};
use pocketpet::model::NAME_MAX_CHARS;
use pocketpet::{FileStore, Notice, PetEngine, PetStorage, Rules};
use std::cell::Cell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Modal {
    Evolved,
    Secret,
    Info,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Scene {
    Main,
    Onboarding,
    Modal(Modal),
}

pub(crate) struct App {
    settings: Settings,
    paths: Paths,
    engine: PetEngine,
    term: Terminal,
    modals: VecDeque<Modal>,
    name_edit: String,
    dirty: Rc<Cell<bool>>,
    should_quit: bool,
}

impl App {
    fn init(settings: Settings, paths: Paths, reset: bool) -> anyhow::Result<Self> {
        let store = FileStore::open(paths.data_dir.join("save"))?;
        let mut engine = PetEngine::load(
            PetStorage::new(Box::new(store)),
            Rules::default(),
            settings.seed,
        );
        if reset {
            engine.reset();
        }

        // Stat changes arrive through the store subscription; everything else
        // is picked up from notices.
        let dirty = Rc::new(Cell::new(true));
        let flag = Rc::clone(&dirty);
        engine.subscribe(Box::new(move |_| flag.set(true)));

        let name_edit = engine
            .snapshot()
            .profile
            .map(|p| p.name)
            .unwrap_or_default();

        let term = Terminal::begin()?;

        Ok(Self {
            settings,
            paths,
            engine,
            term,
            modals: VecDeque::new(),
            name_edit,
            dirty,
            should_quit: false,
        })
    }

    fn scene(&self) -> Scene {
        if let Some(m) = self.modals.front() {
            return Scene::Modal(*m);
        }
        if self.engine.needs_onboarding() {
            return Scene::Onboarding;
        }
        Scene::Main
    }

    fn run(&mut self) -> anyhow::Result<()> {
        let fps = self.settings.fps_cap.clamp(10, 240);
        let frame_dt = Duration::from_secs_f32(1.0 / fps as f32);
        let speed = self.settings.speed.max(0.0);

        let mut last_frame = Instant::now();
        let mut sim_accum = Duration::ZERO;

        while !self.should_quit {
            if self.term.resize_if_needed()? {
                self.dirty.set(true);
            }

            for ev in collect_input_nonblocking(frame_dt)? {
                if let Some(action) = map_event_to_action(self.scene(), &ev) {
                    self.handle(action);
                    self.dirty.set(true);
                    if self.should_quit {
                        break;
                    }
                }
            }

            let now = Instant::now();
            let real_dt = now.saturating_duration_since(last_frame);
            last_frame = now;
            sim_accum = sim_accum.saturating_add(real_dt.mul_f32(speed));
            let whole = Duration::from_millis(sim_accum.as_millis() as u64);
            self.engine.advance(whole);
            sim_accum = sim_accum.saturating_sub(whole);

            for notice in self.engine.drain_notices() {
                match notice {
                    Notice::Evolved => self.modals.push_back(Modal::Evolved),
                    Notice::SecretFound => self.modals.push_back(Modal::Secret),
                    _ => {}
                }
                self.dirty.set(true);
            }

            let snap = self.engine.snapshot();
            let animating = snap.animation.is_some() || snap.celebrating;
            if self.dirty.replace(false) || animating {
                let pal = Palette::new(self.settings.enable_color);
                let scene = self.scene();
                draw_scene(&mut self.term.cur, scene, &snap, &self.name_edit, &pal);
                self.term.present()?;
            }

            spin_sleep(frame_dt, Instant::now());
        }
        Ok(())
    }

    fn handle(&mut self, action: UiAction) {
        match action {
            UiAction::Feed => {
                self.engine.feed();
            }
            UiAction::Sleep => {
                self.engine.sleep();
            }
            UiAction::Play => {
                self.engine.play();
            }
            UiAction::AvatarStep(delta) => {
                let next = self.engine.snapshot().selected_avatar.step(delta);
                self.engine.select_avatar(next);
            }
            UiAction::NameChar(ch) => {
                if self.name_edit.chars().count() < NAME_MAX_CHARS {
                    self.name_edit.push(ch);
                }
            }
            UiAction::NameBackspace => {
                self.name_edit.pop();
            }
            UiAction::Submit => {
                let avatar = self.engine.snapshot().selected_avatar;
                if !self.engine.complete_onboarding(&self.name_edit, avatar) {
                    info!("onboarding submitted without a name");
                }
            }
            UiAction::OpenSettings => {
                if let Some(p) = self.engine.snapshot().profile {
                    self.name_edit = p.name;
                }
                self.engine.open_onboarding();
            }
            UiAction::InfoToggle => self.modals.push_front(Modal::Info),
            UiAction::ToggleColor => {
                self.settings.enable_color = !self.settings.enable_color;
                if let Err(err) = save_settings_atomic(&self.paths.settings_path, &self.settings) {
                    warn!(error = %err, "failed to save settings");
                }
            }
            UiAction::Dismiss => {
                self.modals.pop_front();
            }
            UiAction::Quit => self.should_quit = true,
        }
    }
}

pub(crate) fn run(settings: Settings, paths: Paths, reset: bool) -> anyhow::Result<()> {
    let mut app = App::init(settings, paths, reset)?;
    let result = app.run();
    app.term.end()?;
    result
}

/* -----------------------------
   Frame pacing helper
------------------------------ */

fn spin_sleep(target: Duration, now: Instant) {
    let end = now + target;
    loop {
        let t = Instant::now();
        if t >= end {
            break;
        }
        let left = end - t;
        if left > Duration::from_millis(2) {
            std::thread::sleep(Duration::from_millis(1));
        } else {
            std::hint::spin_loop();
        }
    }
}
