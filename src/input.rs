use crate::app::Scene;
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use std::time::Duration;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum UiAction {
    Feed,
    Sleep,
    Play,
    AvatarStep(i32),
    NameChar(char),
    NameBackspace,
    Submit,
    OpenSettings,
    InfoToggle,
    ToggleColor,
    Dismiss,
    Quit,
}

#[derive(Clone, Debug)]
pub(crate) struct InputEvent {
    pub(crate) key: KeyCode,
    pub(crate) mods: KeyModifiers,
}

pub(crate) fn collect_input_nonblocking(max_frame_time: Duration) -> anyhow::Result<Vec<InputEvent>> {
    let mut out = Vec::new();

    // poll with a tiny timeout so we stay responsive
    let timeout = std::cmp::min(Duration::from_millis(1), max_frame_time);
    while event::poll(timeout)? {
        if let Event::Key(k) = event::read()? {
            if k.kind == KeyEventKind::Press || k.kind == KeyEventKind::Repeat {
                out.push(InputEvent {
                    key: k.code,
                    mods: k.modifiers,
                });
                if out.len() >= 32 {
                    break;
                }
            }
        }
    }
    Ok(out)
}

pub(crate) fn map_event_to_action(scene: Scene, ev: &InputEvent) -> Option<UiAction> {
    if matches!(ev.key, KeyCode::Char('c')) && ev.mods.contains(KeyModifiers::CONTROL) {
        return Some(UiAction::Quit);
    }

    match scene {
        Scene::Onboarding => match ev.key {
            KeyCode::Left | KeyCode::Up => Some(UiAction::AvatarStep(-1)),
            KeyCode::Right | KeyCode::Down | KeyCode::Tab => Some(UiAction::AvatarStep(1)),
            KeyCode::Enter => Some(UiAction::Submit),
            KeyCode::Backspace => Some(UiAction::NameBackspace),
            KeyCode::Esc => Some(UiAction::Quit),
            KeyCode::Char(ch) if !ch.is_control() => Some(UiAction::NameChar(ch)),
            _ => None,
        },
        Scene::Modal(_) => match ev.key {
            KeyCode::Enter | KeyCode::Esc | KeyCode::Char(' ') => Some(UiAction::Dismiss),
            KeyCode::Char('i') | KeyCode::Char('I') => Some(UiAction::Dismiss),
            KeyCode::Char('q') | KeyCode::Char('Q') => Some(UiAction::Quit),
            _ => None,
        },
        Scene::Main => match ev.key {
            KeyCode::Char('f') | KeyCode::Char('F') => Some(UiAction::Feed),
            KeyCode::Char('s') | KeyCode::Char('S') => Some(UiAction::Sleep),
            KeyCode::Char('p') | KeyCode::Char('P') => Some(UiAction::Play),
            KeyCode::Char('o') | KeyCode::Char('O') => Some(UiAction::OpenSettings),
            KeyCode::Char('i') | KeyCode::Char('I') => Some(UiAction::InfoToggle),
            KeyCode::Char('c') | KeyCode::Char('C') => Some(UiAction::ToggleColor),
            KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => Some(UiAction::Quit),
            _ => None,
        },
    }
}
