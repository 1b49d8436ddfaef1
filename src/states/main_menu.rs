//=========================================================================
// Main Menu State
//=========================================================================
//
// Bottom of the stack. Starts levels and replays, opens the profile
// editor and runs the level list update.
//
// Left/Right pick the level, Up/Down/Tab move between buttons.
//
//=========================================================================

//=== External Dependencies ===============================================

use crossbeam_channel::{bounded, Receiver};
use log::{info, warn};

//=== Internal Dependencies ===============================================

use super::menu::{confirm_quit, is_quit_confirmed, report_error, MenuBehavior};
use super::{EditProfileState, PreplayingState, ReplayingState, Session, TaskProgressState};
use crate::core::error::StateError;
use crate::core::gui::{MenuButton, MenuGui};
use crate::core::input::{KeyCode, Modifiers, MouseButton};
use crate::core::messaging::{Message, MessageKind, MsgBoxButtons, MsgBoxId, TaskKind};
use crate::core::render::Renderer;
use crate::core::state::{
    GameState, MessageBoxState, StateContext, StateCore, StateFlags, StateKind,
};
use crate::core::world::{self, lock_profiles, LevelId};

//=== MainButton ==========================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MainButton {
    Play,
    Replays,
    Profiles,
    UpdateLevels,
    Quit,
}

impl MenuButton for MainButton {}

fn main_menu() -> MenuGui<MainButton> {
    MenuGui::new("Main menu")
        .with_button(MainButton::Play, "Play")
        .with_button(MainButton::Replays, "Replays")
        .with_button(MainButton::Profiles, "Profiles")
        .with_button(MainButton::UpdateLevels, "Update levels")
        .with_button(MainButton::Quit, "Quit")
        .with_shortcut(KeyCode::Escape, MainButton::Quit)
}

//=== MainMenuState =======================================================

pub struct MainMenuState {
    core: StateCore,
    menu: MenuBehavior<MainButton>,
    session: Session,
    levels: Vec<LevelId>,
    selected: usize,
    profile: Option<String>,
    pending_levels: Option<Receiver<Vec<LevelId>>>,
}

impl MainMenuState {
    pub fn new(session: Session) -> Self {
        Self {
            core: StateCore::new("main_menu", StateFlags::OPAQUE),
            menu: MenuBehavior::new(main_menu),
            session,
            levels: Vec::new(),
            selected: 0,
            profile: None,
            pending_levels: None,
        }
    }

    pub fn selected_level(&self) -> Option<&LevelId> {
        self.levels.get(self.selected)
    }

    fn refresh(&mut self, ctx: &mut StateContext<'_>) -> Result<(), StateError> {
        let (levels, has_replays) = {
            let world = world::lock(&self.session.world)?;
            (world.levels(), !world.replays().is_empty())
        };
        self.levels = levels;
        self.selected = self.selected.min(self.levels.len().saturating_sub(1));
        self.profile = lock_profiles(&self.session.profiles)?.current();

        let gui = self.menu.gui(ctx);
        gui.set_enabled(MainButton::Play, !self.levels.is_empty());
        gui.set_enabled(MainButton::Replays, has_replays);
        Ok(())
    }

    fn select(&mut self, forward: bool) {
        let count = self.levels.len();
        if count == 0 {
            return;
        }
        self.selected = if forward {
            (self.selected + 1) % count
        } else {
            (self.selected + count - 1) % count
        };
    }

    /// Downloads the level list behind a progress overlay. The list comes
    /// back over a channel and is installed when the task reports success.
    fn start_levels_update(&mut self, ctx: &mut StateContext<'_>) -> Result<(), StateError> {
        let fetch = world::lock(&self.session.world)?.levels_fetch();
        let (sender, receiver) = bounded(1);
        self.pending_levels = Some(receiver);

        let owner = ctx.id();
        ctx.push(TaskProgressState::new(
            TaskKind::LevelsUpdate,
            owner,
            move |reporter| {
                let levels = fetch(reporter)?;
                reporter.report(100);
                sender
                    .send(levels)
                    .map_err(|_| "level list receiver gone".to_string())
            },
        ));
        Ok(())
    }

    fn install_levels(&mut self) -> Result<bool, StateError> {
        let Some(levels) = self
            .pending_levels
            .take()
            .and_then(|receiver| receiver.try_recv().ok())
        else {
            return Ok(false);
        };
        let count = world::lock(&self.session.world)?.install_levels(levels)?;
        info!("Level list refreshed: {} levels", count);
        Ok(true)
    }

    fn activate(&mut self, ctx: &mut StateContext<'_>, button: MainButton) {
        match button {
            MainButton::Play => {
                if let Some(level) = self.selected_level().cloned() {
                    info!("Playing level {}", level);
                    ctx.push(PreplayingState::new(self.session.clone(), level));
                }
            }
            MainButton::Replays => {
                let first = world::lock(&self.session.world)
                    .map(|world| world.replays().into_iter().next());
                match first {
                    Ok(Some(replay)) => ctx.push(ReplayingState::new(self.session.clone(), replay)),
                    Ok(None) => ctx.push(MessageBoxState::new(
                        MsgBoxId::Notice,
                        "No replay available",
                        MsgBoxButtons::OK,
                    )),
                    Err(err) => report_error(ctx, err.to_string()),
                }
            }
            MainButton::Profiles => ctx.push(EditProfileState::new(self.session.clone())),
            MainButton::UpdateLevels => {
                if let Err(err) = self.start_levels_update(ctx) {
                    report_error(ctx, err.to_string());
                }
            }
            MainButton::Quit => confirm_quit(ctx),
        }
    }
}

impl GameState for MainMenuState {
    fn core(&self) -> &StateCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut StateCore {
        &mut self.core
    }

    fn kind(&self) -> StateKind {
        StateKind::Menu
    }

    fn enter(&mut self, ctx: &mut StateContext<'_>) -> Result<(), StateError> {
        self.refresh(ctx)?;
        self.menu.gui(ctx).reset_focus();
        Ok(())
    }

    fn enter_after_pop(&mut self, ctx: &mut StateContext<'_>) {
        if let Err(err) = self.refresh(ctx) {
            warn!("Main menu refresh failed: {}", err);
        }
    }

    fn render(
        &mut self,
        ctx: &mut StateContext<'_>,
        renderer: &mut dyn Renderer,
    ) -> Result<(), StateError> {
        self.menu.render(ctx, renderer);
        if let Some(level) = self.selected_level() {
            renderer.draw_text(&format!("Level: {}", level));
        }
        if let Some(profile) = &self.profile {
            renderer.draw_text(&format!("Profile: {}", profile));
        }
        Ok(())
    }

    fn key_down(
        &mut self,
        ctx: &mut StateContext<'_>,
        key: KeyCode,
        modifiers: Modifiers,
        _character: Option<char>,
    ) {
        match key {
            KeyCode::ArrowLeft => self.select(false),
            KeyCode::ArrowRight => self.select(true),
            _ => {
                if let Some(button) = self.menu.key_down(ctx, key, modifiers) {
                    self.activate(ctx, button);
                }
            }
        }
    }

    fn mouse_down(&mut self, ctx: &mut StateContext<'_>, button: MouseButton) {
        if let Some(button) = self.menu.mouse_down(ctx, button) {
            self.activate(ctx, button);
        }
    }

    fn on_message(
        &mut self,
        ctx: &mut StateContext<'_>,
        message: Message,
    ) -> Result<(), StateError> {
        if is_quit_confirmed(&message) {
            ctx.request_quit();
            self.core.request_end();
            return Ok(());
        }

        match message {
            Message::TaskFinished(outcome) if outcome.kind == TaskKind::LevelsUpdate => {
                let installed = outcome.succeeded && self.install_levels()?;
                self.pending_levels = None;
                if installed {
                    ctx.broadcast(Message::LevelsUpdated);
                } else {
                    report_error(ctx, "The level list could not be updated");
                }
            }
            Message::LevelsUpdated | Message::ProfileChanged => self.refresh(ctx)?,
            _ => {}
        }
        Ok(())
    }

    fn observes(&self, kind: MessageKind) -> bool {
        matches!(kind, MessageKind::LevelsUpdated | MessageKind::ProfileChanged)
    }
}
