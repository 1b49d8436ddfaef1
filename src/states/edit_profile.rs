//=========================================================================
// Edit Profile State
//=========================================================================
//
// Profile selection, creation and deletion.
//
// Creation asks for a name through a message box with a text field,
// deletion asks for confirmation. Every change is broadcast as
// `ProfileChanged`.
//
//=========================================================================

//=== External Dependencies ===============================================

use log::{info, warn};

//=== Internal Dependencies ===============================================

use super::menu::{report_error, MenuBehavior};
use super::Session;
use crate::core::error::StateError;
use crate::core::gui::{MenuButton, MenuGui};
use crate::core::input::{KeyCode, Modifiers, MouseButton};
use crate::core::messaging::{
    Message, MessageBoxResult, MsgBoxButton, MsgBoxButtons, MsgBoxId,
};
use crate::core::render::Renderer;
use crate::core::state::{
    GameState, MessageBoxState, StateContext, StateCore, StateFlags, StateKind,
};
use crate::core::world::lock_profiles;

//=== ProfileButton =======================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProfileButton {
    Use,
    New,
    Delete,
    Close,
}

impl MenuButton for ProfileButton {}

fn profile_menu() -> MenuGui<ProfileButton> {
    MenuGui::new("Profiles")
        .with_button(ProfileButton::Use, "Use profile")
        .with_button(ProfileButton::New, "New profile")
        .with_button(ProfileButton::Delete, "Delete profile")
        .with_button(ProfileButton::Close, "Close")
        .with_shortcut(KeyCode::Escape, ProfileButton::Close)
}

//=== EditProfileState ====================================================

pub struct EditProfileState {
    core: StateCore,
    menu: MenuBehavior<ProfileButton>,
    session: Session,
    profiles: Vec<String>,
    selected: usize,
}

impl EditProfileState {
    pub fn new(session: Session) -> Self {
        Self {
            core: StateCore::new("edit_profile", StateFlags::OPAQUE),
            menu: MenuBehavior::new(profile_menu),
            session,
            profiles: Vec::new(),
            selected: 0,
        }
    }

    pub fn selected_profile(&self) -> Option<&str> {
        self.profiles.get(self.selected).map(String::as_str)
    }

    fn refresh(&mut self, ctx: &mut StateContext<'_>) -> Result<(), StateError> {
        let (profiles, current) = {
            let store = lock_profiles(&self.session.profiles)?;
            (store.profiles(), store.current())
        };
        self.selected = current
            .and_then(|current| profiles.iter().position(|p| *p == current))
            .unwrap_or(0);
        self.profiles = profiles;

        let has_profiles = !self.profiles.is_empty();
        let gui = self.menu.gui(ctx);
        gui.set_enabled(ProfileButton::Use, has_profiles);
        gui.set_enabled(ProfileButton::Delete, has_profiles);
        Ok(())
    }

    fn activate(&mut self, ctx: &mut StateContext<'_>, button: ProfileButton) {
        let receiver = ctx.id();
        match button {
            ProfileButton::Use => {
                let Some(name) = self.selected_profile().map(str::to_string) else {
                    return;
                };
                match lock_profiles(&self.session.profiles).and_then(|mut s| s.select(&name)) {
                    Ok(()) => {
                        info!("Using profile '{}'", name);
                        ctx.broadcast(Message::ProfileChanged);
                        self.core.request_end();
                    }
                    Err(err) => report_error(ctx, err.to_string()),
                }
            }
            ProfileButton::New => ctx.push(
                MessageBoxState::new(
                    MsgBoxId::NewProfile,
                    "Enter the player name:",
                    MsgBoxButtons::OK_CANCEL,
                )
                .with_input("")
                .with_help("Enter to confirm, Escape to cancel")
                .with_receiver(receiver)
                .exitable(true),
            ),
            ProfileButton::Delete => {
                let Some(name) = self.selected_profile() else {
                    return;
                };
                let text = format!("Delete the profile '{}' ?", name);
                ctx.push(
                    MessageBoxState::new(MsgBoxId::DeleteProfile, text, MsgBoxButtons::YES_NO)
                        .with_receiver(receiver),
                );
            }
            ProfileButton::Close => self.core.request_end(),
        }
    }

    fn apply_answer(
        &mut self,
        ctx: &mut StateContext<'_>,
        answer: MessageBoxResult,
    ) -> Result<(), StateError> {
        let changed = match (answer.id, answer.button) {
            (MsgBoxId::NewProfile, MsgBoxButton::Ok) => {
                lock_profiles(&self.session.profiles)?.create(&answer.input)
            }
            (MsgBoxId::DeleteProfile, MsgBoxButton::Yes) => match self.selected_profile() {
                Some(name) => {
                    let name = name.to_string();
                    lock_profiles(&self.session.profiles)?.delete(&name)
                }
                None => return Ok(()),
            },
            _ => return Ok(()),
        };

        match changed {
            Ok(()) => {
                ctx.broadcast(Message::ProfileChanged);
                self.refresh(ctx)
            }
            Err(err) => {
                warn!("Profile change rejected: {}", err);
                report_error(ctx, err.to_string());
                Ok(())
            }
        }
    }
}

impl GameState for EditProfileState {
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

    fn render(
        &mut self,
        ctx: &mut StateContext<'_>,
        renderer: &mut dyn Renderer,
    ) -> Result<(), StateError> {
        self.menu.render(ctx, renderer);
        match self.selected_profile() {
            Some(name) => renderer.draw_text(&format!("< {} >", name)),
            None => renderer.draw_text("No profile"),
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
        let count = self.profiles.len();
        match key {
            KeyCode::ArrowLeft if count > 0 => self.selected = (self.selected + count - 1) % count,
            KeyCode::ArrowRight if count > 0 => self.selected = (self.selected + 1) % count,
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
        match message {
            Message::MessageBox(answer) => self.apply_answer(ctx, answer),
            _ => Ok(()),
        }
    }
}
