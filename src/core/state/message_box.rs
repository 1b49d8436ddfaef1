//=========================================================================
// Message Box State
//=========================================================================
//
// Transient overlay that asks a question and reports the answer.
//
// Protocol:
// ```text
//   Open ──(button / Escape)──→ Closing ──flush()──→ leave()
//                                 │                    │
//                         request_for_end        answer posted once
//                         (still resident)       to the receiver
// ```
//
// The answer is posted from `leave()`, so it reaches the receiver on the
// tick after the box is gone and never while the box is still on the
// stack. A box torn down while still open (forced shutdown) reports
// `MsgBoxButton::Nothing`.
//
//=========================================================================

//=== External Dependencies ===============================================

use log::debug;

//=== Internal Dependencies ===============================================

use super::{GameState, StateContext, StateCore, StateFlags, StateId, StateKind};
use crate::core::error::StateError;
use crate::core::input::{KeyCode, Modifiers, MouseButton};
use crate::core::messaging::{Message, MessageBoxResult, MsgBoxButton, MsgBoxButtons, MsgBoxId};
use crate::core::render::{MenuEntry, Renderer};

//=== BoxPhase ============================================================

/// Lifecycle phase of a message box.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoxPhase {
    /// Waiting for an answer.
    Open,
    /// Answered; waiting to be popped.
    Closing,
    /// Left the stack; the answer has been posted.
    Delivered,
}

//=== MessageBoxState =====================================================

/// Modal question overlay.
///
/// # Example
///
/// ```rust
/// use stratum_engine::core::messaging::{MsgBoxButtons, MsgBoxId};
/// use stratum_engine::core::state::{MessageBoxState, StateId};
///
/// let receiver = StateId::from_raw(3);
/// let quit_box = MessageBoxState::new(MsgBoxId::Quit, "Quit the game ?", MsgBoxButtons::YES_NO)
///     .with_receiver(receiver);
/// ```
pub struct MessageBoxState {
    core: StateCore,
    id: MsgBoxId,
    text: String,
    buttons: Vec<MsgBoxButton>,
    focus: usize,
    receiver: Option<StateId>,
    input: Option<String>,
    help: Option<String>,
    exitable: bool,
    phase: BoxPhase,
    clicked: MsgBoxButton,
}

impl MessageBoxState {
    //--- Construction -----------------------------------------------------

    pub fn new(id: MsgBoxId, text: impl Into<String>, buttons: MsgBoxButtons) -> Self {
        let buttons = if buttons.is_empty() {
            vec![MsgBoxButton::Ok]
        } else {
            buttons.to_vec()
        };

        Self {
            core: StateCore::new("message_box", StateFlags::OVERLAY),
            id,
            text: text.into(),
            buttons,
            focus: 0,
            receiver: None,
            input: None,
            help: None,
            exitable: false,
            phase: BoxPhase::Open,
            clicked: MsgBoxButton::Nothing,
        }
    }

    /// Error report with a single OK button, dismissible with Escape.
    pub fn error(text: impl Into<String>) -> Self {
        Self::new(MsgBoxId::Error, text, MsgBoxButtons::OK).exitable(true)
    }

    /// State that receives the answer. Without one, the answer is
    /// broadcast to observers of message-box results.
    pub fn with_receiver(mut self, receiver: StateId) -> Self {
        self.receiver = Some(receiver);
        self
    }

    /// Adds a text field, prefilled with `initial`.
    pub fn with_input(mut self, initial: impl Into<String>) -> Self {
        self.input = Some(initial.into());
        self
    }

    /// Hint line drawn under the question.
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    /// Lets Escape close the box, answering `MsgBoxButton::Nothing`.
    pub fn exitable(mut self, exitable: bool) -> Self {
        self.exitable = exitable;
        self
    }

    //--- Queries ----------------------------------------------------------

    pub fn box_id(&self) -> MsgBoxId {
        self.id
    }

    pub fn phase(&self) -> BoxPhase {
        self.phase
    }

    pub fn clicked(&self) -> MsgBoxButton {
        self.clicked
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn input(&self) -> Option<&str> {
        self.input.as_deref()
    }

    pub fn help(&self) -> Option<&str> {
        self.help.as_deref()
    }

    //--- Answering --------------------------------------------------------

    /// Records the answer and asks to be popped. Ignored once answered.
    pub fn click(&mut self, button: MsgBoxButton) {
        if self.phase != BoxPhase::Open {
            return;
        }

        debug!("Message box {:?} answered {:?}", self.id, button);
        self.clicked = button;
        self.phase = BoxPhase::Closing;
        self.core.request_end();
    }

    fn click_focused(&mut self) {
        if let Some(button) = self.buttons.get(self.focus).copied() {
            self.click(button);
        }
    }

    fn move_focus(&mut self, forward: bool) {
        let count = self.buttons.len();
        if count == 0 {
            return;
        }
        self.focus = if forward {
            (self.focus + 1) % count
        } else {
            (self.focus + count - 1) % count
        };
    }

    fn entries(&self) -> Vec<MenuEntry<'_>> {
        self.buttons
            .iter()
            .enumerate()
            .map(|(index, button)| MenuEntry {
                label: button.label(),
                enabled: true,
                focused: index == self.focus,
            })
            .collect()
    }
}

//=== GameState Implementation ============================================

impl GameState for MessageBoxState {
    fn core(&self) -> &StateCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut StateCore {
        &mut self.core
    }

    fn kind(&self) -> StateKind {
        StateKind::Overlay
    }

    fn leave(&mut self, ctx: &mut StateContext<'_>) {
        if self.phase == BoxPhase::Delivered {
            return;
        }
        self.phase = BoxPhase::Delivered;

        let result = MessageBoxResult {
            id: self.id,
            button: self.clicked,
            input: self.input.take().unwrap_or_default(),
        };

        match self.receiver {
            Some(receiver) => ctx.post(Message::MessageBox(result), receiver),
            None => ctx.broadcast(Message::MessageBox(result)),
        }
    }

    fn render(
        &mut self,
        _ctx: &mut StateContext<'_>,
        renderer: &mut dyn Renderer,
    ) -> Result<(), StateError> {
        renderer.draw_dialog(&self.text, &self.entries(), self.input.as_deref());
        if let Some(help) = &self.help {
            renderer.draw_text(help);
        }
        Ok(())
    }

    fn key_down(
        &mut self,
        _ctx: &mut StateContext<'_>,
        key: KeyCode,
        _modifiers: Modifiers,
        character: Option<char>,
    ) {
        if self.phase != BoxPhase::Open {
            return;
        }

        match key {
            KeyCode::Escape if self.exitable => self.click(MsgBoxButton::Nothing),
            KeyCode::Enter => self.click_focused(),
            KeyCode::ArrowLeft | KeyCode::ArrowUp => self.move_focus(false),
            KeyCode::ArrowRight | KeyCode::ArrowDown | KeyCode::Tab => self.move_focus(true),
            KeyCode::Backspace => {
                if let Some(input) = self.input.as_mut() {
                    input.pop();
                }
            }
            _ => match (self.input.as_mut(), character) {
                (Some(input), Some(c)) => input.push(c),
                (None, _) if key == KeyCode::Space => self.click_focused(),
                _ => {}
            },
        }
    }

    fn mouse_down(&mut self, _ctx: &mut StateContext<'_>, button: MouseButton) {
        if button == MouseButton::Left {
            self.click_focused();
        }
    }
}

//=========================================================================
// Unit Tests
//=========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::SchedulerConfig;
    use crate::core::messaging::MessageTarget;
    use crate::core::state::context::StackServices;
    use std::time::Duration;

    fn with_ctx<R>(f: impl FnOnce(&mut StateContext<'_>) -> R) -> (R, StackServices) {
        let mut services = StackServices::default();
        let config = SchedulerConfig::default();
        let result = {
            let mut ctx = StateContext::new(
                &mut services,
                &config,
                StateId::from_raw(9),
                Duration::ZERO,
                true,
            );
            f(&mut ctx)
        };
        (result, services)
    }

    fn quit_box() -> MessageBoxState {
        MessageBoxState::new(MsgBoxId::Quit, "Quit ?", MsgBoxButtons::YES_NO)
            .with_receiver(StateId::from_raw(2))
    }

    #[test]
    fn enter_key_clicks_focused_button() {
        let mut state = quit_box();
        with_ctx(|ctx| state.key_down(ctx, KeyCode::Enter, Modifiers::NONE, None));

        assert_eq!(state.phase(), BoxPhase::Closing);
        assert_eq!(state.clicked(), MsgBoxButton::Yes);
        assert!(state.core().request_for_end());
    }

    #[test]
    fn arrows_move_focus_with_wrap() {
        let mut state = quit_box();
        with_ctx(|ctx| {
            state.key_down(ctx, KeyCode::ArrowLeft, Modifiers::NONE, None);
            state.key_down(ctx, KeyCode::Enter, Modifiers::NONE, None);
        });
        assert_eq!(state.clicked(), MsgBoxButton::No);
    }

    #[test]
    fn help_line_is_drawn_under_the_dialog() {
        use crate::core::render::{DrawCall, RecordingRenderer};

        let mut state = MessageBoxState::new(MsgBoxId::NewProfile, "Name:", MsgBoxButtons::OK_CANCEL)
            .with_input("ann")
            .with_help("Enter to confirm");
        let mut renderer = RecordingRenderer::new();
        with_ctx(|ctx| state.render(ctx, &mut renderer)).0.unwrap();

        assert_eq!(
            renderer.calls(),
            &[
                DrawCall::Dialog {
                    text: "Name:".to_string(),
                    input: Some("ann".to_string()),
                },
                DrawCall::Text("Enter to confirm".to_string()),
            ]
        );
    }

    #[test]
    fn escape_only_closes_exitable_boxes() {
        let mut locked = quit_box();
        with_ctx(|ctx| locked.key_down(ctx, KeyCode::Escape, Modifiers::NONE, None));
        assert_eq!(locked.phase(), BoxPhase::Open);

        let mut error = MessageBoxState::error("broken");
        with_ctx(|ctx| error.key_down(ctx, KeyCode::Escape, Modifiers::NONE, None));
        assert_eq!(error.phase(), BoxPhase::Closing);
        assert_eq!(error.clicked(), MsgBoxButton::Nothing);
    }

    #[test]
    fn second_click_is_ignored() {
        let mut state = quit_box();
        state.click(MsgBoxButton::No);
        state.click(MsgBoxButton::Yes);
        assert_eq!(state.clicked(), MsgBoxButton::No);
    }

    #[test]
    fn typing_edits_input() {
        let mut state = MessageBoxState::new(MsgBoxId::NewProfile, "Name", MsgBoxButtons::OK_CANCEL)
            .with_input("ab");
        with_ctx(|ctx| {
            state.key_down(ctx, KeyCode::Backspace, Modifiers::NONE, None);
            state.key_down(ctx, KeyCode::KeyC, Modifiers::NONE, Some('c'));
            state.key_down(ctx, KeyCode::Space, Modifiers::NONE, Some(' '));
        });
        assert_eq!(state.input(), Some("ac "));
        assert_eq!(state.phase(), BoxPhase::Open);
    }

    #[test]
    fn leave_posts_answer_exactly_once() {
        let mut state = quit_box();
        state.click(MsgBoxButton::Yes);

        let (_, services) = with_ctx(|ctx| {
            state.leave(ctx);
            state.leave(ctx);
        });

        let posted: Vec<_> = services.mailbox.iter().cloned().collect();
        assert_eq!(posted.len(), 1);
        assert_eq!(posted[0].target, MessageTarget::State(StateId::from_raw(2)));
        assert_eq!(
            posted[0].message,
            Message::MessageBox(MessageBoxResult {
                id: MsgBoxId::Quit,
                button: MsgBoxButton::Yes,
                input: String::new(),
            })
        );
        assert_eq!(state.phase(), BoxPhase::Delivered);
    }

    #[test]
    fn forced_leave_reports_nothing_by_broadcast() {
        let mut state = MessageBoxState::error("oops");
        let (_, services) = with_ctx(|ctx| state.leave(ctx));

        let posted: Vec<_> = services.mailbox.iter().cloned().collect();
        assert_eq!(posted[0].target, MessageTarget::Broadcast);
        match &posted[0].message {
            Message::MessageBox(result) => assert_eq!(result.button, MsgBoxButton::Nothing),
            other => panic!("unexpected message {:?}", other),
        }
    }
}
