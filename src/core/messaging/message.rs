//=========================================================================
// Messages
//=========================================================================
//
// Closed vocabulary of inter-state messages.
//
// Architecture:
//   Envelope { target, message }
//     ├─ target: State(StateId) | Broadcast
//     └─ message: Message (tagged payload)
//
// Message-box answers carry the box id, the clicked button and the text
// typed into the box, all typed so receivers match on enums.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::fmt;
use std::ops::BitOr;

//=== Internal Dependencies ===============================================

use crate::core::state::StateId;

//=== Message Box Vocabulary ==============================================

/// Identifies which question a message box asked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MsgBoxId {
    /// "Quit the game?" confirmation.
    Quit,
    /// Error report.
    Error,
    /// Informational notice.
    Notice,
    /// Name for a new profile.
    NewProfile,
    /// Confirmation before deleting a profile.
    DeleteProfile,
    /// Name under which to save the last replay.
    SaveReplay,
}

/// Button clicked in a message box.
///
/// `Nothing` is reported when the box was dismissed with Escape or torn
/// down by a forced shutdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MsgBoxButton {
    Nothing,
    Ok,
    Cancel,
    Yes,
    No,
    Retry,
    Abort,
}

impl MsgBoxButton {
    pub fn label(self) -> &'static str {
        match self {
            Self::Nothing => "",
            Self::Ok => "OK",
            Self::Cancel => "Cancel",
            Self::Yes => "Yes",
            Self::No => "No",
            Self::Retry => "Retry",
            Self::Abort => "Abort",
        }
    }

    fn bit(self) -> u8 {
        match self {
            Self::Nothing => 0,
            Self::Ok => 1,
            Self::Cancel => 1 << 1,
            Self::Yes => 1 << 2,
            Self::No => 1 << 3,
            Self::Retry => 1 << 4,
            Self::Abort => 1 << 5,
        }
    }
}

/// Set of buttons shown by a message box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MsgBoxButtons(u8);

impl MsgBoxButtons {
    pub const OK: Self = Self(1);
    pub const CANCEL: Self = Self(1 << 1);
    pub const YES: Self = Self(1 << 2);
    pub const NO: Self = Self(1 << 3);
    pub const RETRY: Self = Self(1 << 4);
    pub const ABORT: Self = Self(1 << 5);

    pub const OK_CANCEL: Self = Self(Self::OK.0 | Self::CANCEL.0);
    pub const YES_NO: Self = Self(Self::YES.0 | Self::NO.0);

    const ORDER: [MsgBoxButton; 6] = [
        MsgBoxButton::Ok,
        MsgBoxButton::Yes,
        MsgBoxButton::No,
        MsgBoxButton::Retry,
        MsgBoxButton::Abort,
        MsgBoxButton::Cancel,
    ];

    pub fn contains(self, button: MsgBoxButton) -> bool {
        let bit = button.bit();
        bit != 0 && self.0 & bit == bit
    }

    /// Buttons in display order.
    pub fn to_vec(self) -> Vec<MsgBoxButton> {
        Self::ORDER
            .iter()
            .copied()
            .filter(|button| self.contains(*button))
            .collect()
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for MsgBoxButtons {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Answer delivered by a message box when it leaves the stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageBoxResult {
    pub id: MsgBoxId,
    pub button: MsgBoxButton,
    pub input: String,
}

//=== Background Tasks ====================================================

/// Kind of background job run behind a progress overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskKind {
    /// Prefetch of a reference run for the level about to be played.
    GhostDownload,
    /// Refresh of the level list.
    LevelsUpdate,
}

impl TaskKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::GhostDownload => "Downloading ghost",
            Self::LevelsUpdate => "Updating levels",
        }
    }
}

/// Completion notice posted by a progress overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskOutcome {
    pub kind: TaskKind,
    pub succeeded: bool,
}

//=== Message =============================================================

/// Message exchanged between states.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// Restart the current level.
    Restart,
    /// Continue with the level after the current one.
    NextLevel,
    /// Go back to the level before the current one.
    PreviousLevel,
    /// Leave the level and return to the menu.
    Abort,
    /// The level was completed; leave it.
    Finish,
    /// The simulation failed; leave it.
    Error,
    /// The level list changed.
    LevelsUpdated,
    /// Favorite levels changed.
    FavoritesUpdated,
    /// The active profile changed.
    ProfileChanged,
    /// A background task finished.
    TaskFinished(TaskOutcome),
    /// A message box was answered.
    MessageBox(MessageBoxResult),
}

/// Payload-free discriminant of [`Message`], used for observer
/// registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    Restart,
    NextLevel,
    PreviousLevel,
    Abort,
    Finish,
    Error,
    LevelsUpdated,
    FavoritesUpdated,
    ProfileChanged,
    TaskFinished,
    MessageBox,
}

impl Message {
    pub fn kind(&self) -> MessageKind {
        match self {
            Self::Restart => MessageKind::Restart,
            Self::NextLevel => MessageKind::NextLevel,
            Self::PreviousLevel => MessageKind::PreviousLevel,
            Self::Abort => MessageKind::Abort,
            Self::Finish => MessageKind::Finish,
            Self::Error => MessageKind::Error,
            Self::LevelsUpdated => MessageKind::LevelsUpdated,
            Self::FavoritesUpdated => MessageKind::FavoritesUpdated,
            Self::ProfileChanged => MessageKind::ProfileChanged,
            Self::TaskFinished(_) => MessageKind::TaskFinished,
            Self::MessageBox(_) => MessageKind::MessageBox,
        }
    }
}

//=== Envelope ============================================================

/// Where a message should be delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageTarget {
    /// A single state, by id.
    State(StateId),
    /// Every state observing the message kind.
    Broadcast,
}

impl fmt::Display for MessageTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::State(id) => write!(f, "state {}", id),
            Self::Broadcast => f.write_str("broadcast"),
        }
    }
}

/// Message queued for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub target: MessageTarget,
    pub message: Message,
}

//=========================================================================
// Unit Tests
//=========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buttons_combine_and_list_in_display_order() {
        let buttons = MsgBoxButtons::NO | MsgBoxButtons::YES;
        assert_eq!(buttons, MsgBoxButtons::YES_NO);
        assert_eq!(buttons.to_vec(), vec![MsgBoxButton::Yes, MsgBoxButton::No]);
    }

    #[test]
    fn nothing_is_never_contained() {
        assert!(!MsgBoxButtons::OK_CANCEL.contains(MsgBoxButton::Nothing));
        assert!(MsgBoxButtons::OK_CANCEL.contains(MsgBoxButton::Cancel));
        assert!(!MsgBoxButtons::OK_CANCEL.contains(MsgBoxButton::Yes));
    }

    #[test]
    fn message_kind_matches_variant() {
        let result = MessageBoxResult {
            id: MsgBoxId::Quit,
            button: MsgBoxButton::Yes,
            input: String::new(),
        };
        assert_eq!(Message::MessageBox(result).kind(), MessageKind::MessageBox);
        assert_eq!(Message::Restart.kind(), MessageKind::Restart);
    }

    #[test]
    fn target_display() {
        assert_eq!(MessageTarget::Broadcast.to_string(), "broadcast");
        assert_eq!(
            MessageTarget::State(StateId::from_raw(3)).to_string(),
            "state #3"
        );
    }
}
