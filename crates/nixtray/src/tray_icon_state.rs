use nixtray_core::StatusTone;

/// Tray icon states, one color each.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrayIconState {
    /// Up to date.
    Idle,
    /// Newer flake inputs are available.
    UpdatesAvailable,
    /// An operation is running.
    Busy,
    /// The last operation failed.
    Error,
}

impl TrayIconState {
    /// RGBA fill of the generated icon.
    pub fn color(self) -> [u8; 4] {
        match self {
            TrayIconState::Idle => [0x4c, 0xaf, 0x50, 0xff],
            TrayIconState::UpdatesAvailable => [0x21, 0x96, 0xf3, 0xff],
            TrayIconState::Busy => [0xff, 0xa0, 0x00, 0xff],
            TrayIconState::Error => [0xe5, 0x39, 0x35, 0xff],
        }
    }
}

impl From<StatusTone> for TrayIconState {
    fn from(tone: StatusTone) -> Self {
        match tone {
            StatusTone::Ready => TrayIconState::Idle,
            StatusTone::UpdatesAvailable => TrayIconState::UpdatesAvailable,
            StatusTone::Busy => TrayIconState::Busy,
            StatusTone::Failed => TrayIconState::Error,
        }
    }
}
