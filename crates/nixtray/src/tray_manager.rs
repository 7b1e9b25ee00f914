//! System tray icon with status-driven updates.
//!
//! Shows one colored icon per [`TrayIconState`], a tooltip with the latest
//! status, and a context menu whose action items are disabled while an
//! operation is running.

use crate::{AppError, AppResult, TrayIconState};

use std::panic::Location;

use error_location::ErrorLocation;
use image::{ImageBuffer, Rgba, RgbaImage};
use nixtray_core::{APP_NAME, SessionSnapshot};
use tracing::{debug, info, instrument};
use tray_icon::menu::{Menu, MenuId, MenuItem, PredefinedMenuItem};
use tray_icon::{Icon, TrayIcon, TrayIconBuilder};

const ICON_SIZE: u32 = 32;

/// IDs of the actionable menu entries.
#[derive(Debug, Clone)]
pub struct MenuIds {
    /// "Check for updates".
    pub check: MenuId,
    /// "Sync + Apply".
    pub sync_apply: MenuId,
    /// "Check then Sync + Apply".
    pub check_then_sync_apply: MenuId,
    /// "Open repo folder".
    pub open_repo: MenuId,
    /// "Open log".
    pub open_log: MenuId,
    /// "About".
    pub about: MenuId,
    /// "Quit".
    pub quit: MenuId,
}

/// System tray icon manager.
pub struct TrayManager {
    tray_icon: TrayIcon,
    status_item: MenuItem,
    action_items: [MenuItem; 3],
    menu_ids: MenuIds,
    state: TrayIconState,
}

impl TrayManager {
    /// Create the tray icon and its menu in the idle state.
    #[track_caller]
    #[instrument]
    pub fn new() -> AppResult<Self> {
        let menu = Menu::new();

        let status_item = MenuItem::new("Status: Ready", false, None);
        let check_item = MenuItem::new("Check for updates", true, None);
        let sync_apply_item = MenuItem::new("Sync + Apply", true, None);
        let check_then_item = MenuItem::new("Check then Sync + Apply", true, None);
        let open_repo_item = MenuItem::new("Open repo folder", true, None);
        let open_log_item = MenuItem::new("Open log", true, None);
        let about_item = MenuItem::new("About", true, None);
        let quit_item = MenuItem::new("Quit", true, None);

        let menu_ids = MenuIds {
            check: check_item.id().clone(),
            sync_apply: sync_apply_item.id().clone(),
            check_then_sync_apply: check_then_item.id().clone(),
            open_repo: open_repo_item.id().clone(),
            open_log: open_log_item.id().clone(),
            about: about_item.id().clone(),
            quit: quit_item.id().clone(),
        };

        let actions_separator = PredefinedMenuItem::separator();
        let links_separator = PredefinedMenuItem::separator();
        let entries: [&dyn tray_icon::menu::IsMenuItem; 10] = [
            &status_item,
            &actions_separator,
            &check_item,
            &sync_apply_item,
            &check_then_item,
            &links_separator,
            &open_repo_item,
            &open_log_item,
            &about_item,
            &quit_item,
        ];
        for entry in entries {
            menu.append(entry).map_err(|e| AppError::TrayError {
                reason: format!("Failed to add menu item: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })?;
        }

        let icon = Self::load_icon(TrayIconState::Idle)?;

        let tray_icon = TrayIconBuilder::new()
            .with_tooltip(format!("{} - Ready", APP_NAME))
            .with_menu(Box::new(menu))
            .with_icon(icon)
            .build()
            .map_err(|e| AppError::TrayError {
                reason: format!("Failed to create tray icon: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })?;

        info!("System tray icon initialized");

        Ok(Self {
            tray_icon,
            status_item,
            action_items: [check_item, sync_apply_item, check_then_item],
            menu_ids,
            state: TrayIconState::Idle,
        })
    }

    /// Redraw icon, tooltip, status line and menu enablement.
    #[track_caller]
    #[instrument(skip(self))]
    pub fn apply_snapshot(&mut self, snapshot: &SessionSnapshot) -> AppResult<()> {
        let state = TrayIconState::from(snapshot.tone);
        if state != self.state {
            self.tray_icon
                .set_icon(Some(Self::load_icon(state)?))
                .map_err(|e| AppError::TrayError {
                    reason: format!("Failed to update icon: {}", e),
                    location: ErrorLocation::from(Location::caller()),
                })?;
            self.state = state;
        }

        let status_line = snapshot.status_line();
        self.tray_icon
            .set_tooltip(Some(format!("{} - {}", APP_NAME, status_line)))
            .map_err(|e| AppError::TrayError {
                reason: format!("Failed to update tooltip: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })?;

        self.status_item.set_text(status_line);

        let enabled = !snapshot.state.is_busy();
        for item in &self.action_items {
            item.set_enabled(enabled);
        }

        debug!(state = %snapshot.state, status = %snapshot.status, "Tray refreshed");

        Ok(())
    }

    /// Render a filled circle in the state's color.
    #[track_caller]
    fn load_icon(state: TrayIconState) -> AppResult<Icon> {
        let rgba: RgbaImage = render_icon(state.color());
        let (width, height) = (rgba.width(), rgba.height());

        Icon::from_rgba(rgba.into_raw(), width, height).map_err(|e| AppError::TrayError {
            reason: format!("Failed to create icon from RGBA: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })
    }

    /// IDs of the actionable menu entries.
    pub fn menu_ids(&self) -> &MenuIds {
        &self.menu_ids
    }
}

/// Filled circle of `color` on a transparent square.
pub(crate) fn render_icon(color: [u8; 4]) -> RgbaImage {
    let center = (ICON_SIZE as f32 - 1.0) / 2.0;
    let radius = ICON_SIZE as f32 / 2.0 - 1.0;

    ImageBuffer::from_fn(ICON_SIZE, ICON_SIZE, |x, y| {
        let (dx, dy) = (x as f32 - center, y as f32 - center);
        if dx * dx + dy * dy <= radius * radius {
            Rgba(color)
        } else {
            Rgba([0, 0, 0, 0])
        }
    })
}
