//! Editor-surface driver - assigns a content folder to the first screen

use std::path::PathBuf;
use std::time::Duration;

use tracing::info;

use crate::browser::{js_string, Context};
use crate::error::{HarnessError, HarnessResult};
use crate::state::{CapturedState, MEDIA_FILES_KEY, SCREENS_KEY};

/// UI contract of the editor surface. Owned by the system under test;
/// the defaults match it, but they are data, not behavior.
#[derive(Debug, Clone)]
pub struct EditorUi {
    /// Label of the screens-management tab
    pub screens_tab_label: String,

    /// Screens grid, rendered once the tab is active
    pub screens_grid: String,

    /// Per-card action opening the folder-assignment dialog
    pub configure_label: String,

    /// Save action of the folder-assignment dialog
    pub save_label: String,

    /// Bound on each synchronization point
    pub step_timeout: Duration,
}

impl Default for EditorUi {
    fn default() -> Self {
        Self {
            screens_tab_label: "Pantallas".to_string(),
            screens_grid: r".grid.grid-cols-1.md\:grid-cols-2.lg\:grid-cols-3.gap-6".to_string(),
            configure_label: "Configurar".to_string(),
            save_label: "Guardar".to_string(),
            step_timeout: Duration::from_secs(10),
        }
    }
}

/// Drives the configuration surface through one folder-assignment
/// mutation and lifts the resulting persisted state out of the context.
pub struct EditorDriver {
    url: String,
    ui: EditorUi,
    screenshot_path: PathBuf,
}

impl EditorDriver {
    pub fn new(url: String, ui: EditorUi, screenshot_path: PathBuf) -> Self {
        Self {
            url,
            ui,
            screenshot_path,
        }
    }

    /// Assign `folder_label` to the first screen card, confirm the card
    /// reflects the change, screenshot, and capture the persisted keys.
    pub async fn configure_first_screen(
        &self,
        ctx: &Context,
        folder_label: &str,
    ) -> HarnessResult<CapturedState> {
        let t = self.ui.step_timeout;

        info!("Configuring first screen with folder \"{}\"", folder_label);
        ctx.goto(&self.url).await?;

        // Screens tab, then the grid behind it.
        ctx.click_by_text("[role=\"tab\"]", &self.ui.screens_tab_label, t)
            .await?;
        ctx.wait_for_element(&self.ui.screens_grid, t).await?;

        // The first card's configure action opens the folder dialog.
        let first_card = format!("{} > div:first-of-type", self.ui.screens_grid);
        let configure_button = format!("{} button", first_card);
        ctx.click_by_text(&configure_button, &self.ui.configure_label, t)
            .await?;

        // Folder combobox lives in the dialog; its options render in a
        // document-level portal.
        ctx.click("[role=\"dialog\"] [role=\"combobox\"]", t).await?;
        ctx.click_by_text("[role=\"option\"]", folder_label, t).await?;
        ctx.click_by_text("[role=\"dialog\"] button", &self.ui.save_label, t)
            .await?;

        // Positive confirmation: the mutation round-tripped through the
        // UI, not just the form.
        self.assert_card_shows(ctx, &first_card, folder_label).await?;

        ctx.screenshot(&self.screenshot_path).await?;

        CapturedState::capture(ctx, &[SCREENS_KEY, MEDIA_FILES_KEY]).await
    }

    async fn assert_card_shows(
        &self,
        ctx: &Context,
        card: &str,
        label: &str,
    ) -> HarnessResult<()> {
        let predicate = format!(
            "(() => {{ const card = document.querySelector({}); \
             return !!card && (card.textContent || '').includes({}); }})()",
            js_string(card),
            js_string(label),
        );
        match ctx
            .wait_until("updated first screen card", &predicate, self.ui.step_timeout)
            .await
        {
            Err(HarnessError::WaitTimeout { .. }) => Err(HarnessError::AssertionFailed(format!(
                "first screen card never showed \"{}\"",
                label
            ))),
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ui_defaults_match_the_editor_surface() {
        let ui = EditorUi::default();
        assert_eq!(ui.screens_tab_label, "Pantallas");
        assert_eq!(ui.configure_label, "Configurar");
        assert_eq!(ui.save_label, "Guardar");
        // Tailwind class selectors need their colons escaped for
        // querySelector to accept them.
        assert!(ui.screens_grid.contains("\\:"));
    }
}
