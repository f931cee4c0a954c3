//! Display-surface driver - reveal flow, screen selection, media assertion

use std::path::PathBuf;
use std::time::Duration;

use tracing::info;

use crate::browser::{js_string, Context};
use crate::error::{HarnessError, HarnessResult};

/// UI contract of the display surface. The reveal count and the content
/// settle bound are properties of the system under test, not tunables the
/// harness gets to negotiate.
#[derive(Debug, Clone)]
pub struct DisplayUi {
    /// Click target that reveals the hidden settings form
    pub reveal_zone: String,

    /// Activations required to reveal the form
    pub reveal_clicks: usize,

    /// Modal containing the settings form
    pub config_modal: String,

    /// Native select listing the available screens
    pub screen_select: String,

    /// Save action of the settings form
    pub save_label: String,

    /// Rendered image-typed media content
    pub media_element: String,

    /// Bound on each synchronization point
    pub step_timeout: Duration,

    /// Worst-case wait for the content-rotation timer to present content
    pub content_settle: Duration,
}

impl Default for DisplayUi {
    fn default() -> Self {
        Self {
            reveal_zone: "#clickZone".to_string(),
            reveal_clicks: 5,
            config_modal: "#configModal".to_string(),
            screen_select: "#screenSelect".to_string(),
            save_label: "Guardar".to_string(),
            media_element: "img.media-content".to_string(),
            step_timeout: Duration::from_secs(10),
            content_settle: Duration::from_secs(2),
        }
    }
}

/// Drives the display surface's local configuration flow and asserts
/// that image content renders for the selected screen.
pub struct DisplayDriver {
    ui: DisplayUi,
    screenshot_path: PathBuf,
}

impl DisplayDriver {
    pub fn new(ui: DisplayUi, screenshot_path: PathBuf) -> Self {
        Self {
            ui,
            screenshot_path,
        }
    }

    /// Select `screen_id` through the hidden settings form and assert a
    /// visible image renders. Expects a context already navigated to the
    /// display root, seeded with captured state, and reloaded.
    pub async fn select_and_verify(&self, ctx: &Context, screen_id: &str) -> HarnessResult<()> {
        let t = self.ui.step_timeout;

        info!("Selecting \"{}\" on the display surface", screen_id);

        // The settings form hides behind repeated activations of the
        // reveal zone.
        ctx.wait_for_element(&self.ui.reveal_zone, t).await?;
        for _ in 0..self.ui.reveal_clicks {
            ctx.click(&self.ui.reveal_zone, t).await?;
        }

        // The injected state must surface as a selectable option before
        // anything is picked.
        let option_present = format!(
            "(() => {{ const sel = document.querySelector({}); \
             return !!sel && Array.from(sel.options).some(o => o.value === {}); }})()",
            js_string(&self.ui.screen_select),
            js_string(screen_id),
        );
        ctx.wait_until(
            &format!("option \"{}\" in {}", screen_id, self.ui.screen_select),
            &option_present,
            t,
        )
        .await?;

        self.select_option(ctx, screen_id).await?;

        let save_button = format!("{} button", self.ui.config_modal);
        ctx.click_by_text(&save_button, &self.ui.save_label, t).await?;

        self.assert_media_visible(ctx).await?;

        ctx.screenshot(&self.screenshot_path).await?;
        Ok(())
    }

    /// Set the native select's value and fire `change`, as a user pick
    /// would.
    async fn select_option(&self, ctx: &Context, screen_id: &str) -> HarnessResult<()> {
        let expr = format!(
            r#"(() => {{
                const sel = document.querySelector({sel});
                if (!sel) return false;
                sel.value = {id};
                sel.dispatchEvent(new Event('change', {{ bubbles: true }}));
                return sel.value === {id};
            }})()"#,
            sel = js_string(&self.ui.screen_select),
            id = js_string(screen_id),
        );
        if !ctx.eval::<bool>(&expr).await? {
            return Err(HarnessError::AssertionFailed(format!(
                "could not select option \"{}\" in {}",
                screen_id, self.ui.screen_select
            )));
        }
        Ok(())
    }

    async fn assert_media_visible(&self, ctx: &Context) -> HarnessResult<()> {
        let visible = format!(
            "(() => {{ const el = document.querySelector({}); if (!el) return false; \
             const r = el.getBoundingClientRect(); return r.width > 0 && r.height > 0; }})()",
            js_string(&self.ui.media_element),
        );
        match ctx
            .wait_until("visible media content", &visible, self.ui.content_settle)
            .await
        {
            Err(HarnessError::WaitTimeout { .. }) => Err(HarnessError::AssertionFailed(format!(
                "no visible `{}` within {:?} of saving",
                self.ui.media_element, self.ui.content_settle
            ))),
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ui_defaults_match_the_display_surface() {
        let ui = DisplayUi::default();
        assert_eq!(ui.reveal_clicks, 5);
        assert_eq!(ui.reveal_zone, "#clickZone");
        assert_eq!(ui.screen_select, "#screenSelect");
        assert_eq!(ui.content_settle, Duration::from_secs(2));
        // The assertion targets image-typed content specifically.
        assert!(ui.media_element.starts_with("img"));
    }
}
