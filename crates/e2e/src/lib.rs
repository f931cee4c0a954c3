//! Signage CMS E2E Verification Harness
//!
//! Proves, without human intervention, that a configuration change made
//! in the CMS editor surface is persisted and consumed by the display
//! surface, across two isolated browsing contexts that share no live
//! memory.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 Scenario Runner (runner.rs)                 │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ServerHandle (server.rs)                                   │
//! │    spawn process group → poll readiness → kill whole tree   │
//! │  Session / Context (browser.rs)                             │
//! │    headless Chromium over CDP, isolated browsing contexts   │
//! │  EditorDriver (editor.rs)                                   │
//! │    tab → first card → Configurar → folder → Guardar         │
//! │  CapturedState (state.rs)                                   │
//! │    cms_screens + cms_media_files, copied verbatim           │
//! │  DisplayDriver (display.rs)                                 │
//! │    5-click reveal → select screen → Guardar → image shows   │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! The two surfaces only share state through client-local storage, so the
//! harness fakes a shared backend: it captures the editor context's
//! persisted keys after the mutation and injects them, byte for byte,
//! into the display context before its meaningful load. Server and
//! browser teardown run on every exit path; a leaked dev server would
//! break every subsequent run.

pub mod browser;
pub mod display;
pub mod editor;
pub mod error;
pub mod runner;
pub mod server;
pub mod state;

pub use error::{HarnessError, HarnessResult};
pub use runner::{Scenario, ScenarioConfig};
pub use state::CapturedState;
