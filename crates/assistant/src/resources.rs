//! Process-wide assistant instance.
//!
//! Model loading is expensive, so the first successful call builds the
//! assistant and every later call reuses it. A failed construction is not
//! remembered; the next call tries again.

use crate::assistant::Assistant;
use crate::config::AssistantSettings;
use crate::error::Result;
use once_cell::sync::OnceCell;
use std::sync::Arc;

static SHARED: OnceCell<Arc<Assistant>> = OnceCell::new();

/// The shared assistant, constructed from `settings` on first use.
///
/// Settings passed after the first successful call are ignored.
pub fn shared(settings: &AssistantSettings) -> Result<Arc<Assistant>> {
    let assistant = SHARED.get_or_try_init(|| {
        log::debug!("Constructing shared assistant");
        Assistant::from_settings(settings).map(Arc::new)
    })?;
    Ok(Arc::clone(assistant))
}

/// The shared assistant if it has already been constructed.
#[must_use]
pub fn get() -> Option<Arc<Assistant>> {
    SHARED.get().cloned()
}
