//! ArrangeMirrorsUseCase: tiles every adopted mirror across the screen.
//!
//! The grid arithmetic lives in [`fleet_core::arrange`]; this use case feeds
//! it the adopted sessions of a [`MirrorRegistry`] in insertion order and
//! applies the result to each container.
//!
//! The layout picks heights from each device's aspect ratio already, but the
//! geometry is applied in one step (position and size together), which the
//! window system reports as a resize.  Aspect enforcement is therefore
//! switched off for the duration of each `set_geometry` call and restored
//! afterwards, so the session does not "correct" the very size it was given.
//! The adopted mirror window is then fitted to the new content area.

use fleet_core::{arrange, LayoutError, LayoutInput, LayoutResult, ScreenRect};
use tracing::{info, warn};

use crate::application::manage_mirrors::MirrorRegistry;
use crate::infrastructure::window_host::{WindowHostError, WindowRect};

/// What [`arrange_mirrors`] applied.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArrangeReport {
    pub layout: LayoutResult,
    /// Containers whose geometry could not be applied.
    pub failures: Vec<(String, WindowHostError)>,
}

impl ArrangeReport {
    pub fn applied(&self) -> usize {
        self.layout.windows.len() - self.failures.len()
    }
}

/// Arranges the adopted sessions of `registry` in `columns` columns on `screen`.
///
/// A container that rejects its geometry is logged and reported; the rest of
/// the grid is still applied.
///
/// # Errors
///
/// [`LayoutError::ZeroColumns`] when `columns` is 0; nothing is moved.
pub fn arrange_mirrors(
    registry: &MirrorRegistry,
    columns: u32,
    screen: ScreenRect,
) -> Result<ArrangeReport, LayoutError> {
    let entries: Vec<_> = registry.adopted().collect();
    let inputs: Vec<LayoutInput> = entries
        .iter()
        .map(|e| {
            let aspect = e.session.aspect();
            LayoutInput {
                serial: e.serial().to_string(),
                aspect_ratio: aspect.ratio(),
                sidebar_width: aspect.sidebar_width(),
            }
        })
        .collect();

    let layout = arrange(&inputs, columns, screen)?;
    let mut failures = Vec::new();

    for (entry, geometry) in entries.iter().zip(&layout.windows) {
        let _unlocked = entry.session.unlock_aspect();
        let applied = entry
            .container
            .set_geometry(WindowRect::from(geometry))
            .and_then(|()| {
                entry
                    .session
                    .fit_mirror(entry.container.as_ref(), geometry.width, geometry.height)
            });
        if let Err(e) = applied {
            warn!(serial = %geometry.serial, error = %e, "failed to apply layout geometry");
            failures.push((geometry.serial.clone(), e));
        }
    }

    info!(
        windows = layout.windows.len(),
        columns = layout.columns,
        rows = layout.rows,
        failed = failures.len(),
        "mirror windows arranged"
    );
    Ok(ArrangeReport { layout, failures })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
