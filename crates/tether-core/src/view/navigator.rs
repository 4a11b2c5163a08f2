//! Navigation port.

use tether_types::view::{NavTarget, Surface};

/// Moves the UI between surfaces.
///
/// Implemented by the presentation layer (the CLI prints the target; a GUI
/// would route). Calls are synchronous and must not block.
pub trait Navigator: Send + Sync {
    /// The kind of view currently presented.
    fn current_surface(&self) -> Surface;

    fn navigate(&self, target: NavTarget);
}
