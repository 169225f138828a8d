use tutor_core::backend::ContentViewer;
use tutor_core::types::JumpTarget;

use crate::render::format_clock;

/// Stands in for the PDF renderer or video player: prints where it would go.
#[derive(Debug, Default)]
pub struct TerminalViewer;

pub fn describe(target: JumpTarget) -> String {
    match target {
        JumpTarget::PageIndex(index) => format!("viewer: showing page index {}", index),
        JumpTarget::Seek { seconds } => format!("viewer: playing from {}", format_clock(seconds)),
    }
}

impl ContentViewer for TerminalViewer {
    fn jump_to(&self, target: JumpTarget) {
        tracing::debug!(?target, "Viewer jump");
        println!("{}", describe(target));
    }
}
