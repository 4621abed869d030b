//! Scene state: director, scrub spring and input cells.

mod director;
mod input;
mod spring;

pub use director::{DirectorInput, SceneDirector, SceneFrame};
pub use input::InputCells;
pub use spring::{ScrubSpring, SpringDrive};
