//! Entity store and components, on top of hecs.

pub mod components;
pub mod grid;

pub mod prelude {
    pub use super::components::*;
    pub use super::grid::{Grid, ObjectId};
}
