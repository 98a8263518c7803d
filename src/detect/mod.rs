mod backend;
mod backends;
pub mod contours;
pub mod morphology;
mod result;
pub mod select;

pub use backend::{build_model, learning_rate, BackgroundModel, ModelKind, ModelSettings};
pub use backends::{KnnModel, RunningAverageModel};
pub use contours::extract;
pub use morphology::erode;
pub use result::{BoundingBox, Point, Region};
pub use select::{select, SelectionParams};
