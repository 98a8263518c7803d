pub mod knn;
pub mod running_average;

pub use knn::KnnModel;
pub use running_average::RunningAverageModel;
