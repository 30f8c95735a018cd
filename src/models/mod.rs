/// ML модели: применение предобученного классификатора и его оценка

pub mod classifier;
pub mod evaluation;

pub use classifier::{BinaryClassifier, GradientBoostedTrees};
pub use evaluation::evaluate;
