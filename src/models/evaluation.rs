//! Оценка классификатора против эталонных меток

use chrono::Utc;
use ndarray::Array1;

use super::classifier::BinaryClassifier;
use crate::error::{PipelineError, Result};
use crate::preprocessing::FeatureEngineer;
use crate::types::{
    AverageMetrics, ClassMetrics, ClassificationReport, ConfusionMatrix, FeatureImportance, LabelCount,
    LabelSet, ModelResults, RegionPrediction,
};

/// Имена классов в отчёте
pub const CLASS_NAMES: [&str; 2] = ["Selaras", "Tdk Selaras"];

/// Подписи классов в распределении меток
pub const CLASS_DESCRIPTIONS: [&str; 2] = ["Relatif Selaras", "Tidak Selaras"];

/// Строки - фактический класс, столбцы - прогноз
pub fn confusion_matrix(actual: &Array1<u8>, predicted: &Array1<u8>) -> ConfusionMatrix {
    let mut matrix = [[0usize; 2]; 2];
    for (&a, &p) in actual.iter().zip(predicted.iter()) {
        matrix[usize::from(a.min(1))][usize::from(p.min(1))] += 1;
    }
    ConfusionMatrix(matrix)
}

pub fn accuracy(matrix: &ConfusionMatrix) -> f64 {
    let [[tn, fp], [fn_, tp]] = matrix.0;
    let total = tn + fp + fn_ + tp;
    if total == 0 {
        0.0
    } else {
        (tn + tp) as f64 / total as f64
    }
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

/// Precision/recall/F1 по обоим классам; деление на ноль даёт 0
pub fn classification_report(matrix: &ConfusionMatrix) -> ClassificationReport {
    let m = matrix.0;

    let classes: Vec<ClassMetrics> = (0..2)
        .map(|class| {
            let true_positive = m[class][class];
            let predicted = m[0][class] + m[1][class];
            let support = m[class][0] + m[class][1];

            let precision = ratio(true_positive, predicted);
            let recall = ratio(true_positive, support);
            let f1_score = if precision + recall == 0.0 {
                0.0
            } else {
                2.0 * precision * recall / (precision + recall)
            };

            ClassMetrics {
                class: class as u8,
                label: CLASS_NAMES[class].to_string(),
                precision,
                recall,
                f1_score,
                support,
            }
        })
        .collect();

    let weights: Vec<f64> = classes.iter().map(|c| c.support as f64).collect();
    let macro_avg = average(&classes, &[1.0, 1.0]);
    let weighted_avg = average(&classes, &weights);

    ClassificationReport {
        accuracy: accuracy(matrix),
        macro_avg,
        weighted_avg,
        classes,
    }
}

/// Взвешенное среднее метрик классов; macro - равные веса, weighted - support
fn average(classes: &[ClassMetrics], weights: &[f64]) -> AverageMetrics {
    let norm: f64 = weights.iter().sum();
    let mean = |metric: fn(&ClassMetrics) -> f64| {
        if norm == 0.0 {
            0.0
        } else {
            classes.iter().zip(weights).map(|(c, w)| w * metric(c)).sum::<f64>() / norm
        }
    };

    AverageMetrics {
        precision: mean(|c| c.precision),
        recall: mean(|c| c.recall),
        f1_score: mean(|c| c.f1_score),
        support: classes.iter().map(|c| c.support).sum(),
    }
}

pub fn label_distribution(labels: &Array1<u8>) -> Vec<LabelCount> {
    (0..2u8)
        .map(|label| LabelCount {
            label,
            description: CLASS_DESCRIPTIONS[usize::from(label)].to_string(),
            count: labels.iter().filter(|&&l| l == label).count(),
        })
        .collect()
}

/// Важности по убыванию; равные сохраняют порядок признаков
pub fn ranked_importances(names: &[String], importances: &[f64]) -> Vec<FeatureImportance> {
    let mut ranked: Vec<FeatureImportance> = names
        .iter()
        .zip(importances)
        .map(|(feature, &importance)| FeatureImportance {
            feature: feature.clone(),
            importance,
        })
        .collect();
    ranked.sort_by(|a, b| b.importance.total_cmp(&a.importance));
    ranked
}

/// Прогноз на размеченных регионах и полный набор метрик
pub fn evaluate(classifier: &dyn BinaryClassifier, labels: &LabelSet) -> Result<ModelResults> {
    if labels.rows.is_empty() {
        return Err(PipelineError::EmptyDataset("no labelled regions to evaluate".to_string()));
    }

    let (features, actual) = FeatureEngineer::extract_labelled(&labels.rows);
    let probabilities = classifier.predict_proba(&features)?;
    let predicted = probabilities.mapv(|p| u8::from(p > 0.5));

    let matrix = confusion_matrix(&actual, &predicted);
    let report = classification_report(&matrix);

    let predictions = labels
        .rows
        .iter()
        .zip(predicted.iter().zip(probabilities.iter()))
        .map(|(row, (&predicted, &probability))| RegionPrediction {
            region: row.features.fact.region.clone(),
            actual: row.misaligned,
            predicted,
            probability,
        })
        .collect();

    tracing::info!(
        "Model evaluated on {} regions: accuracy {:.3}",
        labels.rows.len(),
        report.accuracy
    );

    Ok(ModelResults {
        accuracy: report.accuracy,
        confusion_matrix: matrix,
        feature_names: classifier.feature_names().to_vec(),
        feature_importances: ranked_importances(classifier.feature_names(), &classifier.feature_importances()),
        predicted_distribution: label_distribution(&predicted),
        actual_distribution: label_distribution(&actual),
        predictions,
        thresholds: labels.thresholds,
        reference_population: labels.reference_population,
        generated_at: Utc::now(),
        report,
    })
}
