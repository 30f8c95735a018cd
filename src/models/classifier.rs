//! Предобученный бинарный классификатор несоответствия.
//!
//! Модель обучается вне сервиса и выгружается через LightGBM
//! `booster.dump_model()` в JSON. Здесь она только применяется.

use std::collections::BTreeMap;
use std::path::Path;

use ndarray::{Array1, Array2, ArrayView1};
use serde::Deserialize;

use crate::error::{PipelineError, Result};
use crate::types::MODEL_FEATURES;

/// Порог LightGBM для "нулевого" значения признака
const ZERO_THRESHOLD: f64 = 1e-35;

/// Общий интерфейс бинарного классификатора
pub trait BinaryClassifier {
    /// Имена признаков в порядке столбцов матрицы
    fn feature_names(&self) -> &[String];

    /// Вероятность класса 1 для каждой строки
    fn predict_proba(&self, features: &Array2<f64>) -> Result<Array1<f64>>;

    /// Важность признаков, выровненная по `feature_names`
    fn feature_importances(&self) -> Vec<f64>;

    fn predict(&self, features: &Array2<f64>) -> Result<Array1<u8>> {
        Ok(self.predict_proba(features)?.mapv(|p| u8::from(p > 0.5)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
enum MissingType {
    None,
    Zero,
    NaN,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
enum TreeNode {
    Split {
        split_feature: usize,
        threshold: f64,
        decision_type: String,
        default_left: bool,
        missing_type: MissingType,
        left_child: Box<TreeNode>,
        right_child: Box<TreeNode>,
    },
    Leaf {
        leaf_value: f64,
    },
}

impl TreeNode {
    fn predict(&self, sample: &ArrayView1<f64>) -> f64 {
        match self {
            TreeNode::Leaf { leaf_value } => *leaf_value,
            TreeNode::Split {
                split_feature,
                threshold,
                default_left,
                missing_type,
                left_child,
                right_child,
                ..
            } => {
                let mut value = sample[*split_feature];
                if value.is_nan() && *missing_type != MissingType::NaN {
                    value = 0.0;
                }

                let is_missing = match missing_type {
                    MissingType::Zero => value.abs() < ZERO_THRESHOLD,
                    MissingType::NaN => value.is_nan(),
                    MissingType::None => false,
                };

                let go_left = if is_missing { *default_left } else { value <= *threshold };
                if go_left {
                    left_child.predict(sample)
                } else {
                    right_child.predict(sample)
                }
            }
        }
    }

    /// Проверка узлов и подсчёт разбиений по признакам
    fn visit(&self, n_features: usize, splits: &mut [f64]) -> std::result::Result<(), String> {
        match self {
            TreeNode::Leaf { .. } => Ok(()),
            TreeNode::Split {
                split_feature,
                decision_type,
                left_child,
                right_child,
                ..
            } => {
                if decision_type != "<=" {
                    return Err(format!("unsupported decision type {decision_type:?}"));
                }
                if *split_feature >= n_features {
                    return Err(format!("split on feature {split_feature}, model has {n_features}"));
                }
                splits[*split_feature] += 1.0;
                left_child.visit(n_features, splits)?;
                right_child.visit(n_features, splits)
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct TreeInfo {
    tree_structure: TreeNode,
}

#[derive(Debug, Deserialize)]
struct ModelDump {
    objective: String,
    feature_names: Vec<String>,
    tree_info: Vec<TreeInfo>,
    #[serde(default)]
    feature_importances: Option<BTreeMap<String, f64>>,
}

/// Ансамбль деревьев градиентного бустинга с сигмоидой на выходе
#[derive(Debug, Clone)]
pub struct GradientBoostedTrees {
    feature_names: Vec<String>,
    trees: Vec<TreeNode>,
    sigmoid: f64,
    importances: Vec<f64>,
}

impl GradientBoostedTrees {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| PipelineError::ModelLoad {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let model = Self::from_json_str(&content, path)?;

        tracing::info!(
            "Classifier loaded from {}: {} trees over {} features",
            path.display(),
            model.trees.len(),
            model.feature_names.len()
        );
        Ok(model)
    }

    /// Разбор выгрузки модели; `origin` нужен только для сообщений об ошибках
    pub fn from_json_str(json: &str, origin: &Path) -> Result<Self> {
        let model_load = |message: String| PipelineError::ModelLoad {
            path: origin.to_path_buf(),
            message,
        };

        let dump: ModelDump = serde_json::from_str(json).map_err(|e| model_load(e.to_string()))?;

        if dump.feature_names != MODEL_FEATURES {
            return Err(PipelineError::FeatureMismatch {
                expected: MODEL_FEATURES.iter().map(|s| s.to_string()).collect(),
                found: dump.feature_names,
            });
        }

        let sigmoid = parse_sigmoid(&dump.objective).map_err(model_load)?;

        let n_features = dump.feature_names.len();
        let mut split_counts = vec![0.0; n_features];
        let trees: Vec<TreeNode> = dump.tree_info.into_iter().map(|t| t.tree_structure).collect();
        for tree in &trees {
            tree.visit(n_features, &mut split_counts).map_err(model_load)?;
        }

        let importances = match dump.feature_importances {
            Some(map) => dump
                .feature_names
                .iter()
                .map(|name| map.get(name).copied().unwrap_or(0.0))
                .collect(),
            None => split_counts,
        };

        Ok(Self {
            feature_names: dump.feature_names,
            trees,
            sigmoid,
            importances,
        })
    }

    /// Сумма листьев всех деревьев
    pub fn raw_score(&self, sample: &ArrayView1<f64>) -> f64 {
        self.trees.iter().map(|tree| tree.predict(sample)).sum()
    }
}

fn parse_sigmoid(objective: &str) -> std::result::Result<f64, String> {
    let mut parts = objective.split_whitespace();
    if parts.next() != Some("binary") {
        return Err(format!("objective {objective:?} is not a binary classifier"));
    }

    // "binary sigmoid:1"; без параметра sigmoid = 1
    match parts.find_map(|p| p.strip_prefix("sigmoid:")) {
        Some(value) => value
            .parse::<f64>()
            .map_err(|_| format!("invalid sigmoid parameter in {objective:?}")),
        None => Ok(1.0),
    }
}

impl BinaryClassifier for GradientBoostedTrees {
    fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    fn predict_proba(&self, features: &Array2<f64>) -> Result<Array1<f64>> {
        if features.ncols() != self.feature_names.len() {
            return Err(PipelineError::FeatureMismatch {
                expected: self.feature_names.clone(),
                found: (0..features.ncols()).map(|i| format!("column {i}")).collect(),
            });
        }

        Ok(features
            .rows()
            .into_iter()
            .map(|row| 1.0 / (1.0 + (-self.sigmoid * self.raw_score(&row)).exp()))
            .collect())
    }

    fn feature_importances(&self) -> Vec<f64> {
        self.importances.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    /// Одно дерево: LOG_ADIWIYATA_PER_KM2 <= 0.5, пропуск влево;
    /// справа разбиение по PERSEN_RTH с пропусками как нулями.
    fn model_json(names: &[&str], objective: &str, importances: &str) -> String {
        format!(
            r#"{{
                "name": "tree",
                "objective": "{objective}",
                "feature_names": {names},
                "tree_info": [
                    {{
                        "tree_index": 0,
                        "tree_structure": {{
                            "split_index": 0,
                            "split_feature": 0,
                            "threshold": 0.5,
                            "decision_type": "<=",
                            "default_left": true,
                            "missing_type": "NaN",
                            "left_child": {{ "leaf_index": 0, "leaf_value": -2.0 }},
                            "right_child": {{
                                "split_index": 1,
                                "split_feature": 3,
                                "threshold": 10.0,
                                "decision_type": "<=",
                                "default_left": false,
                                "missing_type": "Zero",
                                "left_child": {{ "leaf_index": 1, "leaf_value": 1.5 }},
                                "right_child": {{ "leaf_index": 2, "leaf_value": -0.5 }}
                            }}
                        }}
                    }},
                    {{ "tree_index": 1, "tree_structure": {{ "leaf_value": 0.25 }} }}
                ]{importances}
            }}"#,
            names = serde_json::to_string(names).unwrap(),
        )
    }

    fn model() -> GradientBoostedTrees {
        GradientBoostedTrees::from_json_str(&model_json(&MODEL_FEATURES, "binary sigmoid:1", ""), Path::new("m.json"))
            .unwrap()
    }

    fn sigmoid(x: f64) -> f64 {
        1.0 / (1.0 + (-x).exp())
    }

    #[test]
    fn sums_leaves_and_applies_sigmoid() {
        let x = array![
            [0.1, 1.0, 1.0, 5.0, 100.0],
            [0.9, 1.0, 1.0, 5.0, 100.0],
            [0.9, 1.0, 1.0, 50.0, 100.0],
        ];
        let proba = model().predict_proba(&x).unwrap();

        assert!((proba[0] - sigmoid(-1.75)).abs() < 1e-12);
        assert!((proba[1] - sigmoid(1.75)).abs() < 1e-12);
        assert!((proba[2] - sigmoid(-0.25)).abs() < 1e-12);
        assert_eq!(model().predict(&x).unwrap(), array![0u8, 1, 0]);
    }

    #[test]
    fn routes_missing_values_like_lightgbm() {
        let nan = f64::NAN;
        let x = array![
            // NaN при missing_type NaN идёт по default_left
            [nan, 1.0, 1.0, 50.0, 100.0],
            // NaN при missing_type Zero считается нулём, default_left = false
            [0.9, 1.0, 1.0, nan, 100.0],
        ];
        let proba = model().predict_proba(&x).unwrap();
        assert!((proba[0] - sigmoid(-1.75)).abs() < 1e-12);
        assert!((proba[1] - sigmoid(-0.25)).abs() < 1e-12);
    }

    #[test]
    fn importances_default_to_split_counts() {
        assert_eq!(model().feature_importances(), vec![1.0, 0.0, 0.0, 1.0, 0.0]);

        let with_map = model_json(
            &MODEL_FEATURES,
            "binary sigmoid:1",
            r#", "feature_importances": { "PERSEN_RTH": 7, "LUAS_WILAYAH": 2 }"#,
        );
        let model = GradientBoostedTrees::from_json_str(&with_map, Path::new("m.json")).unwrap();
        assert_eq!(model.feature_importances(), vec![0.0, 0.0, 0.0, 7.0, 2.0]);
    }

    #[test]
    fn sigmoid_parameter_scales_raw_score() {
        let json = model_json(&MODEL_FEATURES, "binary sigmoid:2", "");
        let model = GradientBoostedTrees::from_json_str(&json, Path::new("m.json")).unwrap();
        let x = array![[0.1, 1.0, 1.0, 5.0, 100.0]];
        assert!((model.predict_proba(&x).unwrap()[0] - sigmoid(-3.5)).abs() < 1e-12);
    }

    #[test]
    fn rejects_other_feature_order() {
        let mut names = MODEL_FEATURES;
        names.swap(0, 1);
        let err = GradientBoostedTrees::from_json_str(&model_json(&names, "binary sigmoid:1", ""), Path::new("m.json"))
            .unwrap_err();
        assert!(matches!(err, PipelineError::FeatureMismatch { .. }));
    }

    #[test]
    fn rejects_non_binary_and_garbage() {
        let err = GradientBoostedTrees::from_json_str(&model_json(&MODEL_FEATURES, "regression", ""), Path::new("m.json"))
            .unwrap_err();
        assert_eq!(err.kind(), "model_load");

        let err = GradientBoostedTrees::from_json_str("\u{80}pickle", Path::new("m.pkl")).unwrap_err();
        assert_eq!(err.kind(), "model_load");
        assert!(err.to_string().contains("dump_model"));
    }

    #[test]
    fn missing_file_is_model_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = GradientBoostedTrees::load(&dir.path().join("absent.json")).unwrap_err();
        assert_eq!(err.kind(), "model_load");
    }
}
