//! Random forest classifier exported by the training pipeline.
//!
//! Trees follow scikit-learn's layout: a split sends a row left when
//! `x[feature] <= threshold`, and a leaf stores per-class weights. A tree's
//! distribution is its normalized leaf; the forest averages over trees.

use crate::classifier::Predictor;
use playcaller_core::{Error, Label, Result};
use serde::{Deserialize, Serialize};

/// Serialized forest, as written by the training scripts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForestArtifact {
    /// Training column names, in order
    #[serde(default)]
    pub feature_names: Option<Vec<String>>,

    /// Column count, required when `feature_names` is absent
    #[serde(default)]
    pub n_features: Option<usize>,

    /// Class labels in the model's internal order
    pub classes: Vec<Label>,

    /// Estimators
    pub trees: Vec<TreeArtifact>,
}

/// One serialized decision tree, nodes in pre-order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeArtifact {
    pub nodes: Vec<NodeArtifact>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NodeArtifact {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        value: Vec<f64>,
    },
}

#[derive(Debug, Clone)]
enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf(Vec<f64>),
}

#[derive(Debug, Clone)]
struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    /// Walk from the root to a leaf distribution.
    ///
    /// Children always sit after their parent (checked on load), so the
    /// walk terminates in at most `nodes.len()` steps.
    fn leaf(&self, features: &[f64]) -> &[f64] {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf(dist) => return dist,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if features[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }
}

/// Validated, ready-to-serve random forest
#[derive(Debug, Clone)]
pub struct RandomForest {
    feature_names: Option<Vec<String>>,
    n_features: usize,
    classes: Vec<Label>,
    trees: Vec<Tree>,
}

impl RandomForest {
    /// Validate an artifact and build the forest
    pub fn from_artifact(artifact: ForestArtifact) -> Result<Self> {
        let n_features = match (&artifact.feature_names, artifact.n_features) {
            (Some(names), Some(n)) if names.len() != n => {
                return Err(Error::artifact(format!(
                    "feature_names has {} entries but n_features is {}",
                    names.len(),
                    n
                )))
            }
            (Some(names), _) => names.len(),
            (None, Some(n)) => n,
            (None, None) => {
                return Err(Error::artifact(
                    "artifact must declare feature_names or n_features",
                ))
            }
        };

        if n_features == 0 {
            return Err(Error::artifact("model expects zero features"));
        }
        if artifact.classes.is_empty() {
            return Err(Error::artifact("model has no classes"));
        }
        if artifact.trees.is_empty() {
            return Err(Error::artifact("forest has no trees"));
        }

        let n_classes = artifact.classes.len();
        let trees = artifact
            .trees
            .into_iter()
            .enumerate()
            .map(|(t, tree)| build_tree(t, tree, n_features, n_classes))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            feature_names: artifact.feature_names,
            n_features,
            classes: artifact.classes,
            trees,
        })
    }
}

fn build_tree(
    tree_idx: usize,
    tree: TreeArtifact,
    n_features: usize,
    n_classes: usize,
) -> Result<Tree> {
    if tree.nodes.is_empty() {
        return Err(Error::artifact(format!("tree {} has no nodes", tree_idx)));
    }

    let n_nodes = tree.nodes.len();
    let mut nodes = Vec::with_capacity(n_nodes);

    for (idx, node) in tree.nodes.into_iter().enumerate() {
        let invalid = |msg: String| Error::artifact(format!("tree {} node {}: {}", tree_idx, idx, msg));

        let node = match node {
            NodeArtifact::Split {
                feature,
                threshold,
                left,
                right,
            } => {
                if feature >= n_features {
                    return Err(invalid(format!(
                        "feature index {} out of range for {} features",
                        feature, n_features
                    )));
                }
                if !threshold.is_finite() {
                    return Err(invalid("threshold is not finite".to_string()));
                }
                for child in [left, right] {
                    if child <= idx || child >= n_nodes {
                        return Err(invalid(format!("child index {} is not after its parent", child)));
                    }
                }
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                }
            }
            NodeArtifact::Leaf { value } => {
                if value.len() != n_classes {
                    return Err(invalid(format!(
                        "leaf has {} weights for {} classes",
                        value.len(),
                        n_classes
                    )));
                }
                if value.iter().any(|w| !w.is_finite() || *w < 0.0) {
                    return Err(invalid("leaf weights must be finite and non-negative".to_string()));
                }
                let total: f64 = value.iter().sum();
                if total <= 0.0 {
                    return Err(invalid("leaf weights sum to zero".to_string()));
                }
                Node::Leaf(value.into_iter().map(|w| w / total).collect())
            }
        };
        nodes.push(node);
    }

    Ok(Tree { nodes })
}

impl Predictor for RandomForest {
    fn classes(&self) -> &[Label] {
        &self.classes
    }

    fn n_features(&self) -> usize {
        self.n_features
    }

    fn feature_names(&self) -> Option<&[String]> {
        self.feature_names.as_deref()
    }

    fn predict_proba(&self, features: &[f64]) -> Result<Vec<f64>> {
        if features.len() != self.n_features {
            return Err(Error::internal(format!(
                "expected {} features, got {}",
                self.n_features,
                features.len()
            )));
        }

        let mut proba = vec![0.0; self.classes.len()];
        for tree in &self.trees {
            for (acc, p) in proba.iter_mut().zip(tree.leaf(features)) {
                *acc += p;
            }
        }

        let n_trees = self.trees.len() as f64;
        for p in &mut proba {
            *p /= n_trees;
        }

        Ok(proba)
    }
}
