//! Name-keyed registry of the pluggable components.
//!
//! [`Param`] names its loss, tagger, feature family, trainer, optimization
//! and sharing type by string. A [`Registry`] maps those names to typed
//! variants. It is built once, usually with [`Registry::default`], and passed
//! by reference wherever names must be resolved.
//!
//! # Example
//!
//! ```
//! use visioner::config::Param;
//! use visioner::registry::Registry;
//!
//! let registry = Registry::default();
//! let param = Param::builder().loss("diag_exp").build().unwrap();
//!
//! let model = registry.make_model(&param).unwrap();
//! assert_eq!(model.n_outputs(), 1);
//! assert!(registry.available_losses().contains(&"jesorsky"));
//! ```

use crate::config::Param;
use crate::cv::{Tagger, TaggerKind};
use crate::model::{FeatureFamily, Model};
use crate::training::{
    Averager, FeatureSharing, Loss, LossKind, OptimizationType, TaylorBooster, Trainer, TrainerKind,
};

/// Errors raised when resolving component names.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RegistryError {
    #[error("unknown {kind} {name:?} (available: {})", available.join(", "))]
    Unknown {
        kind: &'static str,
        name: String,
        available: Vec<&'static str>,
    },
}

// =============================================================================
// Catalog
// =============================================================================

/// Ordered `name → value` table of one component kind.
#[derive(Debug, Clone)]
pub struct Catalog<T> {
    kind: &'static str,
    entries: Vec<(&'static str, &'static str, T)>,
}

impl<T: Copy> Catalog<T> {
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            entries: Vec::new(),
        }
    }

    /// Register `value` under `name`, replacing any previous entry.
    pub fn add(&mut self, name: &'static str, description: &'static str, value: T) {
        match self.entries.iter_mut().find(|(n, _, _)| *n == name) {
            Some(entry) => *entry = (name, description, value),
            None => self.entries.push((name, description, value)),
        }
    }

    pub fn get(&self, name: &str) -> Result<T, RegistryError> {
        self.entries
            .iter()
            .find(|(n, _, _)| *n == name)
            .map(|(_, _, value)| *value)
            .ok_or_else(|| RegistryError::Unknown {
                kind: self.kind,
                name: name.to_string(),
                available: self.names(),
            })
    }

    /// Registered names, in registration order.
    pub fn names(&self) -> Vec<&'static str> {
        self.entries.iter().map(|(n, _, _)| *n).collect()
    }

    /// One `name: description` line per entry.
    pub fn describe(&self) -> String {
        let width = self.entries.iter().map(|(n, _, _)| n.len()).max().unwrap_or(0);
        self.entries
            .iter()
            .map(|(n, d, _)| format!("  {n:<width$}  {d}\n"))
            .collect()
    }
}

// =============================================================================
// Registry
// =============================================================================

/// All registered components.
#[derive(Debug, Clone)]
pub struct Registry {
    losses: Catalog<LossKind>,
    taggers: Catalog<TaggerKind>,
    models: Catalog<FeatureFamily>,
    trainers: Catalog<TrainerKind>,
    optimizations: Catalog<OptimizationType>,
    sharings: Catalog<FeatureSharing>,
}

impl Default for Registry {
    fn default() -> Self {
        let mut losses = Catalog::new("loss");
        for loss in LossKind::ALL {
            losses.add(loss.name(), loss.description(), loss);
        }

        let mut taggers = Catalog::new("tagger");
        for tagger in TaggerKind::ALL {
            taggers.add(tagger.name(), tagger.description(), tagger);
        }

        let mut models = Catalog::new("feature family");
        for family in FeatureFamily::ALL {
            models.add(family.name(), family.description(), family);
        }

        let mut trainers = Catalog::new("trainer");
        for trainer in TrainerKind::ALL {
            trainers.add(trainer.name(), trainer.description(), trainer);
        }

        let mut optimizations = Catalog::new("optimization");
        optimizations.add(
            OptimizationType::Expectation.name(),
            "expected loss decrease of the gradient histogram",
            OptimizationType::Expectation,
        );

        let mut sharings = Catalog::new("sharing");
        sharings.add(
            FeatureSharing::Shared.name(),
            "one feature for all outputs",
            FeatureSharing::Shared,
        );
        sharings.add(
            FeatureSharing::Independent.name(),
            "one feature per output",
            FeatureSharing::Independent,
        );

        Self {
            losses,
            taggers,
            models,
            trainers,
            optimizations,
            sharings,
        }
    }
}

impl Registry {
    // =========================================================================
    // Resolution
    // =========================================================================

    pub fn make_loss(&self, param: &Param) -> Result<LossKind, RegistryError> {
        self.losses.get(&param.loss)
    }

    pub fn make_tagger(&self, param: &Param) -> Result<Tagger, RegistryError> {
        let kind = self.taggers.get(&param.tagger)?;
        Ok(Tagger::new(kind, param))
    }

    pub fn make_optimization(&self, param: &Param) -> Result<OptimizationType, RegistryError> {
        self.optimizations.get(&param.optimization)
    }

    pub fn make_sharing(&self, param: &Param) -> Result<FeatureSharing, RegistryError> {
        self.sharings.get(&param.sharing)
    }

    /// Untrained model on the coarsest pool of the named feature family,
    /// with as many outputs as the named tagger produces.
    pub fn make_model(&self, param: &Param) -> Result<Model, RegistryError> {
        let family = self.models.get(&param.feature)?;
        let tagger = self.make_tagger(param)?;
        Ok(Model::new(param.clone(), family, tagger.n_outputs()))
    }

    pub fn make_trainer(&self, param: &Param) -> Result<Trainer, RegistryError> {
        let loss = self.make_loss(param)?;
        let trainer = match self.trainers.get(&param.trainer)? {
            TrainerKind::Averager => Trainer::Averager(Averager { loss }),
            TrainerKind::TaylorBooster => Trainer::TaylorBooster(
                TaylorBooster::builder()
                    .rounds(param.rounds)
                    .loss(loss)
                    .sharing(self.make_sharing(param)?)
                    .optimization(self.make_optimization(param)?)
                    .verbosity(param.verbosity)
                    .build(),
            ),
        };
        Ok(trainer)
    }

    // =========================================================================
    // Listings
    // =========================================================================

    pub fn available_losses(&self) -> Vec<&'static str> {
        self.losses.names()
    }

    pub fn available_taggers(&self) -> Vec<&'static str> {
        self.taggers.names()
    }

    pub fn available_models(&self) -> Vec<&'static str> {
        self.models.names()
    }

    pub fn available_trainers(&self) -> Vec<&'static str> {
        self.trainers.names()
    }

    pub fn available_optimizations(&self) -> Vec<&'static str> {
        self.optimizations.names()
    }

    pub fn available_sharings(&self) -> Vec<&'static str> {
        self.sharings.names()
    }

    pub fn describe_losses(&self) -> String {
        self.losses.describe()
    }

    pub fn describe_taggers(&self) -> String {
        self.taggers.describe()
    }

    pub fn describe_models(&self) -> String {
        self.models.describe()
    }

    pub fn describe_trainers(&self) -> String {
        self.trainers.describe()
    }

    pub fn describe_optimizations(&self) -> String {
        self.optimizations.describe()
    }

    pub fn describe_sharings(&self) -> String {
        self.sharings.describe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn default_registers_every_component() {
        let registry = Registry::default();
        assert_eq!(
            registry.available_losses(),
            ["diag_exp", "diag_log", "diag_symlog", "diag_symexp", "jesorsky"]
        );
        assert_eq!(
            registry.available_taggers(),
            ["object_type", "object_pose", "object_id", "keypoint"]
        );
        assert_eq!(registry.available_models(), ["lbp", "elbp", "mct"]);
        assert_eq!(registry.available_trainers(), ["avg", "gboost"]);
        assert_eq!(registry.available_optimizations(), ["ept"]);
        assert_eq!(registry.available_sharings(), ["shared", "indep"]);
    }

    #[rstest]
    #[case("diag_exp", LossKind::DiagExp)]
    #[case("diag_symlog", LossKind::DiagSymLog)]
    #[case("jesorsky", LossKind::Jesorsky)]
    fn resolves_losses(#[case] name: &str, #[case] expected: LossKind) {
        let param = Param::builder().loss(name).build().unwrap();
        assert_eq!(Registry::default().make_loss(&param).unwrap(), expected);
    }

    #[test]
    fn unknown_name_lists_alternatives() {
        let param = Param::builder().trainer("var").build().unwrap();
        let err = Registry::default().make_trainer(&param).unwrap_err();
        assert_eq!(
            err,
            RegistryError::Unknown {
                kind: "trainer",
                name: "var".into(),
                available: vec!["avg", "gboost"],
            }
        );
        assert!(err.to_string().contains("avg, gboost"));
    }

    #[test]
    fn keypoint_model_has_two_outputs_per_label() {
        let param = Param::builder()
            .labels(vec!["leye".into(), "reye".into(), "nose".into()])
            .tagger("keypoint")
            .feature("mct")
            .build()
            .unwrap();
        let model = Registry::default().make_model(&param).unwrap();
        assert_eq!(model.n_outputs(), 6);
        assert_eq!(model.family(), FeatureFamily::Mct);
    }

    #[test]
    fn trainer_follows_param() {
        let param = Param::builder()
            .rounds(7)
            .sharing("indep")
            .build()
            .unwrap();
        match Registry::default().make_trainer(&param).unwrap() {
            Trainer::TaylorBooster(booster) => {
                assert_eq!(booster.rounds, 7);
                assert_eq!(booster.sharing, FeatureSharing::Independent);
                assert_eq!(booster.loss, LossKind::DiagLog);
            }
            other => panic!("unexpected trainer {other:?}"),
        }
    }

    #[test]
    fn add_replaces_existing_entry() {
        let mut catalog = Catalog::new("loss");
        catalog.add("l", "first", LossKind::DiagExp);
        catalog.add("l", "second", LossKind::DiagLog);
        assert_eq!(catalog.names(), ["l"]);
        assert_eq!(catalog.get("l").unwrap(), LossKind::DiagLog);
        assert_eq!(catalog.describe(), "  l  second\n");
    }
}
