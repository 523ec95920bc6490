//! Persistence of option libraries as ordered record sequences
//!
//! A library is saved as one JSON array of per-option records; position in
//! the array is option identity. Loading validates the shape of every
//! record eagerly against the configured library before anything is
//! accepted, so a mismatched file can never silently truncate or pad.

use std::fs;
use std::path::Path;

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use tracing::info;

use linopt_core::{RLError, Result};

use crate::model::LinearOptionModel;
use crate::option::{Initiation, LinearOption, OptionLibrary, Termination};

/// Serialized form of one option's learned parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptionRecord {
    /// Option-value parameters θ
    pub theta: Array1<f64>,
    /// Internal policy action-value parameters
    pub action_thetas: Vec<Array1<f64>>,
    /// Termination variant
    pub termination: Termination,
    /// Initiation variant
    pub initiation: Initiation,
    /// Attached model, if any
    pub model: Option<ModelRecord>,
}

/// Serialized form of an option model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelRecord {
    /// Transition model (n×n)
    pub f: Array2<f64>,
    /// Reward model (n)
    pub b: Array1<f64>,
}

/// Write `library` to `path` as an ordered record sequence
pub fn save_library(library: &OptionLibrary, path: &Path) -> Result<()> {
    let records: Vec<OptionRecord> = (0..library.len())
        .map(|index| {
            let option = library.option(index);
            OptionRecord {
                theta: option.theta.clone(),
                action_thetas: option.action_thetas.clone(),
                termination: option.termination.clone(),
                initiation: option.initiation.clone(),
                model: library.model(index).map(|model| ModelRecord {
                    f: model.f.clone(),
                    b: model.b.clone(),
                }),
            }
        })
        .collect();

    let json = serde_json::to_string_pretty(&records)?;
    fs::write(path, json)?;
    info!(path = %path.display(), options = records.len(), "saved option library");
    Ok(())
}

/// Load a library saved by [`save_library`].
///
/// The file must hold exactly `expected_options` records whose parameters
/// all match feature dimension `n` and `num_actions`; anything else fails
/// with [`RLError::SchemaMismatch`].
pub fn load_library(
    path: &Path,
    n: usize,
    num_actions: usize,
    expected_options: usize,
) -> Result<OptionLibrary> {
    let json = fs::read_to_string(path)?;
    let records: Vec<OptionRecord> = serde_json::from_str(&json)?;

    if records.len() != expected_options {
        return Err(RLError::SchemaMismatch(format!(
            "expected {expected_options} options, file holds {}",
            records.len()
        )));
    }

    let mut options = Vec::with_capacity(records.len());
    let mut models = Vec::with_capacity(records.len());
    for (index, record) in records.into_iter().enumerate() {
        let option = LinearOption {
            theta: record.theta,
            action_thetas: record.action_thetas,
            termination: record.termination,
            initiation: record.initiation,
        };
        option.check_dims(n).map_err(|_| {
            RLError::SchemaMismatch(format!(
                "option {index} does not match feature dimension {n}"
            ))
        })?;
        if option.num_actions() != num_actions {
            return Err(RLError::SchemaMismatch(format!(
                "option {index} holds {} action-value vectors, agent expects {num_actions}",
                option.num_actions()
            )));
        }

        let model = record.model.map(|record| LinearOptionModel {
            f: record.f,
            b: record.b,
        });
        if let Some(ref model) = model {
            model.check_dims(n).map_err(|_| {
                RLError::SchemaMismatch(format!(
                    "model of option {index} does not match feature dimension {n}"
                ))
            })?;
        }

        options.push(option);
        models.push(model);
    }

    let mut library = OptionLibrary::new(options, n, num_actions)?;
    for (index, model) in models.into_iter().enumerate() {
        if let Some(model) = model {
            library.attach_model(index, model)?;
        }
    }

    info!(path = %path.display(), options = library.len(), "loaded option library");
    Ok(library)
}
