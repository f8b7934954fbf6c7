//! Materialized selection results.

use crate::dataset::error::DatasetError;
use crate::types::setup::Setup;
use ndarray::{ArrayD, Axis, IxDyn};
use std::collections::HashMap;

/// Dimension name of the grid cell coordinate in every store.
pub const GID_DIM: &str = "gid";
/// Dimension name added when results from several setups are stacked.
pub const SETUP_DIM: &str = "setup";

/// One labeled array of a selection result.
///
/// `dims` names every axis of `values` in order; an axis named `gid` is
/// aligned with [`SetupData::gids`], an axis named `setup` with
/// [`SetupData::setups`].
#[derive(Debug, Clone, PartialEq)]
pub struct DataVariable {
    name: String,
    dims: Vec<String>,
    values: ArrayD<f64>,
}

impl DataVariable {
    pub(crate) fn new(name: String, dims: Vec<String>, values: ArrayD<f64>) -> Self {
        Self { name, dims, values }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dims(&self) -> &[String] {
        &self.dims
    }

    pub fn values(&self) -> &ArrayD<f64> {
        &self.values
    }

    fn gid_axis(&self) -> Option<usize> {
        self.dims.iter().position(|dim| dim == GID_DIM)
    }
}

/// A subset of one setup's arrays, or of several stacked setups.
///
/// Produced by the selection calls on [`Inspire`](crate::Inspire); never
/// retained by the library. The `gid` coordinate of a selection is always a
/// subset of the gids present in the full store.
#[derive(Debug, Clone, PartialEq)]
pub struct SetupData {
    gids: Vec<i64>,
    setups: Vec<Setup>,
    variables: Vec<DataVariable>,
}

impl SetupData {
    pub(crate) fn single(gids: Vec<i64>, variables: Vec<DataVariable>) -> Self {
        Self {
            gids,
            setups: Vec::new(),
            variables,
        }
    }

    /// Values of the `gid` coordinate, in dataset order.
    pub fn gids(&self) -> &[i64] {
        &self.gids
    }

    /// Values of the `setup` coordinate. Empty unless this result was merged
    /// from multiple setups.
    pub fn setups(&self) -> &[Setup] {
        &self.setups
    }

    pub fn variables(&self) -> &[DataVariable] {
        &self.variables
    }

    pub fn variable(&self, name: &str) -> Option<&DataVariable> {
        self.variables.iter().find(|var| var.name == name)
    }

    /// Stacks per-setup selections along a new leading `setup` dimension.
    ///
    /// The merged `gid` coordinate is the union of the parts' gids in first
    /// occurrence order; rows a setup did not match are filled with NaN. Every
    /// part must expose the same variables with the same dimension names.
    pub(crate) fn stack_setups(parts: Vec<(Setup, SetupData)>) -> Result<SetupData, DatasetError> {
        debug_assert!(!parts.is_empty());

        let mut union: Vec<i64> = Vec::new();
        let mut position: HashMap<i64, usize> = HashMap::new();
        for (_, part) in &parts {
            for &gid in &part.gids {
                if !position.contains_key(&gid) {
                    position.insert(gid, union.len());
                    union.push(gid);
                }
            }
        }

        let names: Vec<&str> = parts[0].1.variables.iter().map(|v| v.name.as_str()).collect();
        for (setup, part) in &parts {
            let part_names: Vec<&str> = part.variables.iter().map(|v| v.name.as_str()).collect();
            if part_names != names {
                return Err(DatasetError::MergeMismatch {
                    reason: format!("setup {setup} exposes a different variable set"),
                });
            }
        }

        let mut variables = Vec::with_capacity(names.len());
        for slot in 0..names.len() {
            let template = &parts[0].1.variables[slot];
            let mut padded = Vec::with_capacity(parts.len());
            for (setup, part) in &parts {
                let var = &part.variables[slot];
                if var.dims != template.dims {
                    return Err(DatasetError::MergeMismatch {
                        reason: format!(
                            "variable '{}' of setup {setup} has mismatched dimensions",
                            var.name
                        ),
                    });
                }
                padded.push(pad_rows(var, &part.gids, &union, &position));
            }

            let views: Vec<_> = padded.iter().map(|values| values.view()).collect();
            let values = ndarray::stack(Axis(0), &views).map_err(|e| DatasetError::ShapeMismatch {
                name: template.name.clone(),
                source: e,
            })?;

            let mut dims = Vec::with_capacity(template.dims.len() + 1);
            dims.push(SETUP_DIM.to_string());
            dims.extend(template.dims.iter().cloned());
            variables.push(DataVariable::new(template.name.clone(), dims, values));
        }

        Ok(SetupData {
            gids: union,
            setups: parts.iter().map(|(setup, _)| *setup).collect(),
            variables,
        })
    }
}

/// Re-seats a variable's gid axis onto the union coordinate, NaN elsewhere.
fn pad_rows(
    var: &DataVariable,
    part_gids: &[i64],
    union: &[i64],
    position: &HashMap<i64, usize>,
) -> ArrayD<f64> {
    let Some(axis) = var.gid_axis() else {
        return var.values.clone();
    };
    if part_gids == union {
        return var.values.clone();
    }

    let mut shape = var.values.shape().to_vec();
    shape[axis] = union.len();
    let mut out = ArrayD::from_elem(IxDyn(&shape), f64::NAN);
    for (row, gid) in part_gids.iter().enumerate() {
        let slot = position[gid];
        out.index_axis_mut(Axis(axis), slot)
            .assign(&var.values.index_axis(Axis(axis), row));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn part(gids: Vec<i64>, values: ArrayD<f64>) -> SetupData {
        SetupData::single(
            gids,
            vec![DataVariable::new(
                "ghi".to_string(),
                vec![GID_DIM.to_string(), "time".to_string()],
                values,
            )],
        )
    }

    #[test]
    fn stacking_adds_a_leading_setup_dimension() {
        let a = part(vec![100, 200], array![[1.0, 2.0], [3.0, 4.0]].into_dyn());
        let b = part(vec![100, 200], array![[5.0, 6.0], [7.0, 8.0]].into_dyn());

        let merged =
            SetupData::stack_setups(vec![(Setup::new(1), a), (Setup::new(2), b)]).unwrap();

        assert_eq!(merged.setups(), &[Setup::new(1), Setup::new(2)]);
        assert_eq!(merged.gids(), &[100, 200]);
        let ghi = merged.variable("ghi").unwrap();
        assert_eq!(ghi.dims(), &[SETUP_DIM, GID_DIM, "time"]);
        assert_eq!(ghi.values().shape(), &[2, 2, 2]);
        assert_eq!(ghi.values()[[0, 0, 0]], 1.0);
        assert_eq!(ghi.values()[[1, 1, 1]], 8.0);
    }

    #[test]
    fn gid_union_pads_missing_rows_with_nan() {
        let a = part(vec![100], array![[1.0, 2.0]].into_dyn());
        let b = part(vec![200], array![[5.0, 6.0]].into_dyn());

        let merged =
            SetupData::stack_setups(vec![(Setup::new(1), a), (Setup::new(2), b)]).unwrap();

        assert_eq!(merged.gids(), &[100, 200]);
        let ghi = merged.variable("ghi").unwrap();
        assert_eq!(ghi.values().shape(), &[2, 2, 2]);
        // setup 1 matched gid 100 only
        assert_eq!(ghi.values()[[0, 0, 0]], 1.0);
        assert!(ghi.values()[[0, 1, 0]].is_nan());
        // setup 2 matched gid 200 only
        assert!(ghi.values()[[1, 0, 0]].is_nan());
        assert_eq!(ghi.values()[[1, 1, 1]], 6.0);
    }

    #[test]
    fn diverging_variable_sets_cannot_merge() {
        let a = part(vec![100], array![[1.0]].into_dyn());
        let b = SetupData::single(
            vec![100],
            vec![DataVariable::new(
                "dhi".to_string(),
                vec![GID_DIM.to_string(), "time".to_string()],
                array![[1.0]].into_dyn(),
            )],
        );

        let result = SetupData::stack_setups(vec![(Setup::new(1), a), (Setup::new(2), b)]);
        assert!(matches!(result, Err(DatasetError::MergeMismatch { .. })));
    }
}
