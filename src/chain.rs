use std::{collections::HashMap, sync::Arc};

use arrow::{
    array::{ArrayRef, Float64Array},
    datatypes::{DataType, Field, Schema},
    record_batch::RecordBatch,
};
use itertools::Itertools;

use crate::{
    sampler::{McmcError, Result},
    transition::Transition,
};

/// Column name of the cached log density.
pub const LOGP_NAME: &str = "lp";

/// Whether a column holds a model parameter or a sampler diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Parameter,
    Internal,
}

impl Section {
    pub fn as_str(&self) -> &'static str {
        match self {
            Section::Parameter => "parameter",
            Section::Internal => "internal",
        }
    }
}

/// The finished result of a sampling run.
///
/// A read-only table with one row per transition. The parameter columns come
/// first, followed by `lp` and one column per sampler stat.
#[derive(Debug, Clone, PartialEq)]
pub struct Chain {
    names: Vec<String>,
    sections: Vec<Section>,
    columns: Vec<Box<[f64]>>,
    num_draws: usize,
    chain_id: Option<u64>,
}

impl Chain {
    /// Assemble a chain from an ordered sequence of transitions.
    ///
    /// Without `names` the parameters are called `Parameter 1` to
    /// `Parameter k`. All transitions must have the same dimension and
    /// carry the same stats.
    pub fn from_transitions(transitions: &[Transition], names: Option<Vec<String>>) -> Result<Self> {
        let first = transitions.first().ok_or(McmcError::EmptyChain)?;
        let dim = first.dim();
        let stat_names = first.stats().iter().map(|&(name, _)| name).collect_vec();

        let names = match names {
            Some(names) if names.len() != dim => {
                return Err(McmcError::NameCountMismatch {
                    expected: dim,
                    found: names.len(),
                })
            }
            Some(names) => names,
            None => (1..=dim).map(|i| format!("Parameter {i}")).collect(),
        };

        let internal_names = std::iter::once(LOGP_NAME)
            .chain(stat_names.iter().copied())
            .collect_vec();
        if let Some(name) = names
            .iter()
            .find(|name| internal_names.contains(&name.as_str()))
        {
            return Err(McmcError::ReservedName(name.clone()));
        }
        if let Some(name) = names
            .iter()
            .map(String::as_str)
            .chain(internal_names.iter().copied())
            .duplicates()
            .next()
        {
            return Err(McmcError::DuplicateName(name.to_string()));
        }

        let width = dim + internal_names.len();
        let mut columns = (0..width)
            .map(|_| Vec::with_capacity(transitions.len()))
            .collect_vec();
        for (draw, transition) in transitions.iter().enumerate() {
            if transition.dim() != dim {
                return Err(McmcError::DimensionMismatch {
                    expected: dim,
                    found: transition.dim(),
                });
            }
            if !transition
                .stats()
                .iter()
                .map(|&(name, _)| name)
                .eq(stat_names.iter().copied())
            {
                return Err(McmcError::StatsMismatch {
                    draw,
                    expected: stat_names.clone(),
                    found: transition.stats().iter().map(|&(name, _)| name).collect(),
                });
            }

            let values = transition
                .value()
                .iter()
                .copied()
                .chain(std::iter::once(transition.logp()))
                .chain(transition.stats().iter().map(|&(_, value)| value));
            for (column, value) in columns.iter_mut().zip(values) {
                column.push(value);
            }
        }

        let sections = std::iter::repeat(Section::Parameter)
            .take(dim)
            .chain(std::iter::repeat(Section::Internal).take(internal_names.len()))
            .collect();
        let names = names
            .into_iter()
            .chain(internal_names.iter().map(|name| name.to_string()))
            .collect();

        Ok(Chain {
            names,
            sections,
            columns: columns.into_iter().map(Vec::into_boxed_slice).collect(),
            num_draws: transitions.len(),
            chain_id: None,
        })
    }

    pub fn with_chain_id(mut self, chain_id: u64) -> Self {
        self.chain_id = Some(chain_id);
        self
    }

    pub fn chain_id(&self) -> Option<u64> {
        self.chain_id
    }

    pub fn num_draws(&self) -> usize {
        self.num_draws
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn section(&self, column: usize) -> Option<Section> {
        self.sections.get(column).copied()
    }

    pub fn parameter_names(&self) -> impl Iterator<Item = &str> {
        self.names_in(Section::Parameter)
    }

    pub fn internal_names(&self) -> impl Iterator<Item = &str> {
        self.names_in(Section::Internal)
    }

    fn names_in(&self, section: Section) -> impl Iterator<Item = &str> {
        self.names
            .iter()
            .zip(&self.sections)
            .filter(move |&(_, &s)| s == section)
            .map(|(name, _)| name.as_str())
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.column_index(name).map(|idx| &*self.columns[idx])
    }

    /// The cached log density of every draw.
    pub fn logp(&self) -> &[f64] {
        self.column(LOGP_NAME)
            .expect("Chain always has a log density column")
    }

    pub fn get(&self, draw: usize, column: usize) -> Option<f64> {
        self.columns.get(column)?.get(draw).copied()
    }

    pub fn row(&self, draw: usize) -> Option<Vec<f64>> {
        if draw >= self.num_draws {
            return None;
        }
        Some(self.columns.iter().map(|column| column[draw]).collect())
    }

    /// Export as an arrow record batch with one `Float64` field per column.
    ///
    /// The field metadata key `section` holds `parameter` or `internal`.
    pub fn to_record_batch(&self) -> Result<RecordBatch> {
        let fields = self
            .names
            .iter()
            .zip(&self.sections)
            .map(|(name, section)| {
                let metadata =
                    HashMap::from([("section".to_string(), section.as_str().to_string())]);
                Field::new(name, DataType::Float64, false).with_metadata(metadata)
            })
            .collect_vec();
        let columns = self
            .columns
            .iter()
            .map(|column| Arc::new(Float64Array::from(column.to_vec())) as ArrayRef)
            .collect_vec();
        Ok(RecordBatch::try_new(Arc::new(Schema::new(fields)), columns)?)
    }
}

/// Shorthand for [`Chain::from_transitions`].
pub fn assemble(transitions: &[Transition], names: Option<Vec<String>>) -> Result<Chain> {
    Chain::from_transitions(transitions, names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::Array;
    use pretty_assertions::assert_eq;

    fn transitions() -> Vec<Transition> {
        vec![
            Transition::from_parts(vec![1., 2.].into(), -2.5),
            Transition::from_parts(vec![3., 4.].into(), -12.5),
            Transition::from_parts(vec![5., 6.].into(), -30.5),
        ]
    }

    fn names(names: &[&str]) -> Option<Vec<String>> {
        Some(names.iter().map(|name| name.to_string()).collect())
    }

    #[test]
    fn default_names() {
        let chain = assemble(&transitions(), None).unwrap();
        assert_eq!(chain.num_draws(), 3);
        assert_eq!(chain.num_columns(), 3);
        assert_eq!(chain.names(), &["Parameter 1", "Parameter 2", "lp"]);
        assert_eq!(
            chain.sections(),
            &[Section::Parameter, Section::Parameter, Section::Internal]
        );
        assert_eq!(chain.column("Parameter 2").unwrap(), &[2., 4., 6.]);
        assert_eq!(chain.logp(), &[-2.5, -12.5, -30.5]);
        assert_eq!(chain.row(1).unwrap(), vec![3., 4., -12.5]);
        assert_eq!(chain.row(3), None);
        assert_eq!(chain.get(2, 0), Some(5.));
        assert_eq!(chain.get(0, 3), None);
        assert_eq!(chain.chain_id(), None);
    }

    #[test]
    fn supplied_names() {
        let chain = assemble(&transitions(), names(&["mu", "sigma"])).unwrap();
        assert_eq!(chain.parameter_names().collect_vec(), vec!["mu", "sigma"]);
        assert_eq!(chain.internal_names().collect_vec(), vec!["lp"]);
        assert_eq!(chain.column("sigma").unwrap(), &[2., 4., 6.]);
        assert_eq!(chain.section(2), Some(Section::Internal));
    }

    #[test]
    fn rejects_bad_names() {
        assert!(matches!(
            assemble(&transitions(), names(&["mu"])),
            Err(McmcError::NameCountMismatch {
                expected: 2,
                found: 1
            })
        ));
        assert!(matches!(
            assemble(&transitions(), names(&["mu", "lp"])),
            Err(McmcError::ReservedName(name)) if name == "lp"
        ));
        assert!(matches!(
            assemble(&transitions(), names(&["mu", "mu"])),
            Err(McmcError::DuplicateName(name)) if name == "mu"
        ));
    }

    #[test]
    fn rejects_empty() {
        assert!(matches!(assemble(&[], None), Err(McmcError::EmptyChain)));
    }

    #[test]
    fn rejects_ragged_transitions() {
        let mut draws = transitions();
        draws.push(Transition::from_parts(vec![1.].into(), 0.));
        assert!(matches!(
            assemble(&draws, None),
            Err(McmcError::DimensionMismatch {
                expected: 2,
                found: 1
            })
        ));
    }

    #[test]
    fn stats_become_internal_columns() {
        let draws = vec![
            Transition::from_parts(vec![0.].into(), -1.).with_stat("is_accept", 1.),
            Transition::from_parts(vec![0.].into(), -1.).with_stat("is_accept", 0.),
        ];
        let chain = assemble(&draws, names(&["x"])).unwrap();
        assert_eq!(chain.names(), &["x", "lp", "is_accept"]);
        assert_eq!(chain.column("is_accept").unwrap(), &[1., 0.]);

        assert!(matches!(
            assemble(&draws, names(&["is_accept"])),
            Err(McmcError::ReservedName(_))
        ));

        let mixed = vec![
            Transition::from_parts(vec![0.].into(), -1.).with_stat("is_accept", 1.),
            Transition::from_parts(vec![0.].into(), -1.),
        ];
        assert!(matches!(
            assemble(&mixed, None),
            Err(McmcError::StatsMismatch { draw: 1, .. })
        ));
    }

    #[test]
    fn record_batch() {
        let chain = assemble(&transitions(), names(&["mu", "sigma"])).unwrap();
        let batch = chain.to_record_batch().unwrap();
        assert_eq!(batch.num_rows(), 3);
        assert_eq!(batch.num_columns(), 3);

        let schema = batch.schema();
        assert_eq!(schema.field(0).name(), "mu");
        assert_eq!(
            schema.field(0).metadata().get("section").map(String::as_str),
            Some("parameter")
        );
        assert_eq!(
            schema.field(2).metadata().get("section").map(String::as_str),
            Some("internal")
        );

        let lp = batch
            .column(2)
            .as_any()
            .downcast_ref::<Float64Array>()
            .unwrap();
        assert_eq!(lp.len(), 3);
        assert_eq!(lp.value(1), -12.5);
    }
}
