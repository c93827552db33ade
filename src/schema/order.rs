//! Dependency ordering of tables by foreign key.
//!
//! A table is emitted once every table it references has been emitted.
//! Among tables that are ready at the same time, declaration order wins, so
//! the output is stable for unchanged input. Self-references are ignored.

use std::collections::{BTreeSet, HashMap};

use crate::schema::definition::Table;
use crate::schema::error::SchemaError;

/// Computes the emission order of resolved tables.
pub struct DependencyOrderer;

impl DependencyOrderer {
    /// Return indices into `tables`, referenced tables first.
    pub fn order(tables: &[Table]) -> Result<Vec<usize>, SchemaError> {
        let references = Self::edges(tables)?;

        let mut remaining: Vec<usize> = references.iter().map(BTreeSet::len).collect();
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); tables.len()];
        for (from, targets) in references.iter().enumerate() {
            for &to in targets {
                dependents[to].push(from);
            }
        }

        let mut ready: BTreeSet<usize> = (0..tables.len()).filter(|&i| remaining[i] == 0).collect();
        let mut order = Vec::with_capacity(tables.len());
        while let Some(next) = ready.pop_first() {
            order.push(next);
            for &dependent in &dependents[next] {
                remaining[dependent] -= 1;
                if remaining[dependent] == 0 {
                    ready.insert(dependent);
                }
            }
        }

        if order.len() < tables.len() {
            let cycle = Self::find_cycle(&references, &remaining);
            return Err(SchemaError::Cycle {
                tables: cycle.into_iter().map(|i| tables[i].name.clone()).collect(),
            });
        }

        Ok(order)
    }

    /// Referenced table indices per table, excluding self-references.
    fn edges(tables: &[Table]) -> Result<Vec<BTreeSet<usize>>, SchemaError> {
        let by_name: HashMap<&str, usize> = tables
            .iter()
            .enumerate()
            .map(|(i, t)| (t.name.as_str(), i))
            .collect();

        tables
            .iter()
            .enumerate()
            .map(|(from, table)| {
                let mut targets = BTreeSet::new();
                for (column, fk) in table.foreign_keys() {
                    let &to = by_name.get(fk.table.as_str()).ok_or_else(|| {
                        SchemaError::internal(format!(
                            "{}.{} references unknown table '{}'",
                            table.name, column.name, fk.table
                        ))
                    })?;
                    if to != from {
                        targets.insert(to);
                    }
                }
                Ok(targets)
            })
            .collect()
    }

    /// Walk unresolved edges from the first blocked table until a table repeats.
    ///
    /// Every blocked table references at least one other blocked table, so the
    /// walk always closes a cycle.
    fn find_cycle(references: &[BTreeSet<usize>], remaining: &[usize]) -> Vec<usize> {
        let blocked = |i: usize| remaining[i] > 0;
        let Some(start) = (0..remaining.len()).find(|&i| blocked(i)) else {
            return Vec::new();
        };

        let mut path: Vec<usize> = Vec::new();
        let mut current = start;
        loop {
            if let Some(position) = path.iter().position(|&i| i == current) {
                return path.split_off(position);
            }
            path.push(current);
            match references[current].iter().copied().find(|&i| blocked(i)) {
                Some(next) => current = next,
                None => return path,
            }
        }
    }
}
