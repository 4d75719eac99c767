use std::collections::{BTreeSet, HashMap};

use crate::error::CrewError;
use crate::task::Task;

/// Resolved dependency indices for every task.
///
/// A task without an explicit `context` depends on every task declared before it.
pub fn resolve_dependencies(tasks: &[Task]) -> Result<Vec<Vec<usize>>, CrewError> {
    let mut index: HashMap<&str, usize> = HashMap::with_capacity(tasks.len());
    for (i, task) in tasks.iter().enumerate() {
        if index.insert(task.id.as_str(), i).is_some() {
            return Err(CrewError::DuplicateTask(task.id.clone()));
        }
    }

    tasks
        .iter()
        .enumerate()
        .map(|(i, task)| match &task.context {
            None => Ok((0..i).collect()),
            Some(ids) => ids
                .iter()
                .map(|id| {
                    index.get(id.as_str()).copied().ok_or_else(|| CrewError::UnknownDependency {
                        task_id: task.id.clone(),
                        dependency: id.clone(),
                    })
                })
                .collect(),
        })
        .collect()
}

/// Topological order over `deps`. Among ready tasks the earliest declared runs
/// first, so a plain list executes in list order.
pub fn execution_order(tasks: &[Task], deps: &[Vec<usize>]) -> Result<Vec<usize>, CrewError> {
    let n = tasks.len();
    let mut pending: Vec<usize> = deps.iter().map(|d| d.iter().collect::<BTreeSet<_>>().len()).collect();
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); n];
    for (task, task_deps) in deps.iter().enumerate() {
        for &dep in task_deps.iter().collect::<BTreeSet<_>>() {
            dependents[dep].push(task);
        }
    }

    let mut ready: BTreeSet<usize> = (0..n).filter(|&i| pending[i] == 0).collect();
    let mut order = Vec::with_capacity(n);

    while let Some(next) = ready.pop_first() {
        order.push(next);
        for &dependent in &dependents[next] {
            pending[dependent] -= 1;
            if pending[dependent] == 0 {
                ready.insert(dependent);
            }
        }
    }

    if order.len() < n {
        let stuck = (0..n)
            .filter(|&i| pending[i] > 0)
            .map(|i| tasks[i].id.clone())
            .collect();
        return Err(CrewError::CyclicDependency(stuck));
    }

    Ok(order)
}
