// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! A depth-first topological sort with explicit three-colour marking.
//!
//! The traversal uses a work stack instead of recursion, so very deep dependency
//! chains cannot overflow the call stack, and a cycle is reported as a regular
//! [`GraphError::Cycle`] value.

use std::collections::HashMap;
use std::hash::Hash;
use thiserror::Error;

/// Why a graph could not be ordered.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError<T> {
    /// The node was reached again while its own dependencies were still being visited.
    #[error("circular dependency detected: {0}")]
    Cycle(T),
    /// A node declares a dependency that is not part of the graph.
    #[error("missing dependency: {dependency} (required by {required_by})")]
    MissingDependency {
        /// The dependency that could not be found.
        dependency: T,
        /// The node that declared it.
        required_by: T,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    InProgress,
    Done,
}

/// Orders `nodes` so that every node comes after all of its dependencies.
///
/// Each item is a node together with the nodes it depends on. Roots are visited in
/// input order and dependencies in declaration order, so the result is deterministic:
/// independent nodes keep their relative input order.
///
/// # Errors
///
/// * [`GraphError::MissingDependency`] if a declared dependency is not a node.
/// * [`GraphError::Cycle`] naming the first node found on a cycle.
pub fn topological_sort<T>(
    nodes: impl IntoIterator<Item = (T, Vec<T>)>,
) -> Result<Vec<T>, GraphError<T>>
where
    T: Clone + Eq + Hash,
{
    let graph: Vec<(T, Vec<T>)> = nodes.into_iter().collect();
    let index: HashMap<&T, usize> = graph
        .iter()
        .enumerate()
        .map(|(i, (node, _))| (node, i))
        .collect();

    let mut marks = vec![Mark::Unvisited; graph.len()];
    let mut order = Vec::with_capacity(graph.len());
    // (node index, index of the next dependency to visit)
    let mut stack: Vec<(usize, usize)> = Vec::new();

    for root in 0..graph.len() {
        if marks[root] != Mark::Unvisited {
            continue;
        }
        marks[root] = Mark::InProgress;
        stack.push((root, 0));

        while let Some(frame) = stack.last_mut() {
            let (node, next) = *frame;
            let (name, dependencies) = &graph[node];

            if let Some(dependency) = dependencies.get(next) {
                frame.1 += 1;
                let Some(&dep) = index.get(dependency) else {
                    return Err(GraphError::MissingDependency {
                        dependency: dependency.clone(),
                        required_by: name.clone(),
                    });
                };
                match marks[dep] {
                    Mark::Done => {}
                    Mark::InProgress => return Err(GraphError::Cycle(dependency.clone())),
                    Mark::Unvisited => {
                        marks[dep] = Mark::InProgress;
                        stack.push((dep, 0));
                    }
                }
            } else {
                marks[node] = Mark::Done;
                order.push(name.clone());
                stack.pop();
            }
        }
    }

    Ok(order)
}
