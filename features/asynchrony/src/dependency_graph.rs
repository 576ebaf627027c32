use std::collections::{BTreeMap, HashMap};

use thiserror::Error;

/// Declared edges between named values
///
/// Used to check circular dependencies when declaring and to validate the whole graph.
#[derive(Debug, Default, Clone)]
pub struct DependencyGraph {
    map: BTreeMap<String, Vec<String>>,
}

/// Search state of a name during a depth first traversal
///
/// Names without a mark have not been seen yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    /// Currently on the traversal stack
    OnStack,
    /// Fully explored and free of cycles
    Resolved,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces the edges of `name`, returning the previous edges
    pub fn insert(&mut self, name: String, dependencies: Vec<String>) -> Option<Vec<String>> {
        self.map.insert(name, dependencies)
    }

    /// Undoes an [DependencyGraph::insert] by putting back what it returned
    pub fn restore(&mut self, name: &str, previous: Option<Vec<String>>) {
        match previous {
            Some(dependencies) => {
                self.map.insert(name.to_string(), dependencies);
            }
            None => {
                self.map.remove(name);
            }
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.map.contains_key(name)
    }

    /// Declared dependencies of `name`, in declared order
    pub fn dependencies(&self, name: &str) -> Option<&[String]> {
        self.map.get(name).map(Vec::as_slice)
    }

    /// All declared names, sorted
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.map.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Checks the subgraph reachable from `name` for cycles
    ///
    /// Dependencies which are not declared yet are skipped.
    pub fn check_from(&self, name: &str) -> Result<(), DependencyGraphError> {
        let mut marks = HashMap::new();
        let mut chain = Vec::new();
        self.visit(name, &mut marks, &mut chain)
    }

    /// Validate the graph
    ///
    /// Returns a list of all issues
    pub fn check(&self) -> Result<(), DependencyGraphErrors> {
        let mut errors = Vec::new();

        for (name, dependencies) in &self.map {
            for dependency in dependencies {
                if !self.map.contains_key(dependency) {
                    errors.push(DependencyGraphError::MissingDependency {
                        dependency: dependency.clone(),
                        required_by: name.clone(),
                    });
                }
            }
        }

        let mut marks = HashMap::new();
        for name in self.map.keys() {
            if marks.contains_key(name.as_str()) {
                continue;
            }

            let mut chain = Vec::new();
            if let Err(error) = self.visit(name, &mut marks, &mut chain) {
                // Whatever is left on the stack belongs to the reported cycle
                for name in chain.drain(..) {
                    marks.insert(name, Mark::Resolved);
                }
                errors.push(error);
            }
        }

        if !errors.is_empty() {
            return Err(DependencyGraphErrors { errors });
        }

        Ok(())
    }

    fn visit<'a>(
        &'a self,
        name: &'a str,
        marks: &mut HashMap<&'a str, Mark>,
        chain: &mut Vec<&'a str>,
    ) -> Result<(), DependencyGraphError> {
        marks.insert(name, Mark::OnStack);
        chain.push(name);

        for dependency in self.dependencies(name).unwrap_or_default() {
            match marks.get(dependency.as_str()) {
                Some(Mark::Resolved) => continue,
                Some(Mark::OnStack) => {
                    let start = chain
                        .iter()
                        .position(|entry| *entry == dependency.as_str())
                        .unwrap_or(0);
                    let mut cycle: Vec<String> =
                        chain[start..].iter().map(|entry| entry.to_string()).collect();
                    cycle.push(dependency.clone()); // Add closing edge so chain is complete

                    return Err(DependencyGraphError::CircularDependency {
                        from: name.to_string(),
                        to: dependency.clone(),
                        chain: cycle,
                    });
                }
                None if self.map.contains_key(dependency) => {
                    self.visit(dependency, marks, chain)?;
                }
                None => {} // Not declared yet
            }
        }

        chain.pop();
        marks.insert(name, Mark::Resolved);
        Ok(())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DependencyGraphError {
    #[error("'{required_by}' needs '{dependency}' but it is missing")]
    MissingDependency {
        dependency: String,
        required_by: String,
    },
    #[error("A Circular Dependency exists between '{from}' and '{to}' through {chain:?}")]
    CircularDependency {
        from: String,
        to: String,
        chain: Vec<String>,
    },
}
impl std::fmt::Display for DependencyGraphErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut display = Vec::new();
        display.push("The dependency graph had one or more errors:".to_string());
        for error in &self.errors {
            display.push(format!("- {}", error));
        }
        f.write_str(&display.join("\n"))
    }
}

#[derive(Error, Debug, Clone)]
pub struct DependencyGraphErrors {
    pub errors: Vec<DependencyGraphError>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph(edges: &[(&str, &[&str])]) -> DependencyGraph {
        let mut graph = DependencyGraph::new();
        for (name, dependencies) in edges {
            graph.insert(
                name.to_string(),
                dependencies.iter().map(|d| d.to_string()).collect(),
            );
        }
        graph
    }

    #[test]
    fn diamond_is_acyclic() {
        let graph = graph(&[
            ("a", &[]),
            ("b", &["a"]),
            ("c", &["a"]),
            ("d", &["b", "c"]),
        ]);

        assert!(graph.check_from("d").is_ok());
        assert!(graph.check().is_ok());
    }

    #[test]
    fn two_node_cycle_names_the_closing_edge() {
        let graph = graph(&[("x", &["y"]), ("y", &["x"])]);

        let error = graph.check_from("y").unwrap_err();
        assert_eq!(
            error,
            DependencyGraphError::CircularDependency {
                from: "x".to_string(),
                to: "y".to_string(),
                chain: vec!["y".to_string(), "x".to_string(), "y".to_string()],
            }
        );
    }

    #[test]
    fn self_dependency_is_a_cycle() {
        let graph = graph(&[("a", &["a"])]);

        assert!(matches!(
            graph.check_from("a"),
            Err(DependencyGraphError::CircularDependency { ref from, ref to, .. }) if from == "a" && to == "a"
        ));
    }

    #[test]
    fn cycle_chain_excludes_the_entry_path() {
        let graph = graph(&[("root", &["a"]), ("a", &["b"]), ("b", &["a"])]);

        let Err(DependencyGraphError::CircularDependency { chain, .. }) = graph.check_from("root")
        else {
            panic!("expected a cycle");
        };
        assert_eq!(chain, vec!["a", "b", "a"]);
    }

    #[test]
    fn undeclared_dependencies_are_skipped_when_checking_from_a_name() {
        let graph = graph(&[("a", &["later"])]);

        assert!(graph.check_from("a").is_ok());
    }

    #[test]
    fn check_reports_every_issue() {
        let graph = graph(&[
            ("a", &["missing"]),
            ("x", &["y"]),
            ("y", &["x"]),
            ("fine", &["a"]),
        ]);

        let errors = graph.check().unwrap_err().errors;
        assert_eq!(errors.len(), 2);
        assert!(errors.contains(&DependencyGraphError::MissingDependency {
            dependency: "missing".to_string(),
            required_by: "a".to_string(),
        }));
        assert!(errors
            .iter()
            .any(|e| matches!(e, DependencyGraphError::CircularDependency { .. })));
    }

    #[test]
    fn restore_rolls_back_an_insert() {
        let mut graph = graph(&[("a", &[])]);

        let previous = graph.insert("a".to_string(), vec!["b".to_string()]);
        graph.restore("a", previous);
        assert_eq!(graph.dependencies("a"), Some(&[][..]));

        let previous = graph.insert("new".to_string(), vec![]);
        graph.restore("new", previous);
        assert!(!graph.contains("new"));
    }
}
