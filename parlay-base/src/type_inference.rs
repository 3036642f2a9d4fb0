//! Type inference for computation-graph nodes.
//!
//! A [TypeInferenceWorker] is attached to a context and processes every node
//! as it is added, so an ill-typed node never enters a graph. Nodes are added
//! in topological order, hence the types of all dependencies of a processed
//! node are already cached.
use std::collections::HashMap;

use crate::data_types::Type;
use crate::errors::Result;
use crate::graphs::{Node, Operation};

pub struct TypeInferenceWorker {
    /// (graph_id, node_id) -> type of the node
    cache: HashMap<(u64, u64), Type>,
}

pub(crate) fn create_type_inference_worker() -> TypeInferenceWorker {
    TypeInferenceWorker {
        cache: HashMap::new(),
    }
}

impl TypeInferenceWorker {
    pub(crate) fn cached_node_type(&self, node: &Node) -> Option<Type> {
        self.cache.get(&node.get_global_id()).copied()
    }

    fn dependency_type(&self, node: &Node) -> Result<Type> {
        self.cache
            .get(&node.get_global_id())
            .copied()
            .ok_or_else(|| runtime_error!("Dependency type hasn't been inferred"))
    }

    /// Infers and caches the type of a node, or fails if the node is
    /// ill-typed.
    pub(crate) fn process_node(&mut self, node: Node) -> Result<Type> {
        let result_type = match node.get_operation() {
            Operation::Input(t, _) | Operation::Zeros(t) => {
                if !t.is_valid() {
                    return Err(runtime_error!("Invalid type: {:?}", t));
                }
                t
            }
            Operation::Add | Operation::Multiply => {
                let dependencies = node.get_node_dependencies();
                if dependencies.len() != 2 {
                    return Err(runtime_error!(
                        "Binary operation with {} dependencies",
                        dependencies.len()
                    ));
                }
                let t0 = self.dependency_type(&dependencies[0])?;
                let t1 = self.dependency_type(&dependencies[1])?;
                if t0.get_scalar_type() != t1.get_scalar_type() {
                    return Err(runtime_error!(
                        "Can't apply {} to operands of scalar types {} and {}",
                        node.get_operation(),
                        t0.get_scalar_type(),
                        t1.get_scalar_type()
                    ));
                }
                Type {
                    scalar: t0.get_scalar_type(),
                    visibility: t0.get_visibility().combine(t1.get_visibility()),
                }
            }
        };
        self.cache.insert(node.get_global_id(), result_type);
        Ok(result_type)
    }

    pub(crate) fn unregister_node(&mut self, node: Node) -> Result<()> {
        self.cache.remove(&node.get_global_id());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::data_types::{
        public_scalar_type, secret_scalar_type, Visibility, UINT32, UINT64,
    };
    use crate::errors::Result;
    use crate::graphs::create_context;

    #[test]
    fn test_binary_operation_types() -> Result<()> {
        let c = create_context()?;
        let alice = c.create_party("Alice")?;
        let g = c.create_graph()?;
        let a = g.input(secret_scalar_type(UINT64), alice.clone())?;
        let b = g.zeros(public_scalar_type(UINT64))?;
        let sum = g.add(a.clone(), b.clone())?;
        assert_eq!(sum.get_type()?.get_visibility(), Visibility::Secret);
        let zeros_sum = g.add(b.clone(), b.clone())?;
        assert_eq!(zeros_sum.get_type()?.get_visibility(), Visibility::Public);
        let product = g.multiply(a.clone(), sum)?;
        assert_eq!(product.get_type()?, secret_scalar_type(UINT64));
        Ok(())
    }

    #[test]
    fn test_mismatched_scalar_types() -> Result<()> {
        let c = create_context()?;
        let alice = c.create_party("Alice")?;
        let g = c.create_graph()?;
        let a = g.input(secret_scalar_type(UINT64), alice.clone())?;
        let b = g.input(secret_scalar_type(UINT32), alice)?;
        assert!(g.add(a.clone(), b.clone()).is_err());
        assert!(g.multiply(a, b).is_err());
        Ok(())
    }
}
