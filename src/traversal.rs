//! Lazy traversals over the stale subgraph.
//!
//! [`Tasklist`] and [`Targets`] mirror [`Flow::make`]'s depth-first descent
//! without executing anything. Both are one-shot lazy sequences driven by an
//! explicit frame stack; errors are yielded through the stream, after which
//! the iterator is fused. Holding one borrows the [`Flow`] immutably, so the
//! graph cannot be mutated mid-traversal.

use crate::error::{FlowError, Locator};
use crate::flow::{FactoryId, Flow, ProductId};

enum TaskFrame {
    Enter(FactoryId),
    Yield(FactoryId),
}

/// Topologically ordered factory sequence for refreshing a target.
///
/// Yields each factory strictly after the factories that produce its stale
/// inputs, the requested target last - a reverse postorder of the stale
/// transitive subgraph. Created by [`Flow::tasklist`].
pub struct Tasklist<'a> {
    flow: &'a Flow,
    stack: Vec<TaskFrame>,
    path: Vec<FactoryId>,
    locator: Locator,
    done: bool,
}

impl<'a> Tasklist<'a> {
    pub(crate) fn new(flow: &'a Flow, target: FactoryId, locator: Locator) -> Self {
        Self {
            flow,
            stack: vec![TaskFrame::Enter(target)],
            path: Vec::new(),
            locator,
            done: false,
        }
    }

    fn enter(&mut self, factory: FactoryId) -> Result<(), FlowError> {
        if self.path.contains(&factory) {
            return Err(self.flow.cycle_error(&self.path, factory));
        }
        let examined = self.flow.examine_inputs(factory);
        if !examined.unbound.is_empty() {
            return Err(FlowError::IncompleteFlow {
                factory,
                name: self.flow.factory_name(factory).to_owned(),
                unbound: examined.unbound,
                locator: self.locator,
            });
        }
        self.path.push(factory);
        self.stack.push(TaskFrame::Yield(factory));
        // frames pop LIFO, so push right-to-left to keep declared input
        // order left-to-right
        for &product in examined.stale.iter().rev() {
            for &producer in self.flow.producers(product).iter().rev() {
                self.stack.push(TaskFrame::Enter(producer));
            }
        }
        Ok(())
    }
}

impl Iterator for Tasklist<'_> {
    type Item = Result<FactoryId, FlowError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        loop {
            match self.stack.pop()? {
                TaskFrame::Enter(factory) => {
                    if let Err(error) = self.enter(factory) {
                        self.done = true;
                        return Some(Err(error));
                    }
                }
                TaskFrame::Yield(factory) => {
                    self.path.pop();
                    return Some(Ok(factory));
                }
            }
        }
    }
}

enum TargetFrame {
    Factory(FactoryId),
    Leave(FactoryId),
    Product(ProductId),
    Yield(ProductId),
}

/// The stale products that must be refreshed for a target, deepest first.
///
/// Created by [`Flow::targets`]. Same errors as [`Tasklist`].
pub struct Targets<'a> {
    flow: &'a Flow,
    stack: Vec<TargetFrame>,
    path: Vec<FactoryId>,
    locator: Locator,
    done: bool,
}

impl<'a> Targets<'a> {
    pub(crate) fn new(flow: &'a Flow, target: FactoryId, locator: Locator) -> Self {
        Self {
            flow,
            stack: vec![TargetFrame::Factory(target)],
            path: Vec::new(),
            locator,
            done: false,
        }
    }

    fn enter(&mut self, factory: FactoryId) -> Result<(), FlowError> {
        if self.path.contains(&factory) {
            return Err(self.flow.cycle_error(&self.path, factory));
        }
        let examined = self.flow.examine_inputs(factory);
        if !examined.unbound.is_empty() {
            return Err(FlowError::IncompleteFlow {
                factory,
                name: self.flow.factory_name(factory).to_owned(),
                unbound: examined.unbound,
                locator: self.locator,
            });
        }
        self.path.push(factory);
        self.stack.push(TargetFrame::Leave(factory));
        for &product in examined.stale.iter().rev() {
            self.stack.push(TargetFrame::Product(product));
        }
        Ok(())
    }
}

impl Iterator for Targets<'_> {
    type Item = Result<ProductId, FlowError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        loop {
            match self.stack.pop()? {
                TargetFrame::Factory(factory) => {
                    if let Err(error) = self.enter(factory) {
                        self.done = true;
                        return Some(Err(error));
                    }
                }
                TargetFrame::Leave(_) => {
                    self.path.pop();
                }
                TargetFrame::Product(product) => {
                    self.stack.push(TargetFrame::Yield(product));
                    for &producer in self.flow.producers(product).iter().rev() {
                        self.stack.push(TargetFrame::Factory(producer));
                    }
                }
                TargetFrame::Yield(product) => {
                    return Some(Ok(product));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop() -> impl FnMut(&[ProductId]) -> anyhow::Result<()> {
        |_stale: &[ProductId]| Ok(())
    }

    #[test]
    fn an_all_fresh_target_still_lists_itself() {
        let mut flow = Flow::new();
        let factory = flow.add_factory("only", &[], &[], noop());
        let tasks: Result<Vec<_>, _> = flow.tasklist(factory).collect();
        assert_eq!(tasks.unwrap(), [factory]);
    }

    #[test]
    fn an_all_fresh_target_has_no_targets() {
        let mut flow = Flow::new();
        let factory = flow.add_factory("only", &[], &[], noop());
        let targets: Result<Vec<_>, _> = flow.targets(factory).collect();
        assert!(targets.unwrap().is_empty());
    }

    #[test]
    fn tasklist_is_restartable() {
        let mut flow = Flow::new();
        let product = flow.add_product("p");
        let source = flow.add_factory("source", &[], &["out"], noop());
        let sink = flow.add_factory("sink", &["in"], &[], noop());
        flow.trait_modified(source, "out", Some(product)).unwrap();
        flow.trait_modified(sink, "in", Some(product)).unwrap();

        let first: Result<Vec<_>, _> = flow.tasklist(sink).collect();
        let second: Result<Vec<_>, _> = flow.tasklist(sink).collect();
        assert_eq!(first.unwrap(), [source, sink]);
        assert_eq!(second.unwrap(), [source, sink]);
    }
}
