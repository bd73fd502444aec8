//! A status record of graph bindings kept for external observers.

use ahash::HashMap;

use crate::flow::{FactoryId, ProductId};

/// Mirror of the graph's input/output bindings.
///
/// Every bind and unbind updates this record and the graph's own records in
/// the same operation, so the two views never diverge. External observers
/// read it through [`Flow::monitor`](crate::Flow::monitor) without touching
/// the arenas.
#[derive(Debug, Default)]
pub struct StatusMonitor {
    inputs: HashMap<FactoryId, Vec<ProductId>>,
    outputs: HashMap<FactoryId, Vec<ProductId>>,
    consumers: HashMap<ProductId, Vec<FactoryId>>,
    producers: HashMap<ProductId, Vec<FactoryId>>,
}

fn remove_one<T: PartialEq>(list: &mut Vec<T>, item: T) {
    if let Some(at) = list.iter().position(|present| *present == item) {
        list.remove(at);
    }
}

impl StatusMonitor {
    pub(crate) fn add_input_binding(&mut self, factory: FactoryId, product: ProductId) {
        self.inputs.entry(factory).or_default().push(product);
        self.consumers.entry(product).or_default().push(factory);
    }

    pub(crate) fn remove_input_binding(&mut self, factory: FactoryId, product: ProductId) {
        remove_one(self.inputs.entry(factory).or_default(), product);
        remove_one(self.consumers.entry(product).or_default(), factory);
    }

    pub(crate) fn add_output_binding(&mut self, factory: FactoryId, product: ProductId) {
        self.outputs.entry(factory).or_default().push(product);
        self.producers.entry(product).or_default().push(factory);
    }

    pub(crate) fn remove_output_binding(&mut self, factory: FactoryId, product: ProductId) {
        remove_one(self.outputs.entry(factory).or_default(), product);
        remove_one(self.producers.entry(product).or_default(), factory);
    }

    /// Products currently bound as inputs of `factory`, in binding order.
    pub fn inputs_of(&self, factory: FactoryId) -> &[ProductId] {
        self.inputs.get(&factory).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Products currently bound as outputs of `factory`, in binding order.
    pub fn outputs_of(&self, factory: FactoryId) -> &[ProductId] {
        self.outputs.get(&factory).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Factories currently consuming `product`.
    pub fn consumers_of(&self, product: ProductId) -> &[FactoryId] {
        self.consumers.get(&product).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Factories currently producing `product`.
    pub fn producers_of(&self, product: ProductId) -> &[FactoryId] {
        self.producers.get(&product).map(Vec::as_slice).unwrap_or(&[])
    }
}
