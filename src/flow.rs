//! The product/factory dependency graph.
//!
//! Products and factories live in slab arenas inside a [`Flow`]; handles are
//! plain indices, so the mutual product/factory references are index lists
//! and unbinding is index removal, not cycle breaking. Evaluation is
//! strictly single-threaded and synchronous: [`Flow::make`] performs a
//! recursive depth-first descent with no suspension points, and the borrowed
//! traversal iterators keep the graph immutable while they run.

use ahash::HashSet;
use slab::Slab;

use crate::error::{FlowError, Locator};
use crate::monitor::StatusMonitor;
use crate::traversal::{Targets, Tasklist};

/// Handle to a product in a [`Flow`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProductId(pub(crate) usize);

/// Handle to a factory in a [`Flow`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FactoryId(pub(crate) usize);

/// A factory's own computation, run once its stale inputs are refreshed.
pub trait Task {
    /// Remake the factory's products.
    ///
    /// `stale` is the pre-refresh stale input set, in declared trait order.
    fn run(&mut self, stale: &[ProductId]) -> anyhow::Result<()>;
}

impl<F> Task for F
where
    F: FnMut(&[ProductId]) -> anyhow::Result<()>,
{
    fn run(&mut self, stale: &[ProductId]) -> anyhow::Result<()> {
        self(stale)
    }
}

/// One (trait, bound product) pair.
pub(crate) struct Binding {
    pub(crate) trait_name: String,
    pub(crate) product: Option<ProductId>,
}

pub(crate) struct ProductState {
    pub(crate) name: String,
    pub(crate) stale: bool,
    pub(crate) consumers: Vec<FactoryId>,
    pub(crate) producers: Vec<FactoryId>,
}

pub(crate) struct FactoryState {
    pub(crate) name: String,
    pub(crate) inputs: Vec<Binding>,
    pub(crate) outputs: Vec<Binding>,
    /// Taken out of the slot while running, so the arena stays borrowable.
    pub(crate) task: Option<Box<dyn Task>>,
}

/// A factory's inputs partitioned by binding state, in declared trait order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExaminedInputs {
    /// Input traits with no product assigned.
    pub unbound: Vec<String>,
    /// Assigned products whose value is out of date.
    pub stale: Vec<ProductId>,
    /// Assigned, up-to-date products.
    pub fresh: Vec<ProductId>,
}

/// An incremental dependency graph of products and factories.
///
/// Callers register products and factories, wire them together through trait
/// bindings, and refresh through [`Flow::make`]. The graph is assumed
/// acyclic; a cycle encountered during traversal is reported as
/// [`FlowError::Cycle`] rather than recursed into.
pub struct Flow {
    pub(crate) products: Slab<ProductState>,
    pub(crate) factories: Slab<FactoryState>,
    monitor: StatusMonitor,
}

impl Default for Flow {
    fn default() -> Self {
        Self::new()
    }
}

impl Flow {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self {
            products: Slab::new(),
            factories: Slab::new(),
            monitor: StatusMonitor::default(),
        }
    }

    /// Add a product. Products start stale, so the first refresh that
    /// reaches them always computes.
    pub fn add_product(&mut self, name: impl Into<String>) -> ProductId {
        ProductId(self.products.insert(ProductState {
            name: name.into(),
            stale: true,
            consumers: Vec::new(),
            producers: Vec::new(),
        }))
    }

    /// Add a factory with its input and output traits in declared order.
    ///
    /// A trait named in both lists plays both roles and its bindings update
    /// independently. All traits start unbound; wire them up with
    /// [`Flow::trait_modified`].
    pub fn add_factory(
        &mut self,
        name: impl Into<String>,
        inputs: &[&str],
        outputs: &[&str],
        task: impl Task + 'static,
    ) -> FactoryId {
        let slots = |traits: &[&str]| {
            traits
                .iter()
                .map(|&trait_name| Binding {
                    trait_name: trait_name.to_owned(),
                    product: None,
                })
                .collect()
        };
        FactoryId(self.factories.insert(FactoryState {
            name: name.into(),
            inputs: slots(inputs),
            outputs: slots(outputs),
            task: Some(Box::new(task)),
        }))
    }

    /// The product's display name.
    pub fn product_name(&self, product: ProductId) -> &str {
        &self.products[product.0].name
    }

    /// The factory's display name.
    pub fn factory_name(&self, factory: FactoryId) -> &str {
        &self.factories[factory.0].name
    }

    /// Whether the product's cached value is out of date.
    pub fn is_stale(&self, product: ProductId) -> bool {
        self.products[product.0].stale
    }

    /// The factories currently holding `product` as a bound input.
    pub fn consumers(&self, product: ProductId) -> &[FactoryId] {
        &self.products[product.0].consumers
    }

    /// The factories currently holding `product` as a bound output.
    pub fn producers(&self, product: ProductId) -> &[FactoryId] {
        &self.products[product.0].producers
    }

    /// The factory's `(trait, bound product)` input pairs in declared order.
    pub fn inputs(&self, factory: FactoryId) -> impl Iterator<Item = (&str, Option<ProductId>)> {
        self.factories[factory.0]
            .inputs
            .iter()
            .map(|binding| (binding.trait_name.as_str(), binding.product))
    }

    /// The factory's `(trait, bound product)` output pairs in declared order.
    pub fn outputs(&self, factory: FactoryId) -> impl Iterator<Item = (&str, Option<ProductId>)> {
        self.factories[factory.0]
            .outputs
            .iter()
            .map(|binding| (binding.trait_name.as_str(), binding.product))
    }

    /// The status record mirroring the current bindings.
    pub fn monitor(&self) -> &StatusMonitor {
        &self.monitor
    }

    /// Record `factory` as a consumer of each product, updating the
    /// product's own record and the status monitor in the same operation.
    pub fn bind_inputs(&mut self, factory: FactoryId, products: &[ProductId]) {
        for &product in products {
            self.products[product.0].consumers.push(factory);
            self.monitor.add_input_binding(factory, product);
        }
    }

    /// Remove `factory` from each product's consumers, updating both views.
    pub fn unbind_inputs(&mut self, factory: FactoryId, products: &[ProductId]) {
        for &product in products {
            let consumers = &mut self.products[product.0].consumers;
            if let Some(at) = consumers.iter().position(|&present| present == factory) {
                consumers.remove(at);
            }
            self.monitor.remove_input_binding(factory, product);
        }
    }

    /// Record `factory` as a producer of each product, updating both views.
    pub fn bind_outputs(&mut self, factory: FactoryId, products: &[ProductId]) {
        for &product in products {
            self.products[product.0].producers.push(factory);
            self.monitor.add_output_binding(factory, product);
        }
    }

    /// Remove `factory` from each product's producers, updating both views.
    pub fn unbind_outputs(&mut self, factory: FactoryId, products: &[ProductId]) {
        for &product in products {
            let producers = &mut self.products[product.0].producers;
            if let Some(at) = producers.iter().position(|&present| present == factory) {
                producers.remove(at);
            }
            self.monitor.remove_output_binding(factory, product);
        }
    }

    /// React to a trait rebinding: unbind the old product, if any, then bind
    /// the new one, for every role that declares the trait. A trait declared
    /// as both input and output updates both roles independently.
    pub fn trait_modified(
        &mut self,
        factory: FactoryId,
        trait_name: &str,
        new: Option<ProductId>,
    ) -> Result<(), FlowError> {
        let input_at = self.factories[factory.0]
            .inputs
            .iter()
            .position(|binding| binding.trait_name == trait_name);
        let output_at = self.factories[factory.0]
            .outputs
            .iter()
            .position(|binding| binding.trait_name == trait_name);
        if input_at.is_none() && output_at.is_none() {
            return Err(FlowError::UnknownTrait {
                factory: self.factories[factory.0].name.clone(),
                trait_name: trait_name.to_owned(),
            });
        }
        if let Some(at) = input_at {
            if let Some(old) = self.factories[factory.0].inputs[at].product {
                self.unbind_inputs(factory, &[old]);
            }
            self.factories[factory.0].inputs[at].product = new;
            if let Some(new) = new {
                self.bind_inputs(factory, &[new]);
            }
        }
        if let Some(at) = output_at {
            if let Some(old) = self.factories[factory.0].outputs[at].product {
                self.unbind_outputs(factory, &[old]);
            }
            self.factories[factory.0].outputs[at].product = new;
            if let Some(new) = new {
                self.bind_outputs(factory, &[new]);
            }
        }
        Ok(())
    }

    /// Remove `factory`, unbinding it from every currently bound product
    /// first so no dangling binding records survive.
    pub fn remove_factory(&mut self, factory: FactoryId) {
        let inputs: Vec<ProductId> = self.factories[factory.0]
            .inputs
            .iter()
            .filter_map(|binding| binding.product)
            .collect();
        let outputs: Vec<ProductId> = self.factories[factory.0]
            .outputs
            .iter()
            .filter_map(|binding| binding.product)
            .collect();
        self.unbind_inputs(factory, &inputs);
        self.unbind_outputs(factory, &outputs);
        self.factories.remove(factory.0);
    }

    /// Partition the factory's current inputs into unbound, stale and fresh,
    /// preserving declared trait order within each group.
    pub fn examine_inputs(&self, factory: FactoryId) -> ExaminedInputs {
        let mut examined = ExaminedInputs::default();
        for binding in &self.factories[factory.0].inputs {
            match binding.product {
                None => examined.unbound.push(binding.trait_name.clone()),
                Some(product) if self.products[product.0].stale => examined.stale.push(product),
                Some(product) => examined.fresh.push(product),
            }
        }
        examined
    }

    /// Refresh `factory`.
    ///
    /// Fails with [`FlowError::IncompleteFlow`] if any input trait is
    /// unbound. Otherwise every stale input product is refreshed first,
    /// depth-first and left-to-right over declared input order, and then the
    /// factory's own task runs with the pre-refresh stale set - but only if
    /// at least one input was stale; an all-fresh factory is a no-op. On
    /// success the factory's bound outputs are marked fresh.
    ///
    /// There is no rollback: if a task fails midway, upstream products
    /// already refreshed stay fresh.
    #[track_caller]
    pub fn make(&mut self, factory: FactoryId) -> Result<(), FlowError> {
        let locator = Locator::caller();
        let mut path = Vec::new();
        self.make_factory(factory, locator, &mut path)
    }

    fn make_factory(
        &mut self,
        factory: FactoryId,
        locator: Locator,
        path: &mut Vec<FactoryId>,
    ) -> Result<(), FlowError> {
        if path.contains(&factory) {
            return Err(self.cycle_error(path, factory));
        }
        let examined = self.examine_inputs(factory);
        if !examined.unbound.is_empty() {
            return Err(FlowError::IncompleteFlow {
                factory,
                name: self.factories[factory.0].name.clone(),
                unbound: examined.unbound,
                locator,
            });
        }
        if examined.stale.is_empty() {
            return Ok(());
        }
        path.push(factory);
        for &product in &examined.stale {
            self.make_product(product, locator, path)?;
        }
        path.pop();
        tracing::debug!(
            factory = %self.factories[factory.0].name,
            stale = examined.stale.len(),
            "make: running task"
        );
        let mut task = self.factories[factory.0].task.take();
        let ran = match task.as_mut() {
            Some(task) => task.run(&examined.stale),
            None => Ok(()),
        };
        self.factories[factory.0].task = task;
        if let Err(source) = ran {
            return Err(FlowError::Task {
                name: self.factories[factory.0].name.clone(),
                source,
            });
        }
        // the run is the refresh of this factory's outputs
        let outputs: Vec<ProductId> = self.factories[factory.0]
            .outputs
            .iter()
            .filter_map(|binding| binding.product)
            .collect();
        for product in outputs {
            self.products[product.0].stale = false;
        }
        Ok(())
    }

    fn make_product(
        &mut self,
        product: ProductId,
        locator: Locator,
        path: &mut Vec<FactoryId>,
    ) -> Result<(), FlowError> {
        let producers = self.products[product.0].producers.clone();
        for factory in producers {
            self.make_factory(factory, locator, path)?;
        }
        self.products[product.0].stale = false;
        Ok(())
    }

    /// Mark `product` and every downstream product stale.
    ///
    /// Downstream means the bound outputs of its consumer factories,
    /// transitively. Visited-set guarded, so a cyclic graph terminates here
    /// even though refresh would report it as an error.
    pub fn invalidate(&mut self, product: ProductId) {
        let mut seen = HashSet::default();
        self.invalidate_from(product, &mut seen);
    }

    fn invalidate_from(&mut self, product: ProductId, seen: &mut HashSet<ProductId>) {
        if !seen.insert(product) {
            return;
        }
        tracing::trace!(product = %self.products[product.0].name, "invalidate");
        self.products[product.0].stale = true;
        let consumers = self.products[product.0].consumers.clone();
        for factory in consumers {
            let outputs: Vec<ProductId> = self.factories[factory.0]
                .outputs
                .iter()
                .filter_map(|binding| binding.product)
                .collect();
            for output in outputs {
                self.invalidate_from(output, seen);
            }
        }
    }

    /// The topologically ordered factory sequence that would refresh
    /// `factory`, without executing anything. One-shot: re-invoking
    /// recomputes the traversal from scratch.
    #[track_caller]
    pub fn tasklist(&self, factory: FactoryId) -> Tasklist<'_> {
        Tasklist::new(self, factory, Locator::caller())
    }

    /// The stale products that must be refreshed for `factory`, deepest
    /// first, for schedulers operating at the product level.
    #[track_caller]
    pub fn targets(&self, factory: FactoryId) -> Targets<'_> {
        Targets::new(self, factory, Locator::caller())
    }

    pub(crate) fn cycle_error(&self, path: &[FactoryId], repeat: FactoryId) -> FlowError {
        let start = path
            .iter()
            .position(|&present| present == repeat)
            .unwrap_or(0);
        let mut names: Vec<String> = path[start..]
            .iter()
            .map(|&factory| self.factories[factory.0].name.clone())
            .collect();
        names.push(self.factories[repeat.0].name.clone());
        FlowError::Cycle { path: names }
    }
}
