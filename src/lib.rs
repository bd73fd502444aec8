#![deny(missing_docs)]
#![doc = include_str!("../README.md")]

mod error;
mod flow;
mod key;
mod model;
mod monitor;
mod node;
mod traversal;

pub use error::{FlowError, Locator};
pub use flow::{ExaminedInputs, FactoryId, Flow, ProductId, Task};
pub use key::{Key, PathHash};
pub use model::{Model, Path, SEPARATOR};
pub use monitor::StatusMonitor;
pub use node::{Keep, Node, Patch, Replace, Unresolved};
pub use traversal::{Targets, Tasklist};
