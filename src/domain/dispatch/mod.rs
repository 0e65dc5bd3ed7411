//! Provider selection and outcome normalization

mod dispatcher;

pub use dispatcher::{Dispatcher, DispatcherBuilder};
