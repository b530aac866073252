//! `BeanMeta` Resolver: merges declarative documents and code-level markers into resolved descriptor tables.

pub mod builder;
pub mod callbacks;
pub mod catalog;
pub mod config;
pub mod diagnostics;
pub mod interceptors;
pub mod merge;
pub mod registry;
pub mod validate;

pub use builder::{BuildOutcome, DescriptorBuilder};
pub use callbacks::CallbackDisambiguator;
pub use catalog::Catalog;
pub use config::{ResolverConfig, ValidationMode};
pub use diagnostics::Diagnostics;
pub use interceptors::{CodeInterceptors, InterceptorBindings};
pub use merge::{AttributeMerger, MergedAttributes};
pub use registry::{ComponentReport, DescriptorRegistry};
pub use validate::validate;
