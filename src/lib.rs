//! glTF/GLB/VRM import core and humanoid armature normalizer.
//!
//! Two independent pipelines:
//!
//! - [`import`]: splits a GLB container into chunks, validates the scene
//!   document, and resolves buffers/views/accessors (and the entities built
//!   on them) into typed data through a per-run resource cache.
//! - [`fix`]: rewrites an arbitrary humanoid skeleton (MMD, Source engine,
//!   Mixamo, VRM) into the canonical bone hierarchy avatar platforms expect,
//!   merging skin weights and validating the result.
//!
//! The two share no runtime state. The [`skeleton`] module is the boundary
//! type a host scene graph is mapped into before handing it to [`fix`].

pub mod error;
pub mod fix;
pub mod import;
pub mod skeleton;

pub use error::{HierarchyError, ImportError};
pub use fix::{FixOptions, FixReport, fix_armature};
pub use import::Importer;
pub use skeleton::{Skeleton, WeightChannels};
