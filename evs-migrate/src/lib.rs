//! Migration workflow: vCenter VM to EVS cluster, and rollback.

pub mod error;
pub mod migrator;
pub mod result;
pub mod site;
pub mod step;

pub use error::{MigrationError, Result};
pub use migrator::{MigratorSettings, VMigrator};
pub use result::MigrationResult;
pub use site::{SourceSite, TargetSite};
pub use step::MigrationStep;
