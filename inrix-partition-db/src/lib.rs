pub mod applier;
pub mod driver;
pub mod ident;
pub mod partition;
pub mod retry;
pub mod session;
pub mod sql;

#[cfg(test)]
mod test_support;

pub use applier::{ApplyOutcome, ConstraintApplier};

pub use driver::{
    RunSummary,
    run_partitioning,
};

pub use partition::{
    PartitionLabel,
    labels,
};

pub use retry::RetryPolicy;

pub use session::{
    Connector,
    PartitionSession,
    PgConnector,
    PgSession,
};
