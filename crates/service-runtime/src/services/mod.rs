//! Entity services: one thin adapter per ledger entity kind over the shared
//! [`GuardedEntityService`] core.

pub mod backup;
pub mod core;
pub mod domain;
pub mod error;
pub mod idea;
pub mod records;
pub mod rewards;

pub use backup::{BackupService, BackupState};
pub use self::core::{Confirmed, GuardedEntityService, LedgerEntity};
pub use domain::{DomainService, DomainState};
pub use error::{ServiceError, ServiceResult};
pub use idea::{IdeaService, IdeaState};
pub use records::{BackupRequestRecord, BackupStatus, DomainRecord, IdeaRecord};
pub use rewards::{NodeRewardService, RewardDistribution, RewardPoolInvalidator, RewardState};
