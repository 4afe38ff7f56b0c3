//! # Ledger Events
//!
//! Decoded domain events emitted by the ledger contracts. The enum is the
//! typed replacement for string-keyed event names.

use serde::{Deserialize, Serialize};
use shared_types::{EntityId, EntityKind, EntityRef};
use std::fmt;

/// All events that can arrive from the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerEvent {
    // =========================================================================
    // DOMAIN REGISTRY
    // =========================================================================
    /// A knowledge domain was registered.
    DomainRegistered { domain: EntityId, owner: String },

    /// Domain metadata changed.
    DomainUpdated { domain: EntityId },

    /// A domain was mapped onto a content target.
    DomainMapped { domain: EntityId, target: String },

    /// A contribution was credited to a domain.
    ContributionRecorded {
        domain: EntityId,
        contributor: String,
        amount: u128,
    },

    // =========================================================================
    // IDEA REGISTRY
    // =========================================================================
    /// An idea was registered.
    IdeaRegistered { idea_id: EntityId, creator: String },

    /// Idea metadata changed.
    IdeaUpdated { idea_id: EntityId },

    /// Royalties were paid out for an idea.
    RoyaltiesDistributed { idea_id: EntityId, amount: u128 },

    // =========================================================================
    // BACKUP REQUESTS
    // =========================================================================
    /// A backup was requested.
    BackupRequested { request_id: EntityId, requester: String },

    /// A provider completed a backup.
    BackupCompleted { request_id: EntityId, provider: String },

    /// A backup request was withdrawn.
    BackupCancelled { request_id: EntityId },

    // =========================================================================
    // NODE REWARDS
    // =========================================================================
    /// The node reward pool paid out an epoch.
    RewardsDistributed { epoch: u64, amount: u128 },

    /// A governance parameter changed. Carries no entity.
    ParameterChanged { parameter: String },
}

/// Identifier of the node reward pool entity.
pub const REWARD_POOL_ID: &str = "pool";

impl LedgerEvent {
    /// The kind this event is delivered under.
    #[must_use]
    pub fn kind(&self) -> EventKind {
        match self {
            LedgerEvent::DomainRegistered { .. } => EventKind::DomainRegistered,
            LedgerEvent::DomainUpdated { .. } => EventKind::DomainUpdated,
            LedgerEvent::DomainMapped { .. } => EventKind::DomainMapped,
            LedgerEvent::ContributionRecorded { .. } => EventKind::ContributionRecorded,
            LedgerEvent::IdeaRegistered { .. } => EventKind::IdeaRegistered,
            LedgerEvent::IdeaUpdated { .. } => EventKind::IdeaUpdated,
            LedgerEvent::RoyaltiesDistributed { .. } => EventKind::RoyaltiesDistributed,
            LedgerEvent::BackupRequested { .. } => EventKind::BackupRequested,
            LedgerEvent::BackupCompleted { .. } => EventKind::BackupCompleted,
            LedgerEvent::BackupCancelled { .. } => EventKind::BackupCancelled,
            LedgerEvent::RewardsDistributed { .. } => EventKind::RewardsDistributed,
            LedgerEvent::ParameterChanged { .. } => EventKind::ParameterChanged,
        }
    }

    /// The entity whose cached state this event makes stale, if any.
    #[must_use]
    pub fn entity(&self) -> Option<EntityRef> {
        match self {
            LedgerEvent::DomainRegistered { domain, .. }
            | LedgerEvent::DomainUpdated { domain }
            | LedgerEvent::DomainMapped { domain, .. }
            | LedgerEvent::ContributionRecorded { domain, .. } => {
                Some(EntityRef::new(EntityKind::Domain, domain.clone()))
            }
            LedgerEvent::IdeaRegistered { idea_id, .. }
            | LedgerEvent::IdeaUpdated { idea_id }
            | LedgerEvent::RoyaltiesDistributed { idea_id, .. } => {
                Some(EntityRef::new(EntityKind::Idea, idea_id.clone()))
            }
            LedgerEvent::BackupRequested { request_id, .. }
            | LedgerEvent::BackupCompleted { request_id, .. }
            | LedgerEvent::BackupCancelled { request_id } => {
                Some(EntityRef::new(EntityKind::BackupRequest, request_id.clone()))
            }
            LedgerEvent::RewardsDistributed { .. } => {
                Some(EntityRef::new(EntityKind::NodeRewards, REWARD_POOL_ID))
            }
            LedgerEvent::ParameterChanged { .. } => None,
        }
    }
}

/// Event kinds, one per [`LedgerEvent`] variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventKind {
    DomainRegistered,
    DomainUpdated,
    DomainMapped,
    ContributionRecorded,
    IdeaRegistered,
    IdeaUpdated,
    RoyaltiesDistributed,
    BackupRequested,
    BackupCompleted,
    BackupCancelled,
    RewardsDistributed,
    ParameterChanged,
}

impl EventKind {
    /// Every kind.
    pub const ALL: [EventKind; 12] = [
        EventKind::DomainRegistered,
        EventKind::DomainUpdated,
        EventKind::DomainMapped,
        EventKind::ContributionRecorded,
        EventKind::IdeaRegistered,
        EventKind::IdeaUpdated,
        EventKind::RoyaltiesDistributed,
        EventKind::BackupRequested,
        EventKind::BackupCompleted,
        EventKind::BackupCancelled,
        EventKind::RewardsDistributed,
        EventKind::ParameterChanged,
    ];

    /// Kinds that concern one entity category.
    #[must_use]
    pub fn for_entity(kind: EntityKind) -> &'static [EventKind] {
        match kind {
            EntityKind::Domain => &[
                EventKind::DomainRegistered,
                EventKind::DomainUpdated,
                EventKind::DomainMapped,
                EventKind::ContributionRecorded,
            ],
            EntityKind::Idea => &[
                EventKind::IdeaRegistered,
                EventKind::IdeaUpdated,
                EventKind::RoyaltiesDistributed,
            ],
            EntityKind::BackupRequest => &[
                EventKind::BackupRequested,
                EventKind::BackupCompleted,
                EventKind::BackupCancelled,
            ],
            EntityKind::NodeRewards => &[EventKind::RewardsDistributed],
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}
