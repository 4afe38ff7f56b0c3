//! # Contract Calls
//!
//! Names and argument shapes of the ledger contracts the services talk to.
//! Amounts are passed as decimal strings.

use serde_json::json;
use shared_types::{LedgerMutation, LedgerRead};

/// Domain registry.
pub mod domain {
    use super::*;

    pub const CONTRACT: &str = "domain_registry";
    pub const GET: &str = "get_domain";
    pub const REGISTER: &str = "register_domain";
    pub const UPDATE: &str = "update_domain";
    pub const MAP: &str = "map_domain";
    pub const CONTRIBUTE: &str = "contribute";

    pub fn get(name: &str) -> LedgerRead {
        LedgerRead::new(CONTRACT, GET, json!({ "name": name }))
    }

    pub fn register(name: &str, owner: &str, metadata: &str) -> LedgerMutation {
        LedgerMutation::new(
            CONTRACT,
            REGISTER,
            json!({ "name": name, "owner": owner, "metadata": metadata }),
        )
    }

    pub fn update(name: &str, metadata: &str) -> LedgerMutation {
        LedgerMutation::new(CONTRACT, UPDATE, json!({ "name": name, "metadata": metadata }))
    }

    pub fn map(name: &str, target: &str) -> LedgerMutation {
        LedgerMutation::new(CONTRACT, MAP, json!({ "name": name, "target": target }))
    }

    pub fn contribute(name: &str, contributor: &str, amount: u128) -> LedgerMutation {
        LedgerMutation::new(
            CONTRACT,
            CONTRIBUTE,
            json!({ "name": name, "contributor": contributor, "amount": amount.to_string() }),
        )
    }
}

/// Idea registry.
pub mod idea {
    use super::*;

    pub const CONTRACT: &str = "idea_registry";
    pub const GET: &str = "get_idea";
    pub const REGISTER: &str = "register_idea";
    pub const UPDATE: &str = "update_idea";
    pub const DISTRIBUTE_ROYALTIES: &str = "distribute_royalties";

    pub fn get(id: &str) -> LedgerRead {
        LedgerRead::new(CONTRACT, GET, json!({ "id": id }))
    }

    pub fn register(id: &str, creator: &str, title: &str) -> LedgerMutation {
        LedgerMutation::new(
            CONTRACT,
            REGISTER,
            json!({ "id": id, "creator": creator, "title": title }),
        )
    }

    pub fn update(id: &str, title: &str) -> LedgerMutation {
        LedgerMutation::new(CONTRACT, UPDATE, json!({ "id": id, "title": title }))
    }

    pub fn distribute_royalties(id: &str, amount: u128) -> LedgerMutation {
        LedgerMutation::new(
            CONTRACT,
            DISTRIBUTE_ROYALTIES,
            json!({ "id": id, "amount": amount.to_string() }),
        )
    }
}

/// Backup request registry.
pub mod backup {
    use super::*;

    pub const CONTRACT: &str = "backup_registry";
    pub const GET: &str = "get_request";
    pub const REQUEST: &str = "request_backup";
    pub const COMPLETE: &str = "complete_backup";
    pub const CANCEL: &str = "cancel_backup";

    pub fn get(id: &str) -> LedgerRead {
        LedgerRead::new(CONTRACT, GET, json!({ "id": id }))
    }

    pub fn request(id: &str, requester: &str, data_hash: &str) -> LedgerMutation {
        LedgerMutation::new(
            CONTRACT,
            REQUEST,
            json!({ "id": id, "requester": requester, "data_hash": data_hash }),
        )
    }

    pub fn complete(id: &str, provider: &str) -> LedgerMutation {
        LedgerMutation::new(CONTRACT, COMPLETE, json!({ "id": id, "provider": provider }))
    }

    pub fn cancel(id: &str) -> LedgerMutation {
        LedgerMutation::new(CONTRACT, CANCEL, json!({ "id": id }))
    }
}

/// Node reward pool and node metrics.
pub mod rewards {
    use super::*;

    pub const CONTRACT: &str = "node_rewards";
    pub const METRIC: &str = "metric";
    pub const DISTRIBUTE: &str = "distribute";

    pub fn metric(name: &str) -> LedgerRead {
        LedgerRead::new(CONTRACT, METRIC, json!({ "name": name }))
    }

    pub fn distribute(epoch: u64, amount: u128) -> LedgerMutation {
        LedgerMutation::new(
            CONTRACT,
            DISTRIBUTE,
            json!({ "epoch": epoch, "amount": amount.to_string() }),
        )
    }
}
