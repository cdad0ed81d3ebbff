//! Purchase/unlock gate.
//!
//! Access to full-resolution results is derived from *completed* purchases
//! only. A refunded or failed purchase grants nothing, so refunds revoke
//! access without any extra bookkeeping.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::status::{PurchaseStatus, PurchaseTier};
use crate::types::VariantIndex;

/// The subset of a purchase row the gate looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PurchaseGrant {
    pub status: PurchaseStatus,
    pub tier: PurchaseTier,
    /// For `Single` purchases: the variant bought. `None` means the primary
    /// result.
    pub variant_index: Option<VariantIndex>,
}

/// Highest tier of access a job has been granted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessTier {
    None,
    Single,
    All,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Access {
    pub tier: AccessTier,
    pub unlocked_variant_indexes: BTreeSet<VariantIndex>,
}

impl Access {
    pub fn is_unlocked(&self, variant_index: VariantIndex) -> bool {
        self.unlocked_variant_indexes.contains(&variant_index)
    }
}

/// Compute which variants of a job are unlocked.
///
/// `primary_variant_index` is the variant that became the primary result
/// (absent until the first variant succeeds). `variant_indexes` lists every
/// persisted result. Purchases naming a variant that does not exist unlock
/// nothing.
pub fn resolve_access(
    primary_variant_index: Option<VariantIndex>,
    variant_indexes: &[VariantIndex],
    purchases: &[PurchaseGrant],
) -> Access {
    let mut tier = AccessTier::None;
    let mut unlocked = BTreeSet::new();

    for grant in purchases
        .iter()
        .filter(|g| g.status == PurchaseStatus::Completed)
    {
        match grant.tier {
            PurchaseTier::All => {
                tier = AccessTier::All;
                unlocked.extend(variant_indexes.iter().copied());
            }
            PurchaseTier::Single => {
                let target = grant.variant_index.or(primary_variant_index);
                if let Some(index) = target.filter(|i| variant_indexes.contains(i)) {
                    tier = tier.max(AccessTier::Single);
                    unlocked.insert(index);
                }
            }
        }
    }

    Access {
        tier,
        unlocked_variant_indexes: unlocked,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grant(status: PurchaseStatus, tier: PurchaseTier, index: Option<i16>) -> PurchaseGrant {
        PurchaseGrant {
            status,
            tier,
            variant_index: index,
        }
    }

    const VARIANTS: &[i16] = &[0, 2, 3];

    #[test]
    fn no_purchases_unlock_nothing() {
        let access = resolve_access(Some(0), VARIANTS, &[]);
        assert_eq!(access.tier, AccessTier::None);
        assert!(access.unlocked_variant_indexes.is_empty());
    }

    #[test]
    fn single_purchase_unlocks_one_variant() {
        let access = resolve_access(
            Some(0),
            VARIANTS,
            &[grant(PurchaseStatus::Completed, PurchaseTier::Single, Some(2))],
        );
        assert_eq!(access.tier, AccessTier::Single);
        assert!(access.is_unlocked(2));
        assert!(!access.is_unlocked(0));
    }

    #[test]
    fn single_purchase_without_index_unlocks_primary() {
        let access = resolve_access(
            Some(3),
            VARIANTS,
            &[grant(PurchaseStatus::Completed, PurchaseTier::Single, None)],
        );
        assert_eq!(access.unlocked_variant_indexes, BTreeSet::from([3]));
    }

    #[test]
    fn all_tier_unlocks_every_variant() {
        let access = resolve_access(
            Some(0),
            VARIANTS,
            &[grant(PurchaseStatus::Completed, PurchaseTier::All, None)],
        );
        assert_eq!(access.tier, AccessTier::All);
        assert_eq!(access.unlocked_variant_indexes, BTreeSet::from([0, 2, 3]));
    }

    #[test]
    fn pending_failed_and_refunded_purchases_grant_nothing() {
        let purchases = [
            grant(PurchaseStatus::Pending, PurchaseTier::All, None),
            grant(PurchaseStatus::Failed, PurchaseTier::All, None),
            grant(PurchaseStatus::Refunded, PurchaseTier::All, None),
        ];
        let access = resolve_access(Some(0), VARIANTS, &purchases);
        assert_eq!(access.tier, AccessTier::None);
        assert!(access.unlocked_variant_indexes.is_empty());
    }

    #[test]
    fn purchase_of_a_failed_variant_unlocks_nothing() {
        let access = resolve_access(
            Some(0),
            VARIANTS,
            &[grant(PurchaseStatus::Completed, PurchaseTier::Single, Some(1))],
        );
        assert_eq!(access.tier, AccessTier::None);
    }

    #[test]
    fn tiers_combine() {
        let purchases = [
            grant(PurchaseStatus::Completed, PurchaseTier::Single, Some(2)),
            grant(PurchaseStatus::Completed, PurchaseTier::All, None),
        ];
        let access = resolve_access(Some(0), VARIANTS, &purchases);
        assert_eq!(access.tier, AccessTier::All);
        assert_eq!(access.unlocked_variant_indexes.len(), 3);
    }
}
