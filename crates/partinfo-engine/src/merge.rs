//! Cross-source reconciliation of part records.
//!
//! The primary source's records are the merge base. A secondary record for
//! the same normalized Mpn overrides the primary's offers Sku by Sku and fills
//! metadata gaps; secondary records with no primary counterpart are returned
//! separately for a second lookup against the primary.

use partinfo_core::Part;

/// Outcome of reconciling one query's results.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reconciled {
    /// Primary records with secondary data folded in
    pub merged: Vec<Part>,
    /// Secondary records with no primary counterpart
    pub secondary_only: Vec<Part>,
}

/// Fold a secondary record into the primary record of the same part.
///
/// Each secondary offer replaces the primary offer with the same Sku. Offers
/// present on one side only are kept.
pub fn apply_secondary(primary: &mut Part, secondary: &Part) {
    for offer in &secondary.offers {
        primary.replace_offer(offer.clone());
    }
    primary.backfill_from(secondary);
}

/// Reconcile primary records with each secondary source's records, in source
/// order.
#[must_use]
pub fn reconcile(primary: Vec<Part>, secondaries: Vec<Vec<Part>>) -> Reconciled {
    let mut merged = primary;
    let mut secondary_only: Vec<Part> = Vec::new();

    for part in secondaries.into_iter().flatten() {
        if let Some(base) = merged.iter_mut().find(|p| p.mpn.same_part(&part.mpn)) {
            apply_secondary(base, &part);
        } else if let Some(base) = secondary_only
            .iter_mut()
            .find(|p| p.mpn.same_part(&part.mpn))
        {
            apply_secondary(base, &part);
        } else {
            secondary_only.push(part);
        }
    }

    Reconciled {
        merged,
        secondary_only,
    }
}

/// Fold parts sharing a normalized Mpn into the first occurrence, keeping
/// order. Offers combine by Sku; metadata gaps are filled.
#[must_use]
pub fn fold_duplicates(parts: Vec<Part>) -> Vec<Part> {
    let mut folded: Vec<Part> = Vec::with_capacity(parts.len());
    for part in parts {
        match folded.iter_mut().find(|p| p.mpn.same_part(&part.mpn)) {
            Some(existing) => {
                existing.backfill_from(&part);
                for offer in part.offers {
                    existing.upsert_offer(offer);
                }
            }
            None => folded.push(part),
        }
    }
    folded
}
