//! Inventory and requirement arithmetic.
//!
//! Inventories and requirements are both `BTreeMap<Material, u32>`. Every
//! function here uses checked arithmetic: no silent overflows, no panics.

use craftbots_types::{Inventory, Material, Requirements};

use crate::error::AgentError;

/// Quantity of `material` held, zero when absent.
pub fn quantity(inventory: &Inventory, material: Material) -> u32 {
    inventory.get(&material).copied().unwrap_or(0)
}

/// Sum of all quantities. `None` on overflow.
pub fn total(inventory: &Inventory) -> Option<u32> {
    let mut sum: u32 = 0;
    for qty in inventory.values() {
        sum = sum.checked_add(*qty)?;
    }
    Some(sum)
}

/// Check whether the inventory holds at least `amount` of `material`.
pub fn has_material(inventory: &Inventory, material: Material, amount: u32) -> bool {
    quantity(inventory, material) >= amount
}

/// Add `amount` units of `material`.
pub fn add_material(
    inventory: &mut Inventory,
    material: Material,
    amount: u32,
) -> Result<(), AgentError> {
    if amount == 0 {
        return Ok(());
    }
    let entry = inventory.entry(material).or_insert(0);
    *entry = entry
        .checked_add(amount)
        .ok_or_else(|| AgentError::ArithmeticOverflow {
            context: format!("adding {amount} {material} to inventory"),
        })?;
    Ok(())
}

/// Remove `amount` units of `material`.
///
/// Fails without touching the inventory if not enough is held. Removes the
/// key once the quantity reaches zero.
pub fn remove_material(
    inventory: &mut Inventory,
    material: Material,
    amount: u32,
) -> Result<(), AgentError> {
    let current = quantity(inventory, material);
    let remaining = current
        .checked_sub(amount)
        .ok_or(AgentError::InsufficientMaterial {
            material,
            requested: amount,
            available: current,
        })?;
    if remaining == 0 {
        inventory.remove(&material);
    } else {
        inventory.insert(material, remaining);
    }
    Ok(())
}

/// Add every line of `other` into `inventory`.
pub fn merge(inventory: &mut Inventory, other: &Inventory) -> Result<(), AgentError> {
    for (material, qty) in other {
        add_material(inventory, *material, *qty)?;
    }
    Ok(())
}

/// Whether the inventory meets every requirement line. Empty requirements
/// are always met.
pub fn satisfies(inventory: &Inventory, requirements: &Requirements) -> bool {
    requirements
        .iter()
        .all(|(material, needed)| has_material(inventory, *material, *needed))
}

/// Whether more of `material` is still useful toward `requirements`.
///
/// With no requirements at all, everything is useful.
pub fn still_needed(inventory: &Inventory, requirements: &Requirements, material: Material) -> bool {
    if requirements.is_empty() {
        return true;
    }
    requirements
        .get(&material)
        .is_some_and(|needed| quantity(inventory, material) < *needed)
}

/// Requirement lines not yet covered, with the missing quantities.
pub fn outstanding(inventory: &Inventory, requirements: &Requirements) -> Requirements {
    requirements
        .iter()
        .filter_map(|(material, needed)| {
            let missing = needed.saturating_sub(quantity(inventory, *material));
            (missing > 0).then_some((*material, missing))
        })
        .collect()
}

/// What to hand over against `requirements`: each line clamped to what is
/// held, never more than required.
pub fn provided_for(inventory: &Inventory, requirements: &Requirements) -> Inventory {
    requirements
        .iter()
        .map(|(material, needed)| (*material, quantity(inventory, *material).min(*needed)))
        .collect()
}

/// Drain all materials, returning them as a new map.
///
/// The inventory is left empty after this call.
pub const fn drain_all(inventory: &mut Inventory) -> Inventory {
    let mut drained = Inventory::new();
    core::mem::swap(inventory, &mut drained);
    drained
}
