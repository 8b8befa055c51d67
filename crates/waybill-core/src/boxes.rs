//! # Box List Operations
//!
//! Structural edits on a shipment's box list. Every operation here leaves
//! the list numbered `1..=N` in display order.
//!
//! ```text
//!   before remove(1)          after remove(1)
//!   ┌───┬───┬───┬───┐         ┌───┬───┬───┐
//!   │ 1 │ 2 │ 3 │ 4 │   ──►   │ 1 │ 2 │ 3 │
//!   └───┴───┴───┴───┘         └───┴───┴───┘
//!     a   b   c   d             a   c   d
//! ```

use std::collections::HashSet;
use uuid::Uuid;

use crate::error::ValidationError;
use crate::types::{ShipmentBox, ShipmentProduct};
use crate::validation::ValidationResult;

/// Rewrites `box_number` from list position.
pub fn renumber(boxes: &mut [ShipmentBox]) {
    for (idx, shipment_box) in boxes.iter_mut().enumerate() {
        shipment_box.box_number = idx as u32 + 1;
    }
}

/// True when box numbers are exactly `1..=N` in order.
pub fn is_contiguous(boxes: &[ShipmentBox]) -> bool {
    boxes
        .iter()
        .enumerate()
        .all(|(idx, b)| b.box_number == idx as u32 + 1)
}

/// Takes ownership of a loaded list and normalizes it.
///
/// Stored lists may carry stale or duplicate numbers; the list order is
/// what counts.
pub fn load(mut boxes: Vec<ShipmentBox>) -> Vec<ShipmentBox> {
    renumber(&mut boxes);
    boxes
}

/// Appends a box and returns its index.
pub fn add_box(boxes: &mut Vec<ShipmentBox>, shipment_box: ShipmentBox) -> usize {
    boxes.push(shipment_box);
    renumber(boxes);
    boxes.len() - 1
}

/// Inserts a box at `index` (clamped to the end of the list).
pub fn insert_box(boxes: &mut Vec<ShipmentBox>, index: usize, shipment_box: ShipmentBox) -> usize {
    let at = index.min(boxes.len());
    boxes.insert(at, shipment_box);
    renumber(boxes);
    at
}

pub fn remove_box(boxes: &mut Vec<ShipmentBox>, index: usize) -> ValidationResult<ShipmentBox> {
    check_index("boxes", index, boxes.len())?;
    let removed = boxes.remove(index);
    renumber(boxes);
    Ok(removed)
}

pub fn add_product(
    boxes: &mut [ShipmentBox],
    box_index: usize,
    product: ShipmentProduct,
) -> ValidationResult<usize> {
    check_index("boxes", box_index, boxes.len())?;
    let products = &mut boxes[box_index].products;
    products.push(product);
    Ok(products.len() - 1)
}

pub fn remove_product(
    boxes: &mut [ShipmentBox],
    box_index: usize,
    product_index: usize,
) -> ValidationResult<ShipmentProduct> {
    check_index("boxes", box_index, boxes.len())?;
    let products = &mut boxes[box_index].products;
    check_index("products", product_index, products.len())?;
    Ok(products.remove(product_index))
}

pub fn replace_product(
    boxes: &mut [ShipmentBox],
    box_index: usize,
    product_index: usize,
    product: ShipmentProduct,
) -> ValidationResult<()> {
    check_index("boxes", box_index, boxes.len())?;
    let products = &mut boxes[box_index].products;
    check_index("products", product_index, products.len())?;
    products[product_index] = product;
    Ok(())
}

/// Gives a fresh UUID to every box and product whose id is blank or
/// already taken earlier in the list.
///
/// Box ids and product ids are unique across the whole form. Returns how
/// many ids were assigned.
pub fn assign_missing_ids(boxes: &mut [ShipmentBox]) -> usize {
    let mut box_ids = HashSet::new();
    let mut product_ids = HashSet::new();
    let mut assigned = 0;
    for shipment_box in boxes.iter_mut() {
        if !claim(&mut box_ids, &mut shipment_box.id) {
            assigned += 1;
        }
        for product in shipment_box.products.iter_mut() {
            if !claim(&mut product_ids, &mut product.id) {
                assigned += 1;
            }
        }
    }
    assigned
}

/// Keeps `id` if it is non-blank and unseen, otherwise replaces it.
/// Returns `false` when a new id was generated.
fn claim(seen: &mut HashSet<String>, id: &mut String) -> bool {
    let kept = !id.trim().is_empty() && seen.insert(id.clone());
    if !kept {
        *id = Uuid::new_v4().to_string();
        seen.insert(id.clone());
    }
    kept
}

fn check_index(field: &str, index: usize, len: usize) -> ValidationResult<()> {
    if index >= len {
        return Err(ValidationError::IndexOutOfRange {
            field: field.to_string(),
            index,
            len,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::Money;
    use crate::weight::Weight;

    fn numbers(boxes: &[ShipmentBox]) -> Vec<u32> {
        boxes.iter().map(|b| b.box_number).collect()
    }

    #[test]
    fn test_add_and_remove_keep_numbers_contiguous() {
        let mut boxes = Vec::new();
        for _ in 0..4 {
            add_box(&mut boxes, ShipmentBox::new());
        }
        assert_eq!(numbers(&boxes), vec![1, 2, 3, 4]);

        let second_id = boxes[1].id.clone();
        let removed = remove_box(&mut boxes, 1).unwrap();
        assert_eq!(removed.id, second_id);
        assert_eq!(numbers(&boxes), vec![1, 2, 3]);
        assert!(is_contiguous(&boxes));

        insert_box(&mut boxes, 0, ShipmentBox::new());
        assert_eq!(numbers(&boxes), vec![1, 2, 3, 4]);

        remove_box(&mut boxes, 3).unwrap();
        remove_box(&mut boxes, 0).unwrap();
        assert_eq!(numbers(&boxes), vec![1, 2]);
    }

    #[test]
    fn test_load_repairs_stale_numbers() {
        let mut a = ShipmentBox::new();
        a.box_number = 7;
        let mut b = ShipmentBox::new();
        b.box_number = 7;
        let boxes = load(vec![a, b, ShipmentBox::default()]);
        assert_eq!(numbers(&boxes), vec![1, 2, 3]);
    }

    #[test]
    fn test_out_of_range() {
        let mut boxes = vec![ShipmentBox::new()];
        assert!(matches!(
            remove_box(&mut boxes, 3),
            Err(ValidationError::IndexOutOfRange { index: 3, len: 1, .. })
        ));
        assert!(remove_product(&mut boxes, 0, 0).is_err());
    }

    #[test]
    fn test_product_edits() {
        let mut boxes = vec![ShipmentBox::new()];
        let product = ShipmentProduct::new("Roses", Weight::from_grams(1000), Money::from_cents(100));
        assert_eq!(add_product(&mut boxes, 0, product.clone()).unwrap(), 0);
        assert_eq!(add_product(&mut boxes, 0, product).unwrap(), 1);

        let replacement = ShipmentProduct::new("Carnations", Weight::zero(), Money::zero());
        replace_product(&mut boxes, 0, 1, replacement).unwrap();
        assert_eq!(boxes[0].products[1].product_type, "Carnations");

        let removed = remove_product(&mut boxes, 0, 0).unwrap();
        assert_eq!(removed.product_type, "Roses");
        assert_eq!(boxes[0].products.len(), 1);
    }

    #[test]
    fn test_assign_missing_ids() {
        let mut boxes = vec![ShipmentBox::default(), ShipmentBox::new()];
        boxes[0].products.push(ShipmentProduct::default());
        let keep = boxes[1].id.clone();

        assert_eq!(assign_missing_ids(&mut boxes), 2);
        assert!(!boxes[0].id.is_empty());
        assert!(!boxes[0].products[0].id.is_empty());
        assert_eq!(boxes[1].id, keep);
        assert_eq!(assign_missing_ids(&mut boxes), 0);
    }

    #[test]
    fn test_assign_replaces_duplicates() {
        let first = ShipmentBox::new();
        let mut boxes = vec![first.clone(), first.clone()];
        let product = ShipmentProduct::new("Roses", Weight::zero(), Money::zero());
        boxes[0].products.push(product.clone());
        boxes[1].products.push(product.clone());

        assert_eq!(assign_missing_ids(&mut boxes), 2);
        assert_eq!(boxes[0].id, first.id);
        assert_ne!(boxes[1].id, first.id);
        assert_eq!(boxes[0].products[0].id, product.id);
        assert_ne!(boxes[1].products[0].id, product.id);
    }
}
