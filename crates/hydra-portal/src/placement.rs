//! Where a new mirror attaches under a target bullet.

use hydra_blocks::BlockHandle;
use hydra_types::{DESCRIPTOR_FLAVOUR, DescriptorKind, PlacementResult};

/// Whether a block is a descriptor pseudo-child.
pub fn is_descriptor<B: BlockHandle + ?Sized>(block: &B) -> bool {
    block.flavour() == DESCRIPTOR_FLAVOUR
}

/// Choose the parent and index for a new mirror under `bullet`.
///
/// The first descriptor child wins; without one the bullet itself is the
/// parent. The index is always 0. Never mutates the tree.
pub fn determine_placement<B: BlockHandle + ?Sized>(bullet: &B) -> PlacementResult {
    let descriptor = bullet.children().into_iter().find(|child| is_descriptor(child.as_ref()));

    match descriptor {
        Some(descriptor) => {
            let kind = DescriptorKind::from_str(&descriptor.text());
            tracing::trace!(bullet = %bullet.id(), descriptor = %descriptor.id(), ?kind, "placing under descriptor");
            PlacementResult::descriptor(descriptor.id(), kind)
        }
        None => PlacementResult::direct(bullet.id()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hydra_blocks::OutlineDocument;
    use hydra_types::PlacementReason;

    #[test]
    fn test_descriptor_wins() {
        let doc = OutlineDocument::new("d");
        let bullet = doc.append_bullet(None, "Apple").unwrap();
        let what = doc.append_descriptor(&bullet, DescriptorKind::What).unwrap();
        doc.append_bullet(Some(&bullet), "plain").unwrap();

        let placement = determine_placement(doc.block(&bullet).unwrap().as_ref());
        assert_eq!(placement.parent_block_id, what);
        assert_eq!(placement.insert_index, 0);
        assert_eq!(placement.reason, PlacementReason::Descriptor);
        assert_eq!(placement.descriptor, Some(DescriptorKind::What));
    }

    #[test]
    fn test_first_descriptor_even_after_plain_children() {
        let doc = OutlineDocument::new("d");
        let bullet = doc.append_bullet(None, "Apple").unwrap();
        doc.append_bullet(Some(&bullet), "plain").unwrap();
        let pros = doc.append_descriptor(&bullet, DescriptorKind::Pros).unwrap();
        doc.append_descriptor(&bullet, DescriptorKind::Cons).unwrap();

        let placement = determine_placement(doc.block(&bullet).unwrap().as_ref());
        assert_eq!(placement.parent_block_id, pros);
        assert_eq!(placement.descriptor, Some(DescriptorKind::Pros));
    }

    #[test]
    fn test_direct_without_descriptor() {
        let doc = OutlineDocument::new("d");
        let bullet = doc.append_bullet(None, "Apple").unwrap();
        doc.append_bullet(Some(&bullet), "plain").unwrap();

        let placement = determine_placement(doc.block(&bullet).unwrap().as_ref());
        assert_eq!(placement.parent_block_id, bullet);
        assert_eq!(placement.insert_index, 0);
        assert_eq!(placement.reason, PlacementReason::Direct);
        assert_eq!(placement.descriptor, None);
    }

    #[test]
    fn test_leaf_bullet_is_direct() {
        let doc = OutlineDocument::new("d");
        let bullet = doc.append_bullet(None, "Apple").unwrap();
        let placement = determine_placement(doc.block(&bullet).unwrap().as_ref());
        assert_eq!(placement.reason, PlacementReason::Direct);
    }

    #[test]
    fn test_unlabelled_descriptor_still_counts() {
        let doc = OutlineDocument::new("d");
        let bullet = doc.append_bullet(None, "Apple").unwrap();
        let custom = doc
            .insert_block(Some(&bullet), None, DESCRIPTOR_FLAVOUR, "Notes")
            .unwrap();

        let placement = determine_placement(doc.block(&bullet).unwrap().as_ref());
        assert_eq!(placement.parent_block_id, custom);
        assert_eq!(placement.descriptor, None);
    }

    #[test]
    fn test_placement_does_not_mutate() {
        let doc = OutlineDocument::new("d");
        let bullet = doc.append_bullet(None, "Apple").unwrap();
        doc.append_descriptor(&bullet, DescriptorKind::Why).unwrap();
        let before = doc.blocks_ordered();

        let handle = doc.block(&bullet).unwrap();
        let first = determine_placement(handle.as_ref());
        let second = determine_placement(handle.as_ref());
        assert_eq!(first, second);
        assert_eq!(doc.blocks_ordered(), before);
    }
}
