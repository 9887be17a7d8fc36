// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Applying parsed attributes to a node.
//!
//! A markup loader parses attribute syntax into values on its own; this
//! module only resolves the names against the node's owner type and writes
//! the values as local values.

use alloc::string::ToString;

use crate::error::PropertyError;
use crate::priority::Priority;
use crate::tree::{ElementTree, NodeId};
use crate::value::ErasedValue;

/// Applies `(name, value)` pairs to `node` as local values.
///
/// Names are looked up for the node's owner type, so aliases added with
/// [`PropertyRegistry::add_owner`](crate::PropertyRegistry::add_owner)
/// resolve too. Application stops at the first error; attributes before it
/// stay applied. Returns the number of attributes applied.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use understory_property_store::{
///     ElementTree, ErasedValue, PropertyError, PropertyMetadataBuilder, PropertyRegistry,
///     apply_attributes,
/// };
///
/// let mut registry = PropertyRegistry::new();
/// let width = registry.register(
///     "Control",
///     "Width",
///     PropertyMetadataBuilder::new(0.0_f64).build(),
/// );
/// let mut tree = ElementTree::new(Arc::new(registry));
/// let node = tree.insert("Control", None).unwrap();
///
/// let applied =
///     apply_attributes(&mut tree, node, [("Width", ErasedValue::new(120.0_f64))]).unwrap();
/// assert_eq!(applied, 1);
/// assert_eq!(tree.get_value(node, width).unwrap(), 120.0);
///
/// let err = apply_attributes(&mut tree, node, [("Colour", ErasedValue::new(1_u32))]).unwrap_err();
/// assert!(matches!(err, PropertyError::UnknownProperty { owner_type: "Control", .. }));
/// ```
pub fn apply_attributes<'n, I>(
    tree: &mut ElementTree,
    node: NodeId,
    attributes: I,
) -> Result<usize, PropertyError>
where
    I: IntoIterator<Item = (&'n str, ErasedValue)>,
{
    let owner_type = tree.type_name(node)?;
    let mut applied = 0;
    for (name, value) in attributes {
        let Some(id) = tree.registry().find(owner_type, name) else {
            return Err(PropertyError::UnknownProperty {
                owner_type,
                name: name.to_string(),
            });
        };
        tree.set_value_erased(node, id, Priority::LocalValue, value)?;
        applied += 1;
    }
    Ok(applied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::PropertyMetadataBuilder;
    use crate::registry::PropertyRegistry;
    use alloc::string::String;
    use alloc::sync::Arc;
    use alloc::vec;
    use alloc::vec::Vec;

    #[test]
    fn aliases_resolve_for_the_node_type() {
        let mut registry = PropertyRegistry::new();
        let text = registry.register(
            "TextBlock",
            "Text",
            PropertyMetadataBuilder::new(String::new()).build(),
        );
        registry.add_owner(text, "AccessText");
        let mut tree = ElementTree::new(Arc::new(registry));
        let label = tree.insert("AccessText", None).unwrap();

        apply_attributes(
            &mut tree,
            label,
            [("Text", ErasedValue::new(String::from("_Open")))],
        )
        .unwrap();
        assert_eq!(tree.get_value(label, text).unwrap(), "_Open");
    }

    #[test]
    fn type_mismatch_leaves_the_store_unchanged() {
        let mut registry = PropertyRegistry::new();
        let width = registry.register(
            "Control",
            "Width",
            PropertyMetadataBuilder::new(0.0_f64).build(),
        );
        let height = registry.register(
            "Control",
            "Height",
            PropertyMetadataBuilder::new(0.0_f64).build(),
        );
        let mut tree = ElementTree::new(Arc::new(registry));
        let node = tree.insert("Control", None).unwrap();

        let err = apply_attributes(
            &mut tree,
            node,
            vec![
                ("Width", ErasedValue::new(10.0_f64)),
                ("Height", ErasedValue::new("tall")),
                ("Width", ErasedValue::new(99.0_f64)),
            ],
        )
        .unwrap_err();
        assert!(matches!(err, PropertyError::TypeMismatch { property: "Height", .. }));
        assert_eq!(tree.get_value(node, width).unwrap(), 10.0);
        assert_eq!(tree.get_value(node, height).unwrap(), 0.0);
        assert!(tree.store(node).unwrap().ladder(height.id()).is_none());
    }

    #[test]
    fn names_are_scoped_to_the_owner_type() {
        let mut registry = PropertyRegistry::new();
        registry.register("Border", "Padding", PropertyMetadataBuilder::new(0.0_f64).build());
        let mut tree = ElementTree::new(Arc::new(registry));
        let node = tree.insert("Decorator", None).unwrap();
        let err = apply_attributes(&mut tree, node, [("Padding", ErasedValue::new(1.0_f64))])
            .unwrap_err();
        assert_eq!(
            err,
            PropertyError::UnknownProperty {
                owner_type: "Decorator",
                name: String::from("Padding"),
            }
        );
    }

    #[test]
    fn stale_nodes_are_rejected() {
        let registry = PropertyRegistry::new();
        let mut tree = ElementTree::new(Arc::new(registry));
        let node = tree.insert("Control", None).unwrap();
        tree.remove(node).unwrap();
        assert_eq!(
            apply_attributes(&mut tree, node, Vec::<(&str, ErasedValue)>::new()),
            Err(PropertyError::StaleNode)
        );
    }
}
