// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Properties read by the text widgets.

use alloc::string::String;

use understory_property_store::{
    Property, PropertyFlags, PropertyMetadataBuilder, PropertyRegistry,
};

/// Owner type name of [`TextBlock`](crate::TextBlock) nodes.
pub const TEXT_BLOCK: &str = "TextBlock";

/// Owner type name of [`AccessText`](crate::AccessText) nodes.
pub const ACCESS_TEXT: &str = "AccessText";

/// Opaque black, as `0xRRGGBBAA`.
pub const DEFAULT_FOREGROUND: u32 = 0x0000_00ff;

/// Default font size in logical units.
pub const DEFAULT_FONT_SIZE: f64 = 12.0;

/// Handles for the text properties.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TextProperties {
    /// `TextBlock.Text`: the displayed string.
    pub text: Property<String>,
    /// `TextBlock.FontSize`: inherits; never negative.
    pub font_size: Property<f64>,
    /// `TextBlock.Foreground`: `0xRRGGBBAA` brush color.
    pub foreground: Property<u32>,
    /// `AccessText.ShowAccessKey`: inherits; underline the access key.
    pub show_access_key: Property<bool>,
}

impl TextProperties {
    /// Registers the text properties.
    ///
    /// The `TextBlock` properties are also made addressable from
    /// `AccessText`, so markup for either type can set them by name.
    ///
    /// # Panics
    ///
    /// Panics if the properties are already registered in `registry`.
    pub fn register(registry: &mut PropertyRegistry) -> Self {
        let text = registry.register(
            TEXT_BLOCK,
            "Text",
            PropertyMetadataBuilder::new(String::new())
                .flags(PropertyFlags::AFFECTS_MEASURE)
                .build(),
        );
        let font_size = registry.register(
            TEXT_BLOCK,
            "FontSize",
            PropertyMetadataBuilder::new(DEFAULT_FONT_SIZE)
                .inherits(true)
                .flags(PropertyFlags::AFFECTS_MEASURE)
                .coerce(|size| size.max(0.0))
                .build(),
        );
        let foreground = registry.register(
            TEXT_BLOCK,
            "Foreground",
            PropertyMetadataBuilder::new(DEFAULT_FOREGROUND)
                .flags(PropertyFlags::AFFECTS_RENDER)
                .build(),
        );
        let show_access_key = registry.register(
            ACCESS_TEXT,
            "ShowAccessKey",
            PropertyMetadataBuilder::new(false)
                .inherits(true)
                .flags(PropertyFlags::AFFECTS_RENDER)
                .build(),
        );

        registry.add_owner(text, ACCESS_TEXT);
        registry.add_owner(font_size, ACCESS_TEXT);
        registry.add_owner(foreground, ACCESS_TEXT);

        Self {
            text,
            font_size,
            foreground,
            show_access_key,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn access_text_sees_text_block_properties() {
        let mut registry = PropertyRegistry::new();
        let props = TextProperties::register(&mut registry);
        for name in ["Text", "FontSize", "Foreground"] {
            assert_eq!(
                registry.find(TEXT_BLOCK, name),
                registry.find(ACCESS_TEXT, name),
                "{name}"
            );
        }
        assert_eq!(
            registry.find(ACCESS_TEXT, "ShowAccessKey"),
            Some(props.show_access_key.id())
        );
        assert_eq!(registry.find(TEXT_BLOCK, "ShowAccessKey"), None);
    }

    #[test]
    fn flags_and_coercion() {
        let mut registry = PropertyRegistry::new();
        let props = TextProperties::register(&mut registry);
        assert!(registry.inherits(props.font_size.id()));
        assert!(registry.inherits(props.show_access_key.id()));
        assert!(!registry.inherits(props.text.id()));
        assert!(
            registry
                .flags(props.foreground.id())
                .contains(PropertyFlags::AFFECTS_RENDER)
        );
        let metadata = registry.metadata(props.font_size).unwrap();
        assert_eq!(metadata.coerce(-3.0), 0.0);
    }
}
