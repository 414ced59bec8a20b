//! Image reference stored in `image_uri`.

/// Prefix marking an `image_uri` as a symbol to render instead of an image.
pub const SYMBOL_PREFIX: &str = "emoji:";

/// Interpretation of a food item's `image_uri`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageRef<'a> {
    /// Render this symbol (e.g. an emoji) in place of an image.
    Symbol(&'a str),
    /// Opaque reference to binary media.
    Media(&'a str),
}

impl<'a> ImageRef<'a> {
    /// Classifies a stored `image_uri`.
    #[must_use]
    pub fn parse(uri: &'a str) -> Self {
        uri.strip_prefix(SYMBOL_PREFIX)
            .map_or(Self::Media(uri), Self::Symbol)
    }

    /// Encodes a symbol as an `image_uri`.
    #[must_use]
    pub fn symbol_uri(symbol: &str) -> String {
        format!("{SYMBOL_PREFIX}{symbol}")
    }

    /// Returns true for symbolic images.
    #[must_use]
    pub const fn is_symbol(&self) -> bool {
        matches!(self, Self::Symbol(_))
    }
}
