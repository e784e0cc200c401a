pub const INDEX_HTML: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/src/web/assets/index.html"
));
pub const STYLES_CSS: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/src/web/assets/styles.css"
));
pub const APP_JS: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/src/web/assets/app.js"
));
const ANIMATION_MANIFEST: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/src/web/assets/animations.txt"
));

/// Sprite sheet ids shipped with the viewer.
pub fn animation_ids() -> impl Iterator<Item = &'static str> {
    ANIMATION_MANIFEST
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presentation::AnimationCatalog;

    #[test]
    fn manifest_covers_the_villager_catalog() {
        assert_eq!(animation_ids().count(), 40);
        assert!(AnimationCatalog::villager().validate(animation_ids()).is_ok());
    }
}
