//! Scoped, reversible mutations of the live surface.
//!
//! Each guard records the state it is about to overwrite and puts it back in
//! `Drop`, so restoration happens on every exit path: normal return, `?`
//! propagation, timeouts and panics. Guards deref to [`Surface`] and nest:
//!
//! ```text
//! LayoutOverride -> IconSwap -> PrintChrome -> capture
//! ```

use std::ops::{Deref, DerefMut};

use tracing::debug;

use crate::error::{Error, Result};
use crate::layout::GridLayout;
use crate::surface::{HIDE_CUTLINES_CLASS, Surface};
use crate::util::css_mm;

/// Root container properties overridden for capture.
const ROOT_PROPERTIES: [&str; 4] = ["box-sizing", "width", "height", "max-width"];

/// Grid container properties overridden for capture.
const GRID_PROPERTIES: [&str; 5] = [
    "grid-template-columns",
    "justify-content",
    "width",
    "max-width",
    "gap",
];

// =============================================================================
// Layout Override
// =============================================================================

/// Fixes the surface to the exact physical size of a [`GridLayout`].
pub struct LayoutOverride<'a> {
    surface: &'a mut Surface,
    saved_root: Vec<(&'static str, Option<String>)>,
    saved_grid: Vec<(&'static str, Option<String>)>,
}

impl<'a> LayoutOverride<'a> {
    /// Capture the current sizing attributes and apply the fixed geometry.
    ///
    /// Fails without touching the surface when it has no grid.
    pub fn apply(surface: &'a mut Surface, layout: &GridLayout) -> Result<Self> {
        let Some(grid) = surface.grid.as_mut() else {
            return Err(Error::GridNotFound);
        };

        let saved_grid = GRID_PROPERTIES
            .iter()
            .map(|&p| (p, grid.style.get(p).map(str::to_string)))
            .collect();
        let saved_root = ROOT_PROPERTIES
            .iter()
            .map(|&p| (p, surface.style.get(p).map(str::to_string)))
            .collect();

        let width = css_mm(layout.target_width_mm);
        let height = css_mm(layout.target_height_mm);

        grid.style.set(
            "grid-template-columns",
            format!("repeat({}, {})", layout.columns, css_mm(layout.card_width_mm)),
        );
        grid.style.set("justify-content", "start");
        grid.style.set("width", width.clone());
        grid.style.set("max-width", width.clone());
        grid.style.set("gap", css_mm(layout.gap_mm));

        surface.style.set("box-sizing", "content-box");
        surface.style.set("width", width.clone());
        surface.style.set("height", height.clone());
        surface.style.set("max-width", width.clone());

        debug!("Surface fixed to {} x {}", width, height);

        Ok(Self {
            surface,
            saved_root,
            saved_grid,
        })
    }
}

impl Deref for LayoutOverride<'_> {
    type Target = Surface;

    fn deref(&self) -> &Surface {
        self.surface
    }
}

impl DerefMut for LayoutOverride<'_> {
    fn deref_mut(&mut self) -> &mut Surface {
        self.surface
    }
}

impl Drop for LayoutOverride<'_> {
    fn drop(&mut self) {
        for (property, value) in self.saved_root.drain(..) {
            self.surface.style.restore(property, value);
        }
        if let Some(grid) = self.surface.grid.as_mut() {
            for (property, value) in self.saved_grid.drain(..) {
                grid.style.restore(property, value);
            }
        }
        debug!("Surface layout restored");
    }
}

// =============================================================================
// Icon Swap
// =============================================================================

/// Substitutes icon sources, remembering the originals.
pub struct IconSwap<'a> {
    surface: &'a mut Surface,
    originals: Vec<(usize, String)>,
}

impl<'a> IconSwap<'a> {
    pub const fn new(surface: &'a mut Surface) -> Self {
        Self {
            surface,
            originals: Vec::new(),
        }
    }

    /// Point the icon of card `index` at `src`. Unknown indices are ignored.
    pub fn substitute(&mut self, index: usize, src: String) {
        let Some(card) = self.surface.cards_mut().get_mut(index) else {
            return;
        };
        let original = std::mem::replace(&mut card.icon.src, src);
        if !self.originals.iter().any(|(i, _)| *i == index) {
            self.originals.push((index, original));
        }
    }

    pub fn substituted(&self) -> usize {
        self.originals.len()
    }
}

impl Deref for IconSwap<'_> {
    type Target = Surface;

    fn deref(&self) -> &Surface {
        self.surface
    }
}

impl DerefMut for IconSwap<'_> {
    fn deref_mut(&mut self) -> &mut Surface {
        self.surface
    }
}

impl Drop for IconSwap<'_> {
    fn drop(&mut self) {
        let cards = self.surface.cards_mut();
        for (index, src) in self.originals.drain(..) {
            if let Some(card) = cards.get_mut(index) {
                card.icon.src = src;
            }
        }
    }
}

// =============================================================================
// Print Chrome
// =============================================================================

/// Prior visibility of one card's interactive and print-only decorations.
struct ChromeState {
    remove_visible: bool,
    wrapper_hid_cutlines: bool,
    card_hid_cutlines: bool,
}

/// Hides remove buttons and cut guides for the duration of a capture.
pub struct PrintChrome<'a> {
    surface: &'a mut Surface,
    saved: Vec<ChromeState>,
}

impl<'a> PrintChrome<'a> {
    pub fn hide(surface: &'a mut Surface) -> Self {
        let saved = surface
            .cards_mut()
            .iter_mut()
            .map(|card| {
                let state = ChromeState {
                    remove_visible: card.remove_visible,
                    wrapper_hid_cutlines: card.wrapper_classes.contains(HIDE_CUTLINES_CLASS),
                    card_hid_cutlines: card.card_classes.contains(HIDE_CUTLINES_CLASS),
                };
                card.remove_visible = false;
                card.wrapper_classes.insert(HIDE_CUTLINES_CLASS.to_string());
                card.card_classes.insert(HIDE_CUTLINES_CLASS.to_string());
                state
            })
            .collect();

        Self { surface, saved }
    }
}

impl Deref for PrintChrome<'_> {
    type Target = Surface;

    fn deref(&self) -> &Surface {
        self.surface
    }
}

impl DerefMut for PrintChrome<'_> {
    fn deref_mut(&mut self) -> &mut Surface {
        self.surface
    }
}

impl Drop for PrintChrome<'_> {
    fn drop(&mut self) {
        for (card, state) in self.surface.cards_mut().iter_mut().zip(self.saved.drain(..)) {
            card.remove_visible = state.remove_visible;
            if !state.wrapper_hid_cutlines {
                card.wrapper_classes.remove(HIDE_CUTLINES_CLASS);
            }
            if !state.card_hid_cutlines {
                card.card_classes.remove(HIDE_CUTLINES_CLASS);
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::config::GridConfig;
    use crate::model::{CardList, CardRecord};

    fn surface(count: usize) -> Surface {
        let mut list = CardList::new();
        for i in 0..count {
            list.push(CardRecord::new(
                &format!("s{i}"),
                format!("Set {i}"),
                "2020-01-01",
                format!("https://svgs.example/s{i}.svg"),
                "expansion",
                100,
            ))
            .unwrap();
        }
        Surface::from_cards(&list)
    }

    fn layout(count: usize) -> GridLayout {
        GridLayout::compute(count, &GridConfig::default())
    }

    #[test]
    fn test_override_applies_fixed_geometry() {
        let mut s = surface(4);
        let guard = LayoutOverride::apply(&mut s, &layout(4)).unwrap();

        assert_eq!(guard.style.get("box-sizing"), Some("content-box"));
        assert_eq!(guard.style.get("width"), Some("189mm"));
        assert_eq!(guard.style.get("height"), Some("198mm"));
        let grid = guard.grid.as_ref().unwrap();
        assert_eq!(grid.style.get("grid-template-columns"), Some("repeat(3, 63mm)"));
        assert_eq!(grid.style.get("justify-content"), Some("start"));
        assert_eq!(grid.style.get("gap"), Some("0mm"));

        let geometry = guard.fixed_geometry().unwrap();
        assert_eq!(geometry.columns, 3);
    }

    #[test]
    fn test_override_restores_verbatim() {
        let mut s = surface(2);
        s.style.set("width", "80%");
        s.style.set("padding", "1rem");
        let before = s.clone();

        {
            let _guard = LayoutOverride::apply(&mut s, &layout(2)).unwrap();
        }

        assert_eq!(s, before);
        assert!(s.style.get("height").is_none());
    }

    #[test]
    fn test_override_without_grid_leaves_surface_alone() {
        let mut s = Surface::without_grid();
        s.style.set("width", "50%");
        let before = s.clone();

        let result = LayoutOverride::apply(&mut s, &layout(1));
        assert!(matches!(result, Err(Error::GridNotFound)));
        drop(result);
        assert_eq!(s, before);
    }

    #[test]
    fn test_nested_guards_restore_on_panic() {
        let mut s = surface(3);
        let before = s.clone();

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let mut layout_guard = LayoutOverride::apply(&mut s, &layout(3)).unwrap();
            let mut icons = IconSwap::new(&mut layout_guard);
            icons.substitute(1, "data:image/png;base64,AAAA".to_string());
            let _chrome = PrintChrome::hide(&mut icons);
            panic!("capture blew up");
        }));

        assert!(result.is_err());
        assert_eq!(s, before);
    }

    #[test]
    fn test_icon_swap_keeps_first_original() {
        let mut s = surface(1);
        {
            let mut icons = IconSwap::new(&mut s);
            icons.substitute(0, "data:a".to_string());
            icons.substitute(0, "data:b".to_string());
            icons.substitute(7, "data:c".to_string());
            assert_eq!(icons.substituted(), 1);
            assert_eq!(icons.cards()[0].icon.src, "data:b");
        }
        assert_eq!(s.cards()[0].icon.src, "https://svgs.example/s0.svg");
    }

    #[test]
    fn test_print_chrome_hides_and_restores() {
        let mut s = surface(2);
        s.cards_mut()[1].card_classes.insert(HIDE_CUTLINES_CLASS.to_string());
        s.cards_mut()[1].remove_visible = false;
        let before = s.clone();

        {
            let chrome = PrintChrome::hide(&mut s);
            assert!(chrome.cards().iter().all(|c| !c.remove_visible));
            assert!(chrome.cards().iter().all(|c| !c.cut_guides_visible()));
        }

        assert_eq!(s, before);
        assert!(s.cards()[0].cut_guides_visible());
        assert!(s.cards()[1].card_classes.contains(HIDE_CUTLINES_CLASS));
    }
}
