//! The live visual surface: a root container holding one grid of divider cards.
//!
//! The surface is what the user sees and interacts with. Exports borrow it
//! exclusively, resize it for capture and must hand it back untouched, so
//! every shared access goes through [`SurfaceHandle`].

use std::collections::BTreeSet;
use std::sync::Arc;

use tokio::sync::{Mutex, MutexGuard};

use crate::error::{Error, Result};
use crate::model::{CardList, CardRecord, SortOrder};

/// Class that suppresses the printed cut guides on wrappers and cards.
pub const HIDE_CUTLINES_CLASS: &str = "hide-cutlines";

/// Ordered inline style declarations (`property: value`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StyleMap {
    declarations: Vec<(String, String)>,
}

impl StyleMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, property: &str) -> Option<&str> {
        self.declarations
            .iter()
            .find(|(p, _)| p == property)
            .map(|(_, v)| v.as_str())
    }

    /// Set a property, keeping its position if already declared.
    pub fn set(&mut self, property: &str, value: impl Into<String>) {
        let value = value.into();
        if let Some(slot) = self.declarations.iter_mut().find(|(p, _)| p == property) {
            slot.1 = value;
        } else {
            self.declarations.push((property.to_string(), value));
        }
    }

    pub fn remove(&mut self, property: &str) -> Option<String> {
        let index = self.declarations.iter().position(|(p, _)| p == property)?;
        Some(self.declarations.remove(index).1)
    }

    /// Put back a previously captured value; `None` means "was not declared".
    pub fn restore(&mut self, property: &str, value: Option<String>) {
        match value {
            Some(value) => self.set(property, value),
            None => {
                self.remove(property);
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }

    /// Render as an HTML `style` attribute value.
    pub fn to_css(&self) -> String {
        self.declarations
            .iter()
            .map(|(p, v)| format!("{p}: {v};"))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// An `<img>` inside a card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageNode {
    pub src: String,
}

impl ImageNode {
    /// Whether this image references a vector icon (by file extension).
    pub fn is_vector_icon(&self) -> bool {
        is_vector_icon(&self.src)
    }
}

/// `true` for references whose path ends in `.svg`, ignoring query and fragment.
pub fn is_vector_icon(src: &str) -> bool {
    if src.starts_with("data:") {
        return false;
    }
    let path = src.split(['?', '#']).next().unwrap_or(src);
    path.to_ascii_lowercase().ends_with(".svg")
}

/// One divider card in the grid, with its wrapper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardNode {
    pub record: CardRecord,
    /// Position in insertion order, used to restore [`SortOrder::Added`]
    pub added_seq: usize,
    pub icon: ImageNode,
    /// Visibility of the on-screen "remove" button
    pub remove_visible: bool,
    pub wrapper_classes: BTreeSet<String>,
    pub card_classes: BTreeSet<String>,
}

impl CardNode {
    pub fn new(record: CardRecord, added_seq: usize) -> Self {
        let icon = ImageNode {
            src: record.icon_svg_uri.clone(),
        };
        Self {
            record,
            added_seq,
            icon,
            remove_visible: true,
            wrapper_classes: BTreeSet::from(["card-wrapper".to_string()]),
            card_classes: BTreeSet::from(["divider-card".to_string()]),
        }
    }

    pub fn cut_guides_visible(&self) -> bool {
        !self.wrapper_classes.contains(HIDE_CUTLINES_CLASS)
            && !self.card_classes.contains(HIDE_CUTLINES_CLASS)
    }

    pub fn wrapper_class_attr(&self) -> String {
        join_classes(&self.wrapper_classes)
    }

    pub fn card_class_attr(&self) -> String {
        join_classes(&self.card_classes)
    }
}

fn join_classes(classes: &BTreeSet<String>) -> String {
    classes.iter().map(String::as_str).collect::<Vec<_>>().join(" ")
}

/// The grid container holding the cards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridNode {
    pub style: StyleMap,
    pub cards: Vec<CardNode>,
    /// Ordering currently applied to `cards`
    pub order: SortOrder,
}

/// Fixed print geometry read back from an overridden surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedGeometry {
    pub width_mm: f64,
    pub height_mm: f64,
    pub columns: usize,
    pub track_width_mm: f64,
    pub gap_mm: f64,
}

/// Root container of the visual surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Surface {
    pub style: StyleMap,
    pub grid: Option<GridNode>,
}

impl Surface {
    /// Build the on-screen surface: a responsive auto-filling grid.
    pub fn from_cards(cards: &CardList) -> Self {
        let mut grid_style = StyleMap::new();
        grid_style.set("display", "grid");
        grid_style.set("grid-template-columns", "repeat(auto-fill, minmax(63mm, 1fr))");
        grid_style.set("justify-content", "center");

        Self {
            style: StyleMap::new(),
            grid: Some(GridNode {
                style: grid_style,
                cards: cards
                    .iter()
                    .cloned()
                    .enumerate()
                    .map(|(seq, record)| CardNode::new(record, seq))
                    .collect(),
                order: SortOrder::Added,
            }),
        }
    }

    /// A root container without a grid, as left behind by a broken template.
    pub const fn without_grid() -> Self {
        Self {
            style: StyleMap {
                declarations: Vec::new(),
            },
            grid: None,
        }
    }

    pub fn card_count(&self) -> usize {
        self.grid.as_ref().map_or(0, |g| g.cards.len())
    }

    pub fn cards(&self) -> &[CardNode] {
        match &self.grid {
            Some(grid) => &grid.cards,
            None => &[],
        }
    }

    pub fn cards_mut(&mut self) -> &mut [CardNode] {
        match &mut self.grid {
            Some(grid) => &mut grid.cards,
            None => &mut [],
        }
    }

    /// `(card index, src)` of every vector icon in grid order.
    pub fn vector_icon_sources(&self) -> Vec<(usize, String)> {
        self.cards()
            .iter()
            .enumerate()
            .filter(|(_, card)| card.icon.is_vector_icon())
            .map(|(i, card)| (i, card.icon.src.clone()))
            .collect()
    }

    pub fn remove_card(&mut self, code: &str) -> Option<CardRecord> {
        let grid = self.grid.as_mut()?;
        let code = code.trim().to_uppercase();
        let index = grid.cards.iter().position(|c| c.record.code == code)?;
        Some(grid.cards.remove(index).record)
    }

    /// Reorder the cards. Ties, and [`SortOrder::Added`], fall back to
    /// insertion order. Returns `false` when there is no grid.
    pub fn sort_cards(&mut self, order: SortOrder) -> bool {
        let Some(grid) = self.grid.as_mut() else {
            return false;
        };
        grid.cards.sort_by(|a, b| {
            order
                .compare(&a.record, &b.record)
                .then(a.added_seq.cmp(&b.added_seq))
        });
        grid.order = order;
        true
    }

    pub fn sort_order(&self) -> SortOrder {
        self.grid.as_ref().map_or_else(SortOrder::default, |g| g.order)
    }

    /// Read back the fixed millimeter geometry set up for capture.
    ///
    /// Returns `None` while the surface still uses its responsive layout.
    pub fn fixed_geometry(&self) -> Option<FixedGeometry> {
        let grid = self.grid.as_ref()?;
        let width_mm = parse_mm(self.style.get("width")?)?;
        let height_mm = parse_mm(self.style.get("height")?)?;
        let (columns, track_width_mm) =
            parse_repeat_tracks(grid.style.get("grid-template-columns")?)?;
        let gap_mm = grid.style.get("gap").and_then(parse_mm).unwrap_or(0.0);

        Some(FixedGeometry {
            width_mm,
            height_mm,
            columns,
            track_width_mm,
            gap_mm,
        })
    }
}

/// Parse `"63mm"` into `63.0`.
pub fn parse_mm(value: &str) -> Option<f64> {
    let number = value.trim().strip_suffix("mm")?;
    let mm: f64 = number.trim().parse().ok()?;
    (mm.is_finite() && mm >= 0.0).then_some(mm)
}

/// Parse `"repeat(3, 63mm)"` into `(3, 63.0)`.
fn parse_repeat_tracks(value: &str) -> Option<(usize, f64)> {
    let inner = value.trim().strip_prefix("repeat(")?.strip_suffix(')')?;
    let (count, size) = inner.split_once(',')?;
    let count: usize = count.trim().parse().ok()?;
    Some((count, parse_mm(size)?))
}

/// Shared handle to the live surface.
///
/// An export holds the lock for its whole duration; UI mutations use the
/// non-blocking accessors and fail with [`Error::SurfaceBusy`] meanwhile.
#[derive(Debug, Clone)]
pub struct SurfaceHandle {
    inner: Arc<Mutex<Surface>>,
}

impl SurfaceHandle {
    pub fn new(surface: Surface) -> Self {
        Self {
            inner: Arc::new(Mutex::new(surface)),
        }
    }

    pub async fn lock(&self) -> MutexGuard<'_, Surface> {
        self.inner.lock().await
    }

    pub fn try_lock(&self) -> Result<MutexGuard<'_, Surface>> {
        self.inner.try_lock().map_err(|_| Error::SurfaceBusy)
    }

    /// Remove a card unless an export currently owns the surface.
    pub fn try_remove_card(&self, code: &str) -> Result<Option<CardRecord>> {
        Ok(self.try_lock()?.remove_card(code))
    }

    /// Reorder the cards unless an export currently owns the surface.
    pub fn try_sort_cards(&self, order: SortOrder) -> Result<()> {
        if self.try_lock()?.sort_cards(order) {
            Ok(())
        } else {
            Err(Error::GridNotFound)
        }
    }

    /// Copy of the current surface state.
    pub async fn snapshot(&self) -> Surface {
        self.inner.lock().await.clone()
    }
}
